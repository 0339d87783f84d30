use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use http::StatusCode;

use common::protocol::SessionError;

use crate::state::ServiceState;

pub mod health;
pub mod info_refs;
pub mod new_repo;
pub mod receive_pack;
pub mod upload_pack;

/// The smart-HTTP surface, one repository per content identifier.
pub fn router(state: ServiceState) -> Router {
    Router::new()
        .route("/new", post(new_repo::handler))
        .route("/:cid/info/refs", get(info_refs::handler))
        .route("/:cid/git-upload-pack", post(upload_pack::handler))
        .route("/:cid/git-receive-pack", post(receive_pack::handler))
        .nest("/_status", health::router(state.clone()))
        .with_state(state)
}

/// Map a session failure onto the response the client should see. Failed
/// requests never report partial success: the prior identifier stays
/// authoritative.
pub(crate) fn session_response(err: SessionError) -> Response {
    let status = match &err {
        SessionError::RepositoryNotFound | SessionError::UnknownService(_) => {
            StatusCode::NOT_FOUND
        }
        SessionError::Wire(_) | SessionError::Pack(_) => StatusCode::BAD_REQUEST,
        SessionError::Storage(_) | SessionError::Blocks(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    tracing::warn!(%err, %status, "request failed");
    (status, err.to_string()).into_response()
}

#[cfg(test)]
mod test {
    use super::*;
    use axum::body::Body;
    use http::Request;
    use tower::ServiceExt;

    use common::git::{Object, ObjectId, ObjectKind};
    use common::protocol::{PackWriter, ReceivePackRequest, RefUpdate, ReportStatus};
    use common::storage::DEFAULT_BRANCH;

    use crate::state::Config;

    fn test_router() -> Router {
        router(ServiceState::from_config(&Config::default()))
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn create_repo(router: &Router) -> String {
        let response = router
            .clone()
            .oneshot(
                Request::post("/new")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        body_string(response).await
    }

    #[tokio::test]
    async fn test_new_then_advertise() {
        let router = test_router();
        let cid = create_repo(&router).await;

        let response = router
            .clone()
            .oneshot(
                Request::get(format!("/{}/info/refs?service=git-receive-pack", cid))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"],
            "application/x-git-receive-pack-advertisement"
        );
        assert_eq!(response.headers()["cache-control"], "no-cache");
    }

    #[tokio::test]
    async fn test_unknown_service_is_not_found() {
        let router = test_router();
        let cid = create_repo(&router).await;

        let response = router
            .clone()
            .oneshot(
                Request::get(format!("/{}/info/refs?service=git-shell", cid))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_repository_is_not_found() {
        let router = test_router();
        let response = router
            .oneshot(
                Request::get("/not-a-cid/info/refs?service=git-upload-pack")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_push_returns_new_root_header() {
        let router = test_router();
        let cid = create_repo(&router).await;

        let blob = Object::new(ObjectKind::Blob, b"data".to_vec());
        let mut tree_payload = Vec::new();
        tree_payload.extend_from_slice(b"100644 f\0");
        tree_payload.extend_from_slice(blob.id().as_bytes());
        let tree = Object::new(ObjectKind::Tree, tree_payload);
        let commit = Object::new(
            ObjectKind::Commit,
            format!(
                "tree {}\nauthor t <t@t> 0 +0000\ncommitter t <t@t> 0 +0000\n\npush\n",
                tree.id()
            )
            .into_bytes(),
        );

        let mut pack = PackWriter::new();
        pack.add_object(&blob);
        pack.add_object(&tree);
        pack.add_object(&commit);
        let body = ReceivePackRequest {
            updates: vec![RefUpdate {
                old: ObjectId::ZERO,
                new: commit.id(),
                name: DEFAULT_BRANCH.to_string(),
            }],
            pack: pack.finish().unwrap(),
        }
        .encode();

        let response = router
            .clone()
            .oneshot(
                Request::post(format!("/{}/git-receive-pack", cid))
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"],
            "application/x-git-receive-pack-result"
        );

        let new_root = response.headers()[receive_pack::ROOT_HEADER]
            .to_str()
            .unwrap()
            .to_string();
        assert_ne!(new_root, cid);

        let report = ReportStatus::decode(body_string(response).await.as_bytes()).unwrap();
        assert!(report.results[0].error.is_none());

        // the new identifier serves the pushed ref
        let response = router
            .oneshot(
                Request::get(format!("/{}/info/refs?service=git-upload-pack", new_root))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let advertisement = body_string(response).await;
        assert!(advertisement.contains(DEFAULT_BRANCH));
    }

    #[tokio::test]
    async fn test_health_route() {
        let router = test_router();
        let response = router
            .oneshot(
                Request::get("/_status/healthz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
