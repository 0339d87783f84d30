use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use http::header::CONTENT_TYPE;
use http::StatusCode;

use common::protocol::{Session, SessionError};

use crate::state::ServiceState;

/// Response header carrying the repository's new root identifier after a
/// push. The surrounding catalog records it; the core stores it nowhere.
pub const ROOT_HEADER: &str = "x-dagit-root";

/// `POST /:cid/git-receive-pack` -- apply a push.
pub async fn handler(
    State(state): State<ServiceState>,
    Path(cid): Path<String>,
    body: Bytes,
) -> Result<Response, ReceivePackError> {
    let storage = state.loader().load(&cid).await?;
    let outcome = Session::new(storage).receive_pack(&body).await?;

    Ok((
        StatusCode::OK,
        [
            (
                CONTENT_TYPE.as_str(),
                "application/x-git-receive-pack-result".to_string(),
            ),
            (ROOT_HEADER, outcome.root.to_string()),
        ],
        outcome.report,
    )
        .into_response())
}

#[derive(Debug, thiserror::Error)]
pub enum ReceivePackError {
    #[error("session error: {0}")]
    Session(#[from] SessionError),
}

impl IntoResponse for ReceivePackError {
    fn into_response(self) -> Response {
        let ReceivePackError::Session(err) = self;
        super::session_response(err)
    }
}
