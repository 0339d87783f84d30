use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use http::header::{CACHE_CONTROL, CONTENT_TYPE};
use http::StatusCode;
use serde::Deserialize;

use common::protocol::{Service, Session, SessionError};

use crate::state::ServiceState;

#[derive(Debug, Deserialize)]
pub struct InfoRefsQuery {
    #[serde(default)]
    pub service: Option<String>,
}

/// `GET /:cid/info/refs?service=...` -- the reference advertisement.
pub async fn handler(
    State(state): State<ServiceState>,
    Path(cid): Path<String>,
    Query(query): Query<InfoRefsQuery>,
) -> Result<Response, InfoRefsError> {
    let service = query
        .service
        .as_deref()
        .and_then(Service::from_name)
        .ok_or_else(|| InfoRefsError::UnknownService(query.service.unwrap_or_default()))?;

    let storage = state.loader().load(&cid).await?;
    let body = Session::new(storage).advertised_refs(service).await?;

    Ok((
        StatusCode::OK,
        [
            (
                CONTENT_TYPE,
                format!("application/x-{}-advertisement", service.name()),
            ),
            (CACHE_CONTROL, "no-cache".to_string()),
        ],
        body,
    )
        .into_response())
}

#[derive(Debug, thiserror::Error)]
pub enum InfoRefsError {
    #[error("unknown service: {0:?}")]
    UnknownService(String),
    #[error("session error: {0}")]
    Session(#[from] SessionError),
}

impl IntoResponse for InfoRefsError {
    fn into_response(self) -> Response {
        match self {
            InfoRefsError::UnknownService(_) => {
                (StatusCode::NOT_FOUND, self.to_string()).into_response()
            }
            InfoRefsError::Session(err) => super::session_response(err),
        }
    }
}
