use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use http::header::CONTENT_TYPE;
use http::StatusCode;

use common::protocol::{Session, SessionError};

use crate::state::ServiceState;

/// `POST /:cid/git-upload-pack` -- serve a fetch.
pub async fn handler(
    State(state): State<ServiceState>,
    Path(cid): Path<String>,
    body: Bytes,
) -> Result<Response, UploadPackError> {
    let storage = state.loader().load(&cid).await?;
    let response = Session::new(storage).upload_pack(&body).await?;

    Ok((
        StatusCode::OK,
        [(CONTENT_TYPE, "application/x-git-upload-pack-result")],
        response,
    )
        .into_response())
}

#[derive(Debug, thiserror::Error)]
pub enum UploadPackError {
    #[error("session error: {0}")]
    Session(#[from] SessionError),
}

impl IntoResponse for UploadPackError {
    fn into_response(self) -> Response {
        let UploadPackError::Session(err) = self;
        super::session_response(err)
    }
}
