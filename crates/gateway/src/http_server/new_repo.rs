use axum::extract::State;
use axum::response::{IntoResponse, Response};
use http::StatusCode;

use common::blocks::BlockStoreError;
use common::storage::{Storage, StorageError};

use crate::state::ServiceState;

/// `POST /new` -- create an empty repository and return its identifier.
///
/// This is the minimal bootstrap surface for the catalog layer sitting in
/// front of the gateway; everything else about repository bookkeeping
/// lives there.
pub async fn handler(State(state): State<ServiceState>) -> Result<Response, NewRepoError> {
    let storage = Storage::init(state.blocks()).await?;
    let root = storage.flush().await?;
    state.blocks().pin(&root, true).await?;

    tracing::info!(%root, "created empty repository");
    Ok((StatusCode::CREATED, root.to_string()).into_response())
}

#[derive(Debug, thiserror::Error)]
pub enum NewRepoError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("block store error: {0}")]
    Blocks(#[from] BlockStoreError),
}

impl IntoResponse for NewRepoError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}
