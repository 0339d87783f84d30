use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::blocks::BlockStore;

use super::{Storage, StorageError};

/// Lazily-provisioned storage for named submodules.
///
/// The first request for a name creates a brand-new, empty nested tree in
/// the same block store and caches the wrapping [`Storage`] for the parent's
/// lifetime. Provisioning never consults the parent tree: a submodule's
/// storage starts empty even if content previously existed at that name --
/// reattaching saved submodule content is the gitlink/config layer's job,
/// not the object store's.
#[derive(Clone)]
pub struct ModuleStorage {
    blocks: BlockStore,
    modules: Arc<Mutex<HashMap<String, Storage>>>,
}

impl ModuleStorage {
    pub fn new(blocks: BlockStore) -> Self {
        ModuleStorage {
            blocks,
            modules: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn module(&self, name: &str) -> Result<Storage, StorageError> {
        let mut modules = self.modules.lock().await;
        if let Some(module) = modules.get(name) {
            return Ok(module.clone());
        }

        let module = Storage::init(&self.blocks).await?;
        modules.insert(name.to_string(), module.clone());
        Ok(module)
    }
}
