use common::blocks::BlockStore;
use common::protocol::Loader;

/// Gateway configuration, assembled from CLI arguments.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Config { port: 8080 }
    }
}

/// Shared state behind every handler: the block store and the loader that
/// resolves repository identifiers against it.
///
/// The gateway binary embeds an in-memory store; a deployment backed by a
/// remote node store swaps the constructor and nothing else.
#[derive(Clone)]
pub struct ServiceState {
    blocks: BlockStore,
    loader: Loader,
}

impl ServiceState {
    pub fn from_config(_config: &Config) -> Self {
        let blocks = BlockStore::memory();
        ServiceState {
            loader: Loader::new(blocks.clone()),
            blocks,
        }
    }

    pub fn blocks(&self) -> &BlockStore {
        &self.blocks
    }

    pub fn loader(&self) -> &Loader {
        &self.loader
    }
}
