//! Byte sources: resolve an address to raw encoded bytes.
//!
//! A loader answers synchronously. `None` means "not available right now";
//! the import system will ask again on a later tick until the request times
//! out, so a loader must never block waiting for data to appear.

use std::collections::HashMap;
use std::io;
use std::path::{Component as PathComponent, Path, PathBuf};
use std::sync::Arc;

use tessera_ecs::world::World;
use tracing::warn;

/// Resolves addresses to bytes.
pub trait ByteLoader {
    fn load(&mut self, world: &World, address: &str) -> Option<Vec<u8>>;
}

impl<F> ByteLoader for F
where
    F: FnMut(&World, &str) -> Option<Vec<u8>>,
{
    fn load(&mut self, world: &World, address: &str) -> Option<Vec<u8>> {
        self(world, address)
    }
}

// ---------------------------------------------------------------------------
// MemoryLoader
// ---------------------------------------------------------------------------

/// Address → bytes, held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    sources: HashMap<String, Arc<[u8]>>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, address: impl Into<String>, bytes: impl Into<Arc<[u8]>>) {
        self.sources.insert(address.into(), bytes.into());
    }

    pub fn remove(&mut self, address: &str) -> bool {
        self.sources.remove(address).is_some()
    }

    pub fn contains(&self, address: &str) -> bool {
        self.sources.contains_key(address)
    }
}

impl ByteLoader for MemoryLoader {
    fn load(&mut self, _world: &World, address: &str) -> Option<Vec<u8>> {
        self.sources.get(address).map(|bytes| bytes.to_vec())
    }
}

// ---------------------------------------------------------------------------
// DataSource / WorldDataLoader
// ---------------------------------------------------------------------------

/// Encoded bytes published on an entity under an address.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSource {
    pub address: String,
    pub bytes: Arc<[u8]>,
}

impl DataSource {
    pub fn new(address: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            address: address.into(),
            bytes: bytes.into(),
        }
    }
}

/// Resolves addresses against [`DataSource`] components in the world. The
/// first matching entity in enumeration order wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorldDataLoader;

impl ByteLoader for WorldDataLoader {
    fn load(&mut self, world: &World, address: &str) -> Option<Vec<u8>> {
        world
            .query::<DataSource>()
            .find(|(_, source)| source.address == address)
            .map(|(_, source)| source.bytes.to_vec())
    }
}

// ---------------------------------------------------------------------------
// DirectoryLoader
// ---------------------------------------------------------------------------

/// Resolves addresses as relative paths under a root directory.
///
/// Absolute addresses and addresses that climb out of the root with `..` are
/// never read.
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    root: PathBuf,
}

impl DirectoryLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, address: &str) -> Option<PathBuf> {
        let relative = Path::new(address);
        let confined = relative
            .components()
            .all(|part| matches!(part, PathComponent::Normal(_) | PathComponent::CurDir));
        confined.then(|| self.root.join(relative))
    }
}

impl ByteLoader for DirectoryLoader {
    fn load(&mut self, _world: &World, address: &str) -> Option<Vec<u8>> {
        let Some(path) = self.resolve(address) else {
            warn!(address, root = %self.root.display(), "address escapes loader root");
            return None;
        };
        match std::fs::read(&path) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(address, path = %path.display(), error = %e, "failed to read image file");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ChainLoader
// ---------------------------------------------------------------------------

/// Asks each loader in turn; the first one with bytes wins.
#[derive(Default)]
pub struct ChainLoader {
    loaders: Vec<Box<dyn ByteLoader + Send>>,
}

impl ChainLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, loader: impl ByteLoader + Send + 'static) -> Self {
        self.loaders.push(Box::new(loader));
        self
    }

    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }
}

impl ByteLoader for ChainLoader {
    fn load(&mut self, world: &World, address: &str) -> Option<Vec<u8>> {
        self.loaders
            .iter_mut()
            .find_map(|loader| loader.load(world, address))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
