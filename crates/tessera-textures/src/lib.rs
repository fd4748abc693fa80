//! Tessera Textures -- tick-driven texture import on top of `tessera-ecs`.
//!
//! An entity asks for an image by carrying a [`TextureRequest`] with an
//! address. Each tick the [`TextureImportSystem`] resolves the address
//! through a [`ByteLoader`], decodes it at most once per address in the
//! [`DecodeCache`], and publishes a [`Texture`] component plus a [`Pixel`]
//! array back onto the entity through the tick's mutation buffer. Missing
//! bytes are retried on later ticks until the request's timeout runs out.
//!
//! # Quick Start
//!
//! ```no_run
//! use tessera_ecs::prelude::*;
//! use tessera_textures::prelude::*;
//!
//! let mut world = World::new();
//! register_texture_types(&mut world);
//!
//! let mut loader = MemoryLoader::new();
//! loader.insert("logo", std::fs::read("logo.png").unwrap());
//! let mut importer = TextureImportSystem::new(loader);
//!
//! let entity = spawn_texture_request(&mut world, importer.request("logo")).unwrap();
//! importer.update(&mut world, 1.0 / 60.0);
//!
//! let texture = world.get_component::<Texture>(entity).unwrap();
//! println!("{}x{}", texture.width, texture.height);
//! ```
//!
//! [`TextureRequest`]: request::TextureRequest
//! [`TextureImportSystem`]: import::TextureImportSystem
//! [`ByteLoader`]: loader::ByteLoader
//! [`DecodeCache`]: cache::DecodeCache
//! [`Texture`]: texture::Texture
//! [`Pixel`]: pixel::Pixel

#![deny(unsafe_code)]

pub mod cache;
pub mod codec;
pub mod config;
pub mod import;
pub mod loader;
pub mod pixel;
pub mod request;
pub mod sample;
pub mod texture;

use tessera_ecs::EcsError;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by the import pipeline and its helpers.
#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    /// A request or cache lookup with an empty address.
    #[error("texture address is empty")]
    EmptyAddress,

    /// The codec rejected the bytes.
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    /// A decoded image whose buffer does not match its dimensions.
    #[error("malformed image: {0}")]
    Malformed(String),

    /// Configuration JSON that does not parse.
    #[error("invalid import configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// Configuration that parses but holds unusable values.
    #[error("invalid import configuration: {0}")]
    InvalidConfig(String),

    /// A pixel buffer whose length is not `width * height`.
    #[error("{width}x{height} texture given {actual} pixels")]
    PixelCountMismatch { width: u32, height: u32, actual: usize },

    /// The entity store refused an operation.
    #[error(transparent)]
    Store(#[from] EcsError),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::cache::{CacheStats, CachedImage, DecodeCache, Fingerprint};
    pub use crate::codec::{DecodedImage, ImageCodec, PngCodec};
    pub use crate::config::{DecodeFailurePolicy, EvictionPolicy, ImportConfig};
    pub use crate::import::TextureImportSystem;
    pub use crate::loader::{
        ByteLoader, ChainLoader, DataSource, DirectoryLoader, MemoryLoader, WorldDataLoader,
    };
    pub use crate::pixel::Pixel;
    pub use crate::request::{RequestStatus, TextureFlags, TextureRequest};
    pub use crate::texture::{register_texture_types, spawn_texture, spawn_texture_request, Texture};
    pub use crate::TextureError;
}
