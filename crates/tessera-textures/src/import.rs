//! The import driver.
//!
//! [`TextureImportSystem`] is the [`System`] that walks every
//! [`TextureRequest`] once per tick, asks the [`DecodeCache`] for the image
//! of each request that is loading, and records the resulting texture and
//! request updates in the tick's [`MutationBuffer`]. Nothing is written to
//! the world during the scan.

use std::collections::HashSet;

use tessera_ecs::prelude::*;
use tracing::{debug, error, info, warn};

use crate::cache::{DecodeCache, Fingerprint};
use crate::codec::ImageCodec;
use crate::config::{EvictionPolicy, ImportConfig};
use crate::loader::{ByteLoader, MemoryLoader};
use crate::pixel::Pixel;
use crate::request::{Attempt, RequestStatus, TextureFlags, TextureRequest, Transition};
use crate::texture::Texture;
use crate::TextureError;

/// Resolves [`TextureRequest`]s into [`Texture`] components and pixel arrays.
pub struct TextureImportSystem<L = MemoryLoader> {
    loader: L,
    cache: DecodeCache,
    config: ImportConfig,
}

impl<L: ByteLoader> TextureImportSystem<L> {
    /// An importer with the default configuration and the PNG codec.
    pub fn new(loader: L) -> Self {
        Self::with_config(loader, ImportConfig::default())
    }

    pub fn with_config(loader: L, config: ImportConfig) -> Self {
        let cache = DecodeCache::new(config.eviction);
        Self {
            loader,
            cache,
            config,
        }
    }

    /// An importer decoding through `codec` instead of PNG.
    pub fn with_codec(
        loader: L,
        config: ImportConfig,
        codec: impl ImageCodec + Send + 'static,
    ) -> Self {
        let cache = DecodeCache::with_codec(config.eviction, codec);
        Self {
            loader,
            cache,
            config,
        }
    }

    pub fn cache(&self) -> &DecodeCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut DecodeCache {
        &mut self.cache
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn loader_mut(&mut self) -> &mut L {
        &mut self.loader
    }

    /// A request for `address` using the configured default timeout.
    pub fn request(&self, address: impl Into<String>) -> TextureRequest {
        TextureRequest::new(address, self.config.default_timeout)
    }

    /// Run one tick against `world` and apply the result immediately.
    ///
    /// For callers without a tick loop; inside one, register the system and
    /// let the loop flush.
    pub fn update(&mut self, world: &mut World, dt: f64) -> ApplyReport {
        let mut mutations = MutationBuffer::new();
        self.run(world, &mut mutations, dt);
        mutations.flush(world)
    }

    /// Try to resolve `request.address` for this attempt.
    fn attempt(&mut self, world: &World, entity: EntityId, request: &TextureRequest) -> Outcome {
        let loader = &mut self.loader;
        match self
            .cache
            .get_or_decode(&request.address, |address| loader.load(world, address))
        {
            Ok(Some(image)) => {
                let pixels: std::sync::Arc<[Pixel]> =
                    if request.flags.contains(TextureFlags::FLIP_Y) {
                        image.rows_top_down().into()
                    } else {
                        image.shared_pixels()
                    };
                Outcome::Decoded {
                    width: image.width(),
                    height: image.height(),
                    pixels,
                }
            }
            Ok(None) => Outcome::Failed(Attempt::Unavailable),
            Err(TextureError::EmptyAddress) => {
                debug!(entity = %entity, "request has an empty address");
                Outcome::Failed(Attempt::Unavailable)
            }
            Err(e) => {
                warn!(
                    entity = %entity,
                    address = %request.address,
                    error = %e,
                    "failed to decode image"
                );
                Outcome::Failed(Attempt::Malformed)
            }
        }
    }

    /// Drop cached images no request refers to any more.
    fn release_unreferenced(&mut self, world: &World) {
        let live: HashSet<Fingerprint> = world
            .query::<TextureRequest>()
            .map(|(_, request)| Fingerprint::of(&request.address))
            .collect();
        let released = self.cache.retain_referenced(&live);
        if released > 0 {
            debug!(released, remaining = self.cache.len(), "released cached images");
        }
    }
}

impl Default for TextureImportSystem<MemoryLoader> {
    fn default() -> Self {
        Self::new(MemoryLoader::new())
    }
}

enum Outcome {
    Decoded {
        width: u32,
        height: u32,
        pixels: std::sync::Arc<[Pixel]>,
    },
    Failed(Attempt),
}

impl<L: ByteLoader> System for TextureImportSystem<L> {
    fn run(&mut self, world: &World, mutations: &mut MutationBuffer, dt: f64) {
        for (entity, current) in world.query::<TextureRequest>() {
            if current.status.is_terminal() {
                continue;
            }

            let mut request = current.clone();
            if request.begin() == Transition::Started {
                debug!(
                    entity = %entity,
                    address = %request.address,
                    "started searching for texture"
                );
            }
            if request.status != RequestStatus::Loading {
                continue;
            }

            match self.attempt(world, entity, &request) {
                Outcome::Decoded {
                    width,
                    height,
                    pixels,
                } => {
                    request.record_attempt(Attempt::Succeeded, dt, self.config.decode_failure);
                    let version = world
                        .get_component::<Texture>(entity)
                        .map_or(0, |texture| texture.version)
                        .wrapping_add(1);
                    info!(
                        entity = %entity,
                        address = %request.address,
                        width,
                        height,
                        version,
                        "texture loaded"
                    );
                    mutations
                        .select(entity)
                        .set_or_add_component(Texture {
                            width,
                            height,
                            version,
                        })
                        .create_or_resize_array::<Pixel>(pixels)
                        .set_or_add_component(request);
                }
                Outcome::Failed(attempt) => {
                    match request.record_attempt(attempt, dt, self.config.decode_failure) {
                        Transition::TimedOut => error!(
                            entity = %entity,
                            address = %request.address,
                            duration = request.duration,
                            timeout = request.timeout,
                            "texture not found before timeout"
                        ),
                        Transition::Rejected => error!(
                            entity = %entity,
                            address = %request.address,
                            "texture bytes could not be decoded"
                        ),
                        _ => {}
                    }
                    if request != *current {
                        mutations.select(entity).set_or_add_component(request);
                    }
                }
            }
        }

        if self.config.eviction == EvictionPolicy::ReleaseUnreferenced {
            self.release_unreferenced(world);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
