//! Content-addressed decode cache.
//!
//! The [`DecodeCache`] maps the [`Fingerprint`] of an address to the decoded
//! image for it. However many entities ask for the same address, the bytes
//! are fetched and decoded once; every later request is served the same
//! [`Arc<CachedImage>`].
//!
//! Cached images are stored in the output row order: row 0 is the *bottom*
//! of the source image. [`CachedImage::rows_top_down`] produces the other
//! orientation for requests that opt out of the flip.

use std::collections::HashSet;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use tracing::debug;

use crate::codec::{DecodedImage, ImageCodec, PngCodec};
use crate::config::EvictionPolicy;
use crate::pixel::Pixel;
use crate::TextureError;

// ---------------------------------------------------------------------------
// Fingerprint
// ---------------------------------------------------------------------------

/// Stable 64-bit hash of an address string (the first 8 bytes of its blake3
/// digest). Never a hash of the image contents.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(u64);

impl Fingerprint {
    pub fn of(address: &str) -> Self {
        let digest = blake3::hash(address.as_bytes());
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest.as_bytes()[..8]);
        Self(u64::from_le_bytes(head))
    }

    pub fn to_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({:016x})", self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

// ---------------------------------------------------------------------------
// CachedImage
// ---------------------------------------------------------------------------

/// A decoded image in output row order (row 0 = bottom).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedImage {
    width: u32,
    height: u32,
    pixels: Arc<[Pixel]>,
}

impl CachedImage {
    /// Convert a top-down decode into bottom-up pixel rows: output `(x, y)`
    /// reads source `(x, height - y - 1)`.
    pub fn from_decoded(image: &DecodedImage) -> Result<Self, TextureError> {
        image.validate()?;
        let source: &[Pixel] = bytemuck::cast_slice(&image.rgba);
        let width = image.width as usize;

        let mut pixels = Vec::with_capacity(source.len());
        if width > 0 {
            for row in source.chunks_exact(width).rev() {
                pixels.extend_from_slice(row);
            }
        }

        Ok(Self {
            width: image.width,
            height: image.height,
            pixels: pixels.into(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Pixels in output order.
    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    /// Shared handle to the pixel buffer; cloning it does not copy pixels.
    pub fn shared_pixels(&self) -> Arc<[Pixel]> {
        Arc::clone(&self.pixels)
    }

    /// A copy with the rows in source (top-down) order.
    pub fn rows_top_down(&self) -> Vec<Pixel> {
        let width = self.width as usize;
        if width == 0 {
            return Vec::new();
        }
        self.pixels
            .chunks_exact(width)
            .rev()
            .flatten()
            .copied()
            .collect()
    }
}

// ---------------------------------------------------------------------------
// CacheStats
// ---------------------------------------------------------------------------

/// Counters describing cache traffic since creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Successful decodes. At most one per address while its entry lives.
    pub decodes: u64,
    pub decode_failures: u64,
    pub evictions: u64,
}

// ---------------------------------------------------------------------------
// DecodeCache
// ---------------------------------------------------------------------------

/// Fingerprint → decoded image, with a configurable eviction policy.
pub struct DecodeCache {
    entries: LruCache<Fingerprint, Arc<CachedImage>>,
    policy: EvictionPolicy,
    codec: Box<dyn ImageCodec + Send>,
    stats: CacheStats,
}

impl fmt::Debug for DecodeCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodeCache")
            .field("entries", &self.entries.len())
            .field("policy", &self.policy)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl DecodeCache {
    /// A cache decoding PNG through the `image` crate.
    pub fn new(policy: EvictionPolicy) -> Self {
        Self::with_codec(policy, PngCodec)
    }

    pub fn with_codec(policy: EvictionPolicy, codec: impl ImageCodec + Send + 'static) -> Self {
        let entries = match policy {
            EvictionPolicy::Lru { capacity } => LruCache::new(capacity),
            EvictionPolicy::Never | EvictionPolicy::ReleaseUnreferenced => LruCache::unbounded(),
        };
        Self {
            entries,
            policy,
            codec: Box::new(codec),
            stats: CacheStats::default(),
        }
    }

    /// Return the image for `address`, decoding it on a miss.
    ///
    /// `fetch` is called at most once, and only on a miss. `Ok(None)` means
    /// the bytes were not available this attempt and the caller should try
    /// again later. A malformed image is an `Err` for this attempt only;
    /// nothing is cached for it.
    pub fn get_or_decode(
        &mut self,
        address: &str,
        fetch: impl FnOnce(&str) -> Option<Vec<u8>>,
    ) -> Result<Option<Arc<CachedImage>>, TextureError> {
        if address.is_empty() {
            return Err(TextureError::EmptyAddress);
        }

        let fingerprint = Fingerprint::of(address);
        if let Some(image) = self.entries.get(&fingerprint) {
            self.stats.hits += 1;
            return Ok(Some(Arc::clone(image)));
        }
        self.stats.misses += 1;

        let Some(bytes) = fetch(address) else {
            return Ok(None);
        };

        let image = match self
            .codec
            .decode(&bytes)
            .and_then(|decoded| CachedImage::from_decoded(&decoded))
        {
            Ok(image) => Arc::new(image),
            Err(e) => {
                self.stats.decode_failures += 1;
                return Err(e);
            }
        };
        self.stats.decodes += 1;
        debug!(
            address,
            fingerprint = %fingerprint,
            width = image.width(),
            height = image.height(),
            "decoded image"
        );

        if let Some((evicted, _)) = self.entries.push(fingerprint, Arc::clone(&image)) {
            if evicted != fingerprint {
                self.stats.evictions += 1;
                debug!(fingerprint = %evicted, "evicted least recently used image");
            }
        }
        Ok(Some(image))
    }

    /// Whether an image for `address` is cached. Does not touch recency.
    pub fn contains(&self, address: &str) -> bool {
        self.entries.contains(&Fingerprint::of(address))
    }

    /// Drop the entry for `address`, if any.
    pub fn evict(&mut self, address: &str) -> bool {
        let removed = self.entries.pop(&Fingerprint::of(address)).is_some();
        if removed {
            self.stats.evictions += 1;
        }
        removed
    }

    /// Drop every entry whose fingerprint is not in `live`. Returns how many
    /// were dropped.
    pub fn retain_referenced(&mut self, live: &HashSet<Fingerprint>) -> usize {
        let stale: Vec<Fingerprint> = self
            .entries
            .iter()
            .map(|(fingerprint, _)| *fingerprint)
            .filter(|fingerprint| !live.contains(fingerprint))
            .collect();
        for fingerprint in &stale {
            self.entries.pop(fingerprint);
            debug!(fingerprint = %fingerprint, "released unreferenced image");
        }
        self.stats.evictions += stale.len() as u64;
        stale.len()
    }

    pub fn clear(&mut self) {
        self.stats.evictions += self.entries.len() as u64;
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Upper bound on entries, if the policy has one.
    pub fn capacity(&self) -> Option<NonZeroUsize> {
        match self.policy {
            EvictionPolicy::Lru { capacity } => Some(capacity),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
