//! The texture request component and its lifecycle.
//!
//! ```text
//! Submitted ──▶ Loading ──▶ Loaded
//!                │  ▲
//!                └──┘ (bytes not there yet, duration < timeout)
//!                │
//!                └────────▶ NotFound
//! ```
//!
//! `Loaded` and `NotFound` are terminal. A caller restarts the cycle with
//! [`TextureRequest::resubmit`], which bumps the version.

use bitflags::bitflags;

use crate::config::DecodeFailurePolicy;

/// Where a request is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RequestStatus {
    #[default]
    Submitted,
    Loading,
    Loaded,
    NotFound,
}

impl RequestStatus {
    /// `Loaded` and `NotFound` need a resubmit to move again.
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestStatus::Loaded | RequestStatus::NotFound)
    }
}

bitflags! {
    /// Options carried by a request.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TextureFlags: u32 {
        /// Keep the source's top-down row order instead of flipping row 0 to
        /// the bottom of the image.
        const FLIP_Y = 1 << 0;
    }
}

/// Outcome of one attempt to resolve a request's address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    /// Pixels are available (cache hit or fresh decode).
    Succeeded,
    /// The loader had no bytes for the address yet.
    Unavailable,
    /// Bytes were present but could not be decoded.
    Malformed,
}

/// What a call into the state machine did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Nothing to do (terminal or not yet started).
    Idle,
    /// `Submitted -> Loading`.
    Started,
    /// `Loading -> Loaded`.
    Loaded,
    /// `Loading -> Loading`; duration accumulated.
    Waiting,
    /// `Loading -> NotFound` after the timeout elapsed.
    TimedOut,
    /// `Loading -> NotFound` straight away on a malformed image.
    Rejected,
}

/// Attached to an entity to ask for the image at `address`.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureRequest {
    pub address: String,
    pub status: RequestStatus,
    /// Seconds spent in `Loading` on failed attempts.
    pub duration: f64,
    /// Seconds of failed attempts after which the request gives up.
    pub timeout: f64,
    pub flags: TextureFlags,
    pub version: u32,
}

impl TextureRequest {
    pub fn new(address: impl Into<String>, timeout: f64) -> Self {
        Self {
            address: address.into(),
            status: RequestStatus::Submitted,
            duration: 0.0,
            timeout,
            flags: TextureFlags::empty(),
            version: 0,
        }
    }

    pub fn with_flags(mut self, flags: TextureFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Replace this request with a fresh one for `address`, restarting the
    /// lifecycle under a new version.
    pub fn resubmit(&mut self, address: impl Into<String>) {
        self.address = address.into();
        self.status = RequestStatus::Submitted;
        self.duration = 0.0;
        self.version = self.version.wrapping_add(1);
    }

    /// `Submitted -> Loading`. Does nothing in any other state.
    pub fn begin(&mut self) -> Transition {
        if self.status != RequestStatus::Submitted {
            return Transition::Idle;
        }
        self.status = RequestStatus::Loading;
        Transition::Started
    }

    /// Fold the outcome of this tick's attempt into the request.
    ///
    /// Only failed attempts accumulate `dt`; a success on the tick that would
    /// have crossed the timeout still loads.
    pub fn record_attempt(
        &mut self,
        attempt: Attempt,
        dt: f64,
        on_malformed: DecodeFailurePolicy,
    ) -> Transition {
        if self.status != RequestStatus::Loading {
            return Transition::Idle;
        }

        match attempt {
            Attempt::Succeeded => {
                self.status = RequestStatus::Loaded;
                Transition::Loaded
            }
            Attempt::Malformed if on_malformed == DecodeFailurePolicy::FailFast => {
                self.status = RequestStatus::NotFound;
                Transition::Rejected
            }
            Attempt::Unavailable | Attempt::Malformed => {
                self.duration += dt;
                if self.duration >= self.timeout {
                    self.status = RequestStatus::NotFound;
                    Transition::TimedOut
                } else {
                    Transition::Waiting
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
