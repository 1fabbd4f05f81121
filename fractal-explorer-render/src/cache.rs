use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::image::Image;
use crate::request::{Fingerprint, RenderRequest};

/// Proof that a render was started against a particular cache generation.
///
/// Only the most recently issued ticket can store its image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTicket(u64);

#[derive(Debug, Default)]
struct CacheState {
    fingerprint: Option<Fingerprint>,
    image: Option<Arc<Image>>,
    dirty: bool,
    invalidated: bool,
    generation: u64,
}

/// The last good image plus the bookkeeping that decides when to redraw.
///
/// All fields sit behind one mutex, so the fingerprint, image and flags are
/// always observed together.
#[derive(Debug, Default)]
pub struct RenderCache {
    state: Mutex<CacheState>,
}

impl RenderCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // The state stays consistent across a panic, so a poisoned lock is
        // still usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Whether `request` needs rendering.
    ///
    /// Records the request's fingerprint, so calling this twice with the same
    /// request and nothing else in between answers `true` then `false`.
    pub fn is_dirty(&self, request: &RenderRequest) -> bool {
        let fingerprint = request.fingerprint();
        let mut state = self.lock();
        let changed = state.fingerprint != Some(fingerprint);
        let dirty = changed || state.invalidated;
        state.fingerprint = Some(fingerprint);
        state.invalidated = false;
        state.dirty = dirty;
        dirty
    }

    /// Force the next [`is_dirty`](Self::is_dirty) to answer `true`.
    pub fn invalidate(&self) {
        let mut state = self.lock();
        state.invalidated = true;
        state.dirty = true;
    }

    pub fn image(&self) -> Option<Arc<Image>> {
        self.lock().image.clone()
    }

    /// Store a finished image unconditionally and clear the dirty flag.
    pub fn set_image(&self, image: Image) {
        let mut state = self.lock();
        state.image = Some(Arc::new(image));
        state.dirty = false;
    }

    /// Whether the stored image lags behind the last checked request.
    pub fn is_stale(&self) -> bool {
        self.lock().dirty
    }

    /// Start a render, superseding every ticket issued before.
    pub fn begin_render(&self) -> RenderTicket {
        let mut state = self.lock();
        state.generation += 1;
        RenderTicket(state.generation)
    }

    /// Store `image` if `ticket` is still the latest one. Returns whether the
    /// image was accepted.
    pub fn complete(&self, ticket: RenderTicket, image: Image) -> bool {
        let mut state = self.lock();
        if ticket.0 != state.generation {
            debug!(
                ticket = ticket.0,
                current = state.generation,
                "Dropping superseded render"
            );
            return false;
        }
        state.image = Some(Arc::new(image));
        state.dirty = false;
        true
    }

    /// Give up on a render that will never complete. If it was the latest
    /// one, the next [`is_dirty`](Self::is_dirty) answers `true` so the
    /// request is retried; the previous image stays in place.
    pub fn abandon(&self, ticket: RenderTicket) -> bool {
        let mut state = self.lock();
        if ticket.0 != state.generation {
            return false;
        }
        state.invalidated = true;
        state.dirty = true;
        true
    }
}
