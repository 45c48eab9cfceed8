//! Per-frame scheduling
//!
//! The host calls [`on_frame`] once per render tick. Work that must wait for
//! the host UI to settle is registered here as a frame callback instead of
//! running on a background thread.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use slotmap::{new_key_type, SlotMap};

use crate::tasks;

new_key_type! {
    /// Key for registered frame callbacks
    pub struct FrameKey;
}

/// Whether a frame callback wants to run again
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameControl {
    Continue,
    Done,
}

/// Callback type for frame listeners, called with the current frame number
pub type FrameCallback = Box<dyn FnMut(u64) -> FrameControl + Send>;

type SharedCallback = Arc<Mutex<FrameCallback>>;

/// Frames slower than this are reported
const SLOW_FRAME_NS: u64 = 1_000_000;

/// Registry of callbacks run once per frame
pub struct FrameScheduler {
    callbacks: RwLock<SlotMap<FrameKey, SharedCallback>>,
    frame: AtomicU64,
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self {
            callbacks: RwLock::new(SlotMap::with_key()),
            frame: AtomicU64::new(0),
        }
    }

    /// Register a callback to run every frame until it returns
    /// [`FrameControl::Done`] or is unregistered
    pub fn register<F>(&self, callback: F) -> FrameKey
    where
        F: FnMut(u64) -> FrameControl + Send + 'static,
    {
        self.callbacks
            .write()
            .insert(Arc::new(Mutex::new(Box::new(callback))))
    }

    /// Unregister a frame callback
    ///
    /// # Returns
    /// `true` if the callback was found and removed
    pub fn unregister(&self, key: FrameKey) -> bool {
        self.callbacks.write().remove(key).is_some()
    }

    pub fn is_registered(&self, key: FrameKey) -> bool {
        self.callbacks.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.callbacks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.read().is_empty()
    }

    /// Run `action` once, `frames` ticks from now, then deregister
    ///
    /// A zero delay runs on the next tick.
    pub fn defer_frames<F>(&self, frames: u32, action: F) -> FrameKey
    where
        F: FnOnce() + Send + 'static,
    {
        let mut remaining = frames;
        let mut action = Some(action);

        self.register(move |_| {
            remaining = remaining.saturating_sub(1);
            if remaining > 0 {
                return FrameControl::Continue;
            }
            if let Some(action) = action.take() {
                action();
            }
            FrameControl::Done
        })
    }

    /// Frames ticked so far
    pub fn frame_count(&self) -> u64 {
        self.frame.load(Ordering::Relaxed)
    }

    /// Advance one frame and run every registered callback
    ///
    /// Callbacks may register or unregister others; one unregistered earlier
    /// in the same tick does not run.
    pub fn tick(&self) -> u64 {
        let frame = self.frame.fetch_add(1, Ordering::Relaxed) + 1;

        let snapshot: Vec<(FrameKey, SharedCallback)> = self
            .callbacks
            .read()
            .iter()
            .map(|(key, callback)| (key, callback.clone()))
            .collect();

        for (key, callback) in snapshot {
            if !self.is_registered(key) {
                continue;
            }

            let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
                let mut callback = callback.lock();
                (*callback)(frame)
            }));
            match result {
                Ok(FrameControl::Continue) => {}
                Ok(FrameControl::Done) => {
                    self.unregister(key);
                }
                Err(_) => {
                    tracing::error!("Frame callback panicked on frame {}, removing it", frame);
                    self.unregister(key);
                }
            }
        }

        frame
    }
}

/// Called by the host once per render tick
pub fn on_frame(scheduler: &FrameScheduler) {
    let start = std::time::Instant::now();

    let tasks_processed = tasks::process_queued_tasks();
    if tasks_processed > 0 {
        tracing::trace!("Processed {} queued tasks", tasks_processed);
    }

    let frame = scheduler.tick();

    let elapsed = start.elapsed().as_nanos() as u64;

    if elapsed > SLOW_FRAME_NS {
        tracing::warn!("Frame took {}ms (frame {})", elapsed / 1_000_000, frame);
    }
}
