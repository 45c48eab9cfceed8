//! Process-owned text buffers handed to the host
//!
//! The host's string arrays hold raw pointers. Rewritten slots point at
//! buffers owned here; a buffer lives until its slot is written again.

use std::collections::HashMap;

use parking_lot::Mutex;

use super::MemoryError;

/// Owner of NUL-terminated strings referenced from host memory
///
/// Buffers are keyed by `(owner address, slot)`. Storing into a slot frees
/// the buffer previously stored there.
pub struct TextArena {
    max_bytes: usize,
    buffers: Mutex<HashMap<(usize, usize), Box<[u8]>>>,
}

impl TextArena {
    /// `max_bytes` bounds every stored string, terminator included
    pub fn new(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            buffers: Mutex::new(HashMap::new()),
        }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Check that `bytes` can be stored as a host string
    pub fn validate(&self, bytes: &[u8]) -> Result<(), MemoryError> {
        if bytes.contains(&0) {
            return Err(MemoryError::InteriorNul);
        }
        let len = bytes.len() + 1;
        if len > self.max_bytes {
            return Err(MemoryError::TooLong {
                len,
                max: self.max_bytes,
            });
        }
        Ok(())
    }

    /// Store a NUL-terminated copy of `bytes` for `(owner, slot)`
    ///
    /// The returned pointer stays valid until the same key is stored again
    /// or the arena is cleared.
    pub fn store(&self, owner: usize, slot: usize, bytes: &[u8]) -> Result<*const u8, MemoryError> {
        self.validate(bytes)?;

        let mut buffer = Vec::with_capacity(bytes.len() + 1);
        buffer.extend_from_slice(bytes);
        buffer.push(0);
        let buffer = buffer.into_boxed_slice();
        let ptr = buffer.as_ptr();

        self.buffers.lock().insert((owner, slot), buffer);
        Ok(ptr)
    }

    /// Number of live buffers
    pub fn len(&self) -> usize {
        self.buffers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.lock().is_empty()
    }
}

impl Drop for TextArena {
    fn drop(&mut self) {
        // Host structures may still point at these after unload
        for (_, buffer) in self.buffers.get_mut().drain() {
            let _ = Box::leak(buffer);
        }
    }
}
