//! Host memory access
//!
//! The host's structures have no stable typed layout; they are treated as
//! byte regions whose field offsets come from gamedata. Everything in this
//! module that dereferences host pointers is bounds-checked against the sizes
//! the host reports at runtime.

mod arena;
mod arrays;
mod markers;
pub mod sestring;

#[cfg(test)]
pub(crate) mod testing;

pub use arena::TextArena;
pub use arrays::{read_field, ArrayLayout, NumberArray, StringArray};
pub use markers::preserve_markers;
pub use sestring::{SeString, Segment};

/// Errors raised by host memory reads and writes
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MemoryError {
    #[error("Null host buffer")]
    NullBuffer,

    #[error("Index {index} out of range for array of {len}")]
    OutOfRange { index: usize, len: usize },

    #[error("Encoded text of {len} bytes exceeds the {max} byte limit")]
    TooLong { len: usize, max: usize },

    #[error("Text contains an interior NUL byte")]
    InteriorNul,

    #[error("Malformed formatted text: {0}")]
    Malformed(String),
}
