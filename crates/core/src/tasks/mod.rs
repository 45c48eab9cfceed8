//! Task queue for host thread execution
//!
//! Lets other threads (settings UI, command handlers) hand work to the host's
//! render thread. Tasks are drained at the start of every frame.

pub mod queue;

pub use queue::*;
