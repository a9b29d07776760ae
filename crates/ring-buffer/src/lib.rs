//! Bounded Ring Buffer
//!
//! Keeps the most recent N entries of a history, evicting the oldest on overflow.

mod buffer;

pub use buffer::RingBuffer;
