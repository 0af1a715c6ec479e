//! daw-rt: the real-time layer shared by every audio-thread subsystem —
//! the lock-free SPSC ring buffer, the control-to-audio command queue, the
//! real-time-safe logger, and the pre-allocated audio buffer pool.

mod buffer_pool;
mod command_queue;
mod logger;
mod ringbuf;

pub use buffer_pool::{BufferLease, BufferPool};
pub use command_queue::{Command, CommandQueue};
pub use logger::{RtLogEvent, RtLogger};
pub use ringbuf::RingBuffer;
