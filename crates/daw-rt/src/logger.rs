//! Real-time-safe logging: the audio thread never calls into the `log`
//! facade directly (formatting and the global logger's backend may
//! allocate or lock). Instead it pushes pre-formatted events onto a ring
//! buffer that a control-thread pump drains into `log::log!`.

use crate::ringbuf::RingBuffer;
use log::Level;

#[derive(Debug, Clone)]
pub struct RtLogEvent {
    pub level: Level,
    pub message: String,
}

/// Audio-thread-safe logger. `log_*` methods are real-time safe as long as
/// `message` is a `&'static str` or otherwise pre-built — building the
/// `String` still allocates, so callers on the hot path should prefer the
/// `'static` constants path and only format rarely (e.g. once on a state
/// transition, not every block).
pub struct RtLogger {
    ring: RingBuffer<RtLogEvent>,
}

impl RtLogger {
    pub fn new(capacity: usize) -> Self {
        Self { ring: RingBuffer::new(capacity) }
    }

    /// Audio thread: enqueue an event. Drops silently if the queue is full
    /// rather than block or allocate further — a saturated log queue means
    /// the control thread has fallen behind, and that is itself something
    /// the next successfully-queued event will eventually reveal.
    pub fn log(&self, level: Level, message: impl Into<String>) {
        let _ = self.ring.try_push(RtLogEvent { level, message: message.into() });
    }

    pub fn trace(&self, message: impl Into<String>) {
        self.log(Level::Trace, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(Level::Warn, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(Level::Error, message);
    }

    /// Control thread: drain every pending event through the `log` facade.
    /// Call this periodically (e.g. once per UI tick) from a non-real-time
    /// context.
    pub fn pump(&self) -> usize {
        let mut n = 0;
        while let Some(event) = self.ring.try_pop() {
            log::log!(event.level, "{}", event.message);
            n += 1;
        }
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropped_events_dont_panic_when_queue_is_full() {
        let logger = RtLogger::new(2);
        for i in 0..100 {
            logger.warn(format!("event {i}"));
        }
        assert!(logger.ring.len() <= 2);
        let drained = logger.pump();
        assert!(drained <= 2);
    }
}
