//! Incremental token rendering.
//!
//! The transcript stays the single source of truth for what was said; a
//! [`TokenSink`] only mirrors streamed text to a display as it arrives, so
//! rendering is injectable and tests can capture output without a terminal.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

/// Receives streamed chat output as it is applied to the transcript.
pub trait TokenSink: Send + Sync {
    /// One streamed text fragment, already appended to the transcript.
    fn token(&self, delta: &str);

    /// The stream reached a terminal state. Called exactly once per session.
    fn finished(&self);
}

/// Prints fragments to stdout as they arrive.
#[derive(Default)]
pub struct StdoutTokens {
    wrote: AtomicBool,
}

impl StdoutTokens {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenSink for StdoutTokens {
    fn token(&self, delta: &str) {
        self.wrote.store(true, Ordering::Relaxed);
        let mut out = std::io::stdout().lock();
        let _ = out.write_all(delta.as_bytes());
        let _ = out.flush();
    }

    fn finished(&self) {
        // Terminate the streamed line, but only if anything was printed.
        if self.wrote.swap(false, Ordering::Relaxed) {
            println!();
        }
    }
}

/// Swallows all output. For callers that only read the transcript.
pub struct NullTokens;

impl TokenSink for NullTokens {
    fn token(&self, _delta: &str) {}
    fn finished(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Capture(Mutex<String>);

    impl TokenSink for Capture {
        fn token(&self, delta: &str) {
            self.0.lock().unwrap().push_str(delta);
        }
        fn finished(&self) {}
    }

    #[test]
    fn test_sink_receives_tokens_in_order() {
        let sink = Capture(Mutex::new(String::new()));
        sink.token("Hel");
        sink.token("lo");
        assert_eq!(*sink.0.lock().unwrap(), "Hello");
    }
}
