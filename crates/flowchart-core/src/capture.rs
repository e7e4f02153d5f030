//! Capturing the current diagram text from the host editor.
//!
//! The editor answers a read request immediately, but right after an edit the
//! answer can be empty. The capture reads once, and if that yields nothing
//! usable waits `retry_delay` and reads exactly once more.
//!
//! ```text
//! Idle -> AwaitingFirstRead -> Resolved
//!                           -> AwaitingRetry -> Resolved
//!                                            -> Failed
//! ```
//!
//! Time comes from an injected [`Clock`], so the delay is testable without
//! sleeping.

use std::time::{Duration, Instant};

pub trait Clock {
    /// Monotonic time since an arbitrary fixed origin.
    fn now(&self) -> Duration;
}

/// Wall clock measured from construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// The host editor's "give me the current document" call.
pub trait SnapshotSource {
    fn read_snapshot(&mut self) -> Option<String>;
}

impl<F> SnapshotSource for F
where
    F: FnMut() -> Option<String>,
{
    fn read_snapshot(&mut self) -> Option<String> {
        self()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    AwaitingFirstRead,
    AwaitingRetry { retry_at: Duration },
    Resolved(String),
    Failed,
}

impl CaptureState {
    pub fn is_finished(&self) -> bool {
        matches!(self, CaptureState::Resolved(_) | CaptureState::Failed)
    }
}

#[derive(Debug)]
pub struct Capture<C> {
    clock: C,
    retry_delay: Duration,
    state: CaptureState,
}

impl<C: Clock> Capture<C> {
    pub fn new(clock: C, retry_delay: Duration) -> Self {
        Self {
            clock,
            retry_delay,
            state: CaptureState::Idle,
        }
    }

    pub fn state(&self) -> &CaptureState {
        &self.state
    }

    /// Idle -> AwaitingFirstRead. Restarts a finished capture.
    pub fn start(&mut self) {
        if matches!(self.state, CaptureState::Idle) || self.state.is_finished() {
            self.state = CaptureState::AwaitingFirstRead;
        }
    }

    /// Advance as far as the current time allows; reads `source` at most once.
    pub fn poll(&mut self, source: &mut dyn SnapshotSource) -> &CaptureState {
        let now = self.clock.now();
        let next = match self.state {
            CaptureState::AwaitingFirstRead => Some(match usable(source.read_snapshot()) {
                Some(text) => CaptureState::Resolved(text),
                None => CaptureState::AwaitingRetry {
                    retry_at: now + self.retry_delay,
                },
            }),
            CaptureState::AwaitingRetry { retry_at } if now >= retry_at => {
                Some(match usable(source.read_snapshot()) {
                    Some(text) => CaptureState::Resolved(text),
                    None => {
                        tracing::warn!("editor returned no diagram text after retry");
                        CaptureState::Failed
                    }
                })
            }
            _ => None,
        };
        if let Some(next) = next {
            self.state = next;
        }
        &self.state
    }

    /// Time left before the retry read is due, if one is pending.
    pub fn retry_in(&self) -> Option<Duration> {
        match self.state {
            CaptureState::AwaitingRetry { retry_at } => {
                Some(retry_at.saturating_sub(self.clock.now()))
            }
            _ => None,
        }
    }
}

fn usable(text: Option<String>) -> Option<String> {
    text.filter(|text| !text.trim().is_empty())
}

/// Drive a capture to completion, sleeping through the retry delay.
pub fn capture_blocking(
    source: &mut dyn SnapshotSource,
    retry_delay: Duration,
) -> Option<String> {
    let mut capture = Capture::new(SystemClock::default(), retry_delay);
    capture.start();
    loop {
        match capture.poll(source) {
            CaptureState::Resolved(text) => return Some(text.clone()),
            CaptureState::Failed => return None,
            _ => {}
        }
        if let Some(wait) = capture.retry_in() {
            std::thread::sleep(wait);
        }
    }
}
