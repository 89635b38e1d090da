//! Feed clock: timestamps plus the interruptible wait between records.
//!
//! The loop never sleeps directly. It asks its FeedClock to wait, and the
//! clock reports whether the full pause elapsed or a stop arrived first.
//! WallClock waits in real time on a stop channel; ManualClock advances
//! virtual time instantly for tests.

use chrono::{Local, NaiveDateTime};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

/// Result of one interruptible wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    Elapsed,
    Interrupted,
}

pub trait FeedClock {
    /// Timestamp for a record generated now.
    fn now(&self) -> NaiveDateTime;

    /// Pause for `duration` unless a stop is requested first.
    fn wait(&mut self, duration: Duration) -> Wait;

    /// True once a stop has been requested. Never blocks.
    fn stop_requested(&mut self) -> bool;
}

/// Create a linked stop handle / stop signal pair.
pub fn stop_channel() -> (StopHandle, StopSignal) {
    let (tx, rx) = mpsc::channel();
    (StopHandle { tx }, StopSignal { rx, stopped: false })
}

/// Sending side, held by whatever observes the interrupt.
#[derive(Clone, Debug)]
pub struct StopHandle {
    tx: Sender<()>,
}

impl StopHandle {
    /// Request a stop. Idempotent; a stop after the loop has exited is ignored.
    pub fn stop(&self) {
        let _ = self.tx.send(());
    }
}

/// Receiving side, owned by the clock. Dropping every StopHandle also
/// counts as a stop, so an orphaned feed cannot wait forever.
#[derive(Debug)]
pub struct StopSignal {
    rx: Receiver<()>,
    stopped: bool,
}

impl StopSignal {
    pub fn wait_timeout(&mut self, duration: Duration) -> Wait {
        if self.stopped {
            return Wait::Interrupted;
        }
        match self.rx.recv_timeout(duration) {
            Err(RecvTimeoutError::Timeout) => Wait::Elapsed,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                self.stopped = true;
                Wait::Interrupted
            }
        }
    }

    pub fn is_stopped(&mut self) -> bool {
        if !self.stopped {
            match self.rx.try_recv() {
                Err(TryRecvError::Empty) => {}
                Ok(()) | Err(TryRecvError::Disconnected) => self.stopped = true,
            }
        }
        self.stopped
    }
}

/// Real time, local timestamps.
pub struct WallClock {
    signal: StopSignal,
}

impl WallClock {
    pub fn new(signal: StopSignal) -> Self {
        Self { signal }
    }
}

impl FeedClock for WallClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn wait(&mut self, duration: Duration) -> Wait {
        self.signal.wait_timeout(duration)
    }

    fn stop_requested(&mut self) -> bool {
        self.signal.is_stopped()
    }
}

/// Deterministic clock for tests: waits return instantly and advance
/// virtual time by the requested duration.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: NaiveDateTime,
    waits: Vec<Duration>,
    interrupt_after: Option<usize>,
}

impl ManualClock {
    pub fn starting_at(now: NaiveDateTime) -> Self {
        Self {
            now,
            waits: Vec::new(),
            interrupt_after: None,
        }
    }

    /// The `n`th wait (1-based) reports Interrupted, as if a stop signal
    /// arrived during that pause. Later waits stay interrupted.
    pub fn interrupt_after(mut self, n: usize) -> Self {
        self.interrupt_after = Some(n);
        self
    }

    /// Every duration the feed asked to wait for, in order.
    pub fn waits(&self) -> &[Duration] {
        &self.waits
    }

    fn interrupted(&self) -> bool {
        matches!(self.interrupt_after, Some(n) if self.waits.len() >= n)
    }
}

impl FeedClock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        self.now
    }

    fn wait(&mut self, duration: Duration) -> Wait {
        if self.interrupted() {
            return Wait::Interrupted;
        }
        self.waits.push(duration);
        if self.interrupted() {
            return Wait::Interrupted;
        }
        // Virtual time stops advancing past chrono's representable range.
        if let Some(next) = chrono::Duration::from_std(duration)
            .ok()
            .and_then(|d| self.now.checked_add_signed(d))
        {
            self.now = next;
        }
        Wait::Elapsed
    }

    fn stop_requested(&mut self) -> bool {
        self.interrupted()
    }
}
