//! Poll timers.
//!
//! The orchestrator never sleeps on its own; the poll driver asks a
//! [`PollTimer`] for the next tick. Production uses [`FixedInterval`]; tests
//! drive ticks by hand with [`ManualTimer`].

use std::{future::Future, time::Duration};

use tokio::sync::mpsc;

/// Source of poll ticks.
pub trait PollTimer: Send {
  /// Wait for the next tick. Returns `false` once no further ticks will come,
  /// which ends the poll loop without an error.
  fn tick(&mut self) -> impl Future<Output = bool> + Send + '_;
}

/// Ticks forever, `period` apart. The first tick comes one full period after
/// the loop starts.
#[derive(Debug, Clone, Copy)]
pub struct FixedInterval {
  period: Duration,
}

impl FixedInterval {
  pub fn new(period: Duration) -> Self { Self { period } }

  pub fn period(&self) -> Duration { self.period }
}

impl PollTimer for FixedInterval {
  async fn tick(&mut self) -> bool {
    tokio::time::sleep(self.period).await;
    true
  }
}

/// A timer that ticks only when told to through its [`TickHandle`].
///
/// Dropping every handle exhausts the timer once queued ticks are consumed.
pub struct ManualTimer {
  rx: mpsc::UnboundedReceiver<()>,
}

#[derive(Clone)]
pub struct TickHandle {
  tx: mpsc::UnboundedSender<()>,
}

impl ManualTimer {
  pub fn new() -> (Self, TickHandle) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Self { rx }, TickHandle { tx })
  }
}

impl TickHandle {
  /// Queue `n` ticks. Returns `false` if the timer has been dropped.
  pub fn advance(&self, n: usize) -> bool {
    (0..n).all(|_| self.tx.send(()).is_ok())
  }
}

impl PollTimer for ManualTimer {
  async fn tick(&mut self) -> bool { self.rx.recv().await.is_some() }
}
