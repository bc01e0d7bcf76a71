use std::pin::Pin;
use std::time::Duration;

use tokio::time::{Instant, Sleep};

/// Single-slot idle timer for the local typing indicator.
///
/// There is at most one pending deadline; `restart` moves it instead of
/// stacking a second one.
pub struct TypingDebounce {
    period: Duration,
    pending: Option<Pin<Box<Sleep>>>,
}

impl TypingDebounce {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            pending: None,
        }
    }

    pub fn restart(&mut self) {
        let deadline = Instant::now() + self.period;
        match self.pending.as_mut() {
            Some(sleep) => sleep.as_mut().reset(deadline),
            None => self.pending = Some(Box::pin(tokio::time::sleep_until(deadline))),
        }
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    #[cfg(test)]
    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    /// Resolves once the armed deadline passes, then disarms. Pends forever
    /// while disarmed, so it can sit in a `select!` unconditionally.
    ///
    /// Cancel safe: dropping the future leaves the deadline armed.
    pub async fn expired(&mut self) {
        match self.pending.as_mut() {
            Some(sleep) => {
                sleep.as_mut().await;
                self.pending = None;
            }
            None => std::future::pending::<()>().await,
        }
    }
}
