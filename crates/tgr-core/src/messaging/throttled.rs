use std::{path::Path, sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::{
    domain::MessageRef,
    messaging::{
        port::MessengerPort,
        types::{Button, MessagingCapabilities},
    },
    Result,
};

#[derive(Debug)]
struct IntervalLimiter {
    interval: Duration,
    next: Instant,
}

impl IntervalLimiter {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now(),
        }
    }

    /// Reserve the next slot and return the wait duration required before executing.
    fn reserve(&mut self) -> Duration {
        let now = Instant::now();
        let start = if now >= self.next { now } else { self.next };
        self.next = start + self.interval;
        start.saturating_duration_since(now)
    }
}

/// MessengerPort decorator that spaces out outbound calls.
///
/// Sends and clicks share one limiter since they land in the same chat.
/// Downloads are not throttled.
pub struct ThrottledMessenger {
    inner: Arc<dyn MessengerPort>,
    limiter: Mutex<IntervalLimiter>,
}

impl ThrottledMessenger {
    pub fn new(inner: Arc<dyn MessengerPort>, min_interval: Duration) -> Self {
        Self {
            inner,
            limiter: Mutex::new(IntervalLimiter::new(min_interval)),
        }
    }

    async fn throttle(&self) {
        let wait = { self.limiter.lock().await.reserve() };
        if wait > Duration::ZERO {
            sleep(wait).await;
        }
    }
}

#[async_trait::async_trait]
impl MessengerPort for ThrottledMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        self.inner.capabilities()
    }

    async fn send_text(&self, text: &str) -> Result<MessageRef> {
        self.throttle().await;
        self.inner.send_text(text).await
    }

    async fn click_button(&self, msg: MessageRef, button: &Button) -> Result<()> {
        self.throttle().await;
        self.inner.click_button(msg, button).await
    }

    async fn download_attachment(&self, msg: MessageRef, dest: &Path) -> Result<u64> {
        self.inner.download_attachment(msg, dest).await
    }
}
