//! In-process device link
//!
//! `MemoryLink` records every message it is handed, optionally after an
//! artificial per-send delay, and can be switched into a failing state.
//! It backs the loopback demo and the engine-level tests: the delay makes
//! backpressure reproducible, the failure switch makes the fatal-error path
//! reachable without a real device.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::LinkError;

use super::device::DeviceLink;
use super::message::FrameHeader;

/// One recorded send
#[derive(Debug, Clone)]
pub struct SentMessage {
    /// Message header as handed to the link
    pub header: FrameHeader,
    /// Message payload
    pub payload: Bytes,
}

/// Shared view of everything a [`MemoryLink`] has sent
///
/// Clone it before handing the link to the engine; the link itself moves
/// into the transport worker.
#[derive(Debug, Clone, Default)]
pub struct SentLog {
    messages: Arc<Mutex<Vec<SentMessage>>>,
}

impl SentLog {
    /// Number of messages sent so far
    pub fn len(&self) -> usize {
        self.messages.lock().map(|m| m.len()).unwrap_or(0)
    }

    /// Whether nothing has been sent yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of all recorded messages
    pub fn messages(&self) -> Vec<SentMessage> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }

    fn push(&self, message: SentMessage) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message);
        }
    }
}

/// In-process [`DeviceLink`] for tests and local loopback
#[derive(Debug)]
pub struct MemoryLink {
    log: SentLog,
    send_delay: Duration,
    failing: Arc<AtomicBool>,
}

impl MemoryLink {
    /// Create a link that accepts every message immediately
    pub fn new() -> Self {
        Self {
            log: SentLog::default(),
            send_delay: Duration::ZERO,
            failing: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Delay every send by `delay` (simulates a slow transport)
    pub fn with_send_delay(mut self, delay: Duration) -> Self {
        self.send_delay = delay;
        self
    }

    /// Handle to the log of sent messages
    pub fn log(&self) -> SentLog {
        self.log.clone()
    }

    /// Switch that makes every subsequent send fail
    pub fn failure_switch(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.failing)
    }
}

impl Default for MemoryLink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeviceLink for MemoryLink {
    async fn send_message(
        &mut self,
        header: FrameHeader,
        payload: Bytes,
    ) -> Result<(), LinkError> {
        if self.failing.load(Ordering::Acquire) {
            return Err(LinkError::Write("injected failure".into()));
        }

        if self.send_delay > Duration::ZERO {
            tokio::time::sleep(self.send_delay).await;
        }

        self.log.push(SentMessage { header, payload });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::frame::FrameKind;

    fn make_header(sequence: u64) -> FrameHeader {
        FrameHeader {
            kind: FrameKind::Delta,
            timestamp_micros: 0,
            sequence,
            payload_len: 4,
        }
    }

    #[tokio::test]
    async fn test_records_in_order() {
        let mut link = MemoryLink::new();
        let log = link.log();

        for seq in 0..3 {
            link.send_message(make_header(seq), Bytes::from_static(&[0u8; 4]))
                .await
                .unwrap();
        }

        let messages = log.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].header.sequence, 0);
        assert_eq!(messages[2].header.sequence, 2);
    }

    #[tokio::test]
    async fn test_failure_switch() {
        let mut link = MemoryLink::new();
        let log = link.log();
        let switch = link.failure_switch();

        link.send_message(make_header(0), Bytes::new()).await.unwrap();

        switch.store(true, Ordering::Release);
        let result = link.send_message(make_header(1), Bytes::new()).await;
        assert!(matches!(result, Err(LinkError::Write(_))));

        // Failed send is not recorded
        assert_eq!(log.len(), 1);
    }
}
