use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use tokio::sync::{Mutex, Notify, mpsc};
use tracing::debug;

use crate::bail;
use crate::error::{ErrorKind, MconfigResult};
use crate::stream::{ChangeStream, StreamMessage};

#[derive(Debug, Default)]
struct CommitLogInner {
    committed: Vec<StreamMessage>,
    waiters: HashMap<i64, Vec<Arc<Notify>>>,
}

/// Record of the messages committed by a [`MemoryChangeStream`].
#[derive(Debug, Clone, Default)]
pub struct CommitLog {
    inner: Arc<Mutex<CommitLogInner>>,
}

impl CommitLog {
    /// Offsets committed so far, in commit order.
    pub async fn committed_offsets(&self) -> Vec<i64> {
        let inner = self.inner.lock().await;
        inner.committed.iter().map(|message| message.offset).collect()
    }

    /// Returns a [`Notify`] signalled once a message with `offset` is committed.
    ///
    /// Already committed offsets are signalled immediately.
    pub async fn notify_on_commit(&self, offset: i64) -> Arc<Notify> {
        let mut inner = self.inner.lock().await;
        let notify = Arc::new(Notify::new());

        if inner.committed.iter().any(|message| message.offset == offset) {
            notify.notify_one();
        } else {
            inner
                .waiters
                .entry(offset)
                .or_default()
                .push(notify.clone());
        }

        notify
    }

    async fn record(&self, message: &StreamMessage) {
        let mut inner = self.inner.lock().await;
        inner.committed.push(message.clone());

        if let Some(waiters) = inner.waiters.remove(&message.offset) {
            for waiter in waiters {
                waiter.notify_one();
            }
        }
    }
}

/// Publishing side of a [`MemoryChangeStream`].
///
/// Offsets are assigned sequentially from zero. Dropping every producer ends the stream.
#[derive(Debug, Clone)]
pub struct MemoryStreamProducer {
    tx: mpsc::UnboundedSender<StreamMessage>,
    next_offset: Arc<AtomicI64>,
}

impl MemoryStreamProducer {
    /// Publishes a payload on `topic` and returns the offset it was given.
    pub fn publish(&self, topic: &str, payload: Option<Vec<u8>>) -> MconfigResult<i64> {
        let offset = self.next_offset.fetch_add(1, Ordering::SeqCst);

        self.send(StreamMessage {
            topic: topic.to_string(),
            partition: 0,
            offset,
            payload,
        })?;

        Ok(offset)
    }

    /// Publishes a message with an explicit offset, e.g. to simulate a redelivery.
    pub fn send(&self, message: StreamMessage) -> MconfigResult<()> {
        if self.tx.send(message).is_err() {
            bail!(
                ErrorKind::StreamEnded,
                "Memory stream consumer was dropped"
            );
        }

        Ok(())
    }
}

/// Change stream backed by an in-process channel.
#[derive(Debug)]
pub struct MemoryChangeStream {
    rx: mpsc::UnboundedReceiver<StreamMessage>,
    commits: CommitLog,
}

impl MemoryChangeStream {
    pub fn new() -> (MemoryChangeStream, MemoryStreamProducer) {
        let (tx, rx) = mpsc::unbounded_channel();

        let stream = MemoryChangeStream {
            rx,
            commits: CommitLog::default(),
        };
        let producer = MemoryStreamProducer {
            tx,
            next_offset: Arc::new(AtomicI64::new(0)),
        };

        (stream, producer)
    }

    /// Handle to the commits of this stream, usable after the stream moves into a processor.
    pub fn commit_log(&self) -> CommitLog {
        self.commits.clone()
    }
}

impl ChangeStream for MemoryChangeStream {
    async fn next_message(&mut self) -> MconfigResult<StreamMessage> {
        match self.rx.recv().await {
            Some(message) => Ok(message),
            None => bail!(
                ErrorKind::StreamEnded,
                "Memory stream closed",
                "Every producer of the memory stream was dropped"
            ),
        }
    }

    async fn commit(&mut self, message: &StreamMessage) -> MconfigResult<()> {
        debug!(
            topic = %message.topic,
            offset = message.offset,
            "committing memory stream message"
        );
        self.commits.record(message).await;

        Ok(())
    }
}
