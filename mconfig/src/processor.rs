//! Stream processing loop turning CDC messages into stored bundles.
//!
//! The processor handles one message at a time: it reads the next message, decodes it, applies
//! the update at the message's offset and only then commits the message. A crash between apply
//! and commit replays the message, which converges because every apply is idempotent.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use metrics::{counter, histogram};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{Instrument, debug, info};

use crate::apply::ApplyContext;
use crate::decoder::Decoder;
use crate::directory::GatewayLister;
use crate::error::{ErrorKind, MconfigResult};
use crate::mconfig_error;
use crate::metrics::{
    MCONFIG_APPLY_DURATION_SECONDS, MCONFIG_BUNDLES_WRITTEN_TOTAL,
    MCONFIG_MESSAGES_PROCESSED_TOTAL, MCONFIG_NOOP_MESSAGES_TOTAL, UPDATE_KIND_LABEL,
};
use crate::store::kv::KvEngine;
use crate::stream::ChangeStream;
use crate::types::Update;

/// Shared flag asking a [`Processor`] to stop.
///
/// The flag is checked before each cycle, so a cycle in progress always finishes.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Sequential consumer of a [`ChangeStream`].
#[derive(Debug)]
pub struct Processor<S, K, L> {
    stream: S,
    decoder: Decoder,
    context: ApplyContext<K, L>,
    stop: StopHandle,
}

impl<S, K, L> Processor<S, K, L> {
    pub fn new(stream: S, decoder: Decoder, context: ApplyContext<K, L>) -> Self {
        Self {
            stream,
            decoder,
            context,
            stop: StopHandle::default(),
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn stop(&self) {
        self.stop.stop();
    }

    pub fn is_running(&self) -> bool {
        !self.stop.is_stopped()
    }
}

impl<S, K, L> Processor<S, K, L>
where
    S: ChangeStream + Send,
    K: KvEngine + Send + Sync,
    L: GatewayLister + Send + Sync,
{
    /// Reads, decodes, applies and commits exactly one message.
    ///
    /// Waits indefinitely for the message. Nothing is committed if any step fails.
    pub async fn run_once(&mut self) -> MconfigResult<()> {
        let message = self.stream.next_message().await?;
        let update = self.decoder.decode(&message)?;
        let update_kind = update.kind_name();

        debug!(
            topic = %message.topic,
            partition = message.partition,
            offset = message.offset,
            update_kind,
            "processing message"
        );

        if matches!(update, Update::NoOp) {
            counter!(MCONFIG_NOOP_MESSAGES_TOTAL).increment(1);
        }

        let before_apply = Instant::now();
        let written = update.apply(&self.context, message.offset).await?;
        histogram!(MCONFIG_APPLY_DURATION_SECONDS, UPDATE_KIND_LABEL => update_kind)
            .record(before_apply.elapsed().as_secs_f64());
        counter!(MCONFIG_BUNDLES_WRITTEN_TOTAL, UPDATE_KIND_LABEL => update_kind)
            .increment(written as u64);

        self.stream.commit(&message).await?;
        counter!(MCONFIG_MESSAGES_PROCESSED_TOTAL, UPDATE_KIND_LABEL => update_kind).increment(1);

        Ok(())
    }

    /// Runs cycles until stopped or until a cycle fails.
    pub async fn run(&mut self) -> MconfigResult<()> {
        info!("starting mconfig processor");

        while self.is_running() {
            self.run_once().await?;
        }

        info!("mconfig processor stopped");

        Ok(())
    }
}

impl<S, K, L> Processor<S, K, L>
where
    S: ChangeStream + Send + 'static,
    K: KvEngine + Send + Sync + 'static,
    L: GatewayLister + Send + Sync + 'static,
{
    /// Runs the processor on a new task and returns a handle controlling it.
    pub fn spawn(mut self, topic_prefix: &str) -> ProcessorHandle {
        let stop = self.stop_handle();

        let processor_span = tracing::info_span!("mconfig_processor", topic_prefix);
        let processor = async move { self.run().await }.instrument(processor_span.or_current());

        ProcessorHandle {
            stop,
            handle: Some(tokio::spawn(processor)),
        }
    }
}

/// Handle for stopping and awaiting a spawned [`Processor`].
#[derive(Debug)]
pub struct ProcessorHandle {
    stop: StopHandle,
    handle: Option<JoinHandle<MconfigResult<()>>>,
}

impl ProcessorHandle {
    /// Asks the processor to stop after its current cycle.
    pub fn stop(&self) {
        self.stop.stop();
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Returns a handle cancelling the task without waiting for the current cycle.
    ///
    /// Messages applied but not committed are replayed on the next start.
    pub fn abort_handle(&self) -> Option<AbortHandle> {
        self.handle.as_ref().map(JoinHandle::abort_handle)
    }

    /// Waits for the processor to finish and returns the error that stopped it, if any.
    pub async fn wait(mut self) -> MconfigResult<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        handle.await.map_err(|err| {
            if err.is_cancelled() {
                mconfig_error!(
                    ErrorKind::ProcessorCancelled,
                    "Processor was cancelled",
                    err
                )
            } else {
                mconfig_error!(ErrorKind::ProcessorPanic, "Processor panicked", err)
            }
        })??;

        Ok(())
    }
}
