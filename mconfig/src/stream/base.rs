use std::future::Future;

use crate::error::MconfigResult;

/// One message read from a CDC topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamMessage {
    pub topic: String,
    pub partition: i32,
    /// Position of the message in its partition.
    pub offset: i64,
    /// Serialized envelope, `None` for tombstones.
    pub payload: Option<Vec<u8>>,
}

/// Ordered source of CDC messages with externally committed progress.
///
/// A message is committed only after its effects are persisted, so a restart replays every
/// message whose commit did not complete.
pub trait ChangeStream {
    /// Waits for the next message. There is no timeout.
    fn next_message(&mut self) -> impl Future<Output = MconfigResult<StreamMessage>> + Send;

    /// Marks `message` and everything before it in its partition as processed.
    fn commit(&mut self, message: &StreamMessage) -> impl Future<Output = MconfigResult<()>> + Send;
}
