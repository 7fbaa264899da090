//! Receivers for streamed assistant output.

use ucore::Message;

/// Receives every merged chunk of a streamed response.
///
/// `message` is the in-progress assistant message, `delta` the content
/// added by this chunk, and `is_final` is set once on the chunk that
/// completes the message. Delivered deltas are never retracted, even if
/// the run later fails.
pub trait StreamSink: Send {
    /// Handle one merged chunk.
    fn on_chunk(&mut self, message: &Message, delta: Option<&str>, is_final: bool);
}

impl<F> StreamSink for F
where
    F: FnMut(&Message, Option<&str>, bool) + Send,
{
    fn on_chunk(&mut self, message: &Message, delta: Option<&str>, is_final: bool) {
        self(message, delta, is_final)
    }
}

/// Discards everything.
impl StreamSink for () {
    fn on_chunk(&mut self, _message: &Message, _delta: Option<&str>, _is_final: bool) {}
}
