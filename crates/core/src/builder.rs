//! Stream merger: folds stream chunks into one assistant message.

use crate::{
    Content, Error, ErrorCategory, Message, Response, Result, Role, StopReason, StreamChunk,
    ToolCall, ToolCallDelta, Usage,
};
use compact_str::CompactString;
use std::collections::BTreeMap;

/// A tool call whose arguments are still arriving.
#[derive(Debug, Default, Clone)]
struct Partial {
    id: CompactString,
    name: CompactString,
    arguments: String,
}

/// A builder for streamed assistant messages.
///
/// Tool calls are keyed by their stream index (or id), never by arrival
/// order, so interleaved fragments of concurrent calls merge correctly.
/// The message is complete only after [`StreamChunk::Done`].
#[derive(Debug)]
pub struct MessageBuilder {
    /// The in-progress message
    message: Message,
    /// Partial tool calls keyed by slot
    calls: BTreeMap<u32, Partial>,
    usage: Usage,
    stop: Option<StopReason>,
    id: Option<CompactString>,
    model: Option<CompactString>,
    done: bool,
}

impl Default for MessageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBuilder {
    /// Create a new builder for an assistant message
    pub fn new() -> Self {
        Self {
            message: Message {
                role: Role::Assistant,
                ..Default::default()
            },
            calls: BTreeMap::new(),
            usage: Usage::default(),
            stop: None,
            id: None,
            model: None,
            done: false,
        }
    }

    /// Accept a chunk from the stream.
    ///
    /// Returns the content delta carried by the chunk, if any. Chunks that
    /// arrive after the terminal marker are ignored.
    pub fn accept<'c>(&mut self, chunk: &'c StreamChunk) -> Result<Option<&'c str>> {
        if self.done {
            tracing::warn!("chunk after stream end ignored: {chunk:?}");
            return Ok(None);
        }

        match chunk {
            StreamChunk::Meta { id, model } => {
                if !id.is_empty() {
                    self.id = Some(id.clone());
                    self.message.id = Some(id.clone());
                }
                if !model.is_empty() {
                    self.model = Some(model.clone());
                }
            }
            StreamChunk::Content(text) => {
                if text.is_empty() {
                    return Ok(None);
                }
                if let Content::Text(content) = &mut self.message.content {
                    content.push_str(text);
                }
                return Ok(Some(text));
            }
            StreamChunk::Reasoning(text) => self.message.reasoning.push_str(text),
            StreamChunk::ToolCall(delta) => self.merge_call(delta),
            StreamChunk::Usage(usage) => self.usage.merge(usage),
            StreamChunk::Stop(reason) => self.stop = Some(reason.clone()),
            StreamChunk::Done => self.finish()?,
        }

        Ok(None)
    }

    fn merge_call(&mut self, delta: &ToolCallDelta) {
        let slot = self.slot(delta);
        let entry = self.calls.entry(slot).or_default();
        if let Some(id) = &delta.id
            && !id.is_empty()
        {
            entry.id = id.clone();
        }
        if let Some(name) = &delta.name
            && !name.is_empty()
        {
            entry.name = name.clone();
        }
        entry.arguments.push_str(&delta.arguments);
    }

    /// Resolve the slot a delta belongs to: declared index first, then a
    /// known id, then the most recent call for bare argument fragments.
    fn slot(&self, delta: &ToolCallDelta) -> u32 {
        if let Some(index) = delta.index {
            return index;
        }

        let next = self.calls.keys().next_back().map_or(0, |k| k + 1);
        if let Some(id) = delta.id.as_deref().filter(|id| !id.is_empty()) {
            return self
                .calls
                .iter()
                .find(|(_, call)| call.id == id)
                .map_or(next, |(slot, _)| *slot);
        }

        if delta.name.is_none() && !self.calls.is_empty() {
            return next - 1;
        }

        next
    }

    fn finish(&mut self) -> Result<()> {
        let mut calls = Vec::with_capacity(self.calls.len());
        for partial in std::mem::take(&mut self.calls).into_values() {
            if partial.name.is_empty() {
                return Err(Error::MalformedToolCall {
                    id: partial.id,
                    name: partial.name,
                    reason: "tool call has no name".into(),
                });
            }
            calls.push(ToolCall::parse(partial.id, partial.name, &partial.arguments)?);
        }

        self.stop = Some(StopReason::resolve(self.stop.take(), !calls.is_empty()));
        self.message.tool_calls = calls;
        self.done = true;
        Ok(())
    }

    /// Whether the terminal marker has been seen.
    pub fn is_complete(&self) -> bool {
        self.done
    }

    /// The message as merged so far.
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// The stop reason, once known.
    pub fn stop_reason(&self) -> Option<&StopReason> {
        self.stop.as_ref()
    }

    /// Usage reported so far.
    pub fn usage(&self) -> &Usage {
        &self.usage
    }

    /// Build the response.
    ///
    /// Fails with an incomplete-stream error when the terminal marker was
    /// never received.
    pub fn build(self, provider: &str) -> Result<Response> {
        if !self.done {
            return Err(Error::api(
                provider,
                None,
                ErrorCategory::IncompleteStream,
                "stream ended before the terminal marker",
            ));
        }

        Ok(Response::new(self.message, self.usage, self.stop).with_meta(self.id, self.model))
    }
}
