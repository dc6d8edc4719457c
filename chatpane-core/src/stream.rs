//! Incremental consumption of a streamed reply.
//!
//! The streaming endpoint sends the reply as raw UTF-8 bytes in arbitrary
//! chunks. [`StreamConsumer`] decodes them with a [`Utf8Decoder`] that
//! survives characters split across chunk boundaries and keeps the whole
//! reply in one buffer. While the stream is open, the view only ever shows
//! the raw buffer; Markdown is rendered once the stream has ended.

use futures::StreamExt;

use crate::api::{ApiError, ChatStream};
use crate::view::ChatView;

/// Stateful UTF-8 decoder for chunked input.
///
/// A multi-byte sequence cut by a chunk boundary is held back until the
/// rest of it arrives. Invalid sequences decode to U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Create a decoder with nothing pending.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `chunk`, appending complete characters to `out`.
    pub fn decode(&mut self, chunk: &[u8], out: &mut String) {
        let joined;
        let mut input: &[u8] = if self.pending.is_empty() {
            chunk
        } else {
            self.pending.extend_from_slice(chunk);
            joined = std::mem::take(&mut self.pending);
            &joined
        };

        loop {
            match std::str::from_utf8(input) {
                Ok(text) => {
                    out.push_str(text);
                    return;
                }
                Err(e) => {
                    let (valid, rest) = input.split_at(e.valid_up_to());
                    // `valid_up_to` marks a UTF-8 prefix.
                    out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            input = &rest[len..];
                        }
                        None => {
                            self.pending.extend_from_slice(rest);
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Flush at end of input: a dangling partial sequence becomes U+FFFD.
    pub fn finish(&mut self, out: &mut String) {
        if !self.pending.is_empty() {
            self.pending.clear();
            out.push(char::REPLACEMENT_CHARACTER);
        }
    }
}

/// Accumulates a streamed reply.
///
/// # Examples
///
/// ```
/// use chatpane_core::stream::StreamConsumer;
///
/// let mut consumer = StreamConsumer::new();
/// consumer.push(b"Hel");
/// consumer.push(b"lo wo");
/// consumer.push(b"rld");
/// assert_eq!(consumer.finish(), "Hello world");
/// ```
#[derive(Debug, Default)]
pub struct StreamConsumer {
    decoder: Utf8Decoder,
    buffer: String,
}

impl StreamConsumer {
    /// Create an empty consumer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return everything decoded so far.
    pub fn push(&mut self, chunk: &[u8]) -> &str {
        self.decoder.decode(chunk, &mut self.buffer);
        &self.buffer
    }

    /// Everything decoded so far.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// End of stream: flush the decoder and hand over the buffer.
    pub fn finish(mut self) -> String {
        self.decoder.finish(&mut self.buffer);
        self.buffer
    }
}

/// Read `stream` to the end, showing the raw text in `view` as it grows.
///
/// After every chunk the whole accumulated text replaces the live message
/// content and the view is scrolled to the bottom. Returns the final text,
/// or the first transport error.
pub async fn consume_stream<V>(mut stream: ChatStream, view: &mut V) -> Result<String, ApiError>
where
    V: ChatView + ?Sized,
{
    let mut consumer = StreamConsumer::new();
    let mut chunks = 0usize;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        chunks += 1;
        let text = consumer.push(&chunk);
        view.update_live_text(text);
        view.scroll_to_bottom();
    }

    let text = consumer.finish();
    tracing::debug!(chunks, bytes = text.len(), "stream: reply complete");
    Ok(text)
}
