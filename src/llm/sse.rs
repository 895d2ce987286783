//! Incremental parser for `text/event-stream` chat responses.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use tracing::{debug, warn};

use super::error::{LlmError, classify_body};
use super::types::{StreamChunk, StreamEvent};

/// Terminal sentinel emitted by OpenAI-compatible streams. Consumed and
/// ignored; the stream ends when the transport closes, not at the marker.
const DONE_MARKER: &str = "[DONE]";

/// Adapts a raw byte stream into [`StreamEvent`]s.
///
/// The transport only guarantees byte order, so line boundaries (and even
/// multi-byte UTF-8 scalars) may split across reads. Undecoded trailing
/// bytes are buffered until a full line arrives; a trailing line without a
/// newline is flushed at end-of-stream.
pub(crate) struct SseParser<S> {
    inner: S,
    buffer: Vec<u8>,
    eof: bool,
    done: bool,
}

impl<S> SseParser<S> {
    pub(crate) fn new(inner: S) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
            eof: false,
            done: false,
        }
    }
}

impl<S> Stream for SseParser<S>
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Unpin,
{
    type Item = Result<StreamEvent, LlmError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }

        loop {
            // Drain complete lines from the buffer first.
            if let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = self.buffer.drain(..=pos).collect();
                if let Some(token) = token_from_line(&line) {
                    return Poll::Ready(Some(Ok(StreamEvent::Token(token))));
                }
                continue;
            }

            if self.eof {
                // Flush a trailing line that never got its newline.
                if !self.buffer.is_empty() {
                    let line = std::mem::take(&mut self.buffer);
                    if let Some(token) = token_from_line(&line) {
                        return Poll::Ready(Some(Ok(StreamEvent::Token(token))));
                    }
                    continue;
                }
                self.done = true;
                return Poll::Ready(Some(Ok(StreamEvent::Done)));
            }

            // Need more data.
            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    self.buffer.extend_from_slice(&bytes);
                }
                Poll::Ready(Some(Err(e))) => {
                    self.done = true;
                    return Poll::Ready(Some(Err(classify_body(e))));
                }
                Poll::Ready(None) => {
                    self.eof = true;
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Extract assistant text from one decoded line, if it carries any.
///
/// Blank lines, non-`data:` lines, the `[DONE]` sentinel, empty deltas and
/// malformed payloads all yield `None`. Malformed payloads are logged and
/// skipped rather than failing the stream; upstream servers interleave
/// keep-alive lines that are not JSON.
fn token_from_line(line: &[u8]) -> Option<String> {
    let line = match std::str::from_utf8(line) {
        Ok(s) => s.trim(),
        Err(e) => {
            warn!(error = %e, "skipping non-utf8 stream line");
            return None;
        }
    };
    if line.is_empty() {
        return None;
    }

    let data = line.strip_prefix("data:")?.trim();
    if data == DONE_MARKER {
        debug!("received [DONE] marker");
        return None;
    }

    match serde_json::from_str::<StreamChunk>(data) {
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .filter(|content| !content.is_empty()),
        Err(e) => {
            warn!(error = %e, data, "skipping malformed stream payload");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn byte_stream(
        chunks: Vec<&'static [u8]>,
    ) -> impl Stream<Item = Result<Bytes, reqwest::Error>> + Unpin {
        futures::stream::iter(chunks.into_iter().map(|c| Ok(Bytes::from_static(c))))
    }

    async fn collect_events<S>(stream: S) -> Vec<StreamEvent>
    where
        S: Stream<Item = Result<Bytes, reqwest::Error>> + Unpin,
    {
        SseParser::new(stream)
            .map(|r| r.unwrap())
            .collect::<Vec<_>>()
            .await
    }

    #[tokio::test]
    async fn parses_tokens_in_order() {
        let events = collect_events(byte_stream(vec![
            b"data: {\"choices\":[{\"delta\":{\"content\":\"A\"}}]}\n",
            b"data: {\"choices\":[{\"delta\":{\"content\":\"B\"}}]}\n",
            b"data: [DONE]\n",
        ]))
        .await;

        assert_eq!(
            events,
            vec![
                StreamEvent::Token("A".to_string()),
                StreamEvent::Token("B".to_string()),
                StreamEvent::Done,
            ]
        );
    }

    #[tokio::test]
    async fn reassembles_lines_split_across_reads() {
        let events = collect_events(byte_stream(vec![
            b"data: {\"choices\":[{\"del",
            b"ta\":{\"content\":\"hello\"}}]}\ndata: {\"choices\":[{\"delta\":",
            b"{\"content\":\" world\"}}]}\n",
        ]))
        .await;

        assert_eq!(
            events,
            vec![
                StreamEvent::Token("hello".to_string()),
                StreamEvent::Token(" world".to_string()),
                StreamEvent::Done,
            ]
        );
    }

    #[tokio::test]
    async fn reassembles_utf8_split_across_reads() {
        // "你好" split in the middle of the second scalar.
        let full = "data: {\"choices\":[{\"delta\":{\"content\":\"你好\"}}]}\n".as_bytes();
        let (a, b) = full.split_at(full.len() - 10);
        let events = collect_events(futures::stream::iter(vec![
            Ok(Bytes::copy_from_slice(a)),
            Ok(Bytes::copy_from_slice(b)),
        ]))
        .await;

        assert_eq!(
            events,
            vec![StreamEvent::Token("你好".to_string()), StreamEvent::Done]
        );
    }

    #[tokio::test]
    async fn done_marker_is_consumed_not_emitted() {
        let events = collect_events(byte_stream(vec![b"data: [DONE]\n"])).await;
        assert_eq!(events, vec![StreamEvent::Done]);
    }

    #[tokio::test]
    async fn malformed_payload_is_skipped() {
        let events = collect_events(byte_stream(vec![
            b"data: {not json}\n",
            b"data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n",
        ]))
        .await;

        assert_eq!(
            events,
            vec![StreamEvent::Token("ok".to_string()), StreamEvent::Done]
        );
    }

    #[tokio::test]
    async fn blank_and_foreign_lines_are_skipped() {
        let events = collect_events(byte_stream(vec![
            b"\n",
            b": keep-alive\n",
            b"event: message\n",
            b"data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}\n",
        ]))
        .await;

        assert_eq!(
            events,
            vec![StreamEvent::Token("x".to_string()), StreamEvent::Done]
        );
    }

    #[tokio::test]
    async fn empty_delta_produces_no_token() {
        let events = collect_events(byte_stream(vec![
            b"data: {\"choices\":[{\"delta\":{\"content\":\"\"}}]}\n",
            b"data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n",
        ]))
        .await;

        assert_eq!(events, vec![StreamEvent::Done]);
    }

    #[tokio::test]
    async fn trailing_line_without_newline_is_flushed() {
        let events = collect_events(byte_stream(vec![
            b"data: {\"choices\":[{\"delta\":{\"content\":\"tail\"}}]}",
        ]))
        .await;

        assert_eq!(
            events,
            vec![StreamEvent::Token("tail".to_string()), StreamEvent::Done]
        );
    }

    #[tokio::test]
    async fn mid_stream_error_aborts_and_fuses() {
        // Provoke a real non-connect reqwest error to stand in for a
        // failed body read.
        let read_failure = reqwest::Client::new()
            .get("http://")
            .send()
            .await
            .unwrap_err();

        let mut parser = SseParser::new(futures::stream::iter(vec![
            Ok(Bytes::from_static(
                b"data: {\"choices\":[{\"delta\":{\"content\":\"A\"}}]}\n",
            )),
            Err(read_failure),
        ]));

        assert!(
            matches!(parser.next().await, Some(Ok(StreamEvent::Token(t))) if t == "A")
        );
        assert!(matches!(
            parser.next().await,
            Some(Err(LlmError::Stream(_)))
        ));
        // No Done after a failure; the stream is fused.
        assert!(parser.next().await.is_none());
    }

    #[tokio::test]
    async fn stream_fuses_after_done() {
        let mut parser = SseParser::new(byte_stream(vec![b"data: [DONE]\n"]));
        assert!(matches!(parser.next().await, Some(Ok(StreamEvent::Done))));
        assert!(parser.next().await.is_none());
        assert!(parser.next().await.is_none());
    }
}
