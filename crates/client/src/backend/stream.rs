use std::time::Duration;

use bytes::{Buf, Bytes, BytesMut};
use futures::{Stream, StreamExt};
use paper_core::chat::{ChatDelta, ChatError, ChatStream};
use serde::Deserialize;
use tokio::time::Instant;
use tracing::debug;

pub(crate) const DATA_PREFIX: &str = "data: ";
pub(crate) const DONE_SENTINEL: &str = "[DONE]";

#[derive(Deserialize)]
struct ChunkEvent {
    chunk: String,
}

/// Incremental frame extractor for the chat wire protocol.
///
/// Body chunks arrive at arbitrary byte boundaries, so two pieces of state
/// carry over between reads: undecoded bytes (a boundary may split a
/// multi-byte character) and an unterminated line (a boundary may split the
/// `data: ` prefix or the JSON payload). Both live exactly as long as one
/// streaming call. After the `[DONE]` sentinel the framer latches shut:
/// text already buffered behind the sentinel is never surfaced.
pub(crate) struct SseFramer {
    bytes: BytesMut,
    pending: String,
    done: bool,
}

impl SseFramer {
    pub(crate) fn new() -> Self {
        Self {
            bytes: BytesMut::new(),
            pending: String::new(),
            done: false,
        }
    }

    /// Feed one raw body chunk; returns the deltas it completed.
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<ChatDelta> {
        if self.done {
            return Vec::new();
        }
        self.bytes.extend_from_slice(chunk);
        let decoded = self.decode_ready();
        self.pending.push_str(&decoded);

        let mut out = Vec::new();
        while let Some(pos) = self.pending.find('\n') {
            let line: String = self.pending.drain(..=pos).collect();
            match parse_data_line(line.trim_end_matches(['\n', '\r'])) {
                Some(ChatDelta::Done) => {
                    self.done = true;
                    out.push(ChatDelta::Done);
                    return out;
                }
                Some(delta) => out.push(delta),
                None => {}
            }
        }
        out
    }

    /// Flush an unterminated final line at end-of-stream.
    pub(crate) fn finish(&mut self) -> Option<ChatDelta> {
        if self.done {
            return None;
        }
        self.done = true;
        let line = std::mem::take(&mut self.pending);
        parse_data_line(line.trim_end_matches('\r'))
    }

    // Decode the longest valid UTF-8 prefix of the byte buffer, keeping an
    // incomplete multi-byte tail for the next read. Invalid sequences decode
    // to U+FFFD so a garbled frame cannot kill the whole stream.
    fn decode_ready(&mut self) -> String {
        let mut out = String::new();
        loop {
            match std::str::from_utf8(&self.bytes) {
                Ok(s) => {
                    out.push_str(s);
                    self.bytes.clear();
                    return out;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    if let Ok(s) = std::str::from_utf8(&self.bytes[..valid]) {
                        out.push_str(s);
                    }
                    match e.error_len() {
                        Some(bad) => {
                            out.push('\u{FFFD}');
                            self.bytes.advance(valid + bad);
                        }
                        None => {
                            self.bytes.advance(valid);
                            return out;
                        }
                    }
                }
            }
        }
    }
}

/// A line is an event iff it carries the exact `data: ` prefix and a JSON
/// `{"chunk": ...}` payload. Everything else (blank lines, keep-alives,
/// malformed JSON, non-string chunks) is dropped without terminating the
/// stream.
fn parse_data_line(line: &str) -> Option<ChatDelta> {
    let rest = line.strip_prefix(DATA_PREFIX)?;
    let ev: ChunkEvent = match serde_json::from_str(rest) {
        Ok(ev) => ev,
        Err(e) => {
            debug!(target: "client::backend", "dropping malformed event line: {}", e);
            return None;
        }
    };
    if ev.chunk == DONE_SENTINEL {
        Some(ChatDelta::Done)
    } else {
        Some(ChatDelta::Text(ev.chunk))
    }
}

/// Adapt a raw response body into a [`ChatStream`] of deltas.
///
/// Each await of the next body chunk is a suspension point; everything in
/// between (decode, frame, parse) is synchronous. The loop ends on the
/// `[DONE]` sentinel, on end-of-body (an unterminated final line is flushed
/// through the parser first), on a body read error, or when no bytes arrive
/// within `idle`. Dropping the returned stream aborts the transfer.
pub(crate) fn read_chat_stream<S>(body: S, idle: Duration) -> ChatStream
where
    S: Stream<Item = Result<Bytes, ChatError>> + Send + 'static,
{
    let s = async_stream::stream! {
        let mut body = Box::pin(body);
        let mut framer = SseFramer::new();
        let mut last = Instant::now();
        'outer: loop {
            tokio::select! {
                chunk = body.next() => {
                    match chunk {
                        Some(Ok(b)) => {
                            last = Instant::now();
                            for delta in framer.push(&b) {
                                let finished = delta == ChatDelta::Done;
                                yield Ok(delta);
                                if finished {
                                    break 'outer;
                                }
                            }
                        }
                        Some(Err(e)) => {
                            yield Err(e);
                            break 'outer;
                        }
                        None => {
                            if let Some(delta) = framer.finish() {
                                yield Ok(delta);
                            }
                            break 'outer;
                        }
                    }
                }
                _ = tokio::time::sleep(Duration::from_millis(500)) => {
                    if last.elapsed() > idle {
                        yield Err(ChatError::Timeout("idle".into()));
                        break 'outer;
                    }
                }
            }
        }
    };
    Box::pin(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn feed(chunks: &[&[u8]]) -> Vec<ChatDelta> {
        let mut framer = SseFramer::new();
        let mut out = Vec::new();
        for c in chunks {
            out.extend(framer.push(c));
        }
        if let Some(d) = framer.finish() {
            out.push(d);
        }
        out
    }

    fn text_of(deltas: &[ChatDelta]) -> String {
        deltas
            .iter()
            .filter_map(|d| match d {
                ChatDelta::Text(t) => Some(t.as_str()),
                ChatDelta::Done => None,
            })
            .collect()
    }

    #[test]
    fn two_fragments_then_sentinel_assemble_hello() {
        let deltas = feed(&[
            b"data: {\"chunk\":\"Hel\"}\n",
            b"data: {\"chunk\":\"lo\"}\ndata: {\"chunk\":\"[DONE]\"}\n",
        ]);
        assert_eq!(text_of(&deltas), "Hello");
        assert_eq!(deltas.last(), Some(&ChatDelta::Done));
    }

    #[test]
    fn split_inside_the_data_prefix_is_reassembled() {
        let mut framer = SseFramer::new();
        assert!(framer.push(b"da").is_empty());
        let deltas = framer.push(b"ta: {\"chunk\":\"Hi\"}\n");
        assert_eq!(deltas, vec![ChatDelta::Text("Hi".into())]);
    }

    #[test]
    fn split_inside_the_json_payload_is_reassembled() {
        let mut framer = SseFramer::new();
        assert!(framer.push(b"data: {\"chu").is_empty());
        let deltas = framer.push(b"nk\":\"ok\"}\n");
        assert_eq!(deltas, vec![ChatDelta::Text("ok".into())]);
    }

    #[test]
    fn split_inside_a_multibyte_character_is_reassembled() {
        let line = "data: {\"chunk\":\"héllo\"}\n".as_bytes();
        // 'é' is two bytes; cut between them.
        let cut = line.iter().position(|&b| b == 0xc3).unwrap() + 1;
        let deltas = feed(&[&line[..cut], &line[cut..]]);
        assert_eq!(text_of(&deltas), "héllo");
    }

    #[test]
    fn every_two_chunk_split_yields_the_same_text() {
        let full = "data: {\"chunk\":\"Héllo \"}\n\ndata: {\"chunk\":\"wörld\"}\ndata: {\"chunk\":\"[DONE]\"}\n".as_bytes();
        for cut in 0..=full.len() {
            let deltas = feed(&[&full[..cut], &full[cut..]]);
            assert_eq!(text_of(&deltas), "Héllo wörld", "split at {}", cut);
            assert_eq!(deltas.last(), Some(&ChatDelta::Done), "split at {}", cut);
        }
    }

    #[test]
    fn non_event_lines_are_ignored() {
        let clean = feed(&[b"data: {\"chunk\":\"a\"}\ndata: {\"chunk\":\"b\"}\n"]);
        let noisy = feed(&[
            b"\n: keep-alive\nevent: ping\ndata: {\"chunk\":\"a\"}\n",
            b"data: not json\ndata: {\"chunk\": 42}\ndata: {\"nochunk\":\"x\"}\n",
            b"data: {\"chunk\":\"b\"}\n",
        ]);
        assert_eq!(text_of(&clean), text_of(&noisy));
    }

    #[test]
    fn sentinel_stops_processing_buffered_text_in_the_same_read() {
        let deltas = feed(&[b"data: {\"chunk\":\"[DONE]\"}\ndata: {\"chunk\":\"late\"}\n"]);
        assert_eq!(deltas, vec![ChatDelta::Done]);
    }

    #[test]
    fn pushes_after_the_sentinel_yield_nothing() {
        let mut framer = SseFramer::new();
        framer.push(b"data: {\"chunk\":\"[DONE]\"}\n");
        assert!(framer.push(b"data: {\"chunk\":\"late\"}\n").is_empty());
        assert_eq!(framer.finish(), None);
    }

    #[test]
    fn finish_flushes_an_unterminated_final_line() {
        let mut framer = SseFramer::new();
        assert!(framer.push(b"data: {\"chunk\":\"tail\"}").is_empty());
        assert_eq!(framer.finish(), Some(ChatDelta::Text("tail".into())));
    }

    #[test]
    fn crlf_line_endings_are_tolerated() {
        let deltas = feed(&[b"data: {\"chunk\":\"x\"}\r\ndata: {\"chunk\":\"[DONE]\"}\r\n"]);
        assert_eq!(text_of(&deltas), "x");
        assert_eq!(deltas.last(), Some(&ChatDelta::Done));
    }

    #[test]
    fn invalid_utf8_does_not_kill_the_stream() {
        let deltas = feed(&[
            b"data: {\"chunk\":\"a\"}\n\xff\xfe garbage\n",
            b"data: {\"chunk\":\"b\"}\n",
        ]);
        assert_eq!(text_of(&deltas), "ab");
    }

    #[tokio::test]
    async fn end_of_body_without_sentinel_still_completes() {
        let chunks: Vec<Result<Bytes, ChatError>> = vec![
            Ok(Bytes::from_static(b"data: {\"chunk\":\"par\"}\n")),
            Ok(Bytes::from_static(b"data: {\"chunk\":\"tial\"}")),
        ];
        let mut s = read_chat_stream(stream::iter(chunks), Duration::from_secs(5));
        let mut acc = String::new();
        while let Some(item) = s.next().await {
            match item.expect("no errors expected") {
                ChatDelta::Text(t) => acc.push_str(&t),
                ChatDelta::Done => {}
            }
        }
        assert_eq!(acc, "partial");
    }

    #[tokio::test]
    async fn sentinel_ends_the_delta_stream_before_later_chunks() {
        let chunks: Vec<Result<Bytes, ChatError>> = vec![
            Ok(Bytes::from_static(b"data: {\"chunk\":\"ok\"}\ndata: {\"chunk\":\"[DONE]\"}\n")),
            Ok(Bytes::from_static(b"data: {\"chunk\":\"never\"}\n")),
        ];
        let mut s = read_chat_stream(stream::iter(chunks), Duration::from_secs(5));
        let mut seen = Vec::new();
        while let Some(item) = s.next().await {
            seen.push(item.expect("no errors expected"));
        }
        assert_eq!(
            seen,
            vec![ChatDelta::Text("ok".into()), ChatDelta::Done]
        );
    }

    #[tokio::test]
    async fn body_errors_terminate_the_stream() {
        let chunks: Vec<Result<Bytes, ChatError>> = vec![
            Ok(Bytes::from_static(b"data: {\"chunk\":\"par\"}\n")),
            Err(ChatError::Network("reset".into())),
        ];
        let mut s = read_chat_stream(stream::iter(chunks), Duration::from_secs(5));
        let first = s.next().await.unwrap();
        assert_eq!(first.unwrap(), ChatDelta::Text("par".into()));
        let second = s.next().await.unwrap();
        assert!(matches!(second, Err(ChatError::Network(_))));
        assert!(s.next().await.is_none());
    }
}
