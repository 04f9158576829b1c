//! Incremental reader for SSE-style streamed completion responses.
//!
//! Frames arrive as newline-delimited `data: <json>` lines; a literal
//! `[DONE]` payload marks the end of the stream and is ignored. Each frame's
//! `choices[0].delta.content` fragment is accumulated into the full text and
//! delivered inline to the caller's token observer. The observer runs on the
//! same cooperative turn as the read loop, so it must not block.
//!
//! There is no cancellation primitive: once started, the stream is read to
//! completion. An upgrade path would thread a cancellation token through the
//! chunk-read suspension point.

use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::Value;

use crate::error::LlmError;

/// Result of draining a streamed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOutcome {
    /// All delta fragments, concatenated in arrival order.
    pub text: String,
    /// `data:` frames (or byte sequences) that failed to parse and were
    /// skipped. Lets callers distinguish a clean stream from a lossy one.
    pub skipped_frames: usize,
}

/// Drain `stream`, invoking `on_token` for each text fragment as it arrives.
///
/// Parsing is best-effort: malformed frames are counted and skipped, never
/// aborting the stream. Only transport-level read failures are errors.
pub async fn read_stream(
    mut stream: BoxStream<'static, Result<Bytes, LlmError>>,
    mut on_token: impl FnMut(&str),
) -> Result<StreamOutcome, LlmError> {
    let mut raw: Vec<u8> = Vec::new();
    let mut buffer = String::new();
    let mut text = String::new();
    let mut skipped_frames = 0usize;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        // Chunk boundaries can fall inside a multi-byte character, so decode
        // from a byte buffer and leave an incomplete tail for the next chunk.
        raw.extend_from_slice(&chunk);
        skipped_frames += drain_utf8(&mut raw, &mut buffer);

        // Consume complete lines; keep the trailing partial line buffered.
        while let Some(pos) = buffer.find('\n') {
            let line: String = buffer.drain(..=pos).collect();
            process_line(line.trim_end_matches(['\n', '\r']), &mut text, &mut skipped_frames, &mut on_token);
        }
    }

    if !raw.is_empty() {
        tracing::warn!("stream ended mid-character ({} bytes dropped)", raw.len());
        skipped_frames += 1;
    }

    // Flush whatever is left after the stream ends.
    if !buffer.is_empty() {
        let remaining = std::mem::take(&mut buffer);
        process_line(remaining.trim_end_matches('\r'), &mut text, &mut skipped_frames, &mut on_token);
    }

    Ok(StreamOutcome {
        text,
        skipped_frames,
    })
}

/// Move the decodable prefix of `bytes` into `out`. An incomplete multi-byte
/// character at the tail stays in `bytes` until the next chunk completes it;
/// invalid sequences are dropped. Returns how many sequences were dropped.
fn drain_utf8(bytes: &mut Vec<u8>, out: &mut String) -> usize {
    let mut dropped = 0usize;
    loop {
        match std::str::from_utf8(bytes) {
            Ok(s) => {
                out.push_str(s);
                bytes.clear();
                return dropped;
            }
            Err(e) => {
                let valid = e.valid_up_to();
                out.push_str(&String::from_utf8_lossy(&bytes[..valid]));
                match e.error_len() {
                    None => {
                        bytes.drain(..valid);
                        return dropped;
                    }
                    Some(bad) => {
                        tracing::warn!("dropping {} invalid bytes from stream", bad);
                        bytes.drain(..valid + bad);
                        dropped += 1;
                    }
                }
            }
        }
    }
}

/// Handle one SSE line. Non-`data:` lines (blank separators, comments) are
/// ignored without counting as skipped.
fn process_line(
    line: &str,
    text: &mut String,
    skipped_frames: &mut usize,
    on_token: &mut impl FnMut(&str),
) {
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') {
        return;
    }
    let Some(data) = line.strip_prefix("data:").map(str::trim) else {
        return;
    };
    if data == "[DONE]" {
        tracing::trace!("stream [DONE] sentinel");
        return;
    }

    match serde_json::from_str::<Value>(data) {
        Ok(frame) => {
            let delta = frame["choices"][0]["delta"]["content"]
                .as_str()
                .unwrap_or_default();
            if !delta.is_empty() {
                text.push_str(delta);
                on_token(delta);
            }
        }
        Err(e) => {
            *skipped_frames += 1;
            tracing::trace!("skipping malformed stream frame: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn byte_stream(chunks: Vec<&str>) -> BoxStream<'static, Result<Bytes, LlmError>> {
        let owned: Vec<Result<Bytes, LlmError>> = chunks
            .into_iter()
            .map(|c| Ok(Bytes::from(c.to_string())))
            .collect();
        stream::iter(owned).boxed()
    }

    #[tokio::test]
    async fn test_hello_scenario() {
        let s = byte_stream(vec![
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n",
            "data: [DONE]\n",
        ]);
        let mut tokens = Vec::new();
        let outcome = read_stream(s, |t| tokens.push(t.to_string())).await.unwrap();
        assert_eq!(tokens, vec!["Hel", "lo"]);
        assert_eq!(outcome.text, "Hello");
        assert_eq!(outcome.skipped_frames, 0);
    }

    #[tokio::test]
    async fn test_frames_split_across_chunks() {
        // A frame boundary falling mid-line must be reassembled.
        let s = byte_stream(vec![
            "data: {\"choices\":[{\"delta\":{\"co",
            "ntent\":\"ab\"}}]}\ndata: {\"choices\":[{\"delta\":{\"content\":\"cd\"}}]}\n",
        ]);
        let outcome = read_stream(s, |_| {}).await.unwrap();
        assert_eq!(outcome.text, "abcd");
    }

    #[tokio::test]
    async fn test_multibyte_char_split_across_chunks() {
        // A chunk boundary inside a multi-byte character must not lose data.
        let frame = "data: {\"choices\":[{\"delta\":{\"content\":\"héllo\"}}]}\n".as_bytes();
        let cut = frame.iter().position(|&b| b == 0xc3).unwrap() + 1;
        let items: Vec<Result<Bytes, LlmError>> = vec![
            Ok(Bytes::copy_from_slice(&frame[..cut])),
            Ok(Bytes::copy_from_slice(&frame[cut..])),
        ];
        let mut tokens = Vec::new();
        let outcome = read_stream(stream::iter(items).boxed(), |t| tokens.push(t.to_string()))
            .await
            .unwrap();
        assert_eq!(outcome.text, "héllo");
        assert_eq!(tokens, vec!["héllo"]);
        assert_eq!(outcome.skipped_frames, 0);
    }

    #[tokio::test]
    async fn test_invalid_bytes_dropped_not_fatal() {
        let items: Vec<Result<Bytes, LlmError>> = vec![Ok(Bytes::from_static(
            b"\xff\xfedata: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n",
        ))];
        let outcome = read_stream(stream::iter(items).boxed(), |_| {}).await.unwrap();
        assert_eq!(outcome.text, "ok");
        assert_eq!(outcome.skipped_frames, 2);
    }

    #[tokio::test]
    async fn test_malformed_frames_skipped_not_fatal() {
        let s = byte_stream(vec![
            "data: {not json}\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n",
            "data: [DONE]\n",
        ]);
        let outcome = read_stream(s, |_| {}).await.unwrap();
        assert_eq!(outcome.text, "ok");
        assert_eq!(outcome.skipped_frames, 1);
    }

    #[tokio::test]
    async fn test_empty_deltas_not_delivered() {
        let s = byte_stream(vec![
            "data: {\"choices\":[{\"delta\":{}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"\"}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}\n",
        ]);
        let mut calls = 0;
        let outcome = read_stream(s, |_| calls += 1).await.unwrap();
        assert_eq!(calls, 1);
        assert_eq!(outcome.text, "x");
        assert_eq!(outcome.skipped_frames, 0);
    }

    #[tokio::test]
    async fn test_non_data_lines_ignored() {
        let s = byte_stream(vec![
            ": keep-alive comment\n",
            "\n",
            "event: message\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"y\"}}]}\n",
        ]);
        let outcome = read_stream(s, |_| {}).await.unwrap();
        assert_eq!(outcome.text, "y");
        assert_eq!(outcome.skipped_frames, 0);
    }

    #[tokio::test]
    async fn test_trailing_frame_without_newline() {
        let s = byte_stream(vec![
            "data: {\"choices\":[{\"delta\":{\"content\":\"tail\"}}]}",
        ]);
        let outcome = read_stream(s, |_| {}).await.unwrap();
        assert_eq!(outcome.text, "tail");
    }

    #[tokio::test]
    async fn test_crlf_lines() {
        let s = byte_stream(vec![
            "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\r\ndata: [DONE]\r\n",
        ]);
        let outcome = read_stream(s, |_| {}).await.unwrap();
        assert_eq!(outcome.text, "a");
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let items: Vec<Result<Bytes, LlmError>> = vec![
            Ok(Bytes::from_static(
                b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n",
            )),
            Err(LlmError::Stream("connection reset".into())),
        ];
        let result = read_stream(stream::iter(items).boxed(), |_| {}).await;
        assert!(matches!(result, Err(LlmError::Stream(_))));
    }
}
