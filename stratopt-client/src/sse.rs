//! Server-Sent Events decoding for the sweep stream.
//!
//! The backend writes `event: <kind>\ndata: <json>\n\n` blocks. Frames are
//! split on blank lines; multiple `data:` lines are joined with `\n`; lines
//! starting with `:` are comments. When a block has no `event:` line the
//! kind is taken from a `kind` field inside the JSON payload.

use serde::Deserialize;
use std::io::BufRead;

use stratopt_core::OptimizerResponse;

use crate::backend::SweepEvent;
use crate::error::ClientError;

/// One raw SSE block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
}

#[derive(Deserialize)]
struct ProgressPayload {
    current: u64,
    total: u64,
}

#[derive(Deserialize)]
struct ErrorPayload {
    #[serde(alias = "detail")]
    message: String,
}

/// Interpret a raw frame. Unknown kinds decode to `Ok(None)`.
pub fn decode_frame(frame: &SseFrame) -> Result<Option<SweepEvent>, ClientError> {
    let payload: serde_json::Value = serde_json::from_str(&frame.data)
        .map_err(|e| ClientError::Protocol(format!("frame data is not JSON: {e}")))?;

    let kind = match frame.event.as_deref() {
        Some(kind) => kind.to_string(),
        None => match payload.get("kind").and_then(|k| k.as_str()) {
            Some(kind) => kind.to_string(),
            None => return Err(ClientError::Protocol("frame has no event kind".into())),
        },
    };

    let event = match kind.as_str() {
        "progress" => {
            let p: ProgressPayload = serde_json::from_value(payload)
                .map_err(|e| ClientError::Protocol(format!("bad progress frame: {e}")))?;
            SweepEvent::Progress {
                current: p.current,
                total: p.total,
            }
        }
        "result" => {
            let response: OptimizerResponse = serde_json::from_value(payload)?;
            SweepEvent::Result(Box::new(response))
        }
        "error" => {
            let message = match serde_json::from_value::<ErrorPayload>(payload) {
                Ok(p) => p.message,
                Err(_) => frame.data.clone(),
            };
            SweepEvent::Error(message)
        }
        other => {
            tracing::debug!("ignoring unknown sweep event kind {other:?}");
            return Ok(None);
        }
    };
    Ok(Some(event))
}

/// Iterator over decoded sweep events read from an SSE body.
///
/// Stops after the first terminal frame. If the body ends first, yields one
/// `Protocol` error.
pub struct SseDecoder<R> {
    reader: R,
    finished: bool,
}

impl<R: BufRead> SseDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            finished: false,
        }
    }

    /// Read the next raw block, or `None` at end of input.
    fn next_frame(&mut self) -> Result<Option<SseFrame>, ClientError> {
        let mut frame = SseFrame::default();
        let mut has_data = false;
        let mut line = String::new();

        loop {
            line.clear();
            let n = self
                .reader
                .read_line(&mut line)
                .map_err(|e| ClientError::Network(e.to_string()))?;
            if n == 0 {
                return Ok(has_data.then_some(frame));
            }

            let line = line.trim_end_matches(['\r', '\n']);
            if line.is_empty() {
                if has_data {
                    return Ok(Some(frame));
                }
                // A block without data is dispatched as nothing.
                frame = SseFrame::default();
                continue;
            }
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };
            match field {
                "event" => frame.event = Some(value.to_string()),
                "data" => {
                    if has_data {
                        frame.data.push('\n');
                    }
                    frame.data.push_str(value);
                    has_data = true;
                }
                _ => {}
            }
        }
    }
}

impl<R: BufRead> Iterator for SseDecoder<R> {
    type Item = Result<SweepEvent, ClientError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        loop {
            match self.next_frame() {
                Ok(Some(frame)) => match decode_frame(&frame) {
                    Ok(Some(event)) => {
                        if event.is_terminal() {
                            self.finished = true;
                        }
                        return Some(Ok(event));
                    }
                    Ok(None) => continue,
                    Err(e) => {
                        self.finished = true;
                        return Some(Err(e));
                    }
                },
                Ok(None) => {
                    self.finished = true;
                    return Some(Err(ClientError::Protocol(
                        "stream ended without a result or error frame".into(),
                    )));
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const RESULT_JSON: &str = r#"{"best_params":{"MA":50,"DROP":0.01,"CHG4":0.165,"RET3":-0.021,"SPREAD_LVL":7.0},"best_result":{"equity_curve":[{"date":"2024-01-05","strategy":1.0}],"buy_dates":[],"sell_dates":[],"trade_history":[],"final_value":1.0,"apy":0.0},"all_results":[{"MA":50,"DROP":0.01,"CHG4":0.165,"RET3":-0.021,"SPREAD_LVL":7.0,"APY":0.0,"final_value":1.0}]}"#;

    fn decode(body: &str) -> Vec<Result<SweepEvent, ClientError>> {
        SseDecoder::new(Cursor::new(body.to_string())).collect()
    }

    #[test]
    fn progress_then_result() {
        let body = format!(
            "event: progress\ndata: {{\"current\": 0, \"total\": 1}}\n\n\
             event: progress\ndata: {{\"current\": 1, \"total\": 1}}\n\n\
             event: result\ndata: {RESULT_JSON}\n\n"
        );
        let events = decode(&body);
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], Ok(SweepEvent::Progress { current: 0, total: 1 })));
        assert!(matches!(events[1], Ok(SweepEvent::Progress { current: 1, total: 1 })));
        match &events[2] {
            Ok(SweepEvent::Result(response)) => {
                assert_eq!(response.all_results.len(), 1);
                assert_eq!(response.best_params.ma, 50);
            }
            other => panic!("expected result, got {other:?}"),
        }
    }

    #[test]
    fn error_frame_carries_message() {
        let events = decode("event: error\ndata: {\"message\": \"Optimizer timed out\"}\n\n");
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], Ok(SweepEvent::Error(m)) if m == "Optimizer timed out"));
    }

    #[test]
    fn kind_field_stands_in_for_event_line() {
        let events = decode(
            "data: {\"kind\": \"progress\", \"current\": 2, \"total\": 4}\n\n\
             data: {\"kind\": \"error\", \"message\": \"boom\"}\n\n",
        );
        assert!(matches!(events[0], Ok(SweepEvent::Progress { current: 2, total: 4 })));
        assert!(matches!(&events[1], Ok(SweepEvent::Error(m)) if m == "boom"));
    }

    #[test]
    fn comments_crlf_and_unknown_kinds_are_skipped() {
        let body = ": keepalive\r\n\r\n\
                    event: heartbeat\r\ndata: {}\r\n\r\n\
                    event: error\r\ndata: {\"message\": \"x\"}\r\n\r\n";
        let events = decode(body);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], Ok(SweepEvent::Error(m)) if m == "x"));
    }

    #[test]
    fn multi_line_data_is_joined() {
        let body = "event: progress\ndata: {\"current\": 1,\ndata:  \"total\": 3}\n\n";
        let events = decode(&format!("{body}event: error\ndata: {{\"message\":\"m\"}}\n\n"));
        assert!(matches!(events[0], Ok(SweepEvent::Progress { current: 1, total: 3 })));
    }

    #[test]
    fn truncated_stream_is_a_protocol_error() {
        let events = decode("event: progress\ndata: {\"current\": 0, \"total\": 2}\n\n");
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], Err(ClientError::Protocol(_))));
    }

    #[test]
    fn nothing_after_terminal_frame() {
        let events = decode(
            "event: error\ndata: {\"message\": \"a\"}\n\n\
             event: progress\ndata: {\"current\": 0, \"total\": 2}\n\n",
        );
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn last_frame_without_trailing_blank_line_still_counts() {
        let events = decode("event: error\ndata: {\"message\": \"tail\"}");
        assert!(matches!(&events[0], Ok(SweepEvent::Error(m)) if m == "tail"));
    }

    #[test]
    fn garbage_data_is_a_protocol_error() {
        let events = decode("event: progress\ndata: not json\n\n");
        assert!(matches!(events[0], Err(ClientError::Protocol(_))));
        assert_eq!(events.len(), 1);
    }
}
