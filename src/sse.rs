//! Incremental Server-Sent Events parser.
//!
//! [`SseParser`] accepts text in arbitrarily sized chunks (boundaries need not
//! line up with events, lines, or anything else) and returns the complete
//! signals each chunk produced. It never looks back at emitted events and
//! keeps only the unterminated tail of the input between calls.
//!
//! ## Wire format
//!
//! ```text
//! event: output
//! data: first line
//! data: second line
//! id: 42
//! retry: 3000
//!
//! ```
//!
//! - Lines end with `\n`, `\r\n` or a lone `\r`.
//! - `field: value`: one leading space of the value is dropped.
//! - Lines starting with `:` are comments; unknown fields are ignored.
//! - A blank line dispatches the event, provided at least one `data` line was
//!   seen. The `id` applies to the dispatched event only and is then cleared.

/// Event type used when a frame carries no `event` field.
pub const DEFAULT_EVENT_TYPE: &str = "message";

/// A single dispatched event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSentEvent {
    /// Type tag (`output`, `logs`, `error`, `done`, or anything the server
    /// sends). [`DEFAULT_EVENT_TYPE`] when absent.
    pub event: String,
    /// Payload; multiple `data` lines are joined with `\n`.
    pub data: String,
    /// Identifier of this event, if the frame carried a valid `id` field.
    pub id: Option<String>,
    /// Reconnect interval in milliseconds, if the frame carried one.
    pub retry: Option<u64>,
}

impl ServerSentEvent {
    pub fn new(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            data: data.into(),
            id: None,
            retry: None,
        }
    }
}

/// Output of [`SseParser::feed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseSignal {
    /// A complete event.
    Event(ServerSentEvent),
    /// A valid `retry` field was seen; the server suggests reconnecting after
    /// this many milliseconds. Emitted as soon as the line is parsed.
    ReconnectInterval(u64),
}

/// Stateful, forward-only SSE parser. See the [module docs](self).
#[derive(Debug, Default)]
pub struct SseParser {
    /// Unterminated tail of the input.
    buffer: String,
    /// Bytes of `buffer` already known to contain no line terminator.
    scanned: usize,
    /// Set once the first non-empty chunk has been seen (BOM handling).
    started: bool,
    /// The previous chunk ended in `\r`; a leading `\n` belongs to it.
    swallow_lf: bool,
    event: Option<String>,
    data: Option<String>,
    id: Option<String>,
    retry: Option<u64>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next chunk of text and collect every signal it completes.
    pub fn feed(&mut self, chunk: &str) -> Vec<SseSignal> {
        let mut chunk = chunk;
        if !self.started && !chunk.is_empty() {
            self.started = true;
            chunk = chunk.strip_prefix('\u{feff}').unwrap_or(chunk);
        }

        let mut buffer = std::mem::take(&mut self.buffer);
        buffer.push_str(chunk);

        let mut signals = Vec::new();
        let mut pos = self.scanned;
        let mut line_start = 0;

        loop {
            if self.swallow_lf {
                if pos >= buffer.len() {
                    break;
                }
                if buffer.as_bytes()[pos] == b'\n' {
                    pos += 1;
                    line_start = pos;
                }
                self.swallow_lf = false;
            }

            let Some(offset) = buffer[pos..].find(['\r', '\n']) else {
                break;
            };
            let end = pos + offset;
            self.process_line(&buffer[line_start..end], &mut signals);
            if buffer.as_bytes()[end] == b'\r' {
                self.swallow_lf = true;
            }
            pos = end + 1;
            line_start = pos;
        }

        buffer.drain(..line_start);
        self.scanned = buffer.len();
        self.buffer = buffer;
        signals
    }

    /// Signal end of input.
    ///
    /// A trailing line without terminator is processed, and an event that has
    /// collected data is dispatched even though its blank line never arrived.
    pub fn finish(&mut self) -> Vec<SseSignal> {
        let mut signals = Vec::new();
        let tail = std::mem::take(&mut self.buffer);
        self.scanned = 0;
        if !tail.is_empty() {
            self.process_line(&tail, &mut signals);
        }
        self.dispatch(&mut signals);
        signals
    }

    /// Drop all buffered input and partially parsed fields.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn process_line(&mut self, line: &str, signals: &mut Vec<SseSignal>) {
        if line.is_empty() {
            self.dispatch(signals);
            return;
        }
        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.find(':') {
            Some(colon) => {
                let value = &line[colon + 1..];
                (&line[..colon], value.strip_prefix(' ').unwrap_or(value))
            }
            None => (line, ""),
        };

        match field {
            "event" => self.event = Some(value.to_owned()),
            "data" => match &mut self.data {
                Some(data) => {
                    data.push('\n');
                    data.push_str(value);
                }
                None => self.data = Some(value.to_owned()),
            },
            "id" => {
                if !value.contains('\0') {
                    self.id = Some(value.to_owned());
                }
            }
            "retry" => {
                if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
                    if let Ok(ms) = value.parse::<u64>() {
                        self.retry = Some(ms);
                        signals.push(SseSignal::ReconnectInterval(ms));
                    }
                }
            }
            _ => {}
        }
    }

    fn dispatch(&mut self, signals: &mut Vec<SseSignal>) {
        let event = self.event.take();
        let retry = self.retry.take();
        let Some(data) = self.data.take() else {
            return;
        };
        signals.push(SseSignal::Event(ServerSentEvent {
            event: event.unwrap_or_else(|| DEFAULT_EVENT_TYPE.to_owned()),
            data,
            id: self.id.take(),
            retry,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(signals: Vec<SseSignal>) -> Vec<ServerSentEvent> {
        signals
            .into_iter()
            .filter_map(|s| match s {
                SseSignal::Event(e) => Some(e),
                SseSignal::ReconnectInterval(_) => None,
            })
            .collect()
    }

    fn parse_all(chunks: &[&str]) -> Vec<ServerSentEvent> {
        let mut parser = SseParser::new();
        let mut out = Vec::new();
        for chunk in chunks {
            out.extend(events(parser.feed(chunk)));
        }
        out
    }

    #[test]
    fn single_chunk_yields_one_event() {
        let out = parse_all(&["event: output\ndata: hello\n\n"]);
        assert_eq!(out, vec![ServerSentEvent::new("output", "hello")]);
    }

    #[test]
    fn every_split_offset_yields_the_same_event() {
        let input = "event: output\ndata: hello\n\n";
        for split in 0..=input.len() {
            let (a, b) = input.split_at(split);
            let out = parse_all(&[a, b]);
            assert_eq!(
                out,
                vec![ServerSentEvent::new("output", "hello")],
                "split at {split}"
            );
        }
    }

    #[test]
    fn byte_by_byte_feeding_works() {
        let input = "event: logs\r\ndata: a\r\ndata: b\r\n\r\nevent: done\r\ndata: {}\r\n\r\n";
        let chunks: Vec<String> = input.chars().map(|c| c.to_string()).collect();
        let refs: Vec<&str> = chunks.iter().map(String::as_str).collect();
        let out = parse_all(&refs);
        assert_eq!(
            out,
            vec![
                ServerSentEvent::new("logs", "a\nb"),
                ServerSentEvent::new("done", "{}"),
            ]
        );
    }

    #[test]
    fn multiple_data_lines_are_newline_joined() {
        let out = parse_all(&["data: a\ndata: b\n\n"]);
        assert_eq!(out, vec![ServerSentEvent::new(DEFAULT_EVENT_TYPE, "a\nb")]);
    }

    #[test]
    fn crlf_split_across_chunks_is_one_terminator() {
        // A stray extra blank line would not dispatch anything, but it must not
        // swallow the following field either.
        let out = parse_all(&["data: x\r", "\nevent: output\r", "\n\r", "\n"]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].data, "x");
        assert_eq!(out[0].event, "output");
    }

    #[test]
    fn lone_carriage_return_terminates_lines() {
        let out = parse_all(&["data: one\r\rdata: two\r\r"]);
        assert_eq!(
            out,
            vec![
                ServerSentEvent::new(DEFAULT_EVENT_TYPE, "one"),
                ServerSentEvent::new(DEFAULT_EVENT_TYPE, "two"),
            ]
        );
    }

    #[test]
    fn bom_is_stripped_only_from_first_chunk() {
        let out = parse_all(&["\u{feff}data: a\n\n"]);
        assert_eq!(out[0].data, "a");

        // A BOM later in the stream is ordinary text: it becomes part of the
        // field name, which is then unknown and ignored.
        let out = parse_all(&["data: a\n\n", "\u{feff}data: b\n\n"]);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn comments_and_unknown_fields_are_ignored() {
        let out = parse_all(&[": keep-alive\nfoo: bar\ndata: payload\n\n"]);
        assert_eq!(out, vec![ServerSentEvent::new(DEFAULT_EVENT_TYPE, "payload")]);
    }

    #[test]
    fn only_one_leading_space_is_stripped() {
        let out = parse_all(&["data:  two spaces\ndata:none\n\n"]);
        assert_eq!(out[0].data, " two spaces\nnone");
    }

    #[test]
    fn colons_inside_values_are_preserved() {
        let out = parse_all(&["data: {\"a\": \"b:c\"}\n\n"]);
        assert_eq!(out[0].data, "{\"a\": \"b:c\"}");
    }

    #[test]
    fn field_without_colon_has_empty_value() {
        let out = parse_all(&["data\n\n"]);
        assert_eq!(out, vec![ServerSentEvent::new(DEFAULT_EVENT_TYPE, "")]);
    }

    #[test]
    fn blank_line_without_data_dispatches_nothing() {
        let out = parse_all(&["event: output\n\ndata: later\n\n"]);
        // The event type was discarded together with the empty frame.
        assert_eq!(out, vec![ServerSentEvent::new(DEFAULT_EVENT_TYPE, "later")]);
    }

    #[test]
    fn id_applies_only_to_its_own_event() {
        let out = parse_all(&["id: 7\ndata: first\n\ndata: second\n\n"]);
        assert_eq!(out[0].id.as_deref(), Some("7"));
        assert_eq!(out[1].id, None);
    }

    #[test]
    fn id_with_nul_is_ignored() {
        let out = parse_all(&["id: a\0b\ndata: x\n\n"]);
        assert_eq!(out[0].id, None);
    }

    #[test]
    fn retry_emits_signal_without_touching_data() {
        let mut parser = SseParser::new();
        let signals = parser.feed("data: a\nretry: 2500\ndata: b\n\n");
        assert_eq!(
            signals,
            vec![
                SseSignal::ReconnectInterval(2500),
                SseSignal::Event(ServerSentEvent {
                    event: DEFAULT_EVENT_TYPE.into(),
                    data: "a\nb".into(),
                    id: None,
                    retry: Some(2500),
                }),
            ]
        );
    }

    #[test]
    fn invalid_retry_is_ignored() {
        let mut parser = SseParser::new();
        let signals = parser.feed("retry: soon\nretry: +5\ndata: x\n\n");
        assert_eq!(signals.len(), 1);
        assert!(matches!(&signals[0], SseSignal::Event(e) if e.retry.is_none()));
    }

    #[test]
    fn partial_line_waits_for_terminator() {
        let mut parser = SseParser::new();
        assert!(parser.feed("data: hel").is_empty());
        assert!(parser.feed("lo").is_empty());
        assert!(parser.feed("\n").is_empty());
        let out = events(parser.feed("\n"));
        assert_eq!(out[0].data, "hello");
    }

    #[test]
    fn multibyte_text_survives_chunking() {
        let out = parse_all(&["data: héllo ", "wörld ✓\n", "\n"]);
        assert_eq!(out[0].data, "héllo wörld ✓");
    }

    #[test]
    fn finish_flushes_unterminated_event() {
        let mut parser = SseParser::new();
        assert!(parser.feed("event: output\ndata: tail").is_empty());
        let out = events(parser.finish());
        assert_eq!(out, vec![ServerSentEvent::new("output", "tail")]);
        assert!(parser.finish().is_empty());
    }

    #[test]
    fn reset_discards_partial_state() {
        let mut parser = SseParser::new();
        parser.feed("event: output\ndata: stale\nda");
        parser.reset();
        let out = events(parser.feed("\u{feff}data: fresh\n\n"));
        assert_eq!(out, vec![ServerSentEvent::new(DEFAULT_EVENT_TYPE, "fresh")]);
    }
}
