//! Live event feed of a streaming job.
//!
//! The byte body of a `text/event-stream` response is decoded as UTF-8 (a
//! multi-byte character may straddle chunks), parsed into
//! [`ServerSentEvent`]s, and yielded one by one. Events are pulled: nothing is
//! read from the body until the consumer asks for the next item.
//!
//! Two event types end the feed: `done` (yielded, then the stream ends) and
//! `error` (surfaced as [`Error::Stream`] carrying the event data).

use crate::client::{Client, RequestOptions};
use crate::error::{Error, Result};
use crate::sse::{ServerSentEvent, SseParser, SseSignal};
use crate::transport::ByteStream;
use futures::stream::{Stream, StreamExt};
use reqwest::Method;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

/// A pinned, boxed stream of parsed events.
pub type JobEventStream = Pin<Box<dyn Stream<Item = Result<ServerSentEvent>> + Send>>;

/// Event type marking successful completion.
pub const DONE_EVENT: &str = "done";

/// Event type carrying a server-side failure.
pub const ERROR_EVENT: &str = "error";

pub(crate) async fn open(
    client: &Client,
    url: &str,
    cancel: CancellationToken,
) -> Result<JobEventStream> {
    let options = RequestOptions::new()
        .header(ACCEPT.as_str(), "text/event-stream")
        .header(CACHE_CONTROL.as_str(), "no-store");
    let response = client.request(Method::GET, url, options).await?;
    tracing::debug!(url = %url, "Event stream opened");
    Ok(event_stream(response.into_stream(), cancel))
}

/// Turn a raw `text/event-stream` body into a stream of events.
///
/// Once `cancel` fires the stream ends without yielding anything further and
/// the body is dropped.
pub fn event_stream(body: ByteStream, cancel: CancellationToken) -> JobEventStream {
    Box::pin(async_stream::stream! {
        let mut body = body;
        let mut decoder = Utf8Decoder::default();
        let mut parser = SseParser::new();

        'read: loop {
            if cancel.is_cancelled() {
                break;
            }
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                next = body.next() => next,
            };

            let (signals, at_end) = match next {
                Some(Ok(chunk)) => (parser.feed(&decoder.decode(&chunk)), false),
                Some(Err(e)) => {
                    yield Err(e);
                    break;
                }
                None => {
                    let mut signals = parser.feed(&decoder.finish());
                    signals.extend(parser.finish());
                    (signals, true)
                }
            };

            for event in into_events(signals) {
                if cancel.is_cancelled() {
                    break 'read;
                }
                match classify(event) {
                    Step::Yield(item) => yield item,
                    Step::Last(item) => {
                        yield item;
                        break 'read;
                    }
                }
            }
            if at_end {
                break;
            }
        }
    })
}

enum Step {
    Yield(Result<ServerSentEvent>),
    Last(Result<ServerSentEvent>),
}

fn classify(event: ServerSentEvent) -> Step {
    match event.event.as_str() {
        ERROR_EVENT => Step::Last(Err(Error::Stream(event.data))),
        DONE_EVENT => Step::Last(Ok(event)),
        _ => Step::Yield(Ok(event)),
    }
}

fn into_events(signals: Vec<SseSignal>) -> impl Iterator<Item = ServerSentEvent> {
    signals.into_iter().filter_map(|signal| match signal {
        SseSignal::Event(event) => Some(event),
        SseSignal::ReconnectInterval(ms) => {
            tracing::debug!(retry_ms = ms, "Server suggested reconnect interval");
            None
        }
    })
}

/// Streaming UTF-8 decoder.
///
/// Holds back an incomplete trailing sequence until the next chunk completes
/// it; invalid sequences become U+FFFD.
#[derive(Debug, Default)]
struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let mut out = String::with_capacity(self.pending.len());
        let mut rest: &[u8] = &self.pending;

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    rest = &[];
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }

        let remaining = rest.to_vec();
        self.pending = remaining;
        out
    }

    /// Flush whatever is left; an incomplete sequence becomes U+FFFD.
    fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        self.pending.clear();
        char::REPLACEMENT_CHARACTER.to_string()
    }
}
