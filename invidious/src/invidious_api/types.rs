//! Shared view plumbing and the continuation-cursor page stream.

use crate::error::Error;
use jiff::Timestamp;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};
use tokio_stream::{Stream, StreamExt};

/// A read-only projection over one raw JSON record.
///
/// Views never mutate the record they wrap. Accessors for optional fields return `None`
/// when the key is absent or `null`; only a few sequence accessors treat absence as an
/// error (see [`Fields::required_array`]).
pub trait View: From<Value> {
    /// The wrapped record.
    fn raw(&self) -> &Value;

    /// Gives the record back.
    fn into_raw(self) -> Value;
}

/// A page that may point at the page after it.
pub trait Continued {
    /// The opaque cursor for the next page, if the server minted one.
    fn continuation(&self) -> Option<&str>;
}

/// Typed lookups on a raw record.
///
/// `null` is treated exactly like a missing key.
pub(crate) trait Fields {
    fn field(&self, key: &str) -> Option<&Value>;

    fn str_field(&self, key: &str) -> Option<&str> {
        self.field(key).and_then(Value::as_str)
    }

    fn bool_field(&self, key: &str) -> Option<bool> {
        self.field(key).and_then(Value::as_bool)
    }

    fn u64_field(&self, key: &str) -> Option<u64> {
        self.field(key).and_then(Value::as_u64)
    }

    fn u32_field(&self, key: &str) -> Option<u32> {
        self.u64_field(key).and_then(|v| u32::try_from(v).ok())
    }

    /// POSIX seconds, as used by video and comment `published`.
    fn epoch_field(&self, key: &str) -> Option<Timestamp> {
        let value = self.field(key)?;
        let seconds = value
            .as_i64()
            .or_else(|| value.as_f64().map(|f| f.trunc() as i64))?;
        Timestamp::from_second(seconds).ok()
    }

    /// ISO-8601 strings, as used by monitor and stats creation dates.
    fn iso_field(&self, key: &str) -> Option<Timestamp> {
        parse_iso8601(self.str_field(key)?)
    }

    /// A sequence the upstream contract promises; absence is an error, not an empty list.
    fn required_array(&self, key: &'static str) -> Result<&[Value], Error> {
        self.field(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .ok_or(Error::MissingField { field: key })
    }

    /// A sequence that is genuinely optional; absence reads as empty.
    fn optional_array(&self, key: &str) -> &[Value] {
        self.field(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

impl Fields for Value {
    fn field(&self, key: &str) -> Option<&Value> {
        self.get(key).filter(|v| !v.is_null())
    }
}

/// Parses an ISO-8601 instant. Values without an offset are taken as UTC.
pub(crate) fn parse_iso8601(raw: &str) -> Option<Timestamp> {
    if let Ok(ts) = raw.parse::<Timestamp>() {
        return Some(ts);
    }
    let civil: jiff::civil::DateTime = raw.parse().ok()?;
    civil
        .to_zoned(jiff::tz::TimeZone::UTC)
        .ok()
        .map(|zoned| zoned.timestamp())
}

/// A boxed, not-yet-polled request for one page.
pub type PageFuture<'a, P> = Pin<Box<dyn Future<Output = eyre::Result<P>> + Send + 'a>>;

type Fetcher<'a, P> = Box<dyn Fn(Option<String>) -> PageFuture<'a, P> + Send + 'a>;

/// A stream of pages driven by server-minted continuation cursors.
///
/// The first poll issues the request without a cursor. Each page's cursor (if present and
/// non-empty) is used for exactly one follow-up request, which is only created after the
/// page has been yielded and only polled when the consumer asks for the next item. At most
/// one request is ever outstanding, and dropping the stream between items cancels nothing
/// because nothing is in flight.
///
/// A failed fetch yields the error and ends the stream. The stream cannot be restarted;
/// build a new one to start over from the first page.
pub struct CursorStream<'a, P> {
    /// Produces the request for a given cursor
    fetcher: Fetcher<'a, P>,
    /// The request for the next page, if one is due
    pending_request: Option<PageFuture<'a, P>>,
    /// Whether a terminal page or an error has been seen
    is_done: bool,
    pages_fetched: usize,
}

impl<'a, P> CursorStream<'a, P> {
    /// Create a stream that starts from the first page (no cursor).
    pub fn new<F, Fut>(fetcher: F) -> Self
    where
        F: Fn(Option<String>) -> Fut + Send + 'a,
        Fut: Future<Output = eyre::Result<P>> + Send + 'a,
    {
        Self::starting_at(None, fetcher)
    }

    /// Create a stream whose first request already carries `cursor`.
    pub fn starting_at<F, Fut>(cursor: Option<String>, fetcher: F) -> Self
    where
        F: Fn(Option<String>) -> Fut + Send + 'a,
        Fut: Future<Output = eyre::Result<P>> + Send + 'a,
    {
        let fetcher: Fetcher<'a, P> =
            Box::new(move |cursor| -> PageFuture<'a, P> { Box::pin(fetcher(cursor)) });
        let first_page = fetcher(cursor);
        Self {
            fetcher,
            pending_request: Some(first_page),
            is_done: false,
            pages_fetched: 0,
        }
    }

    /// Whether another page may still be produced.
    pub fn has_next(&self) -> bool {
        !self.is_done
    }

    /// Number of pages successfully fetched so far.
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }
}

impl<'a, P: Continued> CursorStream<'a, P> {
    /// Fetch the next page, or `None` once the stream is exhausted.
    pub async fn advance(&mut self) -> Option<eyre::Result<P>> {
        self.next().await
    }
}

impl<'a, P: Continued> Stream for CursorStream<'a, P> {
    type Item = eyre::Result<P>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Option<Self::Item>> {
        if self.is_done {
            return Poll::Ready(None);
        }

        let Some(pending) = self.pending_request.as_mut() else {
            self.is_done = true;
            return Poll::Ready(None);
        };

        match pending.as_mut().poll(cx) {
            Poll::Ready(Ok(page)) => {
                self.pages_fetched += 1;
                let next_cursor = page
                    .continuation()
                    .filter(|cursor| !cursor.is_empty())
                    .map(str::to_owned);

                if let Some(cursor) = next_cursor {
                    // set up the follow-up request, but leave it unpolled
                    let next = (self.fetcher)(Some(cursor));
                    self.pending_request = Some(next);
                } else {
                    self.pending_request = None;
                    self.is_done = true;
                }

                Poll::Ready(Some(Ok(page)))
            }
            Poll::Ready(Err(e)) => {
                self.pending_request = None;
                self.is_done = true;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
