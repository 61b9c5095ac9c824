//! Error types shared by the views, the transport, and the client.

use http::StatusCode;
use thiserror::Error;

/// Failures surfaced by this crate.
///
/// Client methods return [`eyre::Result`] and attach context at every network step; the
/// variant below is always the root cause and can be recovered with
/// [`eyre::Report::downcast_ref`].
#[derive(Debug, Error)]
pub enum Error {
    /// Connection, DNS, TLS or timeout failure reported by the transport.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Transport failure that did not originate in reqwest (e.g. a mock transport).
    #[error("transport error: {0}")]
    TransportMessage(String),

    /// The server answered with a non-2xx status.
    #[error("request to {url} failed with status {status}: {body}")]
    Http {
        status: StatusCode,
        url: String,
        body: String,
    },

    /// A view accessor needed a sequence field the record does not carry.
    #[error("missing required field `{field}`")]
    MissingField { field: &'static str },

    /// The response body was not valid JSON.
    #[error("could not decode response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// A [`Video`](crate::invidious_api::Video) was passed where an id is needed, but it has none.
    #[error("video record has no `videoId`")]
    MissingVideoId,
}

impl Error {
    /// The HTTP status, if this is an [`Error::Http`].
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
