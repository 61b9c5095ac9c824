//! In-memory [`Transport`] for exercising the client without a network.
//!
//! Responses are scripted per URL. GET replies are served in FIFO order, so a URL that is
//! fetched repeatedly (e.g. comment pages differing only by `continuation`) gets one reply
//! per scripted entry. HEAD replies are sticky. Every request is recorded.

use crate::error::Error;
use crate::invidious_api::transport::{RawResponse, Transport};
use http::{Method, StatusCode};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::future::{Future, ready};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A request the mock has seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
}

impl RecordedRequest {
    /// Value of the first query parameter named `key`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Default)]
struct MockState {
    get_replies: HashMap<String, VecDeque<Result<RawResponse, String>>>,
    head_replies: HashMap<String, Result<StatusCode, String>>,
    requests: Vec<RecordedRequest>,
}

/// Cloning shares the script and the request log.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a `200 OK` JSON reply for `GET url`.
    pub fn respond_json(&self, url: impl Into<String>, body: Value) -> &Self {
        self.respond(url, StatusCode::OK, body.to_string())
    }

    /// Queue an arbitrary reply for `GET url`.
    pub fn respond(&self, url: impl Into<String>, status: StatusCode, body: impl Into<String>) -> &Self {
        self.state()
            .get_replies
            .entry(url.into())
            .or_default()
            .push_back(Ok(RawResponse {
                status,
                body: body.into(),
            }));
        self
    }

    /// Queue a transport failure for `GET url`.
    pub fn fail_get(&self, url: impl Into<String>, message: impl Into<String>) -> &Self {
        self.state()
            .get_replies
            .entry(url.into())
            .or_default()
            .push_back(Err(message.into()));
        self
    }

    /// Answer every `HEAD url` with `status`.
    pub fn head_status(&self, url: impl Into<String>, status: StatusCode) -> &Self {
        self.state().head_replies.insert(url.into(), Ok(status));
        self
    }

    /// Fail every `HEAD url` at the transport level.
    pub fn fail_head(&self, url: impl Into<String>, message: impl Into<String>) -> &Self {
        self.state()
            .head_replies
            .insert(url.into(), Err(message.into()));
        self
    }

    /// All requests in the order they were issued.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state().requests.clone()
    }

    pub fn requests_with(&self, method: Method) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method)
            .collect()
    }
}

impl Transport for MockTransport {
    fn get(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> impl Future<Output = Result<RawResponse, Error>> + Send {
        let mut state = self.state();
        state.requests.push(RecordedRequest {
            method: Method::GET,
            url: url.to_string(),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        });
        let reply = match state.get_replies.get_mut(url).and_then(VecDeque::pop_front) {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(Error::TransportMessage(message)),
            None => Err(Error::TransportMessage(format!("no reply scripted for GET {url}"))),
        };
        ready(reply)
    }

    fn head(&self, url: &str) -> impl Future<Output = Result<StatusCode, Error>> + Send {
        let mut state = self.state();
        state.requests.push(RecordedRequest {
            method: Method::HEAD,
            url: url.to_string(),
            query: Vec::new(),
        });
        let reply = match state.head_replies.get(url) {
            Some(Ok(status)) => Ok(*status),
            Some(Err(message)) => Err(Error::TransportMessage(message.clone())),
            None => Err(Error::TransportMessage(format!("no reply scripted for HEAD {url}"))),
        };
        ready(reply)
    }
}
