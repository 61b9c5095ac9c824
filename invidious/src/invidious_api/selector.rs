//! Instance discovery and selection.
//!
//! [`InstanceSelector::choose_instance`] walks the directory in the server's health order,
//! drops candidates that fail the [`SelectionCriteria`], and memoizes the outcome per
//! criteria in a small LRU so repeated calls skip the directory fetch and the probes.

use crate::invidious_api::instances::{Instance, InstancesList};
use crate::invidious_api::transport::{Transport, decode_json};
use eyre::Context;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::instrument;

/// The public instance directory.
pub const DIRECTORY_URL: &str = "https://api.invidious.io/instances.json";

/// A video every healthy instance can serve; probed with `HEAD` to check API access.
pub const PROBE_VIDEO_ID: &str = "dQw4w9WgXcQ";

/// How many distinct criteria [`InstanceSelector`] remembers.
pub const SELECTION_CACHE_CAPACITY: usize = 3;

/// What [`InstanceSelector::choose_instance`] looks for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionCriteria {
    /// Country codes to prefer, compared case-insensitively with the instance region.
    ///
    /// Under the default policy this never changes the outcome: the first candidate that
    /// survives the other filters is returned whether or not its region matches. Set
    /// [`scan_all_for_country`](Self::scan_all_for_country) to make it effective.
    pub prefer_country_codes: Option<Vec<String>>,
    /// Skip instances of type `onion`.
    pub no_onions: bool,
    /// Only return instances whose API answers a `HEAD` probe with `200`.
    pub only_accessible: bool,
    /// Look past the first survivor for one in a preferred country, falling back to the
    /// first survivor if none matches.
    pub scan_all_for_country: bool,
}

impl Default for SelectionCriteria {
    fn default() -> Self {
        Self {
            prefer_country_codes: None,
            no_onions: true,
            only_accessible: true,
            scan_all_for_country: false,
        }
    }
}

impl SelectionCriteria {
    fn prefers(&self, instance: &Instance) -> bool {
        match (&self.prefer_country_codes, instance.region()) {
            (Some(codes), Some(region)) => codes.iter().any(|c| c.eq_ignore_ascii_case(region)),
            _ => false,
        }
    }
}

/// Fixed-capacity, least-recently-used memo of selection outcomes.
///
/// "No instance matched" is remembered like any other outcome. Failed selections are
/// never stored.
#[derive(Debug)]
pub struct SelectionCache {
    capacity: usize,
    /// Least recently used first.
    entries: VecDeque<(SelectionCriteria, Option<Instance>)>,
}

impl SelectionCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up `key` and marks it most recently used.
    pub fn get(&mut self, key: &SelectionCriteria) -> Option<Option<Instance>> {
        let position = self.entries.iter().position(|(k, _)| k == key)?;
        let entry = self.entries.remove(position)?;
        let value = entry.1.clone();
        self.entries.push_back(entry);
        Some(value)
    }

    pub fn insert(&mut self, key: SelectionCriteria, value: Option<Instance>) {
        if self.capacity == 0 {
            return;
        }
        if let Some(position) = self.entries.iter().position(|(k, _)| *k == key) {
            self.entries.remove(position);
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back((key, value));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Fetches the instance directory and picks an instance to talk to.
///
/// Safe to share between tasks; the memo is behind a mutex that is never held across a
/// network call, so two concurrent misses for the same criteria may both do the work.
#[derive(Debug)]
pub struct InstanceSelector<T> {
    transport: T,
    directory_url: String,
    probe_video_id: String,
    cache: Mutex<SelectionCache>,
}

impl<T: Transport> InstanceSelector<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            directory_url: DIRECTORY_URL.to_string(),
            probe_video_id: PROBE_VIDEO_ID.to_string(),
            cache: Mutex::new(SelectionCache::new(SELECTION_CACHE_CAPACITY)),
        }
    }

    pub fn with_directory_url(mut self, url: impl Into<String>) -> Self {
        self.directory_url = url.into();
        self
    }

    pub fn with_probe_video_id(mut self, video_id: impl Into<String>) -> Self {
        self.probe_video_id = video_id.into();
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn cache(&self) -> MutexGuard<'_, SelectionCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Forget every memoized selection.
    pub fn clear_cache(&self) {
        self.cache().clear();
    }

    /// Fetches the full directory. Never cached.
    ///
    /// `query` is passed through, e.g. `[("sort_by", "health")]`.
    #[instrument(skip(self))]
    pub async fn get_instances(&self, query: &[(&str, &str)]) -> eyre::Result<InstancesList> {
        let response = self
            .transport
            .get(&self.directory_url, query)
            .await
            .context("fetch instance directory")?;
        let body = decode_json(&self.directory_url, response)
            .context("read instance directory")?;
        let instances = InstancesList::from(body);

        tracing::debug!(count = instances.len(), "fetched instance directory");
        Ok(instances)
    }

    /// Whether the instance's API answers the liveness probe with exactly `200`.
    #[instrument(skip(self), ret, level = tracing::Level::DEBUG)]
    pub async fn probe(&self, uri: &str) -> bool {
        let url = format!(
            "{}/api/v1/videos/{}",
            uri.trim_end_matches('/'),
            self.probe_video_id
        );
        match self.transport.head(&url).await {
            Ok(status) => status == StatusCode::OK,
            Err(e) => {
                tracing::debug!(%url, error = %e, "liveness probe failed");
                false
            }
        }
    }

    /// Picks an instance matching `criteria`, or `None` if every candidate was filtered out.
    ///
    /// Directory fetch errors propagate. Outcomes are memoized per `criteria`.
    #[instrument(skip(self))]
    pub async fn choose_instance(
        &self,
        criteria: &SelectionCriteria,
    ) -> eyre::Result<Option<Instance>> {
        if let Some(hit) = self.cache().get(criteria) {
            tracing::trace!(host = ?hit.as_ref().and_then(Instance::host), "selection cache hit");
            return Ok(hit);
        }

        let chosen = self.select(criteria).await?;
        self.cache().insert(criteria.clone(), chosen.clone());

        match &chosen {
            Some(instance) => tracing::debug!(host = ?instance.host(), "selected instance"),
            None => tracing::debug!("no instance matched"),
        }
        Ok(chosen)
    }

    async fn select(&self, criteria: &SelectionCriteria) -> eyre::Result<Option<Instance>> {
        let directory = self.get_instances(&[("sort_by", "health")]).await?;

        let mut first_survivor = None;
        for instance in directory {
            if criteria.no_onions && instance.is_onion() {
                tracing::trace!(host = ?instance.host(), "skipping onion instance");
                continue;
            }

            if criteria.only_accessible {
                let Some(uri) = instance.uri() else {
                    tracing::trace!(host = ?instance.host(), "skipping unprobeable instance");
                    continue;
                };
                if !self.probe(uri).await {
                    continue;
                }
            }

            if !criteria.scan_all_for_country
                || criteria.prefer_country_codes.is_none()
                || criteria.prefers(&instance)
            {
                return Ok(Some(instance));
            }

            if first_survivor.is_none() {
                first_survivor = Some(instance);
            }
        }

        Ok(first_survivor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::invidious_api::mock::MockTransport;
    use http::Method;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    const DIRECTORY: &str = "https://directory.example/instances.json";

    fn selector(mock: &MockTransport) -> InstanceSelector<MockTransport> {
        InstanceSelector::new(mock.clone()).with_directory_url(DIRECTORY)
    }

    fn probe_url(uri: &str) -> String {
        format!("{uri}/api/v1/videos/{PROBE_VIDEO_ID}")
    }

    fn directory() -> Value {
        json!([
            ["hidden.onion", { "type": "onion", "region": "DE", "uri": "http://hidden.onion" }],
            ["a.example", { "type": "https", "region": "us", "uri": "https://a.example/", "stats": { "error": "x" } }],
            ["b.example", { "type": "https", "region": "nl", "uri": "https://b.example" }]
        ])
    }

    fn host(instance: &Option<Instance>) -> Option<&str> {
        instance.as_ref().and_then(Instance::host)
    }

    #[tokio::test]
    async fn first_survivor_wins_regardless_of_country() {
        let mock = MockTransport::new();
        mock.respond_json(
            DIRECTORY,
            json!([
                ["a.example", { "type": "https", "region": "us", "stats": { "error": "x" } }],
                ["b.example", { "type": "https", "region": "nl" }]
            ]),
        );

        let criteria = SelectionCriteria {
            prefer_country_codes: Some(vec!["nl".to_string()]),
            no_onions: true,
            only_accessible: false,
            scan_all_for_country: false,
        };
        let chosen = selector(&mock).choose_instance(&criteria).await.unwrap();

        assert_eq!(host(&chosen), Some("a.example"));
        assert_eq!(chosen.unwrap().stats(), None);
        assert!(mock.requests_with(Method::HEAD).is_empty());
    }

    #[tokio::test]
    async fn instances_without_uri_cannot_be_probed() {
        let mock = MockTransport::new();
        mock.respond_json(
            DIRECTORY,
            json!([
                ["a.example", { "type": "https" }],
                ["b.example", { "type": "https", "uri": "https://b.example" }]
            ]),
        )
        .head_status(probe_url("https://b.example"), StatusCode::OK);

        let chosen = selector(&mock)
            .choose_instance(&SelectionCriteria::default())
            .await
            .unwrap();

        assert_eq!(host(&chosen), Some("b.example"));
        assert_eq!(mock.requests_with(Method::HEAD).len(), 1);
    }

    #[tokio::test]
    async fn directory_is_requested_sorted_by_health() {
        let mock = MockTransport::new();
        mock.respond_json(DIRECTORY, directory());
        let criteria = SelectionCriteria {
            only_accessible: false,
            ..Default::default()
        };
        selector(&mock).choose_instance(&criteria).await.unwrap();

        let requests = mock.requests_with(Method::GET);
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].param("sort_by"), Some("health"));
    }

    #[tokio::test]
    async fn onions_are_skipped_and_probes_must_return_200() {
        let mock = MockTransport::new();
        mock.respond_json(DIRECTORY, directory())
            .head_status(probe_url("https://a.example"), StatusCode::FORBIDDEN)
            .head_status(probe_url("https://b.example"), StatusCode::OK);

        let chosen = selector(&mock)
            .choose_instance(&SelectionCriteria::default())
            .await
            .unwrap();

        assert_eq!(host(&chosen), Some("b.example"));
        let probed: Vec<_> = mock
            .requests_with(Method::HEAD)
            .into_iter()
            .map(|r| r.url)
            .collect();
        assert_eq!(
            probed,
            vec![probe_url("https://a.example"), probe_url("https://b.example")]
        );
    }

    #[tokio::test]
    async fn probe_transport_failure_skips_candidate() {
        let mock = MockTransport::new();
        mock.respond_json(DIRECTORY, directory())
            .fail_head(probe_url("https://a.example"), "connection refused")
            .head_status(probe_url("https://b.example"), StatusCode::OK);

        let chosen = selector(&mock)
            .choose_instance(&SelectionCriteria::default())
            .await
            .unwrap();
        assert_eq!(host(&chosen), Some("b.example"));
    }

    #[tokio::test]
    async fn onions_allowed_when_asked() {
        let mock = MockTransport::new();
        mock.respond_json(DIRECTORY, directory());
        let criteria = SelectionCriteria {
            no_onions: false,
            only_accessible: false,
            ..Default::default()
        };
        let chosen = selector(&mock).choose_instance(&criteria).await.unwrap();
        assert_eq!(host(&chosen), Some("hidden.onion"));
    }

    #[tokio::test]
    async fn no_survivor_is_none() {
        let mock = MockTransport::new();
        mock.respond_json(DIRECTORY, directory())
            .head_status(probe_url("https://a.example"), StatusCode::BAD_GATEWAY)
            .head_status(probe_url("https://b.example"), StatusCode::NOT_FOUND);

        let chosen = selector(&mock)
            .choose_instance(&SelectionCriteria::default())
            .await
            .unwrap();
        assert_eq!(chosen, None);
    }

    #[tokio::test]
    async fn scan_all_prefers_country_match() {
        let mock = MockTransport::new();
        mock.respond_json(DIRECTORY, directory());
        let criteria = SelectionCriteria {
            prefer_country_codes: Some(vec!["NL".to_string()]),
            only_accessible: false,
            scan_all_for_country: true,
            ..Default::default()
        };
        let chosen = selector(&mock).choose_instance(&criteria).await.unwrap();
        assert_eq!(host(&chosen), Some("b.example"));
    }

    #[tokio::test]
    async fn scan_all_falls_back_to_first_survivor() {
        let mock = MockTransport::new();
        mock.respond_json(DIRECTORY, directory());
        let criteria = SelectionCriteria {
            prefer_country_codes: Some(vec!["jp".to_string()]),
            only_accessible: false,
            scan_all_for_country: true,
            ..Default::default()
        };
        let chosen = selector(&mock).choose_instance(&criteria).await.unwrap();
        assert_eq!(host(&chosen), Some("a.example"));
    }

    #[tokio::test]
    async fn repeated_criteria_are_memoized() {
        let mock = MockTransport::new();
        // a single scripted reply: a second directory fetch would fail
        mock.respond_json(DIRECTORY, directory())
            .head_status(probe_url("https://a.example"), StatusCode::OK);
        let selector = selector(&mock);

        let first = selector
            .choose_instance(&SelectionCriteria::default())
            .await
            .unwrap();
        let second = selector
            .choose_instance(&SelectionCriteria::default())
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(mock.requests_with(Method::GET).len(), 1);
        assert_eq!(mock.requests_with(Method::HEAD).len(), 1);
    }

    #[tokio::test]
    async fn directory_failure_propagates_and_is_not_cached() {
        let mock = MockTransport::new();
        mock.respond(DIRECTORY, StatusCode::SERVICE_UNAVAILABLE, "down")
            .respond_json(DIRECTORY, directory());
        let selector = selector(&mock);
        let criteria = SelectionCriteria {
            only_accessible: false,
            ..Default::default()
        };

        let err = selector.choose_instance(&criteria).await.unwrap_err();
        let cause = err.downcast_ref::<Error>().unwrap();
        assert_eq!(cause.status(), Some(StatusCode::SERVICE_UNAVAILABLE));

        let chosen = selector.choose_instance(&criteria).await.unwrap();
        assert_eq!(host(&chosen), Some("a.example"));
    }

    #[tokio::test]
    async fn directory_transport_failure_propagates_and_is_not_cached() {
        let mock = MockTransport::new();
        mock.fail_get(DIRECTORY, "connection refused")
            .respond_json(DIRECTORY, directory());
        let selector = selector(&mock);
        let criteria = SelectionCriteria {
            only_accessible: false,
            ..Default::default()
        };

        let err = selector.choose_instance(&criteria).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::TransportMessage(message)) if message == "connection refused"
        ));

        let chosen = selector.choose_instance(&criteria).await.unwrap();
        assert_eq!(host(&chosen), Some("a.example"));
        assert_eq!(mock.requests_with(Method::GET).len(), 2);
    }

    #[tokio::test]
    async fn cleared_cache_fetches_again() {
        let mock = MockTransport::new();
        mock.respond_json(DIRECTORY, directory())
            .respond_json(DIRECTORY, json!([]));
        let selector = selector(&mock);
        let criteria = SelectionCriteria {
            only_accessible: false,
            ..Default::default()
        };

        let first = selector.choose_instance(&criteria).await.unwrap();
        assert_eq!(host(&first), Some("a.example"));

        selector.clear_cache();
        let second = selector.choose_instance(&criteria).await.unwrap();
        assert_eq!(second, None);
        assert_eq!(mock.requests_with(Method::GET).len(), 2);
    }

    #[tokio::test]
    async fn probe_uses_configured_video() {
        let mock = MockTransport::new();
        mock.head_status(
            "https://a.example/api/v1/videos/jNQXAC9IVRw",
            StatusCode::OK,
        );
        let selector = selector(&mock).with_probe_video_id("jNQXAC9IVRw");

        assert!(selector.probe("https://a.example/").await);
        assert!(!selector.probe("https://b.example").await);
    }

    #[test]
    fn cache_evicts_least_recently_used() {
        let key = |code: &str| SelectionCriteria {
            prefer_country_codes: Some(vec![code.to_string()]),
            ..Default::default()
        };
        let mut cache = SelectionCache::new(3);
        cache.insert(key("a"), None);
        cache.insert(key("b"), None);
        cache.insert(key("c"), None);
        // touch "a" so "b" becomes the oldest
        assert_eq!(cache.get(&key("a")), Some(None));
        cache.insert(key("d"), None);

        assert_eq!(cache.len(), 3);
        assert_eq!(cache.get(&key("b")), None);
        assert!(cache.get(&key("a")).is_some());
        assert!(cache.get(&key("c")).is_some());
        assert!(cache.get(&key("d")).is_some());
    }

    #[test]
    fn cache_reinsert_replaces() {
        let mut cache = SelectionCache::new(3);
        let instance = Instance::from(json!(["x", {}]));
        cache.insert(SelectionCriteria::default(), None);
        cache.insert(SelectionCriteria::default(), Some(instance.clone()));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&SelectionCriteria::default()), Some(Some(instance)));
    }
}
