//! Client configuration.

use crate::invidious_api::selector::{DIRECTORY_URL, SelectionCriteria};
use crate::invidious_api::transport::DEFAULT_USER_AGENT;
use serde::{Deserialize, Serialize};

/// How to find an instance and what to send to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Use this instance instead of asking the directory.
    pub instance: Option<String>,
    /// Sent with every request, e.g. `("hl", "de")`.
    pub additional_parameters: Vec<(String, String)>,
    pub prefer_country_codes: Option<Vec<String>>,
    pub no_onions: bool,
    pub only_accessible: bool,
    /// See [`SelectionCriteria::scan_all_for_country`].
    pub scan_all_for_country: bool,
    pub directory_url: String,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            instance: None,
            additional_parameters: Vec::new(),
            prefer_country_codes: None,
            no_onions: true,
            only_accessible: true,
            scan_all_for_country: false,
            directory_url: DIRECTORY_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ClientConfig {
    /// Reads configuration from environment variables.
    ///
    /// | Variable | Effect |
    /// |---|---|
    /// | `INVIDIOUS_INSTANCE` | fixed instance URL, skips selection |
    /// | `INVIDIOUS_HL` | `hl` parameter sent with every request |
    /// | `INVIDIOUS_PREFER_COUNTRIES` | comma separated country codes |
    /// | `INVIDIOUS_ALLOW_ONIONS` | consider onion instances |
    /// | `INVIDIOUS_SKIP_PROBE` | don't probe candidates before choosing one |
    /// | `INVIDIOUS_SCAN_ALL_FOR_COUNTRY` | look past the first survivor for a preferred country |
    /// | `INVIDIOUS_DIRECTORY_URL` | alternative instance directory |
    /// | `INVIDIOUS_USER_AGENT` | `User-Agent` header |
    pub fn from_env() -> eyre::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`Self::from_env`], but reads variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> eyre::Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let flag = |key: &str| -> eyre::Result<Option<bool>> {
            var(key).map(|v| parse_flag(key, &v)).transpose()
        };

        let mut config = Self {
            instance: var("INVIDIOUS_INSTANCE"),
            additional_parameters: var("INVIDIOUS_HL")
                .map(|hl| ("hl".to_string(), hl))
                .into_iter()
                .collect(),
            prefer_country_codes: var("INVIDIOUS_PREFER_COUNTRIES").map(|codes| {
                codes
                    .split(',')
                    .map(str::trim)
                    .filter(|code| !code.is_empty())
                    .map(str::to_owned)
                    .collect()
            }),
            ..Self::default()
        };
        if let Some(allow) = flag("INVIDIOUS_ALLOW_ONIONS")? {
            config.no_onions = !allow;
        }
        if let Some(skip) = flag("INVIDIOUS_SKIP_PROBE")? {
            config.only_accessible = !skip;
        }
        if let Some(scan) = flag("INVIDIOUS_SCAN_ALL_FOR_COUNTRY")? {
            config.scan_all_for_country = scan;
        }
        if let Some(url) = var("INVIDIOUS_DIRECTORY_URL") {
            config.directory_url = url;
        }
        if let Some(user_agent) = var("INVIDIOUS_USER_AGENT") {
            config.user_agent = user_agent;
        }
        Ok(config)
    }

    /// The selection criteria this configuration asks for.
    pub fn criteria(&self) -> SelectionCriteria {
        SelectionCriteria {
            prefer_country_codes: self.prefer_country_codes.clone(),
            no_onions: self.no_onions,
            only_accessible: self.only_accessible,
            scan_all_for_country: self.scan_all_for_country,
        }
    }
}

fn parse_flag(key: &str, value: &str) -> eyre::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => eyre::bail!("{key}: expected a boolean, got {other:?}"),
    }
}
