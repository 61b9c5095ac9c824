//! Views over the public instance directory.
//!
//! The directory at <https://api.invidious.io/instances.json> is an array of
//! `[hostname, attributes]` pairs. Each pair becomes an [`Instance`]; its `stats` and
//! `monitor` objects are exposed as [`InstanceStats`] and [`Monitor`] on demand.

use crate::invidious_api::types::{Fields, View};
use jiff::Timestamp;
use serde_json::Value;

static NULL: Value = Value::Null;

/// How an instance is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceType {
    Https,
    Http,
    /// A Tor hidden service; needs a SOCKS proxy.
    Onion,
    /// Anything else the directory may list (e.g. `i2p`).
    Other,
}

impl InstanceType {
    fn parse(raw: &str) -> Self {
        match raw {
            "https" => Self::Https,
            "http" => Self::Http,
            "onion" => Self::Onion,
            _ => Self::Other,
        }
    }
}

/// A single entry of the instance directory.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    data: Value,
}

impl From<Value> for Instance {
    fn from(data: Value) -> Self {
        Self { data }
    }
}

impl View for Instance {
    fn raw(&self) -> &Value {
        &self.data
    }

    fn into_raw(self) -> Value {
        self.data
    }
}

impl Instance {
    /// The attributes object (second element of the pair).
    pub fn attributes(&self) -> &Value {
        self.data.get(1).unwrap_or(&NULL)
    }

    /// The hostname the directory lists this instance under (first element of the pair).
    pub fn host(&self) -> Option<&str> {
        self.data.get(0).and_then(Value::as_str)
    }

    /// Country flag emoji.
    pub fn flag(&self) -> Option<&str> {
        self.attributes().str_field("flag")
    }

    /// ISO 3166-1 alpha-2 country code.
    pub fn region(&self) -> Option<&str> {
        self.attributes().str_field("region")
    }

    /// The raw `type` attribute (`https`, `http`, `onion`, ...).
    pub fn kind(&self) -> Option<&str> {
        self.attributes().str_field("type")
    }

    pub fn instance_type(&self) -> Option<InstanceType> {
        self.kind().map(InstanceType::parse)
    }

    pub fn is_onion(&self) -> bool {
        self.instance_type() == Some(InstanceType::Onion)
    }

    /// Base URI of the instance, e.g. `https://yewtu.be`.
    pub fn uri(&self) -> Option<&str> {
        self.attributes().str_field("uri")
    }

    /// Software statistics, or `None` if the instance does not publish them or reported an
    /// `error` instead.
    pub fn stats(&self) -> Option<InstanceStats<'_>> {
        let data = self.attributes().field("stats")?;
        if data.field("error").is_some() {
            return None;
        }
        Some(InstanceStats { data })
    }

    /// Uptime monitor data, if the directory tracks this instance.
    pub fn monitor(&self) -> Option<Monitor<'_>> {
        self.attributes()
            .field("monitor")
            .map(|data| Monitor { data })
    }
}

/// The `stats` object of an [`Instance`].
///
/// See: <https://docs.invidious.io/api/#get-apiv1stats>
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstanceStats<'a> {
    data: &'a Value,
}

impl<'a> InstanceStats<'a> {
    fn software(&self) -> &'a Value {
        self.data.field("software").unwrap_or(&NULL)
    }

    fn users(&self) -> &'a Value {
        self.data
            .field("usage")
            .and_then(|usage| usage.field("users"))
            .unwrap_or(&NULL)
    }

    fn metadata(&self) -> &'a Value {
        self.data.field("metadata").unwrap_or(&NULL)
    }

    /// Version of the stats format.
    pub fn version(&self) -> Option<&'a str> {
        self.data.str_field("version")
    }

    /// Should be `invidious`.
    pub fn software_name(&self) -> Option<&'a str> {
        self.software().str_field("name")
    }

    pub fn software_version(&self) -> Option<&'a str> {
        self.software().str_field("version")
    }

    pub fn software_branch(&self) -> Option<&'a str> {
        self.software().str_field("branch")
    }

    pub fn open_registrations(&self) -> Option<bool> {
        self.data.bool_field("openRegistrations")
    }

    pub fn total_users(&self) -> Option<u64> {
        self.users().u64_field("total")
    }

    pub fn users_active_half_year(&self) -> Option<u64> {
        self.users().u64_field("activeHalfyear")
    }

    pub fn users_active_month(&self) -> Option<u64> {
        self.users().u64_field("activeMonth")
    }

    /// When the instance recomputed these stats (POSIX seconds upstream).
    pub fn updated_at(&self) -> Option<Timestamp> {
        self.metadata().epoch_field("updatedAt")
    }

    /// When the instance last refreshed a subscribed channel (POSIX seconds upstream).
    pub fn last_channel_refreshed_at(&self) -> Option<Timestamp> {
        self.metadata().epoch_field("lastChannelRefreshedAt")
    }

    /// When the stats record was created (ISO-8601 upstream).
    pub fn date_created(&self) -> Option<Timestamp> {
        self.data.iso_field("dateCreated")
    }
}

/// Uptime monitor attached to an [`Instance`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Monitor<'a> {
    data: &'a Value,
}

impl<'a> Monitor<'a> {
    /// The monitor's id; some directory snapshots use numbers, others strings.
    pub fn monitor_id(&self) -> Option<String> {
        let id = self.data.field("monitorId")?;
        match id {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// ISO-8601 upstream.
    pub fn created_at(&self) -> Option<Timestamp> {
        self.data.iso_field("createdAt")
    }

    /// ISO-8601 upstream.
    pub fn updated_at(&self) -> Option<Timestamp> {
        self.data.iso_field("updatedAt")
    }

    pub fn status_class(&self) -> Option<&'a str> {
        self.data.str_field("statusClass")
    }

    /// Usually the instance's hostname.
    pub fn name(&self) -> Option<&'a str> {
        self.data.str_field("name")
    }

    pub fn url(&self) -> Option<&'a str> {
        self.data.str_field("url")
    }

    /// Usually `HTTP(s)`.
    pub fn kind(&self) -> Option<&'a str> {
        self.data.str_field("type")
    }

    /// Per-day uptime, most recent first. Empty when the monitor has no history.
    pub fn daily_ratios(&self) -> Vec<Ratio<'a>> {
        self.data
            .optional_array("dailyRatios")
            .iter()
            .map(|data| Ratio { data })
            .collect()
    }

    /// Uptime over the last 30 days.
    pub fn ratio_30d(&self) -> Option<Ratio<'a>> {
        self.data.field("30dRatio").map(|data| Ratio { data })
    }

    /// Uptime over the last 90 days.
    pub fn ratio_90d(&self) -> Option<Ratio<'a>> {
        self.data.field("90dRatio").map(|data| Ratio { data })
    }
}

/// An uptime percentage with its severity label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ratio<'a> {
    data: &'a Value,
}

impl<'a> Ratio<'a> {
    /// Percentage of the period the instance was up, e.g. `99.97`.
    ///
    /// Sent as a string upstream; `None` if absent or unparseable.
    pub fn ratio(&self) -> Option<f64> {
        match self.data.field("ratio")? {
            Value::String(s) => s.trim().parse().ok(),
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    /// `success` or `warning`.
    pub fn label(&self) -> Option<&'a str> {
        self.data.str_field("label")
    }
}

/// The whole instance directory, in the order the server returned it.
#[derive(Debug, Clone, PartialEq)]
pub struct InstancesList {
    data: Value,
}

impl From<Value> for InstancesList {
    fn from(data: Value) -> Self {
        Self { data }
    }
}

impl View for InstancesList {
    fn raw(&self) -> &Value {
        &self.data
    }

    fn into_raw(self) -> Value {
        self.data
    }
}

impl InstancesList {
    fn entries(&self) -> &[Value] {
        self.data.as_array().map(Vec::as_slice).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Instances in server order.
    pub fn iter(&self) -> impl Iterator<Item = Instance> + '_ {
        self.entries().iter().cloned().map(Instance::from)
    }
}

impl IntoIterator for InstancesList {
    type Item = Instance;
    type IntoIter = std::iter::Map<std::vec::IntoIter<Value>, fn(Value) -> Instance>;

    fn into_iter(self) -> Self::IntoIter {
        let entries = match self.data {
            Value::Array(entries) => entries,
            _ => Vec::new(),
        };
        let to_instance: fn(Value) -> Instance = Instance::from;
        entries.into_iter().map(to_instance)
    }
}
