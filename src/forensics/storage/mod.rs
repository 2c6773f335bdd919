// src/forensics/storage/mod.rs
//!
//! Collaborator contracts and storage implementations.
//!
//! The pipeline consumes records through two narrow traits: [`LogStore`]
//! (captured records and rate-limit events) and [`ConfigStore`] (key-value
//! configuration). In-memory implementations back the tests and lightweight
//! embeddings; [`SledStore`] persists both contracts in a local sled
//! database with JSON-encoded values, one tree per entity.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use sled::{Db, Tree};

use crate::error::Result;
use crate::forensics::models::{Protocol, RateLimitEvent, RequestRecord};
use crate::forensics::window::TimeWindow;

/// Structural record filter applied by the store ahead of grouping.
///
/// String fields are matched as case-insensitive regular expressions
/// ("like" semantics); a pattern that fails to compile degrades to a
/// case-insensitive substring match. Non-string fields match exactly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordFilter {
    pub source_address: Option<String>,
    pub url: Option<String>,
    pub user_agent: Option<String>,
    pub protocol: Option<Protocol>,
    pub min_severity: Option<i64>,
}

fn like_matches(pattern: &str, value: &str) -> bool {
    match RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(re) => re.is_match(value),
        Err(_) => {
            log::debug!("filter pattern {:?} is not a valid regex, matching as substring", pattern);
            value.to_lowercase().contains(&pattern.to_lowercase())
        }
    }
}

impl RecordFilter {
    pub fn is_empty(&self) -> bool {
        *self == RecordFilter::default()
    }

    pub fn matches(&self, record: &RequestRecord) -> bool {
        if let Some(pattern) = &self.source_address {
            if !like_matches(pattern, &record.source_address) {
                return false;
            }
        }
        if let Some(pattern) = &self.url {
            if !like_matches(pattern, &record.url) {
                return false;
            }
        }
        if let Some(pattern) = &self.user_agent {
            match &record.user_agent {
                Some(agent) if like_matches(pattern, agent) => {}
                _ => return false,
            }
        }
        if let Some(protocol) = self.protocol {
            if record.protocol != protocol {
                return false;
            }
        }
        if let Some(min) = self.min_severity {
            if record.severity_score < min {
                return false;
            }
        }
        true
    }
}

/// Read access to the captured record store.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Records matching the filter inside the optional window, in store
    /// order.
    async fn query(
        &self,
        filter: &RecordFilter,
        window: Option<&TimeWindow>,
    ) -> Result<Vec<RequestRecord>>;

    /// Rate-limit events for one source address inside `[start, end]`.
    async fn query_rate_limit_events(
        &self,
        source_address: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RateLimitEvent>>;
}

/// Key-value configuration collaborator.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn get_value(&self, key: &str) -> Result<Option<String>>;
    async fn set_value(&self, key: &str, value: &str) -> Result<()>;
    async fn delete_value(&self, key: &str) -> Result<bool>;
    async fn list_values(&self) -> Result<Vec<(String, String)>>;
}

/// In-memory log store for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryLogStore {
    records: Arc<Mutex<Vec<RequestRecord>>>,
    rate_limit_events: Arc<Mutex<Vec<RateLimitEvent>>>,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_record(&self, record: RequestRecord) {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record);
    }

    pub fn add_records(&self, records: impl IntoIterator<Item = RequestRecord>) {
        let mut guard = self.records.lock().unwrap_or_else(|e| e.into_inner());
        guard.extend(records);
    }

    pub fn add_rate_limit_event(&self, event: RateLimitEvent) {
        self.rate_limit_events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }

    pub fn record_count(&self) -> usize {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl LogStore for MemoryLogStore {
    async fn query(
        &self,
        filter: &RecordFilter,
        window: Option<&TimeWindow>,
    ) -> Result<Vec<RequestRecord>> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        Ok(records
            .iter()
            .filter(|r| window.map_or(true, |w| w.contains(r.timestamp)))
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    async fn query_rate_limit_events(
        &self,
        source_address: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RateLimitEvent>> {
        let events = self
            .rate_limit_events
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        Ok(events
            .iter()
            .filter(|e| {
                e.source_address == source_address && e.timestamp >= start && e.timestamp <= end
            })
            .cloned()
            .collect())
    }
}

/// In-memory config store for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigStore {
    values: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(self, key: &str, value: &str) -> Self {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        self
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn get_value(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned())
    }

    async fn set_value(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete_value(&self, key: &str) -> Result<bool> {
        Ok(self
            .values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key)
            .is_some())
    }

    async fn list_values(&self) -> Result<Vec<(String, String)>> {
        Ok(self
            .values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

const RECORDS_TREE: &[u8] = b"records";
const RATE_LIMIT_TREE: &[u8] = b"rate_limit_events";
const CONFIG_TREE: &[u8] = b"config";

/// Sled-backed persistent store implementing both collaborator contracts.
#[derive(Debug, Clone)]
pub struct SledStore {
    db: Db,
}

impl SledStore {
    /// Open or create the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = sled::Config::new()
            .path(path)
            .flush_every_ms(Some(5000))
            .open()?;
        Ok(Self { db })
    }

    fn tree(&self, name: &[u8]) -> Result<Tree> {
        Ok(self.db.open_tree(name)?)
    }

    /// Persist one captured record. Keys are timestamp-prefixed so records
    /// iterate in capture order.
    pub fn store_record(&self, record: &RequestRecord) -> Result<()> {
        let tree = self.tree(RECORDS_TREE)?;
        let key = format!("{:020}:{}", record.timestamp.timestamp_millis(), record.id);
        let value = serde_json::to_vec(record)?;
        tree.insert(key.as_bytes(), value)?;
        Ok(())
    }

    /// Persist one rate-limit event, keyed by address for prefix scans.
    pub fn store_rate_limit_event(&self, event: &RateLimitEvent) -> Result<()> {
        let tree = self.tree(RATE_LIMIT_TREE)?;
        let key = format!(
            "{}:{:020}:{}",
            event.source_address,
            event.timestamp.timestamp_millis(),
            uuid::Uuid::new_v4()
        );
        let value = serde_json::to_vec(event)?;
        tree.insert(key.as_bytes(), value)?;
        Ok(())
    }

    pub fn record_count(&self) -> Result<usize> {
        Ok(self.tree(RECORDS_TREE)?.len())
    }

    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

#[async_trait]
impl LogStore for SledStore {
    async fn query(
        &self,
        filter: &RecordFilter,
        window: Option<&TimeWindow>,
    ) -> Result<Vec<RequestRecord>> {
        let tree = self.tree(RECORDS_TREE)?;
        let mut records = Vec::new();
        for entry in tree.iter() {
            let (_, value) = entry?;
            let record: RequestRecord = match serde_json::from_slice(&value) {
                Ok(r) => r,
                Err(e) => {
                    log::warn!("skipping undecodable record: {}", e);
                    continue;
                }
            };
            if window.map_or(true, |w| w.contains(record.timestamp)) && filter.matches(&record) {
                records.push(record);
            }
        }
        Ok(records)
    }

    async fn query_rate_limit_events(
        &self,
        source_address: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RateLimitEvent>> {
        let tree = self.tree(RATE_LIMIT_TREE)?;
        let prefix = format!("{}:", source_address);
        let mut events = Vec::new();
        for entry in tree.scan_prefix(prefix.as_bytes()) {
            let (_, value) = entry?;
            let event: RateLimitEvent = match serde_json::from_slice(&value) {
                Ok(e) => e,
                Err(e) => {
                    log::warn!("skipping undecodable rate-limit event: {}", e);
                    continue;
                }
            };
            if event.timestamp >= start && event.timestamp <= end {
                events.push(event);
            }
        }
        Ok(events)
    }
}

#[async_trait]
impl ConfigStore for SledStore {
    async fn get_value(&self, key: &str) -> Result<Option<String>> {
        let tree = self.tree(CONFIG_TREE)?;
        match tree.get(key.as_bytes())? {
            Some(value) => Ok(Some(String::from_utf8_lossy(&value).into_owned())),
            None => Ok(None),
        }
    }

    async fn set_value(&self, key: &str, value: &str) -> Result<()> {
        let tree = self.tree(CONFIG_TREE)?;
        tree.insert(key.as_bytes(), value.as_bytes())?;
        log::info!("config saved: {}={}", key, value);
        Ok(())
    }

    async fn delete_value(&self, key: &str) -> Result<bool> {
        let tree = self.tree(CONFIG_TREE)?;
        Ok(tree.remove(key.as_bytes())?.is_some())
    }

    async fn list_values(&self) -> Result<Vec<(String, String)>> {
        let tree = self.tree(CONFIG_TREE)?;
        let mut values = Vec::new();
        for entry in tree.iter() {
            let (key, value) = entry?;
            values.push((
                String::from_utf8_lossy(&key).into_owned(),
                String::from_utf8_lossy(&value).into_owned(),
            ));
        }
        Ok(values)
    }
}
