// src/forensics/engine/mod.rs
//!
//! The forensic engine: loads scoring configuration once, resolves the
//! caller's time window, fetches the matching records and associated
//! rate-limit events, and runs the analysis pipeline over them.
//!
//! Each invocation rebuilds the candidate-attack set from scratch; nothing
//! is cached or shared between concurrent runs, so invocations against the
//! same store snapshot and configuration produce identical output.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::forensics::config::ForensicConfig;
use crate::forensics::models::{AttackQueryResult, RateLimitEvent};
use crate::forensics::pipeline::{standard_pipeline, AttackBatch};
use crate::forensics::storage::{ConfigStore, LogStore, RecordFilter};
use crate::forensics::window::{self, TimeWindowRequest};

pub struct ForensicEngine {
    store: Arc<dyn LogStore>,
    config: ForensicConfig,
}

impl ForensicEngine {
    /// Build an engine with an explicit configuration value.
    pub fn new(store: Arc<dyn LogStore>, config: ForensicConfig) -> Self {
        Self { store, config }
    }

    /// Build an engine whose configuration is loaded from the config
    /// collaborator. A failing fetch is propagated; malformed values fall
    /// back to defaults inside the loader.
    pub async fn with_config_store(
        store: Arc<dyn LogStore>,
        config_store: &dyn ConfigStore,
    ) -> Result<Self> {
        let config = ForensicConfig::load(config_store).await?;
        Ok(Self::new(store, config))
    }

    pub fn config(&self) -> &ForensicConfig {
        &self.config
    }

    /// Run the full analysis pipeline for one query window.
    ///
    /// Returns every qualifying candidate attack plus the total count;
    /// pagination and presentation ordering belong to the caller.
    pub async fn run_pipeline(
        &self,
        filter: &RecordFilter,
        min_logs_for_attack: usize,
        window_request: Option<&TimeWindowRequest>,
    ) -> Result<AttackQueryResult> {
        self.run_pipeline_at(filter, min_logs_for_attack, window_request, Utc::now())
            .await
    }

    /// Same as [`run_pipeline`](Self::run_pipeline) with an explicit `now`
    /// for relative-window resolution.
    pub async fn run_pipeline_at(
        &self,
        filter: &RecordFilter,
        min_logs_for_attack: usize,
        window_request: Option<&TimeWindowRequest>,
        now: DateTime<Utc>,
    ) -> Result<AttackQueryResult> {
        let window = window::resolve(window_request, now);
        let records = self.store.query(filter, window.as_ref()).await?;
        if records.is_empty() {
            return Ok(AttackQueryResult {
                items: Vec::new(),
                total_count: 0,
            });
        }
        log::debug!("analyzing {} records", records.len());

        // One rate-limit lookup per distinct source, over the batch bounds;
        // the grouping stage narrows each join to its group's own window.
        let batch_start = records.iter().map(|r| r.timestamp).min().unwrap_or(now);
        let batch_end = records.iter().map(|r| r.timestamp).max().unwrap_or(now);
        let addresses: BTreeSet<&str> =
            records.iter().map(|r| r.source_address.as_str()).collect();

        let mut rate_limit_events: Vec<RateLimitEvent> = Vec::new();
        for address in addresses {
            let events = self
                .store
                .query_rate_limit_events(address, batch_start, batch_end)
                .await?;
            rate_limit_events.extend(events);
        }

        let pipeline = standard_pipeline(&self.config, min_logs_for_attack);
        let batch = pipeline.execute(AttackBatch::new(records, rate_limit_events));

        let total_count = batch.attacks.len();
        log::info!(
            "pipeline produced {} candidate attacks from the window",
            total_count
        );
        Ok(AttackQueryResult {
            items: batch.attacks,
            total_count,
        })
    }
}
