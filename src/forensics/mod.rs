// src/forensics/mod.rs
//!
//! # Attack aggregation and scoring pipeline
//!
//! Takes a window of captured per-request log records, groups them by
//! source address into candidate attacks, derives behavioral and
//! statistical signals over each group, and reduces those signals into a
//! composite danger score and a discrete severity tier.
//!
//! ## Architecture
//!
//! ```text
//!  time-window request      structural filter
//!          │                       │
//!          ▼                       ▼
//!   ┌──────────────┐       ┌──────────────┐
//!   │   Window     │──────►│   LogStore   │  records + rate-limit events
//!   │   Resolver   │       │    query     │
//!   └──────────────┘       └──────┬───────┘
//!                                 │
//!            ┌────────────────────▼─────────────────────┐
//!            │               Pipeline                   │
//!            │  grouping → stats → sequence → payload   │
//!            │          → fingerprint → scoring         │
//!            └────────────────────┬─────────────────────┘
//!                                 │
//!                                 ▼
//!                  candidate attacks + total count
//! ```
//!
//! Every stage is pure over the batch accumulator; the set of candidate
//! attacks is rebuilt from the store on every query.

pub mod config;
pub mod engine;
pub mod models;
pub mod pipeline;
pub mod stages;
pub mod storage;
pub mod window;

#[cfg(test)]
mod tests;

pub use config::{DangerWeights, ForensicConfig, SeverityThresholds, ToleranceConfig};
pub use engine::ForensicEngine;
pub use models::{
    AttackQueryResult, CandidateAttack, DangerLevel, IntensityLabel, LimitType, Protocol,
    RateLimitEvent, RequestRecord, RpsStyle,
};
pub use pipeline::{standard_pipeline, AttackBatch, ForensicPipeline, ForensicPipelineBuilder};
pub use storage::{ConfigStore, LogStore, MemoryConfigStore, MemoryLogStore, RecordFilter, SledStore};
pub use window::{TimeWindow, TimeWindowRequest};
