// src/forensics/pipeline/mod.rs
//!
//! Stage-driven attack analysis pipeline.
//!
//! A pipeline is an ordered list of stages; each stage mutates the shared
//! [`AttackBatch`] accumulator and hands it to the next. Stage order is a
//! contract: grouping must run before stats, stats before scoring, and the
//! behavioral analyzers anywhere in between, since scoring folds their
//! outputs into the composite.

use crate::forensics::config::ForensicConfig;
use crate::forensics::models::{CandidateAttack, RateLimitEvent, RequestRecord};
use crate::forensics::stages::{
    FingerprintStage, GroupingStage, PayloadStage, ScoringStage, SequenceStage, StatsStage,
};

/// Accumulator threaded through the stages of one pipeline run.
///
/// `records` and `rate_limit_events` are the raw inputs fetched by the
/// caller; `attacks` is empty until the grouping stage materializes the
/// candidate set.
#[derive(Debug, Default)]
pub struct AttackBatch {
    pub records: Vec<RequestRecord>,
    pub rate_limit_events: Vec<RateLimitEvent>,
    pub attacks: Vec<CandidateAttack>,
}

impl AttackBatch {
    pub fn new(records: Vec<RequestRecord>, rate_limit_events: Vec<RateLimitEvent>) -> Self {
        Self {
            records,
            rate_limit_events,
            attacks: Vec::new(),
        }
    }
}

/// One step of the analysis pipeline. Stages are pure over the batch: same
/// batch and configuration in, same batch out.
pub trait PipelineStage: Send + Sync {
    fn name(&self) -> &'static str;
    fn run(&self, batch: &mut AttackBatch);
}

/// Ordered stage list, executed front to back.
pub struct ForensicPipeline {
    stages: Vec<Box<dyn PipelineStage>>,
}

impl ForensicPipeline {
    pub fn execute(&self, mut batch: AttackBatch) -> AttackBatch {
        for stage in &self.stages {
            log::debug!(
                "pipeline stage {} ({} attacks, {} records)",
                stage.name(),
                batch.attacks.len(),
                batch.records.len()
            );
            stage.run(&mut batch);
        }
        batch
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }
}

/// Builder assembling a pipeline from stages.
#[derive(Default)]
pub struct ForensicPipelineBuilder {
    stages: Vec<Box<dyn PipelineStage>>,
}

impl ForensicPipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_stage(mut self, stage: Box<dyn PipelineStage>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn build(self) -> ForensicPipeline {
        ForensicPipeline {
            stages: self.stages,
        }
    }
}

/// The standard analysis pipeline: group by source, derive statistics, run
/// the three behavioral analyzers, then score.
pub fn standard_pipeline(config: &ForensicConfig, min_logs_for_attack: usize) -> ForensicPipeline {
    ForensicPipelineBuilder::new()
        .add_stage(Box::new(GroupingStage::new(min_logs_for_attack)))
        .add_stage(Box::new(StatsStage::new(config.tolerances)))
        .add_stage(Box::new(SequenceStage::new()))
        .add_stage(Box::new(PayloadStage::new(&config.suspicious_patterns)))
        .add_stage(Box::new(FingerprintStage::new(&config.tool_signatures)))
        .add_stage(Box::new(ScoringStage::new(
            config.weights,
            config.tolerances,
            config.severity_thresholds,
        )))
        .build()
}
