use super::ListenerScope;
use crate::budget::RootId;
use crate::config::EngineConfig;
use crate::effect::{EffectPhase, RingBuffer, TemplateId};
use crate::env::EntityHandle;

/// What a fired listener did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ResponseAction {
    Cancelled,
    /// A conditional hook ran and chose not to cancel.
    Passed,
    Modified,
    Chained,
    /// A Chain response whose child was refused by a budget or unbound slot.
    ChainDropped,
    Prompted,
    /// A graph-backed response failed and was skipped.
    Skipped,
}

/// One listener evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ResponseRecord {
    pub frame: u64,
    pub root: RootId,
    pub template: TemplateId,
    pub phase: EffectPhase,
    pub owner: EntityHandle,
    pub scope: ListenerScope,
    pub priority: i32,
    pub action: ResponseAction,
}

/// Fixed-capacity ring of the latest response records.
#[derive(Clone, Debug, Default)]
pub struct ResponseTelemetry {
    records: RingBuffer<ResponseRecord, { EngineConfig::TELEMETRY_CAPACITY }>,
    total: u64,
}

impl ResponseTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, record: ResponseRecord) {
        tracing::debug!(
            frame = record.frame,
            root = record.root.0,
            template = record.template.0,
            phase = %record.phase,
            owner = %record.owner,
            priority = record.priority,
            action = %record.action,
            "response"
        );
        self.records.push_overwrite(record);
        self.total += 1;
    }

    /// Retained records, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &ResponseRecord> + '_ {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records ever written, including evicted ones.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
