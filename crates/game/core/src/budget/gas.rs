use crate::config::EngineConfig;

/// Why a unit of work was dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum DropReason {
    /// Per-frame response-window budget exhausted.
    Window,
    /// Per-frame listener-step budget exhausted.
    Step,
    /// Cascade would exceed the maximum depth below its root.
    Depth,
    /// Root already created its maximum number of children this frame.
    RootBudget,
    /// Request queue and overflow ring were both full.
    Queue,
    /// Candidate list exceeded its capacity.
    FanOut,
    /// Tag-rule transaction ran out of steps.
    TagTransaction,
    /// No room for another active effect instance.
    ActiveCapacity,
    /// Frame report already holds its maximum spawn intents.
    Spawn,
}

/// Why a request was skipped without being processed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum SkipReason {
    MissingTemplate,
    StaleEntity,
}

/// Raw per-frame counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GasCounters {
    pub windows_opened: u32,
    pub steps_taken: u32,
    pub responses_created: u32,
    pub requests_processed: u32,

    pub dropped_window: u32,
    pub dropped_step: u32,
    pub dropped_depth: u32,
    pub dropped_root_budget: u32,
    pub dropped_queue: u32,
    pub dropped_fan_out: u32,
    pub dropped_active_capacity: u32,
    pub dropped_spawn: u32,
    pub tag_transactions_fused: u32,

    pub skipped_missing_template: u32,
    pub skipped_stale_entity: u32,
}

impl GasCounters {
    pub fn total_dropped(&self) -> u32 {
        self.dropped_window
            + self.dropped_step
            + self.dropped_depth
            + self.dropped_root_budget
            + self.dropped_queue
            + self.dropped_fan_out
            + self.dropped_active_capacity
            + self.dropped_spawn
            + self.tag_transactions_fused
    }

    pub fn total_skipped(&self) -> u32 {
        self.skipped_missing_template + self.skipped_stale_entity
    }
}

/// Snapshot of one frame's budget use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BudgetSummary {
    pub frame: u64,
    pub counters: GasCounters,
    /// Any budget ran out this frame.
    pub fused: bool,
}

/// Per-frame work counters, reset once at frame start.
#[derive(Clone, Debug)]
pub struct GasBudget {
    config: EngineConfig,
    frame: u64,
    counters: GasCounters,
    fused: bool,
}

impl GasBudget {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            frame: 0,
            counters: GasCounters::default(),
            fused: false,
        }
    }

    pub fn reset(&mut self, frame: u64) {
        self.frame = frame;
        self.counters = GasCounters::default();
        self.fused = false;
    }

    pub fn counters(&self) -> &GasCounters {
        &self.counters
    }

    pub fn is_fused(&self) -> bool {
        self.fused
    }

    /// Opens one response window if the frame still has room.
    pub fn try_open_window(&mut self) -> bool {
        if self.counters.windows_opened >= self.config.max_windows_per_frame {
            self.note_dropped(DropReason::Window);
            return false;
        }
        self.counters.windows_opened += 1;
        true
    }

    /// Takes one listener-evaluation step.
    pub fn try_step(&mut self) -> bool {
        if self.counters.steps_taken >= self.config.max_steps_per_frame {
            self.note_dropped(DropReason::Step);
            return false;
        }
        self.counters.steps_taken += 1;
        true
    }

    /// Claims one request slot. Does not count a drop; unprocessed requests carry over.
    pub fn try_process_request(&mut self) -> bool {
        if self.counters.requests_processed >= self.config.max_requests_per_frame {
            return false;
        }
        self.counters.requests_processed += 1;
        true
    }

    pub fn note_response_created(&mut self) {
        self.counters.responses_created += 1;
    }

    pub fn note_dropped(&mut self, reason: DropReason) {
        let counter = match reason {
            DropReason::Window => &mut self.counters.dropped_window,
            DropReason::Step => &mut self.counters.dropped_step,
            DropReason::Depth => &mut self.counters.dropped_depth,
            DropReason::RootBudget => &mut self.counters.dropped_root_budget,
            DropReason::Queue => &mut self.counters.dropped_queue,
            DropReason::FanOut => &mut self.counters.dropped_fan_out,
            DropReason::TagTransaction => &mut self.counters.tag_transactions_fused,
            DropReason::ActiveCapacity => &mut self.counters.dropped_active_capacity,
            DropReason::Spawn => &mut self.counters.dropped_spawn,
        };
        *counter += 1;
        tracing::debug!(frame = self.frame, %reason, "work dropped");

        if !self.fused {
            self.fused = true;
            tracing::warn!(frame = self.frame, %reason, "frame budget fused");
        }
    }

    pub fn note_skipped(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::MissingTemplate => self.counters.skipped_missing_template += 1,
            SkipReason::StaleEntity => self.counters.skipped_stale_entity += 1,
        }
        tracing::debug!(frame = self.frame, %reason, "request skipped");
    }

    pub fn summary(&self) -> BudgetSummary {
        BudgetSummary {
            frame: self.frame,
            counters: self.counters,
            fused: self.fused,
        }
    }
}
