/// Engine configuration constants and tunable per-frame budgets.
///
/// Capacities used as const-generic parameters are associated constants; the
/// per-frame budgets are plain fields so content can tune them from TOML.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Response windows (listener contention rounds) that may open per frame.
    pub max_windows_per_frame: u32,
    /// Listener evaluations allowed per frame across all windows.
    pub max_steps_per_frame: u32,
    /// Maximum cascade depth below a root request (root itself is depth 0).
    pub max_root_depth: u8,
    /// Child requests a single root id may create per frame.
    pub max_root_creations: u32,
    /// Requests drained from the queue per frame; the rest carry over.
    pub max_requests_per_frame: u32,
    /// Period catch-up iterations an instance may run in one frame.
    pub max_period_catch_up: u8,
}

impl EngineConfig {
    // ===== compile-time constants used as type parameters =====
    /// Tag ids are `1..=255`; bit 0 is never set.
    pub const MAX_TAGS: usize = 256;
    /// Entries per list in a [`crate::tag::TagRuleSet`].
    pub const MAX_RULE_LIST: usize = 8;
    /// Distinct stacked tags tracked per entity.
    pub const MAX_TAG_COUNTS: usize = 64;
    pub const MAX_MODIFIERS: usize = 8;
    pub const MAX_GRANTED_TAGS: usize = 8;
    pub const MAX_LISTENERS: usize = 8;
    /// (tag, is_add) pairs one tag-rule transaction may process.
    pub const TRANSACTION_CAPACITY: usize = 256;
    pub const TRANSACTION_STEP_BUDGET: u32 = 256;
    pub const MAX_CANDIDATES: usize = 64;
    pub const REQUEST_QUEUE_CAPACITY: usize = 256;
    pub const REQUEST_OVERFLOW_CAPACITY: usize = 64;
    pub const ROOT_TABLE_CAPACITY: usize = 512;
    pub const MAX_ACTIVE_EFFECTS: usize = 512;
    pub const TELEMETRY_CAPACITY: usize = 128;
    pub const MAX_SPAWN_INTENTS: usize = 64;
    pub const MAX_FRAME_RESOLUTIONS: usize = 256;
    pub const GRAPH_OUTPUT_VALUES: usize = 8;

    // ===== runtime-tunable defaults =====
    pub const DEFAULT_MAX_WINDOWS: u32 = 256;
    pub const DEFAULT_MAX_STEPS: u32 = 2048;
    pub const DEFAULT_MAX_ROOT_DEPTH: u8 = 5;
    pub const DEFAULT_MAX_ROOT_CREATIONS: u32 = 256;
    pub const DEFAULT_MAX_REQUESTS: u32 = 1024;
    pub const DEFAULT_MAX_PERIOD_CATCH_UP: u8 = 8;

    pub fn new() -> Self {
        Self {
            max_windows_per_frame: Self::DEFAULT_MAX_WINDOWS,
            max_steps_per_frame: Self::DEFAULT_MAX_STEPS,
            max_root_depth: Self::DEFAULT_MAX_ROOT_DEPTH,
            max_root_creations: Self::DEFAULT_MAX_ROOT_CREATIONS,
            max_requests_per_frame: Self::DEFAULT_MAX_REQUESTS,
            max_period_catch_up: Self::DEFAULT_MAX_PERIOD_CATCH_UP,
        }
    }

    pub fn with_windows(mut self, max_windows_per_frame: u32) -> Self {
        self.max_windows_per_frame = max_windows_per_frame;
        self
    }

    pub fn with_steps(mut self, max_steps_per_frame: u32) -> Self {
        self.max_steps_per_frame = max_steps_per_frame;
        self
    }

    pub fn with_root_depth(mut self, max_root_depth: u8) -> Self {
        self.max_root_depth = max_root_depth;
        self
    }

    pub fn with_root_creations(mut self, max_root_creations: u32) -> Self {
        self.max_root_creations = max_root_creations;
        self
    }

    pub fn with_requests(mut self, max_requests_per_frame: u32) -> Self {
        self.max_requests_per_frame = max_requests_per_frame;
        self
    }

    pub fn with_period_catch_up(mut self, max_period_catch_up: u8) -> Self {
        self.max_period_catch_up = max_period_catch_up;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_override_only_their_field() {
        let config = EngineConfig::new().with_period_catch_up(2).with_requests(16);
        assert_eq!(config.max_period_catch_up, 2);
        assert_eq!(config.max_requests_per_frame, 16);
        assert_eq!(config.max_root_depth, EngineConfig::DEFAULT_MAX_ROOT_DEPTH);
        assert_eq!(config.max_steps_per_frame, EngineConfig::DEFAULT_MAX_STEPS);
    }
}
