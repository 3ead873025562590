use crate::CharmConfig;

/// Facts about the current hook invocation, supplied by the orchestration
/// layer and fixed for the duration of one dispatch.
#[derive(Clone, Debug, Default)]
pub struct HookContext {
    /// Configuration in effect for this invocation.
    pub config: CharmConfig,

    /// Whether this unit currently holds leadership.
    pub is_leader: bool,
}

impl HookContext {
    /// Creates a context from the leadership flag and configuration.
    #[must_use]
    pub const fn new(is_leader: bool, config: CharmConfig) -> Self {
        Self { config, is_leader }
    }
}
