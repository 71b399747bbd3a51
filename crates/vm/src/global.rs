use serde::{Deserialize, Serialize};

/// Protocol constants. Changing any of these changes which scripts FAULT, so
/// every node on a network must agree on them.
pub struct Config;

impl Config {
    /// Total items across every evaluation and alt stack of one engine.
    pub const MAX_STACK_SIZE: usize = 2 * 1024;
    pub const MAX_ITEM_SIZE: usize = 1024 * 1024;
    pub const MAX_ARRAY_SIZE: usize = 1024;
    pub const MAX_INVOCATION_DEPTH: usize = 1024;
    /// Byte length bound on integer operands and results.
    pub const MAX_INTEGER_SIZE: usize = 32;
    pub const MAX_SHIFT: i64 = 256;

    pub const MAX_STORAGE_KEY_SIZE: usize = 1024;
    /// SYSCALL operands are var-bytes capped below the 0xFD length prefix.
    pub const MAX_INTEROP_NAME_LEN: usize = 252;

    /// Free gas granted to every invocation, in 0.001 GAS units.
    pub const DEFAULT_GAS_LIMIT: u64 = 10_000;

    /// Target block interval, used by `Runtime.GetTime` outside block persistence.
    pub const SECONDS_PER_BLOCK: u32 = 15;
}

/// Per-engine limits. Defaults mirror [`Config`]; deployments may tighten
/// them from configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionLimits {
    pub max_stack_size: usize,
    pub max_item_size: usize,
    pub max_array_size: usize,
    pub max_invocation_depth: usize,
    pub gas_limit: u64,
    /// Optional hard cap on executed instructions; reaching it FAULTs.
    pub max_steps: Option<u64>,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            max_stack_size: Config::MAX_STACK_SIZE,
            max_item_size: Config::MAX_ITEM_SIZE,
            max_array_size: Config::MAX_ARRAY_SIZE,
            max_invocation_depth: Config::MAX_INVOCATION_DEPTH,
            gas_limit: Config::DEFAULT_GAS_LIMIT,
            max_steps: None,
        }
    }
}

impl ExecutionLimits {
    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }
}
