use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use vm::{ExecutionLimits, GasSchedule};

use crate::error::ExecutorResult;

/// Executor settings, usually read from a TOML file:
///
/// ```toml
/// parallel = true
///
/// [limits]
/// gas_limit = 10000
/// max_steps = 1000000
///
/// [gas]
/// check_sig = 100
/// ```
///
/// Every key is optional; missing keys keep the protocol defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Per-engine limits. `limits.gas_limit` is the free gas every invocation
    /// gets before the system fee the transaction paid for.
    pub limits: ExecutionLimits,
    pub gas: GasSchedule,
    /// Run the transactions of a block on the rayon pool.
    pub parallel: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            limits: ExecutionLimits::default(),
            gas: GasSchedule::default(),
            parallel: true,
        }
    }
}

impl ExecutorConfig {
    pub fn from_toml_str(content: &str) -> ExecutorResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> ExecutorResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.limits.gas_limit = gas_limit;
        self
    }

    pub fn with_max_steps(mut self, max_steps: Option<u64>) -> Self {
        self.limits.max_steps = max_steps;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}
