use serde::{Deserialize, Serialize};

use crate::errors::{VmError, VmResult};
use crate::instruction::Instruction;

/// Opcode price table, in 0.001 GAS units.
///
/// The defaults are the legacy application-engine prices:
/// - pushes and `NOP` are free
/// - contract calls and hashing cost a small flat fee
/// - signature checks are the expensive opcodes, multisig per public key
/// - everything else costs one unit
///
/// `SYSCALL` is priced by the interop registry instead; storage writes scale
/// with the size of what is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GasSchedule {
    pub push: u64,
    pub instruction: u64,
    pub app_call: u64,
    pub sha: u64,
    pub hash: u64,
    pub check_sig: u64,
    pub check_multisig_per_key: u64,
    pub syscall: u64,
    pub storage_put_per_kib: u64,
}

impl Default for GasSchedule {
    fn default() -> Self {
        Self {
            push: 0,
            instruction: 1,
            app_call: 10,
            sha: 10,
            hash: 20,
            check_sig: 100,
            check_multisig_per_key: 100,
            syscall: 1,
            storage_put_per_kib: 1000,
        }
    }
}

impl GasSchedule {
    /// Flat price of `instr`. `SYSCALL` and `CHECKMULTISIG` depend on runtime
    /// data and are priced by the engine.
    pub fn opcode_price(&self, instr: &Instruction) -> u64 {
        match instr {
            i if i.is_push() => self.push,
            Instruction::Nop => self.push,
            Instruction::AppCall(_) | Instruction::TailCall(_) => self.app_call,
            Instruction::Sha1 | Instruction::Sha256 => self.sha,
            Instruction::Hash160 | Instruction::Hash256 => self.hash,
            Instruction::CheckSig | Instruction::Verify => self.check_sig,
            Instruction::Syscall(_) => self.syscall,
            _ => self.instruction,
        }
    }

    pub fn check_multisig_price(&self, keys: usize) -> u64 {
        if keys == 0 {
            return self.instruction;
        }
        self.check_multisig_per_key.saturating_mul(keys as u64)
    }

    /// One `storage_put_per_kib` per started KiB of key plus value, minimum one.
    pub fn storage_put_price(&self, key_len: usize, value_len: usize) -> u64 {
        let total = (key_len + value_len) as u64;
        let kib = if total == 0 { 1 } else { (total - 1) / 1024 + 1 };
        self.storage_put_per_kib.saturating_mul(kib)
    }
}

/// Gas budget of one invocation. Never shared between engines.
#[derive(Debug, Clone)]
pub struct GasMeter {
    limit: u64,
    consumed: u64,
}

impl GasMeter {
    pub fn new(limit: u64) -> Self {
        Self { limit, consumed: 0 }
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    pub fn remaining(&self) -> u64 {
        self.limit - self.consumed
    }

    /// Debits `price`, or leaves the meter untouched and fails when it does
    /// not fit the remaining budget.
    pub fn charge(&mut self, price: u64) -> VmResult<()> {
        let remaining = self.remaining();
        if price > remaining {
            return Err(VmError::InsufficientGas { price, remaining });
        }
        self.consumed += price;
        Ok(())
    }
}
