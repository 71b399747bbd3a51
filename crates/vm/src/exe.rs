use std::cmp::Ordering;
use std::rc::Rc;

use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use tracing::debug;
use types::UInt160;

use crate::engine::ExecutionEngine;
use crate::errors::{InvalidValue, VmError, VmResult};
use crate::execution_context::ExecutionContext;
use crate::global::Config;
use crate::instruction::Instruction;
use crate::script::Script;
use crate::stack_item::{MapKey, StackItem};

impl ExecutionEngine {
    /// Executes a decoded instruction against the current frame.
    ///
    /// EDUCATIONAL PURPOSE: This is the execute phase. By the time it runs
    /// the instruction has been paid for and the instruction pointer already
    /// points past it, so control-flow opcodes simply overwrite it.
    ///
    /// `position` is the offset of the opcode itself; jump and call offsets
    /// are relative to it.
    pub(crate) fn execute_instruction(
        &mut self,
        instr: Instruction,
        position: usize,
    ) -> VmResult<()> {
        let limits = *self.limits();
        match instr {
            // ===== Push =====
            Instruction::PushBytes(data) => {
                if data.len() > limits.max_item_size {
                    return Err(VmError::ItemTooLarge {
                        size: data.len(),
                        limit: limits.max_item_size,
                    });
                }
                self.push(StackItem::from(data))?;
            }
            Instruction::PushInt(value) => self.push(StackItem::from(value as i64))?,

            // ===== Flow control =====
            Instruction::Nop => {}
            Instruction::Jmp(offset) => {
                let ctx = self.current_context_mut()?;
                let target = position as i64 + offset as i64;
                ctx.jump(target)?;
            }
            Instruction::JmpIf(offset) | Instruction::JmpIfNot(offset) => {
                let expect = matches!(instr, Instruction::JmpIf(_));
                let ctx = self.current_context_mut()?;
                let target = jump_target(ctx, position, offset)?;
                if ctx.pop()?.as_bool() == expect {
                    ctx.set_instruction_pointer(target);
                }
            }
            Instruction::Call(offset) => {
                let ctx = self.current_context_mut()?;
                let target = jump_target(ctx, position, offset)?;
                let mut frame = ctx.new_call(target);
                frame.extend_evaluation_stack(ctx.take_evaluation_stack());
                self.invocation_stack_mut().push(frame)?;
            }
            Instruction::Ret => {
                let mut finished = self.invocation_stack_mut().pop()?;
                let items = finished.take_evaluation_stack();
                if self.invocation_stack().is_empty() {
                    self.result_stack_mut().extend(items);
                    self.halt();
                } else {
                    self.current_context_mut()?.extend_evaluation_stack(items);
                }
            }
            Instruction::AppCall(hash) => self.call_contract(hash, false)?,
            Instruction::TailCall(hash) => self.call_contract(hash, true)?,
            Instruction::Syscall(id) => {
                let descriptor = self.host().interop.get(id)?;
                let (name, handler) = (descriptor.name, descriptor.handler);
                debug!(service = name, "syscall");
                handler(self)?;
            }

            // ===== Stack =====
            Instruction::DupFromAltStack => {
                let ctx = self.current_context_mut()?;
                let item = ctx.alt_peek()?.duplicate();
                ctx.push(item);
            }
            Instruction::ToAltStack => {
                let ctx = self.current_context_mut()?;
                let item = ctx.pop()?;
                ctx.alt_push(item);
            }
            Instruction::FromAltStack => {
                let ctx = self.current_context_mut()?;
                let item = ctx.alt_pop()?;
                ctx.push(item);
            }
            Instruction::XDrop => {
                let n = self.pop_index()?;
                self.current_context_mut()?.remove(n)?;
            }
            Instruction::XSwap => {
                let n = self.pop_index()?;
                self.current_context_mut()?.swap(n)?;
            }
            Instruction::XTuck => {
                let n = self.pop_index()?;
                if n == 0 {
                    return Err(VmError::InvalidOperation("XTUCK needs a positive index"));
                }
                let ctx = self.current_context_mut()?;
                let item = ctx.peek(0)?.duplicate();
                ctx.insert(n, item)?;
            }
            Instruction::Depth => {
                let depth = self.current_context()?.depth() as i64;
                self.push(StackItem::from(depth))?;
            }
            Instruction::Drop => {
                self.pop()?;
            }
            Instruction::Dup => {
                let item = self.peek(0)?.duplicate();
                self.push(item)?;
            }
            Instruction::Nip => {
                self.current_context_mut()?.remove(1)?;
            }
            Instruction::Over => {
                let item = self.peek(1)?.duplicate();
                self.push(item)?;
            }
            Instruction::Pick => {
                let n = self.pop_index()?;
                let item = self.peek(n)?.duplicate();
                self.push(item)?;
            }
            Instruction::Roll => {
                let n = self.pop_index()?;
                if n > 0 {
                    let ctx = self.current_context_mut()?;
                    let item = ctx.remove(n)?;
                    ctx.push(item);
                }
            }
            Instruction::Rot => {
                let ctx = self.current_context_mut()?;
                let item = ctx.remove(2)?;
                ctx.push(item);
            }
            Instruction::Swap => self.current_context_mut()?.swap(1)?,
            Instruction::Tuck => {
                let ctx = self.current_context_mut()?;
                let item = ctx.peek(0)?.duplicate();
                ctx.insert(2, item)?;
            }

            // ===== Splice =====
            Instruction::Cat => {
                let second = self.pop_bytes()?;
                let mut first = self.pop_bytes()?;
                let size = first.len() + second.len();
                if size > limits.max_item_size {
                    return Err(VmError::ItemTooLarge {
                        size,
                        limit: limits.max_item_size,
                    });
                }
                first.extend_from_slice(&second);
                self.push(StackItem::from(first))?;
            }
            Instruction::Substr => {
                let count = self.pop_index()?;
                let index = self.pop_index()?;
                let bytes = self.pop_bytes()?;
                let result = if index > bytes.len() {
                    Vec::new()
                } else {
                    let end = index.saturating_add(count).min(bytes.len());
                    bytes[index..end].to_vec()
                };
                self.push(StackItem::from(result))?;
            }
            Instruction::Left => {
                let count = self.pop_index()?;
                let bytes = self.pop_bytes()?;
                let end = count.min(bytes.len());
                self.push(StackItem::from(&bytes[..end]))?;
            }
            Instruction::Right => {
                let count = self.pop_index()?;
                let bytes = self.pop_bytes()?;
                if count > bytes.len() {
                    return Err(VmError::IndexOutOfRange {
                        index: count as i64,
                        len: bytes.len(),
                    });
                }
                self.push(StackItem::from(&bytes[bytes.len() - count..]))?;
            }
            Instruction::Size => {
                let len = self.pop()?.as_bytes()?.len() as i64;
                self.push(StackItem::from(len))?;
            }

            // ===== Bitwise =====
            Instruction::Invert => {
                let x = self.pop_integer()?;
                self.push_integer(!x)?;
            }
            Instruction::And => {
                let (a, b) = self.pop_integer_pair()?;
                self.push_integer(a & b)?;
            }
            Instruction::Or => {
                let (a, b) = self.pop_integer_pair()?;
                self.push_integer(a | b)?;
            }
            Instruction::Xor => {
                let (a, b) = self.pop_integer_pair()?;
                self.push_integer(a ^ b)?;
            }
            Instruction::Equal => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(StackItem::from(a.equals(&b)))?;
            }

            // ===== Arithmetic =====
            Instruction::Inc => {
                let x = self.pop_integer()?;
                self.push_integer(x + 1)?;
            }
            Instruction::Dec => {
                let x = self.pop_integer()?;
                self.push_integer(x - 1)?;
            }
            Instruction::Sign => {
                let x = self.pop_integer()?;
                self.push_integer(x.signum())?;
            }
            Instruction::Negate => {
                let x = self.pop_integer()?;
                self.push_integer(-x)?;
            }
            Instruction::Abs => {
                let x = self.pop_integer()?;
                self.push_integer(x.abs())?;
            }
            Instruction::Not => {
                let x = self.pop_bool()?;
                self.push(StackItem::from(!x))?;
            }
            Instruction::Nz => {
                let x = self.pop_integer()?;
                self.push(StackItem::from(!x.is_zero()))?;
            }
            Instruction::Add => {
                let (a, b) = self.pop_integer_pair()?;
                self.push_integer(a + b)?;
            }
            Instruction::Sub => {
                let (a, b) = self.pop_integer_pair()?;
                self.push_integer(a - b)?;
            }
            Instruction::Mul => {
                let (a, b) = self.pop_integer_pair()?;
                self.push_integer(a * b)?;
            }
            Instruction::Div => {
                let (a, b) = self.pop_integer_pair()?;
                if b.is_zero() {
                    return Err(VmError::DivisionByZero);
                }
                self.push_integer(a / b)?;
            }
            Instruction::Mod => {
                let (a, b) = self.pop_integer_pair()?;
                if b.is_zero() {
                    return Err(VmError::DivisionByZero);
                }
                self.push_integer(a % b)?;
            }
            Instruction::Shl | Instruction::Shr => {
                let shift = self.pop_shift()?;
                if shift == 0 {
                    return Ok(());
                }
                let shift = if matches!(instr, Instruction::Shl) { shift } else { -shift };
                let x = self.pop_integer()?;
                let magnitude = shift.unsigned_abs() as usize;
                let result = if shift > 0 { x << magnitude } else { x >> magnitude };
                self.push_integer(result)?;
            }
            Instruction::BoolAnd => {
                let b = self.pop_bool()?;
                let a = self.pop_bool()?;
                self.push(StackItem::from(a && b))?;
            }
            Instruction::BoolOr => {
                let b = self.pop_bool()?;
                let a = self.pop_bool()?;
                self.push(StackItem::from(a || b))?;
            }
            Instruction::NumEqual => self.compare(|o| o == Ordering::Equal)?,
            Instruction::NumNotEqual => self.compare(|o| o != Ordering::Equal)?,
            Instruction::Lt => self.compare(|o| o == Ordering::Less)?,
            Instruction::Gt => self.compare(|o| o == Ordering::Greater)?,
            Instruction::Lte => self.compare(|o| o != Ordering::Greater)?,
            Instruction::Gte => self.compare(|o| o != Ordering::Less)?,
            Instruction::Min => {
                let (a, b) = self.pop_integer_pair()?;
                self.push_integer(a.min(b))?;
            }
            Instruction::Max => {
                let (a, b) = self.pop_integer_pair()?;
                self.push_integer(a.max(b))?;
            }
            Instruction::Within => {
                let upper = self.pop_integer()?;
                let lower = self.pop_integer()?;
                let x = self.pop_integer()?;
                self.push(StackItem::from(lower <= x && x < upper))?;
            }

            // ===== Crypto =====
            Instruction::Sha1 => {
                let data = self.pop_bytes()?;
                let digest = self.crypto().sha1(&data);
                self.push(StackItem::from(&digest[..]))?;
            }
            Instruction::Sha256 => {
                let data = self.pop_bytes()?;
                let digest = self.crypto().sha256(&data);
                self.push(StackItem::from(&digest[..]))?;
            }
            Instruction::Hash160 => {
                let data = self.pop_bytes()?;
                let digest = self.crypto().hash160(&data);
                self.push(StackItem::from(digest.as_bytes()))?;
            }
            Instruction::Hash256 => {
                let data = self.pop_bytes()?;
                let digest = self.crypto().hash256(&data);
                self.push(StackItem::from(digest.as_bytes()))?;
            }
            Instruction::CheckSig => {
                let public_key = self.pop_bytes()?;
                let signature = self.pop_bytes()?;
                let message = self.signature_message()?;
                let valid = self.crypto().verify_signature(&message, &signature, &public_key);
                self.push(StackItem::from(valid))?;
            }
            Instruction::Verify => {
                let public_key = self.pop_bytes()?;
                let signature = self.pop_bytes()?;
                let message = self.pop_bytes()?;
                let valid = self.crypto().verify_signature(&message, &signature, &public_key);
                self.push(StackItem::from(valid))?;
            }
            Instruction::CheckMultiSig => self.check_multisig()?,

            // ===== Collections =====
            Instruction::ArraySize => {
                let size = match self.pop()? {
                    StackItem::Array(items) | StackItem::Struct(items) => items.borrow().len(),
                    StackItem::Map(map) => map.borrow().len(),
                    other => other.as_bytes()?.len(),
                };
                self.push(StackItem::from(size as i64))?;
            }
            Instruction::Pack => {
                let size = self.pop_index()?;
                if size > limits.max_array_size {
                    return Err(VmError::ArrayTooLarge {
                        size,
                        limit: limits.max_array_size,
                    });
                }
                if size > self.current_context()?.depth() {
                    return Err(VmError::StackUnderflow);
                }
                let mut items = Vec::with_capacity(size);
                for _ in 0..size {
                    items.push(self.pop()?);
                }
                self.push(StackItem::new_array(items))?;
            }
            Instruction::Unpack => {
                let list = self.pop()?.as_array()?;
                let items = list.borrow().clone();
                let count = items.len() as i64;
                let ctx = self.current_context_mut()?;
                for item in items.into_iter().rev() {
                    ctx.push(item);
                }
                ctx.push(StackItem::from(count));
            }
            Instruction::PickItem => {
                let key = self.pop()?;
                let item = match self.pop()? {
                    StackItem::Array(items) | StackItem::Struct(items) => {
                        let index = checked_index(&key, items.borrow().len())?;
                        items.borrow()[index].clone()
                    }
                    StackItem::Map(map) => map
                        .borrow()
                        .get(&MapKey::new(key)?)
                        .cloned()
                        .ok_or(VmError::KeyNotFound)?,
                    _ => return Err(InvalidValue::Array.into()),
                };
                self.push(item)?;
            }
            Instruction::SetItem => {
                let value = self.pop()?.duplicate();
                let key = self.pop()?;
                match self.pop()? {
                    StackItem::Array(items) | StackItem::Struct(items) => {
                        let mut items = items.borrow_mut();
                        let index = checked_index(&key, items.len())?;
                        items[index] = value;
                    }
                    StackItem::Map(map) => {
                        let key = MapKey::new(key)?;
                        let mut map = map.borrow_mut();
                        if !map.contains_key(&key) && map.len() >= limits.max_array_size {
                            return Err(VmError::ArrayTooLarge {
                                size: map.len() + 1,
                                limit: limits.max_array_size,
                            });
                        }
                        map.insert(key, value);
                    }
                    _ => return Err(InvalidValue::Array.into()),
                }
            }
            Instruction::NewArray | Instruction::NewStruct => {
                let as_struct = matches!(instr, Instruction::NewStruct);
                let items = match self.pop()? {
                    StackItem::Array(items) | StackItem::Struct(items) => items.borrow().clone(),
                    other => {
                        let count = usize::try_from(&other.as_integer()?).map_err(|_| {
                            VmError::InvalidOperation("array size must not be negative")
                        })?;
                        if count > limits.max_array_size {
                            return Err(VmError::ArrayTooLarge {
                                size: count,
                                limit: limits.max_array_size,
                            });
                        }
                        vec![StackItem::Boolean(false); count]
                    }
                };
                let item = if as_struct {
                    StackItem::new_struct(items)
                } else {
                    StackItem::new_array(items)
                };
                self.push(item)?;
            }
            Instruction::NewMap => self.push(StackItem::new_map())?,
            Instruction::Append => {
                let item = self.pop()?.duplicate();
                let list = self.pop()?.as_array()?;
                let mut list = list.borrow_mut();
                if list.len() >= limits.max_array_size {
                    return Err(VmError::ArrayTooLarge {
                        size: list.len() + 1,
                        limit: limits.max_array_size,
                    });
                }
                list.push(item);
            }
            Instruction::Reverse => {
                let list = self.pop()?.as_array()?;
                list.borrow_mut().reverse();
            }
            Instruction::Remove => {
                let key = self.pop()?;
                match self.pop()? {
                    StackItem::Array(items) | StackItem::Struct(items) => {
                        let mut items = items.borrow_mut();
                        let index = checked_index(&key, items.len())?;
                        items.remove(index);
                    }
                    StackItem::Map(map) => {
                        map.borrow_mut().shift_remove(&MapKey::new(key)?);
                    }
                    _ => return Err(InvalidValue::Array.into()),
                }
            }
            Instruction::HasKey => {
                let key = self.pop()?;
                let found = match self.pop()? {
                    StackItem::Array(items) | StackItem::Struct(items) => {
                        let index = key.as_integer()?;
                        if index.is_negative() {
                            return Err(VmError::InvalidOperation("index must not be negative"));
                        }
                        index < BigInt::from(items.borrow().len())
                    }
                    StackItem::Map(map) => map.borrow().contains_key(&MapKey::new(key)?),
                    _ => return Err(InvalidValue::Array.into()),
                };
                self.push(StackItem::from(found))?;
            }
            Instruction::Keys => {
                let map = self.pop()?.as_map()?;
                let keys = map.borrow().keys().map(|k| k.item().clone()).collect();
                self.push(StackItem::new_array(keys))?;
            }
            Instruction::Values => {
                let values: Vec<StackItem> = match self.pop()? {
                    StackItem::Array(items) | StackItem::Struct(items) => {
                        items.borrow().iter().map(StackItem::duplicate).collect()
                    }
                    StackItem::Map(map) => map.borrow().values().map(StackItem::duplicate).collect(),
                    _ => return Err(InvalidValue::Array.into()),
                };
                self.push(StackItem::new_array(values))?;
            }

            // ===== Slots =====
            Instruction::InitSSlot(count) => {
                if count == 0 {
                    return Err(VmError::InvalidOperation("INITSSLOT needs at least one slot"));
                }
                self.current_context_mut()?.init_static_slot(count as usize)?;
            }
            Instruction::InitSlot { locals, args } => {
                if locals == 0 && args == 0 {
                    return Err(VmError::InvalidOperation("INITSLOT needs at least one slot"));
                }
                self.current_context_mut()?
                    .init_slots(locals as usize, args as usize)?;
            }
            Instruction::LdSFld(index) => {
                let item = self.current_context()?.load_static(index as usize)?;
                self.push(item)?;
            }
            Instruction::StSFld(index) => {
                let ctx = self.current_context_mut()?;
                let item = ctx.pop()?;
                ctx.store_static(index as usize, item)?;
            }
            Instruction::LdLoc(index) => {
                let item = self.current_context()?.load_local(index as usize)?;
                self.push(item)?;
            }
            Instruction::StLoc(index) => {
                let ctx = self.current_context_mut()?;
                let item = ctx.pop()?;
                ctx.store_local(index as usize, item)?;
            }
            Instruction::LdArg(index) => {
                let item = self.current_context()?.load_argument(index as usize)?;
                self.push(item)?;
            }
            Instruction::StArg(index) => {
                let ctx = self.current_context_mut()?;
                let item = ctx.pop()?;
                ctx.store_argument(index as usize, item)?;
            }

            // ===== Exceptions =====
            Instruction::Throw => {
                self.current_context_mut()?.set_pending_exception();
                return Err(VmError::Throw);
            }
            Instruction::ThrowIfNot => {
                if !self.pop_bool()? {
                    self.current_context_mut()?.set_pending_exception();
                    return Err(VmError::Throw);
                }
            }
        }
        Ok(())
    }

    /// Pops `b` then `a`, returning `(a, b)` in script order.
    fn pop_integer_pair(&mut self) -> VmResult<(BigInt, BigInt)> {
        let b = self.pop_integer()?;
        let a = self.pop_integer()?;
        Ok((a, b))
    }

    fn compare(&mut self, accept: impl FnOnce(Ordering) -> bool) -> VmResult<()> {
        let (a, b) = self.pop_integer_pair()?;
        self.push(StackItem::from(accept(a.cmp(&b))))
    }

    fn pop_shift(&mut self) -> VmResult<i64> {
        let shift = self.pop_integer()?;
        let limit = Config::MAX_SHIFT;
        match i64::try_from(&shift) {
            Ok(value) if (-limit..=limit).contains(&value) => Ok(value),
            Ok(value) => Err(VmError::ShiftOutOfRange { shift: value, limit }),
            Err(_) => Err(VmError::ShiftOutOfRange {
                shift: if shift.is_negative() { i64::MIN } else { i64::MAX },
                limit,
            }),
        }
    }

    /// Message that `CHECKSIG`/`CHECKMULTISIG` signatures commit to.
    fn signature_message(&self) -> VmResult<Vec<u8>> {
        self.container()
            .map(|tx| tx.encode())
            .ok_or(VmError::InvalidOperation("no script container to verify against"))
    }

    /// Pops either an array of byte strings or a count followed by that many
    /// byte strings.
    fn pop_byte_list(&mut self) -> VmResult<Vec<Rc<[u8]>>> {
        match self.pop()? {
            StackItem::Array(items) | StackItem::Struct(items) => items
                .borrow()
                .iter()
                .map(|item| item.as_bytes().map_err(VmError::from))
                .collect(),
            other => {
                let count = usize::try_from(&other.as_integer()?).unwrap_or(0);
                if count == 0 || count > self.current_context()?.depth() {
                    return Err(VmError::InvalidOperation("invalid multisig item count"));
                }
                let mut list = Vec::with_capacity(count);
                for _ in 0..count {
                    list.push(self.pop()?.as_bytes()?);
                }
                Ok(list)
            }
        }
    }

    fn check_multisig(&mut self) -> VmResult<()> {
        let public_keys = self.pop_byte_list()?;
        let signatures = self.pop_byte_list()?;
        let (n, m) = (public_keys.len(), signatures.len());
        if n == 0 || m == 0 || m > n {
            return Err(VmError::InvalidOperation("invalid multisig key or signature count"));
        }
        let message = self.signature_message()?;
        let crypto = self.crypto();

        // Signatures must appear in the same order as their keys.
        let (mut i, mut j) = (0, 0);
        let mut success = true;
        while success && i < m && j < n {
            if crypto.verify_signature(&message, &signatures[i], &public_keys[j]) {
                i += 1;
            }
            j += 1;
            if m - i > n - j {
                success = false;
            }
        }
        self.push(StackItem::from(success && i == m))
    }

    fn call_contract(&mut self, hash: UInt160, tail: bool) -> VmResult<()> {
        let hash = if hash.is_zero() {
            self.check_dynamic_invoke()?;
            let target = self.pop_bytes()?;
            UInt160::from_slice(&target)
                .ok_or(VmError::InvalidOperation("dynamic call target must be 20 bytes"))?
        } else {
            hash
        };
        let contract = self
            .blockchain()
            .contract(&hash)?
            .ok_or_else(|| VmError::ContractNotFound(hash.to_string()))?;
        debug!(contract = %hash, tail, "app call");

        let mut frame = ExecutionContext::new(Script::new(contract.script.clone(), hash));
        frame.extend_evaluation_stack(self.current_context_mut()?.take_evaluation_stack());
        if tail {
            self.invocation_stack_mut().pop()?;
        }
        self.invocation_stack_mut().push(frame)
    }

    /// Only deployed contracts flagged for dynamic invoke may call a hash
    /// taken from the stack.
    fn check_dynamic_invoke(&self) -> VmResult<()> {
        let current = self.current_context()?.script_hash();
        match self.blockchain().contract(&current)? {
            Some(contract) if contract.has_dynamic_invoke() => Ok(()),
            _ => Err(VmError::InvalidOperation("dynamic invoke not allowed")),
        }
    }
}

fn jump_target(ctx: &ExecutionContext, position: usize, offset: i16) -> VmResult<usize> {
    let target = position as i64 + offset as i64;
    let len = ctx.script().len();
    if target < 0 || target > len as i64 {
        return Err(VmError::InvalidJump { target, len });
    }
    Ok(target as usize)
}

fn checked_index(key: &StackItem, len: usize) -> VmResult<usize> {
    let index = key.as_integer()?;
    match usize::try_from(&index) {
        Ok(i) if i < len => Ok(i),
        _ => Err(VmError::IndexOutOfRange {
            index: i64::try_from(&index).unwrap_or(i64::MAX),
            len,
        }),
    }
}
