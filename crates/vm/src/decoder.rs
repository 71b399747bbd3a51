use types::UInt160;

use crate::errors::{VmError, VmResult};
use crate::global::Config;
use crate::instruction::Instruction;
use crate::interop::interop_hash;
use crate::opcode::*;

/// Decodes the instruction starting at `position`.
///
/// Returns the instruction and its encoded size (opcode plus operand).
/// Running off the end of the script decodes as an implicit `RET`, which is
/// how a script without a trailing `RET` still returns to its caller.
///
/// Operands that run past the end of the script fail with
/// [`VmError::TruncatedOperand`]; bytes with no assigned opcode fail with
/// [`VmError::UnknownOpcode`].
pub fn decode(script: &[u8], position: usize) -> VmResult<(Instruction, usize)> {
    let Some(&opcode) = script.get(position) else {
        return Ok((Instruction::Ret, 0));
    };

    let operand = |offset: usize, len: usize| -> VmResult<&[u8]> {
        let start = position + 1 + offset;
        script
            .get(start..start + len)
            .ok_or(VmError::TruncatedOperand { opcode, position })
    };

    let instr = match opcode {
        PUSH0 => (Instruction::PushBytes(Vec::new()), 1),
        PUSHBYTES1..=PUSHBYTES75 => {
            let len = opcode as usize;
            (Instruction::PushBytes(operand(0, len)?.to_vec()), 1 + len)
        }
        PUSHDATA1 => {
            let len = operand(0, 1)?[0] as usize;
            (Instruction::PushBytes(operand(1, len)?.to_vec()), 2 + len)
        }
        PUSHDATA2 => {
            let len = u16::from_le_bytes([operand(0, 2)?[0], operand(0, 2)?[1]]) as usize;
            (Instruction::PushBytes(operand(2, len)?.to_vec()), 3 + len)
        }
        PUSHDATA4 => {
            let raw = operand(0, 4)?;
            let len = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize;
            if len > Config::MAX_ITEM_SIZE {
                return Err(VmError::ItemTooLarge {
                    size: len,
                    limit: Config::MAX_ITEM_SIZE,
                });
            }
            (Instruction::PushBytes(operand(4, len)?.to_vec()), 5 + len)
        }
        PUSHM1 => (Instruction::PushInt(-1), 1),
        PUSH1..=PUSH16 => (Instruction::PushInt((opcode - PUSH1 + 1) as i8), 1),

        NOP => (Instruction::Nop, 1),
        JMP => (Instruction::Jmp(read_offset(operand(0, 2)?)), 3),
        JMPIF => (Instruction::JmpIf(read_offset(operand(0, 2)?)), 3),
        JMPIFNOT => (Instruction::JmpIfNot(read_offset(operand(0, 2)?)), 3),
        CALL => (Instruction::Call(read_offset(operand(0, 2)?)), 3),
        RET => (Instruction::Ret, 1),
        APPCALL => (Instruction::AppCall(read_hash(operand(0, 20)?)), 21),
        TAILCALL => (Instruction::TailCall(read_hash(operand(0, 20)?)), 21),
        SYSCALL => {
            let len = operand(0, 1)?[0] as usize;
            if len > Config::MAX_INTEROP_NAME_LEN {
                return Err(VmError::InvalidInteropName);
            }
            let raw = operand(1, len)?;
            let id = if len == 4 {
                u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]])
            } else {
                if !raw.is_ascii() {
                    return Err(VmError::InvalidInteropName);
                }
                interop_hash(raw)
            };
            (Instruction::Syscall(id), 2 + len)
        }

        DUPFROMALTSTACK => (Instruction::DupFromAltStack, 1),
        TOALTSTACK => (Instruction::ToAltStack, 1),
        FROMALTSTACK => (Instruction::FromAltStack, 1),
        XDROP => (Instruction::XDrop, 1),
        XSWAP => (Instruction::XSwap, 1),
        XTUCK => (Instruction::XTuck, 1),
        DEPTH => (Instruction::Depth, 1),
        DROP => (Instruction::Drop, 1),
        DUP => (Instruction::Dup, 1),
        NIP => (Instruction::Nip, 1),
        OVER => (Instruction::Over, 1),
        PICK => (Instruction::Pick, 1),
        ROLL => (Instruction::Roll, 1),
        ROT => (Instruction::Rot, 1),
        SWAP => (Instruction::Swap, 1),
        TUCK => (Instruction::Tuck, 1),

        CAT => (Instruction::Cat, 1),
        SUBSTR => (Instruction::Substr, 1),
        LEFT => (Instruction::Left, 1),
        RIGHT => (Instruction::Right, 1),
        SIZE => (Instruction::Size, 1),

        INVERT => (Instruction::Invert, 1),
        AND => (Instruction::And, 1),
        OR => (Instruction::Or, 1),
        XOR => (Instruction::Xor, 1),
        EQUAL => (Instruction::Equal, 1),

        INC => (Instruction::Inc, 1),
        DEC => (Instruction::Dec, 1),
        SIGN => (Instruction::Sign, 1),
        NEGATE => (Instruction::Negate, 1),
        ABS => (Instruction::Abs, 1),
        NOT => (Instruction::Not, 1),
        NZ => (Instruction::Nz, 1),
        ADD => (Instruction::Add, 1),
        SUB => (Instruction::Sub, 1),
        MUL => (Instruction::Mul, 1),
        DIV => (Instruction::Div, 1),
        MOD => (Instruction::Mod, 1),
        SHL => (Instruction::Shl, 1),
        SHR => (Instruction::Shr, 1),
        BOOLAND => (Instruction::BoolAnd, 1),
        BOOLOR => (Instruction::BoolOr, 1),
        NUMEQUAL => (Instruction::NumEqual, 1),
        NUMNOTEQUAL => (Instruction::NumNotEqual, 1),
        LT => (Instruction::Lt, 1),
        GT => (Instruction::Gt, 1),
        LTE => (Instruction::Lte, 1),
        GTE => (Instruction::Gte, 1),
        MIN => (Instruction::Min, 1),
        MAX => (Instruction::Max, 1),
        WITHIN => (Instruction::Within, 1),

        SHA1 => (Instruction::Sha1, 1),
        SHA256 => (Instruction::Sha256, 1),
        HASH160 => (Instruction::Hash160, 1),
        HASH256 => (Instruction::Hash256, 1),
        CHECKSIG => (Instruction::CheckSig, 1),
        VERIFY => (Instruction::Verify, 1),
        CHECKMULTISIG => (Instruction::CheckMultiSig, 1),

        ARRAYSIZE => (Instruction::ArraySize, 1),
        PACK => (Instruction::Pack, 1),
        UNPACK => (Instruction::Unpack, 1),
        PICKITEM => (Instruction::PickItem, 1),
        SETITEM => (Instruction::SetItem, 1),
        NEWARRAY => (Instruction::NewArray, 1),
        NEWSTRUCT => (Instruction::NewStruct, 1),
        NEWMAP => (Instruction::NewMap, 1),
        APPEND => (Instruction::Append, 1),
        REVERSE => (Instruction::Reverse, 1),
        REMOVE => (Instruction::Remove, 1),
        HASKEY => (Instruction::HasKey, 1),
        KEYS => (Instruction::Keys, 1),
        VALUES => (Instruction::Values, 1),

        INITSSLOT => (Instruction::InitSSlot(operand(0, 1)?[0]), 2),
        INITSLOT => {
            let raw = operand(0, 2)?;
            (
                Instruction::InitSlot {
                    locals: raw[0],
                    args: raw[1],
                },
                3,
            )
        }
        LDSFLD => (Instruction::LdSFld(operand(0, 1)?[0]), 2),
        STSFLD => (Instruction::StSFld(operand(0, 1)?[0]), 2),
        LDLOC => (Instruction::LdLoc(operand(0, 1)?[0]), 2),
        STLOC => (Instruction::StLoc(operand(0, 1)?[0]), 2),
        LDARG => (Instruction::LdArg(operand(0, 1)?[0]), 2),
        STARG => (Instruction::StArg(operand(0, 1)?[0]), 2),

        THROW => (Instruction::Throw, 1),
        THROWIFNOT => (Instruction::ThrowIfNot, 1),

        _ => return Err(VmError::UnknownOpcode { opcode, position }),
    };
    Ok(instr)
}

fn read_offset(raw: &[u8]) -> i16 {
    i16::from_le_bytes([raw[0], raw[1]])
}

fn read_hash(raw: &[u8]) -> UInt160 {
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(raw);
    UInt160(bytes)
}
