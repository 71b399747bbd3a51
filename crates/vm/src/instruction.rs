use types::UInt160;

/// A decoded instruction together with its inline operand.
///
/// EDUCATIONAL PURPOSE: Bytecode is a flat byte string; the decoder turns the
/// opcode at the instruction pointer plus whatever operand follows it into
/// one of these variants so the dispatcher can `match` on meaning instead of
/// raw bytes.
///
/// OPERAND FORMS:
/// - Pushes carry the literal bytes (`PUSHBYTESn`, `PUSHDATA1/2/4`) or a small
///   integer (`PUSHM1`, `PUSH1..16`).
/// - Jumps and `CALL` carry a signed 16-bit offset relative to the opcode.
/// - `APPCALL`/`TAILCALL` carry a 20-byte script hash (all zero = dynamic).
/// - `SYSCALL` carries the interop method id, resolved from a name or given
///   directly as four bytes.
/// - Slot opcodes carry a one-byte index or size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    // ===== Push =====
    PushBytes(Vec<u8>),
    PushInt(i8),

    // ===== Flow control =====
    Nop,
    Jmp(i16),
    JmpIf(i16),
    JmpIfNot(i16),
    Call(i16),
    Ret,
    AppCall(UInt160),
    Syscall(u32),
    TailCall(UInt160),

    // ===== Stack =====
    DupFromAltStack,
    ToAltStack,
    FromAltStack,
    XDrop,
    XSwap,
    XTuck,
    Depth,
    Drop,
    Dup,
    Nip,
    Over,
    Pick,
    Roll,
    Rot,
    Swap,
    Tuck,

    // ===== Splice =====
    Cat,
    Substr,
    Left,
    Right,
    Size,

    // ===== Bitwise =====
    Invert,
    And,
    Or,
    Xor,
    Equal,

    // ===== Arithmetic =====
    Inc,
    Dec,
    Sign,
    Negate,
    Abs,
    Not,
    Nz,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    BoolAnd,
    BoolOr,
    NumEqual,
    NumNotEqual,
    Lt,
    Gt,
    Lte,
    Gte,
    Min,
    Max,
    Within,

    // ===== Crypto =====
    Sha1,
    Sha256,
    Hash160,
    Hash256,
    CheckSig,
    Verify,
    CheckMultiSig,

    // ===== Collections =====
    ArraySize,
    Pack,
    Unpack,
    PickItem,
    SetItem,
    NewArray,
    NewStruct,
    NewMap,
    Append,
    Reverse,
    Remove,
    HasKey,
    Keys,
    Values,

    // ===== Slots =====
    InitSSlot(u8),
    InitSlot { locals: u8, args: u8 },
    LdSFld(u8),
    StSFld(u8),
    LdLoc(u8),
    StLoc(u8),
    LdArg(u8),
    StArg(u8),

    // ===== Exceptions =====
    Throw,
    ThrowIfNot,
}

impl Instruction {
    /// Pushes and `NOP` are free under the gas schedule.
    pub fn is_push(&self) -> bool {
        matches!(self, Instruction::PushBytes(_) | Instruction::PushInt(_))
    }

    pub fn pretty_print(&self) -> String {
        match self {
            Instruction::PushBytes(data) if data.is_empty() => "PUSH0".to_string(),
            Instruction::PushBytes(data) => format!("PUSH {}", hex::encode(data)),
            Instruction::PushInt(value) => format!("PUSH{}", value),
            Instruction::Jmp(offset) => format!("JMP {:+}", offset),
            Instruction::JmpIf(offset) => format!("JMPIF {:+}", offset),
            Instruction::JmpIfNot(offset) => format!("JMPIFNOT {:+}", offset),
            Instruction::Call(offset) => format!("CALL {:+}", offset),
            Instruction::AppCall(hash) => format!("APPCALL {}", hash),
            Instruction::TailCall(hash) => format!("TAILCALL {}", hash),
            Instruction::Syscall(id) => format!("SYSCALL 0x{:08x}", id),
            Instruction::InitSSlot(count) => format!("INITSSLOT {}", count),
            Instruction::InitSlot { locals, args } => format!("INITSLOT {} {}", locals, args),
            Instruction::LdSFld(i) => format!("LDSFLD {}", i),
            Instruction::StSFld(i) => format!("STSFLD {}", i),
            Instruction::LdLoc(i) => format!("LDLOC {}", i),
            Instruction::StLoc(i) => format!("STLOC {}", i),
            Instruction::LdArg(i) => format!("LDARG {}", i),
            Instruction::StArg(i) => format!("STARG {}", i),
            other => format!("{:?}", other).to_uppercase(),
        }
    }
}
