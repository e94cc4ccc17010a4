use crate::arch::mask;
use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies an x86 or x86-64 register.
///
/// Sub-registers such as `eax`, `ax`, `ah` and `al` have their own ids. Each
/// of them names a full-width *parent*, here `rax`. Flags are 1-bit registers
/// which are their own parent.
#[rustfmt::skip]
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum RegisterId {
    Invalid,
    Rax, Rbx, Rcx, Rdx, Rdi, Rsi, Rbp, Rsp, Rip,
    R8, R9, R10, R11, R12, R13, R14, R15,
    Eax, Ebx, Ecx, Edx, Edi, Esi, Ebp, Esp, Eip,
    R8d, R9d, R10d, R11d, R12d, R13d, R14d, R15d,
    Ax, Bx, Cx, Dx, Di, Si, Bp, Sp, Ip,
    R8w, R9w, R10w, R11w, R12w, R13w, R14w, R15w,
    Ah, Al, Bh, Bl, Ch, Cl, Dh, Dl, Dil, Sil, Bpl, Spl,
    R8b, R9b, R10b, R11b, R12b, R13b, R14b, R15b,
    Xmm0, Xmm1, Xmm2, Xmm3, Xmm4, Xmm5, Xmm6, Xmm7,
    Xmm8, Xmm9, Xmm10, Xmm11, Xmm12, Xmm13, Xmm14, Xmm15,
    Cs, Ds, Es, Fs, Gs, Ss,
    Af, Cf, Df, If, Of, Pf, Sf, Tf, Zf,
}

/// Static information about a register.
#[derive(Debug)]
pub struct RegisterSpec {
    name: &'static str,
    id: RegisterId,
    /// The full register. For example, `rax` is the full register for `ah`.
    full_reg: RegisterId,
    /// The position of the lowest bit of this register in the full register.
    offset: usize,
    bits: usize,
    flag: bool,
}

impl RegisterSpec {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn id(&self) -> RegisterId {
        self.id
    }

    pub fn full_reg(&self) -> RegisterId {
        self.full_reg
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn bits(&self) -> usize {
        self.bits
    }

    pub fn is_flag(&self) -> bool {
        self.flag
    }
}

static INVALID_REGISTER: RegisterSpec = RegisterSpec {
    name: "unknown",
    id: RegisterId::Invalid,
    full_reg: RegisterId::Invalid,
    offset: 0,
    bits: 0,
    flag: false,
};

macro_rules! reg {
    ($name:expr, $id:ident, $full:ident, $offset:expr, $bits:expr) => {
        RegisterSpec { name: $name, id: RegisterId::$id, full_reg: RegisterId::$full, offset: $offset, bits: $bits, flag: false }
    };
}

macro_rules! flag {
    ($name:expr, $id:ident) => {
        RegisterSpec { name: $name, id: RegisterId::$id, full_reg: RegisterId::$id, offset: 0, bits: 1, flag: true }
    };
}

#[rustfmt::skip]
const X86_REGISTERS: &[RegisterSpec] = &[
    reg!("rax", Rax, Rax, 0, 64),
    reg!("rbx", Rbx, Rbx, 0, 64),
    reg!("rcx", Rcx, Rcx, 0, 64),
    reg!("rdx", Rdx, Rdx, 0, 64),
    reg!("rdi", Rdi, Rdi, 0, 64),
    reg!("rsi", Rsi, Rsi, 0, 64),
    reg!("rbp", Rbp, Rbp, 0, 64),
    reg!("rsp", Rsp, Rsp, 0, 64),
    reg!("rip", Rip, Rip, 0, 64),
    reg!("r8",  R8,  R8,  0, 64),
    reg!("r9",  R9,  R9,  0, 64),
    reg!("r10", R10, R10, 0, 64),
    reg!("r11", R11, R11, 0, 64),
    reg!("r12", R12, R12, 0, 64),
    reg!("r13", R13, R13, 0, 64),
    reg!("r14", R14, R14, 0, 64),
    reg!("r15", R15, R15, 0, 64),

    reg!("eax",  Eax,  Rax, 0, 32),
    reg!("ebx",  Ebx,  Rbx, 0, 32),
    reg!("ecx",  Ecx,  Rcx, 0, 32),
    reg!("edx",  Edx,  Rdx, 0, 32),
    reg!("edi",  Edi,  Rdi, 0, 32),
    reg!("esi",  Esi,  Rsi, 0, 32),
    reg!("ebp",  Ebp,  Rbp, 0, 32),
    reg!("esp",  Esp,  Rsp, 0, 32),
    reg!("eip",  Eip,  Rip, 0, 32),
    reg!("r8d",  R8d,  R8,  0, 32),
    reg!("r9d",  R9d,  R9,  0, 32),
    reg!("r10d", R10d, R10, 0, 32),
    reg!("r11d", R11d, R11, 0, 32),
    reg!("r12d", R12d, R12, 0, 32),
    reg!("r13d", R13d, R13, 0, 32),
    reg!("r14d", R14d, R14, 0, 32),
    reg!("r15d", R15d, R15, 0, 32),

    reg!("ax",   Ax,   Rax, 0, 16),
    reg!("bx",   Bx,   Rbx, 0, 16),
    reg!("cx",   Cx,   Rcx, 0, 16),
    reg!("dx",   Dx,   Rdx, 0, 16),
    reg!("di",   Di,   Rdi, 0, 16),
    reg!("si",   Si,   Rsi, 0, 16),
    reg!("bp",   Bp,   Rbp, 0, 16),
    reg!("sp",   Sp,   Rsp, 0, 16),
    reg!("ip",   Ip,   Rip, 0, 16),
    reg!("r8w",  R8w,  R8,  0, 16),
    reg!("r9w",  R9w,  R9,  0, 16),
    reg!("r10w", R10w, R10, 0, 16),
    reg!("r11w", R11w, R11, 0, 16),
    reg!("r12w", R12w, R12, 0, 16),
    reg!("r13w", R13w, R13, 0, 16),
    reg!("r14w", R14w, R14, 0, 16),
    reg!("r15w", R15w, R15, 0, 16),

    reg!("ah",   Ah,   Rax, 8, 8),
    reg!("al",   Al,   Rax, 0, 8),
    reg!("bh",   Bh,   Rbx, 8, 8),
    reg!("bl",   Bl,   Rbx, 0, 8),
    reg!("ch",   Ch,   Rcx, 8, 8),
    reg!("cl",   Cl,   Rcx, 0, 8),
    reg!("dh",   Dh,   Rdx, 8, 8),
    reg!("dl",   Dl,   Rdx, 0, 8),
    reg!("dil",  Dil,  Rdi, 0, 8),
    reg!("sil",  Sil,  Rsi, 0, 8),
    reg!("bpl",  Bpl,  Rbp, 0, 8),
    reg!("spl",  Spl,  Rsp, 0, 8),
    reg!("r8b",  R8b,  R8,  0, 8),
    reg!("r9b",  R9b,  R9,  0, 8),
    reg!("r10b", R10b, R10, 0, 8),
    reg!("r11b", R11b, R11, 0, 8),
    reg!("r12b", R12b, R12, 0, 8),
    reg!("r13b", R13b, R13, 0, 8),
    reg!("r14b", R14b, R14, 0, 8),
    reg!("r15b", R15b, R15, 0, 8),

    reg!("xmm0",  Xmm0,  Xmm0,  0, 128),
    reg!("xmm1",  Xmm1,  Xmm1,  0, 128),
    reg!("xmm2",  Xmm2,  Xmm2,  0, 128),
    reg!("xmm3",  Xmm3,  Xmm3,  0, 128),
    reg!("xmm4",  Xmm4,  Xmm4,  0, 128),
    reg!("xmm5",  Xmm5,  Xmm5,  0, 128),
    reg!("xmm6",  Xmm6,  Xmm6,  0, 128),
    reg!("xmm7",  Xmm7,  Xmm7,  0, 128),
    reg!("xmm8",  Xmm8,  Xmm8,  0, 128),
    reg!("xmm9",  Xmm9,  Xmm9,  0, 128),
    reg!("xmm10", Xmm10, Xmm10, 0, 128),
    reg!("xmm11", Xmm11, Xmm11, 0, 128),
    reg!("xmm12", Xmm12, Xmm12, 0, 128),
    reg!("xmm13", Xmm13, Xmm13, 0, 128),
    reg!("xmm14", Xmm14, Xmm14, 0, 128),
    reg!("xmm15", Xmm15, Xmm15, 0, 128),

    reg!("cs", Cs, Cs, 0, 64),
    reg!("ds", Ds, Ds, 0, 64),
    reg!("es", Es, Es, 0, 64),
    reg!("fs", Fs, Fs, 0, 64),
    reg!("gs", Gs, Gs, 0, 64),
    reg!("ss", Ss, Ss, 0, 64),

    flag!("af", Af),
    flag!("cf", Cf),
    flag!("df", Df),
    flag!("if", If),
    flag!("of", Of),
    flag!("pf", Pf),
    flag!("sf", Sf),
    flag!("tf", Tf),
    flag!("zf", Zf),
];

impl RegisterId {
    /// Get the static information for this register.
    ///
    /// `RegisterId::Invalid` has a 0-bit spec named `unknown`.
    pub fn spec(self) -> &'static RegisterSpec {
        match self {
            RegisterId::Invalid => &INVALID_REGISTER,
            // The table holds every other id, in declaration order.
            id => &X86_REGISTERS[id as usize - 1],
        }
    }

    /// Find a register by its lower-case name.
    pub fn from_name(name: &str) -> Option<RegisterId> {
        X86_REGISTERS
            .iter()
            .find(|spec| spec.name == name)
            .map(|spec| spec.id)
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }

    /// The full-width register this register is a part of.
    pub fn parent(self) -> RegisterId {
        self.spec().full_reg
    }
}

impl fmt::Display for RegisterId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A register operand holding a concrete value.
///
/// The value is always truncated to the width of the register.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(from = "RegisterFields")]
pub struct Register {
    id: RegisterId,
    value: BigUint,
}

impl Register {
    /// Create a register holding zero.
    pub fn new(id: RegisterId) -> Register {
        Register {
            id,
            value: BigUint::zero(),
        }
    }

    /// Create a register holding the given value.
    pub fn with_value<V: Into<BigUint>>(id: RegisterId, value: V) -> Register {
        let mut register = Register::new(id);
        register.set_value(value);
        register
    }

    pub fn id(&self) -> RegisterId {
        self.id
    }

    pub fn spec(&self) -> &'static RegisterSpec {
        self.id.spec()
    }

    pub fn name(&self) -> &'static str {
        self.spec().name
    }

    /// The size of this register in bits.
    pub fn bits(&self) -> usize {
        self.spec().bits
    }

    /// The size of this register in bytes, rounded up.
    pub fn size(&self) -> usize {
        (self.bits() + 7) / 8
    }

    /// The highest bit of the parent register covered by this register.
    pub fn high(&self) -> usize {
        let spec = self.spec();
        (spec.offset + spec.bits).saturating_sub(1)
    }

    /// The lowest bit of the parent register covered by this register.
    pub fn low(&self) -> usize {
        self.spec().offset
    }

    /// The id of the full-width register this register is a part of.
    pub fn parent(&self) -> RegisterId {
        self.spec().full_reg
    }

    /// Returns true if this register is the full-width register.
    pub fn is_full(&self) -> bool {
        self.id == self.parent()
    }

    pub fn is_flag(&self) -> bool {
        self.spec().flag
    }

    pub fn is_valid(&self) -> bool {
        self.id != RegisterId::Invalid
    }

    /// The concrete value of this register.
    pub fn value(&self) -> &BigUint {
        &self.value
    }

    /// The concrete value of this register, if it fits in a `u64`.
    pub fn value_u64(&self) -> Option<u64> {
        self.value.to_u64()
    }

    /// Set the concrete value, truncating it to the width of the register.
    pub fn set_value<V: Into<BigUint>>(&mut self, value: V) {
        self.value = value.into() & mask(self.bits());
    }

    /// Write the value of a sub-register into this full-width register.
    ///
    /// `sub` must have this register as its parent.
    pub(crate) fn deposit(&mut self, sub: &Register) {
        debug_assert_eq!(sub.parent(), self.id);
        let keep = mask(self.bits()) ^ (mask(sub.bits()) << sub.low());
        self.value = (&self.value & keep) | (sub.value() << sub.low());
    }

    /// Read the value of a sub-register out of this full-width register.
    ///
    /// `id` must have this register as its parent.
    pub(crate) fn extract(&self, id: RegisterId) -> Register {
        debug_assert_eq!(id.parent(), self.id);
        let spec = id.spec();
        Register::with_value(id, &self.value >> spec.offset)
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}:{} bv[{}..{}]",
            self.name(),
            self.bits(),
            self.high(),
            self.low()
        )
    }
}

#[derive(Deserialize)]
struct RegisterFields {
    id: RegisterId,
    value: BigUint,
}

impl From<RegisterFields> for Register {
    fn from(fields: RegisterFields) -> Register {
        Register::with_value(fields.id, fields.value)
    }
}

impl From<RegisterId> for Register {
    fn from(id: RegisterId) -> Register {
        Register::new(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_register_layout() {
        let ah = Register::with_value(RegisterId::Ah, 0x18u32);
        assert_eq!(ah.name(), "ah");
        assert_eq!(ah.bits(), 8);
        assert_eq!(ah.size(), 1);
        assert_eq!(ah.high(), 15);
        assert_eq!(ah.low(), 8);
        assert_eq!(ah.parent(), RegisterId::Rax);
        assert!(!ah.is_full());
        assert_eq!(ah.value_u64(), Some(0x18));
        assert_eq!(format!("{}", ah), "ah:8 bv[15..8]");

        let rax = Register::new(RegisterId::Rax);
        assert_eq!(format!("{}", rax), "rax:64 bv[63..0]");
        assert!(rax.is_full());
    }

    #[test]
    fn values_are_truncated() {
        let al = Register::with_value(RegisterId::Al, 0x1234u32);
        assert_eq!(al.value_u64(), Some(0x34));

        let mut zf = Register::new(RegisterId::Zf);
        zf.set_value(3u32);
        assert_eq!(zf.value_u64(), Some(1));
        assert!(zf.is_flag());
        assert_eq!(zf.parent(), RegisterId::Zf);
        assert_eq!(zf.size(), 1);
    }

    #[test]
    fn deposit_and_extract() {
        let mut rax = Register::with_value(RegisterId::Rax, 0x1122_3344_5566_7788u64);
        assert_eq!(rax.extract(RegisterId::Al).value_u64(), Some(0x88));
        assert_eq!(rax.extract(RegisterId::Ah).value_u64(), Some(0x77));
        assert_eq!(rax.extract(RegisterId::Eax).value_u64(), Some(0x5566_7788));

        rax.deposit(&Register::with_value(RegisterId::Ah, 0xffu32));
        assert_eq!(rax.value_u64(), Some(0x1122_3344_5566_ff88));

        rax.deposit(&Register::with_value(RegisterId::Eax, 0u32));
        assert_eq!(rax.value_u64(), Some(0x1122_3344_0000_0000));
    }

    #[test]
    fn invalid_register() {
        let register = Register::with_value(RegisterId::Invalid, 10u32);
        assert!(!register.is_valid());
        assert_eq!(register.bits(), 0);
        assert_eq!(register.value_u64(), Some(0));
        assert_eq!(format!("{}", register), "unknown:0 bv[0..0]");
    }

    #[test]
    fn table_follows_declaration_order() {
        assert_eq!(X86_REGISTERS.len(), RegisterId::Zf as usize);
        for (index, spec) in X86_REGISTERS.iter().enumerate() {
            assert_eq!(spec.id as usize, index + 1, "{}", spec.name);
            assert_eq!(spec.id.spec().name, spec.name);
        }
        assert_eq!(RegisterId::Invalid.spec().name, "unknown");
    }

    #[test]
    fn deserialize_truncates_value() {
        let al: Register = serde_json::from_str(r#"{"id":"Al","value":[4660]}"#).unwrap();
        assert_eq!(al.value_u64(), Some(0x34));

        let zf: Register = serde_json::from_str(r#"{"id":"Zf","value":[3]}"#).unwrap();
        assert_eq!(zf.value_u64(), Some(1));

        let rax = Register::with_value(RegisterId::Rax, 0x1122_3344_5566_7788u64);
        let json = serde_json::to_string(&rax).unwrap();
        assert_eq!(serde_json::from_str::<Register>(&json).unwrap(), rax);
    }

    #[test]
    fn lookup_by_name() {
        assert_eq!(RegisterId::from_name("r12w"), Some(RegisterId::R12w));
        assert_eq!(RegisterId::from_name("xmm3").unwrap().parent(), RegisterId::Xmm3);
        assert_eq!(RegisterId::from_name("nope"), None);
    }
}
