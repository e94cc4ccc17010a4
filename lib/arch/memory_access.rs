use crate::arch::{mask, RegisterId};
use crate::Error;
use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The sizes, in bytes, a `MemoryAccess` can have.
pub const MEMORY_ACCESS_SIZES: &[usize] = &[1, 2, 4, 8, 16, 32, 64];

/// A concrete access to memory.
///
/// Alongside the address, size and value, a `MemoryAccess` keeps the
/// registers and constants which formed the effective address, as decoded
/// from the instruction.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(try_from = "MemoryAccessFields")]
pub struct MemoryAccess {
    address: u64,
    size: usize,
    value: BigUint,
    base: Option<RegisterId>,
    index: Option<RegisterId>,
    segment: Option<RegisterId>,
    scale: u32,
    displacement: i64,
}

impl MemoryAccess {
    /// Create a new `MemoryAccess` of `size` bytes at `address`, holding
    /// zero.
    pub fn new(address: u64, size: usize) -> Result<MemoryAccess, Error> {
        if !MEMORY_ACCESS_SIZES.contains(&size) {
            return Err(Error::InvalidOperand(format!(
                "Invalid memory access size {} at 0x{:x}",
                size, address
            )));
        }
        Ok(MemoryAccess {
            address,
            size,
            value: BigUint::zero(),
            base: None,
            index: None,
            segment: None,
            scale: 1,
            displacement: 0,
        })
    }

    /// Create a new `MemoryAccess` holding the given value.
    pub fn with_value<V: Into<BigUint>>(
        address: u64,
        size: usize,
        value: V,
    ) -> Result<MemoryAccess, Error> {
        let mut access = MemoryAccess::new(address, size)?;
        access.set_value(value);
        Ok(access)
    }

    pub fn address(&self) -> u64 {
        self.address
    }

    /// The size of this access in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn bits(&self) -> usize {
        self.size * 8
    }

    pub fn high(&self) -> usize {
        self.bits() - 1
    }

    pub fn low(&self) -> usize {
        0
    }

    pub fn value(&self) -> &BigUint {
        &self.value
    }

    pub fn value_u64(&self) -> Option<u64> {
        self.value.to_u64()
    }

    /// Set the concrete value, truncating it to the size of the access.
    pub fn set_value<V: Into<BigUint>>(&mut self, value: V) {
        self.value = value.into() & mask(self.bits());
    }

    pub fn base(&self) -> Option<RegisterId> {
        self.base
    }

    pub fn set_base(&mut self, base: Option<RegisterId>) {
        self.base = base;
    }

    pub fn index(&self) -> Option<RegisterId> {
        self.index
    }

    pub fn set_index(&mut self, index: Option<RegisterId>) {
        self.index = index;
    }

    pub fn segment(&self) -> Option<RegisterId> {
        self.segment
    }

    pub fn set_segment(&mut self, segment: Option<RegisterId>) {
        self.segment = segment;
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: u32) {
        self.scale = scale;
    }

    pub fn displacement(&self) -> i64 {
        self.displacement
    }

    pub fn set_displacement(&mut self, displacement: i64) {
        self.displacement = displacement;
    }
}

#[derive(Deserialize)]
struct MemoryAccessFields {
    address: u64,
    size: usize,
    value: BigUint,
    base: Option<RegisterId>,
    index: Option<RegisterId>,
    segment: Option<RegisterId>,
    scale: u32,
    displacement: i64,
}

impl TryFrom<MemoryAccessFields> for MemoryAccess {
    type Error = Error;

    fn try_from(fields: MemoryAccessFields) -> Result<MemoryAccess, Error> {
        let mut access = MemoryAccess::with_value(fields.address, fields.size, fields.value)?;
        access.set_base(fields.base);
        access.set_index(fields.index);
        access.set_segment(fields.segment);
        access.set_scale(fields.scale);
        access.set_displacement(fields.displacement);
        Ok(access)
    }
}

impl fmt::Display for MemoryAccess {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "[@0x{:x}]:{} bv[{}..{}]",
            self.address,
            self.bits(),
            self.high(),
            self.low()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_access() {
        let mut access = MemoryAccess::with_value(0x1000, 2, 0xdead_beefu32).unwrap();
        assert_eq!(access.value_u64(), Some(0xbeef));
        assert_eq!(access.bits(), 16);
        assert_eq!(format!("{}", access), "[@0x1000]:16 bv[15..0]");

        access.set_base(Some(RegisterId::Rbp));
        access.set_displacement(-8);
        assert_eq!(access.base(), Some(RegisterId::Rbp));
        assert_eq!(access.index(), None);
        assert_eq!(access.scale(), 1);
        assert_eq!(access.displacement(), -8);
    }

    #[test]
    fn invalid_size() {
        assert!(matches!(
            MemoryAccess::new(0x1000, 3),
            Err(Error::InvalidOperand(_))
        ));
        assert!(MemoryAccess::new(0x1000, 0).is_err());
    }

    #[test]
    fn address_components_are_part_of_identity() {
        let a = MemoryAccess::new(0x1000, 8).unwrap();
        let mut b = a.clone();
        assert_eq!(a, b);
        b.set_segment(Some(RegisterId::Fs));
        assert_ne!(a, b);
    }

    #[test]
    fn deserialize_checks_size_and_value() {
        let mut access = MemoryAccess::with_value(0x1000, 4, 0x1234_5678u32).unwrap();
        access.set_index(Some(RegisterId::Rcx));
        access.set_scale(4);
        let mut value = serde_json::to_value(&access).unwrap();
        assert_eq!(serde_json::from_value::<MemoryAccess>(value.clone()).unwrap(), access);

        value["size"] = serde_json::json!(3);
        assert!(serde_json::from_value::<MemoryAccess>(value.clone()).is_err());

        value["size"] = serde_json::json!(1);
        let narrowed: MemoryAccess = serde_json::from_value(value).unwrap();
        assert_eq!(narrowed.value_u64(), Some(0x78));
        assert_eq!(narrowed.index(), Some(RegisterId::Rcx));
    }
}
