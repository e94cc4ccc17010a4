use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A constant encoded in an instruction.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(try_from = "ImmediateFields")]
pub struct Immediate {
    value: u64,
    size: usize,
}

impl Immediate {
    /// Create a new `Immediate` of `size` bytes.
    ///
    /// `size` must be 1, 2, 4 or 8. The value is truncated to `size` bytes.
    pub fn new(value: u64, size: usize) -> Result<Immediate, Error> {
        let value = match size {
            1 => value & 0xff,
            2 => value & 0xffff,
            4 => value & 0xffff_ffff,
            8 => value,
            _ => {
                return Err(Error::InvalidOperand(format!(
                    "Immediate size must be 1, 2, 4 or 8 bytes, got {}",
                    size
                )))
            }
        };
        Ok(Immediate { value, size })
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    /// The size of this immediate in bytes.
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
}

#[derive(Deserialize)]
struct ImmediateFields {
    value: u64,
    size: usize,
}

impl TryFrom<ImmediateFields> for Immediate {
    type Error = Error;

    fn try_from(fields: ImmediateFields) -> Result<Immediate, Error> {
        Immediate::new(fields.value, fields.size)
    }
}

impl fmt::Display for Immediate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "0x{:x}:{} bv[{}..{}]",
            self.value,
            self.bits(),
            self.high(),
            self.low()
        )
    }
}

#[test]
fn immediate_sizes() {
    let imm = Immediate::new(0x1234, 1).unwrap();
    assert_eq!(imm.value(), 0x34);
    assert_eq!(imm.bits(), 8);
    assert_eq!(format!("{}", imm), "0x34:8 bv[7..0]");

    assert_eq!(Immediate::new(u64::MAX, 8).unwrap().value(), u64::MAX);
    assert!(matches!(
        Immediate::new(1, 3),
        Err(Error::InvalidOperand(_))
    ));
}

#[test]
fn immediate_deserialize_checks_size() {
    let imm: Immediate = serde_json::from_str(r#"{"value":4660,"size":1}"#).unwrap();
    assert_eq!(imm.value(), 0x34);
    assert!(serde_json::from_str::<Immediate>(r#"{"value":1,"size":0}"#).is_err());
    assert!(serde_json::from_str::<Immediate>(r#"{"value":1,"size":3}"#).is_err());
}
