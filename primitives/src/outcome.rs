//! Outcome codes returned by every boundary-crossing callback.
//!
//! Exactly one outcome is produced per callback invocation. The repr values
//! are part of the ABI between host and engine and must not change.

use std::fmt;

/// Closed classification of a single callback invocation.
///
/// `Ok` never comes with an error buffer. `BadArgument` and `Panic` never
/// carry a message: they signal a host defect, not something the caller
/// can act on. `User` and `Other` may carry a message buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Outcome {
    Ok = 0,
    Panic = 1,
    BadArgument = 2,
    OutOfGas = 3,
    Other = 4,
    User = 5,
}

impl Outcome {
    /// Convert from the raw `i32` returned across the boundary.
    pub fn from_i32(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Ok),
            1 => Some(Self::Panic),
            2 => Some(Self::BadArgument),
            3 => Some(Self::OutOfGas),
            4 => Some(Self::Other),
            5 => Some(Self::User),
            _ => None,
        }
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Whether the current top-level invocation must stop immediately.
    ///
    /// `User` is the only failure the engine may hand back to guest code.
    pub fn is_fatal(self) -> bool {
        !matches!(self, Self::Ok | Self::User)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::Panic => write!(f, "PANIC"),
            Self::BadArgument => write!(f, "BAD_ARGUMENT"),
            Self::OutOfGas => write!(f, "OUT_OF_GAS"),
            Self::Other => write!(f, "OTHER"),
            Self::User => write!(f, "USER"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_repr_values() {
        assert_eq!(Outcome::Ok as i32, 0);
        assert_eq!(Outcome::Panic as i32, 1);
        assert_eq!(Outcome::BadArgument as i32, 2);
        assert_eq!(Outcome::OutOfGas as i32, 3);
        assert_eq!(Outcome::Other as i32, 4);
        assert_eq!(Outcome::User as i32, 5);
    }

    #[test]
    fn test_outcome_from_i32() {
        for code in 0..=5 {
            assert_eq!(Outcome::from_i32(code).unwrap().as_i32(), code);
        }
        assert_eq!(Outcome::from_i32(-1), None);
        assert_eq!(Outcome::from_i32(6), None);
    }

    #[test]
    fn test_fatality() {
        assert!(!Outcome::Ok.is_fatal());
        assert!(!Outcome::User.is_fatal());
        assert!(Outcome::OutOfGas.is_fatal());
        assert!(Outcome::Panic.is_fatal());
        assert!(Outcome::BadArgument.is_fatal());
        assert!(Outcome::Other.is_fatal());
    }

    #[test]
    fn test_display() {
        assert_eq!(Outcome::OutOfGas.to_string(), "OUT_OF_GAS");
        assert_eq!(Outcome::BadArgument.to_string(), "BAD_ARGUMENT");
    }
}
