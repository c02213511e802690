/// The `CellKind` trait represents the type of cell that the tape will use.
/// It is implemented for `u8` and provides the bounded arithmetic the
/// interpreter needs for `+` and `-`, plus conversion to and from the single
/// bytes that `.` and `,` move.
use core::fmt;
use num_traits::{CheckedAdd, CheckedSub, One, PrimInt, Unsigned, WrappingAdd, WrappingSub};
use std::fmt::{Debug, Display};
use std::str::FromStr;
use thiserror::Error;

/// Which end of a range was crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Upper,
    Lower,
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Upper => write!(f, "upper"),
            Bound::Lower => write!(f, "lower"),
        }
    }
}

/// What happens when `+` or `-` would move a cell past its representable range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Crossing a bound is an error and the cell is left as it was.
    #[default]
    Error,
    /// Crossing a bound wraps around to the other end.
    Wrap,
}

/// What `,` stores when the input has run out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EofPolicy {
    /// Store this byte. The default is 255, an end-of-file marker of -1 squeezed into a byte.
    Sentinel(u8),
    /// Leave the cell as it is.
    Unchanged,
}

impl Default for EofPolicy {
    fn default() -> Self {
        EofPolicy::Sentinel(u8::MAX)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid end of input value `{0}`, expected a byte (0-255) or `unchanged`")]
pub struct ParseEofPolicyError(String);

impl FromStr for EofPolicy {
    type Err = ParseEofPolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("unchanged") {
            return Ok(EofPolicy::Unchanged);
        }
        s.parse::<u8>()
            .map(EofPolicy::Sentinel)
            .map_err(|_| ParseEofPolicyError(s.to_string()))
    }
}

impl fmt::Display for EofPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EofPolicy::Sentinel(value) => write!(f, "{}", value),
            EofPolicy::Unchanged => write!(f, "unchanged"),
        }
    }
}

/// Trait representing a kind of cell used by the BF interpreter program.
pub trait CellKind:
    PrimInt + Unsigned + WrappingAdd + WrappingSub + Default + Debug + Display
{
    /// Build a cell value from a byte read by `,`.
    fn from_byte(byte: u8) -> Self;

    /// The byte written by `.`.
    fn to_byte(&self) -> u8;

    /// Increment the value of the cell by one.
    ///
    /// Under [`OverflowPolicy::Error`] the cell is left untouched and
    /// `Err(Bound::Upper)` is returned when it already holds the maximum.
    fn increment(&mut self, policy: OverflowPolicy) -> Result<(), Bound> {
        let one = <Self as One>::one();
        *self = match policy {
            OverflowPolicy::Wrap => <Self as WrappingAdd>::wrapping_add(self, &one),
            OverflowPolicy::Error => {
                <Self as CheckedAdd>::checked_add(self, &one).ok_or(Bound::Upper)?
            }
        };
        Ok(())
    }

    /// Decrement the value of the cell by one.
    ///
    /// Under [`OverflowPolicy::Error`] the cell is left untouched and
    /// `Err(Bound::Lower)` is returned when it is already zero.
    fn decrement(&mut self, policy: OverflowPolicy) -> Result<(), Bound> {
        let one = <Self as One>::one();
        *self = match policy {
            OverflowPolicy::Wrap => <Self as WrappingSub>::wrapping_sub(self, &one),
            OverflowPolicy::Error => {
                <Self as CheckedSub>::checked_sub(self, &one).ok_or(Bound::Lower)?
            }
        };
        Ok(())
    }
}

impl CellKind for u8 {
    fn from_byte(byte: u8) -> Self {
        byte
    }

    fn to_byte(&self) -> u8 {
        *self
    }
}
