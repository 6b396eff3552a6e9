//! Structural checks on the arrays handed to the solver.
//!
//! A check runs to completion and reports every violated constraint at once,
//! so a caller sees the whole picture instead of the first failed assertion.

use libc::c_int;
use smallvec::SmallVec;
use std::fmt;
use thiserror::Error;

/// The element type the solver expects for an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Float64,
    Int32,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::Float64 => f.write_str("float64"),
            ElementKind::Int32 => f.write_str("int32"),
        }
    }
}

/// One violated constraint, naming the offending argument.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeViolation {
    #[error("{array}: expected {expected} elements")]
    ElementType {
        array: &'static str,
        expected: ElementKind,
    },
    #[error("{array}: expected a one-dimensional array, found {found} dimensions")]
    Dimensions {
        array: &'static str,
        found: usize,
    },
    #[error("{array}: storage must be contiguous")]
    NotContiguous {
        array: &'static str,
    },
    #[error("{array}: buffer is read-only but the solver writes to it")]
    ReadOnly {
        array: &'static str,
    },
    #[error("{array}: expected length {expected} ({dimension}), found {found}")]
    Length {
        array: &'static str,
        expected: usize,
        /// The dimension the expected length derives from, e.g. `"m+n"`.
        dimension: &'static str,
        found: usize,
    },
    #[error("{name} must be non-negative, found {value}")]
    NegativeDimension {
        name: &'static str,
        value: i32,
    },
    #[error("{array}: length {len} exceeds the native index range")]
    TooLarge {
        array: &'static str,
        len: usize,
    },
    #[error("{first} and {second} share storage")]
    Overlap {
        first: &'static str,
        second: &'static str,
    },
    /// The object does not export a usable buffer at all.
    #[error("{array}: {reason}")]
    Unreadable {
        array: &'static str,
        reason: String,
    },
}

/// A caller bug: the arrays do not agree with each other or with the problem.
///
/// Never produced by the solver itself. When this is returned no native call
/// has been made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("array contract violated: {}", join(.violations))]
pub struct ContractViolation {
    violations: SmallVec<[ShapeViolation; 4]>,
}

impl ContractViolation {
    pub fn violations(&self) -> &[ShapeViolation] {
        &self.violations
    }
}

fn join(violations: &[ShapeViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Accumulates violations over one validation pass.
#[derive(Debug, Default)]
pub struct ShapeCheck {
    violations: SmallVec<[ShapeViolation; 4]>,
}

impl ShapeCheck {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, violation: ShapeViolation) {
        self.violations.push(violation);
    }

    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    /// Reads a declared dimension. Negative values are recorded and yield
    /// `None`, which turns the dependent length checks off.
    pub fn dimension(&mut self, name: &'static str, value: i32) -> Option<usize> {
        match usize::try_from(value) {
            Ok(dim) => Some(dim),
            Err(_) => {
                self.push(ShapeViolation::NegativeDimension { name, value });
                None
            }
        }
    }

    /// Takes a dimension from an array length, which must fit a native `int`.
    pub fn derived(&mut self, array: &'static str, len: usize) -> Option<usize> {
        if c_int::try_from(len).is_ok() {
            Some(len)
        } else {
            self.push(ShapeViolation::TooLarge { array, len });
            None
        }
    }

    pub fn length(
        &mut self,
        array: &'static str,
        found: usize,
        expected: Option<usize>,
        dimension: &'static str,
    ) {
        if let Some(expected) = expected {
            if found != expected {
                self.push(ShapeViolation::Length { array, expected, dimension, found });
            }
        }
    }

    /// Records an overlap for every pair of byte ranges that intersect.
    /// Ranges are `(name, start address, length in bytes)`; empty ranges
    /// never overlap anything.
    pub fn disjoint(&mut self, ranges: &[(&'static str, usize, usize)]) {
        for (i, &(first, start_a, len_a)) in ranges.iter().enumerate() {
            for &(second, start_b, len_b) in &ranges[i + 1..] {
                if len_a == 0 || len_b == 0 {
                    continue;
                }
                if start_a < start_b.saturating_add(len_b) && start_b < start_a.saturating_add(len_a) {
                    self.push(ShapeViolation::Overlap { first, second });
                }
            }
        }
    }

    pub fn into_violation(self) -> ContractViolation {
        ContractViolation {
            violations: self.violations,
        }
    }

    pub fn finish(self) -> Result<(), ContractViolation> {
        if self.is_clean() {
            Ok(())
        } else {
            let violation = self.into_violation();
            log::warn!("{violation}");
            Err(violation)
        }
    }
}

/// Counts the entries that are infinite or NaN.
pub fn count_abnormal(values: &[f64]) -> usize {
    values.iter().filter(|v| !v.is_finite()).count()
}
