use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

/// Absolute tolerance, in batch units, used when comparing quantities. A requirement that exceeds the remaining supply
/// by no more than this amount is still a full allocation.
pub const QUANTITY_EPSILON: f64 = 1e-9;

//--------------------------------------      Quantity       ---------------------------------------------------------
/// An amount of produce, expressed in the unit of the batch or request it belongs to.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Quantity(f64);

op!(arith Quantity, Add::add, AddAssign::add_assign);
op!(arith Quantity, Sub::sub, SubAssign::sub_assign);
op!(unary Quantity, Neg::neg);
// Scaling by a unit conversion factor
op!(scalar Quantity, f64, Mul::mul);

impl Sum for Quantity {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value is not a valid quantity: {0}")]
pub struct QuantityError(String);

impl From<f64> for Quantity {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:0.3}", self.0)
    }
}

impl Quantity {
    pub fn zero() -> Self {
        Self(0.0)
    }

    /// Builds a quantity that is finite and strictly positive.
    pub fn try_positive(value: f64) -> Result<Self, QuantityError> {
        let q = Self(value);
        if q.is_positive() {
            Ok(q)
        } else {
            Err(QuantityError(format!("{value} must be a finite, positive number")))
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn is_finite(&self) -> bool {
        self.0.is_finite()
    }

    /// True when the quantity is finite and greater than zero (beyond the comparison tolerance).
    pub fn is_positive(&self) -> bool {
        self.0.is_finite() && self.0 > QUANTITY_EPSILON
    }

    /// True when nothing meaningful is left, i.e. the quantity is within [`QUANTITY_EPSILON`] of zero or below it.
    pub fn is_exhausted(&self) -> bool {
        self.0 <= QUANTITY_EPSILON
    }

    /// `self <= other`, allowing for [`QUANTITY_EPSILON`] of rounding error.
    pub fn fits_within(&self, other: Quantity) -> bool {
        self.0 <= other.0 + QUANTITY_EPSILON
    }

    pub fn approx_eq(&self, other: Quantity) -> bool {
        (self.0 - other.0).abs() <= QUANTITY_EPSILON
    }

    pub fn min(self, other: Quantity) -> Self {
        Self(self.0.min(other.0))
    }
}
