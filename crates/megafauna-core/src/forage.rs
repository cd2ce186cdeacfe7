//! Typed per-forage-type value vectors.
//!
//! Every quantity that varies by forage type (mass, energy, digestibility,
//! energy content) is a [`ForageValues`] keyed by [`ForageType`]. The inedible
//! type is excluded from all arithmetic; new edible types slot in by extending
//! [`ForageType::EDIBLE`] without touching any algorithm.

use std::marker::PhantomData;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Sub, SubAssign};

use serde::{Deserialize, Serialize};

use crate::average::average;

/// Different types of forage. A closed enumeration.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum ForageType {
    /// Grass forage.
    Grass,
    /// Plants that are not edible for herbivores.
    Inedible,
}

impl ForageType {
    /// All forage types a herbivore can actually ingest.
    pub const EDIBLE: [ForageType; 1] = [ForageType::Grass];

    /// Short, lowercase identifier, suitable for output column names.
    pub fn name(self) -> &'static str {
        match self {
            ForageType::Grass => "grass",
            ForageType::Inedible => "inedible",
        }
    }

    fn edible_index(self) -> usize {
        match self {
            ForageType::Grass => 0,
            ForageType::Inedible => {
                panic!("forage type \"inedible\" takes part in no forage arithmetic")
            }
        }
    }
}

const EDIBLE_COUNT: usize = ForageType::EDIBLE.len();

/// Allowed data range of a [`ForageValues`] instantiation.
pub trait ValueTag: Copy + Clone + std::fmt::Debug + PartialEq {
    /// Upper bound of the allowed interval, if any. The lower bound is
    /// always zero.
    const UPPER_BOUND: Option<f64>;
    /// Name used in panic messages.
    const NAME: &'static str;
}

/// Values in `[0, inf)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NonNegative;

impl ValueTag for NonNegative {
    const UPPER_BOUND: Option<f64> = None;
    const NAME: &'static str = "non-negative";
}

/// Values in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UnitInterval;

impl ValueTag for UnitInterval {
    const UPPER_BOUND: Option<f64> = Some(1.0);
    const NAME: &'static str = "unit-interval";
}

/// One `f64` per edible forage type, with elementwise arithmetic.
///
/// Every write is checked: values must be finite, non-negative, and within
/// the tag's upper bound. An out-of-range write is a programming error and
/// panics.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ForageValues<T: ValueTag> {
    values: [f64; EDIBLE_COUNT],
    tag: PhantomData<T>,
}

/// Dry matter mass [kgDM or kgDM/km²] per forage type.
pub type ForageMass = ForageValues<NonNegative>;

/// Energy [MJ] per forage type.
pub type ForageEnergy = ForageValues<NonNegative>;

/// Net energy content [MJ/kgDM] per forage type.
pub type ForageEnergyContent = ForageValues<NonNegative>;

/// A fraction in [0,1] per forage type.
pub type ForageFraction = ForageValues<UnitInterval>;

/// Digestibility [fraction] per forage type.
pub type Digestibility = ForageValues<UnitInterval>;

impl<T: ValueTag> Default for ForageValues<T> {
    fn default() -> Self {
        Self {
            values: [0.0; EDIBLE_COUNT],
            tag: PhantomData,
        }
    }
}

impl<T: ValueTag> ForageValues<T> {
    /// All forage types set to `init_value`.
    pub fn filled(init_value: f64) -> Self {
        let mut result = Self::default();
        for ft in ForageType::EDIBLE {
            result.set(ft, init_value);
        }
        result
    }

    /// Read one value. Panics for the inedible type.
    pub fn get(&self, forage_type: ForageType) -> f64 {
        self.values[forage_type.edible_index()]
    }

    /// Write one value. Panics if the value is not allowed by the tag, or
    /// not finite, or the forage type is inedible.
    pub fn set(&mut self, forage_type: ForageType, value: f64) {
        assert!(
            value.is_finite(),
            "{} forage value for \"{}\" must be finite, got {value}",
            T::NAME,
            forage_type.name()
        );
        assert!(
            value >= 0.0,
            "{} forage value for \"{}\" must not be negative, got {value}",
            T::NAME,
            forage_type.name()
        );
        if let Some(upper) = T::UPPER_BOUND {
            assert!(
                value <= upper,
                "{} forage value for \"{}\" exceeds {upper}, got {value}",
                T::NAME,
                forage_type.name()
            );
        }
        self.values[forage_type.edible_index()] = value;
    }

    /// Sum over all edible forage types.
    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Whether every value is zero.
    pub fn is_zero(&self) -> bool {
        self.values.iter().all(|v| *v == 0.0)
    }

    /// Elementwise minimum.
    pub fn min(&self, other: &Self) -> Self {
        let mut result = *self;
        for ft in ForageType::EDIBLE {
            result.set(ft, self.get(ft).min(other.get(ft)));
        }
        result
    }

    /// Elementwise maximum.
    pub fn max(&self, other: &Self) -> Self {
        let mut result = *self;
        for ft in ForageType::EDIBLE {
            result.set(ft, self.get(ft).max(other.get(ft)));
        }
        result
    }

    /// Whether every value is `<=` the corresponding value in `other`.
    pub fn all_le(&self, other: &Self) -> bool {
        ForageType::EDIBLE
            .into_iter()
            .all(|ft| self.get(ft) <= other.get(ft))
    }

    /// Elementwise division that tolerates zero divisors: `0/0` yields
    /// `na_value`, while `x/0` with `x > 0` is a programming error.
    pub fn divide_safely(&self, divisor: &Self, na_value: f64) -> ForageValues<NonNegative> {
        let mut result = ForageValues::default();
        for ft in ForageType::EDIBLE {
            let d = divisor.get(ft);
            if d != 0.0 {
                result.set(ft, self.get(ft) / d);
            } else {
                assert!(
                    self.get(ft) == 0.0,
                    "division of non-zero \"{}\" value {} by zero",
                    ft.name(),
                    self.get(ft)
                );
                result.set(ft, na_value);
            }
        }
        result
    }

    /// Merge with another object by building weighted means per forage type.
    pub fn merge(&mut self, other: &Self, this_weight: f64, other_weight: f64) {
        for ft in ForageType::EDIBLE {
            self.set(
                ft,
                average(self.get(ft), other.get(ft), this_weight, other_weight),
            );
        }
    }
}

impl ForageValues<UnitInterval> {
    /// Lift fractional values into the unbounded range for arithmetic that
    /// may exceed 1.0.
    pub fn to_values(&self) -> ForageValues<NonNegative> {
        let mut result = ForageValues::default();
        for ft in ForageType::EDIBLE {
            result.set(ft, self.get(ft));
        }
        result
    }

    /// Convert unbounded values back into fractions.
    ///
    /// Values in `(1.0, 1.0 + tolerance]` are clamped to 1.0; anything above
    /// that is a programming error.
    pub fn from_values(values: &ForageValues<NonNegative>, tolerance: f64) -> Self {
        assert!(tolerance >= 0.0, "tolerance must not be negative");
        let mut result = Self::default();
        for ft in ForageType::EDIBLE {
            let v = values.get(ft);
            assert!(
                v <= 1.0 + tolerance,
                "forage fraction for \"{}\" exceeds 1.0 beyond tolerance: {v}",
                ft.name()
            );
            result.set(ft, v.min(1.0));
        }
        result
    }
}

impl ForageValues<NonNegative> {
    /// Elementwise product with a fractional vector.
    pub fn times_fraction(&self, fraction: &ForageValues<UnitInterval>) -> Self {
        let mut result = Self::default();
        for ft in ForageType::EDIBLE {
            result.set(ft, self.get(ft) * fraction.get(ft));
        }
        result
    }
}

/// Convert energy-wise diet proportions [MJ/MJ] into mass-wise proportions
/// [kgDM/kgDM] whose sum equals the sum of `mj_proportions`.
///
/// Relative to each other, the proportions stay the same when converting the
/// resulting mass back to energy.
pub fn convert_mj_to_kg_proportionally(
    mj_per_kg: &ForageEnergyContent,
    mj_proportions: &ForageFraction,
) -> ForageFraction {
    // A forage type without energy contributes no mass; it cannot be part
    // of the diet.
    let mut kg_proportions = ForageValues::<NonNegative>::default();
    for ft in ForageType::EDIBLE {
        if mj_per_kg.get(ft) > 0.0 {
            kg_proportions.set(ft, mj_proportions.get(ft) / mj_per_kg.get(ft));
        }
    }
    let mj_sum = mj_proportions.sum();
    let kg_sum = kg_proportions.sum();
    if kg_sum == 0.0 {
        return ForageFraction::default();
    }
    let rescaled = kg_proportions * (mj_sum / kg_sum);
    ForageFraction::from_values(&rescaled, 0.001)
}

macro_rules! elementwise_binop {
    ($trait:ident, $method:ident, $assign_trait:ident, $assign_method:ident, $op:tt) => {
        impl<T: ValueTag> $assign_trait<&ForageValues<T>> for ForageValues<T> {
            fn $assign_method(&mut self, rhs: &ForageValues<T>) {
                for ft in ForageType::EDIBLE {
                    self.set(ft, self.get(ft) $op rhs.get(ft));
                }
            }
        }

        impl<T: ValueTag> $trait<&ForageValues<T>> for ForageValues<T> {
            type Output = ForageValues<T>;
            fn $method(mut self, rhs: &ForageValues<T>) -> Self::Output {
                self.$assign_method(rhs);
                self
            }
        }
    };
}

elementwise_binop!(Add, add, AddAssign, add_assign, +);
elementwise_binop!(Sub, sub, SubAssign, sub_assign, -);
elementwise_binop!(Mul, mul, MulAssign, mul_assign, *);

impl<T: ValueTag> DivAssign<&ForageValues<T>> for ForageValues<T> {
    fn div_assign(&mut self, rhs: &ForageValues<T>) {
        for ft in ForageType::EDIBLE {
            let divisor = rhs.get(ft);
            assert!(
                divisor != 0.0,
                "forage division by zero (\"{}\")",
                ft.name()
            );
            self.set(ft, self.get(ft) / divisor);
        }
    }
}

impl<T: ValueTag> Div<&ForageValues<T>> for ForageValues<T> {
    type Output = ForageValues<T>;
    fn div(mut self, rhs: &ForageValues<T>) -> Self::Output {
        self /= rhs;
        self
    }
}

impl<T: ValueTag> Mul<f64> for ForageValues<T> {
    type Output = ForageValues<T>;
    fn mul(mut self, rhs: f64) -> Self::Output {
        for ft in ForageType::EDIBLE {
            self.set(ft, self.get(ft) * rhs);
        }
        self
    }
}

impl<T: ValueTag> Div<f64> for ForageValues<T> {
    type Output = ForageValues<T>;
    fn div(mut self, rhs: f64) -> Self::Output {
        assert!(rhs != 0.0, "forage division by scalar zero");
        for ft in ForageType::EDIBLE {
            self.set(ft, self.get(ft) / rhs);
        }
        self
    }
}
