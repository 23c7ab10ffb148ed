//! Energy ledger: units and arithmetic for stored/transferred energy.
//!
//! [`EnergyAmount`] is a non-negative Q32.32 quantity (Joule-equivalent).
//! Every operation clamps instead of going negative, so a ledger value can
//! be fed straight back into a machine without re-validation.
//!
//! Allocation helpers work on raw fixed-point units (`to_bits`). One raw
//! unit (2^-32 J) is the smallest indivisible amount; remainders left over
//! by integer division are handed out one unit at a time in the caller's
//! ordering so totals are conserved exactly.

use std::fmt;
use std::iter::Sum;
use std::ops::Add;

use serde::{Deserialize, Serialize};

use crate::fixed::{Fixed64, Ticks, ratio_clamped, ticks_to_fixed64};

// ---------------------------------------------------------------------------
// EnergyAmount
// ---------------------------------------------------------------------------

/// A non-negative quantity of energy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnergyAmount(Fixed64);

impl EnergyAmount {
    pub const ZERO: Self = Self(Fixed64::ZERO);

    /// Build from a fixed-point value. Negative input clamps to zero.
    pub fn new(value: Fixed64) -> Self {
        Self(value.max(Fixed64::ZERO))
    }

    /// Build from whole Joules.
    pub fn from_joules(joules: u32) -> Self {
        Self(Fixed64::from_num(joules))
    }

    /// Build from an f64. Use only for initialization and tests.
    pub fn from_f64(v: f64) -> Self {
        Self::new(Fixed64::saturating_from_num(v))
    }

    /// Build from raw fixed-point units. Negative input clamps to zero.
    pub fn from_units(units: i64) -> Self {
        Self(Fixed64::from_bits(units.max(0)))
    }

    /// Raw fixed-point units (always >= 0).
    pub fn units(self) -> i64 {
        self.0.to_bits()
    }

    pub fn value(self) -> Fixed64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == Fixed64::ZERO
    }

    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Subtract, clamping at zero.
    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0).max(Fixed64::ZERO))
    }

    /// Clamp to `[0, capacity]`.
    pub fn clamp_to(self, capacity: Self) -> Self {
        self.min(capacity)
    }

    /// `self / whole` as a fraction in [0, 1]; zero when `whole` is zero.
    pub fn fraction_of(self, whole: Self) -> Fixed64 {
        ratio_clamped(self.0, whole.0)
    }
}

impl Add for EnergyAmount {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.saturating_add(rhs)
    }
}

impl Sum for EnergyAmount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, e| acc + e)
    }
}

impl fmt::Display for EnergyAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// PowerRate
// ---------------------------------------------------------------------------

/// Energy per tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PowerRate(Fixed64);

impl PowerRate {
    pub const ZERO: Self = Self(Fixed64::ZERO);

    /// Build from a fixed-point value. Negative input clamps to zero.
    pub fn new(value: Fixed64) -> Self {
        Self(value.max(Fixed64::ZERO))
    }

    pub fn per_tick(joules: u32) -> Self {
        Self(Fixed64::from_num(joules))
    }

    pub fn from_f64(v: f64) -> Self {
        Self::new(Fixed64::saturating_from_num(v))
    }

    /// The rate that spends `energy` over `duration` ticks, rounded up to
    /// the next raw unit so that `duration` full ticks always cover `energy`.
    /// A zero duration yields zero.
    pub fn spread(energy: EnergyAmount, duration: Ticks) -> Self {
        if duration == 0 {
            return Self::ZERO;
        }
        let units = energy.units() as i128;
        let d = duration as i128;
        let per_tick = (units + d - 1) / d;
        Self(Fixed64::from_bits(per_tick.min(i64::MAX as i128) as i64))
    }

    /// Energy delivered at this rate over `ticks`, saturating.
    pub fn over(self, ticks: Ticks) -> EnergyAmount {
        EnergyAmount::new(self.0.saturating_mul(ticks_to_fixed64(ticks)))
    }

    /// Average rate implied by moving `amount` over `ticks`.
    pub fn observed(amount: EnergyAmount, ticks: Ticks) -> Self {
        if ticks == 0 {
            return Self::ZERO;
        }
        Self::new(amount.value() / ticks_to_fixed64(ticks))
    }

    pub fn value(self) -> Fixed64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == Fixed64::ZERO
    }
}

impl fmt::Display for PowerRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/t", self.0)
    }
}

// ---------------------------------------------------------------------------
// Allocation primitives
// ---------------------------------------------------------------------------

/// Split `total` across `weights` proportionally.
///
/// Each share is `floor(total * w_i / sum(w))` in raw units; the remainder is
/// handed out one unit at a time, in slice order, to entries whose share is
/// still below their weight. Callers pass weights sorted by machine identity
/// so the remainder lands on the lowest identity first.
///
/// If `total >= sum(weights)` every entry receives exactly its weight.
/// The returned shares always sum to `min(total, sum(weights))`.
pub fn proportional_split(total: EnergyAmount, weights: &[EnergyAmount]) -> Vec<EnergyAmount> {
    let sum: i128 = weights.iter().map(|w| w.units() as i128).sum();
    if sum == 0 {
        return vec![EnergyAmount::ZERO; weights.len()];
    }
    let total_units = total.units() as i128;
    if total_units >= sum {
        return weights.to_vec();
    }

    let mut shares: Vec<i128> = weights
        .iter()
        .map(|w| total_units * w.units() as i128 / sum)
        .collect();
    let mut remainder = total_units - shares.iter().sum::<i128>();

    // floor(total * w / sum) < w whenever total < sum, so one unit per
    // positive-weight entry is always enough to exhaust the remainder.
    for (share, weight) in shares.iter_mut().zip(weights) {
        if remainder == 0 {
            break;
        }
        if *share < weight.units() as i128 {
            *share += 1;
            remainder -= 1;
        }
    }

    shares
        .into_iter()
        .map(|s| EnergyAmount::from_units(s as i64))
        .collect()
}

/// Spread `total` evenly across entries bounded by `limits`.
///
/// Each round divides what is left equally among entries that still have
/// room; an entry that cannot take its full share keeps only what fits and
/// the rest is re-split among the others. Remainder units go to the
/// earliest entries in slice order. Returns the per-entry amounts, whose sum
/// is `min(total, sum(limits))`.
pub fn even_fill(total: EnergyAmount, limits: &[EnergyAmount]) -> Vec<EnergyAmount> {
    let mut given = vec![0i64; limits.len()];
    let mut left = total.units();

    loop {
        let open: Vec<usize> = (0..limits.len())
            .filter(|&i| limits[i].units() > given[i])
            .collect();
        if left == 0 || open.is_empty() {
            break;
        }

        let n = open.len() as i64;
        let share = left / n;
        let mut extra = left % n;

        for i in open {
            let mut offer = share;
            if extra > 0 {
                offer += 1;
                extra -= 1;
            }
            let room = limits[i].units() - given[i];
            let take = offer.min(room);
            given[i] += take;
            left -= take;
        }
    }

    given.into_iter().map(EnergyAmount::from_units).collect()
}
