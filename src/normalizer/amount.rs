use bigdecimal::num_bigint::BigInt;
use bigdecimal::{BigDecimal, ToPrimitive};

/// Fixed-point scale between a ledger's base unit and its major unit.
///
/// All accounting happens on integer base units; conversion to a decimal
/// major-unit value only happens when a snapshot is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitScale {
    decimals: u32,
}

impl UnitScale {
    /// Satoshis per BTC.
    pub const BITCOIN: UnitScale = UnitScale { decimals: 8 };

    pub fn from_decimals(decimals: u32) -> Option<Self> {
        (decimals <= 18).then_some(Self { decimals })
    }

    /// Build a scale from a factor such as `100_000_000`. Returns `None`
    /// unless the factor is an exact power of ten.
    pub fn from_factor(factor: u64) -> Option<Self> {
        if factor == 0 {
            return None;
        }
        let mut remaining = factor;
        let mut decimals = 0u32;
        while remaining % 10 == 0 {
            remaining /= 10;
            decimals += 1;
        }
        if remaining != 1 {
            return None;
        }
        Self::from_decimals(decimals)
    }

    pub fn decimals(&self) -> u32 {
        self.decimals
    }

    /// Base units to major units, exact.
    pub fn to_major(&self, base_units: i64) -> BigDecimal {
        BigDecimal::new(BigInt::from(base_units), self.decimals as i64)
    }

    /// Major units back to base units. Returns `None` if the value carries
    /// more precision than the ledger allows or does not fit in an i64.
    pub fn to_base_units(&self, major: &BigDecimal) -> Option<i64> {
        let rescaled = major.with_scale(self.decimals as i64);
        if &rescaled != major {
            return None;
        }
        let (digits, _) = rescaled.into_bigint_and_exponent();
        digits.to_i64()
    }
}

impl Default for UnitScale {
    fn default() -> Self {
        Self::BITCOIN
    }
}
