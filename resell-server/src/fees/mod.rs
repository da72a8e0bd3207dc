//! Platform fee policies
//!
//! The checkout orchestrator only sees [`FeePolicy`]; which formula runs is
//! decided once at startup.

use rust_decimal::Decimal;
use rust_decimal::prelude::RoundingStrategy;

/// subtotal -> platform fee
pub trait FeePolicy: Send + Sync + std::fmt::Debug {
    /// Fee for `subtotal`. Must be pure: same input, same fee.
    fn compute(&self, subtotal: Decimal) -> Decimal;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

// ============================================================================
// Seeded
// ============================================================================

/// 1.7% of the subtotal plus a seed-derived offset, floored, at least 1
///
/// `offset` = sum of the seed's UTF-16 code units mod 10.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeededFeePolicy {
    offset: u32,
}

impl SeededFeePolicy {
    const RATE: Decimal = Decimal::from_parts(17, 0, 0, false, 3);

    pub fn from_seed(seed: &str) -> Self {
        let sum: u64 = seed.encode_utf16().map(u64::from).sum();
        Self {
            offset: (sum % 10) as u32,
        }
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }
}

impl FeePolicy for SeededFeePolicy {
    fn compute(&self, subtotal: Decimal) -> Decimal {
        let raw = subtotal * Self::RATE + Decimal::from(self.offset);
        raw.floor().max(Decimal::ONE)
    }

    fn name(&self) -> &'static str {
        "seeded"
    }
}

// ============================================================================
// Flat
// ============================================================================

/// Same fee for every order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatFeePolicy {
    fee: Decimal,
}

impl FlatFeePolicy {
    pub fn new(fee: Decimal) -> Self {
        Self { fee: fee.max(Decimal::ZERO) }
    }
}

impl FeePolicy for FlatFeePolicy {
    fn compute(&self, _subtotal: Decimal) -> Decimal {
        self.fee
    }

    fn name(&self) -> &'static str {
        "flat"
    }
}

// ============================================================================
// Tiered
// ============================================================================

/// Rate applies to subtotals strictly below `up_to`; `None` = no upper bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeTier {
    pub up_to: Option<Decimal>,
    pub rate: Decimal,
}

/// Rate chosen by subtotal bracket, rounded to cents, never below `minimum`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TieredFeePolicy {
    tiers: Vec<FeeTier>,
    minimum: Decimal,
}

impl TieredFeePolicy {
    /// `tiers` are sorted by upper bound; unbounded tiers sort last
    pub fn new(mut tiers: Vec<FeeTier>, minimum: Decimal) -> Self {
        tiers.sort_by(|a, b| match (a.up_to, b.up_to) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        Self { tiers, minimum }
    }

    fn rate_for(&self, subtotal: Decimal) -> Decimal {
        self.tiers
            .iter()
            .find(|t| t.up_to.is_none_or(|limit| subtotal < limit))
            .or(self.tiers.last())
            .map(|t| t.rate)
            .unwrap_or(Decimal::ZERO)
    }
}

impl FeePolicy for TieredFeePolicy {
    fn compute(&self, subtotal: Decimal) -> Decimal {
        let fee = (subtotal * self.rate_for(subtotal))
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        fee.max(self.minimum)
    }

    fn name(&self) -> &'static str {
        "tiered"
    }
}
