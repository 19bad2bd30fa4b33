//! # Price Oracle
//!
//! Rent is quoted in an abstract reference unit per second and converted to
//! payment-token units through a [`PriceFeed`] at call time:
//!
//! ```text
//! base    = rent_prices[min(len(label), N) - 1] * duration
//! premium = schedule(now - (expires + grace))        // 0 unless recently released
//! tokens  = reference * 10^decimals / answer
//! ```
//!
//! Nothing about the feed is cached; every quote reads it fresh.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use fns_protocol::config::PremiumSchedule;
use fns_protocol::encoding::u128_string;
use fns_protocol::name::label_length;
use fns_protocol::Address;

use crate::context::CallContext;
use crate::events::Event;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriceError {
    #[error("rent price table is empty")]
    EmptyRentTable,

    #[error("reference price feed returned an unusable answer")]
    InvalidReferencePrice,

    #[error("price arithmetic overflow")]
    Overflow,

    #[error("{caller} may not update the reference price")]
    Unauthorized { caller: Address },
}

// ---------------------------------------------------------------------------
// Reference feed
// ---------------------------------------------------------------------------

/// Exchange rate between the reference unit and the payment token: one
/// payment token costs `latest_answer / 10^decimals` reference units.
pub trait PriceFeed {
    fn latest_answer(&self) -> u128;
    fn decimals(&self) -> u8;
}

/// A feed whose answer an administrator sets by hand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedPriceFeed {
    address: Address,
    admin: Address,
    answer: u128,
    decimals: u8,
}

impl FixedPriceFeed {
    pub fn new(admin: Address, answer: u128, decimals: u8) -> Self {
        Self {
            address: Address::derive("price-feed"),
            admin,
            answer,
            decimals,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn set_answer(&mut self, ctx: &mut CallContext<'_>, answer: u128) -> Result<(), PriceError> {
        if ctx.caller != self.admin {
            return Err(PriceError::Unauthorized { caller: ctx.caller });
        }
        if answer == 0 {
            return Err(PriceError::InvalidReferencePrice);
        }
        self.answer = answer;
        ctx.emit(Event::ReferencePriceUpdated { answer });
        Ok(())
    }
}

impl PriceFeed for FixedPriceFeed {
    fn latest_answer(&self) -> u128 {
        self.answer
    }

    fn decimals(&self) -> u8 {
        self.decimals
    }
}

// ---------------------------------------------------------------------------
// Oracle
// ---------------------------------------------------------------------------

/// A quote in payment-token units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Price {
    #[serde(with = "u128_string")]
    pub base: u128,
    #[serde(with = "u128_string")]
    pub premium: u128,
}

impl Price {
    pub fn total(&self) -> Result<u128, PriceError> {
        self.base
            .checked_add(self.premium)
            .ok_or(PriceError::Overflow)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceOracle {
    rent_prices: Vec<u128>,
    premium: PremiumSchedule,
    grace_period: u64,
}

impl PriceOracle {
    pub fn new(
        rent_prices: Vec<u128>,
        premium: PremiumSchedule,
        grace_period: u64,
    ) -> Result<Self, PriceError> {
        if rent_prices.is_empty() {
            return Err(PriceError::EmptyRentTable);
        }
        Ok(Self {
            rent_prices,
            premium,
            grace_period,
        })
    }

    pub fn rent_prices(&self) -> &[u128] {
        &self.rent_prices
    }

    /// Rate for a label: lengths past the table share the last bucket.
    pub fn rate_for(&self, label: &str) -> u128 {
        let index = label_length(label).clamp(1, self.rent_prices.len()) - 1;
        self.rent_prices[index]
    }

    /// Quote for holding `label` for `duration` seconds. `expires` is the
    /// label's current registrar expiry (0 if never registered).
    pub fn price(
        &self,
        feed: &dyn PriceFeed,
        label: &str,
        expires: u64,
        duration: u64,
        now: u64,
    ) -> Result<Price, PriceError> {
        let base = self
            .rate_for(label)
            .checked_mul(duration as u128)
            .ok_or(PriceError::Overflow)?;
        let premium = self.premium_reference(expires, now);
        Ok(Price {
            base: to_token_units(feed, base)?,
            premium: to_token_units(feed, premium)?,
        })
    }

    fn premium_reference(&self, expires: u64, now: u64) -> u128 {
        if expires == 0 {
            return 0;
        }
        let released = expires.saturating_add(self.grace_period);
        if now < released {
            return 0;
        }
        self.premium.premium_after(now - released)
    }
}

fn to_token_units(feed: &dyn PriceFeed, amount: u128) -> Result<u128, PriceError> {
    if amount == 0 {
        return Ok(0);
    }
    let answer = feed.latest_answer();
    if answer == 0 {
        return Err(PriceError::InvalidReferencePrice);
    }
    let scale = 10u128
        .checked_pow(feed.decimals() as u32)
        .ok_or(PriceError::Overflow)?;
    amount
        .checked_mul(scale)
        .map(|scaled| scaled / answer)
        .ok_or(PriceError::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_feed() -> FixedPriceFeed {
        FixedPriceFeed::new(Address::derive("admin"), 100_000_000, 8)
    }

    fn oracle(rates: &[u128]) -> PriceOracle {
        PriceOracle::new(rates.to_vec(), PremiumSchedule::None, 90 * 86_400).unwrap()
    }

    #[test]
    fn buckets_by_length() {
        let oracle = oracle(&[0, 0, 4, 2, 1]);
        let feed = unit_feed();
        let base = |label: &str| oracle.price(&feed, label, 0, 3600, 0).unwrap().base;
        assert_eq!(base("foo"), 14_400);
        assert_eq!(base("quux"), 7_200);
        assert_eq!(base("fubar"), 3_600);
        assert_eq!(base("foobie"), 3_600);
    }

    #[test]
    fn large_rates_do_not_truncate() {
        let oracle = oracle(&[0, 0, 10u128.pow(18), 2, 1]);
        let price = oracle.price(&unit_feed(), "foo", 0, 86_400, 0).unwrap();
        assert_eq!(price.base, 86_400 * 10u128.pow(18));
        assert_eq!(price.premium, 0);
    }

    #[test]
    fn emoji_counts_once() {
        let oracle = oracle(&[5, 4, 3, 2, 1]);
        let feed = unit_feed();
        assert_eq!(oracle.price(&feed, "🚀🚀🚀", 0, 1, 0).unwrap().base, 3);
        assert_eq!(oracle.price(&feed, "", 0, 1, 0).unwrap().base, 5);
    }

    #[test]
    fn reference_rate_scales_price() {
        let oracle = oracle(&[100]);
        // Payment token worth 2 reference units.
        let feed = FixedPriceFeed::new(Address::ZERO, 200_000_000, 8);
        assert_eq!(oracle.price(&feed, "any", 0, 10, 0).unwrap().base, 500);
    }

    #[test]
    fn premium_only_after_grace() {
        let grace = 90 * 86_400;
        let oracle = PriceOracle::new(
            vec![1],
            PremiumSchedule::LinearDecay {
                start: 1_000,
                window: 100,
            },
            grace,
        )
        .unwrap();
        let feed = unit_feed();
        let expires = 1_000;
        let released = expires + grace;
        assert_eq!(oracle.price(&feed, "abc", expires, 1, released - 1).unwrap().premium, 0);
        assert_eq!(oracle.price(&feed, "abc", expires, 1, released).unwrap().premium, 1_000);
        assert_eq!(oracle.price(&feed, "abc", expires, 1, released + 50).unwrap().premium, 500);
        assert_eq!(oracle.price(&feed, "abc", 0, 1, released).unwrap().premium, 0);
    }

    #[test]
    fn overflow_and_bad_feed_are_errors() {
        let oracle = oracle(&[u128::MAX]);
        assert_eq!(
            oracle.price(&unit_feed(), "abc", 0, 2, 0),
            Err(PriceError::Overflow)
        );
        let zero = FixedPriceFeed {
            answer: 0,
            ..unit_feed()
        };
        assert_eq!(
            PriceOracle::new(vec![1], PremiumSchedule::None, 0)
                .unwrap()
                .price(&zero, "abc", 0, 1, 0),
            Err(PriceError::InvalidReferencePrice)
        );
        assert!(matches!(
            PriceOracle::new(vec![], PremiumSchedule::None, 0),
            Err(PriceError::EmptyRentTable)
        ));
    }

    #[test]
    fn only_admin_updates_feed() {
        let admin = Address::derive("admin");
        let mut feed = unit_feed();
        let mut events = Vec::new();
        let mut ctx = CallContext::new(Address::derive("mallory"), 0, &mut events);
        assert!(feed.set_answer(&mut ctx, 5).is_err());
        let mut ctx = CallContext::new(admin, 0, &mut events);
        feed.set_answer(&mut ctx, 5).unwrap();
        assert_eq!(feed.latest_answer(), 5);
        assert_eq!(events.len(), 1);
    }
}
