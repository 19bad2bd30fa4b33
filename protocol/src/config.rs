//! # Protocol Configuration & Constants
//!
//! Every magic number in FNS lives here. If you're hardcoding a duration or a
//! price somewhere else, move it.
//!
//! The constants are defaults. A running service reads a [`ServiceConfig`]
//! (JSON on disk, `Default` built from these constants) so the commitment
//! window, grace period and price table can be tuned per deployment without
//! a rebuild.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

use crate::identity::Address;

// ---------------------------------------------------------------------------
// Versions
// ---------------------------------------------------------------------------

/// Protocol version reported by the node.
pub const PROTOCOL_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Time (seconds)
// ---------------------------------------------------------------------------

pub const DAY: u64 = 86_400;

/// How long an expired label stays reserved for its previous owner.
pub const GRACE_PERIOD: u64 = 90 * DAY;

/// Shortest registration the controller accepts.
pub const MIN_REGISTRATION_DURATION: u64 = 28 * DAY;

/// A commitment younger than this cannot be revealed.
pub const DEFAULT_MIN_COMMITMENT_AGE: u64 = 600;

/// A commitment older than this is dead and must be re-made.
pub const DEFAULT_MAX_COMMITMENT_AGE: u64 = DAY;

// ---------------------------------------------------------------------------
// Naming
// ---------------------------------------------------------------------------

/// The top-level domain the registrar issues labels under.
pub const DEFAULT_BASE_TLD: &str = "frax";

pub const REVERSE_TLD: &str = "reverse";

/// `addr.reverse` holds one reverse record per address.
pub const ADDR_REVERSE_LABEL: &str = "addr";

/// Labels shorter than this (in Unicode scalar values) are not registrable.
pub const MIN_LABEL_LENGTH: usize = 3;

// ---------------------------------------------------------------------------
// Pricing
// ---------------------------------------------------------------------------

/// Reference-currency units per second for label lengths 1, 2, 3, 4 and 5+.
pub const DEFAULT_RENT_PRICES: [u128; 5] = [
    31_709_791_984_000,
    6_341_958_397_000,
    3_170_979_198_400,
    634_195_839_700,
    317_097_919_840,
];

/// Reference feed answer. With 8 decimals, `100_000_000` is a 1:1 rate.
pub const DEFAULT_REFERENCE_ANSWER: u128 = 100_000_000;

pub const DEFAULT_REFERENCE_DECIMALS: u8 = 8;

pub const DEFAULT_TOKEN_NAME: &str = "Frax";
pub const DEFAULT_TOKEN_SYMBOL: &str = "FRAX";
pub const DEFAULT_TOKEN_DECIMALS: u8 = 18;

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

pub const DEFAULT_RPC_PORT: u16 = 9841;
pub const DEFAULT_METRICS_PORT: u16 = 9842;

// ---------------------------------------------------------------------------
// Premium schedule
// ---------------------------------------------------------------------------

/// Surcharge for re-registering a label that recently left its grace period.
///
/// Off by default. `LinearDecay` starts at `start` reference units the moment
/// the grace period ends and falls linearly to zero over `window` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PremiumSchedule {
    #[default]
    None,
    LinearDecay {
        start: u128,
        window: u64,
    },
}

impl PremiumSchedule {
    /// Premium in reference units `elapsed` seconds after the grace period ended.
    pub fn premium_after(&self, elapsed: u64) -> u128 {
        match *self {
            PremiumSchedule::None => 0,
            PremiumSchedule::LinearDecay { start, window } => {
                if window == 0 || elapsed >= window {
                    return 0;
                }
                let remaining = (window - elapsed) as u128;
                // start * remaining can overflow for absurd starts; fall back to
                // dividing first and accept the rounding.
                match start.checked_mul(remaining) {
                    Some(scaled) => scaled / window as u128,
                    None => (start / window as u128) * remaining,
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ServiceConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("max_commitment_age ({max}) must be greater than min_commitment_age ({min})")]
    CommitmentWindow { min: u64, max: u64 },

    #[error("rent price table is empty")]
    EmptyRentTable,

    #[error("reference price answer must be non-zero")]
    ZeroReferencePrice,

    #[error("base TLD must be a single non-empty label, got {0:?}")]
    InvalidTld(String),
}

/// Deployment parameters for one name service instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub base_tld: String,
    pub rent_prices: Vec<u128>,
    pub premium: PremiumSchedule,
    pub min_commitment_age: u64,
    pub max_commitment_age: u64,
    pub min_registration_duration: u64,
    pub grace_period: u64,
    pub reference_answer: u128,
    pub reference_decimals: u8,
    pub token_name: String,
    pub token_symbol: String,
    pub token_decimals: u8,
    /// Payment-token balances minted at bootstrap.
    pub genesis_balances: BTreeMap<Address, u128>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_tld: DEFAULT_BASE_TLD.to_string(),
            rent_prices: DEFAULT_RENT_PRICES.to_vec(),
            premium: PremiumSchedule::None,
            min_commitment_age: DEFAULT_MIN_COMMITMENT_AGE,
            max_commitment_age: DEFAULT_MAX_COMMITMENT_AGE,
            min_registration_duration: MIN_REGISTRATION_DURATION,
            grace_period: GRACE_PERIOD,
            reference_answer: DEFAULT_REFERENCE_ANSWER,
            reference_decimals: DEFAULT_REFERENCE_DECIMALS,
            token_name: DEFAULT_TOKEN_NAME.to_string(),
            token_symbol: DEFAULT_TOKEN_SYMBOL.to_string(),
            token_decimals: DEFAULT_TOKEN_DECIMALS,
            genesis_balances: BTreeMap::new(),
        }
    }
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_commitment_age <= self.min_commitment_age {
            return Err(ConfigError::CommitmentWindow {
                min: self.min_commitment_age,
                max: self.max_commitment_age,
            });
        }
        if self.rent_prices.is_empty() {
            return Err(ConfigError::EmptyRentTable);
        }
        if self.reference_answer == 0 {
            return Err(ConfigError::ZeroReferencePrice);
        }
        if self.base_tld.is_empty() || self.base_tld.contains('.') {
            return Err(ConfigError::InvalidTld(self.base_tld.clone()));
        }
        Ok(())
    }

    /// Reads and validates a JSON config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: ServiceConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw)?;
        Ok(())
    }
}
