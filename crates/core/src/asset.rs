//! Native assets and unit conversions.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// Satoshi per bitcoin.
pub const SATS_PER_BTC: u64 = 100_000_000;

/// Decimal places of ether.
pub const ETH_DECIMALS: u8 = 18;

/// Native asset priced by the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Asset {
    Btc,
    Eth,
}

impl Asset {
    /// Decimal places of the smallest unit.
    pub fn decimals(self) -> u8 {
        match self {
            Asset::Btc => 8,
            Asset::Eth => ETH_DECIMALS,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Asset::Btc => "BTC",
            Asset::Eth => "ETH",
        }
    }

    /// Identifier used by the price API.
    pub fn price_id(self) -> &'static str {
        match self {
            Asset::Btc => "bitcoin",
            Asset::Eth => "ethereum",
        }
    }

    /// Map a wrapped token symbol onto the native asset it tracks.
    pub fn from_token_symbol(symbol: &str) -> Option<Self> {
        match symbol.to_ascii_uppercase().as_str() {
            "BTC" | "WBTC" | "CBBTC" | "TBTC" => Some(Asset::Btc),
            "ETH" | "WETH" => Some(Asset::Eth),
            _ => None,
        }
    }
}

impl std::fmt::Display for Asset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// On-chain integer amount together with the token's decimal places.
///
/// `Display` renders the exact decimal value with trailing zeros trimmed,
/// so no precision is lost when amounts are persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAmount {
    raw: U256,
    decimals: u8,
}

impl TokenAmount {
    pub fn new(raw: U256, decimals: u8) -> Self {
        Self { raw, decimals }
    }

    /// Build from an explicit scale factor such as Compound's `baseScale`.
    /// Returns `None` unless `scale` is a power of ten.
    pub fn from_scale(raw: U256, scale: u64) -> Option<Self> {
        decimals_of(scale).map(|decimals| Self::new(raw, decimals))
    }

    pub fn raw(&self) -> U256 {
        self.raw
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn is_zero(&self) -> bool {
        self.raw.is_zero()
    }

    /// Lossy conversion for valuation and display.
    pub fn to_f64(&self) -> f64 {
        self.to_string().parse().unwrap_or(0.0)
    }
}

impl std::fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let digits = self.raw.to_string();
        let places = usize::from(self.decimals);
        if places == 0 {
            return f.write_str(&digits);
        }
        let padded = if digits.len() <= places {
            format!("{}{}", "0".repeat(places + 1 - digits.len()), digits)
        } else {
            digits
        };
        let (int, frac) = padded.split_at(padded.len() - places);
        let frac = frac.trim_end_matches('0');
        if frac.is_empty() {
            f.write_str(int)
        } else {
            write!(f, "{}.{}", int, frac)
        }
    }
}

/// Decimal places of a power-of-ten scale factor.
pub fn decimals_of(scale: u64) -> Option<u8> {
    let mut rest = scale;
    let mut decimals = 0u8;
    while rest > 1 {
        if rest % 10 != 0 {
            return None;
        }
        rest /= 10;
        decimals += 1;
    }
    (rest == 1).then_some(decimals)
}

/// Scale a raw integer amount by `10^decimals`.
pub fn scale_units(raw: U256, decimals: u8) -> f64 {
    TokenAmount::new(raw, decimals).to_f64()
}

pub fn sats_to_btc(sats: i64) -> f64 {
    sats as f64 / SATS_PER_BTC as f64
}

pub fn wei_to_eth(wei: U256) -> f64 {
    scale_units(wei, ETH_DECIMALS)
}

/// Format satoshi as BTC with 8 decimals.
pub fn format_btc(sats: i64) -> String {
    format!("{:.8} BTC", sats_to_btc(sats))
}

/// Format an ether amount with 6 decimals.
pub fn format_eth(eth: f64) -> String {
    format!("{:.6} ETH", eth)
}
