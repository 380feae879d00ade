//! DeFi protocol positions held by an address.

use crate::{Asset, Fiat, SpotPrices, TokenAmount};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Supported DeFi protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    Compound,
    Euler,
    Pendle,
}

impl Protocol {
    pub const ALL: [Protocol; 3] = [Protocol::Compound, Protocol::Euler, Protocol::Pendle];

    pub fn name(self) -> &'static str {
        match self {
            Protocol::Compound => "Compound v3",
            Protocol::Euler => "Euler",
            Protocol::Pendle => "Pendle",
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Collateral deposited in a Compound v3 market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collateral {
    pub symbol: CompactString,
    pub amount: TokenAmount,
}

/// Account state in a Compound v3 (Comet) market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CometPosition {
    /// Base token symbol (e.g. "USDC")
    pub base_symbol: CompactString,
    pub supplied: TokenAmount,
    pub borrowed: TokenAmount,
    /// Non-zero collateral balances only
    pub collaterals: Vec<Collateral>,
}

impl CometPosition {
    pub fn is_empty(&self) -> bool {
        self.supplied.is_zero() && self.borrowed.is_zero() && self.collaterals.is_empty()
    }

    /// Net value in `fiat`. The base token is treated as a USD stablecoin;
    /// collateral is valued only when it tracks BTC or ETH.
    pub fn value(&self, prices: &SpotPrices, fiat: Fiat) -> Option<f64> {
        let base = prices.usd_to(fiat, self.supplied.to_f64() - self.borrowed.to_f64())?;
        let collateral: f64 = self
            .collaterals
            .iter()
            .filter_map(|c| {
                Asset::from_token_symbol(&c.symbol).map(|a| prices.value(a, c.amount.to_f64(), fiat))
            })
            .sum();
        Some(base + collateral)
    }
}

/// Assets held in one Euler vault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EulerPosition {
    pub vault: String,
    pub label: CompactString,
    /// Underlying asset the vault holds, if priced by the bot
    pub asset: Option<Asset>,
    pub assets: TokenAmount,
}

impl EulerPosition {
    /// Value in `fiat`; unpriced vaults are treated as USD stablecoin vaults.
    pub fn value(&self, prices: &SpotPrices, fiat: Fiat) -> Option<f64> {
        match self.asset {
            Some(asset) => Some(prices.value(asset, self.assets.to_f64(), fiat)),
            None => prices.usd_to(fiat, self.assets.to_f64()),
        }
    }
}

/// Total USD valuation of open Pendle positions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PendlePosition {
    pub valuation_usd: f64,
    pub open_positions: usize,
}

impl PendlePosition {
    pub fn value(&self, prices: &SpotPrices, fiat: Fiat) -> Option<f64> {
        prices.usd_to(fiat, self.valuation_usd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FiatQuote;
    use alloy_primitives::U256;

    fn amount(raw: u128, decimals: u8) -> TokenAmount {
        TokenAmount::new(U256::from(raw), decimals)
    }

    fn prices() -> SpotPrices {
        SpotPrices::new(
            FiatQuote::new(60_000.0, 5_400_000.0),
            FiatQuote::new(3_000.0, 270_000.0),
        )
    }

    #[test]
    fn test_comet_value_includes_priced_collateral() {
        let position = CometPosition {
            base_symbol: "USDC".into(),
            supplied: amount(100_000_000, 6),
            borrowed: amount(40_000_000, 6),
            collaterals: vec![
                Collateral { symbol: "WETH".into(), amount: amount(1_000_000_000_000_000_000, 18) },
                Collateral { symbol: "COMP".into(), amount: amount(50_000_000_000_000_000_000, 18) },
            ],
        };
        assert_eq!(position.value(&prices(), Fiat::Usd), Some(3_060.0));
        assert_eq!(position.value(&prices(), Fiat::Rub), Some(275_400.0));
    }

    #[test]
    fn test_empty_comet_position() {
        let position = CometPosition {
            base_symbol: "USDC".into(),
            supplied: TokenAmount::new(U256::ZERO, 6),
            borrowed: TokenAmount::new(U256::ZERO, 6),
            collaterals: vec![],
        };
        assert!(position.is_empty());
    }

    #[test]
    fn test_euler_and_pendle_value() {
        let euler = EulerPosition {
            vault: "0xD8b27CF359b7D15710a5BE299AF6e7Bf904984C2".to_string(),
            label: "eWETH-2".into(),
            asset: Some(Asset::Eth),
            assets: amount(2_000_000_000_000_000_000, 18),
        };
        assert_eq!(euler.value(&prices(), Fiat::Usd), Some(6_000.0));

        let pendle = PendlePosition { valuation_usd: 10.0, open_positions: 1 };
        assert_eq!(pendle.value(&prices(), Fiat::Rub), Some(900.0));
        assert_eq!(pendle.value(&SpotPrices::default(), Fiat::Rub), None);
    }
}
