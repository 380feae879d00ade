//! Spot prices of native assets in reporting currencies.

use crate::{Asset, Fiat};
use serde::{Deserialize, Serialize};

/// Price of one asset in every reporting currency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FiatQuote {
    pub usd: f64,
    pub rub: f64,
}

impl FiatQuote {
    pub fn new(usd: f64, rub: f64) -> Self {
        Self { usd, rub }
    }

    pub fn get(&self, fiat: Fiat) -> f64 {
        match fiat {
            Fiat::Usd => self.usd,
            Fiat::Rub => self.rub,
        }
    }
}

/// Spot prices for the assets a portfolio can hold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SpotPrices {
    pub btc: FiatQuote,
    pub eth: FiatQuote,
}

impl SpotPrices {
    pub fn new(btc: FiatQuote, eth: FiatQuote) -> Self {
        Self { btc, eth }
    }

    pub fn quote(&self, asset: Asset) -> &FiatQuote {
        match asset {
            Asset::Btc => &self.btc,
            Asset::Eth => &self.eth,
        }
    }

    /// Value `amount` units of `asset` in `fiat`.
    pub fn value(&self, asset: Asset, amount: f64, fiat: Fiat) -> f64 {
        amount * self.quote(asset).get(fiat)
    }

    /// Units of `fiat` per US dollar, derived from the ETH cross rate
    /// (falling back to BTC). Returns `None` when no USD price is known.
    pub fn usd_rate(&self, fiat: Fiat) -> Option<f64> {
        if fiat == Fiat::Usd {
            return Some(1.0);
        }
        [self.eth, self.btc]
            .iter()
            .find(|q| q.usd > 0.0 && q.get(fiat) > 0.0)
            .map(|q| q.get(fiat) / q.usd)
    }

    /// Convert a USD-denominated amount (stablecoin positions, Pendle valuations).
    pub fn usd_to(&self, fiat: Fiat, usd: f64) -> Option<f64> {
        self.usd_rate(fiat).map(|rate| usd * rate)
    }
}
