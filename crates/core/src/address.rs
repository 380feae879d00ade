//! Address classification for user-registered wallets.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Base58Check version bytes of mainnet P2PKH and P2SH addresses.
const P2PKH_VERSION: u8 = 0x00;
const P2SH_VERSION: u8 = 0x05;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("Address is empty")]
    Empty,
    #[error("Unrecognized address format: {0}")]
    Unrecognized(String),
}

/// Network an address belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressKind {
    Bitcoin,
    Ethereum,
}

impl AddressKind {
    /// Classify an address string by its format.
    ///
    /// Ethereum: `0x` followed by 40 hex digits.
    /// Bitcoin: bech32 (`bc1...`) or legacy base58 (`1...`, `3...`).
    pub fn classify(address: &str) -> Option<Self> {
        let address = address.trim();
        if is_eth_address(address) {
            Some(AddressKind::Ethereum)
        } else if is_btc_address(address) {
            Some(AddressKind::Bitcoin)
        } else {
            None
        }
    }

    /// Parse and validate, returning a descriptive error.
    pub fn parse(address: &str) -> Result<Self, AddressError> {
        let trimmed = address.trim();
        if trimmed.is_empty() {
            return Err(AddressError::Empty);
        }
        Self::classify(trimmed).ok_or_else(|| AddressError::Unrecognized(trimmed.to_string()))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AddressKind::Bitcoin => "BTC",
            AddressKind::Ethereum => "ETH",
        }
    }
}

impl std::fmt::Display for AddressKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Check for a `0x`-prefixed 20-byte hex address. Checksum casing is not verified.
pub fn is_eth_address(address: &str) -> bool {
    match address.strip_prefix("0x").or_else(|| address.strip_prefix("0X")) {
        Some(hex) => hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

/// Check for a mainnet segwit (bech32/bech32m) or Base58Check Bitcoin
/// address, verifying its checksum.
pub fn is_btc_address(address: &str) -> bool {
    let lower = address.to_ascii_lowercase();
    if lower.starts_with("bc1") {
        // Mixed case is invalid in bech32.
        if address != lower && address != address.to_ascii_uppercase() {
            return false;
        }
        return matches!(bech32::segwit::decode(&lower), Ok((hrp, _, _)) if hrp == bech32::hrp::BC);
    }

    if !(address.starts_with('1') || address.starts_with('3')) {
        return false;
    }
    match bs58::decode(address).with_check(None).into_vec() {
        // Version byte plus a 20-byte hash.
        Ok(payload) => {
            payload.len() == 21 && matches!(payload[0], P2PKH_VERSION | P2SH_VERSION)
        }
        Err(_) => false,
    }
}

/// Split addresses into (bitcoin, ethereum), dropping anything unrecognized.
pub fn partition_addresses<S: AsRef<str>>(addresses: &[S]) -> (Vec<String>, Vec<String>) {
    let mut btc = Vec::new();
    let mut eth = Vec::new();
    for address in addresses {
        let address = address.as_ref();
        match AddressKind::classify(address) {
            Some(AddressKind::Bitcoin) => btc.push(address.to_string()),
            Some(AddressKind::Ethereum) => eth.push(address.to_string()),
            None => {}
        }
    }
    (btc, eth)
}

/// Canonical stored form of a user-supplied address.
///
/// Ethereum addresses are lowercased so checksum and plain spellings of one
/// account are stored once. Bitcoin addresses keep their case, except bech32
/// which is case-insensitive and lowercased.
pub fn normalize_address(address: &str) -> Result<(AddressKind, String), AddressError> {
    let trimmed = address.trim();
    let kind = AddressKind::parse(trimmed)?;
    let canonical = match kind {
        AddressKind::Ethereum => format!("0x{}", trimmed[2..].to_ascii_lowercase()),
        AddressKind::Bitcoin if trimmed.to_ascii_lowercase().starts_with("bc1") => {
            trimmed.to_ascii_lowercase()
        }
        AddressKind::Bitcoin => trimmed.to_string(),
    };
    Ok((kind, canonical))
}

/// Shorten an address for display: first 10 characters and an ellipsis.
pub fn short_address(address: &str) -> String {
    if address.chars().count() <= 10 {
        return address.to_string();
    }
    let head: String = address.chars().take(10).collect();
    format!("{head}…")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ETH: &str = "0x8357b66F74363E926de4186A449f365707c7fbad";
    const BTC_BECH32: &str = "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4";
    const BTC_LEGACY: &str = "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa";
    const BTC_P2SH: &str = "3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy";

    #[test]
    fn test_classify_known_formats() {
        assert_eq!(AddressKind::classify(ETH), Some(AddressKind::Ethereum));
        assert_eq!(AddressKind::classify(BTC_BECH32), Some(AddressKind::Bitcoin));
        assert_eq!(AddressKind::classify(BTC_LEGACY), Some(AddressKind::Bitcoin));
        assert_eq!(AddressKind::classify(BTC_P2SH), Some(AddressKind::Bitcoin));
    }

    #[test]
    fn test_btc_checksums_are_verified() {
        // One character changed from a valid address.
        assert!(!is_btc_address("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t5"));
        assert!(!is_btc_address("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNb"));
        assert!(!is_btc_address("3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLz"));

        // Valid checksums on the wrong network.
        assert!(!is_btc_address("tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx"));
        assert!(!is_btc_address("mipcBbFg9gMiCh81Kj8tqqdgoZub1ZJRfn"));

        // Mixed case bech32.
        assert!(!is_btc_address("bc1Qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4"));
        assert!(is_btc_address(&BTC_BECH32.to_uppercase()));
    }

    #[test]
    fn test_classify_rejects_garbage() {
        assert_eq!(AddressKind::classify("hello"), None);
        assert_eq!(AddressKind::classify("0x1234"), None);
        assert_eq!(AddressKind::classify("bc1O0O0O0O0O0O0"), None);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(AddressKind::parse("   "), Err(AddressError::Empty));
        assert!(matches!(
            AddressKind::parse("nope"),
            Err(AddressError::Unrecognized(_))
        ));
    }

    #[test]
    fn test_partition_addresses() {
        let addrs = vec![ETH, "junk", BTC_BECH32];
        let (btc, eth) = partition_addresses(&addrs);
        assert_eq!(btc, vec![BTC_BECH32.to_string()]);
        assert_eq!(eth, vec![ETH.to_string()]);
    }

    #[test]
    fn test_normalize_address() {
        assert_eq!(
            normalize_address(&format!(" {} ", ETH)).unwrap(),
            (AddressKind::Ethereum, ETH.to_lowercase())
        );
        assert_eq!(
            normalize_address(&BTC_BECH32.to_uppercase()).unwrap(),
            (AddressKind::Bitcoin, BTC_BECH32.to_string())
        );
        assert_eq!(
            normalize_address(BTC_LEGACY).unwrap(),
            (AddressKind::Bitcoin, BTC_LEGACY.to_string())
        );
        assert!(normalize_address("0xnothex").is_err());
    }

    #[test]
    fn test_short_address() {
        assert_eq!(short_address(ETH), "0x8357b66F…");
        assert_eq!(short_address("abc"), "abc");
    }
}
