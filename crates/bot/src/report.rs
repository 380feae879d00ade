//! Telegram HTML rendering for portfolio reports and status messages.

use crate::portfolio::{Portfolio, SingleBalance};
use portfolio_core::{
    format_btc, format_eth, sats_to_btc, short_address, wei_to_eth, Asset, Fiat, SpotPrices,
};
use portfolio_feeds::FeedError;
use portfolio_rpc::EndpointStatus;
use std::fmt::Write;

const MAX_ERROR_CHARS: usize = 80;

/// Escape text for Telegram's HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn short_error(err: &FeedError) -> String {
    let text = match err {
        FeedError::Rpc(e) => e.root_cause().to_string(),
        other => other.to_string(),
    };
    let mut short: String = text.chars().take(MAX_ERROR_CHARS).collect();
    if text.chars().count() > MAX_ERROR_CHARS {
        short.push('…');
    }
    escape_html(&short)
}

fn addr(address: &str) -> String {
    format!("<code>{}</code>", escape_html(&short_address(address)))
}

fn failure_line(out: &mut String, address: &str, what: &str, err: &FeedError) {
    let _ = writeln!(out, "⚠️ {} {}: {}", addr(address), what, short_error(err));
}

fn fiat_values(prices: &SpotPrices, usd: f64) -> String {
    Fiat::ALL
        .iter()
        .filter_map(|f| prices.usd_to(*f, usd).map(|v| f.format(v)))
        .collect::<Vec<_>>()
        .join(" / ")
}

/// Full portfolio report.
pub fn render_portfolio(portfolio: &Portfolio) -> String {
    let mut out = String::from("<b>Portfolio</b>\n");

    if !portfolio.btc.is_empty() {
        out.push_str("\n<b>Bitcoin</b>\n");
        for (address, result) in portfolio.btc.iter() {
            match result {
                Ok(sats) => {
                    let _ = writeln!(out, "{} — {}", addr(address), format_btc(*sats));
                }
                Err(e) => failure_line(&mut out, address, "balance", e),
            }
        }
    }

    if !portfolio.eth.is_empty() {
        out.push_str("\n<b>Ethereum</b>\n");
        for (address, result) in portfolio.eth.iter() {
            match result {
                Ok(wei) => {
                    let _ = writeln!(out, "{} — {}", addr(address), format_eth(wei_to_eth(*wei)));
                }
                Err(e) => failure_line(&mut out, address, "balance", e),
            }
        }
    }

    let defi = render_defi(portfolio);
    if !defi.is_empty() {
        out.push_str("\n<b>DeFi</b>\n");
        out.push_str(&defi);
    }

    out.push_str("\n<b>Total</b>\n");
    let _ = writeln!(
        out,
        "{} + {}",
        format_btc(portfolio.total_btc_sats()),
        format_eth(portfolio.total_eth())
    );
    match &portfolio.prices {
        Ok(_) => {
            let totals: Vec<String> = Fiat::ALL
                .iter()
                .filter_map(|f| portfolio.total(*f).map(|v| f.format(v)))
                .collect();
            let _ = writeln!(out, "≈ <b>{}</b>", totals.join(" / "));
        }
        Err(e) => {
            let _ = writeln!(out, "⚠️ Prices unavailable: {}", short_error(e));
        }
    }

    let failures = portfolio.failure_count();
    if failures > 0 {
        let _ = writeln!(out, "<i>{} lookup(s) failed and are not counted</i>", failures);
    }

    let _ = write!(
        out,
        "\n⏰ {}",
        portfolio.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    out
}

fn render_defi(portfolio: &Portfolio) -> String {
    let mut out = String::new();

    for (address, result) in portfolio.compound.iter() {
        match result {
            Ok(positions) => {
                for p in positions {
                    let _ = writeln!(
                        out,
                        "{} Compound v3: supplied {:.2} {sym}, borrowed {:.2} {sym}",
                        addr(address),
                        p.supplied.to_f64(),
                        p.borrowed.to_f64(),
                        sym = escape_html(&p.base_symbol)
                    );
                    for c in &p.collaterals {
                        let _ = writeln!(out, "    {} {:.6}", escape_html(&c.symbol), c.amount.to_f64());
                    }
                }
            }
            Err(e) => failure_line(&mut out, address, "Compound v3", e),
        }
    }

    for (address, result) in portfolio.euler.iter() {
        match result {
            Ok(positions) => {
                for p in positions {
                    let unit = p.asset.map(Asset::symbol).unwrap_or("USD");
                    let _ = writeln!(
                        out,
                        "{} {}: {:.6} {}",
                        addr(address),
                        escape_html(&p.label),
                        p.assets.to_f64(),
                        unit
                    );
                }
            }
            Err(e) => failure_line(&mut out, address, "Euler", e),
        }
    }

    for (address, result) in portfolio.pendle.iter() {
        match result {
            Ok(p) if p.open_positions > 0 => {
                let _ = writeln!(
                    out,
                    "{} Pendle: {} in {} LP position(s)",
                    addr(address),
                    Fiat::Usd.format(p.valuation_usd),
                    p.open_positions
                );
            }
            Ok(_) => {}
            Err(e) => failure_line(&mut out, address, "Pendle", e),
        }
    }

    out
}

/// Reply to `/balance`.
pub fn render_balance(address: &str, balance: &SingleBalance, prices: Option<&SpotPrices>) -> String {
    let (amount, asset, text) = match balance {
        SingleBalance::Btc { sats } => (sats_to_btc(*sats), Asset::Btc, format_btc(*sats)),
        SingleBalance::Eth { wei } => {
            let eth = wei_to_eth(*wei);
            (eth, Asset::Eth, format_eth(eth))
        }
    };
    let mut out = format!(
        "Balance of <code>{}</code>:\n<b>{}</b>",
        escape_html(address),
        text
    );
    if let Some(prices) = prices {
        let usd = prices.value(asset, amount, Fiat::Usd);
        let _ = write!(out, "\n≈ {}", fiat_values(prices, usd));
    }
    out
}

/// Reply to `/list`.
pub fn render_addresses(addresses: &[String]) -> String {
    if addresses.is_empty() {
        return "You have no addresses yet. Add one with /add &lt;address&gt;.".to_string();
    }
    let mut out = format!("<b>Tracked addresses ({})</b>\n", addresses.len());
    for address in addresses {
        let _ = writeln!(out, "<code>{}</code>", escape_html(address));
    }
    out
}

/// Reply to `/endpoints`.
pub fn render_endpoints(statuses: &[EndpointStatus]) -> String {
    let eligible = statuses.iter().filter(|s| s.cooldown_remaining.is_none()).count();
    let mut out = format!(
        "<b>RPC endpoints</b> ({}/{} available)\n",
        eligible,
        statuses.len()
    );
    for status in statuses {
        let marker = if status.is_current { "▶" } else { "•" };
        let state = match status.cooldown_remaining {
            None => "available".to_string(),
            Some(left) => format!("cooling down, {}s left", left.as_secs().max(1)),
        };
        let _ = writeln!(out, "{} {} ({})", marker, escape_html(&status.label), state);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::tests::{service, BTC_DOWN, BTC_OK, ETH_DOWN, ETH_OK};
    use portfolio_core::FiatQuote;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a & b>"), "&lt;a &amp; b&gt;");
    }

    #[tokio::test]
    async fn test_portfolio_report_marks_failures() {
        let addresses: Vec<String> = [BTC_OK, BTC_DOWN, ETH_OK, ETH_DOWN]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let portfolio = service(true).build(&addresses).await;
        let text = render_portfolio(&portfolio);

        assert!(text.contains("<code>bc1qw508d6…</code> — 0.50000000 BTC"));
        assert!(text.contains("⚠️ <code>1A1zP1eP5Q…</code> balance: Request failed: connection reset"));
        assert!(text.contains("<code>0x8357b66f…</code> — 2.000000 ETH"));
        assert!(text.contains("⚠️ <code>0x0c8eb038…</code> Compound v3"));
        assert!(text.contains("Pendle: $100.00 in 1 LP position(s)"));
        assert!(text.contains("≈ <b>$39,700.00 / 3,970,000.00 ₽</b>"));
        assert!(text.contains("5 lookup(s) failed"));
    }

    #[tokio::test]
    async fn test_portfolio_report_without_prices() {
        let portfolio = service(false).build(&[BTC_OK.to_string()]).await;
        let text = render_portfolio(&portfolio);
        assert!(text.contains("Prices unavailable"));
        assert!(!text.contains("<b>DeFi</b>"));
    }

    #[test]
    fn test_balance_with_prices() {
        let prices = SpotPrices::new(
            FiatQuote::new(60_000.0, 6_000_000.0),
            FiatQuote::new(3_000.0, 300_000.0),
        );
        let text = render_balance(BTC_OK, &SingleBalance::Btc { sats: 25_000_000 }, Some(&prices));
        assert_eq!(
            text,
            format!(
                "Balance of <code>{}</code>:\n<b>0.25000000 BTC</b>\n≈ $15,000.00 / 1,500,000.00 ₽",
                BTC_OK
            )
        );
    }

    #[test]
    fn test_endpoint_status() {
        let statuses = vec![
            EndpointStatus {
                label: "a.example".into(),
                is_current: false,
                cooldown_remaining: Some(Duration::from_secs(120)),
            },
            EndpointStatus {
                label: "b.example".into(),
                is_current: true,
                cooldown_remaining: None,
            },
        ];
        let text = render_endpoints(&statuses);
        assert!(text.contains("(1/2 available)"));
        assert!(text.contains("• a.example (cooling down, 120s left)"));
        assert!(text.contains("▶ b.example (available)"));
    }

    #[test]
    fn test_empty_address_list() {
        assert!(render_addresses(&[]).contains("/add"));
        let text = render_addresses(&[ETH_OK.to_string()]);
        assert!(text.starts_with("<b>Tracked addresses (1)</b>"));
    }
}
