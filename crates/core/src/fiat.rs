//! Fiat currencies the portfolio is reported in.

use serde::{Deserialize, Serialize};

/// Reporting currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Fiat {
    /// US Dollar
    #[default]
    Usd,
    /// Russian Ruble
    Rub,
}

impl Fiat {
    /// Every currency a report is rendered in, in display order.
    pub const ALL: [Fiat; 2] = [Fiat::Usd, Fiat::Rub];

    /// Parse from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "usd" => Some(Fiat::Usd),
            "rub" => Some(Fiat::Rub),
            _ => None,
        }
    }

    /// Lowercase code as used in price API query strings.
    pub fn code(self) -> &'static str {
        match self {
            Fiat::Usd => "usd",
            Fiat::Rub => "rub",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Fiat::Usd => "$",
            Fiat::Rub => "₽",
        }
    }

    /// Format an amount, e.g. `$1,234.56` or `1,234.56 ₽`.
    pub fn format(self, amount: f64) -> String {
        let body = group_thousands(amount);
        match self {
            Fiat::Usd => format!("${body}"),
            Fiat::Rub => format!("{body} ₽"),
        }
    }
}

impl std::fmt::Display for Fiat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code().to_ascii_uppercase())
    }
}

fn group_thousands(amount: f64) -> String {
    let formatted = format!("{:.2}", amount.abs());
    let (int_part, frac_part) = formatted.split_once('.').unwrap_or((&formatted, "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 && formatted != "0.00" { "-" } else { "" };
    format!("{sign}{grouped}.{frac_part}")
}
