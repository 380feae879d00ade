//! Telegram front end: address book, portfolio aggregation and reports.

pub mod db;
pub mod portfolio;
pub mod report;
pub mod telegram;

pub use db::{Database, DbError};
pub use portfolio::{Lookup, Portfolio, PortfolioService, SingleBalance};
pub use telegram::{Command, TelegramBot, TelegramError};
