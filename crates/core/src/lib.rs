//! Core data types for the portfolio bot.

pub mod address;
pub mod asset;
pub mod fiat;
pub mod position;
pub mod price;

pub use address::*;
pub use asset::*;
pub use fiat::*;
pub use position::*;
pub use price::*;
