//! Telegram bot handlers.

use crate::db::Database;
use crate::portfolio::PortfolioService;
use crate::report;
use portfolio_core::{normalize_address, AddressError};
use portfolio_rpc::RpcManager;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::utils::command::BotCommands;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum TelegramError {
    #[error("Telegram API error: {0}")]
    Api(#[from] teloxide::RequestError),
    #[error("Database error: {0}")]
    Db(#[from] crate::db::DbError),
}

/// Bot commands.
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Start the bot")]
    Start,
    #[command(description = "Show help")]
    Help,
    #[command(description = "Track an address. Usage: /add <btc or eth address>")]
    Add(String),
    #[command(description = "Stop tracking an address. Usage: /remove <address>")]
    Remove(String),
    #[command(description = "List tracked addresses")]
    List,
    #[command(description = "Balance of one address. Usage: /balance <address>")]
    Balance(String),
    #[command(description = "Show the value of all tracked addresses")]
    Portfolio,
    #[command(description = "Show RPC endpoint status")]
    Endpoints,
}

/// Telegram bot wrapper.
pub struct TelegramBot {
    bot: Bot,
    db: Database,
    portfolio: PortfolioService,
    rpc: Arc<RpcManager>,
}

impl TelegramBot {
    pub fn new(token: &str, db: Database, portfolio: PortfolioService, rpc: Arc<RpcManager>) -> Self {
        Self {
            bot: Bot::new(token),
            db,
            portfolio,
            rpc,
        }
    }

    /// Run the bot command handler until Ctrl-C.
    pub async fn run(self: Arc<Self>) {
        let bot = self.bot.clone();
        if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
            warn!("Failed to register command list: {}", e);
        }

        let handler = Update::filter_message().filter_command::<Command>().endpoint(
            move |bot: Bot, msg: Message, cmd: Command| {
                let this = Arc::clone(&self);
                async move { this.handle_command(bot, msg, cmd).await }
            },
        );

        info!("Bot is polling");
        Dispatcher::builder(bot, handler)
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;
    }

    async fn reply_html(&self, bot: &Bot, msg: &Message, text: String) -> Result<(), TelegramError> {
        bot.send_message(msg.chat.id, text)
            .parse_mode(ParseMode::Html)
            .await?;
        Ok(())
    }

    async fn handle_command(
        &self,
        bot: Bot,
        msg: Message,
        cmd: Command,
    ) -> Result<(), TelegramError> {
        // Addresses are kept per chat; in a private chat this is the user.
        let owner = msg.chat.id.0;

        match cmd {
            Command::Start => {
                let text = format!(
                    "Hi! I track BTC and ETH addresses and their DeFi positions.\n\n{}",
                    Command::descriptions()
                );
                bot.send_message(msg.chat.id, text).await?;
            }

            Command::Help => {
                bot.send_message(msg.chat.id, Command::descriptions().to_string())
                    .await?;
            }

            Command::Add(value) => match normalize_address(&value) {
                Ok((kind, address)) => {
                    let text = if self.db.add_address(owner, &address).await? {
                        info!("Chat {} added {} address", owner, kind);
                        format!("✅ Added {} address.", kind)
                    } else {
                        "⚠️ This address is already in your portfolio.".to_string()
                    };
                    bot.send_message(msg.chat.id, text).await?;
                }
                Err(AddressError::Empty) => {
                    bot.send_message(msg.chat.id, "Usage: /add <btc or eth address>")
                        .await?;
                }
                Err(AddressError::Unrecognized(_)) => {
                    bot.send_message(msg.chat.id, "⛔️ Not a Bitcoin or Ethereum address.")
                        .await?;
                }
            },

            Command::Remove(value) => {
                let address = match normalize_address(&value) {
                    Ok((_, address)) => address,
                    Err(AddressError::Empty) => {
                        bot.send_message(msg.chat.id, "Usage: /remove <address>").await?;
                        return Ok(());
                    }
                    Err(AddressError::Unrecognized(raw)) => raw,
                };
                let text = if self.db.remove_address(owner, &address).await? {
                    "🗑️ Removed."
                } else {
                    "🤷 This address is not in your list."
                };
                bot.send_message(msg.chat.id, text).await?;
            }

            Command::List => {
                let addresses = self.db.list_addresses(owner).await?;
                self.reply_html(&bot, &msg, report::render_addresses(&addresses))
                    .await?;
            }

            Command::Balance(value) => {
                let address = value.trim();
                if address.is_empty() {
                    bot.send_message(msg.chat.id, "Usage: /balance <address>").await?;
                    return Ok(());
                }
                bot.send_message(msg.chat.id, "⏳ Looking up…").await?;

                let (balance, prices) =
                    tokio::join!(self.portfolio.balance(address), self.portfolio.prices());
                let text = match balance {
                    Ok(balance) => report::render_balance(address, &balance, prices.ok().as_ref()),
                    Err(e) => {
                        warn!("Balance lookup failed: {}", e);
                        format!("⚠️ Lookup failed: {}", report::escape_html(&e.to_string()))
                    }
                };
                self.reply_html(&bot, &msg, text).await?;
            }

            Command::Portfolio => {
                let addresses = self.db.list_addresses(owner).await?;
                if addresses.is_empty() {
                    bot.send_message(msg.chat.id, "You have no addresses yet. Add one with /add.")
                        .await?;
                    return Ok(());
                }
                bot.send_message(msg.chat.id, "⏳ Calculating portfolio…").await?;

                let portfolio = self.portfolio.build(&addresses).await;
                self.reply_html(&bot, &msg, report::render_portfolio(&portfolio))
                    .await?;
            }

            Command::Endpoints => {
                let statuses = self.rpc.pool().status();
                self.reply_html(&bot, &msg, report::render_endpoints(&statuses))
                    .await?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        let cmd = Command::parse("/add bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4", "portfolio_bot").unwrap();
        assert!(matches!(cmd, Command::Add(a) if a == "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4"));

        assert!(matches!(Command::parse("/portfolio", "portfolio_bot"), Ok(Command::Portfolio)));
        assert!(matches!(Command::parse("/endpoints", "portfolio_bot"), Ok(Command::Endpoints)));
        assert!(Command::parse("/unknown", "portfolio_bot").is_err());
    }

    #[test]
    fn test_descriptions_list_every_command() {
        let help = Command::descriptions().to_string();
        for name in ["/add", "/remove", "/list", "/balance", "/portfolio", "/endpoints"] {
            assert!(help.contains(name), "missing {name}");
        }
    }
}
