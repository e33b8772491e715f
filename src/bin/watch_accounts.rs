//! Watch account balance updates on the push channel.
//!
//! Usage:
//!   PUSHGATE_ENDPOINT=wss://api-aws.huobi.pro/ws/v2 \
//!   PUSHGATE_ACCESS_KEY=... PUSHGATE_SECRET_KEY=... \
//!   cargo run --bin watch_accounts

use std::sync::Arc;

use async_trait::async_trait;
use pushgate::{AuthOutcome, Client, ClientOptions, Credentials, PushHandler, PushMessage};

const ACCOUNT_CHANNEL: &str = "accounts.update#1";

struct AccountWatcher;

#[async_trait]
impl PushHandler for AccountWatcher {
    async fn on_auth_result(&self, outcome: AuthOutcome, client: Client) {
        if outcome.success {
            // Subscriptions do not survive reconnects; re-issue here so every
            // authenticated connection picks the channel back up.
            client.subscribe(ACCOUNT_CHANNEL);
        } else {
            eprintln!("auth error: {}", outcome.message.raw());
        }
    }

    async fn on_message(&self, message: PushMessage, client: Client) {
        if message.action() != Some("push") || message.channel() != Some(ACCOUNT_CHANNEL) {
            println!("[{}] other message: {}", client.name(), message.raw());
            return;
        }

        let change_type = message
            .data()
            .and_then(|data| data.get("changeType"))
            .and_then(|v| v.as_str());
        match change_type {
            Some("deposit") => println!("[{}] deposit: {}", client.name(), message.raw()),
            Some("withdraw") => println!("[{}] withdraw: {}", client.name(), message.raw()),
            // The server pushes the current balance once right after sub.
            None => println!("[{}] initial balance: {}", client.name(), message.raw()),
            Some(other) => {
                println!("[{}] {} update: {}", client.name(), other, message.raw())
            }
        }
    }
}

fn env(key: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| panic!("{} must be set", key))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let endpoint = std::env::var("PUSHGATE_ENDPOINT")
        .unwrap_or_else(|_| "wss://api-aws.huobi.pro/ws/v2".to_string());
    let credentials = Credentials::new(env("PUSHGATE_ACCESS_KEY"), env("PUSHGATE_SECRET_KEY"));

    let options = ClientOptions::new(endpoint, credentials).name("watch-accounts");
    let client = Client::new(options, Arc::new(AccountWatcher))?;
    client.run();

    tokio::signal::ctrl_c().await?;
    client.close();
    Ok(())
}
