//! Cretcom - streaming health assistant chat
//!
//! A terminal chat client that forwards each message, together with the
//! whole conversation so far, to Google Gemini and prints the reply as it
//! streams in.

use std::sync::Arc;

use tokio::io::BufReader;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod conversation;
mod core;
mod providers;
mod terminal;

use config::Config;
use crate::core::ChatEngine;
use providers::Provider;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr; stdout carries the transcript.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cretcom=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env()?;
    let provider = Provider::from_config(&config)?;

    tracing::info!(
        provider = %config.provider,
        model = %config.model,
        timeout = ?config.reply_timeout(),
        "🩺 Cretcom ready"
    );

    let mut engine = ChatEngine::new(Arc::new(provider), config.reply_timeout());

    terminal::run(
        &mut engine,
        BufReader::new(tokio::io::stdin()),
        std::io::stdout(),
    )
    .await
}
