use std::sync::Arc;

use anyhow::Context;
use secrecy::ExposeSecret;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use gift_assist::bot::GiftBot;
use gift_assist::channels::{Channel, CliChannel, TelegramChannel};
use gift_assist::config::BotConfig;
use gift_assist::error;
use gift_assist::favorites::FavoritesStore;
use gift_assist::gifts::LlmSuggestionGenerator;
use gift_assist::llm::create_provider;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config = load_config().unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        eprintln!("  export OPENAI_API_KEY=sk-...");
        std::process::exit(1);
    });

    // Initialize tracing; the guard flushes the log file on exit
    let (file_layer, _log_guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "gift-assist.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(file_layer)
        .init();

    eprintln!("🎁 Gift Assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.llm.model);
    eprintln!("   LLM endpoint: {}", config.llm.base_url);
    eprintln!("   Favorites: {}", config.favorites_path.display());
    if let Some(dir) = &config.log_dir {
        eprintln!("   Log dir: {}", dir.display());
    }

    let bot = build_bot(&config)
        .await
        .context("failed to create LLM provider")?;

    let channel: Arc<dyn Channel> = match &config.telegram {
        Some(telegram) => {
            eprintln!(
                "   Telegram: enabled (allowed: {})\n",
                if telegram.allowed_users.iter().any(|u| u == "*") {
                    "everyone".to_string()
                } else {
                    telegram.allowed_users.join(", ")
                }
            );
            let channel = TelegramChannel::new(
                telegram.bot_token.expose_secret().to_string(),
                telegram.allowed_users.clone(),
            );
            if let Err(e) = channel.health_check().await {
                tracing::warn!("Telegram health check failed: {}", e);
            }
            Arc::new(channel)
        }
        None => {
            eprintln!("   Channel: cli (set TELEGRAM_BOT_TOKEN to use Telegram)");
            eprintln!("   Type /gift to start, `tap <payload>` to press a button.\n");
            Arc::new(CliChannel::new())
        }
    };

    Arc::new(bot)
        .run(channel)
        .await
        .context("gift bot stopped with an error")?;

    Ok(())
}

fn load_config() -> error::Result<BotConfig> {
    Ok(BotConfig::from_env()?)
}

/// Wire the LLM provider, the suggestion generator and the favorites store
/// into a bot.
async fn build_bot(config: &BotConfig) -> error::Result<GiftBot> {
    let llm = create_provider(&config.llm)?;
    let generator = Arc::new(LlmSuggestionGenerator::new(llm, config.generator.clone()));
    let favorites = Arc::new(FavoritesStore::open(config.favorites_path.clone()).await);
    Ok(GiftBot::new(generator, favorites, config.shops.clone()))
}
