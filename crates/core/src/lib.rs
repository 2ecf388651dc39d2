pub mod deliver;
pub mod domain;
pub mod fundamentals;
pub mod indicators;
pub mod ingest;
pub mod llm;
pub mod narrative;
pub mod pipeline;
pub mod render;
pub mod sentiment;

pub mod config {
    use anyhow::Context;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub groq_api_key: Option<String>,
        pub market_data_base_url: Option<String>,
        pub market_data_api_key: Option<String>,
        pub telegram_bot_token: Option<String>,
        pub telegram_chat_id: Option<String>,
        pub smtp_sender: Option<String>,
        pub smtp_app_password: Option<String>,
        pub smtp_recipient: Option<String>,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                groq_api_key: std::env::var("GROQ_API_KEY").ok(),
                market_data_base_url: std::env::var("MARKET_DATA_BASE_URL").ok(),
                market_data_api_key: std::env::var("MARKET_DATA_API_KEY").ok(),
                telegram_bot_token: std::env::var("TELEGRAM_BOT_TOKEN").ok(),
                telegram_chat_id: std::env::var("TELEGRAM_CHAT_ID").ok(),
                smtp_sender: std::env::var("SMTP_SENDER").ok(),
                smtp_app_password: std::env::var("SMTP_APP_PASSWORD").ok(),
                smtp_recipient: std::env::var("SMTP_RECIPIENT").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
            })
        }

        pub fn require_groq_api_key(&self) -> anyhow::Result<&str> {
            self.groq_api_key.as_deref().context("GROQ_API_KEY is required")
        }

        pub fn require_market_data_base_url(&self) -> anyhow::Result<&str> {
            self.market_data_base_url
                .as_deref()
                .context("MARKET_DATA_BASE_URL is required")
        }

        pub fn require_telegram(&self) -> anyhow::Result<(&str, &str)> {
            let token = self
                .telegram_bot_token
                .as_deref()
                .context("TELEGRAM_BOT_TOKEN is required")?;
            let chat_id = self
                .telegram_chat_id
                .as_deref()
                .context("TELEGRAM_CHAT_ID is required")?;
            Ok((token, chat_id))
        }

        pub fn require_smtp(&self) -> anyhow::Result<(&str, &str, &str)> {
            let sender = self.smtp_sender.as_deref().context("SMTP_SENDER is required")?;
            let password = self
                .smtp_app_password
                .as_deref()
                .context("SMTP_APP_PASSWORD is required")?;
            let recipient = self
                .smtp_recipient
                .as_deref()
                .context("SMTP_RECIPIENT is required")?;
            Ok((sender, password, recipient))
        }
    }
}
