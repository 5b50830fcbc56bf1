pub mod domain;
pub mod error;
pub mod fallback;
pub mod features;
pub mod model;
pub mod predictor;
pub mod service;
pub mod stats;
pub mod storage;
pub mod time;
pub mod trainer;

pub mod config {
    use anyhow::Context;
    use std::path::PathBuf;

    pub const DEFAULT_MODEL_DIR: &str = "saved_models";
    const DEFAULT_PORT: u16 = 5000;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub model_dir: PathBuf,
        pub port: u16,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let model_dir = std::env::var("MODEL_DIR")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_DIR));

            let port = match std::env::var("PORT") {
                Ok(s) => s
                    .trim()
                    .parse::<u16>()
                    .with_context(|| format!("PORT must be a valid port number (got {s:?})"))?,
                Err(_) => DEFAULT_PORT,
            };

            Ok(Self {
                model_dir,
                port,
                sentry_dsn: std::env::var("SENTRY_DSN")
                    .ok()
                    .filter(|s| !s.trim().is_empty()),
            })
        }
    }
}
