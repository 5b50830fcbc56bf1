use std::ffi::OsString;
use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spendcast_core::config::{Settings, DEFAULT_MODEL_DIR};
use spendcast_core::domain::result::{PredictionFailure, TrainingFailure};
use spendcast_core::service::{self, Reply};
use spendcast_core::storage::FileModelRegistry;

/// Expense forecasting from the command line. Prints exactly one JSON line.
#[derive(Debug, Parser)]
#[command(name = "spendcast")]
struct Args {
    /// Directory holding saved models. Defaults to MODEL_DIR, then `saved_models`.
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Train on `{expenses, user_id?, category?}` or a bare array of expenses.
    Train { payload: String },
    /// Forecast from `{recent_expenses, user_id?, category?}`.
    Predict {
        payload: String,
        /// Optional `{user_id, category}` overriding the payload's identity.
        params: Option<String>,
    },
}

/// Outcome of reading the command line.
enum Invocation {
    Run(Args),
    /// `--help` and friends: clap prints and exits.
    Exit(clap::Error),
    /// Unusable arguments, already rendered as the matching failure shape.
    Reject(Value),
}

fn parse_invocation(argv: Vec<OsString>) -> Invocation {
    match Args::try_parse_from(&argv) {
        Ok(args) => Invocation::Run(args),
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            Invocation::Exit(e)
        }
        Err(e) => {
            let message = e.render().to_string().trim().to_string();
            let wants_train = argv.iter().skip(1).any(|a| a == "train");
            let body = if wants_train {
                serde_json::to_value(TrainingFailure::new(message, 0.0))
            } else {
                serde_json::to_value(PredictionFailure::new(message, 0.0))
            };
            Invocation::Reject(body.unwrap_or(Value::Null))
        }
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args = match parse_invocation(std::env::args_os().collect()) {
        Invocation::Run(args) => args,
        Invocation::Exit(e) => e.exit(),
        Invocation::Reject(body) => {
            println!("{body}");
            return Ok(());
        }
    };
    let settings = Settings::from_env();
    let _sentry_guard = settings.as_ref().ok().and_then(init_sentry);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    if let Err(e) = &settings {
        tracing::warn!(error = %e, "ignoring invalid environment settings");
    }

    let model_dir = args
        .model_dir
        .or_else(|| settings.ok().map(|s| s.model_dir))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_DIR));
    let registry = FileModelRegistry::new(model_dir);
    if let Err(e) = registry.init() {
        tracing::error!(error = %e, "model directory unavailable");
    }

    let reply = match &args.command {
        Command::Train { payload } => service::train_payload(payload.as_bytes(), &registry),
        Command::Predict { payload, params } => service::predict_payload(
            payload.as_bytes(),
            params.as_deref().map(str::as_bytes),
            &registry,
        ),
    };

    emit(reply);
    Ok(())
}

fn emit(reply: Reply) {
    if let Some(e) = reply.error {
        sentry_anyhow::capture_anyhow(&anyhow::Error::new(e));
    }
    println!("{}", reply.body);
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
