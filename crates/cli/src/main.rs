//! Machine Failure Predictor CLI
//!
//! A command-line tool for checking the prediction service and sending
//! sensor readings to it.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{health, model, predict};
use std::path::PathBuf;

/// Machine Failure Predictor CLI
#[derive(Parser)]
#[command(name = "pmctl")]
#[command(author, version, about = "CLI for the Machine Failure Predictor", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via PMCTL_API_URL env var)
    #[arg(long, env = "PMCTL_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check service health and whether a model is loaded
    Health,

    /// Send a sensor reading and show the failure prediction
    Predict {
        /// JSON file with feature values
        #[arg(long)]
        file: Option<PathBuf>,

        /// Override a feature (repeatable), e.g. --set vibration=1500
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,

        /// Start from a built-in example reading
        #[arg(long, value_enum)]
        sample: Option<predict::Sample>,
    },

    /// Show the loaded model, schema and threshold
    Model,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::Config::load()?;
    let api_url = config.resolve_api_url(cli.api_url.as_deref());

    // Initialize client
    let client = client::ApiClient::new(&api_url)?;

    // Execute command
    match cli.command {
        Commands::Health => health::show_health(&client, cli.format).await?,
        Commands::Predict { file, set, sample } => {
            let reading = predict::build_reading(sample, file.as_deref(), &set)?;
            predict::run_prediction(&client, &reading, cli.format).await?;
        }
        Commands::Model => model::show_model(&client, cli.format).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_predict() {
        let cli = Cli::try_parse_from([
            "pmctl",
            "--api-url",
            "http://localhost:5000",
            "--format",
            "json",
            "predict",
            "--sample",
            "lag",
            "--set",
            "vibration=1500",
            "--set",
            "pressure=60",
        ])
        .unwrap();

        assert_eq!(cli.api_url.as_deref(), Some("http://localhost:5000"));
        assert_eq!(cli.format, output::OutputFormat::Json);
        match cli.command {
            Commands::Predict { set, sample, file } => {
                assert_eq!(set.len(), 2);
                assert_eq!(sample, Some(predict::Sample::Lag));
                assert!(file.is_none());
            }
            _ => panic!("expected predict"),
        }
    }

    #[test]
    fn test_parse_health_and_model() {
        assert!(matches!(
            Cli::try_parse_from(["pmctl", "health"]).unwrap().command,
            Commands::Health
        ));
        assert!(matches!(
            Cli::try_parse_from(["pmctl", "model"]).unwrap().command,
            Commands::Model
        ));
    }

    #[test]
    fn test_unknown_sample_rejected() {
        assert!(Cli::try_parse_from(["pmctl", "predict", "--sample", "wide"]).is_err());
    }
}
