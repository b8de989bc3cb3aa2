//! Service health command

use anyhow::Result;
use colored::Colorize;

use crate::client::ApiClient;
use crate::output::{color_status, print_json, print_success, print_warning, OutputFormat};

/// Show service liveness and model state
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health = client.health().await?;

    match format {
        OutputFormat::Json => print_json(&health)?,
        OutputFormat::Table => {
            println!("{}", "Service Health".bold());
            println!("{}", "=".repeat(40));
            println!("Endpoint:      {}", client.base_url().as_str().cyan());
            println!("Status:        {}", color_status(&health.status));
            println!();
            if health.model_loaded {
                print_success("Model loaded");
            } else {
                print_warning("Model not loaded - predictions will fail until the service is restarted with a valid artifact");
            }
        }
    }

    Ok(())
}
