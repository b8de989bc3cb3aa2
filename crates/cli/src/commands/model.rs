//! Model information command

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, ModelInfo};
use crate::output::{print_json, print_table, print_warning, OutputFormat};

/// Row for the model info table
#[derive(Tabled)]
struct InfoRow {
    #[tabled(rename = "Field")]
    field: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

fn info_rows(info: &ModelInfo) -> Vec<InfoRow> {
    let or_dash = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
    vec![
        InfoRow {
            field: "Loaded",
            value: info.loaded.to_string(),
        },
        InfoRow {
            field: "Kind",
            value: or_dash(&info.kind),
        },
        InfoRow {
            field: "Source",
            value: or_dash(&info.source),
        },
        InfoRow {
            field: "Checksum",
            value: or_dash(&info.checksum),
        },
        InfoRow {
            field: "Schema",
            value: info.schema.clone(),
        },
        InfoRow {
            field: "Threshold",
            value: format!("{:.2} ({})", info.threshold, info.threshold_source),
        },
        InfoRow {
            field: "Features",
            value: info.features.join(", "),
        },
    ]
}

/// Show the loaded model, schema and threshold
pub async fn show_model(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let info = client.model_info().await?;

    match format {
        OutputFormat::Json => print_json(&info)?,
        OutputFormat::Table => {
            println!("{}", "Model".bold());
            print_table(info_rows(&info));
            if !info.loaded {
                print_warning("Service is running without a model");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_for_unloaded_model() {
        let info = ModelInfo {
            loaded: false,
            kind: None,
            source: None,
            checksum: None,
            loaded_at: None,
            schema: "lag".to_string(),
            features: vec!["vibration".to_string(), "pressure".to_string()],
            threshold: 0.6,
            threshold_source: "schema_default".to_string(),
        };
        let rows = info_rows(&info);
        assert_eq!(rows[1].value, "-");
        assert_eq!(rows[5].value, "0.60 (schema_default)");
        assert_eq!(rows[6].value, "vibration, pressure");
    }
}
