//! HTML form for manual testing

use predictor_lib::{FeatureSchema, MachineStatus, PredictionResult};
use std::collections::HashMap;
use std::fmt::Write;

/// What to show under the form after a submission
#[derive(Debug, Clone)]
pub enum FormOutcome {
    Prediction(PredictionResult),
    Error(String),
}

/// Render the form page, keeping previously submitted values in the inputs
pub fn render_page(
    schema: &FeatureSchema,
    threshold: f64,
    values: &HashMap<String, String>,
    outcome: Option<&FormOutcome>,
) -> String {
    let mut fields = String::new();
    for name in schema.names() {
        let value = values.get(name).map(String::as_str).unwrap_or("");
        let _ = write!(
            fields,
            r#"      <label for="{name}">{name}</label>
      <input type="number" step="any" id="{name}" name="{name}" value="{value}" required>
"#,
            name = escape(name),
            value = escape(value),
        );
    }

    let result = match outcome {
        Some(FormOutcome::Prediction(r)) => {
            let class = match r.status {
                MachineStatus::Healthy => "healthy",
                MachineStatus::Risk => "risk",
            };
            format!(
                r#"    <div class="result {class}">
      <h2>Status: {status}</h2>
      <p>Failure probability: {pct:.2}%</p>
      <p>Prediction: {prediction}</p>
    </div>
"#,
                class = class,
                status = r.status,
                pct = r.failure_probability * 100.0,
                prediction = r.prediction,
            )
        }
        Some(FormOutcome::Error(msg)) => format!(
            "    <div class=\"result error\"><p>Error: {}</p></div>\n",
            escape(msg)
        ),
        None => String::new(),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Machine Failure Predictor</title>
  <style>
    body {{ font-family: sans-serif; max-width: 40rem; margin: 2rem auto; }}
    form {{ display: grid; grid-template-columns: 14rem 1fr; gap: 0.5rem; }}
    .result {{ margin-top: 1.5rem; padding: 1rem; border-radius: 4px; }}
    .healthy {{ background: #e3f6e5; }}
    .risk {{ background: #fde2e1; }}
    .error {{ background: #fff4d6; }}
  </style>
</head>
<body>
  <h1>Machine Failure Predictor</h1>
  <p>Decision threshold: {threshold:.2}</p>
  <form method="post" action="/">
{fields}      <button type="submit">Predict</button>
  </form>
{result}</body>
</html>
"#,
        threshold = threshold,
        fields = fields,
        result = result,
    )
}

/// Escape text for use in HTML content and quoted attributes
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_has_input_per_feature() {
        let schema = FeatureSchema::rolling_mean();
        let page = render_page(&schema, 0.5, &HashMap::new(), None);
        for name in schema.names() {
            assert!(page.contains(&format!(r#"name="{}""#, name)));
        }
        assert!(!page.contains("class=\"result"));
    }

    #[test]
    fn test_result_rendered() {
        let schema = FeatureSchema::rolling_mean();
        let outcome = FormOutcome::Prediction(PredictionResult::classify(0.75, 0.5));
        let page = render_page(&schema, 0.5, &HashMap::new(), Some(&outcome));
        assert!(page.contains("Status: risk"));
        assert!(page.contains("75.00%"));
    }

    #[test]
    fn test_values_escaped() {
        let schema = FeatureSchema::custom(["a"]).unwrap();
        let mut values = HashMap::new();
        values.insert("a".to_string(), "\"><script>".to_string());
        let outcome = FormOutcome::Error("<b>bad</b>".to_string());
        let page = render_page(&schema, 0.5, &values, Some(&outcome));
        assert!(!page.contains("<script>"));
        assert!(page.contains("&lt;b&gt;bad&lt;/b&gt;"));
    }
}
