//! Output formatting for the `aigp` CLI

use clap::ValueEnum;
use serde::Serialize;

use crate::error::CliError;

/// Output format options for structured results
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Default)]
pub enum OutputFormat {
    /// Plain text, one value per line
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
    /// YAML
    Yaml,
}

/// Render `value` in a structured format.
///
/// `text` renders the text form; it is only called for [`OutputFormat::Text`].
pub fn render<T: Serialize>(
    value: &T,
    format: OutputFormat,
    text: impl FnOnce(&T) -> String,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Text => Ok(text(value)),
        OutputFormat::Json => serde_json::to_string_pretty(value)
            .map_err(|e| CliError::SerializationError(e.to_string())),
        OutputFormat::Yaml => serde_yaml::to_string(value)
            .map(|yaml| yaml.trim_end().to_string())
            .map_err(|e| CliError::SerializationError(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_formats() {
        let value = json!({"root": "abc", "leaf_count": 2});
        assert_eq!(render(&value, OutputFormat::Text, |v| v["root"].to_string()).unwrap(), "\"abc\"");

        let rendered = render(&value, OutputFormat::Json, |_| unreachable!()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed, value);

        let yaml = render(&value, OutputFormat::Yaml, |_| unreachable!()).unwrap();
        assert!(yaml.contains("leaf_count: 2"));
    }
}
