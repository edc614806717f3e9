use crate::types::MissingValues;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub view: ViewConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub data_csv: PathBuf,
    pub coordinates: PathBuf, // country code -> latitude/longitude JSON
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ViewConfig {
    pub missing_values: MissingValues,
    pub marker_scale: f64,
    pub label_precision: usize,
    pub default_year: Option<i32>,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            missing_values: MissingValues::Zero,
            marker_scale: 100_000.0,
            label_precision: 4,
            default_year: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            static_dir: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub export_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            export_path: PathBuf::from("fertility.csv"),
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        // Marker size must grow with the rate
        if !(self.view.marker_scale > 0.0) {
            bail!(
                "view.marker_scale must be positive, got {}",
                self.view.marker_scale
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [input]
            data_csv = "data/fertility.csv"
            coordinates = "data/country.json"
            "#,
        )
        .unwrap();

        assert_eq!(config.input.data_csv, PathBuf::from("data/fertility.csv"));
        assert_eq!(config.view.missing_values, MissingValues::Zero);
        assert_eq!(config.view.label_precision, 4);
        assert_eq!(config.server.port, 8080);
        assert!(config.server.static_dir.is_none());
    }

    #[test]
    fn gap_mode_and_overrides_parse() {
        let config = AppConfig::from_toml(
            r#"
            [input]
            data_csv = "a.csv"
            coordinates = "b.json"

            [view]
            missing_values = "gap"
            marker_scale = 50.0
            default_year = 2008

            [server]
            port = 3000
            "#,
        )
        .unwrap();

        assert_eq!(config.view.missing_values, MissingValues::Gap);
        assert_eq!(config.view.marker_scale, 50.0);
        assert_eq!(config.view.label_precision, 4);
        assert_eq!(config.view.default_year, Some(2008));
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn non_positive_marker_scale_is_rejected() {
        let result = AppConfig::from_toml(
            r#"
            [input]
            data_csv = "a.csv"
            coordinates = "b.json"

            [view]
            marker_scale = 0.0
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn missing_input_section_is_an_error() {
        assert!(AppConfig::from_toml("[server]\nport = 1").is_err());
    }
}
