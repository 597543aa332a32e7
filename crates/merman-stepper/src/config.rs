use crate::error::ConfigError;
use crate::geom::{PaddingRule, ScreenSize};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Runtime configuration of a [`crate::Stepper`].
///
/// Every field has a default, so a config file only needs the keys it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StepperConfig {
    /// Root `<svg id>` of the rendered diagram.
    pub svg_id: String,
    pub show_sequence_numbers: bool,
    /// Delay after a render before the surface is considered settled.
    pub settle_delay_ms: u64,
    pub container: ContainerSize,
    pub padding: PaddingRule,
    pub export: ExportOptions,
}

impl Default for StepperConfig {
    fn default() -> Self {
        Self {
            svg_id: "mySvgId".to_string(),
            show_sequence_numbers: true,
            settle_delay_ms: 200,
            container: ContainerSize::default(),
            padding: PaddingRule::default(),
            export: ExportOptions::default(),
        }
    }
}

impl StepperConfig {
    pub fn container_size(&self) -> ScreenSize {
        ScreenSize::new(self.container.width, self.container.height)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// Size of the on-screen container, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerSize {
    pub width: f64,
    pub height: f64,
}

impl Default for ContainerSize {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportOptions {
    pub file_name: String,
    /// Canvas fill behind the diagram; `None` keeps the PNG transparent.
    pub background: Option<String>,
    pub scale: f32,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            file_name: crate::export::EXPORT_FILE_NAME.to_string(),
            background: Some("white".to_string()),
            scale: 1.0,
        }
    }
}

/// Loads a JSON5 config file, or the defaults when `path` is `None`.
pub fn load_config(path: Option<&Path>) -> Result<StepperConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(StepperConfig::default());
    };
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    json5::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_widget() {
        let config = load_config(None).unwrap();
        assert_eq!(config.svg_id, "mySvgId");
        assert!(config.show_sequence_numbers);
        assert_eq!(config.settle_delay(), Duration::from_millis(200));
        assert_eq!(config.container_size(), ScreenSize::new(1280.0, 800.0));
        assert_eq!(config.export.file_name, "diagram.png");
        assert_eq!(config.export.background.as_deref(), Some("white"));
    }

    #[test]
    fn partial_json5_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stepper.json5");
        std::fs::write(
            &path,
            r#"{
  // comments and trailing commas are fine
  settleDelayMs: 0,
  container: { width: 640 },
  padding: { min: 50 },
}"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.settle_delay_ms, 0);
        assert_eq!(config.container.width, 640.0);
        assert_eq!(config.container.height, 800.0);
        assert_eq!(config.padding.min, 50.0);
        assert_eq!(config.padding.max, 600.0);
        assert_eq!(config.svg_id, "mySvgId");
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stepper.json5");
        std::fs::write(&path, r#"{ target: "graphDiv", svgId: "other" }"#).unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.svg_id, "other");
        assert_eq!(
            config,
            StepperConfig {
                svg_id: "other".to_string(),
                ..StepperConfig::default()
            }
        );
    }

    #[test]
    fn reports_the_offending_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json5");
        let err = load_config(Some(&missing)).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("missing.json5"));

        let broken = dir.path().join("broken.json5");
        std::fs::write(&broken, "{ settleDelayMs: ").unwrap();
        assert!(matches!(
            load_config(Some(&broken)).unwrap_err(),
            ConfigError::Parse { .. }
        ));
    }
}
