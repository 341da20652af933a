use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, RowmapError};
use crate::index::NameTransform;
use crate::mapper::DEFAULT_ANNOTATION_KEY;
use crate::statement::PlaceholderFormat;

/// Settings loadable from a `rowmap.toml`:
///
/// ```toml
/// [mapper]
/// annotation_key = "db"
/// name_transform = "snake_case"
///
/// [statement]
/// placeholder = "dollar"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowmapConfig {
    #[serde(default)]
    pub mapper: MapperSettings,
    #[serde(default)]
    pub statement: StatementSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapperSettings {
    #[serde(default = "default_annotation_key")]
    pub annotation_key: String,
    #[serde(default)]
    pub name_transform: NameTransformSetting,
}

impl Default for MapperSettings {
    fn default() -> Self {
        Self {
            annotation_key: default_annotation_key(),
            name_transform: NameTransformSetting::default(),
        }
    }
}

fn default_annotation_key() -> String {
    DEFAULT_ANNOTATION_KEY.to_string()
}

/// Serializable subset of [`NameTransform`]; custom functions are code-only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameTransformSetting {
    #[default]
    Identity,
    Lowercase,
    SnakeCase,
}

impl From<NameTransformSetting> for NameTransform {
    fn from(setting: NameTransformSetting) -> Self {
        match setting {
            NameTransformSetting::Identity => NameTransform::Identity,
            NameTransformSetting::Lowercase => NameTransform::Lowercase,
            NameTransformSetting::SnakeCase => NameTransform::SnakeCase,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementSettings {
    #[serde(default)]
    pub placeholder: PlaceholderFormat,
}

impl RowmapConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|err| RowmapError::Config {
            message: err.to_string(),
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|err| RowmapError::Config {
            message: format!("failed to read {}: {err}", path.display()),
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|err| RowmapError::Config {
            message: err.to_string(),
        })
    }
}
