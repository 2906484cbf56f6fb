use std::path::Path;

use anyhow::{bail, Context};
use serde::Deserialize;
use serde_json::Value;
use spg::{GrammarFormat, MatchConfig};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutputKind {
    /// Indented text, one match attempt per line.
    #[default]
    Tree,
    Json,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Config {
    pub format: GrammarFormat,
    pub max_depth: Option<u32>,
    pub output: OutputKind,
    pub rule_matches_only: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            format: GrammarFormat::Auto,
            max_depth: None,
            output: OutputKind::Tree,
            rule_matches_only: true,
        }
    }
}

impl Config {
    pub fn new(mut value: Value) -> anyhow::Result<Self> {
        let Value::Object(fields) = &mut value else {
            bail!("config is not a json object");
        };

        let defaults = Config::default();
        let config = Config {
            format: read_field(fields, "format")?.unwrap_or(defaults.format),
            max_depth: read_field(fields, "maxDepth")?,
            output: read_field(fields, "output")?.unwrap_or(defaults.output),
            rule_matches_only: read_field(fields, "ruleMatchesOnly")?
                .unwrap_or(defaults.rule_matches_only),
        };

        if let Some(name) = fields.keys().next() {
            bail!("Unknown field config.{name}");
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config `{}`", path.display()))?;
        let value = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config `{}`", path.display()))?;
        Self::new(value)
    }

    pub fn match_config(&self) -> MatchConfig {
        let mut config = MatchConfig::default();
        if let Some(max_depth) = self.max_depth {
            config.max_depth = max_depth;
        }
        config
    }
}

fn read_field<T: for<'de> Deserialize<'de>>(
    fields: &mut serde_json::Map<String, Value>,
    name: &str,
) -> anyhow::Result<Option<T>> {
    let Some(field) = fields.remove(name) else {
        return Ok(None);
    };

    let typename = std::any::type_name::<T>();
    serde_json::from_value::<T>(field.clone())
        .map(Some)
        .with_context(|| format!("Expected type {typename} for config.{name}, got {field}"))
}
