use serde::Deserialize;

pub const DEFAULT_MAX_DEPTH: u32 = 256;

/// Knobs of the matcher.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatchConfig {
    /// Deepest nesting of match attempts before matching is aborted.
    pub max_depth: u32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl MatchConfig {
    pub fn from_json(value: serde_json::Value) -> Result<MatchConfig, serde_json::Error> {
        serde_json::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_from_json() {
        let config = MatchConfig::from_json(json!({ "maxDepth": 10 })).unwrap();
        assert_eq!(config.max_depth, 10);

        let config = MatchConfig::from_json(json!({})).unwrap();
        assert_eq!(config, MatchConfig::default());

        assert!(MatchConfig::from_json(json!({ "maxDepth": "deep" })).is_err());
    }
}
