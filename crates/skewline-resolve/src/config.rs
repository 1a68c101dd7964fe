//! Resolution pass configuration

use std::time::Duration;

use serde::{Deserialize, Deserializer};
use skewline_core::{SkewError, SkewResult};

/// Environment variable overriding [`ResolveConfig::tolerance`]
pub const ENV_TOLERANCE: &str = "SKEWLINE_TOLERANCE";
/// Environment variable overriding [`ResolveConfig::workers`]
pub const ENV_WORKERS: &str = "SKEWLINE_WORKERS";
/// Environment variable overriding [`ResolveConfig::deadline`]
pub const ENV_DEADLINE: &str = "SKEWLINE_DEADLINE";

/// Resolution pass configuration
///
/// Durations are written in humantime form (`"2s"`, `"1500ms"`, `"5m"`).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolveConfig {
    /// Noise tolerance. Paired deltas must agree within it, and a skew
    /// must exceed it to be confirmed.
    #[serde(deserialize_with = "de_duration")]
    pub tolerance: Duration,
    /// Threads used by the pairwise sweep (1 = sequential)
    pub workers: usize,
    /// Wall-clock bound for a whole pass
    #[serde(deserialize_with = "de_opt_duration")]
    pub deadline: Option<Duration>,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        ResolveConfig {
            tolerance: Duration::from_secs(2),
            workers: 1,
            deadline: None,
        }
    }
}

impl ResolveConfig {
    /// Parse from JSON; absent fields take their defaults
    pub fn from_json(json: &str) -> SkewResult<Self> {
        let config: ResolveConfig =
            serde_json::from_str(json).map_err(|e| SkewError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden from the process environment
    pub fn from_env() -> SkewResult<Self> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a key lookup (environment-style keys)
    pub fn with_overrides<F>(mut self, lookup: F) -> SkewResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_TOLERANCE) {
            self.tolerance = parse_duration(ENV_TOLERANCE, &raw)?;
        }
        if let Some(raw) = lookup(ENV_WORKERS) {
            self.workers = raw.trim().parse().map_err(|e| {
                SkewError::InvalidConfig(format!("{}: {:?}: {}", ENV_WORKERS, raw, e))
            })?;
        }
        if let Some(raw) = lookup(ENV_DEADLINE) {
            self.deadline = match raw.trim() {
                "" | "none" => None,
                value => Some(parse_duration(ENV_DEADLINE, value)?),
            };
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> SkewResult<()> {
        if self.tolerance.is_zero() {
            return Err(SkewError::InvalidConfig("tolerance must be non-zero".into()));
        }
        if self.workers == 0 {
            return Err(SkewError::InvalidConfig("workers must be at least 1".into()));
        }
        Ok(())
    }

    pub fn with_tolerance(mut self, tolerance: Duration) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

fn parse_duration(key: &str, raw: &str) -> SkewResult<Duration> {
    humantime::parse_duration(raw.trim())
        .map_err(|e| SkewError::InvalidConfig(format!("{}: {:?}: {}", key, raw, e)))
}

fn de_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
}

fn de_opt_duration<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) => humantime::parse_duration(&raw)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ResolveConfig::default();
        assert_eq!(config.tolerance, Duration::from_secs(2));
        assert_eq!(config.workers, 1);
        assert_eq!(config.deadline, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json() {
        let config =
            ResolveConfig::from_json(r#"{"tolerance": "1500ms", "workers": 4, "deadline": "30s"}"#)
                .unwrap();
        assert_eq!(config.tolerance, Duration::from_millis(1500));
        assert_eq!(config.workers, 4);
        assert_eq!(config.deadline, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_from_json_partial() {
        let config = ResolveConfig::from_json(r#"{"workers": 2}"#).unwrap();
        assert_eq!(config.tolerance, Duration::from_secs(2));
        assert_eq!(config.workers, 2);
    }

    #[test]
    fn test_from_json_rejects_bad_values() {
        assert!(matches!(
            ResolveConfig::from_json(r#"{"tolerance": "soon"}"#),
            Err(SkewError::InvalidConfig(_))
        ));
        assert!(matches!(
            ResolveConfig::from_json(r#"{"workers": 0}"#),
            Err(SkewError::InvalidConfig(_))
        ));
        assert!(matches!(
            ResolveConfig::from_json(r#"{"tolerence": "2s"}"#),
            Err(SkewError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_TOLERANCE, "500ms"),
            (ENV_WORKERS, "3"),
            (ENV_DEADLINE, "1m"),
        ]
        .into_iter()
        .collect();

        let config = ResolveConfig::default()
            .with_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.tolerance, Duration::from_millis(500));
        assert_eq!(config.workers, 3);
        assert_eq!(config.deadline, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_override_errors() {
        let result = ResolveConfig::default().with_overrides(|key| {
            (key == ENV_WORKERS).then(|| "many".to_string())
        });
        assert!(matches!(result, Err(SkewError::InvalidConfig(_))));
    }
}
