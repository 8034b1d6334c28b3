//! Cache configuration from the environment and command-line overrides

use crate::error::{CliError, Result};
use std::path::PathBuf;
use std::time::Duration;
use transcript_cache::CacheConfig;

/// Load configuration from environment variables, falling back to defaults
pub fn load_config() -> CacheConfig {
    config_from_vars(|name| std::env::var(name).ok())
}

fn config_from_vars(var: impl Fn(&str) -> Option<String>) -> CacheConfig {
    let defaults = CacheConfig::default();

    let cache_dir = var("CACHE_DIR")
        .map(PathBuf::from)
        .unwrap_or(defaults.cache_dir);

    let max_age = var("CACHE_MAX_AGE_SECS")
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(defaults.max_age);

    let max_total_size = var("CACHE_MAX_SIZE")
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(defaults.max_total_size);

    CacheConfig {
        cache_dir,
        max_age,
        max_total_size,
    }
}

/// Overrides given on the command line
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub cache_dir: Option<PathBuf>,
    pub max_age_secs: Option<u64>,
    pub max_size: Option<u64>,
}

impl Overrides {
    pub fn apply(self, mut config: CacheConfig) -> Result<CacheConfig> {
        if let Some(dir) = self.cache_dir {
            config.cache_dir = dir;
        }
        if let Some(secs) = self.max_age_secs {
            config.max_age = Duration::from_secs(secs);
        }
        if let Some(size) = self.max_size {
            config.max_total_size = size;
        }

        if config.max_total_size == 0 {
            return Err(CliError::Config(
                "max cache size must be greater than zero".to_string(),
            ));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = config_from_vars(vars(&[]));
        let defaults = CacheConfig::default();
        assert_eq!(config.cache_dir, defaults.cache_dir);
        assert_eq!(config.max_age, defaults.max_age);
        assert_eq!(config.max_total_size, defaults.max_total_size);
    }

    #[test]
    fn test_env_values() {
        let config = config_from_vars(vars(&[
            ("CACHE_DIR", "/var/cache/transcripts"),
            ("CACHE_MAX_AGE_SECS", "3600"),
            ("CACHE_MAX_SIZE", "10240"),
        ]));
        assert_eq!(config.cache_dir, PathBuf::from("/var/cache/transcripts"));
        assert_eq!(config.max_age, Duration::from_secs(3600));
        assert_eq!(config.max_total_size, 10240);
    }

    #[test]
    fn test_unparseable_env_falls_back() {
        let config = config_from_vars(vars(&[
            ("CACHE_MAX_AGE_SECS", "a week"),
            ("CACHE_MAX_SIZE", "-1"),
        ]));
        assert_eq!(config.max_age, CacheConfig::default().max_age);
        assert_eq!(config.max_total_size, CacheConfig::default().max_total_size);
    }

    #[test]
    fn test_overrides_win() {
        let base = config_from_vars(vars(&[("CACHE_MAX_SIZE", "10240")]));
        let config = Overrides {
            cache_dir: Some(PathBuf::from("/tmp/override")),
            max_age_secs: Some(60),
            max_size: Some(2048),
        }
        .apply(base)
        .unwrap();

        assert_eq!(config.cache_dir, PathBuf::from("/tmp/override"));
        assert_eq!(config.max_age, Duration::from_secs(60));
        assert_eq!(config.max_total_size, 2048);
    }

    #[test]
    fn test_zero_max_size_rejected() {
        let result = Overrides {
            max_size: Some(0),
            ..Default::default()
        }
        .apply(CacheConfig::default());
        assert!(matches!(result, Err(CliError::Config(_))));
    }
}
