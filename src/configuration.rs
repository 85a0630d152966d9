use crate::error::ConfigurationError;
use std::time::Duration;

/// Longest accepted averaging window, in seconds.
pub const MAX_AVERAGING_WINDOW: f32 = 3600.0;

#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ProfilerConfiguration {
    /// Length of the averaging window in seconds.
    pub averaging_window: f32,
    /// Sleep between polls while waiting for last frame's data.
    pub poll_interval_ms: u64,
    /// Give up on a frame after this many polls. Waits indefinitely when absent.
    pub max_poll_attempts: Option<u32>,
}

impl Default for ProfilerConfiguration {
    fn default() -> Self {
        Self {
            averaging_window: 0.5,
            poll_interval_ms: 1,
            max_poll_attempts: None,
        }
    }
}

impl ProfilerConfiguration {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !self.averaging_window.is_finite() || self.averaging_window < 0.0 {
            return Err(ConfigurationError::Invalid(format!(
                "averaging_window must be a finite, non-negative number of seconds, got {}",
                self.averaging_window
            )));
        }
        if self.averaging_window > MAX_AVERAGING_WINDOW {
            return Err(ConfigurationError::Invalid(format!(
                "averaging_window must be at most {} seconds, got {}",
                MAX_AVERAGING_WINDOW, self.averaging_window
            )));
        }
        if self.max_poll_attempts == Some(0) {
            return Err(ConfigurationError::Invalid(
                "max_poll_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// The averaging window clamped to `0..=MAX_AVERAGING_WINDOW` seconds. Non-finite values map to 0.
    pub fn averaging_window(&self) -> Duration {
        if self.averaging_window.is_finite() && self.averaging_window > 0.0 {
            Duration::from_secs_f32(self.averaging_window.min(MAX_AVERAGING_WINDOW))
        } else {
            Duration::from_secs(0)
        }
    }

    #[inline]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

pub fn parse<T: serde::de::DeserializeOwned>(contents: &str) -> Result<T, ConfigurationError> {
    Ok(toml::from_str(contents)?)
}

pub fn read<T: serde::de::DeserializeOwned>(configuration_path: impl AsRef<std::path::Path>) -> Result<T, ConfigurationError> {
    let configuration_path = configuration_path.as_ref();
    let contents = std::fs::read_to_string(configuration_path).map_err(|source| ConfigurationError::Read {
        path: configuration_path.to_path_buf(),
        source,
    })?;
    parse(&contents)
}
