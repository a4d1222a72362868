use std::time::Duration;

use super::error::ConfigError;
use crate::protocol::layout;

pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Tunables for one acquisition run.
///
/// # Examples
/// ```
/// use std::time::Duration;
///
/// use peaktech_core::AcquisitionConfig;
///
/// let config = AcquisitionConfig::default()
///     .with_byte_budget(64)
///     .unwrap()
///     .with_read_timeout(Duration::from_millis(200));
/// assert_eq!(config.byte_budget(), 64);
/// assert!(AcquisitionConfig::default().with_byte_budget(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquisitionConfig {
    byte_budget: usize,
    read_timeout: Duration,
}

impl AcquisitionConfig {
    pub fn new(byte_budget: usize, read_timeout: Duration) -> Result<Self, ConfigError> {
        Self::default()
            .with_byte_budget(byte_budget)
            .map(|config| config.with_read_timeout(read_timeout))
    }

    /// Maximum number of discarded reads while hunting for a frame start.
    pub fn with_byte_budget(self, byte_budget: usize) -> Result<Self, ConfigError> {
        if byte_budget == 0 {
            return Err(ConfigError::ZeroBudget);
        }
        Ok(Self {
            byte_budget,
            ..self
        })
    }

    /// Upper bound handed to every `ByteSource::read_byte` call.
    pub fn with_read_timeout(self, read_timeout: Duration) -> Self {
        Self {
            read_timeout,
            ..self
        }
    }

    pub fn byte_budget(&self) -> usize {
        self.byte_budget
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            byte_budget: layout::DEFAULT_SYNC_BUDGET,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::AcquisitionConfig;
    use crate::acquisition::error::ConfigError;

    #[test]
    fn defaults_match_device_behaviour() {
        let config = AcquisitionConfig::default();
        assert_eq!(config.byte_budget(), 32);
        assert_eq!(config.read_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn zero_budget_is_rejected() {
        assert_eq!(
            AcquisitionConfig::new(0, Duration::ZERO),
            Err(ConfigError::ZeroBudget)
        );
    }
}
