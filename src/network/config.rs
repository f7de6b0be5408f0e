//! Network tuning knobs.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a [`Network`](crate::network::Network).
///
/// ```rust
/// use flowweave::network::NetworkConfig;
/// use std::time::Duration;
///
/// let config = NetworkConfig::default()
///   .with_end_debounce(Duration::from_millis(50))
///   .with_batch_size(20);
/// assert!(config.send_defaults);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
  /// Quiet period after the last connection closes before `End` fires (default: 10ms).
  pub end_debounce: Duration,
  /// Wiring operations performed between cooperative yields while connecting (default: 100).
  pub batch_size: usize,
  /// Whether `start` delivers inport defaults (default: true).
  pub send_defaults: bool,
}

impl Default for NetworkConfig {
  fn default() -> Self {
    Self {
      end_debounce: Duration::from_millis(10),
      batch_size: 100,
      send_defaults: true,
    }
  }
}

impl NetworkConfig {
  /// Sets the end debounce period.
  #[must_use]
  pub fn with_end_debounce(mut self, debounce: Duration) -> Self {
    self.end_debounce = debounce;
    self
  }

  /// Sets the connect batch size. Zero is treated as one.
  #[must_use]
  pub fn with_batch_size(mut self, size: usize) -> Self {
    self.batch_size = size.max(1);
    self
  }

  /// Sets whether defaults are delivered on start.
  #[must_use]
  pub fn with_send_defaults(mut self, send_defaults: bool) -> Self {
    self.send_defaults = send_defaults;
    self
  }
}
