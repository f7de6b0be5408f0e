//! Per-port configuration.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Declared datatype tag of a port.
///
/// The tag is descriptive: packets are not validated against it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Datatype {
  /// Any packet.
  #[default]
  All,
  /// Text.
  String,
  /// Any number.
  Number,
  /// Integer.
  Int,
  /// JSON object.
  Object,
  /// JSON array.
  Array,
  /// Boolean.
  Boolean,
  /// Color string.
  Color,
  /// Date string.
  Date,
  /// Signal without meaningful payload.
  Bang,
  /// Callable reference.
  Function,
  /// Binary payload.
  Buffer,
}

/// Options a component declares for one of its ports.
///
/// ```rust
/// use flowweave::port::{Datatype, PortOptions};
/// use serde_json::json;
///
/// let options = PortOptions::new(Datatype::Int)
///   .with_required(true)
///   .with_default(json!(3));
/// assert!(options.required);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortOptions {
  /// Datatype tag.
  pub datatype: Datatype,
  /// Human readable description.
  pub description: String,
  /// Fan-out fails when nothing is attached.
  pub required: bool,
  /// Sockets are addressed by index (array port).
  pub addressable: bool,
  /// Incoming events are queued for `receive` instead of dispatched.
  pub buffered: bool,
  /// The last value sent per index is replayed to sockets attached later.
  pub caching: bool,
  /// Packet delivered on start when no data has arrived.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub default: Option<Value>,
}

impl PortOptions {
  /// Options with the given datatype and everything else off.
  pub fn new(datatype: Datatype) -> Self {
    Self {
      datatype,
      ..Self::default()
    }
  }

  /// Sets the description.
  #[must_use]
  pub fn with_description(mut self, description: impl Into<String>) -> Self {
    self.description = description.into();
    self
  }

  /// Sets the `required` flag.
  #[must_use]
  pub fn with_required(mut self, required: bool) -> Self {
    self.required = required;
    self
  }

  /// Sets the `addressable` flag.
  #[must_use]
  pub fn with_addressable(mut self, addressable: bool) -> Self {
    self.addressable = addressable;
    self
  }

  /// Sets the `buffered` flag.
  #[must_use]
  pub fn with_buffered(mut self, buffered: bool) -> Self {
    self.buffered = buffered;
    self
  }

  /// Sets the `caching` flag.
  #[must_use]
  pub fn with_caching(mut self, caching: bool) -> Self {
    self.caching = caching;
    self
  }

  /// Sets the default packet.
  #[must_use]
  pub fn with_default(mut self, value: Value) -> Self {
    self.default = Some(value);
    self
  }
}
