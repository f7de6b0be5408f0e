//! Component and loader errors.

use crate::port::PortError;
use thiserror::Error;

/// Failures raised while a component processes packets.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComponentError {
  /// Component-specific failure.
  #[error("{0}")]
  Process(String),
  /// A port operation failed.
  #[error(transparent)]
  Port(#[from] PortError),
  /// A port the component relies on does not exist.
  #[error("port '{0}' not found")]
  NoPort(String),
  /// The in-flight task counter was decremented below zero.
  #[error("load of component '{0}' cannot be negative")]
  NegativeLoad(String),
}

impl ComponentError {
  /// Builds a [`ComponentError::Process`] from any message.
  pub fn process(message: impl Into<String>) -> Self {
    ComponentError::Process(message.into())
  }
}
