//! # RepeatAsync Component
//!
//! Forwards packets from `in` to `out` through an [`AsyncComponent`], after an
//! optional delay.

use crate::component::{AsyncComponent, AsyncHandler, ComponentError};
use crate::port::OutPort;
use async_trait::async_trait;
use serde_json::Value;
use std::rc::Rc;
use std::time::Duration;

/// Asynchronous pass-through handler.
#[derive(Debug, Clone, Default)]
pub struct RepeatAsync {
  delay: Option<Duration>,
}

impl RepeatAsync {
  /// Handler forwarding after `delay`.
  pub fn new(delay: Option<Duration>) -> Self {
    Self { delay }
  }

  /// Component instance forwarding after `delay`.
  pub fn create(delay: Option<Duration>) -> Rc<AsyncComponent<RepeatAsync>> {
    AsyncComponent::new(Self::new(delay), "Forwards packets asynchronously")
  }
}

#[async_trait(?Send)]
impl AsyncHandler for RepeatAsync {
  async fn do_async(&self, data: Value, output: &OutPort) -> Result<(), ComponentError> {
    if let Some(delay) = self.delay {
      tokio::time::sleep(delay).await;
    }
    output.send(data, None)?;
    Ok(())
  }
}
