//! Notifications emitted by a running [`Network`](crate::network::Network).

use crate::port::{IpEvent, SocketEndpoint};
use chrono::{DateTime, Duration, Utc};

/// One IP event observed on a network socket.
#[derive(Debug, Clone, PartialEq)]
pub struct IpActivity {
  /// Socket id, `A OUT -> IN B` or `DATA -> IN B`.
  pub socket_id: String,
  /// Source endpoint, `None` for initializers and defaults.
  pub from: Option<SocketEndpoint>,
  /// Target endpoint.
  pub to: Option<SocketEndpoint>,
  /// Path of subgraph node ids, outermost first. Empty for the network's own sockets.
  pub subgraph: Vec<String>,
  /// The event.
  pub ip: IpEvent,
}

/// A network notification.
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkEvent {
  /// The first connection of a run opened.
  Start {
    /// When the run started.
    start: DateTime<Utc>,
  },
  /// All connections stayed closed for the debounce period.
  End {
    /// When the run started.
    start: DateTime<Utc>,
    /// When the run ended.
    end: DateTime<Utc>,
    /// Run duration.
    uptime: Duration,
  },
  /// A process changed its icon.
  Icon {
    /// Node id.
    id: String,
    /// New icon.
    icon: String,
  },
  /// IP traffic.
  Ip(IpActivity),
  /// A process callback failed.
  ProcessError {
    /// Node id.
    id: String,
    /// Inport the failing event arrived on.
    port: String,
    /// Error message.
    error: String,
    /// Path of subgraph node ids, outermost first.
    subgraph: Vec<String>,
  },
}

impl NetworkEvent {
  /// Event name.
  pub fn name(&self) -> &'static str {
    match self {
      NetworkEvent::Start { .. } => "start",
      NetworkEvent::End { .. } => "end",
      NetworkEvent::Icon { .. } => "icon",
      NetworkEvent::Ip(_) => "ip",
      NetworkEvent::ProcessError { .. } => "process-error",
    }
  }
}
