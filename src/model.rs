use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

/// Settings for the polling console, built from CLI arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    pub base_url: String,
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    pub user_agent: String,
}

/// Settings for the agent backend, built from CLI arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServeConfig {
    pub bind: SocketAddr,
    #[serde(with = "humantime_serde")]
    pub behavior_period: Duration,
    #[serde(with = "humantime_serde")]
    pub startup_grace: Duration,
}

/// Whether the run and stop actions are currently permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonStates {
    pub start_enabled: bool,
    pub stop_enabled: bool,
}

impl ButtonStates {
    /// Flags while no agents are running.
    pub fn idle() -> Self {
        Self {
            start_enabled: true,
            stop_enabled: false,
        }
    }

    /// Flags while the agents are running.
    pub fn running() -> Self {
        Self {
            start_enabled: false,
            stop_enabled: true,
        }
    }
}

/// Backend endpoints the console talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    LogMessages,
    ButtonStates,
    RunAgents,
    StopAgents,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::LogMessages => "/log_messages",
            Endpoint::ButtonStates => "/button_states",
            Endpoint::RunAgents => "/run_agents",
            Endpoint::StopAgents => "/stop_agents",
        }
    }

    /// Prefix used when a request to this endpoint fails.
    pub fn failure_label(self) -> &'static str {
        match self {
            Endpoint::LogMessages => "Error fetching log messages",
            Endpoint::ButtonStates => "Error fetching button states",
            Endpoint::RunAgents | Endpoint::StopAgents => "Error",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Completed requests, delivered to the page owner in arrival order.
#[derive(Debug, Clone)]
pub enum ConsoleEvent {
    LogMessages(Vec<String>),
    ButtonStates(ButtonStates),
    RunAgentsReply(String),
    StopAgentsReply(String),
    Info(InfoEvent),
}

/// Structured info events emitted by the controller and consumed by front ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InfoEvent {
    Message(String),
    FetchFailed { endpoint: Endpoint, error: String },
}

impl InfoEvent {
    /// Render a human-readable message for front ends.
    pub fn to_message(&self) -> String {
        match self {
            InfoEvent::Message(msg) => msg.clone(),
            InfoEvent::FetchFailed { endpoint, error } => {
                format!("{}: {}", endpoint.failure_label(), error)
            }
        }
    }
}

/// A message exchanged between agents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
}

impl AgentMessage {
    pub fn custom(content: impl Into<String>) -> Self {
        Self {
            kind: "custom".into(),
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_states_use_camel_case_fields() {
        let parsed: ButtonStates =
            serde_json::from_str(r#"{"startEnabled": true, "stopEnabled": false}"#).unwrap();
        assert_eq!(parsed, ButtonStates::idle());

        let json = serde_json::to_value(ButtonStates::running()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"startEnabled": false, "stopEnabled": true})
        );
    }

    #[test]
    fn button_states_reject_missing_field() {
        assert!(serde_json::from_str::<ButtonStates>(r#"{"startEnabled": true}"#).is_err());
    }

    #[test]
    fn agent_message_serializes_kind_as_type() {
        let json = serde_json::to_string(&AgentMessage::custom("hello sun")).unwrap();
        assert_eq!(json, r#"{"type":"custom","content":"hello sun"}"#);
    }

    #[test]
    fn fetch_failure_message_is_prefixed_per_endpoint() {
        let info = InfoEvent::FetchFailed {
            endpoint: Endpoint::LogMessages,
            error: "connection refused".into(),
        };
        assert_eq!(
            info.to_message(),
            "Error fetching log messages: connection refused"
        );
        let info = InfoEvent::FetchFailed {
            endpoint: Endpoint::StopAgents,
            error: "timed out".into(),
        };
        assert_eq!(info.to_message(), "Error: timed out");
    }
}
