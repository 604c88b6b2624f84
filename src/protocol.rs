use serde::{Deserialize, Serialize};

/// Message sent from the supervisor to the server process, one JSON
/// object per line on the child's stdin.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ControlMessage {
    /// Asset change notification: the server should tell its connected
    /// clients to reload in place.
    #[serde(rename = "debugRefresh", skip_serializing_if = "Option::is_none")]
    pub debug_refresh: Option<bool>,
    /// A command entered on the supervisor's console.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cli: Option<String>,
}

impl ControlMessage {
    pub fn debug_refresh() -> Self {
        Self {
            debug_refresh: Some(true),
            cli: None,
        }
    }

    pub fn cli(line: impl Into<String>) -> Self {
        Self {
            debug_refresh: None,
            cli: Some(line.into()),
        }
    }
}

/// Notice sent from the server back to the supervisor on its stdout.
/// Unknown fields are rejected so the server's own JSON log lines pass
/// through as plain output instead of being consumed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ChildNotice {
    /// The server finished handling a command and wants the console
    /// prompt redrawn.
    #[serde(default)]
    pub prompt: bool,
}

impl ChildNotice {
    /// Parse a child stdout line as a notice. Returns None for anything
    /// that is not an actionable notice, leaving the line to passthrough.
    pub fn parse(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if !trimmed.starts_with('{') {
            return None;
        }
        serde_json::from_str::<Self>(trimmed)
            .ok()
            .filter(|notice| notice.prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_refresh_wire_shape() {
        let json = serde_json::to_string(&ControlMessage::debug_refresh()).unwrap();
        assert_eq!(json, r#"{"debugRefresh":true}"#);
    }

    #[test]
    fn cli_wire_shape() {
        let json = serde_json::to_string(&ControlMessage::cli("stats")).unwrap();
        assert_eq!(json, r#"{"cli":"stats"}"#);
    }

    #[test]
    fn control_message_roundtrip() {
        let msg = ControlMessage::cli("restart workers");
        let json = serde_json::to_string(&msg).unwrap();
        let parsed: ControlMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(msg, parsed);
    }

    #[test]
    fn prompt_notice_parses() {
        let notice = ChildNotice::parse(r#"{"prompt":true}"#).unwrap();
        assert!(notice.prompt);
    }

    #[test]
    fn prompt_notice_tolerates_surrounding_whitespace() {
        assert!(ChildNotice::parse("  {\"prompt\":true}\r").is_some());
    }

    #[test]
    fn plain_log_line_is_not_a_notice() {
        assert!(ChildNotice::parse("GET /index.html 200").is_none());
    }

    #[test]
    fn json_log_line_with_other_fields_is_not_a_notice() {
        assert!(ChildNotice::parse(r#"{"level":"info","msg":"started"}"#).is_none());
    }

    #[test]
    fn prompt_false_is_not_actionable() {
        assert!(ChildNotice::parse(r#"{"prompt":false}"#).is_none());
        assert!(ChildNotice::parse("{}").is_none());
    }
}
