//! Live reload message protocol.
//!
//! JSON text frames sent from the dev server to browser clients, tagged by
//! `type`:
//!
//! - `connected`: handshake done, carries the server version
//! - `reload`: reload the page
//! - `css`: stylesheets changed, swap them in place
//! - `error` / `clear_error`: show or hide the error overlay

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReloadMessage {
    Connected {
        version: String,
    },

    Reload {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    /// URL paths of rewritten stylesheets, e.g. `/css/main.min.css`.
    Css {
        paths: Vec<String>,
    },

    /// A stage failed; `stage` is the task name.
    Error {
        stage: String,
        message: String,
    },

    #[serde(rename = "clear_error")]
    ClearError,
}

impl ReloadMessage {
    pub fn connected() -> Self {
        Self::Connected {
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn reload(reason: impl Into<String>) -> Self {
        Self::Reload {
            reason: Some(reason.into()),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"type":"reload"}"#.to_string())
    }

    #[cfg(test)]
    pub fn from_json(s: &str) -> Option<Self> {
        serde_json::from_str(s).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        assert_eq!(
            ReloadMessage::reload("dist/index.html").to_json(),
            r#"{"type":"reload","reason":"dist/index.html"}"#
        );
        assert_eq!(
            ReloadMessage::Reload { reason: None }.to_json(),
            r#"{"type":"reload"}"#
        );
        assert_eq!(
            ReloadMessage::Css {
                paths: vec!["/css/main.min.css".into()]
            }
            .to_json(),
            r#"{"type":"css","paths":["/css/main.min.css"]}"#
        );
        assert_eq!(ReloadMessage::ClearError.to_json(), r#"{"type":"clear_error"}"#);
    }

    #[test]
    fn test_error_message() {
        let msg = ReloadMessage::Error {
            stage: "compile-styles".into(),
            message: "expected \"}\"".into(),
        };
        let json = msg.to_json();
        assert!(json.starts_with(r#"{"type":"error","stage":"compile-styles""#));
        assert_eq!(ReloadMessage::from_json(&json), Some(msg));
    }

    #[test]
    fn test_connected_carries_version() {
        let json = ReloadMessage::connected().to_json();
        assert!(json.contains(env!("CARGO_PKG_VERSION")));
        assert!(matches!(
            ReloadMessage::from_json(&json),
            Some(ReloadMessage::Connected { .. })
        ));
    }
}
