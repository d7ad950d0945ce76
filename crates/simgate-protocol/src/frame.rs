//! Summaries of broker frames as reported by a client implementation.
//!
//! These are not wire types. A broker client parses its own frames and
//! hands the supervisor just enough to log and to drive link state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Summary of the CONNECTED frame that completed a broker session.
///
/// All fields are optional: clients differ in what they surface, and the
/// supervisor only uses these for logging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectedFrame {
    /// Negotiated protocol version (e.g. "1.2").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Server identification header, if the broker sent one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,

    /// Broker-assigned session identifier, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
}

impl ConnectedFrame {
    /// Creates a frame summary carrying only the negotiated version.
    pub fn with_version(version: impl Into<String>) -> Self {
        Self {
            version: Some(version.into()),
            ..Self::default()
        }
    }
}

impl fmt::Display for ConnectedFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "version={}", self.version.as_deref().unwrap_or("?"))?;
        if let Some(server) = &self.server {
            write!(f, " server={server}")?;
        }
        if let Some(session) = &self.session {
            write!(f, " session={session}")?;
        }
        Ok(())
    }
}

/// Summary of a broker ERROR frame.
///
/// Broker errors are advisory: the session may well survive them, so the
/// supervisor logs the summary and changes nothing else.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorFrame {
    /// The `message` header of the ERROR frame.
    pub message: String,

    /// Frame body, when the broker included one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl ErrorFrame {
    /// Creates an error summary from the frame's message header.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            body: None,
        }
    }

    /// Attaches the frame body, consuming and returning the summary.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

impl fmt::Display for ErrorFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.body {
            Some(body) => write!(f, "{}: {body}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}
