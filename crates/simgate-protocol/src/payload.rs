//! Classification of gateway message bodies.
//!
//! Gateway payloads are JSON objects whose *shape* decides the route: a
//! clock broadcast carries a `clock_msg` field, a movement report carries
//! `train_location`. Field presence is the sole filter condition - anything
//! else on a subscribed topic (train delay reports, future message kinds)
//! is classified as [`TopicPayload::Ignored`] and dropped quietly.

use crate::topic::Topic;
use serde_json::Value;
use thiserror::Error;

/// Discriminant field of a clock broadcast.
pub const CLOCK_FIELD: &str = "clock_msg";

/// Discriminant field of a train movement report.
pub const MOVEMENT_FIELD: &str = "train_location";

/// What a decoded gateway message means to the supervisor.
#[derive(Debug, Clone, PartialEq)]
pub enum TopicPayload {
    /// A clock broadcast. Carries the raw `clock_msg` value, forwarded
    /// opaquely - the collaborator decides how to interpret it.
    Clock(Value),

    /// A train movement report. Carries the *entire* message, not just the
    /// `train_location` field, because consumers want the full report.
    Movement(Value),

    /// Valid JSON that carries neither discriminant. Not an error.
    Ignored,
}

/// Errors raised while decoding a gateway message body.
#[derive(Error, Debug)]
pub enum PayloadError {
    /// The body was not valid JSON.
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Decodes a message body received on a subscribed topic.
///
/// # Errors
///
/// Returns [`PayloadError::Json`] when the body does not parse; the caller
/// logs and discards, nothing escalates.
pub fn decode(topic: Topic, body: &str) -> Result<TopicPayload, PayloadError> {
    let value: Value = serde_json::from_str(body)?;

    let payload = match topic {
        Topic::Clock => match value.get(CLOCK_FIELD) {
            Some(clock) => TopicPayload::Clock(clock.clone()),
            None => TopicPayload::Ignored,
        },
        Topic::Movement => {
            if value.get(MOVEMENT_FIELD).is_some() {
                TopicPayload::Movement(value)
            } else {
                // Train delay reports arrive on the same destination
                // without a train_location field.
                TopicPayload::Ignored
            }
        }
    };

    Ok(payload)
}
