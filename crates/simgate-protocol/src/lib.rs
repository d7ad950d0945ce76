//! Simgate Protocol - Gateway topic and payload definitions
//!
//! This crate pins down the message-level contract of a SimSig interface
//! gateway: which topics exist, how messages on them are classified, and
//! the frame summaries a broker client reports back. It deliberately stops
//! short of the STOMP wire protocol itself - framing and transport live in
//! whatever client implementation the supervisor is given.

pub mod frame;
pub mod payload;
pub mod topic;

pub use frame::{ConnectedFrame, ErrorFrame};
pub use payload::{decode, PayloadError, TopicPayload, CLOCK_FIELD, MOVEMENT_FIELD};
pub use topic::{Topic, CLOCK_TOPIC, MOVEMENT_TOPIC};
