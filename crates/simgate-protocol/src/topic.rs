//! The fixed destinations an interface gateway publishes on.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Destination carrying sim clock broadcasts.
pub const CLOCK_TOPIC: &str = "/topic/SimSig";

/// Destination carrying train movement reports for all operating companies.
pub const MOVEMENT_TOPIC: &str = "/topic/TRAIN_MVT_ALL_TOC";

/// The gateway topics the supervisor subscribes to.
///
/// Both destinations are fixed by the gateway protocol; they are not
/// configurable per sim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    /// Sim clock updates.
    Clock,

    /// Train movement reports.
    Movement,
}

impl Topic {
    /// Subscription order used when a connection comes up: clock first,
    /// movements second.
    pub const ALL: [Topic; 2] = [Topic::Clock, Topic::Movement];

    /// Classifies a destination string.
    ///
    /// Returns `None` for destinations the supervisor never subscribed to;
    /// messages on those are dropped.
    pub fn from_destination(destination: &str) -> Option<Self> {
        match destination {
            CLOCK_TOPIC => Some(Self::Clock),
            MOVEMENT_TOPIC => Some(Self::Movement),
            _ => None,
        }
    }

    /// Returns the destination string for this topic.
    #[must_use]
    pub fn destination(&self) -> &'static str {
        match self {
            Self::Clock => CLOCK_TOPIC,
            Self::Movement => MOVEMENT_TOPIC,
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.destination())
    }
}
