//! # Trigger Requests
//!
//! `trigger` accepts two call shapes: a combined `"topic:verb"` address, or
//! topic and verb given separately. Both normalize to the same publish call.

use crate::error::DispatchError;
use crate::event::EventSpec;
use serde_json::Value;

/// A trigger request in either accepted shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    /// `"topic:verb"` plus payload.
    Combined { spec: String, data: Value },
    /// Topic and verb given separately, plus payload.
    Split {
        topic: String,
        verb: String,
        data: Value,
    },
}

/// Normalized form handed to `publish`.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub topic: String,
    pub verb: String,
    pub data: Value,
}

impl Trigger {
    pub fn combined(spec: impl Into<String>, data: impl Into<Value>) -> Self {
        Self::Combined {
            spec: spec.into(),
            data: data.into(),
        }
    }

    pub fn split(
        topic: impl Into<String>,
        verb: impl Into<String>,
        data: impl Into<Value>,
    ) -> Self {
        Self::Split {
            topic: topic.into(),
            verb: verb.into(),
            data: data.into(),
        }
    }

    /// Resolve to a single (topic, verb, data) triple.
    ///
    /// A combined spec without a verb resolves to the wildcard verb, which
    /// `publish` then rejects. A split request whose topic already carries a
    /// `:verb` is ambiguous.
    pub fn normalize(self) -> Result<Normalized, DispatchError> {
        match self {
            Self::Combined { spec, data } => {
                let EventSpec { topic, verb } = EventSpec::parse(&spec);
                Ok(Normalized { topic, verb, data })
            }
            Self::Split { topic, .. } if topic.contains(':') => {
                Err(DispatchError::AmbiguousTriggerArguments { spec: topic })
            }
            Self::Split { topic, verb, data } => Ok(Normalized { topic, verb, data }),
        }
    }
}
