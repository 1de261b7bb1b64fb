use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ServiceConfig;

/// The `arn` of an `sqs` event: a literal ARN, an `Fn::GetAtt` reference to a
/// resource of the service, or something this crate does not understand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueueReference {
    Arn(String),
    GetAtt {
        #[serde(rename = "Fn::GetAtt")]
        get_att: Vec<String>,
    },
    Other(Value),
}

impl Default for QueueReference {
    fn default() -> Self {
        QueueReference::Other(Value::Null)
    }
}

impl QueueReference {
    pub fn from_value(value: Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or(QueueReference::Other(value))
    }

    /// The literal ARN, if this reference is one.
    pub fn as_arn(&self) -> Option<&str> {
        match self {
            QueueReference::Arn(arn) => Some(arn),
            _ => None,
        }
    }
}

/// Resolves a queue reference to the name of the queue it designates.
///
/// Returns an empty string when the reference cannot be resolved: an
/// `Fn::GetAtt` on a missing resource, a resource that is not a queue or that
/// has no `QueueName`, or an unknown shape. Such descriptors are dropped later
/// when their url lookup fails.
pub fn resolve_queue_name(reference: &QueueReference, service: &ServiceConfig) -> String {
    match reference {
        QueueReference::Arn(arn) => arn.rsplit(':').next().unwrap_or_default().to_string(),
        QueueReference::GetAtt { get_att } => get_att
            .first()
            .and_then(|logical_name| service.resource(logical_name))
            .filter(|resource| resource.is_queue())
            .and_then(|resource| resource.queue_name())
            .unwrap_or_default()
            .to_string(),
        QueueReference::Other(_) => String::new(),
    }
}
