//! The serverless service document this crate reads: the plugin's custom
//! block, the function declarations and the CloudFormation resources.
//!
//! Declaration order of functions and resources is preserved, since both the
//! provisioning order and the descriptor order follow it.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::queue_name::QueueReference;

/// Key of the plugin block under `custom`.
pub const CUSTOM_KEY: &str = "serverless-offline-sqs";

/// CloudFormation type tag of an SQS queue resource.
pub const SQS_QUEUE_TYPE: &str = "AWS::SQS::Queue";

/// Region used when the custom block does not name one.
pub const DEFAULT_REGION: &str = "eu-west-1";

/// Receive batch size used when an event does not declare one.
pub const DEFAULT_BATCH_SIZE: i32 = 10;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub custom: CustomConfig,
    #[serde(default)]
    pub functions: IndexMap<String, FunctionDefinition>,
    #[serde(default)]
    pub resources: ResourcesBlock,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomConfig {
    #[serde(rename = "serverless-offline-sqs", default)]
    pub sqs: SqsOfflineConfig,
}

/// Options recognized in `custom.serverless-offline-sqs`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqsOfflineConfig {
    /// Create the queues declared in `resources` before polling.
    #[serde(default)]
    pub auto_create: bool,
    pub api_version: Option<String>,
    /// Base URL of the queue service, e.g. `http://localhost:9324`.
    pub endpoint: Option<String>,
    pub region: Option<String>,
    /// Await the handler and delete the batch once it succeeded. Off by
    /// default: messages stay on the queue and become visible again.
    #[serde(default)]
    pub delete_after_dispatch: bool,
}

impl SqsOfflineConfig {
    pub fn region(&self) -> &str {
        self.region.as_deref().unwrap_or(DEFAULT_REGION)
    }

    pub fn client_config(&self) -> SqsClientConfig {
        SqsClientConfig {
            api_version: self.api_version.clone(),
            endpoint: self.endpoint.clone(),
            region: self.region().to_string(),
        }
    }
}

/// The subset of the custom block needed to build a queue-service client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SqsClientConfig {
    pub api_version: Option<String>,
    pub endpoint: Option<String>,
    pub region: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FunctionDefinition {
    #[serde(default)]
    pub handler: String,
    #[serde(default)]
    pub events: Vec<Value>,
}

/// One `sqs` entry of a function's `events` list.
#[derive(Debug, Clone, PartialEq)]
pub struct SqsEventDefinition {
    pub arn: QueueReference,
    pub batch_size: Option<i32>,
}

impl FunctionDefinition {
    /// True when at least one event carries an `sqs` key.
    pub fn consumes_queues(&self) -> bool {
        self.events.iter().any(|event| event.get("sqs").is_some())
    }

    /// The `sqs` events of this function, in declaration order.
    ///
    /// Both the long form (`sqs: { arn, batchSize }`) and the short form
    /// (`sqs: <arn>`) are accepted.
    pub fn sqs_events(&self) -> Vec<SqsEventDefinition> {
        self.events
            .iter()
            .filter_map(|event| event.get("sqs"))
            .map(|sqs| match sqs {
                Value::String(arn) => SqsEventDefinition {
                    arn: QueueReference::Arn(arn.clone()),
                    batch_size: None,
                },
                other => SqsEventDefinition {
                    arn: other
                        .get("arn")
                        .cloned()
                        .map(QueueReference::from_value)
                        .unwrap_or_default(),
                    batch_size: other
                        .get("batchSize")
                        .and_then(Value::as_i64)
                        .and_then(|n| i32::try_from(n).ok()),
                },
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResourcesBlock {
    #[serde(rename = "Resources", default)]
    pub resources: IndexMap<String, ResourceDefinition>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ResourceDefinition {
    #[serde(rename = "Type", default)]
    pub resource_type: String,
    #[serde(rename = "Properties", default)]
    pub properties: Value,
}

impl ResourceDefinition {
    pub fn is_queue(&self) -> bool {
        self.resource_type == SQS_QUEUE_TYPE
    }

    pub fn queue_name(&self) -> Option<&str> {
        self.properties.get("QueueName").and_then(Value::as_str)
    }

    pub fn fifo_queue(&self) -> bool {
        truthy(self.properties.get("FifoQueue"))
    }

    pub fn content_based_deduplication(&self) -> bool {
        truthy(self.properties.get("ContentBasedDeduplication"))
    }
}

// CloudFormation accepts both `true` and `"true"`.
fn truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// Rewrites tagged values into the long form CloudFormation also accepts:
/// `!GetAtt Queue1.Arn` becomes `Fn::GetAtt: [Queue1, Arn]`, `!Ref X` becomes
/// `Ref: X` and any other `!Tag value` becomes `Fn::Tag: value`.
fn expand_intrinsics(value: serde_yaml::Value) -> serde_yaml::Value {
    use serde_yaml::Value as Yaml;

    match value {
        Yaml::Tagged(tagged) => {
            let serde_yaml::value::TaggedValue { tag, value } = *tagged;
            let tag = tag.to_string();
            let name = tag.trim_start_matches('!');
            let value = expand_intrinsics(value);

            let (key, value) = match (name, value) {
                ("GetAtt", Yaml::String(target)) => {
                    let parts = match target.split_once('.') {
                        Some((resource, attribute)) => vec![resource, attribute],
                        None => vec![target.as_str()],
                    };
                    let parts = parts
                        .into_iter()
                        .map(|part| Yaml::String(part.to_string()))
                        .collect();
                    ("Fn::GetAtt".to_string(), Yaml::Sequence(parts))
                }
                ("Ref", value) => ("Ref".to_string(), value),
                (name, value) => (format!("Fn::{name}"), value),
            };

            let mut mapping = serde_yaml::Mapping::new();
            mapping.insert(Yaml::String(key), value);
            Yaml::Mapping(mapping)
        }
        Yaml::Sequence(items) => {
            Yaml::Sequence(items.into_iter().map(expand_intrinsics).collect())
        }
        Yaml::Mapping(mapping) => Yaml::Mapping(
            mapping
                .into_iter()
                .map(|(key, value)| (key, expand_intrinsics(value)))
                .collect(),
        ),
        other => other,
    }
}

impl ServiceConfig {
    /// Loads a service document, picking the format from the file extension.
    /// Anything that is not `.json` is read as YAML.
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&contents),
            _ => Self::from_yaml_str(&contents),
        }
    }

    /// Parses a YAML service document. Short-form intrinsics (`!GetAtt`,
    /// `!Ref`, `!Sub`...) are read as their long form.
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let document: serde_yaml::Value =
            serde_yaml::from_str(contents).map_err(|e| Error::Config(e.to_string()))?;
        serde_yaml::from_value(expand_intrinsics(document))
            .map_err(|e| Error::Config(e.to_string()))
    }

    pub fn from_json_str(contents: &str) -> Result<Self> {
        serde_json::from_str(contents).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn custom_config(&self) -> &SqsOfflineConfig {
        &self.custom.sqs
    }

    pub fn resource(&self, logical_name: &str) -> Option<&ResourceDefinition> {
        self.resources.resources.get(logical_name)
    }

    /// Names of the functions with at least one `sqs` event, in declaration order.
    pub fn select_queue_consuming_functions(&self) -> Vec<&str> {
        self.functions
            .iter()
            .filter(|(_, function)| function.consumes_queues())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn sqs_functions(&self) -> Vec<&FunctionDefinition> {
        self.select_queue_consuming_functions()
            .into_iter()
            .filter_map(|name| self.functions.get(name))
            .collect()
    }

    /// The `AWS::SQS::Queue` resources, in declaration order.
    pub fn queues_from_resources(&self) -> Vec<&ResourceDefinition> {
        self.resources
            .resources
            .values()
            .filter(|resource| resource.is_queue())
            .collect()
    }
}
