//! The queue service seen by the engine, and its implementation on top of the
//! AWS SDK SQS client.

use std::collections::BTreeMap;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_sqs as sqs;
use base64::Engine;
use serde::Serialize;
use sqs::error::SdkError;
use sqs::types::{DeleteMessageBatchRequestEntry, MessageSystemAttributeName, QueueAttributeName};

use crate::config::SqsClientConfig;
use crate::error::{Error, Result};

/// Requests every system attribute, or every message attribute.
pub const ALL_ATTRIBUTES: &str = "All";

/// Long-poll wait of every receive call, in seconds.
pub const RECEIVE_WAIT_SECONDS: i32 = 10;

/// Parameters of a single `ReceiveMessage` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveRequest {
    pub queue_url: String,
    pub max_messages: i32,
    pub attribute_names: Vec<String>,
    pub message_attribute_names: Vec<String>,
    pub wait_seconds: i32,
}

impl ReceiveRequest {
    /// Long-poll request for up to `max_messages`, asking for all attributes.
    pub fn all_attributes(queue_url: impl Into<String>, max_messages: i32) -> Self {
        Self {
            queue_url: queue_url.into(),
            max_messages,
            attribute_names: vec![ALL_ATTRIBUTES.to_string()],
            message_attribute_names: vec![ALL_ATTRIBUTES.to_string()],
            wait_seconds: RECEIVE_WAIT_SECONDS,
        }
    }
}

/// A message as received from the queue service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InboundMessage {
    pub message_id: String,
    pub receipt_handle: String,
    pub body: String,
    pub attributes: BTreeMap<String, String>,
    pub message_attributes: BTreeMap<String, MessageAttribute>,
    #[serde(rename = "MD5OfBody")]
    pub md5_of_body: String,
}

/// A custom message attribute. Binary values are kept base64 encoded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageAttribute {
    pub string_value: Option<String>,
    pub binary_value: Option<String>,
    pub data_type: String,
}

impl InboundMessage {
    /// Converts an AWS SDK message. Missing fields are left empty.
    ///
    /// # See Also
    ///
    /// - [AWS SQS Message API Reference](https://docs.aws.amazon.com/AWSSimpleQueueService/latest/APIReference/API_Message.html)
    pub fn from_aws_message(message: sqs::types::Message) -> Self {
        Self {
            message_id: message.message_id.unwrap_or_default(),
            receipt_handle: message.receipt_handle.unwrap_or_default(),
            body: message.body.unwrap_or_default(),
            attributes: message
                .attributes
                .unwrap_or_default()
                .into_iter()
                .map(|(name, value)| (name.as_str().to_string(), value))
                .collect(),
            message_attributes: message
                .message_attributes
                .unwrap_or_default()
                .into_iter()
                .map(|(name, value)| {
                    let attribute = MessageAttribute {
                        string_value: value.string_value().map(str::to_string),
                        binary_value: value
                            .binary_value()
                            .map(|blob| base64::engine::general_purpose::STANDARD.encode(blob.as_ref())),
                        data_type: value.data_type().to_string(),
                    };
                    (name, attribute)
                })
                .collect(),
            md5_of_body: message.md5_of_body.unwrap_or_default(),
        }
    }
}

/// The operations the engine needs from a queue service.
#[async_trait]
pub trait QueueService: Send + Sync {
    /// Creates a queue, returning its url. Creating an existing queue with the
    /// same attributes succeeds.
    async fn create_queue(&self, name: &str, attributes: &BTreeMap<String, String>)
        -> Result<String>;

    /// Fails when no queue with this name exists.
    async fn get_queue_url(&self, name: &str) -> Result<String>;

    async fn receive_messages(&self, request: &ReceiveRequest) -> Result<Vec<InboundMessage>>;

    async fn delete_message_batch(&self, messages: &[InboundMessage], queue_url: &str)
        -> Result<()>;
}

/// Builds the SDK configuration for a local queue service.
///
/// When an endpoint is configured the static `test` credentials accepted by
/// ElasticMQ and LocalStack are used, otherwise credentials come from the
/// environment.
pub async fn load_sdk_config(config: &SqsClientConfig) -> SdkConfig {
    if let Some(api_version) = &config.api_version {
        log::debug!("ignoring apiVersion {api_version}, the SDK pins its own");
    }

    let mut loader =
        aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));

    if let Some(endpoint) = &config.endpoint {
        loader = loader
            .endpoint_url(endpoint)
            .credentials_provider(sqs::config::Credentials::new(
                "test", "test", None, None, "static",
            ));
    }

    loader.load().await
}

/// [`QueueService`] backed by the AWS SDK SQS client.
///
/// # Example
///
/// ```no_run
/// use sqs_offline::{SqsClientConfig, SqsQueueService, QueueService};
///
/// # async fn example() -> sqs_offline::Result<()> {
/// let service = SqsQueueService::connect(&SqsClientConfig {
///     api_version: None,
///     endpoint: Some("http://localhost:9324".to_string()),
///     region: "eu-west-1".to_string(),
/// })
/// .await;
///
/// let url = service.get_queue_url("queue1").await?;
/// println!("{url}");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SqsQueueService {
    /// The AWS SDK configuration used for SQS operations
    pub config: SdkConfig,
    /// The SQS client instance
    pub client: sqs::Client,
}

impl SqsQueueService {
    pub fn from_config(config: SdkConfig) -> Self {
        let client = sqs::Client::new(&config);
        Self { config, client }
    }

    pub async fn connect(config: &SqsClientConfig) -> Self {
        Self::from_config(load_sdk_config(config).await)
    }
}

// Prefer the service's own message over the generic "service error".
fn sdk_message<E: std::fmt::Display, R>(e: &SdkError<E, R>) -> String {
    match e {
        SdkError::ServiceError(se) => se.err().to_string(),
        other => other.to_string(),
    }
}

#[async_trait]
impl QueueService for SqsQueueService {
    async fn create_queue(
        &self,
        name: &str,
        attributes: &BTreeMap<String, String>,
    ) -> Result<String> {
        let mut request = self.client.create_queue().queue_name(name);
        for (key, value) in attributes {
            request = request.attributes(QueueAttributeName::from(key.as_str()), value);
        }

        let output = request.send().await.map_err(|e| Error::CreateQueue {
            name: name.to_string(),
            message: sdk_message(&e),
        })?;

        Ok(output.queue_url.unwrap_or_default())
    }

    async fn get_queue_url(&self, name: &str) -> Result<String> {
        let output = self
            .client
            .get_queue_url()
            .queue_name(name)
            .send()
            .await
            .map_err(|e| Error::GetQueueUrl {
                name: name.to_string(),
                message: sdk_message(&e),
            })?;

        output.queue_url.ok_or_else(|| Error::GetQueueUrl {
            name: name.to_string(),
            message: "response carried no QueueUrl".to_string(),
        })
    }

    async fn receive_messages(&self, request: &ReceiveRequest) -> Result<Vec<InboundMessage>> {
        let mut call = self
            .client
            .receive_message()
            .queue_url(&request.queue_url)
            .max_number_of_messages(request.max_messages)
            .wait_time_seconds(request.wait_seconds);
        for name in &request.attribute_names {
            call = call.message_system_attribute_names(MessageSystemAttributeName::from(name.as_str()));
        }
        for name in &request.message_attribute_names {
            call = call.message_attribute_names(name);
        }

        let output = call.send().await.map_err(|e| Error::Receive {
            queue_url: request.queue_url.clone(),
            message: sdk_message(&e),
        })?;

        Ok(output
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(InboundMessage::from_aws_message)
            .collect())
    }

    async fn delete_message_batch(
        &self,
        messages: &[InboundMessage],
        queue_url: &str,
    ) -> Result<()> {
        // SQS rejects empty batches
        if messages.is_empty() {
            return Ok(());
        }

        let entries = messages
            .iter()
            .map(|message| {
                DeleteMessageBatchRequestEntry::builder()
                    .id(&message.message_id)
                    .receipt_handle(&message.receipt_handle)
                    .build()
                    .map_err(|e| Error::DeleteMessages {
                        queue_url: queue_url.to_string(),
                        message: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        self.client
            .delete_message_batch()
            .queue_url(queue_url)
            .set_entries(Some(entries))
            .send()
            .await
            .map_err(|e| Error::DeleteMessages {
                queue_url: queue_url.to_string(),
                message: sdk_message(&e),
            })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqs::primitives::Blob;
    use sqs::types::{Message, MessageAttributeValue};

    #[test]
    fn receive_request_asks_for_everything() {
        let request = ReceiveRequest::all_attributes("http://localhost:9324/queue/q", 7);

        assert_eq!(request.max_messages, 7);
        assert_eq!(request.wait_seconds, 10);
        assert_eq!(request.attribute_names, vec!["All"]);
        assert_eq!(request.message_attribute_names, vec!["All"]);
    }

    #[test]
    fn converts_aws_messages() {
        let message = Message::builder()
            .message_id("048b40b2-ae41-45d7-98af-965942fb43ec")
            .receipt_handle("handle")
            .body("hello")
            .md5_of_body("5d41402abc4b2a76b9719d911017c592")
            .attributes(MessageSystemAttributeName::ApproximateReceiveCount, "1")
            .message_attributes(
                "kind",
                MessageAttributeValue::builder()
                    .data_type("String")
                    .string_value("greeting")
                    .build()
                    .unwrap(),
            )
            .message_attributes(
                "raw",
                MessageAttributeValue::builder()
                    .data_type("Binary")
                    .binary_value(Blob::new(b"hi".to_vec()))
                    .build()
                    .unwrap(),
            )
            .build();

        let inbound = InboundMessage::from_aws_message(message);

        assert_eq!(inbound.message_id, "048b40b2-ae41-45d7-98af-965942fb43ec");
        assert_eq!(inbound.receipt_handle, "handle");
        assert_eq!(inbound.body, "hello");
        assert_eq!(inbound.md5_of_body, "5d41402abc4b2a76b9719d911017c592");
        assert_eq!(inbound.attributes["ApproximateReceiveCount"], "1");
        assert_eq!(
            inbound.message_attributes["kind"].string_value.as_deref(),
            Some("greeting")
        );
        assert_eq!(inbound.message_attributes["raw"].binary_value.as_deref(), Some("aGk="));
        assert_eq!(inbound.message_attributes["raw"].data_type, "Binary");
    }

    #[test]
    fn missing_fields_become_empty() {
        let inbound = InboundMessage::from_aws_message(Message::builder().build());
        assert_eq!(inbound, InboundMessage::default());
    }
}
