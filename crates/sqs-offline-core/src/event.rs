//! The Lambda SQS event handed to handlers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::mapper::QueueDescriptor;
use crate::sqs::{InboundMessage, MessageAttribute};

pub const EVENT_SOURCE: &str = "aws:sqs";

/// Account id of the ARNs synthesized for queues referenced by name.
pub const TEST_ACCOUNT_ID: &str = "000000000000";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqsEvent {
    #[serde(rename = "Records")]
    pub records: Vec<SqsRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqsRecord {
    pub message_id: String,
    pub receipt_handle: String,
    pub body: String,
    pub attributes: BTreeMap<String, String>,
    pub message_attributes: BTreeMap<String, SqsMessageAttribute>,
    pub md5_of_body: String,
    pub event_source: String,
    #[serde(rename = "eventSourceARN")]
    pub event_source_arn: String,
    pub aws_region: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqsMessageAttribute {
    pub string_value: Option<String>,
    pub binary_value: Option<String>,
    pub data_type: String,
}

impl From<MessageAttribute> for SqsMessageAttribute {
    fn from(attribute: MessageAttribute) -> Self {
        Self {
            string_value: attribute.string_value,
            binary_value: attribute.binary_value,
            data_type: attribute.data_type,
        }
    }
}

/// The literal ARN of the event when there is one, otherwise an ARN built
/// from the region and the queue name.
pub fn event_source_arn(descriptor: &QueueDescriptor, region: &str) -> String {
    match descriptor.arn.as_arn() {
        Some(arn) => arn.to_string(),
        None => format!(
            "arn:aws:sqs:{region}:{TEST_ACCOUNT_ID}:{}",
            descriptor.queue_name
        ),
    }
}

/// One record per message, in receive order.
pub fn build_event(
    descriptor: &QueueDescriptor,
    messages: Vec<InboundMessage>,
    region: &str,
) -> SqsEvent {
    let event_source_arn = event_source_arn(descriptor, region);

    SqsEvent {
        records: messages
            .into_iter()
            .map(|message| SqsRecord {
                message_id: message.message_id,
                receipt_handle: message.receipt_handle,
                body: message.body,
                attributes: message.attributes,
                message_attributes: message
                    .message_attributes
                    .into_iter()
                    .map(|(name, attribute)| (name, attribute.into()))
                    .collect(),
                md5_of_body: message.md5_of_body,
                event_source: EVENT_SOURCE.to_string(),
                event_source_arn: event_source_arn.clone(),
                aws_region: region.to_string(),
            })
            .collect(),
    }
}
