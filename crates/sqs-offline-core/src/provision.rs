use std::collections::BTreeMap;

use crate::config::ResourceDefinition;
use crate::error::{Error, Result};
use crate::sqs::QueueService;

/// Attributes a queue resource is created with. Deduplication is only
/// meaningful for FIFO queues, so it is only set for them.
pub fn queue_attributes(
    fifo_queue: bool,
    content_based_deduplication: bool,
) -> BTreeMap<String, String> {
    let mut attributes = BTreeMap::new();
    if fifo_queue {
        attributes.insert("FifoQueue".to_string(), "true".to_string());
        attributes.insert(
            "ContentBasedDeduplication".to_string(),
            content_based_deduplication.to_string(),
        );
    }
    attributes
}

/// Creates the queue of every definition, one after the other.
///
/// The first failure stops provisioning and is returned.
pub async fn provision_queues(
    client: &dyn QueueService,
    definitions: &[&ResourceDefinition],
) -> Result<&'static str> {
    for definition in definitions {
        let name = definition.queue_name().ok_or_else(|| {
            Error::Config("an AWS::SQS::Queue resource has no QueueName".to_string())
        })?;

        let attributes = queue_attributes(
            definition.fifo_queue(),
            definition.content_based_deduplication(),
        );

        let url = client.create_queue(name, &attributes).await?;
        log::info!("created queue {name} at {url}");
    }

    Ok("Done")
}
