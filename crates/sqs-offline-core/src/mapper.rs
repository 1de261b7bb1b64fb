use serde::Serialize;

use crate::config::{FunctionDefinition, ServiceConfig, DEFAULT_BATCH_SIZE};
use crate::queue_name::{resolve_queue_name, QueueReference};

/// One function bound to one queue.
///
/// Built once per `sqs` event, given its `queue_url` once the queue service
/// knows the queue, then owned by the poll loop of that queue.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueDescriptor {
    pub batch_size: i32,
    pub arn: QueueReference,
    pub queue_name: String,
    pub handler_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_url: Option<String>,
}

impl QueueDescriptor {
    pub fn with_queue_url(self, queue_url: impl Into<String>) -> Self {
        Self {
            queue_url: Some(queue_url.into()),
            ..self
        }
    }
}

/// `handler` of a function, relative to the service root.
pub fn function_handler_path(service_path: &str, handler: &str) -> String {
    format!("{service_path}/{handler}")
}

/// Descriptors for every `sqs` event of one function, in event order.
pub fn function_descriptors(
    function: &FunctionDefinition,
    service: &ServiceConfig,
    service_path: &str,
) -> Vec<QueueDescriptor> {
    let handler_path = function_handler_path(service_path, &function.handler);

    function
        .sqs_events()
        .into_iter()
        .map(|event| QueueDescriptor {
            batch_size: event
                .batch_size
                .filter(|size| *size > 0)
                .unwrap_or(DEFAULT_BATCH_SIZE),
            queue_name: resolve_queue_name(&event.arn, service),
            arn: event.arn,
            handler_path: handler_path.clone(),
            queue_url: None,
        })
        .collect()
}

/// Descriptors for every queue-consuming function of the service, in function
/// declaration order and then event order.
pub fn map_functions_to_descriptors(
    service: &ServiceConfig,
    service_path: &str,
) -> Vec<QueueDescriptor> {
    service
        .sqs_functions()
        .into_iter()
        .flat_map(|function| function_descriptors(function, service, service_path))
        .collect()
}
