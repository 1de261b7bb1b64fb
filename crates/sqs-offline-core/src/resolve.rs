use std::sync::Arc;

use futures::future::join_all;

use crate::mapper::QueueDescriptor;
use crate::sqs::QueueService;

/// The last path segment of a queue url, which is the queue name for both
/// AWS (`/{account}/{name}`) and ElasticMQ (`/queue/{name}`).
pub fn queue_name_of_url(queue_url: &str) -> &str {
    queue_url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
}

/// Outcome of looking up the url of every descriptor.
#[derive(Debug, Default, PartialEq)]
pub struct Resolution {
    /// Descriptors whose queue exists, with their `queue_url` set.
    pub resolved: Vec<QueueDescriptor>,
    /// Descriptors whose queue could not be found.
    pub missing: Vec<QueueDescriptor>,
}

/// Looks up every queue url concurrently and waits for all lookups, so one
/// missing queue does not hide the others.
///
/// Urls are matched back to descriptors by queue name, whatever host the
/// queue service put in them.
pub async fn partition_queue_urls(
    client: &dyn QueueService,
    descriptors: Vec<QueueDescriptor>,
) -> Resolution {
    let lookups = descriptors
        .iter()
        .map(|descriptor| client.get_queue_url(&descriptor.queue_name));

    let urls: Vec<String> = join_all(lookups)
        .await
        .into_iter()
        .filter_map(|result| match result {
            Ok(url) => Some(url),
            Err(e) => {
                log::debug!("{e}");
                None
            }
        })
        .collect();

    let mut resolution = Resolution::default();
    for descriptor in descriptors {
        match urls
            .iter()
            .find(|url| queue_name_of_url(url) == descriptor.queue_name)
        {
            Some(url) => resolution.resolved.push(descriptor.with_queue_url(url.as_str())),
            None => resolution.missing.push(descriptor),
        }
    }

    resolution
}

pub fn missing_queue_warning(queue_name: &str) -> String {
    format!(
        "Your queue with name \"{queue_name}\" is not created. \
         Either list it in Resources and set \"autoCreate\" to true or create it manually in elasticmq. \
         It is ignored for now and you won't receive any of its messages."
    )
}

/// Receives the warning of every queue that does not exist, on top of the
/// `log::warn!` each one gets.
pub type WarningSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Resolves the url of every descriptor, warning about each queue that does
/// not exist. Only the resolved descriptors are returned.
pub async fn resolve_queue_urls(
    client: &dyn QueueService,
    descriptors: Vec<QueueDescriptor>,
) -> Vec<QueueDescriptor> {
    resolve_queue_urls_with(client, descriptors, &|_: &str| {}).await
}

/// [`resolve_queue_urls`], also handing every warning to `warn`.
pub async fn resolve_queue_urls_with(
    client: &dyn QueueService,
    descriptors: Vec<QueueDescriptor>,
    warn: &(dyn Fn(&str) + Send + Sync),
) -> Vec<QueueDescriptor> {
    let Resolution { resolved, missing } = partition_queue_urls(client, descriptors).await;

    for descriptor in &missing {
        let warning = missing_queue_warning(&descriptor.queue_name);
        log::warn!("{warning}");
        warn(&warning);
    }

    resolved
}
