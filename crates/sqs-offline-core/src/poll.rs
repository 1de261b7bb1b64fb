//! The receive loop run for every resolved queue.

use std::sync::Arc;

use tokio::task::JoinHandle;
use url::Url;

use crate::error::{Error, Result};
use crate::event::build_event;
use crate::handler::Handler;
use crate::mapper::QueueDescriptor;
use crate::sqs::{InboundMessage, QueueService, ReceiveRequest};

/// Points a queue url at the configured endpoint, keeping its path.
///
/// The queue service announces urls with the host it believes it runs on
/// (`http://localhost:9324/queue/q`), which is not always the address it is
/// reachable at (`http://elasticmq:9324` from another container).
pub fn rewrite_queue_url(queue_url: &str, endpoint: Option<&str>) -> String {
    let (Some(endpoint), Ok(mut url)) = (endpoint, Url::parse(queue_url)) else {
        return queue_url.to_string();
    };
    let Ok(endpoint) = Url::parse(endpoint) else {
        return queue_url.to_string();
    };

    if url.origin() == endpoint.origin() {
        return queue_url.to_string();
    }

    let path = url.path().to_string();
    let query = url.query().map(str::to_string);
    url = endpoint;
    url.set_path(&path);
    url.set_query(query.as_deref());
    url.to_string()
}

/// Settings shared by every loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    pub endpoint: Option<String>,
    pub region: String,
    pub delete_after_dispatch: bool,
}

/// Polls one queue forever, handing every non-empty batch to its handler.
pub struct PollLoop {
    client: Arc<dyn QueueService>,
    descriptor: QueueDescriptor,
    handler: Arc<dyn Handler>,
    settings: PollSettings,
}

impl PollLoop {
    pub fn new(
        client: Arc<dyn QueueService>,
        descriptor: QueueDescriptor,
        handler: Arc<dyn Handler>,
        settings: PollSettings,
    ) -> Self {
        Self {
            client,
            descriptor,
            handler,
            settings,
        }
    }

    pub fn descriptor(&self) -> &QueueDescriptor {
        &self.descriptor
    }

    pub fn receive_request(&self) -> ReceiveRequest {
        let queue_url = self.descriptor.queue_url.as_deref().unwrap_or_default();
        ReceiveRequest::all_attributes(
            rewrite_queue_url(queue_url, self.settings.endpoint.as_deref()),
            self.descriptor.batch_size,
        )
    }

    /// One receive call, dispatching what it returned. Returns the number of
    /// messages received.
    pub async fn poll_once(&self) -> Result<usize> {
        let request = self.receive_request();
        let messages = self.client.receive_messages(&request).await?;
        let count = messages.len();

        if count > 0 {
            log::debug!("received {count} messages from {}", self.descriptor.queue_name);
            self.dispatch(messages, &request.queue_url).await?;
        }

        Ok(count)
    }

    async fn dispatch(&self, messages: Vec<InboundMessage>, queue_url: &str) -> Result<()> {
        if !self.settings.delete_after_dispatch {
            let event = build_event(&self.descriptor, messages, &self.settings.region);
            let handler = self.handler.clone();
            let handler_path = self.descriptor.handler_path.clone();
            tokio::spawn(async move {
                if let Err(e) = handler.handle(event).await {
                    log::error!("handler {handler_path} failed: {e:#}");
                }
            });
            return Ok(());
        }

        let event = build_event(&self.descriptor, messages.clone(), &self.settings.region);
        match self.handler.handle(event).await {
            Ok(()) => {
                // undeleted messages are redelivered once their visibility times out
                if let Err(e) = self.client.delete_message_batch(&messages, queue_url).await {
                    log::error!("{e}");
                }
                Ok(())
            }
            // left on the queue, it becomes visible again
            Err(e) => {
                log::error!(
                    "{}",
                    Error::Handler {
                        handler_path: self.descriptor.handler_path.clone(),
                        message: format!("{e:#}"),
                    }
                );
                Ok(())
            }
        }
    }

    /// Polls until a receive fails.
    pub async fn run(self) -> Result<()> {
        log::info!(
            "polling {} for {}",
            self.descriptor.queue_name,
            self.descriptor.handler_path
        );
        loop {
            self.poll_once().await?;
        }
    }

    /// Runs the loop on its own task. A failing loop logs its error and stops
    /// without affecting the others.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let queue_name = self.descriptor.queue_name.clone();
            if let Err(e) = self.run().await {
                log::error!("stopped polling {queue_name}: {e}");
            }
        })
    }
}
