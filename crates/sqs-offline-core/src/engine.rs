use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::config::{ServiceConfig, SqsClientConfig, SqsOfflineConfig};
use crate::error::Result;
use crate::handler::HandlerRegistry;
use crate::mapper::{map_functions_to_descriptors, QueueDescriptor};
use crate::poll::{PollLoop, PollSettings};
use crate::provision::provision_queues;
use crate::resolve::{resolve_queue_urls_with, WarningSink};
use crate::sqs::QueueService;

/// Starts polling the queues of a serverless service.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use sqs_offline::{handler_fn, HandlerRegistry, ServiceConfig, SqsOffline, SqsQueueService};
///
/// # async fn example() -> sqs_offline::Result<()> {
/// let service = ServiceConfig::from_path("serverless.yml".as_ref())?;
/// let client = SqsQueueService::connect(&service.custom_config().client_config()).await;
/// let handlers = HandlerRegistry::new().with_fallback(handler_fn(|event| async move {
///     println!("{} records", event.records.len());
///     Ok(())
/// }));
///
/// let offline = SqsOffline::new(service, ".", Arc::new(client), handlers);
/// for handle in offline.initialize().await {
///     let _ = handle.await;
/// }
/// # Ok(())
/// # }
/// ```
pub struct SqsOffline {
    service: ServiceConfig,
    service_path: String,
    client: Arc<dyn QueueService>,
    handlers: HandlerRegistry,
    warnings: Option<WarningSink>,
}

impl SqsOffline {
    pub fn new(
        service: ServiceConfig,
        service_path: impl Into<String>,
        client: Arc<dyn QueueService>,
        handlers: HandlerRegistry,
    ) -> Self {
        Self {
            service,
            service_path: service_path.into(),
            client,
            handlers,
            warnings: None,
        }
    }

    /// Also hands every missing-queue warning to `sink`.
    pub fn with_warning_sink(mut self, sink: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.warnings = Some(Arc::new(sink));
        self
    }

    pub fn service(&self) -> &ServiceConfig {
        &self.service
    }

    pub fn custom_config(&self) -> &SqsOfflineConfig {
        self.service.custom_config()
    }

    pub fn sqs_client_config(&self) -> SqsClientConfig {
        self.custom_config().client_config()
    }

    pub fn descriptors(&self) -> Vec<QueueDescriptor> {
        map_functions_to_descriptors(&self.service, &self.service_path)
    }

    /// Descriptors of the queues that exist, with their url.
    pub async fn resolved_descriptors(&self) -> Vec<QueueDescriptor> {
        let ignore = |_: &str| {};
        let warn: &(dyn Fn(&str) + Send + Sync) = match &self.warnings {
            Some(sink) => sink.as_ref(),
            None => &ignore,
        };
        resolve_queue_urls_with(self.client.as_ref(), self.descriptors(), warn).await
    }

    fn poll_settings(&self) -> PollSettings {
        let custom = self.custom_config();
        PollSettings {
            endpoint: custom.endpoint.clone(),
            region: custom.region().to_string(),
            delete_after_dispatch: custom.delete_after_dispatch,
        }
    }

    /// Provisions the declared queues when `autoCreate` is set, resolves every
    /// queue url and spawns one poll loop per resolved queue.
    ///
    /// Queues without a registered handler are skipped.
    pub async fn start(&self) -> Result<Vec<JoinHandle<()>>> {
        if self.custom_config().auto_create {
            provision_queues(self.client.as_ref(), &self.service.queues_from_resources()).await?;
        }

        let settings = self.poll_settings();
        let handles = self
            .resolved_descriptors()
            .await
            .into_iter()
            .filter_map(|descriptor| {
                let Some(handler) = self.handlers.resolve(&descriptor.handler_path) else {
                    log::error!(
                        "no handler registered for {}, not polling {}",
                        descriptor.handler_path,
                        descriptor.queue_name
                    );
                    return None;
                };
                let poll = PollLoop::new(
                    self.client.clone(),
                    descriptor,
                    handler,
                    settings.clone(),
                );
                Some(poll.spawn())
            })
            .collect();

        Ok(handles)
    }

    /// [`SqsOffline::start`], logging instead of returning a failure. A
    /// failure starts no loop.
    pub async fn initialize(&self) -> Vec<JoinHandle<()>> {
        match self.start().await {
            Ok(handles) => handles,
            Err(e) => {
                log::error!("Error in serverless-offline-sqs: {e}");
                Vec::new()
            }
        }
    }
}
