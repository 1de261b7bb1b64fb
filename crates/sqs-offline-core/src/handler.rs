//! Handlers invoked with the events of a queue, looked up by handler path.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::event::SqsEvent;

#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, event: SqsEvent) -> anyhow::Result<()>;
}

/// Adapts an async closure into a [`Handler`].
pub struct HandlerFn<F>(pub F);

pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(SqsEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    HandlerFn(f)
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(SqsEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn handle(&self, event: SqsEvent) -> anyhow::Result<()> {
        (self.0)(event).await
    }
}

/// Handlers keyed by handler path (`{servicePath}/{handler}`), with an
/// optional fallback for paths nobody registered.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn Handler>>,
    fallback: Option<Arc<dyn Handler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        mut self,
        handler_path: impl Into<String>,
        handler: impl Handler + 'static,
    ) -> Self {
        self.handlers.insert(handler_path.into(), Arc::new(handler));
        self
    }

    pub fn with_fallback(mut self, handler: impl Handler + 'static) -> Self {
        self.fallback = Some(Arc::new(handler));
        self
    }

    pub fn resolve(&self, handler_path: &str) -> Option<Arc<dyn Handler>> {
        self.handlers
            .get(handler_path)
            .or(self.fallback.as_ref())
            .cloned()
    }
}
