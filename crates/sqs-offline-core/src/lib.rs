//! # sqs-offline-core
//!
//! Runs the SQS event sources of a serverless service against a local queue
//! service such as ElasticMQ or LocalStack.
//!
//! The functions declared in the service configuration are mapped to the
//! queues they consume, the queues are created when `autoCreate` is set, and
//! every queue that exists gets its own poll loop handing batches of messages
//! to the function's handler, shaped like the Lambda SQS event.
//!
//! ## Features
//!
//! - **Queue Discovery**: Resolve literal ARNs and `Fn::GetAtt` references to queue names
//! - **Provisioning**: Create the declared queues, FIFO and deduplication included
//! - **Polling**: One long-polling loop per queue, independent from the others
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sqs_offline::{handler_fn, HandlerRegistry, ServiceConfig, SqsOffline, SqsQueueService};
//!
//! # async fn example() -> sqs_offline::Result<()> {
//! let service = ServiceConfig::from_path("serverless.yml".as_ref())?;
//! let client = SqsQueueService::connect(&service.custom_config().client_config()).await;
//!
//! let handlers = HandlerRegistry::new().register(
//!     "./functions/orders.handler",
//!     handler_fn(|event| async move {
//!         for record in event.records {
//!             println!("{}", record.body);
//!         }
//!         Ok(())
//!     }),
//! );
//!
//! let offline = SqsOffline::new(service, ".", Arc::new(client), handlers);
//! for handle in offline.initialize().await {
//!     let _ = handle.await;
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod engine;
mod error;
mod event;
mod handler;
mod mapper;
mod poll;
mod provision;
mod queue_name;
mod resolve;
mod sqs;

#[cfg(test)]
mod test_utils;

pub use config::*;
pub use engine::SqsOffline;
pub use error::{Error, Result};
pub use event::*;
pub use handler::*;
pub use mapper::*;
pub use poll::*;
pub use provision::*;
pub use queue_name::*;
pub use resolve::*;
pub use sqs::*;
