use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqs_offline::{
    map_functions_to_descriptors, resolve_queue_urls, HandlerRegistry, ServiceConfig, SqsOffline,
    SqsQueueService,
};

mod handlers;
mod reader;

use handlers::{CommandHandler, PrintHandler};

#[tokio::main]
pub async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = Cli::parse().run().await {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}

#[derive(Debug, Parser)]
#[command(name = "sqs-offline")]
#[command(about = "poll the SQS event sources of a serverless service against a local queue service", long_about = None)]
pub struct Cli {
    /// Service configuration (.yml, .yaml or .json)
    #[arg(short, long, global = true, default_value = "serverless.yml")]
    config: PathBuf,

    /// Directory handlers are relative to [default: directory of the configuration]
    #[arg(long, global = true)]
    service_path: Option<PathBuf>,

    /// Queue service endpoint, overriding the configured one
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Region, overriding the configured one
    #[arg(long, global = true)]
    region: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create the declared queues, then poll every queue until interrupted
    Start {
        /// Program run for every batch, with the handler module and export as
        /// its last two arguments and the event as JSON on stdin. Without it,
        /// events are printed as JSON lines.
        #[arg(long)]
        exec: Option<String>,

        /// Argument passed to the program before the handler (repeatable)
        #[arg(long = "arg", allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Print the queue descriptors of the service as JSON lines
    Queues {
        /// Look up every queue url, leaving out the queues that do not exist
        #[arg(long)]
        resolve: bool,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let mut service = ServiceConfig::from_path(&self.config)
            .with_context(|| format!("failed to load {}", self.config.display()))?;

        if let Some(endpoint) = self.endpoint {
            service.custom.sqs.endpoint = Some(endpoint);
        }
        if let Some(region) = self.region {
            service.custom.sqs.region = Some(region);
        }

        let service_path = match self.service_path {
            Some(path) => path,
            None => config_dir(&self.config)?,
        };
        let service_path = service_path.display().to_string();

        match self.command {
            Commands::Start { exec, args } => start(service, service_path, exec, args).await,
            Commands::Queues { resolve } => queues(service, service_path, resolve).await,
        }
    }
}

fn config_dir(config: &Path) -> anyhow::Result<PathBuf> {
    let dir = config
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    std::fs::canonicalize(dir).with_context(|| format!("failed to resolve {}", dir.display()))
}

async fn start(
    service: ServiceConfig,
    service_path: String,
    exec: Option<String>,
    args: Vec<String>,
) -> anyhow::Result<()> {
    let client = SqsQueueService::connect(&service.custom_config().client_config()).await;

    let mut handlers = HandlerRegistry::new();
    for descriptor in map_functions_to_descriptors(&service, &service_path) {
        let handler_path = descriptor.handler_path;
        handlers = match &exec {
            Some(program) => handlers.register(
                handler_path.clone(),
                CommandHandler::new(program.clone(), args.clone(), handler_path),
            ),
            None => handlers.register(handler_path.clone(), PrintHandler::new(handler_path)),
        };
    }

    let offline = SqsOffline::new(service, service_path, Arc::new(client), handlers);
    let handles = offline.initialize().await;
    if handles.is_empty() {
        log::warn!("no queue to poll");
    }

    for handle in handles {
        handle.await?;
    }

    Ok(())
}

async fn queues(service: ServiceConfig, service_path: String, resolve: bool) -> anyhow::Result<()> {
    let mut descriptors = map_functions_to_descriptors(&service, &service_path);

    if resolve {
        let client = SqsQueueService::connect(&service.custom_config().client_config()).await;
        descriptors = resolve_queue_urls(&client, descriptors).await;
    }

    for descriptor in descriptors {
        println!("{}", serde_json::to_string(&descriptor)?);
    }

    Ok(())
}
