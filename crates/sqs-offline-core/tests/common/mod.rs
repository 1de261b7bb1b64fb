use sqs_offline::{SqsClientConfig, SqsQueueService};
use testcontainers::ContainerAsync;
use testcontainers_modules::{
    localstack::LocalStack,
    testcontainers::{runners::AsyncRunner, ImageExt, TestcontainersError},
};

pub const REGION: &str = "us-east-1";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub async fn localstack() -> Result<(String, ContainerAsync<LocalStack>), TestcontainersError> {
    let request = LocalStack::default()
        .with_tag("latest")
        .with_env_var("SERVICES", "sqs")
        .with_env_var("SKIP_SSL_CERT_DOWNLOAD", "1");
    let container = request.start().await?;

    let host_ip = container.get_host().await?;
    let host_port = container.get_host_port_ipv4(4566).await?;
    let endpoint_url = format!("http://{host_ip}:{host_port}");

    Ok((endpoint_url, container))
}

pub fn client_config(endpoint_url: &str) -> SqsClientConfig {
    SqsClientConfig {
        api_version: None,
        endpoint: Some(endpoint_url.to_string()),
        region: REGION.to_string(),
    }
}

pub async fn queue_service(endpoint_url: &str) -> SqsQueueService {
    SqsQueueService::connect(&client_config(endpoint_url)).await
}

/// Generate a unique queue name for testing, using a UUID suffix.
pub fn unique_queue_name(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4().simple())
}
