use assert_cmd::prelude::*;
use predicates::prelude::*;
use sqs_offline::{QueueService, SqsClientConfig, SqsQueueService};
use std::collections::BTreeMap;
use std::process::Command;
use testcontainers::ContainerAsync;
use testcontainers_modules::{
    localstack::LocalStack,
    testcontainers::{runners::AsyncRunner, ImageExt, TestcontainersError},
};

fn fixture() -> String {
    format!("{}/tests/fixtures/serverless.yml", env!("CARGO_MANIFEST_DIR"))
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

#[test]
fn command_does_not_exist() {
    let mut cmd = Command::cargo_bin("sqs-offline").unwrap();

    cmd.arg("something");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("error: unrecognized subcommand"));
}

#[test]
fn queues_prints_descriptors() {
    let mut cmd = Command::cargo_bin("sqs-offline").unwrap();

    cmd.args(["--config", &fixture(), "--service-path", "/mock", "queues"]);
    cmd.assert().success().stdout(
        predicate::str::contains(r#""queueName":"queue1""#)
            .and(predicate::str::contains(r#""queueName":"queuewithoutresource""#))
            .and(predicate::str::contains(
                r#""handlerPath":"/mock/functions/test/handler.test""#,
            ))
            .and(predicate::str::contains(r#""batchSize":10"#))
            .and(predicate::str::contains("functions/http").not())
            .and(predicate::str::contains("queueUrl").not()),
    );
}

#[test]
fn service_path_defaults_to_config_directory() {
    let mut cmd = Command::cargo_bin("sqs-offline").unwrap();

    cmd.args(["--config", &fixture(), "queues"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("/tests/fixtures/functions/test/handler.test"));
}

#[test]
fn missing_config_fails() {
    let mut cmd = Command::cargo_bin("sqs-offline").unwrap();

    cmd.args(["--config", "does-not-exist.yml", "queues"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("failed to load does-not-exist.yml"));
}

#[tokio::test]
#[ignore = "requires Docker (LocalStack)"]
async fn resolve_leaves_out_missing_queues() {
    let (endpoint, container) = localstack().await.unwrap();

    let client = SqsQueueService::connect(&SqsClientConfig {
        api_version: None,
        endpoint: Some(endpoint.clone()),
        region: "us-east-1".to_string(),
    })
    .await;
    client.create_queue("queue1", &BTreeMap::new()).await.unwrap();

    let mut cmd = Command::cargo_bin("sqs-offline").unwrap();

    cmd.args(["--config", &fixture(), "--service-path", "/mock"]);
    cmd.args(["--endpoint", &endpoint, "--region", "us-east-1"]);
    cmd.args(["queues", "--resolve"]);
    cmd.assert().success().stdout(
        predicate::str::contains(r#""queueName":"queue1""#)
            .and(predicate::str::contains("/000000000000/queue1"))
            .and(predicate::str::contains("queuewithoutresource").not()),
    );

    container.stop().await.unwrap();
}
