use std::process::Stdio;

use anyhow::Context;
use async_trait::async_trait;
use sqs_offline::{Handler, SqsEvent};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::reader::concurrent_lines;

/// Splits a handler path at its last `.` into the module and the export,
/// `/srv/functions/orders.handler` giving `/srv/functions/orders` and `handler`.
pub fn split_handler_path(handler_path: &str) -> (&str, &str) {
    match handler_path.rsplit_once('.') {
        Some((module, export)) if !export.contains('/') => (module, export),
        _ => (handler_path, "handler"),
    }
}

/// Prints every event as a JSON line.
pub struct PrintHandler {
    handler_path: String,
}

impl PrintHandler {
    pub fn new(handler_path: String) -> Self {
        Self { handler_path }
    }
}

#[async_trait]
impl Handler for PrintHandler {
    async fn handle(&self, event: SqsEvent) -> anyhow::Result<()> {
        let line = serde_json::json!({ "handler": self.handler_path, "event": event });
        println!("{}", serde_json::to_string(&line)?);
        Ok(())
    }
}

/// Runs a program for every event, e.g. `node invoke.js`, which receives the
/// module and export of the handler as its last arguments and the event on
/// stdin. Its stdout is logged line by line.
pub struct CommandHandler {
    program: String,
    args: Vec<String>,
    handler_path: String,
}

impl CommandHandler {
    pub fn new(program: String, args: Vec<String>, handler_path: String) -> Self {
        Self {
            program,
            args,
            handler_path,
        }
    }
}

#[async_trait]
impl Handler for CommandHandler {
    async fn handle(&self, event: SqsEvent) -> anyhow::Result<()> {
        let (module, export) = split_handler_path(&self.handler_path);
        let payload = serde_json::to_vec(&event)?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(module)
            .arg(export)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to run {}", self.program))?;

        let stdout = child.stdout.take().context("stdout of the handler is not piped")?;
        let (h_stdout, mut rx_stdout) = concurrent_lines(stdout, 100);

        let mut stdin = child.stdin.take().context("stdin of the handler is not piped")?;
        stdin.write_all(&payload).await?;
        drop(stdin);

        while let Some(line) = rx_stdout.recv().await {
            log::info!("[{}] {}", self.handler_path, line);
        }
        h_stdout
            .await?
            .with_context(|| format!("failed to read the output of {}", self.program))?;

        let status = child.wait().await?;
        anyhow::ensure!(status.success(), "{} exited with {}", self.program, status);

        Ok(())
    }
}
