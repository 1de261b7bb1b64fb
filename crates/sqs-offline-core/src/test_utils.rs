use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::resolve::queue_name_of_url;
use crate::sqs::{InboundMessage, QueueService, ReceiveRequest};

/// A service declaring one queue resource and one function consuming it and a
/// queue that is not declared anywhere.
pub const SERVERLESS_YAML: &str = r#"
service: offline-sqs-test

custom:
  serverless-offline-sqs:
    autoCreate: true
    apiVersion: '2012-11-05'
    endpoint: http://elasticmq:9324
    region: eu-west-1

functions:
  test_sqs:
    handler: functions/test/handler.test
    events:
      - sqs:
          arn:
            Fn::GetAtt:
              - Queue1
              - Arn
          batchSize: 10
      - sqs:
          arn: arn:aws:sqs:us-east-2:444455556666:queuewithoutresource

resources:
  Resources:
    Queue1:
      Type: AWS::SQS::Queue
      Properties:
        QueueName: queue1
"#;

pub fn message(id: &str, body: &str) -> InboundMessage {
    InboundMessage {
        message_id: id.to_string(),
        receipt_handle: format!("{id}#receipt"),
        body: body.to_string(),
        md5_of_body: "d41d8cd98f00b204e9800998ecf8427e".to_string(),
        ..Default::default()
    }
}

#[derive(Default)]
struct State {
    queues: BTreeMap<String, VecDeque<InboundMessage>>,
    created: Vec<(String, BTreeMap<String, String>)>,
    url_lookups: Vec<String>,
    receives: Vec<ReceiveRequest>,
    deleted: Vec<(String, Vec<String>)>,
    failing_create: Option<String>,
    failing_receive: bool,
    failing_delete: bool,
}

/// In-memory queue service recording every call made to it.
///
/// Urls look like `{base_url}/{queue_name}`, the way ElasticMQ announces them.
pub struct MemoryQueueService {
    base_url: String,
    state: Mutex<State>,
}

impl MemoryQueueService {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            state: Mutex::new(State::default()),
        }
    }

    pub fn with_queue(self, name: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .queues
            .insert(name.to_string(), VecDeque::new());
        self
    }

    pub fn failing_create(self, name: &str) -> Self {
        self.state.lock().unwrap().failing_create = Some(name.to_string());
        self
    }

    pub fn failing_receive(self) -> Self {
        self.state.lock().unwrap().failing_receive = true;
        self
    }

    pub fn failing_delete(self) -> Self {
        self.state.lock().unwrap().failing_delete = true;
        self
    }

    pub fn push(&self, queue: &str, message: InboundMessage) {
        self.state
            .lock()
            .unwrap()
            .queues
            .entry(queue.to_string())
            .or_default()
            .push_back(message);
    }

    pub fn queue_url(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name)
    }

    pub fn pending(&self, queue: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .queues
            .get(queue)
            .map_or(0, VecDeque::len)
    }

    pub fn created(&self) -> Vec<(String, BTreeMap<String, String>)> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn url_lookups(&self) -> Vec<String> {
        self.state.lock().unwrap().url_lookups.clone()
    }

    pub fn receives(&self) -> Vec<ReceiveRequest> {
        self.state.lock().unwrap().receives.clone()
    }

    pub fn deleted(&self) -> Vec<(String, Vec<String>)> {
        self.state.lock().unwrap().deleted.clone()
    }
}

#[async_trait]
impl QueueService for MemoryQueueService {
    async fn create_queue(
        &self,
        name: &str,
        attributes: &BTreeMap<String, String>,
    ) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        if state.failing_create.as_deref() == Some(name) {
            return Err(Error::CreateQueue {
                name: name.to_string(),
                message: "InvalidAttributeName".to_string(),
            });
        }

        state.created.push((name.to_string(), attributes.clone()));
        state.queues.entry(name.to_string()).or_default();
        Ok(self.queue_url(name))
    }

    async fn get_queue_url(&self, name: &str) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.url_lookups.push(name.to_string());

        if state.queues.contains_key(name) {
            Ok(self.queue_url(name))
        } else {
            Err(Error::GetQueueUrl {
                name: name.to_string(),
                message: "AWS.SimpleQueueService.NonExistentQueue".to_string(),
            })
        }
    }

    async fn receive_messages(&self, request: &ReceiveRequest) -> Result<Vec<InboundMessage>> {
        let messages = {
            let mut state = self.state.lock().unwrap();
            state.receives.push(request.clone());

            if state.failing_receive {
                return Err(Error::Receive {
                    queue_url: request.queue_url.clone(),
                    message: "connection refused".to_string(),
                });
            }

            let queue = state
                .queues
                .get_mut(queue_name_of_url(&request.queue_url))
                .ok_or_else(|| Error::Receive {
                    queue_url: request.queue_url.clone(),
                    message: "AWS.SimpleQueueService.NonExistentQueue".to_string(),
                })?;

            let count = usize::try_from(request.max_messages)
                .unwrap_or(0)
                .min(queue.len());
            queue.drain(..count).collect::<Vec<_>>()
        };

        if messages.is_empty() {
            // stands in for the long poll
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        Ok(messages)
    }

    async fn delete_message_batch(
        &self,
        messages: &[InboundMessage],
        queue_url: &str,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing_delete {
            return Err(Error::DeleteMessages {
                queue_url: queue_url.to_string(),
                message: "ReceiptHandleIsInvalid".to_string(),
            });
        }

        state.deleted.push((
            queue_url.to_string(),
            messages.iter().map(|m| m.message_id.clone()).collect(),
        ));
        Ok(())
    }
}
