use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid service configuration: {0}")]
    Config(String),

    #[error("failed to create queue \"{name}\": {message}")]
    CreateQueue { name: String, message: String },

    #[error("failed to get url of queue \"{name}\": {message}")]
    GetQueueUrl { name: String, message: String },

    #[error("failed to receive messages from {queue_url}: {message}")]
    Receive { queue_url: String, message: String },

    #[error("failed to delete messages from {queue_url}: {message}")]
    DeleteMessages { queue_url: String, message: String },

    #[error("handler {handler_path} failed: {message}")]
    Handler {
        handler_path: String,
        message: String,
    },
}
