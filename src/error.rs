use crate::models::TaskId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("{0} not set")]
    Missing(&'static str),
    #[error("invalid reminder time {0:?}, expected HH:MM")]
    ReminderTime(String),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("task {0} does not exist")]
    NotFound(TaskId),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}
