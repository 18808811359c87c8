//! Unified error type.

/// The error type returned by heartbeat's fallible operations.
///
/// Request-level failures never show up here: they are expressed as HTTP
/// [`Response`](crate::Response) values. This type surfaces infrastructure
/// failures such as resolving the bind address, binding the port, or a
/// background server task that did not finish cleanly.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot resolve bind address `{addr}`: {source}")]
    Resolve {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("server task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
