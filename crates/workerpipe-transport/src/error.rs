/// Errors that can occur while creating or driving IPC endpoints.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The operating system refused to create an anonymous pipe.
    #[error("failed to create pipe: {0}")]
    Pipe(std::io::Error),

    /// Failed to create a connected socket pair.
    #[error("failed to create socket pair: {0}")]
    SocketPair(std::io::Error),

    /// An I/O error occurred on an endpoint.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
