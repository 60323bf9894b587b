#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid greeting: {0:?}")]
    InvalidGreeting(String),

    #[error("invalid command: {0}")]
    InvalidCommand(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("invalid ACK line: {0:?}")]
    InvalidAck(String),

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("unterminated quoted argument: {0:?}")]
    UnterminatedQuote(String),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
