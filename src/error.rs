use thiserror::Error;

/// Errors raised while provisioning a workflow against the Kea control agent.
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// Bad input detected before any network call.
    #[error("configuration error: {0}")]
    Config(String),

    /// Endpoint unreachable, non-2xx status or an unreadable body.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered but the first result carried a nonzero code.
    #[error("{command} failed (result {result}): {text}")]
    Command {
        command: String,
        result: i64,
        text: String,
    },

    /// Address arithmetic failure.
    #[error("invalid CIDR: {0}")]
    InvalidCidr(String),

    /// Reservation cursor ran past 255.255.255.255.
    #[error("address space exhausted in {0}")]
    AddressExhausted(String),
}

impl ProvisionError {
    /// Whether the error aborts the run whichever command raised it.
    /// A `Command` failure on `subnet4-add` is escalated by the orchestrator.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Config(_) | Self::Transport(_) => true,
            Self::Command { .. } | Self::InvalidCidr(_) | Self::AddressExhausted(_) => false,
        }
    }
}

impl From<reqwest::Error> for ProvisionError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

pub type Result<T, E = ProvisionError> = std::result::Result<T, E>;
