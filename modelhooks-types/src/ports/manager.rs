//! Manager service port.

/// Error type for manager notifications.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Manager rejected notification: {status} - {message}")]
    Rejected { status: u16, message: String },
}

/// Port trait for the external manager service.
///
/// Receives one identifier per changed document. There is no
/// acknowledgment contract beyond the returned `Result`.
#[async_trait::async_trait]
pub trait ManagerNotifier: Send + Sync + 'static {
    async fn send_data(&self, owner_id: &str) -> Result<(), NotifyError>;
}
