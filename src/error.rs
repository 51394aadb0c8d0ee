use aura_realtime_utils::audio::CodecError;

/// Failure taxonomy for the session engine. Nothing here is fatal to the
/// host application: every path returns the session machine to Idle or Error
/// and leaves durable state intact.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport or auth failure establishing or during a session.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Microphone permission denied or device failure.
    #[error("microphone unavailable: {0}")]
    MicrophoneAccess(String),

    /// Malformed inbound audio payload; the chunk is dropped and the
    /// session continues.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// One of the post-session requests failed.
    #[error("post-session processing failed: {0}")]
    PostProcessing(String),

    /// A tool result could not be delivered back on the connection.
    #[error("failed to deliver tool result: {0}")]
    ToolResponse(String),

    #[error("no active session connection")]
    NotConnected,

    #[error("a session is already active")]
    AlreadyActive,
}
