pub mod aiui;

// Re-export commonly used types for convenience
pub use aiui::{
    AiuiConfig, AiuiCredentials, AiuiError, AiuiResult, AiuiSession, AudioOutputInfo, AudioSink,
    FileAudioSink, FileAudioSource, MemoryAudioSink, MemoryAudioSource, SemanticOutcome,
    SessionEvent, SessionEventCallback, SessionPayload, SessionReport,
};
