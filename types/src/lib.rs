pub mod audio;
pub mod events;
pub mod journal;
pub mod session;
pub mod tools;

pub use events::{ClientEvent, ServerEvent};
pub use journal::{
    AuraMemory, CognitiveDistortion, PendingToolCall, SessionRecord, Speaker, TranscriptEntry,
};
pub use session::{SessionConfig, SessionConfigurator};
pub use tools::{FunctionTool, Tool, ToolCallInvocation};
