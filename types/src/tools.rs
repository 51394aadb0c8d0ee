#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum Tool {
    #[serde(rename = "function")]
    Function(FunctionTool),
}

/// A function schema declared to the model when the session is configured.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FunctionTool {
    /// The name of the function
    name: String,

    /// The description of the function
    description: String,

    /// The parameters of the function in JSON Schema format
    parameters: serde_json::Value,
}

impl FunctionTool {
    pub fn new(name: String, description: String, parameters: serde_json::Value) -> Self {
        Self {
            name,
            description,
            parameters,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn parameters(&self) -> &serde_json::Value {
        &self.parameters
    }
}

/// One function invocation emitted by the model mid-conversation.
///
/// The `id` is the correlation token a later `tool.result` must carry.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ToolCallInvocation {
    id: String,
    name: String,
    #[serde(default)]
    args: serde_json::Value,
}

impl ToolCallInvocation {
    pub fn new(id: String, name: String, args: serde_json::Value) -> Self {
        Self { id, name, args }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &serde_json::Value {
        &self.args
    }
}
