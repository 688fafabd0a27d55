pub mod bedrock;
pub mod credentials;
pub mod eventstream;
pub mod gateway;
pub mod provider;
pub mod sigv4;
#[cfg(any(test, feature = "test-support"))]
pub mod stub;

pub use bedrock::BedrockProvider;
pub use gateway::ModelGateway;
pub use provider::{ChatRole, ChatTurn, LlmError, LlmProvider, LlmResult};
