use super::provider::{ChatRole, ChatTurn, LlmProvider};
use crate::trace::SessionTrace;

pub const GATEWAY_ERROR_PREFIX: &str = "Erro ao chamar o modelo: ";

/// Model boundary used by the chat. Never fails: provider errors come back as
/// a readable answer so the conversation can go on.
#[derive(Debug, Clone)]
pub struct ModelGateway<P> {
    provider: P,
    trace: Option<SessionTrace>,
}

impl<P: LlmProvider> ModelGateway<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            trace: None,
        }
    }

    pub fn with_trace(mut self, trace: SessionTrace) -> Self {
        self.trace = Some(trace);
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub async fn generate(&self, conversation: &[ChatTurn]) -> String {
        let turns = conversation
            .iter()
            .filter(|turn| matches!(turn.role, ChatRole::User | ChatRole::Assistant))
            .cloned()
            .collect::<Vec<_>>();

        match self.provider.generate(&turns).await {
            Ok(text) => text,
            Err(err) => {
                let message = format!("{GATEWAY_ERROR_PREFIX}{err}");
                if let Some(trace) = &self.trace {
                    trace.log_gateway_error(&message);
                }
                message
            }
        }
    }
}
