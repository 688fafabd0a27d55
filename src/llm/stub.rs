use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::provider::{ChatTurn, LlmError, LlmProvider, LlmResult};

#[derive(Debug, Clone, Default)]
pub struct ScriptedProvider {
    state: Arc<Mutex<ScriptState>>,
}

#[derive(Debug, Default)]
struct ScriptState {
    replies: VecDeque<LlmResult<String>>,
    default_reply: Option<String>,
    calls: Vec<Vec<ChatTurn>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<LlmResult<String>>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ScriptState {
                replies: replies.into(),
                ..ScriptState::default()
            })),
        }
    }

    pub fn answering<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(replies.into_iter().map(|reply| Ok(reply.into())).collect())
    }

    pub fn with_default_reply(self, reply: impl Into<String>) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.default_reply = Some(reply.into());
        }
        self
    }

    pub fn calls(&self) -> Vec<Vec<ChatTurn>> {
        self.state
            .lock()
            .map(|state| state.calls.clone())
            .unwrap_or_default()
    }

    fn next_reply(&self, conversation: &[ChatTurn]) -> LlmResult<String> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| LlmError::Stream("scripted provider lock poisoned".to_string()))?;
        state.calls.push(conversation.to_vec());
        match state.replies.pop_front() {
            Some(reply) => reply,
            None => state
                .default_reply
                .clone()
                .ok_or_else(|| LlmError::Stream("no scripted reply left".to_string())),
        }
    }
}

impl LlmProvider for ScriptedProvider {
    async fn generate(&self, conversation: &[ChatTurn]) -> LlmResult<String> {
        self.next_reply(conversation)
    }
}
