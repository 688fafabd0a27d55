use crate::data::Datasets;
use crate::intent;
use crate::llm::gateway::ModelGateway;
use crate::llm::provider::{ChatTurn, LlmProvider};
use crate::trace::SessionTrace;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    turns: Vec<ChatTurn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    fn push_exchange(&mut self, query: &str, answer: String) {
        self.turns.push(ChatTurn::user(query));
        self.turns.push(ChatTurn::assistant(answer));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerSource {
    Rule(&'static str),
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
    pub source: AnswerSource,
}

pub struct ChatController<P> {
    datasets: Datasets,
    gateway: ModelGateway<P>,
    trace: Option<SessionTrace>,
}

impl<P: LlmProvider> ChatController<P> {
    pub fn new(datasets: Datasets, gateway: ModelGateway<P>) -> Self {
        Self {
            datasets,
            gateway,
            trace: None,
        }
    }

    pub fn with_trace(mut self, trace: SessionTrace) -> Self {
        self.trace = Some(trace);
        self
    }

    pub fn datasets(&self) -> &Datasets {
        &self.datasets
    }

    pub fn gateway(&self) -> &ModelGateway<P> {
        &self.gateway
    }

    /// Answers a single query. The model only ever sees this query, never
    /// the earlier turns.
    pub async fn answer(&self, query: &str) -> Answer {
        if let Some(rule) = intent::rule_for(query) {
            if let Some(trace) = &self.trace {
                trace.log_rule_hit(rule.name);
            }
            return Answer {
                text: rule.resolve(&self.datasets),
                source: AnswerSource::Rule(rule.name),
            };
        }

        if let Some(trace) = &self.trace {
            trace.log_fallback();
        }
        Answer {
            text: self.gateway.generate(&[ChatTurn::user(query)]).await,
            source: AnswerSource::Model,
        }
    }

    pub async fn handle_turn(&self, mut transcript: Transcript, query: &str) -> Transcript {
        if query.trim().is_empty() {
            return transcript;
        }

        if let Some(trace) = &self.trace {
            trace.log_user_turn(query);
        }
        let answer = self.answer(query).await;
        if let Some(trace) = &self.trace {
            trace.log_assistant_turn(&answer.text);
        }

        transcript.push_exchange(query, answer.text);
        transcript
    }
}
