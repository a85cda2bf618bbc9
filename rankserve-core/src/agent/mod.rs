//! Conversational pipeline advisor
//!
//! Given a free-text requirement ("fast, no GPU, medical data"), the
//! advisor recommends a retriever / reranker / RAG-method combination from
//! the catalog and emits a ready-to-run request example. Recommendations
//! are deterministic keyword heuristics, so the endpoint works without any
//! external backend. Sessions keep their message history for the process
//! lifetime (see [`crate::cache::AgentSessionCache`]).

use serde::{Deserialize, Serialize};

use crate::catalog;
use crate::config::{RerankerCategory, RetrieverKind};

/// Structured pipeline recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecommendation {
    /// Recommended retriever method
    pub retriever: String,
    /// Recommended reranker category
    pub reranker: String,
    /// Recommended reranker model
    pub reranker_model: String,
    /// Recommended RAG method
    pub rag_method: String,
    /// Ready-to-run request example
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_snippet: Option<String>,
}

/// One message in a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Who authored the message
    pub role: ChatRole,
    /// Message text
    pub content: String,
}

/// Author of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// End user
    User,
    /// Advisor
    Assistant,
}

/// The advisor's reply: explanation text plus an optional recommendation.
#[derive(Debug, Clone)]
pub struct AdvisorReply {
    /// Natural-language explanation, streamed token by token
    pub text: String,
    /// Structured recommendation, sent after the tokens
    pub recommendation: Option<AgentRecommendation>,
}

/// One conversation with the advisor.
pub struct AdvisorSession {
    session_id: String,
    history: Vec<ChatTurn>,
}

impl AdvisorSession {
    /// Start an empty session.
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            history: Vec::new(),
        }
    }

    /// Session identifier.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Message history, oldest first.
    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    /// Process one user message and produce the advisor's reply.
    pub fn respond(&mut self, message: &str) -> AdvisorReply {
        self.history.push(ChatTurn {
            role: ChatRole::User,
            content: message.to_string(),
        });

        let recommendation = recommend(message);
        let text = explain(message, &recommendation);

        self.history.push(ChatTurn {
            role: ChatRole::Assistant,
            content: text.clone(),
        });

        AdvisorReply {
            text,
            recommendation: Some(recommendation),
        }
    }
}

/// Pick a pipeline combination from requirement keywords.
fn recommend(message: &str) -> AgentRecommendation {
    let lower = message.to_lowercase();

    let wants_speed = ["fast", "latency", "cheap", "cpu", "no gpu", "lightweight"]
        .iter()
        .any(|kw| lower.contains(kw));
    let wants_quality = ["accura", "quality", "best", "precise", "state of the art"]
        .iter()
        .any(|kw| lower.contains(kw));
    let specialist_domain = ["medical", "scientific", "legal", "biomed", "clinical"]
        .iter()
        .any(|kw| lower.contains(kw));
    let wants_reasoning = ["reason", "multi-hop", "complex question", "step by step"]
        .iter()
        .any(|kw| lower.contains(kw));

    let (retriever, category) = if wants_speed {
        (RetrieverKind::Bm25, RerankerCategory::Flashrank)
    } else if specialist_domain {
        (RetrieverKind::Contriever, RerankerCategory::Monot5)
    } else if wants_quality {
        (RetrieverKind::Bge, RerankerCategory::TransformerRanker)
    } else {
        (RetrieverKind::Bm25, RerankerCategory::Flashrank)
    };

    let model = if wants_speed && category == RerankerCategory::Flashrank {
        "ms-marco-TinyBERT-L-2-v2"
    } else if category == RerankerCategory::TransformerRanker {
        "bge-reranker-v2-m3"
    } else {
        catalog::reranker_models(category)
            .first()
            .copied()
            .unwrap_or("ms-marco-MiniLM-L-12-v2")
    };

    let rag_method = if wants_reasoning {
        "chain-of-thought-rag"
    } else {
        "basic-rag"
    };

    let mut recommendation = AgentRecommendation {
        retriever: retriever.as_str().to_string(),
        reranker: category.as_str().to_string(),
        reranker_model: model.to_string(),
        rag_method: rag_method.to_string(),
        code_snippet: None,
    };
    recommendation.code_snippet = Some(code_snippet(&recommendation));
    recommendation
}

fn code_snippet(rec: &AgentRecommendation) -> String {
    format!(
        "curl -X POST http://localhost:8080/pipeline \\\n  -H 'Content-Type: application/json' \\\n  -d '{{\n    \"query\": \"your question here\",\n    \"mode\": \"rag\",\n    \"retriever\": \"{}\",\n    \"rerankerCategory\": \"{}\",\n    \"rerankerModel\": \"{}\",\n    \"ragMethod\": \"{}\",\n    \"n_docs\": 10,\n    \"n_contexts\": 5\n  }}'",
        rec.retriever, rec.reranker, rec.reranker_model, rec.rag_method
    )
}

fn explain(message: &str, rec: &AgentRecommendation) -> String {
    let lower = message.to_lowercase();
    let mut reasons: Vec<&str> = Vec::new();
    if ["fast", "latency", "cpu", "no gpu"]
        .iter()
        .any(|kw| lower.contains(kw))
    {
        reasons.push("it keeps latency low and runs without a GPU");
    }
    if ["medical", "scientific", "legal", "biomed", "clinical"]
        .iter()
        .any(|kw| lower.contains(kw))
    {
        reasons.push("it holds up well on specialist-domain text");
    }
    if ["accura", "quality", "best"].iter().any(|kw| lower.contains(kw)) {
        reasons.push("it prioritizes ranking quality over speed");
    }

    let why = if reasons.is_empty() {
        "it is a solid general-purpose starting point".to_string()
    } else {
        reasons.join(" and ")
    };

    format!(
        "Based on your requirements I would pair the **{}** retriever with the \
         **{}** reranker (*{}*) and the **{}** method — {}. \
         You can try it directly with the request example attached.",
        rec.retriever, rec.reranker, rec.reranker_model, rec.rag_method, why
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_requirements_pick_the_light_stack() {
        let mut session = AdvisorSession::new("s1");
        let reply = session.respond("I need a fast pipeline with no GPU");
        let rec = reply.recommendation.unwrap();

        assert_eq!(rec.retriever, "bm25");
        assert_eq!(rec.reranker, "flashrank");
        assert_eq!(rec.reranker_model, "ms-marco-TinyBERT-L-2-v2");
        assert!(rec.code_snippet.unwrap().contains("rerankerCategory"));
    }

    #[test]
    fn specialist_domains_pick_contriever() {
        let mut session = AdvisorSession::new("s2");
        let reply = session.respond("ranking for medical literature");
        let rec = reply.recommendation.unwrap();

        assert_eq!(rec.retriever, "contriever");
        assert_eq!(rec.reranker, "monot5");
    }

    #[test]
    fn reasoning_needs_switch_the_rag_method() {
        let mut session = AdvisorSession::new("s3");
        let reply = session.respond("complex questions that need multi-hop reasoning");
        assert_eq!(reply.recommendation.unwrap().rag_method, "chain-of-thought-rag");
    }

    #[test]
    fn history_accumulates_across_turns() {
        let mut session = AdvisorSession::new("s4");
        session.respond("first question");
        session.respond("second question");

        let history = session.history();
        assert_eq!(history.len(), 4);
        assert_eq!(history[0].role, ChatRole::User);
        assert_eq!(history[1].role, ChatRole::Assistant);
    }
}
