use crate::assembler;
use crate::session::SessionStore;
use crate::synthesizer::AnswerSynthesizer;
use crate::turn::ChatTurn;
use anyhow::{Context, Result};
use tracing::{debug, info, warn};

/// Process a single chat message for a session and return the assistant turn
pub async fn process_chat(
    synthesizer: &AnswerSynthesizer,
    sessions: &dyn SessionStore,
    max_turns: usize,
    session_id: &str,
    message: &str,
) -> Result<ChatTurn> {
    // History is best effort; a store failure never blocks the answer
    record_turn(sessions, session_id, ChatTurn::user(message), max_turns).await;

    let synthesized = synthesizer
        .synthesize(message)
        .await
        .context("Answer synthesis failed")?;
    info!(
        session_id,
        answer_type = ?synthesized.answer_type,
        entities = synthesized.entities.len(),
        venues = synthesized.venues.len(),
        "Answer synthesized"
    );

    let turn = assembler::assemble(synthesized);
    record_turn(sessions, session_id, turn.clone(), max_turns).await;

    Ok(turn)
}

async fn record_turn(
    sessions: &dyn SessionStore,
    session_id: &str,
    turn: ChatTurn,
    max_turns: usize,
) {
    let role = turn.role;
    if let Err(e) = sessions.append(session_id, turn).await {
        warn!(session_id, error = %e, "Failed to record turn, continuing");
        return;
    }
    match sessions.truncate(session_id, max_turns).await {
        Ok(dropped) if dropped > 0 => debug!(session_id, dropped, ?role, "History truncated"),
        Ok(_) => {}
        Err(e) => warn!(session_id, error = %e, "Failed to truncate history, continuing"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::InMemorySessionStore;
    use crate::synthesizer::{SynthesizerSettings, VerificationStrategy};
    use crate::test_support::{MockLookup, ScriptedModel};
    use crate::turn::{AnswerType, TurnRole};
    use ddugi_core::LlmError;
    use std::sync::Arc;

    fn synthesizer(llm: ScriptedModel, lookup: MockLookup) -> AnswerSynthesizer {
        AnswerSynthesizer::new(
            Arc::new(llm),
            Arc::new(lookup),
            SynthesizerSettings {
                strategy: VerificationStrategy::KeywordExtraction,
                ..SynthesizerSettings::default()
            },
        )
    }

    #[tokio::test]
    async fn test_exchange_is_recorded() {
        let synthesizer = synthesizer(
            ScriptedModel::new()
                .then_text("해운대 근처 식당을 추천해요")
                .then_text("해운대 1을 추천해요"),
            MockLookup::with_results_per_query(1),
        );
        let store = InMemorySessionStore::new();

        let turn = process_chat(&synthesizer, &store, 20, "s1", "해운대 맛집 추천해줘")
            .await
            .unwrap();

        assert_eq!(turn.role, TurnRole::Assistant);
        assert_eq!(turn.content, "해운대 1을 추천해요");
        let metadata = turn.metadata.as_ref().unwrap();
        assert_eq!(metadata.answer_type, AnswerType::Travel);
        assert!(metadata.locations.contains(&"해운대".to_string()));
        assert!(!metadata.search_results.is_empty());

        let history = store.get("s1").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, TurnRole::User);
        assert_eq!(history[0].content, "해운대 맛집 추천해줘");
        assert_eq!(history[1], turn);
    }

    #[tokio::test]
    async fn test_history_stays_bounded() {
        let mut llm = ScriptedModel::new();
        for _ in 0..12 {
            llm = llm.then_text("안녕하세요!");
        }
        let synthesizer = synthesizer(llm, MockLookup::with_results_per_query(1));
        let store = InMemorySessionStore::new();

        for n in 0..12 {
            process_chat(&synthesizer, &store, 20, "s", &format!("질문 {}", n))
                .await
                .unwrap();
        }

        let history = store.get("s").await.unwrap();
        assert_eq!(history.len(), 20);
        assert_eq!(history[0].content, "질문 2");
    }

    #[tokio::test]
    async fn test_failed_synthesis_keeps_user_turn() {
        let synthesizer = synthesizer(
            ScriptedModel::new().then_error(LlmError::Timeout(30)),
            MockLookup::with_results_per_query(1),
        );
        let store = InMemorySessionStore::new();

        let result = process_chat(&synthesizer, &store, 20, "s", "부산 여행").await;

        assert!(result.is_err());
        let history = store.get("s").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, TurnRole::User);
    }
}
