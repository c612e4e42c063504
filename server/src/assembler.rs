use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::extractor::entity_names;
use crate::synthesizer::SynthesizedAnswer;
use crate::turn::{ChatTurn, TurnMetadata, TurnRole};

/// Wrap a synthesized answer as an assistant turn.
///
/// Structured answers keep their parsed form under `metadata.structured` and
/// show a readable summary as content; plain answers are used verbatim.
pub fn assemble(synthesized: SynthesizedAnswer) -> ChatTurn {
    let content = synthesized.structured.display_text();
    let structured = synthesized.structured.into_structured();
    debug!(
        structured = structured.is_some(),
        venues = synthesized.venues.len(),
        "Assembling assistant turn"
    );

    ChatTurn {
        id: Uuid::new_v4().to_string(),
        role: TurnRole::Assistant,
        content,
        timestamp: Utc::now(),
        metadata: Some(TurnMetadata {
            answer_type: synthesized.answer_type,
            locations: entity_names(&synthesized.entities),
            search_results: synthesized.venues,
            structured,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answer::{Answer, StructuredAnswer};
    use crate::extractor::{EntityKind, ExtractedEntity};
    use crate::test_support::venue;
    use crate::turn::AnswerType;

    fn synthesized(answer: &str) -> SynthesizedAnswer {
        SynthesizedAnswer {
            answer: answer.to_string(),
            answer_type: AnswerType::Travel,
            entities: vec![ExtractedEntity {
                name: "해운대".to_string(),
                kind: EntityKind::District,
            }],
            venues: vec![venue("해운대 암소갈비집")],
            structured: Answer::classify(answer),
        }
    }

    #[test]
    fn test_plain_answer() {
        let turn = assemble(synthesized("해운대 암소갈비집을 추천해요"));

        assert_eq!(turn.role, TurnRole::Assistant);
        assert_eq!(turn.content, "해운대 암소갈비집을 추천해요");
        assert!(Uuid::parse_str(&turn.id).is_ok());

        let metadata = turn.metadata.unwrap();
        assert_eq!(metadata.answer_type, AnswerType::Travel);
        assert_eq!(metadata.locations, vec!["해운대"]);
        assert_eq!(metadata.search_results[0].title, "해운대 암소갈비집");
        assert!(metadata.structured.is_none());
    }

    #[test]
    fn test_structured_answer_moves_to_metadata() {
        let turn = assemble(synthesized(
            r#"{"type": "general", "answer": "광안리를 추천해요", "recommendations": []}"#,
        ));

        assert_eq!(turn.content, "광안리를 추천해요");
        assert!(matches!(
            turn.metadata.unwrap().structured,
            Some(StructuredAnswer::Recommendation(_))
        ));
    }

    #[test]
    fn test_wire_shape() {
        let turn = assemble(synthesized("답변"));
        let value = serde_json::to_value(&turn).unwrap();

        assert_eq!(value["role"], "assistant");
        assert_eq!(value["metadata"]["type"], "travel");
        assert_eq!(value["metadata"]["locations"][0], "해운대");
        assert_eq!(value["metadata"]["searchResults"][0]["roadAddress"], "");
        assert!(value["metadata"].get("structured").is_none());
    }
}
