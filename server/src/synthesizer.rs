use ddugi_core::{
    extract_text_from_response, ContentBlock, LanguageModel, LlmError, LlmResult, Message,
    MessagesRequest, MessagesResponse, SearchCategory, VenueLookup, VerifiedVenue,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::answer::Answer;
use crate::extractor::{self, EntityKind, ExtractedEntity, MAX_ENTITIES};
use crate::prompts::{
    category_for_tool, merge_user_prompt, search_tools, DRAFT_SYSTEM_PROMPT, MERGE_SYSTEM_PROMPT,
    TOOL_FALLBACK_ANSWER, TOOL_RESPONSE_SYSTEM_PROMPT, TOOL_SYSTEM_PROMPT,
};
use crate::turn::AnswerType;
use crate::verifier::{Verifier, MAX_VENUES};

const DRAFT_MAX_TOKENS: u32 = 1500;
const DRAFT_TEMPERATURE: f32 = 0.7;
const MERGE_MAX_TOKENS: u32 = 2000;
const MERGE_TEMPERATURE: f32 = 0.5;
const TOOL_DRAFT_MAX_TOKENS: u32 = 2000;
const TOOL_DRAFT_TEMPERATURE: f32 = 0.3;
const TOOL_FOLLOW_UP_MAX_TOKENS: u32 = 3000;

/// How verified venue data reaches the final answer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStrategy {
    /// Draft, extract entities, verify each, merge
    #[default]
    KeywordExtraction,
    /// Offer category searches as tools and answer from their results
    ToolAugmented,
}

#[derive(Debug, Clone, Copy)]
pub struct SynthesizerSettings {
    pub strategy: VerificationStrategy,
    pub draft_timeout: Duration,
    pub merge_timeout: Duration,
    pub lookup_timeout: Duration,
}

impl Default for SynthesizerSettings {
    fn default() -> Self {
        Self {
            strategy: VerificationStrategy::default(),
            draft_timeout: Duration::from_secs(30),
            merge_timeout: Duration::from_secs(30),
            lookup_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedAnswer {
    /// Final model text, unmodified
    pub answer: String,
    pub answer_type: AnswerType,
    pub entities: Vec<ExtractedEntity>,
    pub venues: Vec<VerifiedVenue>,
    /// `answer` classified as plain text or a structured shape
    pub structured: Answer,
}

#[derive(Error, Debug)]
pub enum SynthesisError {
    /// Without a draft there is nothing to fall back to
    #[error("Draft answer could not be produced: {0}")]
    Draft(#[source] LlmError),
}

#[derive(Deserialize, Debug)]
struct ToolInput {
    query: String,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    count: Option<f64>,
}

struct ToolOutcome {
    content: String,
    is_error: bool,
    entity: Option<ExtractedEntity>,
    venues: Vec<VerifiedVenue>,
}

impl ToolOutcome {
    fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
            entity: None,
            venues: Vec::new(),
        }
    }
}

/// Answer synthesis over a language model and a local-search provider
pub struct AnswerSynthesizer {
    llm: Arc<dyn LanguageModel>,
    search: Arc<dyn VenueLookup>,
    verifier: Verifier,
    settings: SynthesizerSettings,
}

impl AnswerSynthesizer {
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        search: Arc<dyn VenueLookup>,
        settings: SynthesizerSettings,
    ) -> Self {
        let verifier = Verifier::new(search.clone(), settings.lookup_timeout);
        Self {
            llm,
            search,
            verifier,
            settings,
        }
    }

    pub fn strategy(&self) -> VerificationStrategy {
        self.settings.strategy
    }

    pub async fn synthesize(&self, message: &str) -> Result<SynthesizedAnswer, SynthesisError> {
        match self.settings.strategy {
            VerificationStrategy::KeywordExtraction => self.synthesize_from_keywords(message).await,
            VerificationStrategy::ToolAugmented => self.synthesize_with_tools(message).await,
        }
    }

    async fn synthesize_from_keywords(
        &self,
        message: &str,
    ) -> Result<SynthesizedAnswer, SynthesisError> {
        let request = MessagesRequest::new(self.llm.model_name(), DRAFT_MAX_TOKENS)
            .temperature(DRAFT_TEMPERATURE)
            .system(DRAFT_SYSTEM_PROMPT)
            .message(Message::user(message));
        let draft = self
            .call_text(request, self.settings.draft_timeout)
            .await
            .map_err(SynthesisError::Draft)?;
        debug!(draft_len = draft.chars().count(), "Draft answer received");

        let entities = extractor::extract(&draft);
        let venues = if entities.is_empty() {
            Vec::new()
        } else {
            self.verifier
                .verify(&extractor::entity_names(&entities))
                .await
        };

        let answer = self.merge(&draft, &venues).await;
        Ok(finish(answer, entities, venues))
    }

    /// Merge verified venues into the draft; any failure keeps the draft as is
    async fn merge(&self, draft: &str, venues: &[VerifiedVenue]) -> String {
        if venues.is_empty() {
            return draft.to_string();
        }

        let request = MessagesRequest::new(self.llm.model_name(), MERGE_MAX_TOKENS)
            .temperature(MERGE_TEMPERATURE)
            .system(MERGE_SYSTEM_PROMPT)
            .message(Message::user(merge_user_prompt(draft, venues)));

        match self.call_text(request, self.settings.merge_timeout).await {
            Ok(merged) => merged,
            Err(e) => {
                warn!(error = %e, "Merge failed, falling back to draft answer");
                draft.to_string()
            }
        }
    }

    async fn synthesize_with_tools(
        &self,
        message: &str,
    ) -> Result<SynthesizedAnswer, SynthesisError> {
        let tools = search_tools(self.search.default_region());
        let request = MessagesRequest::new(self.llm.model_name(), TOOL_DRAFT_MAX_TOKENS)
            .temperature(TOOL_DRAFT_TEMPERATURE)
            .system(TOOL_SYSTEM_PROMPT)
            .message(Message::user(message))
            .tools(tools.clone());
        let response = self
            .call(request, self.settings.draft_timeout)
            .await
            .map_err(SynthesisError::Draft)?;

        let draft = response.joined_text();
        let calls: Vec<(String, String, Value)> = response
            .tool_uses()
            .into_iter()
            .map(|(id, name, input)| (id.to_string(), name.to_string(), input.clone()))
            .collect();

        if calls.is_empty() {
            if draft.trim().is_empty() {
                let kind = response.content.first().map_or("empty", |b| b.kind());
                return Err(SynthesisError::Draft(LlmError::UnexpectedContent(
                    kind.to_string(),
                )));
            }
            return Ok(finish(draft, Vec::new(), Vec::new()));
        }

        let mut tool_results = Vec::with_capacity(calls.len());
        let mut entities: Vec<ExtractedEntity> = Vec::new();
        let mut venues = Vec::new();
        let mut seen = HashSet::new();

        for (id, name, input) in &calls {
            info!(tool = %name, "Tool called");
            let outcome = self.run_tool(name, input).await;

            if let Some(entity) = outcome.entity {
                if entities.len() < MAX_ENTITIES && seen.insert(entity.name.clone()) {
                    entities.push(entity);
                }
            }
            venues.extend(outcome.venues);
            tool_results.push(ContentBlock::ToolResult {
                tool_use_id: id.clone(),
                content: outcome.content,
                is_error: outcome.is_error,
            });
        }
        venues.truncate(MAX_VENUES);

        let assistant_content: Vec<ContentBlock> = response
            .content
            .into_iter()
            .filter(|block| !matches!(block, ContentBlock::Unsupported))
            .collect();
        let follow_up = MessagesRequest::new(self.llm.model_name(), TOOL_FOLLOW_UP_MAX_TOKENS)
            .temperature(MERGE_TEMPERATURE)
            .system(TOOL_RESPONSE_SYSTEM_PROMPT)
            .message(Message::user(message))
            .message(Message::assistant_blocks(assistant_content))
            .message(Message::user_blocks(tool_results))
            .tools(tools);

        let answer = match self.call_text(follow_up, self.settings.merge_timeout).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => fallback_answer(draft),
            Err(e) => {
                warn!(error = %e, "Tool follow-up failed, falling back");
                fallback_answer(draft)
            }
        };

        Ok(finish(answer, entities, venues))
    }

    async fn run_tool(&self, name: &str, input: &Value) -> ToolOutcome {
        let Some(category) = category_for_tool(name) else {
            warn!(tool = %name, "Model requested an unknown tool");
            return ToolOutcome::error("Tool not found");
        };

        let input: ToolInput = match serde_json::from_value(input.clone()) {
            Ok(input) => input,
            Err(e) => return ToolOutcome::error(format!("Error: invalid tool input: {}", e)),
        };
        if !self.search.is_configured() {
            return ToolOutcome::error("Local search service not available");
        }

        let display = input.count.map(|c| c.clamp(1.0, 100.0) as u32);
        let search = self.search.search_category(
            category,
            &input.query,
            input.location.as_deref(),
            display,
        );

        match timeout(self.settings.lookup_timeout, search).await {
            Ok(Ok(results)) => {
                let content = json!({
                    "success": true,
                    "results": &results.items,
                    "total": results.items.len(),
                })
                .to_string();
                ToolOutcome {
                    content,
                    is_error: false,
                    entity: Some(ExtractedEntity {
                        name: input.query,
                        kind: entity_kind(category),
                    }),
                    venues: results.items,
                }
            }
            Ok(Err(e)) => ToolOutcome::error(format!("Error: {}", e)),
            Err(_) => ToolOutcome::error("Error: search timed out"),
        }
    }

    async fn call(
        &self,
        request: MessagesRequest,
        deadline: Duration,
    ) -> LlmResult<MessagesResponse> {
        match timeout(deadline, self.llm.create_message(request)).await {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout(deadline.as_secs())),
        }
    }

    async fn call_text(&self, request: MessagesRequest, deadline: Duration) -> LlmResult<String> {
        let response = self.call(request, deadline).await?;
        extract_text_from_response(&response)
    }
}

fn finish(
    answer: String,
    entities: Vec<ExtractedEntity>,
    venues: Vec<VerifiedVenue>,
) -> SynthesizedAnswer {
    let answer_type = if entities.is_empty() {
        AnswerType::General
    } else {
        AnswerType::Travel
    };
    let structured = Answer::classify(&answer);
    SynthesizedAnswer {
        answer,
        answer_type,
        entities,
        venues,
        structured,
    }
}

fn fallback_answer(draft: String) -> String {
    if draft.trim().is_empty() {
        TOOL_FALLBACK_ANSWER.to_string()
    } else {
        draft
    }
}

fn entity_kind(category: SearchCategory) -> EntityKind {
    match category {
        SearchCategory::Restaurant => EntityKind::Food,
        SearchCategory::Accommodation => EntityKind::Lodging,
        SearchCategory::Local => EntityKind::Place,
    }
}
