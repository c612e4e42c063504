//! Prompt text and tool definitions sent to the language model.

use ddugi_core::{SearchCategory, ToolDefinition, VerifiedVenue};
use serde_json::json;

pub const DRAFT_SYSTEM_PROMPT: &str = "당신은 부산 여행 전문가입니다.

사용자의 질문에 대해 친근하고 도움이 되는 답변을 제공하세요.
여행 관련 답변을 할 때는 구체적인 장소명, 식당명, 숙소명을 언급하세요.

답변 스타일:
- 친근하고 자연스러운 한국어 사용
- 구체적이고 실용적인 정보 제공
- 부산 지역 전문성 활용";

pub const MERGE_SYSTEM_PROMPT: &str = "사용자에게 도움이 되는 최종 답변을 만드세요.

기존 답변과 실제 검색된 정보를 자연스럽게 결합하여:
1. 기존 답변의 내용을 유지하면서
2. 실제 검색된 정보를 추가로 제공
3. 중복 제거하고 정리된 형태로 제시

실제 정보가 있는 경우 그것을 우선하여 추천하세요.";

pub const TOOL_SYSTEM_PROMPT: &str = "당신은 부산 여행 전문가 챗봇입니다. \
사용자의 질문에 따라 적절한 검색 도구를 사용하여 정확한 정보를 제공합니다.

**사용 가능한 도구:**
- search_restaurants: 음식점, 맛집, 카페 등을 검색할 때 사용
- search_accommodations: 호텔, 펜션, 숙소 등을 검색할 때 사용
- search_local: 관광지, 쇼핑몰, 병원 등 일반 장소를 검색할 때 사용

**도구 사용 가이드라인:**
- 사용자가 음식점이나 맛집을 묻는다면 search_restaurants 사용
- 사용자가 숙박이나 머물 곳을 묻는다면 search_accommodations 사용
- 사용자가 관광지나 기타 장소를 묻는다면 search_local 사용
- 여러 종류의 정보가 필요하면 여러 도구를 순차적으로 사용

**응답 스타일:**
- 친근하고 전문적인 톤으로 답변
- 실제 검색된 장소들의 정보만 제공

사용자의 질문을 분석하여 필요한 경우 적절한 검색 도구를 사용하세요.";

pub const TOOL_RESPONSE_SYSTEM_PROMPT: &str = "검색 결과를 바탕으로 사용자에게 유용한 답변을 제공하세요.

**답변 형식:**
1. 검색 결과 요약
2. 각 장소별 상세 정보:
   - 🏢 상호명
   - 📍 주소 (도로명주소 우선)
   - ☎ 전화번호 (있는 경우)
   - 🏷️ 카테고리
   - 📝 설명/특징

**추가 팁:**
- 위치별 접근성 안내
- 주변 관광지나 편의시설 정보
- 방문 시 유의사항이나 추천사항
- 대중교통 이용 방법

검색된 실제 정보만 사용하고, 추측하지 마세요. 친근하고 도움이 되는 톤으로 답변하세요.";

/// Returned when the follow-up call after tool use yields nothing usable
pub const TOOL_FALLBACK_ANSWER: &str = "죄송합니다. 응답을 처리하는 중 문제가 발생했습니다.";

/// One venue rendered for the merge prompt; empty phone and description lines are omitted
pub fn format_venue_block(venue: &VerifiedVenue) -> String {
    let address = if venue.address.is_empty() {
        venue.road_address.as_str()
    } else {
        venue.address.as_str()
    };

    let mut lines = vec![format!("**{}**", venue.title), format!("📍 {}", address)];
    if !venue.phone.is_empty() {
        lines.push(format!("☎ {}", venue.phone));
    }
    if !venue.description.is_empty() {
        lines.push(format!("💡 {}", venue.description));
    }
    lines.join("\n")
}

pub fn merge_user_prompt(draft: &str, venues: &[VerifiedVenue]) -> String {
    let venue_info = venues
        .iter()
        .map(format_venue_block)
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "기존 답변: {}\n\n실제 검색 정보:\n{}\n\n위 정보들을 종합하여 사용자에게 도움이 되는 최종 답변을 작성해주세요.",
        draft, venue_info
    )
}

/// Tool name offered to the model for each search category
pub fn tool_name(category: SearchCategory) -> &'static str {
    match category {
        SearchCategory::Restaurant => "search_restaurants",
        SearchCategory::Accommodation => "search_accommodations",
        SearchCategory::Local => "search_local",
    }
}

pub fn category_for_tool(name: &str) -> Option<SearchCategory> {
    [
        SearchCategory::Restaurant,
        SearchCategory::Accommodation,
        SearchCategory::Local,
    ]
    .into_iter()
    .find(|category| tool_name(*category) == name)
}

pub fn search_tools(default_region: &str) -> Vec<ToolDefinition> {
    let tool = |category: SearchCategory, description: &str, query_hint: &str| ToolDefinition {
        name: tool_name(category).to_string(),
        description: description.to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": query_hint},
                "location": {
                    "type": "string",
                    "description": format!("검색할 지역 (기본값: {})", default_region),
                    "default": default_region
                },
                "count": {
                    "type": "number",
                    "description": format!("검색할 결과 개수 (기본값: {})", category.default_display()),
                    "default": category.default_display()
                }
            },
            "required": ["query"]
        }),
    };

    vec![
        tool(
            SearchCategory::Restaurant,
            "음식점을 검색합니다. 맛집, 카페, 레스토랑 등을 찾을 때 사용하세요.",
            "검색할 음식점 종류나 이름 (예: \"해물탕\", \"이탈리안\", \"카페\")",
        ),
        tool(
            SearchCategory::Accommodation,
            "숙소를 검색합니다. 호텔, 펜션, 게스트하우스 등을 찾을 때 사용하세요.",
            "검색할 숙소 종류나 이름 (예: \"호텔\", \"펜션\", \"리조트\")",
        ),
        tool(
            SearchCategory::Local,
            "일반적인 장소나 관광지를 검색합니다. 관광지, 쇼핑몰, 병원 등을 찾을 때 사용하세요.",
            "검색할 장소나 업체 종류 (예: \"관광지\", \"쇼핑몰\", \"병원\")",
        ),
    ]
}
