//! Heuristic travel-entity extraction.
//!
//! Four lexical pattern classes are scanned in a fixed order and their matches
//! unioned. Nothing here checks that a match is a real place; an empty result is
//! what marks a turn as "general".

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Maximum number of entities kept per turn
pub const MAX_ENTITIES: usize = 5;

/// Pattern class that produced an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Beaches, parks, markets, towers, districts and similar
    Place,
    /// Restaurants, cafes and dish-named eateries
    Food,
    /// Hotels, pensions, guesthouses, resorts, motels
    Lodging,
    /// Gazetteer hit on a known district name
    District,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedEntity {
    pub name: String,
    pub kind: EntityKind,
}

lazy_static! {
    static ref PATTERNS: Vec<(EntityKind, Regex)> = vec![
        (
            EntityKind::Place,
            Regex::new(r"[가-힣]+(?:해수욕장|공원|시장|타워|센터|몰|광장|마을|동|구)")
                .expect("place pattern is valid"),
        ),
        (
            EntityKind::Food,
            Regex::new(r"[가-힣]+(?:식당|카페|레스토랑|집|횟집|국밥|갈비|치킨|피자)")
                .expect("food pattern is valid"),
        ),
        (
            EntityKind::Lodging,
            Regex::new(r"[가-힣]+(?:호텔|펜션|게스트하우스|리조트|모텔)")
                .expect("lodging pattern is valid"),
        ),
        (
            EntityKind::District,
            Regex::new(r"해운대|광안리|태종대|감천|자갈치|국제시장|송도|서면|남포동|기장|동래")
                .expect("district pattern is valid"),
        ),
    ];
}

/// Scan `text` and return at most [`MAX_ENTITIES`] distinct entities in scan order
pub fn extract(text: &str) -> Vec<ExtractedEntity> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut entities = Vec::new();

    for (kind, pattern) in PATTERNS.iter() {
        for found in pattern.find_iter(text) {
            if entities.len() == MAX_ENTITIES {
                return entities;
            }
            if seen.insert(found.as_str()) {
                entities.push(ExtractedEntity {
                    name: found.as_str().to_string(),
                    kind: *kind,
                });
            }
        }
    }

    entities
}

/// Entity names in order, as sent to the fan-out and exposed as `locations`
pub fn entity_names(entities: &[ExtractedEntity]) -> Vec<String> {
    entities.iter().map(|e| e.name.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_question_hits_gazetteer() {
        let entities = extract("해운대에서 맛있는 식당 추천해줘");
        assert!(entities.contains(&ExtractedEntity {
            name: "해운대".to_string(),
            kind: EntityKind::District,
        }));
    }

    #[test]
    fn test_classes_are_scanned_in_order() {
        let text = "해운대해수욕장 근처 금수복국 본점과 파라다이스호텔을 추천해요. 광안리도 좋아요.";
        let entities = extract(text);

        assert_eq!(
            entity_names(&entities),
            vec!["해운대해수욕장", "파라다이스호텔", "해운대", "광안리"]
        );
        assert_eq!(entities[0].kind, EntityKind::Place);
        assert_eq!(entities[1].kind, EntityKind::Lodging);
        assert_eq!(entities[2].kind, EntityKind::District);
    }

    #[test]
    fn test_duplicates_keep_first_class() {
        let entities = extract("남포동 맛집은 남포동 골목에 있어요");
        let names = entity_names(&entities);

        assert_eq!(names.iter().filter(|n| *n == "남포동").count(), 1);
        assert_eq!(entities[0].name, "남포동");
        assert_eq!(entities[0].kind, EntityKind::Place);
        assert!(names.contains(&"맛집".to_string()));
    }

    #[test]
    fn test_cap_at_five() {
        let entities = extract("서면 남포동 기장 동래 송도 태종대 감천");

        assert_eq!(entities.len(), MAX_ENTITIES);
        assert_eq!(
            entity_names(&entities),
            vec!["남포동", "서면", "기장", "동래", "송도"]
        );
    }

    #[test]
    fn test_every_entity_is_a_substring() {
        let text = "자갈치시장에서 회를 먹고 광복동 카페거리와 용궁사를 지나 \
                    해운대 엘시티 레지던스 호텔과 송정 게스트하우스를 고려해 보세요";
        let entities = extract(text);

        assert!(!entities.is_empty());
        assert!(entities.len() <= MAX_ENTITIES);
        for entity in &entities {
            assert!(text.contains(&entity.name), "{} not in text", entity.name);
        }
    }

    #[test]
    fn test_general_text_has_no_entities() {
        assert!(extract("안녕하세요 반갑습니다").is_empty());
        assert!(extract("Hello, how are you?").is_empty());
        assert!(extract("").is_empty());
    }
}
