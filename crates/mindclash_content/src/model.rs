//! Content store payloads and the answer-free display types.

use serde::{Deserialize, Serialize};

/// One quiz question as the content store serves it. `correct_index` is
/// present in store payloads but must never reach a display layer; the
/// authoritative correctness check happens on-ledger.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Question {
    /// Stable question id, referenced by the ledger.
    pub id: u16,
    /// Question text.
    pub text: String,
    /// Answer options.
    pub options: Vec<String>,
    /// Index of the correct option, when the store includes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_index: Option<u8>,
}

/// A topic groups questions under one concept.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Topic {
    /// Stable topic id, referenced by the ledger.
    pub id: u16,
    /// Topic name.
    pub name: String,
    /// Questions under this topic.
    pub questions: Vec<Question>,
}

/// The content store's top-level unit.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Concept {
    /// Stable concept id, referenced by the ledger.
    pub id: u16,
    /// Concept name.
    pub name: String,
    /// Topics under this concept.
    pub topics: Vec<Topic>,
}

/// A topic prepared for the study screen. No question content, no
/// correctness.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StudyTopic {
    /// Owning concept id.
    pub concept_id: u16,
    /// Owning concept name.
    pub concept_name: String,
    /// Topic id.
    pub topic_id: u16,
    /// Topic name.
    pub name: String,
}

/// A question prepared for the battle screen. Deliberately has no
/// correctness field at the type level.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BattleQuestion {
    /// Owning topic id.
    pub topic_id: u16,
    /// Question id.
    pub question_id: u16,
    /// Question text.
    pub text: String,
    /// Answer options in store order.
    pub options: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concept_json_shape() {
        let json = r#"{
            "id": 12,
            "name": "Orbital Mechanics",
            "topics": [
                {
                    "id": 120,
                    "name": "Kepler's Laws",
                    "questions": [
                        {
                            "id": 1200,
                            "text": "What shape is a bound orbit?",
                            "options": ["Circle", "Ellipse", "Parabola", "Line"],
                            "correct_index": 1
                        }
                    ]
                }
            ]
        }"#;
        let concept: Concept = serde_json::from_str(json).unwrap();
        assert_eq!(concept.id, 12);
        assert_eq!(concept.topics[0].questions[0].correct_index, Some(1));
    }

    #[test]
    fn test_missing_correct_index_tolerated() {
        let json = r#"{"id": 1, "text": "Q?", "options": ["a", "b"]}"#;
        let question: Question = serde_json::from_str(json).unwrap();
        assert_eq!(question.correct_index, None);
    }
}
