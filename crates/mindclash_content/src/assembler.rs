//! # Quiz Assembler
//!
//! Turns a room's ledger-recorded content selection into display-ready
//! views. The ledger is authoritative about *which* topics and questions
//! a room uses; the content store only supplies their text. Assembly
//! never re-randomizes: it matches by id, in ledger order.

use mindclash_core::RateLimiter;
use mindclash_ledger::snapshot::BattleRoomSnapshot;

use crate::model::{BattleQuestion, Concept, StudyTopic};
use crate::store::{ConceptStore, ContentError};

/// The identifiers a room recorded on-chain.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoomSelection {
    /// Concepts in selection order.
    pub concept_ids: Vec<u16>,
    /// Two topics per concept, in selection order.
    pub topic_ids: Vec<u16>,
    /// One question per topic, in battle order.
    pub question_ids: Vec<u16>,
}

impl RoomSelection {
    /// Pulls the selection out of a room snapshot.
    #[must_use]
    pub fn from_room(room: &BattleRoomSnapshot) -> Self {
        Self {
            concept_ids: room.concept_ids.clone(),
            topic_ids: room.topic_ids.clone(),
            question_ids: room.question_ids.clone(),
        }
    }
}

/// Everything one battle room needs from the content store.
#[derive(Clone, Debug)]
pub struct QuizAssembly {
    /// The fetched concepts, un-pruned, for reuse across phases.
    pub concepts: Vec<Concept>,
    /// Study-screen topics: exactly the ledger-recorded ones, in order.
    pub study_topics: Vec<StudyTopic>,
    /// Battle-screen questions: exactly the ledger-recorded ones, in
    /// order, with correctness stripped.
    pub battle_questions: Vec<BattleQuestion>,
}

/// Fetches and assembles a room's quiz content.
///
/// Each concept is fetched individually through the rate limiter (the
/// store has no bulk lookup for a selection). A concept that fails to
/// fetch is logged and skipped; the batch only fails hard when nothing
/// at all could be retrieved.
///
/// # Errors
///
/// Returns [`ContentError::Empty`] when no concept of the selection
/// could be fetched.
pub async fn assemble(
    selection: &RoomSelection,
    store: &dyn ConceptStore,
    limiter: &RateLimiter,
) -> Result<QuizAssembly, ContentError> {
    let mut concepts = Vec::with_capacity(selection.concept_ids.len());
    for &id in &selection.concept_ids {
        match limiter.run(|| store.fetch_concept(id)).await {
            Ok(concept) => concepts.push(concept),
            Err(e) => tracing::warn!(concept = id, error = %e, "skipping concept"),
        }
    }
    if concepts.is_empty() {
        return Err(ContentError::Empty);
    }

    let study_topics = prune_topics(&concepts, &selection.topic_ids);
    let battle_questions = prune_questions(&concepts, &selection.question_ids);
    tracing::debug!(
        concepts = concepts.len(),
        topics = study_topics.len(),
        questions = battle_questions.len(),
        "quiz content assembled"
    );

    Ok(QuizAssembly {
        concepts,
        study_topics,
        battle_questions,
    })
}

fn prune_topics(concepts: &[Concept], topic_ids: &[u16]) -> Vec<StudyTopic> {
    let mut out = Vec::with_capacity(topic_ids.len());
    for &topic_id in topic_ids {
        let found = concepts.iter().find_map(|concept| {
            concept
                .topics
                .iter()
                .find(|t| t.id == topic_id)
                .map(|topic| StudyTopic {
                    concept_id: concept.id,
                    concept_name: concept.name.clone(),
                    topic_id: topic.id,
                    name: topic.name.clone(),
                })
        });
        match found {
            Some(topic) => out.push(topic),
            // The concept carrying this topic was skipped upstream.
            None => tracing::warn!(topic_id, "ledger-recorded topic missing from content"),
        }
    }
    out
}

fn prune_questions(concepts: &[Concept], question_ids: &[u16]) -> Vec<BattleQuestion> {
    let mut out = Vec::with_capacity(question_ids.len());
    for &question_id in question_ids {
        let found = concepts.iter().find_map(|concept| {
            concept.topics.iter().find_map(|topic| {
                topic
                    .questions
                    .iter()
                    .find(|q| q.id == question_id)
                    .map(|q| BattleQuestion {
                        topic_id: topic.id,
                        question_id: q.id,
                        text: q.text.clone(),
                        options: q.options.clone(),
                    })
            })
        });
        match found {
            Some(question) => out.push(question),
            None => tracing::warn!(question_id, "ledger-recorded question missing from content"),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Question, Topic};
    use async_trait::async_trait;
    use mindclash_core::LimiterConfig;
    use parking_lot::Mutex;
    use std::collections::HashSet;
    use std::time::Duration;

    /// Five concepts, two topics each, three questions per topic. The
    /// store knows more content than any room selects.
    fn catalogue() -> Vec<Concept> {
        (1..=5u16)
            .map(|c| Concept {
                id: c,
                name: format!("Concept {c}"),
                topics: (0..2u16)
                    .map(|t| {
                        let topic_id = c * 10 + t;
                        Topic {
                            id: topic_id,
                            name: format!("Topic {topic_id}"),
                            questions: (0..3u16)
                                .map(|q| Question {
                                    id: topic_id * 10 + q,
                                    text: format!("Question {}?", topic_id * 10 + q),
                                    options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                                    correct_index: Some((q % 4) as u8),
                                })
                                .collect(),
                        }
                    })
                    .collect(),
            })
            .collect()
    }

    /// Ledger selection: all five concepts, both topics each, the middle
    /// question of every topic.
    fn selection() -> RoomSelection {
        RoomSelection {
            concept_ids: (1..=5).collect(),
            topic_ids: (1..=5u16).flat_map(|c| [c * 10, c * 10 + 1]).collect(),
            question_ids: (1..=5u16)
                .flat_map(|c| [c * 100 + 1, (c * 10 + 1) * 10 + 1])
                .collect(),
        }
    }

    struct MockStore {
        catalogue: Vec<Concept>,
        fail_ids: HashSet<u16>,
        calls: Mutex<Vec<u16>>,
    }

    impl MockStore {
        fn new(fail_ids: impl IntoIterator<Item = u16>) -> Self {
            Self {
                catalogue: catalogue(),
                fail_ids: fail_ids.into_iter().collect(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ConceptStore for MockStore {
        async fn fetch_concept(&self, id: u16) -> Result<Concept, ContentError> {
            self.calls.lock().push(id);
            if self.fail_ids.contains(&id) {
                return Err(ContentError::NotFound(id));
            }
            self.catalogue
                .iter()
                .find(|c| c.id == id)
                .cloned()
                .ok_or(ContentError::NotFound(id))
        }

        async fn fetch_all(&self) -> Result<Vec<Concept>, ContentError> {
            Ok(self.catalogue.clone())
        }
    }

    fn limiter() -> RateLimiter {
        RateLimiter::new(LimiterConfig {
            min_gap: Duration::from_millis(10),
            ..LimiterConfig::default()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_assembles_exactly_ledger_selection() {
        let store = MockStore::new([]);
        let assembly = assemble(&selection(), &store, &limiter()).await.unwrap();

        assert_eq!(assembly.concepts.len(), 5);
        assert_eq!(assembly.study_topics.len(), 10);
        assert_eq!(assembly.battle_questions.len(), 10);

        // Ledger order is preserved, not store order.
        let topic_ids: Vec<u16> = assembly.study_topics.iter().map(|t| t.topic_id).collect();
        assert_eq!(topic_ids, selection().topic_ids);
        let question_ids: Vec<u16> =
            assembly.battle_questions.iter().map(|q| q.question_id).collect();
        assert_eq!(question_ids, selection().question_ids);

        // One fetch per concept, in selection order.
        assert_eq!(*store.calls.lock(), vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_failed_concept_is_skipped() {
        let store = MockStore::new([3]);
        let assembly = assemble(&selection(), &store, &limiter()).await.unwrap();

        assert_eq!(assembly.concepts.len(), 4);
        // Concept 3's topics and questions vanish with it.
        assert_eq!(assembly.study_topics.len(), 8);
        assert_eq!(assembly.battle_questions.len(), 8);
        assert!(assembly.study_topics.iter().all(|t| t.concept_id != 3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_failed_is_hard_error() {
        let store = MockStore::new(1..=5);
        let result = assemble(&selection(), &store, &limiter()).await;
        assert!(matches!(result, Err(ContentError::Empty)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_correctness_reaches_battle_view() {
        let store = MockStore::new([]);
        let assembly = assemble(&selection(), &store, &limiter()).await.unwrap();

        // The display type has no correctness field; make sure nothing
        // sneaks through a rendered form either.
        for question in &assembly.battle_questions {
            let rendered = format!("{question:?}");
            assert!(!rendered.contains("correct"), "leak in {rendered}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttled_store_retried() {
        struct FlakyStore {
            catalogue: Vec<Concept>,
            throttles_left: Mutex<u32>,
        }

        #[async_trait]
        impl ConceptStore for FlakyStore {
            async fn fetch_concept(&self, id: u16) -> Result<Concept, ContentError> {
                let mut left = self.throttles_left.lock();
                if *left > 0 {
                    *left -= 1;
                    return Err(ContentError::RateLimited("http 429".to_string()));
                }
                drop(left);
                self.catalogue
                    .iter()
                    .find(|c| c.id == id)
                    .cloned()
                    .ok_or(ContentError::NotFound(id))
            }

            async fn fetch_all(&self) -> Result<Vec<Concept>, ContentError> {
                Ok(self.catalogue.clone())
            }
        }

        let store = FlakyStore {
            catalogue: catalogue(),
            throttles_left: Mutex::new(2),
        };
        let sel = RoomSelection {
            concept_ids: vec![1],
            topic_ids: vec![10, 11],
            question_ids: vec![101, 111],
        };
        let assembly = assemble(&sel, &store, &limiter()).await.unwrap();
        assert_eq!(assembly.concepts.len(), 1);
        assert_eq!(assembly.battle_questions.len(), 2);
    }

    /// Serves the catalogue but answers every request for one concept
    /// with a throttle, forever.
    struct ThrottledConcept {
        catalogue: Vec<Concept>,
        throttled_id: u16,
        calls: Mutex<Vec<u16>>,
    }

    #[async_trait]
    impl ConceptStore for ThrottledConcept {
        async fn fetch_concept(&self, id: u16) -> Result<Concept, ContentError> {
            self.calls.lock().push(id);
            if id == self.throttled_id {
                return Err(ContentError::RateLimited("http 503".to_string()));
            }
            self.catalogue
                .iter()
                .find(|c| c.id == id)
                .cloned()
                .ok_or(ContentError::NotFound(id))
        }

        async fn fetch_all(&self) -> Result<Vec<Concept>, ContentError> {
            Ok(self.catalogue.clone())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_throttle_skips_concept() {
        let store = ThrottledConcept {
            catalogue: catalogue(),
            throttled_id: 3,
            calls: Mutex::new(Vec::new()),
        };
        let assembly = assemble(&selection(), &store, &limiter()).await.unwrap();

        // Concept 3 runs out of retries and drops; the rest survive.
        assert_eq!(assembly.concepts.len(), 4);
        assert_eq!(assembly.study_topics.len(), 8);
        assert_eq!(assembly.battle_questions.len(), 8);
        assert!(assembly.study_topics.iter().all(|t| t.concept_id != 3));

        // One initial try plus three backoff retries.
        let attempts = store.calls.lock().iter().filter(|&&id| id == 3).count();
        assert_eq!(attempts, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lone_throttled_concept_is_hard_error() {
        let store = ThrottledConcept {
            catalogue: catalogue(),
            throttled_id: 1,
            calls: Mutex::new(Vec::new()),
        };
        let sel = RoomSelection {
            concept_ids: vec![1],
            topic_ids: vec![10, 11],
            question_ids: vec![101, 111],
        };
        let result = assemble(&sel, &store, &limiter()).await;
        assert!(matches!(result, Err(ContentError::Empty)));
    }
}
