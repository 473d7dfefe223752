//! Answer counts per practice set and per knowledge component.
//!
//! Callers pass [`first_answers`](super::first_answers) so a count means
//! "distinct (user, item) answers", with a shared item counted in every set
//! it belongs to.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::types::{AnswerRecord, KnowledgeComponentId, PracticeSetId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PracticeSetCount {
    pub ps_id: PracticeSetId,
    pub count: usize,
    pub url: Option<String>,
}

impl PracticeSetCount {
    pub const HEADERS: &'static [&'static str] = &["ps_id", "count", "url"];

    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.ps_id.to_string(),
            self.count.to_string(),
            self.url.clone().unwrap_or_default(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KnowledgeComponentCount {
    pub kc_id: KnowledgeComponentId,
    pub count: usize,
}

impl KnowledgeComponentCount {
    pub const HEADERS: &'static [&'static str] = &["kc_id", "count"];

    pub fn to_row(&self) -> Vec<String> {
        vec![self.kc_id.to_string(), self.count.to_string()]
    }
}

/// Answers per practice set, most answered first. Ties keep first-seen order.
pub fn count_by_practice_set(records: &[AnswerRecord]) -> Vec<PracticeSetCount> {
    let mut order: Vec<PracticeSetId> = Vec::new();
    let mut counts: HashMap<PracticeSetId, PracticeSetCount> = HashMap::new();

    for record in records {
        let Some(ps_id) = record.practice_set_id else {
            continue;
        };
        let entry = counts.entry(ps_id).or_insert_with(|| {
            order.push(ps_id);
            PracticeSetCount {
                ps_id,
                count: 0,
                url: None,
            }
        });
        entry.count += 1;
        if entry.url.is_none() {
            entry.url = record.url.clone();
        }
    }

    let mut result: Vec<PracticeSetCount> = order
        .into_iter()
        .filter_map(|id| counts.remove(&id))
        .collect();
    result.sort_by(|a, b| b.count.cmp(&a.count));
    result
}

/// Answers per knowledge component, most answered first.
///
/// An answer is counted once per component even when its item sits in two
/// practice sets of the same component.
pub fn count_by_knowledge_component(records: &[AnswerRecord]) -> Vec<KnowledgeComponentCount> {
    let mut order: Vec<KnowledgeComponentId> = Vec::new();
    let mut counts: HashMap<KnowledgeComponentId, usize> = HashMap::new();
    let mut seen: HashSet<(i64, KnowledgeComponentId)> = HashSet::new();

    for record in records {
        let Some(kc_id) = record.knowledge_component_id else {
            continue;
        };
        if !seen.insert((record.record_id, kc_id)) {
            continue;
        }
        let count = counts.entry(kc_id).or_insert_with(|| {
            order.push(kc_id);
            0
        });
        *count += 1;
    }

    let mut result: Vec<KnowledgeComponentCount> = order
        .into_iter()
        .map(|kc_id| KnowledgeComponentCount {
            kc_id,
            count: counts[&kc_id],
        })
        .collect();
    result.sort_by(|a, b| b.count.cmp(&a.count));
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, ps: Option<i64>, kc: Option<i64>, url: Option<&str>) -> AnswerRecord {
        AnswerRecord {
            record_id: id,
            user_id: id,
            item_id: 1,
            is_correct: Some(true),
            question_template: None,
            correct_answer: None,
            practice_set_id: ps,
            knowledge_component_id: kc,
            url: url.map(str::to_string),
            exercise: None,
        }
    }

    #[test]
    fn test_count_by_practice_set_sorted_descending() {
        let records = vec![
            record(1, Some(1), Some(26), Some("a")),
            record(2, Some(2), Some(26), Some("b")),
            record(3, Some(2), Some(26), Some("b")),
            record(4, Some(3), Some(30), None),
            record(5, None, None, None),
        ];
        let counts = count_by_practice_set(&records);
        assert_eq!(counts.len(), 3);
        assert_eq!(counts[0].ps_id, 2);
        assert_eq!(counts[0].count, 2);
        assert_eq!(counts[0].url.as_deref(), Some("b"));
        // tie between 1 and 3 keeps first-seen order
        assert_eq!(counts[1].ps_id, 1);
        assert_eq!(counts[2].ps_id, 3);
        assert_eq!(counts[2].to_row(), vec!["3", "1", ""]);
    }

    #[test]
    fn test_count_by_knowledge_component() {
        let records = vec![
            record(1, Some(1), Some(30), None),
            record(2, Some(2), Some(26), None),
            record(3, Some(2), Some(26), None),
            record(4, Some(2), None, None),
        ];
        let counts = count_by_knowledge_component(&records);
        assert_eq!(
            counts,
            vec![
                KnowledgeComponentCount { kc_id: 26, count: 2 },
                KnowledgeComponentCount { kc_id: 30, count: 1 },
            ]
        );
    }

    #[test]
    fn test_shared_item_counts_per_set_but_once_per_component() {
        // one answer to an item listed in practice sets 1 and 2, both in kc 26
        let records = vec![
            record(7, Some(1), Some(26), Some("a")),
            record(7, Some(2), Some(26), Some("b")),
        ];
        let by_set = count_by_practice_set(&records);
        assert_eq!(by_set.len(), 2);
        assert!(by_set.iter().all(|c| c.count == 1));

        let by_kc = count_by_knowledge_component(&records);
        assert_eq!(by_kc, vec![KnowledgeComponentCount { kc_id: 26, count: 1 }]);
    }

    #[test]
    fn test_counts_empty() {
        assert!(count_by_practice_set(&[]).is_empty());
        assert!(count_by_knowledge_component(&[]).is_empty());
    }
}
