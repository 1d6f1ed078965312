//! Question/answer store
//!
//! Holds the single active question set posed by the `ask_question` tool.
//! The agent protocol is turn based and cannot block, so the tool returns
//! immediately and the answers are picked up on a later turn once the user
//! submits them through the UI.

use super::events::{UiEvent, UiEvents};
use crate::utils::fallback_id;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub question: String,
    pub options: Vec<QuestionOption>,
    pub allow_custom: bool,
    /// Mutually exclusive with `custom_answer`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_option_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_answer: Option<String>,
}

impl Question {
    pub fn is_answered(&self) -> bool {
        self.selected_option_id.is_some() || self.custom_answer.is_some()
    }

    fn answer(&self) -> Answer {
        let selected_option = self.selected_option_id.as_ref().and_then(|id| {
            self.options
                .iter()
                .find(|opt| &opt.id == id)
                .map(|opt| opt.label.clone())
        });
        Answer {
            selected_option,
            custom_answer: self.custom_answer.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSet {
    pub id: String,
    pub questions: Vec<Question>,
    pub current_index: usize,
    pub submitted: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewOption {
    #[serde(default)]
    pub id: Option<String>,
    pub label: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewQuestion {
    #[serde(default)]
    pub id: Option<String>,
    pub question: String,
    pub options: Vec<NewOption>,
    #[serde(default = "default_true")]
    pub allow_custom: bool,
}

fn default_true() -> bool {
    true
}

/// Snapshot for one question: the selected option's label or the custom text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_option: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_answer: Option<String>,
}

/// Answers keyed by question id
pub type AnswerMap = BTreeMap<String, Answer>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuestionError {
    #[error("no active question set")]
    NoActiveSet,
    #[error("question set has already been submitted")]
    AlreadySubmitted,
    #[error("unknown question '{0}'")]
    UnknownQuestion(String),
    #[error("question '{question}' has no option '{option}'")]
    UnknownOption { question: String, option: String },
    #[error("question '{0}' does not accept custom answers")]
    CustomNotAllowed(String),
}

pub struct QuestionStore {
    active: RwLock<Option<QuestionSet>>,
    events: UiEvents,
}

impl QuestionStore {
    pub fn new(events: UiEvents) -> Self {
        Self {
            active: RwLock::new(None),
            events,
        }
    }

    pub fn active_question_set(&self) -> Option<QuestionSet> {
        self.active.read().ok().and_then(|set| set.clone())
    }

    /// Replace any previous set, submitted or not. Returns the new set id.
    pub fn set_questions(&self, questions: Vec<NewQuestion>) -> String {
        let questions = questions
            .into_iter()
            .enumerate()
            .map(|(q_idx, q)| Question {
                id: q.id.unwrap_or_else(|| fallback_id("q", q_idx)),
                question: q.question,
                options: q
                    .options
                    .into_iter()
                    .enumerate()
                    .map(|(o_idx, o)| QuestionOption {
                        id: o.id.unwrap_or_else(|| fallback_id("opt", o_idx)),
                        label: o.label,
                    })
                    .collect(),
                allow_custom: q.allow_custom,
                selected_option_id: None,
                custom_answer: None,
            })
            .collect();

        let set = QuestionSet {
            id: uuid::Uuid::new_v4().to_string(),
            questions,
            current_index: 0,
            submitted: false,
        };
        let id = set.id.clone();
        tracing::debug!("New question set {} ({} questions)", id, set.questions.len());
        self.replace(Some(set));
        id
    }

    pub fn select_option(&self, question_id: &str, option_id: &str) -> Result<(), QuestionError> {
        self.edit_question(question_id, |question| {
            if !question.options.iter().any(|opt| opt.id == option_id) {
                return Err(QuestionError::UnknownOption {
                    question: question.id.clone(),
                    option: option_id.to_string(),
                });
            }
            question.selected_option_id = Some(option_id.to_string());
            question.custom_answer = None;
            Ok(())
        })
    }

    /// Blank text leaves the question without a custom answer
    pub fn set_custom_answer(&self, question_id: &str, text: &str) -> Result<(), QuestionError> {
        self.edit_question(question_id, |question| {
            if !question.allow_custom {
                return Err(QuestionError::CustomNotAllowed(question.id.clone()));
            }
            question.custom_answer = if text.trim().is_empty() {
                None
            } else {
                Some(text.to_string())
            };
            question.selected_option_id = None;
            Ok(())
        })
    }

    /// Advance, clamped to the last question. Returns the new index.
    pub fn next_question(&self) -> Option<usize> {
        self.move_index(|index, len| (index + 1).min(len.saturating_sub(1)))
    }

    /// Go back, clamped to the first question. Returns the new index.
    pub fn prev_question(&self) -> Option<usize> {
        self.move_index(|index, _| index.saturating_sub(1))
    }

    /// Mark the set submitted and snapshot every answer. Does not clear the set.
    pub fn submit_answers(&self) -> Option<AnswerMap> {
        let (set_id, answers) = {
            let mut guard = self.active.write().ok()?;
            let set = guard.as_mut()?;
            set.submitted = true;
            (set.id.clone(), snapshot(set))
        };
        tracing::info!("Question set {} submitted", set_id);
        self.events.emit(UiEvent::QuestionsSubmitted { set_id });
        self.emit_changed();
        Some(answers)
    }

    pub fn has_unanswered_questions(&self) -> bool {
        match self.active_question_set() {
            Some(set) if !set.submitted => set.questions.iter().any(|q| !q.is_answered()),
            _ => false,
        }
    }

    pub fn clear_questions(&self) {
        self.replace(None);
    }

    /// Hand a submitted set to the agent and clear it
    pub fn take_submitted_answers(&self) -> Option<(QuestionSet, AnswerMap)> {
        let taken = {
            let mut guard = self.active.write().ok()?;
            if !guard.as_ref().is_some_and(|set| set.submitted) {
                return None;
            }
            guard.take()?
        };
        self.emit_changed();
        let answers = snapshot(&taken);
        Some((taken, answers))
    }

    fn edit_question<F>(&self, question_id: &str, f: F) -> Result<(), QuestionError>
    where
        F: FnOnce(&mut Question) -> Result<(), QuestionError>,
    {
        {
            let mut guard = self
                .active
                .write()
                .map_err(|_| QuestionError::NoActiveSet)?;
            let set = guard.as_mut().ok_or(QuestionError::NoActiveSet)?;
            if set.submitted {
                return Err(QuestionError::AlreadySubmitted);
            }
            let question = set
                .questions
                .iter_mut()
                .find(|q| q.id == question_id)
                .ok_or_else(|| QuestionError::UnknownQuestion(question_id.to_string()))?;
            f(question)?;
        }
        self.emit_changed();
        Ok(())
    }

    fn move_index<F>(&self, f: F) -> Option<usize>
    where
        F: FnOnce(usize, usize) -> usize,
    {
        let index = {
            let mut guard = self.active.write().ok()?;
            let set = guard.as_mut()?;
            set.current_index = f(set.current_index, set.questions.len());
            set.current_index
        };
        self.emit_changed();
        Some(index)
    }

    fn replace(&self, next: Option<QuestionSet>) {
        if let Ok(mut guard) = self.active.write() {
            *guard = next;
        }
        self.emit_changed();
    }

    fn emit_changed(&self) {
        self.events.emit(UiEvent::QuestionsChanged {
            question_set: self.active_question_set(),
        });
    }
}

fn snapshot(set: &QuestionSet) -> AnswerMap {
    set.questions
        .iter()
        .map(|q| (q.id.clone(), q.answer()))
        .collect()
}

/// Render submitted answers as text for the next agent turn, in question order
pub fn format_answers(set: &QuestionSet, answers: &AnswerMap) -> String {
    let mut lines = vec!["User answered the questions:".to_string()];
    for question in &set.questions {
        let answer = answers.get(&question.id).cloned().unwrap_or_default();
        let text = answer
            .selected_option
            .or(answer.custom_answer)
            .unwrap_or_else(|| "(no answer)".to_string());
        lines.push(format!("- {}: {}", question.question, text));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: Option<&str>, text: &str, labels: &[&str]) -> NewQuestion {
        NewQuestion {
            id: id.map(str::to_string),
            question: text.to_string(),
            options: labels
                .iter()
                .map(|label| NewOption {
                    id: None,
                    label: label.to_string(),
                })
                .collect(),
            allow_custom: true,
        }
    }

    fn store_with_two() -> QuestionStore {
        let store = QuestionStore::new(UiEvents::default());
        store.set_questions(vec![
            question(Some("lang"), "Which language?", &["Rust", "Go"]),
            question(None, "Which OS?", &["Linux", "macOS", "Windows"]),
        ]);
        store
    }

    #[test]
    fn test_fallback_ids() {
        let store = store_with_two();
        let set = store.active_question_set().unwrap();
        assert_eq!(set.questions[0].id, "lang");
        assert_eq!(set.questions[1].id, "q-2");
        assert_eq!(set.questions[1].options[2].id, "opt-3");
        assert_eq!(set.current_index, 0);
        assert!(!set.submitted);
    }

    #[test]
    fn test_submit_without_answers() {
        let store = store_with_two();
        let answers = store.submit_answers().unwrap();

        assert_eq!(answers.len(), 2);
        assert_eq!(answers["lang"], Answer::default());
        assert_eq!(answers["q-2"], Answer::default());
        assert!(store.active_question_set().unwrap().submitted);
    }

    #[test]
    fn test_submit_uses_labels() {
        let store = store_with_two();
        store.select_option("lang", "opt-1").unwrap();
        store.set_custom_answer("q-2", "FreeBSD").unwrap();

        let answers = store.submit_answers().unwrap();
        assert_eq!(answers["lang"].selected_option.as_deref(), Some("Rust"));
        assert_eq!(answers["q-2"].custom_answer.as_deref(), Some("FreeBSD"));
        assert_eq!(answers["q-2"].selected_option, None);
    }

    #[test]
    fn test_mutual_exclusion() {
        let store = store_with_two();
        store.select_option("lang", "opt-2").unwrap();
        store.set_custom_answer("lang", "Zig").unwrap();
        let q = &store.active_question_set().unwrap().questions[0];
        assert_eq!(q.selected_option_id, None);
        assert_eq!(q.custom_answer.as_deref(), Some("Zig"));

        store.select_option("lang", "opt-1").unwrap();
        let q = &store.active_question_set().unwrap().questions[0];
        assert_eq!(q.selected_option_id.as_deref(), Some("opt-1"));
        assert_eq!(q.custom_answer, None);
    }

    #[test]
    fn test_invalid_edits() {
        let store = QuestionStore::new(UiEvents::default());
        assert_eq!(store.select_option("a", "b"), Err(QuestionError::NoActiveSet));

        store.set_questions(vec![NewQuestion {
            allow_custom: false,
            ..question(Some("a"), "Pick", &["x", "y"])
        }]);
        assert!(matches!(
            store.select_option("a", "nope"),
            Err(QuestionError::UnknownOption { .. })
        ));
        assert!(matches!(
            store.select_option("missing", "opt-1"),
            Err(QuestionError::UnknownQuestion(_))
        ));
        assert_eq!(
            store.set_custom_answer("a", "free text"),
            Err(QuestionError::CustomNotAllowed("a".to_string()))
        );

        store.submit_answers();
        assert_eq!(
            store.select_option("a", "opt-1"),
            Err(QuestionError::AlreadySubmitted)
        );
    }

    #[test]
    fn test_navigation_clamps() {
        let store = store_with_two();
        assert_eq!(store.prev_question(), Some(0));
        assert_eq!(store.next_question(), Some(1));
        assert_eq!(store.next_question(), Some(1));
        assert_eq!(store.prev_question(), Some(0));

        store.clear_questions();
        assert_eq!(store.next_question(), None);
    }

    #[test]
    fn test_has_unanswered() {
        let store = store_with_two();
        assert!(store.has_unanswered_questions());
        store.select_option("lang", "opt-1").unwrap();
        assert!(store.has_unanswered_questions());
        store.select_option("q-2", "opt-1").unwrap();
        assert!(!store.has_unanswered_questions());

        store.set_custom_answer("q-2", "   ").unwrap();
        assert!(store.has_unanswered_questions());
        store.submit_answers();
        assert!(!store.has_unanswered_questions());
    }

    #[test]
    fn test_second_set_overwrites_first() {
        let store = store_with_two();
        let first = store.active_question_set().unwrap().id;
        let second = store.set_questions(vec![question(None, "Again?", &["Yes", "No"])]);

        let set = store.active_question_set().unwrap();
        assert_ne!(first, second);
        assert_eq!(set.id, second);
        assert_eq!(set.questions.len(), 1);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let store = store_with_two();
        store.clear_questions();
        assert!(store.active_question_set().is_none());
        store.clear_questions();
        assert!(store.active_question_set().is_none());
    }

    #[test]
    fn test_take_submitted_answers() {
        let store = store_with_two();
        assert!(store.take_submitted_answers().is_none());

        store.select_option("lang", "opt-2").unwrap();
        store.submit_answers();
        let (set, answers) = store.take_submitted_answers().unwrap();
        assert!(store.active_question_set().is_none());

        let text = format_answers(&set, &answers);
        assert!(text.contains("- Which language?: Go"));
        assert!(text.contains("- Which OS?: (no answer)"));
    }
}
