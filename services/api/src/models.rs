//! API Models
//!
//! Response bodies of the REST API, annotated for OpenAPI generation with
//! `utoipa`.

use affect_tutor_core::{ContentStore, Subject};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct SubjectSummary {
    #[schema(example = "adsa")]
    pub id: String,
    #[schema(example = "ADSA")]
    pub name: String,
    #[schema(example = 4)]
    pub lesson_count: usize,
}

impl SubjectSummary {
    pub fn new(content: &ContentStore, subject: Subject) -> Self {
        Self {
            id: subject.as_str().to_string(),
            name: subject.as_str().to_uppercase(),
            lesson_count: content.lessons(subject).len(),
        }
    }
}

/// One lesson of a subject, in both its base and simplified form.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct Lesson {
    #[schema(example = "os")]
    pub subject: String,
    /// The requested index.
    pub index: usize,
    /// The index after wrapping into the lesson sequence.
    pub position: usize,
    pub base: String,
    pub simplified: String,
}

impl Lesson {
    pub fn new(content: &ContentStore, subject: Subject, index: usize) -> Self {
        Self {
            subject: subject.as_str().to_string(),
            index,
            position: index % content.lessons(subject).len(),
            base: content.base(subject, index).to_string(),
            simplified: content.simplified(subject, index).to_string(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_summary_uses_base_sequence_length() {
        let content = ContentStore::builtin();
        let summary = SubjectSummary::new(&content, Subject::Java);
        assert_eq!(summary.id, "java");
        assert_eq!(summary.name, "JAVA");
        assert_eq!(summary.lesson_count, 4);
    }

    #[test]
    fn test_lesson_wraps_index() {
        let content = ContentStore::builtin();
        let lesson = Lesson::new(&content, Subject::Adsa, 6);
        assert_eq!(lesson.index, 6);
        assert_eq!(lesson.position, 2);
        assert_eq!(lesson.simplified, "Tree: items in parent/child form.");
        assert_eq!(lesson.base, content.base(Subject::Adsa, 2));
    }

    #[test]
    fn test_lesson_serialization() {
        let content = ContentStore::builtin();
        let json = serde_json::to_value(Lesson::new(&content, Subject::Os, 0)).unwrap();
        assert_eq!(json["subject"], "os");
        assert_eq!(json["position"], 0);
        assert!(json["base"].as_str().is_some_and(|s| !s.is_empty()));
    }
}
