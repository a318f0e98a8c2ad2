//! Subjects and the lesson Content Store.
//!
//! Each subject owns an ordered sequence of base statements and a parallel
//! sequence of simplified restatements. Lookups wrap the lesson index with
//! modulo arithmetic, so a lesson counter may grow without bound.

use crate::error::ContentError;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt, path::Path, str::FromStr};

/// One of the fixed set of subjects a learner can choose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    /// Operating systems.
    Os,
    /// Advanced data structures and algorithms.
    Adsa,
    /// The Java language.
    Java,
}

impl Subject {
    /// Every subject, in display order.
    pub const ALL: [Subject; 3] = [Subject::Os, Subject::Adsa, Subject::Java];

    /// The lowercase identifier used on the wire and in content files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Subject::Os => "os",
            Subject::Adsa => "adsa",
            Subject::Java => "java",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Subject {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "os" => Ok(Subject::Os),
            "adsa" => Ok(Subject::Adsa),
            "java" => Ok(Subject::Java),
            other => Err(ContentError::UnknownSubject(other.to_string())),
        }
    }
}

/// The two parallel lesson sequences of a single subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectLessons {
    pub base: Vec<String>,
    pub simplified: Vec<String>,
}

impl SubjectLessons {
    fn from_static(base: &[&str], simplified: &[&str]) -> Self {
        Self {
            base: base.iter().map(|s| s.to_string()).collect(),
            simplified: simplified.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Number of lessons, taken from the base sequence.
    pub fn len(&self) -> usize {
        self.base.len()
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
    }
}

/// Read-only lesson content for every [`Subject`].
///
/// Construction validates that every subject has non-empty sequences, so
/// [`ContentStore::base`] and [`ContentStore::simplified`] are total.
#[derive(Debug, Clone)]
pub struct ContentStore {
    lessons: [SubjectLessons; 3],
}

impl ContentStore {
    /// The built-in curriculum.
    pub fn builtin() -> Self {
        Self {
            lessons: [
                SubjectLessons::from_static(
                    &[
                        "An Operating System manages hardware and software resources.",
                        "CPU scheduling decides which process runs next.",
                        "Memory management keeps programs isolated and efficient.",
                        "File systems organize how data is stored and retrieved.",
                    ],
                    &[
                        "OS helps run apps and manage devices.",
                        "Scheduler picks which app uses CPU next.",
                        "Memory keeps programs separate and safe.",
                        "Files let you store your data.",
                    ],
                ),
                SubjectLessons::from_static(
                    &[
                        "A Stack follows LIFO: last item in, first out.",
                        "Queues are FIFO: first item in, first out.",
                        "Trees store hierarchical data; a binary tree has two children max.",
                        "Graphs model relationships between entities.",
                    ],
                    &[
                        "Stack: last in, first out.",
                        "Queue: first in, first out.",
                        "Tree: items in parent/child form.",
                        "Graph: items connected by edges.",
                    ],
                ),
                SubjectLessons::from_static(
                    &[
                        "Java is an object-oriented language using classes and objects.",
                        "Inheritance enables code reuse by deriving classes from others.",
                        "Interfaces specify method contracts without implementation.",
                        "Threads allow concurrent execution in Java applications.",
                    ],
                    &[
                        "Java uses classes; classes make objects.",
                        "Inheritance: child class gets parent's code.",
                        "Interface: a list of methods a class must have.",
                        "Threads: let multiple tasks run together.",
                    ],
                ),
            ],
        }
    }

    /// Builds a store from per-subject lessons, rejecting missing or empty subjects.
    pub fn from_map(mut map: HashMap<Subject, SubjectLessons>) -> Result<Self, ContentError> {
        let mut take = |subject: Subject| -> Result<SubjectLessons, ContentError> {
            let lessons = map
                .remove(&subject)
                .ok_or(ContentError::MissingSubject(subject))?;
            if lessons.base.is_empty() {
                return Err(ContentError::EmptySequence(subject, "base"));
            }
            if lessons.simplified.is_empty() {
                return Err(ContentError::EmptySequence(subject, "simplified"));
            }
            Ok(lessons)
        };
        Ok(Self {
            lessons: [take(Subject::Os)?, take(Subject::Adsa)?, take(Subject::Java)?],
        })
    }

    /// Parses a JSON content document keyed by subject identifier.
    pub fn from_json_str(json: &str) -> Result<Self, ContentError> {
        let map: HashMap<Subject, SubjectLessons> = serde_json::from_str(json)?;
        Self::from_map(map)
    }

    /// Loads a JSON content document from disk.
    pub fn from_path(path: &Path) -> Result<Self, ContentError> {
        let json = std::fs::read_to_string(path).map_err(|source| ContentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn lessons(&self, subject: Subject) -> &SubjectLessons {
        &self.lessons[subject.slot()]
    }

    /// Base statement at `index`, wrapped by the base sequence length.
    pub fn base(&self, subject: Subject, index: usize) -> &str {
        let base = &self.lessons(subject).base;
        &base[index % base.len()]
    }

    /// Simplified restatement at `index`, wrapped by the simplified sequence length.
    pub fn simplified(&self, subject: Subject, index: usize) -> &str {
        let simplified = &self.lessons(subject).simplified;
        &simplified[index % simplified.len()]
    }
}

impl Default for ContentStore {
    fn default() -> Self {
        Self::builtin()
    }
}
