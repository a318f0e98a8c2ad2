//! Affect Tutor Core
//!
//! The adaptive teaching loop: sample the learner's affect, pick the lesson
//! variant and phrasing that suits it, narrate it without overlapping
//! utterances, and advance the lesson only when the learner is doing well.
//!
//! Cameras, detectors, voice engines and displays are collaborators behind
//! the traits in [`affect`], [`voice`] and [`events`].

pub mod adapter;
pub mod affect;
pub mod controller;
pub mod error;
pub mod events;
pub mod subject;
pub mod voice;

pub use adapter::{LessonPlan, adapt};
pub use affect::{AffectSample, AffectSource, AgeGroup, Emotion, Gender};
pub use controller::{LoopState, TeachingLoop, TeachingLoopConfig};
pub use error::{ContentError, LessonError, SetupError};
pub use events::{EventSink, FaceBox, TutorEvent};
pub use subject::{ContentStore, Subject};
pub use voice::{NarrationDriver, Utterance, UtteranceId, VoiceEngine, VoiceParameters};
