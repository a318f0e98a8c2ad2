//! The Lesson Adapter: the teaching policy.
//!
//! Given the subject, the lesson position and the learner's affect, decide
//! what to say and whether the lesson should move on. The policy is a pure
//! function; every emotion maps to a plan.

use crate::{
    affect::{AffectSample, AgeGroup, Emotion},
    subject::{ContentStore, Subject},
};

pub const STEP_BY_STEP_REMARK: &str = "Don't worry, we'll go step by step.";
pub const REVIEW_BASICS_REMARK: &str = "Don't worry, let's review the basics together.";
pub const CALMING_PREFIX: &str = "Take a deep breath.";
pub const PRACTICE_TIP: &str = "Great! Here's a quick tip: try an example to practice.";

/// What to narrate this tick and whether the lesson index moves on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonPlan {
    pub text: String,
    pub advance: bool,
}

/// Chooses the narration for one tick.
pub fn adapt(
    content: &ContentStore,
    subject: Subject,
    lesson_index: usize,
    sample: &AffectSample,
) -> LessonPlan {
    let base = content.base(subject, lesson_index);
    let simple = content.simplified(subject, lesson_index);

    match sample.emotion {
        Emotion::Sad | Emotion::Disgusted | Emotion::Fearful => {
            let remark = match sample.age_group {
                Some(AgeGroup::Child | AgeGroup::Teen) => STEP_BY_STEP_REMARK,
                _ => REVIEW_BASICS_REMARK,
            };
            LessonPlan {
                text: format!("{} {}", simple, remark),
                advance: false,
            }
        }
        Emotion::Angry => LessonPlan {
            text: format!("{} {}", CALMING_PREFIX, simple),
            advance: false,
        },
        Emotion::Happy | Emotion::Surprised => LessonPlan {
            text: format!("{} {}", base, PRACTICE_TIP),
            advance: true,
        },
        Emotion::Neutral => LessonPlan {
            text: base.to_string(),
            advance: true,
        },
    }
}
