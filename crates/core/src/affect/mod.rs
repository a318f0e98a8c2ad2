//! Affect sampling.
//!
//! An [`AffectSource`] produces one [`AffectSample`] per tick. Two variants
//! exist: [`detector::DetectorAffectSource`], which runs an expression
//! detector over the learner's camera, and
//! [`simulated::SimulatedAffectSource`], which draws random states. The
//! teaching loop only ever sees the trait.

pub mod detector;
pub mod simulated;

use crate::{error::SetupError, events::EventSink};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The learner's dominant facial expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Neutral,
    Happy,
    Sad,
    Angry,
    Fearful,
    Disgusted,
    Surprised,
}

impl Emotion {
    /// Tie-break order for equal expression scores: earlier wins.
    pub const PRIORITY: [Emotion; 7] = [
        Emotion::Neutral,
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Angry,
        Emotion::Fearful,
        Emotion::Disgusted,
        Emotion::Surprised,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Neutral => "neutral",
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Angry => "angry",
            Emotion::Fearful => "fearful",
            Emotion::Disgusted => "disgusted",
            Emotion::Surprised => "surprised",
        }
    }

    fn rank(self) -> usize {
        Self::PRIORITY
            .iter()
            .position(|e| *e == self)
            .unwrap_or(Self::PRIORITY.len())
    }

    /// Picks the highest-scoring emotion from an expression distribution.
    ///
    /// Equal scores are resolved by [`Emotion::PRIORITY`], never by input
    /// order. NaN scores are ignored. Returns `None` for an empty input.
    pub fn dominant<I>(scores: I) -> Option<Emotion>
    where
        I: IntoIterator<Item = (Emotion, f32)>,
    {
        scores
            .into_iter()
            .filter(|(_, score)| !score.is_nan())
            .fold(None, |best: Option<(Emotion, f32)>, (emotion, score)| match best {
                None => Some((emotion, score)),
                Some((best_emotion, best_score)) => {
                    if score > best_score
                        || (score == best_score && emotion.rank() < best_emotion.rank())
                    {
                        Some((emotion, score))
                    } else {
                        best
                    }
                }
            })
            .map(|(emotion, _)| emotion)
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Emotion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "neutral" => Ok(Emotion::Neutral),
            "happy" => Ok(Emotion::Happy),
            "sad" => Ok(Emotion::Sad),
            "angry" => Ok(Emotion::Angry),
            "fear" | "fearful" => Ok(Emotion::Fearful),
            "disgust" | "disgusted" => Ok(Emotion::Disgusted),
            "surprise" | "surprised" => Ok(Emotion::Surprised),
            other => Err(format!("unknown emotion '{}'", other)),
        }
    }
}

/// Coarse age bucket used to adjust phrasing and voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeGroup {
    Child,
    Teen,
    YoungAdult,
    Adult,
}

impl AgeGroup {
    /// Buckets an age estimate in years.
    pub fn from_age(age: f32) -> Self {
        if age < 13.0 {
            AgeGroup::Child
        } else if age < 18.0 {
            AgeGroup::Teen
        } else if age < 30.0 {
            AgeGroup::YoungAdult
        } else {
            AgeGroup::Adult
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

/// One observation of the learner's state at a single tick.
///
/// Only `emotion` and `age_group` feed the teaching policy; the rest is
/// informational.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffectSample {
    pub emotion: Emotion,
    pub age_group: Option<AgeGroup>,
    pub age: Option<f32>,
    pub gender: Option<Gender>,
    pub confidence: Option<f32>,
    /// `false` when this sample is the no-detection fallback.
    pub detected: bool,
}

impl AffectSample {
    /// A sample carrying only an emotion.
    pub fn new(emotion: Emotion) -> Self {
        Self {
            emotion,
            age_group: None,
            age: None,
            gender: None,
            confidence: None,
            detected: true,
        }
    }

    /// The neutral fallback used when nothing was detected or sampling failed.
    pub fn undetected() -> Self {
        Self {
            detected: false,
            ..Self::new(Emotion::Neutral)
        }
    }

    pub fn with_age_group(mut self, age_group: AgeGroup) -> Self {
        self.age_group = Some(age_group);
        self
    }

    /// Records an age estimate and derives its age group.
    pub fn with_age(mut self, age: f32) -> Self {
        self.age = Some(age);
        self.age_group = Some(AgeGroup::from_age(age));
        self
    }
}

/// A producer of affect samples.
///
/// Implementations must be interchangeable: nothing downstream may depend
/// on which variant produced a sample.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AffectSource: Send + Sync {
    /// Acquires whatever the source needs before the first sample.
    async fn prepare(&self, _events: &EventSink) -> Result<(), SetupError> {
        Ok(())
    }

    /// Samples the learner's current state.
    async fn sample(&self) -> anyhow::Result<AffectSample>;

    /// Releases resources acquired by [`AffectSource::prepare`]. Must be idempotent.
    async fn release(&self) {}
}
