//! A randomized affect source for demos and runs without a camera.

use super::{AffectSample, AffectSource, Emotion, Gender};
use async_trait::async_trait;
use rand::{Rng, SeedableRng, rngs::StdRng, seq::IndexedRandom};
use std::{ops::Range, sync::Mutex};
use tracing::debug;

/// Emotions the simulator draws from.
pub const SIMULATED_EMOTIONS: [Emotion; 5] = [
    Emotion::Happy,
    Emotion::Sad,
    Emotion::Angry,
    Emotion::Surprised,
    Emotion::Neutral,
];

/// Half-open range of simulated ages in years.
pub const SIMULATED_AGES: Range<u32> = 10..40;

const SIMULATED_GENDERS: [Gender; 2] = [Gender::Male, Gender::Female];

/// Draws emotion, age and gender uniformly at random on every sample.
pub struct SimulatedAffectSource {
    rng: Mutex<StdRng>,
}

impl SimulatedAffectSource {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// A deterministic simulator, for tests and reproducible demos.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn draw(&self) -> AffectSample {
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let emotion = *SIMULATED_EMOTIONS
            .choose(&mut *rng)
            .unwrap_or(&Emotion::Neutral);
        let age = rng.random_range(SIMULATED_AGES);
        let gender = SIMULATED_GENDERS.choose(&mut *rng).copied();

        let mut sample = AffectSample::new(emotion).with_age(age as f32);
        sample.gender = gender;
        sample
    }
}

impl Default for SimulatedAffectSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AffectSource for SimulatedAffectSource {
    async fn sample(&self) -> anyhow::Result<AffectSample> {
        let sample = self.draw();
        debug!(
            emotion = %sample.emotion,
            age = ?sample.age,
            gender = ?sample.gender,
            "Simulated affect sample"
        );
        Ok(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::affect::AgeGroup;
    use std::collections::HashSet;

    #[tokio::test]
    async fn test_samples_stay_within_simulated_sets() {
        let source = SimulatedAffectSource::seeded(7);
        for _ in 0..200 {
            let sample = source.sample().await.unwrap();
            assert!(SIMULATED_EMOTIONS.contains(&sample.emotion));
            let age = sample.age.unwrap();
            assert!((10.0..40.0).contains(&age), "age out of range: {}", age);
            assert_eq!(sample.age_group, Some(AgeGroup::from_age(age)));
            assert!(sample.gender.is_some());
            assert!(sample.detected);
        }
    }

    #[tokio::test]
    async fn test_seeded_sources_repeat() {
        let a = SimulatedAffectSource::seeded(42);
        let b = SimulatedAffectSource::seeded(42);
        for _ in 0..20 {
            assert_eq!(a.sample().await.unwrap(), b.sample().await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_every_emotion_eventually_drawn() {
        let source = SimulatedAffectSource::seeded(1);
        let mut seen = HashSet::new();
        for _ in 0..500 {
            seen.insert(source.sample().await.unwrap().emotion);
        }
        assert_eq!(seen.len(), SIMULATED_EMOTIONS.len());
    }
}
