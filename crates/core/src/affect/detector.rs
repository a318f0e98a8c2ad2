//! The camera-backed affect source.
//!
//! Setup loads the detector's models and then acquires the camera. Each
//! sample is one inference pass over the camera's current frame; the
//! strongest expression becomes the sample's emotion.

use super::{AffectSample, AffectSource, Emotion, Gender};
use crate::{
    error::SetupError,
    events::{EventSink, FaceBox},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, error, info};

/// The result of one inference pass that found a face.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceObservation {
    /// Expression label to score. Unknown labels are ignored.
    pub expressions: HashMap<String, f32>,
    #[serde(default)]
    pub age: Option<f32>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default, rename = "box")]
    pub face_box: Option<FaceBox>,
}

impl FaceObservation {
    /// Known expressions paired with their scores.
    pub fn scores(&self) -> impl Iterator<Item = (Emotion, f32)> + '_ {
        self.expressions
            .iter()
            .filter_map(|(label, score)| label.parse::<Emotion>().ok().map(|e| (e, *score)))
    }
}

/// A face and expression inference pipeline.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExpressionDetector: Send + Sync {
    /// Loads model weights. Fails if the weight source is unreachable.
    async fn load_models(&self) -> anyhow::Result<()>;

    /// Runs one inference pass over the current frame. `None` means no face.
    async fn detect(&self) -> anyhow::Result<Option<FaceObservation>>;
}

/// The learner's camera.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Camera: Send + Sync {
    /// Opens the video stream. Fails on denied permission or a missing device.
    async fn acquire(&self) -> anyhow::Result<()>;

    /// Stops the video stream if one is open.
    async fn release(&self);
}

#[async_trait]
impl<T: ExpressionDetector + ?Sized> ExpressionDetector for Arc<T> {
    async fn load_models(&self) -> anyhow::Result<()> {
        (**self).load_models().await
    }

    async fn detect(&self) -> anyhow::Result<Option<FaceObservation>> {
        (**self).detect().await
    }
}

#[async_trait]
impl<T: Camera + ?Sized> Camera for Arc<T> {
    async fn acquire(&self) -> anyhow::Result<()> {
        (**self).acquire().await
    }

    async fn release(&self) {
        (**self).release().await
    }
}

/// Affect source driven by a real expression detector.
pub struct DetectorAffectSource<D, C> {
    detector: D,
    camera: C,
    overlay: EventSink,
}

impl<D, C> DetectorAffectSource<D, C>
where
    D: ExpressionDetector,
    C: Camera,
{
    pub fn new(detector: D, camera: C) -> Self {
        Self {
            detector,
            camera,
            overlay: EventSink::disconnected(),
        }
    }

    /// Routes detection boxes to a presentation overlay.
    pub fn with_overlay(mut self, overlay: EventSink) -> Self {
        self.overlay = overlay;
        self
    }

    fn sample_from(observation: &FaceObservation) -> AffectSample {
        let emotion = Emotion::dominant(observation.scores()).unwrap_or(Emotion::Neutral);
        let confidence = observation
            .scores()
            .filter(|(e, _)| *e == emotion)
            .map(|(_, score)| score)
            .next();

        let mut sample = AffectSample::new(emotion);
        if let Some(age) = observation.age {
            sample = sample.with_age(age);
        }
        sample.gender = observation.gender;
        sample.confidence = confidence;
        sample
    }
}

#[async_trait]
impl<D, C> AffectSource for DetectorAffectSource<D, C>
where
    D: ExpressionDetector,
    C: Camera,
{
    async fn prepare(&self, events: &EventSink) -> Result<(), SetupError> {
        events.status("Loading AI models...").await;
        if let Err(e) = self.detector.load_models().await {
            error!(error = ?e, "Model load failed");
            return Err(SetupError::ModelLoad(e.to_string()));
        }

        events.status("Models loaded. Starting camera...").await;
        if let Err(e) = self.camera.acquire().await {
            error!(error = ?e, "Camera acquisition failed");
            return Err(SetupError::Camera(e.to_string()));
        }

        info!("Detector ready");
        events.status("Camera started. Preparing lesson...").await;
        Ok(())
    }

    async fn sample(&self) -> anyhow::Result<AffectSample> {
        match self.detector.detect().await? {
            Some(observation) => {
                self.overlay.detection(observation.face_box).await;
                let sample = Self::sample_from(&observation);
                debug!(emotion = %sample.emotion, confidence = ?sample.confidence, "Face detected");
                Ok(sample)
            }
            None => {
                self.overlay.detection(None).await;
                debug!("No face detected");
                Ok(AffectSample::undetected())
            }
        }
    }

    async fn release(&self) {
        self.camera.release().await;
        // Leave no box drawn over a stopped stream.
        self.overlay.detection(None).await;
    }
}
