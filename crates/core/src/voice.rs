//! Spoken narration.
//!
//! [`NarrationDriver`] is a single-flight scheduler in front of a
//! [`VoiceEngine`]: at most one utterance is in flight, and requests made
//! while busy are dropped rather than queued. The driver is busy from the
//! moment a request claims the slot until the engine reports completion of
//! the issued utterance or the narration is cancelled.

use crate::affect::{AgeGroup, Emotion};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use tracing::{debug, info};

/// Language tag for every utterance.
pub const NARRATION_LANG: &str = "en-US";

/// Pitch and rate multipliers handed to the voice engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoiceParameters {
    pub pitch: f32,
    pub rate: f32,
}

impl VoiceParameters {
    /// Derives the voice for an emotion, then applies the child adjustment.
    pub fn for_affect(emotion: Emotion, age_group: Option<AgeGroup>) -> Self {
        let (pitch, rate) = match emotion {
            Emotion::Happy => (1.3, 1.05),
            Emotion::Sad => (0.8, 0.9),
            Emotion::Angry => (0.95, 0.95),
            Emotion::Surprised => (1.4, 1.15),
            _ => (1.0, 1.0),
        };
        let params = Self { pitch, rate };
        match age_group {
            Some(AgeGroup::Child) => Self {
                pitch: params.pitch * 1.1,
                rate: params.rate * 0.9,
            },
            _ => params,
        }
    }
}

impl Default for VoiceParameters {
    fn default() -> Self {
        Self {
            pitch: 1.0,
            rate: 1.0,
        }
    }
}

/// Identifies an issued utterance so its completion can be matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UtteranceId(pub u64);

/// A single request to the voice engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub id: UtteranceId,
    pub text: String,
    pub lang: &'static str,
    pub params: VoiceParameters,
}

/// A text-to-speech backend.
///
/// The engine must eventually report the end of every accepted utterance
/// through [`NarrationDriver::on_utterance_end`].
#[async_trait]
pub trait VoiceEngine: Send + Sync {
    /// Starts speaking an utterance.
    async fn speak(&self, utterance: Utterance) -> anyhow::Result<()>;

    /// Drops everything queued or playing.
    async fn cancel_all(&self);
}

#[async_trait]
impl<T: VoiceEngine + ?Sized> VoiceEngine for Arc<T> {
    async fn speak(&self, utterance: Utterance) -> anyhow::Result<()> {
        (**self).speak(utterance).await
    }

    async fn cancel_all(&self) {
        (**self).cancel_all().await
    }
}

/// Whether a call to [`NarrationDriver::speak`] reached the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakOutcome {
    Issued(UtteranceId),
    /// Another utterance was in flight; the request was discarded.
    Dropped,
}

impl SpeakOutcome {
    pub fn is_issued(&self) -> bool {
        matches!(self, SpeakOutcome::Issued(_))
    }
}

/// Single-flight narration scheduler.
pub struct NarrationDriver {
    engine: Arc<dyn VoiceEngine>,
    next_id: AtomicU64,
    /// Id of the utterance in flight, [`IDLE`] when none, or [`RESERVED`]
    /// while a request is being issued.
    current: AtomicU64,
}

const IDLE: u64 = 0;
const RESERVED: u64 = u64::MAX;

impl NarrationDriver {
    pub fn new(engine: Arc<dyn VoiceEngine>) -> Self {
        Self {
            engine,
            next_id: AtomicU64::new(1),
            current: AtomicU64::new(IDLE),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.current.load(Ordering::SeqCst) != IDLE
    }

    /// Speaks `text` unless an utterance is already in flight.
    ///
    /// A [`NarrationDriver::cancel`] that lands before the utterance is
    /// handed to the engine wins, and the request is dropped.
    pub async fn speak(
        &self,
        text: &str,
        emotion: Emotion,
        age_group: Option<AgeGroup>,
    ) -> anyhow::Result<SpeakOutcome> {
        if self
            .current
            .compare_exchange(IDLE, RESERVED, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Narration busy; dropping request");
            return Ok(SpeakOutcome::Dropped);
        }

        self.engine.cancel_all().await;

        let id = UtteranceId(self.next_id.fetch_add(1, Ordering::SeqCst));
        if self
            .current
            .compare_exchange(RESERVED, id.0, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!(utterance_id = id.0, "Narration cancelled before issue; dropping request");
            return Ok(SpeakOutcome::Dropped);
        }

        let utterance = Utterance {
            id,
            text: text.to_string(),
            lang: NARRATION_LANG,
            params: VoiceParameters::for_affect(emotion, age_group),
        };
        debug!(utterance_id = id.0, %emotion, pitch = utterance.params.pitch, rate = utterance.params.rate, "Issuing utterance");
        if let Err(e) = self.engine.speak(utterance).await {
            self.finish(id);
            return Err(e);
        }
        Ok(SpeakOutcome::Issued(id))
    }

    /// Completion notification from the engine.
    ///
    /// Returns `true` if this cleared the busy flag. Completions for
    /// superseded or cancelled utterances are ignored.
    pub fn on_utterance_end(&self, id: UtteranceId) -> bool {
        let cleared = self.finish(id);
        if !cleared {
            debug!(utterance_id = id.0, "Ignoring stale utterance completion");
        }
        cleared
    }

    /// Cancels any narration and resets the busy flag.
    pub async fn cancel(&self) {
        let previous = self.current.swap(IDLE, Ordering::SeqCst);
        self.engine.cancel_all().await;
        if previous != IDLE {
            info!("Narration cancelled");
        }
    }

    fn finish(&self, id: UtteranceId) -> bool {
        id.0 != IDLE
            && id.0 != RESERVED
            && self
                .current
                .compare_exchange(id.0, IDLE, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
    }
}
