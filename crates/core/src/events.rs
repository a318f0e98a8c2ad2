//! The presentation seam.
//!
//! The core never reads anything back from the presentation layer; it only
//! pushes [`TutorEvent`]s through an [`EventSink`].

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::warn;

/// A detected face region in frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Rendering commands the core issues to the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum TutorEvent {
    /// Replace the status line.
    Status(String),
    /// Replace the displayed lesson text.
    LessonText(String),
    /// Redraw the detection overlay; `None` clears it.
    Detection(Option<FaceBox>),
}

/// Cloneable handle for emitting [`TutorEvent`]s.
///
/// A dropped receiver is not an error for the core: rendering is best
/// effort and the teaching loop keeps running without a display.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: Option<mpsc::Sender<TutorEvent>>,
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<TutorEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A sink that discards every event.
    pub fn disconnected() -> Self {
        Self { tx: None }
    }

    pub async fn emit(&self, event: TutorEvent) {
        if let Some(tx) = &self.tx {
            if tx.send(event).await.is_err() {
                warn!("Failed to deliver tutor event: receiver dropped.");
            }
        }
    }

    pub async fn status(&self, message: impl Into<String>) {
        self.emit(TutorEvent::Status(message.into())).await;
    }

    pub async fn lesson_text(&self, text: impl Into<String>) {
        self.emit(TutorEvent::LessonText(text.into())).await;
    }

    pub async fn detection(&self, face: Option<FaceBox>) {
        self.emit(TutorEvent::Detection(face)).await;
    }
}
