//! Browser-hosted collaborators.
//!
//! The learner's browser owns the speech synthesizer, the camera and the
//! face detector. [`BrowserBridge`] exposes them to the teaching loop as a
//! [`VoiceEngine`], an [`ExpressionDetector`] and a [`Camera`] by sending
//! commands down the socket and waiting for the matching replies.

use super::protocol::ServerMessage;
use affect_tutor_core::{
    Utterance, VoiceEngine,
    affect::detector::{Camera, ExpressionDetector, FaceObservation},
};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::{sync::Mutex, time::Duration};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, warn};

type Reply = oneshot::Sender<Result<(), String>>;

/// Outstanding setup requests awaiting a browser reply.
#[derive(Default)]
struct Pending {
    models: Option<Reply>,
    camera: Option<Reply>,
}

pub struct BrowserBridge {
    outbound: mpsc::Sender<ServerMessage>,
    setup_timeout: Duration,
    pending: Mutex<Pending>,
    latest: watch::Sender<Option<FaceObservation>>,
}

impl BrowserBridge {
    pub fn new(outbound: mpsc::Sender<ServerMessage>, setup_timeout: Duration) -> Self {
        Self {
            outbound,
            setup_timeout,
            pending: Mutex::new(Pending::default()),
            latest: watch::Sender::new(None),
        }
    }

    /// Routes the browser's reply to `load_models`.
    pub fn resolve_models(&self, result: Result<(), String>) {
        let reply = self.with_pending(|p| p.models.take());
        Self::resolve("models", reply, result);
    }

    /// Routes the browser's reply to `acquire_camera`.
    pub fn resolve_camera(&self, result: Result<(), String>) {
        let reply = self.with_pending(|p| p.camera.take());
        Self::resolve("camera", reply, result);
    }

    /// Records the detector's result for the current frame.
    pub fn observe(&self, observation: Option<FaceObservation>) {
        self.latest.send_replace(observation);
    }

    /// Fails every outstanding setup request immediately.
    pub fn cancel_pending(&self) {
        let dropped = self.with_pending(std::mem::take);
        if dropped.models.is_some() || dropped.camera.is_some() {
            debug!("Cancelled pending setup requests");
        }
    }

    fn with_pending<T>(&self, f: impl FnOnce(&mut Pending) -> T) -> T {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut pending)
    }

    fn resolve(what: &str, reply: Option<Reply>, result: Result<(), String>) {
        match reply {
            Some(tx) => {
                let _ = tx.send(result);
            }
            None => warn!(what, "Unsolicited setup reply from client"),
        }
    }

    async fn send(&self, msg: ServerMessage) -> Result<()> {
        self.outbound
            .send(msg)
            .await
            .map_err(|_| anyhow!("client connection closed"))
    }

    /// Sends `request` and waits for the reply parked in the slot `slot` selects.
    async fn request(
        &self,
        what: &str,
        request: ServerMessage,
        slot: fn(&mut Pending) -> &mut Option<Reply>,
    ) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        if self.with_pending(|p| slot(p).replace(tx)).is_some() {
            debug!(what, "Superseded an unanswered setup request");
        }
        self.send(request).await?;

        match tokio::time::timeout(self.setup_timeout, rx).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(reason))) => Err(anyhow!(reason)),
            Ok(Err(_)) => Err(anyhow!("{} request cancelled", what)),
            Err(_) => {
                self.with_pending(|p| slot(p).take());
                Err(anyhow!(
                    "client did not answer the {} request within {:?}",
                    what,
                    self.setup_timeout
                ))
            }
        }
    }
}

#[async_trait]
impl VoiceEngine for BrowserBridge {
    async fn speak(&self, utterance: Utterance) -> Result<()> {
        self.send(utterance.into()).await
    }

    async fn cancel_all(&self) {
        if self.send(ServerMessage::CancelSpeech).await.is_err() {
            debug!("Skipping speech cancel: client gone");
        }
    }
}

#[async_trait]
impl ExpressionDetector for BrowserBridge {
    async fn load_models(&self) -> Result<()> {
        self.request("models", ServerMessage::LoadModels, |p| &mut p.models)
            .await
    }

    /// Consumes the latest report, so a browser that stops reporting reads
    /// as no face rather than a frozen expression.
    async fn detect(&self) -> Result<Option<FaceObservation>> {
        Ok(self.latest.send_replace(None))
    }
}

#[async_trait]
impl Camera for BrowserBridge {
    async fn acquire(&self) -> Result<()> {
        self.latest.send_replace(None);
        self.request("camera", ServerMessage::AcquireCamera, |p| &mut p.camera)
            .await
    }

    async fn release(&self) {
        self.latest.send_replace(None);
        if self.send(ServerMessage::ReleaseCamera).await.is_err() {
            debug!("Skipping camera release: client gone");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{collections::HashMap, sync::Arc};

    fn bridge(timeout: Duration) -> (Arc<BrowserBridge>, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(16);
        (Arc::new(BrowserBridge::new(tx, timeout)), rx)
    }

    #[tokio::test]
    async fn test_load_models_resolves_on_reply() {
        let (bridge, mut rx) = bridge(Duration::from_secs(5));
        let task = {
            let bridge = bridge.clone();
            tokio::spawn(async move { bridge.load_models().await })
        };

        assert_eq!(rx.recv().await, Some(ServerMessage::LoadModels));
        bridge.resolve_models(Ok(()));
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_camera_failure_carries_reason() {
        let (bridge, mut rx) = bridge(Duration::from_secs(5));
        let task = {
            let bridge = bridge.clone();
            tokio::spawn(async move { bridge.acquire().await })
        };

        assert_eq!(rx.recv().await, Some(ServerMessage::AcquireCamera));
        bridge.resolve_camera(Err("NotAllowedError".to_string()));
        let err = task.await.unwrap().unwrap_err();
        assert_eq!(err.to_string(), "NotAllowedError");
    }

    #[tokio::test(start_paused = true)]
    async fn test_setup_request_times_out() {
        let (bridge, mut rx) = bridge(Duration::from_secs(2));
        let task = {
            let bridge = bridge.clone();
            tokio::spawn(async move { bridge.load_models().await })
        };

        assert_eq!(rx.recv().await, Some(ServerMessage::LoadModels));
        let err = task.await.unwrap().unwrap_err();
        assert!(err.to_string().contains("did not answer"));

        // A late reply finds nothing waiting.
        bridge.resolve_models(Ok(()));
    }

    #[tokio::test]
    async fn test_cancel_pending_fails_waiting_request() {
        let (bridge, mut rx) = bridge(Duration::from_secs(30));
        let task = {
            let bridge = bridge.clone();
            tokio::spawn(async move { bridge.acquire().await })
        };

        assert_eq!(rx.recv().await, Some(ServerMessage::AcquireCamera));
        bridge.cancel_pending();
        let err = task.await.unwrap().unwrap_err();
        assert!(err.to_string().contains("cancelled"));
    }

    #[tokio::test]
    async fn test_detect_consumes_latest_observation() {
        let (bridge, _rx) = bridge(Duration::from_secs(1));
        assert_eq!(bridge.detect().await.unwrap(), None);

        let first = FaceObservation {
            expressions: HashMap::from([("sad".to_string(), 0.9)]),
            ..Default::default()
        };
        let second = FaceObservation {
            expressions: HashMap::from([("happy".to_string(), 0.7)]),
            ..Default::default()
        };
        bridge.observe(Some(first));
        bridge.observe(Some(second.clone()));
        assert_eq!(bridge.detect().await.unwrap(), Some(second));

        // Nothing reported since the last read.
        assert_eq!(bridge.detect().await.unwrap(), None);

        bridge.observe(Some(FaceObservation::default()));
        bridge.observe(None);
        assert_eq!(bridge.detect().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_release_clears_observation_and_notifies_client() {
        let (bridge, mut rx) = bridge(Duration::from_secs(1));
        bridge.observe(Some(FaceObservation::default()));

        Camera::release(bridge.as_ref()).await;

        assert_eq!(rx.recv().await, Some(ServerMessage::ReleaseCamera));
        assert_eq!(bridge.detect().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_speak_fails_when_client_gone() {
        let (bridge, rx) = bridge(Duration::from_secs(1));
        drop(rx);
        let utterance = Utterance {
            id: affect_tutor_core::UtteranceId(1),
            text: "Hi".to_string(),
            lang: "en-US",
            params: Default::default(),
        };
        assert!(bridge.speak(utterance).await.is_err());
        // Cancelling against a closed socket is silent.
        bridge.cancel_all().await;
    }
}
