//! Manages the WebSocket connection lifecycle for one learner.
//!
//! Each connection owns its own [`TeachingLoop`]. Commands from the browser
//! drive the loop; tutor events, utterances and setup requests flow back
//! through a single writer task.

use super::{
    bridge::BrowserBridge,
    protocol::{ClientMessage, ServerMessage},
};
use crate::{config::AffectSourceKind, state::AppState};
use affect_tutor_core::{
    AffectSource, EventSink, LessonError, NarrationDriver, Subject, TeachingLoop,
    TeachingLoopConfig, TutorEvent,
    affect::{detector::DetectorAffectSource, simulated::SimulatedAffectSource},
};
use anyhow::Result;
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use std::sync::Arc;
use tokio::{sync::mpsc, task::JoinSet};
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 64;

/// Axum handler to upgrade an HTTP connection to a WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let session_id = Uuid::new_v4();
    run_session(socket, state)
        .instrument(info_span!("tutor_session", %session_id))
        .await;
}

/// Everything one connection needs to serve client messages.
struct Session {
    tutor: Arc<TeachingLoop>,
    bridge: Arc<BrowserBridge>,
    outbound: mpsc::Sender<ServerMessage>,
    starts: JoinSet<()>,
}

async fn run_session(socket: WebSocket, state: Arc<AppState>) {
    info!(source = ?state.config.affect_source, "New tutor connection");
    let (mut socket_tx, mut socket_rx) = socket.split();

    let (outbound, mut outbound_rx) = mpsc::channel::<ServerMessage>(CHANNEL_CAPACITY);
    let writer = tokio::spawn(
        async move {
            while let Some(msg) = outbound_rx.recv().await {
                if let Err(e) = send_msg(&mut socket_tx, msg).await {
                    warn!(error = ?e, "Failed to write to client; closing writer");
                    break;
                }
            }
        }
        .in_current_span(),
    );

    let (event_tx, mut event_rx) = mpsc::channel::<TutorEvent>(CHANNEL_CAPACITY);
    let forwarder = {
        let outbound = outbound.clone();
        tokio::spawn(
            async move {
                while let Some(event) = event_rx.recv().await {
                    if outbound.send(event.into()).await.is_err() {
                        break;
                    }
                }
            }
            .in_current_span(),
        )
    };

    let mut session = build_session(&state, outbound, EventSink::new(event_tx));

    while let Some(msg_result) = socket_rx.next().await {
        match msg_result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(msg) => session.handle(msg).await,
                Err(e) => {
                    warn!(error = %e, "Ignoring malformed client message");
                    session
                        .reply_error(format!("Malformed message: {}", e))
                        .await;
                }
            },
            Ok(Message::Binary(_)) => warn!("Ignoring unexpected binary message."),
            Ok(Message::Close(_)) => {
                info!("Client sent close frame. Shutting down session.");
                break;
            }
            Ok(Message::Ping(_) | Message::Pong(_)) => {}
            Err(e) => {
                error!("Error receiving from client WebSocket: {:?}", e);
                break;
            }
        }
    }

    session.shutdown().await;
    forwarder.abort();
    writer.abort();
    info!("WebSocket connection closed and tutor session terminated.");
}

fn build_session(
    state: &AppState,
    outbound: mpsc::Sender<ServerMessage>,
    events: EventSink,
) -> Session {
    let bridge = Arc::new(BrowserBridge::new(
        outbound.clone(),
        state.config.setup_timeout,
    ));

    let affect: Arc<dyn AffectSource> = match state.config.affect_source {
        AffectSourceKind::Simulated => Arc::new(SimulatedAffectSource::new()),
        AffectSourceKind::Detector => Arc::new(
            DetectorAffectSource::new(bridge.clone(), bridge.clone()).with_overlay(events.clone()),
        ),
    };
    let narration = Arc::new(NarrationDriver::new(bridge.clone()));
    let config = TeachingLoopConfig {
        tick_interval: state.config.tick_interval,
    };
    let tutor = Arc::new(TeachingLoop::new(
        config,
        state.content.clone(),
        affect,
        narration,
        events,
    ));

    Session {
        tutor,
        bridge,
        outbound,
        starts: JoinSet::new(),
    }
}

impl Session {
    async fn handle(&mut self, msg: ClientMessage) {
        while self.starts.try_join_next().is_some() {}

        match msg {
            ClientMessage::Select { subject } => match subject.parse::<Subject>() {
                Ok(subject) => {
                    if let Err(e) = self.tutor.select_subject(subject).await {
                        self.reply_error(e.to_string()).await;
                    }
                }
                Err(e) => self.reply_error(e.to_string()).await,
            },
            // Setup waits on replies that arrive through this same read loop.
            ClientMessage::Start => {
                let tutor = self.tutor.clone();
                let outbound = self.outbound.clone();
                self.starts.spawn(
                    async move {
                        match tutor.start().await {
                            Ok(()) => {}
                            Err(LessonError::AlreadyRunning) => {
                                let message = LessonError::AlreadyRunning.to_string();
                                let _ = outbound.send(ServerMessage::Error { message }).await;
                            }
                            Err(e) => debug!(error = %e, "Lesson did not start"),
                        }
                    }
                    .in_current_span(),
                );
            }
            ClientMessage::Stop => {
                self.tutor.stop().await;
                self.bridge.cancel_pending();
            }
            ClientMessage::Back => {
                self.tutor.back().await;
                self.bridge.cancel_pending();
            }
            ClientMessage::SpeechEnded { utterance_id } => {
                self.tutor.narration().on_utterance_end(utterance_id);
            }
            ClientMessage::ModelsLoaded => self.bridge.resolve_models(Ok(())),
            ClientMessage::ModelsFailed { reason } => self.bridge.resolve_models(Err(reason)),
            ClientMessage::CameraReady => self.bridge.resolve_camera(Ok(())),
            ClientMessage::CameraFailed { reason } => self.bridge.resolve_camera(Err(reason)),
            ClientMessage::Observation(observation) => self.bridge.observe(Some(observation)),
            ClientMessage::NoFace => self.bridge.observe(None),
        }
    }

    async fn reply_error(&self, message: String) {
        if self
            .outbound
            .send(ServerMessage::Error { message })
            .await
            .is_err()
        {
            debug!("Dropping error reply: writer closed");
        }
    }

    async fn shutdown(mut self) {
        self.tutor.stop().await;
        self.bridge.cancel_pending();
        self.starts.shutdown().await;
    }
}

/// A helper function to serialize and send a `ServerMessage` to the client.
pub(crate) async fn send_msg(
    socket_tx: &mut SplitSink<WebSocket, Message>,
    msg: ServerMessage,
) -> Result<()> {
    let serialized = serde_json::to_string(&msg)?;
    socket_tx.send(Message::Text(serialized.into())).await?;
    Ok(())
}
