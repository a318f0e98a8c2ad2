//! Teaching Loop Controller
//!
//! Owns the lesson lifecycle (`Idle -> Selected -> Starting -> Running ->
//! Idle`) and the periodic tick that samples affect, adapts the lesson,
//! renders it and narrates it.
//!
//! Every tick runs as its own task, so a stalled affect sample never holds
//! up the timer. Ticks may overlap; the last one to render wins the status
//! line. Stopping the loop aborts any tick still in flight.

use crate::{
    adapter::adapt,
    affect::{AffectSample, AffectSource},
    error::LessonError,
    events::EventSink,
    subject::{ContentStore, Subject},
    voice::{NarrationDriver, SpeakOutcome},
};
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::Mutex,
    task::{JoinHandle, JoinSet},
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{Instrument, debug, info, info_span, warn};

/// Default tick period.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(3);

/// Lifecycle state reported by [`TeachingLoop::state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// No subject chosen.
    Idle,
    /// Subject chosen, lesson not started.
    Selected,
    /// The affect source is being set up.
    Starting,
    /// Ticks are firing.
    Running,
}

#[derive(Debug, Clone)]
pub struct TeachingLoopConfig {
    pub tick_interval: Duration,
}

impl Default for TeachingLoopConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }
}

/// Per-lesson progress, created by `start` and dropped by `stop`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonSession {
    pub subject: Subject,
    pub lesson_index: usize,
}

impl LessonSession {
    pub fn new(subject: Subject) -> Self {
        Self {
            subject,
            lesson_index: 0,
        }
    }
}

/// Cancellation handle for a running tick scheduler.
///
/// Dropping the handle cancels the scheduler; [`LoopHandle::shutdown`]
/// additionally waits until every in-flight tick has been torn down.
pub struct LoopHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    _guard: DropGuard,
}

impl LoopHandle {
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            if e.is_panic() {
                warn!(error = ?e, "Tick scheduler panicked");
            }
        }
    }
}

/// Collaborators shared by the controller and its tick tasks.
struct TickContext {
    content: Arc<ContentStore>,
    affect: Arc<dyn AffectSource>,
    narration: Arc<NarrationDriver>,
    events: EventSink,
}

enum Phase {
    Idle,
    Starting,
    Running {
        session: Arc<Mutex<LessonSession>>,
        handle: LoopHandle,
    },
}

struct Inner {
    subject: Option<Subject>,
    phase: Phase,
    /// Bumped by every `start` and `stop`, so a setup that finishes after
    /// a `stop` can tell it was superseded.
    generation: u64,
}

/// The adaptive teaching loop for one learner.
pub struct TeachingLoop {
    ctx: Arc<TickContext>,
    config: TeachingLoopConfig,
    inner: Mutex<Inner>,
}

impl TeachingLoop {
    pub fn new(
        config: TeachingLoopConfig,
        content: Arc<ContentStore>,
        affect: Arc<dyn AffectSource>,
        narration: Arc<NarrationDriver>,
        events: EventSink,
    ) -> Self {
        Self {
            ctx: Arc::new(TickContext {
                content,
                affect,
                narration,
                events,
            }),
            config,
            inner: Mutex::new(Inner {
                subject: None,
                phase: Phase::Idle,
                generation: 0,
            }),
        }
    }

    /// The narration driver, for routing engine completions.
    pub fn narration(&self) -> &Arc<NarrationDriver> {
        &self.ctx.narration
    }

    pub async fn state(&self) -> LoopState {
        let inner = self.inner.lock().await;
        match (&inner.phase, inner.subject) {
            (Phase::Running { .. }, _) => LoopState::Running,
            (Phase::Starting, _) => LoopState::Starting,
            (Phase::Idle, Some(_)) => LoopState::Selected,
            (Phase::Idle, None) => LoopState::Idle,
        }
    }

    pub async fn subject(&self) -> Option<Subject> {
        self.inner.lock().await.subject
    }

    /// Current lesson position, if a lesson is running.
    pub async fn lesson_index(&self) -> Option<usize> {
        let session = match &self.inner.lock().await.phase {
            Phase::Running { session, .. } => session.clone(),
            _ => return None,
        };
        let index = session.lock().await.lesson_index;
        Some(index)
    }

    /// Records the learner's subject choice.
    ///
    /// Rejected while a lesson is starting or running.
    pub async fn select_subject(&self, subject: Subject) -> Result<(), LessonError> {
        {
            let mut inner = self.inner.lock().await;
            if !matches!(inner.phase, Phase::Idle) {
                return Err(LessonError::AlreadyRunning);
            }
            inner.subject = Some(subject);
        }
        info!(%subject, "Subject selected");
        self.ctx
            .events
            .status(format!(
                "Selected: {}. Click Start Lesson.",
                subject.as_str().to_uppercase()
            ))
            .await;
        Ok(())
    }

    /// Prepares the affect source and starts ticking from lesson 0.
    ///
    /// Requires a prior [`TeachingLoop::select_subject`]. A setup failure
    /// leaves the loop in [`LoopState::Selected`] with a status message.
    pub async fn start(&self) -> Result<(), LessonError> {
        let (subject, generation) = {
            let mut inner = self.inner.lock().await;
            if !matches!(inner.phase, Phase::Idle) {
                return Err(LessonError::AlreadyRunning);
            }
            match inner.subject {
                Some(subject) => {
                    inner.phase = Phase::Starting;
                    inner.generation += 1;
                    (subject, inner.generation)
                }
                None => {
                    drop(inner);
                    warn!("Start requested with no subject selected");
                    self.ctx
                        .events
                        .status(LessonError::NoSubjectSelected.to_string())
                        .await;
                    return Err(LessonError::NoSubjectSelected);
                }
            }
        };

        info!(%subject, "Starting lesson");
        let prepared = self.ctx.affect.prepare(&self.ctx.events).await;

        let mut inner = self.inner.lock().await;
        if inner.generation != generation || !matches!(inner.phase, Phase::Starting) {
            drop(inner);
            info!(%subject, "Lesson stopped during setup");
            self.ctx.affect.release().await;
            return Err(LessonError::Interrupted);
        }

        if let Err(e) = prepared {
            inner.phase = Phase::Idle;
            drop(inner);
            warn!(%subject, reason = e.reason(), "Lesson setup failed");
            self.ctx.affect.release().await;
            self.ctx.events.status(e.to_string()).await;
            return Err(e.into());
        }

        let session = Arc::new(Mutex::new(LessonSession::new(subject)));
        let handle = spawn_ticker(
            self.ctx.clone(),
            session.clone(),
            self.config.tick_interval,
        );
        inner.phase = Phase::Running { session, handle };
        info!(%subject, tick_ms = self.config.tick_interval.as_millis() as u64, "Lesson running");
        Ok(())
    }

    /// Stops the lesson and returns to [`LoopState::Idle`].
    ///
    /// Safe from any state and idempotent: cancels the timer and any
    /// in-flight tick, cancels narration, and releases the affect source.
    pub async fn stop(&self) {
        let previous = {
            let mut inner = self.inner.lock().await;
            inner.generation += 1;
            inner.subject = None;
            std::mem::replace(&mut inner.phase, Phase::Idle)
        };

        let was_running = match previous {
            Phase::Running { handle, session } => {
                handle.shutdown().await;
                let session = session.lock().await;
                info!(subject = %session.subject, lesson_index = session.lesson_index, "Lesson stopped");
                true
            }
            Phase::Starting => {
                info!("Stop requested during setup");
                false
            }
            Phase::Idle => false,
        };

        self.ctx.narration.cancel().await;
        if was_running {
            self.ctx.affect.release().await;
        }
    }

    /// Navigates back to subject selection.
    pub async fn back(&self) {
        self.stop().await;
        self.ctx.events.lesson_text(String::new()).await;
        self.ctx.events.status("Waiting...").await;
    }
}

fn spawn_ticker(
    ctx: Arc<TickContext>,
    session: Arc<Mutex<LessonSession>>,
    period: Duration,
) -> LoopHandle {
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    let task = tokio::spawn(
        async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut ticks = JoinSet::new();
            let mut tick_no: u64 = 0;

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        while ticks.try_join_next().is_some() {}
                        tick_no += 1;
                        let ctx = ctx.clone();
                        let session = session.clone();
                        ticks.spawn(
                            async move { run_tick(&ctx, &session).await }
                                .instrument(info_span!("tick", tick_no)),
                        );
                    }
                }
            }

            debug!(in_flight = ticks.len(), "Tick scheduler cancelled");
            ticks.shutdown().await;
        }
        .instrument(info_span!("teaching_loop")),
    );

    LoopHandle {
        cancel: cancel.clone(),
        task,
        _guard: cancel.drop_guard(),
    }
}

async fn run_tick(ctx: &TickContext, session: &Mutex<LessonSession>) {
    let sample = match ctx.affect.sample().await {
        Ok(sample) => sample,
        Err(e) => {
            warn!(error = ?e, "Affect sampling failed; treating as neutral");
            AffectSample::undetected()
        }
    };

    let (subject, lesson_index) = {
        let session = session.lock().await;
        (session.subject, session.lesson_index)
    };
    let plan = adapt(&ctx.content, subject, lesson_index, &sample);
    debug!(%subject, lesson_index, emotion = %sample.emotion, advance = plan.advance, "Tick");

    ctx.events
        .status(format!("Emotion: {}", sample.emotion))
        .await;
    ctx.events.lesson_text(plan.text.clone()).await;

    match ctx
        .narration
        .speak(&plan.text, sample.emotion, sample.age_group)
        .await
    {
        Ok(SpeakOutcome::Issued(_)) if plan.advance => {
            // Overlapping ticks that narrated the same lesson advance it once.
            let mut session = session.lock().await;
            session.lesson_index = session.lesson_index.max(lesson_index.saturating_add(1));
            debug!(lesson_index = session.lesson_index, "Lesson advanced");
        }
        Ok(_) => {}
        Err(e) => warn!(error = ?e, "Narration failed"),
    }
}
