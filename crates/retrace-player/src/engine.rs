//! Replay state machine.
//!
//! ```text
//! idle -> initializing -> playing <-> paused
//!                           |-> complete
//!                           |-> error
//! any --(stop | surface unreachable)--> idle
//! ```
//!
//! [`ReplayEngine::step`] dispatches a single event; [`ReplayEngine::run`]
//! drives it from a cancellable timer and a control channel.

use std::sync::Arc;
use std::time::Duration;

use retrace_config::PlaybackConfig;
use retrace_locator::LocatorResolver;
use retrace_protocols::{
    ElementHandle, EventPayload, PlaybackError, PlaybackState, PlaybackStatus, RecordedEvent,
    SurfaceAction, TargetSurface,
};
use retrace_template::{TemplateCompiler, Unconfigured};
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::feed::StatusFeed;
use crate::session::PlaybackSession;

/// Commands accepted by a running session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Control {
    Pause,
    Resume,
    SetSpeed(f64),
}

/// What [`ReplayEngine::step`] decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Move on to the next event after the delay.
    Continue(Duration),
    /// Dispatch failed; run a recovery handshake after the backoff, then
    /// retry the same event.
    Recover(Duration),
    /// The session reached `complete`, `error` or `idle`.
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Dispatch,
    Recover,
}

/// Replays the events of one [`PlaybackSession`] against one surface.
pub struct ReplayEngine {
    surface: Arc<dyn TargetSurface>,
    resolver: Arc<LocatorResolver>,
    compiler: TemplateCompiler,
    config: PlaybackConfig,
    feed: StatusFeed,
}

impl ReplayEngine {
    pub fn new(surface: Arc<dyn TargetSurface>, config: PlaybackConfig, feed: StatusFeed) -> Self {
        Self {
            surface,
            resolver: Arc::new(LocatorResolver::default()),
            compiler: TemplateCompiler::new(Arc::new(Unconfigured), Arc::new(Unconfigured)),
            config,
            feed,
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<LocatorResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Sets the compiler for this session's template pre-pass.
    pub fn with_compiler(mut self, compiler: TemplateCompiler) -> Self {
        self.compiler = compiler;
        self
    }

    /// `idle -> initializing -> playing`, or straight to `complete` when
    /// there is nothing to replay.
    ///
    /// On error the session has already been moved to `idle` or `error`.
    pub async fn initialize(&self, session: &mut PlaybackSession) -> Result<(), PlaybackError> {
        session.state = PlaybackState::Initializing;
        session.current_index = 0;
        session.ledger.reset();
        session.error_message = None;
        self.publish(session);

        let report = self
            .compiler
            .compile_events(&mut session.events, &session.variables)
            .await;
        if !report.unmatched.is_empty() {
            warn!(
                recording_id = %session.recording_id,
                unmatched = ?report.unmatched,
                "Recording references undefined variables"
            );
        }

        if session.events.is_empty() {
            info!(recording_id = %session.recording_id, "Nothing to replay");
            self.complete(session);
            return Ok(());
        }

        if let Err(e) = self.handshake().await {
            self.halt(session, &e);
            return Err(e);
        }

        session.state = PlaybackState::Playing;
        self.publish(session);
        info!(
            recording_id = %session.recording_id,
            surface_id = %session.surface_id,
            events = session.total(),
            speed = session.speed,
            "Playback started"
        );
        Ok(())
    }

    /// Dispatches the event at the current index and applies the
    /// retry/skip/abort policy on failure.
    pub async fn step(&self, session: &mut PlaybackSession) -> StepOutcome {
        let Some(event) = session.current_event().cloned() else {
            self.complete(session);
            return StepOutcome::Finished;
        };

        match self.dispatch(&event).await {
            Ok(()) => {
                debug!(sequence = event.sequence, kind = %event.kind(), "Dispatched event");
                let index = session.current_index;
                session.current_index += 1;
                self.publish(session);
                self.after_event(session, index)
            }
            Err(e) => self.on_failure(session, &event, e),
        }
    }

    /// Drives the session until it completes, fails, or is stopped.
    pub async fn run(
        &self,
        session: &mut PlaybackSession,
        mut controls: mpsc::UnboundedReceiver<Control>,
        cancel: CancellationToken,
    ) -> PlaybackStatus {
        let initialized = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = self.initialize(session) => Some(result),
        };
        match initialized {
            None => return self.stop(session),
            Some(Err(_)) => return session.status(),
            Some(Ok(())) => {}
        }

        let mut pending = Pending::Dispatch;
        let mut deadline = Instant::now();

        while session.state.is_active() {
            let playing = session.state == PlaybackState::Playing;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return self.stop(session),
                Some(control) = controls.recv() => {
                    if self.apply(session, control) {
                        deadline = Instant::now();
                    }
                }
                _ = sleep_until(deadline), if playing => {
                    let work = async {
                        match pending {
                            Pending::Dispatch => self.step(session).await,
                            Pending::Recover => self.recover(session).await,
                        }
                    };
                    let outcome = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => None,
                        outcome = work => Some(outcome),
                    };
                    match outcome {
                        None => return self.stop(session),
                        Some(StepOutcome::Continue(delay)) => {
                            pending = Pending::Dispatch;
                            deadline = Instant::now() + delay;
                        }
                        Some(StepOutcome::Recover(backoff)) => {
                            pending = Pending::Recover;
                            deadline = Instant::now() + backoff;
                        }
                        Some(StepOutcome::Finished) => {}
                    }
                }
            }
        }

        session.status()
    }

    async fn recover(&self, session: &mut PlaybackSession) -> StepOutcome {
        match self.handshake().await {
            Ok(()) => {
                debug!(index = session.current_index, "Recovery handshake acknowledged");
                StepOutcome::Continue(Duration::ZERO)
            }
            Err(e) if e.is_fatal() => {
                self.halt(session, &e);
                StepOutcome::Finished
            }
            Err(e) => {
                warn!(error = %e, "Recovery handshake failed, retrying");
                StepOutcome::Recover(
                    self.config
                        .recovery_backoff(session.ledger.distinct_failed()),
                )
            }
        }
    }

    fn on_failure(
        &self,
        session: &mut PlaybackSession,
        event: &RecordedEvent,
        err: PlaybackError,
    ) -> StepOutcome {
        if err.is_fatal() {
            self.halt(session, &err);
            return StepOutcome::Finished;
        }

        let index = session.current_index;
        let failures = session.ledger.record_failure(index);
        if failures <= self.config.event_retry_budget {
            warn!(
                sequence = event.sequence,
                attempt = failures,
                error = %err,
                "Event failed, recovering before retry"
            );
            self.publish(session);
            let backoff = self
                .config
                .recovery_backoff(session.ledger.distinct_failed());
            return StepOutcome::Recover(backoff);
        }

        let skipped = session.ledger.mark_skipped();
        error!(
            sequence = event.sequence,
            kind = %event.kind(),
            skipped,
            error = %err,
            "Event exhausted its retries, skipping"
        );
        if skipped > self.config.total_failure_budget {
            session.state = PlaybackState::Error;
            session.error_message = Some(format!(
                "Playback aborted after {skipped} failed events; last error: {err}"
            ));
            self.publish(session);
            error!(recording_id = %session.recording_id, "Playback aborted");
            return StepOutcome::Finished;
        }

        session.current_index += 1;
        self.publish(session);
        self.after_event(session, index)
    }

    /// Schedules whatever follows the event at `index`.
    fn after_event(&self, session: &mut PlaybackSession, index: usize) -> StepOutcome {
        if session.is_finished() {
            self.complete(session);
            return StepOutcome::Finished;
        }
        let delay = session
            .delay_after(index, self.config.min_delay())
            .unwrap_or_else(|| self.config.min_delay());
        StepOutcome::Continue(delay)
    }

    /// Returns true when the timer should fire immediately.
    fn apply(&self, session: &mut PlaybackSession, control: Control) -> bool {
        match control {
            Control::Pause if session.state == PlaybackState::Playing => {
                session.state = PlaybackState::Paused;
                self.publish(session);
                info!(index = session.current_index, "Playback paused");
                false
            }
            Control::Resume if session.state == PlaybackState::Paused => {
                session.state = PlaybackState::Playing;
                self.publish(session);
                info!(index = session.current_index, "Playback resumed");
                true
            }
            Control::SetSpeed(multiplier) => {
                debug!(multiplier, "Playback speed changed");
                session.speed = multiplier;
                false
            }
            other => {
                trace!(?other, state = %session.state, "Ignoring control");
                false
            }
        }
    }

    async fn dispatch(&self, event: &RecordedEvent) -> Result<(), PlaybackError> {
        let action = match &event.payload {
            EventPayload::InitialState { url, .. } | EventPayload::Navigate { url, .. } => {
                let page = self.surface.page_state().await?;
                if page.url == *url {
                    trace!(url = %url, "Already at recorded URL");
                    return Ok(());
                }
                SurfaceAction::Navigate { url: url.clone() }
            }
            EventPayload::Click { .. } => SurfaceAction::Click {
                handle: self.locate(event).await?,
            },
            EventPayload::DoubleClick { .. } => SurfaceAction::DoubleClick {
                handle: self.locate(event).await?,
            },
            EventPayload::Keydown {
                key,
                code,
                modifiers,
            } => {
                let handle = match &event.locator {
                    Some(locator) => Some(self.resolve(locator).await?),
                    None => None,
                };
                SurfaceAction::Key {
                    handle,
                    key: key.clone(),
                    code: code.clone(),
                    modifiers: *modifiers,
                }
            }
            EventPayload::Input { value } => SurfaceAction::SetValue {
                handle: self.locate(event).await?,
                value: value.clone(),
                checked: None,
            },
            EventPayload::Change { value, checked } => SurfaceAction::SetValue {
                handle: self.locate(event).await?,
                value: value.clone(),
                checked: *checked,
            },
            EventPayload::Submit { form_data } => SurfaceAction::Submit {
                handle: self.locate(event).await?,
                form_data: form_data.clone(),
            },
            EventPayload::Scroll { scroll_x, scroll_y } => SurfaceAction::ScrollTo {
                x: *scroll_x,
                y: *scroll_y,
            },
            EventPayload::ViewportChange { .. }
            | EventPayload::Network { .. }
            | EventPayload::Custom { .. } => {
                trace!(kind = %event.kind(), "Nothing to dispatch");
                return Ok(());
            }
        };

        self.surface.perform(action).await?;
        Ok(())
    }

    async fn locate(&self, event: &RecordedEvent) -> Result<ElementHandle, PlaybackError> {
        let locator = event.locator.as_deref().ok_or_else(|| {
            PlaybackError::ElementNotFound(format!("{} event without locator", event.kind()))
        })?;
        self.resolve(locator).await
    }

    async fn resolve(&self, locator: &str) -> Result<ElementHandle, PlaybackError> {
        let doc = self.surface.snapshot().await?;
        let node = self.resolver.resolve(&doc, locator)?;
        Ok(doc.handle(node))
    }

    async fn handshake(&self) -> Result<(), PlaybackError> {
        let timeout = self.config.handshake_timeout();
        match tokio::time::timeout(timeout, self.surface.handshake()).await {
            Ok(result) => result.map_err(PlaybackError::from),
            Err(_) => Err(PlaybackError::HandshakeTimeout(self.config.handshake_timeout_ms)),
        }
    }

    fn complete(&self, session: &mut PlaybackSession) {
        session.current_index = session.total();
        session.state = PlaybackState::Complete;
        self.publish(session);
        info!(
            recording_id = %session.recording_id,
            skipped = session.ledger.distinct_failed(),
            failures = session.ledger.total_failures(),
            "Playback complete"
        );
    }

    /// Unreachable surfaces drop to `idle`; anything else ends in `error`.
    fn halt(&self, session: &mut PlaybackSession, err: &PlaybackError) {
        session.state = if err.is_fatal() {
            PlaybackState::Idle
        } else {
            PlaybackState::Error
        };
        session.error_message = Some(err.to_string());
        self.publish(session);
        error!(
            recording_id = %session.recording_id,
            surface_id = %session.surface_id,
            error = %err,
            state = %session.state,
            "Playback halted"
        );
    }

    fn stop(&self, session: &mut PlaybackSession) -> PlaybackStatus {
        session.state = PlaybackState::Idle;
        self.publish(session);
        info!(
            recording_id = %session.recording_id,
            index = session.current_index,
            "Playback stopped"
        );
        session.status()
    }

    fn publish(&self, session: &PlaybackSession) {
        self.feed.publish(session.status());
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
