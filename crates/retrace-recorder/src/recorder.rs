//! Event recorder bound to one target surface.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use retrace_config::RecorderConfig;
use retrace_protocols::{
    CaptureOptions, RawInteraction, RecordedEvent, RecorderError, TargetSurface,
};
use serde_json::json;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::pipeline::{CapturePipeline, STOP_MARKER};

/// Lifecycle of an [`EventRecorder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Recording,
    Paused,
    Stopped,
}

/// Captures interactions from a surface and emits sequenced events.
///
/// A recorder is single-use: once stopped it cannot be restarted, and its
/// output channel closes after the stop marker.
pub struct EventRecorder {
    surface: Arc<dyn TargetSurface>,
    options: CaptureOptions,
    pipeline: Arc<Mutex<CapturePipeline>>,
    paused: Arc<AtomicBool>,
    output: Mutex<Option<mpsc::UnboundedSender<RecordedEvent>>>,
    state: Mutex<RecorderState>,
    recording_id: Mutex<Option<String>>,
    cancel: CancellationToken,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl EventRecorder {
    /// Creates a recorder and the channel its events are emitted on.
    pub fn new(
        surface: Arc<dyn TargetSurface>,
        config: RecorderConfig,
        options: CaptureOptions,
    ) -> (Self, mpsc::UnboundedReceiver<RecordedEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let recorder = Self {
            surface,
            options,
            pipeline: Arc::new(Mutex::new(CapturePipeline::new(config))),
            paused: Arc::new(AtomicBool::new(false)),
            output: Mutex::new(Some(tx)),
            state: Mutex::new(RecorderState::Idle),
            recording_id: Mutex::new(None),
            cancel: CancellationToken::new(),
            pump: Mutex::new(None),
        };
        (recorder, rx)
    }

    pub fn state(&self) -> RecorderState {
        *self.state.lock()
    }

    pub fn recording_id(&self) -> Option<String> {
        self.recording_id.lock().clone()
    }

    pub fn surface_id(&self) -> &str {
        self.surface.id()
    }

    /// Emits the initial-state event and starts capturing.
    pub async fn start(&self, recording_id: &str) -> Result<(), RecorderError> {
        {
            let mut state = self.state.lock();
            if *state != RecorderState::Idle {
                return Err(RecorderError::AlreadyStarted);
            }
            *state = RecorderState::Recording;
        }

        if let Err(e) = self.begin(recording_id).await {
            *self.state.lock() = RecorderState::Idle;
            return Err(e);
        }

        info!(
            recording_id,
            surface_id = self.surface.id(),
            "Recording started"
        );
        Ok(())
    }

    async fn begin(&self, recording_id: &str) -> Result<(), RecorderError> {
        let page = self.surface.page_state().await?;
        let raw = self.surface.attach_capture(self.options).await?;

        *self.recording_id.lock() = Some(recording_id.to_string());
        let initial = self.pipeline.lock().initial_state(&page, now_millis());
        self.send(initial);

        let Some(output) = self.output.lock().clone() else {
            return Err(RecorderError::NotRunning);
        };
        let span = info_span!(
            "recorder_pump",
            recording_id,
            surface_id = self.surface.id()
        );
        let task = run_pump(
            raw,
            self.pipeline.clone(),
            self.paused.clone(),
            output,
            self.cancel.clone(),
        );
        *self.pump.lock() = Some(tokio::spawn(task.instrument(span)));
        Ok(())
    }

    /// Suspends capture without detaching hooks. Sequence numbers continue
    /// where they left off on resume.
    pub fn pause(&self) -> Result<(), RecorderError> {
        let mut state = self.state.lock();
        match *state {
            RecorderState::Recording | RecorderState::Paused => {
                self.paused.store(true, Ordering::SeqCst);
                *state = RecorderState::Paused;
                debug!(surface_id = self.surface.id(), "Recording paused");
                Ok(())
            }
            _ => Err(RecorderError::NotRunning),
        }
    }

    pub fn resume(&self) -> Result<(), RecorderError> {
        let mut state = self.state.lock();
        match *state {
            RecorderState::Recording | RecorderState::Paused => {
                self.paused.store(false, Ordering::SeqCst);
                *state = RecorderState::Recording;
                debug!(surface_id = self.surface.id(), "Recording resumed");
                Ok(())
            }
            _ => Err(RecorderError::NotRunning),
        }
    }

    /// Detaches capture, emits the stop marker and closes the output channel.
    ///
    /// Interactions the surface reported before the call are still processed.
    /// Returns the number of events emitted, marker included.
    pub async fn stop(&self) -> Result<u64, RecorderError> {
        {
            let mut state = self.state.lock();
            if !matches!(*state, RecorderState::Recording | RecorderState::Paused) {
                return Err(RecorderError::NotRunning);
            }
            *state = RecorderState::Stopped;
        }

        self.cancel.cancel();
        let pump = self.pump.lock().take();
        if let Some(pump) = pump {
            if let Err(e) = pump.await {
                warn!(error = %e, "Recorder pump ended abnormally");
            }
        }

        if let Err(e) = self.surface.detach_capture().await {
            warn!(surface_id = self.surface.id(), error = %e, "Failed to detach capture hooks");
        }

        let recording_id = self.recording_id();
        let total = {
            let mut pipeline = self.pipeline.lock();
            let detail = json!({
                "recordingId": recording_id,
                "eventCount": pipeline.next_sequence(),
            });
            let marker = pipeline.marker(STOP_MARKER, now_millis(), detail);
            self.send(marker);
            pipeline.next_sequence()
        };
        self.output.lock().take();

        info!(
            recording_id = recording_id.as_deref().unwrap_or_default(),
            events = total,
            "Recording stopped"
        );
        Ok(total)
    }

    fn send(&self, event: RecordedEvent) {
        if let Some(output) = self.output.lock().as_ref() {
            if output.send(event).is_err() {
                debug!("Recorder output dropped, discarding event");
            }
        }
    }
}

impl Drop for EventRecorder {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_pump(
    mut raw: mpsc::UnboundedReceiver<RawInteraction>,
    pipeline: Arc<Mutex<CapturePipeline>>,
    paused: Arc<AtomicBool>,
    output: mpsc::UnboundedSender<RecordedEvent>,
    cancel: CancellationToken,
) {
    let forward = |interaction: RawInteraction| -> bool {
        if paused.load(Ordering::SeqCst) {
            return true;
        }
        let event = pipeline.lock().process(interaction);
        match event {
            Some(event) => output.send(event).is_ok(),
            None => true,
        }
    };

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                while let Ok(interaction) = raw.try_recv() {
                    if !forward(interaction) {
                        break;
                    }
                }
                break;
            }
            next = raw.recv() => match next {
                Some(interaction) => {
                    if !forward(interaction) {
                        debug!("Recorder output closed");
                        break;
                    }
                }
                None => {
                    debug!("Capture stream closed");
                    break;
                }
            },
        }
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use retrace_protocols::{
        Document, EventKind, EventPayload, InteractionKind, Modifiers, PageState, SurfaceAction,
        SurfaceError, Viewport,
    };

    #[derive(Default)]
    struct FakeSurface {
        sink: Mutex<Option<mpsc::UnboundedSender<RawInteraction>>>,
        attached_with: Mutex<Option<CaptureOptions>>,
        detached: AtomicBool,
        offline: bool,
    }

    impl FakeSurface {
        fn inject(&self, kind: InteractionKind, at: i64) {
            let sink = self.sink.lock();
            sink.as_ref()
                .expect("capture attached")
                .send(RawInteraction {
                    kind,
                    target: None,
                    at,
                })
                .unwrap();
        }
    }

    #[async_trait]
    impl TargetSurface for FakeSurface {
        fn id(&self) -> &str {
            "fake"
        }

        async fn page_state(&self) -> Result<PageState, SurfaceError> {
            if self.offline {
                return Err(SurfaceError::Unreachable("tab closed".to_string()));
            }
            Ok(PageState {
                url: "https://example.com/".to_string(),
                title: "Example".to_string(),
                viewport: Viewport {
                    width: 1280,
                    height: 720,
                },
            })
        }

        async fn handshake(&self) -> Result<(), SurfaceError> {
            Ok(())
        }

        async fn snapshot(&self) -> Result<Document, SurfaceError> {
            Ok(Document::default())
        }

        async fn perform(&self, _action: SurfaceAction) -> Result<(), SurfaceError> {
            Ok(())
        }

        async fn attach_capture(
            &self,
            options: CaptureOptions,
        ) -> Result<mpsc::UnboundedReceiver<RawInteraction>, SurfaceError> {
            let (tx, rx) = mpsc::unbounded_channel();
            *self.sink.lock() = Some(tx);
            *self.attached_with.lock() = Some(options);
            Ok(rx)
        }

        async fn detach_capture(&self) -> Result<(), SurfaceError> {
            self.sink.lock().take();
            self.detached.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn key(k: &str) -> InteractionKind {
        InteractionKind::Keydown {
            key: k.to_string(),
            code: None,
            modifiers: Modifiers::default(),
        }
    }

    async fn drain(rx: &mut mpsc::UnboundedReceiver<RecordedEvent>) -> Vec<RecordedEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    async fn settle() {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_start_emits_initial_state_then_events() {
        let surface = Arc::new(FakeSurface::default());
        let (recorder, mut rx) =
            EventRecorder::new(surface.clone(), RecorderConfig::default(), CaptureOptions::default());

        recorder.start("rec_1").await.unwrap();
        assert_eq!(recorder.state(), RecorderState::Recording);

        surface.inject(key("a"), 100);
        surface.inject(key("b"), 120); // inside the minimum gap
        surface.inject(key("c"), 200);

        let total = recorder.stop().await.unwrap();
        let events = drain(&mut rx).await;

        let kinds: Vec<EventKind> = events.iter().map(|e| e.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::InitialState,
                EventKind::Keydown,
                EventKind::Keydown,
                EventKind::Custom
            ]
        );
        let sequences: Vec<u64> = events.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2, 3]);
        assert_eq!(total, 4);

        match &events[0].payload {
            EventPayload::InitialState { url, viewport, .. } => {
                assert_eq!(url, "https://example.com/");
                assert_eq!(viewport.width, 1280);
            }
            other => panic!("unexpected payload {other:?}"),
        }
        match &events[3].payload {
            EventPayload::Custom { name, detail } => {
                assert_eq!(name, STOP_MARKER);
                assert_eq!(detail["recordingId"], "rec_1");
                assert_eq!(detail["eventCount"], 3);
            }
            other => panic!("unexpected payload {other:?}"),
        }
        assert!(surface.detached.load(Ordering::SeqCst));
        assert_eq!(recorder.state(), RecorderState::Stopped);
    }

    #[tokio::test]
    async fn test_pause_drops_events_and_keeps_sequence() {
        let surface = Arc::new(FakeSurface::default());
        let (recorder, mut rx) =
            EventRecorder::new(surface.clone(), RecorderConfig::default(), CaptureOptions::default());
        recorder.start("rec_2").await.unwrap();
        assert_eq!(rx.recv().await.unwrap().sequence, 0);

        surface.inject(key("a"), 100);
        let first = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.sequence, 1);

        recorder.pause().unwrap();
        surface.inject(key("ignored"), 200);
        settle().await;
        recorder.resume().unwrap();

        surface.inject(key("b"), 300);
        recorder.stop().await.unwrap();
        let rest = drain(&mut rx).await;

        assert_eq!(rest.len(), 2);
        match &rest[0].payload {
            EventPayload::Keydown { key, .. } => assert_eq!(key, "b"),
            other => panic!("unexpected payload {other:?}"),
        }
        assert_eq!(rest[0].sequence, 2);
        assert_eq!(rest[1].sequence, 3);
    }

    #[tokio::test]
    async fn test_lifecycle_errors() {
        let surface = Arc::new(FakeSurface::default());
        let (recorder, _rx) =
            EventRecorder::new(surface, RecorderConfig::default(), CaptureOptions::default());

        assert!(matches!(recorder.pause(), Err(RecorderError::NotRunning)));
        assert!(matches!(recorder.stop().await, Err(RecorderError::NotRunning)));

        recorder.start("rec_3").await.unwrap();
        assert!(matches!(
            recorder.start("rec_3").await,
            Err(RecorderError::AlreadyStarted)
        ));

        recorder.stop().await.unwrap();
        assert!(matches!(recorder.resume(), Err(RecorderError::NotRunning)));
        assert!(matches!(
            recorder.start("rec_4").await,
            Err(RecorderError::AlreadyStarted)
        ));
    }

    #[tokio::test]
    async fn test_unreachable_surface_leaves_recorder_idle() {
        let surface = Arc::new(FakeSurface {
            offline: true,
            ..Default::default()
        });
        let (recorder, _rx) =
            EventRecorder::new(surface, RecorderConfig::default(), CaptureOptions::default());

        let err = recorder.start("rec_5").await.unwrap_err();
        assert!(matches!(err, RecorderError::Surface(SurfaceError::Unreachable(_))));
        assert_eq!(recorder.state(), RecorderState::Idle);
    }

    #[tokio::test]
    async fn test_capture_options_forwarded() {
        let surface = Arc::new(FakeSurface::default());
        let options = CaptureOptions {
            intercept_network: true,
        };
        let (recorder, _rx) = EventRecorder::new(surface.clone(), RecorderConfig::default(), options);
        recorder.start("rec_6").await.unwrap();
        assert_eq!(*surface.attached_with.lock(), Some(options));
        recorder.stop().await.unwrap();
    }
}
