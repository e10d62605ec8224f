//! Record → persist → replay against an in-memory surface.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use retrace_config::{PlaybackConfig, RecorderConfig};
use retrace_core::{Controller, MemoryStore, MemorySurface, RecordingRepository, SurfaceRegistry};
use retrace_player::PlaybackCoordinator;
use retrace_protocols::{
    Command, CommandResponse, CustomVariable, EventKind, EventPayload, GenerationError,
    GenerationProvider, InteractionKind, PlaybackState, RecordedEvent, RecordingSettings,
    SurfaceAction,
};

const SIGNUP: &str = r#"
<html>
  <body>
    <div class="card">
      <form class="signup">
        <input class="field" name="email">
        <textarea class="field" name="bio"></textarea>
        <button class="btn primary">Create account</button>
      </form>
    </div>
  </body>
</html>
"#;

#[derive(Default)]
struct CountingGenerator(AtomicUsize);

#[async_trait]
impl GenerationProvider for CountingGenerator {
    fn id(&self) -> &str {
        "counting"
    }

    async fn generate(&self, _name: &str, prompt: &str) -> Result<String, GenerationError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(format!("about: {prompt}"))
    }
}

struct World {
    controller: Controller,
    surface: Arc<MemorySurface>,
    repository: Arc<RecordingRepository>,
    generator: Arc<CountingGenerator>,
}

fn world() -> World {
    let surface = Arc::new(
        MemorySurface::from_markup("tab-1", "https://example.com/signup", SIGNUP).unwrap(),
    );
    let surfaces = Arc::new(SurfaceRegistry::new());
    surfaces.register(surface.clone()).unwrap();
    let repository = Arc::new(RecordingRepository::new(Arc::new(MemoryStore::new())));
    let generator = Arc::new(CountingGenerator::default());
    let coordinator = PlaybackCoordinator::new(
        repository.clone(),
        surfaces.clone(),
        PlaybackConfig::default(),
    )
    .with_generator(generator.clone());
    let controller = Controller::new(
        repository.clone(),
        surfaces,
        Arc::new(coordinator),
        RecorderConfig::default(),
    );
    World {
        controller,
        surface,
        repository,
        generator,
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn node_named(surface: &MemorySurface, name: &str) -> Option<retrace_protocols::NodeId> {
    let doc = surface.document();
    doc.iter().find(|n| doc.attr(*n, "name") == Some(name))
}

fn button(surface: &MemorySurface) -> Option<retrace_protocols::NodeId> {
    let doc = surface.document();
    doc.iter().find(|n| doc.tag(*n) == "button")
}

async fn record_signup(world: &World) -> String {
    let started = world
        .controller
        .execute(Command::StartRecording {
            name: "signup".to_string(),
            surface_id: "tab-1".to_string(),
            settings: RecordingSettings::default(),
        })
        .await
        .unwrap();
    let CommandResponse::RecordingStarted { recording_id } = started else {
        panic!("unexpected response: {started:?}");
    };

    let base = now();
    let surface = &world.surface;
    surface.interact(
        InteractionKind::Input {
            value: "ada@example.com".to_string(),
        },
        node_named(surface, "email"),
        base + 500,
    );
    surface.interact(
        InteractionKind::Input {
            value: "Mathematician".to_string(),
        },
        node_named(surface, "bio"),
        base + 1_500,
    );
    surface.interact(
        InteractionKind::Click {
            x: 40.0,
            y: 12.0,
            value: None,
        },
        button(surface),
        base + 2_000,
    );
    world
        .controller
        .execute(Command::StopRecording)
        .await
        .unwrap();
    recording_id
}

fn play(recording_id: &str) -> Command {
    Command::PlayRecording {
        recording_id: recording_id.to_string(),
        surface_id: "tab-1".to_string(),
        speed: Some(2.0),
    }
}

#[tokio::test(start_paused = true)]
async fn test_recorded_locators_resolve_on_replay() {
    let world = world();
    let recording_id = record_signup(&world).await;

    let recording = world.repository.require(&recording_id).await.unwrap();
    let locators: Vec<Option<&str>> = recording.events.iter().map(|e| e.locator.as_deref()).collect();
    assert_eq!(
        locators,
        vec![
            None,
            Some("input[name=\"email\"]"),
            Some("textarea[name=\"bio\"]"),
            Some("html > body > div.card > form.signup > button.btn.primary"),
            None,
        ]
    );

    world.controller.execute(play(&recording_id)).await.unwrap();
    let status = world.controller.coordinator().wait("tab-1").await.unwrap();
    assert_eq!(status.state, PlaybackState::Complete);
    assert_eq!(status.progress, 100);

    let names: Vec<&str> = world.surface.actions().iter().map(|a| a.name()).collect();
    assert_eq!(names, vec!["set-value", "set-value", "click"]);
    let email = node_named(&world.surface, "email").unwrap();
    assert_eq!(
        world.surface.attr(email, "value").as_deref(),
        Some("ada@example.com")
    );
}

#[tokio::test(start_paused = true)]
async fn test_imported_recording_replays_with_variables() {
    let world = world();
    let recording_id = record_signup(&world).await;

    // Parameterize the captured values the way an editor would.
    let mut recording = world.repository.require(&recording_id).await.unwrap();
    for event in &mut recording.events {
        if let EventPayload::Input { value } = &mut event.payload {
            *value = if value.contains('@') {
                "{{email}}".to_string()
            } else {
                "{{bio}} / {{ bio }}".to_string()
            };
        }
    }
    recording.settings.variables = vec![
        CustomVariable::plain("email", "grace@example.com"),
        CustomVariable::generated("bio", "navy"),
    ];
    world.repository.save(&recording).await.unwrap();

    let exported = world.repository.export(&recording_id).await.unwrap();
    let imported = world.repository.import(&exported).await.unwrap();
    assert_ne!(imported.id, recording_id);

    world.controller.execute(play(&imported.id)).await.unwrap();
    let status = world.controller.coordinator().wait("tab-1").await.unwrap();
    assert_eq!(status.state, PlaybackState::Complete);
    assert_eq!(world.generator.0.load(Ordering::SeqCst), 1);

    let values: Vec<String> = world
        .surface
        .actions()
        .into_iter()
        .filter_map(|a| match a {
            SurfaceAction::SetValue { value, .. } => Some(value),
            _ => None,
        })
        .collect();
    assert_eq!(
        values,
        vec!["grace@example.com", "about: navy / about: navy"]
    );

    // The stored recording keeps its placeholders.
    let stored = world.repository.require(&imported.id).await.unwrap();
    assert!(stored.events.iter().any(|e| matches!(
        &e.payload,
        EventPayload::Input { value } if value == "{{email}}"
    )));
}

#[tokio::test(start_paused = true)]
async fn test_missing_element_is_skipped() {
    let world = world();
    let click = |sequence: u64, locator: &str| {
        RecordedEvent::new(
            sequence,
            sequence as i64 * 100,
            EventPayload::Click {
                x: 0.0,
                y: 0.0,
                target_tag: None,
                target_value: None,
            },
        )
        .with_locator(locator)
    };
    // Stored out of order on purpose.
    let recording = world
        .repository
        .draft("flaky", "https://example.com/signup", RecordingSettings::default())
        .with_events(vec![click(2, "button.btn"), click(1, "#gone")]);
    world.repository.save(&recording).await.unwrap();

    world.controller.execute(play(&recording.id)).await.unwrap();
    let status = world.controller.coordinator().wait("tab-1").await.unwrap();
    assert_eq!(status.state, PlaybackState::Complete);
    assert_eq!(status.skipped, 1);
    assert_eq!(status.current_event, 2);
    assert_eq!(world.surface.actions().len(), 1);
}

#[tokio::test]
async fn test_stop_marker_closes_recording() {
    let world = world();
    let recording_id = record_signup(&world).await;
    let recording = world.repository.require(&recording_id).await.unwrap();

    let last = recording.events.last().unwrap();
    assert_eq!(last.kind(), EventKind::Custom);
    let EventPayload::Custom { detail, .. } = &last.payload else {
        panic!("expected the stop marker");
    };
    assert_eq!(detail["recordingId"], recording_id.as_str());
    assert_eq!(detail["eventCount"], 4);

    let sequences: Vec<u64> = recording.events.iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, vec![0, 1, 2, 3, 4]);
}
