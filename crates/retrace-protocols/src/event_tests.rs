use super::*;
use serde_json::json;

#[test]
fn test_click_wire_shape() {
    let event = RecordedEvent::new(
        2,
        1_000,
        EventPayload::Click {
            x: 10.0,
            y: 20.0,
            target_tag: Some("button".to_string()),
            target_value: None,
        },
    )
    .with_locator("#go");

    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["type"], "click");
    assert_eq!(value["sequence"], 2);
    assert_eq!(value["locator"], "#go");
    assert_eq!(value["targetTag"], "button");
    assert!(value.get("targetValue").is_none());
}

#[test]
fn test_double_click_uses_dblclick_tag() {
    let event = RecordedEvent::new(1, 0, EventPayload::DoubleClick { x: 1.0, y: 2.0 });
    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["type"], "dblclick");
}

#[test]
fn test_initial_state_from_json() {
    let event: RecordedEvent = serde_json::from_value(json!({
        "type": "initial-state",
        "sequence": 0,
        "timestamp": 5,
        "url": "https://example.com/",
        "title": "Example",
        "viewport": {"width": 1280, "height": 720}
    }))
    .unwrap();

    assert_eq!(event.kind(), EventKind::InitialState);
    assert!(event.locator.is_none());
    match event.payload {
        EventPayload::InitialState { url, viewport, .. } => {
            assert_eq!(url, "https://example.com/");
            assert_eq!(viewport.width, 1280);
        }
        other => panic!("unexpected payload {other:?}"),
    }
}

#[test]
fn test_selector_alias_accepted() {
    let event: RecordedEvent = serde_json::from_value(json!({
        "type": "input",
        "sequence": 4,
        "timestamp": 10,
        "selector": "input[name=\"q\"]",
        "value": "rust"
    }))
    .unwrap();
    assert_eq!(event.locator.as_deref(), Some("input[name=\"q\"]"));
}

#[test]
fn test_keydown_modifiers_default() {
    let event: RecordedEvent = serde_json::from_value(json!({
        "type": "keydown",
        "sequence": 1,
        "timestamp": 1,
        "key": "Enter"
    }))
    .unwrap();
    match event.payload {
        EventPayload::Keydown { modifiers, code, .. } => {
            assert!(modifiers.is_empty());
            assert!(code.is_none());
        }
        other => panic!("unexpected payload {other:?}"),
    }
}

#[test]
fn test_submit_form_data_camel_case() {
    let mut form_data = BTreeMap::new();
    form_data.insert("user".to_string(), "ann".to_string());
    let event = RecordedEvent::new(3, 0, EventPayload::Submit { form_data });
    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["type"], "submit");
    assert_eq!(value["formData"]["user"], "ann");
}

#[test]
fn test_unknown_type_rejected() {
    let result = serde_json::from_value::<RecordedEvent>(json!({
        "type": "hover",
        "sequence": 1,
        "timestamp": 1
    }));
    assert!(result.is_err());
}

#[test]
fn test_templated_values_mut() {
    let mut payload = EventPayload::Input {
        value: "{{x}}".to_string(),
    };
    for value in payload.templated_values_mut() {
        value.push('!');
    }
    assert_eq!(payload, EventPayload::Input { value: "{{x}}!".to_string() });

    let mut form_data = BTreeMap::new();
    form_data.insert("a".to_string(), "1".to_string());
    form_data.insert("b".to_string(), "2".to_string());
    let mut submit = EventPayload::Submit { form_data };
    assert_eq!(submit.templated_values_mut().len(), 2);

    let mut click = EventPayload::DoubleClick { x: 0.0, y: 0.0 };
    assert!(click.templated_values_mut().is_empty());
}

#[test]
fn test_event_kind_names() {
    assert_eq!(EventKind::ViewportChange.to_string(), "viewport-change");
    assert!(EventKind::Scroll.is_windowed());
    assert!(!EventKind::Click.is_windowed());
    assert!(EventKind::Network.is_passive());
    assert!(!EventKind::Input.is_passive());
}
