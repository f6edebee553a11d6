//! End-to-end engine tests: capability registration through trigger
//! firing, delayed dispatch, template resolution, and follow-up actions.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use herald::{
    CapabilityRegistry, DisplaySpec, MessageSink, Notice, RuleEngine, RuleSetConfig, ScreenAnchor,
    TriggerSignal,
};

/// Sink that records everything it is asked to display.
#[derive(Clone, Default)]
struct RecordingSink {
    notices: Rc<RefCell<Vec<Notice>>>,
    urls: Rc<RefCell<Vec<String>>>,
}

impl MessageSink for RecordingSink {
    fn deliver(&mut self, notice: Notice) {
        self.notices.borrow_mut().push(notice);
    }

    fn open_url(&mut self, url: &str) {
        self.urls.borrow_mut().push(url.to_string());
    }
}

fn rules(json: &str) -> RuleSetConfig {
    serde_json::from_str(json).unwrap()
}

fn init_logs() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[test]
fn test_end_to_end_scenario() {
    init_logs();

    // Rule R1: condition InFlight, once per process, 2 second delay,
    // transient "Hello @GameTitle".
    let sink = RecordingSink::default();
    let notices = Rc::clone(&sink.notices);
    let fire: Rc<RefCell<Option<TriggerSignal>>> = Rc::new(RefCell::new(None));
    let slot = Rc::clone(&fire);

    let registry = CapabilityRegistry::new()
        .with_condition("InFlight", || true)
        .with_variable("GameTitle", || "Apollo".to_string())
        .with_trigger("OnSceneChange", move |signal| {
            *slot.borrow_mut() = Some(signal);
        });

    let engine = RuleEngine::builder()
        .capabilities(registry)
        .rules(rules(
            r#"{"rules": [{
                "name": "R1",
                "once": "once_per_process",
                "delay": 2.0,
                "condition": "InFlight",
                "type": "transient",
                "title": "",
                "message": "Hello @GameTitle"
            }]}"#,
        ))
        .sink(sink)
        .build()
        .unwrap();

    let trigger = fire.borrow().clone().expect("trigger wired");
    trigger();

    // Nothing before 2 simulated seconds have elapsed.
    engine.advance(1.0);
    assert!(notices.borrow().is_empty());
    engine.advance(1.0);

    {
        let notices = notices.borrow();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].message, "Hello Apollo");
        assert_eq!(
            notices[0].display,
            DisplaySpec::Transient {
                anchor: ScreenAnchor::UpperCenter,
                duration: 2.0,
            }
        );
    }

    // The rule never fires again this process.
    for _ in 0..5 {
        trigger();
        engine.advance(10.0);
    }
    assert_eq!(notices.borrow().len(), 1);
}

#[test]
fn test_and_semantics() {
    let c1 = Rc::new(Cell::new(true));
    let c2 = Rc::new(Cell::new(true));
    let sink = RecordingSink::default();
    let notices = Rc::clone(&sink.notices);

    let (a, b) = (Rc::clone(&c1), Rc::clone(&c2));
    let registry = CapabilityRegistry::new()
        .with_condition("C1", move || a.get())
        .with_condition("C2", move || b.get());

    let engine = RuleEngine::builder()
        .capabilities(registry)
        .rules(rules(
            r#"{"rules": [{
                "name": "Both",
                "condition": "C1 && C2",
                "type": "log",
                "title": "",
                "message": ""
            }]}"#,
        ))
        .sink(sink)
        .build()
        .unwrap();

    // Flipping either condition to false suppresses dispatch.
    c1.set(false);
    engine.process_all();
    c1.set(true);
    c2.set(false);
    engine.process_all();
    engine.advance(1.0);
    assert!(notices.borrow().is_empty());

    c2.set(true);
    engine.process_all();
    engine.advance(1.0);
    assert_eq!(notices.borrow().len(), 1);
}

#[test]
fn test_duplicate_capability_last_wins() {
    let sink = RecordingSink::default();
    let notices = Rc::clone(&sink.notices);

    // Both the condition and the variable are registered twice; the
    // engine must see the later entries.
    let registry = CapabilityRegistry::new()
        .with_condition("Ready", || false)
        .with_condition("Ready", || true)
        .with_variable("Who", || "nobody".to_string())
        .with_variable("Who", || "everyone".to_string());

    let engine = RuleEngine::builder()
        .capabilities(registry)
        .rules(rules(
            r#"{"rules": [{
                "name": "R",
                "condition": "Ready",
                "type": "log",
                "title": "",
                "message": "Hi @Who"
            }]}"#,
        ))
        .sink(sink)
        .build()
        .unwrap();

    engine.process_all();
    engine.advance(0.0);

    let notices = notices.borrow();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].message, "Hi everyone");
}

#[test]
fn test_template_resolution_in_title_and_message() {
    let sink = RecordingSink::default();
    let notices = Rc::clone(&sink.notices);

    let registry = CapabilityRegistry::new()
        .with_condition("C", || true)
        .with_variable("Craft", || "Kestrel".to_string());

    let engine = RuleEngine::builder()
        .capabilities(registry)
        .rules(rules(
            r#"{"rules": [{
                "name": "R",
                "condition": "C",
                "type": "dialog",
                "title": "@Craft report",
                "message": "line one\\nline two from @Craft, @Missing intact"
            }]}"#,
        ))
        .sink(sink)
        .build()
        .unwrap();

    engine.process_all();
    engine.advance(0.0);

    let notices = notices.borrow();
    assert_eq!(notices[0].title, "Kestrel report");
    assert_eq!(
        notices[0].message,
        "line one\nline two from Kestrel, @Missing intact"
    );
}

#[test]
fn test_dialog_display_params_reach_the_sink() {
    let sink = RecordingSink::default();
    let notices = Rc::clone(&sink.notices);

    let registry = CapabilityRegistry::new().with_condition("C", || true);
    let engine = RuleEngine::builder()
        .capabilities(registry)
        .rules(rules(
            r#"{"rules": [{
                "name": "R",
                "condition": "C",
                "type": "dialog",
                "position": {"x": 40.0, "y": 60.0},
                "size": [320.0, 180.0],
                "title": "t",
                "message": "m"
            }]}"#,
        ))
        .sink(sink)
        .build()
        .unwrap();

    engine.process_all();
    engine.advance(0.0);

    match &notices.borrow()[0].display {
        DisplaySpec::Dialog { position, size } => {
            assert_eq!((position.x, position.y), (40.0, 60.0));
            assert_eq!(*size, Some((320.0, 180.0)));
        }
        other => panic!("expected dialog spec, got {:?}", other),
    };
}

#[test]
fn test_multiple_triggers_each_drive_evaluation() {
    let sink = RecordingSink::default();
    let notices = Rc::clone(&sink.notices);
    let signals: Rc<RefCell<Vec<TriggerSignal>>> = Rc::new(RefCell::new(Vec::new()));

    let (s1, s2) = (Rc::clone(&signals), Rc::clone(&signals));
    let registry = CapabilityRegistry::new()
        .with_condition("C", || true)
        .with_trigger("OnMapEntered", move |signal| s1.borrow_mut().push(signal))
        .with_trigger("OnMapExited", move |signal| s2.borrow_mut().push(signal));

    let engine = RuleEngine::builder()
        .capabilities(registry)
        .rules(rules(
            r#"{"rules": [{
                "name": "R",
                "condition": "C",
                "type": "log",
                "title": "",
                "message": ""
            }]}"#,
        ))
        .sink(sink)
        .build()
        .unwrap();

    assert_eq!(signals.borrow().len(), 2);

    signals.borrow()[0]();
    engine.advance(0.0);
    signals.borrow()[1]();
    engine.advance(0.0);
    assert_eq!(notices.borrow().len(), 2);
}

#[test]
fn test_dialog_follow_up_actions() {
    // A dialog whose action group chains another rule, a registered
    // action, and a URL.
    let sink = RecordingSink::default();
    let notices = Rc::clone(&sink.notices);
    let urls = Rc::clone(&sink.urls);
    let dismissed = Rc::new(Cell::new(false));

    let d = Rc::clone(&dismissed);
    let registry = CapabilityRegistry::new()
        .with_condition("AtMainMenu", || true)
        .with_condition("Never", || false)
        .with_action("Dismiss", move || d.set(true));

    let engine = RuleEngine::builder()
        .capabilities(registry)
        .rules(rules(
            r#"{"rules": [
                {"name": "Greeting", "condition": "AtMainMenu", "type": "dialog",
                 "title": "Welcome", "message": "Check the notes",
                 "actions": [{"name": "OK", "refs": ["Notes", "Dismiss", "url:https://example.com/notes"]}]},
                {"name": "Notes", "condition": "Never", "type": "transient",
                 "title": "", "message": "Patch notes"}
            ]}"#,
        ))
        .sink(sink)
        .build()
        .unwrap();

    engine.process_all();
    engine.advance(0.0);

    // The Notes rule's own condition is false, yet the reference forced
    // it onto the schedule.
    assert!(dismissed.get());
    assert_eq!(urls.borrow().as_slice(), &["https://example.com/notes"]);
    engine.advance(0.0);

    let names: Vec<String> = notices.borrow().iter().map(|n| n.rule.clone()).collect();
    assert_eq!(names, vec!["Greeting", "Notes"]);
}
