//! on / off / emit behavior.

use std::sync::{Arc, Mutex};

use class_event::{listener, EventRegistry, Listener};

use super::support::{entries, make_log, recorded_registry, Move, PointEvents, Position, Reset};

fn logging(log: &super::support::Log, tag: &'static str) -> Listener<Position> {
    let log = Arc::clone(log);
    listener(move |p: &Position| log.lock().unwrap().push(format!("{tag}:{},{}", p.x, p.y)))
}

// ============================================================================
// Basic subscription
// ============================================================================

#[test]
fn on_then_emit_calls_listener_once_with_payload() {
    let registry: EventRegistry<PointEvents> = EventRegistry::new();
    let log = make_log();

    registry.on::<Move>(&logging(&log, "h"));
    registry.emit::<Move>(&Position { x: 1, y: 2 });

    assert_eq!(entries(&log), vec!["h:1,2"]);
}

#[test]
fn emit_calls_listeners_in_registration_order() {
    let registry: EventRegistry<PointEvents> = EventRegistry::new();
    let log = make_log();

    registry
        .on::<Move>(&logging(&log, "h1"))
        .on::<Move>(&logging(&log, "h2"))
        .emit::<Move>(&Position { x: 1, y: 2 });

    assert_eq!(entries(&log), vec!["h1:1,2", "h2:1,2"]);
}

#[test]
fn emit_only_reaches_listeners_of_that_event() {
    let registry: EventRegistry<PointEvents> = EventRegistry::new();
    let log = make_log();
    let reset_log = Arc::clone(&log);

    registry.on::<Move>(&logging(&log, "move"));
    registry.on::<Reset>(&listener(move |_: &()| {
        reset_log.lock().unwrap().push("reset".to_string())
    }));

    registry.emit::<Reset>(&());

    assert_eq!(entries(&log), vec!["reset"]);
}

#[test]
fn emit_with_no_listeners_is_a_no_op() {
    let registry: EventRegistry<PointEvents> = EventRegistry::new();
    registry.emit::<Move>(&Position { x: 0, y: 0 });
    assert_eq!(registry.listener_count::<Move>(), 0);
}

#[test]
fn same_handle_registered_twice_is_called_twice() {
    let registry: EventRegistry<PointEvents> = EventRegistry::new();
    let log = make_log();
    let h = logging(&log, "h");

    registry.on::<Move>(&h).on::<Move>(&h);
    registry.emit::<Move>(&Position { x: 3, y: 4 });

    assert_eq!(entries(&log), vec!["h:3,4", "h:3,4"]);
    assert_eq!(registry.listener_count::<Move>(), 2);
}

// ============================================================================
// Unsubscription
// ============================================================================

#[test]
fn off_removes_listener() {
    let registry: EventRegistry<PointEvents> = EventRegistry::new();
    let log = make_log();
    let h = logging(&log, "h");

    registry.on::<Move>(&h);
    registry.off::<Move>(&h);
    registry.emit::<Move>(&Position { x: 1, y: 2 });

    assert!(entries(&log).is_empty(), "listener should not fire after off()");
    assert!(!registry.has_listeners::<Move>());
}

#[test]
fn off_removes_only_the_first_duplicate() {
    let registry: EventRegistry<PointEvents> = EventRegistry::new();
    let log = make_log();
    let h = logging(&log, "h");
    let other = logging(&log, "other");

    registry.on::<Move>(&h).on::<Move>(&other).on::<Move>(&h);
    registry.off::<Move>(&h);
    registry.emit::<Move>(&Position { x: 0, y: 1 });

    assert_eq!(entries(&log), vec!["other:0,1", "h:0,1"]);
}

#[test]
fn off_uses_handle_identity_not_behavior() {
    let registry: EventRegistry<PointEvents> = EventRegistry::new();
    let log = make_log();
    let h = logging(&log, "h");
    let lookalike = logging(&log, "h");

    registry.on::<Move>(&h);
    registry.off::<Move>(&lookalike);
    registry.emit::<Move>(&Position { x: 1, y: 1 });

    assert_eq!(entries(&log), vec!["h:1,1"]);
}

#[test]
fn cloned_handle_keeps_identity() {
    let registry: EventRegistry<PointEvents> = EventRegistry::new();
    let log = make_log();
    let h = logging(&log, "h");

    registry.on::<Move>(&h);
    registry.off::<Move>(&Arc::clone(&h));

    assert_eq!(registry.listener_count::<Move>(), 0);
}

#[test]
fn off_for_unknown_listener_or_event_is_safe() {
    let registry: EventRegistry<PointEvents> = EventRegistry::new();
    let log = make_log();
    let registered = logging(&log, "kept");
    let stranger = logging(&log, "stranger");

    // No list yet for this event.
    registry.off::<Move>(&stranger);

    registry.on::<Move>(&registered);
    // Not registered: must not remove anything else.
    registry.off::<Move>(&stranger);
    registry.emit::<Move>(&Position { x: 5, y: 5 });

    assert_eq!(entries(&log), vec!["kept:5,5"]);
}

#[test]
fn double_off_is_safe() {
    let registry: EventRegistry<PointEvents> = EventRegistry::new();
    let log = make_log();
    let h = logging(&log, "h");

    registry.on::<Move>(&h);
    registry.off::<Move>(&h).off::<Move>(&h);
    registry.emit::<Move>(&Position { x: 1, y: 2 });

    assert!(entries(&log).is_empty());
}

// ============================================================================
// Snapshot semantics during emit
// ============================================================================

#[test]
fn listener_added_during_emit_is_not_called_in_current_emission() {
    let registry: Arc<EventRegistry<PointEvents>> = Arc::new(EventRegistry::new());
    let log = make_log();
    let late = logging(&log, "late");

    {
        let registry_clone = Arc::clone(&registry);
        let log = Arc::clone(&log);
        registry.on::<Move>(&listener(move |_: &Position| {
            log.lock().unwrap().push("first".to_string());
            registry_clone.on::<Move>(&late);
        }));
    }

    registry.emit::<Move>(&Position { x: 1, y: 1 });
    assert_eq!(entries(&log), vec!["first"]);

    log.lock().unwrap().clear();
    registry.emit::<Move>(&Position { x: 2, y: 2 });
    assert_eq!(entries(&log), vec!["first", "late:2,2"]);
}

#[test]
fn listener_removed_during_emit_is_still_called_snapshot_semantics() {
    let registry: Arc<EventRegistry<PointEvents>> = Arc::new(EventRegistry::new());
    let log = make_log();
    let victim = logging(&log, "victim");

    {
        let registry_clone = Arc::clone(&registry);
        let victim = Arc::clone(&victim);
        registry.on::<Move>(&listener(move |_: &Position| {
            registry_clone.off::<Move>(&victim);
        }));
    }
    registry.on::<Move>(&victim);

    registry.emit::<Move>(&Position { x: 1, y: 0 });
    assert_eq!(entries(&log), vec!["victim:1,0"]);

    registry.emit::<Move>(&Position { x: 2, y: 0 });
    assert_eq!(entries(&log), vec!["victim:1,0"], "victim removed after first round");
}

// ============================================================================
// Panic isolation
// ============================================================================

#[test]
fn panicking_listener_is_reported_and_later_listeners_still_run() {
    let (registry, recorder) = recorded_registry();
    let log = make_log();

    registry.on::<Move>(&listener(|_: &Position| panic!("listener exploded")));
    registry.on::<Move>(&logging(&log, "after"));

    registry.emit::<Move>(&Position { x: 7, y: 8 });

    assert_eq!(entries(&log), vec!["after:7,8"]);
    assert_eq!(recorder.reports(), vec!["panic:move:listener exploded"]);
}

#[test]
fn formatted_panic_message_is_reported() {
    let (registry, recorder) = recorded_registry();
    let seen = Arc::new(Mutex::new(0));
    let seen_clone = Arc::clone(&seen);

    registry.on::<Move>(&listener(move |p: &Position| {
        *seen_clone.lock().unwrap() += 1;
        panic!("bad x {}", p.x);
    }));

    registry.emit::<Move>(&Position { x: 9, y: 0 });
    registry.emit::<Move>(&Position { x: 10, y: 0 });

    assert_eq!(*seen.lock().unwrap(), 2, "listener stays registered after panicking");
    assert_eq!(
        recorder.reports(),
        vec!["panic:move:bad x 9", "panic:move:bad x 10"]
    );
}
