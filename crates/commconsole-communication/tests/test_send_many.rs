mod common;

use common::MockTransport;
use commconsole_communication::{SessionManager, MIN_SEND_SPACING};
use commconsole_core::{EventDispatcher, LineConfig, SequenceReport, SessionEvent};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

type Reports = Arc<Mutex<Vec<SequenceReport>>>;

fn recorder() -> (Reports, impl FnOnce(SequenceReport) + Send + 'static) {
    let reports: Reports = Arc::new(Mutex::new(Vec::new()));
    let sink = reports.clone();
    (reports, move |report| sink.lock().push(report))
}

fn connected() -> (SessionManager, common::SharedState) {
    let (transport, state) = MockTransport::new();
    let mut manager = SessionManager::new(Box::new(transport));
    manager.open("COM3", &LineConfig::default()).unwrap();
    (manager, state)
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[test]
fn test_empty_list_completes_immediately() {
    let (mut manager, state) = connected();
    let (reports, on_complete) = recorder();

    let id = manager.send_many("COM3", Vec::<String>::new(), ms(50), on_complete);
    assert!(id.is_none());
    assert_eq!(*reports.lock(), vec![SequenceReport::default()]);
    assert_eq!(manager.pending_sequences(), 0);
    assert!(state.lock().writes.is_empty());
}

#[test]
fn test_items_sent_in_order_with_spacing() {
    let (mut manager, state) = connected();
    let (reports, on_complete) = recorder();

    let id = manager.send_many("COM3", ["a", "b", "c"], ms(50), on_complete);
    assert!(id.is_some());
    let t0 = Instant::now();

    assert_eq!(manager.pump_sequences(t0), 1);
    assert_eq!(manager.pump_sequences(t0 + ms(10)), 0);
    assert_eq!(manager.pump_sequences(t0 + ms(50)), 1);
    assert!(reports.lock().is_empty());
    assert_eq!(manager.pump_sequences(t0 + ms(100)), 1);

    assert_eq!(state.lock().writes, vec!["a\n", "b\n", "c\n"]);
    assert_eq!(manager.buffer("COM3"), Some("a\nb\nc\n"));
    assert_eq!(manager.pending_sequences(), 0);

    let reports = reports.lock();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].sent, 3);
    assert!(reports[0].is_complete());

    // Nothing left to fire
    assert_eq!(manager.pump_sequences(t0 + ms(1000)), 0);
}

#[test]
fn test_spacing_is_raised_to_floor() {
    let (mut manager, state) = connected();
    let (_reports, on_complete) = recorder();

    manager.send_many("COM3", ["x", "y"], Duration::ZERO, on_complete);
    let t0 = Instant::now();

    assert_eq!(manager.pump_sequences(t0), 1);
    assert_eq!(manager.pump_sequences(t0 + MIN_SEND_SPACING - ms(1)), 0);
    assert_eq!(manager.pump_sequences(t0 + MIN_SEND_SPACING), 1);
    assert_eq!(state.lock().writes.len(), 2);
}

#[test]
fn test_close_drops_remaining_items() {
    let (mut manager, state) = connected();
    let (reports, on_complete) = recorder();

    manager.send_many("COM3", ["a", "b", "c"], ms(50), on_complete);
    let t0 = Instant::now();
    manager.pump_sequences(t0);

    manager.close();
    assert_eq!(manager.pending_sequences(), 0);
    assert_eq!(state.lock().writes, vec!["a\n"]);

    let reports = reports.lock();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].sent, 1);
    assert_eq!(reports[0].dropped, 2);
    assert!(!reports[0].is_complete());
}

#[test]
fn test_items_for_other_port_are_skipped() {
    let (mut manager, state) = connected();
    let (reports, on_complete) = recorder();

    manager.send_many("COM4", ["a", "b"], ms(50), on_complete);
    let t0 = Instant::now();
    assert_eq!(manager.pump_sequences(t0), 0);
    assert_eq!(manager.pump_sequences(t0 + ms(50)), 0);

    assert!(state.lock().writes.is_empty());
    let reports = reports.lock();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].skipped, 2);
    assert_eq!(reports[0].sent, 0);
}

#[test]
fn test_sequence_queued_while_disconnected() {
    let (transport, state) = MockTransport::new();
    let mut manager = SessionManager::new(Box::new(transport));
    let (reports, on_complete) = recorder();

    manager.send_many("COM3", ["a"], ms(50), on_complete);
    manager.pump_sequences(Instant::now());

    assert!(state.lock().writes.is_empty());
    assert_eq!(reports.lock()[0].skipped, 1);
}

#[test]
fn test_cancel_sequence() {
    let (mut manager, state) = connected();
    let (reports, on_complete) = recorder();

    let id = manager
        .send_many("COM3", ["a", "b", "c"], ms(50), on_complete)
        .unwrap();
    let t0 = Instant::now();
    manager.pump_sequences(t0);

    assert!(manager.cancel_sequence(id));
    assert!(!manager.cancel_sequence(id));
    assert_eq!(manager.pump_sequences(t0 + ms(50)), 0);
    assert_eq!(state.lock().writes.len(), 1);

    let reports = reports.lock();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].sent, 1);
    assert_eq!(reports[0].dropped, 2);
    // The connection is unaffected
    assert!(manager.is_connected());
}

#[test]
fn test_write_failures_are_counted() {
    let (mut manager, state) = connected();
    let (reports, on_complete) = recorder();

    manager.send_many("COM3", ["a", "b"], ms(50), on_complete);
    let t0 = Instant::now();
    state.lock().fail_writes = true;
    manager.pump_sequences(t0);
    state.lock().fail_writes = false;
    manager.pump_sequences(t0 + ms(50));

    assert_eq!(state.lock().writes, vec!["b\n"]);
    let reports = reports.lock();
    assert_eq!(reports[0].failed, 1);
    assert_eq!(reports[0].sent, 1);
    assert!(manager.is_connected());
}

#[test]
fn test_parallel_sequences_interleave() {
    let (mut manager, state) = connected();
    let (first, on_first) = recorder();
    let (second, on_second) = recorder();

    manager.send_many("COM3", ["a1", "a2"], ms(50), on_first);
    manager.send_many("COM3", ["b1"], ms(50), on_second);
    let t0 = Instant::now();

    assert_eq!(manager.pump_sequences(t0), 2);
    assert_eq!(second.lock().len(), 1);
    assert!(first.lock().is_empty());
    assert_eq!(manager.pump_sequences(t0 + ms(50)), 1);
    assert_eq!(first.lock().len(), 1);

    assert_eq!(state.lock().writes, vec!["a1\n", "b1\n", "a2\n"]);
}

#[test]
fn test_finished_event_is_published() {
    let (transport, _state) = MockTransport::new();
    let events = EventDispatcher::new(32);
    let mut rx = events.subscribe();
    let mut manager = SessionManager::new(Box::new(transport)).with_events(events);
    manager.open("COM3", &LineConfig::default()).unwrap();

    let id = manager.send_many("COM3", ["a"], ms(50), |_| {}).unwrap();
    manager.pump_sequences(Instant::now());

    let finished = std::iter::from_fn(|| rx.try_recv().ok()).find_map(|event| match event {
        SessionEvent::SequenceFinished { id, report } => Some((id, report)),
        _ => None,
    });
    let (seen, report) = finished.unwrap();
    assert_eq!(seen, id);
    assert_eq!(report.sent, 1);
}
