#[path = "../../courier_core/tests/common/mod.rs"]
mod common;

use std::thread;
use std::time::{Duration, Instant};

use common::{closed_port_url, Step, TestServer};
use courier::{AbortHandle, DeliverySummary, Outbox, Report, Settings};

fn settings(form_uri: String, capacity: usize) -> Settings {
    Settings {
        form_uri: Some(form_uri),
        connect_timeout_ms: 2_000,
        socket_timeout_ms: 30_000,
        max_pending_reports: capacity,
        ..Default::default()
    }
}

#[test]
fn test_deliver_sends_oldest_first_and_keeps_rejects() {
    let server = TestServer::start(|_| {
        vec![
            Step::ok("OK"),
            Step::status(503, "busy"),
            Step::ok("OK"),
        ]
    });
    let mut outbox = Outbox::new(&settings(server.url("/reports"), 10)).unwrap();

    outbox.enqueue(Report::form("n=1"));
    outbox.enqueue(Report::json(&serde_json::json!({ "n": 2 })).unwrap());
    outbox.enqueue(Report::form("n=3"));

    let summary = outbox.deliver().unwrap();
    assert_eq!(
        summary,
        DeliverySummary {
            delivered: 2,
            failed: 1,
            aborted: false,
        }
    );

    assert_eq!(server.next_request().body, "n=1");
    let second = server.next_request();
    assert_eq!(second.body, r#"{"n":2}"#);
    assert_eq!(second.header("content-type"), Some("application/json"));
    assert_eq!(server.next_request().body, "n=3");

    let left: Vec<_> = outbox.pending().iter().map(Report::body).collect();
    assert_eq!(left, vec![r#"{"n":2}"#]);
}

#[test]
fn test_unreachable_collector_keeps_everything() {
    let mut outbox = Outbox::new(&settings(closed_port_url(), 3)).unwrap();
    outbox.enqueue_all((1..=5).map(|n| Report::form(format!("n={n}"))));

    let summary = outbox.deliver().unwrap();
    assert_eq!(summary.delivered, 0);
    assert_eq!(summary.failed, 3);

    assert_eq!(outbox.pending().to_string(), "n=3n=4n=5");
}

#[test]
fn test_abort_stops_the_pass_and_requeues_the_rest() {
    let server = TestServer::start(|_| vec![Step::ok("OK"), Step::Hang]);
    let mut outbox = Outbox::new(&settings(server.url("/"), 10)).unwrap();
    outbox.enqueue_all(["a=1", "a=2", "a=3"].map(Report::form));

    let handle = outbox.abort_handle();
    let requests = thread::spawn(move || {
        server.next_request();
        server.next_request();
        handle.abort();
        server
    });

    let started = Instant::now();
    let summary = outbox.deliver().unwrap();
    let server = requests.join().unwrap();

    assert!(summary.aborted);
    assert_eq!(summary.delivered, 1);
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(outbox.pending().to_string(), "a=2a=3");
    assert!(server.hung_up_within(Duration::from_secs(5)));
}

/**
 * The collector answers fast and only then asks for the abort, so it
 * usually lands while no request is on the wire.
 */
#[test]
fn test_abort_between_requests_stops_the_pass() {
    let (handle_tx, handle_rx) = crossbeam_channel::bounded::<AbortHandle>(1);
    let server = TestServer::start(move |_| {
        vec![
            Step::ok("OK").then(move || {
                if let Ok(handle) = handle_rx.recv() {
                    handle.abort();
                }
            }),
            Step::ok("OK"),
            Step::ok("OK"),
        ]
    });
    let mut outbox = Outbox::new(&settings(server.url("/"), 10)).unwrap();
    outbox.enqueue_all(["a=1", "a=2", "a=3"].map(Report::form));
    handle_tx.send(outbox.abort_handle()).unwrap();

    let summary = outbox.deliver().unwrap();

    assert!(summary.aborted);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.delivered + outbox.pending().len(), 3);
    assert!(outbox.pending().to_string().ends_with("a=2a=3"));

    assert_eq!(server.next_request().body, "a=1");
    while let Some(request) = server.request_within(Duration::from_millis(300)) {
        assert_ne!(request.body, "a=3", "the pass kept sending after the abort");
    }
}

#[test]
fn test_abort_with_no_pass_running_is_forgotten() {
    let mut outbox = Outbox::new(&settings(closed_port_url(), 3)).unwrap();
    outbox.enqueue(Report::form("a=1"));

    outbox.abort_handle().abort();
    let summary = outbox.deliver().unwrap();

    assert!(!summary.aborted);
    assert_eq!(summary.failed, 1);
    assert_eq!(outbox.pending().len(), 1);
}
