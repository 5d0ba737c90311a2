/*!
 * Minimal harness for the courier crates.
 *
 * Point it at a collector, either through a settings file or the default
 * local endpoint, then run:
 *
 *   cargo run -p courier_demo
 *   cargo run -p courier_demo -- --settings courier.toml
 *   cargo run -p courier_demo -- --abort          # abort delivery midway
 *
 * Logging is controlled with `RUST_LOG`, e.g. `RUST_LOG=courier_core=debug`.
 */
use std::time::Duration;

use tracing_subscriber::EnvFilter;

/// Used when no settings file is given.
const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8080/reports";

fn main() -> courier::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let test_abort = args.iter().any(|a| a == "--abort");
    let settings_path = args
        .iter()
        .position(|a| a == "--settings")
        .and_then(|i| args.get(i + 1));

    let settings = match settings_path {
        Some(path) => courier::Settings::load(path)?,
        None => courier::Settings {
            form_uri: Some(DEFAULT_ENDPOINT.into()),
            ..Default::default()
        },
    };

    let mut outbox = courier::Outbox::new(&settings)?;

    /*
     * Queue two reports: one form-encoded, one JSON. Overflow is shown on
     * a small queue further down.
     */
    outbox.enqueue(courier::Report::form("message=Hello+from+courier"));
    outbox.enqueue(courier::Report::json(&serde_json::json!({
        "title": "io error",
        "detail": "No such file or directory",
    }))?);
    println!("[demo] {} reports pending", outbox.pending().len());

    if test_abort {
        let handle = outbox.abort_handle();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            println!("[demo] Aborting delivery...");
            handle.abort();
        });
    }

    let summary = outbox.deliver()?;
    println!(
        "[demo] delivered={} failed={} aborted={} still pending={}",
        summary.delivered,
        summary.failed,
        summary.aborted,
        outbox.pending().len()
    );

    /*
     * The retention queue on its own: keep the last three log lines.
     */
    let mut lines = courier::BoundedQueue::new(3)?;
    lines.push_all((1..=5).map(|n| format!("log line {n}\n")));
    print!("[demo] retained lines:\n{lines}");

    Ok(())
}
