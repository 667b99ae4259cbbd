//! Run a single theta-rho pattern end to end.
//!
//! Uses the in-crate mock transport so it works without real hardware;
//! swap `connect_with` for `engine.connect("/dev/ttyUSB0")` to drive a
//! real table.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use sandtable_motion::config::SystemConfig;
use sandtable_motion::device::MockTransport;
use sandtable_motion::pattern::MemoryPatternStore;
use sandtable_motion::{ExecutionEngine, PatternStore, RunOptions};

/// Render a simple outward spiral as theta-rho text.
fn spiral(turns: u32, points_per_turn: u32) -> String {
    let total = turns * points_per_turn;
    let mut text = String::from("# generated spiral\n");
    for i in 0..=total {
        let theta = i as f64 * std::f64::consts::TAU / points_per_turn as f64;
        let rho = i as f64 / total as f64;
        text.push_str(&format!("{:.5} {:.5}\n", theta, rho));
    }
    text
}

fn main() {
    env_logger::init();
    println!("=== Pattern Run Example ===\n");

    let patterns = Arc::new(MemoryPatternStore::new());
    patterns.insert("spiral.thr", &spiral(3, 36));

    let config = SystemConfig::default();
    let engine = ExecutionEngine::new(&config, patterns as Arc<dyn PatternStore>);

    let mock = MockTransport::new();
    mock.handle().set_ack_delay(Duration::from_millis(5));
    engine
        .connect_with(Box::new(mock), "mock0")
        .expect("mock connect");

    // Print status changes as they happen.
    let subscription = engine.subscribe();
    let printer = thread::spawn(move || {
        while let Some(snapshot) = subscription.recv() {
            match &snapshot.progress {
                Some(progress) => println!(
                    "[{}] {} {:.0}%",
                    snapshot.state,
                    snapshot.pattern.as_deref().unwrap_or("-"),
                    progress.percent * 100.0
                ),
                None => println!("[{}]", snapshot.state),
            }
            if snapshot.state.is_terminal() {
                break;
            }
        }
    });

    let run = engine
        .run("spiral.thr", RunOptions::default())
        .expect("run should start");
    let outcome = run.wait();
    println!("\nOutcome: {:?}", outcome);

    printer.join().expect("printer thread");
}
