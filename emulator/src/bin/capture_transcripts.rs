use std::io;
use std::path::Path;

#[allow(dead_code)]
#[path = "../session.rs"]
mod session;

use session::Session;

const TRANSCRIPT_DIR: &str = "transcripts";

fn main() -> io::Result<()> {
    record("speed-cycle", &SPEED_CYCLE)?;
    record("toggle-enable", &TOGGLE_ENABLE)?;
    record("bounce", &BOUNCE)?;
    Ok(())
}

/// Cycle, cycle, toggle off, cycle (re-enables without advancing).
const SPEED_CYCLE: [&str; 10] = [
    "press cycle",
    "wait 100ms",
    "press cycle",
    "wait 100ms",
    "press toggle",
    "wait 100ms",
    "press cycle",
    "wait 100ms",
    "status",
    "log",
];

const TOGGLE_ENABLE: [&str; 8] = [
    "toggle",
    "wait 100ms",
    "status",
    "cycle",
    "wait 100ms",
    "toggle",
    "wait 100ms",
    "status",
];

/// Contact bounce on one button, then a press on the other before expiry.
const BOUNCE: [&str; 6] = [
    "bounce cycle 8 3ms",
    "wait 20ms",
    "press toggle",
    "wait 100ms",
    "status",
    "log",
];

fn record(name: &str, script: &[&str]) -> io::Result<()> {
    let path = Path::new(TRANSCRIPT_DIR).join(format!("{name}.log"));
    let mut session = Session::new(Some(&path))?;
    for line in script {
        let _ = session.handle_command(line)?;
    }
    println!("wrote {}", path.display());
    Ok(())
}
