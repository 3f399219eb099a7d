use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use fan_controller_core::controller::{ControlEvent, ControlOutcome, DispatchReport};
use fan_controller_core::edge::{Button, EdgeReport};
use fan_controller_core::repl::{ReplCommand, parse_command};
use fan_controller_core::sim::{SimController, SimInstant, sim_controller};
use fan_controller_core::speed::IndicatorMask;
use fan_controller_core::telemetry::{TelemetryPayload, TelemetryRecord, TelemetryRecorder};

pub const HELP_TOPICS: &[(&str, &str)] = &[
    (
        "press",
        "[press] cycle|toggle                  - one clean falling edge",
    ),
    (
        "bounce",
        "bounce cycle|toggle <edges> [spacing] - burst of edges (default 5ms apart)",
    ),
    (
        "wait",
        "wait <n>ms|<n>s                       - advance virtual time, firing debounce expiry",
    ),
    (
        "status",
        "status                                - display controller state",
    ),
    (
        "log",
        "log                                   - dump the telemetry ring",
    ),
    (
        "help",
        "help                                  - show this list",
    ),
];

/// Emulator session: a simulated controller driven on virtual time.
///
/// Time only moves on `wait` and between the edges of a `bounce`; any
/// debounce deadline passed on the way is serviced at its exact instant.
pub struct Session {
    controller: SimController,
    telemetry: TelemetryRecorder<SimInstant>,
    now: SimInstant,
    transcript: Option<TranscriptLogger>,
}

impl Session {
    pub fn new(transcript: Option<&Path>) -> io::Result<Self> {
        let transcript = transcript.map(TranscriptLogger::new).transpose()?;

        Ok(Self {
            controller: sim_controller(),
            telemetry: TelemetryRecorder::new(),
            now: SimInstant::ZERO,
            transcript,
        })
    }

    pub fn handle_command(&mut self, line: &str) -> io::Result<Vec<String>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        self.log_line(TranscriptRole::Host, trimmed)?;

        let lines = match parse_command(trimmed) {
            Ok(ReplCommand::Press(button)) => vec![self.edge(button)],
            Ok(ReplCommand::Bounce {
                button,
                edges,
                spacing,
            }) => self.bounce(button, edges, spacing),
            Ok(ReplCommand::Wait(duration)) => self.wait(duration),
            Ok(ReplCommand::Status) => self.status(),
            Ok(ReplCommand::Log) => self.telemetry_lines(),
            Ok(ReplCommand::Help) => help_lines(),
            Err(err) => vec![format!("ERR {err}")],
        };

        self.record_output(&lines)?;
        Ok(lines)
    }

    fn edge(&mut self, button: Button) -> String {
        self.apply(ControlEvent::Edge(button))
    }

    fn bounce(&mut self, button: Button, edges: u32, spacing: Duration) -> Vec<String> {
        let mut lines = Vec::new();
        for index in 0..edges {
            if index > 0 {
                lines.extend(self.advance(spacing));
            }
            lines.push(self.edge(button));
        }
        lines
    }

    fn wait(&mut self, duration: Duration) -> Vec<String> {
        let mut lines = self.advance(duration);
        lines.push(format!("t={}", self.now));
        lines
    }

    /// Moves virtual time forward, servicing every debounce expiry on the way.
    fn advance(&mut self, duration: Duration) -> Vec<String> {
        let target = self.now + duration;
        let mut lines = Vec::new();

        while let Some(deadline) = self.controller.debounce_deadline() {
            if deadline > target {
                break;
            }
            self.now = deadline;
            lines.push(self.apply(ControlEvent::DebounceExpired));
        }

        self.now = target;
        lines
    }

    fn apply(&mut self, event: ControlEvent) -> String {
        let outcome = self.controller.handle(event, self.now);
        self.telemetry.record_outcome(&outcome, self.now);
        describe_outcome(&outcome, self.now)
    }

    fn status(&self) -> Vec<String> {
        let output = self.controller.output();
        let pending = self
            .controller
            .pending()
            .map_or_else(|| "none".to_string(), |request| request.to_string());
        let debounce = self
            .controller
            .debounce_deadline()
            .map_or_else(|| "idle".to_string(), |deadline| format!("due {deadline}"));

        vec![
            format!("t={} {}", self.now, self.controller.state()),
            format!(
                "leds={} pending={pending} debounce={debounce}",
                describe_leds(self.controller.indicators().lit())
            ),
            format!(
                "pwm compare={} running={} torn-writes={} sleep={}",
                output.compare(),
                output.is_running(),
                output.torn_writes(),
                self.controller.sleep_mode()
            ),
        ]
    }

    fn telemetry_lines(&self) -> Vec<String> {
        if self.telemetry.is_empty() {
            return vec!["telemetry empty".to_string()];
        }
        self.telemetry.oldest_first().map(describe_record).collect()
    }

    fn log_line(&mut self, role: TranscriptRole, line: &str) -> io::Result<()> {
        let now = self.now;
        match self.transcript.as_mut() {
            Some(transcript) => transcript.append_line(now, role, line),
            None => Ok(()),
        }
    }

    fn record_output(&mut self, lines: &[String]) -> io::Result<()> {
        for line in lines {
            self.log_line(TranscriptRole::Emulator, line)?;
        }
        Ok(())
    }
}

fn describe_outcome(outcome: &ControlOutcome, now: SimInstant) -> String {
    match outcome {
        ControlOutcome::Edge(EdgeReport { button, superseded }) => match superseded {
            Some(previous) => format!("{now} edge {button} (supersedes {previous})"),
            None => format!("{now} edge {button}"),
        },
        ControlOutcome::EdgeIgnored(button) => format!("{now} edge {button} ignored"),
        ControlOutcome::Dispatched(DispatchReport {
            request,
            state,
            sleep_mode,
        }) => match request {
            Some(request) => format!("{now} dispatch {request}: {state} sleep={sleep_mode}"),
            None => format!("{now} expiry with nothing pending: {state} sleep={sleep_mode}"),
        },
        ControlOutcome::SpuriousExpiry => format!("{now} spurious expiry"),
    }
}

fn describe_record(record: &TelemetryRecord<SimInstant>) -> String {
    let head = format!("#{:<4} {} {}", record.id, record.timestamp, record.event);
    match record.details {
        TelemetryPayload::None => head,
        TelemetryPayload::Edge(edge) => match edge.elapsed_since_previous {
            Some(elapsed) => format!("{head} Δ={}us", elapsed.as_micros()),
            None => head,
        },
        TelemetryPayload::State(state) => format!("{head} {state}"),
    }
}

fn describe_leds(lit: IndicatorMask) -> String {
    let labels = [
        (IndicatorMask::LOW, "low"),
        (IndicatorMask::MID, "mid"),
        (IndicatorMask::FULL, "full"),
    ];
    let lit: Vec<&str> = labels
        .iter()
        .filter(|(mask, _)| lit.contains(*mask))
        .map(|(_, label)| *label)
        .collect();
    if lit.is_empty() {
        "off".to_string()
    } else {
        lit.join(",")
    }
}

fn help_lines() -> Vec<String> {
    let mut lines = vec!["Available commands:".to_string()];
    for (_, detail) in HELP_TOPICS {
        lines.push(format!("  {detail}"));
    }
    lines.push("Type `exit` to quit.".to_string());
    lines
}

struct TranscriptLogger {
    writer: BufWriter<std::fs::File>,
}

impl TranscriptLogger {
    fn new(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        let mut logger = Self {
            writer: BufWriter::new(file),
        };

        logger.write_header()?;
        Ok(logger)
    }

    fn write_header(&mut self) -> io::Result<()> {
        writeln!(self.writer, "# Fan controller emulator transcript")?;
        writeln!(self.writer, "# Timestamps are virtual time since session start")?;
        writeln!(self.writer)?;
        self.writer.flush()
    }

    fn append_line(&mut self, now: SimInstant, role: TranscriptRole, line: &str) -> io::Result<()> {
        writeln!(self.writer, "[{:>12}] {} {}", now.to_string(), role.prefix(), line)?;
        self.writer.flush()
    }
}

enum TranscriptRole {
    Host,
    Emulator,
}

impl TranscriptRole {
    fn prefix(&self) -> &'static str {
        match self {
            TranscriptRole::Host => "HOST>",
            TranscriptRole::Emulator => "EMU <",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fan_controller_core::speed::SpeedLevel;

    fn session() -> Session {
        Session::new(None).expect("session without transcript")
    }

    fn run(session: &mut Session, line: &str) -> Vec<String> {
        session.handle_command(line).expect("in-memory session")
    }

    #[test]
    fn press_waits_for_debounce_before_dispatch() {
        let mut session = session();
        let lines = run(&mut session, "press cycle");
        assert_eq!(lines, vec!["0.000ms edge cycle".to_string()]);
        assert_eq!(session.controller.state().level, SpeedLevel::Off);

        let lines = run(&mut session, "wait 60ms");
        assert_eq!(lines, vec!["t=60.000ms".to_string()]);
        assert_eq!(session.controller.state().level, SpeedLevel::Off);

        let lines = run(&mut session, "wait 5ms");
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("62.500ms dispatch cycle-speed: level=low"));
        assert_eq!(session.controller.state().level, SpeedLevel::Low);
        assert_eq!(session.now, SimInstant::from_millis(65));
    }

    #[test]
    fn bounce_burst_collapses_to_one_dispatch() {
        let mut session = session();
        let lines = run(&mut session, "bounce toggle 6 4ms");
        assert_eq!(lines.len(), 6);
        assert_eq!(session.controller.pending().map(|r| r.label()), Some("toggle-enable"));

        run(&mut session, "wait 1s");
        let state = session.controller.state();
        assert!(state.enabled);
        assert_eq!(state.level, SpeedLevel::Off);

        let dispatches = session
            .telemetry
            .oldest_first()
            .filter(|record| matches!(record.details, TelemetryPayload::State(_)))
            .count();
        assert_eq!(dispatches, 1);
    }

    #[test]
    fn widely_spaced_bounce_dispatches_each_edge() {
        let mut session = session();
        let lines = run(&mut session, "bounce cycle 3 100ms");
        assert_eq!(lines.len(), 5);
        run(&mut session, "wait 100ms");
        assert_eq!(session.controller.state().level, SpeedLevel::Full);
    }

    #[test]
    fn status_reports_outputs() {
        let mut session = session();
        run(&mut session, "cycle");
        run(&mut session, "wait 70ms");
        let lines = run(&mut session, "status");

        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("duty=4/10"));
        assert!(lines[1].starts_with("leds=low pending=none debounce=idle"));
        assert_eq!(
            lines[2],
            "pwm compare=4 running=true torn-writes=0 sleep=sleep"
        );
    }

    #[test]
    fn errors_and_help_are_reported_inline() {
        let mut session = session();
        assert_eq!(
            run(&mut session, "spin"),
            vec!["ERR unrecognized command".to_string()]
        );
        assert_eq!(run(&mut session, "   "), Vec::<String>::new());
        let help = run(&mut session, "help");
        assert_eq!(help.len(), HELP_TOPICS.len() + 2);
    }

    #[test]
    fn log_lists_telemetry() {
        let mut session = session();
        assert_eq!(run(&mut session, "log"), vec!["telemetry empty".to_string()]);

        run(&mut session, "cycle");
        run(&mut session, "wait 100ms");
        let lines = run(&mut session, "log");
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("edge-accepted cycle"));
        assert!(lines[1].contains("dispatched cycle-speed"));
        assert!(lines[2].contains("sleep-mode sleep"));
    }
}
