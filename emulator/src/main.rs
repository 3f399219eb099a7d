mod session;

use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;

use session::Session;

fn main() -> io::Result<()> {
    let transcript = parse_transcript().unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!("Usage: fan-controller-emulator [--transcript <path>]");
        process::exit(2);
    });

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    let mut session = Session::new(transcript.as_deref())?;
    let mut line = String::new();

    writeln!(
        writer,
        "Fan Controller Emulator ready. Type `help` for commands or `exit` to quit."
    )?;

    loop {
        line.clear();
        write!(writer, "> ")?;
        writer.flush()?;

        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            writeln!(writer)?;
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if should_terminate(trimmed) {
            writeln!(writer, "Session closed.")?;
            break;
        }

        let responses = session.handle_command(trimmed)?;
        for response in responses {
            writeln!(writer, "{response}")?;
        }
    }

    Ok(())
}

fn should_terminate(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

fn parse_transcript() -> Result<Option<PathBuf>, String> {
    let mut args = env::args().skip(1);
    let Some(arg) = args.next() else {
        return Ok(None);
    };

    let path = if let Some(value) = arg.strip_prefix("--transcript=") {
        value.to_string()
    } else if arg == "--transcript" {
        args.next()
            .ok_or_else(|| "Expected value after --transcript".to_string())?
    } else {
        return Err(format!("Unknown argument `{arg}`"));
    };

    if let Some(extra) = args.next() {
        return Err(format!("Unexpected argument `{extra}`"));
    }
    if path.is_empty() {
        return Err("Transcript path must not be empty".to_string());
    }
    Ok(Some(PathBuf::from(path)))
}
