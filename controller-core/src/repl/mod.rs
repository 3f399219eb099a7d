//! Line-command grammar for host tooling.
//!
//! The emulator drives a simulated controller from typed commands. Parsing
//! lives here so the grammar stays `no_std` and is unit-tested with the rest
//! of the core crate. Keywords are case-insensitive; durations are `<n>ms`,
//! `<n>s`, or a bare number of milliseconds.

use core::fmt;
use core::time::Duration;

use winnow::ascii::{Caseless, digit1, space0, space1};
use winnow::combinator::{alt, eof, opt, preceded, terminated};
use winnow::ModalResult;
use winnow::error::ContextError;
use winnow::prelude::*;
use winnow::token::literal;

use crate::edge::Button;

/// Spacing between simulated bounce edges when none is given.
pub const DEFAULT_BOUNCE_SPACING: Duration = Duration::from_millis(5);

/// Upper bound on edges generated by a single `bounce` command.
pub const MAX_BOUNCE_EDGES: u32 = 64;

/// Parsed emulator command.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ReplCommand {
    /// One clean falling edge.
    Press(Button),
    /// A burst of `edges` falling edges, `spacing` apart.
    Bounce {
        button: Button,
        edges: u32,
        spacing: Duration,
    },
    /// Advance virtual time.
    Wait(Duration),
    Status,
    Log,
    Help,
}

/// Errors surfaced by [`parse_command`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReplError {
    Empty,
    Syntax,
    /// `bounce` asked for zero edges or more than [`MAX_BOUNCE_EDGES`].
    EdgeCount(u32),
}

impl fmt::Display for ReplError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplError::Empty => f.write_str("empty command"),
            ReplError::Syntax => f.write_str("unrecognized command"),
            ReplError::EdgeCount(count) => {
                write!(f, "edge count {count} outside 1..={MAX_BOUNCE_EDGES}")
            }
        }
    }
}

/// Parses one command line.
pub fn parse_command(line: &str) -> Result<ReplCommand, ReplError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(ReplError::Empty);
    }

    let command = terminated(command, (space0, eof))
        .parse(trimmed)
        .map_err(|_| ReplError::Syntax)?;

    if let ReplCommand::Bounce { edges, .. } = command
        && !(1..=MAX_BOUNCE_EDGES).contains(&edges)
    {
        return Err(ReplError::EdgeCount(edges));
    }

    Ok(command)
}

fn command(input: &mut &str) -> ModalResult<ReplCommand, ContextError> {
    alt((
        bounce,
        wait,
        literal(Caseless("status")).value(ReplCommand::Status),
        literal(Caseless("log")).value(ReplCommand::Log),
        literal(Caseless("help")).value(ReplCommand::Help),
        press,
    ))
    .parse_next(input)
}

fn press(input: &mut &str) -> ModalResult<ReplCommand, ContextError> {
    preceded(opt((literal(Caseless("press")), space1)), button)
        .map(ReplCommand::Press)
        .parse_next(input)
}

fn bounce(input: &mut &str) -> ModalResult<ReplCommand, ContextError> {
    let (_, _, button, _, edges, spacing) = (
        literal(Caseless("bounce")),
        space1,
        button,
        space1,
        number,
        opt(preceded(space1, duration)),
    )
        .parse_next(input)?;

    Ok(ReplCommand::Bounce {
        button,
        edges,
        spacing: spacing.unwrap_or(DEFAULT_BOUNCE_SPACING),
    })
}

fn wait(input: &mut &str) -> ModalResult<ReplCommand, ContextError> {
    preceded((literal(Caseless("wait")), space1), duration)
        .map(ReplCommand::Wait)
        .parse_next(input)
}

fn button(input: &mut &str) -> ModalResult<Button, ContextError> {
    alt((
        literal(Caseless("cycle")).value(Button::CycleSpeed),
        literal(Caseless("speed")).value(Button::CycleSpeed),
        literal(Caseless("toggle")).value(Button::ToggleEnable),
        literal(Caseless("enable")).value(Button::ToggleEnable),
    ))
    .parse_next(input)
}

fn number(input: &mut &str) -> ModalResult<u32, ContextError> {
    digit1.try_map(str::parse::<u32>).parse_next(input)
}

fn duration(input: &mut &str) -> ModalResult<Duration, ContextError> {
    let value = number.parse_next(input)?;
    let unit_millis = opt(alt((
        literal(Caseless("ms")).value(1_u64),
        literal(Caseless("s")).value(1_000_u64),
    )))
    .parse_next(input)?
    .unwrap_or(1);

    Ok(Duration::from_millis(u64::from(value) * unit_millis))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_accepts_keyword_and_aliases() {
        assert_eq!(
            parse_command("press cycle"),
            Ok(ReplCommand::Press(Button::CycleSpeed))
        );
        assert_eq!(
            parse_command("Toggle"),
            Ok(ReplCommand::Press(Button::ToggleEnable))
        );
        assert_eq!(
            parse_command("  speed  "),
            Ok(ReplCommand::Press(Button::CycleSpeed))
        );
    }

    #[test]
    fn bounce_parses_count_and_optional_spacing() {
        assert_eq!(
            parse_command("bounce enable 4"),
            Ok(ReplCommand::Bounce {
                button: Button::ToggleEnable,
                edges: 4,
                spacing: DEFAULT_BOUNCE_SPACING,
            })
        );
        assert_eq!(
            parse_command("bounce cycle 3 12ms"),
            Ok(ReplCommand::Bounce {
                button: Button::CycleSpeed,
                edges: 3,
                spacing: Duration::from_millis(12),
            })
        );
    }

    #[test]
    fn bounce_rejects_out_of_range_counts() {
        assert_eq!(parse_command("bounce cycle 0"), Err(ReplError::EdgeCount(0)));
        assert_eq!(
            parse_command("bounce cycle 500"),
            Err(ReplError::EdgeCount(500))
        );
    }

    #[test]
    fn wait_understands_units() {
        assert_eq!(
            parse_command("wait 70ms"),
            Ok(ReplCommand::Wait(Duration::from_millis(70)))
        );
        assert_eq!(
            parse_command("wait 2s"),
            Ok(ReplCommand::Wait(Duration::from_secs(2)))
        );
        assert_eq!(
            parse_command("WAIT 15"),
            Ok(ReplCommand::Wait(Duration::from_millis(15)))
        );
    }

    #[test]
    fn keywords_and_garbage() {
        assert_eq!(parse_command("status"), Ok(ReplCommand::Status));
        assert_eq!(parse_command("log"), Ok(ReplCommand::Log));
        assert_eq!(parse_command("help"), Ok(ReplCommand::Help));
        assert_eq!(parse_command(""), Err(ReplError::Empty));
        assert_eq!(parse_command("cycles"), Err(ReplError::Syntax));
        assert_eq!(parse_command("wait soon"), Err(ReplError::Syntax));
    }
}
