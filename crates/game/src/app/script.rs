use std::collections::HashMap;
use std::io::BufRead;

use farmsim_engine::{InputSnapshot, InputSource, InputSourceError, TilePos};
use thiserror::Error;
use tracing::{debug, info};

use super::gameplay::ButtonCallback;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScriptCommand {
    Click(TilePos),
    Drag(TilePos),
    Press(ButtonCallback),
    Wait(u32),
    Reset,
    Resize,
    Dump,
    Help,
    Quit,
}

impl ScriptCommand {
    /// The single tick this command occupies. `wait` is counted down by
    /// [`ScriptInput`] and `help` takes no tick.
    pub(crate) fn snapshot(self) -> Option<InputSnapshot> {
        match self {
            Self::Click(tile) => Some(InputSnapshot::empty().with_pointer_down_tile(Some(tile))),
            Self::Drag(tile) => Some(InputSnapshot::empty().with_pointer_tile(Some(tile))),
            Self::Press(callback) => {
                Some(InputSnapshot::empty().with_button_pressed(Some(callback.id())))
            }
            Self::Reset => Some(InputSnapshot::empty().with_reset_pressed(true)),
            Self::Resize => Some(InputSnapshot::empty().with_viewport_resized(true)),
            Self::Dump => Some(InputSnapshot::empty().with_dump_requested(true)),
            Self::Quit => Some(InputSnapshot::quit()),
            Self::Wait(_) | Self::Help => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CommandParseError {
    reason: String,
    usage: String,
}

impl CommandParseError {
    fn new(reason: impl Into<String>, usage: &str) -> Self {
        Self {
            reason: reason.into(),
            usage: usage.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum ScriptError {
    #[error("failed to read command script: {0}")]
    Io(#[source] std::io::Error),
    #[error("line {line}: unknown command '{name}'")]
    UnknownCommand { line: usize, name: String },
    #[error("line {line}: {reason} (usage: {usage})")]
    Parse {
        line: usize,
        reason: String,
        usage: String,
    },
}

type ParseFn = fn(&[&str]) -> Result<ScriptCommand, CommandParseError>;

struct CommandSpec {
    name: &'static str,
    help: &'static str,
    arg_schema: &'static str,
    parse: ParseFn,
}

const BUILTIN_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "click",
        help: "Pointer down on a tile",
        arg_schema: "<x:i32> <y:i32>",
        parse: parse_click_command,
    },
    CommandSpec {
        name: "drag",
        help: "Move the pointer over a tile",
        arg_schema: "<x:i32> <y:i32>",
        parse: parse_drag_command,
    },
    CommandSpec {
        name: "press",
        help: "Press a configured button",
        arg_schema: "<move|axe|water|pickaxe|accept|cancel|cancel_drag>",
        parse: parse_press_command,
    },
    CommandSpec {
        name: "wait",
        help: "Run idle ticks",
        arg_schema: "<ticks:u32>",
        parse: parse_wait_command,
    },
    CommandSpec {
        name: "reset",
        help: "Reset transient scene state",
        arg_schema: "",
        parse: parse_reset_command,
    },
    CommandSpec {
        name: "resize",
        help: "Signal a viewport resize",
        arg_schema: "",
        parse: parse_resize_command,
    },
    CommandSpec {
        name: "dump",
        help: "Log the scene view as JSON",
        arg_schema: "",
        parse: parse_dump_command,
    },
    CommandSpec {
        name: "help",
        help: "Log the command list",
        arg_schema: "",
        parse: parse_help_command,
    },
    CommandSpec {
        name: "quit",
        help: "Stop the run",
        arg_schema: "",
        parse: parse_quit_command,
    },
];

pub(crate) struct ScriptCommandRegistry {
    specs: &'static [CommandSpec],
    lookup_by_lower_name: HashMap<&'static str, usize>,
}

impl ScriptCommandRegistry {
    pub(crate) fn with_builtins() -> Self {
        let lookup_by_lower_name = BUILTIN_COMMANDS
            .iter()
            .enumerate()
            .map(|(index, spec)| (spec.name, index))
            .collect();
        Self {
            specs: BUILTIN_COMMANDS,
            lookup_by_lower_name,
        }
    }

    fn lookup(&self, input_name: &str) -> Option<&CommandSpec> {
        let lower = input_name.to_ascii_lowercase();
        let index = self.lookup_by_lower_name.get(lower.as_str())?;
        self.specs.get(*index)
    }

    pub(crate) fn iter_specs_in_order(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.specs
            .iter()
            .map(|spec| (spec.name, spec.help, spec.arg_schema))
    }

    /// Blank lines and `#` comments parse to `None`.
    pub(crate) fn parse_line(
        &self,
        raw: &str,
        line: usize,
    ) -> Result<Option<ScriptCommand>, ScriptError> {
        let content = raw.split('#').next().unwrap_or_default().trim();
        let mut tokens = content.split_whitespace();
        let Some(name) = tokens.next() else {
            return Ok(None);
        };
        let args = tokens.collect::<Vec<_>>();
        let Some(spec) = self.lookup(name) else {
            return Err(ScriptError::UnknownCommand {
                line,
                name: name.to_string(),
            });
        };
        (spec.parse)(&args)
            .map(Some)
            .map_err(|error| ScriptError::Parse {
                line,
                reason: error.reason,
                usage: error.usage,
            })
    }
}

/// Line-oriented command script feeding the headless loop one snapshot per
/// tick.
pub(crate) struct ScriptInput<R> {
    reader: R,
    registry: ScriptCommandRegistry,
    line: usize,
    idle_ticks: u32,
    exhausted: bool,
}

impl<R: BufRead> ScriptInput<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self {
            reader,
            registry: ScriptCommandRegistry::with_builtins(),
            line: 0,
            idle_ticks: 0,
            exhausted: false,
        }
    }

    fn read_next_command(&mut self) -> Result<Option<ScriptCommand>, ScriptError> {
        let mut raw = String::new();
        loop {
            raw.clear();
            let read = self.reader.read_line(&mut raw).map_err(ScriptError::Io)?;
            if read == 0 {
                return Ok(None);
            }
            self.line = self.line.saturating_add(1);
            match self.registry.parse_line(&raw, self.line)? {
                Some(ScriptCommand::Help) => self.log_help(),
                Some(command) => {
                    debug!(line = self.line, command = ?command, "script_command");
                    return Ok(Some(command));
                }
                None => {}
            }
        }
    }
}

impl<R> ScriptInput<R> {
    fn log_help(&self) {
        for (name, help, arg_schema) in self.registry.iter_specs_in_order() {
            info!(command = name, args = arg_schema, help, "script_help");
        }
    }
}

impl<R: BufRead> InputSource for ScriptInput<R> {
    fn next_snapshot(&mut self) -> Result<Option<InputSnapshot>, InputSourceError> {
        loop {
            if self.idle_ticks > 0 {
                self.idle_ticks -= 1;
                return Ok(Some(InputSnapshot::empty()));
            }
            if self.exhausted {
                return Ok(None);
            }
            match self.read_next_command()? {
                Some(ScriptCommand::Wait(ticks)) => self.idle_ticks = ticks,
                Some(command) => {
                    if let Some(snapshot) = command.snapshot() {
                        return Ok(Some(snapshot));
                    }
                }
                None => {
                    self.exhausted = true;
                    info!(lines = self.line, "script_finished");
                }
            }
        }
    }
}

fn parse_click_command(args: &[&str]) -> Result<ScriptCommand, CommandParseError> {
    parse_tile_args(args, "click <x> <y>").map(ScriptCommand::Click)
}

fn parse_drag_command(args: &[&str]) -> Result<ScriptCommand, CommandParseError> {
    parse_tile_args(args, "drag <x> <y>").map(ScriptCommand::Drag)
}

fn parse_press_command(args: &[&str]) -> Result<ScriptCommand, CommandParseError> {
    const USAGE: &str = "press <move|axe|water|pickaxe|accept|cancel|cancel_drag>";
    let [button] = args else {
        return Err(CommandParseError::new(
            "expected exactly one argument <button>",
            USAGE,
        ));
    };
    ButtonCallback::from_token(button)
        .map(ScriptCommand::Press)
        .ok_or_else(|| CommandParseError::new(format!("unknown button '{button}'"), USAGE))
}

fn parse_wait_command(args: &[&str]) -> Result<ScriptCommand, CommandParseError> {
    const USAGE: &str = "wait <ticks>";
    let [ticks] = args else {
        return Err(CommandParseError::new(
            "expected exactly one argument <ticks>",
            USAGE,
        ));
    };
    ticks
        .parse::<u32>()
        .map(ScriptCommand::Wait)
        .map_err(|_| CommandParseError::new(format!("invalid tick count '{ticks}'"), USAGE))
}

fn parse_reset_command(args: &[&str]) -> Result<ScriptCommand, CommandParseError> {
    require_no_args(args, "reset")?;
    Ok(ScriptCommand::Reset)
}

fn parse_resize_command(args: &[&str]) -> Result<ScriptCommand, CommandParseError> {
    require_no_args(args, "resize")?;
    Ok(ScriptCommand::Resize)
}

fn parse_dump_command(args: &[&str]) -> Result<ScriptCommand, CommandParseError> {
    require_no_args(args, "dump")?;
    Ok(ScriptCommand::Dump)
}

fn parse_help_command(args: &[&str]) -> Result<ScriptCommand, CommandParseError> {
    require_no_args(args, "help")?;
    Ok(ScriptCommand::Help)
}

fn parse_quit_command(args: &[&str]) -> Result<ScriptCommand, CommandParseError> {
    require_no_args(args, "quit")?;
    Ok(ScriptCommand::Quit)
}

fn parse_tile_args(args: &[&str], usage: &str) -> Result<TilePos, CommandParseError> {
    let [x, y] = args else {
        return Err(CommandParseError::new(
            "expected exactly two arguments <x> <y>",
            usage,
        ));
    };
    let parse_axis = |axis: &str, raw: &str| {
        raw.parse::<i32>()
            .map_err(|_| CommandParseError::new(format!("invalid {axis} coordinate '{raw}'"), usage))
    };
    Ok(TilePos::new(parse_axis("x", *x)?, parse_axis("y", *y)?))
}

fn require_no_args(args: &[&str], command_name: &str) -> Result<(), CommandParseError> {
    if args.is_empty() {
        return Ok(());
    }
    Err(CommandParseError::new(
        "this command takes no arguments",
        command_name,
    ))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn drain<R: BufRead>(input: &mut ScriptInput<R>) -> Vec<InputSnapshot> {
        let mut snapshots = Vec::new();
        while let Some(snapshot) = input.next_snapshot().expect("snapshot") {
            snapshots.push(snapshot);
        }
        snapshots
    }

    #[test]
    fn parses_every_builtin_command() {
        let registry = ScriptCommandRegistry::with_builtins();
        let cases = [
            ("click 5 9", ScriptCommand::Click(TilePos::new(5, 9))),
            ("drag -1 6", ScriptCommand::Drag(TilePos::new(-1, 6))),
            ("press axe", ScriptCommand::Press(ButtonCallback::from_id(2).expect("axe"))),
            ("PRESS Accept", ScriptCommand::Press(ButtonCallback::from_id(10).expect("accept"))),
            ("wait 30", ScriptCommand::Wait(30)),
            ("reset", ScriptCommand::Reset),
            ("resize", ScriptCommand::Resize),
            ("dump", ScriptCommand::Dump),
            ("help", ScriptCommand::Help),
            ("quit  # stop here", ScriptCommand::Quit),
        ];
        for (line, expected) in cases {
            assert_eq!(
                registry.parse_line(line, 1).expect(line),
                Some(expected),
                "{line}"
            );
        }
    }

    #[test]
    fn blank_and_comment_lines_are_skipped() {
        let registry = ScriptCommandRegistry::with_builtins();
        assert_eq!(registry.parse_line("", 1).expect("blank"), None);
        assert_eq!(registry.parse_line("   \n", 2).expect("spaces"), None);
        assert_eq!(registry.parse_line("# chop the oak", 3).expect("comment"), None);
    }

    #[test]
    fn errors_carry_line_number_and_usage() {
        let registry = ScriptCommandRegistry::with_builtins();

        let error = registry.parse_line("click 5", 4).expect_err("missing y");
        assert_eq!(
            error.to_string(),
            "line 4: expected exactly two arguments <x> <y> (usage: click <x> <y>)"
        );

        let error = registry.parse_line("press plant", 7).expect_err("bad button");
        assert!(matches!(error, ScriptError::Parse { line: 7, .. }));

        let error = registry.parse_line("wait soon", 8).expect_err("bad ticks");
        assert!(error.to_string().contains("invalid tick count 'soon'"));

        let error = registry.parse_line("reset now", 9).expect_err("extra arg");
        assert!(error.to_string().contains("takes no arguments"));

        let error = registry.parse_line("jump 1 2", 12).expect_err("unknown");
        assert!(matches!(
            error,
            ScriptError::UnknownCommand { line: 12, ref name } if name == "jump"
        ));
    }

    #[test]
    fn registry_lists_commands_in_registration_order() {
        let registry = ScriptCommandRegistry::with_builtins();
        let names = registry
            .iter_specs_in_order()
            .map(|(name, _, _)| name)
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            vec!["click", "drag", "press", "wait", "reset", "resize", "dump", "help", "quit"]
        );
    }

    #[test]
    fn script_input_expands_waits_into_idle_ticks() {
        let script = "# demo\nclick 5 9\nwait 3\n\npress axe\ndump\n";
        let mut input = ScriptInput::new(Cursor::new(script));
        let snapshots = drain(&mut input);

        assert_eq!(snapshots.len(), 6);
        assert_eq!(snapshots[0].pointer_down_tile(), Some(TilePos::new(5, 9)));
        assert!(snapshots[1..4].iter().all(InputSnapshot::is_idle));
        assert_eq!(snapshots[4].button_pressed(), Some(2));
        assert!(snapshots[5].dump_requested());
        assert!(input.next_snapshot().expect("exhausted").is_none());
    }

    #[test]
    fn long_waits_count_down_one_idle_tick_per_call() {
        let mut input = ScriptInput::new(Cursor::new("wait 4294967295\nquit\n"));
        for _ in 0..1_000 {
            let snapshot = input.next_snapshot().expect("idle").expect("snapshot");
            assert!(snapshot.is_idle());
        }
        assert_eq!(input.idle_ticks, u32::MAX - 1_000);
        assert_eq!(input.line, 1);
        assert_eq!(
            ScriptCommand::Wait(u32::MAX).snapshot(),
            None,
            "wait has no tick of its own"
        );
    }

    #[test]
    fn zero_wait_yields_straight_to_the_next_command() {
        let mut input = ScriptInput::new(Cursor::new("wait 0\ndump\n"));
        let snapshot = input.next_snapshot().expect("dump").expect("snapshot");
        assert!(snapshot.dump_requested());
    }

    #[test]
    fn help_lines_produce_no_snapshots() {
        let mut input = ScriptInput::new(Cursor::new("help\nwait 1\n"));
        let snapshots = drain(&mut input);
        assert_eq!(snapshots.len(), 1);
        assert!(snapshots[0].is_idle());
    }

    #[test]
    fn script_input_surfaces_parse_errors() {
        let mut input = ScriptInput::new(Cursor::new("click 1 1\nclick x 1\n"));
        assert!(input.next_snapshot().expect("first").is_some());
        let error = input.next_snapshot().expect_err("second line fails");
        assert!(error.to_string().starts_with("line 2:"), "{error}");
    }

    #[test]
    fn quit_command_produces_quit_snapshot() {
        let mut input = ScriptInput::new(Cursor::new("quit\nclick 1 1\n"));
        let first = input.next_snapshot().expect("quit").expect("snapshot");
        assert!(first.quit_requested());
    }
}
