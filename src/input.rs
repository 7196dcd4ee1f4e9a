//! Operator input
//!
//! Keys, pointer events and scripted lines all become `InputCommand`s, which
//! are routed either to the race lifecycle or to drag handling.

use glam::Vec2;

use crate::error::ScriptError;
use crate::race::{DragCommand, RaceCommand};

#[derive(Debug, Clone, PartialEq)]
pub enum InputCommand {
    StartRace,
    StopRace,
    Restart,
    IncreaseTimeScale,
    DecreaseTimeScale,
    BeginDrag { target: String },
    EndDrag { target: String },
    PointerMoved(Vec2),
}

/// Where a command ends up
#[derive(Debug, Clone, PartialEq)]
pub enum Routed {
    Race(RaceCommand),
    Drag(DragCommand),
}

impl InputCommand {
    /// Key binding for a keyboard key name
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            " " | "Enter" => Some(InputCommand::StartRace),
            "Escape" => Some(InputCommand::StopRace),
            "r" | "R" => Some(InputCommand::Restart),
            "+" | "=" => Some(InputCommand::IncreaseTimeScale),
            "-" | "_" => Some(InputCommand::DecreaseTimeScale),
            _ => None,
        }
    }

    pub fn route(self) -> Routed {
        match self {
            InputCommand::StartRace => Routed::Race(RaceCommand::StartRace),
            InputCommand::StopRace => Routed::Race(RaceCommand::StopRace),
            InputCommand::Restart => Routed::Race(RaceCommand::Restart),
            InputCommand::IncreaseTimeScale => Routed::Race(RaceCommand::IncreaseTimeScale),
            InputCommand::DecreaseTimeScale => Routed::Race(RaceCommand::DecreaseTimeScale),
            InputCommand::BeginDrag { target } => Routed::Drag(DragCommand::Begin { target }),
            InputCommand::EndDrag { target } => Routed::Drag(DragCommand::End { target }),
            InputCommand::PointerMoved(pos) => Routed::Drag(DragCommand::PointerMoved(pos)),
        }
    }
}

/// A command due at a point in real time
#[derive(Debug, Clone, PartialEq)]
pub struct TimedInput {
    pub at: f32,
    pub command: InputCommand,
}

/// Parse an input script.
///
/// One command per line as `<seconds> <command> [args]`. Blank lines and
/// lines starting with `#` are skipped. The result is sorted by time.
pub fn parse_script(text: &str) -> Result<Vec<TimedInput>, ScriptError> {
    let mut inputs = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut words = trimmed.split_whitespace();
        let time = words.next().unwrap_or_default();
        let at: f32 = time.parse().map_err(|_| ScriptError::BadTime {
            line,
            value: time.to_string(),
        })?;
        let name = words.next().unwrap_or_default();
        let args: Vec<&str> = words.collect();
        let unknown = || ScriptError::UnknownCommand {
            line,
            command: trimmed.to_string(),
        };

        let command = match (name, args.as_slice()) {
            ("start", []) => InputCommand::StartRace,
            ("stop", []) => InputCommand::StopRace,
            ("restart", []) => InputCommand::Restart,
            ("faster", []) => InputCommand::IncreaseTimeScale,
            ("slower", []) => InputCommand::DecreaseTimeScale,
            ("grab", [target]) => InputCommand::BeginDrag {
                target: target.to_string(),
            },
            ("drop", [target]) => InputCommand::EndDrag {
                target: target.to_string(),
            },
            ("pointer", [x, y]) => {
                let x: f32 = x.parse().map_err(|_| unknown())?;
                let y: f32 = y.parse().map_err(|_| unknown())?;
                InputCommand::PointerMoved(Vec2::new(x, y))
            }
            _ => return Err(unknown()),
        };
        inputs.push(TimedInput { at, command });
    }
    inputs.sort_by(|a, b| a.at.total_cmp(&b.at));
    Ok(inputs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_bindings() {
        assert_eq!(InputCommand::from_key(" "), Some(InputCommand::StartRace));
        assert_eq!(InputCommand::from_key("Escape"), Some(InputCommand::StopRace));
        assert_eq!(InputCommand::from_key("="), Some(InputCommand::IncreaseTimeScale));
        assert_eq!(InputCommand::from_key("q"), None);
    }

    #[test]
    fn test_routing() {
        assert_eq!(
            InputCommand::Restart.route(),
            Routed::Race(RaceCommand::Restart)
        );
        assert_eq!(
            InputCommand::BeginDrag {
                target: "Goal".to_string()
            }
            .route(),
            Routed::Drag(DragCommand::Begin {
                target: "Goal".to_string()
            })
        );
    }

    #[test]
    fn test_parse_script() {
        let script = "
            # warm up
            5.0 faster
            0 start
            1.5 pointer 2 -1.25
            0.5 grab Goal
        ";
        let inputs = parse_script(script).expect("parse");
        let times: Vec<f32> = inputs.iter().map(|i| i.at).collect();
        assert_eq!(times, vec![0.0, 0.5, 1.5, 5.0]);
        assert_eq!(inputs[2].command, InputCommand::PointerMoved(Vec2::new(2.0, -1.25)));
    }

    #[test]
    fn test_parse_script_errors() {
        assert_eq!(
            parse_script("soon start"),
            Err(ScriptError::BadTime {
                line: 1,
                value: "soon".to_string()
            })
        );
        assert!(matches!(
            parse_script("1 start\n2 jump"),
            Err(ScriptError::UnknownCommand { line: 2, .. })
        ));
        assert!(parse_script("1 grab").is_err());
    }
}
