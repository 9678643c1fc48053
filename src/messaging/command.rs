// Host commands - text control lines -> typed commands for the scheduling thread

use std::str::FromStr;

use thiserror::Error;

use crate::dispatch::Channel;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Start,
    Stop,
    SetBpm(f64),
    SetSubdivision(u32),
    SetBeatsPerMeasure(u32),
    SetAccent(bool),
    SetVolume { channel: Channel, level: f32 },
    Tap,
    Quit,
}

/// Command plus the host time (ms) at which it was read
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedCommand {
    pub command: Command,
    pub received_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command: {0}")]
    Unknown(String),
    #[error("missing argument for {0}")]
    MissingArgument(&'static str),
    #[error("invalid argument for {command}: {value}")]
    InvalidArgument { command: &'static str, value: String },
}

fn parse_arg<T: FromStr>(command: &'static str, value: Option<&str>) -> Result<T, CommandParseError> {
    let value = value.ok_or(CommandParseError::MissingArgument(command))?;
    value
        .parse()
        .map_err(|_| CommandParseError::InvalidArgument {
            command,
            value: value.to_string(),
        })
}

impl FromStr for Command {
    type Err = CommandParseError;

    /// `start`, `stop`, `bpm N`, `sub N`, `beats N`, `accent on|off`,
    /// `vol accent|normal|sub N`, `tap`, `quit`
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Err(CommandParseError::Empty);
        };

        let command = match head.to_ascii_lowercase().as_str() {
            "start" => Command::Start,
            "stop" => Command::Stop,
            "bpm" => Command::SetBpm(parse_arg("bpm", words.next())?),
            "sub" | "subdivision" => Command::SetSubdivision(parse_arg("sub", words.next())?),
            "beats" => Command::SetBeatsPerMeasure(parse_arg("beats", words.next())?),
            "accent" => {
                let value = words.next().ok_or(CommandParseError::MissingArgument("accent"))?;
                match value.to_ascii_lowercase().as_str() {
                    "on" | "true" | "1" => Command::SetAccent(true),
                    "off" | "false" | "0" => Command::SetAccent(false),
                    _ => {
                        return Err(CommandParseError::InvalidArgument {
                            command: "accent",
                            value: value.to_string(),
                        });
                    }
                }
            }
            "vol" | "volume" => {
                let channel = words.next().ok_or(CommandParseError::MissingArgument("vol"))?;
                let channel = channel
                    .parse::<Channel>()
                    .map_err(|_| CommandParseError::InvalidArgument {
                        command: "vol",
                        value: channel.to_string(),
                    })?;
                Command::SetVolume {
                    channel,
                    level: parse_arg("vol", words.next())?,
                }
            }
            "tap" | "t" => Command::Tap,
            "quit" | "exit" | "q" => Command::Quit,
            other => return Err(CommandParseError::Unknown(other.to_string())),
        };
        Ok(command)
    }
}
