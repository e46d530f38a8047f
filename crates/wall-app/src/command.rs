// ABOUTME: Line command parser for driving the wall from a terminal.
// ABOUTME: Players are addressed by their position in layout order, starting at 0.

use anyhow::{anyhow, bail, Context, Result};
use wall_core::EndMode;
use wall_layout::Orientation;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Show,
    Help,
    Quit,

    // Layout
    Split(usize, Orientation),
    Merge(usize),
    Swap(usize, usize),
    /// Resize the split that contains this player
    Resize(usize, f32),
    New,
    /// Two players side by side
    Preset,
    Last,
    Open(String),
    Save(String),
    Layouts,
    Movies,

    // Per player
    Primary(usize),
    Source(usize, String),
    Volume(usize, f32),
    Speed(usize, f32),
    Mode(usize, EndMode),
    Jog(usize, i64),
    Ended(usize),

    // Whole wall
    Play,
    Pause,
    Mute,
    Unmute,

    // Primary player
    Act,
    Skip(isize),
    JogPrimary(bool),
    Louder,
    Quieter,
    History(bool),
}

pub const HELP: &str = "\
layout:   split <n> h|v | merge <n> | swap <a> <b> | resize <n> <ratio>
          new | default | last | open <name> | save <name> | layouts | movies
player:   primary <n> | source <n> <label> | volume <n> <0-1> | speed <n> <0-2>
          mode <n> loop|next|random | jog <n> <ms> | ended <n>
wall:     play | pause | mute | unmute
primary:  act | next | prev | fwd | back | louder | quieter | older | newer
other:    show | help | quit";

impl Command {
    pub fn parse(line: &str) -> Result<Command> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            bail!("empty command");
        };
        let rest: Vec<&str> = words.collect();

        let command = match (verb.to_ascii_lowercase().as_str(), rest.as_slice()) {
            ("show" | "ls", []) => Command::Show,
            ("help" | "?", []) => Command::Help,
            ("quit" | "exit" | "q", []) => Command::Quit,

            ("split", [n, dir]) => Command::Split(index(n)?, orientation(dir)?),
            ("merge" | "close", [n]) => Command::Merge(index(n)?),
            ("swap", [a, b]) => Command::Swap(index(a)?, index(b)?),
            ("resize", [n, ratio]) => Command::Resize(index(n)?, number(ratio)?),
            ("new", []) => Command::New,
            ("default", []) => Command::Preset,
            ("last", []) => Command::Last,
            ("open", [name]) => Command::Open(name.to_string()),
            ("save", [name]) => Command::Save(name.to_string()),
            ("layouts", []) => Command::Layouts,
            ("movies", []) => Command::Movies,

            ("primary", [n]) => Command::Primary(index(n)?),
            ("source", [n, label @ ..]) if !label.is_empty() => {
                Command::Source(index(n)?, label.join(" "))
            }
            ("volume", [n, v]) => Command::Volume(index(n)?, number(v)?),
            ("speed", [n, s]) => Command::Speed(index(n)?, number(s)?),
            ("mode", [n, m]) => Command::Mode(
                index(n)?,
                EndMode::from_label(m).ok_or_else(|| anyhow!("unknown mode {:?}", m))?,
            ),
            ("jog", [n, ms]) => Command::Jog(
                index(n)?,
                ms.parse().with_context(|| format!("bad offset {:?}", ms))?,
            ),
            ("ended", [n]) => Command::Ended(index(n)?),

            ("play", []) => Command::Play,
            ("pause", []) => Command::Pause,
            ("mute", []) => Command::Mute,
            ("unmute", []) => Command::Unmute,

            ("act", []) => Command::Act,
            ("next", []) => Command::Skip(1),
            ("prev", []) => Command::Skip(-1),
            ("fwd", []) => Command::JogPrimary(true),
            ("back", []) => Command::JogPrimary(false),
            ("louder", []) => Command::Louder,
            ("quieter", []) => Command::Quieter,
            ("older", []) => Command::History(false),
            ("newer", []) => Command::History(true),

            (verb, _) => bail!("unknown or malformed command {:?} (try `help`)", verb),
        };
        Ok(command)
    }
}

fn index(word: &str) -> Result<usize> {
    word.parse()
        .with_context(|| format!("bad player number {:?}", word))
}

fn number(word: &str) -> Result<f32> {
    word.parse()
        .with_context(|| format!("bad number {:?}", word))
}

fn orientation(word: &str) -> Result<Orientation> {
    match word.to_ascii_lowercase().as_str() {
        "h" | "horizontal" | "|" => Ok(Orientation::Horizontal),
        "v" | "vertical" | "-" => Ok(Orientation::Vertical),
        _ => bail!("orientation must be h or v, got {:?}", word),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_layout_commands() {
        assert_eq!(
            Command::parse("split 2 h").unwrap(),
            Command::Split(2, Orientation::Horizontal)
        );
        assert_eq!(
            Command::parse("  SPLIT 0 vertical ").unwrap(),
            Command::Split(0, Orientation::Vertical)
        );
        assert_eq!(Command::parse("swap 1 3").unwrap(), Command::Swap(1, 3));
        assert_eq!(Command::parse("resize 0 0.3").unwrap(), Command::Resize(0, 0.3));
        assert_eq!(Command::parse("default").unwrap(), Command::Preset);
    }

    #[test]
    fn source_label_may_contain_spaces() {
        assert_eq!(
            Command::parse("source 1 action/The Thing").unwrap(),
            Command::Source(1, "action/The Thing".to_string())
        );
        assert!(Command::parse("source 1").is_err());
    }

    #[test]
    fn parses_player_and_primary_commands() {
        assert_eq!(
            Command::parse("mode 0 random").unwrap(),
            Command::Mode(0, EndMode::Random)
        );
        assert_eq!(Command::parse("jog 0 -5000").unwrap(), Command::Jog(0, -5000));
        assert_eq!(Command::parse("prev").unwrap(), Command::Skip(-1));
        assert_eq!(Command::parse("older").unwrap(), Command::History(false));
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(Command::parse("").is_err());
        assert!(Command::parse("split 1").is_err());
        assert!(Command::parse("split x h").is_err());
        assert!(Command::parse("split 1 diagonal").is_err());
        assert!(Command::parse("mode 1 shuffle").is_err());
        assert!(Command::parse("play now").is_err());
        assert!(Command::parse("dance").is_err());
    }
}
