//! Line commands understood by `colloquy chat`.

use colloquy_core::Tone;
use std::path::PathBuf;

#[derive(Debug, PartialEq)]
pub enum ReplInput {
    /// Plain text for the model.
    Message(String),
    Reset,
    History,
    Tone(Tone),
    /// Attach an image to the next message.
    Image(PathBuf),
    Help,
    Exit,
    Empty,
}

pub const HELP: &str = "\
/reset         clear this session
/history       print previous turns
/tone <tone>   default | formal | casual | friendly | technical
/image <path>  attach an image to the next message
/exit          leave";

pub fn parse_line(line: &str) -> Result<ReplInput, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(ReplInput::Empty);
    }
    let Some(command) = line.strip_prefix('/') else {
        return Ok(ReplInput::Message(line.to_string()));
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };
    match (name, arg) {
        ("reset", "") => Ok(ReplInput::Reset),
        ("history", "") => Ok(ReplInput::History),
        ("help", "") => Ok(ReplInput::Help),
        ("exit" | "quit", "") => Ok(ReplInput::Exit),
        ("tone", t) if !t.is_empty() => t.parse().map(ReplInput::Tone).map_err(|e| format!("{e}")),
        ("image", p) if !p.is_empty() => Ok(ReplInput::Image(PathBuf::from(p))),
        ("tone" | "image", _) => Err(format!("/{name} needs an argument")),
        _ => Err(format!("unknown command /{name}; try /help")),
    }
}
