//! Device event replay scripts
//!
//! A plain-text stand-in for the HID transport, one step per line:
//!
//! ```text
//! # hold the ring at +3 for a second, then let go
//! shuttle 3
//! wait 1000
//! shuttle 0
//! down 4
//! up 4
//! jog -1
//! disconnect
//! ```

use std::time::Duration;
use thiserror::Error;

use crate::instance::DeviceEvent;

/// One parsed script line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptStep {
    Event(DeviceEvent),
    Wait(Duration),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct ScriptError {
    pub line: usize,
    pub message: String,
}

/// Parse a whole script, skipping blank lines and `#` comments
pub fn parse_script(source: &str) -> Result<Vec<ScriptStep>, ScriptError> {
    source
        .lines()
        .enumerate()
        .filter_map(|(index, line)| parse_line(index + 1, line).transpose())
        .collect()
}

/// Parse one line; `Ok(None)` for blank lines and comments
pub fn parse_line(line_no: usize, line: &str) -> Result<Option<ScriptStep>, ScriptError> {
    let content = line.split('#').next().unwrap_or("").trim();
    if content.is_empty() {
        return Ok(None);
    }

    parse_step(content).map(Some).map_err(|message| ScriptError {
        line: line_no,
        message,
    })
}

fn parse_step(content: &str) -> Result<ScriptStep, String> {
    let (keyword, rest) = match content.split_once(char::is_whitespace) {
        Some((keyword, rest)) => (keyword, rest.trim()),
        None => (content, ""),
    };

    let step = match keyword.to_lowercase().as_str() {
        "down" => ScriptStep::Event(DeviceEvent::ButtonDown(parse_arg(keyword, rest)?)),
        "up" => ScriptStep::Event(DeviceEvent::ButtonUp(parse_arg(keyword, rest)?)),
        "jog" => {
            let delta: i8 = parse_arg(keyword, rest)?;
            if delta != 1 && delta != -1 {
                return Err(format!("jog delta must be 1 or -1, got {}", delta));
            }
            ScriptStep::Event(DeviceEvent::Jog(delta))
        }
        "shuttle" => ScriptStep::Event(DeviceEvent::Shuttle(parse_arg(keyword, rest)?)),
        "wait" => ScriptStep::Wait(Duration::from_millis(parse_arg(keyword, rest)?)),
        "disconnect" => {
            no_args(keyword, rest)?;
            ScriptStep::Event(DeviceEvent::Disconnected)
        }
        "error" => {
            if rest.is_empty() {
                return Err("error needs a message".to_string());
            }
            ScriptStep::Event(DeviceEvent::Error(rest.to_string()))
        }
        other => return Err(format!("unknown step '{}'", other)),
    };

    Ok(step)
}

fn parse_arg<T>(keyword: &str, rest: &str) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    if rest.is_empty() {
        return Err(format!("{} needs an argument", keyword));
    }
    if rest.split_whitespace().count() > 1 {
        return Err(format!("{} takes a single argument", keyword));
    }
    rest.parse::<T>()
        .map_err(|e| format!("invalid {} argument '{}': {}", keyword, rest, e))
}

fn no_args(keyword: &str, rest: &str) -> Result<(), String> {
    if rest.is_empty() {
        Ok(())
    } else {
        Err(format!("{} takes no arguments", keyword))
    }
}
