/* rusty-ircc - a minimal IRC client written in Rust
*  Copyright (C) Joanna Janet Zaitseva-Doyle <jjadoyle@gmail.com>

*  This program is free software: you can redistribute it and/or modify
*  it under the terms of the GNU Lesser General Public License as
*  published by the Free Software Foundation, either version 3 of the
*  License, or (at your option) any later version.

*  This program is distributed in the hope that it will be useful,
*  but WITHOUT ANY WARRANTY; without even the implied warranty of
*  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
*  GNU Lesser General Public License for more details.

*  You should have received a copy of the GNU Lesser General Public License
*  along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/
use crate::error::Error;
use crate::irc::rpl_defs as rpl;

/// One classified inbound line. Built by `parse_message` for a single
/// dispatch step and dropped at the end of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedMessage {
    Welcome { text: String },
    Ping { token: String },
    Error { text: String },
    Join { channel: String },
    Part { channel: String, reason: Option<String> },
    Generic { origin: String, code: String, content: String },
}

impl ParsedMessage {
    /// Numeric reply code carried by the line, if it had one.
    pub fn reply_code(&self) -> Option<u16> {
        match self {
            ParsedMessage::Welcome { .. } => Some(rpl::RPL_WELCOME),
            ParsedMessage::Generic { code, .. } if code.len() == 3 => code.parse().ok(),
            _ => None,
        }
    }
}

// never fails: a missing delimiter just means an empty right hand side
fn split_once_infallible(s: &str, delim: char) -> (&str, &str) {
    match s.split_once(delim) {
        Some((l, r)) => (l, r),
        None => (s, ""),
    }
}

// text following the first ':' of `content`, or "" if there's no colon
fn after_colon(content: &str) -> &str {
    split_once_infallible(content, ':').1
}

// for PING/ERROR: text after the first ':', and if the server didn't
// bother with a colon at all, whatever follows the command word
fn command_arg<'a>(line: &'a str, command: &str) -> &'a str {
    match line.split_once(':') {
        Some((_, text)) => text,
        None => line[command.len()..].trim(),
    }
}

// full server message, `:<origin> <code> <content>` with the colon already gone
fn parse_server_message(msg: &str) -> ParsedMessage {
    let mut parts = msg.splitn(3, ' ');
    let origin = parts.next().unwrap_or("").to_string();
    let code = parts.next().unwrap_or("");
    let content = parts.next().unwrap_or("");

    match code {
        rpl::WELCOME_CODE => ParsedMessage::Welcome {
            text: after_colon(content).to_string(),
        },
        "JOIN" => {
            let (channel, _) = split_once_infallible(content, ' ');
            ParsedMessage::Join {
                channel: channel.trim_start_matches(':').to_string(),
            }
        }
        "PART" => {
            let (channel, rest) = split_once_infallible(content, ' ');
            let reason = rest.split_once(':').map(|(_, reason)| reason.to_string());
            ParsedMessage::Part {
                channel: channel.trim_start_matches(':').to_string(),
                reason,
            }
        }
        _ => ParsedMessage::Generic {
            origin,
            code: code.to_string(),
            content: content.to_string(),
        },
    }
}

/// Classifies one trimmed line.
///
/// Lines of a known shape never fail, missing pieces come back as empty
/// strings; only a line of no recognisable shape is `Error::MalformedLine`.
pub fn parse_message(line: &str) -> Result<ParsedMessage, Error> {
    if let Some(msg) = line.strip_prefix(':') {
        Ok(parse_server_message(msg))
    } else if line.starts_with("PING") {
        Ok(ParsedMessage::Ping {
            token: command_arg(line, "PING").to_string(),
        })
    } else if line.starts_with("ERROR") {
        Ok(ParsedMessage::Error {
            text: command_arg(line, "ERROR").to_string(),
        })
    } else {
        Err(Error::MalformedLine(line.to_string()))
    }
}
