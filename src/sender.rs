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
//! Outbound side of the connection: one protocol line per call.
use crate::error::Error;
use crate::irc::rfc_defs as rfc;
use log::debug;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

/// Writes protocol lines to the write half of a socket.
///
/// Clones share the same writer; a single line is always written whole,
/// but nothing stops lines sent from two tasks from interleaving with each
/// other, so callers wanting a multi-line sequence kept together must
/// serialize it themselves.
pub struct CommandSender<W> {
    writer: Arc<Mutex<W>>,
}

impl<W> Clone for CommandSender<W> {
    fn clone(&self) -> Self {
        CommandSender {
            writer: Arc::clone(&self.writer),
        }
    }
}

// USER's realname is the last parameter, and needs the trailing
// colon form as soon as it has a space in it
fn trailing_param(param: &str) -> String {
    if param.contains(' ') || param.starts_with(':') || param.is_empty() {
        format!(":{}", param)
    } else {
        param.to_string()
    }
}

impl<W: AsyncWrite + Unpin> CommandSender<W> {
    pub fn new(writer: W) -> CommandSender<W> {
        CommandSender {
            writer: Arc::new(Mutex::new(writer)),
        }
    }

    /// Appends CR-LF to `line` and writes it out in one go.
    pub async fn send(&self, line: &str) -> Result<(), Error> {
        if !rfc::valid_line(line) {
            return Err(Error::MalformedLine(line.escape_debug().to_string()));
        }
        debug!("> {}", line);
        let mut out = String::with_capacity(line.len() + rfc::TERMINATOR.len());
        out.push_str(line);
        out.push_str(rfc::TERMINATOR);

        let mut writer = self.writer.lock().await;
        writer.write_all(out.as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }

    /// PASS (only with a password), then NICK, then USER.
    pub async fn login(&self, nick: &str, name: &str, password: Option<&str>) -> Result<(), Error> {
        if let Some(pass) = password {
            self.send(&format!("PASS {}", pass)).await?;
        }
        self.send(&format!("NICK {}", nick)).await?;
        self.send(&format!("USER {} - - {}", nick, trailing_param(name))).await
    }

    pub async fn join(&self, channel: &str) -> Result<(), Error> {
        self.send(&format!("JOIN {}", channel)).await
    }

    pub async fn part(&self, channel: &str, reason: Option<&str>) -> Result<(), Error> {
        match reason {
            Some(reason) => self.send(&format!("PART {} :{}", channel, reason)).await,
            None => self.send(&format!("PART {}", channel)).await,
        }
    }

    pub async fn privmsg(&self, target: &str, text: &str) -> Result<(), Error> {
        self.send(&format!("PRIVMSG {} :{}", target, text)).await
    }

    pub async fn mode(&self, target: &str, flags: &str) -> Result<(), Error> {
        self.send(&format!("MODE {} {}", target, flags)).await
    }

    pub async fn quit(&self, reason: Option<&str>) -> Result<(), Error> {
        match reason {
            Some(reason) => self.send(&format!("QUIT :{}", reason)).await,
            None => self.send("QUIT").await,
        }
    }

    pub async fn pong(&self, token: &str) -> Result<(), Error> {
        self.send(&format!("PONG :{}", token)).await
    }

    /// Shuts down the write direction; the peer sees end-of-stream.
    pub async fn close(&self) -> Result<(), Error> {
        let mut writer = self.writer.lock().await;
        writer.shutdown().await?;
        Ok(())
    }
}
