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
//! Routes classified lines to the event bus.
use crate::error::Error;
use crate::event::{Event, EventBus};
use crate::irc::message::{parse_message, ParsedMessage};
use crate::sender::CommandSender;
use log::{debug, warn};
use std::sync::Arc;
use tokio::io::AsyncWrite;

pub struct Dispatcher<W> {
    sender: CommandSender<W>,
    events: Arc<EventBus>,
}

impl<W: AsyncWrite + Unpin> Dispatcher<W> {
    pub fn new(sender: CommandSender<W>, events: Arc<EventBus>) -> Dispatcher<W> {
        Dispatcher { sender, events }
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Classifies `line` and publishes the matching event.
    ///
    /// A PING is answered, and the PONG fully written, before anything is
    /// published. Unrecognised lines are logged and give `Ok(None)`. The only
    /// error is a failed PONG write, which means the connection is gone.
    pub async fn route(&self, line: &str) -> Result<Option<ParsedMessage>, Error> {
        let msg = match parse_message(line) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Unknown message -- {}", e);
                return Ok(None);
            }
        };

        match &msg {
            ParsedMessage::Welcome { text } => {
                self.events.publish(&Event::Welcome(text.clone()));
            }
            ParsedMessage::Ping { token } => {
                self.sender.pong(token).await?;
                self.events.publish(&Event::Ping(token.clone()));
            }
            ParsedMessage::Error { text } => {
                warn!("{}", Error::ServerError(text.clone()));
                self.events.publish(&Event::Error(text.clone()));
            }
            ParsedMessage::Join { channel } => {
                self.events.publish(&Event::Join(channel.clone()));
            }
            ParsedMessage::Part { channel, reason } => {
                self.events.publish(&Event::Part(channel.clone(), reason.clone()));
            }
            ParsedMessage::Generic { origin, code, content } => {
                debug!(": {} {} {}", origin, code, content);
            }
        }
        Ok(Some(msg))
    }
}
