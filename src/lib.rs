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
//! A small socket-level IRC client.
//!
//! Bytes off the socket are framed into lines (`framer`), classified and
//! routed (`dispatch`) to subscribers on an `EventBus` (`event`), while
//! commands go out through a `CommandSender` (`sender`). `Connection`
//! ties these together and either lets its owner pump lines by hand or
//! hands the reading over to a background task.
pub mod buffer;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod framer;
pub mod irc;
pub mod sender;

pub use config::Config;
pub use connection::{Connection, Mode, State};
pub use error::Error;
pub use event::{Callback, Event, EventBus, EventKind, SubscriberError};
