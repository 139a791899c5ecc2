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
use crate::buffer::BufferError;
use crate::connection::{Mode, State};
use crate::event::EventKind;
use std::{error, fmt, io};

#[derive(Debug)]
pub enum Error {
    /// peer closed the connection, or a read returned end-of-stream
    ConnectionClosed,
    /// the configured read timeout ran out
    ConnectionTimeout,
    /// ill-formed or unrecognised line, inbound or outbound
    MalformedLine(String),
    /// a subscriber callback failed during publish
    SubscriberFailure { event: EventKind, reason: String },
    /// server sent `ERROR :<text>`
    ServerError(String),
    BufferOverflow,
    Io(io::Error),
    InvalidConfig(String),
    /// operation needs the other reader mode
    WrongMode(Mode),
    /// operation not allowed in the current lifecycle state
    InvalidState(State),
    RunnerFailed(String),
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::ConnectionClosed => write!(f, "Connection closed by peer"),
            Error::ConnectionTimeout => write!(f, "Timed out waiting for data from server"),
            Error::MalformedLine(line) => write!(f, "Malformed line: {}", line),
            Error::SubscriberFailure { event, reason } => {
                write!(f, "Subscriber for {} event failed: {}", event, reason)
            }
            Error::ServerError(text) => write!(f, "Server error: {}", text),
            Error::BufferOverflow => write!(f, "{}", BufferError::Overflow),
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::InvalidConfig(reason) => write!(f, "Invalid configuration: {}", reason),
            Error::WrongMode(mode) => write!(f, "Not allowed while in {} mode", mode),
            Error::InvalidState(state) => write!(f, "Not allowed while {}", state),
            Error::RunnerFailed(reason) => write!(f, "Background reader failed: {}", reason),
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::UnexpectedEof => Error::ConnectionClosed,
            io::ErrorKind::TimedOut => Error::ConnectionTimeout,
            _ => Error::Io(e),
        }
    }
}

impl From<BufferError> for Error {
    fn from(_e: BufferError) -> Self {
        Error::BufferOverflow
    }
}
