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
use crate::connection::Mode;
use crate::error::Error;
use crate::framer::DEFAULT_READ_SIZE;
use crate::irc::rfc_defs as rfc;
use std::time::Duration;

const MIN_READ_SIZE: usize = rfc::MAX_MSG_SIZE;
const MAX_READ_SIZE: usize = 65536;

/// Per-connection settings.
#[derive(Debug, Clone)]
pub struct Config {
    pub nick: String,
    /// full name sent with USER
    pub name: String,
    pub mode: Mode,
    /// `None` blocks on reads for as long as it takes
    pub read_timeout: Option<Duration>,
    pub read_size: usize,
}

impl Config {
    pub fn new(nick: &str, name: &str) -> Config {
        Config {
            nick: nick.to_string(),
            name: name.to_string(),
            mode: Mode::Manual,
            read_timeout: None,
            read_size: DEFAULT_READ_SIZE,
        }
    }

    pub fn background(mut self) -> Self {
        self.mode = Mode::Background;
        self
    }

    pub fn manual(mut self) -> Self {
        self.mode = Mode::Manual;
        self
    }

    pub fn read_timeout(mut self, limit: Duration) -> Self {
        self.read_timeout = Some(limit);
        self
    }

    pub fn read_size(mut self, read_size: usize) -> Self {
        self.read_size = read_size;
        self
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !rfc::valid_nick(&self.nick) {
            return Err(Error::InvalidConfig(format!("invalid nick: {:?}", self.nick)));
        }
        if self.name.is_empty() || !rfc::valid_line(&self.name) {
            return Err(Error::InvalidConfig(format!("invalid name: {:?}", self.name)));
        }
        if self.read_size < MIN_READ_SIZE || self.read_size > MAX_READ_SIZE {
            return Err(Error::InvalidConfig(format!(
                "read size {} not within {}..={}",
                self.read_size, MIN_READ_SIZE, MAX_READ_SIZE
            )));
        }
        if self.read_timeout == Some(Duration::ZERO) {
            return Err(Error::InvalidConfig("read timeout must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// Splits `host[:port]`, falling back to the default IRC port.
pub fn parse_server_addr(addr: &str) -> Result<(String, u16), Error> {
    match addr.rsplit_once(':') {
        // a bare ipv6 address has colons of its own, leave it alone
        Some((host, port)) if !host.contains(':') => {
            let port = port
                .parse::<u16>()
                .map_err(|_| Error::InvalidConfig(format!("invalid port: {:?}", port)))?;
            if host.is_empty() {
                return Err(Error::InvalidConfig("missing host".to_string()));
            }
            Ok((host.to_string(), port))
        }
        _ if addr.is_empty() => Err(Error::InvalidConfig("missing host".to_string())),
        _ => Ok((addr.to_string(), rfc::DEFAULT_PORT)),
    }
}
