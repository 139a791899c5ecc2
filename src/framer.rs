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
//! Line framing on top of the read half of a socket.
use crate::buffer::MessageBuffer;
use crate::error::Error;
use log::debug;
use std::fmt;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};

pub const DEFAULT_READ_SIZE: usize = 4096;

/// Turns raw reads from `R` into protocol lines.
///
/// Whatever follows the last terminator of a read is kept as residue for the
/// next call, so a line split over any number of reads comes out whole.
pub struct LineFramer<R> {
    reader: R,
    input: MessageBuffer,
    // one read's worth of bytes; its length is the read size
    scratch: Vec<u8>,
    read_timeout: Option<Duration>,
}

impl<R> fmt::Debug for LineFramer<R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("LineFramer")
            .field("buffered", &self.input.len())
            .field("read_size", &self.scratch.len())
            .field("read_timeout", &self.read_timeout)
            .finish()
    }
}

impl<R: AsyncRead + Unpin> LineFramer<R> {
    pub fn new(reader: R) -> LineFramer<R> {
        LineFramer {
            reader,
            input: MessageBuffer::new(),
            scratch: vec![0; DEFAULT_READ_SIZE],
            read_timeout: None,
        }
    }

    pub fn with_read_size(mut self, read_size: usize) -> Self {
        self.scratch = vec![0; read_size];
        self
    }

    pub fn with_timeout(mut self, read_timeout: Option<Duration>) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Bytes of residue currently held, i.e. data without a terminator yet.
    pub fn buffered(&self) -> usize {
        self.input.len()
    }

    /// Returns the next line, without its terminator and trimmed.
    ///
    /// A line already in the buffer is returned without touching the socket.
    /// Otherwise exactly one read is made; `Ok(None)` means that read did not
    /// complete a line (or the line was blank) and the caller should ask again.
    /// A zero-byte read is `Error::ConnectionClosed`.
    pub async fn next_line(&mut self) -> Result<Option<String>, Error> {
        // check the buffer before reading, so lines that are already in
        // can never sit behind a read that might block for a long time
        if !self.input.has_delim() {
            debug!(": no lines in buffer; reading data from socket");
            let bytes_read = self.read_some().await?;
            if bytes_read == 0 {
                if !self.input.is_empty() {
                    debug!(": dropping {} bytes of unterminated data at EOF", self.input.len());
                    self.input.clear();
                }
                return Err(Error::ConnectionClosed);
            }
            self.input.append_bytes(&self.scratch[..bytes_read])?;
        }

        match self.input.extract_ln() {
            Some(text) if !text.is_empty() => {
                debug!("< {}", text);
                Ok(Some(text))
            }
            _ => Ok(None),
        }
    }

    async fn read_some(&mut self) -> Result<usize, Error> {
        let read = self.reader.read(&mut self.scratch);
        match self.read_timeout {
            Some(limit) => match tokio::time::timeout(limit, read).await {
                Ok(res) => Ok(res?),
                Err(_elapsed) => Err(Error::ConnectionTimeout),
            },
            None => Ok(read.await?),
        }
    }
}
