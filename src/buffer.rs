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
// this module contains the receive buffer that sits between socket
// reads and the line framer: raw bytes go in, terminated lines come out,
// and whatever trails the last terminator stays put for the next read
use crate::irc::rfc_defs as rfc;
use std::error::Error;
use std::fmt;

// a server that keeps sending without ever terminating a line
// shouldn't be able to grow our memory without bound
pub const MAX_RESIDUE: usize = 16 * rfc::MAX_MSG_SIZE;

#[derive(Debug)]
pub enum BufferError {
    Overflow,
}

impl fmt::Display for BufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Buffer overflow in receive buffer, no line terminator within {} bytes", MAX_RESIDUE)
    }
}

impl Error for BufferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}

#[derive(Debug, Default)]
pub struct MessageBuffer {
    // bytes rather than a String, a multi-byte char may be split
    // across two reads and only becomes valid once both halves are in
    buffer: Vec<u8>,
}

impl MessageBuffer {
    pub fn new() -> MessageBuffer {
        MessageBuffer { buffer: Vec::new() }
    }

    fn get_eol(&self) -> Option<usize> {
        self.buffer.iter().position(|&b| b == b'\n')
    }

    pub fn has_delim(&self) -> bool {
        self.get_eol().is_some()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    // take everything up to the first LF, throw away the LF itself and
    // hand back the line with surrounding whitespace (incl. any CR) trimmed,
    // the rest of the buffer shifts down to the front
    // None if there's no complete line in here yet
    pub fn extract_ln(&mut self) -> Option<String> {
        let i = self.get_eol()?;
        let out = String::from_utf8_lossy(&self.buffer[..i]).trim().to_string();
        self.buffer.drain(..=i);
        Some(out)
    }

    // new socket data goes on the end; fails if the buffer would hold
    // more than MAX_RESIDUE bytes without a single complete line in it,
    // in which case the runaway line is thrown away along with `buf`
    pub fn append_bytes(&mut self, buf: &[u8]) -> Result<(), BufferError> {
        let terminated = self.has_delim() || buf.contains(&b'\n');
        if !terminated && self.buffer.len() + buf.len() > MAX_RESIDUE {
            self.buffer.clear();
            return Err(BufferError::Overflow);
        }
        self.buffer.extend_from_slice(buf);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_ln_test() {
        let mut buf = MessageBuffer::new();
        buf.append_bytes(b"foobar\r\nasdf\nOMGERD").unwrap();
        assert_eq!(buf.extract_ln().as_deref(), Some("foobar"));
        assert_eq!(buf.extract_ln().as_deref(), Some("asdf"));
        assert_eq!(buf.extract_ln(), None, "partial line stays behind");
        assert_eq!(buf.len(), 6);
        buf.append_bytes(b"\r\n").unwrap();
        assert_eq!(buf.extract_ln().as_deref(), Some("OMGERD"));
        assert!(buf.is_empty());
    }

    #[test]
    fn blank_line_extracts_as_empty() {
        let mut buf = MessageBuffer::new();
        buf.append_bytes(b"   \r\nNEXT\n").unwrap();
        assert_eq!(buf.extract_ln().as_deref(), Some(""));
        assert_eq!(buf.extract_ln().as_deref(), Some("NEXT"));
    }

    #[test]
    fn split_utf8_survives() {
        // "é" is 0xC3 0xA9, split it across two appends
        let mut buf = MessageBuffer::new();
        buf.append_bytes(b"caf\xC3").unwrap();
        assert!(!buf.has_delim());
        buf.append_bytes(b"\xA9\n").unwrap();
        assert_eq!(buf.extract_ln().as_deref(), Some("café"));
    }

    #[test]
    fn overflow_test() {
        let mut buf = MessageBuffer::new();
        let mut pass = false;
        for _ in 0..100 {
            if buf.append_bytes(&[b'x'; 256]).is_err() {
                pass = true;
                break;
            }
        }
        assert!(pass, "unterminated data past MAX_RESIDUE should overflow");
        assert!(buf.is_empty(), "runaway line is dropped on overflow");

        // more of the same keeps failing but never grows the buffer
        for _ in 0..100 {
            let _ = buf.append_bytes(&[b'x'; 256]);
            assert!(buf.len() <= MAX_RESIDUE);
        }
    }

    #[test]
    fn resyncs_after_overflow() {
        let mut buf = MessageBuffer::new();
        buf.append_bytes(&[b'x'; MAX_RESIDUE]).unwrap();
        assert!(buf.append_bytes(b"xx").is_err());
        buf.append_bytes(b"tail\r\nPING :ok\r\n").unwrap();
        assert_eq!(buf.extract_ln().as_deref(), Some("tail"));
        assert_eq!(buf.extract_ln().as_deref(), Some("PING :ok"));
    }

    #[test]
    fn no_overflow_with_complete_lines() {
        let mut buf = MessageBuffer::new();
        let mut chunk = vec![b'x'; MAX_RESIDUE];
        chunk.push(b'\n');
        assert!(buf.append_bytes(&chunk).is_ok());
        assert!(buf.has_delim());
    }
}
