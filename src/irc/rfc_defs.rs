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
// rfc_defs
// protocol constants, plus checks to make sure e.g. nicks and
// outbound lines are composed of valid characters

pub const DEFAULT_PORT: u16 = 6667;
pub const MAX_MSG_SIZE: usize = 512; // including CR-LF
pub const TERMINATOR: &str = "\r\n";
pub const MAX_NICK_LEN: usize = 30;

const LETTER: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const SPECIAL: &str = "[]\\`_^{|}";
const DIGIT: &str = "0123456789";

// none of these may appear inside a single protocol line
const NOT_LINE: &str = "\0\r\n";

fn matches_allowed(msg: &str, allowed: &str) -> bool {
    msg.chars().all(|c| allowed.contains(c))
}

fn matches_disallowed(msg: &str, disallowed: &str) -> bool {
    msg.chars().any(|c| disallowed.contains(c))
}

// a line we are about to send must not carry its own terminator,
// otherwise one send() could smuggle a second command onto the wire
pub fn valid_line(line: &str) -> bool {
    !matches_disallowed(line, NOT_LINE)
}

// rfc says nick should be max 9 in length, but pretty much every
// network out there allows far longer nicks, so we go with 30
// aug BNF nickname = ( letter / special ) *( letter / digit / special / "-" )
pub fn valid_nick(nick: &str) -> bool {
    if nick.is_empty() || nick.len() > MAX_NICK_LEN {
        return false;
    }

    let mut allowed = String::new();
    allowed.push_str(LETTER);
    allowed.push_str(SPECIAL);
    // nick has different rules for the first char
    let first = nick.chars().next().map_or(0, char::len_utf8);
    if !matches_allowed(&nick[..first], &allowed) {
        return false;
    }

    allowed.push_str(DIGIT);
    allowed.push('-');
    matches_allowed(&nick[first..], &allowed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_nick() {
        assert!(valid_nick("idlebot"), "plain letters are fine");
        assert!(valid_nick("[jarvis]"), "special chars allowed anywhere");
        assert!(valid_nick("bot-2"), "digits and dash allowed after first char");
        assert!(!valid_nick("2bot"), "nick can't start with a digit");
        assert!(!valid_nick("-bot"), "nick can't start with a dash");
        assert!(!valid_nick(""), "empty nick is invalid");
        assert!(!valid_nick("has space"), "space is invalid");
        assert!(!valid_nick(&"a".repeat(MAX_NICK_LEN + 1)), "too long");
        assert!(!valid_nick("ünï"), "non-ascii first char is invalid");
    }

    #[test]
    fn test_valid_line() {
        assert!(valid_line("PRIVMSG #chan :hello there"));
        assert!(!valid_line("PRIVMSG #chan :hi\r\nQUIT"), "embedded CR-LF");
        assert!(!valid_line("JOIN #a\n"), "embedded LF");
        assert!(!valid_line("NICK a\0b"), "embedded NUL");
    }
}
