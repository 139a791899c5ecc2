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
//! Connection lifecycle: connect, login, commands, quit, and the reader
//! that pumps inbound lines through the dispatcher.
//!
//! Exactly one thing reads the socket. In `Mode::Manual` that is the owner,
//! through `next_message`, `wait_for_reply_code` or `communicate`. In
//! `Mode::Background` the read half is moved into a spawned task at connect
//! time and every manual read fails with `Error::WrongMode`.
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::error::Error;
use crate::event::{Event, EventBus};
use crate::framer::LineFramer;
use crate::irc::message::ParsedMessage;
use crate::irc::rpl_defs as rpl;
use crate::sender::CommandSender;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// the owner pumps lines itself
    Manual,
    /// a spawned task pumps lines from connect until the stream ends
    Background,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Mode::Manual => write!(f, "manual"),
            Mode::Background => write!(f, "background"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Disconnected,
    Connecting,
    Connected,
    Registering,
    Ready,
    Quitting,
    Closed,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            State::Disconnected => "disconnected",
            State::Connecting => "connecting",
            State::Connected => "connected",
            State::Registering => "registering",
            State::Ready => "ready",
            State::Quitting => "quitting",
            State::Closed => "closed",
        };
        write!(f, "{}", s)
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// the bits of connection state the reader task needs to update too
#[derive(Debug)]
struct Session {
    state: Mutex<State>,
    connected_at: Mutex<Option<DateTime<Utc>>>,
    last_activity: Mutex<Option<DateTime<Utc>>>,
}

impl Session {
    fn new() -> Session {
        Session {
            state: Mutex::new(State::Disconnected),
            connected_at: Mutex::new(None),
            last_activity: Mutex::new(None),
        }
    }

    fn state(&self) -> State {
        *lock(&self.state)
    }

    fn set_state(&self, next: State) {
        let mut state = lock(&self.state);
        debug!(": state {} -> {}", *state, next);
        *state = next;
    }

    // move to `next` only from one of `from`; the reader and the owner
    // can both get here, whoever is second must not undo the first
    fn advance(&self, from: &[State], next: State) -> bool {
        let mut state = lock(&self.state);
        if from.contains(&*state) {
            debug!(": state {} -> {}", *state, next);
            *state = next;
            true
        } else {
            false
        }
    }

    fn connected(&self) {
        *lock(&self.connected_at) = Some(Utc::now());
        self.set_state(State::Connected);
    }

    fn touch(&self) {
        *lock(&self.last_activity) = Some(Utc::now());
    }

    fn observe(&self, msg: &ParsedMessage) {
        if let ParsedMessage::Welcome { .. } = msg {
            if self.advance(&[State::Connected, State::Registering], State::Ready) {
                info!(": registered with server");
            }
        }
    }
}

enum Reader<S> {
    Idle,
    Manual {
        framer: LineFramer<ReadHalf<S>>,
        dispatcher: Dispatcher<WriteHalf<S>>,
    },
    Background(JoinHandle<()>),
}

// one line off the framer and through the dispatcher, used by the manual
// pump and the background runner alike
async fn step<R, W>(
    framer: &mut LineFramer<R>,
    dispatcher: &Dispatcher<W>,
    session: &Session,
) -> Result<Option<(String, Option<ParsedMessage>)>, Error>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let line = match framer.next_line().await? {
        Some(line) => line,
        None => return Ok(None),
    };
    session.touch();
    let msg = dispatcher.route(&line).await?;
    if let Some(msg) = &msg {
        session.observe(msg);
    }
    Ok(Some((line, msg)))
}

// body of the background reader: runs until the stream ends or fails,
// or the server says goodbye with ERROR, then reports why through a
// Disconnect event, never by raising
async fn run_reader<R, W>(mut framer: LineFramer<R>, dispatcher: Dispatcher<W>, session: Arc<Session>)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    debug!(": background reader started");
    let reason = loop {
        match step(&mut framer, &dispatcher, &session).await {
            Ok(Some((_, Some(ParsedMessage::Error { text })))) => {
                debug!(": server sent ERROR; stopping background reader");
                // ERROR in reply to our own QUIT is a clean end
                if session.state() == State::Quitting {
                    break None;
                }
                break Some(Error::ServerError(text).to_string());
            }
            Ok(_) => continue,
            Err(Error::ConnectionClosed) => break None,
            Err(e) => {
                error!("background reader stopped: {}", e);
                break Some(e.to_string());
            }
        }
    };
    debug!(": background reader finished");
    dispatcher.events().publish(&Event::Disconnect(reason));
}

/// One logical session with a server, from connect to quit.
///
/// Subscribe to `events()` before connecting to see the `Connect` event.
/// `quit()` must be called before the connection is dropped; dropping it
/// with the background reader still going aborts that reader.
pub struct Connection<S = TcpStream> {
    config: Config,
    events: Arc<EventBus>,
    session: Arc<Session>,
    sender: Option<CommandSender<WriteHalf<S>>>,
    reader: Reader<S>,
}

impl<S> Connection<S> {
    pub fn new(config: Config) -> Connection<S> {
        Connection {
            config,
            events: Arc::new(EventBus::new()),
            session: Arc::new(Session::new()),
            sender: None,
            reader: Reader::Idle,
        }
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn nick(&self) -> &str {
        &self.config.nick
    }

    pub fn mode(&self) -> Mode {
        self.config.mode
    }

    pub fn state(&self) -> State {
        self.session.state()
    }

    pub fn connected_at(&self) -> Option<DateTime<Utc>> {
        *lock(&self.session.connected_at)
    }

    /// When the last non-blank line came in, for idle detection by hosts
    /// that don't set a read timeout.
    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        *lock(&self.session.last_activity)
    }

    pub fn is_runner_active(&self) -> bool {
        match &self.reader {
            Reader::Background(handle) => !handle.is_finished(),
            _ => false,
        }
    }
}

impl Connection<TcpStream> {
    /// Opens a TCP connection to `host:port` and logs in.
    pub async fn connect(&mut self, host: &str, port: u16, password: Option<&str>) -> Result<(), Error> {
        self.config.validate()?;
        if !self.session.advance(&[State::Disconnected], State::Connecting) {
            return Err(Error::InvalidState(self.state()));
        }
        info!("connecting to IRC server: {}:{}", host, port);
        let stream = match TcpStream::connect((host, port)).await {
            Ok(stream) => stream,
            Err(e) => {
                self.session.set_state(State::Disconnected);
                return Err(e.into());
            }
        };
        self.attach(stream, password).await
    }
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    /// Same as `connect` over a stream that is already open.
    ///
    /// In background mode the reader task is running before the `Connect`
    /// event is published and the login is sent, so no reply can be missed.
    pub async fn attach(&mut self, stream: S, password: Option<&str>) -> Result<(), Error> {
        self.config.validate()?;
        match self.state() {
            State::Disconnected | State::Connecting => {}
            other => return Err(Error::InvalidState(other)),
        }

        let (read_half, write_half) = tokio::io::split(stream);
        let sender = CommandSender::new(write_half);
        let framer = LineFramer::new(read_half)
            .with_read_size(self.config.read_size)
            .with_timeout(self.config.read_timeout);
        let dispatcher = Dispatcher::new(sender.clone(), Arc::clone(&self.events));
        self.session.connected();

        self.reader = match self.config.mode {
            Mode::Manual => Reader::Manual { framer, dispatcher },
            Mode::Background => {
                let session = Arc::clone(&self.session);
                Reader::Background(tokio::spawn(run_reader(framer, dispatcher, session)))
            }
        };
        self.sender = Some(sender.clone());

        self.events.publish(&Event::Connect);
        self.session.advance(&[State::Connected], State::Registering);
        sender.login(&self.config.nick, &self.config.name, password).await
    }

    fn sender(&self) -> Result<&CommandSender<WriteHalf<S>>, Error> {
        self.sender
            .as_ref()
            .ok_or_else(|| Error::InvalidState(self.session.state()))
    }

    #[allow(clippy::type_complexity)]
    fn manual_reader(&mut self) -> Result<(&mut LineFramer<ReadHalf<S>>, &Dispatcher<WriteHalf<S>>), Error> {
        match &mut self.reader {
            Reader::Manual { framer, dispatcher } => Ok((framer, dispatcher)),
            Reader::Background(_) => Err(Error::WrongMode(Mode::Background)),
            Reader::Idle => Err(Error::InvalidState(self.session.state())),
        }
    }

    pub async fn send_raw(&self, line: &str) -> Result<(), Error> {
        self.sender()?.send(line).await
    }

    pub async fn join(&self, channel: &str) -> Result<(), Error> {
        self.sender()?.join(channel).await
    }

    pub async fn part(&self, channel: &str, reason: Option<&str>) -> Result<(), Error> {
        self.sender()?.part(channel, reason).await
    }

    pub async fn privmsg(&self, target: &str, text: &str) -> Result<(), Error> {
        self.sender()?.privmsg(target, text).await
    }

    pub async fn set_mode(&self, target: &str, flags: &str) -> Result<(), Error> {
        self.sender()?.mode(target, flags).await
    }

    /// Manual pump: reads (at most once) and dispatches one line, returning it.
    /// `Ok(None)` if no complete line came in with that read.
    pub async fn next_message(&mut self) -> Result<Option<String>, Error> {
        let session = Arc::clone(&self.session);
        let (framer, dispatcher) = self.manual_reader()?;
        Ok(step(framer, dispatcher, &session).await?.map(|(line, _)| line))
    }

    /// Manual pump: dispatches lines until one carries a numeric in `codes`,
    /// and returns that numeric.
    ///
    /// An `ERROR` from the server ends the wait with `Error::ServerError`
    /// (after it has been published); end-of-stream with `ConnectionClosed`.
    pub async fn wait_for_reply_code(&mut self, codes: &[u16]) -> Result<u16, Error> {
        debug!(": waiting for reply code {:?}", codes);
        let session = Arc::clone(&self.session);
        let (framer, dispatcher) = self.manual_reader()?;
        loop {
            let msg = match step(framer, dispatcher, &session).await? {
                Some((_, Some(msg))) => msg,
                _ => continue,
            };
            if let ParsedMessage::Error { text } = msg {
                return Err(Error::ServerError(text));
            }
            if let Some(code) = msg.reply_code() {
                if codes.contains(&code) {
                    return Ok(code);
                }
            }
        }
    }

    pub async fn wait_for_welcome(&mut self) -> Result<(), Error> {
        debug!(": waiting for welcome message");
        self.wait_for_reply_code(&[rpl::RPL_WELCOME]).await.map(|_| ())
    }

    /// Waits for the end of the MOTD, or the server saying there isn't one.
    pub async fn wait_for_motd(&mut self) -> Result<u16, Error> {
        debug!(": waiting for MOTD");
        self.wait_for_reply_code(&[rpl::RPL_ENDOFMOTD, rpl::ERR_NOMOTD]).await
    }

    /// Manual pump until the server hangs up, or announces it with ERROR.
    pub async fn communicate(&mut self) -> Result<(), Error> {
        let session = Arc::clone(&self.session);
        let (framer, dispatcher) = self.manual_reader()?;
        loop {
            match step(framer, dispatcher, &session).await {
                Ok(Some((_, Some(ParsedMessage::Error { .. })))) => return Ok(()),
                Ok(_) => continue,
                Err(Error::ConnectionClosed) => return Ok(()),
                Err(e) => return Err(e),
            }
        }
    }

    /// Sends QUIT and shuts the connection down.
    ///
    /// Whoever is reading gets to finish first: the background reader is
    /// awaited until it has seen the server's ERROR or the end of the stream,
    /// or in manual mode the remaining lines up to either of those are read
    /// and dispatched here. Only then is the socket closed and `Quit`
    /// published.
    pub async fn quit(&mut self, reason: Option<&str>) -> Result<(), Error> {
        let sender = match (&self.sender, self.state()) {
            (Some(sender), state) if state != State::Quitting && state != State::Closed => sender.clone(),
            (_, state) => return Err(Error::InvalidState(state)),
        };
        self.session.set_state(State::Quitting);
        if let Err(e) = sender.quit(reason).await {
            warn!("couldn't send QUIT: {}", e);
        }

        let mut outcome = Ok(());
        match std::mem::replace(&mut self.reader, Reader::Idle) {
            Reader::Background(handle) => {
                debug!(": waiting for background reader to finish");
                if let Err(e) = handle.await {
                    error!("background reader failed: {}", e);
                    outcome = Err(Error::RunnerFailed(e.to_string()));
                }
            }
            Reader::Manual { mut framer, dispatcher } => {
                // read all remaining data from server, up to its ERROR
                loop {
                    match step(&mut framer, &dispatcher, &self.session).await {
                        Ok(Some((_, Some(ParsedMessage::Error { .. })))) => break,
                        Ok(_) => continue,
                        Err(Error::ConnectionClosed) => break,
                        Err(e) => {
                            debug!(": stopped draining: {}", e);
                            break;
                        }
                    }
                }
            }
            Reader::Idle => {}
        }

        if let Err(e) = sender.close().await {
            debug!(": error shutting down socket: {}", e);
        }
        self.sender = None;
        self.session.set_state(State::Closed);
        info!(": connection closed");
        self.events.publish(&Event::Quit(reason.map(str::to_string)));
        outcome
    }
}

impl<S> Drop for Connection<S> {
    fn drop(&mut self) {
        if let Reader::Background(handle) = &self.reader {
            if !handle.is_finished() {
                warn!("connection dropped without quit(); aborting background reader");
                handle.abort();
            }
        }
    }
}

impl<S> fmt::Debug for Connection<S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Connection")
            .field("nick", &self.config.nick)
            .field("mode", &self.config.mode)
            .field("state", &self.session.state())
            .field("events", &self.events)
            .finish()
    }
}
