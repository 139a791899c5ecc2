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
//! Ordered publish/subscribe registry, one subscriber list per event kind.
use crate::error::Error;
use log::warn;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use std::{error, fmt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Connect,
    Welcome,
    Join,
    Part,
    Ping,
    Error,
    Quit,
    Disconnect,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What gets handed to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// socket is open, login not sent yet
    Connect,
    /// 001 seen; trailing text of the reply
    Welcome(String),
    Join(String),
    /// channel, optional reason
    Part(String, Option<String>),
    /// token of a PING we already answered
    Ping(String),
    /// text of an `ERROR` line; the server is about to hang up
    Error(String),
    /// published by `quit()` once the socket is closed
    Quit(Option<String>),
    /// the reader stopped; `None` for a clean end-of-stream
    Disconnect(Option<String>),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Connect => EventKind::Connect,
            Event::Welcome(_) => EventKind::Welcome,
            Event::Join(_) => EventKind::Join,
            Event::Part(_, _) => EventKind::Part,
            Event::Ping(_) => EventKind::Ping,
            Event::Error(_) => EventKind::Error,
            Event::Quit(_) => EventKind::Quit,
            Event::Disconnect(_) => EventKind::Disconnect,
        }
    }
}

pub type SubscriberError = Box<dyn error::Error + Send + Sync>;
pub type Callback = Arc<dyn Fn(&Event) -> Result<(), SubscriberError> + Send + Sync>;

/// Subscribers are kept per kind in registration order. The same callback may
/// be registered more than once and then runs once per registration.
///
/// Callbacks run synchronously on whichever task publishes, which for a
/// connection in background mode is its reader task; a slow callback holds
/// up every line behind it.
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<HashMap<EventKind, Vec<Callback>>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let subs = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        let counts: HashMap<&EventKind, usize> = subs.iter().map(|(k, v)| (k, v.len())).collect();
        f.debug_struct("EventBus").field("subscribers", &counts).finish()
    }
}

impl EventBus {
    pub fn new() -> EventBus {
        EventBus::default()
    }

    pub fn subscribe(&self, kind: EventKind, callback: Callback) {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(kind)
            .or_default()
            .push(callback);
    }

    /// Subscribes a closure that cannot fail and returns its handle, which is
    /// what `unsubscribe` wants later.
    pub fn on<F>(&self, kind: EventKind, f: F) -> Callback
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let callback: Callback = Arc::new(move |event: &Event| -> Result<(), SubscriberError> {
            f(event);
            Ok(())
        });
        self.subscribe(kind, Arc::clone(&callback));
        callback
    }

    /// Removes the first registration of `callback` for `kind`.
    ///
    /// Removing a callback that isn't registered is a no-op and returns `false`.
    pub fn unsubscribe(&self, kind: EventKind, callback: &Callback) -> bool {
        let mut subs = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        let list = match subs.get_mut(&kind) {
            Some(list) => list,
            None => return false,
        };
        match list.iter().position(|cb| Arc::ptr_eq(cb, callback)) {
            Some(i) => {
                list.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .map_or(0, Vec::len)
    }

    /// Runs every subscriber of `event.kind()` in order.
    ///
    /// A subscriber returning an error, or panicking, is logged and skipped
    /// over; the rest still run. Returns how many of them failed.
    pub fn publish(&self, event: &Event) -> usize {
        let kind = event.kind();
        // snapshot so callbacks can (un)subscribe without deadlocking on us
        let snapshot: Vec<Callback> = match self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
        {
            Some(list) => list.clone(),
            None => return 0,
        };

        let mut failures = 0;
        for callback in snapshot.iter() {
            let reason = match panic::catch_unwind(AssertUnwindSafe(|| callback(event))) {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e.to_string(),
                Err(payload) => panic_message(payload.as_ref()),
            };
            failures += 1;
            warn!("{}", Error::SubscriberFailure { event: kind, reason });
        }
        failures
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}
