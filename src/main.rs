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
// a tiny bot: log in, join whatever channels were given on the command
// line, log what happens, and quit cleanly on ctrl-c
use chrono::Utc;
use log::{error, info, warn};
use rusty_ircc::config::parse_server_addr;
use rusty_ircc::{Config, Connection, Error, Event, EventKind};
use std::env;
use std::process;
use std::sync::Arc;
use tokio::sync::Notify;

fn usage() -> ! {
    eprintln!("usage: rusty-ircc <host[:port]> <nick> [channel...]");
    eprintln!("  IRC_NAME      full name sent at login (default: nick)");
    eprintln!("  IRC_PASSWORD  server password, if there is one");
    process::exit(2);
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        usage();
    }
    let (host, port) = match parse_server_addr(&args[1]) {
        Ok(addr) => addr,
        Err(e) => {
            eprintln!("{}", e);
            usage();
        }
    };
    let nick = &args[2];
    let name = env::var("IRC_NAME").unwrap_or_else(|_| nick.clone());
    let password = env::var("IRC_PASSWORD").ok();

    let config = Config::new(nick, &name).background();
    if let Err(e) = run(config, &host, port, password.as_deref(), &args[3..]).await {
        error!("{}", e);
        process::exit(1);
    }
}

async fn run(config: Config, host: &str, port: u16, password: Option<&str>, channels: &[String]) -> Result<(), Error> {
    let mut conn: Connection = Connection::new(config);
    let welcomed = Arc::new(Notify::new());
    let gone = Arc::new(Notify::new());

    let events = conn.events();
    let w = Arc::clone(&welcomed);
    events.on(EventKind::Welcome, move |event| {
        if let Event::Welcome(text) = event {
            info!("welcome: {}", text);
        }
        w.notify_one();
    });
    events.on(EventKind::Join, |event| info!("{:?}", event));
    events.on(EventKind::Part, |event| info!("{:?}", event));
    events.on(EventKind::Error, |event| warn!("{:?}", event));
    let g = Arc::clone(&gone);
    events.on(EventKind::Disconnect, move |event| {
        if let Event::Disconnect(Some(reason)) = event {
            warn!("disconnected: {}", reason);
        }
        g.notify_one();
    });

    conn.connect(host, port, password).await?;

    tokio::select! {
        _ = welcomed.notified() => {}
        _ = gone.notified() => {
            conn.quit(None).await?;
            return Err(Error::ConnectionClosed);
        }
    }
    for channel in channels {
        conn.join(channel).await?;
    }

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("interrupted, quitting"),
        _ = gone.notified() => info!("server closed the connection"),
    }
    conn.quit(Some("bye")).await?;

    if let Some(started) = conn.connected_at() {
        info!("session lasted {}s", (Utc::now() - started).num_seconds());
    }
    Ok(())
}
