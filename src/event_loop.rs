//! The single cooperative event loop (spec §5): one `tokio::select!` over
//! the IMP datagram socket, the console stream, operator stdin, and a tick
//! interval. No `tokio::spawn` anywhere in this module.
//!
//! Grounded on `waitsconnect.c`'s `main()` (`select()` with a ~1 s timeout,
//! `periodic_tasks()` on each wakeup) and `ncp.c`'s `main()` operator-command
//! handling; restructured from the teacher's `client.rs::run()` multi-thread
//! (`mpsc` + `thread::spawn`) shape into one task, per the concurrency model
//! in §5.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::Config;
use crate::console::Console;
use crate::framer::{Fragment, Framer};
use crate::imp_message::ImpLeader;
use crate::ncp::connection::Connection;
use crate::router::{self, Action};
use crate::telemetry::Telemetry;
use crate::transport::Transport;

const TICK_PERIOD: Duration = Duration::from_millis(1000);
const DATAGRAM_BUF: usize = 4096;
const CONSOLE_BUF: usize = 4096;

/// Operator commands read from standard input (spec §6): `d` toggles
/// verbose decoding, `s` dumps the telemetry tables, `q` exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorCommand {
    ToggleVerbose,
    DumpTables,
    Quit,
}

fn parse_operator_command(line: &str) -> Option<OperatorCommand> {
    match line.trim().chars().next()? {
        'd' => Some(OperatorCommand::ToggleVerbose),
        's' => Some(OperatorCommand::DumpTables),
        'q' => Some(OperatorCommand::Quit),
        _ => None,
    }
}

pub struct EventLoop {
    transport: Transport,
    framer: Framer,
    conn: Connection,
    telemetry: Telemetry,
    console: Option<Console>,
    console_addr: Option<SocketAddr>,
    verbose: bool,
}

impl EventLoop {
    pub async fn new(config: Config) -> std::io::Result<Self> {
        let transport = Transport::bind(config.imp_local_addr, config.imp_peer_addr).await?;
        Ok(Self {
            transport,
            framer: Framer::new(),
            conn: Connection::new(config.ncp),
            telemetry: Telemetry::new(),
            console: None,
            console_addr: config.console_addr,
            verbose: false,
        })
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    /// Runs until `q` is read from the operator, or a fatal transport error
    /// occurs. Fatal errors propagate (spec §7); recoverable ones are logged
    /// and the loop continues.
    pub async fn run(&mut self) -> std::io::Result<()> {
        let mut tick = tokio::time::interval(TICK_PERIOD);
        let mut datagram_buf = vec![0u8; DATAGRAM_BUF];
        let mut console_buf = vec![0u8; CONSOLE_BUF];
        let mut stdin_lines = BufReader::new(tokio::io::stdin()).lines();

        if let Some(datagram) = self.framer.set_host_ready(true) {
            self.transport.send(&datagram).await?;
        }

        loop {
            let console_read = async {
                match &mut self.console {
                    Some(console) => console.read(&mut console_buf).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                _ = tick.tick() => {
                    self.on_tick().await?;
                }
                result = self.transport.recv(&mut datagram_buf) => {
                    let n = result?;
                    self.on_datagram(&datagram_buf[..n]).await?;
                }
                result = console_read => {
                    match result {
                        Ok(0) => self.on_console_eof().await?,
                        Ok(n) => self.on_console_bytes(&console_buf[..n]).await?,
                        Err(e) => {
                            tracing::warn!(error = %e, "event loop: console read error");
                            self.on_console_eof().await?;
                        }
                    }
                }
                line = stdin_lines.next_line() => {
                    match line {
                        Ok(Some(text)) => {
                            if let Some(cmd) = parse_operator_command(&text) {
                                if self.on_operator_command(cmd) {
                                    return Ok(());
                                }
                            }
                        }
                        Ok(None) => {}
                        Err(e) => tracing::warn!(error = %e, "event loop: stdin read error"),
                    }
                }
            }
        }
    }

    async fn on_tick(&mut self) -> std::io::Result<()> {
        let mut actions = Vec::new();
        let mut outbound = Vec::new();
        self.conn.tick(&mut outbound);
        router::drain_ncp_outbound(outbound, &mut actions);
        self.apply_actions(actions).await
    }

    async fn on_datagram(&mut self, datagram: &[u8]) -> std::io::Result<()> {
        let mut payload = Vec::new();
        let outcome = self.framer.decode_into(datagram, &mut payload);
        if !matches!(outcome, Fragment::Accepted { last: true }) {
            return Ok(());
        }
        if payload.len() < 4 {
            tracing::warn!("event loop: datagram too short for an 1822 leader, dropping");
            return Ok(());
        }
        let leader_bytes: [u8; 4] = payload[0..4].try_into().unwrap();
        let leader = ImpLeader::decode(&leader_bytes);
        let body = &payload[4..];

        let mut actions = Vec::new();
        router::handle_message(&mut self.conn, &mut self.telemetry, leader, body, &mut actions);
        self.apply_actions(actions).await
    }

    async fn on_console_bytes(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        let mut outbound = Vec::new();
        self.conn.on_console_bytes(bytes, &mut outbound);
        let mut actions = Vec::new();
        router::drain_ncp_outbound(outbound, &mut actions);
        self.apply_actions(actions).await
    }

    async fn on_console_eof(&mut self) -> std::io::Result<()> {
        self.console = None;
        let mut outbound = Vec::new();
        self.conn.on_console_disconnect(&mut outbound);
        let mut actions = Vec::new();
        router::drain_ncp_outbound(outbound, &mut actions);
        self.apply_actions(actions).await
    }

    fn on_operator_command(&mut self, cmd: OperatorCommand) -> bool {
        match cmd {
            OperatorCommand::ToggleVerbose => {
                self.verbose = !self.verbose;
                tracing::info!(verbose = self.verbose, "operator: toggled verbose decoding");
                false
            }
            OperatorCommand::DumpTables => {
                tracing::info!(
                    received = self.telemetry.received(),
                    unknown = self.telemetry.unknown(),
                    "operator: telemetry table dump requested"
                );
                false
            }
            OperatorCommand::Quit => {
                tracing::info!("operator: quit requested");
                true
            }
        }
    }

    async fn apply_actions(&mut self, actions: Vec<Action>) -> std::io::Result<()> {
        for action in actions {
            match action {
                Action::SendImpMessage(message) => {
                    let datagram = self.framer.encode(&message);
                    self.transport.send(&datagram).await?;
                }
                Action::ResetFramer => self.framer.reset_sequences(),
                Action::ConsoleWrite(bytes) => {
                    if let Some(console) = &mut self.console {
                        if let Err(e) = console.write(&bytes).await {
                            tracing::warn!(error = %e, "event loop: console write failed");
                        }
                    }
                }
                Action::ConsoleConnect => self.connect_console().await,
                Action::ConsoleDisconnect => {
                    if let Some(mut console) = self.console.take() {
                        let _ = console.shutdown().await;
                    }
                }
            }
        }
        Ok(())
    }

    async fn connect_console(&mut self) {
        let Some(addr) = self.console_addr else {
            tracing::warn!("event loop: no console address configured, cannot connect");
            let mut outbound = Vec::new();
            self.conn.console_connect_failed(&mut outbound);
            let mut actions = Vec::new();
            router::drain_ncp_outbound(outbound, &mut actions);
            let _ = self.apply_actions_sync(actions).await;
            return;
        };
        match Console::connect(addr).await {
            Ok(console) => self.console = Some(console),
            Err(e) => {
                tracing::warn!(error = %e, %addr, "event loop: console connect failed");
                let mut outbound = Vec::new();
                self.conn.console_connect_failed(&mut outbound);
                let mut actions = Vec::new();
                router::drain_ncp_outbound(outbound, &mut actions);
                let _ = self.apply_actions_sync(actions).await;
            }
        }
    }

    /// Helper so `connect_console` (itself called from `apply_actions`) can
    /// recurse into `apply_actions` without `Box::pin`-ing the async fn.
    async fn apply_actions_sync(&mut self, actions: Vec<Action>) -> std::io::Result<()> {
        for action in actions {
            match action {
                Action::SendImpMessage(message) => {
                    let datagram = self.framer.encode(&message);
                    self.transport.send(&datagram).await?;
                }
                Action::ResetFramer => self.framer.reset_sequences(),
                Action::ConsoleWrite(_) | Action::ConsoleConnect | Action::ConsoleDisconnect => {
                    // A fresh console-connect failure only ever emits CLS
                    // messages; nested console actions do not occur here.
                }
            }
        }
        Ok(())
    }
}
