//! The NCP connection state machine: ICP handshake, data transfer, teardown
//! (spec §3, §4.4).
//!
//! Grounded almost entirely on `waitsconnect.c` (`handle_rts`/`handle_str`/
//! `handle_cls`/`handle_all`/`handle_data`/`flush_output_buffer`/
//! `periodic_tasks`) — the live connection engine, as opposed to `ncp.c`
//! which turned out to be a passive telemetry monitor. Side effects are
//! returned as `Outbound` values rather than performed directly so the state
//! machine can be driven and asserted on without a socket (teacher's
//! `client.rs::run()` match-on-`Event` loop shape, generalized).

use crate::address::HostAddress;
use crate::ncp::opcode::{All, Cls, Erp, NcpMessage, Rts, Str};
use crate::ncp::telnet::{self, NewTelnet, TelnetVariant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Closed,
    Listening,
    IcpPhase1,
    IcpPhase2,
    Established,
    Closing,
}

/// A side effect the engine wants performed. The event loop is the only
/// thing that touches sockets; this keeps the state machine pure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// An NCP control message, always carried on wire link 0.
    Ncp { host: HostAddress, message: NcpMessage },
    /// A data message on a non-zero link (no opcode byte).
    Data { host: HostAddress, link: u8, bytes: Vec<u8> },
    ConsoleWrite(Vec<u8>),
    ConsoleConnect,
    ConsoleDisconnect,
    /// A bare 1822 NOP, one of the three sent spaced ~1s apart in reply to
    /// an inbound IMP RESET (spec §4.3). Not addressed to an NCP host — it
    /// never reaches `on_control_message` on the wire.
    RawNop,
}

#[derive(Debug, Clone)]
pub struct NcpConfig {
    pub old_telnet_socket: u32,
    pub new_telnet_socket: u32,
    pub chosen_send_link: u8,
    pub initial_all_messages: u16,
    pub initial_all_bits: u32,
    pub login_string: Vec<u8>,
    pub logout_string: Vec<u8>,
    pub login_delay_ticks: u64,
    pub close_delay_ticks: u64,
    pub max_data_message_bytes: usize,
    pub output_buffer_capacity: usize,
    pub first_data_socket: u32,
}

impl Default for NcpConfig {
    fn default() -> Self {
        Self {
            old_telnet_socket: 1,
            new_telnet_socket: 23,
            chosen_send_link: 45,
            initial_all_messages: 10,
            initial_all_bits: 16000,
            login_string: b"login\r".to_vec(),
            logout_string: b"logout\r\n".to_vec(),
            login_delay_ticks: 1,
            close_delay_ticks: 3,
            max_data_message_bytes: 100,
            output_buffer_capacity: 8000,
            first_data_socket: 100,
        }
    }
}

/// One NCP connection slot. Per spec §9's design note, this crate keeps the
/// single-connection-per-process shape of the original but encapsulates it
/// behind an owned value instead of a process-global static, so tests can
/// construct independent instances.
pub struct Connection {
    config: NcpConfig,
    state: ConnState,
    telnet_variant: Option<TelnetVariant>,
    new_telnet: NewTelnet,

    remote_host: HostAddress,
    listen_socket: u32,
    icp_remote_socket: u32,
    icp_link: u8,

    data_socket: u32,
    data_recv_local: u32,
    data_recv_remote: u32,
    data_recv_link: u8,
    data_send_local: u32,
    data_send_remote: u32,
    data_send_link: u8,

    got_str: bool,
    got_rts: bool,

    send_allocation: i64,
    output_buffer: Vec<u8>,

    next_data_socket: u32,
    tick: u64,
    login_deadline: Option<u64>,
    close_deadline: Option<u64>,
    reset_nops_pending: u8,
    next_reset_nop_tick: Option<u64>,
}

impl Connection {
    pub fn new(config: NcpConfig) -> Self {
        let next_data_socket = config.first_data_socket;
        Self {
            config,
            state: ConnState::Listening,
            telnet_variant: None,
            new_telnet: NewTelnet::new(),
            remote_host: HostAddress(0),
            listen_socket: 0,
            icp_remote_socket: 0,
            icp_link: 0,
            data_socket: 0,
            data_recv_local: 0,
            data_recv_remote: 0,
            data_recv_link: 0,
            data_send_local: 0,
            data_send_remote: 0,
            data_send_link: 0,
            got_str: false,
            got_rts: false,
            send_allocation: 0,
            output_buffer: Vec::new(),
            next_data_socket,
            tick: 0,
            login_deadline: None,
            close_deadline: None,
            reset_nops_pending: 0,
            next_reset_nop_tick: None,
        }
    }

    pub fn state(&self) -> ConnState {
        self.state
    }

    pub fn output_buffer_len(&self) -> usize {
        self.output_buffer.len()
    }

    pub fn send_allocation(&self) -> i64 {
        self.send_allocation
    }

    pub fn data_send_link(&self) -> u8 {
        self.data_send_link
    }

    pub fn data_recv_link(&self) -> u8 {
        self.data_recv_link
    }

    /// Resets the connection to `LISTENING` (spec §4.3, on inbound IMP
    /// RESET). `next_data_socket` is process-lifetime monotonic and is not
    /// reset (data-model invariant).
    pub fn reset_to_listening(&mut self) {
        self.state = ConnState::Listening;
        self.telnet_variant = None;
        self.new_telnet = NewTelnet::new();
        self.got_str = false;
        self.got_rts = false;
        self.send_allocation = 0;
        self.output_buffer.clear();
        self.login_deadline = None;
        self.close_deadline = None;
    }

    /// Queues three 1822 NOPs, one per tick (~1s apart, spec §4.3), armed on
    /// inbound IMP RESET. Restarts the queue if one was already in flight.
    pub fn arm_reset_nops(&mut self) {
        self.reset_nops_pending = 3;
        self.next_reset_nop_tick = Some(self.tick + 1);
    }

    /// Dispatches one parsed NCP control message (spec §4.4.6 + per-opcode
    /// handlers in §4.4.2-§4.4.4).
    pub fn on_control_message(&mut self, source: HostAddress, msg: NcpMessage, out: &mut Vec<Outbound>) {
        match msg {
            NcpMessage::Nop => {}
            NcpMessage::Rts(body) => self.handle_rts(source, body, out),
            NcpMessage::Str(body) => self.handle_str(source, body, out),
            NcpMessage::Cls(body) => self.handle_cls(source, body, out),
            NcpMessage::All(body) => self.handle_all(source, body, out),
            NcpMessage::Gvb | NcpMessage::Ret | NcpMessage::Inr | NcpMessage::Ins => {
                tracing::debug!(opcode = msg.opcode(), "ncp: accepted, not acted upon");
            }
            NcpMessage::Eco(body) => {
                out.push(Outbound::Ncp {
                    host: source,
                    message: NcpMessage::Erp(Erp { data: body.data }),
                });
            }
            NcpMessage::Erp(_) => {}
            NcpMessage::Err(body) => {
                tracing::warn!(code = body.code, "ncp: peer reported error");
            }
            NcpMessage::Rst => {
                out.push(Outbound::Ncp {
                    host: source,
                    message: NcpMessage::Rrp,
                });
            }
            NcpMessage::Rrp => tracing::info!("ncp: received reset reply"),
        }
    }

    fn handle_rts(&mut self, source: HostAddress, body: Rts, out: &mut Vec<Outbound>) {
        match self.state {
            ConnState::Listening => {
                if body.local_socket != self.config.old_telnet_socket
                    && body.local_socket != self.config.new_telnet_socket
                {
                    tracing::warn!(socket = body.local_socket, "ncp: RTS for unlisted socket, refusing");
                    out.push(Outbound::Ncp {
                        host: source,
                        message: NcpMessage::Cls(Cls {
                            remote_socket: body.remote_socket,
                            local_socket: body.local_socket,
                        }),
                    });
                    return;
                }
                self.remote_host = source;
                self.listen_socket = body.local_socket;
                self.icp_remote_socket = body.remote_socket;
                self.icp_link = body.link;
                self.telnet_variant = Some(if body.local_socket == self.config.old_telnet_socket {
                    TelnetVariant::Old
                } else {
                    TelnetVariant::New
                });
                self.state = ConnState::IcpPhase1;
                tracing::info!(telnet_variant = ?self.telnet_variant, "ncp: ICP phase 1 started");
                out.push(Outbound::Ncp {
                    host: source,
                    message: NcpMessage::Str(Str {
                        remote_socket: body.remote_socket,
                        local_socket: body.local_socket,
                        byte_size: 32,
                    }),
                });
            }
            ConnState::IcpPhase2 => {
                if body.local_socket != self.data_send_local {
                    tracing::warn!(
                        got = body.local_socket,
                        expected = self.data_send_local,
                        "ncp: RTS for unexpected socket during ICP phase 2"
                    );
                    return;
                }
                self.data_send_remote = body.remote_socket;
                self.data_recv_link = body.link;
                self.got_rts = true;
                self.maybe_establish(out);
            }
            _ => {}
        }
    }

    fn handle_str(&mut self, _source: HostAddress, body: Str, out: &mut Vec<Outbound>) {
        if self.state != ConnState::IcpPhase2 {
            return;
        }
        if body.local_socket != self.data_recv_local {
            tracing::warn!(
                got = body.local_socket,
                expected = self.data_recv_local,
                "ncp: STR for unexpected socket during ICP phase 2"
            );
            return;
        }
        self.data_recv_remote = body.remote_socket;
        self.got_str = true;
        self.maybe_establish(out);
    }

    fn maybe_establish(&mut self, out: &mut Vec<Outbound>) {
        if !(self.got_str && self.got_rts) {
            return;
        }
        self.state = ConnState::Established;
        tracing::info!("ncp: connection established");
        out.push(Outbound::ConsoleConnect);
        self.login_deadline = Some(self.tick + self.config.login_delay_ticks);
    }

    /// Called by the event loop if opening the console connection failed.
    pub fn console_connect_failed(&mut self, out: &mut Vec<Outbound>) {
        tracing::warn!("ncp: console connect failed, tearing down");
        out.push(Outbound::Ncp {
            host: self.remote_host,
            message: NcpMessage::Cls(Cls {
                remote_socket: self.data_send_remote,
                local_socket: self.data_send_local,
            }),
        });
        out.push(Outbound::Ncp {
            host: self.remote_host,
            message: NcpMessage::Cls(Cls {
                remote_socket: self.data_recv_remote,
                local_socket: self.data_recv_local,
            }),
        });
        self.state = ConnState::Listening;
        self.login_deadline = None;
    }

    fn handle_cls(&mut self, source: HostAddress, body: Cls, out: &mut Vec<Outbound>) {
        if matches!(self.state, ConnState::Closed | ConnState::Listening) {
            return;
        }
        if self.state == ConnState::IcpPhase2 && body.local_socket == self.listen_socket {
            tracing::info!("ncp: ICP connection closed as expected");
            return;
        }

        let had_data_sockets = matches!(self.state, ConnState::Established | ConnState::IcpPhase2);
        self.state = ConnState::Closing;
        out.push(Outbound::ConsoleWrite(self.config.logout_string.clone()));
        self.close_deadline = Some(self.tick + self.config.close_delay_ticks);

        if had_data_sockets {
            out.push(Outbound::Ncp {
                host: source,
                message: NcpMessage::Cls(Cls {
                    remote_socket: self.data_send_remote,
                    local_socket: self.data_send_local,
                }),
            });
            out.push(Outbound::Ncp {
                host: source,
                message: NcpMessage::Cls(Cls {
                    remote_socket: self.data_recv_remote,
                    local_socket: self.data_recv_local,
                }),
            });
        }

        self.send_allocation = 0;
        self.output_buffer.clear();
        self.state = ConnState::Listening;
        tracing::info!("ncp: connection closed, returned to LISTENING");
    }

    fn handle_all(&mut self, source: HostAddress, body: All, out: &mut Vec<Outbound>) {
        match self.state {
            ConnState::IcpPhase1 => {
                if body.link != self.icp_link {
                    tracing::warn!(got = body.link, expected = self.icp_link, "ncp: ALL for wrong link");
                    return;
                }
                self.data_socket = self.next_data_socket;
                self.next_data_socket += 2;
                self.data_recv_local = self.data_socket;
                self.data_send_local = self.data_socket + 1;
                self.data_send_link = self.config.chosen_send_link;
                self.got_str = false;
                self.got_rts = false;

                out.push(Outbound::Data {
                    host: source,
                    link: self.icp_link,
                    bytes: self.data_socket.to_be_bytes().to_vec(),
                });
                out.push(Outbound::Ncp {
                    host: source,
                    message: NcpMessage::Cls(Cls {
                        remote_socket: self.icp_remote_socket,
                        local_socket: self.listen_socket,
                    }),
                });
                out.push(Outbound::Ncp {
                    host: source,
                    message: NcpMessage::Str(Str {
                        remote_socket: self.icp_remote_socket + 2,
                        local_socket: self.data_send_local,
                        byte_size: 8,
                    }),
                });
                out.push(Outbound::Ncp {
                    host: source,
                    message: NcpMessage::Rts(Rts {
                        remote_socket: self.icp_remote_socket + 3,
                        local_socket: self.data_recv_local,
                        link: self.data_send_link,
                    }),
                });
                self.state = ConnState::IcpPhase2;
                tracing::info!(base_socket = self.data_socket, "ncp: ICP phase 2 started");
            }
            ConnState::Established => {
                if body.link != self.data_send_link {
                    tracing::warn!(got = body.link, expected = self.data_send_link, "ncp: ALL for wrong link");
                    return;
                }
                self.send_allocation += body.messages as i64;
                self.flush_output_buffer(out);
            }
            _ => {}
        }
    }

    /// Inbound data on `data_recv_link` (spec §4.4.3): demux by telnet
    /// variant, forward to console, replenish the peer's window.
    pub fn on_data_message(&mut self, link: u8, bytes: &[u8], out: &mut Vec<Outbound>) {
        if self.state != ConnState::Established || link != self.data_recv_link {
            return;
        }
        let mut decoded = Vec::new();
        match self.telnet_variant {
            Some(TelnetVariant::Old) => telnet::process_old(bytes, &mut decoded),
            Some(TelnetVariant::New) => self.new_telnet.process(bytes, &mut decoded),
            None => return,
        }
        out.push(Outbound::ConsoleWrite(decoded));
        out.push(Outbound::Ncp {
            host: self.remote_host,
            message: NcpMessage::All(All {
                link: self.data_recv_link,
                messages: self.config.initial_all_messages,
                bits: self.config.initial_all_bits,
            }),
        });
    }

    /// Bytes read from the console, to be queued as ARPANET data (spec
    /// §4.4.3). Discarded, not buffered, during the login/close grace
    /// period (spec §4.4.2 point 3, §4.4.4 point 2).
    pub fn on_console_bytes(&mut self, bytes: &[u8], out: &mut Vec<Outbound>) {
        if self.close_deadline.is_some() || self.login_deadline.is_some() {
            tracing::debug!("ncp: console input during grace period, discarding");
            return;
        }
        if self.output_buffer.len() + bytes.len() <= self.config.output_buffer_capacity {
            self.output_buffer.extend_from_slice(bytes);
        } else {
            tracing::warn!(dropped = bytes.len(), "ncp: output buffer full, dropping console bytes");
        }
        self.flush_output_buffer(out);
    }

    fn flush_output_buffer(&mut self, out: &mut Vec<Outbound>) {
        while self.state == ConnState::Established && !self.output_buffer.is_empty() && self.send_allocation > 0 {
            let n = self.output_buffer.len().min(self.config.max_data_message_bytes);
            let chunk: Vec<u8> = self.output_buffer.drain(..n).collect();
            out.push(Outbound::Data {
                host: self.remote_host,
                link: self.data_send_link,
                bytes: chunk,
            });
            self.send_allocation -= 1;
        }
    }

    /// Console-side disconnect, reported by the event loop.
    pub fn on_console_disconnect(&mut self, out: &mut Vec<Outbound>) {
        if self.close_deadline.is_some() {
            tracing::debug!("ncp: console disconnected during logout delay, ignoring");
            return;
        }
        if self.login_deadline.is_some() {
            tracing::debug!("ncp: console disconnected during login delay, ignoring");
            return;
        }
        out.push(Outbound::Ncp {
            host: self.remote_host,
            message: NcpMessage::Cls(Cls {
                remote_socket: self.data_send_remote,
                local_socket: self.data_send_local,
            }),
        });
        out.push(Outbound::Ncp {
            host: self.remote_host,
            message: NcpMessage::Cls(Cls {
                remote_socket: self.data_recv_remote,
                local_socket: self.data_recv_local,
            }),
        });
        self.send_allocation = 0;
        self.output_buffer.clear();
        self.state = ConnState::Listening;
    }

    /// Advances the tick counter by one and fires any armed timers (spec §5).
    pub fn tick(&mut self, out: &mut Vec<Outbound>) {
        self.tick += 1;
        if let Some(deadline) = self.login_deadline {
            if self.tick >= deadline {
                out.push(Outbound::ConsoleWrite(self.config.login_string.clone()));
                out.push(Outbound::Ncp {
                    host: self.remote_host,
                    message: NcpMessage::All(All {
                        link: self.data_recv_link,
                        messages: self.config.initial_all_messages,
                        bits: self.config.initial_all_bits,
                    }),
                });
                self.login_deadline = None;
                tracing::info!("ncp: login sent, connection fully established");
            }
        }
        if let Some(deadline) = self.close_deadline {
            if self.tick >= deadline {
                out.push(Outbound::ConsoleDisconnect);
                self.close_deadline = None;
            }
        }
        if let Some(deadline) = self.next_reset_nop_tick {
            if self.tick >= deadline && self.reset_nops_pending > 0 {
                out.push(Outbound::RawNop);
                self.reset_nops_pending -= 1;
                self.next_reset_nop_tick = if self.reset_nops_pending > 0 {
                    Some(self.tick + 1)
                } else {
                    None
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rts(remote: u32, local: u32, link: u8) -> NcpMessage {
        NcpMessage::Rts(Rts {
            remote_socket: remote,
            local_socket: local,
            link,
        })
    }

    fn all(link: u8, messages: u16, bits: u32) -> NcpMessage {
        NcpMessage::All(All { link, messages, bits })
    }

    #[test]
    fn phase1_entry_trace() {
        let mut conn = Connection::new(NcpConfig::default());
        let mut out = Vec::new();
        conn.on_control_message(HostAddress(1), rts(1, 42, 7), &mut out);
        assert_eq!(conn.state(), ConnState::IcpPhase1);
        assert_eq!(
            out,
            vec![Outbound::Ncp {
                host: HostAddress(1),
                message: NcpMessage::Str(Str {
                    remote_socket: 1,
                    local_socket: 42,
                    byte_size: 32
                })
            }]
        );
    }

    #[test]
    fn phase1_complete_trace() {
        let mut conn = Connection::new(NcpConfig::default());
        let mut out = Vec::new();
        conn.on_control_message(HostAddress(1), rts(1, 42, 7), &mut out);
        out.clear();

        conn.on_control_message(HostAddress(1), all(7, 4, 256), &mut out);
        assert_eq!(conn.state(), ConnState::IcpPhase2);

        let base = 100u32; // first_data_socket default
        assert_eq!(
            out,
            vec![
                Outbound::Data {
                    host: HostAddress(1),
                    link: 7,
                    bytes: base.to_be_bytes().to_vec(),
                },
                Outbound::Ncp {
                    host: HostAddress(1),
                    message: NcpMessage::Cls(Cls {
                        remote_socket: 1,
                        local_socket: 42
                    })
                },
                Outbound::Ncp {
                    host: HostAddress(1),
                    message: NcpMessage::Str(Str {
                        remote_socket: 3,
                        local_socket: base + 1,
                        byte_size: 8
                    })
                },
                Outbound::Ncp {
                    host: HostAddress(1),
                    message: NcpMessage::Rts(Rts {
                        remote_socket: 4,
                        local_socket: base,
                        link: 45
                    })
                },
            ]
        );
    }

    #[test]
    fn full_icp_handshake_reaches_established() {
        let mut conn = Connection::new(NcpConfig::default());
        let mut out = Vec::new();
        conn.on_control_message(HostAddress(0o143), rts(99, 1, 7), &mut out);
        out.clear();
        conn.on_control_message(HostAddress(0o143), all(7, 2, 8000), &mut out);
        out.clear();
        conn.on_control_message(
            HostAddress(0o143),
            NcpMessage::Str(Str {
                remote_socket: 101,
                local_socket: 100,
                byte_size: 8,
            }),
            &mut out,
        );
        conn.on_control_message(
            HostAddress(0o143),
            NcpMessage::Rts(Rts {
                remote_socket: 102,
                local_socket: 101,
                link: 9,
            }),
            &mut out,
        );
        assert_eq!(conn.state(), ConnState::Established);
        assert_eq!(conn.data_send_link(), 45);
        assert_eq!(conn.data_recv_link(), 9);
        assert!(out.contains(&Outbound::ConsoleConnect));
    }

    #[test]
    fn flow_control_buffers_without_allocation() {
        let mut conn = Connection::new(NcpConfig::default());
        // Drive to ESTABLISHED first.
        let mut out = Vec::new();
        conn.on_control_message(HostAddress(1), rts(99, 1, 7), &mut out);
        conn.on_control_message(HostAddress(1), all(7, 2, 8000), &mut out);
        conn.on_control_message(
            HostAddress(1),
            NcpMessage::Str(Str {
                remote_socket: 101,
                local_socket: 100,
                byte_size: 8,
            }),
            &mut out,
        );
        conn.on_control_message(
            HostAddress(1),
            NcpMessage::Rts(Rts {
                remote_socket: 102,
                local_socket: 101,
                link: 9,
            }),
            &mut out,
        );
        assert_eq!(conn.send_allocation(), 0);

        out.clear();
        conn.tick(&mut out); // clears the post-establish login grace period
        out.clear();

        conn.on_console_bytes(b"hello", &mut out);
        assert_eq!(conn.output_buffer_len(), 5);
        assert!(out.iter().all(|o| !matches!(o, Outbound::Data { .. })));

        out.clear();
        conn.on_control_message(HostAddress(1), all(45, 3, 1000), &mut out);
        assert_eq!(conn.output_buffer_len(), 0);
        assert_eq!(
            out,
            vec![Outbound::Data {
                host: HostAddress(1),
                link: 45,
                bytes: b"hello".to_vec()
            }]
        );
    }

    #[test]
    fn teardown_emits_two_cls_and_arms_close_timer() {
        let mut conn = Connection::new(NcpConfig::default());
        let mut out = Vec::new();
        conn.on_control_message(HostAddress(1), rts(99, 1, 7), &mut out);
        conn.on_control_message(HostAddress(1), all(7, 2, 8000), &mut out);
        conn.on_control_message(
            HostAddress(1),
            NcpMessage::Str(Str {
                remote_socket: 101,
                local_socket: 100,
                byte_size: 8,
            }),
            &mut out,
        );
        conn.on_control_message(
            HostAddress(1),
            NcpMessage::Rts(Rts {
                remote_socket: 102,
                local_socket: 101,
                link: 9,
            }),
            &mut out,
        );

        out.clear();
        conn.on_control_message(
            HostAddress(1),
            NcpMessage::Cls(Cls {
                remote_socket: 102,
                local_socket: 101,
            }),
            &mut out,
        );
        let cls_count = out
            .iter()
            .filter(|o| matches!(o, Outbound::Ncp { message: NcpMessage::Cls(_), .. }))
            .count();
        assert_eq!(cls_count, 2);
        assert_eq!(conn.state(), ConnState::Listening);

        out.clear();
        conn.on_console_bytes(b"ignored", &mut out);
        assert!(out.iter().all(|o| !matches!(o, Outbound::Data { .. })));
    }

    #[test]
    fn console_bytes_discarded_during_login_grace_period() {
        let mut conn = Connection::new(NcpConfig::default());
        let mut out = Vec::new();
        conn.on_control_message(HostAddress(1), rts(99, 1, 7), &mut out);
        conn.on_control_message(HostAddress(1), all(7, 2, 8000), &mut out);
        conn.on_control_message(
            HostAddress(1),
            NcpMessage::Str(Str {
                remote_socket: 101,
                local_socket: 100,
                byte_size: 8,
            }),
            &mut out,
        );
        conn.on_control_message(
            HostAddress(1),
            NcpMessage::Rts(Rts {
                remote_socket: 102,
                local_socket: 101,
                link: 9,
            }),
            &mut out,
        );
        assert_eq!(conn.state(), ConnState::Established);

        out.clear();
        conn.on_console_bytes(b"too early", &mut out);
        assert_eq!(conn.output_buffer_len(), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn console_bytes_discarded_during_close_grace_period() {
        let mut conn = Connection::new(NcpConfig::default());
        let mut out = Vec::new();
        // Drive through teardown on an established connection so
        // close_deadline is armed.
        conn.on_control_message(HostAddress(1), rts(99, 1, 7), &mut out);
        conn.on_control_message(HostAddress(1), all(7, 2, 8000), &mut out);
        conn.on_control_message(
            HostAddress(1),
            NcpMessage::Str(Str {
                remote_socket: 101,
                local_socket: 100,
                byte_size: 8,
            }),
            &mut out,
        );
        conn.on_control_message(
            HostAddress(1),
            NcpMessage::Rts(Rts {
                remote_socket: 102,
                local_socket: 101,
                link: 9,
            }),
            &mut out,
        );
        out.clear();
        conn.tick(&mut out); // clear login grace period
        out.clear();
        conn.on_control_message(
            HostAddress(1),
            NcpMessage::Cls(Cls {
                remote_socket: 102,
                local_socket: 101,
            }),
            &mut out,
        );
        assert_eq!(conn.state(), ConnState::Listening);

        out.clear();
        conn.on_console_bytes(b"too late", &mut out);
        assert_eq!(conn.output_buffer_len(), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn teardown_clears_allocation_and_buffer() {
        let mut conn = Connection::new(NcpConfig::default());
        let mut out = Vec::new();
        conn.on_control_message(HostAddress(1), rts(99, 1, 7), &mut out);
        conn.on_control_message(HostAddress(1), all(7, 2, 8000), &mut out);
        conn.on_control_message(
            HostAddress(1),
            NcpMessage::Str(Str {
                remote_socket: 101,
                local_socket: 100,
                byte_size: 8,
            }),
            &mut out,
        );
        conn.on_control_message(
            HostAddress(1),
            NcpMessage::Rts(Rts {
                remote_socket: 102,
                local_socket: 101,
                link: 9,
            }),
            &mut out,
        );
        out.clear();
        conn.tick(&mut out);
        out.clear();
        conn.on_control_message(HostAddress(1), all(45, 3, 1000), &mut out);
        assert!(conn.send_allocation() > 0);

        out.clear();
        conn.on_control_message(
            HostAddress(1),
            NcpMessage::Cls(Cls {
                remote_socket: 102,
                local_socket: 101,
            }),
            &mut out,
        );
        assert_eq!(conn.send_allocation(), 0);
        assert_eq!(conn.output_buffer_len(), 0);
    }

    #[test]
    fn reset_nops_spaced_one_per_tick() {
        let mut conn = Connection::new(NcpConfig::default());
        conn.arm_reset_nops();

        let mut nops_per_tick = Vec::new();
        for _ in 0..4 {
            let mut out = Vec::new();
            conn.tick(&mut out);
            nops_per_tick.push(out.iter().filter(|o| matches!(o, Outbound::RawNop)).count());
        }
        assert_eq!(nops_per_tick, vec![1, 1, 1, 0]);
    }

    #[test]
    fn eco_is_answered_with_erp() {
        let mut conn = Connection::new(NcpConfig::default());
        let mut out = Vec::new();
        conn.on_control_message(HostAddress(1), NcpMessage::Eco(crate::ncp::opcode::Eco { data: 42 }), &mut out);
        assert_eq!(
            out,
            vec![Outbound::Ncp {
                host: HostAddress(1),
                message: NcpMessage::Erp(Erp { data: 42 })
            }]
        );
    }

    #[test]
    fn rst_is_answered_with_rrp() {
        let mut conn = Connection::new(NcpConfig::default());
        let mut out = Vec::new();
        conn.on_control_message(HostAddress(1), NcpMessage::Rst, &mut out);
        assert_eq!(
            out,
            vec![Outbound::Ncp {
                host: HostAddress(1),
                message: NcpMessage::Rrp
            }]
        );
    }
}
