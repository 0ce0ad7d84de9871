//! Dispatches inbound 1822 messages to the NCP engine or the telemetry
//! decoder, and turns NCP `Outbound` actions back into 1822 messages (spec
//! §3, §4.3).
//!
//! Grounded on `waitsconnect.c`'s `handle_imp()`: REGULAR on link 0 carries
//! either an NCP control stream or IMP self-report telemetry (distinguished
//! by signature, not by a dedicated link); REGULAR on any other link is
//! connection data; RESET resyncs state and arms a tick-spaced three-NOP
//! reply; DEAD is logged by subtype; RFNM/other types are logged and
//! otherwise ignored.

use crate::address::HostAddress;
use crate::imp_message::{dead_reason, ImpLeader, ImpType};
use crate::ncp::connection::{Connection, Outbound};
use crate::ncp::opcode::{self, NcpMessage};
use crate::telemetry::{self, Telemetry};

/// An effect the router wants carried out. Built from NCP `Outbound` values
/// and from the router's own RESET handling; the event loop is the only
/// thing that touches the transport and the console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// An unframed 1822 message (leader + body) to hand to the framer.
    SendImpMessage(Vec<u8>),
    ResetFramer,
    ConsoleWrite(Vec<u8>),
    ConsoleConnect,
    ConsoleDisconnect,
}

fn ncp_message_to_imp(host: HostAddress, message: NcpMessage) -> Vec<u8> {
    let body: heapless::Vec<u8, 16> = opcode::encode_one(message).expect("NCP bodies fit in 16 bytes");
    let mut out = ImpLeader::regular(host, 0).encode().to_vec();
    out.extend_from_slice(&body);
    out
}

fn data_to_imp(host: HostAddress, link: u8, bytes: &[u8]) -> Vec<u8> {
    let mut out = ImpLeader::regular(host, link).encode().to_vec();
    out.extend_from_slice(bytes);
    out
}

/// Translates the NCP engine's side effects into router `Action`s, in order.
pub fn drain_ncp_outbound(outbound: Vec<Outbound>, actions: &mut Vec<Action>) {
    for ob in outbound {
        match ob {
            Outbound::Ncp { host, message } => actions.push(Action::SendImpMessage(ncp_message_to_imp(host, message))),
            Outbound::Data { host, link, bytes } => actions.push(Action::SendImpMessage(data_to_imp(host, link, &bytes))),
            Outbound::ConsoleWrite(bytes) => actions.push(Action::ConsoleWrite(bytes)),
            Outbound::ConsoleConnect => actions.push(Action::ConsoleConnect),
            Outbound::ConsoleDisconnect => actions.push(Action::ConsoleDisconnect),
            Outbound::RawNop => actions.push(Action::SendImpMessage(ImpLeader::nop().encode().to_vec())),
        }
    }
}

/// Handles one reassembled 1822 message (leader already split from the
/// payload that follows it).
pub fn handle_message(conn: &mut Connection, telemetry: &mut Telemetry, leader: ImpLeader, payload: &[u8], actions: &mut Vec<Action>) {
    let kind = match leader.parsed_type() {
        Ok(kind) => kind,
        Err(unknown) => {
            tracing::warn!(kind = unknown.0, "router: unrecognized IMP message type, ignoring");
            return;
        }
    };

    match kind {
        ImpType::Regular if leader.link == 0 => {
            match telemetry::try_decode(payload) {
                Some(telemetry::Outcome::Record(record)) => {
                    tracing::info!(imp = leader.host.imp(), "router: IMP self-report received");
                    telemetry.record(leader.host.imp(), record);
                    return;
                }
                Some(telemetry::Outcome::Failed) => {
                    tracing::warn!(imp = leader.host.imp(), "router: IMP self-report matched a signature but not its length, decode failed");
                    telemetry.note_unknown();
                    return;
                }
                None => {}
            }
            let mut out = Vec::new();
            for msg in opcode::parse_stream(payload) {
                conn.on_control_message(leader.host, msg, &mut out);
            }
            drain_ncp_outbound(out, actions);
        }
        ImpType::Regular => {
            let mut out = Vec::new();
            conn.on_data_message(leader.link, payload, &mut out);
            drain_ncp_outbound(out, actions);
        }
        ImpType::Rfnm => {
            tracing::debug!(imp = leader.host.imp(), link = leader.link, "router: RFNM received");
        }
        ImpType::Reset => {
            tracing::info!("router: IMP RESET received, resynchronizing");
            actions.push(Action::ResetFramer);
            conn.reset_to_listening();
            conn.arm_reset_nops();
        }
        ImpType::Dead => {
            tracing::warn!(
                imp = leader.host.imp(),
                reason = dead_reason(leader.subtype),
                "router: IMP reports DEAD host"
            );
        }
        other => {
            tracing::debug!(kind = %other, "router: message type logged, no action taken");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ncp::connection::NcpConfig;

    #[test]
    fn reset_resets_framer_and_arms_spaced_nops() {
        let mut conn = Connection::new(NcpConfig::default());
        let mut telemetry = Telemetry::new();
        let mut actions = Vec::new();
        let leader = ImpLeader {
            kind: ImpType::Reset as u8,
            flags: 0,
            host: HostAddress(1),
            link: 0,
            subtype: 0,
        };
        handle_message(&mut conn, &mut telemetry, leader, &[], &mut actions);

        // RESET itself resets the framer synchronously but does not emit
        // any NOPs yet — those are spaced one per tick (spec §4.3).
        assert!(actions.contains(&Action::ResetFramer));
        assert!(actions.iter().all(|a| !matches!(a, Action::SendImpMessage(_))));

        let nop = ImpLeader::nop().encode().to_vec();
        for expected_count in [1, 1, 1, 0] {
            let mut outbound = Vec::new();
            conn.tick(&mut outbound);
            let mut tick_actions = Vec::new();
            drain_ncp_outbound(outbound, &mut tick_actions);
            let nop_count = tick_actions
                .iter()
                .filter(|a| matches!(a, Action::SendImpMessage(m) if m == &nop))
                .count();
            assert_eq!(nop_count, expected_count);
        }
    }

    #[test]
    fn regular_link0_unparseable_control_stream_is_harmless() {
        let mut conn = Connection::new(NcpConfig::default());
        let mut telemetry = Telemetry::new();
        let mut actions = Vec::new();
        let leader = ImpLeader::regular(HostAddress(1), 0);
        handle_message(&mut conn, &mut telemetry, leader, &[0xFF], &mut actions);
        assert!(actions.is_empty());
    }

    #[test]
    fn regular_nonzero_link_with_no_connection_is_dropped() {
        let mut conn = Connection::new(NcpConfig::default());
        let mut telemetry = Telemetry::new();
        let mut actions = Vec::new();
        let leader = ImpLeader::regular(HostAddress(1), 9);
        handle_message(&mut conn, &mut telemetry, leader, b"hello", &mut actions);
        assert!(actions.is_empty());
    }
}
