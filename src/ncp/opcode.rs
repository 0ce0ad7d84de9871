//! NCP opcode set and per-opcode wire bodies (spec §4.4.1).
//!
//! Grounded on `ncp.c`'s `process_ncp_control` (per-opcode byte counts, and
//! the "opcodes 5-8 are recognized but consume no body and are not acted
//! upon" behavior inherited from its `default:` match arm) and
//! `waitsconnect.c`'s `send_rts`/`send_str`/`send_cls`/`send_all` (exact
//! field layout and byte order); teacher's `core::op_code::OpCode` +
//! `core::request`/`response.rs` tagged-variant-with-payload-struct pattern.

use crate::codec::{CodecError, Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownOpcode(pub u8);

/// Request To Send: the remote socket's address and the link it wants to
/// use, naming the local socket it is addressing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rts {
    pub remote_socket: u32,
    pub local_socket: u32,
    pub link: u8,
}

impl Rts {
    pub const LEN: usize = 9;
}

impl Deserialize for Rts {
    fn deserialize(data: &mut Deserializer<'_>) -> crate::codec::Result<Self> {
        Ok(Self {
            remote_socket: data.deserialize()?,
            local_socket: data.deserialize()?,
            link: data.deserialize()?,
        })
    }
}

impl Serialize for Rts {
    fn serialize<const S: usize>(self, buffer: Serializer<S>) -> crate::codec::Result<Serializer<S>> {
        buffer
            .serialize(self.remote_socket)?
            .serialize(self.local_socket)?
            .serialize(self.link)
    }
}

/// Sender To Receiver: declares a socket's byte size (8 for data, 32 during
/// ICP to exchange the allocated data-socket number).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Str {
    pub remote_socket: u32,
    pub local_socket: u32,
    pub byte_size: u8,
}

impl Str {
    pub const LEN: usize = 9;
}

impl Deserialize for Str {
    fn deserialize(data: &mut Deserializer<'_>) -> crate::codec::Result<Self> {
        Ok(Self {
            remote_socket: data.deserialize()?,
            local_socket: data.deserialize()?,
            byte_size: data.deserialize()?,
        })
    }
}

impl Serialize for Str {
    fn serialize<const S: usize>(self, buffer: Serializer<S>) -> crate::codec::Result<Serializer<S>> {
        buffer
            .serialize(self.remote_socket)?
            .serialize(self.local_socket)?
            .serialize(self.byte_size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cls {
    pub remote_socket: u32,
    pub local_socket: u32,
}

impl Cls {
    pub const LEN: usize = 8;
}

impl Deserialize for Cls {
    fn deserialize(data: &mut Deserializer<'_>) -> crate::codec::Result<Self> {
        Ok(Self {
            remote_socket: data.deserialize()?,
            local_socket: data.deserialize()?,
        })
    }
}

impl Serialize for Cls {
    fn serialize<const S: usize>(self, buffer: Serializer<S>) -> crate::codec::Result<Serializer<S>> {
        buffer.serialize(self.remote_socket)?.serialize(self.local_socket)
    }
}

/// Allocate: grants `messages` further sends and `bits` of space on `link`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct All {
    pub link: u8,
    pub messages: u16,
    pub bits: u32,
}

impl All {
    pub const LEN: usize = 7;
}

impl Deserialize for All {
    fn deserialize(data: &mut Deserializer<'_>) -> crate::codec::Result<Self> {
        Ok(Self {
            link: data.deserialize()?,
            messages: data.deserialize()?,
            bits: data.deserialize()?,
        })
    }
}

impl Serialize for All {
    fn serialize<const S: usize>(self, buffer: Serializer<S>) -> crate::codec::Result<Serializer<S>> {
        buffer
            .serialize(self.link)?
            .serialize(self.messages)?
            .serialize(self.bits)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eco {
    pub data: u8,
}

impl Eco {
    pub const LEN: usize = 1;
}

impl Deserialize for Eco {
    fn deserialize(data: &mut Deserializer<'_>) -> crate::codec::Result<Self> {
        Ok(Self { data: data.deserialize()? })
    }
}

impl Serialize for Eco {
    fn serialize<const S: usize>(self, buffer: Serializer<S>) -> crate::codec::Result<Serializer<S>> {
        buffer.serialize(self.data)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Erp {
    pub data: u8,
}

impl Erp {
    pub const LEN: usize = 1;
}

impl Deserialize for Erp {
    fn deserialize(data: &mut Deserializer<'_>) -> crate::codec::Result<Self> {
        Ok(Self { data: data.deserialize()? })
    }
}

impl Serialize for Erp {
    fn serialize<const S: usize>(self, buffer: Serializer<S>) -> crate::codec::Result<Serializer<S>> {
        buffer.serialize(self.data)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrMsg {
    pub code: u8,
    pub data: [u8; 10],
}

impl ErrMsg {
    pub const LEN: usize = 11;
}

impl Deserialize for ErrMsg {
    fn deserialize(data: &mut Deserializer<'_>) -> crate::codec::Result<Self> {
        Ok(Self {
            code: data.deserialize()?,
            data: data.deserialize()?,
        })
    }
}

impl Serialize for ErrMsg {
    fn serialize<const S: usize>(self, buffer: Serializer<S>) -> crate::codec::Result<Serializer<S>> {
        buffer.serialize(self.code)?.serialize(self.data)
    }
}

/// One parsed control-stream entry. `Gvb`/`Ret`/`Inr`/`Ins` carry no body in
/// this core: they are recognized opcodes, accepted, and otherwise ignored
/// (spec §4.4.1 row 5-8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NcpMessage {
    Nop,
    Rts(Rts),
    Str(Str),
    Cls(Cls),
    All(All),
    Gvb,
    Ret,
    Inr,
    Ins,
    Eco(Eco),
    Erp(Erp),
    Err(ErrMsg),
    Rst,
    Rrp,
}

impl NcpMessage {
    pub fn opcode(&self) -> u8 {
        match self {
            Self::Nop => 0,
            Self::Rts(_) => 1,
            Self::Str(_) => 2,
            Self::Cls(_) => 3,
            Self::All(_) => 4,
            Self::Gvb => 5,
            Self::Ret => 6,
            Self::Inr => 7,
            Self::Ins => 8,
            Self::Eco(_) => 9,
            Self::Erp(_) => 10,
            Self::Err(_) => 11,
            Self::Rst => 12,
            Self::Rrp => 13,
        }
    }
}

/// Parses one opcode + body from the front of `data`, advancing past it.
/// Returns `Ok(None)` only if `data` is exhausted (no opcode byte left).
pub fn parse_one(data: &mut Deserializer<'_>) -> Result<Option<NcpMessage>, UnknownOpcode> {
    if data.is_empty() {
        return Ok(None);
    }
    let opcode: u8 = data.deserialize().expect("checked non-empty above");
    let msg = match opcode {
        0 => NcpMessage::Nop,
        1 => NcpMessage::Rts(data.deserialize().map_err(|_| UnknownOpcode(opcode))?),
        2 => NcpMessage::Str(data.deserialize().map_err(|_| UnknownOpcode(opcode))?),
        3 => NcpMessage::Cls(data.deserialize().map_err(|_| UnknownOpcode(opcode))?),
        4 => NcpMessage::All(data.deserialize().map_err(|_| UnknownOpcode(opcode))?),
        5 => NcpMessage::Gvb,
        6 => NcpMessage::Ret,
        7 => NcpMessage::Inr,
        8 => NcpMessage::Ins,
        9 => NcpMessage::Eco(data.deserialize().map_err(|_| UnknownOpcode(opcode))?),
        10 => NcpMessage::Erp(data.deserialize().map_err(|_| UnknownOpcode(opcode))?),
        11 => NcpMessage::Err(data.deserialize().map_err(|_| UnknownOpcode(opcode))?),
        12 => NcpMessage::Rst,
        13 => NcpMessage::Rrp,
        other => return Err(UnknownOpcode(other)),
    };
    Ok(Some(msg))
}

/// Parses every message in a control stream, left to right, stopping (per
/// spec §4.4.6) at the first unknown opcode or truncated body.
pub fn parse_stream(bytes: &[u8]) -> Vec<NcpMessage> {
    let mut de = Deserializer::new(bytes);
    let mut out = Vec::new();
    loop {
        match parse_one(&mut de) {
            Ok(Some(msg)) => out.push(msg),
            Ok(None) => break,
            Err(UnknownOpcode(op)) => {
                tracing::warn!(opcode = op, "ncp: unknown opcode or truncated body, stopping");
                break;
            }
        }
    }
    out
}

/// Encodes a single NCP message's opcode byte followed by its body.
pub fn encode_one<const S: usize>(msg: NcpMessage) -> Result<heapless::Vec<u8, S>, CodecError> {
    let mut buf = heapless::Vec::new();
    let ser = Serializer::new(&mut buf);
    match msg {
        NcpMessage::Nop => ser.serialize(msg.opcode())?,
        NcpMessage::Rts(body) => ser.serialize(msg.opcode())?.serialize(body)?,
        NcpMessage::Str(body) => ser.serialize(msg.opcode())?.serialize(body)?,
        NcpMessage::Cls(body) => ser.serialize(msg.opcode())?.serialize(body)?,
        NcpMessage::All(body) => ser.serialize(msg.opcode())?.serialize(body)?,
        NcpMessage::Gvb | NcpMessage::Ret | NcpMessage::Inr | NcpMessage::Ins => {
            ser.serialize(msg.opcode())?
        }
        NcpMessage::Eco(body) => ser.serialize(msg.opcode())?.serialize(body)?,
        NcpMessage::Erp(body) => ser.serialize(msg.opcode())?.serialize(body)?,
        NcpMessage::Err(body) => ser.serialize(msg.opcode())?.serialize(body)?,
        NcpMessage::Rst => ser.serialize(msg.opcode())?,
        NcpMessage::Rrp => ser.serialize(msg.opcode())?,
    };
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rts_then_stops_on_unknown() {
        let mut body = vec![1u8]; // RTS opcode
        body.extend_from_slice(&99u32.to_be_bytes()); // remote
        body.extend_from_slice(&42u32.to_be_bytes()); // local
        body.push(7); // link
        body.push(0xEE); // unknown opcode
        body.push(2u8); // STR opcode (should not be parsed)

        let parsed = parse_stream(&body);
        assert_eq!(
            parsed,
            vec![NcpMessage::Rts(Rts {
                remote_socket: 99,
                local_socket: 42,
                link: 7
            })]
        );
    }

    #[test]
    fn gvb_ret_inr_ins_consume_no_body() {
        let body = vec![5u8, 6, 7, 8, 0 /* NOP */];
        let parsed = parse_stream(&body);
        assert_eq!(
            parsed,
            vec![
                NcpMessage::Gvb,
                NcpMessage::Ret,
                NcpMessage::Inr,
                NcpMessage::Ins,
                NcpMessage::Nop
            ]
        );
    }

    #[test]
    fn all_round_trips() {
        let all = All {
            link: 7,
            messages: 4,
            bits: 256,
        };
        let buf: heapless::Vec<u8, 16> = encode_one(NcpMessage::All(all)).unwrap();
        let parsed = parse_stream(&buf);
        assert_eq!(parsed, vec![NcpMessage::All(all)]);
    }
}
