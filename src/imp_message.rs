//! The 1822 leader and the IMP message it prefixes (spec §3).
//!
//! Grounded on `imp.c`'s `type_name[]` table and its leader byte offsets
//! (`packet[0]` type/flags nibble, `packet[1]` host, `packet[2]` link,
//! `packet[3]` subtype).

use std::fmt;

use crate::address::HostAddress;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImpType {
    Regular = 0,
    LeaderError = 1,
    Down = 2,
    Blocked = 3,
    Nop = 4,
    Rfnm = 5,
    Full = 6,
    Dead = 7,
    DataError = 8,
    Incompl = 9,
    Reset = 10,
}

impl ImpType {
    pub fn name(self) -> &'static str {
        match self {
            Self::Regular => "REGULAR",
            Self::LeaderError => "LEADER_ERROR",
            Self::Down => "DOWN",
            Self::Blocked => "BLOCKED",
            Self::Nop => "NOP",
            Self::Rfnm => "RFNM",
            Self::Full => "FULL",
            Self::Dead => "DEAD",
            Self::DataError => "DATA_ERROR",
            Self::Incompl => "INCOMPL",
            Self::Reset => "RESET",
        }
    }
}

impl fmt::Display for ImpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An unrecognized 4-bit leader type (11-15 are reserved/unused by this
/// system; the original labels them "???").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownImpType(pub u8);

impl TryFrom<u8> for ImpType {
    type Error = UnknownImpType;

    fn try_from(nibble: u8) -> Result<Self, Self::Error> {
        match nibble {
            0 => Ok(Self::Regular),
            1 => Ok(Self::LeaderError),
            2 => Ok(Self::Down),
            3 => Ok(Self::Blocked),
            4 => Ok(Self::Nop),
            5 => Ok(Self::Rfnm),
            6 => Ok(Self::Full),
            7 => Ok(Self::Dead),
            8 => Ok(Self::DataError),
            9 => Ok(Self::Incompl),
            10 => Ok(Self::Reset),
            other => Err(UnknownImpType(other)),
        }
    }
}

/// The 4-octet 1822 leader: `type(4 bits) | flags(4 bits) | host | link | subtype`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImpLeader {
    pub kind: u8,
    pub flags: u8,
    pub host: HostAddress,
    pub link: u8,
    pub subtype: u8,
}

impl ImpLeader {
    pub fn regular(host: HostAddress, link: u8) -> Self {
        Self {
            kind: ImpType::Regular as u8,
            flags: 0,
            host,
            link,
            subtype: 0,
        }
    }

    pub fn nop() -> Self {
        Self {
            kind: ImpType::Nop as u8,
            flags: 0,
            host: HostAddress(0),
            link: 0,
            subtype: 0,
        }
    }

    pub fn parsed_type(self) -> Result<ImpType, UnknownImpType> {
        ImpType::try_from(self.kind)
    }

    /// Decodes a leader from the first four octets of a reassembled payload.
    pub fn decode(bytes: &[u8; 4]) -> Self {
        Self {
            kind: bytes[0] & 0x0F,
            flags: (bytes[0] >> 4) & 0x0F,
            host: HostAddress(bytes[1]),
            link: bytes[2],
            subtype: bytes[3],
        }
    }

    pub fn encode(self) -> [u8; 4] {
        [
            (self.kind & 0x0F) | ((self.flags & 0x0F) << 4),
            self.host.octet(),
            self.link,
            self.subtype,
        ]
    }
}

/// `DEAD` subtypes named by the original (spec §4.3).
pub fn dead_reason(subtype: u8) -> &'static str {
    match subtype {
        0 => "IMP unreachable",
        1 => "host not up",
        3 => "communication prohibited",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leader_round_trips() {
        let leader = ImpLeader {
            kind: ImpType::Regular as u8,
            flags: 0,
            host: HostAddress(0o105),
            link: 7,
            subtype: 0,
        };
        let bytes = leader.encode();
        assert_eq!(ImpLeader::decode(&bytes), leader);
    }

    #[test]
    fn unknown_type_is_reported() {
        assert_eq!(ImpType::try_from(12), Err(UnknownImpType(12)));
    }

    #[test]
    fn dead_reasons_match_spec() {
        assert_eq!(dead_reason(0), "IMP unreachable");
        assert_eq!(dead_reason(1), "host not up");
        assert_eq!(dead_reason(3), "communication prohibited");
        assert_eq!(dead_reason(9), "unknown");
    }
}
