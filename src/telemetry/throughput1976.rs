//! 1976-era Throughput report (word-3 type code 302, 118 bytes / 59 words).
//!
//! Word indices below are 0-based (`word_at`'s convention); `ncp.c`'s
//! comments number words from 1, so "word 4" there is index 3 here.

use super::word_at;

pub const LEN: usize = 118;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModemPair {
    pub packets_out: u16,
    pub words_out: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostBlock {
    pub mess_to_net: u16,
    pub mess_from_net: u16,
    pub packet_to_net: u16,
    pub packet_from_net: u16,
    pub local_mess_sent: u16,
    pub local_mess_rcvd: u16,
    pub local_packet_sent: u16,
    pub local_packet_rcvd: u16,
    pub words_to_net: u16,
    pub words_from_net: u16,
}

fn host_block(bytes: &[u8], base_word: usize) -> HostBlock {
    HostBlock {
        mess_to_net: word_at(bytes, base_word),
        mess_from_net: word_at(bytes, base_word + 1),
        packet_to_net: word_at(bytes, base_word + 2),
        packet_from_net: word_at(bytes, base_word + 3),
        local_mess_sent: word_at(bytes, base_word + 4),
        local_mess_rcvd: word_at(bytes, base_word + 5),
        local_packet_sent: word_at(bytes, base_word + 6),
        local_packet_rcvd: word_at(bytes, base_word + 7),
        words_to_net: word_at(bytes, base_word + 8),
        words_from_net: word_at(bytes, base_word + 9),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throughput1976 {
    pub modems: [ModemPair; 5],
    pub hosts: [HostBlock; 4],
    pub background_counts: [u16; 3],
    pub checksum: u16,
}

/// `bytes.len()` must equal [`LEN`].
pub fn decode(bytes: &[u8]) -> Throughput1976 {
    let mut modems = [ModemPair { packets_out: 0, words_out: 0 }; 5];
    for (i, m) in modems.iter_mut().enumerate() {
        m.packets_out = word_at(bytes, 3 + 2 * i);
        m.words_out = word_at(bytes, 4 + 2 * i);
    }
    let hosts = [
        host_block(bytes, 13),
        host_block(bytes, 23),
        host_block(bytes, 33),
        host_block(bytes, 43),
    ];
    Throughput1976 {
        modems,
        hosts,
        background_counts: [word_at(bytes, 53), word_at(bytes, 54), word_at(bytes, 55)],
        checksum: word_at(bytes, 56),
    }
}
