//! 1973-era Throughput (type 0302, 106 bytes / 53 words): same shape as the
//! 1976 throughput record but without the three background-count words.

use super::word_at;

pub const LEN: usize = 106;

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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throughput1973 {
    pub modems: [ModemPair; 5],
    pub hosts: [HostBlock; 4],
    pub checksum: u16,
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

/// `bytes.len()` must equal [`LEN`].
pub fn decode(bytes: &[u8]) -> Throughput1973 {
    let mut modems = [ModemPair { packets_out: 0, words_out: 0 }; 5];
    for (i, m) in modems.iter_mut().enumerate() {
        m.packets_out = word_at(bytes, 1 + 2 * i);
        m.words_out = word_at(bytes, 2 + 2 * i);
    }
    let hosts = [
        host_block(bytes, 11),
        host_block(bytes, 21),
        host_block(bytes, 31),
        host_block(bytes, 41),
    ];
    Throughput1973 {
        modems,
        hosts,
        checksum: word_at(bytes, 51),
    }
}
