//! Network Control Program: ICP handshake, per-connection data transfer,
//! and the two telnet variants it bridges to the console (spec §3, §4.4).

pub mod connection;
pub mod opcode;
pub mod telnet;

pub use connection::{Connection, ConnState, NcpConfig, Outbound};
pub use opcode::{parse_stream, NcpMessage};
