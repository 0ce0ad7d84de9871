//! Telnet variant handling for the two ARPANET listen sockets (spec §4.4.5).
//!
//! Grounded on `waitsconnect.c`'s `process_old_telnet`/`process_new_telnet`
//! and `ncp.h`'s telnet command constants.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelnetVariant {
    Old,
    New,
}

const OMARK: u8 = 0o200;
const OBREAK: u8 = 0o201;
const ONOP: u8 = 0o202;
const ONOECHO: u8 = 0o203;
const OECHO: u8 = 0o204;
const OHIDE: u8 = 0o205;

/// Processes one inbound chunk of old-telnet (socket 1) bytes, appending the
/// bytes that should reach the console to `out`.
pub fn process_old(data: &[u8], out: &mut Vec<u8>) {
    let mut i = 0;
    while i < data.len() {
        let byte = data[i];
        match byte {
            0 => {}
            0o15 => {
                // CR: peek ahead for NUL (bare CR) or LF (CRLF already present).
                if i + 1 < data.len() {
                    match data[i + 1] {
                        0 => {
                            out.push(b'\r');
                            i += 1;
                        }
                        0o12 => {
                            out.extend_from_slice(b"\r\n");
                            i += 1;
                        }
                        _ => out.extend_from_slice(b"\r\n"),
                    }
                } else {
                    out.extend_from_slice(b"\r\n");
                }
            }
            OMARK | OBREAK | ONOP => {
                tracing::debug!(byte = format!("{byte:03o}"), "telnet(old): command byte");
            }
            ONOECHO => tracing::debug!("telnet(old): NOECHO requested"),
            OECHO => tracing::debug!("telnet(old): ECHO requested"),
            OHIDE => tracing::debug!("telnet(old): HIDE requested"),
            b if b < 0x80 => out.push(b),
            _ => {}
        }
        i += 1;
    }
}

const IAC: u8 = 0xFF;
const DO: u8 = 0xFD;
const DONT: u8 = 0xFE;
const WILL: u8 = 0xFB;
const WONT: u8 = 0xFC;
const EC: u8 = 0xF7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum IacState {
    #[default]
    Normal,
    GotIac,
    GotOption(u8),
}

/// RFC 854 IAC command-state processor for new telnet (socket 23). State
/// persists across calls since a command can straddle message boundaries.
#[derive(Debug, Clone, Default)]
pub struct NewTelnet {
    state: IacState,
}

impl NewTelnet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process(&mut self, data: &[u8], out: &mut Vec<u8>) {
        for &byte in data {
            self.state = match self.state {
                IacState::Normal => {
                    if byte == IAC {
                        IacState::GotIac
                    } else {
                        out.push(byte);
                        IacState::Normal
                    }
                }
                IacState::GotIac => {
                    if byte == IAC {
                        out.push(byte);
                        IacState::Normal
                    } else if matches!(byte, DO | DONT | WILL | WONT) {
                        IacState::GotOption(byte)
                    } else if byte == EC {
                        out.extend_from_slice(b"\x08 \x08");
                        IacState::Normal
                    } else {
                        tracing::debug!(byte = format!("{byte:03o}"), "telnet(new): IAC command");
                        IacState::Normal
                    }
                }
                IacState::GotOption(cmd) => {
                    tracing::debug!(
                        cmd = format!("{cmd:03o}"),
                        option = format!("{byte:03o}"),
                        "telnet(new): option negotiation"
                    );
                    IacState::Normal
                }
            };
        }
    }
}
