//! A Host/IMP interface and Network Control Program (NCP) implementation
//! for an emulated ARPANET IMP.
//!
//! This crate owns three layers:
//!
//! - the **Host/IMP framing** layer (`framer`, `transport`, `imp_message`):
//!   the 1822 leader and the UDP envelope that carries it between a host
//!   process and an IMP emulator;
//! - the **NCP engine** (`ncp`): the Initial Connection Protocol handshake,
//!   per-connection flow control, and the two telnet variants it bridges to
//!   a downstream console (`console`);
//! - the **IMP telemetry decoder** (`telemetry`): the self-report Status/
//!   Throughput/Trouble-Report formats an IMP emits on link 0.
//!
//! `router` ties the three together; `event_loop` drives them from a single
//! cooperative task (no thread or task is spawned by this crate — see the
//! module's doc comment for why).

pub mod address;
pub mod codec;
pub mod config;
pub mod console;
pub mod error;
pub mod event_loop;
pub mod framer;
pub mod imp_message;
pub mod ncp;
pub mod router;
pub mod telemetry;
pub mod transport;

pub use address::HostAddress;
pub use config::Config;
pub use error::Error;
pub use event_loop::EventLoop;
