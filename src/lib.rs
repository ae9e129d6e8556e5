/*!

A pure-Rust implementation of Apple Wireless Direct Link (AWDL), the
proprietary peer-to-peer Wi-Fi protocol underlying AirDrop, Handoff, and
GameKit. This crate implements the wire codec, channel/sync/election
state machines, frame TX/RX, and the cooperative event loop; platform
specifics (capture/injection, monitor mode, TAP devices, neighbor-table
manipulation) are pushed behind the traits in [`io`] so the core stays
portable.

See `awdld` (`src/bin/awdld.rs`) for the daemon binary.
*/

pub mod cbuf;
pub mod channel;
pub mod config;
pub mod daemon;
pub mod election;
pub mod error;
pub mod frame;
pub mod io;
pub mod peer;
pub mod radiotap;
pub mod rx;
pub mod schedule;
pub mod state;
pub mod sync;
pub mod tx;
pub mod wire;

pub use config::Config;
pub use error::AwdlError;
pub use state::State;
