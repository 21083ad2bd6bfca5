//! # secc-core
//!
//! An EVSE-side (charging station) session engine for ISO 15118-2 DC fast
//! charging: SECC Discovery Protocol (SDP) over UDP multicast, V2GTP frame
//! transport, and the TCP-carried EXI-body session state machine that
//! drives a charge session from handshake through `SessionStop`.
//!
//! The crate is organized as a thin, single-threaded `mio` event loop
//! (`server`) dispatching into a pure, socket-agnostic session engine
//! (`session`) that decodes and encodes messages through the wire codec
//! facade (`exi`) over frames delimited by `v2gtp`.
//!
//! ## Layout
//!
//! - [`v2gtp`]: the 8-byte V2G Transfer Protocol frame header.
//! - [`sdp`]: discovery-request validation and response construction.
//! - [`exi`]: the EXI document codec facade (handshake + ISO message body).
//! - [`session`]: the per-connection state machine, independent of I/O.
//! - [`config`]: immutable station configuration.
//! - [`rand_source`]: session-ID random byte source.
//! - [`server`]: the `mio`-driven event loop wiring everything to sockets.
//! - [`error`]: crate-wide error types.

pub mod config;
pub mod error;
pub mod exi;
pub mod rand_source;
pub mod sdp;
pub mod server;
pub mod session;
pub mod v2gtp;

pub use config::StationConfig;
pub use error::{CodecError, FramingError, SeccError};
pub use session::Session;
