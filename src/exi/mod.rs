//! Wire Codec Facade.
//!
//! A thin contract over the (externally-owned, per `spec.md` §1) EXI
//! codec: this module hides the stream cursor and offers decode/encode
//! for the two document families exchanged over the wire — the
//! application-handshake documents and the ISO 15118-2 message documents.
//!
//! No published Rust crate implements ISO 15118-2 EXI encoding, so these
//! functions are backed by a self-contained, deterministic binary codec
//! (see [`stream`], [`handshake`], [`iso`]) rather than a conformant EXI
//! bitstream. The facade's signatures match `spec.md` §4.1 exactly, so a
//! genuine EXI implementation could be dropped in behind the same four
//! operations without touching the session engine.

pub mod handshake;
pub mod iso;
mod stream;

pub use handshake::HandshakeDoc;
pub use iso::V2GMessage;

use crate::error::CodecError;

/// Decode an application-handshake document from `buf`.
pub fn decode_handshake(buf: &[u8]) -> Result<HandshakeDoc, CodecError> {
    handshake::decode(buf)
}

/// Encode an application-handshake document into `buf` starting at byte
/// offset `at`, returning the number of bytes written.
pub fn encode_handshake(buf: &mut [u8], at: usize, doc: &HandshakeDoc) -> Result<usize, CodecError> {
    handshake::encode(buf, at, doc)
}

/// Decode an ISO 15118-2 `V2G_Message` document from `buf`.
pub fn decode_iso(buf: &[u8]) -> Result<V2GMessage, CodecError> {
    iso::decode(buf)
}

/// Encode an ISO 15118-2 `V2G_Message` document into `buf` starting at
/// byte offset `at`, returning the number of bytes written.
pub fn encode_iso(buf: &mut [u8], at: usize, doc: &V2GMessage) -> Result<usize, CodecError> {
    iso::encode(buf, at, doc)
}
