//! Crate-wide error types.

use thiserror::Error;

/// Errors surfaced by V2GTP header framing.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramingError {
    /// Buffer too short to contain a full 8-byte V2GTP header.
    #[error("buffer too short for V2GTP header: {0} bytes")]
    HeaderTooShort(usize),
    /// The version/inverted-version byte pair did not match `0x01 0xFE`.
    #[error("bad V2GTP magic/version bytes: {0:#04x} {1:#04x}")]
    BadMagic(u8, u8),
    /// Destination buffer too small to hold the header being written.
    #[error("buffer too small to write V2GTP header: need 8, have {0}")]
    WriteBufferTooSmall(usize),
    /// Declared payload length does not match the bytes actually present.
    #[error("declared payload length {declared} does not match available {available} bytes")]
    LengthMismatch { declared: u32, available: usize },
}

/// Errors surfaced by the EXI document codec facade.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Ran past the end of the input stream while decoding.
    #[error("unexpected end of stream at offset {0}")]
    UnexpectedEof(usize),
    /// A string field exceeded its schema-defined maximum length.
    #[error("string field {field} exceeds maximum length {max}")]
    StringTooLong { field: &'static str, max: usize },
    /// A physical-value multiplier fell outside the ISO 15118-2 range.
    #[error("physical value multiplier {0} out of range -3..=3")]
    MultiplierOutOfRange(i8),
    /// An enum discriminant had no known mapping.
    #[error("unknown discriminant {value} for {field}")]
    UnknownDiscriminant { field: &'static str, value: u32 },
    /// The output buffer ran out of room while encoding.
    #[error("output buffer exhausted while encoding {0}")]
    BufferTooSmall(&'static str),
    /// The decoded document did not carry a recognized body variant.
    #[error("document carried no recognized body")]
    EmptyBody,
}

/// Top-level crate error.
#[derive(Error, Debug)]
pub enum SeccError {
    /// Underlying I/O failure (bind, accept, read, write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// V2GTP framing failure.
    #[error("framing error: {0}")]
    Framing(#[from] FramingError),
    /// EXI document codec failure.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    /// The named network interface has no link-local IPv6 address.
    #[error("interface {0:?} has no link-local IPv6 address")]
    NoLinkLocalAddress(String),
    /// The random-byte source could not be initialized.
    #[error("random source initialization failed: {0}")]
    RandomSourceInit(std::io::Error),
    /// An ISO body frame arrived while `handshake_pending` was still
    /// true; per `spec.md` §3 this is a fatal session error.
    #[error("expected application-handshake frame, got a different payload type while handshake is pending")]
    HandshakeExpected,
}

pub type Result<T> = std::result::Result<T, SeccError>;
