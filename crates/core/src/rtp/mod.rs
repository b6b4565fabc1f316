//! RTP wire format (RFC 3550 §5.1).
//!
//! [`Header`] and [`Packet`] marshal to and unmarshal from network byte
//! order. Unmarshalled values own their bytes; nothing borrows from the
//! input buffer once parsing returns.

pub mod extension;
pub mod header;
pub mod packet;
pub mod padding;

pub use header::Header;
pub use packet::Packet;
pub use padding::PaddingTrailer;

/// RTP protocol version written into every header.
pub const VERSION: u8 = 2;
