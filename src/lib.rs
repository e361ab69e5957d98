//! This crate implements LoRaWAN 1.0/1.1 PHY payload handling: parsing and
//! building the over-the-air frame family (data, join-request, join-accept,
//! rejoin-request, proprietary), the four MIC flavours, FRMPayload
//! encryption and the MAC-command layer.
//!
//! Frames are owned value trees: decode a byte slice into a
//! [`phy::PhyPayload`], inspect or modify it, and encode it back. Encoding
//! and decoding are symmetric, so `parse` followed by `to_vec` reproduces
//! the input bytes. All key material is supplied by the caller on every
//! call; nothing is cached.
//!
//! # Examples
//!
//! ```
//! use lorawan_codec::keys::AES128Key;
//! use lorawan_codec::phy::{parse, Payload};
//! use lorawan_codec::macpayload::FRMPayload;
//!
//! let data = vec![
//!     0x40, 0x04, 0x03, 0x02, 0x01, 0x80, 0x01, 0x00, 0x01, 0xa6, 0x94,
//!     0x64, 0x26, 0x15, 0xd6, 0xc3, 0xb5, 0x82,
//! ];
//! let mut phy = parse(&data).unwrap();
//! let nwk_s_key = AES128Key::from([2; 16]);
//! let app_s_key = AES128Key::from([1; 16]);
//! assert!(phy.validate_mic(&nwk_s_key).unwrap());
//! phy.decrypt_frm_payload(&app_s_key).unwrap();
//! if let Payload::MacPayload(mac) = &phy.payload {
//!     if let Some(FRMPayload::Data(bytes)) = &mac.frm_payload {
//!         println!("{}", String::from_utf8_lossy(bytes));
//!     }
//! }
//! ```
#![allow(clippy::upper_case_acronyms)]

pub mod join;
pub mod keys;
pub mod maccommands;
pub mod macpayload;
pub mod phy;
pub mod types;

mod securityhelpers;

pub use phy::parse;

/// Direction of travel of a frame, threaded as explicit context through
/// every operation whose interpretation depends on it: FCtrl bit 4,
/// MAC-command identifier resolution and the crypto pseudo-headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// End-device to network.
    Uplink,
    /// Network to end-device.
    Downlink,
}

impl Direction {
    /// The direction byte used in the MIC and encryption blocks.
    pub fn byte(self) -> u8 {
        match self {
            Direction::Uplink => 0,
            Direction::Downlink => 1,
        }
    }

    /// Whether this is the uplink direction.
    pub fn is_uplink(self) -> bool {
        self == Direction::Uplink
    }
}

/// Errors returned by the encoding, decoding and crypto operations.
///
/// A MIC mismatch is reported as `false` from the `validate_mic` methods,
/// never as an error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The input does not have the exact length the wire format requires.
    #[error("invalid {field} length: expected {expected} bytes, got {got}")]
    InvalidLength {
        field: &'static str,
        expected: usize,
        got: usize,
    },

    /// The input ended before the structure it announces.
    #[error("invalid {field} length: expected at least {expected} bytes, got {got}")]
    BufferTooShort {
        field: &'static str,
        expected: usize,
        got: usize,
    },

    /// A MAC-command stream announces a payload the remaining bytes cannot
    /// hold.
    #[error("not enough remaining bytes")]
    NotEnoughBytes,

    /// A field value is outside the range the wire format can carry.
    #[error("{0}")]
    InvalidFieldValue(&'static str),

    /// The combination of fields violates the frame shape rules.
    #[error("{0}")]
    InvalidShape(&'static str),

    /// The serialized FOpts do not fit the 4-bit fOptsLen field.
    #[error("max number of FOpts bytes is 15")]
    FOptsTooLong,

    /// Join-accept encryption operates on whole AES blocks only.
    #[error("payload length must be a multiple of 16")]
    NotBlockAligned,

    /// The MHDR major version bits are not LoRaWANR1.
    #[error("unsupported major version")]
    UnsupportedMajorVersion,

    /// A textual form is not valid hex of the right width.
    #[error("invalid {0} text representation")]
    InvalidText(&'static str),

    /// Proprietary MAC commands live in the 0x80..=0xFF identifier space.
    #[error("proprietary CIDs must be in 0x80..=0xFF, got {cid:#04x}")]
    InvalidProprietaryCid { cid: u8 },

    /// JSON encoding or decoding failed.
    #[error("json: {0}")]
    Json(String),
}
