//! Frame header and data-frame body codecs.

use crate::maccommands::{parse_mac_commands, serialize_mac_commands, MacCommand};
use crate::types::DevAddr;
use crate::{Direction, Error};

/// Maximum number of bytes the encoded FOpts may occupy; the length has to
/// fit the 4-bit fOptsLen field of FCtrl.
const PIGGYBACK_MAC_COMMANDS_MAX_LEN: usize = 15;

/// FCtrl represents the frame-control byte of the FHDR.
///
/// Bit 4 carries FPending on downlink frames and the class-B flag on
/// uplink frames; the field matching the frame direction is the only one
/// ever set. The fOptsLen nibble is not represented here: it is computed
/// from the serialized FOpts on every encode.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FCtrl {
    pub adr: bool,
    pub adr_ack_req: bool,
    pub ack: bool,
    pub f_pending: bool,
    pub class_b: bool,
}

impl FCtrl {
    /// Parses the byte, interpreting bit 4 according to the direction.
    pub fn from_byte(b: u8, direction: Direction) -> FCtrl {
        FCtrl {
            adr: b & (1 << 7) != 0,
            adr_ack_req: b & (1 << 6) != 0,
            ack: b & (1 << 5) != 0,
            f_pending: !direction.is_uplink() && b & (1 << 4) != 0,
            class_b: direction.is_uplink() && b & (1 << 4) != 0,
        }
    }

    fn byte(&self, f_opts_len: usize, direction: Direction) -> u8 {
        let bit4 = if direction.is_uplink() { self.class_b } else { self.f_pending };
        u8::from(self.adr) << 7
            | u8::from(self.adr_ack_req) << 6
            | u8::from(self.ack) << 5
            | u8::from(bit4) << 4
            | f_opts_len as u8
    }
}

/// FOpts carries MAC commands piggy-backed in the frame header.
///
/// Decoding an FHDR stores the FOpts slice as raw bytes; turning them into
/// typed commands is the explicit [`FHDR::decode_f_opts`] step, because
/// command identifiers resolve differently per direction and may involve
/// the proprietary registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FOpts {
    /// Undecoded bytes, as sliced from the wire.
    Raw(Vec<u8>),
    /// A decoded command list.
    MacCommands(Vec<MacCommand>),
}

impl Default for FOpts {
    fn default() -> Self {
        FOpts::MacCommands(Vec::new())
    }
}

impl FOpts {
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            FOpts::Raw(bytes) => bytes.clone(),
            FOpts::MacCommands(cmds) => {
                let mut out = Vec::new();
                serialize_mac_commands(cmds, &mut out);
                out
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            FOpts::Raw(bytes) => bytes.is_empty(),
            FOpts::MacCommands(cmds) => cmds.is_empty(),
        }
    }
}

/// FHDR represents the frame header of a data frame.
///
/// `f_cnt` holds the full 32-bit frame counter: only its low 16 bits
/// travel on the wire, so after decoding a frame the upper half is zero
/// and the caller tracking the session counter must restore it before MIC
/// validation or payload decryption.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FHDR {
    pub dev_addr: DevAddr,
    pub f_ctrl: FCtrl,
    pub f_cnt: u32,
    pub f_opts: FOpts,
}

impl FHDR {
    pub fn to_bytes(&self, direction: Direction) -> Result<Vec<u8>, Error> {
        let opts = self.f_opts.to_bytes();
        if opts.len() > PIGGYBACK_MAC_COMMANDS_MAX_LEN {
            return Err(Error::FOptsTooLong);
        }
        let mut out = Vec::with_capacity(7 + opts.len());
        out.extend_from_slice(&self.dev_addr.to_bytes());
        out.push(self.f_ctrl.byte(opts.len(), direction));
        out.extend_from_slice(&(self.f_cnt as u16).to_le_bytes());
        out.extend_from_slice(&opts);
        Ok(out)
    }

    /// Decodes the FHDR from the front of `data`, returning it together
    /// with the number of bytes consumed.
    pub fn from_bytes(data: &[u8], direction: Direction) -> Result<(FHDR, usize), Error> {
        if data.len() < 7 {
            return Err(Error::BufferTooShort { field: "FHDR", expected: 7, got: data.len() });
        }
        let f_opts_len = (data[4] & 0x0f) as usize;
        if data.len() < 7 + f_opts_len {
            return Err(Error::BufferTooShort {
                field: "FHDR",
                expected: 7 + f_opts_len,
                got: data.len(),
            });
        }
        // zero FOpts bytes decode to zero commands unambiguously
        let f_opts = if f_opts_len == 0 {
            FOpts::default()
        } else {
            FOpts::Raw(data[7..7 + f_opts_len].to_vec())
        };
        let fhdr = FHDR {
            dev_addr: DevAddr::from_bytes(&data[0..4])?,
            f_ctrl: FCtrl::from_byte(data[4], direction),
            f_cnt: u32::from(u16::from_le_bytes([data[5], data[6]])),
            f_opts,
        };
        Ok((fhdr, 7 + f_opts_len))
    }

    /// Decodes raw FOpts bytes into typed MAC commands.
    pub fn decode_f_opts(&mut self, direction: Direction) -> Result<(), Error> {
        if let FOpts::Raw(bytes) = &self.f_opts {
            let cmds = parse_mac_commands(bytes, direction)?;
            self.f_opts = FOpts::MacCommands(cmds);
        }
        Ok(())
    }
}

/// FRMPayload is the application payload of a data frame: opaque bytes on
/// any port above zero, MAC commands on port zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FRMPayload {
    Data(Vec<u8>),
    MacCommands(Vec<MacCommand>),
}

impl FRMPayload {
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            FRMPayload::Data(bytes) => bytes.clone(),
            FRMPayload::MacCommands(cmds) => {
                let mut out = Vec::new();
                serialize_mac_commands(cmds, &mut out);
                out
            }
        }
    }
}

/// MACPayload is the body of a data frame: the frame header, the optional
/// port and the optional application payload.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MACPayload {
    pub fhdr: FHDR,
    pub f_port: Option<u8>,
    pub frm_payload: Option<FRMPayload>,
}

impl MACPayload {
    pub fn to_bytes(&self, direction: Direction) -> Result<Vec<u8>, Error> {
        self.validate_shape()?;
        let mut out = self.fhdr.to_bytes(direction)?;
        if let Some(port) = self.f_port {
            out.push(port);
        }
        if let Some(frm) = &self.frm_payload {
            out.extend_from_slice(&frm.to_bytes());
        }
        Ok(out)
    }

    fn validate_shape(&self) -> Result<(), Error> {
        match (self.f_port, &self.frm_payload) {
            (Some(_), None) => {
                return Err(Error::InvalidShape("fPort must not be set when FRMPayload is empty"))
            }
            (None, Some(_)) => {
                return Err(Error::InvalidShape("fPort must be set when FRMPayload is set"))
            }
            _ => {}
        }
        if let Some(FRMPayload::MacCommands(_)) = self.frm_payload {
            if self.f_port != Some(0) {
                return Err(Error::InvalidShape(
                    "fPort must be 0 when FRMPayload contains MAC commands",
                ));
            }
            if !self.fhdr.f_opts.is_empty() {
                return Err(Error::InvalidShape(
                    "MAC commands are allowed in either FOpts or FRMPayload, not both",
                ));
            }
        }
        Ok(())
    }

    pub fn from_bytes(data: &[u8], direction: Direction) -> Result<MACPayload, Error> {
        let (fhdr, consumed) = FHDR::from_bytes(data, direction)?;
        let rest = &data[consumed..];
        let (f_port, frm_payload) = match rest.len() {
            0 => (None, None),
            1 => return Err(Error::InvalidShape("fPort present without FRMPayload bytes")),
            _ => (Some(rest[0]), Some(FRMPayload::Data(rest[1..].to_vec()))),
        };
        Ok(MACPayload { fhdr, f_port, frm_payload })
    }

    /// The serialized FRMPayload, as fed to the payload cipher.
    pub(crate) fn frm_payload_bytes(&self) -> Vec<u8> {
        self.frm_payload.as_ref().map(|frm| frm.to_bytes()).unwrap_or_default()
    }

    /// Decodes an opaque FRMPayload into MAC commands. Only valid on port
    /// zero, after decryption when the frame was encrypted.
    pub fn decode_frm_payload(&mut self, direction: Direction) -> Result<(), Error> {
        if self.f_port != Some(0) {
            return Err(Error::InvalidShape("FRMPayload carries MAC commands only when fPort is 0"));
        }
        if let Some(FRMPayload::Data(bytes)) = &self.frm_payload {
            let cmds = parse_mac_commands(bytes, direction)?;
            self.frm_payload = Some(FRMPayload::MacCommands(cmds));
        }
        Ok(())
    }
}
