//! The PHY payload orchestrator: MHDR dispatch, MIC operations, payload
//! encryption and the JSON codec.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::join::{
    JoinAcceptPayload, JoinRequestPayload, RejoinRequestType02Payload, RejoinRequestType1Payload,
};
use crate::keys::{AES128Key, MIC};
use crate::maccommands::{payload_size, MacCommand, MacCommandIterator};
use crate::macpayload::{FCtrl, FOpts, FRMPayload, MACPayload};
use crate::securityhelpers;
use crate::types::DevAddr;
use crate::{Direction, Error};

/// MType gives the possible message types of the PhyPayload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum MType {
    JoinRequest,
    JoinAccept,
    UnconfirmedDataUp,
    UnconfirmedDataDown,
    ConfirmedDataUp,
    ConfirmedDataDown,
    RejoinRequest,
    Proprietary,
}

impl MType {
    fn byte(self) -> u8 {
        match self {
            MType::JoinRequest => 0,
            MType::JoinAccept => 1,
            MType::UnconfirmedDataUp => 2,
            MType::UnconfirmedDataDown => 3,
            MType::ConfirmedDataUp => 4,
            MType::ConfirmedDataDown => 5,
            MType::RejoinRequest => 6,
            MType::Proprietary => 7,
        }
    }

    /// Whether this type is one of the four data-frame types.
    pub fn is_data(self) -> bool {
        matches!(
            self,
            MType::UnconfirmedDataUp
                | MType::UnconfirmedDataDown
                | MType::ConfirmedDataUp
                | MType::ConfirmedDataDown
        )
    }
}

/// The direction a data frame of the given type travels. `None` for the
/// non-data types (proprietary bodies are opaque, join traffic never
/// parses direction-dependent fields).
fn data_direction(m_type: MType) -> Option<Direction> {
    match m_type {
        MType::UnconfirmedDataUp | MType::ConfirmedDataUp => Some(Direction::Uplink),
        MType::UnconfirmedDataDown | MType::ConfirmedDataDown => Some(Direction::Downlink),
        _ => None,
    }
}

/// Major gives the supported LoRaWAN payload formats. Only LoRaWANR1 is
/// defined; other major bits fail to decode.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Major {
    #[default]
    LoRaWANR1,
}

/// MHDR represents the LoRaWAN MAC header byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MHDR {
    pub m_type: MType,
    pub major: Major,
}

impl MHDR {
    pub fn new(m_type: MType) -> MHDR {
        MHDR { m_type, major: Major::LoRaWANR1 }
    }

    pub fn from_byte(b: u8) -> Result<MHDR, Error> {
        if b & 0x03 != 0 {
            return Err(Error::UnsupportedMajorVersion);
        }
        let m_type = match b >> 5 {
            0 => MType::JoinRequest,
            1 => MType::JoinAccept,
            2 => MType::UnconfirmedDataUp,
            3 => MType::UnconfirmedDataDown,
            4 => MType::ConfirmedDataUp,
            5 => MType::ConfirmedDataDown,
            6 => MType::RejoinRequest,
            _ => MType::Proprietary,
        };
        Ok(MHDR { m_type, major: Major::LoRaWANR1 })
    }

    pub fn byte(&self) -> u8 {
        self.m_type.byte() << 5
    }
}

/// The body of a PhyPayload. The variant in use is dictated by the MHDR
/// message type; `Raw` carries bytes that are opaque at this layer: a
/// still-encrypted join-accept or a proprietary frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    JoinRequest(JoinRequestPayload),
    JoinAccept(JoinAcceptPayload),
    MacPayload(MACPayload),
    RejoinRequestType02(RejoinRequestType02Payload),
    RejoinRequestType1(RejoinRequestType1Payload),
    Raw(Vec<u8>),
}

/// PhyPayload is the full over-the-air frame: MHDR || body || MIC.
///
/// For data frames the caller must encrypt the FRMPayload *before*
/// computing the MIC; for join-accepts the MIC is computed first and
/// payload || MIC are encrypted together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhyPayload {
    pub mhdr: MHDR,
    pub payload: Payload,
    pub mic: MIC,
}

/// Parses a byte slice as a LoRaWAN physical payload.
///
/// # Examples
///
/// ```
/// let data = vec![
///     0x40, 0x04, 0x03, 0x02, 0x01, 0x80, 0x01, 0x00, 0x01, 0xa6, 0x94,
///     0x64, 0x26, 0x15, 0xd6, 0xc3, 0xb5, 0x82,
/// ];
/// let phy = lorawan_codec::parse(&data).unwrap();
/// println!("{:?}", phy);
/// ```
pub fn parse(data: &[u8]) -> Result<PhyPayload, Error> {
    PhyPayload::from_bytes(data)
}

impl PhyPayload {
    /// Creates a frame with an all-zero MIC; call
    /// [`set_mic`](Self::set_mic) once the payload is final.
    pub fn new(mhdr: MHDR, payload: Payload) -> PhyPayload {
        PhyPayload { mhdr, payload, mic: MIC::default() }
    }

    /// Decodes a frame, dispatching the body by message type. The
    /// join-accept body stays opaque until
    /// [`decrypt_join_accept_payload`](Self::decrypt_join_accept_payload).
    pub fn from_bytes(data: &[u8]) -> Result<PhyPayload, Error> {
        if data.len() < 5 {
            return Err(Error::BufferTooShort {
                field: "PHYPayload",
                expected: 5,
                got: data.len(),
            });
        }
        let mhdr = MHDR::from_byte(data[0])?;
        let body = &data[1..data.len() - 4];
        let mic = MIC([
            data[data.len() - 4],
            data[data.len() - 3],
            data[data.len() - 2],
            data[data.len() - 1],
        ]);

        let payload = match mhdr.m_type {
            MType::JoinRequest => Payload::JoinRequest(JoinRequestPayload::from_bytes(body)?),
            MType::JoinAccept => {
                // The body is ciphertext here; only its length is checked.
                if body.len() != 12 && body.len() != 28 {
                    return Err(Error::InvalidLength {
                        field: "JoinAccept frame",
                        expected: 17,
                        got: data.len(),
                    });
                }
                Payload::Raw(body.to_vec())
            }
            MType::RejoinRequest => match body.first() {
                Some(0) | Some(2) => {
                    Payload::RejoinRequestType02(RejoinRequestType02Payload::from_bytes(body)?)
                }
                Some(1) => Payload::RejoinRequestType1(RejoinRequestType1Payload::from_bytes(body)?),
                _ => return Err(Error::InvalidFieldValue("invalid rejoin-request type")),
            },
            MType::Proprietary => Payload::Raw(body.to_vec()),
            _ => {
                if data.len() < 12 {
                    return Err(Error::BufferTooShort {
                        field: "data frame",
                        expected: 12,
                        got: data.len(),
                    });
                }
                let direction = match data_direction(mhdr.m_type) {
                    Some(d) => d,
                    None => return Err(Error::InvalidShape("not a data frame")),
                };
                Payload::MacPayload(MACPayload::from_bytes(body, direction)?)
            }
        };

        Ok(PhyPayload { mhdr, payload, mic })
    }

    /// Encodes the frame as MHDR || body || MIC.
    pub fn to_vec(&self) -> Result<Vec<u8>, Error> {
        let body = self.payload_bytes()?;
        let mut out = Vec::with_capacity(5 + body.len());
        out.push(self.mhdr.byte());
        out.extend_from_slice(&body);
        out.extend_from_slice(&self.mic.0);
        Ok(out)
    }

    fn payload_bytes(&self) -> Result<Vec<u8>, Error> {
        match &self.payload {
            Payload::JoinRequest(p) => Ok(p.to_bytes().to_vec()),
            Payload::JoinAccept(p) => p.to_bytes(),
            Payload::MacPayload(p) => {
                let direction = data_direction(self.mhdr.m_type)
                    .ok_or(Error::InvalidShape("MACPayload requires a data message type"))?;
                p.to_bytes(direction)
            }
            Payload::RejoinRequestType02(p) => Ok(p.to_bytes()?.to_vec()),
            Payload::RejoinRequestType1(p) => Ok(p.to_bytes()?.to_vec()),
            Payload::Raw(b) => Ok(b.clone()),
        }
    }

    /// The CMAC input of the join-flavour MIC: MHDR || payload.
    fn join_mic_bytes(&self) -> Result<Vec<u8>, Error> {
        let body = match (self.mhdr.m_type, &self.payload) {
            (MType::JoinRequest, Payload::JoinRequest(p)) => p.to_bytes().to_vec(),
            (MType::JoinAccept, Payload::JoinAccept(p)) => p.to_bytes()?,
            (MType::JoinAccept, Payload::Raw(_)) => {
                return Err(Error::InvalidShape(
                    "join-accept must be decrypted before MIC operations",
                ))
            }
            (MType::RejoinRequest, Payload::RejoinRequestType02(p)) => p.to_bytes()?.to_vec(),
            (MType::RejoinRequest, Payload::RejoinRequestType1(p)) => p.to_bytes()?.to_vec(),
            _ => return Err(Error::InvalidShape("payload does not match the MHDR message type")),
        };
        let mut out = Vec::with_capacity(1 + body.len());
        out.push(self.mhdr.byte());
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// The CMAC input and B0 parameters of the data MIC.
    fn data_mic_parts(&self) -> Result<(Vec<u8>, u32, Direction, DevAddr), Error> {
        let direction = data_direction(self.mhdr.m_type)
            .ok_or(Error::InvalidShape("data MIC requires a data message type"))?;
        let mac = match &self.payload {
            Payload::MacPayload(p) => p,
            _ => return Err(Error::InvalidShape("expected a MACPayload body")),
        };
        let body = mac.to_bytes(direction)?;
        let mut bytes = Vec::with_capacity(1 + body.len());
        bytes.push(self.mhdr.byte());
        bytes.extend_from_slice(&body);
        Ok((bytes, mac.fhdr.f_cnt, direction, mac.fhdr.dev_addr))
    }

    /// Computes and stores the MIC variant matching the message type. For
    /// data frames this runs over the current (normally encrypted)
    /// FRMPayload bytes.
    pub fn set_mic(&mut self, key: &AES128Key) -> Result<(), Error> {
        self.mic = match self.mhdr.m_type {
            MType::JoinRequest | MType::JoinAccept | MType::RejoinRequest => {
                securityhelpers::calculate_mic(&self.join_mic_bytes()?, key)
            }
            MType::Proprietary => {
                return Err(Error::InvalidShape("proprietary frames have no MIC scheme"))
            }
            _ => {
                let (bytes, f_cnt, direction, dev_addr) = self.data_mic_parts()?;
                securityhelpers::calculate_data_mic(&bytes, key, f_cnt, direction, &dev_addr)
            }
        };
        Ok(())
    }

    /// Recomputes the MIC and compares it with the stored one in constant
    /// time. A mismatch is `Ok(false)`, not an error.
    pub fn validate_mic(&self, key: &AES128Key) -> Result<bool, Error> {
        match self.mhdr.m_type {
            MType::JoinRequest | MType::JoinAccept | MType::RejoinRequest => {
                Ok(securityhelpers::verify_mic(&self.join_mic_bytes()?, key, &self.mic))
            }
            MType::Proprietary => {
                Err(Error::InvalidShape("proprietary frames have no MIC scheme"))
            }
            _ => {
                let (bytes, f_cnt, direction, dev_addr) = self.data_mic_parts()?;
                Ok(securityhelpers::verify_data_mic(
                    &bytes, key, f_cnt, direction, &dev_addr, &self.mic,
                ))
            }
        }
    }

    /// Applies the FRMPayload cipher. The key is the caller's choice:
    /// AppSKey for ports above zero, NwkSEncKey for port zero. A frame
    /// without an FRMPayload is left untouched.
    pub fn encrypt_frm_payload(&mut self, key: &AES128Key) -> Result<(), Error> {
        let direction = data_direction(self.mhdr.m_type)
            .ok_or(Error::InvalidShape("FRMPayload crypto requires a data frame"))?;
        let mac = match &mut self.payload {
            Payload::MacPayload(p) => p,
            _ => return Err(Error::InvalidShape("expected a MACPayload body")),
        };
        let frm = match &mac.frm_payload {
            Some(f) => f,
            None => return Ok(()),
        };
        if mac.f_port.is_none() {
            return Err(Error::InvalidShape("fPort must be set when FRMPayload is set"));
        }
        if matches!(frm, FRMPayload::MacCommands(_)) && mac.f_port != Some(0) {
            return Err(Error::InvalidShape("fPort must be 0 when FRMPayload contains MAC commands"));
        }
        let mut bytes = mac.frm_payload_bytes();
        securityhelpers::encrypt_frm_payload(
            &mut bytes,
            key,
            mac.fhdr.f_cnt,
            direction,
            &mac.fhdr.dev_addr,
        );
        mac.frm_payload = Some(FRMPayload::Data(bytes));
        Ok(())
    }

    /// The inverse of [`encrypt_frm_payload`](Self::encrypt_frm_payload);
    /// the counter-mode construction makes them the same operation. The
    /// result stays opaque bytes; see
    /// [`decode_frm_payload`](Self::decode_frm_payload) for port 0.
    pub fn decrypt_frm_payload(&mut self, key: &AES128Key) -> Result<(), Error> {
        self.encrypt_frm_payload(key)
    }

    /// Validates the MIC with `mic_key` and, only on success, decrypts
    /// the FRMPayload with `enc_key`. Returns whether the MIC matched.
    pub fn decrypt_frm_payload_if_mic_ok(
        &mut self,
        mic_key: &AES128Key,
        enc_key: &AES128Key,
    ) -> Result<bool, Error> {
        if !self.validate_mic(mic_key)? {
            return Ok(false);
        }
        self.decrypt_frm_payload(enc_key)?;
        Ok(true)
    }

    /// Encrypts a typed join-accept body in place: the MIC must already
    /// be set, as payload || MIC are ciphered together (with AES *decrypt*,
    /// so the device can reverse it using only AES encrypt). Afterwards
    /// the body is opaque and the MIC field carries the final ciphertext
    /// bytes.
    pub fn encrypt_join_accept_payload(&mut self, key: &AES128Key) -> Result<(), Error> {
        let mut bytes = match &self.payload {
            Payload::JoinAccept(p) => p.to_bytes()?,
            _ => return Err(Error::InvalidShape("expected a decrypted join-accept payload")),
        };
        bytes.extend_from_slice(&self.mic.0);
        securityhelpers::encrypt_join_accept(&mut bytes, key)?;
        let n = bytes.len();
        self.mic = MIC([bytes[n - 4], bytes[n - 3], bytes[n - 2], bytes[n - 1]]);
        bytes.truncate(n - 4);
        self.payload = Payload::Raw(bytes);
        Ok(())
    }

    /// Decrypts an opaque join-accept body in place, turning it into a
    /// typed [`JoinAcceptPayload`] and restoring the real MIC.
    pub fn decrypt_join_accept_payload(&mut self, key: &AES128Key) -> Result<(), Error> {
        let mut bytes = match &self.payload {
            Payload::Raw(b) => b.clone(),
            _ => return Err(Error::InvalidShape("expected an encrypted join-accept payload")),
        };
        bytes.extend_from_slice(&self.mic.0);
        securityhelpers::decrypt_join_accept(&mut bytes, key)?;
        let n = bytes.len();
        let mic = MIC([bytes[n - 4], bytes[n - 3], bytes[n - 2], bytes[n - 1]]);
        let payload = JoinAcceptPayload::from_bytes(&bytes[..n - 4])?;
        self.mic = mic;
        self.payload = Payload::JoinAccept(payload);
        Ok(())
    }

    /// Decodes the raw FOpts of a data frame into typed MAC commands.
    pub fn decode_f_opts(&mut self) -> Result<(), Error> {
        let direction = data_direction(self.mhdr.m_type)
            .ok_or(Error::InvalidShape("FOpts exist only on data frames"))?;
        match &mut self.payload {
            Payload::MacPayload(p) => p.fhdr.decode_f_opts(direction),
            _ => Err(Error::InvalidShape("expected a MACPayload body")),
        }
    }

    /// Decodes an opaque FRMPayload into MAC commands. Only valid when
    /// fPort is 0, after decryption.
    pub fn decode_frm_payload(&mut self) -> Result<(), Error> {
        let direction = data_direction(self.mhdr.m_type)
            .ok_or(Error::InvalidShape("FRMPayload exists only on data frames"))?;
        match &mut self.payload {
            Payload::MacPayload(p) => p.decode_frm_payload(direction),
            _ => Err(Error::InvalidShape("expected a MACPayload body")),
        }
    }

    /// Encodes the frame as the structural JSON form.
    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string(self).map_err(|e| Error::Json(e.to_string()))
    }

    /// Decodes a frame from its structural JSON form. The body is
    /// dispatched by `mhdr.mType`, which also fixes the direction used to
    /// resolve MAC-command identifiers.
    pub fn from_json(s: &str) -> Result<PhyPayload, Error> {
        let json: PhyPayloadJson =
            serde_json::from_str(s).map_err(|e| Error::Json(e.to_string()))?;
        let payload = payload_from_json(json.mhdr.m_type, json.mac_payload)?;
        Ok(PhyPayload { mhdr: json.mhdr, payload, mic: json.mic })
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct PhyPayloadJson {
    mhdr: MHDR,
    #[serde(rename = "macPayload")]
    mac_payload: serde_json::Value,
    mic: MIC,
}

/// An element of the `fOpts` or `frmPayload` JSON arrays: either a typed
/// MAC command or opaque bytes.
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
enum PayloadItemJson {
    MacCommand {
        cid: u8,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        payload: Option<String>,
    },
    Bytes {
        bytes: String,
    },
}

#[derive(serde::Serialize, serde::Deserialize)]
struct FhdrJson {
    #[serde(rename = "devAddr")]
    dev_addr: DevAddr,
    #[serde(rename = "fCtrl")]
    f_ctrl: FCtrl,
    #[serde(rename = "fCnt")]
    f_cnt: u32,
    #[serde(rename = "fOpts", default)]
    f_opts: Vec<PayloadItemJson>,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct MacPayloadJson {
    fhdr: FhdrJson,
    #[serde(rename = "fPort", skip_serializing_if = "Option::is_none", default)]
    f_port: Option<u8>,
    #[serde(rename = "frmPayload", skip_serializing_if = "Option::is_none", default)]
    frm_payload: Option<Vec<PayloadItemJson>>,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct BytesJson {
    bytes: String,
}

impl serde::Serialize for PhyPayload {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mac_payload = payload_to_json(self).map_err(serde::ser::Error::custom)?;
        PhyPayloadJson { mhdr: self.mhdr, mac_payload, mic: self.mic }.serialize(serializer)
    }
}

fn decode_b64(s: &str) -> Result<Vec<u8>, Error> {
    BASE64.decode(s).map_err(|_| Error::InvalidText("base64 bytes"))
}

fn payload_to_json(phy: &PhyPayload) -> Result<serde_json::Value, Error> {
    let value = match &phy.payload {
        Payload::JoinRequest(p) => serde_json::to_value(p),
        Payload::JoinAccept(p) => serde_json::to_value(p),
        Payload::RejoinRequestType02(p) => serde_json::to_value(p),
        Payload::RejoinRequestType1(p) => serde_json::to_value(p),
        Payload::MacPayload(p) => serde_json::to_value(mac_payload_to_json(p)),
        Payload::Raw(b) => serde_json::to_value(BytesJson { bytes: BASE64.encode(b) }),
    };
    value.map_err(|e| Error::Json(e.to_string()))
}

fn mac_command_to_json(cmd: &MacCommand) -> PayloadItemJson {
    PayloadItemJson::MacCommand {
        cid: cmd.cid(),
        payload: if cmd.len() > 0 { Some(hex::encode(cmd.payload_bytes())) } else { None },
    }
}

fn mac_command_from_json(
    cid: u8,
    payload: Option<&str>,
    direction: Direction,
) -> Result<MacCommand, Error> {
    let size = payload_size(direction, cid)
        .ok_or(Error::InvalidFieldValue("unknown MAC command"))?;
    let payload = match payload {
        Some(h) => hex::decode(h).map_err(|_| Error::InvalidText("MAC command payload"))?,
        None => Vec::new(),
    };
    if payload.len() != size {
        return Err(Error::InvalidLength {
            field: "MAC command payload",
            expected: size,
            got: payload.len(),
        });
    }
    let mut bytes = vec![cid];
    bytes.extend_from_slice(&payload);
    match MacCommandIterator::new(&bytes, direction).next() {
        Some(res) => res,
        None => Err(Error::InvalidFieldValue("unknown MAC command")),
    }
}

fn items_from_f_opts(f_opts: &FOpts) -> Vec<PayloadItemJson> {
    match f_opts {
        FOpts::Raw(bytes) if bytes.is_empty() => Vec::new(),
        FOpts::Raw(bytes) => vec![PayloadItemJson::Bytes { bytes: BASE64.encode(bytes) }],
        FOpts::MacCommands(cmds) => cmds.iter().map(mac_command_to_json).collect(),
    }
}

fn f_opts_from_items(items: Vec<PayloadItemJson>, direction: Direction) -> Result<FOpts, Error> {
    let mut raw = Vec::new();
    let mut cmds = Vec::new();
    for item in items {
        match item {
            PayloadItemJson::Bytes { bytes } => raw.extend_from_slice(&decode_b64(&bytes)?),
            PayloadItemJson::MacCommand { cid, payload } => {
                cmds.push(mac_command_from_json(cid, payload.as_deref(), direction)?)
            }
        }
    }
    match (raw.is_empty(), cmds.is_empty()) {
        (true, _) => Ok(FOpts::MacCommands(cmds)),
        (false, true) => Ok(FOpts::Raw(raw)),
        (false, false) => Err(Error::InvalidShape("fOpts cannot mix raw bytes and MAC commands")),
    }
}

fn items_from_frm(frm: &FRMPayload) -> Vec<PayloadItemJson> {
    match frm {
        FRMPayload::Data(bytes) => vec![PayloadItemJson::Bytes { bytes: BASE64.encode(bytes) }],
        FRMPayload::MacCommands(cmds) => cmds.iter().map(mac_command_to_json).collect(),
    }
}

fn frm_from_items(items: Vec<PayloadItemJson>, direction: Direction) -> Result<FRMPayload, Error> {
    let mut raw = Vec::new();
    let mut cmds = Vec::new();
    for item in items {
        match item {
            PayloadItemJson::Bytes { bytes } => raw.extend_from_slice(&decode_b64(&bytes)?),
            PayloadItemJson::MacCommand { cid, payload } => {
                cmds.push(mac_command_from_json(cid, payload.as_deref(), direction)?)
            }
        }
    }
    match (raw.is_empty(), cmds.is_empty()) {
        (true, false) => Ok(FRMPayload::MacCommands(cmds)),
        (_, true) => Ok(FRMPayload::Data(raw)),
        (false, false) => {
            Err(Error::InvalidShape("frmPayload cannot mix raw bytes and MAC commands"))
        }
    }
}

fn mac_payload_to_json(p: &MACPayload) -> MacPayloadJson {
    MacPayloadJson {
        fhdr: FhdrJson {
            dev_addr: p.fhdr.dev_addr,
            f_ctrl: p.fhdr.f_ctrl,
            f_cnt: p.fhdr.f_cnt,
            f_opts: items_from_f_opts(&p.fhdr.f_opts),
        },
        f_port: p.f_port,
        frm_payload: p.frm_payload.as_ref().map(items_from_frm),
    }
}

fn mac_payload_from_json(p: MacPayloadJson, direction: Direction) -> Result<MACPayload, Error> {
    Ok(MACPayload {
        fhdr: crate::macpayload::FHDR {
            dev_addr: p.fhdr.dev_addr,
            f_ctrl: p.fhdr.f_ctrl,
            f_cnt: p.fhdr.f_cnt,
            f_opts: f_opts_from_items(p.fhdr.f_opts, direction)?,
        },
        f_port: p.f_port,
        frm_payload: match p.frm_payload {
            Some(items) => Some(frm_from_items(items, direction)?),
            None => None,
        },
    })
}

fn payload_from_json(m_type: MType, value: serde_json::Value) -> Result<Payload, Error> {
    let json_err = |e: serde_json::Error| Error::Json(e.to_string());
    match m_type {
        MType::JoinRequest => {
            Ok(Payload::JoinRequest(serde_json::from_value(value).map_err(json_err)?))
        }
        MType::JoinAccept => {
            if value.get("bytes").is_some() {
                let b: BytesJson = serde_json::from_value(value).map_err(json_err)?;
                Ok(Payload::Raw(decode_b64(&b.bytes)?))
            } else {
                Ok(Payload::JoinAccept(serde_json::from_value(value).map_err(json_err)?))
            }
        }
        MType::RejoinRequest => match value.get("rejoinType").and_then(serde_json::Value::as_u64) {
            Some(0) | Some(2) => {
                Ok(Payload::RejoinRequestType02(serde_json::from_value(value).map_err(json_err)?))
            }
            Some(1) => {
                Ok(Payload::RejoinRequestType1(serde_json::from_value(value).map_err(json_err)?))
            }
            _ => Err(Error::InvalidFieldValue("invalid rejoin-request type")),
        },
        MType::Proprietary => {
            let b: BytesJson = serde_json::from_value(value).map_err(json_err)?;
            Ok(Payload::Raw(decode_b64(&b.bytes)?))
        }
        _ => {
            let direction = match data_direction(m_type) {
                Some(d) => d,
                None => return Err(Error::InvalidShape("not a data frame")),
            };
            let p: MacPayloadJson = serde_json::from_value(value).map_err(json_err)?;
            Ok(Payload::MacPayload(mac_payload_from_json(p, direction)?))
        }
    }
}
