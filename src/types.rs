//! LoRaWAN type primitives (addresses, identifiers, frequency, channel
//! mask, etc) commonly used in payloads.
//!
//! Multi-byte identifiers are stored in textual (big-endian) order and
//! reversed into little-endian on the wire, so `to_string` of a decoded
//! value reads the way the identifier is written down.

use crate::Error;

macro_rules! fixed_len_struct {
    (
        $(#[$outer:meta])*
        pub struct $type:ident[$size:expr];
    ) => {
        $(#[$outer])*
        #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $type([u8; $size]);

        impl $type {
            /// Constructs the value from bytes in textual (big-endian) order.
            pub fn new(bytes: [u8; $size]) -> $type {
                $type(bytes)
            }

            /// Decodes the value from its little-endian wire form.
            pub fn from_bytes(data: &[u8]) -> Result<$type, Error> {
                if data.len() != $size {
                    return Err(Error::InvalidLength {
                        field: stringify!($type),
                        expected: $size,
                        got: data.len(),
                    });
                }
                let mut bytes = [0u8; $size];
                for (i, b) in data.iter().enumerate() {
                    bytes[$size - 1 - i] = *b;
                }
                Ok($type(bytes))
            }

            /// Encodes the value to its little-endian wire form.
            pub fn to_bytes(&self) -> [u8; $size] {
                let mut out = [0u8; $size];
                for (i, b) in self.0.iter().enumerate() {
                    out[$size - 1 - i] = *b;
                }
                out
            }
        }

        impl From<[u8; $size]> for $type {
            fn from(v: [u8; $size]) -> Self {
                $type(v)
            }
        }

        impl AsRef<[u8]> for $type {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl core::fmt::Display for $type {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl core::str::FromStr for $type {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Error> {
                let v = hex::decode(s).map_err(|_| Error::InvalidText(stringify!($type)))?;
                if v.len() != $size {
                    return Err(Error::InvalidText(stringify!($type)));
                }
                let mut bytes = [0u8; $size];
                bytes.copy_from_slice(&v);
                Ok($type(bytes))
            }
        }

        impl serde::Serialize for $type {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> serde::Deserialize<'de> for $type {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = <String as serde::Deserialize>::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

fixed_len_struct! {
    /// EUI64 represents a 64-bit extended unique identifier (DevEUI,
    /// JoinEUI/AppEUI).
    pub struct EUI64[8];
}

fixed_len_struct! {
    /// DevAddr represents a 32-bit device address with the NetID-derived
    /// prefix in its high bits.
    pub struct DevAddr[4];
}

fixed_len_struct! {
    /// NetID represents a 24-bit network identifier.
    pub struct NetID[3];
}

fixed_len_struct! {
    /// JoinNonce represents a 24-bit join-server nonce (AppNonce in
    /// LoRaWAN 1.0).
    pub struct JoinNonce[3];
}

/// Number of NwkID bits embedded in a DevAddr, per NetID type.
const DEV_ADDR_NWK_ID_BITS: [u32; 8] = [6, 6, 9, 11, 12, 13, 15, 17];

/// Number of identifier bits carried by a NetID, per NetID type.
const NET_ID_ID_BITS: [u32; 8] = [6, 6, 9, 21, 21, 21, 21, 21];

impl DevAddr {
    /// The NetID type encoded in the address prefix: the number of leading
    /// 1 bits before the first 0, capped at 7.
    pub fn net_id_type(&self) -> u8 {
        self.0[0].leading_ones().min(7) as u8
    }

    /// The NwkID bits that follow the type marker. The width depends on
    /// the NetID type (6 to 17 bits).
    pub fn nwk_id(&self) -> u32 {
        let t = u32::from(self.net_id_type());
        let bits = DEV_ADDR_NWK_ID_BITS[t as usize];
        let v = u32::from_be_bytes(self.0);
        (v << (t + 1)) >> (32 - bits)
    }

    /// Whether the address falls in the block assigned to the given NetID.
    pub fn is_net_id(&self, net_id: &NetID) -> bool {
        self.net_id_type() == net_id.net_id_type() && self.nwk_id() == net_id.nwk_id()
    }

    /// Overwrites the type marker and NwkID prefix with the bits derived
    /// from the given NetID, preserving the address suffix. Calling it
    /// again with the same NetID is a no-op.
    pub fn set_addr_prefix(&mut self, net_id: &NetID) {
        let t = u32::from(net_id.net_id_type());
        let nwk_bits = DEV_ADDR_NWK_ID_BITS[t as usize];
        let suffix_bits = 32 - (t + 1) - nwk_bits;

        // t leading ones followed by a single zero bit
        let marker = if t == 0 { 0 } else { ((1u32 << t) - 1) << (32 - t) };
        let suffix_mask = (1u32 << suffix_bits) - 1;

        let v = u32::from_be_bytes(self.0);
        let out = marker | (net_id.nwk_id() << suffix_bits) | (v & suffix_mask);
        self.0 = out.to_be_bytes();
    }
}

impl From<DevAddr> for u32 {
    fn from(v: DevAddr) -> Self {
        u32::from_be_bytes(v.0)
    }
}

impl From<u32> for DevAddr {
    fn from(v: u32) -> Self {
        DevAddr(v.to_be_bytes())
    }
}

impl NetID {
    /// The NetID type: the top three bits.
    pub fn net_id_type(&self) -> u8 {
        self.0[0] >> 5
    }

    /// The network identifier: the trailing bits, with a type-dependent
    /// width (6, 6, 9 or 21 bits).
    pub fn id(&self) -> u32 {
        let bits = NET_ID_ID_BITS[self.net_id_type() as usize];
        let v = u32::from_be_bytes([0, self.0[0], self.0[1], self.0[2]]);
        v & ((1 << bits) - 1)
    }

    /// The NwkID bits this NetID contributes to a DevAddr prefix: the
    /// least-significant DevAddr-width slice of [`id`](Self::id).
    pub fn nwk_id(&self) -> u32 {
        let bits = DEV_ADDR_NWK_ID_BITS[self.net_id_type() as usize];
        self.id() & ((1 << bits) - 1)
    }
}

/// DevNonce represents the join-request device nonce: a counter in
/// LoRaWAN 1.1, opaque randomness in 1.0. Little-endian on the wire.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct DevNonce(u16);

impl DevNonce {
    pub fn new(v: u16) -> DevNonce {
        DevNonce(v)
    }

    pub fn from_bytes(data: &[u8]) -> Result<DevNonce, Error> {
        if data.len() != 2 {
            return Err(Error::InvalidLength { field: "DevNonce", expected: 2, got: data.len() });
        }
        Ok(DevNonce(u16::from_le_bytes([data[0], data[1]])))
    }

    pub fn to_bytes(&self) -> [u8; 2] {
        self.0.to_le_bytes()
    }
}

impl From<u16> for DevNonce {
    fn from(v: u16) -> Self {
        DevNonce(v)
    }
}

impl From<DevNonce> for u16 {
    fn from(v: DevNonce) -> Self {
        v.0
    }
}

/// ChMask represents a 16-channel LoRaWAN channel mask, packed LSB-first
/// into two wire bytes: channel k maps to bit k%8 of byte k/8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChMask([u8; 2]);

impl Default for ChMask {
    fn default() -> Self {
        ChMask([0xFF; 2])
    }
}

impl ChMask {
    /// Constructs a new ChMask from per-channel flags.
    pub fn new(channels: [bool; 16]) -> Self {
        let mut mask = ChMask([0; 2]);
        for (i, enabled) in channels.iter().enumerate() {
            mask.set_channel(i, *enabled);
        }
        mask
    }

    /// Decodes the mask from its two wire bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self, Error> {
        if data.len() != 2 {
            return Err(Error::InvalidLength { field: "ChMask", expected: 2, got: data.len() });
        }
        Ok(Self::new_from_raw(data))
    }

    /// Constructs a new ChMask from the provided data, without verifying
    /// the length.
    ///
    /// Improper use of this method could lead to panic during runtime!
    pub(crate) fn new_from_raw(data: &[u8]) -> Self {
        ChMask([data[0], data[1]])
    }

    pub fn to_bytes(&self) -> [u8; 2] {
        self.0
    }

    /// Enable or disable a specific channel. Recall that LoRaWAN channel
    /// numbers start indexing at zero.
    pub fn set_channel(&mut self, channel: usize, set: bool) {
        let index = channel >> 3;
        let flag = 0b1 << (channel & 0x07);
        if set {
            self.0[index] |= flag;
        } else {
            self.0[index] &= !flag;
        }
    }

    /// Verifies if a given channel is enabled.
    pub fn is_enabled(&self, index: usize) -> Result<bool, Error> {
        if index > 15 {
            return Err(Error::InvalidFieldValue("channel index must be in 0..=15"));
        }
        Ok(self.channel_enabled(index))
    }

    fn channel_enabled(&self, index: usize) -> bool {
        self.0[index >> 3] & (1 << (index & 0x07)) != 0
    }

    /// Provides information for each of the 16 channels if they are
    /// enabled.
    pub fn statuses(&self) -> [bool; 16] {
        let mut res = [false; 16];
        for (i, c) in res.iter_mut().enumerate() {
            *c = self.channel_enabled(i);
        }
        res
    }
}

impl From<[bool; 16]> for ChMask {
    fn from(v: [bool; 16]) -> Self {
        ChMask::new(v)
    }
}

impl From<[u8; 2]> for ChMask {
    fn from(v: [u8; 2]) -> Self {
        ChMask(v)
    }
}

impl AsRef<[u8]> for ChMask {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl serde::Serialize for ChMask {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeSeq;
        let mut seq = serializer.serialize_seq(Some(16))?;
        for enabled in self.statuses() {
            seq.serialize_element(&enabled)?;
        }
        seq.end()
    }
}

struct ChMaskDeserializer;

impl<'de> serde::de::Visitor<'de> for ChMaskDeserializer {
    type Value = ChMask;

    fn expecting(&self, formatter: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        formatter.write_str("a sequence of 16 channel flags")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::SeqAccess<'de>,
    {
        let mut channels = [false; 16];
        let mut index = 0;
        while let Some(el) = seq.next_element()? {
            if index >= 16 {
                return Err(serde::de::Error::custom("ChMask has too many elements"));
            }
            channels[index] = el;
            index += 1;
        }
        Ok(ChMask::new(channels))
    }
}

impl<'de> serde::Deserialize<'de> for ChMask {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_seq(ChMaskDeserializer)
    }
}

/// DLSettings represents the downlink parameters of a join-accept or an
/// RXParamSetupReq: the RX1 data-rate offset, the RX2 data rate and the
/// 1.1 negotiation flag.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DLSettings(u8);

impl DLSettings {
    /// Packs the three fields into a settings byte.
    pub fn new(opt_neg: bool, rx1_dr_offset: u8, rx2_data_rate: u8) -> Result<DLSettings, Error> {
        if rx1_dr_offset > 0x07 {
            return Err(Error::InvalidFieldValue("rx1_dr_offset must be in 0..=7"));
        }
        if rx2_data_rate > 0x0f {
            return Err(Error::InvalidFieldValue("rx2_data_rate must be in 0..=15"));
        }
        Ok(DLSettings(u8::from(opt_neg) << 7 | rx1_dr_offset << 4 | rx2_data_rate))
    }

    /// Whether the device negotiates LoRaWAN 1.1 (OptNeg).
    pub fn opt_neg(&self) -> bool {
        self.0 >> 7 == 1
    }

    /// The offset between the uplink data rate and the downlink data rate
    /// used on the first reception slot (RX1).
    pub fn rx1_dr_offset(&self) -> u8 {
        self.0 >> 4 & 0x07
    }

    /// The data rate of a downlink using the second receive window.
    pub fn rx2_data_rate(&self) -> u8 {
        self.0 & 0x0f
    }

    /// The integer value of the DL Settings.
    pub fn raw_value(&self) -> u8 {
        self.0
    }
}

impl From<u8> for DLSettings {
    fn from(v: u8) -> Self {
        DLSettings(v)
    }
}

impl core::fmt::Display for DLSettings {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&hex::encode([self.0]))
    }
}

impl core::str::FromStr for DLSettings {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let v = hex::decode(s).map_err(|_| Error::InvalidText("DLSettings"))?;
        if v.len() != 1 {
            return Err(Error::InvalidText("DLSettings"));
        }
        Ok(DLSettings(v[0]))
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct DLSettingsJson {
    opt_neg: bool,
    rx1_dr_offset: u8,
    rx2_data_rate: u8,
}

impl serde::Serialize for DLSettings {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        DLSettingsJson {
            opt_neg: self.opt_neg(),
            rx1_dr_offset: self.rx1_dr_offset(),
            rx2_data_rate: self.rx2_data_rate(),
        }
        .serialize(serializer)
    }
}

impl<'de> serde::Deserialize<'de> for DLSettings {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let v = DLSettingsJson::deserialize(deserializer)?;
        DLSettings::new(v.opt_neg, v.rx1_dr_offset, v.rx2_data_rate)
            .map_err(serde::de::Error::custom)
    }
}

/// Frequency represents a channel's central frequency in Hz.
///
/// On the wire it is carried as `hz / 100` in 24 little-endian bits, so a
/// frequency must be a multiple of 100 Hz and below 2²⁴ · 100 Hz.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Frequency(u32);

impl Frequency {
    /// Constructs a new Frequency from a value in Hz.
    pub fn new(hz: u32) -> Result<Frequency, Error> {
        if hz % 100 != 0 {
            return Err(Error::InvalidFieldValue("frequency must be a multiple of 100 Hz"));
        }
        if hz / 100 >= 1 << 24 {
            return Err(Error::InvalidFieldValue("frequency does not fit in 24 bits"));
        }
        Ok(Frequency(hz))
    }

    /// Decodes a frequency from its three wire bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Frequency, Error> {
        if data.len() != 3 {
            return Err(Error::InvalidLength { field: "Frequency", expected: 3, got: data.len() });
        }
        Ok(Self::new_from_raw(data))
    }

    /// Constructs a new Frequency from wire bytes, without verifying the
    /// length.
    ///
    /// Improper use of this method could lead to panic during runtime!
    pub(crate) fn new_from_raw(data: &[u8]) -> Frequency {
        let v = u32::from(data[0]) | u32::from(data[1]) << 8 | u32::from(data[2]) << 16;
        Frequency(v * 100)
    }

    pub fn to_bytes(&self) -> [u8; 3] {
        let v = self.0 / 100;
        [v as u8, (v >> 8) as u8, (v >> 16) as u8]
    }

    /// The decimal value in Hz of the frequency.
    pub fn hz(&self) -> u32 {
        self.0
    }
}

impl serde::Serialize for Frequency {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.0)
    }
}

impl<'de> serde::Deserialize<'de> for Frequency {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hz = u32::deserialize(deserializer)?;
        Frequency::new(hz).map_err(serde::de::Error::custom)
    }
}
