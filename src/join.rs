//! Join-request, join-accept and rejoin-request payloads, plus the CFList
//! appendix and the 1.0 session-key derivation.

use crate::securityhelpers;
use crate::keys::AES128Key;
use crate::types::{ChMask, DLSettings, DevAddr, DevNonce, Frequency, JoinNonce, NetID, EUI64};
use crate::Error;

/// JoinRequestPayload represents the fixed 18-byte join-request body.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct JoinRequestPayload {
    #[serde(rename = "joinEUI")]
    pub join_eui: EUI64,
    #[serde(rename = "devEUI")]
    pub dev_eui: EUI64,
    #[serde(rename = "devNonce")]
    pub dev_nonce: DevNonce,
}

impl JoinRequestPayload {
    pub fn to_bytes(&self) -> [u8; 18] {
        let mut out = [0u8; 18];
        out[0..8].copy_from_slice(&self.join_eui.to_bytes());
        out[8..16].copy_from_slice(&self.dev_eui.to_bytes());
        out[16..18].copy_from_slice(&self.dev_nonce.to_bytes());
        out
    }

    pub fn from_bytes(data: &[u8]) -> Result<JoinRequestPayload, Error> {
        if data.len() != 18 {
            return Err(Error::InvalidLength {
                field: "JoinRequestPayload",
                expected: 18,
                got: data.len(),
            });
        }
        Ok(JoinRequestPayload {
            join_eui: EUI64::from_bytes(&data[0..8])?,
            dev_eui: EUI64::from_bytes(&data[8..16])?,
            dev_nonce: DevNonce::from_bytes(&data[16..18])?,
        })
    }
}

/// CFList is the optional 16-byte appendix of a join-accept. The final
/// byte selects the encoding: five extra channel frequencies, or
/// block-indexed channel masks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CFList {
    /// Five additional channel frequencies (CFListType 0).
    Channels([Frequency; 5]),
    /// Up to seven 16-channel mask blocks (CFListType 1). Decoding always
    /// yields all seven blocks; missing trailing blocks encode as zero.
    ChannelMasks(Vec<ChMask>),
}

impl CFList {
    pub fn to_bytes(&self) -> Result<[u8; 16], Error> {
        let mut out = [0u8; 16];
        match self {
            CFList::Channels(freqs) => {
                for (i, freq) in freqs.iter().enumerate() {
                    out[i * 3..i * 3 + 3].copy_from_slice(&freq.to_bytes());
                }
            }
            CFList::ChannelMasks(masks) => {
                if masks.len() > 7 {
                    return Err(Error::InvalidFieldValue("CFList holds at most 7 channel masks"));
                }
                for (i, mask) in masks.iter().enumerate() {
                    out[i * 2..i * 2 + 2].copy_from_slice(&mask.to_bytes());
                }
                out[15] = 0x01;
            }
        }
        Ok(out)
    }

    pub fn from_bytes(data: &[u8]) -> Result<CFList, Error> {
        if data.len() != 16 {
            return Err(Error::InvalidLength { field: "CFList", expected: 16, got: data.len() });
        }
        match data[15] {
            0x00 => {
                let mut freqs = [Frequency::default(); 5];
                for (i, freq) in freqs.iter_mut().enumerate() {
                    *freq = Frequency::from_bytes(&data[i * 3..i * 3 + 3])?;
                }
                Ok(CFList::Channels(freqs))
            }
            0x01 => {
                let masks =
                    (0..7).map(|i| ChMask::new_from_raw(&data[i * 2..i * 2 + 2])).collect();
                Ok(CFList::ChannelMasks(masks))
            }
            _ => Err(Error::InvalidFieldValue("invalid CFList type")),
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct CFListJson {
    #[serde(rename = "cFListType")]
    c_f_list_type: u8,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    channels: Option<Vec<Frequency>>,
    #[serde(rename = "channelMasks", skip_serializing_if = "Option::is_none", default)]
    channel_masks: Option<Vec<ChMask>>,
}

impl serde::Serialize for CFList {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let json = match self {
            CFList::Channels(freqs) => CFListJson {
                c_f_list_type: 0,
                channels: Some(freqs.to_vec()),
                channel_masks: None,
            },
            CFList::ChannelMasks(masks) => CFListJson {
                c_f_list_type: 1,
                channels: None,
                channel_masks: Some(masks.clone()),
            },
        };
        json.serialize(serializer)
    }
}

impl<'de> serde::Deserialize<'de> for CFList {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = CFListJson::deserialize(deserializer)?;
        match (json.c_f_list_type, json.channels, json.channel_masks) {
            (0, Some(channels), _) => {
                let freqs: [Frequency; 5] = channels
                    .try_into()
                    .map_err(|_| serde::de::Error::custom("CFList carries 5 channels"))?;
                Ok(CFList::Channels(freqs))
            }
            (1, _, Some(masks)) => Ok(CFList::ChannelMasks(masks)),
            _ => Err(serde::de::Error::custom("invalid CFList")),
        }
    }
}

/// JoinAcceptPayload represents the decrypted join-accept body: 12 bytes,
/// or 28 with the CFList appendix.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct JoinAcceptPayload {
    #[serde(rename = "joinNonce")]
    pub join_nonce: JoinNonce,
    #[serde(rename = "homeNetID")]
    pub home_net_id: NetID,
    #[serde(rename = "devAddr")]
    pub dev_addr: DevAddr,
    #[serde(rename = "dlSettings")]
    pub dl_settings: DLSettings,
    #[serde(rename = "rxDelay")]
    pub rx_delay: u8,
    #[serde(rename = "cFList", skip_serializing_if = "Option::is_none", default)]
    pub c_f_list: Option<CFList>,
}

impl JoinAcceptPayload {
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        if self.rx_delay > 0x0f {
            return Err(Error::InvalidFieldValue("rx_delay must be in 0..=15"));
        }
        let mut out = Vec::with_capacity(if self.c_f_list.is_some() { 28 } else { 12 });
        out.extend_from_slice(&self.join_nonce.to_bytes());
        out.extend_from_slice(&self.home_net_id.to_bytes());
        out.extend_from_slice(&self.dev_addr.to_bytes());
        out.push(self.dl_settings.raw_value());
        out.push(self.rx_delay);
        if let Some(c_f_list) = &self.c_f_list {
            out.extend_from_slice(&c_f_list.to_bytes()?);
        }
        Ok(out)
    }

    pub fn from_bytes(data: &[u8]) -> Result<JoinAcceptPayload, Error> {
        if data.len() != 12 && data.len() != 28 {
            return Err(Error::InvalidLength {
                field: "JoinAcceptPayload",
                expected: 12,
                got: data.len(),
            });
        }
        let c_f_list = if data.len() == 28 { Some(CFList::from_bytes(&data[12..28])?) } else { None };
        Ok(JoinAcceptPayload {
            join_nonce: JoinNonce::from_bytes(&data[0..3])?,
            home_net_id: NetID::from_bytes(&data[3..6])?,
            dev_addr: DevAddr::from_bytes(&data[6..10])?,
            dl_settings: DLSettings::from(data[10]),
            rx_delay: data[11] & 0x0f,
            c_f_list,
        })
    }

    /// Computes the network session key for the join exchange this accept
    /// answers (the LoRaWAN 1.0 derivation).
    pub fn derive_nwk_s_key(&self, dev_nonce: DevNonce, key: &AES128Key) -> AES128Key {
        self.derive_session_key(0x01, dev_nonce, key)
    }

    /// Computes the application session key for the join exchange this
    /// accept answers (the LoRaWAN 1.0 derivation).
    pub fn derive_app_s_key(&self, dev_nonce: DevNonce, key: &AES128Key) -> AES128Key {
        self.derive_session_key(0x02, dev_nonce, key)
    }

    fn derive_session_key(&self, first_byte: u8, dev_nonce: DevNonce, key: &AES128Key) -> AES128Key {
        // JoinNonce is 24 bits, NetID is 24 bits, DevNonce is 16 bits,
        // all little-endian; the rest of the block stays zero.
        let mut block = [0u8; 16];
        block[0] = first_byte;
        block[1..4].copy_from_slice(&self.join_nonce.to_bytes());
        block[4..7].copy_from_slice(&self.home_net_id.to_bytes());
        block[7..9].copy_from_slice(&dev_nonce.to_bytes());
        securityhelpers::aes_encrypt_block(&block, key)
    }
}

/// RejoinRequestType02Payload represents a type 0 or type 2
/// rejoin-request body (14 bytes).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RejoinRequestType02Payload {
    #[serde(rename = "rejoinType")]
    pub rejoin_type: u8,
    #[serde(rename = "netID")]
    pub net_id: NetID,
    #[serde(rename = "devEUI")]
    pub dev_eui: EUI64,
    #[serde(rename = "rjCount0")]
    pub rj_count0: u16,
}

impl RejoinRequestType02Payload {
    pub fn to_bytes(&self) -> Result<[u8; 14], Error> {
        if self.rejoin_type != 0 && self.rejoin_type != 2 {
            return Err(Error::InvalidFieldValue("rejoin_type must be 0 or 2"));
        }
        let mut out = [0u8; 14];
        out[0] = self.rejoin_type;
        out[1..4].copy_from_slice(&self.net_id.to_bytes());
        out[4..12].copy_from_slice(&self.dev_eui.to_bytes());
        out[12..14].copy_from_slice(&self.rj_count0.to_le_bytes());
        Ok(out)
    }

    pub fn from_bytes(data: &[u8]) -> Result<RejoinRequestType02Payload, Error> {
        if data.len() != 14 {
            return Err(Error::InvalidLength {
                field: "RejoinRequestType02Payload",
                expected: 14,
                got: data.len(),
            });
        }
        if data[0] != 0 && data[0] != 2 {
            return Err(Error::InvalidFieldValue("rejoin_type must be 0 or 2"));
        }
        Ok(RejoinRequestType02Payload {
            rejoin_type: data[0],
            net_id: NetID::from_bytes(&data[1..4])?,
            dev_eui: EUI64::from_bytes(&data[4..12])?,
            rj_count0: u16::from_le_bytes([data[12], data[13]]),
        })
    }
}

/// RejoinRequestType1Payload represents a type 1 rejoin-request body
/// (19 bytes).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RejoinRequestType1Payload {
    #[serde(rename = "rejoinType")]
    pub rejoin_type: u8,
    #[serde(rename = "joinEUI")]
    pub join_eui: EUI64,
    #[serde(rename = "devEUI")]
    pub dev_eui: EUI64,
    #[serde(rename = "rjCount1")]
    pub rj_count1: u16,
}

impl RejoinRequestType1Payload {
    pub fn to_bytes(&self) -> Result<[u8; 19], Error> {
        if self.rejoin_type != 1 {
            return Err(Error::InvalidFieldValue("rejoin_type must be 1"));
        }
        let mut out = [0u8; 19];
        out[0] = self.rejoin_type;
        out[1..9].copy_from_slice(&self.join_eui.to_bytes());
        out[9..17].copy_from_slice(&self.dev_eui.to_bytes());
        out[17..19].copy_from_slice(&self.rj_count1.to_le_bytes());
        Ok(out)
    }

    pub fn from_bytes(data: &[u8]) -> Result<RejoinRequestType1Payload, Error> {
        if data.len() != 19 {
            return Err(Error::InvalidLength {
                field: "RejoinRequestType1Payload",
                expected: 19,
                got: data.len(),
            });
        }
        if data[0] != 1 {
            return Err(Error::InvalidFieldValue("rejoin_type must be 1"));
        }
        Ok(RejoinRequestType1Payload {
            rejoin_type: data[0],
            join_eui: EUI64::from_bytes(&data[1..9])?,
            dev_eui: EUI64::from_bytes(&data[9..17])?,
            rj_count1: u16::from_le_bytes([data[17], data[18]]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_request_round_trip() {
        let req = JoinRequestPayload {
            join_eui: "0102030401020304".parse().unwrap(),
            dev_eui: "0203040502030405".parse().unwrap(),
            dev_nonce: DevNonce::new(0x102d),
        };
        let bytes = req.to_bytes();
        assert_eq!(
            bytes,
            [
                0x04, 0x03, 0x02, 0x01, 0x04, 0x03, 0x02, 0x01, 0x05, 0x04, 0x03, 0x02, 0x05,
                0x04, 0x03, 0x02, 0x2d, 0x10,
            ]
        );
        assert_eq!(JoinRequestPayload::from_bytes(&bytes).unwrap(), req);
    }

    #[test]
    fn c_f_list_channels_round_trip() {
        let freqs = [
            Frequency::new(867_100_000).unwrap(),
            Frequency::new(867_300_000).unwrap(),
            Frequency::new(867_500_000).unwrap(),
            Frequency::new(867_700_000).unwrap(),
            Frequency::new(867_900_000).unwrap(),
        ];
        let list = CFList::Channels(freqs);
        let bytes = list.to_bytes().unwrap();
        assert_eq!(bytes[15], 0x00);
        assert_eq!(&bytes[0..3], &[0x18, 0x4f, 0x84]);
        assert_eq!(CFList::from_bytes(&bytes).unwrap(), list);
    }

    #[test]
    fn c_f_list_channel_masks_round_trip() {
        let masks: Vec<ChMask> = (0..7).map(|i| ChMask::from([i as u8, 0])).collect();
        let list = CFList::ChannelMasks(masks);
        let bytes = list.to_bytes().unwrap();
        assert_eq!(bytes[15], 0x01);
        assert_eq!(CFList::from_bytes(&bytes).unwrap(), list);
    }

    #[test]
    fn c_f_list_rejects_unknown_type() {
        let mut bytes = [0u8; 16];
        bytes[15] = 0x02;
        assert!(CFList::from_bytes(&bytes).is_err());
    }

    #[test]
    fn rejoin_type_enforcement() {
        let mut req = RejoinRequestType02Payload { rejoin_type: 1, ..Default::default() };
        assert!(req.to_bytes().is_err());
        req.rejoin_type = 2;
        let bytes = req.to_bytes().unwrap();
        assert_eq!(RejoinRequestType02Payload::from_bytes(&bytes).unwrap(), req);

        let mut bad = bytes;
        bad[0] = 3;
        assert!(RejoinRequestType02Payload::from_bytes(&bad).is_err());
    }
}
