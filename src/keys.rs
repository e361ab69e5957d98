//! Key and integrity-code types.

use crate::Error;

/// AES128Key represents a 128-bit AES key.
///
/// Keys should be entered in MSB format. For example, if your LNS provides
/// a key of `00:11:22:33:44:55:66:77:88:99:AA:BB:CC:DD:EE:FF`, you should
/// enter it as `AES128Key::from([0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66,
/// 0x77, 0x88, 0x99, 0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF])`. Alternatively
/// the hex form can be parsed with `from_str`.
///
/// The same type carries every key the frame operations take: which key a
/// caller must supply (AppKey, NwkSKey/FNwkSIntKey, AppSKey, NwkSEncKey)
/// is determined by the operation and the frame, never by this type.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AES128Key(pub(crate) [u8; 16]);

impl From<[u8; 16]> for AES128Key {
    fn from(v: [u8; 16]) -> Self {
        AES128Key(v)
    }
}

impl AsRef<[u8]> for AES128Key {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl core::fmt::Display for AES128Key {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl core::str::FromStr for AES128Key {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let v = hex::decode(s).map_err(|_| Error::InvalidText("AES128Key"))?;
        if v.len() != 16 {
            return Err(Error::InvalidText("AES128Key"));
        }
        let mut key = [0u8; 16];
        key.copy_from_slice(&v);
        Ok(AES128Key(key))
    }
}

impl serde::Serialize for AES128Key {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for AES128Key {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// MIC represents the 4-byte message integrity code, appended to the frame
/// verbatim.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MIC(pub [u8; 4]);

impl From<[u8; 4]> for MIC {
    fn from(v: [u8; 4]) -> Self {
        MIC(v)
    }
}

impl AsRef<[u8]> for MIC {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl core::fmt::Display for MIC {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl core::str::FromStr for MIC {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let v = hex::decode(s).map_err(|_| Error::InvalidText("MIC"))?;
        if v.len() != 4 {
            return Err(Error::InvalidText("MIC"));
        }
        Ok(MIC([v[0], v[1], v[2], v[3]]))
    }
}

impl serde::Serialize for MIC {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for MIC {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
