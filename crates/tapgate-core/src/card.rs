//! Card classification and detection records.
//!
//! A reader driver reports a raw activation frame (ATQ, SAK and a UID of up
//! to 10 bytes). This module owns the decode step that turns that frame into
//! a [`CardDetection`] with an uppercase-hex UID and a deterministic
//! [`CardKind`] classification, so no other crate ever touches raw buffers.

use crate::error::{CoreError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum UID length in bytes (per ISO 14443 specification).
pub const MIN_UID_LENGTH: usize = 1;

/// Maximum UID length in bytes (per ISO 14443 specification).
pub const MAX_UID_LENGTH: usize = 10;

/// Raw result of a successful `activate_card` driver call.
///
/// Fixed-width owned arrays; the driver fills `uid[..uid_len]` and the rest
/// is padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivationData {
    /// Answer To Request, two bytes, low byte first.
    pub atq: [u8; 2],

    /// Select Acknowledge byte.
    pub sak: u8,

    /// Number of valid UID bytes (1-10).
    pub uid_len: u8,

    /// UID bytes, padded to the maximum length.
    pub uid: [u8; 10],
}

impl ActivationData {
    /// Build an activation frame from a UID slice, for tests and the
    /// simulated reader.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidUidLength`] if the slice is empty or
    /// longer than 10 bytes.
    pub fn from_uid_bytes(uid: &[u8], atq: [u8; 2], sak: u8) -> Result<Self> {
        if uid.is_empty() || uid.len() > MAX_UID_LENGTH {
            return Err(CoreError::InvalidUidLength(uid.len() as u8));
        }
        let mut buf = [0u8; 10];
        buf[..uid.len()].copy_from_slice(uid);
        Ok(Self {
            atq,
            sak,
            uid_len: uid.len() as u8,
            uid: buf,
        })
    }

    /// UID as an uppercase hexadecimal string.
    pub fn uid_hex(&self) -> String {
        self.uid[..self.uid_len as usize]
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect()
    }
}

/// RFID/NFC card type, derived from UID length and SAK.
///
/// The classification is deterministic: UID length in hex characters decides
/// the family, and for 4-byte UIDs the SAK byte disambiguates the Mifare
/// variants. Serde uses the same wire label as [`label`](Self::label), so
/// JSON payloads and persisted `card_type` columns carry identical strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum CardKind {
    /// NXP NTAG424 DNA (7-byte UID with `04` manufacturer prefix).
    Ntag424,

    /// Other ISO 14443-A card with a 7-byte UID.
    Iso14443a7Byte,

    /// NTAG213/215/216 family (4-byte UID, SAK 0x00).
    Ntag21x,

    /// Mifare Classic 1K (SAK 0x08).
    Mifare1k,

    /// Mifare Classic 4K (SAK 0x18).
    Mifare4k,

    /// Mifare Plus (SAK 0x20).
    MifarePlus,

    /// Mifare Classic with an unrecognized SAK.
    MifareClassic,

    /// ISO 14443-A card with a 10-byte UID.
    Iso14443a10Byte,

    /// Unclassifiable UID length, in hex characters.
    Unknown(u8),
}

impl CardKind {
    /// Classify a card from its uppercase-hex UID and SAK byte.
    ///
    /// # Examples
    ///
    /// ```
    /// use tapgate_core::CardKind;
    ///
    /// assert_eq!(CardKind::classify("04A1B2C3D4E5F6", 0x00), CardKind::Ntag424);
    /// assert_eq!(CardKind::classify("01020304", 0x08), CardKind::Mifare1k);
    /// ```
    pub fn classify(uid_hex: &str, sak: u8) -> Self {
        match uid_hex.len() {
            14 => {
                if uid_hex.starts_with("04") {
                    Self::Ntag424
                } else {
                    Self::Iso14443a7Byte
                }
            }
            8 => match sak {
                0x00 => Self::Ntag21x,
                0x08 => Self::Mifare1k,
                0x18 => Self::Mifare4k,
                0x20 => Self::MifarePlus,
                _ => Self::MifareClassic,
            },
            20 => Self::Iso14443a10Byte,
            n => Self::Unknown(n as u8),
        }
    }

    /// Wire label used in persistence and scan responses.
    pub fn label(&self) -> String {
        match self {
            Self::Ntag424 => "ntag424".to_string(),
            Self::Iso14443a7Byte => "iso14443a-7byte".to_string(),
            Self::Ntag21x => "ntag21x".to_string(),
            Self::Mifare1k => "mifare-1k".to_string(),
            Self::Mifare4k => "mifare-4k".to_string(),
            Self::MifarePlus => "mifare-plus".to_string(),
            Self::MifareClassic => "mifare-classic".to_string(),
            Self::Iso14443a10Byte => "iso14443a-10byte".to_string(),
            Self::Unknown(n) => format!("unknown-{}chars", n),
        }
    }

    /// Parse a wire label back into a kind.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "ntag424" => Some(Self::Ntag424),
            "iso14443a-7byte" => Some(Self::Iso14443a7Byte),
            "ntag21x" => Some(Self::Ntag21x),
            "mifare-1k" => Some(Self::Mifare1k),
            "mifare-4k" => Some(Self::Mifare4k),
            "mifare-plus" => Some(Self::MifarePlus),
            "mifare-classic" => Some(Self::MifareClassic),
            "iso14443a-10byte" => Some(Self::Iso14443a10Byte),
            other => {
                let chars = other.strip_prefix("unknown-")?.strip_suffix("chars")?;
                chars.parse().ok().map(Self::Unknown)
            }
        }
    }

    /// Check if this is a known card family.
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl Serialize for CardKind {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label())
    }
}

impl<'de> Deserialize<'de> for CardKind {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Self::from_label(&label).ok_or_else(|| {
            serde::de::Error::custom(format_args!("unrecognized card type label `{label}`"))
        })
    }
}

impl fmt::Display for CardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Manufacturer name inferred from the UID prefix.
///
/// `04` is the NXP manufacturer byte under ISO/IEC 7816-6.
pub fn manufacturer_for_uid(uid_hex: &str) -> &'static str {
    if uid_hex.starts_with("04") {
        "NXP"
    } else {
        "Unknown"
    }
}

/// A single card detection as produced by the poller.
///
/// Ephemeral: one is created on each presence transition and superseded by
/// the next tick. The session pipeline consumes it by value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDetection {
    /// Card UID as uppercase hex.
    pub uid: String,

    /// Classified card type.
    pub kind: CardKind,

    /// UID length in bytes.
    pub uid_length: u8,

    /// ATQ as four hex characters (`(atq[1] << 8) | atq[0]`).
    pub atq: String,

    /// SAK as two hex characters.
    pub sak: String,

    /// When the poller saw the card.
    pub detected_at: DateTime<Utc>,
}

impl CardDetection {
    /// Decode an activation frame into a detection, stamped with the
    /// current time.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidUidLength`] if the driver reported a UID
    /// length outside 1-10 bytes.
    pub fn from_activation(data: &ActivationData) -> Result<Self> {
        let len = data.uid_len as usize;
        if !(MIN_UID_LENGTH..=MAX_UID_LENGTH).contains(&len) {
            return Err(CoreError::InvalidUidLength(data.uid_len));
        }

        let uid = data.uid_hex();
        let kind = CardKind::classify(&uid, data.sak);
        let atq = format!("{:04X}", ((data.atq[1] as u16) << 8) | data.atq[0] as u16);
        let sak = format!("{:02X}", data.sak);

        Ok(Self {
            uid,
            kind,
            uid_length: data.uid_len,
            atq,
            sak,
            detected_at: Utc::now(),
        })
    }

    /// Technical details blob stored in card records and access events.
    pub fn technical_json(&self) -> serde_json::Value {
        serde_json::json!({
            "atq": self.atq,
            "sak": self.sak,
            "uid_length": self.uid_length,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_ntag424_by_prefix() {
        assert_eq!(CardKind::classify("04A1B2C3D4E5F6", 0x00), CardKind::Ntag424);
        assert_eq!(CardKind::classify("04A1B2C3D4E5F6", 0x20), CardKind::Ntag424);
    }

    #[test]
    fn test_classify_seven_byte_without_nxp_prefix() {
        assert_eq!(
            CardKind::classify("07A1B2C3D4E5F6", 0x00),
            CardKind::Iso14443a7Byte
        );
    }

    #[test]
    fn test_classify_four_byte_by_sak() {
        assert_eq!(CardKind::classify("01020304", 0x00), CardKind::Ntag21x);
        assert_eq!(CardKind::classify("01020304", 0x08), CardKind::Mifare1k);
        assert_eq!(CardKind::classify("01020304", 0x18), CardKind::Mifare4k);
        assert_eq!(CardKind::classify("01020304", 0x20), CardKind::MifarePlus);
        assert_eq!(CardKind::classify("01020304", 0x42), CardKind::MifareClassic);
    }

    #[test]
    fn test_classify_ten_byte() {
        assert_eq!(
            CardKind::classify("0102030405060708090A", 0x00),
            CardKind::Iso14443a10Byte
        );
    }

    #[test]
    fn test_classify_unknown_length() {
        let kind = CardKind::classify("010203", 0x00);
        assert_eq!(kind, CardKind::Unknown(6));
        assert_eq!(kind.label(), "unknown-6chars");
        assert!(!kind.is_known());
    }

    #[test]
    fn test_activation_uid_hex() {
        let data =
            ActivationData::from_uid_bytes(&[0x04, 0xAB, 0xCD, 0xEF], [0x44, 0x00], 0x00).unwrap();
        assert_eq!(data.uid_hex(), "04ABCDEF");
        assert_eq!(data.uid_len, 4);
    }

    #[test]
    fn test_activation_rejects_bad_lengths() {
        assert!(ActivationData::from_uid_bytes(&[], [0, 0], 0).is_err());
        assert!(ActivationData::from_uid_bytes(&[0u8; 11], [0, 0], 0).is_err());
        assert!(ActivationData::from_uid_bytes(&[0u8; 10], [0, 0], 0).is_ok());
    }

    #[test]
    fn test_detection_from_activation() {
        let data = ActivationData::from_uid_bytes(
            &[0x04, 0xA1, 0xB2, 0xC3, 0xD4, 0xE5, 0xF6],
            [0x44, 0x00],
            0x00,
        )
        .unwrap();

        let detection = CardDetection::from_activation(&data).unwrap();
        assert_eq!(detection.uid, "04A1B2C3D4E5F6");
        assert_eq!(detection.kind, CardKind::Ntag424);
        assert_eq!(detection.uid_length, 7);
        assert_eq!(detection.atq, "0044");
        assert_eq!(detection.sak, "00");
    }

    #[test]
    fn test_detection_atq_byte_order() {
        // ATQ is reported low byte first by the driver.
        let data = ActivationData::from_uid_bytes(&[0x01, 0x02, 0x03, 0x04], [0x02, 0x00], 0x18)
            .unwrap();
        let detection = CardDetection::from_activation(&data).unwrap();
        assert_eq!(detection.atq, "0002");
        assert_eq!(detection.kind, CardKind::Mifare4k);
    }

    #[test]
    fn test_manufacturer_from_prefix() {
        assert_eq!(manufacturer_for_uid("04A1B2C3D4E5F6"), "NXP");
        assert_eq!(manufacturer_for_uid("01020304"), "Unknown");
    }

    #[test]
    fn test_kind_serde_uses_wire_labels() {
        for kind in [
            CardKind::Ntag424,
            CardKind::Iso14443a7Byte,
            CardKind::Ntag21x,
            CardKind::Mifare1k,
            CardKind::Mifare4k,
            CardKind::MifarePlus,
            CardKind::MifareClassic,
            CardKind::Iso14443a10Byte,
            CardKind::Unknown(6),
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.label()));
            assert_eq!(serde_json::from_str::<CardKind>(&json).unwrap(), kind);
        }

        // Labels that were never produced by `label()` are rejected.
        assert!(serde_json::from_str::<CardKind>("\"mifare1k\"").is_err());
        assert!(serde_json::from_str::<CardKind>("\"unknown-xchars\"").is_err());
    }

    #[test]
    fn test_detection_serialization_round_trip() {
        let data = ActivationData::from_uid_bytes(&[0x01, 0x02, 0x03, 0x04], [0x04, 0x00], 0x08)
            .unwrap();
        let detection = CardDetection::from_activation(&data).unwrap();

        let json = serde_json::to_string(&detection).unwrap();
        assert!(json.contains("\"mifare-1k\""));
        let back: CardDetection = serde_json::from_str(&json).unwrap();
        assert_eq!(back, detection);
    }
}
