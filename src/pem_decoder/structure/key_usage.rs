use serde::Serialize;
use std::fmt;

/// Key usage bits, declared in bit order (bit 0 first).
///
/// The declaration order is also the order used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum KeyUsage {
    DigitalSignature,
    ContentCommitment,
    KeyEncipherment,
    DataEncipherment,
    KeyAgreement,
    CertSign,
    #[serde(rename = "CRLSign")]
    CrlSign,
    EncipherOnly,
    DecipherOnly,
}

impl KeyUsage {
    pub const ALL: [KeyUsage; 9] = [
        KeyUsage::DigitalSignature,
        KeyUsage::ContentCommitment,
        KeyUsage::KeyEncipherment,
        KeyUsage::DataEncipherment,
        KeyUsage::KeyAgreement,
        KeyUsage::CertSign,
        KeyUsage::CrlSign,
        KeyUsage::EncipherOnly,
        KeyUsage::DecipherOnly,
    ];

    pub const fn bit(self) -> u16 {
        1 << (self as u16)
    }

    pub fn label(self) -> &'static str {
        match self {
            KeyUsage::DigitalSignature => "DigitalSignature",
            KeyUsage::ContentCommitment => "ContentCommitment",
            KeyUsage::KeyEncipherment => "KeyEncipherment",
            KeyUsage::DataEncipherment => "DataEncipherment",
            KeyUsage::KeyAgreement => "KeyAgreement",
            KeyUsage::CertSign => "CertSign",
            KeyUsage::CrlSign => "CRLSign",
            KeyUsage::EncipherOnly => "EncipherOnly",
            KeyUsage::DecipherOnly => "DecipherOnly",
        }
    }

    /// Every usage whose bit is set in `flags`, in canonical order.
    pub fn from_flags(flags: u16) -> Vec<KeyUsage> {
        Self::ALL
            .into_iter()
            .filter(|usage| flags & usage.bit() != 0)
            .collect()
    }

    pub fn join(usages: &[KeyUsage]) -> String {
        usages
            .iter()
            .map(|u| u.label())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for KeyUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::KeyUsage;

    #[test]
    fn digital_signature_and_key_encipherment() {
        let flags = KeyUsage::DigitalSignature.bit() | KeyUsage::KeyEncipherment.bit();
        assert_eq!(flags, 0b101);
        assert_eq!(
            KeyUsage::from_flags(flags),
            vec![KeyUsage::DigitalSignature, KeyUsage::KeyEncipherment]
        );
    }

    #[test]
    fn order_is_canonical_regardless_of_bit_pattern() {
        let usages = KeyUsage::from_flags(0x1ff);
        assert_eq!(usages, KeyUsage::ALL.to_vec());
        assert_eq!(
            KeyUsage::join(&usages),
            "DigitalSignature, ContentCommitment, KeyEncipherment, DataEncipherment, KeyAgreement, CertSign, CRLSign, EncipherOnly, DecipherOnly"
        );
    }

    #[test]
    fn empty_and_unknown_bits_yield_nothing() {
        assert!(KeyUsage::from_flags(0).is_empty());
        assert!(KeyUsage::from_flags(0xfe00).is_empty());
    }

    #[test]
    fn decipher_only_is_bit_eight() {
        assert_eq!(KeyUsage::DecipherOnly.bit(), 0x100);
        assert_eq!(KeyUsage::from_flags(0x100), vec![KeyUsage::DecipherOnly]);
    }

    #[test]
    fn serializes_with_report_labels() {
        let json = serde_json::to_string(&[KeyUsage::CrlSign, KeyUsage::CertSign]).unwrap();
        assert_eq!(json, r#"["CRLSign","CertSign"]"#);
    }
}
