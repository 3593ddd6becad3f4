use serde::Serialize;

use crate::errors::AppError;

pub const CERTIFICATE_LABEL: &str = "CERTIFICATE";
pub const CERTIFICATE_REQUEST_LABEL: &str = "CERTIFICATE REQUEST";

/// What a PEM label announces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PemKind {
    Certificate,
    CertificateRequest,
    PrivateKey,
    Unsupported(String),
}

/// The kinds the structure parser can handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SupportedKind {
    Certificate,
    CertificateRequest,
}

impl SupportedKind {
    pub fn label(self) -> &'static str {
        match self {
            SupportedKind::Certificate => CERTIFICATE_LABEL,
            SupportedKind::CertificateRequest => CERTIFICATE_REQUEST_LABEL,
        }
    }
}

impl PemKind {
    pub fn classify(label: &str) -> Self {
        // Must stay ahead of every other rule.
        if label.contains("PRIVATE") {
            return PemKind::PrivateKey;
        }
        match label {
            CERTIFICATE_LABEL => PemKind::Certificate,
            CERTIFICATE_REQUEST_LABEL => PemKind::CertificateRequest,
            other => PemKind::Unsupported(other.to_string()),
        }
    }

    pub fn is_private_key(&self) -> bool {
        matches!(self, PemKind::PrivateKey)
    }

    /// Let supported kinds through, turn everything else into its user-facing error.
    pub fn guard(self) -> Result<SupportedKind, AppError> {
        match self {
            PemKind::Certificate => Ok(SupportedKind::Certificate),
            PemKind::CertificateRequest => Ok(SupportedKind::CertificateRequest),
            PemKind::PrivateKey => Err(AppError::private_key_submitted()),
            PemKind::Unsupported(label) => Err(AppError::unsupported_type(&label)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PemKind, SupportedKind};
    use crate::errors::ErrorKind;

    #[test]
    fn routes_supported_labels() {
        assert_eq!(
            PemKind::classify("CERTIFICATE").guard().unwrap(),
            SupportedKind::Certificate
        );
        assert_eq!(
            PemKind::classify("CERTIFICATE REQUEST").guard().unwrap(),
            SupportedKind::CertificateRequest
        );
    }

    #[test]
    fn any_private_label_is_sensitive() {
        for label in [
            "PRIVATE KEY",
            "RSA PRIVATE KEY",
            "EC PRIVATE KEY",
            "ENCRYPTED PRIVATE KEY",
            "OPENSSH PRIVATE KEY",
        ] {
            let kind = PemKind::classify(label);
            assert!(kind.is_private_key(), "{label}");
            let err = kind.guard().unwrap_err();
            assert_eq!(err.kind, ErrorKind::SensitiveMaterialSubmitted);
            assert!(!err.message.contains(label));
        }
    }

    #[test]
    fn private_check_wins_over_exact_matches() {
        // A label that would otherwise look like a certificate label still trips the guard.
        assert!(PemKind::classify("CERTIFICATE PRIVATE").is_private_key());
    }

    #[test]
    fn unknown_labels_are_unsupported_with_label_in_context() {
        let err = PemKind::classify("PUBLIC KEY").guard().unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnsupportedPemType);
        assert_eq!(err.context_value("label"), Some("PUBLIC KEY"));
    }

    #[test]
    fn labels_are_case_sensitive() {
        assert_eq!(
            PemKind::classify("certificate"),
            PemKind::Unsupported("certificate".to_string())
        );
    }
}
