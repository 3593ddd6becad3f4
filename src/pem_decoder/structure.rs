//! DER interpretation for the two supported PEM kinds.

pub mod extensions;
pub mod key_usage;
pub mod name;
pub mod public_key;

use chrono::{DateTime, Utc};
use hex::encode as hex_encode;
use serde::Serialize;
use sha2::{Digest, Sha256};
use x509_parser::certification_request::X509CertificationRequest;
use x509_parser::cri_attributes::ParsedCriAttribute;
use x509_parser::extensions::ParsedExtension;
use x509_parser::prelude::{FromDer, X509Certificate};
use x509_parser::time::ASN1Time;

use crate::app_error;
use crate::errors::{AppError, ErrorKind};

pub use extensions::{AltNames, ExtensionEntry};
pub use key_usage::KeyUsage;
pub use name::DistinguishedName;
pub use public_key::{AlgorithmId, PublicKeyInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Validity {
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
}

/// SHA-256 digests, lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Fingerprints {
    pub der_sha256: String,
    pub spki_sha256: String,
}

impl Fingerprints {
    fn compute(der: &[u8], spki: &[u8]) -> Self {
        Self {
            der_sha256: hex_encode(Sha256::digest(der)),
            spki_sha256: hex_encode(Sha256::digest(spki)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateFields {
    /// 1-based, as people write it (v3 is 3).
    pub version: u32,
    /// Decimal.
    pub serial_number: String,
    pub serial_hex: String,
    pub signature_algorithm: AlgorithmId,
    pub issuer: DistinguishedName,
    pub issuer_common_name: Option<String>,
    pub validity: Validity,
    pub subject: DistinguishedName,
    pub dns_names: Vec<String>,
    pub other_names: Vec<String>,
    pub key_usages: Vec<KeyUsage>,
    pub public_key: PublicKeyInfo,
    pub extensions: Vec<ExtensionEntry>,
    #[serde(skip)]
    pub signature: Vec<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprints: Option<Fingerprints>,
}

/// CSR fields. Validity, serial number and key usage do not exist here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestFields {
    pub version: u32,
    pub signature_algorithm: AlgorithmId,
    pub subject: DistinguishedName,
    pub dns_names: Vec<String>,
    pub other_names: Vec<String>,
    pub public_key: PublicKeyInfo,
    pub extensions: Vec<ExtensionEntry>,
    #[serde(skip)]
    pub signature: Vec<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprints: Option<Fingerprints>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Structure {
    Certificate(CertificateFields),
    Request(RequestFields),
}

impl Structure {
    pub fn subject(&self) -> &DistinguishedName {
        match self {
            Structure::Certificate(cert) => &cert.subject,
            Structure::Request(req) => &req.subject,
        }
    }

    pub fn fingerprints(&self) -> Option<&Fingerprints> {
        match self {
            Structure::Certificate(cert) => cert.fingerprints.as_ref(),
            Structure::Request(req) => req.fingerprints.as_ref(),
        }
    }
}

pub fn parse_certificate(der: &[u8], fingerprints: bool) -> Result<CertificateFields, AppError> {
    let (rest, cert) = X509Certificate::from_der(der).map_err(|err| {
        app_error!(ErrorKind::StructureDecodeError, format!("failed to parse certificate: {err}"))
    })?;
    reject_trailing("certificate", rest)?;

    let issuer = DistinguishedName::from_x509(cert.issuer());
    let issuer_common_name = issuer.first_common_name().map(str::to_string);

    let mut alt_names = AltNames::default();
    let mut key_usages = Vec::new();
    let mut entries = Vec::new();
    for ext in cert.extensions() {
        match ext.parsed_extension() {
            ParsedExtension::SubjectAlternativeName(san) => {
                san.general_names.iter().for_each(|name| alt_names.push(name));
            }
            ParsedExtension::KeyUsage(ku) => key_usages = KeyUsage::from_flags(ku.flags),
            _ => {}
        }
        entries.push(extensions::describe(ext));
    }

    let spki = cert.public_key();
    Ok(CertificateFields {
        version: cert.version().0 + 1,
        serial_number: cert.tbs_certificate.serial.to_string(),
        serial_hex: cert.tbs_certificate.raw_serial_as_string(),
        signature_algorithm: AlgorithmId::from_oid(&cert.signature_algorithm.algorithm),
        issuer,
        issuer_common_name,
        validity: Validity {
            not_before: to_utc(&cert.validity().not_before)?,
            not_after: to_utc(&cert.validity().not_after)?,
        },
        subject: DistinguishedName::from_x509(cert.subject()),
        dns_names: alt_names.dns,
        other_names: alt_names.other,
        key_usages,
        public_key: PublicKeyInfo::from_spki(spki),
        extensions: entries,
        signature: cert.signature_value.data.as_ref().to_vec(),
        fingerprints: fingerprints.then(|| Fingerprints::compute(der, spki.raw)),
    })
}

pub fn parse_request(der: &[u8], fingerprints: bool) -> Result<RequestFields, AppError> {
    let (rest, csr) = X509CertificationRequest::from_der(der).map_err(|err| {
        app_error!(
            ErrorKind::StructureDecodeError,
            format!("failed to parse certificate request: {err}")
        )
    })?;
    reject_trailing("certificate request", rest)?;

    let info = &csr.certification_request_info;
    let mut alt_names = AltNames::default();
    let mut entries = Vec::new();
    for attr in info.iter_attributes() {
        let ParsedCriAttribute::ExtensionRequest(request) = attr.parsed_attribute() else {
            continue;
        };
        for ext in &request.extensions {
            match ext.parsed_extension() {
                ParsedExtension::SubjectAlternativeName(san) => {
                    san.general_names.iter().for_each(|name| alt_names.push(name));
                }
                // Requested usages are not part of a CSR report.
                ParsedExtension::KeyUsage(_) => continue,
                _ => {}
            }
            entries.push(extensions::describe(ext));
        }
    }

    let spki = &info.subject_pki;
    Ok(RequestFields {
        version: info.version.0 + 1,
        signature_algorithm: AlgorithmId::from_oid(&csr.signature_algorithm.algorithm),
        subject: DistinguishedName::from_x509(&info.subject),
        dns_names: alt_names.dns,
        other_names: alt_names.other,
        public_key: PublicKeyInfo::from_spki(spki),
        extensions: entries,
        signature: csr.signature_value.data.as_ref().to_vec(),
        fingerprints: fingerprints.then(|| Fingerprints::compute(der, spki.raw)),
    })
}

fn reject_trailing(what: &str, rest: &[u8]) -> Result<(), AppError> {
    if rest.is_empty() {
        return Ok(());
    }
    Err(app_error!(
        ErrorKind::StructureDecodeError,
        format!("failed to parse {what}: {} unexpected bytes after the DER structure", rest.len())
    ))
}

fn to_utc(time: &ASN1Time) -> Result<DateTime<Utc>, AppError> {
    DateTime::from_timestamp(time.timestamp(), 0).ok_or_else(|| {
        app_error!(
            ErrorKind::StructureDecodeError,
            "failed to parse certificate: validity time out of range"
        )
    })
}
