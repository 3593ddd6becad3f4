//! Certificates, requests and keys generated at test time.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::OnceLock;

use rcgen::{
    CertificateParams, DistinguishedName, DnType, DnValue, KeyPair, KeyUsagePurpose, SanType, SerialNumber,
    date_time_ymd,
};

#[derive(Debug, Clone)]
pub struct Fixture {
    pub pem: String,
    pub der: Vec<u8>,
}

/// Self-signed, CN test.example.com, serial 1, valid for calendar year 2024.
pub fn test_certificate() -> Fixture {
    static CERT: OnceLock<Fixture> = OnceLock::new();
    CERT.get_or_init(|| {
        let mut params =
            CertificateParams::new(vec!["test.example.com".to_string(), "www.example.com".to_string()])
                .expect("valid SAN list");
        params.distinguished_name = DistinguishedName::new();
        params
            .distinguished_name
            .push(DnType::CommonName, "test.example.com");
        params
            .distinguished_name
            .push(DnType::OrganizationName, "Example Org");
        params.serial_number = Some(SerialNumber::from(vec![1u8]));
        params.not_before = date_time_ymd(2024, 1, 1);
        params.not_after = date_time_ymd(2025, 1, 1);
        params.key_usages = vec![
            KeyUsagePurpose::DigitalSignature,
            KeyUsagePurpose::KeyEncipherment,
        ];
        let key = KeyPair::generate().expect("key generation");
        let cert = params.self_signed(&key).expect("self-signed certificate");
        Fixture {
            pem: cert.pem(),
            der: cert.der().to_vec(),
        }
    })
    .clone()
}

/// CSR for csr.example.com with a SAN and a requested key usage.
pub fn test_request() -> Fixture {
    let mut params =
        CertificateParams::new(vec!["csr.example.com".to_string()]).expect("valid SAN list");
    params.distinguished_name = DistinguishedName::new();
    params
        .distinguished_name
        .push(DnType::CommonName, "csr.example.com");
    params.distinguished_name.push(DnType::CountryName, "US");
    params.key_usages = vec![KeyUsagePurpose::DigitalSignature];
    let key = KeyPair::generate().expect("key generation");
    let csr = params.serialize_request(&key).expect("certificate request");
    Fixture {
        pem: csr.pem().expect("request pem"),
        der: csr.der().to_vec(),
    }
}

/// A PKCS#8 private key, label `PRIVATE KEY`.
pub fn private_key_pem() -> String {
    KeyPair::generate().expect("key generation").serialize_pem()
}

/// Subject with two OU attributes and no SAN extension.
pub fn multi_valued_subject_der() -> Vec<u8> {
    let mut params = CertificateParams::default();
    params.distinguished_name = DistinguishedName::new();
    params
        .distinguished_name
        .push(DnType::CommonName, "multi.example.com");
    params.distinguished_name.push(DnType::CountryName, "NL");
    params
        .distinguished_name
        .push(DnType::OrganizationName, "Example B.V.");
    params
        .distinguished_name
        .push(DnType::OrganizationalUnitName, "Platform");
    // Same OID under a second key, so the name carries two OU attributes.
    params
        .distinguished_name
        .push(DnType::CustomDnType(vec![2, 5, 4, 11]), "Security");
    let key = KeyPair::generate().expect("key generation");
    params
        .self_signed(&key)
        .expect("self-signed certificate")
        .der()
        .to_vec()
}

/// Subject with O as a BMPString and OU as a UniversalString.
pub fn wide_string_subject_der() -> Vec<u8> {
    let mut params = CertificateParams::default();
    params.distinguished_name = DistinguishedName::new();
    params
        .distinguished_name
        .push(DnType::CommonName, "wide.example.com");
    params.distinguished_name.push(
        DnType::OrganizationName,
        DnValue::BmpString("Acme".try_into().expect("bmp string")),
    );
    params.distinguished_name.push(
        DnType::OrganizationalUnitName,
        DnValue::UniversalString("Ops \u{e9}quipe".try_into().expect("universal string")),
    );
    let key = KeyPair::generate().expect("key generation");
    params
        .self_signed(&key)
        .expect("self-signed certificate")
        .der()
        .to_vec()
}

/// SAN with a DNS name, an IPv4 address and an email address.
pub fn mixed_alt_names_der() -> Vec<u8> {
    let mut params = CertificateParams::default();
    params.distinguished_name = DistinguishedName::new();
    params
        .distinguished_name
        .push(DnType::CommonName, "mixed.example.com");
    params.subject_alt_names = vec![
        SanType::DnsName("mixed.example.com".try_into().expect("ia5 string")),
        SanType::IpAddress(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 7))),
        SanType::Rfc822Name("ops@example.com".try_into().expect("ia5 string")),
    ];
    let key = KeyPair::generate().expect("key generation");
    params
        .self_signed(&key)
        .expect("self-signed certificate")
        .der()
        .to_vec()
}

/// Wrap arbitrary bytes in armor under `label`.
pub fn armor(label: &str, bytes: &[u8]) -> String {
    use base64::Engine;
    let body = base64::engine::general_purpose::STANDARD.encode(bytes);
    let mut out = format!("-----BEGIN {label}-----\n");
    for chunk in body.as_bytes().chunks(64) {
        out.push_str(&String::from_utf8_lossy(chunk));
        out.push('\n');
    }
    out.push_str(&format!("-----END {label}-----\n"));
    out
}
