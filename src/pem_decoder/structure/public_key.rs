use serde::Serialize;
use x509_parser::objects::{oid_registry, oid2description, oid2sn};
use x509_parser::oid_registry::Oid;
use x509_parser::public_key::PublicKey;
use x509_parser::x509::SubjectPublicKeyInfo;

/// An algorithm OID with its short name when the registry knows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlgorithmId {
    pub name: String,
    pub oid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl AlgorithmId {
    pub fn from_oid(oid: &Oid<'_>) -> Self {
        let dotted = oid.to_id_string();
        let name = oid2sn(oid, oid_registry())
            .map(|s| s.to_string())
            .unwrap_or_else(|_| dotted.clone());
        let description = oid2description(oid, oid_registry())
            .ok()
            .map(|s| s.to_string());
        Self {
            name,
            oid: dotted,
            description,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyInfo {
    pub algorithm: AlgorithmId,
    /// RSA, EC, DSA, GOST or Unknown
    pub key_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bits: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub curve: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exponent: Option<String>,
    /// RSA modulus, EC point or raw key bytes, for the hex dump.
    #[serde(skip)]
    pub key_data: Vec<u8>,
}

impl PublicKeyInfo {
    pub fn from_spki(spki: &SubjectPublicKeyInfo<'_>) -> Self {
        let algorithm = AlgorithmId::from_oid(spki.algorithm.oid());
        let curve = named_curve(spki);
        let mut info = PublicKeyInfo {
            algorithm,
            key_type: "Unknown".to_string(),
            bits: None,
            curve: curve.clone(),
            exponent: None,
            key_data: Vec::new(),
        };

        let Ok(parsed) = spki.parsed() else {
            return info;
        };
        match parsed {
            PublicKey::RSA(rsa) => {
                let modulus = strip_leading_zero(rsa.modulus);
                info.key_type = "RSA".to_string();
                info.bits = Some(calculate_key_bits(modulus));
                info.exponent = rsa
                    .try_exponent()
                    .ok()
                    .map(|v| format!("{v} (0x{v:x})"))
                    .or_else(|| Some(format!("0x{}", hex::encode(strip_leading_zero(rsa.exponent)))));
                info.key_data = modulus.to_vec();
            }
            PublicKey::EC(ec) => {
                info.key_type = "EC".to_string();
                info.bits = curve
                    .as_deref()
                    .and_then(curve_bits)
                    .or_else(|| Some(ec_point_bits(ec.data())));
                info.key_data = ec.data().to_vec();
            }
            PublicKey::DSA(y) => {
                let y = strip_leading_zero(y);
                info.key_type = "DSA".to_string();
                info.bits = Some(calculate_key_bits(y));
                info.key_data = y.to_vec();
            }
            PublicKey::GostR3410(y) | PublicKey::GostR3410_2012(y) => {
                let y = strip_leading_zero(y);
                info.key_type = "GOST".to_string();
                info.bits = Some(calculate_key_bits(y));
                info.key_data = y.to_vec();
            }
            PublicKey::Unknown(bytes) => {
                info.key_data = bytes.to_vec();
            }
        }
        info
    }
}

/// Curve short name from the SPKI algorithm parameters, when they hold an OID.
fn named_curve(spki: &SubjectPublicKeyInfo<'_>) -> Option<String> {
    let params = spki.algorithm.parameters.as_ref()?;
    let curve_oid = params.as_oid().ok()?;
    let dotted = curve_oid.to_id_string();
    Some(
        oid2sn(&curve_oid, oid_registry())
            .map(|s| s.to_string())
            .unwrap_or(dotted),
    )
}

fn curve_bits(curve: &str) -> Option<usize> {
    match curve {
        "prime256v1" | "secp256r1" | "secp256k1" | "brainpoolP256r1" => Some(256),
        "secp384r1" | "brainpoolP384r1" => Some(384),
        "secp521r1" => Some(521),
        "secp224r1" => Some(224),
        _ => None,
    }
}

/// Field size of an uncompressed point (0x04 || X || Y).
fn ec_point_bits(point: &[u8]) -> usize {
    match point.split_first() {
        Some((0x04, coords)) => coords.len() / 2 * 8,
        _ => point.len() * 8,
    }
}

fn strip_leading_zero(mut bytes: &[u8]) -> &[u8] {
    while let Some((&0u8, rest)) = bytes.split_first() {
        bytes = rest;
    }
    bytes
}

fn calculate_key_bits(bytes: &[u8]) -> usize {
    match strip_leading_zero(bytes).split_first() {
        Some((first, rest)) => (rest.len() + 1) * 8 - first.leading_zeros() as usize,
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::{PublicKeyInfo, calculate_key_bits, ec_point_bits};
    use crate::pem_decoder::fixtures;
    use x509_parser::prelude::{FromDer, X509Certificate};

    #[test]
    fn key_bits_ignore_leading_zeroes() {
        assert_eq!(calculate_key_bits(&[0x00, 0x80, 0x00]), 16);
        assert_eq!(calculate_key_bits(&[0x01]), 1);
        assert_eq!(calculate_key_bits(&[0x00, 0x00]), 0);
        assert_eq!(calculate_key_bits(&[]), 0);
    }

    #[test]
    fn uncompressed_point_bits() {
        let mut point = vec![0x04];
        point.extend_from_slice(&[0xaa; 64]);
        assert_eq!(ec_point_bits(&point), 256);
    }

    #[test]
    fn describes_p256_key() {
        let fixture = fixtures::test_certificate();
        let (_, cert) = X509Certificate::from_der(&fixture.der).unwrap();
        let info = PublicKeyInfo::from_spki(cert.public_key());
        assert_eq!(info.key_type, "EC");
        assert_eq!(info.algorithm.oid, "1.2.840.10045.2.1");
        let curve = info.curve.as_deref().expect("named curve");
        assert!(curve == "prime256v1" || curve == "secp256r1", "{curve}");
        assert_eq!(info.bits, Some(256));
        assert_eq!(info.key_data.len(), 65);
    }
}
