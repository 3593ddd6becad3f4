use std::net::{Ipv4Addr, Ipv6Addr};

use serde::Serialize;
use x509_parser::extensions::{
    BasicConstraints, ExtendedKeyUsage, GeneralName, ParsedExtension, X509Extension,
};
use x509_parser::objects::{oid_registry, oid2sn};

use super::key_usage::KeyUsage;

/// One encoded extension, in the order it appeared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionEntry {
    pub name: String,
    pub oid: String,
    pub critical: bool,
    pub value: Vec<String>,
}

/// Subject alternative names split the way the report presents them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AltNames {
    pub dns: Vec<String>,
    pub other: Vec<String>,
}

impl AltNames {
    pub fn push(&mut self, name: &GeneralName<'_>) {
        match name {
            GeneralName::DNSName(dns) => self.dns.push(dns.to_string()),
            other => self.other.push(general_name(other)),
        }
    }
}

pub fn describe(ext: &X509Extension<'_>) -> ExtensionEntry {
    let oid = ext.oid.to_id_string();
    let name = oid2sn(&ext.oid, oid_registry())
        .map(|s| s.to_string())
        .unwrap_or_else(|_| oid.clone());
    ExtensionEntry {
        name,
        oid,
        critical: ext.critical,
        value: extension_value(ext),
    }
}

fn extension_value(ext: &X509Extension<'_>) -> Vec<String> {
    match ext.parsed_extension() {
        ParsedExtension::KeyUsage(ku) => vec![KeyUsage::join(&KeyUsage::from_flags(ku.flags))],
        ParsedExtension::SubjectAlternativeName(san) => {
            san.general_names.iter().map(general_name).collect()
        }
        ParsedExtension::IssuerAlternativeName(ian) => {
            ian.general_names.iter().map(general_name).collect()
        }
        ParsedExtension::BasicConstraints(bc) => basic_constraints(bc),
        ParsedExtension::SubjectKeyIdentifier(ki) => vec![hex_colon(ki.0)],
        ParsedExtension::AuthorityKeyIdentifier(aki) => aki
            .key_identifier
            .as_ref()
            .map(|ki| vec![format!("keyid:{}", hex_colon(ki.0))])
            .unwrap_or_default(),
        ParsedExtension::ExtendedKeyUsage(eku) => vec![extended_key_usage(eku).join(", ")],
        ParsedExtension::ParseError { error } => {
            vec![format!("<unparseable: {error}>"), hex_colon(ext.value)]
        }
        _ => vec![hex_colon(ext.value)],
    }
}

fn basic_constraints(bc: &BasicConstraints) -> Vec<String> {
    let mut value = format!("CA:{}", if bc.ca { "TRUE" } else { "FALSE" });
    if let Some(len) = bc.path_len_constraint {
        value.push_str(&format!(", pathlen:{len}"));
    }
    vec![value]
}

fn extended_key_usage(eku: &ExtendedKeyUsage<'_>) -> Vec<String> {
    let mut names = Vec::new();
    let known = [
        (eku.any, "Any Extended Key Usage"),
        (eku.server_auth, "TLS Web Server Authentication"),
        (eku.client_auth, "TLS Web Client Authentication"),
        (eku.code_signing, "Code Signing"),
        (eku.email_protection, "E-mail Protection"),
        (eku.time_stamping, "Time Stamping"),
        (eku.ocsp_signing, "OCSP Signing"),
    ];
    for (set, label) in known {
        if set {
            names.push(label.to_string());
        }
    }
    names.extend(eku.other.iter().map(|oid| oid.to_id_string()));
    names
}

fn general_name(name: &GeneralName<'_>) -> String {
    match name {
        GeneralName::DNSName(dns) => format!("DNS:{dns}"),
        GeneralName::RFC822Name(email) => format!("email:{email}"),
        GeneralName::URI(uri) => format!("URI:{uri}"),
        GeneralName::IPAddress(bytes) => format!("IP Address:{}", ip_address(bytes)),
        GeneralName::DirectoryName(dn) => format!("DirName:{dn}"),
        GeneralName::RegisteredID(oid) => format!("Registered ID:{}", oid.to_id_string()),
        other => format!("othername:{other:?}"),
    }
}

fn ip_address(bytes: &[u8]) -> String {
    if let Ok(v4) = <[u8; 4]>::try_from(bytes) {
        return Ipv4Addr::from(v4).to_string();
    }
    if let Ok(v6) = <[u8; 16]>::try_from(bytes) {
        return Ipv6Addr::from(v6).to_string();
    }
    hex_colon(bytes)
}

/// `de:ad:be:ef` style rendering used for identifiers and raw values.
pub fn hex_colon(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}

#[cfg(test)]
mod tests {
    use super::{hex_colon, ip_address};

    #[test]
    fn hex_colon_formats_bytes() {
        assert_eq!(hex_colon(&[0xde, 0xad, 0x01]), "de:ad:01");
        assert_eq!(hex_colon(&[]), "");
    }

    #[test]
    fn ip_addresses_by_length() {
        assert_eq!(ip_address(&[192, 0, 2, 1]), "192.0.2.1");
        let mut v6 = [0u8; 16];
        v6[15] = 1;
        assert_eq!(ip_address(&v6), "::1");
        assert_eq!(ip_address(&[1, 2, 3]), "01:02:03");
    }
}
