use serde::Serialize;
use x509_parser::asn1_rs::{BmpString, Tag, UniversalString};
use x509_parser::x509::{AttributeTypeAndValue, X509Name};

const OID_COMMON_NAME: &str = "2.5.4.3";
const OID_SERIAL_NUMBER: &str = "2.5.4.5";
const OID_COUNTRY: &str = "2.5.4.6";
const OID_LOCALITY: &str = "2.5.4.7";
const OID_STATE: &str = "2.5.4.8";
const OID_ORGANIZATION: &str = "2.5.4.10";
const OID_ORGANIZATIONAL_UNIT: &str = "2.5.4.11";
const OID_EMAIL_ADDRESS: &str = "1.2.840.113549.1.9.1";

/// Distinguished name components in encoding order.
///
/// X.509 allows every attribute to repeat, so each component is a list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistinguishedName {
    pub common_name: Vec<String>,
    pub serial_number: Vec<String>,
    pub country: Vec<String>,
    pub state: Vec<String>,
    pub locality: Vec<String>,
    pub organization: Vec<String>,
    pub organizational_unit: Vec<String>,
    pub email_address: Vec<String>,
    /// One-line rendering of the whole name, e.g. `CN=example.com, O=Example`.
    pub rendered: String,
}

impl DistinguishedName {
    pub fn from_x509(name: &X509Name<'_>) -> Self {
        let mut dn = DistinguishedName {
            rendered: name.to_string(),
            ..Default::default()
        };
        for rdn in name.iter() {
            for attr in rdn.iter() {
                let slot = match attr.attr_type().to_id_string().as_str() {
                    OID_COMMON_NAME => &mut dn.common_name,
                    OID_SERIAL_NUMBER => &mut dn.serial_number,
                    OID_COUNTRY => &mut dn.country,
                    OID_STATE => &mut dn.state,
                    OID_LOCALITY => &mut dn.locality,
                    OID_ORGANIZATION => &mut dn.organization,
                    OID_ORGANIZATIONAL_UNIT => &mut dn.organizational_unit,
                    OID_EMAIL_ADDRESS => &mut dn.email_address,
                    _ => continue,
                };
                slot.push(attribute_text(attr));
            }
        }
        dn
    }

    /// Labeled components in a fixed order, skipping empty ones.
    pub fn components(&self) -> Vec<(&'static str, &[String])> {
        [
            ("CN", self.common_name.as_slice()),
            ("serialNumber", self.serial_number.as_slice()),
            ("C", self.country.as_slice()),
            ("ST", self.state.as_slice()),
            ("L", self.locality.as_slice()),
            ("O", self.organization.as_slice()),
            ("OU", self.organizational_unit.as_slice()),
            ("emailAddress", self.email_address.as_slice()),
        ]
        .into_iter()
        .filter(|(_, values)| !values.is_empty())
        .collect()
    }

    pub fn first_common_name(&self) -> Option<&str> {
        self.common_name.first().map(String::as_str)
    }
}

fn attribute_text(attr: &AttributeTypeAndValue<'_>) -> String {
    let value = attr.attr_value();
    let decoded = match value.tag() {
        Tag::BmpString => BmpString::try_from(value).ok().map(|s| s.string()),
        Tag::UniversalString => UniversalString::try_from(value).ok().map(|s| s.string()),
        Tag::T61String | Tag::VisibleString | Tag::GeneralString | Tag::GraphicString => {
            std::str::from_utf8(attr.as_slice()).ok().map(str::to_string)
        }
        _ => attr.as_str().ok().map(str::to_string),
    };
    // Not a string type, or not valid in its encoding: hex like the one-line rendering.
    decoded.unwrap_or_else(|| hex::encode_upper(attr.as_slice()))
}
