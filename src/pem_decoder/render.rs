//! Canonical text dump of a parsed structure.
//!
//! Section order is fixed here. Nothing is emitted in container iteration
//! order except extensions, which keep the order they were encoded in.

use std::fmt::Write;

use chrono::{DateTime, SecondsFormat, Utc};

use super::structure::{
    CertificateFields, DistinguishedName, ExtensionEntry, Fingerprints, PublicKeyInfo,
    RequestFields, Structure,
};
use crate::errors::AppError;

const ROW_BYTES: usize = 16;

pub fn render(structure: &Structure) -> Result<String, AppError> {
    let mut out = String::new();
    match structure {
        Structure::Certificate(cert) => render_certificate(&mut out, cert)?,
        Structure::Request(req) => render_request(&mut out, req)?,
    }
    Ok(out)
}

fn render_certificate(out: &mut String, cert: &CertificateFields) -> Result<(), AppError> {
    writeln!(out, "Certificate:")?;
    writeln!(out, "    Data:")?;
    writeln!(out, "        Version: {} (0x{:x})", cert.version, cert.version.saturating_sub(1))?;
    writeln!(out, "        Serial Number: {}", cert.serial_number)?;
    writeln!(out, "            {}", cert.serial_hex)?;
    writeln!(out, "    Signature Algorithm: {}", cert.signature_algorithm.name)?;
    writeln!(out, "        Issuer: {}", cert.issuer.rendered)?;
    writeln!(out, "        Validity")?;
    writeln!(out, "            Not Before: {}", timestamp(&cert.validity.not_before))?;
    writeln!(out, "            Not After : {}", timestamp(&cert.validity.not_after))?;
    write_subject(out, &cert.subject)?;
    write_public_key(out, &cert.public_key)?;
    write_extensions(out, "X509v3 extensions", &cert.extensions)?;
    write_signature(out, &cert.signature_algorithm.name, &cert.signature)?;
    write_fingerprints(out, cert.fingerprints.as_ref())?;
    Ok(())
}

fn render_request(out: &mut String, req: &RequestFields) -> Result<(), AppError> {
    writeln!(out, "Certificate Request:")?;
    writeln!(out, "    Data:")?;
    writeln!(out, "        Version: {} (0x{:x})", req.version, req.version.saturating_sub(1))?;
    write_subject(out, &req.subject)?;
    write_public_key(out, &req.public_key)?;
    write_extensions(out, "Requested Extensions", &req.extensions)?;
    write_signature(out, &req.signature_algorithm.name, &req.signature)?;
    write_fingerprints(out, req.fingerprints.as_ref())?;
    Ok(())
}

fn write_subject(out: &mut String, subject: &DistinguishedName) -> Result<(), AppError> {
    writeln!(out, "        Subject: {}", subject.rendered)?;
    for (label, values) in subject.components() {
        writeln!(out, "            {label}: {}", values.join(", "))?;
    }
    Ok(())
}

fn write_public_key(out: &mut String, key: &PublicKeyInfo) -> Result<(), AppError> {
    writeln!(out, "        Subject Public Key Info:")?;
    writeln!(
        out,
        "            Public Key Algorithm: {} ({})",
        key.algorithm.name, key.algorithm.oid
    )?;
    match key.bits {
        Some(bits) => writeln!(out, "                {} Public-Key: ({bits} bit)", key.key_type)?,
        None => writeln!(out, "                {} Public-Key", key.key_type)?,
    }
    if let Some(curve) = &key.curve {
        writeln!(out, "                Curve: {curve}")?;
    }
    if let Some(exponent) = &key.exponent {
        writeln!(out, "                Exponent: {exponent}")?;
    }
    if !key.key_data.is_empty() {
        let title = if key.key_type == "RSA" { "Modulus" } else { "Key Data" };
        writeln!(out, "                {title}:")?;
        for line in format_hex_lines(&key.key_data, ROW_BYTES) {
            writeln!(out, "                    {line}")?;
        }
    }
    Ok(())
}

fn write_extensions(
    out: &mut String,
    heading: &str,
    extensions: &[ExtensionEntry],
) -> Result<(), AppError> {
    if extensions.is_empty() {
        return Ok(());
    }
    writeln!(out, "        {heading}:")?;
    for ext in extensions {
        let critical = if ext.critical { " critical" } else { "" };
        writeln!(out, "            {}:{critical}", extension_title(ext))?;
        match ext.oid.as_str() {
            // Alternative names read better on one line.
            "2.5.29.17" | "2.5.29.18" => {
                writeln!(out, "                {}", ext.value.join(", "))?;
            }
            _ => {
                for value in &ext.value {
                    writeln!(out, "                {value}")?;
                }
            }
        }
    }
    Ok(())
}

fn extension_title(ext: &ExtensionEntry) -> String {
    let title = match ext.oid.as_str() {
        "2.5.29.14" => "X509v3 Subject Key Identifier",
        "2.5.29.15" => "X509v3 Key Usage",
        "2.5.29.17" => "X509v3 Subject Alternative Name",
        "2.5.29.18" => "X509v3 Issuer Alternative Name",
        "2.5.29.19" => "X509v3 Basic Constraints",
        "2.5.29.35" => "X509v3 Authority Key Identifier",
        "2.5.29.37" => "X509v3 Extended Key Usage",
        _ if ext.name == ext.oid => return ext.oid.clone(),
        _ => return format!("{} ({})", ext.name, ext.oid),
    };
    title.to_string()
}

fn write_signature(out: &mut String, algorithm: &str, signature: &[u8]) -> Result<(), AppError> {
    writeln!(out, "    Signature Algorithm: {algorithm}")?;
    for line in format_hex_lines(signature, ROW_BYTES) {
        writeln!(out, "         {line}")?;
    }
    Ok(())
}

fn write_fingerprints(out: &mut String, fingerprints: Option<&Fingerprints>) -> Result<(), AppError> {
    let Some(fp) = fingerprints else {
        return Ok(());
    };
    writeln!(out, "    Fingerprints:")?;
    writeln!(out, "        SHA-256: {}", fp.der_sha256)?;
    writeln!(out, "        SPKI SHA-256: {}", fp.spki_sha256)?;
    Ok(())
}

fn timestamp(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Colon-separated hex rows; every row but the last ends with a colon.
fn format_hex_lines(bytes: &[u8], row_size: usize) -> Vec<String> {
    let rows = bytes.chunks(row_size).count();
    bytes
        .chunks(row_size)
        .enumerate()
        .map(|(i, chunk)| {
            let mut joined = chunk
                .iter()
                .map(|b| format!("{b:02x}"))
                .collect::<Vec<_>>()
                .join(":");
            if i + 1 < rows {
                joined.push(':');
            }
            joined
        })
        .collect()
}
