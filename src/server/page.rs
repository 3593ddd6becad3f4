//! HTML for the landing page and the result fragment.

use std::fmt::Write;

use chrono::SecondsFormat;

use crate::errors::AppError;
use crate::pem_decoder::{Report, Structure};
use crate::pem_decoder::structure::{DistinguishedName, KeyUsage};

pub const STYLESHEET: &str = r#"body {
  font-family: system-ui, sans-serif;
  margin: 0 auto;
  max-width: 64rem;
  padding: 1.5rem;
  color: #1d232a;
  background: #f7f8fa;
}
h1 { font-size: 1.6rem; }
textarea {
  width: 100%;
  min-height: 16rem;
  font-family: ui-monospace, monospace;
  font-size: 0.85rem;
  box-sizing: border-box;
}
button { margin-top: 0.75rem; padding: 0.5rem 1.25rem; }
.success { color: #1a7f37; font-weight: 600; }
.error { color: #b42318; font-weight: 600; white-space: pre-line; }
.block { margin-top: 1.5rem; border-top: 1px solid #d0d7de; }
dl { display: grid; grid-template-columns: max-content 1fr; gap: 0.25rem 1rem; }
dt { font-weight: 600; }
dd { margin: 0; word-break: break-all; }
pre {
  background: #fff;
  border: 1px solid #d0d7de;
  padding: 1rem;
  overflow-x: auto;
  font-size: 0.8rem;
}
"#;

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>PEM viewer</title>
  <link rel="stylesheet" href="/assets/style.css">
</head>
<body>
  <h1>PEM viewer</h1>
  <p>Paste a PEM encoded certificate or certificate signing request. Nothing you submit is stored.</p>
  <form id="pem-form" method="post" action="/">
    <textarea name="pem" placeholder="-----BEGIN CERTIFICATE-----" required></textarea>
    <button type="submit">Decode</button>
  </form>
  <div id="result"></div>
  <script>
    const form = document.getElementById("pem-form");
    form.addEventListener("submit", async (event) => {
      event.preventDefault();
      const response = await fetch("/", {
        method: "POST",
        body: new URLSearchParams(new FormData(form)),
      });
      document.getElementById("result").innerHTML = await response.text();
    });
  </script>
</body>
</html>
"#;

pub fn index() -> &'static str {
    INDEX_HTML
}

pub fn error_fragment(message: &str) -> String {
    format!(
        "<div class=\"result\">\n  <p class=\"error\">{}</p>\n</div>\n",
        escape_html(message)
    )
}

/// Result block for one or more reports, first report first.
pub fn reports_fragment(reports: &[Report]) -> Result<String, AppError> {
    let mut out = String::new();
    writeln!(out, "<div class=\"result\">")?;
    if let Some(first) = reports.first() {
        writeln!(out, "  <p class=\"success\">{}</p>", escape_html(&first.success_message()))?;
    }
    for report in reports {
        write_report(&mut out, report)?;
    }
    writeln!(out, "</div>")?;
    Ok(out)
}

fn write_report(out: &mut String, report: &Report) -> Result<(), AppError> {
    let summary = report.summary();
    let heading = summary
        .subject()
        .first_common_name()
        .unwrap_or(report.source_label());
    writeln!(out, "  <section class=\"block\">")?;
    writeln!(out, "    <h2>{}</h2>", escape_html(heading))?;
    writeln!(out, "    <dl>")?;
    row(out, "Type", report.source_label())?;
    match summary {
        Structure::Certificate(cert) => {
            row(out, "Serial Number", &cert.serial_number)?;
            if let Some(issuer) = &cert.issuer_common_name {
                row(out, "Issuer", issuer)?;
            }
            row(
                out,
                "Not Before",
                &cert.validity.not_before.to_rfc3339_opts(SecondsFormat::Secs, true),
            )?;
            row(
                out,
                "Not After",
                &cert.validity.not_after.to_rfc3339_opts(SecondsFormat::Secs, true),
            )?;
            name_rows(out, &cert.subject)?;
            list_row(out, "Subject Alternative Names", &cert.dns_names)?;
            if !cert.key_usages.is_empty() {
                row(out, "Key Usages", &KeyUsage::join(&cert.key_usages))?;
            }
            row(out, "Public Key", &cert.public_key.key_type)?;
        }
        Structure::Request(req) => {
            name_rows(out, &req.subject)?;
            list_row(out, "Subject Alternative Names", &req.dns_names)?;
            row(out, "Public Key", &req.public_key.key_type)?;
        }
    }
    if let Some(fp) = report.fingerprints() {
        row(out, "Fingerprint (SHA-256)", &fp.der_sha256)?;
        row(out, "Public Key Fingerprint", &fp.spki_sha256)?;
    }
    writeln!(out, "    </dl>")?;
    writeln!(out, "    <pre>{}</pre>", escape_html(report.text()))?;
    writeln!(out, "  </section>")?;
    Ok(())
}

fn name_rows(out: &mut String, name: &DistinguishedName) -> Result<(), AppError> {
    row(out, "Subject", &name.rendered)?;
    let labeled = [
        ("Country", &name.country),
        ("State", &name.state),
        ("Locality", &name.locality),
        ("Organization", &name.organization),
        ("Organizational Unit", &name.organizational_unit),
        ("Email Address", &name.email_address),
    ];
    for (label, values) in labeled {
        if !values.is_empty() {
            row(out, label, &values.join(","))?;
        }
    }
    Ok(())
}

fn list_row(out: &mut String, label: &str, values: &[String]) -> Result<(), AppError> {
    if values.is_empty() {
        return Ok(());
    }
    row(out, label, &values.join(", "))
}

fn row(out: &mut String, label: &str, value: &str) -> Result<(), AppError> {
    writeln!(
        out,
        "      <dt>{}</dt><dd>{}</dd>",
        escape_html(label),
        escape_html(value)
    )?;
    Ok(())
}

pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
