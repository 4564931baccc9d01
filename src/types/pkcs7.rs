//! PKCS#7/CMS parsing for EST responses.
//!
//! EST success bodies are base64 text of a DER CMS SignedData structure in
//! the degenerate "certs-only" form: a certificate set and no signatures.
//! This module unwraps that envelope into [`Certificate`] values.

use base64::prelude::*;
use cms::content_info::ContentInfo;
use cms::signed_data::SignedData;
use der::{Decode, Encode};

use crate::error::{EstError, Result};
use crate::types::Certificate;

/// Parse a PKCS#7 certs-only response body.
///
/// The body is base64 text (any line ending convention) of a DER
/// ContentInfo wrapping SignedData. Returns the certificates in set order;
/// an empty set yields an empty vector, which callers treat as a parse
/// failure for enrollment responses.
pub fn parse_certs_only(body: &[u8]) -> Result<Vec<Certificate>> {
    let der_bytes = decode_base64(body)?;

    let content_info = ContentInfo::from_der(&der_bytes)
        .map_err(|e| EstError::response_parse(format!("failed to parse ContentInfo: {e}")))?;

    let signed_data = extract_signed_data(&content_info)?;

    extract_certificates(&signed_data)
}

/// Decode base64 data, handling various line ending formats.
fn decode_base64(data: &[u8]) -> Result<Vec<u8>> {
    let cleaned: Vec<u8> = data
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();

    BASE64_STANDARD
        .decode(&cleaned)
        .map_err(|e| EstError::response_parse(format!("invalid base64 body: {e}")))
}

/// Extract SignedData from ContentInfo.
fn extract_signed_data(content_info: &ContentInfo) -> Result<SignedData> {
    // OID for SignedData: 1.2.840.113549.1.7.2
    const SIGNED_DATA_OID: &str = "1.2.840.113549.1.7.2";

    let oid_str = content_info.content_type.to_string();
    if oid_str != SIGNED_DATA_OID {
        return Err(EstError::response_parse(format!(
            "expected SignedData OID, got {oid_str}"
        )));
    }

    let content = content_info
        .content
        .to_der()
        .map_err(|e| EstError::response_parse(format!("failed to encode content: {e}")))?;

    SignedData::from_der(&content)
        .map_err(|e| EstError::response_parse(format!("failed to parse SignedData: {e}")))
}

/// Extract certificates from the SignedData certificate set.
fn extract_certificates(signed_data: &SignedData) -> Result<Vec<Certificate>> {
    let cert_set = match &signed_data.certificates {
        Some(certs) => certs,
        None => return Ok(Vec::new()),
    };

    let mut certificates = Vec::new();

    for cert_choice in cert_set.0.iter() {
        // CertificateChoices can also carry extended or attribute
        // certificates; only standard X.509 entries are kept.
        let cert_der = cert_choice
            .to_der()
            .map_err(|e| EstError::response_parse(format!("failed to encode certificate: {e}")))?;

        match x509_cert::Certificate::from_der(&cert_der) {
            Ok(parsed) => certificates.push(Certificate::from_parts(parsed, cert_der)),
            Err(e) => {
                tracing::warn!("skipping non-X.509 entry in certificate set: {e}");
            }
        }
    }

    Ok(certificates)
}
