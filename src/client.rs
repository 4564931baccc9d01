//! EST enrollment client.
//!
//! This module provides [`EstClient`], which performs the two certificate
//! request operations from RFC 7030: simple enrollment and simple
//! re-enrollment. Enrollment authenticates with HTTP Basic credentials
//! over server-authenticated TLS; re-enrollment authenticates with the
//! device's current certificate over mutual TLS.

use base64::prelude::*;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use tracing::{debug, info, warn};

use crate::config::EnrollmentEndpoint;
use crate::error::{EstError, Result};
use crate::tls::build_http_client;
use crate::types::{
    content_types, operations, parse_certs_only, Certificate, CertificateSigningRequest,
    ClientCertificate, SharedSecret,
};

/// Seconds to wait before retrying when the server sends no Retry-After.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Client for certificate enrollment against an EST endpoint.
///
/// Each operation builds its own transport: the TLS client identity
/// depends on the credential in use, so connections are not shared
/// between enrollment and renewal.
///
/// # Example
///
/// ```no_run
/// use est_provision::{EnrollmentEndpoint, EstClient, SharedSecret};
/// # use est_provision::{DeviceKeyPair, Identity, KeyAlgorithm, RequestBuilder};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let endpoint = EnrollmentEndpoint::builder()
///     .base_url("https://est.example.com")?
///     .build()?;
/// let client = EstClient::new(endpoint);
///
/// # let key_pair = DeviceKeyPair::generate(KeyAlgorithm::default())?;
/// # let csr = RequestBuilder::new().build(&Identity::from("device-001"), &key_pair)?;
/// let secret = SharedSecret::new("device-001", "one-time-password");
/// let certificate = client.enroll(&secret, csr)?;
/// println!("issued: {}", certificate.subject());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct EstClient {
    endpoint: EnrollmentEndpoint,
}

impl EstClient {
    /// Create a client for the given endpoint.
    pub fn new(endpoint: EnrollmentEndpoint) -> Self {
        Self { endpoint }
    }

    /// The endpoint this client enrolls against.
    pub fn endpoint(&self) -> &EnrollmentEndpoint {
        &self.endpoint
    }

    /// Request a first certificate for the CSR's subject.
    ///
    /// Submits the CSR to `simpleenroll`, authenticating with the shared
    /// secret as HTTP Basic credentials. The CSR is taken by value: one
    /// request object backs exactly one submission.
    ///
    /// # Errors
    ///
    /// [`EstError::Authentication`] when the server rejects the secret,
    /// [`EstError::EnrollmentPending`] when the request awaits approval,
    /// [`EstError::EnrollmentRejected`] for other server-side refusals.
    pub fn enroll(
        &self,
        credential: &SharedSecret,
        csr: CertificateSigningRequest,
    ) -> Result<Certificate> {
        let url = self.endpoint.build_url(operations::SIMPLE_ENROLL);
        debug!(%url, device_id = %credential.device_id, "POST enrollment request");

        let http = build_http_client(&self.endpoint, None)?;
        let authorization = format!(
            "Basic {}",
            BASE64_STANDARD.encode(format!("{}:{}", credential.device_id, credential.secret))
        );

        let response = http
            .post(url)
            .header(CONTENT_TYPE, content_types::PKCS10)
            .header("content-transfer-encoding", "base64")
            .header(AUTHORIZATION, authorization)
            .body(BASE64_STANDARD.encode(csr.der()))
            .send()?;

        self.read_certificate(response)
    }

    /// Renew the device certificate before it expires.
    ///
    /// Submits the CSR to `simplereenroll` over mutual TLS, presenting
    /// the current certificate and key as client identity. The current
    /// certificate is checked for expiry before anything is sent: a CA
    /// cannot authenticate an expired certificate, so failing locally
    /// gives a precise error instead of a generic TLS handshake failure.
    ///
    /// # Errors
    ///
    /// [`EstError::ExpiredCredential`] when the current certificate is
    /// already expired; otherwise the same errors as [`enroll`](Self::enroll).
    pub fn reenroll(
        &self,
        credential: &ClientCertificate,
        csr: CertificateSigningRequest,
    ) -> Result<Certificate> {
        if credential.certificate.is_expired() {
            let days_ago = -credential.certificate.days_until_expiry();
            return Err(EstError::expired_credential(format!(
                "certificate for {} expired {} days ago",
                credential.certificate.subject(),
                days_ago
            )));
        }

        let url = self.endpoint.build_url(operations::SIMPLE_REENROLL);
        debug!(%url, subject = %credential.certificate.subject(), "POST renewal request");

        let http = build_http_client(&self.endpoint, Some(credential))?;

        let response = http
            .post(url)
            .header(CONTENT_TYPE, content_types::PKCS10)
            .header("content-transfer-encoding", "base64")
            .body(BASE64_STANDARD.encode(csr.der()))
            .send()?;

        self.read_certificate(response)
    }

    /// Map the server's response to an issued certificate or an error.
    fn read_certificate(&self, response: reqwest::blocking::Response) -> Result<Certificate> {
        let status = response.status();

        if status == StatusCode::ACCEPTED {
            let retry_after = parse_retry_after(
                response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok()),
            );
            info!(retry_after, "enrollment accepted, awaiting CA approval");
            return Err(EstError::enrollment_pending(retry_after));
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let challenge = response
                .headers()
                .get("www-authenticate")
                .and_then(|v| v.to_str().ok())
                .map(String::from);
            return Err(EstError::authentication(status.as_u16(), challenge));
        }

        if !status.is_success() {
            let message = response
                .text()
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(EstError::enrollment_rejected(status.as_u16(), message));
        }

        // Content-Type may carry parameters (smime-type=certs-only); the
        // body parse is authoritative, so a mismatch only warns.
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.starts_with(content_types::PKCS7_MIME) {
            warn!(content_type, "unexpected enrollment response content type");
        }

        let body = response.bytes()?;
        debug!(bytes = body.len(), "parsing enrollment response");

        let certs = parse_certs_only(&body)?;
        let certificate = certs
            .into_iter()
            .next()
            .ok_or_else(|| EstError::response_parse("no certificate in enrollment response"))?;

        info!(
            subject = %certificate.subject(),
            fingerprint = %certificate.sha256_fingerprint(),
            "certificate issued"
        );
        Ok(certificate)
    }
}

/// Parse a Retry-After header value in seconds.
///
/// HTTP-date values are not parsed; anything other than a plain seconds
/// count falls back to the default.
fn parse_retry_after(value: Option<&str>) -> u64 {
    value
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}
