//! HTTP transport construction with TLS configured per endpoint.
//!
//! Enrollment and renewal need different transports: enrollment runs over
//! server-authenticated TLS only, while renewal presents the device's
//! current certificate as TLS client identity. Transports are therefore
//! built per operation rather than shared.

use crate::config::{EnrollmentEndpoint, TrustAnchors};
use crate::error::Result;
use crate::types::ClientCertificate;

// RFC 7030 Section 3.3.1 requires TLS 1.1 or later; TLS 1.1 is deprecated,
// so 1.2 is the floor here.

/// Build a blocking HTTP client for the given endpoint.
///
/// When `identity` is set, the transport performs mutual TLS with the
/// device's current certificate and key.
pub(crate) fn build_http_client(
    endpoint: &EnrollmentEndpoint,
    identity: Option<&ClientCertificate>,
) -> Result<reqwest::blocking::Client> {
    let mut builder = reqwest::blocking::Client::builder()
        .use_rustls_tls()
        .user_agent(crate::USER_AGENT)
        .connect_timeout(endpoint.connect_timeout)
        .timeout(endpoint.timeout)
        .min_tls_version(reqwest::tls::Version::TLS_1_2);

    match &endpoint.trust_anchors {
        TrustAnchors::WebPki => {
            builder = builder.tls_built_in_root_certs(true);
        }
        TrustAnchors::Explicit(ca_certs) => {
            builder = builder.tls_built_in_root_certs(false);
            for ca_pem in ca_certs {
                let cert = reqwest::Certificate::from_pem(ca_pem)?;
                builder = builder.add_root_certificate(cert);
            }
        }
        TrustAnchors::InsecureAcceptAny => {
            builder = builder
                .tls_built_in_root_certs(false)
                .danger_accept_invalid_certs(true);
        }
    }

    if let Some(client_cert) = identity {
        builder = builder.identity(build_identity(client_cert)?);
    }

    Ok(builder.build()?)
}

/// Assemble a reqwest Identity from the device certificate and key.
fn build_identity(client_cert: &ClientCertificate) -> Result<reqwest::Identity> {
    let mut pem = client_cert.certificate.to_pem().into_bytes();
    pem.push(b'\n');
    pem.extend_from_slice(client_cert.key_pair.serialize_pem().as_bytes());

    Ok(reqwest::Identity::from_pem(&pem)?)
}
