// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Domain types for enrollment and renewal.
//!
//! This module defines the artifacts that move through an enrollment:
//! the device [`Identity`], the [`CertificateSigningRequest`], the issued
//! [`Certificate`] (parsed X.509 plus the verbatim DER it arrived as), and
//! the [`AuthCredential`] union that selects between initial enrollment and
//! renewal authentication.

mod pkcs7;

pub use pkcs7::parse_certs_only;

use std::fmt;
use std::time::SystemTime;

use der::Decode;
use sha2::{Digest, Sha256};

use crate::codec::{self, PemKind};
use crate::error::{EstError, Result};
use crate::keys::DeviceKeyPair;

/// Logical device name, used as the CSR Subject Common Name.
///
/// Immutable once a CSR has been built from it. Emptiness is rejected by
/// [`RequestBuilder::build`](crate::csr::RequestBuilder::build), not here.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity(String);

impl Identity {
    /// Create an identity from a device name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the identity is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for Identity {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// A DER-encoded PKCS#10 certificate signing request.
///
/// Deliberately not `Clone`: submission consumes the request, so one built
/// CSR is submitted at most once per process run.
#[derive(Debug)]
pub struct CertificateSigningRequest {
    der: Vec<u8>,
}

impl CertificateSigningRequest {
    pub(crate) fn new(der: Vec<u8>) -> Self {
        Self { der }
    }

    /// The DER bytes of the request.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Render the request as PEM armor.
    pub fn to_pem(&self) -> String {
        codec::to_pem(PemKind::CertificateRequest, &self.der)
    }

    /// Parse a request from PEM armor.
    ///
    /// Fails with [`EstError::Decoding`] if the armor is malformed or the
    /// label is not `CERTIFICATE REQUEST`.
    pub fn from_pem(text: &str) -> Result<Self> {
        let (kind, der) = codec::from_pem(text)?;
        if kind != PemKind::CertificateRequest {
            return Err(EstError::decoding(format!(
                "expected CERTIFICATE REQUEST armor, found {}",
                kind.label()
            )));
        }
        Ok(Self { der })
    }
}

/// An issued X.509 certificate.
///
/// Holds the parsed structure together with the verbatim DER bytes it was
/// received or loaded as, so persistence and PEM rendering are bit-exact
/// with respect to what the CA signed.
#[derive(Clone)]
pub struct Certificate {
    parsed: x509_cert::Certificate,
    der: Vec<u8>,
}

impl Certificate {
    /// Parse a certificate from DER bytes.
    pub fn from_der(der: impl Into<Vec<u8>>) -> Result<Self> {
        let der = der.into();
        let parsed = x509_cert::Certificate::from_der(&der)
            .map_err(|e| EstError::decoding(format!("invalid certificate DER: {e}")))?;
        Ok(Self { parsed, der })
    }

    /// Parse a certificate from PEM armor.
    ///
    /// Fails with [`EstError::Decoding`] if the armor is malformed or the
    /// label is not `CERTIFICATE`.
    pub fn from_pem(text: &str) -> Result<Self> {
        let (kind, der) = codec::from_pem(text)?;
        if kind != PemKind::Certificate {
            return Err(EstError::decoding(format!(
                "expected CERTIFICATE armor, found {}",
                kind.label()
            )));
        }
        Self::from_der(der)
    }

    pub(crate) fn from_parts(parsed: x509_cert::Certificate, der: Vec<u8>) -> Self {
        Self { parsed, der }
    }

    /// The DER bytes as received from the CA.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Render the certificate as PEM armor.
    pub fn to_pem(&self) -> String {
        codec::to_pem(PemKind::Certificate, &self.der)
    }

    /// The parsed X.509 structure.
    pub fn x509(&self) -> &x509_cert::Certificate {
        &self.parsed
    }

    /// Subject distinguished name as an RFC 4514 string.
    pub fn subject(&self) -> String {
        self.parsed.tbs_certificate.subject.to_string()
    }

    /// Issuer distinguished name as an RFC 4514 string.
    pub fn issuer(&self) -> String {
        self.parsed.tbs_certificate.issuer.to_string()
    }

    /// Subject Common Name, if the subject carries one.
    pub fn common_name(&self) -> Option<String> {
        use const_oid::db::rfc4519::CN;

        for rdn in self.parsed.tbs_certificate.subject.0.iter() {
            for atv in rdn.0.iter() {
                if atv.oid == CN {
                    if let Ok(s) = std::str::from_utf8(atv.value.value()) {
                        return Some(s.to_string());
                    }
                }
            }
        }
        None
    }

    /// Start of the validity window.
    pub fn not_before(&self) -> SystemTime {
        self.parsed
            .tbs_certificate
            .validity
            .not_before
            .to_system_time()
    }

    /// End of the validity window.
    pub fn not_after(&self) -> SystemTime {
        self.parsed
            .tbs_certificate
            .validity
            .not_after
            .to_system_time()
    }

    /// Returns true if the validity window has ended.
    pub fn is_expired(&self) -> bool {
        self.not_after() < SystemTime::now()
    }

    /// Whole days until expiration; negative if already expired.
    pub fn days_until_expiry(&self) -> i64 {
        match self.not_after().duration_since(SystemTime::now()) {
            Ok(remaining) => (remaining.as_secs() / 86_400) as i64,
            Err(e) => -((e.duration().as_secs() / 86_400) as i64),
        }
    }

    /// SHA-256 fingerprint of the DER bytes, lowercase hex.
    pub fn sha256_fingerprint(&self) -> String {
        let digest = Sha256::digest(&self.der);
        digest.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("subject", &self.subject())
            .field("issuer", &self.issuer())
            .field("der_len", &self.der.len())
            .finish()
    }
}

/// Shared-secret credential for initial enrollment.
///
/// The device identifier doubles as the HTTP Basic username and, in the
/// usual provisioning flow, as the CSR Common Name.
#[derive(Clone)]
pub struct SharedSecret {
    /// Device identifier, sent as the Basic auth username.
    pub device_id: String,

    /// One-time enrollment secret, sent as the Basic auth password.
    pub secret: String,
}

impl SharedSecret {
    /// Create a shared-secret credential.
    pub fn new(device_id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedSecret")
            .field("device_id", &self.device_id)
            .field("secret", &"[redacted]")
            .finish()
    }
}

/// Certificate credential for renewal: the device's current certificate
/// and the key pair it was issued for, presented via mutual TLS.
#[derive(Debug)]
pub struct ClientCertificate {
    /// The current device certificate.
    pub certificate: Certificate,

    /// The private key matching the certificate.
    pub key_pair: DeviceKeyPair,
}

impl ClientCertificate {
    /// Create a certificate credential.
    pub fn new(certificate: Certificate, key_pair: DeviceKeyPair) -> Self {
        Self {
            certificate,
            key_pair,
        }
    }
}

/// The credential a device holds for its next provisioning request.
///
/// Exactly one variant is active per request: a shared secret authenticates
/// initial enrollment, the current certificate authenticates renewal.
#[derive(Debug)]
pub enum AuthCredential {
    /// Initial enrollment: device id + one-time secret over HTTP Basic.
    SharedSecret(SharedSecret),

    /// Renewal: current certificate + key pair over mutual TLS.
    ClientCertificate(Box<ClientCertificate>),
}

impl AuthCredential {
    /// Short label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SharedSecret(_) => "shared-secret",
            Self::ClientCertificate(_) => "client-certificate",
        }
    }
}

impl From<SharedSecret> for AuthCredential {
    fn from(secret: SharedSecret) -> Self {
        Self::SharedSecret(secret)
    }
}

impl From<ClientCertificate> for AuthCredential {
    fn from(credential: ClientCertificate) -> Self {
        Self::ClientCertificate(Box::new(credential))
    }
}

/// Content types used on the wire.
pub mod content_types {
    /// PKCS#10 CSR content type.
    pub const PKCS10: &str = "application/pkcs10";

    /// PKCS#7/CMS content type.
    pub const PKCS7_MIME: &str = "application/pkcs7-mime";
}

/// EST operation path segments.
pub mod operations {
    /// Simple enrollment endpoint.
    pub const SIMPLE_ENROLL: &str = "simpleenroll";

    /// Simple re-enrollment endpoint.
    pub const SIMPLE_REENROLL: &str = "simplereenroll";
}
