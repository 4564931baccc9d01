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

//! Enrollment endpoint configuration.
//!
//! An [`EnrollmentEndpoint`] describes where the certificate authority's
//! enrollment interface lives and how its TLS server certificate is
//! verified. Credentials are deliberately not part of the endpoint: they
//! are supplied per operation, since enrollment and renewal authenticate
//! differently against the same endpoint.

use std::time::Duration;
use url::Url;

/// Configuration for a certificate enrollment endpoint.
#[derive(Clone)]
pub struct EnrollmentEndpoint {
    /// Base URL of the enrollment service (e.g., "https://est.example.com").
    ///
    /// Any path on the base URL is kept as a prefix, so gateways that mount
    /// the service under a subpath (e.g., "https://tenant.example.com/c8y")
    /// work without extra configuration.
    pub base_url: Url,

    /// Optional CA label for multi-CA deployments.
    ///
    /// When set, the enrollment path becomes
    /// `/.well-known/est/{ca_label}/{operation}`.
    pub ca_label: Option<String>,

    /// Trust anchor configuration for server certificate verification.
    pub trust_anchors: TrustAnchors,

    /// TCP connect timeout.
    pub connect_timeout: Duration,

    /// Overall request timeout.
    pub timeout: Duration,
}

impl std::fmt::Debug for EnrollmentEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrollmentEndpoint")
            .field("base_url", &self.base_url)
            .field("ca_label", &self.ca_label)
            .field("trust_anchors", &self.trust_anchors)
            .field("connect_timeout", &self.connect_timeout)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl EnrollmentEndpoint {
    /// Create a new endpoint builder.
    pub fn builder() -> EnrollmentEndpointBuilder {
        EnrollmentEndpointBuilder::new()
    }

    /// Build the URL for the given enrollment operation.
    ///
    /// The base URL's own path is preserved as a prefix, followed by the
    /// well-known enrollment path and the optional CA label.
    pub fn build_url(&self, operation: &str) -> Url {
        let mut url = self.base_url.clone();
        let prefix = url.path().trim_end_matches('/').to_string();

        let path = match &self.ca_label {
            Some(label) => format!("{prefix}/.well-known/est/{label}/{operation}"),
            None => format!("{prefix}/.well-known/est/{operation}"),
        };

        url.set_path(&path);
        url
    }
}

/// Builder for [`EnrollmentEndpoint`].
#[derive(Default)]
pub struct EnrollmentEndpointBuilder {
    base_url: Option<Url>,
    ca_label: Option<String>,
    trust_anchors: Option<TrustAnchors>,
    connect_timeout: Option<Duration>,
    timeout: Option<Duration>,
}

impl EnrollmentEndpointBuilder {
    /// Create a new endpoint builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the enrollment service base URL.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self, url::ParseError> {
        self.base_url = Some(Url::parse(url.as_ref())?);
        Ok(self)
    }

    /// Set the enrollment service base URL from a pre-parsed URL.
    pub fn base_url_parsed(mut self, url: Url) -> Self {
        self.base_url = Some(url);
        self
    }

    /// Set the CA label for multi-CA deployments.
    pub fn ca_label(mut self, label: impl Into<String>) -> Self {
        self.ca_label = Some(label.into());
        self
    }

    /// Use the built-in Mozilla root CA store.
    pub fn trust_webpki_roots(mut self) -> Self {
        self.trust_anchors = Some(TrustAnchors::WebPki);
        self
    }

    /// Use explicit CA certificates (PEM-encoded) for server verification.
    pub fn trust_explicit(mut self, ca_certs: Vec<Vec<u8>>) -> Self {
        self.trust_anchors = Some(TrustAnchors::Explicit(ca_certs));
        self
    }

    /// Accept any server certificate (insecure, for testing only).
    pub fn trust_any_insecure(mut self) -> Self {
        self.trust_anchors = Some(TrustAnchors::InsecureAcceptAny);
        self
    }

    /// Set the TCP connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the overall request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the endpoint configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is not set.
    pub fn build(self) -> Result<EnrollmentEndpoint, &'static str> {
        let base_url = self.base_url.ok_or("base_url is required")?;

        Ok(EnrollmentEndpoint {
            base_url,
            ca_label: self.ca_label,
            trust_anchors: self.trust_anchors.unwrap_or(TrustAnchors::WebPki),
            connect_timeout: self.connect_timeout.unwrap_or(Duration::from_secs(10)),
            timeout: self.timeout.unwrap_or(Duration::from_secs(30)),
        })
    }
}

/// Trust anchor configuration for server certificate verification.
#[derive(Clone)]
pub enum TrustAnchors {
    /// Use the built-in Mozilla root CA store.
    WebPki,

    /// Use explicit CA certificates (PEM-encoded).
    Explicit(Vec<Vec<u8>>),

    /// Accept any server certificate (insecure, for testing only).
    ///
    /// **WARNING**: This disables all server certificate verification.
    /// Only use for testing purposes.
    InsecureAcceptAny,
}

impl std::fmt::Debug for TrustAnchors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WebPki => write!(f, "WebPki"),
            Self::Explicit(certs) => write!(f, "Explicit({} certs)", certs.len()),
            Self::InsecureAcceptAny => write!(f, "InsecureAcceptAny"),
        }
    }
}

/// How much diagnostic output provisioning operations emit.
///
/// At [`Verbosity::Debug`], the provisioner logs the full PEM request and
/// the raw enrollment response body, which is useful when a CA rejects
/// requests for reasons its error messages do not explain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// Only warnings and errors.
    Quiet,

    /// Progress messages for each provisioning step.
    #[default]
    Normal,

    /// Request and response payloads included.
    Debug,
}
