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

//! # est-provision
//!
//! Device certificate provisioning over EST (Enrollment over Secure
//! Transport, RFC 7030).
//!
//! This library takes a device from "has a one-time enrollment secret" to
//! "holds an operational X.509 certificate", and keeps it there: initial
//! enrollment authenticates with HTTP Basic credentials, renewal
//! authenticates with the certificate about to be replaced. The issued
//! certificate and the device key are persisted as PEM files with
//! appropriate permissions.
//!
//! ## What it does
//!
//! - **Key material**: loads the device key from disk or generates one on
//!   first use (ECDSA P-256 by default)
//! - **CSR generation**: PKCS#10 requests with the device identity as
//!   subject Common Name
//! - **Enrollment**: `simpleenroll` with shared-secret authentication,
//!   `simplereenroll` with mutual TLS
//! - **Persistence**: certificate (0644) and private key (0600) at
//!   configurable paths
//! - **Workflow**: a [`Provisioner`] that wires settings lookup, key
//!   handling, the enrollment exchange, and a post-enrollment reconnect
//!   into one call
//!
//! ## Quick Start
//!
//! ```no_run
//! use est_provision::{
//!     CertificateStore, EnrollmentEndpoint, EstClient, Identity, KeyMaterialProvider,
//!     RequestBuilder, SharedSecret,
//! };
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let endpoint = EnrollmentEndpoint::builder()
//!         .base_url("https://est.example.com")?
//!         .build()?;
//!
//!     let store = CertificateStore::new("/var/lib/device/cert.pem", "/var/lib/device/key.pem");
//!     let identity = Identity::from("device-001");
//!
//!     // Loads the device key, or generates and persists one on first run.
//!     let key_pair = KeyMaterialProvider::new(store.clone()).load_or_generate(&identity)?;
//!     let csr = RequestBuilder::new().build(&identity, &key_pair)?;
//!
//!     let client = EstClient::new(endpoint);
//!     let secret = SharedSecret::new("device-001", "one-time-password");
//!     let certificate = client.enroll(&secret, csr)?;
//!
//!     store.save_certificate(&certificate)?;
//!     println!("enrolled: {}", certificate.subject());
//!     Ok(())
//! }
//! ```
//!
//! ## Renewal
//!
//! Renewal presents the current certificate as TLS client identity; no
//! shared secret is involved. The subject is carried over from the
//! certificate being replaced.
//!
//! ```no_run
//! use est_provision::{
//!     CertificateStore, ClientCertificate, EnrollmentEndpoint, EstClient, Identity,
//!     RequestBuilder,
//! };
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let endpoint = EnrollmentEndpoint::builder()
//!     .base_url("https://est.example.com")?
//!     .build()?;
//! let store = CertificateStore::new("/var/lib/device/cert.pem", "/var/lib/device/key.pem");
//!
//! let current = store.load_certificate()?;
//! let key_pair = store.load_key_pair()?;
//! let identity = Identity::from(current.common_name().ok_or("certificate has no CN")?);
//!
//! let csr = RequestBuilder::new().build(&identity, &key_pair)?;
//! let client = EstClient::new(endpoint);
//! let renewed = client.reenroll(&ClientCertificate::new(current, key_pair), csr)?;
//!
//! store.save_certificate(&renewed)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## RFC 7030 coverage
//!
//! This library implements the client certificate request functions:
//!
//! - Section 4.2.1: Simple Enrollment (`enroll`)
//! - Section 4.2.2: Simple Re-enrollment (`reenroll`)
//!
//! TLS requirements per Section 3.3: TLS 1.2 or later, client
//! certificate authentication for re-enrollment, HTTP Basic over the
//! server-authenticated channel for enrollment. CA certificate
//! distribution, CSR attributes, server-side key generation, and full
//! CMC are out of scope; the CA trust anchors are supplied by
//! configuration instead.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod client;
pub mod codec;
pub mod config;
pub mod csr;
pub mod error;
pub mod keys;
pub mod store;
pub mod types;
pub mod workflow;

mod tls;

// Re-export main types at crate root for convenience
pub use client::EstClient;
pub use codec::PemKind;
pub use config::{
    EnrollmentEndpoint, EnrollmentEndpointBuilder, TrustAnchors, Verbosity,
};
pub use csr::RequestBuilder;
pub use error::{EstError, Result};
pub use keys::{DeviceKeyPair, KeyAlgorithm, KeyMaterialProvider};
pub use store::CertificateStore;
pub use types::{
    AuthCredential, Certificate, CertificateSigningRequest, ClientCertificate, Identity,
    SharedSecret,
};
pub use workflow::{settings, Provisioner, ReconnectTrigger, SettingsReader};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// User-Agent string for HTTP requests.
pub const USER_AGENT: &str = concat!("est-provision/", env!("CARGO_PKG_VERSION"));
