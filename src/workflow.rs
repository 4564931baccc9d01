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

//! End-to-end device provisioning workflow.
//!
//! The [`Provisioner`] ties the pieces together: it reads the certificate
//! and key paths from the device's settings, obtains key material, builds
//! the CSR, runs the enrollment or renewal exchange, persists the issued
//! certificate, and asks dependent services to pick up the new
//! credential. Settings access and the reconnect action are behind traits
//! so the surrounding system (a configuration CLI, a service manager)
//! stays outside this crate.
//!
//! # Example
//!
//! ```no_run
//! use est_provision::{
//!     EnrollmentEndpoint, EstClient, Provisioner, ReconnectTrigger, Result, SettingsReader,
//!     SharedSecret,
//! };
//!
//! struct FileSettings;
//!
//! impl SettingsReader for FileSettings {
//!     fn get_setting(&self, key: &str) -> Result<String> {
//!         match key {
//!             est_provision::settings::DEVICE_CERT_PATH => {
//!                 Ok("/var/lib/device/cert.pem".to_string())
//!             }
//!             est_provision::settings::DEVICE_KEY_PATH => {
//!                 Ok("/var/lib/device/key.pem".to_string())
//!             }
//!             other => Err(est_provision::EstError::not_found(other)),
//!         }
//!     }
//! }
//!
//! struct NoReconnect;
//!
//! impl ReconnectTrigger for NoReconnect {
//!     fn trigger(&self) -> Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! # fn example() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let endpoint = EnrollmentEndpoint::builder()
//!     .base_url("https://est.example.com")?
//!     .build()?;
//!
//! let provisioner = Provisioner::new(
//!     EstClient::new(endpoint),
//!     Box::new(FileSettings),
//!     Box::new(NoReconnect),
//! );
//!
//! let certificate = provisioner.enroll(&SharedSecret::new("device-001", "one-time-password"))?;
//! println!("enrolled: {}", certificate.subject());
//! # Ok(())
//! # }
//! ```

use std::fmt;

use tracing::{debug, info};

use crate::client::EstClient;
use crate::codec;
use crate::config::Verbosity;
use crate::csr::RequestBuilder;
use crate::error::{EstError, Result};
use crate::keys::{KeyAlgorithm, KeyMaterialProvider};
use crate::store::CertificateStore;
use crate::types::{
    AuthCredential, Certificate, CertificateSigningRequest, ClientCertificate, Identity,
    SharedSecret,
};

/// Settings keys the provisioner reads.
pub mod settings {
    /// Path of the device certificate file.
    pub const DEVICE_CERT_PATH: &str = "device.cert_path";

    /// Path of the device private key file.
    pub const DEVICE_KEY_PATH: &str = "device.key_path";
}

/// Read access to device-local settings.
///
/// Implementations typically delegate to an external configuration tool.
/// A missing key conventionally maps to [`EstError::NotFound`].
pub trait SettingsReader: Send + Sync {
    /// Read the value for a settings key.
    fn get_setting(&self, key: &str) -> Result<String>;
}

/// Notifies dependent services that the device certificate changed.
///
/// Implementations typically run an external command (e.g., asking the
/// connection agent to reconnect) and map a non-zero exit status to an
/// error.
pub trait ReconnectTrigger: Send + Sync {
    /// Ask connected services to reload the certificate.
    fn trigger(&self) -> Result<()>;
}

/// Orchestrates enrollment and renewal for one device.
pub struct Provisioner {
    client: EstClient,
    request_builder: RequestBuilder,
    key_algorithm: KeyAlgorithm,
    settings: Box<dyn SettingsReader>,
    reconnect: Box<dyn ReconnectTrigger>,
    verbosity: Verbosity,
}

impl fmt::Debug for Provisioner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provisioner")
            .field("client", &self.client)
            .field("key_algorithm", &self.key_algorithm)
            .field("verbosity", &self.verbosity)
            .finish()
    }
}

impl Provisioner {
    /// Create a provisioner over the given client and collaborators.
    pub fn new(
        client: EstClient,
        settings: Box<dyn SettingsReader>,
        reconnect: Box<dyn ReconnectTrigger>,
    ) -> Self {
        Self {
            client,
            request_builder: RequestBuilder::new(),
            key_algorithm: KeyAlgorithm::default(),
            settings,
            reconnect,
            verbosity: Verbosity::default(),
        }
    }

    /// Set the diagnostic verbosity.
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set the subject attributes applied to every CSR.
    pub fn with_request_builder(mut self, builder: RequestBuilder) -> Self {
        self.request_builder = builder;
        self
    }

    /// Set the algorithm used when generating a new device key.
    pub fn with_key_algorithm(mut self, algorithm: KeyAlgorithm) -> Self {
        self.key_algorithm = algorithm;
        self
    }

    /// Provision with whichever credential the caller holds.
    ///
    /// A shared secret drives initial enrollment; a client certificate
    /// drives renewal. The credential is consumed: a one-time enrollment
    /// secret should not outlive its use.
    pub fn provision(&self, credential: AuthCredential) -> Result<Certificate> {
        match credential {
            AuthCredential::SharedSecret(secret) => self.enroll(&secret),
            AuthCredential::ClientCertificate(client_cert) => self.renew_with(*client_cert),
        }
    }

    /// Enroll the device for its first certificate.
    ///
    /// The device identity is the shared secret's device id. Key material
    /// is loaded from the configured key path or generated on first use;
    /// the issued certificate is persisted before dependent services are
    /// reconnected.
    pub fn enroll(&self, secret: &SharedSecret) -> Result<Certificate> {
        let identity = Identity::from(secret.device_id.as_str());
        info!(identity = %identity, "starting certificate enrollment");

        let store = self.store()?;
        let provider = KeyMaterialProvider::with_algorithm(store.clone(), self.key_algorithm);
        let key_pair = provider.load_or_generate(&identity)?;

        let csr = self.request_builder.build(&identity, &key_pair)?;
        self.dump_request(&csr);

        let certificate = self.client.enroll(secret, csr)?;
        self.finish(&store, certificate)
    }

    /// Renew the stored certificate using itself as the credential.
    ///
    /// Fails with [`EstError::NotFound`] when the device was never
    /// enrolled (no certificate or key at the configured paths).
    pub fn renew(&self) -> Result<Certificate> {
        let store = self.store()?;
        let certificate = store.load_certificate()?;
        let key_pair = store.load_key_pair()?;

        self.renew_with(ClientCertificate::new(certificate, key_pair))
    }

    fn renew_with(&self, credential: ClientCertificate) -> Result<Certificate> {
        let identity = credential
            .certificate
            .common_name()
            .map(Identity::from)
            .ok_or_else(|| {
                EstError::csr_construction("current certificate has no Common Name to renew")
            })?;

        info!(
            identity = %identity,
            days_until_expiry = credential.certificate.days_until_expiry(),
            "starting certificate renewal"
        );

        let store = self.store()?;
        let csr = self.request_builder.build(&identity, &credential.key_pair)?;
        self.dump_request(&csr);

        let certificate = self.client.reenroll(&credential, csr)?;
        self.finish(&store, certificate)
    }

    /// Resolve the certificate store from device settings.
    fn store(&self) -> Result<CertificateStore> {
        let cert_path = self.settings.get_setting(settings::DEVICE_CERT_PATH)?;
        let key_path = self.settings.get_setting(settings::DEVICE_KEY_PATH)?;
        Ok(CertificateStore::new(cert_path, key_path))
    }

    /// Persist the issued certificate and notify dependent services.
    ///
    /// The certificate is fully written before the reconnect trigger
    /// runs, so a trigger failure leaves the device provisioned; the
    /// error still propagates so the operator sees it.
    fn finish(&self, store: &CertificateStore, certificate: Certificate) -> Result<Certificate> {
        store.save_certificate(&certificate)?;

        if self.verbosity >= Verbosity::Normal {
            info!(
                subject = %certificate.subject(),
                issuer = %certificate.issuer(),
                days_until_expiry = certificate.days_until_expiry(),
                fingerprint = %certificate.sha256_fingerprint(),
                path = %store.cert_path().display(),
                "certificate stored"
            );
        }
        if self.verbosity >= Verbosity::Debug {
            debug!("issued certificate:\n{}", certificate.to_pem());
        }

        self.reconnect.trigger()?;
        Ok(certificate)
    }

    fn dump_request(&self, csr: &CertificateSigningRequest) {
        if self.verbosity >= Verbosity::Debug {
            debug!("certificate request:\n{}", csr.to_pem());
            debug!(
                "request body (base64):\n{}",
                codec::to_base64_wrapped(csr.der())
            );
        }
    }
}
