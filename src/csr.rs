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

//! PKCS#10 Certificate Signing Request generation.
//!
//! The [`RequestBuilder`] produces CSRs whose subject Common Name carries
//! the device identity, signed with the device key. Additional subject
//! attributes (organization, locality, ...) are optional and apply to
//! every request the builder produces.
//!
//! # Example
//!
//! ```no_run
//! use est_provision::{DeviceKeyPair, Identity, KeyAlgorithm, RequestBuilder};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let key_pair = DeviceKeyPair::generate(KeyAlgorithm::default())?;
//! let csr = RequestBuilder::new()
//!     .organization("Example Corp")
//!     .country("US")
//!     .build(&Identity::from("device-001"), &key_pair)?;
//! println!("{}", csr.to_pem());
//! # Ok(())
//! # }
//! ```

use rcgen::{CertificateParams, DnType};

use crate::error::{EstError, Result};
use crate::keys::DeviceKeyPair;
use crate::types::{CertificateSigningRequest, Identity};

/// Builder for device certificate signing requests.
///
/// The subject Common Name is not configured here; it is taken from the
/// [`Identity`] passed to [`build`](Self::build) so that a request can
/// never be issued for a name other than the device's own.
#[derive(Debug, Default, Clone)]
pub struct RequestBuilder {
    organization: Option<String>,
    organizational_unit: Option<String>,
    country: Option<String>,
    state: Option<String>,
    locality: Option<String>,
}

impl RequestBuilder {
    /// Create a builder that emits CN-only subjects.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the Organization (O) for the subject.
    pub fn organization(mut self, org: impl Into<String>) -> Self {
        self.organization = Some(org.into());
        self
    }

    /// Set the Organizational Unit (OU) for the subject.
    pub fn organizational_unit(mut self, ou: impl Into<String>) -> Self {
        self.organizational_unit = Some(ou.into());
        self
    }

    /// Set the Country (C) for the subject.
    pub fn country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    /// Set the State/Province (ST) for the subject.
    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// Set the Locality (L) for the subject.
    pub fn locality(mut self, locality: impl Into<String>) -> Self {
        self.locality = Some(locality.into());
        self
    }

    /// Build a CSR for the given identity, signed with the device key.
    ///
    /// Fails with [`EstError::CsrConstruction`] when the identity is empty
    /// or the key cannot produce a signature.
    pub fn build(
        &self,
        identity: &Identity,
        key_pair: &DeviceKeyPair,
    ) -> Result<CertificateSigningRequest> {
        if identity.is_empty() {
            return Err(EstError::csr_construction(
                "device identity must not be empty",
            ));
        }

        let mut params = CertificateParams::default();
        params
            .distinguished_name
            .push(DnType::CommonName, identity.as_str());
        if let Some(org) = &self.organization {
            params
                .distinguished_name
                .push(DnType::OrganizationName, org.as_str());
        }
        if let Some(ou) = &self.organizational_unit {
            params
                .distinguished_name
                .push(DnType::OrganizationalUnitName, ou.as_str());
        }
        if let Some(country) = &self.country {
            params
                .distinguished_name
                .push(DnType::CountryName, country.as_str());
        }
        if let Some(state) = &self.state {
            params
                .distinguished_name
                .push(DnType::StateOrProvinceName, state.as_str());
        }
        if let Some(locality) = &self.locality {
            params
                .distinguished_name
                .push(DnType::LocalityName, locality.as_str());
        }

        let csr = params
            .serialize_request(key_pair.signing_key())
            .map_err(|e| EstError::csr_construction(format!("failed to serialize CSR: {e}")))?;

        Ok(CertificateSigningRequest::new(csr.der().to_vec()))
    }
}
