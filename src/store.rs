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

//! Persistent storage for the device certificate and private key.
//!
//! Both artifacts are stored as PEM files at configured paths. The
//! certificate is written world-readable (0644) so that other services on
//! the device can present it; the private key is written owner-only
//! (0600). Loading reports a missing file as [`EstError::NotFound`] and
//! unparseable content as [`EstError::Decoding`], so callers can tell
//! "not provisioned yet" apart from "provisioned but damaged".

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{EstError, Result};
use crate::keys::DeviceKeyPair;
use crate::types::Certificate;

#[cfg(unix)]
const CERT_MODE: u32 = 0o644;
#[cfg(unix)]
const KEY_MODE: u32 = 0o600;

/// File-backed storage for a device's certificate and key.
#[derive(Debug, Clone)]
pub struct CertificateStore {
    cert_path: PathBuf,
    key_path: PathBuf,
}

impl CertificateStore {
    /// Create a store over the given certificate and key paths.
    pub fn new(cert_path: impl Into<PathBuf>, key_path: impl Into<PathBuf>) -> Self {
        Self {
            cert_path: cert_path.into(),
            key_path: key_path.into(),
        }
    }

    /// Path of the certificate file.
    pub fn cert_path(&self) -> &Path {
        &self.cert_path
    }

    /// Path of the private key file.
    pub fn key_path(&self) -> &Path {
        &self.key_path
    }

    /// Persist the certificate as PEM, replacing any previous one.
    pub fn save_certificate(&self, certificate: &Certificate) -> Result<()> {
        if let Some(parent) = self.cert_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&self.cert_path, certificate.to_pem())?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.cert_path, fs::Permissions::from_mode(CERT_MODE))?;
        }

        debug!(path = %self.cert_path.display(), "certificate saved");
        Ok(())
    }

    /// Persist the private key as PKCS#8 PEM, readable only by the owner.
    pub fn save_key_pair(&self, key_pair: &DeviceKeyPair) -> Result<()> {
        if let Some(parent) = self.key_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| self.key_access_error("create key directory", e))?;
        }

        let pem = key_pair.serialize_pem();

        #[cfg(unix)]
        {
            use std::io::Write;
            use std::os::unix::fs::OpenOptionsExt;
            use std::os::unix::fs::PermissionsExt;

            let mut file = fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(KEY_MODE)
                .open(&self.key_path)
                .map_err(|e| self.key_access_error("open key file", e))?;
            file.write_all(pem.as_bytes())
                .map_err(|e| self.key_access_error("write key file", e))?;

            // mode() only applies on creation; enforce it on overwrite too.
            fs::set_permissions(&self.key_path, fs::Permissions::from_mode(KEY_MODE))
                .map_err(|e| self.key_access_error("set key file permissions", e))?;
        }

        #[cfg(not(unix))]
        fs::write(&self.key_path, pem).map_err(|e| self.key_access_error("write key file", e))?;

        debug!(path = %self.key_path.display(), "private key saved");
        Ok(())
    }

    /// Load the stored certificate.
    pub fn load_certificate(&self) -> Result<Certificate> {
        let pem = match fs::read_to_string(&self.cert_path) {
            Ok(pem) => pem,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(EstError::not_found(&self.cert_path));
            }
            Err(e) => return Err(e.into()),
        };

        Certificate::from_pem(&pem)
    }

    /// Load the stored private key.
    ///
    /// The key file may carry additional PEM blocks (a concatenated
    /// certificate, comments); the first PKCS#8 private key block wins.
    pub fn load_key_pair(&self) -> Result<DeviceKeyPair> {
        let data = match fs::read(&self.key_path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(EstError::not_found(&self.key_path));
            }
            Err(e) => return Err(self.key_access_error("read key file", e)),
        };

        let mut reader = io::BufReader::new(&data[..]);
        loop {
            match rustls_pemfile::read_one(&mut reader) {
                Ok(Some(rustls_pemfile::Item::Pkcs8Key(key))) => {
                    return DeviceKeyPair::from_pkcs8_der(&key);
                }
                Ok(Some(rustls_pemfile::Item::Pkcs1Key(_)))
                | Ok(Some(rustls_pemfile::Item::Sec1Key(_))) => {
                    return Err(EstError::decoding(format!(
                        "key file {} is not PKCS#8; re-encode the key as PKCS#8 PEM",
                        self.key_path.display()
                    )));
                }
                Ok(Some(_)) => continue,
                Ok(None) => break,
                Err(e) => {
                    return Err(EstError::decoding(format!(
                        "failed to parse key file {}: {e}",
                        self.key_path.display()
                    )));
                }
            }
        }

        Err(EstError::decoding(format!(
            "no private key found in {}",
            self.key_path.display()
        )))
    }

    fn key_access_error(&self, action: &str, e: io::Error) -> EstError {
        EstError::key_access(format!(
            "failed to {action} {}: {e}",
            self.key_path.display()
        ))
    }
}
