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

//! End-to-end provisioning tests against a mock EST server.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use est_provision::{
    settings, CertificateStore, ClientCertificate, DeviceKeyPair, EstError, KeyAlgorithm,
    Provisioner, ReconnectTrigger, SettingsReader, SharedSecret,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::integration::{fixtures, MockEstServer, PATH_SIMPLEENROLL, PATH_SIMPLEREENROLL};

/// Settings backed by a map, standing in for the device configuration tool.
struct MapSettings(HashMap<String, String>);

impl SettingsReader for MapSettings {
    fn get_setting(&self, key: &str) -> est_provision::Result<String> {
        self.0
            .get(key)
            .cloned()
            .ok_or_else(|| EstError::not_found(key))
    }
}

/// Reconnect trigger that records invocations.
#[derive(Clone, Default)]
struct CountingTrigger(Arc<AtomicUsize>);

impl CountingTrigger {
    fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl ReconnectTrigger for CountingTrigger {
    fn trigger(&self) -> est_provision::Result<()> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Reconnect trigger that always fails, like a dead connection agent.
struct FailingTrigger;

impl ReconnectTrigger for FailingTrigger {
    fn trigger(&self) -> est_provision::Result<()> {
        Err(std::io::Error::other("connection agent refused to restart").into())
    }
}

/// Certificate store and matching settings rooted in a temp directory.
fn provisioning_paths(dir: &tempfile::TempDir) -> (CertificateStore, MapSettings) {
    let store = CertificateStore::new(
        dir.path().join("device-cert.pem"),
        dir.path().join("device-key.pem"),
    );
    let mut map = HashMap::new();
    map.insert(
        settings::DEVICE_CERT_PATH.to_string(),
        store.cert_path().display().to_string(),
    );
    map.insert(
        settings::DEVICE_KEY_PATH.to_string(),
        store.key_path().display().to_string(),
    );
    (store, MapSettings(map))
}

#[test]
fn test_enroll_end_to_end() {
    let mock = MockEstServer::start();
    mock.mock_enroll_success(&fixtures::enrollment_response("device-001"));

    let dir = tempfile::tempdir().expect("tempdir");
    let (store, settings) = provisioning_paths(&dir);
    let trigger = CountingTrigger::default();
    let provisioner = Provisioner::new(mock.client(), Box::new(settings), Box::new(trigger.clone()));

    let issued = provisioner
        .enroll(&SharedSecret::new("device-001", "one-time-secret"))
        .expect("enrollment should succeed");

    // Certificate and generated key are both on disk afterwards.
    let stored = store.load_certificate().expect("certificate stored");
    assert_eq!(stored.der(), issued.der());
    store.load_key_pair().expect("key stored");
    assert_eq!(trigger.count(), 1);
}

#[test]
fn test_enroll_reuses_existing_key() {
    let mock = MockEstServer::start();
    mock.mock_enroll_success(&fixtures::enrollment_response("device-001"));

    let dir = tempfile::tempdir().expect("tempdir");
    let (store, settings) = provisioning_paths(&dir);

    // A key provisioned out of band must survive enrollment untouched.
    let existing = DeviceKeyPair::generate(KeyAlgorithm::default()).expect("generate key");
    store.save_key_pair(&existing).expect("seed key");

    let provisioner = Provisioner::new(
        mock.client(),
        Box::new(settings),
        Box::new(CountingTrigger::default()),
    );
    provisioner
        .enroll(&SharedSecret::new("device-001", "one-time-secret"))
        .expect("enrollment should succeed");

    let after = store.load_key_pair().expect("key still on disk");
    assert_eq!(after.public_key_der(), existing.public_key_der());
}

#[test]
fn test_renew_end_to_end() {
    let mock = MockEstServer::start();
    mock.mock_reenroll_success(&fixtures::enrollment_response("device-001"));

    let dir = tempfile::tempdir().expect("tempdir");
    let (store, settings) = provisioning_paths(&dir);

    // Device was previously enrolled: certificate and key on disk.
    let (certificate, key_pair) = fixtures::device_identity("device-001");
    store.save_certificate(&certificate).expect("seed certificate");
    store.save_key_pair(&key_pair).expect("seed key");

    let trigger = CountingTrigger::default();
    let provisioner = Provisioner::new(mock.client(), Box::new(settings), Box::new(trigger.clone()));

    let renewed = provisioner.renew().expect("renewal should succeed");

    // The stored certificate is replaced by the renewed one.
    let stored = store.load_certificate().expect("certificate stored");
    assert_eq!(stored.der(), renewed.der());
    assert_ne!(stored.der(), certificate.der());
    assert_eq!(trigger.count(), 1);

    // The renewal request reused the stored subject.
    let requests = mock.received_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url.path(), PATH_SIMPLEREENROLL);
    assert_eq!(
        fixtures::csr_common_name(&requests[0].body).as_deref(),
        Some("device-001")
    );
}

#[test]
fn test_provision_dispatches_on_credential() {
    let mock = MockEstServer::start();
    mock.mock_enroll_success(&fixtures::enrollment_response("device-001"));
    mock.mock_reenroll_success(&fixtures::enrollment_response("device-001"));

    let dir = tempfile::tempdir().expect("tempdir");
    let (store, settings) = provisioning_paths(&dir);
    let provisioner = Provisioner::new(
        mock.client(),
        Box::new(settings),
        Box::new(CountingTrigger::default()),
    );

    // A shared secret drives initial enrollment.
    provisioner
        .provision(SharedSecret::new("device-001", "one-time-secret").into())
        .expect("initial provisioning should succeed");

    // The stored credential drives renewal.
    let credential = ClientCertificate::new(
        store.load_certificate().expect("certificate stored"),
        store.load_key_pair().expect("key stored"),
    );
    provisioner
        .provision(credential.into())
        .expect("renewal provisioning should succeed");

    let paths: Vec<String> = mock
        .received_requests()
        .iter()
        .map(|request| request.url.path().to_string())
        .collect();
    assert_eq!(paths, vec![PATH_SIMPLEENROLL, PATH_SIMPLEREENROLL]);
}

#[test]
fn test_missing_settings_fail_before_network() {
    let mock = MockEstServer::start();
    mock.mount(
        Mock::given(method("POST"))
            .and(path(PATH_SIMPLEENROLL))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .named("enroll must not reach the server"),
    );

    let dir = tempfile::tempdir().expect("tempdir");
    let mut map = HashMap::new();
    map.insert(
        settings::DEVICE_CERT_PATH.to_string(),
        dir.path().join("device-cert.pem").display().to_string(),
    );

    let provisioner = Provisioner::new(
        mock.client(),
        Box::new(MapSettings(map)),
        Box::new(CountingTrigger::default()),
    );

    let err = provisioner
        .enroll(&SharedSecret::new("device-001", "one-time-secret"))
        .unwrap_err();

    assert!(err.is_not_found());
    assert!(mock.received_requests().is_empty());
}

#[test]
fn test_renew_with_expired_certificate_fails_offline() {
    let mock = MockEstServer::start();
    mock.mount(
        Mock::given(method("POST"))
            .and(path(PATH_SIMPLEREENROLL))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .named("re-enroll must not reach the server"),
    );

    let dir = tempfile::tempdir().expect("tempdir");
    let (store, settings) = provisioning_paths(&dir);
    let (certificate, key_pair) = fixtures::expired_identity("device-001");
    store.save_certificate(&certificate).expect("seed certificate");
    store.save_key_pair(&key_pair).expect("seed key");

    let trigger = CountingTrigger::default();
    let provisioner = Provisioner::new(mock.client(), Box::new(settings), Box::new(trigger.clone()));

    let err = provisioner.renew().unwrap_err();

    assert!(matches!(err, EstError::ExpiredCredential(_)));
    assert_eq!(trigger.count(), 0);
    // The expired certificate is left in place for the operator to inspect.
    let still_stored = store.load_certificate().expect("certificate still stored");
    assert_eq!(still_stored.der(), certificate.der());
}

#[test]
fn test_reconnect_failure_still_stores_certificate() {
    let mock = MockEstServer::start();
    mock.mock_enroll_success(&fixtures::enrollment_response("device-001"));

    let dir = tempfile::tempdir().expect("tempdir");
    let (store, settings) = provisioning_paths(&dir);
    let provisioner = Provisioner::new(mock.client(), Box::new(settings), Box::new(FailingTrigger));

    let err = provisioner
        .enroll(&SharedSecret::new("device-001", "one-time-secret"))
        .unwrap_err();

    // The trigger failure propagates, but the device is provisioned.
    assert!(matches!(err, EstError::Io(_)));
    let stored = store
        .load_certificate()
        .expect("certificate stored despite trigger failure");
    assert_eq!(stored.common_name().as_deref(), Some("device-001"));
}
