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

//! Integration tests for POST /simplereenroll

use est_provision::{ClientCertificate, EstError, Identity, RequestBuilder};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::integration::{fixtures, header_value, MockEstServer, PATH_SIMPLEREENROLL};

#[test]
fn test_successful_reenrollment() {
    let mock = MockEstServer::start();
    mock.mock_reenroll_success(&fixtures::enrollment_response("device-001"));

    // Renewal signs the request with the current device key and presents
    // the current certificate as the TLS credential.
    let (certificate, key_pair) = fixtures::device_identity("device-001");
    let csr = RequestBuilder::new()
        .build(&Identity::new("device-001"), &key_pair)
        .expect("build renewal request");
    let credential = ClientCertificate::new(certificate, key_pair);

    let renewed = mock
        .client()
        .reenroll(&credential, csr)
        .expect("re-enrollment should succeed");

    assert_eq!(renewed.common_name().as_deref(), Some("device-001"));

    // No Basic credentials on the wire; the client certificate is the
    // only authenticator for renewal.
    let requests = mock.received_requests();
    assert_eq!(requests.len(), 1);
    assert!(header_value(&requests[0], "authorization").is_none());
}

#[test]
fn test_expired_credential_is_refused_locally() {
    let mock = MockEstServer::start();
    mock.mount(
        Mock::given(method("POST"))
            .and(path(PATH_SIMPLEREENROLL))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .named("re-enroll must not reach the server"),
    );

    let (certificate, key_pair) = fixtures::expired_identity("device-001");
    let csr = RequestBuilder::new()
        .build(&Identity::new("device-001"), &key_pair)
        .expect("build renewal request");
    let credential = ClientCertificate::new(certificate, key_pair);

    let err = mock.client().reenroll(&credential, csr).unwrap_err();

    match err {
        EstError::ExpiredCredential(message) => {
            assert!(message.contains("expired"), "unexpected message: {message}");
        }
        other => panic!("expected ExpiredCredential, got: {other:?}"),
    }
    assert!(mock.received_requests().is_empty());
}
