// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::errors::{InternalError, ProtocolError};
use crate::messages::{
    CredentialFinalization, CredentialRequest, CredentialResponse, RegistrationRequest,
    RegistrationResponse, RegistrationUpload,
};
use crate::opaque::{ClientLogin, ClientRegistration, ServerLogin, ServerRegistration, UserRecord};
use crate::store::UserStore;
use num_bigint_dig::BigUint;
use num_traits::{One, Zero};
use rand::rngs::OsRng;
use rsa::RsaPrivateKey;

// Tests
// =====

const USERNAME: &str = "user";
const PASSWORD: &[u8] = b"password";
const RSA_BITS: usize = 1024;

fn register(server_key: &RsaPrivateKey) -> UserRecord {
    let mut rng = OsRng;
    let client_start = ClientRegistration::start(&mut rng, USERNAME, PASSWORD, RSA_BITS).unwrap();
    let server_start = ServerRegistration::start(
        &mut rng,
        &server_key.to_public_key(),
        client_start.message,
    )
    .unwrap();
    let client_finish = client_start
        .state
        .finish(&mut rng, server_start.message)
        .unwrap();
    server_start.state.finish(client_finish.message)
}

#[test]
fn authentication_scenarios() {
    let mut rng = OsRng;
    let server_key = RsaPrivateKey::new(&mut rng, RSA_BITS).unwrap();
    let record = register(&server_key);

    // Correct password: both sides agree on a fresh 16-byte secret.
    {
        let client_login = ClientLogin::start(&mut rng, USERNAME, PASSWORD).unwrap();
        let server_login =
            ServerLogin::start(&mut rng, &server_key, &record, client_login.message).unwrap();
        let client_result = client_login
            .state
            .finish(&mut rng, server_login.message)
            .unwrap();
        let server_result = server_login.state.finish(client_result.message).unwrap();
        assert_eq!(client_result.shared_secret, server_result.shared_secret);
        assert_eq!(client_result.shared_secret.len(), 16);
    }

    // Two logins yield different session secrets.
    {
        let run = |rng: &mut OsRng| {
            let client_login = ClientLogin::start(rng, USERNAME, PASSWORD).unwrap();
            let server_login =
                ServerLogin::start(rng, &server_key, &record, client_login.message).unwrap();
            client_login
                .state
                .finish(rng, server_login.message)
                .unwrap()
                .shared_secret
        };
        assert_ne!(run(&mut rng), run(&mut rng));
    }

    // Wrong password: the envelope refuses to open on the client. A client
    // that pushes on with a forged finalization fails verification on the
    // server.
    {
        let client_login = ClientLogin::start(&mut rng, USERNAME, b"wrong password").unwrap();
        let server_login =
            ServerLogin::start(&mut rng, &server_key, &record, client_login.message).unwrap();
        let err = client_login
            .state
            .finish(&mut rng, server_login.message)
            .unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::VerificationError(InternalError::AuthtagMismatch)
        ));
        assert!(err.to_string().contains("Authtag mismatch"));

        let forged = CredentialFinalization {
            signature: vec![0u8; RSA_BITS / 8],
            mac: vec![0u8; 32],
        };
        let err = server_login.state.finish(forged).unwrap_err();
        assert!(matches!(err, ProtocolError::SignatureError(_)));
    }

    // Tampered blinded element, set to zero: not a group element.
    {
        let client_login = ClientLogin::start(&mut rng, USERNAME, PASSWORD).unwrap();
        let mut message = client_login.message;
        message.alpha = BigUint::zero();
        let err = ServerLogin::start(&mut rng, &server_key, &record, message).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::VerificationError(InternalError::NotInGroupError { name: "a" })
        ));
        assert!(err.to_string().contains("a is not in D-H group"));
    }

    // Tampered blinded element, set to one: in a small subgroup.
    {
        let client_login = ClientLogin::start(&mut rng, USERNAME, PASSWORD).unwrap();
        let mut message = client_login.message;
        message.alpha = BigUint::one();
        let err = ServerLogin::start(&mut rng, &server_key, &record, message).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::VerificationError(InternalError::SmallSubgroupError { name: "a" })
        ));
        assert!(err.to_string().contains("a is in a small subgroup"));
    }

    // Substituted server ephemeral key: the signature no longer covers the
    // transcript the client reconstructs.
    {
        let client_login = ClientLogin::start(&mut rng, USERNAME, PASSWORD).unwrap();
        let server_login =
            ServerLogin::start(&mut rng, &server_key, &record, client_login.message).unwrap();
        let mut message = server_login.message;
        message.server_e_pk = BigUint::from(123u32);
        let err = client_login
            .state
            .finish(&mut rng, message)
            .unwrap_err();
        assert!(matches!(err, ProtocolError::SignatureError(_)));
    }

    // Tampered server MAC: flips one bit.
    {
        let client_login = ClientLogin::start(&mut rng, USERNAME, PASSWORD).unwrap();
        let server_login =
            ServerLogin::start(&mut rng, &server_key, &record, client_login.message).unwrap();
        let mut message = server_login.message;
        message.mac[0] ^= 1;
        let err = client_login
            .state
            .finish(&mut rng, message)
            .unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::VerificationError(InternalError::MacMismatch)
        ));
        assert!(err.to_string().contains("MAC mismatch"));
    }

    // Tampered client signature: the server rejects the finalization.
    {
        let client_login = ClientLogin::start(&mut rng, USERNAME, PASSWORD).unwrap();
        let server_login =
            ServerLogin::start(&mut rng, &server_key, &record, client_login.message).unwrap();
        let client_result = client_login
            .state
            .finish(&mut rng, server_login.message)
            .unwrap();
        let mut message = client_result.message;
        message.signature[0] ^= 1;
        let err = server_login.state.finish(message).unwrap_err();
        assert!(matches!(err, ProtocolError::SignatureError(_)));
    }

    // Tampered client MAC.
    {
        let client_login = ClientLogin::start(&mut rng, USERNAME, PASSWORD).unwrap();
        let server_login =
            ServerLogin::start(&mut rng, &server_key, &record, client_login.message).unwrap();
        let client_result = client_login
            .state
            .finish(&mut rng, server_login.message)
            .unwrap();
        let mut message = client_result.message;
        message.mac[31] ^= 0x80;
        let err = server_login.state.finish(message).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::VerificationError(InternalError::MacMismatch)
        ));
    }
}

// Runs registration and login with every message and the stored record
// passed through its wire encoding, the way a real deployment would.
#[test]
fn full_flow_over_serialized_messages() {
    let mut rng = OsRng;
    let server_key = RsaPrivateKey::new(&mut rng, RSA_BITS).unwrap();
    let store = UserStore::new();

    // Registration
    let client_start = ClientRegistration::start(&mut rng, USERNAME, PASSWORD, RSA_BITS).unwrap();
    let request = RegistrationRequest::deserialize(&client_start.message.serialize()).unwrap();
    let server_start =
        ServerRegistration::start(&mut rng, &server_key.to_public_key(), request).unwrap();
    let response =
        RegistrationResponse::deserialize(&server_start.message.serialize().unwrap()).unwrap();
    let client_finish = client_start.state.finish(&mut rng, response).unwrap();
    let upload =
        RegistrationUpload::deserialize(&client_finish.message.serialize().unwrap()).unwrap();
    store.insert(server_start.state.finish(upload));

    // The record survives a round trip through its at-rest encoding
    let record = store.get(USERNAME).unwrap();
    let record = UserRecord::deserialize(&record.serialize().unwrap()).unwrap();

    // An unregistered username is reported distinctly
    assert!(matches!(
        store.get("mallory").unwrap_err(),
        ProtocolError::UnknownUserError(_)
    ));

    // Login
    let client_login = ClientLogin::start(&mut rng, USERNAME, PASSWORD).unwrap();
    let request = CredentialRequest::deserialize(&client_login.message.serialize()).unwrap();
    let server_login = ServerLogin::start(&mut rng, &server_key, &record, request).unwrap();
    let response = CredentialResponse::deserialize(&server_login.message.serialize()).unwrap();
    let client_result = client_login.state.finish(&mut rng, response).unwrap();
    let finalization =
        CredentialFinalization::deserialize(&client_result.message.serialize()).unwrap();
    let server_result = server_login.state.finish(finalization).unwrap();

    assert_eq!(client_result.shared_secret, server_result.shared_secret);
}
