// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

//! An implementation of the OPAQUE asymmetric password authentication key
//! exchange protocol, instantiated over the 2048-bit MODP group from RFC
//! 3526 with RSA long-term keys.
//!
//! Note: This implementation follows
//! [draft-krawczyk-cfrg-opaque-00](https://tools.ietf.org/html/draft-krawczyk-cfrg-opaque-00),
//! an early draft of the protocol.
//!
//! # Overview
//!
//! OPAQUE is a protocol between a client and a server. The client knows a
//! username and a password; the server holds a per-user record and a
//! long-term RSA keypair. Two three-message protocols are provided:
//!
//! * **Registration**, which must run over an authenticated channel. The
//!   client's password is fed through an oblivious PRF keyed with a
//!   server-chosen salt, and the resulting randomized password seals an
//!   envelope holding the client's freshly generated long-term private key
//!   and the server's public key. The server stores the sealed envelope and
//!   the client's public key; it never sees the password and stores nothing
//!   that is equivalent to it.
//! * **Login**, which can run over an insecure channel. Both sides rerun
//!   the oblivious PRF so the client can reopen its envelope, then perform
//!   an ephemeral Diffie-Hellman exchange. Each side signs the exchange
//!   with its long-term RSA key and MACs its own identity under a key
//!   derived from the exchange. A successful run yields a fresh 16-byte
//!   secret shared by both parties.
//!
//! ## Setup
//!
//! The server begins by generating a long-term RSA keypair, which may be
//! shared across all users:
//!
//! ```
//! use rand::rngs::OsRng;
//! use rsa::RsaPrivateKey;
//! let mut rng = OsRng;
//! let server_key = RsaPrivateKey::new(&mut rng, 1024)?;
//! # Ok::<(), rsa::Error>(())
//! ```
//!
//! The private component is used by the server during login; the public
//! component is handed to clients during registration.
//!
//! ## Registration
//!
//! Registration consists of four steps along with three messages:
//! [`RegistrationRequest`], [`RegistrationResponse`], and
//! [`RegistrationUpload`]. A successful run produces a [`UserRecord`] that
//! the server persists for future logins.
//!
//! ```
//! use opaque_modp::{ClientRegistration, ServerRegistration};
//! use rand::rngs::OsRng;
//! use rsa::RsaPrivateKey;
//!
//! let mut rng = OsRng;
//! let server_key = RsaPrivateKey::new(&mut rng, 1024)?;
//!
//! // Client: blind the password
//! let client_start = ClientRegistration::start(&mut rng, "alice", b"hunter2", 1024)?;
//!
//! // Server: sample a per-user OPRF key and evaluate the blinded element
//! let server_start = ServerRegistration::start(
//!     &mut rng,
//!     &server_key.to_public_key(),
//!     client_start.message,
//! )?;
//!
//! // Client: unblind, generate a long-term keypair, seal the envelope
//! let client_finish = client_start.state.finish(&mut rng, server_start.message)?;
//!
//! // Server: produce the record to persist for this user
//! let record = server_start.state.finish(client_finish.message);
//! assert_eq!(record.username, "alice");
//! # Ok::<(), opaque_modp::errors::ProtocolError>(())
//! ```
//!
//! ## Login
//!
//! Login also consists of four steps along with three messages:
//! [`CredentialRequest`], [`CredentialResponse`], and
//! [`CredentialFinalization`]. It succeeds only if the password matches the
//! one used during the registration that produced the server's record.
//!
//! ```
//! use opaque_modp::{
//!     ClientLogin, ClientRegistration, ServerLogin, ServerRegistration, UserStore,
//! };
//! use rand::rngs::OsRng;
//! use rsa::RsaPrivateKey;
//!
//! let mut rng = OsRng;
//! let server_key = RsaPrivateKey::new(&mut rng, 1024)?;
//! # let client_start = ClientRegistration::start(&mut rng, "alice", b"hunter2", 1024)?;
//! # let server_start =
//! #     ServerRegistration::start(&mut rng, &server_key.to_public_key(), client_start.message)?;
//! # let client_finish = client_start.state.finish(&mut rng, server_start.message)?;
//! let store = UserStore::new();
//! store.insert(server_start.state.finish(client_finish.message));
//!
//! // Client: blind the password and sample an ephemeral D-H keypair
//! let client_login = ClientLogin::start(&mut rng, "alice", b"hunter2")?;
//!
//! // Server: look up the user, evaluate the OPRF, sign the exchange
//! let record = store.get(client_login.message.username())?;
//! let server_login = ServerLogin::start(&mut rng, &server_key, &record, client_login.message)?;
//!
//! // Client: open the envelope, authenticate the server, answer its proof
//! let client_result = client_login.state.finish(&mut rng, server_login.message)?;
//!
//! // Server: authenticate the client
//! let server_result = server_login.state.finish(client_result.message)?;
//!
//! assert_eq!(client_result.shared_secret, server_result.shared_secret);
//! assert_eq!(client_result.shared_secret.len(), 16);
//! # Ok::<(), opaque_modp::errors::ProtocolError>(())
//! ```
//!
//! A login with the wrong password fails on the client with an authtag
//! mismatch when the envelope refuses to open; the server never learns
//! whether the password was correct before the client proves it.
//!
//! Note that the shared secret is returned raw. Deriving directional
//! session keys from it is the caller's responsibility.

#![deny(unsafe_code)]
#![deny(missing_docs)]

// Error types
pub mod errors;

// High-level API
mod opaque;

mod messages;

mod auth_enc;
mod envelope;
mod group;
mod oprf;
mod serialization;
mod store;

#[cfg(test)]
mod tests;

// Exports

pub use crate::messages::{
    CredentialFinalization, CredentialRequest, CredentialResponse, RegistrationRequest,
    RegistrationResponse, RegistrationUpload,
};
pub use crate::opaque::{
    ClientLogin, ClientLoginFinishResult, ClientLoginStartResult, ClientRegistration,
    ClientRegistrationFinishResult, ClientRegistrationStartResult, ServerLogin,
    ServerLoginFinishResult, ServerLoginStartResult, ServerRegistration,
    ServerRegistrationStartResult, UserRecord, MIN_RSA_BITS,
};
pub use crate::store::UserStore;
