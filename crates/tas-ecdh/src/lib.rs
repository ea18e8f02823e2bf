//! # TAS ECDH
//!
//! Key agreement between the Trust Anchor Service and its clients.
//!
//! ## Protocol
//!
//! 1. The client sends an [`EcdhRequest`] with an ephemeral P-256 key, a
//!    16-byte nonce and an optional cipher list, signed with its `#keyagree`
//!    key.
//! 2. The server checks the proof, generates its own ephemeral key and nonce,
//!    and returns a signed [`AckEcdh`].
//! 3. Both sides derive
//!    `truncate(SHA256(ECDH || SHA256(client_nonce || server_nonce)), keylen)`.
//!
//! The session key then encrypts payloads with AES-128/256 in CBC or ECB
//! mode (see [`cipher`]).

pub mod agreement;
pub mod cipher;
pub mod client;
pub mod crypto;
pub mod error;
pub mod messages;

pub use agreement::{EcdhConfig, KeyAgreement, NegotiatedSession};
pub use cipher::{generate_iv, SessionCipher, BLOCK_LEN};
pub use client::{ClientSession, EcdhClient};
pub use crypto::{derive_session_key, merge_nonce, EcdhKeyPair, Nonce, SessionKey, SharedSecret};
pub use error::{EcdhError, Result};
pub use messages::{AckEcdh, EcdhRequest};
