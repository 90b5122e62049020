//! Fixed RSA-4096 key pairs for tests.
//!
//! Generating 4096-bit keys at test time takes seconds per key, so tests
//! across the workspace share these fixtures instead.

use base64::{engine::general_purpose::STANDARD, Engine as _};

pub const HOME_PUBLIC_PEM: &str = include_str!("../tests/fixtures/home_public.pem");
pub const HOME_PRIVATE_PEM: &str = include_str!("../tests/fixtures/home_private.pem");
pub const PEER_PUBLIC_PEM: &str = include_str!("../tests/fixtures/peer_public.pem");
pub const PEER_PRIVATE_PEM: &str = include_str!("../tests/fixtures/peer_private.pem");

/// A key pair in the base64-PEM form carried on the wire and returned by
/// the license service.
#[derive(Debug, Clone)]
pub struct TestKeyPair {
    pub public_key: String,
    pub private_key: String,
}

fn pair(public_pem: &str, private_pem: &str) -> TestKeyPair {
    TestKeyPair {
        public_key: STANDARD.encode(public_pem),
        private_key: STANDARD.encode(private_pem),
    }
}

/// Key pair of the local ("home") node.
pub fn home() -> TestKeyPair {
    pair(HOME_PUBLIC_PEM, HOME_PRIVATE_PEM)
}

/// Key pair of a remote peer.
pub fn peer() -> TestKeyPair {
    pair(PEER_PUBLIC_PEM, PEER_PRIVATE_PEM)
}
