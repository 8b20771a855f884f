//! Cryptographic primitives for the apps registry.
//!
//! Provides per-editor symmetric secrets and the editor token format: a
//! self-contained byte payload (editor name, issuance time, optional max age)
//! authenticated with HMAC-SHA256 under the editor's secret.
//!
//! All crypto operations wrap established libraries.

pub mod digest;
pub mod error;
pub mod secret;
pub mod token;

pub use digest::sha256_hex;
pub use error::CryptoError;
pub use secret::EditorSecret;
pub use token::{EditorToken, TokenClaims, TOKEN_VERSION};
