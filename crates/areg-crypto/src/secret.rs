use rand::RngCore;

use crate::error::CryptoError;

/// Length in bytes of generated secrets.
pub const SECRET_LEN: usize = 32;

/// Symmetric signing key owned by one editor.
///
/// Never leaves the credential manager; `Debug` is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct EditorSecret(Box<[u8]>);

impl EditorSecret {
    /// Generate a fresh secret from the OS-seeded thread RNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; SECRET_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(Box::new(bytes))
    }

    /// Wrap existing key material. Empty material is rejected.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self, CryptoError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(CryptoError::InvalidSecret("secret must not be empty".into()));
        }
        Ok(Self(bytes.into_boxed_slice()))
    }

    /// Parse from a hex string, as persisted by file-backed registries.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s).map_err(|e| CryptoError::InvalidSecret(e.to_string()))?;
        Self::from_bytes(bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for EditorSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EditorSecret(<redacted>)")
    }
}
