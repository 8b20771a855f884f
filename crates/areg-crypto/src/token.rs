//! Editor tokens.
//!
//! Wire layout (all integers big-endian):
//!
//! ```text
//! version     u8        TOKEN_VERSION
//! name_len    u16
//! name        [u8; name_len]   UTF-8 editor name
//! issued_at   i64       unix milliseconds
//! flags       u8        bit 0 set when max_age is present
//! max_age     u64       milliseconds, only when flag bit 0 is set
//! tag         [u8; 32]  HMAC-SHA256(secret, every preceding byte)
//! ```
//!
//! Tokens travel as standard base64 of these bytes. Verification is pure: a
//! token carries everything needed to check it against the editor's current
//! secret, and nothing is stored per token.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::{Buf, BufMut};
use chrono::{DateTime, TimeDelta, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::CryptoError;
use crate::secret::EditorSecret;

type HmacSha256 = Hmac<Sha256>;

/// Current token format version.
pub const TOKEN_VERSION: u8 = 1;

const TAG_LEN: usize = 32;
const FLAG_MAX_AGE: u8 = 0b0000_0001;
const MAX_NAME_BYTES: usize = u16::MAX as usize;

/// The signed fields of a token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenClaims {
    pub editor: String,
    pub issued_at: DateTime<Utc>,
    /// `None` means the token never expires by time.
    pub max_age: Option<Duration>,
}

impl TokenClaims {
    /// Build claims. A zero `max_age` is normalized to `None`; any other
    /// duration is rounded up to the one-millisecond wire resolution.
    pub fn new(
        editor: impl Into<String>,
        issued_at: DateTime<Utc>,
        max_age: Option<Duration>,
    ) -> Self {
        let max_age = max_age
            .filter(|d| !d.is_zero())
            .map(|d| d.as_nanos().div_ceil(1_000_000).min(u64::MAX as u128) as u64)
            .map(Duration::from_millis);
        Self {
            editor: editor.into(),
            issued_at: truncate_to_millis(issued_at),
            max_age,
        }
    }

    /// Instant after which the token is expired, if it expires at all.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let max_age = self.max_age?;
        let delta = TimeDelta::from_std(max_age).unwrap_or(TimeDelta::MAX);
        Some(self.issued_at.checked_add_signed(delta).unwrap_or(DateTime::<Utc>::MAX_UTC))
    }

    /// Whether the token is expired at `now`. The expiry instant itself is
    /// still valid.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|exp| now > exp)
    }

    fn check(&self) -> Result<(), CryptoError> {
        let len = self.editor.len();
        if len == 0 || len > MAX_NAME_BYTES {
            return Err(CryptoError::MalformedToken(format!(
                "editor name must be 1..={MAX_NAME_BYTES} bytes"
            )));
        }
        Ok(())
    }

    /// Canonical encoding of the signed fields. Callers must have passed
    /// [`TokenClaims::check`].
    fn encode_into(&self, buf: &mut Vec<u8>) {
        let name = self.editor.as_bytes();
        buf.put_u8(TOKEN_VERSION);
        buf.put_u16(name.len() as u16);
        buf.put_slice(name);
        buf.put_i64(self.issued_at.timestamp_millis());
        match self.max_age {
            Some(max_age) => {
                buf.put_u8(FLAG_MAX_AGE);
                buf.put_u64(max_age.as_millis() as u64);
            }
            None => buf.put_u8(0),
        }
    }
}

/// A signed editor token.
#[derive(Clone, PartialEq, Eq)]
pub struct EditorToken {
    claims: TokenClaims,
    tag: [u8; TAG_LEN],
}

impl EditorToken {
    /// Sign `claims` with `secret`.
    pub fn sign(claims: TokenClaims, secret: &EditorSecret) -> Result<Self, CryptoError> {
        claims.check()?;
        let mut payload = Vec::new();
        claims.encode_into(&mut payload);
        let mut mac = new_mac(secret)?;
        mac.update(&payload);
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&mac.finalize().into_bytes());
        Ok(Self { claims, tag })
    }

    /// Recompute the tag under `secret` and compare in constant time.
    pub fn verify(&self, secret: &EditorSecret) -> Result<(), CryptoError> {
        let mut payload = Vec::new();
        self.claims.encode_into(&mut payload);
        let mut mac = new_mac(secret)?;
        mac.update(&payload);
        mac.verify_slice(&self.tag)
            .map_err(|_| CryptoError::InvalidSignature)
    }

    pub fn claims(&self) -> &TokenClaims {
        &self.claims
    }

    pub fn editor(&self) -> &str {
        &self.claims.editor
    }

    /// Canonical byte encoding (claims followed by the tag).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.claims.encode_into(&mut buf);
        buf.put_slice(&self.tag);
        buf
    }

    /// Decode the canonical byte encoding. The tag is not checked here.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let mut buf = bytes;
        let version = take_u8(&mut buf, "version")?;
        if version != TOKEN_VERSION {
            return Err(CryptoError::MalformedToken(format!(
                "unsupported token version {version}"
            )));
        }
        let name_len = take_u16(&mut buf)? as usize;
        if name_len == 0 || buf.remaining() < name_len {
            return Err(CryptoError::MalformedToken("bad editor name length".into()));
        }
        let editor = std::str::from_utf8(&buf[..name_len])
            .map_err(|_| CryptoError::MalformedToken("editor name is not UTF-8".into()))?
            .to_string();
        buf.advance(name_len);

        let issued_ms = take_i64(&mut buf)?;
        let issued_at = DateTime::<Utc>::from_timestamp_millis(issued_ms)
            .ok_or_else(|| CryptoError::MalformedToken("issued_at out of range".into()))?;

        let flags = take_u8(&mut buf, "flags")?;
        if flags & !FLAG_MAX_AGE != 0 {
            return Err(CryptoError::MalformedToken(format!("unknown flags {flags:#04x}")));
        }
        let max_age = if flags & FLAG_MAX_AGE != 0 {
            let ms = take_u64(&mut buf)?;
            if ms == 0 {
                return Err(CryptoError::MalformedToken("zero max_age with flag set".into()));
            }
            Some(Duration::from_millis(ms))
        } else {
            None
        };

        if buf.remaining() != TAG_LEN {
            return Err(CryptoError::MalformedToken(format!(
                "expected {TAG_LEN}-byte tag, found {} bytes",
                buf.remaining()
            )));
        }
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(buf);

        Ok(Self {
            claims: TokenClaims {
                editor,
                issued_at,
                max_age,
            },
            tag,
        })
    }

    /// Displayable wire form (standard base64).
    pub fn encode(&self) -> String {
        STANDARD.encode(self.to_bytes())
    }

    /// Parse the wire form.
    pub fn decode(s: &str) -> Result<Self, CryptoError> {
        let bytes = STANDARD
            .decode(s.trim())
            .map_err(|e| CryptoError::MalformedToken(format!("invalid base64: {e}")))?;
        Self::from_bytes(&bytes)
    }
}

impl std::fmt::Debug for EditorToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorToken")
            .field("editor", &self.claims.editor)
            .field("issued_at", &self.claims.issued_at)
            .field("max_age", &self.claims.max_age)
            .field("tag", &format_args!("{}...", hex::encode(&self.tag[..4])))
            .finish()
    }
}

fn new_mac(secret: &EditorSecret) -> Result<HmacSha256, CryptoError> {
    HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| CryptoError::InvalidSecret(e.to_string()))
}

fn truncate_to_millis(t: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(t.timestamp_millis()).unwrap_or(t)
}

fn short(field: &str) -> CryptoError {
    CryptoError::MalformedToken(format!("truncated before {field}"))
}

fn take_u8(buf: &mut &[u8], field: &str) -> Result<u8, CryptoError> {
    if buf.remaining() < 1 {
        return Err(short(field));
    }
    Ok(buf.get_u8())
}

fn take_u16(buf: &mut &[u8]) -> Result<u16, CryptoError> {
    if buf.remaining() < 2 {
        return Err(short("name_len"));
    }
    Ok(buf.get_u16())
}

fn take_i64(buf: &mut &[u8]) -> Result<i64, CryptoError> {
    if buf.remaining() < 8 {
        return Err(short("issued_at"));
    }
    Ok(buf.get_i64())
}

fn take_u64(buf: &mut &[u8]) -> Result<u64, CryptoError> {
    if buf.remaining() < 8 {
        return Err(short("max_age"));
    }
    Ok(buf.get_u64())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn sign_and_verify() {
        let secret = EditorSecret::generate();
        let token = EditorToken::sign(TokenClaims::new("cozy", t0(), None), &secret).unwrap();
        assert!(token.verify(&secret).is_ok());
        assert_eq!(token.editor(), "cozy");
    }

    #[test]
    fn verify_fails_with_other_secret() {
        let token =
            EditorToken::sign(TokenClaims::new("cozy", t0(), None), &EditorSecret::generate()).unwrap();
        assert_eq!(
            token.verify(&EditorSecret::generate()),
            Err(CryptoError::InvalidSignature)
        );
    }

    #[test]
    fn wire_roundtrip_preserves_signature() {
        let secret = EditorSecret::generate();
        let claims = TokenClaims::new("cozy", t0(), Some(Duration::from_secs(3600)));
        let token = EditorToken::sign(claims.clone(), &secret).unwrap();
        let decoded = EditorToken::decode(&token.encode()).unwrap();
        assert_eq!(decoded.claims(), &claims);
        assert!(decoded.verify(&secret).is_ok());
    }

    #[test]
    fn zero_max_age_carries_no_expiry() {
        let claims = TokenClaims::new("cozy", t0(), Some(Duration::ZERO));
        assert_eq!(claims.max_age, None);
        assert_eq!(claims.expires_at(), None);

        let secret = EditorSecret::generate();
        let bytes = EditorToken::sign(claims, &secret).unwrap().to_bytes();
        // version + len + "cozy" + issued_at + flags + tag, no max_age field
        assert_eq!(bytes.len(), 1 + 2 + 4 + 8 + 1 + 32);
    }

    #[test]
    fn sub_millisecond_max_age_still_expires() {
        let claims = TokenClaims::new("cozy", t0(), Some(Duration::from_micros(500)));
        assert_eq!(claims.max_age, Some(Duration::from_millis(1)));
        assert!(claims.is_expired_at(t0() + TimeDelta::days(365)));

        let rounded = TokenClaims::new("cozy", t0(), Some(Duration::from_micros(1_500)));
        assert_eq!(rounded.max_age, Some(Duration::from_millis(2)));

        let secret = EditorSecret::generate();
        let token = EditorToken::sign(claims.clone(), &secret).unwrap();
        let decoded = EditorToken::decode(&token.encode()).unwrap();
        assert_eq!(decoded.claims(), &claims);
    }

    #[test]
    fn expiry_boundary() {
        let claims = TokenClaims::new("cozy", t0(), Some(Duration::from_secs(60)));
        let exp = t0() + TimeDelta::seconds(60);
        assert_eq!(claims.expires_at(), Some(exp));
        assert!(!claims.is_expired_at(exp - TimeDelta::milliseconds(1)));
        assert!(!claims.is_expired_at(exp));
        assert!(claims.is_expired_at(exp + TimeDelta::milliseconds(1)));
    }

    #[test]
    fn tampered_fields_fail_verification() {
        let secret = EditorSecret::generate();
        let token = EditorToken::sign(
            TokenClaims::new("cozy", t0(), Some(Duration::from_secs(60))),
            &secret,
        )
        .unwrap();
        let mut bytes = token.to_bytes();
        // Flip a bit of the max_age field (last byte before the tag).
        let idx = bytes.len() - TAG_LEN - 1;
        bytes[idx] ^= 0x01;
        let tampered = EditorToken::from_bytes(&bytes).unwrap();
        assert_eq!(tampered.verify(&secret), Err(CryptoError::InvalidSignature));
    }

    #[test]
    fn renamed_editor_fails_verification() {
        let secret = EditorSecret::generate();
        let token = EditorToken::sign(TokenClaims::new("aaaa", t0(), None), &secret).unwrap();
        let mut bytes = token.to_bytes();
        bytes[3..7].copy_from_slice(b"bbbb");
        let forged = EditorToken::from_bytes(&bytes).unwrap();
        assert_eq!(forged.editor(), "bbbb");
        assert_eq!(forged.verify(&secret), Err(CryptoError::InvalidSignature));
    }

    #[test]
    fn malformed_inputs() {
        assert!(matches!(EditorToken::from_bytes(&[]), Err(CryptoError::MalformedToken(_))));
        assert!(matches!(EditorToken::from_bytes(&[9]), Err(CryptoError::MalformedToken(_))));
        assert!(matches!(EditorToken::decode("not base64!"), Err(CryptoError::MalformedToken(_))));

        let secret = EditorSecret::generate();
        let bytes = EditorToken::sign(TokenClaims::new("cozy", t0(), None), &secret)
            .unwrap()
            .to_bytes();
        assert!(EditorToken::from_bytes(&bytes[..bytes.len() - 1]).is_err());
        let mut longer = bytes.clone();
        longer.push(0);
        assert!(EditorToken::from_bytes(&longer).is_err());
    }

    #[test]
    fn debug_hides_tag() {
        let token =
            EditorToken::sign(TokenClaims::new("cozy", t0(), None), &EditorSecret::generate()).unwrap();
        let debug = format!("{token:?}");
        assert!(debug.contains("cozy"));
        assert!(debug.contains("..."));
    }

    proptest::proptest! {
        #[test]
        fn any_claims_verify_after_decode(
            editor in "[A-Za-z0-9._-]{1,32}",
            secs in 0i64..4_000_000_000,
            max_age_ms in proptest::option::of(1u64..10_000_000_000),
        ) {
            let secret = EditorSecret::generate();
            let issued = DateTime::from_timestamp(secs, 0).unwrap();
            let claims = TokenClaims::new(editor, issued, max_age_ms.map(Duration::from_millis));
            let token = EditorToken::sign(claims.clone(), &secret).unwrap();
            let decoded = EditorToken::decode(&token.encode()).unwrap();
            proptest::prop_assert_eq!(decoded.claims(), &claims);
            proptest::prop_assert!(decoded.verify(&secret).is_ok());
        }
    }
}
