use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use areg_crypto::{CryptoError, EditorSecret, EditorToken, TokenClaims};
use areg_types::validate_editor_name;

use crate::clock::{Clock, SystemClock};
use crate::error::{EditorError, EditorResult};
use crate::traits::EditorRegistry;

/// Creates editor secrets, issues tokens and verifies them.
///
/// Verification reads the editor's current secret and nothing else, so it
/// needs no locking beyond what the registry does for a single read.
#[derive(Clone)]
pub struct CredentialManager {
    registry: Arc<dyn EditorRegistry>,
    clock: Arc<dyn Clock>,
}

impl CredentialManager {
    pub fn new(registry: Arc<dyn EditorRegistry>) -> Self {
        Self::with_clock(registry, Arc::new(SystemClock))
    }

    pub fn with_clock(registry: Arc<dyn EditorRegistry>, clock: Arc<dyn Clock>) -> Self {
        Self { registry, clock }
    }

    pub fn registry(&self) -> &Arc<dyn EditorRegistry> {
        &self.registry
    }

    /// Generate a fresh secret for `editor`, replacing any previous one.
    ///
    /// Every token signed with the previous secret stops verifying.
    pub async fn create_secret(&self, editor: &str) -> EditorResult<()> {
        validate_editor_name(editor)?;
        self.registry
            .put_secret(editor, EditorSecret::generate())
            .await?;
        info!(editor, "editor secret rotated");
        Ok(())
    }

    /// Issue a token for `editor`. A `max_age` of `None` or zero yields a
    /// token that never expires by time.
    pub async fn issue_token(
        &self,
        editor: &str,
        max_age: Option<Duration>,
    ) -> EditorResult<EditorToken> {
        let secret = self.secret_of(editor).await?;
        let claims = TokenClaims::new(editor, self.clock.now(), max_age);
        let token = EditorToken::sign(claims, &secret).map_err(|e| match e {
            CryptoError::InvalidSignature => EditorError::InvalidSignature,
            other => EditorError::Unavailable(other.to_string()),
        })?;
        debug!(editor, max_age = ?token.claims().max_age, "token issued");
        Ok(token)
    }

    /// Verify a token in its wire (base64) form and return the editor name.
    pub async fn verify_token(&self, encoded: &str) -> EditorResult<String> {
        let token = EditorToken::decode(encoded).map_err(|e| {
            debug!(error = %e, "rejecting undecodable token");
            EditorError::InvalidSignature
        })?;
        self.verify(&token).await
    }

    /// Verify a decoded token and return the editor name.
    ///
    /// Checks run in order: editor exists, tag matches the current secret,
    /// token not expired. An expired token with a bad tag reports
    /// `InvalidSignature`.
    pub async fn verify(&self, token: &EditorToken) -> EditorResult<String> {
        let editor = token.editor();
        let secret = self.secret_of(editor).await?;
        token
            .verify(&secret)
            .map_err(|_| EditorError::InvalidSignature)?;
        let claims = token.claims();
        if claims.is_expired_at(self.clock.now()) {
            return Err(EditorError::TokenExpired {
                editor: editor.to_string(),
                expired_at: claims.expires_at().unwrap_or(claims.issued_at),
            });
        }
        Ok(editor.to_string())
    }

    async fn secret_of(&self, editor: &str) -> EditorResult<Arc<EditorSecret>> {
        self.registry
            .get_secret(editor)
            .await?
            .ok_or_else(|| EditorError::UnknownEditor(editor.to_string()))
    }
}

impl std::fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialManager").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::memory::InMemoryEditorRegistry;
    use chrono::{DateTime, Utc};

    fn start() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn manager() -> (CredentialManager, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start()));
        let mgr = CredentialManager::with_clock(
            Arc::new(InMemoryEditorRegistry::new()),
            clock.clone(),
        );
        (mgr, clock)
    }

    #[tokio::test]
    async fn issue_then_verify() {
        let (mgr, _) = manager();
        mgr.create_secret("cozy").await.unwrap();
        let token = mgr.issue_token("cozy", None).await.unwrap();
        assert_eq!(mgr.verify_token(&token.encode()).await.unwrap(), "cozy");
    }

    #[tokio::test]
    async fn unknown_editor_cannot_get_a_token() {
        let (mgr, _) = manager();
        assert!(matches!(
            mgr.issue_token("ghost", None).await,
            Err(EditorError::UnknownEditor(name)) if name == "ghost"
        ));
    }

    #[tokio::test]
    async fn rotation_invalidates_prior_tokens() {
        let (mgr, _) = manager();
        mgr.create_secret("cozy").await.unwrap();
        let old = mgr.issue_token("cozy", None).await.unwrap().encode();
        mgr.create_secret("cozy").await.unwrap();
        assert!(matches!(
            mgr.verify_token(&old).await,
            Err(EditorError::InvalidSignature)
        ));
        let fresh = mgr.issue_token("cozy", None).await.unwrap().encode();
        assert_eq!(mgr.verify_token(&fresh).await.unwrap(), "cozy");
    }

    #[tokio::test]
    async fn expiry_boundary() {
        let (mgr, clock) = manager();
        mgr.create_secret("cozy").await.unwrap();
        let token = mgr
            .issue_token("cozy", Some(Duration::from_secs(60)))
            .await
            .unwrap()
            .encode();

        clock.set(start() + chrono::TimeDelta::milliseconds(59_999));
        assert!(mgr.verify_token(&token).await.is_ok());
        clock.set(start() + chrono::TimeDelta::seconds(60));
        assert!(mgr.verify_token(&token).await.is_ok());
        clock.set(start() + chrono::TimeDelta::milliseconds(60_001));
        assert!(matches!(
            mgr.verify_token(&token).await,
            Err(EditorError::TokenExpired { .. })
        ));
    }

    #[tokio::test]
    async fn zero_max_age_never_expires() {
        let (mgr, clock) = manager();
        mgr.create_secret("cozy").await.unwrap();
        let token = mgr
            .issue_token("cozy", Some(Duration::ZERO))
            .await
            .unwrap();
        assert_eq!(token.claims().max_age, None);
        clock.advance(Duration::from_secs(10 * 365 * 24 * 3600));
        assert!(mgr.verify(&token).await.is_ok());
    }

    #[tokio::test]
    async fn removed_editor_is_unknown() {
        let (mgr, _) = manager();
        mgr.create_secret("cozy").await.unwrap();
        let token = mgr.issue_token("cozy", None).await.unwrap();
        mgr.registry().delete("cozy").await.unwrap();
        assert!(matches!(
            mgr.verify(&token).await,
            Err(EditorError::UnknownEditor(_))
        ));
    }

    #[tokio::test]
    async fn garbage_is_an_invalid_signature() {
        let (mgr, _) = manager();
        for input in ["", "not base64!", "AAAA"] {
            assert!(matches!(
                mgr.verify_token(input).await,
                Err(EditorError::InvalidSignature)
            ));
        }
    }

    #[tokio::test]
    async fn token_signed_by_another_editor_secret_fails() {
        let (mgr, _) = manager();
        mgr.create_secret("cozy").await.unwrap();
        mgr.create_secret("mallory").await.unwrap();
        let secret = mgr.registry().get_secret("mallory").await.unwrap().unwrap();
        let forged = EditorToken::sign(TokenClaims::new("cozy", start(), None), &secret).unwrap();
        assert!(matches!(
            mgr.verify(&forged).await,
            Err(EditorError::InvalidSignature)
        ));
    }

    #[tokio::test]
    async fn invalid_editor_names_are_rejected() {
        let (mgr, _) = manager();
        assert!(matches!(
            mgr.create_secret("bad name").await,
            Err(EditorError::InvalidName(_))
        ));
    }

    #[tokio::test]
    async fn concurrent_verification_during_rotation() {
        let (mgr, _) = manager();
        mgr.create_secret("cozy").await.unwrap();
        let token = mgr.issue_token("cozy", None).await.unwrap().encode();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let mgr = mgr.clone();
            let token = token.clone();
            handles.push(tokio::spawn(async move {
                // Either outcome is fine; a torn secret would surface as a
                // different error or a panic.
                match mgr.verify_token(&token).await {
                    Ok(name) => assert_eq!(name, "cozy"),
                    Err(EditorError::InvalidSignature) => {}
                    Err(other) => panic!("unexpected error {other}"),
                }
            }));
        }
        mgr.create_secret("cozy").await.unwrap();
        for h in handles {
            h.await.unwrap();
        }
        assert!(matches!(
            mgr.verify_token(&token).await,
            Err(EditorError::InvalidSignature)
        ));
    }

    proptest::proptest! {
        #[test]
        fn roundtrip_any_editor(name in "[a-z][a-z0-9_.-]{0,30}", secs in 0u64..10_000_000) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let (mgr, clock) = manager();
                mgr.create_secret(&name).await.unwrap();
                let token = mgr
                    .issue_token(&name, Some(Duration::from_secs(secs + 1)))
                    .await
                    .unwrap()
                    .encode();
                clock.advance(Duration::from_secs(secs));
                assert_eq!(mgr.verify_token(&token).await.unwrap(), name);
            });
        }
    }
}
