//! Shared application state for the Credit Commons server.
//!
//! A single [`AppState`] is constructed at startup and shared across all
//! Axum handlers via `Arc`. It holds the directory, consent manager,
//! issuance pipeline, and disclosure service, all wired to one store and
//! one audit trail.

use std::sync::Arc;

use tracing::warn;

use credcommons_core::audit::AuditTrail;
use credcommons_core::consent::ConsentManager;
use credcommons_core::crypto::EnvelopeKey;
use credcommons_core::disclosure::DisclosureService;
use credcommons_core::discovery::Directory;
use credcommons_core::issuance::IssuancePipeline;
use credcommons_core::presentation::{IssuerKey, PresentationSigner};
use credcommons_storage::CommonsStore;

use crate::config::ServerConfig;

/// Shared application state passed to all HTTP handlers.
pub struct AppState {
    /// Borrower discovery.
    pub directory: Directory,
    /// Consent creation and validation.
    pub consents: Arc<ConsentManager>,
    /// Credential issuance and revocation.
    pub issuance: IssuancePipeline,
    /// Signed presentation of consented credentials.
    pub disclosure: DisclosureService,
    /// Static bearer token. `None` disables the gate.
    pub expected_bearer: Option<String>,
}

impl AppState {
    /// Wire the services from `config` over `store` and `audit`.
    ///
    /// Missing keys are replaced with freshly generated ones. Credentials
    /// sealed under a generated envelope key cannot be read after restart.
    #[must_use]
    pub fn from_config(
        config: ServerConfig,
        store: Arc<dyn CommonsStore>,
        audit: Arc<AuditTrail>,
    ) -> Self {
        let envelope_key = config.credential_key.unwrap_or_else(|| {
            warn!("CREDENTIAL_KEY not set, generating an ephemeral envelope key");
            EnvelopeKey::generate()
        });
        let issuer_key = config.issuer_key.unwrap_or_else(|| {
            warn!("ED25519_PRIVATE_KEY not set, generating an ephemeral signing key");
            IssuerKey::generate()
        });

        let consents = Arc::new(ConsentManager::new(Arc::clone(&store), Arc::clone(&audit)));
        let directory = Directory::new(
            Arc::clone(&store),
            Arc::clone(&audit),
            config.discovery_page_limit,
        );
        let issuance = IssuancePipeline::new(
            Arc::clone(&store),
            envelope_key.clone(),
            config.issuer.clone(),
            Arc::clone(&audit),
        );
        let disclosure = DisclosureService::new(
            Arc::clone(&consents),
            store,
            envelope_key,
            PresentationSigner::new(config.issuer, issuer_key),
            audit,
        );

        Self {
            directory,
            consents,
            issuance,
            disclosure,
            expected_bearer: config.expected_bearer,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}
