//! Consent lifecycle.
//!
//! A consent is a grant from a borrower, requested by a lender, to read that
//! borrower's credential for a bounded time. Only the status string and the
//! timestamps are stored; the effective state is derived at check time by
//! [`consent_state`], so expiry needs no background sweeper.
//!
//! ```text
//!            now > expires_at
//!   Active ───────────────────▶ Expired
//!     │
//!     │ status != "active" (administrative)
//!     ▼
//!   Inactive
//! ```
//!
//! The requesting actor passed to [`ConsentManager::validate`] is taken from
//! a caller-supplied header. It is trusted only because the bearer gate in
//! front of the service authenticated the channel; this module does not
//! verify that the actor really is that lender.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use credcommons_storage::{CONSENT_STATUS_ACTIVE, CommonsStore, Consent};
use tracing::info;

use crate::audit::{AuditEvent, AuditTrail};
use crate::error::ConsentError;

/// Effective state of a consent at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentState {
    /// Status is `active` and the window has not closed.
    Active,
    /// Status is `active` but `expires_at` has passed.
    Expired,
    /// Status was changed away from `active`.
    Inactive,
}

impl fmt::Display for ConsentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => f.write_str("active"),
            Self::Expired => f.write_str("expired"),
            Self::Inactive => f.write_str("inactive"),
        }
    }
}

/// Derive the effective state of `consent` at `now`.
///
/// The window is inclusive: a consent is still active at exactly
/// `expires_at`.
#[must_use]
pub fn consent_state(consent: &Consent, now: DateTime<Utc>) -> ConsentState {
    if consent.status != CONSENT_STATUS_ACTIVE {
        ConsentState::Inactive
    } else if now > consent.expires_at {
        ConsentState::Expired
    } else {
        ConsentState::Active
    }
}

/// Generate a consent id: `consent-` followed by 128 random bits in hex.
///
/// Ids are unique under concurrent creation without coordination.
#[must_use]
pub fn generate_consent_id() -> String {
    format!("consent-{}", uuid::Uuid::new_v4().simple())
}

/// A lender's request for a new consent.
#[derive(Debug, Clone, Default)]
pub struct ConsentRequest {
    pub borrower_reference: String,
    /// Identity of the requesting lender; becomes the consent's `lender_id`.
    pub lender_id: String,
    pub scope: Vec<String>,
    pub purpose: String,
    pub assisted_by: Option<String>,
    pub duration_days: i64,
}

impl ConsentRequest {
    fn validate(&self) -> Result<Duration, ConsentError> {
        let missing = |field: &str| ConsentError::Validation {
            reason: format!("{field} is required"),
        };
        if self.borrower_reference.is_empty() {
            return Err(missing("borrower_reference"));
        }
        if self.scope.is_empty() {
            return Err(missing("scope"));
        }
        if self.purpose.is_empty() {
            return Err(missing("purpose"));
        }
        if self.duration_days <= 0 {
            return Err(ConsentError::Validation {
                reason: "duration_days must be positive".to_owned(),
            });
        }
        Duration::try_days(self.duration_days).ok_or_else(|| ConsentError::Validation {
            reason: "duration_days is out of range".to_owned(),
        })
    }
}

/// Creates and enforces consent grants.
pub struct ConsentManager {
    store: Arc<dyn CommonsStore>,
    audit: Arc<AuditTrail>,
}

impl ConsentManager {
    /// Create a manager over the given store and audit trail.
    #[must_use]
    pub fn new(store: Arc<dyn CommonsStore>, audit: Arc<AuditTrail>) -> Self {
        Self { store, audit }
    }

    /// Create and persist a new active consent.
    ///
    /// # Errors
    ///
    /// - [`ConsentError::Validation`] if a field is empty or the duration is
    ///   not positive.
    /// - [`ConsentError::Storage`] if persisting fails.
    pub async fn create(&self, request: ConsentRequest) -> Result<Consent, ConsentError> {
        self.create_at(request, Utc::now()).await
    }

    /// [`create`](Self::create) with an explicit issuance instant.
    ///
    /// # Errors
    ///
    /// See [`create`](Self::create).
    pub async fn create_at(
        &self,
        request: ConsentRequest,
        now: DateTime<Utc>,
    ) -> Result<Consent, ConsentError> {
        let window = request.validate()?;
        let expires_at = now
            .checked_add_signed(window)
            .ok_or_else(|| ConsentError::Validation {
                reason: "duration_days is out of range".to_owned(),
            })?;

        let consent = Consent {
            id: generate_consent_id(),
            borrower_reference: request.borrower_reference,
            lender_id: request.lender_id,
            scope: request.scope,
            purpose: request.purpose,
            assisted_by: request.assisted_by.filter(|a| !a.is_empty()),
            issued_at: now,
            expires_at,
            status: CONSENT_STATUS_ACTIVE.to_owned(),
        };
        self.store.save_consent(&consent).await?;

        info!(
            consent_id = %consent.id,
            borrower_reference = %consent.borrower_reference,
            expires_at = %consent.expires_at,
            "consent created"
        );
        self.audit
            .record(
                AuditEvent::now("consent_created", &consent.lender_id)
                    .with("consent_id", consent.id.clone()),
            )
            .await;

        Ok(consent)
    }

    /// Fetch a consent and check it may be used by `requesting_actor` now.
    ///
    /// An empty actor skips the lender binding check.
    ///
    /// # Errors
    ///
    /// - [`ConsentError::NotFound`] if no consent has this id.
    /// - [`ConsentError::Inactive`] if the consent is expired or not active.
    /// - [`ConsentError::ActorMismatch`] if a non-empty actor is not the
    ///   consent's lender.
    /// - [`ConsentError::Storage`] if the lookup fails.
    pub async fn validate(
        &self,
        consent_id: &str,
        requesting_actor: &str,
    ) -> Result<Consent, ConsentError> {
        self.validate_at(consent_id, requesting_actor, Utc::now())
            .await
    }

    /// [`validate`](Self::validate) at an explicit instant.
    ///
    /// # Errors
    ///
    /// See [`validate`](Self::validate).
    pub async fn validate_at(
        &self,
        consent_id: &str,
        requesting_actor: &str,
        now: DateTime<Utc>,
    ) -> Result<Consent, ConsentError> {
        let consent =
            self.store
                .get_consent(consent_id)
                .await?
                .ok_or_else(|| ConsentError::NotFound {
                    consent_id: consent_id.to_owned(),
                })?;

        let state = consent_state(&consent, now);
        if state != ConsentState::Active {
            return Err(ConsentError::Inactive {
                consent_id: consent.id,
                state,
            });
        }

        if !requesting_actor.is_empty() && requesting_actor != consent.lender_id {
            return Err(ConsentError::ActorMismatch {
                consent_id: consent.id,
            });
        }

        Ok(consent)
    }
}

impl fmt::Debug for ConsentManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsentManager").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;

    use chrono::TimeZone;
    use credcommons_storage::MemoryStore;

    use super::*;
    use crate::audit::{AuditSink, MemoryAuditSink};

    const LENDER: &str = "lender-jkbank";

    fn request(duration_days: i64) -> ConsentRequest {
        ConsentRequest {
            borrower_reference: "ref-001".to_owned(),
            lender_id: LENDER.to_owned(),
            scope: vec!["credit_score".to_owned()],
            purpose: "loan_eval".to_owned(),
            assisted_by: None,
            duration_days,
        }
    }

    fn manager() -> (ConsentManager, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let manager = ConsentManager::new(
            Arc::clone(&store) as Arc<dyn CommonsStore>,
            Arc::new(AuditTrail::new()),
        );
        (manager, store)
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn create_sets_window_and_status() {
        let (manager, store) = manager();
        let consent = manager.create_at(request(30), t0()).await.unwrap();

        assert!(consent.id.starts_with("consent-"));
        assert_eq!(consent.status, "active");
        assert_eq!(consent.issued_at, t0());
        assert_eq!(consent.expires_at, t0() + Duration::hours(30 * 24));
        assert_eq!(consent.lender_id, LENDER);
        assert_eq!(
            store.get_consent(&consent.id).await.unwrap(),
            Some(consent)
        );
    }

    #[tokio::test]
    async fn create_rejects_invalid_requests() {
        let (manager, _) = manager();
        let cases = [
            ConsentRequest {
                borrower_reference: String::new(),
                ..request(30)
            },
            ConsentRequest {
                scope: Vec::new(),
                ..request(30)
            },
            ConsentRequest {
                purpose: String::new(),
                ..request(30)
            },
            request(0),
            request(-5),
            request(i64::MAX),
        ];
        for case in cases {
            let result = manager.create_at(case, t0()).await;
            assert!(matches!(result, Err(ConsentError::Validation { .. })));
        }
    }

    #[tokio::test]
    async fn empty_assisted_by_is_dropped() {
        let (manager, _) = manager();
        let consent = manager
            .create_at(
                ConsentRequest {
                    assisted_by: Some(String::new()),
                    ..request(1)
                },
                t0(),
            )
            .await
            .unwrap();
        assert_eq!(consent.assisted_by, None);

        let assisted = manager
            .create_at(
                ConsentRequest {
                    assisted_by: Some("csc-agent-7".to_owned()),
                    ..request(1)
                },
                t0(),
            )
            .await
            .unwrap();
        assert_eq!(assisted.assisted_by.as_deref(), Some("csc-agent-7"));
    }

    #[tokio::test]
    async fn ids_are_unique_under_concurrent_creation() {
        let (manager, _) = manager();
        let manager = Arc::new(manager);
        let mut handles = Vec::new();
        for _ in 0..64 {
            let manager = Arc::clone(&manager);
            handles.push(tokio::spawn(async move {
                manager.create_at(request(1), t0()).await.unwrap().id
            }));
        }
        let mut ids = HashSet::new();
        for handle in handles {
            assert!(ids.insert(handle.await.unwrap()));
        }
        assert_eq!(ids.len(), 64);
    }

    #[tokio::test]
    async fn valid_until_last_second_of_window() {
        let (manager, _) = manager();
        let consent = manager.create_at(request(30), t0()).await.unwrap();
        let end = t0() + Duration::days(30);

        let before = manager
            .validate_at(&consent.id, LENDER, end - Duration::seconds(1))
            .await;
        assert!(before.is_ok());

        let at = manager.validate_at(&consent.id, LENDER, end).await;
        assert!(at.is_ok());

        let after = manager
            .validate_at(&consent.id, LENDER, end + Duration::seconds(1))
            .await;
        assert!(matches!(
            after,
            Err(ConsentError::Inactive {
                state: ConsentState::Expired,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn unknown_consent_is_not_found() {
        let (manager, _) = manager();
        let result = manager.validate_at("consent-missing", LENDER, t0()).await;
        assert!(matches!(result, Err(ConsentError::NotFound { .. })));
    }

    #[tokio::test]
    async fn non_active_status_is_inactive() {
        let (manager, store) = manager();
        let mut consent = manager.create_at(request(30), t0()).await.unwrap();
        consent.status = "revoked".to_owned();
        store.save_consent(&consent).await.unwrap();

        let result = manager.validate_at(&consent.id, LENDER, t0()).await;
        assert!(matches!(
            result,
            Err(ConsentError::Inactive {
                state: ConsentState::Inactive,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn actor_binding() {
        let (manager, _) = manager();
        let consent = manager.create_at(request(30), t0()).await.unwrap();

        assert!(manager.validate_at(&consent.id, LENDER, t0()).await.is_ok());
        assert!(manager.validate_at(&consent.id, "", t0()).await.is_ok());

        let other = manager.validate_at(&consent.id, "lender-other", t0()).await;
        assert!(matches!(other, Err(ConsentError::ActorMismatch { .. })));
    }

    #[tokio::test]
    async fn expiry_is_checked_before_actor() {
        let (manager, _) = manager();
        let consent = manager.create_at(request(1), t0()).await.unwrap();
        let result = manager
            .validate_at(&consent.id, "lender-other", t0() + Duration::days(2))
            .await;
        assert!(matches!(result, Err(ConsentError::Inactive { .. })));
    }

    #[tokio::test]
    async fn create_emits_audit_event() {
        let store = Arc::new(MemoryStore::new());
        let audit = Arc::new(AuditTrail::new());
        let sink = Arc::new(MemoryAuditSink::new());
        audit.add_sink(Arc::clone(&sink) as Arc<dyn AuditSink>).await;
        let manager = ConsentManager::new(store, audit);

        let consent = manager.create_at(request(7), t0()).await.unwrap();

        let events = sink.events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, "consent_created");
        assert_eq!(events[0].actor, LENDER);
        assert_eq!(events[0].metadata["consent_id"], consent.id);
    }

    #[test]
    fn state_derivation_is_pure() {
        let consent = Consent {
            id: "consent-x".to_owned(),
            borrower_reference: "ref-001".to_owned(),
            lender_id: LENDER.to_owned(),
            scope: vec!["credit_score".to_owned()],
            purpose: "loan_eval".to_owned(),
            assisted_by: None,
            issued_at: t0(),
            expires_at: t0() + Duration::days(1),
            status: "active".to_owned(),
        };
        assert_eq!(consent_state(&consent, t0()), ConsentState::Active);
        assert_eq!(
            consent_state(&consent, t0() + Duration::days(2)),
            ConsentState::Expired
        );
        let suspended = Consent {
            status: "suspended".to_owned(),
            ..consent
        };
        assert_eq!(consent_state(&suspended, t0()), ConsentState::Inactive);
    }
}
