//! `SeaORM` implementation of the `LicenseService` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::db::{License, Store};
use crate::services::binding::BindingDecision;
use crate::services::expiry;
use crate::services::license_service::{
    LicenseError, LicenseService, LicenseView, Rejection, Verdict, evaluate,
};

/// Keys are stored uppercase; presented keys are matched case-insensitively.
fn normalize_key(key: &str) -> String {
    key.trim().to_uppercase()
}

pub struct SeaOrmLicenseService {
    store: Store,
}

impl SeaOrmLicenseService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    async fn load(&self, key: &str) -> Result<Option<License>, LicenseError> {
        Ok(self.store.get_license_by_key(key).await?)
    }

    fn parse_expiry(license: &License) -> Result<Option<DateTime<Utc>>, LicenseError> {
        expiry::parse_stored(license.expiry.as_deref()).map_err(|e| {
            LicenseError::Internal(format!(
                "Corrupt expiry on license {}: {e}",
                license.key_code
            ))
        })
    }
}

#[async_trait]
impl LicenseService for SeaOrmLicenseService {
    async fn validate(&self, key: &str, identity: &str) -> Result<Verdict, LicenseError> {
        let key = normalize_key(key);
        let identity = identity.trim();
        let now = Utc::now();

        // Two passes: losing the first-use binding race re-reads the row and
        // re-evaluates as a normal match check instead of surfacing an error.
        for attempt in 0..2 {
            let Some(license) = self.load(&key).await? else {
                return Ok(Verdict::Rejected(Rejection::NotFound));
            };
            let expiry = Self::parse_expiry(&license)?;

            match evaluate(&license, expiry, identity, now) {
                Err(rejection) => return Ok(Verdict::Rejected(rejection)),
                Ok(BindingDecision::NeedsBind) => {
                    if self.store.conditional_bind(license.id, identity).await? {
                        let mut bound = license;
                        bound.hwid = Some(identity.to_string());
                        return Ok(Verdict::Valid(LicenseView::project(&bound, expiry, now)));
                    }
                    debug!("Lost first-bind race for {key} (attempt {attempt}), re-evaluating");
                }
                Ok(BindingDecision::Unlocked) if license.hwid.is_none() => {
                    // Informational only: record the first identity seen, but
                    // never enforce it and never care who won.
                    self.store.conditional_bind(license.id, identity).await?;
                    return Ok(Verdict::Valid(LicenseView::project(&license, expiry, now)));
                }
                Ok(_) => return Ok(Verdict::Valid(LicenseView::project(&license, expiry, now))),
            }
        }

        // The winner bound a different identity and the re-evaluation still
        // saw the row unbound only because it changed under us again.
        Ok(Verdict::Rejected(Rejection::IdentityMismatch))
    }

    async fn redeem(
        &self,
        key: &str,
        identity: &str,
        user_id: i32,
    ) -> Result<Verdict, LicenseError> {
        let key = normalize_key(key);
        let identity = identity.trim();
        let now = Utc::now();

        for attempt in 0..2 {
            let Some(license) = self.load(&key).await? else {
                return Ok(Verdict::Rejected(Rejection::NotFound));
            };
            let expiry = Self::parse_expiry(&license)?;

            match evaluate(&license, expiry, identity, now) {
                Err(rejection) => return Ok(Verdict::Rejected(rejection)),
                Ok(_) => {
                    // Binding, owner assignment, and the use-count increment
                    // commit as one guarded update; its WHERE clause re-checks
                    // the binding and exhaustion preconditions.
                    if self.store.redeem_license(license.id, identity, user_id).await? {
                        let mut updated = license;
                        updated.hwid.get_or_insert_with(|| identity.to_string());
                        updated.uses += 1;
                        updated.user_id = Some(user_id);
                        return Ok(Verdict::Valid(LicenseView::project(&updated, expiry, now)));
                    }
                    debug!("Lost redeem race for {key} (attempt {attempt}), re-evaluating");
                }
            }
        }

        Err(LicenseError::Conflict(
            "License changed concurrently; retry the request".to_string(),
        ))
    }

    async fn precheck(&self, key: &str, identity: &str) -> Result<Verdict, LicenseError> {
        let key = normalize_key(key);
        let identity = identity.trim();
        let now = Utc::now();

        let Some(license) = self.load(&key).await? else {
            return Ok(Verdict::Rejected(Rejection::NotFound));
        };
        let expiry = Self::parse_expiry(&license)?;

        match evaluate(&license, expiry, identity, now) {
            Err(rejection) => Ok(Verdict::Rejected(rejection)),
            Ok(_) => Ok(Verdict::Valid(LicenseView::project(&license, expiry, now))),
        }
    }
}
