//! Account record that owns templates and notes.
//!
//! Accounts are upserted by email from an identity provider profile. The
//! aggregates only reference them by id; read views embed an
//! [`OwnerSummary`].

use crate::model::validation::{DomainError, DomainResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+$").expect("valid email regex"));

/// Persisted account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub provider: String,
    pub provider_account_id: String,
    pub thumbnail: Option<String>,
    /// Epoch milliseconds of the last upsert-by-login.
    pub last_login_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Minimal owner info embedded in template and note views.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerSummary {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub thumbnail: Option<String>,
}

/// Profile delivered by an identity provider on login.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AccountProfile {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub provider: String,
    pub provider_account_id: String,
    pub thumbnail: Option<String>,
}

/// Trims and checks an email address.
pub fn parse_email(raw: &str) -> DomainResult<String> {
    let trimmed = raw.trim();
    if !EMAIL_RE.is_match(trimmed) {
        return Err(DomainError::InvalidEmail);
    }
    Ok(trimmed.to_string())
}

/// Validates a login profile before it is upserted.
///
/// Returns the profile with a normalized email.
pub fn validate_profile(profile: &AccountProfile) -> DomainResult<AccountProfile> {
    let email = parse_email(&profile.email)?;
    if profile.first_name.trim().is_empty() && profile.last_name.trim().is_empty() {
        return Err(DomainError::AccountNameRequired);
    }
    if profile.provider.trim().is_empty() {
        return Err(DomainError::ProviderRequired);
    }
    if profile.provider_account_id.trim().is_empty() {
        return Err(DomainError::ProviderAccountRequired);
    }
    Ok(AccountProfile {
        email,
        ..profile.clone()
    })
}
