//! Account use-cases: login-time upsert and lookups.

use crate::db::{CancelToken, TxManager};
use crate::error::ServiceResult;
use crate::model::account::{parse_email, validate_profile, Account, AccountProfile};
use crate::presenter::AccountPresenter;
use crate::repo::account_repo::AccountRepository;
use crate::service::log_mutation;
use std::time::Instant;

pub struct AccountService<'s, S, R, P> {
    store: &'s mut S,
    repo: R,
    presenter: P,
}

impl<'s, S, R, P> AccountService<'s, S, R, P>
where
    S: TxManager,
    R: AccountRepository,
    P: AccountPresenter,
{
    pub fn new(store: &'s mut S, repo: R, presenter: P) -> Self {
        Self {
            store,
            repo,
            presenter,
        }
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn into_presenter(self) -> P {
        self.presenter
    }

    /// Returns the account for `profile.email`, creating it on first login
    /// and refreshing profile fields plus `last_login_at` otherwise.
    pub fn create_or_get(&mut self, cancel: &CancelToken, profile: AccountProfile) -> ServiceResult<()> {
        let started_at = Instant::now();
        let result = self.upsert(cancel, &profile);
        log_mutation(
            "account_upsert",
            result.as_ref().map(|a| a.id.as_str()).unwrap_or("-"),
            started_at,
            &result,
        );
        self.presenter.present_account(result?);
        Ok(())
    }

    fn upsert(&mut self, cancel: &CancelToken, profile: &AccountProfile) -> ServiceResult<Account> {
        let profile = validate_profile(profile)?;
        let repo = &self.repo;
        self.store
            .within_transaction(cancel, |db| -> ServiceResult<Account> {
                Ok(repo.upsert_account(db, &profile)?)
            })
    }

    pub fn get_by_id(&mut self, cancel: &CancelToken, id: &str) -> ServiceResult<()> {
        let account = self.repo.get_account(&self.store.handle(cancel), id)?;
        self.presenter.present_account(account);
        Ok(())
    }

    pub fn get_by_email(&mut self, cancel: &CancelToken, email: &str) -> ServiceResult<()> {
        let email = parse_email(email)?;
        let account = self
            .repo
            .get_account_by_email(&self.store.handle(cancel), &email)?;
        self.presenter.present_account(account);
        Ok(())
    }
}
