//! Template use-cases.
//!
//! # Responsibility
//! - Create templates with their fields in one transaction.
//! - Reconcile field lists positionally on update.
//! - Guard shrink and delete of templates that notes still reference.
//!
//! # Invariants
//! - A rejected shrink or delete issues zero writes.
//! - Field writes apply in plan order: updates, creates, deletes.

use crate::db::{CancelToken, TxManager};
use crate::error::{ServiceError, ServiceResult};
use crate::model::template::{plan_field_reconciliation, validate_template, FieldDraft, TemplateFilters};
use crate::model::validation::{
    ensure_template_deletable, normalize_and_validate_fields, require_template_name,
    validate_ownership,
};
use crate::presenter::TemplatePresenter;
use crate::repo::template_repo::TemplateRepository;
use crate::service::{caller_id, log_mutation, read_back};
use serde::Deserialize;
use std::time::Instant;

/// Create command payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreateTemplateInput {
    pub name: String,
    pub owner_id: String,
    pub fields: Vec<FieldDraft>,
}

/// Update command payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UpdateTemplateInput {
    pub name: String,
    /// `None` keeps the persisted fields untouched.
    #[serde(default)]
    pub fields: Option<Vec<FieldDraft>>,
}

/// Template orchestration over injected store, repository and presenter.
pub struct TemplateService<'s, S, R, P> {
    store: &'s mut S,
    repo: R,
    presenter: P,
}

impl<'s, S, R, P> TemplateService<'s, S, R, P>
where
    S: TxManager,
    R: TemplateRepository,
    P: TemplatePresenter,
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

    pub fn list(&mut self, cancel: &CancelToken, filters: &TemplateFilters) -> ServiceResult<()> {
        let templates = self
            .repo
            .list_templates(&self.store.handle(cancel), filters)?;
        self.presenter.present_template_list(templates);
        Ok(())
    }

    pub fn get(&mut self, cancel: &CancelToken, id: &str) -> ServiceResult<()> {
        let view = self.repo.get_template(&self.store.handle(cancel), id)?;
        self.presenter.present_template(view);
        Ok(())
    }

    /// Validates and inserts a template with all of its fields.
    ///
    /// # Errors
    /// - `TemplateNameRequired`, `OwnerRequired` or a field-list error
    ///   before any write.
    /// - `NotFound` when the owner account does not exist.
    pub fn create(&mut self, cancel: &CancelToken, input: CreateTemplateInput) -> ServiceResult<()> {
        let started_at = Instant::now();
        let result = self.insert_template(cancel, input);
        log_mutation(
            "template_create",
            result.as_deref().unwrap_or("-"),
            started_at,
            &result,
        );
        let id = result?;
        self.present_fresh(cancel, &id, "created template not found in read-back")
    }

    /// Renames a template and, when `input.fields` is set, reconciles its
    /// fields by position.
    ///
    /// # Errors
    /// - `Unauthorized` when `actor_id` is not the owner.
    /// - `TemplateInUse` when shrinking a template that notes reference.
    pub fn update(
        &mut self,
        cancel: &CancelToken,
        id: &str,
        actor_id: &str,
        input: UpdateTemplateInput,
    ) -> ServiceResult<()> {
        let started_at = Instant::now();
        let result = self.reconcile_template(cancel, id, actor_id, input);
        log_mutation("template_update", id, started_at, &result);
        result?;
        self.present_fresh(cancel, id, "updated template not found in read-back")
    }

    /// Deletes an unused template and its fields.
    pub fn delete(&mut self, cancel: &CancelToken, id: &str, actor_id: &str) -> ServiceResult<()> {
        let started_at = Instant::now();
        let result = self.remove_template(cancel, id, actor_id);
        log_mutation("template_delete", id, started_at, &result);
        result?;
        self.presenter.present_template_deleted(id);
        Ok(())
    }

    fn insert_template(
        &mut self,
        cancel: &CancelToken,
        input: CreateTemplateInput,
    ) -> ServiceResult<String> {
        let owner_id = caller_id("account", &input.owner_id)?;
        let fields = validate_template(&input.name, &owner_id, input.fields)?;
        let name = input.name.trim();
        let owner_id = owner_id.as_str();

        let repo = &self.repo;
        self.store
            .within_transaction(cancel, |db| -> ServiceResult<String> {
                let id = repo.create_template(db, name, owner_id)?;
                for draft in &fields {
                    repo.create_field(db, &id, draft)?;
                }
                Ok(id)
            })
    }

    fn reconcile_template(
        &mut self,
        cancel: &CancelToken,
        id: &str,
        actor_id: &str,
        input: UpdateTemplateInput,
    ) -> ServiceResult<()> {
        let actor_id = caller_id("account", actor_id)?;
        let current = self.repo.get_template(&self.store.handle(cancel), id)?;
        validate_ownership(&current.template.owner_id, &actor_id)?;
        require_template_name(&input.name)?;
        let requested = input
            .fields
            .map(normalize_and_validate_fields)
            .transpose()?;

        let template_id = current.template.id.as_str();
        let name = input.name.trim();
        let repo = &self.repo;
        self.store.within_transaction(cancel, |db| -> ServiceResult<()> {
            let plan = match requested.as_deref() {
                Some(requested) => {
                    let existing = repo.list_fields_by_template(db, template_id)?;
                    let plan = plan_field_reconciliation(&existing, requested, || {
                        repo.is_template_used(db, template_id)
                            .map_err(ServiceError::from)
                    })?;
                    Some(plan)
                }
                None => None,
            };

            repo.update_template_meta(db, template_id, name)?;
            if let Some(plan) = plan {
                for update in &plan.updates {
                    repo.update_field(db, update)?;
                }
                for draft in &plan.creates {
                    repo.create_field(db, template_id, draft)?;
                }
                for field_id in &plan.deletes {
                    repo.delete_field(db, field_id)?;
                }
            }
            Ok(())
        })
    }

    fn remove_template(&mut self, cancel: &CancelToken, id: &str, actor_id: &str) -> ServiceResult<()> {
        let actor_id = caller_id("account", actor_id)?;
        let current = self.repo.get_template(&self.store.handle(cancel), id)?;
        validate_ownership(&current.template.owner_id, &actor_id)?;
        ensure_template_deletable(current.is_used)?;

        let template_id = current.template.id.as_str();
        let repo = &self.repo;
        self.store.within_transaction(cancel, |db| -> ServiceResult<()> {
            // Usage may have changed since the unlocked read above.
            ensure_template_deletable(repo.is_template_used(db, template_id)?)?;
            repo.delete_template(db, template_id)?;
            Ok(())
        })
    }

    fn present_fresh(
        &mut self,
        cancel: &CancelToken,
        id: &str,
        details: &'static str,
    ) -> ServiceResult<()> {
        let view = read_back(self.repo.get_template(&self.store.handle(cancel), id), details)?;
        self.presenter.present_template(view);
        Ok(())
    }
}
