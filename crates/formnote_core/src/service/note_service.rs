//! Note use-cases.
//!
//! # Responsibility
//! - Create notes with full section coverage in one transaction.
//! - Edit titles and section content without changing the section set.
//! - Drive the Draft/Publish status machine.
//!
//! # Invariants
//! - A failed create leaves neither the note row nor any of its sections.
//! - Only the owner may update, change status or delete a note.

use crate::db::{CancelToken, TxManager};
use crate::error::ServiceResult;
use crate::model::note::{
    plan_status_change, resolve_section_edits, validate_note_for_create, NoteFilters, NoteStatus,
    SectionDraft, SectionEdit,
};
use crate::model::validation::{require_owner, require_title, validate_ownership, validate_sections};
use crate::presenter::NotePresenter;
use crate::repo::note_repo::{NewNote, NoteRepository};
use crate::repo::template_repo::TemplateRepository;
use crate::service::{caller_id, canonical_drafts, canonical_edits, log_mutation, read_back};
use serde::Deserialize;
use std::time::Instant;

/// Create command payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreateNoteInput {
    pub title: String,
    pub template_id: String,
    pub owner_id: String,
    /// Exactly one entry per template field.
    pub sections: Vec<SectionDraft>,
}

/// Update command payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UpdateNoteInput {
    pub title: String,
    /// `None` leaves section content untouched.
    #[serde(default)]
    pub sections: Option<Vec<SectionEdit>>,
}

/// Note orchestration over injected store, repositories and presenter.
pub struct NoteService<'s, S, N, T, P> {
    store: &'s mut S,
    notes: N,
    templates: T,
    presenter: P,
}

impl<'s, S, N, T, P> NoteService<'s, S, N, T, P>
where
    S: TxManager,
    N: NoteRepository,
    T: TemplateRepository,
    P: NotePresenter,
{
    pub fn new(store: &'s mut S, notes: N, templates: T, presenter: P) -> Self {
        Self {
            store,
            notes,
            templates,
            presenter,
        }
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn into_presenter(self) -> P {
        self.presenter
    }

    pub fn list(&mut self, cancel: &CancelToken, filters: &NoteFilters) -> ServiceResult<()> {
        let notes = self.notes.list_notes(&self.store.handle(cancel), filters)?;
        self.presenter.present_note_list(notes);
        Ok(())
    }

    pub fn get(&mut self, cancel: &CancelToken, id: &str) -> ServiceResult<()> {
        let view = self.notes.get_note(&self.store.handle(cancel), id)?;
        self.presenter.present_note(view);
        Ok(())
    }

    /// Creates a Draft note with one section per template field.
    ///
    /// # Errors
    /// - `OwnerRequired` for a blank owner.
    /// - `NotFound` when the template or owner does not exist.
    /// - `TitleRequired`, `SectionsMissing` or `RequiredFieldEmpty` before
    ///   any write.
    pub fn create(&mut self, cancel: &CancelToken, input: CreateNoteInput) -> ServiceResult<()> {
        let started_at = Instant::now();
        let result = self.insert_note(cancel, input);
        log_mutation(
            "note_create",
            result.as_deref().unwrap_or("-"),
            started_at,
            &result,
        );
        let id = result?;
        self.present_fresh(cancel, &id, "created note not found in read-back")
    }

    /// Retitles a note and optionally rewrites section content.
    ///
    /// Section edits must name every existing section exactly once; adding
    /// or dropping sections is rejected with `SectionsMissing`.
    pub fn update(
        &mut self,
        cancel: &CancelToken,
        id: &str,
        actor_id: &str,
        input: UpdateNoteInput,
    ) -> ServiceResult<()> {
        let started_at = Instant::now();
        let result = self.revise_note(cancel, id, actor_id, input);
        log_mutation("note_update", id, started_at, &result);
        result?;
        self.present_fresh(cancel, id, "updated note not found in read-back")
    }

    /// Moves a note between Draft and Publish; repeating the current status
    /// is an accepted no-op.
    pub fn change_status(
        &mut self,
        cancel: &CancelToken,
        id: &str,
        actor_id: &str,
        target: NoteStatus,
    ) -> ServiceResult<()> {
        let started_at = Instant::now();
        let result = self.transition(cancel, id, actor_id, &target);
        log_mutation("note_status_change", id, started_at, &result);
        result?;
        self.present_fresh(cancel, id, "note not found in read-back after status change")
    }

    pub fn delete(&mut self, cancel: &CancelToken, id: &str, actor_id: &str) -> ServiceResult<()> {
        let started_at = Instant::now();
        let result = self.remove_note(cancel, id, actor_id);
        log_mutation("note_delete", id, started_at, &result);
        result?;
        self.presenter.present_note_deleted(id);
        Ok(())
    }

    fn insert_note(&mut self, cancel: &CancelToken, input: CreateNoteInput) -> ServiceResult<String> {
        let owner_id = caller_id("account", &input.owner_id)?;
        require_owner(&owner_id)?;
        let sections = canonical_drafts(input.sections)?;
        let template = self
            .templates
            .get_template(&self.store.handle(cancel), &input.template_id)?;
        validate_note_for_create(&input.title, &template.template, &sections)?;

        let new_note = NewNote {
            title: input.title.trim(),
            template_id: &template.template.id,
            owner_id: &owner_id,
            status: &NoteStatus::Draft,
        };
        let notes = &self.notes;
        self.store
            .within_transaction(cancel, |db| -> ServiceResult<String> {
                let id = notes.create_note(db, &new_note)?;
                for draft in &sections {
                    notes.create_section(db, &id, draft)?;
                }
                Ok(id)
            })
    }

    fn revise_note(
        &mut self,
        cancel: &CancelToken,
        id: &str,
        actor_id: &str,
        input: UpdateNoteInput,
    ) -> ServiceResult<()> {
        let actor_id = caller_id("account", actor_id)?;
        let (current, edits) = {
            let handle = self.store.handle(cancel);
            let current = self.notes.get_note(&handle, id)?;
            validate_ownership(&current.note.owner_id, &actor_id)?;
            require_title(&input.title)?;

            let edits = match input.sections.as_deref() {
                Some(edits) => {
                    let template = self
                        .templates
                        .get_template(&handle, &current.note.template_id)?;
                    let edits = canonical_edits(edits)?;
                    let resolved = resolve_section_edits(&current.note.sections, &edits)?;
                    validate_sections(&template.template.fields, &resolved)?;
                    Some(resolved)
                }
                None => None,
            };
            (current, edits)
        };

        let note_id = current.note.id.as_str();
        let title = input.title.trim();
        let notes = &self.notes;
        self.store.within_transaction(cancel, |db| -> ServiceResult<()> {
            notes.update_note_meta(db, note_id, title)?;
            for edit in edits.iter().flatten() {
                notes.update_section_content(db, note_id, &edit.section_id, &edit.content)?;
            }
            Ok(())
        })
    }

    fn transition(
        &mut self,
        cancel: &CancelToken,
        id: &str,
        actor_id: &str,
        target: &NoteStatus,
    ) -> ServiceResult<()> {
        let actor_id = caller_id("account", actor_id)?;
        let current = self.notes.get_note(&self.store.handle(cancel), id)?;
        plan_status_change(&current.note, target, &actor_id)?;

        let note_id = current.note.id.as_str();
        let notes = &self.notes;
        self.store.within_transaction(cancel, |db| -> ServiceResult<()> {
            notes.update_note_status(db, note_id, target)?;
            Ok(())
        })
    }

    fn remove_note(&mut self, cancel: &CancelToken, id: &str, actor_id: &str) -> ServiceResult<()> {
        let actor_id = caller_id("account", actor_id)?;
        let current = self.notes.get_note(&self.store.handle(cancel), id)?;
        validate_ownership(&current.note.owner_id, &actor_id)?;

        let note_id = current.note.id.as_str();
        let notes = &self.notes;
        self.store.within_transaction(cancel, |db| -> ServiceResult<()> {
            notes.delete_note(db, note_id)?;
            Ok(())
        })
    }

    fn present_fresh(
        &mut self,
        cancel: &CancelToken,
        id: &str,
        details: &'static str,
    ) -> ServiceResult<()> {
        let view = read_back(self.notes.get_note(&self.store.handle(cancel), id), details)?;
        self.presenter.present_note(view);
        Ok(())
    }
}
