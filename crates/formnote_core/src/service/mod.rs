//! Use-case orchestration over repositories, transactions and presenters.
//!
//! # Responsibility
//! - Sequence validation, transactional writes and the post-commit re-read.
//! - Hand every successful result to the injected presenter.
//!
//! # Invariants
//! - Validation and ownership checks run before the first write.
//! - Multi-row writes run inside one `within_transaction` call; errors roll
//!   back and propagate unchanged.
//! - Responses are built from a fresh read after commit, never from the
//!   in-memory input.

use crate::error::{ErrorKind, ServiceError, ServiceResult};
use crate::model::note::{SectionDraft, SectionEdit};
use crate::repo::{parse_id, RepoError};
use log::{error, info, warn};
use std::time::Instant;

pub mod account_service;
pub mod note_service;
pub mod template_service;

/// Maps a post-commit read miss to `InconsistentState`.
pub(crate) fn read_back<T>(result: Result<T, RepoError>, details: &'static str) -> ServiceResult<T> {
    result.map_err(|err| match err {
        RepoError::NotFound { .. } => ServiceError::InconsistentState(details),
        other => other.into(),
    })
}

/// Canonical text form of a caller-supplied id, so it compares equal to
/// the stored one. Blank input stays blank for the domain checks to reject.
pub(crate) fn caller_id(entity: &'static str, value: &str) -> ServiceResult<String> {
    if value.trim().is_empty() {
        return Ok(String::new());
    }
    Ok(parse_id(entity, value)?)
}

pub(crate) fn canonical_drafts(drafts: Vec<SectionDraft>) -> ServiceResult<Vec<SectionDraft>> {
    drafts
        .into_iter()
        .map(|draft| {
            Ok(SectionDraft {
                field_id: caller_id("field", &draft.field_id)?,
                content: draft.content,
            })
        })
        .collect()
}

pub(crate) fn canonical_edits(edits: &[SectionEdit]) -> ServiceResult<Vec<SectionEdit>> {
    edits
        .iter()
        .map(|edit| {
            Ok(SectionEdit {
                section_id: caller_id("section", &edit.section_id)?,
                content: edit.content.clone(),
            })
        })
        .collect()
}

/// Emits the single outcome event for one mutation.
pub(crate) fn log_mutation<T>(
    event: &str,
    entity_id: &str,
    started_at: Instant,
    result: &ServiceResult<T>,
) {
    let duration_ms = started_at.elapsed().as_millis();
    match result {
        Ok(_) => info!(
            "event={event} module=service status=ok id={entity_id} duration_ms={duration_ms}"
        ),
        Err(err) => {
            let kind = err.kind();
            if kind == ErrorKind::Infrastructure {
                error!(
                    "event={event} module=service status=error id={entity_id} duration_ms={duration_ms} error_kind={} error={err}",
                    kind.as_str()
                );
            } else {
                warn!(
                    "event={event} module=service status=rejected id={entity_id} duration_ms={duration_ms} error_kind={}",
                    kind.as_str()
                );
            }
        }
    }
}
