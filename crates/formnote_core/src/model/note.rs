//! Note aggregate: a filled template instance with one section per field.
//!
//! # Responsibility
//! - Define note/section records, status values and read views.
//! - Validate note creation against its template.
//! - Resolve section edits onto existing sections.
//! - Mediate the Draft/Publish status machine.
//!
//! # Invariants
//! - Section field ids equal exactly the template field ids.
//! - Required fields have non-empty section content.
//! - Sections are never added or removed after creation.

use crate::model::account::OwnerSummary;
use crate::model::template::Template;
use crate::model::validation::{
    require_title, validate_ownership, validate_sections, validate_status,
    validate_status_transition, DomainError, DomainResult, SectionSlot,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};

const STATUS_DRAFT: &str = "Draft";
const STATUS_PUBLISH: &str = "Publish";

/// Publication status.
///
/// `Unrecognized` carries a stored value that is neither `Draft` nor
/// `Publish`; it never passes validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NoteStatus {
    Draft,
    Publish,
    Unrecognized(String),
}

impl NoteStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Draft => STATUS_DRAFT,
            Self::Publish => STATUS_PUBLISH,
            Self::Unrecognized(value) => value.as_str(),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }
}

impl From<&str> for NoteStatus {
    fn from(value: &str) -> Self {
        match value {
            STATUS_DRAFT => Self::Draft,
            STATUS_PUBLISH => Self::Publish,
            other => Self::Unrecognized(other.to_string()),
        }
    }
}

impl From<String> for NoteStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            STATUS_DRAFT => Self::Draft,
            STATUS_PUBLISH => Self::Publish,
            _ => Self::Unrecognized(value),
        }
    }
}

impl From<NoteStatus> for String {
    fn from(value: NoteStatus) -> Self {
        match value {
            NoteStatus::Unrecognized(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl Display for NoteStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Note aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub title: String,
    pub template_id: String,
    pub owner_id: String,
    pub status: NoteStatus,
    pub sections: Vec<Section>,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub updated_at: i64,
}

/// Persisted content for one template field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub note_id: String,
    pub field_id: String,
    pub content: String,
}

impl SectionSlot for Section {
    fn field_id(&self) -> &str {
        &self.field_id
    }

    fn content(&self) -> &str {
        &self.content
    }
}

/// Section input for note creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionDraft {
    pub field_id: String,
    pub content: String,
}

impl SectionDraft {
    pub fn new(field_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            field_id: field_id.into(),
            content: content.into(),
        }
    }
}

impl SectionSlot for SectionDraft {
    fn field_id(&self) -> &str {
        &self.field_id
    }

    fn content(&self) -> &str {
        &self.content
    }
}

/// Content edit for an existing section, keyed by section id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionEdit {
    pub section_id: String,
    pub content: String,
}

impl SectionEdit {
    pub fn new(section_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            section_id: section_id.into(),
            content: content.into(),
        }
    }
}

/// Section edit with its field id resolved from the stored section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSectionEdit {
    pub section_id: String,
    pub field_id: String,
    pub content: String,
}

impl SectionSlot for ResolvedSectionEdit {
    fn field_id(&self) -> &str {
        &self.field_id
    }

    fn content(&self) -> &str {
        &self.content
    }
}

/// Section joined with its template field metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionView {
    pub section: Section,
    pub field_label: String,
    pub field_order: i64,
    pub is_required: bool,
}

/// Note with template name, owner summary and field-annotated sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteView {
    pub note: Note,
    pub template_name: String,
    pub owner: OwnerSummary,
    /// Sorted by field order.
    pub sections: Vec<SectionView>,
}

/// List filters for notes. Blank values are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NoteFilters {
    pub owner_id: Option<String>,
    pub template_id: Option<String>,
    pub status: Option<NoteStatus>,
    /// Case-insensitive substring match on note title.
    pub query: Option<String>,
}

/// Validates a note creation attempt against its template.
pub fn validate_note_for_create(
    title: &str,
    template: &Template,
    sections: &[SectionDraft],
) -> DomainResult<()> {
    require_title(title)?;
    validate_sections(&template.fields, sections)
}

/// Maps each edit onto the stored section it names.
///
/// Unknown section ids fail with `SectionsMissing`. The result still has to
/// pass [`validate_sections`] before it is written.
pub fn resolve_section_edits(
    existing: &[Section],
    edits: &[SectionEdit],
) -> DomainResult<Vec<ResolvedSectionEdit>> {
    let field_by_section: HashMap<&str, &str> = existing
        .iter()
        .map(|section| (section.id.as_str(), section.field_id.as_str()))
        .collect();

    edits
        .iter()
        .map(|edit| {
            let field_id = field_by_section
                .get(edit.section_id.as_str())
                .ok_or(DomainError::SectionsMissing)?;
            Ok(ResolvedSectionEdit {
                section_id: edit.section_id.clone(),
                field_id: (*field_id).to_string(),
                content: edit.content.clone(),
            })
        })
        .collect()
}

/// Decides whether `actor_id` may move `note` to `target`.
///
/// Checks run as: ownership, stored status, target status, transition rule.
pub fn plan_status_change(note: &Note, target: &NoteStatus, actor_id: &str) -> DomainResult<()> {
    validate_ownership(&note.owner_id, actor_id)?;
    validate_status(&note.status)?;
    validate_status(target)?;
    validate_status_transition(&note.status, target)
}
