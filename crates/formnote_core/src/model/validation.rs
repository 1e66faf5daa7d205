//! Pure validation rules shared by both aggregates and the services.
//!
//! # Responsibility
//! - Normalize and validate template field lists.
//! - Check note sections against template fields (coverage + required content).
//! - Gate mutations on ownership and status transitions.
//!
//! # Invariants
//! - No function in this module performs I/O.
//! - Error selection is deterministic: checks run in a fixed, documented
//!   order.

use crate::error::ErrorKind;
use crate::model::note::NoteStatus;
use crate::model::template::{Field, FieldDraft};
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Business-rule violation detected without touching storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Template has no fields.
    FieldRequired,
    /// A field label is empty.
    FieldLabelRequired,
    /// A field order is not positive, or two fields share one order.
    FieldOrderInvalid,
    /// Sections do not cover the template fields exactly once each.
    SectionsMissing,
    /// A required field has empty content.
    RequiredFieldEmpty,
    /// Note title is blank.
    TitleRequired,
    /// Template name is blank.
    TemplateNameRequired,
    /// Owner or actor identity is blank.
    OwnerRequired,
    /// Status value is neither `Draft` nor `Publish`.
    InvalidStatus,
    /// Requested status transition is not allowed.
    InvalidStatusChange,
    /// Email does not look like `local@domain`.
    InvalidEmail,
    /// Both first and last name are blank.
    AccountNameRequired,
    /// Identity provider is blank.
    ProviderRequired,
    /// Identity provider account id is blank.
    ProviderAccountRequired,
    /// Actor is not the owner.
    Unauthorized,
    /// Template is referenced by at least one note.
    TemplateInUse,
}

impl DomainError {
    /// Returns the stable classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized => ErrorKind::Unauthorized,
            Self::TemplateInUse => ErrorKind::Conflict,
            _ => ErrorKind::Validation,
        }
    }
}

impl Display for DomainError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let message = match self {
            Self::FieldRequired => "template requires at least one field",
            Self::FieldLabelRequired => "field label is required",
            Self::FieldOrderInvalid => "field order must be greater than zero and unique",
            Self::SectionsMissing => "sections do not match template fields",
            Self::RequiredFieldEmpty => "required field content is empty",
            Self::TitleRequired => "title is required",
            Self::TemplateNameRequired => "template name is required",
            Self::OwnerRequired => "owner is required",
            Self::InvalidStatus => "invalid status",
            Self::InvalidStatusChange => "invalid status change",
            Self::InvalidEmail => "invalid email",
            Self::AccountNameRequired => "first or last name is required",
            Self::ProviderRequired => "provider is required",
            Self::ProviderAccountRequired => "provider account id is required",
            Self::Unauthorized => "unauthorized",
            Self::TemplateInUse => "template is used by notes",
        };
        f.write_str(message)
    }
}

impl Error for DomainError {}

pub type DomainResult<T> = Result<T, DomainError>;

/// Read access to the parts of a section that validation looks at.
///
/// Implemented by create drafts, resolved update edits and persisted
/// sections so one rule set covers all three.
pub trait SectionSlot {
    fn field_id(&self) -> &str;
    fn content(&self) -> &str;
}

/// Fills unset orders with 1-based positions and validates the field list.
///
/// Order `0` is the "unset" sentinel. Checks run as: list emptiness, then
/// per field (label, then order positivity and uniqueness) in input order.
pub fn normalize_and_validate_fields(mut fields: Vec<FieldDraft>) -> DomainResult<Vec<FieldDraft>> {
    for (idx, field) in fields.iter_mut().enumerate() {
        if field.order == 0 {
            field.order = position_order(idx);
        }
    }
    validate_fields(&fields)?;
    Ok(fields)
}

fn validate_fields(fields: &[FieldDraft]) -> DomainResult<()> {
    if fields.is_empty() {
        return Err(DomainError::FieldRequired);
    }

    let mut seen = HashSet::with_capacity(fields.len());
    for field in fields {
        if field.label.is_empty() {
            return Err(DomainError::FieldLabelRequired);
        }
        if field.order <= 0 || !seen.insert(field.order) {
            return Err(DomainError::FieldOrderInvalid);
        }
    }
    Ok(())
}

/// Converts a zero-based list index to a 1-based field order.
pub(crate) fn position_order(idx: usize) -> i64 {
    i64::try_from(idx).map_or(i64::MAX, |value| value.saturating_add(1))
}

/// Checks that `sections` cover `template_fields` exactly once each and
/// that required fields carry content.
///
/// One scan detects unknown and duplicate field ids and remembers the first
/// required field with empty content. Any coverage failure (unknown,
/// duplicate or missing field) is reported as `SectionsMissing` before the
/// remembered `RequiredFieldEmpty`.
pub fn validate_sections<S: SectionSlot>(template_fields: &[Field], sections: &[S]) -> DomainResult<()> {
    if sections.is_empty() {
        return Err(DomainError::SectionsMissing);
    }

    let lookup: HashMap<&str, &Field> = template_fields
        .iter()
        .map(|field| (field.id.as_str(), field))
        .collect();
    let mut seen = HashSet::with_capacity(sections.len());
    let mut required_empty = false;

    for section in sections {
        let Some(field) = lookup.get(section.field_id()) else {
            return Err(DomainError::SectionsMissing);
        };
        if !seen.insert(section.field_id()) {
            return Err(DomainError::SectionsMissing);
        }
        if field.is_required && section.content().is_empty() {
            required_empty = true;
        }
    }

    if seen.len() != lookup.len() {
        return Err(DomainError::SectionsMissing);
    }
    if required_empty {
        return Err(DomainError::RequiredFieldEmpty);
    }
    Ok(())
}

/// Only the recorded owner may mutate an aggregate.
pub fn validate_ownership(owner_id: &str, actor_id: &str) -> DomainResult<()> {
    if owner_id.trim().is_empty() || actor_id.trim().is_empty() {
        return Err(DomainError::OwnerRequired);
    }
    if owner_id != actor_id {
        return Err(DomainError::Unauthorized);
    }
    Ok(())
}

/// Rejects status values other than `Draft` and `Publish`.
pub fn validate_status(status: &NoteStatus) -> DomainResult<()> {
    if status.is_known() {
        Ok(())
    } else {
        Err(DomainError::InvalidStatus)
    }
}

/// Allows `Draft <-> Publish` and no-op transitions between known states.
pub fn validate_status_transition(from: &NoteStatus, to: &NoteStatus) -> DomainResult<()> {
    match (from, to) {
        (NoteStatus::Draft, NoteStatus::Publish)
        | (NoteStatus::Publish, NoteStatus::Draft)
        | (NoteStatus::Draft, NoteStatus::Draft)
        | (NoteStatus::Publish, NoteStatus::Publish) => Ok(()),
        _ => Err(DomainError::InvalidStatusChange),
    }
}

pub fn require_title(title: &str) -> DomainResult<()> {
    if title.trim().is_empty() {
        return Err(DomainError::TitleRequired);
    }
    Ok(())
}

pub fn require_template_name(name: &str) -> DomainResult<()> {
    if name.trim().is_empty() {
        return Err(DomainError::TemplateNameRequired);
    }
    Ok(())
}

pub fn require_owner(owner_id: &str) -> DomainResult<()> {
    if owner_id.trim().is_empty() {
        return Err(DomainError::OwnerRequired);
    }
    Ok(())
}

/// A template may be deleted only while no note references it.
pub fn ensure_template_deletable(is_used: bool) -> DomainResult<()> {
    if is_used {
        return Err(DomainError::TemplateInUse);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::note::SectionDraft;

    fn draft(label: &str, order: i64) -> FieldDraft {
        FieldDraft::new(label, order, false)
    }

    fn field(id: &str, order: i64, is_required: bool) -> Field {
        Field {
            id: id.to_string(),
            label: format!("label-{id}"),
            order,
            is_required,
        }
    }

    fn section(field_id: &str, content: &str) -> SectionDraft {
        SectionDraft::new(field_id, content)
    }

    #[test]
    fn unset_orders_are_filled_with_positions() {
        let fields = normalize_and_validate_fields(vec![draft("Title", 0), draft("Body", 0)])
            .expect("fields should validate");
        let orders: Vec<i64> = fields.iter().map(|f| f.order).collect();
        assert_eq!(orders, vec![1, 2]);
    }

    #[test]
    fn explicit_orders_are_kept() {
        let fields = normalize_and_validate_fields(vec![draft("Title", 0), draft("Body", 5)])
            .expect("fields should validate");
        let orders: Vec<i64> = fields.iter().map(|f| f.order).collect();
        assert_eq!(orders, vec![1, 5]);
    }

    #[test]
    fn empty_field_list_is_rejected() {
        assert_eq!(
            normalize_and_validate_fields(Vec::new()),
            Err(DomainError::FieldRequired)
        );
    }

    #[test]
    fn empty_label_is_rejected() {
        assert_eq!(
            normalize_and_validate_fields(vec![draft("", 1)]),
            Err(DomainError::FieldLabelRequired)
        );
    }

    #[test]
    fn duplicate_order_is_rejected_even_with_valid_labels() {
        assert_eq!(
            normalize_and_validate_fields(vec![draft("Title", 1), draft("Body", 1)]),
            Err(DomainError::FieldOrderInvalid)
        );
    }

    #[test]
    fn filled_position_can_collide_with_explicit_order() {
        // Second entry keeps order 1, first gets position 1.
        assert_eq!(
            normalize_and_validate_fields(vec![draft("Title", 0), draft("Body", 1)]),
            Err(DomainError::FieldOrderInvalid)
        );
    }

    #[test]
    fn negative_order_is_rejected() {
        assert_eq!(
            normalize_and_validate_fields(vec![draft("Title", -3)]),
            Err(DomainError::FieldOrderInvalid)
        );
    }

    #[test]
    fn label_check_precedes_order_check_on_same_field() {
        assert_eq!(
            normalize_and_validate_fields(vec![draft("", -1)]),
            Err(DomainError::FieldLabelRequired)
        );
    }

    #[test]
    fn sections_covering_all_fields_pass() {
        let fields = vec![field("f1", 1, true), field("f2", 2, false)];
        let sections = vec![section("f1", "Hello"), section("f2", "")];
        assert_eq!(validate_sections(&fields, &sections), Ok(()));
    }

    #[test]
    fn missing_coverage_wins_over_required_content() {
        let fields = vec![field("f1", 1, true), field("f2", 2, false)];
        let sections = vec![section("f1", "")];
        assert_eq!(
            validate_sections(&fields, &sections),
            Err(DomainError::SectionsMissing)
        );

        let sections = vec![section("f2", "")];
        assert_eq!(
            validate_sections(&fields, &sections),
            Err(DomainError::SectionsMissing)
        );
    }

    #[test]
    fn required_field_empty_when_coverage_is_complete() {
        let fields = vec![field("f1", 1, true), field("f2", 2, false)];
        let sections = vec![section("f1", ""), section("f2", "body")];
        assert_eq!(
            validate_sections(&fields, &sections),
            Err(DomainError::RequiredFieldEmpty)
        );
    }

    #[test]
    fn unknown_and_duplicate_field_ids_are_rejected() {
        let fields = vec![field("f1", 1, true), field("f2", 2, false)];
        let unknown = vec![section("f1", "a"), section("zz", "b")];
        assert_eq!(
            validate_sections(&fields, &unknown),
            Err(DomainError::SectionsMissing)
        );

        let duplicate = vec![section("f1", "a"), section("f1", "b"), section("f2", "")];
        assert_eq!(
            validate_sections(&fields, &duplicate),
            Err(DomainError::SectionsMissing)
        );
    }

    #[test]
    fn duplicate_takes_priority_over_required_content_on_same_section() {
        let fields = vec![field("f1", 1, true)];
        let sections = vec![section("f1", ""), section("f1", "a")];
        assert_eq!(
            validate_sections(&fields, &sections),
            Err(DomainError::SectionsMissing)
        );
    }

    #[test]
    fn empty_sections_are_rejected() {
        let fields = vec![field("f1", 1, false)];
        let sections: Vec<SectionDraft> = Vec::new();
        assert_eq!(
            validate_sections(&fields, &sections),
            Err(DomainError::SectionsMissing)
        );
    }

    #[test]
    fn ownership_rules() {
        assert_eq!(validate_ownership("owner-1", "owner-1"), Ok(()));
        assert_eq!(
            validate_ownership("owner-1", "other"),
            Err(DomainError::Unauthorized)
        );
        assert_eq!(
            validate_ownership("  ", "actor"),
            Err(DomainError::OwnerRequired)
        );
        assert_eq!(
            validate_ownership("owner-1", ""),
            Err(DomainError::OwnerRequired)
        );
    }

    #[test]
    fn status_transition_closure() {
        let known = [NoteStatus::Draft, NoteStatus::Publish];
        for from in &known {
            for to in &known {
                assert_eq!(validate_status_transition(from, to), Ok(()));
            }
        }

        let corrupt = NoteStatus::from("Archived");
        for other in &known {
            assert_eq!(
                validate_status_transition(&corrupt, other),
                Err(DomainError::InvalidStatusChange)
            );
            assert_eq!(
                validate_status_transition(other, &corrupt),
                Err(DomainError::InvalidStatusChange)
            );
        }
        assert_eq!(
            validate_status_transition(&corrupt, &corrupt),
            Err(DomainError::InvalidStatusChange)
        );
    }

    #[test]
    fn unknown_status_is_invalid() {
        assert_eq!(validate_status(&NoteStatus::Draft), Ok(()));
        assert_eq!(
            validate_status(&NoteStatus::from("draft")),
            Err(DomainError::InvalidStatus)
        );
    }

    #[test]
    fn error_kinds_are_classified() {
        assert_eq!(DomainError::TemplateInUse.kind(), ErrorKind::Conflict);
        assert_eq!(DomainError::Unauthorized.kind(), ErrorKind::Unauthorized);
        assert_eq!(DomainError::OwnerRequired.kind(), ErrorKind::Validation);
    }

    #[test]
    fn blank_names_and_titles_are_rejected() {
        assert_eq!(require_title("  "), Err(DomainError::TitleRequired));
        assert_eq!(require_template_name(""), Err(DomainError::TemplateNameRequired));
        assert_eq!(ensure_template_deletable(true), Err(DomainError::TemplateInUse));
        assert_eq!(ensure_template_deletable(false), Ok(()));
    }
}
