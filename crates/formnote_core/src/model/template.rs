//! Template aggregate: a reusable form definition with ordered fields.
//!
//! # Responsibility
//! - Define the template/field records and their read views.
//! - Compute the positional field reconciliation plan used by updates.
//!
//! # Invariants
//! - A valid template has at least one field.
//! - Field labels are non-empty and orders are positive and unique.
//! - Field identity is positional on update: the entry at index `i` of the
//!   requested list always maps onto the persisted field at index `i`.

use crate::model::account::OwnerSummary;
use crate::model::validation::{
    normalize_and_validate_fields, position_order, require_owner, require_template_name,
    DomainError, DomainResult,
};
use serde::{Deserialize, Serialize};

/// Template aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    /// Sorted by `order` ascending.
    pub fields: Vec<Field>,
    /// Epoch milliseconds.
    pub updated_at: i64,
}

/// Persisted field definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub id: String,
    pub label: String,
    pub order: i64,
    pub is_required: bool,
}

/// Caller-supplied field definition, before it has an id.
///
/// `order == 0` means "unset" and is replaced by the 1-based list position
/// during normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDraft {
    pub label: String,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub is_required: bool,
}

impl FieldDraft {
    pub fn new(label: impl Into<String>, order: i64, is_required: bool) -> Self {
        Self {
            label: label.into(),
            order,
            is_required,
        }
    }
}

impl Template {
    /// Replaces the field list through the aggregate root.
    ///
    /// New fields get empty ids; they receive stable ids once persisted.
    pub fn replace_fields(&mut self, fields: Vec<FieldDraft>) -> DomainResult<()> {
        let fields = normalize_and_validate_fields(fields)?;
        self.fields = fields
            .into_iter()
            .map(|draft| Field {
                id: String::new(),
                label: draft.label,
                order: draft.order,
                is_required: draft.is_required,
            })
            .collect();
        Ok(())
    }
}

/// Template with usage flag and owner summary, as served to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateView {
    pub template: Template,
    /// True iff at least one note references the template.
    pub is_used: bool,
    pub owner: OwnerSummary,
}

/// List filters for templates. Blank values are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TemplateFilters {
    pub owner_id: Option<String>,
    /// Case-insensitive substring match on template name.
    pub query: Option<String>,
}

/// Validates a full template definition and returns its normalized fields.
pub fn validate_template(
    name: &str,
    owner_id: &str,
    fields: Vec<FieldDraft>,
) -> DomainResult<Vec<FieldDraft>> {
    require_template_name(name)?;
    require_owner(owner_id)?;
    normalize_and_validate_fields(fields)
}

/// In-place update of one persisted field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldUpdate {
    pub id: String,
    pub label: String,
    pub order: i64,
    pub is_required: bool,
}

/// Write plan produced by [`plan_field_reconciliation`].
///
/// Apply in declaration order: updates, then creates, then deletes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPlan {
    pub updates: Vec<FieldUpdate>,
    pub creates: Vec<FieldDraft>,
    /// Ids of trailing persisted fields to remove.
    pub deletes: Vec<String>,
}

impl FieldPlan {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.creates.is_empty() && self.deletes.is_empty()
    }
}

/// Computes the positional create/update/delete plan that turns `existing`
/// (sorted by stored order) into `requested`.
///
/// `is_used` is only invoked when the requested list is shorter than the
/// persisted one; an in-use template cannot lose fields because existing
/// notes would lose section coverage.
///
/// # Errors
/// - `DomainError::TemplateInUse` when shrinking an in-use template.
/// - Any error returned by `is_used`.
pub fn plan_field_reconciliation<E, F>(
    existing: &[Field],
    requested: &[FieldDraft],
    is_used: F,
) -> Result<FieldPlan, E>
where
    E: From<DomainError>,
    F: FnOnce() -> Result<bool, E>,
{
    let shrinking = requested.len() < existing.len();
    if shrinking && is_used()? {
        return Err(DomainError::TemplateInUse.into());
    }

    let mut plan = FieldPlan::default();
    for (idx, draft) in requested.iter().enumerate() {
        let order = position_order(idx);
        match existing.get(idx) {
            Some(current) => plan.updates.push(FieldUpdate {
                id: current.id.clone(),
                label: draft.label.clone(),
                order,
                is_required: draft.is_required,
            }),
            None => plan.creates.push(FieldDraft {
                label: draft.label.clone(),
                order,
                is_required: draft.is_required,
            }),
        }
    }

    if shrinking {
        plan.deletes = existing[requested.len()..]
            .iter()
            .map(|field| field.id.clone())
            .collect();
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn persisted(ids: &[&str]) -> Vec<Field> {
        ids.iter()
            .enumerate()
            .map(|(idx, id)| Field {
                id: id.to_string(),
                label: format!("old-{id}"),
                order: idx as i64 + 1,
                is_required: false,
            })
            .collect()
    }

    fn requested(labels: &[&str]) -> Vec<FieldDraft> {
        labels
            .iter()
            .map(|label| FieldDraft::new(*label, 0, true))
            .collect()
    }

    fn not_used() -> Result<bool, DomainError> {
        Ok(false)
    }

    #[test]
    fn same_length_updates_every_field_positionally() {
        let plan = plan_field_reconciliation(
            &persisted(&["f1", "f2"]),
            &requested(&["Body", "Title"]),
            not_used,
        )
        .unwrap();

        assert_eq!(plan.updates.len(), 2);
        assert_eq!(plan.updates[0].id, "f1");
        assert_eq!(plan.updates[0].label, "Body");
        assert_eq!(plan.updates[0].order, 1);
        assert_eq!(plan.updates[1].id, "f2");
        assert_eq!(plan.updates[1].label, "Title");
        assert_eq!(plan.updates[1].order, 2);
        assert!(plan.creates.is_empty());
        assert!(plan.deletes.is_empty());
    }

    #[test]
    fn growing_appends_tail_creates() {
        let plan = plan_field_reconciliation(
            &persisted(&["f1"]),
            &requested(&["Title", "Body", "Footer"]),
            not_used,
        )
        .unwrap();

        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.creates.len(), 2);
        assert_eq!(plan.creates[0].label, "Body");
        assert_eq!(plan.creates[0].order, 2);
        assert_eq!(plan.creates[1].order, 3);
    }

    #[test]
    fn shrinking_unused_template_deletes_trailing_fields() {
        let plan = plan_field_reconciliation(
            &persisted(&["f1", "f2", "f3"]),
            &requested(&["Only"]),
            not_used,
        )
        .unwrap();

        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].id, "f1");
        assert_eq!(plan.deletes, vec!["f2".to_string(), "f3".to_string()]);
    }

    #[test]
    fn shrinking_used_template_is_rejected() {
        let err = plan_field_reconciliation(
            &persisted(&["f1", "f2"]),
            &requested(&["Only"]),
            || Ok::<_, DomainError>(true),
        )
        .unwrap_err();
        assert_eq!(err, DomainError::TemplateInUse);
    }

    #[test]
    fn usage_is_only_queried_when_shrinking() {
        let plan = plan_field_reconciliation(
            &persisted(&["f1"]),
            &requested(&["Title", "Body"]),
            || -> Result<bool, DomainError> { panic!("usage must not be queried") },
        )
        .unwrap();
        assert_eq!(plan.creates.len(), 1);
    }

    #[test]
    fn replace_fields_normalizes_through_root() {
        let mut template = Template {
            id: "tpl".to_string(),
            name: "Daily".to_string(),
            owner_id: "owner".to_string(),
            fields: Vec::new(),
            updated_at: 0,
        };
        template
            .replace_fields(vec![FieldDraft::new("Title", 0, true), FieldDraft::new("Body", 2, false)])
            .unwrap();
        assert_eq!(template.fields.len(), 2);
        assert_eq!(template.fields[0].order, 1);

        let err = template
            .replace_fields(vec![FieldDraft::new("", 1, false)])
            .unwrap_err();
        assert_eq!(err, DomainError::FieldLabelRequired);
        assert_eq!(template.fields.len(), 2);
    }

    #[test]
    fn validate_template_checks_name_then_owner_then_fields() {
        let fields = vec![FieldDraft::new("Title", 1, false)];
        assert_eq!(
            validate_template("", "", Vec::new()),
            Err(DomainError::TemplateNameRequired)
        );
        assert_eq!(
            validate_template("Daily", " ", fields.clone()),
            Err(DomainError::OwnerRequired)
        );
        assert_eq!(
            validate_template("Daily", "owner", Vec::new()),
            Err(DomainError::FieldRequired)
        );
        assert!(validate_template("Daily", "owner", fields).is_ok());
    }
}
