//! Template/field repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist template headers and their ordered field rows.
//! - Serve template views with owner summary and usage flag.
//!
//! # Invariants
//! - Fields are always returned sorted by `sort_order` ascending.
//! - `is_used` is derived from live note rows, never stored.
//! - Deleting a template removes its fields through the FK cascade.

use crate::db::DbHandle;
use crate::model::account::OwnerSummary;
use crate::model::template::{Field, FieldDraft, FieldUpdate, Template, TemplateFilters, TemplateView};
use crate::repo::{
    bool_to_int, contains_pattern, ensure_account_exists, ensure_tables, int_to_bool, new_id,
    non_blank, parse_id, RepoError, RepoResult, SQL_NOW_MS,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const TEMPLATE_VIEW_SELECT: &str = "SELECT
        t.id,
        t.name,
        t.owner_id,
        t.updated_at,
        EXISTS(SELECT 1 FROM notes n WHERE n.template_id = t.id) AS is_used,
        a.first_name AS owner_first_name,
        a.last_name AS owner_last_name,
        a.thumbnail AS owner_thumbnail
     FROM templates t
     INNER JOIN accounts a ON a.id = t.owner_id";

/// Data access contract for templates and their fields.
pub trait TemplateRepository {
    /// Loads one template with fields, owner summary and usage flag.
    fn get_template(&self, db: &DbHandle<'_>, id: &str) -> RepoResult<TemplateView>;
    /// Returns whether at least one note references the template.
    fn is_template_used(&self, db: &DbHandle<'_>, id: &str) -> RepoResult<bool>;
    /// Lists templates newest first.
    fn list_templates(
        &self,
        db: &DbHandle<'_>,
        filters: &TemplateFilters,
    ) -> RepoResult<Vec<TemplateView>>;
    /// Inserts a template header and returns its new id.
    fn create_template(&self, db: &DbHandle<'_>, name: &str, owner_id: &str) -> RepoResult<String>;
    /// Renames a template and bumps `updated_at`.
    fn update_template_meta(&self, db: &DbHandle<'_>, id: &str, name: &str) -> RepoResult<()>;
    /// Deletes a template together with its fields.
    fn delete_template(&self, db: &DbHandle<'_>, id: &str) -> RepoResult<()>;
    /// Lists fields of one template by order.
    fn list_fields_by_template(&self, db: &DbHandle<'_>, template_id: &str)
        -> RepoResult<Vec<Field>>;
    fn create_field(
        &self,
        db: &DbHandle<'_>,
        template_id: &str,
        draft: &FieldDraft,
    ) -> RepoResult<Field>;
    fn update_field(&self, db: &DbHandle<'_>, update: &FieldUpdate) -> RepoResult<()>;
    fn delete_field(&self, db: &DbHandle<'_>, field_id: &str) -> RepoResult<()>;
}

/// SQLite-backed template repository.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteTemplateRepository;

impl SqliteTemplateRepository {
    /// Constructs a repository after checking the connection schema.
    pub fn try_new(conn: &Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["accounts", "templates", "fields", "notes"])?;
        Ok(Self)
    }
}

impl TemplateRepository for SqliteTemplateRepository {
    fn get_template(&self, db: &DbHandle<'_>, id: &str) -> RepoResult<TemplateView> {
        let id = parse_id("template", id)?;
        let conn = db.conn()?;
        let sql = format!("{TEMPLATE_VIEW_SELECT} WHERE t.id = ?1;");
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([id.as_str()])?;
        let Some(row) = rows.next()? else {
            return Err(RepoError::NotFound {
                entity: "template",
                id,
            });
        };

        let mut view = template_view_from_row(row)?;
        view.template.fields = load_fields(conn, &view.template.id)?;
        Ok(view)
    }

    fn is_template_used(&self, db: &DbHandle<'_>, id: &str) -> RepoResult<bool> {
        let id = parse_id("template", id)?;
        let used: i64 = db.conn()?.query_row(
            "SELECT EXISTS(SELECT 1 FROM notes WHERE template_id = ?1);",
            [id.as_str()],
            |row| row.get(0),
        )?;
        int_to_bool("notes.exists", used)
    }

    fn list_templates(
        &self,
        db: &DbHandle<'_>,
        filters: &TemplateFilters,
    ) -> RepoResult<Vec<TemplateView>> {
        let mut sql = format!("{TEMPLATE_VIEW_SELECT} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(owner_id) = non_blank(filters.owner_id.as_ref()) {
            sql.push_str(" AND t.owner_id = ?");
            bind_values.push(Value::Text(parse_id("account", owner_id)?));
        }
        if let Some(query) = non_blank(filters.query.as_ref()) {
            sql.push_str(" AND t.name LIKE ? ESCAPE '\\'");
            bind_values.push(Value::Text(contains_pattern(query)));
        }
        sql.push_str(" ORDER BY t.updated_at DESC, t.id ASC;");

        let conn = db.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut views = Vec::new();
        while let Some(row) = rows.next()? {
            let mut view = template_view_from_row(row)?;
            view.template.fields = load_fields(conn, &view.template.id)?;
            views.push(view);
        }
        Ok(views)
    }

    fn create_template(&self, db: &DbHandle<'_>, name: &str, owner_id: &str) -> RepoResult<String> {
        let owner_id = parse_id("account", owner_id)?;
        let conn = db.conn()?;
        ensure_account_exists(conn, &owner_id)?;

        let id = new_id();
        conn.execute(
            "INSERT INTO templates (id, name, owner_id) VALUES (?1, ?2, ?3);",
            params![id, name, owner_id],
        )?;
        Ok(id)
    }

    fn update_template_meta(&self, db: &DbHandle<'_>, id: &str, name: &str) -> RepoResult<()> {
        let id = parse_id("template", id)?;
        let sql = format!(
            "UPDATE templates
             SET name = ?2, updated_at = {}
             WHERE id = ?1;",
            SQL_NOW_MS
        );
        let changed = db.conn()?.execute(&sql, params![id, name])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "template",
                id,
            });
        }
        Ok(())
    }

    fn delete_template(&self, db: &DbHandle<'_>, id: &str) -> RepoResult<()> {
        let id = parse_id("template", id)?;
        let changed = db
            .conn()?
            .execute("DELETE FROM templates WHERE id = ?1;", [id.as_str()])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "template",
                id,
            });
        }
        Ok(())
    }

    fn list_fields_by_template(
        &self,
        db: &DbHandle<'_>,
        template_id: &str,
    ) -> RepoResult<Vec<Field>> {
        let template_id = parse_id("template", template_id)?;
        load_fields(db.conn()?, &template_id)
    }

    fn create_field(
        &self,
        db: &DbHandle<'_>,
        template_id: &str,
        draft: &FieldDraft,
    ) -> RepoResult<Field> {
        let template_id = parse_id("template", template_id)?;
        let id = new_id();
        db.conn()?.execute(
            "INSERT INTO fields (id, template_id, label, sort_order, is_required)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                id,
                template_id,
                draft.label,
                draft.order,
                bool_to_int(draft.is_required)
            ],
        )?;
        Ok(Field {
            id,
            label: draft.label.clone(),
            order: draft.order,
            is_required: draft.is_required,
        })
    }

    fn update_field(&self, db: &DbHandle<'_>, update: &FieldUpdate) -> RepoResult<()> {
        let id = parse_id("field", &update.id)?;
        let changed = db.conn()?.execute(
            "UPDATE fields
             SET label = ?2, sort_order = ?3, is_required = ?4
             WHERE id = ?1;",
            params![
                id,
                update.label,
                update.order,
                bool_to_int(update.is_required)
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "field", id });
        }
        Ok(())
    }

    fn delete_field(&self, db: &DbHandle<'_>, field_id: &str) -> RepoResult<()> {
        let id = parse_id("field", field_id)?;
        let changed = db
            .conn()?
            .execute("DELETE FROM fields WHERE id = ?1;", [id.as_str()])?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "field", id });
        }
        Ok(())
    }
}

fn template_view_from_row(row: &Row<'_>) -> RepoResult<TemplateView> {
    let owner_id: String = row.get("owner_id")?;
    let is_used: i64 = row.get("is_used")?;
    Ok(TemplateView {
        template: Template {
            id: row.get("id")?,
            name: row.get("name")?,
            owner_id: owner_id.clone(),
            fields: Vec::new(),
            updated_at: row.get("updated_at")?,
        },
        is_used: int_to_bool("templates.is_used", is_used)?,
        owner: OwnerSummary {
            id: owner_id,
            first_name: row.get("owner_first_name")?,
            last_name: row.get("owner_last_name")?,
            thumbnail: row.get("owner_thumbnail")?,
        },
    })
}

fn load_fields(conn: &Connection, template_id: &str) -> RepoResult<Vec<Field>> {
    let mut stmt = conn.prepare(
        "SELECT id, label, sort_order, is_required
         FROM fields
         WHERE template_id = ?1
         ORDER BY sort_order ASC, id ASC;",
    )?;
    let mut rows = stmt.query([template_id])?;
    let mut fields = Vec::new();
    while let Some(row) = rows.next()? {
        let is_required: i64 = row.get("is_required")?;
        fields.push(Field {
            id: row.get("id")?,
            label: row.get("label")?,
            order: row.get("sort_order")?,
            is_required: int_to_bool("fields.is_required", is_required)?,
        });
    }
    Ok(fields)
}
