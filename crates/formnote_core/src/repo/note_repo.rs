//! Note/section repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist note headers and their per-field section rows.
//! - Serve note views joined with template name, owner and field labels.
//!
//! # Invariants
//! - Sections are returned in their field's order.
//! - Status is stored as the literal status string; unknown stored values
//!   are surfaced as `NoteStatus::Unrecognized` rather than rejected.
//! - Deleting a note removes its sections through the FK cascade.

use crate::db::DbHandle;
use crate::model::account::OwnerSummary;
use crate::model::note::{
    Note, NoteFilters, NoteStatus, NoteView, Section, SectionDraft, SectionView,
};
use crate::repo::{
    contains_pattern, ensure_account_exists, ensure_tables, int_to_bool, new_id, non_blank,
    parse_id, RepoError, RepoResult, SQL_NOW_MS,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const NOTE_VIEW_SELECT: &str = "SELECT
        n.id,
        n.title,
        n.template_id,
        n.owner_id,
        n.status,
        n.created_at,
        n.updated_at,
        t.name AS template_name,
        a.first_name AS owner_first_name,
        a.last_name AS owner_last_name,
        a.thumbnail AS owner_thumbnail
     FROM notes n
     INNER JOIN templates t ON t.id = n.template_id
     INNER JOIN accounts a ON a.id = n.owner_id";

/// Insert payload for one note header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNote<'a> {
    pub title: &'a str,
    pub template_id: &'a str,
    pub owner_id: &'a str,
    pub status: &'a NoteStatus,
}

/// Data access contract for notes and their sections.
pub trait NoteRepository {
    /// Loads one note with sections, template name and owner summary.
    fn get_note(&self, db: &DbHandle<'_>, id: &str) -> RepoResult<NoteView>;
    /// Lists notes newest first.
    fn list_notes(&self, db: &DbHandle<'_>, filters: &NoteFilters) -> RepoResult<Vec<NoteView>>;
    /// Inserts a note header and returns its new id.
    fn create_note(&self, db: &DbHandle<'_>, note: &NewNote<'_>) -> RepoResult<String>;
    /// Retitles a note and bumps `updated_at`.
    fn update_note_meta(&self, db: &DbHandle<'_>, id: &str, title: &str) -> RepoResult<()>;
    fn update_note_status(&self, db: &DbHandle<'_>, id: &str, status: &NoteStatus)
        -> RepoResult<()>;
    /// Deletes a note together with its sections.
    fn delete_note(&self, db: &DbHandle<'_>, id: &str) -> RepoResult<()>;
    fn create_section(
        &self,
        db: &DbHandle<'_>,
        note_id: &str,
        draft: &SectionDraft,
    ) -> RepoResult<Section>;
    /// Replaces the content of one section belonging to `note_id`.
    fn update_section_content(
        &self,
        db: &DbHandle<'_>,
        note_id: &str,
        section_id: &str,
        content: &str,
    ) -> RepoResult<()>;
    fn list_sections_by_note(&self, db: &DbHandle<'_>, note_id: &str)
        -> RepoResult<Vec<SectionView>>;
}

/// SQLite-backed note repository.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteNoteRepository;

impl SqliteNoteRepository {
    /// Constructs a repository after checking the connection schema.
    pub fn try_new(conn: &Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["accounts", "templates", "fields", "notes", "sections"])?;
        Ok(Self)
    }
}

impl NoteRepository for SqliteNoteRepository {
    fn get_note(&self, db: &DbHandle<'_>, id: &str) -> RepoResult<NoteView> {
        let id = parse_id("note", id)?;
        let conn = db.conn()?;
        let sql = format!("{NOTE_VIEW_SELECT} WHERE n.id = ?1;");
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([id.as_str()])?;
        let Some(row) = rows.next()? else {
            return Err(RepoError::NotFound { entity: "note", id });
        };

        let mut view = note_view_from_row(row)?;
        attach_sections(conn, &mut view)?;
        Ok(view)
    }

    fn list_notes(&self, db: &DbHandle<'_>, filters: &NoteFilters) -> RepoResult<Vec<NoteView>> {
        let mut sql = format!("{NOTE_VIEW_SELECT} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(owner_id) = non_blank(filters.owner_id.as_ref()) {
            sql.push_str(" AND n.owner_id = ?");
            bind_values.push(Value::Text(parse_id("account", owner_id)?));
        }
        if let Some(template_id) = non_blank(filters.template_id.as_ref()) {
            sql.push_str(" AND n.template_id = ?");
            bind_values.push(Value::Text(parse_id("template", template_id)?));
        }
        if let Some(status) = filters.status.as_ref().filter(|s| !s.as_str().trim().is_empty()) {
            sql.push_str(" AND n.status = ?");
            bind_values.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(query) = non_blank(filters.query.as_ref()) {
            sql.push_str(" AND n.title LIKE ? ESCAPE '\\'");
            bind_values.push(Value::Text(contains_pattern(query)));
        }
        sql.push_str(" ORDER BY n.updated_at DESC, n.id ASC;");

        let conn = db.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut views = Vec::new();
        while let Some(row) = rows.next()? {
            let mut view = note_view_from_row(row)?;
            attach_sections(conn, &mut view)?;
            views.push(view);
        }
        Ok(views)
    }

    fn create_note(&self, db: &DbHandle<'_>, note: &NewNote<'_>) -> RepoResult<String> {
        let template_id = parse_id("template", note.template_id)?;
        let owner_id = parse_id("account", note.owner_id)?;
        let conn = db.conn()?;
        ensure_account_exists(conn, &owner_id)?;

        let id = new_id();
        conn.execute(
            "INSERT INTO notes (id, title, template_id, owner_id, status)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![id, note.title, template_id, owner_id, note.status.as_str()],
        )?;
        Ok(id)
    }

    fn update_note_meta(&self, db: &DbHandle<'_>, id: &str, title: &str) -> RepoResult<()> {
        let id = parse_id("note", id)?;
        let sql = format!(
            "UPDATE notes
             SET title = ?2, updated_at = {SQL_NOW_MS}
             WHERE id = ?1;"
        );
        let changed = db.conn()?.execute(&sql, params![id, title])?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "note", id });
        }
        Ok(())
    }

    fn update_note_status(
        &self,
        db: &DbHandle<'_>,
        id: &str,
        status: &NoteStatus,
    ) -> RepoResult<()> {
        let id = parse_id("note", id)?;
        let sql = format!(
            "UPDATE notes
             SET status = ?2, updated_at = {SQL_NOW_MS}
             WHERE id = ?1;"
        );
        let changed = db.conn()?.execute(&sql, params![id, status.as_str()])?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "note", id });
        }
        Ok(())
    }

    fn delete_note(&self, db: &DbHandle<'_>, id: &str) -> RepoResult<()> {
        let id = parse_id("note", id)?;
        let changed = db
            .conn()?
            .execute("DELETE FROM notes WHERE id = ?1;", [id.as_str()])?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "note", id });
        }
        Ok(())
    }

    fn create_section(
        &self,
        db: &DbHandle<'_>,
        note_id: &str,
        draft: &SectionDraft,
    ) -> RepoResult<Section> {
        let note_id = parse_id("note", note_id)?;
        let field_id = parse_id("field", &draft.field_id)?;
        let id = new_id();
        db.conn()?.execute(
            "INSERT INTO sections (id, note_id, field_id, content)
             VALUES (?1, ?2, ?3, ?4);",
            params![id, note_id, field_id, draft.content],
        )?;
        Ok(Section {
            id,
            note_id,
            field_id,
            content: draft.content.clone(),
        })
    }

    fn update_section_content(
        &self,
        db: &DbHandle<'_>,
        note_id: &str,
        section_id: &str,
        content: &str,
    ) -> RepoResult<()> {
        let note_id = parse_id("note", note_id)?;
        let id = parse_id("section", section_id)?;
        let changed = db.conn()?.execute(
            "UPDATE sections
             SET content = ?3
             WHERE id = ?1 AND note_id = ?2;",
            params![id, note_id, content],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "section",
                id,
            });
        }
        Ok(())
    }

    fn list_sections_by_note(
        &self,
        db: &DbHandle<'_>,
        note_id: &str,
    ) -> RepoResult<Vec<SectionView>> {
        let note_id = parse_id("note", note_id)?;
        load_sections(db.conn()?, &note_id)
    }
}

fn note_view_from_row(row: &Row<'_>) -> RepoResult<NoteView> {
    let owner_id: String = row.get("owner_id")?;
    let status: String = row.get("status")?;
    Ok(NoteView {
        note: Note {
            id: row.get("id")?,
            title: row.get("title")?,
            template_id: row.get("template_id")?,
            owner_id: owner_id.clone(),
            status: NoteStatus::from(status),
            sections: Vec::new(),
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        },
        template_name: row.get("template_name")?,
        owner: OwnerSummary {
            id: owner_id,
            first_name: row.get("owner_first_name")?,
            last_name: row.get("owner_last_name")?,
            thumbnail: row.get("owner_thumbnail")?,
        },
        sections: Vec::new(),
    })
}

fn attach_sections(conn: &Connection, view: &mut NoteView) -> RepoResult<()> {
    let sections = load_sections(conn, &view.note.id)?;
    view.note.sections = sections.iter().map(|s| s.section.clone()).collect();
    view.sections = sections;
    Ok(())
}

fn load_sections(conn: &Connection, note_id: &str) -> RepoResult<Vec<SectionView>> {
    let mut stmt = conn.prepare(
        "SELECT
            s.id,
            s.note_id,
            s.field_id,
            s.content,
            f.label,
            f.sort_order,
            f.is_required
         FROM sections s
         INNER JOIN fields f ON f.id = s.field_id
         WHERE s.note_id = ?1
         ORDER BY f.sort_order ASC, s.id ASC;",
    )?;
    let mut rows = stmt.query([note_id])?;
    let mut sections = Vec::new();
    while let Some(row) = rows.next()? {
        let is_required: i64 = row.get("is_required")?;
        sections.push(SectionView {
            section: Section {
                id: row.get("id")?,
                note_id: row.get("note_id")?,
                field_id: row.get("field_id")?,
                content: row.get("content")?,
            },
            field_label: row.get("label")?,
            field_order: row.get("sort_order")?,
            is_required: int_to_bool("fields.is_required", is_required)?,
        });
    }
    Ok(sections)
}
