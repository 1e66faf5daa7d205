#![allow(dead_code)]

use formnote_core::{
    Account, AccountProfile, AccountService, CancelToken, CreateNoteInput, CreateTemplateInput,
    FieldDraft, NoteService, NoteView, SectionDraft, SqliteAccountRepository,
    SqliteNoteRepository, SqliteStore, SqliteTemplateRepository, TemplateService, TemplateView,
    ViewCollector,
};

pub fn store() -> SqliteStore {
    SqliteStore::open_in_memory().unwrap()
}

pub fn sign_in(store: &mut SqliteStore, email: &str) -> Account {
    let repo = SqliteAccountRepository::try_new(store.connection()).unwrap();
    let mut service = AccountService::new(store, repo, ViewCollector::new());
    service
        .create_or_get(
            &CancelToken::new(),
            AccountProfile {
                email: email.to_string(),
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                provider: "google".to_string(),
                provider_account_id: format!("pid-{email}"),
                thumbnail: None,
            },
        )
        .unwrap();
    service.presenter().account().unwrap().clone()
}

pub fn template_service(
    store: &mut SqliteStore,
) -> TemplateService<'_, SqliteStore, SqliteTemplateRepository, ViewCollector> {
    let repo = SqliteTemplateRepository::try_new(store.connection()).unwrap();
    TemplateService::new(store, repo, ViewCollector::new())
}

pub fn note_service(
    store: &mut SqliteStore,
) -> NoteService<'_, SqliteStore, SqliteNoteRepository, SqliteTemplateRepository, ViewCollector> {
    let notes = SqliteNoteRepository::try_new(store.connection()).unwrap();
    let templates = SqliteTemplateRepository::try_new(store.connection()).unwrap();
    NoteService::new(store, notes, templates, ViewCollector::new())
}

/// Creates a template whose fields are `(label, is_required)` in order.
pub fn create_template(store: &mut SqliteStore, owner_id: &str, fields: &[(&str, bool)]) -> TemplateView {
    let mut service = template_service(store);
    service
        .create(
            &CancelToken::new(),
            CreateTemplateInput {
                name: "Daily".to_string(),
                owner_id: owner_id.to_string(),
                fields: fields
                    .iter()
                    .map(|(label, required)| FieldDraft::new(*label, 0, *required))
                    .collect(),
            },
        )
        .unwrap();
    service.presenter().template().unwrap().clone()
}

/// Creates a note filling the template's fields with `contents` in field
/// order.
pub fn create_note(
    store: &mut SqliteStore,
    owner_id: &str,
    template: &TemplateView,
    contents: &[&str],
) -> NoteView {
    let sections = template
        .template
        .fields
        .iter()
        .zip(contents)
        .map(|(field, content)| SectionDraft::new(field.id.clone(), *content))
        .collect();
    let mut service = note_service(store);
    service
        .create(
            &CancelToken::new(),
            CreateNoteInput {
                title: "Monday".to_string(),
                template_id: template.template.id.clone(),
                owner_id: owner_id.to_string(),
                sections,
            },
        )
        .unwrap();
    service.presenter().note().unwrap().clone()
}

pub fn count(store: &SqliteStore, table: &str) -> i64 {
    store
        .connection()
        .query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| row.get(0))
        .unwrap()
}
