use formnote_core::model::template::FieldUpdate;
use formnote_core::{
    CancelToken, DbHandle, DomainError, ErrorKind, Field, FieldDraft, Presented, RepoResult,
    SqliteTemplateRepository, TemplateFilters, TemplateRepository, TemplateService, TemplateView,
    UpdateTemplateInput, ViewCollector,
};
use std::cell::Cell;
use std::rc::Rc;

mod common;

/// Delegates to SQLite and counts every write call.
struct CountingTemplates {
    inner: SqliteTemplateRepository,
    writes: Rc<Cell<usize>>,
}

impl CountingTemplates {
    fn new(inner: SqliteTemplateRepository, writes: Rc<Cell<usize>>) -> Self {
        Self { inner, writes }
    }

    fn bump(&self) {
        self.writes.set(self.writes.get() + 1);
    }
}

impl TemplateRepository for CountingTemplates {
    fn get_template(&self, db: &DbHandle<'_>, id: &str) -> RepoResult<TemplateView> {
        self.inner.get_template(db, id)
    }

    fn is_template_used(&self, db: &DbHandle<'_>, id: &str) -> RepoResult<bool> {
        self.inner.is_template_used(db, id)
    }

    fn list_templates(
        &self,
        db: &DbHandle<'_>,
        filters: &TemplateFilters,
    ) -> RepoResult<Vec<TemplateView>> {
        self.inner.list_templates(db, filters)
    }

    fn create_template(&self, db: &DbHandle<'_>, name: &str, owner_id: &str) -> RepoResult<String> {
        self.bump();
        self.inner.create_template(db, name, owner_id)
    }

    fn update_template_meta(&self, db: &DbHandle<'_>, id: &str, name: &str) -> RepoResult<()> {
        self.bump();
        self.inner.update_template_meta(db, id, name)
    }

    fn delete_template(&self, db: &DbHandle<'_>, id: &str) -> RepoResult<()> {
        self.bump();
        self.inner.delete_template(db, id)
    }

    fn list_fields_by_template(
        &self,
        db: &DbHandle<'_>,
        template_id: &str,
    ) -> RepoResult<Vec<Field>> {
        self.inner.list_fields_by_template(db, template_id)
    }

    fn create_field(
        &self,
        db: &DbHandle<'_>,
        template_id: &str,
        draft: &FieldDraft,
    ) -> RepoResult<Field> {
        self.bump();
        self.inner.create_field(db, template_id, draft)
    }

    fn update_field(&self, db: &DbHandle<'_>, update: &FieldUpdate) -> RepoResult<()> {
        self.bump();
        self.inner.update_field(db, update)
    }

    fn delete_field(&self, db: &DbHandle<'_>, field_id: &str) -> RepoResult<()> {
        self.bump();
        self.inner.delete_field(db, field_id)
    }
}

fn field_ids(view: &TemplateView) -> Vec<String> {
    view.template.fields.iter().map(|f| f.id.clone()).collect()
}

#[test]
fn shrinking_an_in_use_template_fails_without_writes() {
    let mut store = common::store();
    let owner = common::sign_in(&mut store, "ada@example.com");
    let template =
        common::create_template(&mut store, &owner.id, &[("Title", true), ("Body", false)]);
    common::create_note(&mut store, &owner.id, &template, &["Hello", ""]);

    let writes = Rc::new(Cell::new(0));
    let repo = CountingTemplates::new(
        SqliteTemplateRepository::try_new(store.connection()).unwrap(),
        Rc::clone(&writes),
    );
    let cancel = CancelToken::new();
    let mut service = TemplateService::new(&mut store, repo, ViewCollector::new());
    let err = service
        .update(
            &cancel,
            &template.template.id,
            &owner.id,
            UpdateTemplateInput {
                name: "Renamed".to_string(),
                fields: Some(vec![FieldDraft::new("Title", 0, true)]),
            },
        )
        .unwrap_err();
    assert_eq!(err.domain(), Some(&DomainError::TemplateInUse));
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(writes.get(), 0);
    assert!(service.presenter().last().is_none());
    drop(service);

    let mut service = common::template_service(&mut store);
    service.get(&cancel, &template.template.id).unwrap();
    let after = service.presenter().template().unwrap();
    assert_eq!(after.template.name, "Daily");
    assert_eq!(field_ids(after), field_ids(&template));
    assert_eq!(after.template.fields[1].label, "Body");
    assert!(after.is_used);
}

#[test]
fn rename_without_fields_writes_only_the_header() {
    let mut store = common::store();
    let owner = common::sign_in(&mut store, "ada@example.com");
    let template =
        common::create_template(&mut store, &owner.id, &[("Title", true), ("Body", false)]);

    let writes = Rc::new(Cell::new(0));
    let repo = CountingTemplates::new(
        SqliteTemplateRepository::try_new(store.connection()).unwrap(),
        Rc::clone(&writes),
    );
    let cancel = CancelToken::new();
    let mut service = TemplateService::new(&mut store, repo, ViewCollector::new());
    service
        .update(
            &cancel,
            &template.template.id,
            &owner.id,
            UpdateTemplateInput {
                name: "  Renamed  ".to_string(),
                fields: None,
            },
        )
        .unwrap();
    assert_eq!(writes.get(), 1);
    let after = service.presenter().template().unwrap();
    assert_eq!(after.template.name, "Renamed");
    assert_eq!(field_ids(after), field_ids(&template));
}

#[test]
fn shrinking_an_unused_template_deletes_the_tail() {
    let mut store = common::store();
    let owner = common::sign_in(&mut store, "ada@example.com");
    let template = common::create_template(
        &mut store,
        &owner.id,
        &[("Title", true), ("Body", false), ("Mood", false)],
    );

    let cancel = CancelToken::new();
    let mut service = common::template_service(&mut store);
    service
        .update(
            &cancel,
            &template.template.id,
            &owner.id,
            UpdateTemplateInput {
                name: "Daily".to_string(),
                fields: Some(vec![FieldDraft::new("Summary", 0, false)]),
            },
        )
        .unwrap();

    let after = service.presenter().template().unwrap();
    assert_eq!(after.template.fields.len(), 1);
    assert_eq!(after.template.fields[0].id, template.template.fields[0].id);
    assert_eq!(after.template.fields[0].label, "Summary");
    drop(service);
    assert_eq!(common::count(&store, "fields"), 1);
}

#[test]
fn in_use_template_may_still_grow_and_relabel() {
    let mut store = common::store();
    let owner = common::sign_in(&mut store, "ada@example.com");
    let template =
        common::create_template(&mut store, &owner.id, &[("Title", true), ("Body", false)]);
    common::create_note(&mut store, &owner.id, &template, &["Hello", ""]);

    let cancel = CancelToken::new();
    let mut service = common::template_service(&mut store);
    service
        .update(
            &cancel,
            &template.template.id,
            &owner.id,
            UpdateTemplateInput {
                name: "Daily".to_string(),
                fields: Some(vec![
                    FieldDraft::new("Headline", 0, true),
                    FieldDraft::new("Body", 0, false),
                    FieldDraft::new("Mood", 0, false),
                ]),
            },
        )
        .unwrap();
    let after = service.presenter().template().unwrap();
    assert_eq!(after.template.fields.len(), 3);
    assert_eq!(after.template.fields[0].label, "Headline");
}

#[test]
fn deleting_an_in_use_template_is_a_conflict() {
    let mut store = common::store();
    let owner = common::sign_in(&mut store, "ada@example.com");
    let template = common::create_template(&mut store, &owner.id, &[("Title", true)]);
    common::create_note(&mut store, &owner.id, &template, &["Hello"]);

    let cancel = CancelToken::new();
    let mut service = common::template_service(&mut store);
    let err = service
        .delete(&cancel, &template.template.id, &owner.id)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    drop(service);
    assert_eq!(common::count(&store, "templates"), 1);
}

#[test]
fn delete_by_owner_removes_template_and_fields() {
    let mut store = common::store();
    let owner = common::sign_in(&mut store, "ada@example.com");
    let template =
        common::create_template(&mut store, &owner.id, &[("Title", true), ("Body", false)]);

    let cancel = CancelToken::new();
    let mut service = common::template_service(&mut store);
    service
        .delete(&cancel, &template.template.id, &owner.id)
        .unwrap();
    assert_eq!(
        service.presenter().last(),
        Some(&Presented::TemplateDeleted(template.template.id.clone()))
    );
    drop(service);
    assert_eq!(common::count(&store, "templates"), 0);
    assert_eq!(common::count(&store, "fields"), 0);
}

#[test]
fn list_filters_by_owner_and_reports_usage() {
    let mut store = common::store();
    let ada = common::sign_in(&mut store, "ada@example.com");
    let bob = common::sign_in(&mut store, "bob@example.com");
    let used = common::create_template(&mut store, &ada.id, &[("Title", true)]);
    common::create_template(&mut store, &bob.id, &[("Title", true)]);
    common::create_note(&mut store, &ada.id, &used, &["Hello"]);

    let cancel = CancelToken::new();
    let mut service = common::template_service(&mut store);
    service
        .list(
            &cancel,
            &TemplateFilters {
                owner_id: Some(ada.id.clone()),
                query: Some("dai".to_string()),
            },
        )
        .unwrap();
    match service.presenter().last() {
        Some(Presented::TemplateList(views)) => {
            assert_eq!(views.len(), 1);
            assert!(views[0].is_used);
            assert_eq!(views[0].owner.id, ada.id);
        }
        other => panic!("unexpected output: {other:?}"),
    }

    let err = service
        .list(
            &cancel,
            &TemplateFilters {
                owner_id: Some("not-a-uuid".to_string()),
                query: None,
            },
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidId);
}

#[test]
fn malformed_and_missing_ids_are_distinguished() {
    let mut store = common::store();
    let cancel = CancelToken::new();
    let mut service = common::template_service(&mut store);

    let err = service.get(&cancel, "abc").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidId);
    let err = service
        .get(&cancel, "00000000-0000-4000-8000-000000000000")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn owner_keeps_access_when_sending_an_uppercase_id() {
    let mut store = common::store();
    let owner = common::sign_in(&mut store, "ada@example.com");
    let shouted = owner.id.to_uppercase();
    let template = common::create_template(&mut store, &shouted, &[("Title", true)]);
    assert_eq!(template.template.owner_id, owner.id);

    let cancel = CancelToken::new();
    let mut service = common::template_service(&mut store);
    service
        .update(
            &cancel,
            &template.template.id,
            &format!("  {shouted}  "),
            UpdateTemplateInput {
                name: "Weekly".to_string(),
                fields: None,
            },
        )
        .unwrap();
    assert_eq!(service.presenter().template().unwrap().template.name, "Weekly");

    service
        .delete(&cancel, &template.template.id, &shouted)
        .unwrap();
    drop(service);
    assert_eq!(common::count(&store, "templates"), 0);
}
