//! Core domain logic for formnote: form templates and the notes filled in
//! from them.
//! This crate is the single source of truth for template/note invariants.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod presenter;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use db::{CancelToken, DbError, DbHandle, SqliteStore, TxManager};
pub use error::{ErrorKind, ServiceError, ServiceResult};
pub use logging::{init_logging, logging_status, LogLevel, LoggingError};
pub use model::account::{Account, AccountProfile, OwnerSummary};
pub use model::note::{
    Note, NoteFilters, NoteStatus, NoteView, Section, SectionDraft, SectionEdit, SectionView,
};
pub use model::template::{Field, FieldDraft, Template, TemplateFilters, TemplateView};
pub use model::validation::DomainError;
pub use presenter::{AccountPresenter, NotePresenter, Presented, TemplatePresenter, ViewCollector};
pub use repo::account_repo::{AccountRepository, SqliteAccountRepository};
pub use repo::note_repo::{NoteRepository, SqliteNoteRepository};
pub use repo::template_repo::{SqliteTemplateRepository, TemplateRepository};
pub use repo::{RepoError, RepoResult};
pub use service::account_service::AccountService;
pub use service::note_service::{CreateNoteInput, NoteService, UpdateNoteInput};
pub use service::template_service::{CreateTemplateInput, TemplateService, UpdateTemplateInput};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
