//! CLI smoke entry point.
//!
//! # Responsibility
//! - Run the bootstrap path an embedding host would: config, logging,
//!   database open with migrations.
//! - Print a short deterministic summary of what the store holds.

use formnote_core::{
    core_version, init_logging, CancelToken, CoreConfig, NoteFilters, NoteService, Presented,
    SqliteNoteRepository, SqliteStore, SqliteTemplateRepository, TemplateFilters,
    TemplateService, ViewCollector,
};
use std::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("event=cli_exit module=cli status=error error={err}");
            eprintln!("formnote: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let config = CoreConfig::from_env()?;
    if let Some(log_dir) = config.log_dir.as_deref() {
        init_logging(config.log_level, log_dir)?;
    }

    let mut store = match config.db_path.as_deref() {
        Some(path) => SqliteStore::open(path)?,
        None => SqliteStore::open_in_memory()?,
    };
    let cancel = CancelToken::new();

    let templates = SqliteTemplateRepository::try_new(store.connection())?;
    let mut service = TemplateService::new(&mut store, templates, ViewCollector::new());
    service.list(&cancel, &TemplateFilters::default())?;
    let template_count = list_len(service.presenter().last());

    let notes = SqliteNoteRepository::try_new(store.connection())?;
    let templates = SqliteTemplateRepository::try_new(store.connection())?;
    let mut service = NoteService::new(&mut store, notes, templates, ViewCollector::new());
    service.list(&cancel, &NoteFilters::default())?;
    let note_count = list_len(service.presenter().last());

    let db = config
        .db_path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| ":memory:".to_string());
    println!("formnote_core version={}", core_version());
    println!("db={db} templates={template_count} notes={note_count}");
    Ok(())
}

fn list_len(presented: Option<&Presented>) -> usize {
    match presented {
        Some(Presented::TemplateList(views)) => views.len(),
        Some(Presented::NoteList(views)) => views.len(),
        _ => 0,
    }
}
