//! Output ports for service results.
//!
//! Services hand every successful result to a presenter instead of returning
//! it, so transports decide the output shape. [`ViewCollector`] keeps the
//! last output in memory for the CLI and tests.

use crate::model::account::Account;
use crate::model::note::NoteView;
use crate::model::template::TemplateView;
use serde::Serialize;

pub trait TemplatePresenter {
    fn present_template_list(&mut self, templates: Vec<TemplateView>);
    fn present_template(&mut self, template: TemplateView);
    fn present_template_deleted(&mut self, template_id: &str);
}

pub trait NotePresenter {
    fn present_note_list(&mut self, notes: Vec<NoteView>);
    fn present_note(&mut self, note: NoteView);
    fn present_note_deleted(&mut self, note_id: &str);
}

pub trait AccountPresenter {
    fn present_account(&mut self, account: Account);
}

/// One presented result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Presented {
    TemplateList(Vec<TemplateView>),
    Template(TemplateView),
    TemplateDeleted(String),
    NoteList(Vec<NoteView>),
    Note(NoteView),
    NoteDeleted(String),
    Account(Account),
}

/// Presenter that remembers the most recent output.
#[derive(Debug, Clone, Default)]
pub struct ViewCollector {
    last: Option<Presented>,
}

impl ViewCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&Presented> {
        self.last.as_ref()
    }

    pub fn take(&mut self) -> Option<Presented> {
        self.last.take()
    }

    pub fn template(&self) -> Option<&TemplateView> {
        match self.last.as_ref()? {
            Presented::Template(view) => Some(view),
            _ => None,
        }
    }

    pub fn note(&self) -> Option<&NoteView> {
        match self.last.as_ref()? {
            Presented::Note(view) => Some(view),
            _ => None,
        }
    }

    pub fn account(&self) -> Option<&Account> {
        match self.last.as_ref()? {
            Presented::Account(account) => Some(account),
            _ => None,
        }
    }

    fn record(&mut self, output: Presented) {
        self.last = Some(output);
    }
}

impl TemplatePresenter for ViewCollector {
    fn present_template_list(&mut self, templates: Vec<TemplateView>) {
        self.record(Presented::TemplateList(templates));
    }

    fn present_template(&mut self, template: TemplateView) {
        self.record(Presented::Template(template));
    }

    fn present_template_deleted(&mut self, template_id: &str) {
        self.record(Presented::TemplateDeleted(template_id.to_string()));
    }
}

impl NotePresenter for ViewCollector {
    fn present_note_list(&mut self, notes: Vec<NoteView>) {
        self.record(Presented::NoteList(notes));
    }

    fn present_note(&mut self, note: NoteView) {
        self.record(Presented::Note(note));
    }

    fn present_note_deleted(&mut self, note_id: &str) {
        self.record(Presented::NoteDeleted(note_id.to_string()));
    }
}

impl AccountPresenter for ViewCollector {
    fn present_account(&mut self, account: Account) {
        self.record(Presented::Account(account));
    }
}
