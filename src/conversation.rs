//! The per-session conversation log.

use crate::error::ErrorKind;
use crate::report::PdfLayout;
use crate::table::ResultTable;

use std::collections::HashMap;

/// Why a turn produced no table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The statement was refused by the read-only gate.
    Blocked,
    /// Something in the pipeline failed.
    Pipeline(ErrorKind),
}

/// Either a table or an error message, never both.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Table(ResultTable),
    Failed { kind: FailureKind, message: String },
}

/// Everything the assistant answered for one question.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultBundle {
    statement: Option<String>,
    outcome: Outcome,
}

impl ResultBundle {
    pub fn success(statement: String, table: ResultTable) -> Self {
        Self {
            statement: Some(statement),
            outcome: Outcome::Table(table),
        }
    }

    /// A refused statement; the statement text is kept for display.
    pub fn blocked(statement: String) -> Self {
        Self {
            statement: Some(statement),
            outcome: Outcome::Failed {
                kind: FailureKind::Blocked,
                message: crate::gate::BLOCKED_MESSAGE.to_string(),
            },
        }
    }

    /// A pipeline failure; no statement survives.
    pub fn failed(kind: ErrorKind, message: String) -> Self {
        Self {
            statement: None,
            outcome: Outcome::Failed {
                kind: FailureKind::Pipeline(kind),
                message,
            },
        }
    }

    pub fn statement(&self) -> Option<&str> {
        self.statement.as_deref()
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    pub fn table(&self) -> Option<&ResultTable> {
        match &self.outcome {
            Outcome::Table(table) => Some(table),
            Outcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Table(_) => None,
            Outcome::Failed { message, .. } => Some(message),
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match &self.outcome {
            Outcome::Table(_) => None,
            Outcome::Failed { kind, .. } => Some(*kind),
        }
    }
}

/// One turn of the conversation.
#[derive(Debug, Clone, PartialEq)]
pub enum Exchange {
    User { question: String },
    Assistant(ResultBundle),
}

impl Exchange {
    pub fn user(question: impl Into<String>) -> Self {
        Exchange::User {
            question: question.into(),
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Exchange::User { .. })
    }

    pub fn bundle(&self) -> Option<&ResultBundle> {
        match self {
            Exchange::Assistant(bundle) => Some(bundle),
            Exchange::User { .. } => None,
        }
    }
}

/// Append-only log of exchanges for one session.
///
/// Document layout choices are kept beside the log, keyed by the position of
/// the assistant exchange they apply to.
#[derive(Debug, Default)]
pub struct Conversation {
    exchanges: Vec<Exchange>,
    layouts: HashMap<usize, PdfLayout>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an exchange, returning its position.
    pub fn append(&mut self, exchange: Exchange) -> usize {
        self.exchanges.push(exchange);
        self.exchanges.len() - 1
    }

    pub fn snapshot(&self) -> &[Exchange] {
        &self.exchanges
    }

    pub fn get(&self, index: usize) -> Option<&Exchange> {
        self.exchanges.get(index)
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    /// The question asked right before the assistant exchange at `index`.
    pub fn question_for(&self, index: usize) -> Option<&str> {
        if !matches!(self.exchanges.get(index), Some(Exchange::Assistant(_))) {
            return None;
        }
        match self.exchanges.get(index.checked_sub(1)?) {
            Some(Exchange::User { question }) => Some(question),
            _ => None,
        }
    }

    /// Positions of all assistant exchanges, oldest first.
    pub fn answers(&self) -> Vec<usize> {
        self.exchanges
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.is_user())
            .map(|(i, _)| i)
            .collect()
    }

    /// Remember the document layout for the answer at `index`.
    pub fn select_layout(&mut self, index: usize, layout: PdfLayout) {
        self.layouts.insert(index, layout);
    }

    /// Layout last chosen for `index`, corporate by default.
    pub fn layout_for(&self, index: usize) -> PdfLayout {
        self.layouts.get(&index).copied().unwrap_or_default()
    }
}
