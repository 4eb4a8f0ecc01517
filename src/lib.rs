//! # chatsql: ask your database in plain language
//!
//! chatsql turns a natural-language question into a single SQL statement
//! with a language model, refuses anything that is not a `SELECT`, runs the
//! statement, and keeps the answer in a per-session conversation. Answers can
//! be exported as spreadsheets or paginated PDF reports.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use chatsql::prelude::*;
//!
//! let assistant = Assistant::new(ConfigLoader::new());
//! let mut conversation = Conversation::new();
//!
//! let answer = assistant.ask(&mut conversation, "top 5 customers by revenue").await;
//! if let Some(Exchange::Assistant(bundle)) = conversation.get(answer) {
//!     println!("{}", chatsql::view::render_bundle(bundle));
//! }
//! ```
//!
//! ## Pipeline
//!
//! | Stage     | Module             | Failure                      |
//! |-----------|--------------------|------------------------------|
//! | Configure | [`config`]         | `An error occurred: ...`     |
//! | Translate | [`translator`]     | `An error occurred: ...`     |
//! | Gate      | [`gate`]           | fixed blocked-action message |
//! | Execute   | [`engine`]         | `An error occurred: ...`     |
//! | Record    | [`conversation`]   | none                         |

pub mod config;
pub mod conversation;
pub mod engine;
pub mod error;
pub mod gate;
pub mod pipeline;
pub mod report;
pub mod schema;
pub mod table;
pub mod translator;
pub mod view;

pub mod prelude {
    pub use crate::config::{Config, ConfigLoader, Dialect};
    pub use crate::conversation::{Conversation, Exchange, FailureKind, Outcome, ResultBundle};
    pub use crate::engine::{Database, SqlDatabase};
    pub use crate::error::*;
    pub use crate::gate::{BLOCKED_MESSAGE, Verdict};
    pub use crate::pipeline::{Assistant, Pipeline};
    pub use crate::report::{PdfLayout, ReportArtifact, ReportFormat};
    pub use crate::schema::SchemaSummary;
    pub use crate::table::{ResultTable, Value};
    pub use crate::translator::{GeminiProvider, LlmProvider, Translator};
}

/// Classify a generated statement as allowed or blocked.
///
/// # Example
///
/// ```
/// use chatsql::{check, gate::Verdict};
///
/// assert_eq!(check("select * from users"), Verdict::Allowed);
/// assert_eq!(check("DROP TABLE users"), Verdict::Blocked);
/// ```
pub fn check(statement: &str) -> gate::Verdict {
    gate::check(statement)
}
