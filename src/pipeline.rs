//! Per-turn orchestration: translate, gate, execute, record.
//!
//! Every failure is caught here and turned into a [`ResultBundle`] carrying
//! only an error message, so a turn never aborts the session.

use crate::config::ConfigLoader;
use crate::conversation::{Conversation, Exchange, ResultBundle};
use crate::engine::{Database, SqlDatabase};
use crate::error::{ChatSqlError, ChatSqlResult};
use crate::gate::{self, Verdict};
use crate::translator::{GeminiProvider, Translator};

use std::sync::Arc;

/// Prefix of every user-facing pipeline error.
pub const ERROR_PREFIX: &str = "An error occurred: ";

/// Translator and database wired together for one turn.
pub struct Pipeline<'a> {
    translator: &'a Translator,
    database: &'a dyn Database,
}

impl<'a> Pipeline<'a> {
    pub fn new(translator: &'a Translator, database: &'a dyn Database) -> Self {
        Self {
            translator,
            database,
        }
    }

    /// Answer `question`. Never fails; errors end up inside the bundle.
    pub async fn run(&self, question: &str) -> ResultBundle {
        match self.try_run(question).await {
            Ok(bundle) => bundle,
            Err(e) => failure(e),
        }
    }

    async fn try_run(&self, question: &str) -> ChatSqlResult<ResultBundle> {
        let schema = self.database.schema().await?;
        tracing::debug!(tables = schema.tables.len(), "schema loaded");

        let statement = self.translator.translate(question, &schema).await?;
        tracing::info!(provider = self.translator.provider_name(), "statement generated");

        match gate::check(&statement) {
            Verdict::Blocked => {
                tracing::warn!("blocked non-SELECT statement");
                Ok(ResultBundle::blocked(statement))
            }
            Verdict::Allowed => {
                let table = self.database.fetch(&statement).await?;
                tracing::info!(rows = table.len(), "statement executed");
                Ok(ResultBundle::success(statement, table))
            }
        }
    }

    /// Run a full turn against `conversation`, returning the answer's position.
    pub async fn ask(&self, conversation: &mut Conversation, question: &str) -> usize {
        conversation.append(Exchange::user(question));
        let bundle = self.run(question).await;
        conversation.append(Exchange::Assistant(bundle))
    }
}

fn failure(e: ChatSqlError) -> ResultBundle {
    tracing::error!(kind = ?e.kind(), "turn failed: {}", e);
    ResultBundle::failed(e.kind(), format!("{}{}", ERROR_PREFIX, e))
}

/// Production wiring: resolves configuration afresh for every turn and talks
/// to Gemini and the configured SQL database.
#[derive(Debug, Clone, Default)]
pub struct Assistant {
    loader: ConfigLoader,
}

impl Assistant {
    pub fn new(loader: ConfigLoader) -> Self {
        Self { loader }
    }

    pub fn loader(&self) -> &ConfigLoader {
        &self.loader
    }

    /// Answer one question without touching a conversation.
    pub async fn answer(&self, question: &str) -> ResultBundle {
        let config = match self.loader.load() {
            Ok(config) => config,
            Err(e) => return failure(e),
        };
        let provider = Arc::new(GeminiProvider::new(&config.llm));
        let translator = Translator::new(provider, config.llm.top_k);
        let database = SqlDatabase::new(config.database.url(), config.database.sample_rows);
        Pipeline::new(&translator, &database).run(question).await
    }

    /// Record `question` and its answer, returning the answer's position.
    pub async fn ask(&self, conversation: &mut Conversation, question: &str) -> usize {
        conversation.append(Exchange::user(question));
        let bundle = self.answer(question).await;
        conversation.append(Exchange::Assistant(bundle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Dialect;
    use crate::conversation::FailureKind;
    use crate::error::ErrorKind;
    use crate::schema::SchemaSummary;
    use crate::table::{ResultTable, Value};
    use crate::translator::LlmProvider;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedLlm(&'static str);

    #[async_trait]
    impl LlmProvider for FixedLlm {
        async fn complete(&self, _prompt: &str) -> ChatSqlResult<String> {
            Ok(self.0.to_string())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct DownLlm;

    #[async_trait]
    impl LlmProvider for DownLlm {
        async fn complete(&self, _prompt: &str) -> ChatSqlResult<String> {
            Err(ChatSqlError::Provider("HTTP 503 Service Unavailable: ".into()))
        }

        fn name(&self) -> &str {
            "down"
        }
    }

    #[derive(Default)]
    struct CountingDb {
        fetches: AtomicUsize,
        table: ResultTable,
    }

    #[async_trait]
    impl Database for CountingDb {
        fn dialect(&self) -> Dialect {
            Dialect::MySql
        }

        async fn schema(&self) -> ChatSqlResult<SchemaSummary> {
            Ok(SchemaSummary::new(Dialect::MySql))
        }

        async fn fetch(&self, _sql: &str) -> ChatSqlResult<ResultTable> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.table.clone())
        }
    }

    fn translator(llm: impl LlmProvider + 'static) -> Translator {
        Translator::new(Arc::new(llm), 5)
    }

    #[tokio::test]
    async fn test_blocked_statement_is_not_executed() {
        let t = translator(FixedLlm("```sql\nDELETE FROM users;\n```"));
        let db = CountingDb::default();
        let bundle = Pipeline::new(&t, &db).run("show all users").await;

        assert_eq!(bundle.error(), Some(gate::BLOCKED_MESSAGE));
        assert_eq!(bundle.statement(), Some("DELETE FROM users;"));
        assert!(bundle.table().is_none());
        assert_eq!(db.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_select_is_executed() {
        let t = translator(FixedLlm("SELECT id FROM users"));
        let db = CountingDb {
            table: ResultTable::new(vec!["id".into()]).with_row([Value::Int(7)]),
            ..Default::default()
        };
        let bundle = Pipeline::new(&t, &db).run("ids").await;

        assert_eq!(bundle.error(), None);
        assert_eq!(bundle.table().unwrap().len(), 1);
        assert_eq!(db.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_result_is_not_an_error() {
        let t = translator(FixedLlm("SELECT id FROM users WHERE 1 = 0"));
        let db = CountingDb::default();
        let bundle = Pipeline::new(&t, &db).run("nobody").await;

        assert!(bundle.error().is_none());
        assert!(bundle.table().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_provider_failure_becomes_error_bundle() {
        let t = translator(DownLlm);
        let db = CountingDb::default();
        let bundle = Pipeline::new(&t, &db).run("anything").await;

        let message = bundle.error().unwrap();
        assert!(message.starts_with(ERROR_PREFIX));
        assert!(message.contains("503"));
        assert_eq!(bundle.statement(), None);
        assert_eq!(
            bundle.failure_kind(),
            Some(FailureKind::Pipeline(ErrorKind::Provider))
        );
    }

    #[tokio::test]
    async fn test_ask_appends_both_exchanges() {
        let t = translator(FixedLlm("SELECT 1"));
        let db = CountingDb::default();
        let mut conv = Conversation::new();
        let answer = Pipeline::new(&t, &db).ask(&mut conv, "one").await;

        assert_eq!(answer, 1);
        assert_eq!(conv.len(), 2);
        assert_eq!(conv.question_for(answer), Some("one"));
    }

    #[tokio::test]
    async fn test_missing_config_becomes_error_bundle() {
        let assistant = Assistant::new(ConfigLoader::with_file("/nonexistent/chatsql.toml"));
        let bundle = assistant.answer("anything").await;
        assert_eq!(
            bundle.failure_kind(),
            Some(FailureKind::Pipeline(ErrorKind::Config))
        );
        assert!(bundle.error().unwrap().starts_with(ERROR_PREFIX));
    }
}
