use async_trait::async_trait;
use chatsql::prelude::*;
use chatsql::report;
use chrono::NaiveDate;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Connection};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

/// Answers with a fixed statement and remembers the prompts it saw.
struct ScriptedLlm {
    answer: &'static str,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    fn new(answer: &'static str) -> Arc<Self> {
        Arc::new(Self {
            answer,
            prompts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn complete(&self, prompt: &str) -> ChatSqlResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.answer.to_string())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// A SQLite file with `users(1 Ana, 2 Bo, 3 Cy)`.
async fn users_db(name: &str) -> (SqlDatabase, PathBuf) {
    let path = std::env::temp_dir().join(format!("chatsql-{}-{}.db", std::process::id(), name));
    let _ = std::fs::remove_file(&path);

    let mut conn = SqliteConnectOptions::from_str(&format!("sqlite://{}", path.display()))
        .unwrap()
        .create_if_missing(true)
        .connect()
        .await
        .unwrap();
    sqlx::query("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL)")
        .execute(&mut conn)
        .await
        .unwrap();
    sqlx::query("INSERT INTO users (id, name) VALUES (1, 'Ana'), (2, 'Bo'), (3, 'Cy')")
        .execute(&mut conn)
        .await
        .unwrap();
    conn.close().await.unwrap();

    (SqlDatabase::new(format!("sqlite://{}", path.display()), 3), path)
}

#[tokio::test]
async fn test_list_two_users() {
    let (db, path) = users_db("list").await;
    let llm = ScriptedLlm::new("SELECT id, name FROM users LIMIT 2;");
    let translator = Translator::new(llm.clone(), 5);
    let mut conversation = Conversation::new();

    let answer = Pipeline::new(&translator, &db)
        .ask(&mut conversation, "list 2 users")
        .await;

    let bundle = conversation.get(answer).and_then(Exchange::bundle).unwrap();
    let table = bundle.table().expect("query should succeed");
    assert_eq!(table.columns(), &["id".to_string(), "name".to_string()]);
    assert_eq!(
        table.rows(),
        &[
            vec![Value::Int(1), Value::from("Ana")],
            vec![Value::Int(2), Value::from("Bo")],
        ]
    );

    // The prompt carried the live schema and sample rows.
    let prompts = llm.prompts.lock().unwrap();
    assert!(prompts[0].contains("CREATE TABLE \"users\""));
    assert!(prompts[0].contains("3 rows from users table"));
    assert!(prompts[0].contains("Question: list 2 users"));

    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn test_fenced_delete_is_blocked_and_not_run() {
    let (db, path) = users_db("blocked").await;
    let translator = Translator::new(ScriptedLlm::new("```sql\nDELETE FROM users;\n```"), 5);

    let bundle = Pipeline::new(&translator, &db).run("show all users").await;
    assert_eq!(bundle.error(), Some(BLOCKED_MESSAGE));
    assert!(bundle.table().is_none());

    let remaining = db.fetch("SELECT COUNT(*) AS n FROM users").await.unwrap();
    assert_eq!(remaining.rows()[0][0], Value::Int(3));

    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn test_bad_sql_is_a_database_error() {
    let (db, path) = users_db("bad").await;
    let translator = Translator::new(ScriptedLlm::new("SELECT nope FROM nowhere"), 5);

    let bundle = Pipeline::new(&translator, &db).run("anything").await;
    assert!(bundle.table().is_none());
    assert!(bundle.error().unwrap().starts_with("An error occurred: Execution error"));
    assert_eq!(
        bundle.failure_kind(),
        Some(FailureKind::Pipeline(ErrorKind::Database))
    );

    let _ = std::fs::remove_file(path);
}

#[tokio::test]
async fn test_zero_rows_then_report_history() {
    let (db, path) = users_db("history").await;
    let mut conversation = Conversation::new();

    let empty = Translator::new(ScriptedLlm::new("SELECT id FROM users WHERE id > 99"), 5);
    let first = Pipeline::new(&empty, &db)
        .ask(&mut conversation, "users above 99")
        .await;
    let all = Translator::new(ScriptedLlm::new("SELECT id, name FROM users"), 5);
    let second = Pipeline::new(&all, &db)
        .ask(&mut conversation, "Relatório de vendas")
        .await;

    let first_bundle = conversation.get(first).and_then(Exchange::bundle).unwrap();
    assert!(first_bundle.error().is_none());
    assert!(first_bundle.table().unwrap().is_empty());

    // A historical answer recovers its own question for the report.
    let question = conversation.question_for(second).unwrap().to_string();
    assert_eq!(question, "Relatório de vendas");
    conversation.select_layout(second, PdfLayout::Simple);

    let at = NaiveDate::from_ymd_opt(2026, 10, 17)
        .unwrap()
        .and_hms_opt(8, 30, 0)
        .unwrap();
    let table = conversation
        .get(second)
        .and_then(Exchange::bundle)
        .and_then(ResultBundle::table)
        .unwrap();
    let artifact = report::generate(
        table,
        &question,
        ReportFormat::Document(conversation.layout_for(second)),
        at,
    )
    .unwrap();
    assert_eq!(
        artifact.filename,
        "Report_Relatório_de_vendas_2026-10-17_083000_simple.pdf"
    );
    assert!(artifact.bytes.starts_with(b"%PDF"));

    let _ = std::fs::remove_file(path);
}
