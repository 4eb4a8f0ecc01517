//! Natural language to SQL translation.
//!
//! A [`Translator`] builds a dialect-aware prompt from the question and a
//! [`SchemaSummary`], sends it to an [`LlmProvider`], and cleans the answer
//! down to a bare statement.

use crate::config::LlmConfig;
use crate::error::{ChatSqlError, ChatSqlResult};
use crate::schema::SchemaSummary;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A text completion backend.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Complete `prompt`, returning the raw model text.
    async fn complete(&self, prompt: &str) -> ChatSqlResult<String>;

    /// Short provider name for logs.
    fn name(&self) -> &str;
}

/// Google Gemini over the `generateContent` REST endpoint.
pub struct GeminiProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    temperature: f32,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl GeminiProvider {
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            temperature: config.temperature,
        }
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn complete(&self, prompt: &str) -> ChatSqlResult<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        };

        tracing::debug!(model = %self.model, "sending generateContent request");
        let resp = self
            .client
            .post(self.url())
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            let truncated: String = body.chars().take(200).collect();
            return Err(ChatSqlError::Provider(format!("HTTP {}: {}", status, truncated)));
        }

        let data: GenerateResponse = resp.json().await?;
        extract_text(data)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

fn extract_text(data: GenerateResponse) -> ChatSqlResult<String> {
    let content = data
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .ok_or_else(|| ChatSqlError::Provider("response contained no candidates".into()))?;
    Ok(content
        .parts
        .into_iter()
        .map(|p| p.text)
        .collect::<Vec<_>>()
        .join(""))
}

/// Turns questions into SQL using a provider.
#[derive(Clone)]
pub struct Translator {
    provider: Arc<dyn LlmProvider>,
    top_k: u32,
}

impl Translator {
    pub fn new(provider: Arc<dyn LlmProvider>, top_k: u32) -> Self {
        Self { provider, top_k }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Build the full prompt for `question`.
    pub fn build_prompt(&self, question: &str, schema: &SchemaSummary) -> String {
        let dialect = schema.dialect;
        let quote_example = dialect.quote("column");
        format!(
            "You are a {dialect} expert. Given an input question, create a syntactically correct \
             {dialect} query to run.\n\
             Unless the user specifies in the question a specific number of examples to obtain, \
             query for at most {top_k} results using the LIMIT clause. You can order the results \
             to return the most informative data in the database.\n\
             Never query for all columns from a table. You must query only the columns that are \
             needed to answer the question. Wrap each column name in quotes ({quote_example}) to \
             denote them as delimited identifiers.\n\
             Pay attention to use only the column names you can see in the tables below. Be \
             careful to not query for columns that do not exist. Also, pay attention to which \
             column is in which table.\n\
             Pay attention to use {today} to get the current date, if the question involves \
             \"today\".\n\
             Return only the SQL statement, with no explanation.\n\n\
             Only use the following tables:\n{tables}\n\n\
             Question: {question}\nSQLQuery: ",
            dialect = dialect,
            top_k = self.top_k,
            quote_example = quote_example,
            today = dialect.today(),
            tables = schema.render(),
            question = question,
        )
    }

    /// Translate `question` into a cleaned statement.
    pub async fn translate(&self, question: &str, schema: &SchemaSummary) -> ChatSqlResult<String> {
        let prompt = self.build_prompt(question, schema);
        let raw = self.provider.complete(&prompt).await?;
        Ok(clean_statement(&raw))
    }
}

/// Strip surrounding whitespace and every Markdown code fence marker.
pub fn clean_statement(raw: &str) -> String {
    raw.trim()
        .replace("```sql", "")
        .replace("```", "")
        .trim()
        .to_string()
}
