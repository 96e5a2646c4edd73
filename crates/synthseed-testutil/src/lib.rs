use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use serde_json::{json, Value};

use synthseed_core::error::{Result, SynthSeedError};
use synthseed_core::schema::introspect::SchemaSource;
use synthseed_core::schema::types::{SchemaColumn, SchemaTable};
use synthseed_core::{SqlExecutor, TextGenerator};

/// Blog schema: users ← posts ← comments, comments also → users.
pub fn blog_schema() -> Vec<SchemaTable> {
    vec![
        SchemaTable::new("comments")
            .with_column(SchemaColumn::new("id", "uuid").primary_key())
            .with_column(SchemaColumn::new("post_id", "uuid").references("posts", "id").not_null())
            .with_column(SchemaColumn::new("author_id", "uuid").references("users", "id").not_null())
            .with_column(SchemaColumn::new("body", "text").not_null())
            .with_column(SchemaColumn::new("created_at", "timestamp with time zone")),
        SchemaTable::new("posts")
            .with_column(SchemaColumn::new("id", "uuid").primary_key())
            .with_column(SchemaColumn::new("author_id", "uuid").references("users", "id").not_null())
            .with_column(SchemaColumn::new("title", "character varying").not_null())
            .with_column(SchemaColumn::new("status", "character varying"))
            .with_column(SchemaColumn::new("published_at", "timestamp without time zone")),
        SchemaTable::new("users")
            .with_column(SchemaColumn::new("id", "uuid").primary_key())
            .with_column(SchemaColumn::new("email", "character varying").not_null())
            .with_column(SchemaColumn::new("bio", "text"))
            .with_column(SchemaColumn::new("created_at", "timestamp with time zone")),
    ]
}

fn pick(values: &[Value], i: usize) -> Value {
    if values.is_empty() {
        Value::Null
    } else {
        values[i % values.len()].clone()
    }
}

/// Plays the model for [`blog_schema`]: well-formed rows that use the
/// offered foreign-key values, with a few typical defects mixed in.
pub fn blog_rows(prompt: &str) -> Result<String> {
    static EMAIL_SEQ: AtomicUsize = AtomicUsize::new(0);

    let count = prompt_count(prompt);
    let rows: Vec<Value> = match prompt_table(prompt) {
        Some("users") => (0..count)
            .map(|_| {
                json!({
                    "id": "uuid",
                    "email": format!("user{}@example.com", EMAIL_SEQ.fetch_add(1, Ordering::Relaxed)),
                    "bio": "It's a bio",
                    "created_at": "2024-01-02 03:04:05",
                    "favorite_color": "teal",
                })
            })
            .collect(),
        Some("posts") => {
            let authors = prompt_fk_values(prompt, "author_id");
            (0..count)
                .map(|i| {
                    json!({
                        "id": "uuid",
                        "author_id": pick(&authors, i),
                        "title": format!("Post {}", i),
                        "status": "published",
                        "published_at": "yesterday-ish",
                    })
                })
                .collect()
        }
        Some("comments") => {
            let posts = prompt_fk_values(prompt, "post_id");
            let authors = prompt_fk_values(prompt, "author_id");
            (0..count)
                .map(|i| {
                    json!({
                        "id": "uuid",
                        "post_id": pick(&posts, i),
                        "author_id": pick(&authors, i),
                        "body": "Nice post!",
                        "created_at": "2024-05-06T07:08:09Z",
                    })
                })
                .collect()
        }
        other => {
            return Err(SynthSeedError::LlmError {
                message: format!("unexpected table {:?}", other),
            })
        }
    };
    Ok(format!("```json\n{}\n```", Value::Array(rows)))
}

/// Two tables that reference each other.
pub fn cyclic_schema() -> Vec<SchemaTable> {
    vec![
        SchemaTable::new("a")
            .with_column(SchemaColumn::new("id", "integer").primary_key())
            .with_column(SchemaColumn::new("b_id", "integer").references("b", "id")),
        SchemaTable::new("b")
            .with_column(SchemaColumn::new("id", "integer").primary_key())
            .with_column(SchemaColumn::new("a_id", "integer").references("a", "id")),
    ]
}

/// A `SchemaSource` serving a fixed schema, or failing on demand.
pub struct FixtureSource {
    tables: Vec<SchemaTable>,
    fail: bool,
}

impl FixtureSource {
    pub fn new(tables: Vec<SchemaTable>) -> Self {
        Self { tables, fail: false }
    }

    pub fn failing() -> Self {
        Self {
            tables: Vec::new(),
            fail: true,
        }
    }
}

impl SchemaSource for FixtureSource {
    async fn fetch_schema(&self) -> Result<Vec<SchemaTable>> {
        if self.fail {
            return Err(SynthSeedError::Other(
                "schema fetch failed: connection refused".to_string(),
            ));
        }
        Ok(self.tables.clone())
    }
}

type Responder = Box<dyn Fn(&str) -> Result<String> + Send + Sync>;

/// A `TextGenerator` that answers from a script or a function and records
/// every prompt it receives.
pub struct MockGenerator {
    script: Mutex<VecDeque<Result<String>>>,
    responder: Option<Responder>,
    prompts: Mutex<Vec<String>>,
}

impl MockGenerator {
    /// Replies in order; once the script runs out, every reply is invalid.
    pub fn scripted(responses: Vec<Result<String>>) -> Self {
        Self {
            script: Mutex::new(responses.into()),
            responder: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Replies by calling `f` with the prompt.
    pub fn from_fn(f: impl Fn(&str) -> Result<String> + Send + Sync + 'static) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            responder: Some(Box::new(f)),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// Prompts sent for one table.
    pub fn prompts_for(&self, table: &str) -> Vec<String> {
        self.prompts()
            .into_iter()
            .filter(|p| prompt_table(p) == Some(table))
            .collect()
    }
}

impl TextGenerator for MockGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(f) = &self.responder {
            return f(prompt);
        }
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("I'm sorry, I can't help with that.".to_string()))
    }
}

/// Table name a row-generation prompt asks for.
pub fn prompt_table(prompt: &str) -> Option<&str> {
    let start = prompt.find("for the table `")? + "for the table `".len();
    let len = prompt[start..].find('`')?;
    Some(&prompt[start..start + len])
}

/// Row count a row-generation prompt asks for.
pub fn prompt_count(prompt: &str) -> usize {
    prompt
        .split("Generate exactly ")
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

/// Values offered for a foreign-key column in a prompt's context block.
pub fn prompt_fk_values(prompt: &str, column: &str) -> Vec<serde_json::Value> {
    let Some(start) = prompt.find("Foreign key values") else {
        return Vec::new();
    };
    let Some(open) = prompt[start..].find('\n').map(|i| start + i + 1) else {
        return Vec::new();
    };
    let Some(end) = prompt[open..].find("\n\nRules:").map(|i| open + i) else {
        return Vec::new();
    };
    serde_json::from_str::<serde_json::Value>(&prompt[open..end])
        .ok()
        .and_then(|ctx| ctx[column]["values"].as_array().cloned())
        .unwrap_or_default()
}

/// A `SqlExecutor` that records statements and fails on request.
pub struct RecordingExecutor {
    statements: Mutex<Vec<String>>,
    fail_inserts_into: Vec<String>,
    fail_rollback: bool,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self {
            statements: Mutex::new(Vec::new()),
            fail_inserts_into: Vec::new(),
            fail_rollback: false,
        }
    }

    /// Fail the insert statement for `table`.
    pub fn failing_insert(mut self, table: &str) -> Self {
        self.fail_inserts_into.push(table.to_string());
        self
    }

    pub fn failing_rollback(mut self) -> Self {
        self.fail_rollback = true;
        self
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }

    /// Insert statements only, in execution order.
    pub fn inserts(&self) -> Vec<String> {
        self.statements()
            .into_iter()
            .filter(|s| s.starts_with("INSERT"))
            .collect()
    }
}

impl Default for RecordingExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlExecutor for RecordingExecutor {
    async fn execute(&self, sql: &str) -> Result<u64> {
        self.statements.lock().unwrap().push(sql.to_string());

        let failing_insert = self
            .fail_inserts_into
            .iter()
            .any(|t| sql.starts_with(&format!("INSERT INTO \"{}\"", t)));
        if failing_insert || (self.fail_rollback && sql == "ROLLBACK;") {
            return Err(SynthSeedError::Sql {
                statement: sql.chars().take(40).collect(),
                message: "simulated failure".to_string(),
            });
        }
        Ok(1)
    }
}
