//! # Generate/Validate State Machine
//!
//! One run of the machine produces one batch of rows for one table:
//!
//! ```text
//! Generate ──► Validate ──► End            (valid, or retries exhausted)
//!    ▲            │
//!    └────────────┘                        (invalid, retries left)
//! ```
//!
//! `Generate` and `Validate` each bump `retry_count` on failure, so a failed
//! call followed by the empty-output validation counts twice. The bound is
//! only checked after `Validate`.

use crate::error::SynthSeedError;
use crate::generate::dataset::Row;
use crate::generate::foreign_key::ForeignKeyContext;
use crate::generate::hints::column_hints;
use crate::generate::repair::repair_rows;
use crate::llm::client::TextGenerator;
use crate::llm::parse::parse_json_array;
use crate::llm::prompt::row_generation_prompt;
use crate::schema::analyze::TableModel;

/// Default bound on failed steps per batch.
pub const MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Generate,
    Validate,
    End,
}

/// Everything one batch run carries between steps.
#[derive(Debug, Clone)]
pub struct GenerationBatchState {
    pub table: String,
    pub count: usize,
    pub context: ForeignKeyContext,
    pub retry_count: u32,
    pub raw_output: Option<String>,
    pub final_data: Vec<Row>,
    pub is_valid: bool,
    pub error: Option<String>,
}

impl GenerationBatchState {
    pub fn new(table: impl Into<String>, count: usize, context: ForeignKeyContext) -> Self {
        Self {
            table: table.into(),
            count,
            context,
            retry_count: 0,
            raw_output: None,
            final_data: Vec::new(),
            is_valid: false,
            error: None,
        }
    }

    fn record_failure(&mut self, error: &SynthSeedError) {
        self.retry_count += 1;
        self.error = Some(error.to_string());
    }
}

/// Where the machine goes after `current` has run against `state`.
pub fn next_phase(current: Phase, state: &GenerationBatchState, max_retries: u32) -> Phase {
    match current {
        Phase::Generate => Phase::Validate,
        Phase::Validate if state.is_valid => Phase::End,
        Phase::Validate if state.retry_count >= max_retries => Phase::End,
        Phase::Validate => Phase::Generate,
        Phase::End => Phase::End,
    }
}

async fn generate_step<G: TextGenerator>(
    state: &mut GenerationBatchState,
    table: &TableModel,
    generator: &G,
) {
    let hints = column_hints(&table.columns);
    let prompt = row_generation_prompt(table, &hints, &state.context, state.count);

    match generator.generate(&prompt).await {
        Ok(raw) => {
            state.raw_output = Some(raw);
        }
        Err(e) => {
            let err = SynthSeedError::Generation {
                table: state.table.clone(),
                message: e.to_string(),
            };
            tracing::debug!(table = %state.table, retry = state.retry_count + 1, "Generate failed: {}", e);
            state.raw_output = None;
            state.record_failure(&err);
        }
    }
}

fn validate_step(state: &mut GenerationBatchState, table: &TableModel) {
    let result = match state.raw_output.take() {
        Some(raw) => parse_json_array(&state.table, &raw)
            .and_then(|items| repair_rows(&state.table, &table.columns, items)),
        None => Err(SynthSeedError::Validation {
            table: state.table.clone(),
            message: "no output to validate".to_string(),
        }),
    };

    match result {
        Ok(rows) => {
            state.final_data = rows;
            state.is_valid = true;
            state.error = None;
        }
        Err(e) => {
            tracing::debug!(table = %state.table, retry = state.retry_count + 1, "Validate failed: {}", e);
            state.final_data.clear();
            state.is_valid = false;
            state.record_failure(&e);
        }
    }
}

/// Run the machine to completion and return the final state.
///
/// Exhaustion is not an error: the state ends with `is_valid = false` and
/// no rows.
pub async fn run_batch<G: TextGenerator>(
    table: &TableModel,
    generator: &G,
    count: usize,
    context: ForeignKeyContext,
    max_retries: u32,
) -> GenerationBatchState {
    let mut state = GenerationBatchState::new(&table.name, count, context);
    let mut phase = Phase::Generate;

    while phase != Phase::End {
        match phase {
            Phase::Generate => generate_step(&mut state, table, generator).await,
            Phase::Validate => validate_step(&mut state, table),
            Phase::End => {}
        }
        let next = next_phase(phase, &state, max_retries);
        tracing::debug!(table = %state.table, ?phase, ?next, retry_count = state.retry_count, "Batch transition");
        phase = next;
    }

    if !state.is_valid {
        tracing::warn!(
            table = %state.table,
            retries = state.retry_count,
            "Batch exhausted retries: {}",
            state.error.as_deref().unwrap_or("unknown error"),
        );
    }

    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::schema::analyze::analyze_schema;
    use crate::schema::types::{SchemaColumn, SchemaTable};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct Scripted {
        responses: Mutex<VecDeque<Result<String>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(responses: Vec<Result<String>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    impl TextGenerator for Scripted {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok("not json".to_string()))
        }
    }

    fn users_table() -> TableModel {
        let schema = vec![SchemaTable::new("users")
            .with_column(SchemaColumn::new("id", "uuid").primary_key())
            .with_column(SchemaColumn::new("email", "text"))];
        analyze_schema(&schema).tables["users"].clone()
    }

    fn state_with(retry_count: u32, is_valid: bool) -> GenerationBatchState {
        let mut s = GenerationBatchState::new("users", 1, ForeignKeyContext::NoForeignKeys);
        s.retry_count = retry_count;
        s.is_valid = is_valid;
        s
    }

    #[test]
    fn test_transitions() {
        assert_eq!(next_phase(Phase::Generate, &state_with(5, false), 3), Phase::Validate);
        assert_eq!(next_phase(Phase::Validate, &state_with(0, true), 3), Phase::End);
        assert_eq!(next_phase(Phase::Validate, &state_with(2, false), 3), Phase::Generate);
        assert_eq!(next_phase(Phase::Validate, &state_with(3, false), 3), Phase::End);
        assert_eq!(next_phase(Phase::End, &state_with(0, false), 3), Phase::End);
    }

    #[tokio::test]
    async fn test_valid_first_try() {
        let gen = Scripted::new(vec![Ok(r#"[{"id": "uuid", "email": "a@b.com"}]"#.to_string())]);
        let state = run_batch(&users_table(), &gen, 1, ForeignKeyContext::NoForeignKeys, MAX_RETRIES).await;

        assert!(state.is_valid);
        assert_eq!(state.retry_count, 0);
        assert_eq!(state.final_data.len(), 1);
        assert_eq!(gen.calls(), 1);
    }

    #[tokio::test]
    async fn test_invalid_then_valid() {
        let gen = Scripted::new(vec![
            Ok("I cannot do that".to_string()),
            Ok(r#"[{"id": "uuid", "email": "a@b.com"}]"#.to_string()),
        ]);
        let state = run_batch(&users_table(), &gen, 1, ForeignKeyContext::NoForeignKeys, MAX_RETRIES).await;

        assert!(state.is_valid);
        assert_eq!(state.retry_count, 1);
        assert_eq!(state.final_data.len(), 1);
        assert_eq!(gen.calls(), 2);
    }

    #[tokio::test]
    async fn test_always_invalid_stops_after_bound() {
        let gen = Scripted::new(vec![]);
        let state = run_batch(&users_table(), &gen, 5, ForeignKeyContext::NoForeignKeys, MAX_RETRIES).await;

        assert!(!state.is_valid);
        assert!(state.final_data.is_empty());
        assert_eq!(state.retry_count, 3);
        assert_eq!(gen.calls(), 3);
        assert!(state.error.is_some());
    }

    #[tokio::test]
    async fn test_generator_error_counts_twice() {
        let gen = Scripted::new(vec![
            Err(SynthSeedError::LlmError {
                message: "503".to_string(),
            }),
            Err(SynthSeedError::LlmError {
                message: "503".to_string(),
            }),
        ]);
        let state = run_batch(&users_table(), &gen, 1, ForeignKeyContext::NoForeignKeys, MAX_RETRIES).await;

        // Generate + Validate both fail on the first pass (2), the second
        // pass pushes it to 4 and the bound stops it.
        assert!(!state.is_valid);
        assert_eq!(state.retry_count, 4);
        assert_eq!(gen.calls(), 2);
    }

    #[tokio::test]
    async fn test_non_array_output_is_invalid() {
        let gen = Scripted::new(vec![
            Ok(r#"{"id": "uuid"}"#.to_string()),
            Ok(r#"[{"email": "x@y.com"}]"#.to_string()),
        ]);
        let state = run_batch(&users_table(), &gen, 1, ForeignKeyContext::NoForeignKeys, MAX_RETRIES).await;

        assert!(state.is_valid);
        assert_eq!(state.retry_count, 1);
        assert_eq!(state.final_data[0]["email"], "x@y.com");
    }

    #[tokio::test]
    async fn test_retry_reuses_batch_context() {
        use crate::generate::foreign_key::ForeignKeySample;

        let schema = vec![
            SchemaTable::new("users").with_column(SchemaColumn::new("id", "integer").primary_key()),
            SchemaTable::new("posts")
                .with_column(SchemaColumn::new("id", "uuid").primary_key())
                .with_column(SchemaColumn::new("author_id", "integer").references("users", "id")),
        ];
        let posts = analyze_schema(&schema).tables["posts"].clone();
        let context = ForeignKeyContext::Sampled(vec![ForeignKeySample {
            column: "author_id".to_string(),
            references_table: "users".to_string(),
            references_column: "id".to_string(),
            values: vec![serde_json::json!(4), serde_json::json!(9)],
        }]);
        let gen = Scripted::new(vec![
            Ok("Here you go!".to_string()),
            Ok(r#"[{"id": "uuid", "author_id": 9}]"#.to_string()),
        ]);

        let state = run_batch(&posts, &gen, 1, context, MAX_RETRIES).await;

        assert!(state.is_valid);
        let prompts = gen.prompts.lock().unwrap().clone();
        assert_eq!(prompts.len(), 2);
        assert_eq!(prompts[0], prompts[1]);
        assert!(prompts[0].contains("\"author_id\""));
        assert!(prompts[0].contains("users.id"));
    }
}
