//! End-to-end: config → compiler → executor.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tessera_config::TranslatorConfig;
use tessera_query::{
    compiler_from_config, CompiledStatement, EdgeEndpoint, EdgeRequest, ExecuteError, ParamValue,
    Predicate, Query, QueryPipeline, Record, RecordStream, SortKey, StatementExecutor,
};

/// Records every statement it receives and answers with canned rows.
#[derive(Default)]
struct RecordingExecutor {
    seen: Mutex<Vec<CompiledStatement>>,
    rows: Vec<Value>,
}

impl RecordingExecutor {
    fn with_rows(rows: Vec<Value>) -> Self {
        Self {
            seen: Mutex::default(),
            rows,
        }
    }

    fn statements(&self) -> Vec<CompiledStatement> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl StatementExecutor for RecordingExecutor {
    async fn execute(&self, statement: &CompiledStatement) -> Result<RecordStream, ExecuteError> {
        self.seen.lock().unwrap().push(statement.clone());
        let rows: Vec<Result<Record, ExecuteError>> = self
            .rows
            .iter()
            .filter_map(|row| row.as_object().cloned())
            .map(Ok)
            .collect();
        Ok(stream::iter(rows).boxed())
    }
}

const CONFIG: &str = r#"
[dialects.orient]
kind = "sql"

[dialects.graph]
kind = "cypher"
record_alias = "p"

[dialects.arango]
kind = "aql"
logical_id_param = "key"
"#;

fn pipeline(name: &str, executor: Arc<RecordingExecutor>) -> QueryPipeline<Arc<RecordingExecutor>> {
    let config = TranslatorConfig::from_toml_str(CONFIG).unwrap();
    let compiler = compiler_from_config(config.dialect(name).unwrap()).unwrap();
    QueryPipeline::new(Arc::from(compiler), executor)
}

#[tokio::test]
async fn find_sends_compiled_select() {
    let executor = Arc::new(RecordingExecutor::with_rows(vec![
        json!({ "name": "Ada", "age": 36 }),
        json!({ "name": "Alan", "age": 41 }),
    ]));
    let pipeline = pipeline("orient", executor.clone());

    let query = Query::new("Person")
        .filter(Predicate::like("name", "A%"))
        .sort_by(SortKey::asc("name"))
        .limit(10);
    let rows = pipeline.find(&query).await.unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["name"], json!("Ada"));

    let sent = executor.statements();
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].text,
        "SELECT * FROM Person WHERE name LIKE ? ORDER BY name ASC LIMIT 10"
    );
    assert_eq!(sent[0].parameters.values(), vec![&ParamValue::from("A%")]);
}

#[tokio::test]
async fn count_through_cypher_config() {
    let executor = Arc::new(RecordingExecutor::with_rows(vec![json!({ "count(p)": 7 })]));
    let pipeline = pipeline("graph", executor.clone());

    let count = pipeline
        .count(&Query::new("Person").filter(Predicate::gt("age", 30i32)))
        .await
        .unwrap();

    assert_eq!(count, 7);
    assert_eq!(
        executor.statements()[0].text,
        "MATCH (p:Person) WHERE p.age > $filter_0 RETURN count(p)"
    );
}

#[tokio::test]
async fn configured_logical_id_name_is_used() {
    let executor = Arc::new(RecordingExecutor::default());
    let pipeline = pipeline("arango", executor.clone());

    pipeline
        .delete(&Query::new("Person").filter(Predicate::eq("id", "ada")))
        .await
        .unwrap();

    let sent = &executor.statements()[0];
    assert_eq!(sent.text, "FOR d IN Person FILTER d._key == @key REMOVE d IN Person");
    assert_eq!(sent.parameters.get("key"), Some(&ParamValue::from("ada")));
}

#[tokio::test]
async fn relate_returns_created_edge() {
    let executor = Arc::new(RecordingExecutor::with_rows(vec![json!({ "_id": "knows/1" })]));
    let pipeline = pipeline("arango", executor.clone());

    let request = EdgeRequest::new(
        EdgeEndpoint::in_entity("Person", "ada"),
        "knows",
        EdgeEndpoint::in_entity("Person", "alan"),
    );
    let created = pipeline.relate(&request).await.unwrap();

    assert_eq!(created.len(), 1);
    assert!(executor.statements()[0].text.starts_with("INSERT {"));
}

#[tokio::test]
async fn render_failure_never_reaches_executor() {
    let executor = Arc::new(RecordingExecutor::default());
    let pipeline = pipeline("orient", executor.clone());

    let result = pipeline
        .find(&Query::new("Person").filter(Predicate::all(vec![])))
        .await;

    assert!(result.is_err());
    assert!(executor.statements().is_empty());
}
