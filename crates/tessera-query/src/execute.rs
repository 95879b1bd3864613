//! Compile-then-execute plumbing.
//!
//! The translator never talks to a database itself. A [`StatementExecutor`]
//! takes a [`CompiledStatement`] and streams back records; the
//! [`QueryPipeline`] pairs one with a [`QueryCompiler`].

use crate::error::{ExecuteError, PipelineError};
use crate::ir::{EdgeRequest, Query};
use crate::render::{CompiledStatement, QueryCompiler};
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, instrument};

/// One result row, keyed by field name.
pub type Record = Map<String, Value>;

pub type RecordStream = BoxStream<'static, Result<Record, ExecuteError>>;

/// Runs compiled statements against a backing store.
#[async_trait]
pub trait StatementExecutor: Send + Sync {
    async fn execute(&self, statement: &CompiledStatement) -> Result<RecordStream, ExecuteError>;
}

#[async_trait]
impl<E: StatementExecutor + ?Sized> StatementExecutor for Arc<E> {
    async fn execute(&self, statement: &CompiledStatement) -> Result<RecordStream, ExecuteError> {
        (**self).execute(statement).await
    }
}

pub struct QueryPipeline<E> {
    compiler: Arc<dyn QueryCompiler>,
    executor: E,
}

impl<E: StatementExecutor> QueryPipeline<E> {
    pub fn new(compiler: Arc<dyn QueryCompiler>, executor: E) -> Self {
        Self { compiler, executor }
    }

    pub fn compiler(&self) -> &dyn QueryCompiler {
        self.compiler.as_ref()
    }

    /// Fetch all matching records.
    #[instrument(skip(self, query), fields(entity = %query.entity))]
    pub async fn find(&self, query: &Query) -> Result<Vec<Record>, PipelineError> {
        let statement = self.compiler.select(query)?;
        let records = self.collect(&statement).await?;
        debug!(rows = records.len(), "Fetched records");
        Ok(records)
    }

    /// Count matching records; the statement must yield one numeric cell.
    #[instrument(skip(self, query), fields(entity = %query.entity))]
    pub async fn count(&self, query: &Query) -> Result<u64, PipelineError> {
        let statement = self.compiler.count(query)?;
        let mut stream = self.executor.execute(&statement).await?;
        let record = stream
            .next()
            .await
            .transpose()?
            .ok_or_else(|| ExecuteError::UnexpectedShape("count returned no rows".to_string()))?;

        let count = record
            .values()
            .next()
            .and_then(Value::as_u64)
            .ok_or_else(|| {
                ExecuteError::UnexpectedShape(format!("count row is not a single number: {:?}", record))
            })?;
        Ok(count)
    }

    /// Delete (or clear fields on) matching records; returns rows reported.
    #[instrument(skip(self, query), fields(entity = %query.entity))]
    pub async fn delete(&self, query: &Query) -> Result<usize, PipelineError> {
        let statement = self.compiler.delete(query)?;
        Ok(self.collect(&statement).await?.len())
    }

    /// Create (or merge) a relationship and return what the store echoes.
    #[instrument(skip(self, request), fields(label = %request.label))]
    pub async fn relate(&self, request: &EdgeRequest) -> Result<Vec<Record>, PipelineError> {
        let statement = self.compiler.edge(request)?;
        Ok(self.collect(&statement).await?)
    }

    async fn collect(&self, statement: &CompiledStatement) -> Result<Vec<Record>, ExecuteError> {
        self.executor.execute(statement).await?.try_collect().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Predicate;
    use crate::render::SqlDialect;
    use futures::stream;
    use serde_json::json;

    struct FixedRows(Vec<Value>);

    #[async_trait]
    impl StatementExecutor for FixedRows {
        async fn execute(&self, _statement: &CompiledStatement) -> Result<RecordStream, ExecuteError> {
            let rows: Vec<Result<Record, ExecuteError>> = self
                .0
                .iter()
                .map(|row| match row {
                    Value::Object(map) => Ok(map.clone()),
                    other => Err(ExecuteError::UnexpectedShape(other.to_string())),
                })
                .collect();
            Ok(stream::iter(rows).boxed())
        }
    }

    fn pipeline(rows: Vec<Value>) -> QueryPipeline<FixedRows> {
        QueryPipeline::new(Arc::new(SqlDialect::default()), FixedRows(rows))
    }

    #[tokio::test]
    async fn test_count_reads_first_cell() {
        let count = pipeline(vec![json!({ "count": 3 })])
            .count(&Query::new("Person"))
            .await
            .unwrap();
        assert_eq!(count, 3);
    }

    #[tokio::test]
    async fn test_count_without_rows() {
        let result = pipeline(vec![]).count(&Query::new("Person")).await;
        assert!(matches!(
            result,
            Err(PipelineError::Execute(ExecuteError::UnexpectedShape(_)))
        ));
    }

    #[tokio::test]
    async fn test_render_error_skips_execution() {
        let query = Query::new("Person").filter(Predicate::between("age", 1i32, 2i32));
        let result = pipeline(vec![]).find(&query).await;
        assert!(matches!(result, Err(PipelineError::Render(_))));
    }

    #[tokio::test]
    async fn test_stream_error_propagates() {
        let result = pipeline(vec![json!(1)]).find(&Query::new("Person")).await;
        assert!(matches!(result, Err(PipelineError::Execute(_))));
    }
}
