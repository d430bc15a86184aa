use anyhow::Result;
use async_trait::async_trait;
use std::sync::Mutex;

/// The query execution capability the loader submits statements to.
///
/// Implementations own admission and backpressure; the loader submits every
/// statement of a parse at once and waits for all of them to settle.
#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    async fn exec(&self, statement: &str) -> Result<()>;
}

/// Engine that records statements without executing them
#[derive(Debug, Default)]
pub struct DryRunEngine {
    statements: Mutex<Vec<String>>,
}

impl DryRunEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statements received so far, in submission order
    pub fn statements(&self) -> Vec<String> {
        self.statements
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl ExecutionEngine for DryRunEngine {
    async fn exec(&self, statement: &str) -> Result<()> {
        tracing::info!(statement, "dry run");
        self.statements
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(statement.to_string());
        Ok(())
    }
}
