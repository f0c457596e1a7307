use async_trait::async_trait;
use crate::actions::{ExecutionRequest, Executor};
use crate::error::ExecutionError;
use tracing::info;

/// Logs the request and answers with the document itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunExecutor;

#[async_trait]
impl Executor for DryRunExecutor {
    fn name(&self) -> &str {
        "dry-run"
    }

    async fn execute(&self, request: ExecutionRequest) -> Result<String, ExecutionError> {
        info!(
            system_chars = request.system_instruction.len(),
            document_chars = request.document.len(),
            "[DRY RUN] {}",
            request.system_instruction
        );
        Ok(request.document)
    }
}
