use async_trait::async_trait;
use serde::{Serialize, Deserialize};
use crate::compiler::CompiledTree;
use crate::error::ExecutionError;
use std::fmt::Debug;

pub mod builtin;
pub mod http;

/// What an executor receives: a fixed system instruction and the compiled document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionRequest {
    pub system_instruction: String,
    pub document: String,
}

impl ExecutionRequest {
    pub fn new(system_instruction: impl Into<String>, document: impl Into<String>) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            document: document.into(),
        }
    }

    pub fn from_compiled(compiled: &CompiledTree, system_instruction: impl Into<String>) -> Self {
        Self::new(system_instruction, compiled.document.clone())
    }
}

/// Backend that turns a compiled document into a text response.
/// The response is opaque to the rest of the crate.
#[async_trait]
pub trait Executor: Send + Sync + Debug {
    fn name(&self) -> &str;
    async fn execute(&self, request: ExecutionRequest) -> Result<String, ExecutionError>;
}
