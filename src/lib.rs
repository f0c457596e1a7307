//! Composable prompt templates.
//!
//! A composer tree is a hierarchy of nodes whose content holds `{{name}}`
//! placeholders. A placeholder resolves to a literal string or to another
//! node, which is compiled recursively. Trees are edited through pure
//! mutators, compiled into one document, persisted through a repository, and
//! optionally handed to an execution backend.

pub mod actions;
pub mod compiler;
pub mod config;
pub mod dsl;
pub mod error;
pub mod runtime;
