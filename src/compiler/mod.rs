pub mod core;
pub mod loader;
pub mod substitution;

pub use self::core::{compile, CompiledTree, CompileWarning, Compiler, ExpandedNode};
