// loadchain-core/src/domain/graph/mod.rs

pub mod compiler;
pub mod dag;
pub mod unit;

pub use compiler::GraphCompiler;
pub use dag::{DependencyChain, DependencyGraph};
pub use unit::{Stage, UnitBuilder, UnitId, UnitInputs, UnitOfWork};
