pub mod ast;
pub mod callgraph;
pub mod calltree;
pub mod locator;
pub mod store;
