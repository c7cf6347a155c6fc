pub mod commands;
pub mod logging;
pub mod render;
pub mod repl;
pub mod terminal;

pub use repl::readline;
