//! A parser generator driven by grammars written in one of three interchangeable encodings.
//!
//! Grammar text is compiled into an arena of pattern nodes, every by-name reference is bound at
//! compile time and matching an input produces a trace of every attempted match, which can be
//! pruned down to the successful rule matches.

mod check;
pub mod config;
pub mod error;
pub mod format;
pub mod generator;
pub mod grammar;
mod lexer;
pub mod matcher;
pub mod pattern;
mod resolve;
pub mod span;
pub mod strings;
pub mod trace;

pub use config::MatchConfig;
pub use error::{CompileError, ErrorKind, ParseError};
pub use generator::{compile, Generator, GrammarFormat, ParseOutput};
pub use grammar::Grammar;
pub use trace::{MatchTree, Retain};
