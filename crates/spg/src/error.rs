use std::{borrow::Cow, cell::RefCell, fmt::Display};

use thiserror::Error;

use crate::{
    pattern::RcString,
    span::{Span, Spanned},
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[error("{0}")]
    Syntax(Cow<'static, str>),

    #[error("unknown node type `{0}`")]
    UnknownNodeType(String),

    #[error("empty rule list")]
    EmptyRuleList,

    #[error("unresolved reference to `{0}`")]
    UnresolvedReference(RcString),

    #[error("duplicate name `{0}`")]
    DuplicateName(RcString),

    #[error("`{0}` is not a valid rule name")]
    InvalidName(String),

    #[error("left recursion through `{0}`")]
    LeftRecursion(RcString),
}

/// Everything that went wrong while compiling a grammar. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    errors: Vec<Spanned<ErrorKind>>,
}

impl CompileError {
    pub fn new(span: Span, kind: ErrorKind) -> CompileError {
        Self {
            errors: vec![Spanned::new(kind, span)],
        }
    }
    pub fn syntax(span: Span, message: impl Into<Cow<'static, str>>) -> CompileError {
        Self::new(span, ErrorKind::Syntax(message.into()))
    }
    pub fn errors(&self) -> &[Spanned<ErrorKind>] {
        &self.errors
    }
    pub fn first(&self) -> &Spanned<ErrorKind> {
        &self.errors[0]
    }
    pub fn contains(&self, predicate: impl Fn(&ErrorKind) -> bool) -> bool {
        self.errors.iter().any(|e| predicate(&e.inner))
    }
    /// Renders every diagnostic as `path:line:column message`.
    pub fn display_with_source<'a>(&'a self, path: &'a str, src: &'a str) -> SourceErrors<'a> {
        SourceErrors {
            error: self,
            path,
            src,
        }
    }
}

impl Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}: {}", e.span, e.inner)?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileError {}

pub struct SourceErrors<'a> {
    error: &'a CompileError,
    path: &'a str,
    src: &'a str,
}

impl Display for SourceErrors<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, e) in self.error.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            let (line, column) = e.span.line_col(self.src);
            write!(f, "{}:{line}:{column} {}", self.path, e.inner)?;
        }
        Ok(())
    }
}

/// Collects diagnostics from passes which keep going after the first problem.
#[derive(Default)]
pub struct ErrorAccumulator {
    errors: RefCell<Vec<Spanned<ErrorKind>>>,
}

impl ErrorAccumulator {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn error(&self, span: Span, kind: ErrorKind) {
        self.errors.borrow_mut().push(Spanned::new(kind, span));
    }
    pub fn is_empty(&self) -> bool {
        self.errors.borrow().is_empty()
    }
    pub fn finish(self) -> Result<(), CompileError> {
        let errors = self.errors.into_inner();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(CompileError { errors })
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("no grammar has been compiled")]
    NoGrammar,

    #[error("unknown rule `{0}`")]
    UnknownRule(String),

    #[error("recursion depth limit of {limit} exceeded at input offset {offset}")]
    DepthLimit { limit: u32, offset: usize },
}
