use std::{fmt::Display, str::FromStr};

use serde::Deserialize;

use crate::{
    config::MatchConfig,
    error::{CompileError, ParseError},
    format::{build::build, dsl, human, machine},
    grammar::{Grammar, GrammarBuilder},
    matcher::Matcher,
    pattern::{NodeType, PatternId},
    strings::head_match_until,
    trace::MatchTree,
};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GrammarFormat {
    #[default]
    Auto,
    Machine,
    Human,
    Dsl,
}

impl GrammarFormat {
    /// Guesses the encoding from the leading text, never returns `Auto`.
    pub fn sniff(text: &str) -> GrammarFormat {
        let text = text.trim_start();
        if text.starts_with('[') {
            return GrammarFormat::Machine;
        }
        let first_line = head_match_until(text, "\n").trim_end();
        match NodeType::from_name(first_line) {
            Some(_) => GrammarFormat::Human,
            None => GrammarFormat::Dsl,
        }
    }
    pub fn resolve(self, text: &str) -> GrammarFormat {
        match self {
            GrammarFormat::Auto => Self::sniff(text),
            other => other,
        }
    }
}

impl FromStr for GrammarFormat {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(GrammarFormat::Auto),
            "machine" => Ok(GrammarFormat::Machine),
            "human" => Ok(GrammarFormat::Human),
            "dsl" => Ok(GrammarFormat::Dsl),
            _ => Err(format!(
                "unknown grammar format `{s}`, expected one of auto, machine, human, dsl"
            )),
        }
    }
}

impl Display for GrammarFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            GrammarFormat::Auto => "auto",
            GrammarFormat::Machine => "machine",
            GrammarFormat::Human => "human",
            GrammarFormat::Dsl => "dsl",
        };
        f.write_str(name)
    }
}

/// Compiles grammar text into a fully resolved pattern graph.
pub fn compile(text: &str, format: GrammarFormat) -> Result<Grammar, CompileError> {
    let format = format.resolve(text);
    log::debug!("compiling grammar as {format}");

    let mut builder = GrammarBuilder::new();
    let root = match format {
        GrammarFormat::Machine => build(&mut builder, &machine::parse(text)?)?,
        GrammarFormat::Human => build(&mut builder, &human::parse(text)?)?,
        GrammarFormat::Dsl | GrammarFormat::Auto => dsl::parse(text, &mut builder)?,
    };
    builder.finish(root)
}

/// Result of [`Generator::parse`].
#[derive(Clone, Debug)]
pub struct ParseOutput {
    /// Every match attempt, failed ones included.
    pub raw: MatchTree,
    pub rule_matches: MatchTree,
}

/// Holds the compiled grammar together with the match serial counter, one instance per grammar.
#[derive(Default)]
pub struct Generator {
    config: MatchConfig,
    match_count: u64,
    grammar: Option<Grammar>,
}

impl Generator {
    pub fn new() -> Generator {
        Self::default()
    }
    pub fn with_config(config: MatchConfig) -> Generator {
        Generator {
            config,
            ..Default::default()
        }
    }
    pub fn config(&self) -> &MatchConfig {
        &self.config
    }
    /// Serial the next match attempt will receive.
    pub fn match_count(&self) -> u64 {
        self.match_count
    }
    pub fn next_serial(&mut self) -> u64 {
        let serial = self.match_count;
        self.match_count += 1;
        serial
    }
    pub fn grammar(&self) -> Option<&Grammar> {
        self.grammar.as_ref()
    }

    /// Compiles `text` and makes it the active grammar. On failure the previous grammar stays
    /// active.
    pub fn generate_parser(
        &mut self,
        text: &str,
        format: GrammarFormat,
    ) -> Result<&Grammar, CompileError> {
        let grammar = compile(text, format)?;
        Ok(self.grammar.insert(grammar))
    }

    /// Matches `input` starting at the root of the grammar.
    pub fn match_input(&mut self, input: &str) -> Result<MatchTree, ParseError> {
        let grammar = self.grammar.as_ref().ok_or(ParseError::NoGrammar)?;
        let root = grammar.root();
        self.match_from(root, input)
    }

    pub fn match_rule(&mut self, rule: &str, input: &str) -> Result<MatchTree, ParseError> {
        let grammar = self.grammar.as_ref().ok_or(ParseError::NoGrammar)?;
        let start = grammar
            .rule(rule)
            .ok_or_else(|| ParseError::UnknownRule(rule.to_owned()))?;
        self.match_from(start, input)
    }

    fn match_from(&mut self, start: PatternId, input: &str) -> Result<MatchTree, ParseError> {
        let grammar = self.grammar.as_ref().ok_or(ParseError::NoGrammar)?;
        Matcher::new(grammar, input, &mut self.match_count, &self.config).run(start)
    }

    pub fn parse(&mut self, input: &str) -> Result<ParseOutput, ParseError> {
        let raw = self.match_input(input)?;
        let rule_matches = raw.rule_matches_only();
        Ok(ParseOutput { raw, rule_matches })
    }
}
