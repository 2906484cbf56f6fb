mod config;

use std::{
    env::args,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{bail, Context};
use config::{Config, OutputKind};
use spg::{Generator, GrammarFormat, MatchTree};

#[derive(Clone, Copy, PartialEq, Eq)]
enum ExportKind {
    Machine,
    Human,
}

struct StdoutSink;

impl std::fmt::Write for StdoutSink {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        use std::io::Write as _;
        std::io::stdout()
            .write_all(s.as_bytes())
            .map_err(|_| std::fmt::Error)
    }
}

const USAGE: &str = "\
usage: spg <grammar> [options]

  --text <input>         match the given text
  --input <file>         match the contents of a file
  --rule <name>          start matching at a rule instead of the root
  --format <format>      auto, machine, human or dsl
  --raw                  print every match attempt, failed ones included
  --json                 print the match tree as json
  --export <format>      print the grammar in the machine or human format
  --graph                print the compiled pattern graph
  --max-depth <n>        abort matching past this nesting depth
  --config <file>        read defaults from a json file";

fn main() {
    if let Err(e) = init_logging() {
        eprintln!("{e:#}");
    }

    if let Err(e) = run() {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}

fn init_logging() -> anyhow::Result<()> {
    let level = std::env::var("RUST_LOG").unwrap_or_else(|_| "WARN".to_owned());
    let level = log::LevelFilter::from_str(&level)
        .with_context(|| format!("Invalid RUST_LOG level `{level}`"))?;

    simplelog::TermLogger::init(
        level,
        simplelog::ConfigBuilder::new()
            .set_time_format_custom(&[])
            .build(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Never,
    )
    .context("Failed to install the logger")
}

fn value<'a>(iter: &mut impl Iterator<Item = &'a str>, flag: &str) -> anyhow::Result<&'a str> {
    iter.next()
        .with_context(|| format!("Expected an argument after {flag}"))
}

fn run() -> anyhow::Result<()> {
    let args = args().skip(1).collect::<Vec<_>>();

    let mut config_path = None;
    let mut format = None;
    let mut max_depth = None;
    let mut raw = false;
    let mut json = false;
    let mut export = None;
    let mut do_graph = false;
    let mut rule = None;
    let mut text = None;
    let mut input_path = None;

    let mut files = Vec::new();
    let mut iter = args.iter().map(String::as_str);

    while let Some(arg) = iter.next() {
        match arg {
            "--config" => config_path = Some(PathBuf::from(value(&mut iter, arg)?)),
            "--format" => {
                let next = value(&mut iter, arg)?;
                format = Some(GrammarFormat::from_str(next).map_err(anyhow::Error::msg)?);
            }
            "--max-depth" => {
                let next = value(&mut iter, arg)?;
                let depth = next
                    .parse::<u32>()
                    .with_context(|| format!("Expected a number after --max-depth, got `{next}`"))?;
                max_depth = Some(depth);
            }
            "--raw" => raw = true,
            "--json" => json = true,
            "--export" => {
                export = match value(&mut iter, arg)? {
                    "machine" => Some(ExportKind::Machine),
                    "human" => Some(ExportKind::Human),
                    other => bail!("Unexpected argument to --export `{other}`"),
                }
            }
            "--graph" => do_graph = true,
            "--rule" => rule = Some(value(&mut iter, arg)?),
            "--text" => text = Some(value(&mut iter, arg)?.to_owned()),
            "--input" => input_path = Some(PathBuf::from(value(&mut iter, arg)?)),
            "--help" | "-h" => {
                println!("{USAGE}");
                return Ok(());
            }
            _ if arg.starts_with("--") => bail!("Unknown option `{arg}`\n\n{USAGE}"),
            _ => files.push(arg),
        }
    }

    let path = match files.as_slice() {
        [] => bail!("No grammar file provided\n\n{USAGE}"),
        [path] => Path::new(path),
        _ => bail!("Only one grammar file may be provided"),
    };

    let mut config = match &config_path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(format) = format {
        config.format = format;
    }
    if max_depth.is_some() {
        config.max_depth = max_depth;
    }
    if raw {
        config.rule_matches_only = false;
    }
    if json {
        config.output = OutputKind::Json;
    }
    log::debug!("{config:?}");

    if let Some(input) = input_path {
        if text.is_some() {
            bail!("--text and --input are mutually exclusive");
        }
        let contents = std::fs::read_to_string(&input)
            .with_context(|| format!("Failed to read input `{}`", input.display()))?;
        text = Some(contents);
    }

    let src = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read grammar `{}`", path.display()))?;

    let mut generator = Generator::with_config(config.match_config());
    let grammar = match generator.generate_parser(&src, config.format) {
        Ok(grammar) => grammar,
        Err(e) => {
            let file = path.display().to_string();
            eprintln!("{}", e.display_with_source(&file, &src));
            bail!("Failed to compile `{file}`");
        }
    };

    match export {
        Some(ExportKind::Machine) => println!("{}", grammar.to_machine()),
        Some(ExportKind::Human) => println!("{}", grammar.to_human()),
        None => {}
    }

    if do_graph {
        grammar.display_into(&mut StdoutSink)?;
    }

    let Some(text) = text else {
        if export.is_none() && !do_graph {
            bail!("Nothing to do, pass --text, --input, --export or --graph");
        }
        return Ok(());
    };

    let tree = match rule {
        Some(rule) => generator.match_rule(rule, &text)?,
        None => generator.match_input(&text)?,
    };
    print_tree(&tree, &config)?;

    if !tree.is_match() {
        log::info!("the grammar did not match the input");
    }
    Ok(())
}

fn print_tree(tree: &MatchTree, config: &Config) -> anyhow::Result<()> {
    let pruned;
    let tree = match config.rule_matches_only {
        true => {
            pruned = tree.rule_matches_only();
            &pruned
        }
        false => tree,
    };

    match config.output {
        OutputKind::Tree => tree.display_into(&mut StdoutSink)?,
        OutputKind::Json => println!("{}", serde_json::to_string_pretty(&tree.to_json())?),
    }
    Ok(())
}
