use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Result};
use clap::{ArgAction, Parser, Subcommand};
use ecma_assist::{
    function_signature_key, parse_entered_text, parse_source, Diagnostic, DiagnosticLevel,
    Lexer, NodeId, ParseOptions, SourceFile, SourceId, SyntaxTree, TokenKind, TypeInference,
    TypeRegistry,
};
use ecma_support::{cli_error, cli_target_error, registry_error};
use serde_json::{json, Value};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "ecma",
    version,
    about = "Type hints for ECMAScript 3 completion.",
    long_about = "Resolve the type of partially typed ECMAScript 3 fragments and build \
                  call signature keys for code completion."
)]
struct Cli {
    /// JSON file with extra type declarations to register.
    #[arg(long, value_name = "PATH", global = true)]
    types: Option<PathBuf>,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    /// Raise the log level (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the expression a completion request would resolve.
    Normalize {
        /// Source text as typed so far.
        text: String,
    },
    /// Print the type inferred for a typed fragment.
    Infer {
        /// Source text as typed so far.
        text: String,
    },
    /// Print the signature key of the call enclosing a position.
    Signature {
        /// Source file (reads stdin when omitted).
        input: Option<PathBuf>,

        /// 1-based line of the cursor.
        #[arg(long)]
        line: usize,

        /// 1-based column of the cursor.
        #[arg(long)]
        column: usize,
    },
    /// Dump the token stream produced by the lexer.
    Tokens {
        /// Source file (reads stdin when omitted).
        input: Option<PathBuf>,
    },
    /// Dump the syntax tree.
    Tree {
        /// Source file (reads stdin when omitted).
        input: Option<PathBuf>,

        /// Keep parsing past syntax errors.
        #[arg(long)]
        recover: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let registry = load_registry(cli.types.as_deref())?;
    match &cli.command {
        Command::Normalize { text } => run_normalize(&cli, text),
        Command::Infer { text } => run_infer(&cli, &registry, text),
        Command::Signature {
            input,
            line,
            column,
        } => run_signature(&cli, input.as_deref(), *line, *column),
        Command::Tokens { input } => run_tokens(&cli, input.as_deref()),
        Command::Tree { input, recover } => run_tree(&cli, input.as_deref(), *recover),
    }
}

fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn load_registry(types: Option<&Path>) -> Result<TypeRegistry> {
    let mut registry = TypeRegistry::ecma3();
    if let Some(path) = types {
        let path_display = path.display().to_string();
        let count = registry
            .load_json_file(path)
            .map_err(|err| anyhow!(registry_error("load", Some(&path_display), err)))?;
        info!(path = %path_display, count, "loaded type declarations");
    }
    debug!(types = registry.len(), "type registry ready");
    Ok(registry)
}

fn read_source(input: Option<&Path>) -> Result<SourceFile> {
    match input {
        Some(path) => {
            let contents = fs::read_to_string(path).map_err(|err| {
                anyhow!(cli_target_error("read", &path.display().to_string(), err))
            })?;
            Ok(SourceFile::new(SourceId(0), path.to_path_buf(), contents))
        }
        None => {
            let mut contents = String::new();
            io::stdin()
                .read_to_string(&mut contents)
                .map_err(|err| anyhow!(cli_error("stdin", err)))?;
            Ok(SourceFile::new(
                SourceId(0),
                PathBuf::from("<stdin>"),
                contents,
            ))
        }
    }
}

fn run_normalize(cli: &Cli, text: &str) -> Result<()> {
    let expression = parse_entered_text(text);
    if cli.json {
        print_json(&json!({ "text": text, "expression": expression }))
    } else {
        println!("{expression}");
        Ok(())
    }
}

fn run_infer(cli: &Cli, registry: &TypeRegistry, text: &str) -> Result<()> {
    let inference = TypeInference::with_registry(registry);
    let declaration = inference.infer_text(text);
    if cli.json {
        return print_json(&json!({
            "text": text,
            "expression": parse_entered_text(text),
            "type": declaration.as_ref().map(|declaration| declaration.name.as_str()),
            "summary": declaration.as_ref().and_then(|declaration| declaration.summary.as_deref()),
        }));
    }

    match declaration {
        Some(declaration) => println!("{}", declaration.name),
        None => println!("(none)"),
    }
    Ok(())
}

fn run_signature(cli: &Cli, input: Option<&Path>, line: usize, column: usize) -> Result<()> {
    let source = read_source(input)?;
    let output = parse_source(&source, ParseOptions::lenient())?;
    let tree = &output.tree;

    let Some(node) = tree.node_at(line, column) else {
        bail!("no syntax node at line {line}, column {column}");
    };
    debug!(node = %node, kind = tree.kind(node).name(), "anchored signature lookup");

    let Some(key) = function_signature_key(tree, node) else {
        bail!("no enclosing call at line {line}, column {column}");
    };

    if cli.json {
        print_json(&json!({ "line": line, "column": column, "signature": key }))
    } else {
        println!("{key}");
        Ok(())
    }
}

fn run_tokens(cli: &Cli, input: Option<&Path>) -> Result<()> {
    let source = read_source(input)?;
    let tokens = Lexer::new(&source).tokenize()?;

    if cli.json {
        let entries: Vec<Value> = tokens
            .iter()
            .filter(|token| !matches!(token.kind, TokenKind::Eof))
            .map(|token| {
                json!({
                    "kind": format!("{:?}", token.kind),
                    "lexeme": token.lexeme,
                    "line": token.line,
                    "column": token.column,
                })
            })
            .collect();
        return print_json(&Value::Array(entries));
    }

    for token in &tokens {
        println!(
            "{:>4}:{:<4} {:?} {:?}",
            token.line, token.column, token.kind, token.lexeme
        );
    }
    Ok(())
}

fn run_tree(cli: &Cli, input: Option<&Path>, recover: bool) -> Result<()> {
    let source = read_source(input)?;
    let options = ParseOptions {
        recover_from_errors: recover,
        report_diagnostics: true,
    };
    let output = parse_source(&source, options)?;

    if !output.diagnostics.is_empty() {
        let lines: Vec<&str> = source.contents.lines().collect();
        for diagnostic in output.diagnostics.entries() {
            print_diagnostic(&source, &lines, diagnostic);
        }
    }

    let tree = &output.tree;
    let Some(root) = tree.root() else {
        return Ok(());
    };

    if cli.json {
        let nodes: Vec<Value> = tree
            .descendants(root)
            .map(|id| {
                let span = tree.span(id);
                json!({
                    "id": id.index(),
                    "kind": tree.kind(id).name(),
                    "parent": tree.parent(id).map(NodeId::index),
                    "span": [span.line, span.column, span.end_line, span.end_column],
                    "name": tree.identifier_name(id),
                })
            })
            .collect();
        return print_json(&Value::Array(nodes));
    }

    print_node(tree, root, 0);
    Ok(())
}

fn print_node(tree: &SyntaxTree, id: NodeId, depth: usize) {
    let span = tree.span(id);
    let label = match tree.identifier_name(id) {
        Some(name) => format!("{} '{}'", tree.kind(id).name(), name),
        None => tree.kind(id).name().to_string(),
    };
    println!(
        "{}{} [{}:{}-{}:{}]",
        "  ".repeat(depth),
        label,
        span.line,
        span.column,
        span.end_line,
        span.end_column
    );
    for child in tree.children(id) {
        print_node(tree, child, depth + 1);
    }
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_diagnostic(source: &SourceFile, lines: &[&str], diagnostic: &Diagnostic) {
    let (level_label, level_marker) = match diagnostic.level {
        DiagnosticLevel::Error => ("error", "  -"),
        DiagnosticLevel::Warning => ("warning", "  ~"),
    };
    eprintln!("{} {}: {}", level_marker, level_label, diagnostic.message);
    let Some(span) = diagnostic.span else {
        return;
    };

    eprintln!(
        "     --> {}:{}:{}",
        source.path.display(),
        span.line,
        span.column
    );
    if let Some(raw_line) = lines.get(span.line.saturating_sub(1)) {
        let display_line = raw_line.replace('\t', "    ");
        eprintln!("      {}", display_line);

        let mut caret_line = String::from("      ");
        for ch in raw_line.chars().take(span.column.saturating_sub(1)) {
            match ch {
                '\t' => caret_line.push_str("    "),
                _ => caret_line.push(' '),
            }
        }
        let highlight_len = if span.end_line == span.line {
            span.end_column.saturating_sub(span.column).saturating_add(1)
        } else {
            1
        };
        caret_line.push_str(&"^".repeat(highlight_len.max(1)));
        eprintln!("{}", caret_line);
    }
}
