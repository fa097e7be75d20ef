// Command-line entry point for calltrace.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;

use calltrace::api::server::{start_server, ApiContext};
use calltrace::application::{summarize_batch, AnalyzeUsecase};
use calltrace::domain::callgraph::GraphBuilder;
use calltrace::domain::calltree::{annotate_root, build_tree_with_limit, max_depth};
use calltrace::domain::locator::definition_at_line;
use calltrace::domain::store::DiskGraphStore;
use calltrace::infrastructure::config;
use calltrace::infrastructure::dump_cache::DumpCache;
use calltrace::infrastructure::parser_runner;
use calltrace::infrastructure::{concurrency, AstGraphBuilder};
use calltrace::ports::dot_exporter::DotExporter;
use calltrace::ports::tree_renderer::{JsonTreeExporter, TextTreeExporter, TreeRenderer};
use calltrace::ports::{GraphExporter, TreeExporter};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// AST dump file(s), JSON as produced by the dump script (can specify multiple)
    #[arg(short, long, required = false)]
    ast: Vec<String>,

    /// Source file(s) to run through the external dump script (can specify multiple)
    #[arg(short, long, required = false)]
    source: Vec<String>,

    /// Root function name for the call tree
    #[arg(short, long)]
    function: Option<String>,

    /// Cursor line used to pick the root when --function is not given
    #[arg(short, long)]
    line: Option<u64>,

    /// Output format (text, json, dot)
    #[arg(long, default_value = "text")]
    format: String,

    /// Output file path (stdout when omitted)
    #[arg(short, long)]
    output: Option<String>,

    /// Delegate the whole analysis to the parser script and display its tree
    #[arg(long)]
    script_engine: bool,

    /// Interpreter for the parser script (overrides config)
    #[arg(long)]
    interpreter: Option<String>,

    /// Parser script path (overrides config)
    #[arg(long)]
    script: Option<String>,

    /// Maximum tree depth (overrides config)
    #[arg(long)]
    depth_limit: Option<usize>,

    /// Cache directory for AST dumps (caching off when omitted)
    #[arg(long)]
    cache_dir: Option<String>,

    /// Config file (defaults to ./calltrace.toml when present)
    #[arg(long)]
    config: Option<String>,

    /// Serve the line-JSON API on this port instead of one-shot analysis
    #[arg(long)]
    serve: Option<u16>,

    /// Persist built graphs in this sled database (serve mode; in-memory
    /// when omitted)
    #[arg(long)]
    store: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let file_config = config::load(cli.config.as_deref())?;
    let interpreter = cli
        .interpreter
        .clone()
        .unwrap_or(file_config.parser.interpreter);
    let script = cli.script.clone().or(file_config.parser.script);
    let depth_limit = cli.depth_limit.unwrap_or(file_config.analysis.depth_limit);

    // Daemon mode: everything else arrives over the wire.
    if let Some(port) = cli.serve {
        let context = match &cli.store {
            Some(store_path) => {
                let store = DiskGraphStore::new(store_path)
                    .with_context(|| format!("Cannot open graph store: {}", store_path))?;
                ApiContext::with_store(interpreter, script, depth_limit, Arc::new(store))
            }
            None => ApiContext::new(interpreter, script, depth_limit),
        };
        return start_server(port, context);
    }

    if cli.script_engine {
        return run_script_engine(&cli, &interpreter, script.as_deref());
    }

    let inputs = gather_inputs(&cli, &interpreter, script.as_deref())?;
    if inputs.is_empty() {
        bail!("Please provide at least one --ast <dump.json> or --source <file>");
    }

    if cli.function.is_some() || cli.line.is_some() {
        let (path, ast) = &inputs[0];
        if inputs.len() > 1 {
            eprintln!("[calltrace] Multiple inputs given; analyzing {}", path);
        }
        run_single(&cli, ast, depth_limit)
    } else {
        run_batch(&inputs)
    }
}

/// Original pipeline: the script does the whole analysis and prints the
/// finished tree document.
fn run_script_engine(cli: &Cli, interpreter: &str, script: Option<&str>) -> Result<()> {
    let script = script.ok_or_else(|| {
        anyhow::anyhow!("--script-engine needs a parser script (--script or calltrace.toml)")
    })?;
    let source = cli
        .source
        .first()
        .ok_or_else(|| anyhow::anyhow!("--script-engine needs a --source file"))?;
    let function = cli
        .function
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("--script-engine needs a --function name"))?;

    parser_runner::check_interpreter_available(interpreter)?;
    let tree = parser_runner::run_tree_script(interpreter, script, Path::new(source), function)?;

    match cli.output.as_deref() {
        Some(path) => TextTreeExporter.export(&tree, path)?,
        None => println!("{}", TreeRenderer::to_text(&tree)),
    }
    Ok(())
}

/// Collect (label, AST) pairs from ready-made dumps and dumped sources.
fn gather_inputs(
    cli: &Cli,
    interpreter: &str,
    script: Option<&str>,
) -> Result<Vec<(String, serde_json::Value)>> {
    let mut inputs = Vec::new();

    for dump_file in &cli.ast {
        let contents = fs::read_to_string(dump_file)
            .with_context(|| format!("Cannot read AST dump: {}", dump_file))?;
        let ast = serde_json::from_str(&contents)
            .with_context(|| format!("Invalid AST dump JSON: {}", dump_file))?;
        inputs.push((dump_file.clone(), ast));
    }

    if !cli.source.is_empty() {
        let script = script.ok_or_else(|| {
            anyhow::anyhow!("--source needs a dump script (--script or calltrace.toml)")
        })?;
        parser_runner::check_interpreter_available(interpreter)?;

        let cache = cli
            .cache_dir
            .as_deref()
            .map(|dir| DumpCache::new(&PathBuf::from(dir)));

        for source_file in &cli.source {
            let path = Path::new(source_file);
            let ast = match &cache {
                Some(cache) => {
                    parser_runner::run_ast_dump_cached(interpreter, script, path, cache)?
                }
                None => parser_runner::run_ast_dump(interpreter, script, path)?,
            };
            inputs.push((source_file.clone(), ast));
        }
    }

    Ok(inputs)
}

/// One input, one root, one tree (or the whole graph for DOT).
fn run_single(cli: &Cli, ast: &serde_json::Value, depth_limit: usize) -> Result<()> {
    let graph = GraphBuilder::build(ast);

    let root = match (&cli.function, cli.line) {
        (Some(function), _) => function.clone(),
        (None, Some(line)) => definition_at_line(&graph, line)
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("No definition encloses line {}", line))?,
        (None, None) => unreachable!("run_single requires --function or --line"),
    };

    match cli.format.as_str() {
        "text" => match cli.output.as_deref() {
            Some(path) => {
                let usecase = AnalyzeUsecase {
                    builder: &AstGraphBuilder,
                    exporter: &TextTreeExporter,
                };
                usecase.run(ast, &root, depth_limit, path)?;
                println!("[calltrace] Tree written to {}", path);
            }
            None => {
                let mut tree = build_tree_with_limit(&root, &graph, depth_limit);
                annotate_root(&mut tree, max_depth(&root, &graph));
                println!("{}", TreeRenderer::to_text(&tree));
            }
        },
        "json" => {
            let mut tree = build_tree_with_limit(&root, &graph, depth_limit);
            annotate_root(&mut tree, max_depth(&root, &graph));
            match cli.output.as_deref() {
                Some(path) => {
                    JsonTreeExporter.export(&tree, path)?;
                    println!("[calltrace] Tree written to {}", path);
                }
                None => println!("{}", serde_json::to_string_pretty(&tree)?),
            }
        }
        "dot" => match cli.output.as_deref() {
            Some(path) => {
                DotExporter.export(&graph, path)?;
                println!("[calltrace] Graph written to {}", path);
            }
            None => println!("{}", DotExporter::to_dot(&graph)),
        },
        other => bail!("Unknown format: {} (expected text, json, or dot)", other),
    }

    Ok(())
}

/// No root chosen: summarize every input instead.
fn run_batch(inputs: &[(String, serde_json::Value)]) -> Result<()> {
    if inputs.len() > 1 {
        if let Err(e) = concurrency::init_thread_pool() {
            eprintln!("[calltrace] Thread pool already initialized: {}", e);
        }
    }

    for summary in summarize_batch(&AstGraphBuilder, inputs) {
        println!(
            "{}: {} definitions, {} call edges",
            summary.path, summary.defs, summary.edges
        );
        if !summary.entry_candidates.is_empty() {
            println!("  entry candidates: {}", summary.entry_candidates.join(", "));
        }
    }

    Ok(())
}
