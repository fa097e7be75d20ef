use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::json;

use crate::api::dto::{GraphDto, TreeDto};
use crate::domain::callgraph::{CallGraph, GraphBuilder};
use crate::domain::calltree::{build_tree_with_limit, max_depth};
use crate::domain::locator::definition_at_line;
use crate::domain::store::{GraphStore, MemoryGraphStore};
use crate::infrastructure::parser_runner;

#[derive(Debug, Deserialize)]
struct CommandReq {
    command: String,
    params: Option<serde_json::Value>,
}

/// Shared state and settings for one server instance. Graphs built by
/// ANALYZE stay in the store so REROOT can rebuild trees without
/// re-parsing.
#[derive(Clone)]
pub struct ApiContext {
    pub interpreter: String,
    pub script: Option<String>,
    pub depth_limit: usize,
    pub store: Arc<dyn GraphStore>,
}

impl ApiContext {
    pub fn new(interpreter: String, script: Option<String>, depth_limit: usize) -> Self {
        Self::with_store(
            interpreter,
            script,
            depth_limit,
            Arc::new(MemoryGraphStore::default()),
        )
    }

    /// Use a caller-provided backend, e.g. a disk store that survives
    /// restarts.
    pub fn with_store(
        interpreter: String,
        script: Option<String>,
        depth_limit: usize,
        store: Arc<dyn GraphStore>,
    ) -> Self {
        Self {
            interpreter,
            script,
            depth_limit,
            store,
        }
    }
}

pub fn start_server(port: u16, context: ApiContext) -> Result<()> {
    let address = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&address)
        .with_context(|| format!("Failed to bind to {}", address))?;

    println!("[calltrace] API server listening on {}", address);

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let connection_context = context.clone();
                thread::spawn(move || {
                    if let Err(e) = handle_connection(stream, &connection_context) {
                        eprintln!("[API] Connection error: {}", e);
                    }
                });
            }
            Err(e) => eprintln!("[API] Accept error: {}", e),
        }
    }

    Ok(())
}

fn handle_connection(mut stream: TcpStream, context: &ApiContext) -> Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            break; // Connection closed
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let response = match process_command(trimmed, context) {
            Ok(data) => json!({
                "status": "success",
                "data": data
            }),
            Err(e) => json!({
                "status": "error",
                "message": e.to_string()
            }),
        };

        let response_str = serde_json::to_string(&response)?;
        stream.write_all(response_str.as_bytes())?;
        stream.write_all(b"\n")?;

        if let Ok(req) = serde_json::from_str::<CommandReq>(trimmed) {
            if req.command == "SHUTDOWN" {
                println!("[API] Shutdown requested.");
                std::process::exit(0);
            }
        }
    }
    Ok(())
}

fn process_command(json_str: &str, context: &ApiContext) -> Result<serde_json::Value> {
    let req: CommandReq = serde_json::from_str(json_str).context("Invalid JSON format")?;

    match req.command.as_str() {
        "PING" => Ok(json!("PONG")),
        "ANALYZE" => handle_analyze(req.params, context),
        "REROOT" => handle_reroot(req.params, context),
        "SHUTDOWN" => Ok(json!("Shutting down...")),
        _ => anyhow::bail!("Unknown command: {}", req.command),
    }
}

fn handle_analyze(
    params: Option<serde_json::Value>,
    context: &ApiContext,
) -> Result<serde_json::Value> {
    let params = params.ok_or_else(|| anyhow::anyhow!("Missing params for ANALYZE"))?;

    let path_str = params
        .get("path")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("Missing 'path' param"))?;

    let source_path = PathBuf::from(path_str);
    if !source_path.exists() {
        anyhow::bail!("Source path not found: {}", path_str);
    }

    println!("[API] Analyzing: {}", path_str);

    let ast = load_ast(&source_path, &params, context)?;
    let graph = GraphBuilder::build(&ast);
    context.store.put(path_str, &graph);

    let root = resolve_root(&graph, &params)?;
    let depth_limit = params
        .get("depth")
        .and_then(|v| v.as_u64())
        .map(|d| d as usize)
        .unwrap_or(context.depth_limit);

    Ok(tree_response(&graph, &root, depth_limit))
}

fn handle_reroot(
    params: Option<serde_json::Value>,
    context: &ApiContext,
) -> Result<serde_json::Value> {
    let params = params.ok_or_else(|| anyhow::anyhow!("Missing params for REROOT"))?;

    let path_str = params
        .get("path")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("Missing 'path' param"))?;

    let graph = context
        .store
        .get(path_str)
        .ok_or_else(|| anyhow::anyhow!("Not analyzed yet: {} (send ANALYZE first)", path_str))?;

    let root = resolve_root(&graph, &params)?;
    let depth_limit = params
        .get("depth")
        .and_then(|v| v.as_u64())
        .map(|d| d as usize)
        .unwrap_or(context.depth_limit);

    Ok(tree_response(&graph, &root, depth_limit))
}

/// Obtain the AST for a source path: `.json` inputs are ready-made dumps,
/// anything else goes through the configured dump script.
fn load_ast(
    source_path: &Path,
    params: &serde_json::Value,
    context: &ApiContext,
) -> Result<serde_json::Value> {
    let is_dump = source_path
        .extension()
        .map(|ext| ext == "json")
        .unwrap_or(false);

    if is_dump {
        let contents = std::fs::read_to_string(source_path)
            .with_context(|| format!("Cannot read AST dump: {}", source_path.display()))?;
        return serde_json::from_str(&contents).context("AST dump was not valid JSON");
    }

    let script = params
        .get("script")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .or_else(|| context.script.clone())
        .ok_or_else(|| {
            anyhow::anyhow!("No parser script configured; pass 'script' or start with --script")
        })?;

    parser_runner::run_ast_dump(&context.interpreter, &script, source_path)
}

/// Pick the root to expand: an explicit function name wins (unknown names
/// are legal and degrade to a childless node), else a cursor line is
/// resolved against the definition spans.
fn resolve_root(graph: &CallGraph, params: &serde_json::Value) -> Result<String> {
    if let Some(function) = params.get("function").and_then(|v| v.as_str()) {
        return Ok(function.to_string());
    }
    if let Some(line) = params.get("line").and_then(|v| v.as_u64()) {
        return definition_at_line(graph, line)
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("No definition encloses line {}", line));
    }
    anyhow::bail!("Missing 'function' or 'line' param")
}

fn tree_response(graph: &CallGraph, root: &str, depth_limit: usize) -> serde_json::Value {
    let tree = build_tree_with_limit(root, graph, depth_limit);
    json!({
        "root": root,
        "max_depth": max_depth(root, graph),
        "tree": TreeDto::from(&tree),
        "graph": GraphDto::from(graph),
    })
}
