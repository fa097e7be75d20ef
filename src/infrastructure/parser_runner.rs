/// External Parser Runner.
///
/// Spawns the configured interpreter + script as a child process and
/// interprets its stdout. Two engines:
/// - dump: the script prints the file's AST as JSON; the in-process core
///   builds the graph and the tree.
/// - script: the script performs the whole analysis and prints a finished
///   tree document, `{ "name", "max_depth"?, "children"? }` on success or
///   `{ "error": "..." }` on failure.

use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::domain::calltree::{CallTreeItem, ExpandState, ItemKind};
use crate::infrastructure::dump_cache::DumpCache;

// ═══════════════════════════════════════════════════════════════════════════
// Public API
// ═══════════════════════════════════════════════════════════════════════════

/// Tree document emitted by the script engine.
#[derive(Debug, Clone, Deserialize)]
pub struct TreeDoc {
    #[serde(default)]
    pub name: String,
    pub max_depth: Option<u64>,
    #[serde(default)]
    pub children: Vec<TreeDoc>,
    pub error: Option<String>,
}

/// Check that the configured interpreter is runnable.
pub fn check_interpreter_available(interpreter: &str) -> Result<()> {
    let check = Command::new(interpreter).arg("--version").output();

    match check {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout);
            println!("[Parser] Using {}: {}", interpreter, version.trim());
            Ok(())
        }
        Ok(output) => {
            bail!(
                "{} found but returned error: {:?}",
                interpreter,
                output.status.code()
            );
        }
        Err(_) => {
            bail!(
                "{} not found in PATH. Point --interpreter (or [parser].interpreter \
                 in calltrace.toml) at a working interpreter.",
                interpreter
            );
        }
    }
}

/// Run the dump script and parse its stdout as an AST document.
pub fn run_ast_dump(interpreter: &str, script: &str, source_file: &Path) -> Result<Value> {
    let spec = build_dump_command(interpreter, script, &source_file.to_string_lossy());
    let stdout = run_to_stdout(&spec)?;
    serde_json::from_slice(&stdout).context("AST dump output was not valid JSON")
}

/// Like [`run_ast_dump`], but consults the dump cache first and stores a
/// fresh dump on miss. Cache failures degrade to a plain run.
pub fn run_ast_dump_cached(
    interpreter: &str,
    script: &str,
    source_file: &Path,
    cache: &DumpCache,
) -> Result<Value> {
    if let Some(cached_path) = cache.get_valid(source_file) {
        let contents = std::fs::read_to_string(&cached_path)
            .with_context(|| format!("Cannot read cached dump: {}", cached_path.display()))?;
        return serde_json::from_str(&contents).context("Cached dump was not valid JSON");
    }

    let ast = run_ast_dump(interpreter, script, source_file)?;
    if let Err(e) = cache.store(source_file, &ast) {
        eprintln!("[Dump Cache] Warning: failed to store dump: {}", e);
    }
    Ok(ast)
}

/// Run the full-analysis script and map its tree document to display items.
pub fn run_tree_script(
    interpreter: &str,
    script: &str,
    source_file: &Path,
    function: &str,
) -> Result<CallTreeItem> {
    let spec = build_tree_command(
        interpreter,
        script,
        &source_file.to_string_lossy(),
        function,
    );
    let stdout = run_to_stdout(&spec)?;
    let doc: TreeDoc =
        serde_json::from_slice(&stdout).context("Parser output was not valid JSON")?;
    tree_doc_to_item(&doc)
}

/// Map a parsed tree document to display items.
///
/// Nodes with children become collapsed branches; childless nodes render as
/// external `→` leaves. The root carries its `[max_depth] :` annotation when
/// the document provides one. An `error` document builds no tree.
pub fn tree_doc_to_item(doc: &TreeDoc) -> Result<CallTreeItem> {
    if let Some(error) = &doc.error {
        bail!("Parser error: {error}");
    }
    Ok(map_doc(doc, true))
}

fn map_doc(doc: &TreeDoc, is_root: bool) -> CallTreeItem {
    let base_label = match doc.max_depth {
        Some(depth) if is_root => format!("[{depth}] : {}", doc.name),
        _ => doc.name.clone(),
    };

    if doc.children.is_empty() {
        return CallTreeItem::leaf(format!("\u{2192} {base_label}"), ItemKind::Function);
    }

    CallTreeItem {
        label: base_label,
        state: ExpandState::Collapsed,
        kind: ItemKind::Function,
        children: doc.children.iter().map(|child| map_doc(child, false)).collect(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Command construction and execution
// ═══════════════════════════════════════════════════════════════════════════

/// Describes the child process that would be spawned. Split out so command
/// shapes are testable without executing anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserCommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

pub fn build_dump_command(interpreter: &str, script: &str, source_file: &str) -> ParserCommandSpec {
    ParserCommandSpec {
        program: interpreter.to_string(),
        args: vec![script.to_string(), source_file.to_string()],
    }
}

pub fn build_tree_command(
    interpreter: &str,
    script: &str,
    source_file: &str,
    function: &str,
) -> ParserCommandSpec {
    ParserCommandSpec {
        program: interpreter.to_string(),
        args: vec![
            script.to_string(),
            source_file.to_string(),
            function.to_string(),
        ],
    }
}

fn run_to_stdout(spec: &ParserCommandSpec) -> Result<Vec<u8>> {
    let output = Command::new(&spec.program)
        .args(&spec.args)
        .output()
        .with_context(|| format!("Failed to execute '{}'", spec.program))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "{} exited with {:?}: {}",
            spec.program,
            output.status.code(),
            stderr.trim()
        );
    }

    Ok(output.stdout)
}
