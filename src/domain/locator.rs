// Cursor-position root selection: find the definition enclosing a source
// line so an editor client can point at code instead of naming a function.

use crate::domain::callgraph::CallGraph;

/// Innermost definition whose recorded span contains `line`.
///
/// Smallest span wins; equal spans tie-break by name so the answer is
/// deterministic. Definitions without line info never match.
pub fn definition_at_line(graph: &CallGraph, line: u64) -> Option<&str> {
    let mut best: Option<(&str, u64)> = None;

    for (name, def) in &graph.defs {
        let (Some(start), Some(end)) = (def.start_line, def.end_line) else {
            continue;
        };
        if start <= line && line <= end {
            let span = end - start;
            match best {
                Some((best_name, best_span)) => {
                    if span < best_span || (span == best_span && name.as_str() < best_name) {
                        best = Some((name.as_str(), span));
                    }
                }
                None => best = Some((name.as_str(), span)),
            }
        }
    }

    best.map(|(name, _)| name)
}
