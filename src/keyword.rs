//! Keyword descriptors and program ordering
//!
//! A keyword is a plain value: a name, dependency edges, and two operations.
//! Dialects are maps from key to descriptor, which keeps the keyword set
//! open without any class hierarchy. Within one schema object the keys
//! present are sorted into a *program* so that every dependency runs before
//! its dependents; names starting with `@` are virtual barriers that order
//! real keywords transitively without being keywords themselves.

use petgraph::algo::tarjan_scc;
use petgraph::graph::DiGraph;

use crate::context::NodeId;
use crate::error::{Result, SchemaError};
use crate::parser::Parser;
use crate::validator::{Evaluation, Kw};

/// Parse operation: runs during the schema walk, with the parser positioned
/// at the owning schema object.
pub type ParseFn = fn(&mut Parser<'_>, NodeId, &str) -> Result<()>;

/// Validate operation: runs against an instance with the keyword's own
/// output frame on top of the evaluation stack.
pub type ValidateFn = fn(&mut Evaluation<'_>, Kw<'_>) -> Result<()>;

/// An extensible keyword descriptor.
#[derive(Debug, Clone, Copy)]
pub struct Keyword {
    pub name: &'static str,
    /// Keys (or `@` barriers) that must run before this keyword.
    pub dependencies: &'static [&'static str],
    /// Keys (or `@` barriers) that must run after this keyword.
    pub dependents: &'static [&'static str],
    pub parse: ParseFn,
    pub validate: ValidateFn,
}

/// One slot of a sorted keyword program: the concrete key present in the
/// schema object plus the descriptor serving it. Unknown keys share one
/// annotation descriptor, so the key is carried separately.
#[derive(Debug, Clone)]
pub struct ProgramEntry {
    pub key: String,
    pub keyword: Keyword,
}

/// Must the entry `a` run before the entry `b`?
fn precedes(a: &ProgramEntry, b: &ProgramEntry) -> bool {
    a.keyword.dependents.iter().any(|d| *d == b.key)
        || b.keyword.dependencies.iter().any(|d| *d == a.key)
        || a.keyword
            .dependents
            .iter()
            .any(|v| v.starts_with('@') && b.keyword.dependencies.contains(v))
}

/// Sort a keyword program in place.
///
/// The sort is stable: keywords unconstrained by any edge keep their
/// original relative order, and a keyword already consistent with all its
/// constraints is never moved. Cyclic constraints fail with
/// [`SchemaError::CycleDetected`] naming the participating keys.
pub fn sort_program(entries: &mut Vec<ProgramEntry>) -> Result<()> {
    let n = entries.len();
    if n < 2 {
        return Ok(());
    }

    let mut before = vec![vec![false; n]; n];
    for i in 0..n {
        for j in 0..n {
            if i != j && precedes(&entries[i], &entries[j]) {
                before[i][j] = true;
            }
        }
    }

    detect_cycle(entries, &before)?;

    // Repeatedly pull the first out-of-order entry in front of the entry it
    // must precede. Entries not involved in a violation are never touched,
    // which preserves source order for independent keywords. The quadratic
    // cap is a backstop; cycles are rejected above.
    let mut order: Vec<usize> = (0..n).collect();
    let cap = n * n + 1;
    let mut moves = 0usize;
    'scan: loop {
        for i in 0..n {
            for j in (i + 1)..n {
                if before[order[j]][order[i]] {
                    let moved = order.remove(j);
                    order.insert(i, moved);
                    moves += 1;
                    if moves > cap {
                        return Err(SchemaError::CycleDetected {
                            keys: entries.iter().map(|e| e.key.clone()).collect(),
                        });
                    }
                    continue 'scan;
                }
            }
        }
        break;
    }

    let sorted: Vec<ProgramEntry> = order.into_iter().map(|i| entries[i].clone()).collect();
    *entries = sorted;
    Ok(())
}

fn detect_cycle(entries: &[ProgramEntry], before: &[Vec<bool>]) -> Result<()> {
    let mut graph = DiGraph::<usize, ()>::new();
    let nodes: Vec<_> = (0..entries.len()).map(|i| graph.add_node(i)).collect();
    for (i, row) in before.iter().enumerate() {
        for (j, flag) in row.iter().enumerate() {
            if *flag {
                graph.add_edge(nodes[i], nodes[j], ());
            }
        }
    }
    for scc in tarjan_scc(&graph) {
        if scc.len() > 1 {
            let mut keys: Vec<String> = scc
                .iter()
                .map(|idx| entries[graph[*idx]].key.clone())
                .collect();
            keys.sort();
            return Err(SchemaError::CycleDetected { keys });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_parse(_: &mut Parser<'_>, _: NodeId, _: &str) -> Result<()> {
        Ok(())
    }

    fn noop_validate(_: &mut Evaluation<'_>, _: Kw<'_>) -> Result<()> {
        Ok(())
    }

    fn entry(
        key: &'static str,
        dependencies: &'static [&'static str],
        dependents: &'static [&'static str],
    ) -> ProgramEntry {
        ProgramEntry {
            key: key.to_string(),
            keyword: Keyword {
                name: key,
                dependencies,
                dependents,
                parse: noop_parse,
                validate: noop_validate,
            },
        }
    }

    fn keys(entries: &[ProgramEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.key.as_str()).collect()
    }

    #[test]
    fn test_dependency_precedes_dependent() {
        let mut program = vec![entry("items", &["prefixItems"], &[]), entry("prefixItems", &[], &[])];
        sort_program(&mut program).unwrap();
        assert_eq!(keys(&program), vec!["prefixItems", "items"]);
    }

    #[test]
    fn test_virtual_barrier_orders_real_keywords() {
        let mut program = vec![entry("B", &["@V"], &[]), entry("A", &[], &["@V"])];
        sort_program(&mut program).unwrap();
        assert_eq!(keys(&program), vec!["A", "B"]);
    }

    #[test]
    fn test_unconstrained_keywords_keep_source_order() {
        let mut program = vec![
            entry("type", &[], &[]),
            entry("minimum", &[], &[]),
            entry("pattern", &[], &[]),
        ];
        sort_program(&mut program).unwrap();
        assert_eq!(keys(&program), vec!["type", "minimum", "pattern"]);
    }

    #[test]
    fn test_sort_is_idempotent() {
        let mut program = vec![
            entry("additionalProperties", &["properties", "patternProperties"], &[]),
            entry("required", &[], &[]),
            entry("properties", &[], &[]),
            entry("patternProperties", &[], &[]),
        ];
        sort_program(&mut program).unwrap();
        let once = keys(&program).into_iter().map(String::from).collect::<Vec<_>>();
        sort_program(&mut program).unwrap();
        assert_eq!(keys(&program), once);
        assert_eq!(
            keys(&program),
            vec!["properties", "patternProperties", "additionalProperties", "required"]
        );
    }

    #[test]
    fn test_cycle_is_rejected_with_participants() {
        let mut program = vec![entry("A", &["B"], &[]), entry("B", &["A"], &[])];
        let err = sort_program(&mut program).unwrap_err();
        match err {
            SchemaError::CycleDetected { keys } => assert_eq!(keys, vec!["A", "B"]),
            other => panic!("expected CycleDetected, got {other:?}"),
        }
    }

    #[test]
    fn test_dependents_push_keyword_forward() {
        let mut program = vec![
            entry("unevaluatedProperties", &["@unevaluated"], &[]),
            entry("allOf", &[], &["@unevaluated"]),
            entry("properties", &[], &["@unevaluated"]),
        ];
        sort_program(&mut program).unwrap();
        assert_eq!(keys(&program), vec!["allOf", "properties", "unevaluatedProperties"]);
    }
}
