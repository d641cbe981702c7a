//! Foreign-key dependency graph.
//!
//! Every new foreign key is created deferrable and added after all tables
//! exist, so cycles never block a migration. They are still worth surfacing:
//! rows in a cycle can only be inserted inside a transaction that relies on
//! the deferral.

use indexmap::{IndexMap, IndexSet};
use keel_db_schema::EntityDescriptor;
use std::fmt;

/// A cycle of tables linked by foreign keys, in reference order.
///
/// The last table references the first. A self-referencing table is a cycle
/// of one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FkCycle {
    pub tables: Vec<String>,
}

impl FkCycle {
    /// Whether `from -> to` is one of the links of this cycle.
    pub fn contains_edge(&self, from: &str, to: &str) -> bool {
        let n = self.tables.len();
        (0..n).any(|i| self.tables[i] == from && self.tables[(i + 1) % n] == to)
    }
}

impl fmt::Display for FkCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for table in &self.tables {
            write!(f, "{} -> ", table)?;
        }
        match self.tables.first() {
            Some(first) => write!(f, "{}", first),
            None => Ok(()),
        }
    }
}

/// Find foreign-key cycles among the declared tables.
///
/// References to tables that are not declared are ignored. Each back edge of
/// a depth-first walk in declaration order yields one cycle, so the result is
/// deterministic but not an exhaustive list of every elementary cycle.
pub fn find_cycles(descriptors: &[&EntityDescriptor]) -> Vec<FkCycle> {
    let mut graph: IndexMap<&str, IndexSet<&str>> = descriptors
        .iter()
        .map(|d| (d.table_name.as_str(), IndexSet::new()))
        .collect();

    for &d in descriptors {
        for fk in d.foreign_keys.values() {
            let target = fk.referenced_table.as_str();
            if !graph.contains_key(target) {
                continue;
            }
            if let Some(edges) = graph.get_mut(d.table_name.as_str()) {
                edges.insert(target);
            }
        }
    }

    let mut search = Search {
        graph: &graph,
        marks: vec![Mark::Unvisited; graph.len()],
        stack: Vec::new(),
        cycles: Vec::new(),
    };
    for node in 0..graph.len() {
        if search.marks[node] == Mark::Unvisited {
            search.visit(node);
        }
    }
    search.cycles
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

struct Search<'g, 'a> {
    graph: &'g IndexMap<&'a str, IndexSet<&'a str>>,
    marks: Vec<Mark>,
    stack: Vec<usize>,
    cycles: Vec<FkCycle>,
}

impl Search<'_, '_> {
    fn visit(&mut self, node: usize) {
        let graph = self.graph;
        let Some((_, edges)) = graph.get_index(node) else {
            return;
        };

        self.marks[node] = Mark::OnStack;
        self.stack.push(node);

        for target in edges {
            let Some(target) = graph.get_index_of(*target) else {
                continue;
            };
            match self.marks[target] {
                Mark::Unvisited => self.visit(target),
                Mark::OnStack => self.record(target),
                Mark::Done => {}
            }
        }

        self.stack.pop();
        self.marks[node] = Mark::Done;
    }

    fn record(&mut self, start: usize) {
        let Some(pos) = self.stack.iter().position(|&n| n == start) else {
            return;
        };
        let tables = self.stack[pos..]
            .iter()
            .filter_map(|&n| self.graph.get_index(n).map(|(name, _)| name.to_string()))
            .collect();
        self.cycles.push(FkCycle { tables });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_db_schema::{ColumnDescriptor, EntityBuilder};

    fn table(name: &str, refs: &[&str]) -> EntityDescriptor {
        let mut builder =
            EntityBuilder::new(name).column("id", ColumnDescriptor::of::<i64>("id").primary_key());
        for r in refs {
            let property = format!("{}Id", r);
            builder = builder
                .column(property.clone(), ColumnDescriptor::of::<i64>(format!("{}_id", r)))
                .foreign_key(property, *r, "id");
        }
        builder.build()
    }

    fn cycles(tables: &[EntityDescriptor]) -> Vec<String> {
        let refs: Vec<&EntityDescriptor> = tables.iter().collect();
        find_cycles(&refs).iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_acyclic_graph_has_no_cycles() {
        let tables = [
            table("user", &[]),
            table("post", &["user"]),
            table("comment", &["post", "user"]),
        ];
        assert!(cycles(&tables).is_empty());
    }

    #[test]
    fn test_two_table_cycle() {
        let tables = [table("a", &["b"]), table("b", &["a"])];
        assert_eq!(cycles(&tables), ["a -> b -> a"]);
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let tables = [table("category", &["category"])];
        assert_eq!(cycles(&tables), ["category -> category"]);
    }

    #[test]
    fn test_longer_cycle_reported_from_first_declared_table() {
        let tables = [
            table("a", &["b"]),
            table("b", &["c"]),
            table("c", &["a"]),
            table("d", &["a"]),
        ];
        assert_eq!(cycles(&tables), ["a -> b -> c -> a"]);
    }

    #[test]
    fn test_cycle_edges_wrap_around() {
        let cycle = FkCycle {
            tables: vec!["a".into(), "b".into(), "c".into()],
        };
        assert!(cycle.contains_edge("a", "b"));
        assert!(cycle.contains_edge("c", "a"));
        assert!(!cycle.contains_edge("b", "a"));
        assert!(!cycle.contains_edge("a", "c"));

        let self_ref = FkCycle {
            tables: vec!["category".into()],
        };
        assert!(self_ref.contains_edge("category", "category"));
    }

    #[test]
    fn test_references_to_undeclared_tables_are_ignored() {
        let tables = [table("post", &["user"])];
        assert!(cycles(&tables).is_empty());
    }
}
