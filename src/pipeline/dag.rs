// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 svmflow contributors

//! DAG (Directed Acyclic Graph) builder for step dependencies
//!
//! Dependencies may only point at steps declared earlier in the list, so the
//! graph is acyclic by construction and declaration order is already a valid
//! execution order.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, Walker};
use petgraph::Direction;
use std::collections::HashMap;

use crate::errors::{DependencyProblem, SvmflowError};
use crate::pipeline::Pipeline;

/// Builder for step dependency DAGs
pub struct DagBuilder {
    graph: DiGraph<usize, ()>,
    name_to_index: HashMap<String, NodeIndex>,
    names: Vec<String>,
}

impl DagBuilder {
    /// Create an empty DAG builder
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            name_to_index: HashMap::new(),
            names: Vec::new(),
        }
    }

    /// Build a DAG from a pipeline, resolving every dependency against the
    /// steps declared before it
    pub fn build(pipeline: &Pipeline) -> Result<Self, SvmflowError> {
        let mut builder = Self::new();
        let declared: HashMap<&str, usize> = pipeline
            .steps
            .iter()
            .enumerate()
            .map(|(idx, step)| (step.name.as_str(), idx))
            .collect();

        for (idx, step) in pipeline.steps.iter().enumerate() {
            if builder.name_to_index.contains_key(&step.name) {
                return Err(SvmflowError::DuplicateName {
                    step: step.name.clone(),
                });
            }

            // Resolve before inserting, so a self-reference is not yet visible
            let mut upstream = Vec::with_capacity(step.depends_on.len());
            for dep_name in &step.depends_on {
                match builder.name_to_index.get(dep_name) {
                    Some(node) => upstream.push(*node),
                    None => {
                        let reason = if declared.contains_key(dep_name.as_str()) {
                            DependencyProblem::ForwardReference
                        } else {
                            DependencyProblem::Undeclared
                        };
                        return Err(SvmflowError::Dependency {
                            step: step.name.clone(),
                            dependency: dep_name.clone(),
                            reason,
                        });
                    }
                }
            }

            let node = builder.graph.add_node(idx);
            builder.name_to_index.insert(step.name.clone(), node);
            builder.names.push(step.name.clone());

            for dep_node in upstream {
                if !builder.graph.contains_edge(dep_node, node) {
                    builder.graph.add_edge(dep_node, node, ());
                }
            }
        }

        Ok(builder)
    }

    /// Number of steps in the graph
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Get topologically sorted step indices
    ///
    /// Edges only ever point backwards, so declaration order is returned
    /// unchanged; independent steps keep their relative order.
    pub fn topological_order(&self) -> Vec<usize> {
        self.graph.node_indices().map(|n| self.graph[n]).collect()
    }

    /// Get topologically sorted step names
    pub fn topological_order_names(&self) -> Vec<String> {
        self.topological_order()
            .into_iter()
            .map(|idx| self.names[idx].clone())
            .collect()
    }

    /// Direct dependencies of a step, in declaration order
    pub fn dependencies(&self, step_name: &str) -> Option<Vec<String>> {
        let node = self.name_to_index.get(step_name)?;
        Some(self.neighbors_sorted(*node, Direction::Incoming))
    }

    /// Direct dependents of a step, in declaration order
    pub fn dependents(&self, step_name: &str) -> Option<Vec<String>> {
        let node = self.name_to_index.get(step_name)?;
        Some(self.neighbors_sorted(*node, Direction::Outgoing))
    }

    /// Check if step A depends (directly or transitively) on step B
    pub fn depends_on(&self, step_a: &str, step_b: &str) -> bool {
        let Some(node_a) = self.name_to_index.get(step_a) else {
            return false;
        };
        let Some(node_b) = self.name_to_index.get(step_b) else {
            return false;
        };
        if node_a == node_b {
            return false;
        }

        petgraph::algo::has_path_connecting(&self.graph, *node_b, *node_a, None)
    }

    /// Every step that transitively depends on `step_name`, in declaration order
    pub fn downstream_of(&self, step_name: &str) -> Vec<String> {
        let Some(start) = self.name_to_index.get(step_name) else {
            return Vec::new();
        };

        let mut reached: Vec<usize> = Dfs::new(&self.graph, *start)
            .iter(&self.graph)
            .filter(|n| n != start)
            .map(|n| self.graph[n])
            .collect();
        reached.sort_unstable();
        reached.into_iter().map(|idx| self.names[idx].clone()).collect()
    }

    /// Steps needed to build `targets`: the targets plus everything they
    /// transitively depend on, in execution order
    pub fn closure_of(&self, targets: &[String]) -> Result<Vec<String>, SvmflowError> {
        let mut needed = vec![false; self.names.len()];
        for target in targets {
            let node = self.name_to_index.get(target).ok_or_else(|| {
                SvmflowError::unknown_artifact(target, &self.names)
            })?;
            let reversed = petgraph::visit::Reversed(&self.graph);
            for n in Dfs::new(reversed, *node).iter(reversed) {
                needed[self.graph[n]] = true;
            }
        }

        Ok(self
            .topological_order()
            .into_iter()
            .filter(|idx| needed[*idx])
            .map(|idx| self.names[idx].clone())
            .collect())
    }

    fn neighbors_sorted(&self, node: NodeIndex, direction: Direction) -> Vec<String> {
        let mut indices: Vec<usize> = self
            .graph
            .neighbors_directed(node, direction)
            .map(|n| self.graph[n])
            .collect();
        indices.sort_unstable();
        indices.into_iter().map(|idx| self.names[idx].clone()).collect()
    }

    /// Edges as (from, to) step indices, sorted
    fn sorted_edges(&self) -> Vec<(usize, usize)> {
        let mut edges: Vec<(usize, usize)> = self
            .graph
            .raw_edges()
            .iter()
            .map(|e| (self.graph[e.source()], self.graph[e.target()]))
            .collect();
        edges.sort_unstable_by_key(|(from, to)| (*to, *from));
        edges
    }

    /// Generate Mermaid diagram of the DAG
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("graph TD\n");

        for name in &self.names {
            out.push_str(&format!("    {}[{}]\n", name, name));
        }

        for (from, to) in self.sorted_edges() {
            out.push_str(&format!("    {} --> {}\n", self.names[from], self.names[to]));
        }

        out
    }

    /// Generate DOT diagram of the DAG
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph pipeline {\n");
        out.push_str("    rankdir=TB;\n");
        out.push_str("    node [shape=box, style=rounded];\n\n");

        for (from, to) in self.sorted_edges() {
            out.push_str(&format!(
                "    \"{}\" -> \"{}\";\n",
                self.names[from], self.names[to]
            ));
        }

        // Isolated nodes have no edge to introduce them
        for (name, node) in self.names.iter().map(|n| (n, self.name_to_index[n])) {
            if self.graph.neighbors_undirected(node).next().is_none() {
                out.push_str(&format!("    \"{}\";\n", name));
            }
        }

        out.push_str("}\n");
        out
    }

    /// Generate text representation of execution order
    pub fn to_text(&self, pipeline: &Pipeline) -> String {
        let mut out = String::new();

        for (i, idx) in self.topological_order().into_iter().enumerate() {
            let step = &pipeline.steps[idx];
            let deps = self.dependencies(&step.name).unwrap_or_default();

            out.push_str(&format!(
                "{}. {} ({}: {})",
                i + 1,
                step.name,
                step.runtime,
                step.transform.name()
            ));

            if !deps.is_empty() {
                out.push_str(&format!(" [depends: {}]", deps.join(", ")));
            }

            out.push('\n');
        }

        out
    }
}

impl Default for DagBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{CacheConfig, Runtime, Settings, Step};
    use crate::transforms::Transform;

    fn make_test_pipeline(steps: Vec<(&str, Vec<&str>)>) -> Pipeline {
        Pipeline {
            version: "1".into(),
            name: "test".into(),
            description: None,
            settings: Settings::default(),
            cache: CacheConfig::default(),
            steps: steps
                .into_iter()
                .map(|(name, deps)| Step {
                    name: name.into(),
                    description: None,
                    runtime: Runtime::Ds,
                    transform: Transform::EncodeCategoricals,
                    depends_on: deps.into_iter().map(String::from).collect(),
                    encoder: None,
                    decoder: None,
                })
                .collect(),
        }
    }

    #[test]
    fn test_linear_dag() {
        let pipeline = make_test_pipeline(vec![
            ("a", vec![]),
            ("b", vec!["a"]),
            ("c", vec!["b"]),
        ]);

        let dag = DagBuilder::build(&pipeline).unwrap();
        assert_eq!(dag.topological_order_names(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_diamond_keeps_declaration_order() {
        let pipeline = make_test_pipeline(vec![
            ("a", vec![]),
            ("c", vec!["a"]),
            ("b", vec!["a"]),
            ("d", vec!["b", "c"]),
        ]);

        let dag = DagBuilder::build(&pipeline).unwrap();
        assert_eq!(dag.topological_order_names(), vec!["a", "c", "b", "d"]);
        assert_eq!(dag.dependencies("d").unwrap(), vec!["c", "b"]);
        assert_eq!(dag.dependents("a").unwrap(), vec!["c", "b"]);
    }

    #[test]
    fn test_duplicate_name() {
        let pipeline = make_test_pipeline(vec![("a", vec![]), ("a", vec![])]);

        let result = DagBuilder::build(&pipeline);
        assert!(matches!(result, Err(SvmflowError::DuplicateName { step }) if step == "a"));
    }

    #[test]
    fn test_undeclared_dependency() {
        let pipeline = make_test_pipeline(vec![("a", vec!["nonexistent"])]);

        let result = DagBuilder::build(&pipeline);
        assert!(matches!(
            result,
            Err(SvmflowError::Dependency {
                reason: DependencyProblem::Undeclared,
                ..
            })
        ));
    }

    #[test]
    fn test_forward_reference() {
        let pipeline = make_test_pipeline(vec![("a", vec!["b"]), ("b", vec!["a"])]);

        let result = DagBuilder::build(&pipeline);
        assert!(matches!(
            result,
            Err(SvmflowError::Dependency {
                reason: DependencyProblem::ForwardReference,
                ..
            })
        ));
    }

    #[test]
    fn test_self_reference_is_forward() {
        let pipeline = make_test_pipeline(vec![("a", vec!["a"])]);

        let result = DagBuilder::build(&pipeline);
        assert!(matches!(
            result,
            Err(SvmflowError::Dependency {
                reason: DependencyProblem::ForwardReference,
                ..
            })
        ));
    }

    #[test]
    fn test_depends_on_check() {
        let pipeline = make_test_pipeline(vec![
            ("a", vec![]),
            ("b", vec!["a"]),
            ("c", vec!["b"]),
        ]);

        let dag = DagBuilder::build(&pipeline).unwrap();

        assert!(dag.depends_on("c", "a")); // transitive
        assert!(dag.depends_on("c", "b"));
        assert!(!dag.depends_on("a", "c"));
        assert!(!dag.depends_on("a", "a"));
    }

    #[test]
    fn test_downstream_and_closure() {
        let pipeline = make_test_pipeline(vec![
            ("a", vec![]),
            ("b", vec!["a"]),
            ("x", vec![]),
            ("c", vec!["b", "x"]),
        ]);

        let dag = DagBuilder::build(&pipeline).unwrap();
        assert_eq!(dag.downstream_of("a"), vec!["b", "c"]);
        assert!(dag.downstream_of("c").is_empty());
        assert_eq!(dag.closure_of(&["b".into()]).unwrap(), vec!["a", "b"]);
        assert_eq!(dag.closure_of(&["c".into()]).unwrap(), vec!["a", "b", "x", "c"]);
        assert!(matches!(
            dag.closure_of(&["zzz".into()]),
            Err(SvmflowError::UnknownArtifact { .. })
        ));
    }

    #[test]
    fn test_renderings_are_deterministic() {
        let pipeline = make_test_pipeline(vec![("a", vec![]), ("b", vec!["a"]), ("z", vec![])]);

        let dag = DagBuilder::build(&pipeline).unwrap();
        let mermaid = dag.to_mermaid();
        assert!(mermaid.starts_with("graph TD\n"));
        assert!(mermaid.contains("a --> b"));
        assert_eq!(mermaid, DagBuilder::build(&pipeline).unwrap().to_mermaid());

        let dot = dag.to_dot();
        assert!(dot.contains("\"a\" -> \"b\";"));
        assert!(dot.contains("    \"z\";\n"));
        assert!(!dot.contains("    \"a\";\n"));

        let text = dag.to_text(&pipeline);
        assert_eq!(
            text,
            "1. a (ds: encode_categoricals)\n\
             2. b (ds: encode_categoricals) [depends: a]\n\
             3. z (ds: encode_categoricals)\n"
        );
    }
}
