use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::{
    algo::{tarjan_scc, toposort},
    graph::{DiGraph, NodeIndex},
};

use crate::Error;

/// Event propagation between instances within a single instant.
///
/// Nodes are sub-component instances. An edge runs from the sender to the
/// receiver of a zero-delay event connection whenever some transition of the
/// sender emits on the send port and some regime of the receiver consumes the
/// receive port. A cycle means an instance could be re-triggered by its own
/// events without time advancing, whichever of its receive ports the events
/// come back through.
#[derive(Debug, Default)]
pub(crate) struct CausalGraph {
    graph: DiGraph<String, ()>,
    node_map: HashMap<String, NodeIndex>,
}

impl CausalGraph {
    /// Adds a directed edge, adding either instance if it is not yet known.
    pub(crate) fn connect(&mut self, from: &str, to: &str) {
        let from = self.get_or_add_instance(from);
        let to = self.get_or_add_instance(to);
        self.graph.update_edge(from, to, ());
    }

    /// Checks that no instance can re-trigger itself within one instant.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CausalCycle`] naming the instances on a cycle, in
    /// propagation order and closed by repeating the first instance.
    pub(crate) fn check_acyclic(&self) -> Result<(), Error> {
        if toposort(&self.graph, None).is_ok() {
            return Ok(());
        }
        let Some(component) = tarjan_scc(&self.graph)
            .into_iter()
            .find(|component| component.len() > 1)
        else {
            return Ok(());
        };

        let mut instances: Vec<String> = self
            .cycle_within(&component)
            .into_iter()
            .map(|node| self.graph[node].clone())
            .collect();
        if let Some(first) = instances.first().cloned() {
            instances.push(first);
        }

        Err(Error::CausalCycle { instances })
    }

    /// Returns the shortest cycle through the first node of a strongly
    /// connected component, starting at that node.
    fn cycle_within(&self, component: &[NodeIndex]) -> Vec<NodeIndex> {
        let members: HashSet<NodeIndex> = component.iter().copied().collect();
        let start = component[0];

        let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut queue = VecDeque::from([start]);
        let mut last = start;
        'search: while let Some(node) = queue.pop_front() {
            for next in self.graph.neighbors(node) {
                if next == start {
                    last = node;
                    break 'search;
                }
                if members.contains(&next) && !parent.contains_key(&next) {
                    parent.insert(next, node);
                    queue.push_back(next);
                }
            }
        }

        let mut path = vec![last];
        while let Some(&previous) = path.last().and_then(|node| parent.get(node)) {
            path.push(previous);
        }
        path.reverse();
        path
    }

    #[cfg(test)]
    fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    fn get_or_add_instance(&mut self, instance: &str) -> NodeIndex {
        *self
            .node_map
            .entry(instance.to_string())
            .or_insert_with(|| self.graph.add_node(instance.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chains_are_acyclic() {
        let mut graph = CausalGraph::default();
        graph.connect("a", "b");
        graph.connect("b", "c");
        graph.connect("a", "c");
        graph.connect("a", "b");
        assert_eq!(graph.node_count(), 3);
        assert!(graph.check_acyclic().is_ok());
    }

    #[test]
    fn reports_instances_on_a_cycle() {
        let mut graph = CausalGraph::default();
        graph.connect("source", "a");
        for (from, to) in [("a", "b"), ("b", "c"), ("c", "a")] {
            graph.connect(from, to);
        }

        let Err(Error::CausalCycle { instances }) = graph.check_acyclic() else {
            panic!("expected a causal cycle");
        };
        assert_eq!(instances.len(), 4);
        assert_eq!(instances.first(), instances.last());
        for name in ["a", "b", "c"] {
            assert!(instances.iter().any(|i| i == name), "{name} missing");
        }
        assert!(!instances.iter().any(|i| i == "source"));
    }

    #[test]
    fn two_instance_loops_are_cycles() {
        let mut graph = CausalGraph::default();
        graph.connect("b", "c");
        graph.connect("c", "b");

        let Err(Error::CausalCycle { instances }) = graph.check_acyclic() else {
            panic!("expected a causal cycle");
        };
        assert_eq!(instances.len(), 3);
        assert_eq!(instances.first(), instances.last());
    }
}
