//! Minimal Graphviz DOT builder for the container's diagnostic graph.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Write as _;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) struct NodeId(usize);

#[derive(Default, Clone)]
pub(crate) struct Attributes {
    values: BTreeMap<&'static str, String>,
}

impl Attributes {
    pub(crate) fn set_color(&mut self, value: &str) {
        self.values.insert("color", value.into());
    }

    pub(crate) fn set_font_color(&mut self, value: &str) {
        self.values.insert("fontcolor", value.into());
    }

    pub(crate) fn set_pen_width(&mut self, value: &str) {
        self.values.insert("penwidth", value.into());
    }

    pub(crate) fn set_shape(&mut self, value: &str) {
        self.values.insert("shape", value.into());
    }

    fn render(&self) -> String {
        if self.values.is_empty() {
            return String::new();
        }
        let body: Vec<String> = self
            .values
            .iter()
            .map(|(key, value)| format!("{key}={}", quote(value)))
            .collect();
        format!(" [{}]", body.join(", "))
    }
}

struct Node {
    name: String,
    attrs: Attributes,
    subgraph: Option<usize>,
}

struct SubGraph {
    name: String,
    label: String,
    attrs: Attributes,
}

/// A directed graph with optional cluster subgraphs, rendered as DOT text.
#[derive(Default)]
pub(crate) struct Graph {
    nodes: Vec<Node>,
    node_ids: HashMap<String, NodeId>,
    subgraphs: Vec<SubGraph>,
    subgraph_ids: HashMap<String, usize>,
    edges: Vec<(NodeId, NodeId)>,
    edge_set: HashSet<(NodeId, NodeId)>,
}

impl Graph {
    /// Returns the node with the given name, creating it if needed. The
    /// second value reports whether the node already existed.
    pub(crate) fn find_or_create_node(
        &mut self,
        name: &str,
        subgraph: Option<usize>,
    ) -> (NodeId, bool) {
        if let Some(id) = self.node_ids.get(name) {
            return (*id, true);
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name: name.into(),
            attrs: Attributes::default(),
            subgraph,
        });
        self.node_ids.insert(name.into(), id);
        (id, false)
    }

    pub(crate) fn find_or_create_subgraph(&mut self, name: &str, label: &str) -> (usize, bool) {
        if let Some(idx) = self.subgraph_ids.get(name) {
            return (*idx, true);
        }
        let idx = self.subgraphs.len();
        let mut attrs = Attributes::default();
        attrs.set_pen_width("0.5");
        attrs.values.insert("fontsize", "12.0".into());
        attrs.values.insert("style", "rounded".into());
        self.subgraphs.push(SubGraph {
            name: name.into(),
            label: label.into(),
            attrs,
        });
        self.subgraph_ids.insert(name.into(), idx);
        (idx, false)
    }

    pub(crate) fn attrs_mut(&mut self, id: NodeId) -> &mut Attributes {
        &mut self.nodes[id.0].attrs
    }

    pub(crate) fn add_edge(&mut self, from: NodeId, to: NodeId) {
        if self.edge_set.insert((from, to)) {
            self.edges.push((from, to));
        }
    }

    /// Renders the graph in Graphviz DOT format.
    pub(crate) fn render(&self) -> String {
        let mut out = String::from("digraph \"\" {\n");
        for (idx, subgraph) in self.subgraphs.iter().enumerate() {
            let _ = writeln!(out, "  subgraph {} {{", quote(&subgraph.name));
            let _ = writeln!(out, "    label={};", quote(&subgraph.label));
            for (key, value) in &subgraph.attrs.values {
                let _ = writeln!(out, "    {key}={};", quote(value));
            }
            for node in self.nodes.iter().filter(|n| n.subgraph == Some(idx)) {
                let _ = writeln!(out, "    {}{};", quote(&node.name), node.attrs.render());
            }
            out.push_str("  }\n");
        }
        for node in self.nodes.iter().filter(|n| n.subgraph.is_none()) {
            let _ = writeln!(out, "  {}{};", quote(&node.name), node.attrs.render());
        }
        for (from, to) in &self.edges {
            let _ = writeln!(
                out,
                "  {} -> {};",
                quote(&self.nodes[from.0].name),
                quote(&self.nodes[to.0].name)
            );
        }
        out.push_str("}\n");
        out
    }
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_nodes_edges_and_clusters() {
        let mut graph = Graph::default();
        let (cluster, _) = graph.find_or_create_subgraph("cluster_a", "Scope: a");
        let (provider, existed) = graph.find_or_create_node("app::provide_thing", Some(cluster));
        assert!(!existed);
        let (_, existed) = graph.find_or_create_node("app::provide_thing", Some(cluster));
        assert!(existed);
        let (ty, _) = graph.find_or_create_node("app::Thing", None);
        graph.attrs_mut(provider).set_shape("box");
        graph.attrs_mut(ty).set_color("lightgrey");
        graph.add_edge(provider, ty);
        graph.add_edge(provider, ty);

        let dot = graph.render();
        assert!(dot.starts_with("digraph"));
        assert!(dot.contains("subgraph \"cluster_a\""));
        assert!(dot.contains("label=\"Scope: a\";"));
        assert!(dot.contains("\"app::provide_thing\" [shape=\"box\"];"));
        assert!(dot.contains("\"app::Thing\" [color=\"lightgrey\"];"));
        assert_eq!(dot.matches("\"app::provide_thing\" -> \"app::Thing\";").count(), 1);
    }
}
