//! Graph export for dependency visualization.
//!
//! Builds a [`DependencyGraph`] from a container's bindings and stored
//! instances and renders it as an indented text tree or as GraphViz DOT.
//! JSON output is available with the `graph-export` feature.

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;

#[cfg(feature = "graph-export")]
use serde::{Deserialize, Serialize};

use crate::lifetime::Lifetime;
use crate::provider::Container;

/// Events per group in DOT record labels.
const EVENTS_PER_GROUP: usize = 4;

/// A binding or stored instance.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "graph-export", derive(Serialize, Deserialize))]
pub struct GraphNode {
    /// Registered name
    pub name: String,
    /// Label used in DOT output
    pub friendly_name: String,
    /// `None` for instances stored without a binding
    pub lifetime: Option<Lifetime>,
    /// Names of required services, in declaration order
    pub requires: Vec<String>,
    pub event_source: Vec<String>,
    pub event_listener: Vec<String>,
}

impl GraphNode {
    /// Whether the node is a stored instance rather than a binding.
    pub fn is_instance(&self) -> bool {
        self.lifetime.is_none()
    }
}

/// A dependency relationship: `from` requires `to`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "graph-export", derive(Serialize, Deserialize))]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    /// Name the dependent receives `to` under
    pub alias: String,
}

/// Snapshot of a container's dependency structure.
///
/// # Examples
///
/// ```rust
/// use ferrous_ioc::{Container, DependencyGraph};
///
/// struct Db;
/// struct Users;
/// struct Orders;
///
/// let container = Container::new();
/// container.register("db").unwrap().with_constructor(|_| Ok(Db));
/// container.register("users").unwrap()
///     .with_constructor(|_| Ok(Users))
///     .with_dependencies(["db"]);
/// container.register("orders").unwrap()
///     .with_constructor(|_| Ok(Orders))
///     .with_dependencies(["users", "db"]);
///
/// let graph = DependencyGraph::from_container(&container);
/// assert_eq!(graph.top_level(), vec!["orders".to_string()]);
/// assert_eq!(graph.to_text(), "orders\n    users\n        db\n    db\n");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "graph-export", derive(Serialize, Deserialize))]
pub struct DependencyGraph {
    /// Bindings in registration order, then stored instances by name
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl DependencyGraph {
    pub fn from_container(container: &Container) -> Self {
        let mut graph = DependencyGraph::default();

        for binding in container.bindings() {
            for dependency in &binding.requires {
                graph.edges.push(GraphEdge {
                    from: binding.name.clone(),
                    to: dependency.service().to_string(),
                    alias: dependency.alias().to_string(),
                });
            }
            graph.nodes.push(GraphNode {
                requires: binding.requires.iter().map(|d| d.service().to_string()).collect(),
                name: binding.name,
                friendly_name: binding.friendly_name,
                lifetime: Some(binding.lifetime),
                event_source: binding.event_source,
                event_listener: binding.event_listener,
            });
        }

        for name in container.instance_names() {
            if container.is_plain_instance(&name) {
                graph.nodes.push(GraphNode {
                    friendly_name: name.clone(),
                    name,
                    lifetime: None,
                    requires: Vec::new(),
                    event_source: Vec::new(),
                    event_listener: Vec::new(),
                });
            }
        }

        tracing::debug!(nodes = graph.nodes.len(), edges = graph.edges.len(), "built dependency graph");
        graph
    }

    pub fn node(&self, name: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    fn bindings(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.iter().filter(|n| !n.is_instance())
    }

    /// Registered services no other binding depends on, in registration order.
    pub fn top_level(&self) -> Vec<String> {
        let required: HashSet<&str> = self.edges.iter().map(|e| e.to.as_str()).collect();
        self.bindings()
            .filter(|n| !required.contains(n.name.as_str()))
            .map(|n| n.name.clone())
            .collect()
    }

    /// One plus the weight of every dependency, recursively.
    ///
    /// A dependency already on the current path counts once.
    pub fn weight(&self, name: &str) -> usize {
        self.weight_memo(name, &mut HashMap::new(), &mut Vec::new())
    }

    fn weight_memo<'g>(
        &'g self,
        name: &'g str,
        memo: &mut HashMap<&'g str, usize>,
        path: &mut Vec<&'g str>,
    ) -> usize {
        if let Some(&known) = memo.get(name) {
            return known;
        }
        if path.contains(&name) {
            return 1;
        }

        let mut sum = 1;
        if let Some(node) = self.node(name) {
            path.push(name);
            for dependency in &node.requires {
                sum += self.weight_memo(dependency, memo, path);
            }
            path.pop();
        }
        memo.insert(name, sum);
        sum
    }

    /// Registration index of a binding; unregistered names sort after all.
    fn registration_index(&self, name: &str) -> usize {
        self.bindings()
            .position(|n| n.name == name)
            .unwrap_or_else(|| self.bindings().count())
    }

    /// Indented dependency tree from the top-level services.
    ///
    /// Each level is indented four spaces. Siblings are ordered heaviest
    /// first, earlier registrations breaking ties. A dependency that would
    /// revisit its own ancestor is printed but not expanded.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let mut path = Vec::new();
        self.visit(&self.top_level(), 0, &mut path, &mut |name: &str, depth: usize| {
            let _ = writeln!(out, "{}{}", "    ".repeat(depth), name);
        });
        out
    }

    fn visit(
        &self,
        names: &[String],
        depth: usize,
        path: &mut Vec<String>,
        visitor: &mut dyn FnMut(&str, usize),
    ) {
        let count = names.len() as i64;
        let mut ordered = names.to_vec();
        ordered.sort_by_key(|name| {
            let score = self.weight(name) as i64 * count - self.registration_index(name) as i64;
            std::cmp::Reverse(score)
        });

        for name in &ordered {
            visitor(name, depth);
            if path.contains(name) {
                continue;
            }
            let requires = self.node(name).map(|n| n.requires.clone()).unwrap_or_default();
            path.push(name.clone());
            self.visit(&requires, depth + 1, path, visitor);
            path.pop();
        }
    }

    /// GraphViz record statement for one node, followed by its edges.
    ///
    /// Listened events are shown as `\>` groups and sent events as groups
    /// closed by `\>`, each sorted and split every four events. Stored
    /// instances are labelled `(instance)`.
    pub fn dot_statement(&self, name: &str) -> String {
        let node = match self.node(name) {
            Some(node) if !node.is_instance() => node,
            _ => return format!("{} [ shape=\"record\", label=\"{} | (instance)\" ]", name, name),
        };

        let label = &node.friendly_name;
        let mut statement = format!(
            "{} [ shape=\"record\", label=\"{}{}{}\" ]",
            label,
            label,
            listener_groups(&node.event_listener),
            source_groups(&node.event_source),
        );

        for dependency in &node.requires {
            let target = self
                .node(dependency)
                .filter(|n| !n.is_instance())
                .map_or(dependency.as_str(), |n| n.friendly_name.as_str());
            let _ = write!(statement, "; {} -> {}", label, target);
        }
        statement
    }

    /// Whole graph as a GraphViz `digraph`.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph Dependencies {\n");
        for node in &self.nodes {
            let _ = writeln!(out, "    {};", self.dot_statement(&node.name));
        }
        out.push_str("}\n");
        out
    }

    #[cfg(feature = "graph-export")]
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn sorted(events: &[String]) -> Vec<&str> {
    let mut events: Vec<&str> = events.iter().map(String::as_str).collect();
    events.sort_unstable();
    events
}

fn listener_groups(events: &[String]) -> String {
    if events.is_empty() {
        return String::new();
    }
    let mut out = String::from(" | \\>");
    for (i, event) in sorted(events).into_iter().enumerate() {
        out.push(' ');
        out.push_str(event);
        if i % EVENTS_PER_GROUP == EVENTS_PER_GROUP - 1 {
            out.push_str(" | \\>");
        }
    }
    out
}

fn source_groups(events: &[String]) -> String {
    if events.is_empty() {
        return String::new();
    }
    let mut out = String::from(" |");
    for (i, event) in sorted(events).into_iter().enumerate() {
        out.push(' ');
        out.push_str(event);
        if i % EVENTS_PER_GROUP == EVENTS_PER_GROUP - 1 {
            out.push_str(" \\> |");
        }
    }
    out.push_str(" \\>");
    out
}
