use ferrous_ioc::{Container, DependencyGraph, Dependency, EventListener, Lifetime, ServiceError, Value};
use std::sync::Arc;

struct Config;
struct Database;
struct Mailer;
struct Signup;

impl EventListener for Mailer {
    fn on_event(&self, _event: &str, _args: &[Value]) -> Result<(), ServiceError> {
        Ok(())
    }
}

fn application() -> Container {
    let container = Container::new();
    container.register_instance("config", Arc::new(Config));
    container
        .register("db")
        .unwrap()
        .with_constructor(|_| Ok(Database))
        .with_dependencies(["config"])
        .as_singleton();
    container
        .register("mailer")
        .unwrap()
        .with_constructor(|_| Ok(Mailer))
        .with_dependency(Dependency::aliased("config", "settings"))
        .receiving_events(["UserCreated"]);
    container
        .register("signup")
        .unwrap()
        .with_constructor(|_| Ok(Signup))
        .with_dependencies(["db", "mailer"])
        .sending_events(["UserCreated"]);
    container
}

#[test]
fn test_nodes_and_edges() {
    let graph = DependencyGraph::from_container(&application());

    let names: Vec<&str> = graph.nodes.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["db", "mailer", "signup", "config"]);

    let config = graph.node("config").unwrap();
    assert!(config.is_instance());
    assert_eq!(graph.node("db").unwrap().lifetime, Some(Lifetime::Singleton));
    assert_eq!(graph.node("signup").unwrap().lifetime, Some(Lifetime::Transient));

    let aliased = graph.edges.iter().find(|e| e.from == "mailer").unwrap();
    assert_eq!(aliased.to, "config");
    assert_eq!(aliased.alias, "settings");
    assert_eq!(graph.edges.len(), 4);
}

#[test]
fn test_text_tree() {
    let graph = DependencyGraph::from_container(&application());

    assert_eq!(graph.top_level(), vec!["signup".to_string()]);
    assert_eq!(graph.weight("signup"), 5);
    assert_eq!(
        graph.to_text(),
        "signup\n    db\n        config\n    mailer\n        config\n"
    );
}

#[test]
fn test_dot_output() {
    let graph = DependencyGraph::from_container(&application());

    assert_eq!(
        graph.to_dot(),
        concat!(
            "digraph Dependencies {\n",
            "    Database [ shape=\"record\", label=\"Database\" ]; Database -> config;\n",
            "    Mailer [ shape=\"record\", label=\"Mailer | \\> UserCreated\" ]; Mailer -> config;\n",
            "    Signup [ shape=\"record\", label=\"Signup | UserCreated \\>\" ]; Signup -> Database; Signup -> Mailer;\n",
            "    config [ shape=\"record\", label=\"config | (instance)\" ];\n",
            "}\n",
        )
    );
}

#[test]
fn test_resolved_singletons_are_not_instances() {
    let container = application();
    container.resolve_any("db", &[]).unwrap();

    let graph = DependencyGraph::from_container(&container);
    assert_eq!(graph.nodes.len(), 4);
    assert!(!graph.node("db").unwrap().is_instance());
}

#[test]
fn test_empty_container() {
    let graph = DependencyGraph::from_container(&Container::new());
    assert!(graph.nodes.is_empty());
    assert_eq!(graph.to_text(), "");
    assert_eq!(graph.to_dot(), "digraph Dependencies {\n}\n");
}

#[cfg(feature = "graph-export")]
#[test]
fn test_json_export() {
    let graph = DependencyGraph::from_container(&application());
    let json = graph.to_json().unwrap();

    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["nodes"].as_array().unwrap().len(), 4);
    assert_eq!(parsed["edges"][0]["from"], "db");

    let back: DependencyGraph = serde_json::from_str(&json).unwrap();
    assert_eq!(back, graph);
}
