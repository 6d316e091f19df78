#![no_main]

use libfuzzer_sys::fuzz_target;
use ferrous_ioc::{Container, DiError, Parameter, Resolver, Value};

// Builds a random dependency graph over a handful of names and resolves
// every node. Resolution must terminate with either an instance or an error,
// never a panic or a hang, whatever cycles the input creates.
fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    const NAMES: [&str; 6] = ["a", "b", "c", "d", "e", "f"];
    let container = Container::new();

    for (i, chunk) in data.chunks(2).take(NAMES.len()).enumerate() {
        let mask = chunk[0];
        let flags = chunk.get(1).copied().unwrap_or(0);
        let requires: Vec<&str> = NAMES
            .iter()
            .enumerate()
            .filter(|(bit, _)| mask & (1 << bit) != 0)
            .map(|(_, name)| *name)
            .collect();

        let config = container
            .register(NAMES[i])
            .unwrap()
            .with_constructor(|ctx| Ok(ctx.parameters().len()))
            .with_dependencies(requires)
            .with_parameters([Parameter::integer("n")]);
        if flags & 1 != 0 {
            config.as_singleton();
        }
    }

    let arg = [Value::from(i64::from(data[0]))];
    for name in NAMES {
        match container.resolve::<usize>(name, &arg) {
            // a singleton first built as a dependency keeps its empty parameters
            Ok(count) => assert!(*count <= 1),
            Err(DiError::Circular(path)) => {
                assert!(path.len() >= 2);
                assert_eq!(path.first(), Some(&name.to_string()));
            }
            Err(DiError::NotFound { .. }) | Err(DiError::Factory { .. }) => {}
            Err(other) => panic!("unexpected error: {}", other),
        }
    }

    let _ = container.resolve::<usize>("a", &[Value::from("not a number")]);
});
