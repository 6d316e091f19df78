use ferrous_ioc::{Container, Dependency, DiError, Operation, Resolver, ServiceFn, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct Foo;

#[derive(Debug)]
struct Bar {
    foo: Arc<Foo>,
}

fn foo_bar() -> Container {
    let container = Container::new();
    container.register("_foo").unwrap().with_constructor(|_| Ok(Foo));
    container
        .register("_bar")
        .unwrap()
        .with_constructor(|ctx| Ok(Bar { foo: ctx.get::<Foo>("_foo")? }))
        .with_dependencies(["_foo"]);
    container
}

#[test]
fn test_dependencies_are_injected() {
    let container = foo_bar();

    let bar1 = container.resolve::<Bar>("_bar", &[]).unwrap();
    let bar2 = container.resolve::<Bar>("_bar", &[]).unwrap();

    assert!(!Arc::ptr_eq(&bar1, &bar2));
    assert!(!Arc::ptr_eq(&bar1.foo, &bar2.foo));
}

#[test]
fn test_singleton_returns_same_instance() {
    let container = Container::new();
    container.register("_foo").unwrap().with_constructor(|_| Ok(Foo)).as_singleton();

    let foo1 = container.resolve::<Foo>("_foo", &[]).unwrap();
    let foo2 = container.resolve::<Foo>("_foo", &[]).unwrap();
    assert!(Arc::ptr_eq(&foo1, &foo2));
    assert_eq!(container.instance_names(), vec!["_foo".to_string()]);
}

#[test]
fn test_diamond_shares_singleton_dependency() {
    struct Left(Arc<Foo>);
    struct Right(Arc<Foo>);
    struct Top(Arc<Left>, Arc<Right>);

    let container = Container::new();
    container.register("foo").unwrap().with_constructor(|_| Ok(Foo)).as_singleton();
    container
        .register("left")
        .unwrap()
        .with_constructor(|ctx| Ok(Left(ctx.get("foo")?)))
        .with_dependencies(["foo"]);
    container
        .register("right")
        .unwrap()
        .with_constructor(|ctx| Ok(Right(ctx.get("foo")?)))
        .with_dependencies(["foo"]);
    container
        .register("top")
        .unwrap()
        .with_constructor(|ctx| Ok(Top(ctx.get("left")?, ctx.get("right")?)))
        .with_dependencies(["left", "right"]);

    let top = container.resolve::<Top>("top", &[]).unwrap();
    assert!(Arc::ptr_eq(&top.0 .0, &top.1 .0));
}

#[test]
fn test_dependencies_resolve_in_declaration_order() {
    let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let container = Container::new();

    for name in ["a", "b", "c"] {
        let order = order.clone();
        container.register(name).unwrap().with_constructor(move |ctx| {
            order.lock().push(ctx.service_name().to_string());
            Ok(Foo)
        });
    }
    container
        .register("root")
        .unwrap()
        .with_constructor(|_| Ok(Foo))
        .with_dependencies(["c", "a", "b"]);

    container.resolve_any("root", &[]).unwrap();
    assert_eq!(*order.lock(), vec!["c", "a", "b"]);
}

#[test]
fn test_aliased_dependency() {
    let container = Container::new();
    container.register("_foo").unwrap().with_constructor(|_| Ok(Foo));
    container
        .register("_bar")
        .unwrap()
        .with_constructor(|ctx| {
            assert!(!ctx.has_dependency("_foo"));
            Ok(Bar { foo: ctx.get::<Foo>("primary")? })
        })
        .with_dependency(Dependency::aliased("_foo", "primary"));

    assert!(container.resolve::<Bar>("_bar", &[]).is_ok());
}

#[test]
fn test_missing_service_message() {
    let container = Container::new();
    let err = container.resolve_any("_missing", &[]).unwrap_err();
    assert_eq!(err.to_string(), "Load was called for undefined service '_missing'.");

    let err = container.configure("_missing", &[]).unwrap_err();
    assert!(matches!(err, DiError::NotFound { operation: Operation::Configure, .. }));
}

#[test]
fn test_missing_dependency_fails_resolution() {
    let container = Container::new();
    container
        .register("_bar")
        .unwrap()
        .with_constructor(|ctx| Ok(Bar { foo: ctx.get::<Foo>("_foo")? }))
        .with_dependencies(["_foo"]);

    let err = container.resolve::<Bar>("_bar", &[]).unwrap_err();
    assert_eq!(err.to_string(), "Load was called for undefined service '_foo'.");
}

#[test]
fn test_undeclared_dependency_is_an_error() {
    let container = Container::new();
    container.register("_foo").unwrap().with_constructor(|_| Ok(Foo));
    container
        .register("_bar")
        .unwrap()
        .with_constructor(|ctx| Ok(Bar { foo: ctx.get::<Foo>("_foo")? }));

    match container.resolve::<Bar>("_bar", &[]) {
        Err(DiError::UndeclaredDependency { service, dependency }) => {
            assert_eq!(service, "_bar");
            assert_eq!(dependency, "_foo");
        }
        other => panic!("unexpected: {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_type_mismatch() {
    let container = foo_bar();
    let err = container.resolve::<Bar>("_foo", &[]).unwrap_err();
    assert!(matches!(err, DiError::TypeMismatch { .. }));
}

#[test]
fn test_factory_error_is_wrapped_and_nothing_cached() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();

    let container = Container::new();
    container
        .register("_flaky")
        .unwrap()
        .with_constructor(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err("not yet".into());
            }
            Ok(Foo)
        })
        .as_singleton();

    let err = container.resolve::<Foo>("_flaky", &[]).unwrap_err();
    assert_eq!(err.to_string(), "Factory for '_flaky' failed: not yet");
    assert!(container.instance_names().is_empty());

    let foo1 = container.resolve::<Foo>("_flaky", &[]).unwrap();
    let foo2 = container.resolve::<Foo>("_flaky", &[]).unwrap();
    assert!(Arc::ptr_eq(&foo1, &foo2));
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn test_failed_dependency_leaves_dependent_uncached() {
    let container = Container::new();
    container
        .register("_foo")
        .unwrap()
        .with_constructor(|_| Err::<Foo, _>("broken".into()))
        .as_singleton();
    container
        .register("_bar")
        .unwrap()
        .with_constructor(|ctx| Ok(Bar { foo: ctx.get::<Foo>("_foo")? }))
        .with_dependencies(["_foo"])
        .as_singleton();

    assert!(container.resolve::<Bar>("_bar", &[]).is_err());
    assert!(container.instance_names().is_empty());
}

#[test]
fn test_register_instance() {
    let container = Container::new();
    let instance = Arc::new(Foo);
    container.register_instance("_foo", instance.clone());

    let resolved = container.resolve::<Foo>("_foo", &[]).unwrap();
    assert!(Arc::ptr_eq(&instance, &resolved));
}

#[test]
fn test_with_instance_feeds_dependencies() {
    let container = Container::new();
    container.register("_foo").unwrap().with_instance(Arc::new(Foo));
    container
        .register("_bar")
        .unwrap()
        .with_constructor(|ctx| Ok(Bar { foo: ctx.get::<Foo>("_foo")? }))
        .with_dependencies(["_foo"]);

    let bar = container.resolve::<Bar>("_bar", &[]).unwrap();
    let foo = container.resolve::<Foo>("_foo", &[]).unwrap();
    assert!(Arc::ptr_eq(&bar.foo, &foo));
}

#[test]
fn test_reregistration_last_write_wins() {
    let container = Container::new();
    container.register("n").unwrap().with_constructor(|_| Ok(1_i64));
    container.register("n").unwrap().with_constructor(|_| Ok(2_i64));

    assert_eq!(*container.resolve::<i64>("n", &[]).unwrap(), 2);
}

#[test]
fn test_service_function() {
    struct Rate(i64);

    let container = Container::new();
    container.register("rate").unwrap().with_constructor(|_| Ok(Rate(3)));
    container
        .register("total")
        .unwrap()
        .with_function(|ctx, args| {
            let rate = ctx.get::<Rate>("rate")?;
            let sum: i64 = args.iter().filter_map(Value::as_i64).sum();
            Ok(Value::from(sum * rate.0))
        })
        .with_dependencies(["rate"]);

    let total = container.resolve::<ServiceFn>("total", &[]).unwrap();
    assert_eq!(total.call(&[Value::from(1), Value::from(2)]).unwrap(), Value::from(9));
    assert_eq!(total.injection().service_name(), "total");
    assert_eq!(container.binding("total").unwrap().friendly_name, "total");
}

#[test]
fn test_trait_object_service() {
    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct English;
    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".into()
        }
    }

    let container = Container::new();
    container
        .register("greeter")
        .unwrap()
        .with_constructor(|_| Ok(Arc::new(English) as Arc<dyn Greeter>))
        .as_singleton();
    container
        .register("user")
        .unwrap()
        .with_constructor(|ctx| Ok(ctx.get_trait::<dyn Greeter>("greeter")?.greet()))
        .with_dependencies(["greeter"]);

    assert_eq!(container.resolve_trait::<dyn Greeter>("greeter", &[]).unwrap().greet(), "hello");
    assert_eq!(*container.resolve::<String>("user", &[]).unwrap(), "hello");
}

#[test]
fn test_clones_share_state() {
    let container = Container::new();
    let other = container.clone();
    other.register("_foo").unwrap().with_constructor(|_| Ok(Foo)).as_singleton();

    let a = container.resolve::<Foo>("_foo", &[]).unwrap();
    let b = other.resolve::<Foo>("_foo", &[]).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
#[should_panic(expected = "Failed to resolve _missing")]
fn test_resolve_required_panics() {
    let container = Container::new();
    let _ = container.resolve_required::<Foo>("_missing");
}
