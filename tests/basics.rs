use ferrous_wire::{Container, Context, DiError, FactoryFilter, Key, Provider, Resolver, Unmanaged};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug)]
struct Config {
    port: u16,
}

#[derive(Debug)]
struct Server {
    config: Arc<Config>,
    name: String,
}

#[test]
fn test_value_singleton() {
    let container = Container::new();
    container.register_value(Arc::new(42usize)).register().unwrap();
    container.register_value(Arc::new("hello".to_string())).register().unwrap();

    let ctx = Context::background();
    let num1 = container.get::<usize>(&ctx).unwrap();
    let num2 = container.get::<usize>(&ctx).unwrap();
    let str1 = container.get::<String>(&ctx).unwrap();

    assert_eq!(*num1, 42);
    assert_eq!(*str1, "hello");
    assert!(Arc::ptr_eq(&num1, &num2));
}

#[test]
fn test_constructor_with_dependencies() {
    let container = Container::new();
    container
        .register(|config: Arc<Config>| {
            Arc::new(Server {
                config,
                name: "MyServer".to_string(),
            })
        })
        .unwrap();
    container.register_value(Arc::new(Config { port: 8080 })).register().unwrap();

    let server = container.get::<Server>(&Context::background()).unwrap();
    assert_eq!(server.config.port, 8080);
    assert_eq!(server.name, "MyServer");
}

#[test]
fn test_singleton_constructed_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let container = Container::new();
    container
        .register(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Arc::new(Config { port: 1 })
        })
        .unwrap();

    let ctx = Context::background();
    let a = container.get::<Config>(&ctx).unwrap();
    let b = container.get::<Config>(&ctx).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_prototype_creates_new_instances() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let container = Container::new();
    container
        .factory(move || Arc::new(format!("instance-{}", counter.fetch_add(1, Ordering::SeqCst))))
        .prototype()
        .register()
        .unwrap();

    let ctx = Context::background();
    let a = container.get::<String>(&ctx).unwrap();
    let b = container.get::<String>(&ctx).unwrap();
    assert_eq!(*a, "instance-0");
    assert_eq!(*b, "instance-1");
    assert!(!Arc::ptr_eq(&a, &b));
}

#[test]
fn test_prototype_twice_in_one_constructor() {
    struct Foo;
    struct Pair {
        left: Arc<Foo>,
        right: Arc<Foo>,
    }

    let container = Container::new();
    container.factory(|| Arc::new(Foo)).prototype().register().unwrap();
    container
        .register(|left: Arc<Foo>, right: Arc<Foo>| Arc::new(Pair { left, right }))
        .unwrap();

    let pair = container.get::<Pair>(&Context::background()).unwrap();
    assert!(!Arc::ptr_eq(&pair.left, &pair.right));
}

#[test]
fn test_option_bundle_applies_every_option() {
    use ferrous_wire::FactoryBuilder;

    fn fallback<T: ?Sized + Send + Sync + 'static>(builder: FactoryBuilder<'_, T>) -> FactoryBuilder<'_, T> {
        builder.alternative().prototype()
    }

    let container = Container::new();
    container.factory(|| Arc::new(Config { port: 1 })).apply(fallback).register().unwrap();
    container.factory(|| Arc::new(Config { port: 2 })).register().unwrap();
    container.factory(|| Arc::new(String::from("fresh"))).apply(fallback).register().unwrap();

    let ctx = Context::background();
    assert_eq!(container.get::<Config>(&ctx).unwrap().port, 2);
    let a = container.get::<String>(&ctx).unwrap();
    let b = container.get::<String>(&ctx).unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
}

#[test]
fn test_values_are_always_singletons() {
    let container = Container::new();
    let value = Arc::new(Config { port: 9 });
    container.register_value(value.clone()).prototype().register().unwrap();

    let ctx = Context::background();
    let factory = container.filter(FactoryFilter::new()).into_iter().next().unwrap();
    assert!(factory.is_singleton());
    assert!(Arc::ptr_eq(&container.get::<Config>(&ctx).unwrap(), &value));
}

#[derive(Debug)]
struct ParseFailure;

impl std::fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("bad port")
    }
}

impl std::error::Error for ParseFailure {}

#[test]
fn test_constructor_error_is_wrapped() {
    let container = Container::new();
    container
        .register(|| -> Result<Arc<Config>, ParseFailure> { Err(ParseFailure) })
        .unwrap();

    match container.get::<Config>(&Context::background()) {
        Err(DiError::ConstructorFailed { component, source }) => {
            assert_eq!(component, std::any::type_name::<Config>());
            assert_eq!(source.to_string(), "bad port");
        }
        other => panic!("unexpected: {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_constructor_error_propagates_through_dependents() {
    let container = Container::new();
    container
        .register(|| -> Result<Arc<Config>, ParseFailure> { Err(ParseFailure) })
        .unwrap();
    container
        .register(|config: Arc<Config>| Arc::new(Server { config, name: String::new() }))
        .unwrap();

    let err = container.get::<Server>(&Context::background()).unwrap_err();
    assert!(matches!(err, DiError::ConstructorFailed { component, .. } if component == std::any::type_name::<Config>()));
}

#[test]
fn test_missing_dependencies_reported_together() {
    struct Cache;
    struct Db;
    struct Repo;

    let container = Container::new();
    container
        .register(|_cache: Arc<Cache>, _db: Arc<Db>, _config: Arc<Config>| Arc::new(Repo))
        .unwrap();
    container.register_value(Arc::new(Config { port: 1 })).register().unwrap();

    match container.get::<Repo>(&Context::background()) {
        Err(DiError::MissingDependency { component, missing }) => {
            assert_eq!(component, std::any::type_name::<Repo>());
            assert_eq!(missing, vec![std::any::type_name::<Cache>(), std::any::type_name::<Db>()]);
        }
        other => panic!("unexpected: {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_candidate_not_found() {
    let container = Container::new();
    let err = container.get::<Config>(&Context::background()).unwrap_err();
    assert!(matches!(err, DiError::CandidateNotFound(name) if name == std::any::type_name::<Config>()));
    assert!(!container.contains(Key::of::<Config>()));
}

#[test]
fn test_reserved_shapes_rejected() {
    let container = Container::new();
    let err = container.register(|| Arc::new(Context::background())).unwrap_err();
    assert!(matches!(err, DiError::InvalidProviderShape(_)));

    let err = container.register(|_ctx: Arc<Context>| Arc::new(1u8)).unwrap_err();
    assert!(matches!(err, DiError::InvalidProviderShape(_)));

    assert!(container.filter(FactoryFilter::new()).is_empty());
}

#[test]
fn test_context_is_injected() {
    struct Tenant(&'static str);
    struct Greeting(String);

    let container = Container::new();
    container
        .factory(|ctx: Context| {
            let tenant = ctx.value::<Tenant>().map(|t| t.0).unwrap_or("nobody");
            Arc::new(Greeting(format!("hello {}", tenant)))
        })
        .prototype()
        .register()
        .unwrap();

    let ctx = Context::background().with_value(Tenant("acme"));
    assert_eq!(container.get::<Greeting>(&ctx).unwrap().0, "hello acme");
    assert_eq!(container.get::<Greeting>(&Context::background()).unwrap().0, "hello nobody");
}

#[test]
fn test_container_is_injected() {
    struct Locator(Container);

    let container = Container::new();
    container.register(|c: Container| Arc::new(Locator(c))).unwrap();
    container.register_value(Arc::new(7u32)).register().unwrap();

    let ctx = Context::background();
    let locator = container.get::<Locator>(&ctx).unwrap();
    assert!(locator.0.same(&container));
    assert_eq!(*locator.0.get::<u32>(&ctx).unwrap(), 7);
}

#[test]
fn test_inject_dependency_shapes() {
    let container = Container::new();
    container.factory(|| Arc::new(Config { port: 3 })).prototype().register().unwrap();

    let ctx = Context::background();
    let direct = container.inject::<Arc<Config>>(&ctx).unwrap();
    assert_eq!(direct.port, 3);

    let provider = container.inject::<Provider<Config>>(&ctx).unwrap();
    assert!(!Arc::ptr_eq(&provider.get().unwrap(), &provider.get().unwrap()));

    let unmanaged = container.inject::<Unmanaged<Config>>(&ctx).unwrap();
    let (value, handle) = unmanaged.get().unwrap();
    assert_eq!(value.port, 3);
    assert!(handle.is_none());
}

#[test]
fn test_resolve_by_key() {
    let container = Container::new();
    container.register_value(Arc::new(Config { port: 80 })).register().unwrap();

    let instance = container
        .resolve(Key::of::<Config>(), &Context::background())
        .unwrap()
        .unwrap();
    assert!(instance.is::<Config>());
    assert_eq!(instance.downcast::<Config>().unwrap().port, 80);
    assert!(instance.downcast::<Server>().is_none());
}

#[test]
fn test_condition_skips_registration() {
    struct Feature;

    let container = Container::new();
    let skipped = container
        .factory(|| Arc::new(Config { port: 1 }))
        .condition(|c, _| c.contains(Key::of::<Feature>()))
        .register()
        .unwrap();
    assert!(skipped.is_none());

    container.register_value(Arc::new(Feature)).register().unwrap();
    let registered = container
        .factory(|| Arc::new(Config { port: 2 }))
        .condition(|c, _| c.contains(Key::of::<Feature>()))
        .register()
        .unwrap();
    assert!(registered.is_some());
    assert_eq!(container.get::<Config>(&Context::background()).unwrap().port, 2);
}

#[test]
fn test_locked_after_initialize() {
    let container = Container::new();
    container.register_value(Arc::new(1u8)).register().unwrap();

    let ctx = Context::background();
    container.initialize(&ctx).unwrap();
    assert!(container.is_locked());

    assert!(matches!(container.register_value(Arc::new(2u16)).register(), Err(DiError::ContainerLocked)));
    assert!(matches!(container.initialize(&ctx), Err(DiError::ContainerLocked)));
    assert!(matches!(
        container.register_scope("request", Arc::new(ferrous_wire::PrototypeScope)),
        Err(DiError::ContainerLocked)
    ));

    // resolution keeps working
    assert_eq!(*container.get::<u8>(&ctx).unwrap(), 1);
}

#[test]
fn test_startup_order() {
    let log = Arc::new(Mutex::new(Vec::new()));

    struct First;
    struct Second;
    struct Third;
    struct Lazy;

    let container = Container::new();
    let l = log.clone();
    container
        .factory(move || {
            l.lock().unwrap().push("third");
            Arc::new(Third)
        })
        .startup(5)
        .register()
        .unwrap();
    let l = log.clone();
    container
        .factory(move || {
            l.lock().unwrap().push("lazy");
            Arc::new(Lazy)
        })
        .register()
        .unwrap();
    let l = log.clone();
    container
        .factory(move || {
            l.lock().unwrap().push("first");
            Arc::new(First)
        })
        .startup(-1)
        .register()
        .unwrap();
    let l = log.clone();
    container
        .factory(move || {
            l.lock().unwrap().push("second");
            Arc::new(Second)
        })
        .startup(5)
        .register()
        .unwrap();

    container.initialize(&Context::background()).unwrap();
    // equal priority keeps registration order
    assert_eq!(*log.lock().unwrap(), vec!["first", "third", "second"]);
}

#[test]
fn test_startup_hook_without_value() {
    let started = Arc::new(AtomicUsize::new(0));
    let counter = started.clone();

    let container = Container::new();
    container.register_value(Arc::new(Config { port: 1 })).register().unwrap();
    let hook = container
        .factory(move |config: Arc<Config>| {
            counter.fetch_add(config.port as usize, Ordering::SeqCst);
        })
        .startup(0)
        .register()
        .unwrap()
        .unwrap();
    assert!(!hook.returns_value());

    container.initialize(&Context::background()).unwrap();
    assert_eq!(started.load(Ordering::SeqCst), 1);
}

#[test]
fn test_startup_failure_aborts_initialize() {
    struct Broken;
    struct After;

    let created = Arc::new(AtomicUsize::new(0));
    let counter = created.clone();

    let container = Container::new();
    container
        .factory(|| -> Result<Arc<Broken>, ParseFailure> { Err(ParseFailure) })
        .startup(1)
        .register()
        .unwrap();
    container
        .factory(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Arc::new(After)
        })
        .startup(2)
        .register()
        .unwrap();

    let err = container.initialize(&Context::background()).unwrap_err();
    assert!(matches!(err, DiError::ConstructorFailed { .. }));
    assert_eq!(created.load(Ordering::SeqCst), 0);
    assert!(container.is_locked());
}

#[test]
fn test_scope_registration_rules() {
    let container = Container::new();
    let scope = Arc::new(ferrous_wire::PrototypeScope);

    assert!(matches!(container.register_scope("   ", scope.clone()), Err(DiError::InvalidScope(_))));
    assert!(matches!(container.register_scope("singleton", scope.clone()), Err(DiError::InvalidScope(_))));
    assert!(matches!(container.register_scope("prototype", scope.clone()), Err(DiError::InvalidScope(_))));
    container.register_scope(" custom ", scope).unwrap();

    container.factory(|| Arc::new(1u8)).scoped("custom").register().unwrap();
    container.factory(|| Arc::new(2u16)).scoped("unknown").register().unwrap();

    let ctx = Context::background();
    assert_eq!(*container.get::<u8>(&ctx).unwrap(), 1);
    assert!(matches!(container.get::<u16>(&ctx), Err(DiError::NoScopeRegistered(name)) if name == "unknown"));
}

#[test]
fn test_filter_queries() {
    struct Marker;

    let container = Container::new();
    container.factory(|| Arc::new(1u8)).primary().register().unwrap();
    container.factory(|| Arc::new(2u16)).prototype().qualify::<Marker>().register().unwrap();
    container.factory(|| Arc::new(3u32)).startup(1).register().unwrap();

    assert_eq!(container.filter(FactoryFilter::new()).len(), 3);
    assert_eq!(container.filter(FactoryFilter::new().primary()).len(), 1);
    assert_eq!(container.filter(FactoryFilter::new().scope("prototype")).len(), 1);
    assert_eq!(container.filter(FactoryFilter::new().qualifier::<Marker>()).len(), 1);
    assert_eq!(container.filter(FactoryFilter::new().assignable_to::<u32>()).len(), 1);
    assert_eq!(
        container
            .filter(FactoryFilter::new().condition(|_, f| f.priority() > 0))
            .len(),
        1
    );
}
