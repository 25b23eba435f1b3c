use ferrous_wire::{Container, Context, DiError, Key, Resolver};
use std::sync::Arc;

struct Config(&'static str);
struct Service {
    config: Arc<Config>,
}

#[test]
fn test_child_delegates_to_parent() {
    let parent = Container::new();
    parent.register_value(Arc::new(Config("parent"))).register().unwrap();

    let child = Container::with_parent(&parent);
    assert!(child.parent().unwrap().same(&parent));
    assert!(!child.contains(Key::of::<Config>()));

    let ctx = Context::background();
    let from_child = child.get::<Config>(&ctx).unwrap();
    let from_parent = parent.get::<Config>(&ctx).unwrap();
    assert!(Arc::ptr_eq(&from_child, &from_parent));
}

#[test]
fn test_child_overrides_parent() {
    let parent = Container::new();
    parent.register_value(Arc::new(Config("parent"))).register().unwrap();

    let child = Container::with_parent(&parent);
    child.register_value(Arc::new(Config("child"))).register().unwrap();

    let ctx = Context::background();
    assert_eq!(child.get::<Config>(&ctx).unwrap().0, "child");
    assert_eq!(parent.get::<Config>(&ctx).unwrap().0, "parent");
}

#[test]
fn test_child_component_uses_parent_dependency() {
    let parent = Container::new();
    parent.register_value(Arc::new(Config("shared"))).register().unwrap();

    let child = Container::with_parent(&parent);
    child.register(|config: Arc<Config>| Arc::new(Service { config })).unwrap();

    let service = child.get::<Service>(&Context::background()).unwrap();
    assert_eq!(service.config.0, "shared");
    assert!(matches!(
        parent.get::<Service>(&Context::background()),
        Err(DiError::CandidateNotFound(_))
    ));
}

#[test]
fn test_parent_components_resolve_in_parent() {
    let parent = Container::new();
    parent.register_value(Arc::new(Config("parent"))).register().unwrap();
    parent.register(|config: Arc<Config>| Arc::new(Service { config })).unwrap();

    let child = Container::with_parent(&parent);
    child.register_value(Arc::new(Config("child"))).register().unwrap();

    // the parent's service is built entirely from the parent
    let service = child.get::<Service>(&Context::background()).unwrap();
    assert_eq!(service.config.0, "parent");
}

#[test]
fn test_grandparent_chain() {
    let root = Container::new();
    root.register_value(Arc::new(Config("root"))).register().unwrap();
    let middle = Container::with_parent(&root);
    let leaf = Container::with_parent(&middle);
    leaf.register(|config: Arc<Config>| Arc::new(Service { config })).unwrap();

    assert_eq!(leaf.get::<Service>(&Context::background()).unwrap().config.0, "root");
}

#[test]
fn test_missing_everywhere() {
    let parent = Container::new();
    let child = Container::with_parent(&parent);
    child.register(|config: Arc<Config>| Arc::new(Service { config })).unwrap();

    assert!(matches!(
        child.get::<Service>(&Context::background()),
        Err(DiError::MissingDependency { .. })
    ));
}

#[test]
fn test_child_uses_parent_scopes() {
    use ferrous_wire::ContextScope;

    let requests = ContextScope::new("request");
    let parent = Container::new();
    parent.register_scope("request", Arc::new(requests.clone())).unwrap();

    let child = Container::with_parent(&parent);
    child.factory(|| Arc::new(Config("request"))).scoped("request").register().unwrap();

    let (ctx, _session) = requests.enter(&Context::background());
    let a = child.get::<Config>(&ctx).unwrap();
    let b = child.get::<Config>(&ctx).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn test_child_lock_is_independent() {
    let parent = Container::new();
    let child = Container::with_parent(&parent);

    child.initialize(&Context::background()).unwrap();
    assert!(child.is_locked());
    assert!(!parent.is_locked());
    parent.register_value(Arc::new(Config("late"))).register().unwrap();

    assert_eq!(child.get::<Config>(&Context::background()).unwrap().0, "late");
}
