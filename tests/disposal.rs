use ferrous_wire::{Container, Context, Dispose, Initialize, Key, Resolver, Unmanaged};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

type Log = Arc<Mutex<Vec<String>>>;

fn log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

struct Database;
struct Cache {
    _db: Arc<Database>,
}
struct Api {
    _cache: Arc<Cache>,
}

fn wire(container: &Container, log: &Log) {
    let l = log.clone();
    container
        .factory(|| Arc::new(Database))
        .disposer(move |_| l.lock().unwrap().push("database".into()))
        .register()
        .unwrap();
    let l = log.clone();
    container
        .factory(|db: Arc<Database>| Arc::new(Cache { _db: db }))
        .disposer(move |_| l.lock().unwrap().push("cache".into()))
        .register()
        .unwrap();
    let l = log.clone();
    container
        .factory(|cache: Arc<Cache>| Arc::new(Api { _cache: cache }))
        .disposer(move |_| l.lock().unwrap().push("api".into()))
        .register()
        .unwrap();
}

#[test]
fn test_destroy_disposes_in_reverse_creation_order() {
    let log = log();
    let container = Container::new();
    wire(&container, &log);

    container.get::<Api>(&Context::background()).unwrap();
    container.destroy();

    assert_eq!(*log.lock().unwrap(), vec!["api", "cache", "database"]);
}

#[test]
fn test_destroy_runs_once() {
    let log = log();
    let container = Container::new();
    wire(&container, &log);

    container.get::<Api>(&Context::background()).unwrap();
    container.destroy();
    container.destroy();

    assert_eq!(log.lock().unwrap().len(), 3);
}

#[test]
fn test_destroy_skips_uncreated_components() {
    let log = log();
    let container = Container::new();
    wire(&container, &log);

    container.get::<Database>(&Context::background()).unwrap();
    container.destroy();

    assert_eq!(*log.lock().unwrap(), vec!["database"]);
}

#[test]
fn test_singletons_recreated_after_destroy() {
    let container = Container::new();
    container.factory(|| Arc::new(Database)).register().unwrap();

    let ctx = Context::background();
    let before = container.get::<Database>(&ctx).unwrap();
    container.destroy_singletons();
    let after = container.get::<Database>(&ctx).unwrap();
    assert!(!Arc::ptr_eq(&before, &after));
}

struct Connection {
    open: AtomicBool,
    initialized: AtomicUsize,
}

impl Connection {
    fn new() -> Self {
        Self { open: AtomicBool::new(true), initialized: AtomicUsize::new(0) }
    }
}

impl Initialize for Connection {
    fn initialize(&self) {
        self.initialized.fetch_add(1, Ordering::SeqCst);
    }
}

impl Dispose for Connection {
    fn dispose(&self) {
        self.open.store(false, Ordering::SeqCst);
    }
}

#[test]
fn test_lifecycle_traits() {
    let container = Container::new();
    container
        .factory(|| Arc::new(Connection::new()))
        .initializable()
        .disposable()
        .register()
        .unwrap();

    let ctx = Context::background();
    let conn = container.get::<Connection>(&ctx).unwrap();
    container.get::<Connection>(&ctx).unwrap();
    assert_eq!(conn.initialized.load(Ordering::SeqCst), 1);
    assert!(conn.open.load(Ordering::SeqCst));

    container.destroy();
    assert!(!conn.open.load(Ordering::SeqCst));
}

#[test]
fn test_initializers_run_in_order_before_dependents() {
    let log = log();
    let container = Container::new();

    let (a, b) = (log.clone(), log.clone());
    container
        .factory(|| Arc::new(Database))
        .initializer(move |_| a.lock().unwrap().push("db:first".into()))
        .initializer(move |_| b.lock().unwrap().push("db:second".into()))
        .register()
        .unwrap();
    let l = log.clone();
    container
        .register(move |db: Arc<Database>| {
            l.lock().unwrap().push("cache:ctor".into());
            Arc::new(Cache { _db: db })
        })
        .unwrap();

    container.get::<Cache>(&Context::background()).unwrap();
    assert_eq!(*log.lock().unwrap(), vec!["db:first", "db:second", "cache:ctor"]);
}

#[test]
fn test_destroy_object() {
    let log = log();
    let container = Container::new();
    wire(&container, &log);

    let ctx = Context::background();
    let first = container.get::<Database>(&ctx).unwrap();
    let removed = container.destroy_object(Key::of::<Database>()).unwrap();
    assert!(removed.is_some());
    assert_eq!(*log.lock().unwrap(), vec!["database"]);

    let second = container.get::<Database>(&ctx).unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert!(container.destroy_object(Key::of::<Api>()).unwrap().is_none());
}

#[test]
fn test_prototypes_are_not_tracked() {
    let disposed = Arc::new(AtomicUsize::new(0));
    let counter = disposed.clone();

    let container = Container::new();
    container
        .factory(|| Arc::new(Database))
        .prototype()
        .disposer(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .register()
        .unwrap();

    container.get::<Database>(&Context::background()).unwrap();
    container.destroy();
    assert_eq!(disposed.load(Ordering::SeqCst), 0);
}

#[test]
fn test_unmanaged_instances_belong_to_caller() {
    struct Worker {
        connections: Unmanaged<Connection>,
    }

    let container = Container::new();
    container
        .factory(|| Arc::new(Connection::new()))
        .disposable()
        .register()
        .unwrap();
    container
        .register(|connections: Unmanaged<Connection>| Arc::new(Worker { connections }))
        .unwrap();

    let ctx = Context::background();
    let worker = container.get::<Worker>(&ctx).unwrap();
    let (conn, handle) = worker.connections.get().unwrap();
    let (other, _) = worker.connections.get().unwrap();
    assert!(!Arc::ptr_eq(&conn, &other));

    let handle = handle.expect("disposable component yields a handle");
    assert_eq!(handle.component(), std::any::type_name::<Connection>());

    container.destroy();
    assert!(conn.open.load(Ordering::SeqCst));

    handle.dispose();
    assert!(!conn.open.load(Ordering::SeqCst));
    assert!(handle.is_disposed());
}

#[test]
fn test_no_value_factories_ignore_hooks() {
    let ran = Arc::new(AtomicUsize::new(0));
    let counter = ran.clone();

    let container = Container::new();
    let factory = container
        .factory(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .disposer(|_| panic!("never called"))
        .startup(0)
        .register()
        .unwrap()
        .unwrap();
    assert!(!factory.has_disposers());

    container.initialize(&Context::background()).unwrap();
    container.destroy();
    assert_eq!(ran.load(Ordering::SeqCst), 1);
}
