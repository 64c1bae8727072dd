use modroute::hot_reload::watch_modules;
use modroute::{RequestView, WebFunction};
use http::Method;
use std::time::Duration;

mod common;
use common::module_tree::{wait_for, ModuleTree};
use common::sources::path_fn;

#[test]
fn test_watch_modules_invalidates_on_change() {
    let tree = ModuleTree::with_files(&[("api.xqm", path_fn("one", "/foo").as_str())]);
    let dispatcher = tree.dispatcher();
    let req = RequestView::new(Method::GET, "/foo");
    assert_eq!(
        dispatcher.resolve(&req, None).unwrap().unwrap().name(),
        "local:one"
    );

    let watcher = watch_modules(dispatcher.store()).expect("watch_modules");
    // allow watcher thread to start
    std::thread::sleep(Duration::from_millis(100));

    tree.write("api.xqm", &path_fn("second", "/foo"));
    assert!(
        wait_for(Duration::from_secs(5), || dispatcher.store().is_stale()),
        "watcher did not invalidate the store"
    );
    assert_eq!(
        dispatcher.resolve(&req, None).unwrap().unwrap().name(),
        "local:second"
    );
    drop(watcher);
}

#[test]
fn test_watch_modules_ignores_other_files() {
    let tree = ModuleTree::with_files(&[
        ("api.xqm", path_fn("one", "/foo").as_str()),
        ("sub/readme.txt", ""),
    ]);
    let dispatcher = tree.dispatcher();
    dispatcher.store().snapshot().unwrap();

    let _watcher = watch_modules(dispatcher.store()).expect("watch_modules");
    std::thread::sleep(Duration::from_millis(100));

    tree.write("notes.txt", "not a module");
    std::thread::sleep(Duration::from_millis(300));
    assert!(!dispatcher.store().is_stale());

    tree.write("sub/.ignore", "");
    assert!(wait_for(Duration::from_secs(5), || dispatcher.store().is_stale()));
}
