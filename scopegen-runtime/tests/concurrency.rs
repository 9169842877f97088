//! At-most-once creation under concurrent first access

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use scopegen_compiler::{ConstructorMeta, ScopeBuilder, TypeCatalog, TypeMetadata};
use scopegen_runtime::*;

const THREADS: usize = 8;

struct Pool {
    id: usize,
}

fn pool_scope(calls: &Arc<AtomicUsize>, fail: bool) -> ScopeInstance {
    let catalog = TypeCatalog::new()
        .with_type(TypeMetadata::new("Settings"))
        .with_type(TypeMetadata::new("Pool").constructor(ConstructorMeta::new(["Settings"])));
    let plan = ScopeBuilder::create(Arc::new(catalog), "app", "PoolScope")
        .instance("Settings")
        .constructor("Pool")
        .compile()
        .unwrap();

    let calls = Arc::clone(calls);
    let recipes = RecipeTable::new().constructor("Pool", move |_| {
        let id = calls.fetch_add(1, Ordering::SeqCst);
        // Hold the slot in `Creating` long enough for every thread to pile up.
        thread::sleep(Duration::from_millis(50));
        if fail {
            return Err("pool exhausted".into());
        }
        Ok(Instance::new(Pool { id }))
    });

    ScopeInstance::new(&plan, recipes, ValueBindings::new().value("settings", ())).unwrap()
}

fn race<T: Send + 'static>(
    scope: &ScopeInstance,
    access: impl Fn(&ScopeInstance) -> T + Send + Sync + 'static,
) -> Vec<T> {
    let barrier = Arc::new(Barrier::new(THREADS));
    let access = Arc::new(access);

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let scope = scope.clone();
            let barrier = Arc::clone(&barrier);
            let access = Arc::clone(&access);
            thread::spawn(move || {
                barrier.wait();
                access(&scope)
            })
        })
        .collect();

    handles.into_iter().map(|h| h.join().unwrap()).collect()
}

#[test]
fn test_concurrent_first_access_creates_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let scope = pool_scope(&calls, false);

    let results = race(&scope, |scope| scope.get("pool").unwrap());

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let first = &results[0];
    assert!(results.iter().all(|instance| instance.ptr_eq(first)));
    assert_eq!(scope.resolve::<Pool>("pool").unwrap().id, 0);
}

#[test]
fn test_concurrent_waiters_see_same_failure() {
    let calls = Arc::new(AtomicUsize::new(0));
    let scope = pool_scope(&calls, true);

    let results = race(&scope, |scope| scope.get("pool").map(|_| ()));

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    for result in results {
        match result {
            Err(RuntimeError::CreationFailed { slot, source }) => {
                assert_eq!(slot, "pool");
                assert_eq!(source.to_string(), "pool exhausted");
            }
            other => panic!("Expected CreationFailed, got: {other:?}"),
        }
    }
}

#[test]
fn test_lazy_cell_runs_recipe_once_across_threads() {
    let lazy = Arc::new(Lazy::<usize>::new("counter"));
    let calls = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let lazy = Arc::clone(&lazy);
            let calls = Arc::clone(&calls);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                lazy.get_or_create(|| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(20));
                    Ok(Some(i))
                })
                .unwrap()
            })
        })
        .collect();

    let values: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(values.iter().all(|v| *v == values[0]));
    assert_eq!(lazy.state(), LazyState::Cached);
}

#[test]
fn test_close_during_use_is_safe() {
    let calls = Arc::new(AtomicUsize::new(0));
    let scope = pool_scope(&calls, false);

    let closer = scope.clone();
    let results = race(&scope, move |scope| {
        let result = scope.get("pool").map(|_| ());
        let _ = closer.close();
        result
    });

    // Each thread either saw the pool or found the scope already closed.
    for result in results {
        match result {
            Ok(()) | Err(RuntimeError::ScopeClosed { .. }) => {}
            other => panic!("Expected Ok or ScopeClosed, got: {other:?}"),
        }
    }
    assert!(scope.is_closed());
    assert!(calls.load(Ordering::SeqCst) <= 1);
}
