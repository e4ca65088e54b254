//! Unit and concurrency tests for reference cells and loaders.

use lazycow::error::LoadError;
use lazycow::reference::{FunctionLoader, Loader, Reference, ReferenceState};
use rstest::rstest;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Routes load-failure events to the test output when `RUST_LOG` is set.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// =============================================================================
// State Machine Tests
// =============================================================================

#[rstest]
fn test_new_reference_is_unset() {
    let reference: Reference<u32, String> = Reference::new(1);
    assert_eq!(reference.key(), &1);
    assert_eq!(reference.state(), ReferenceState::Unset);
    assert_eq!(reference.get(), None);
}

#[rstest]
#[case(Ok(10), ReferenceState::Set)]
#[case(Err(LoadError::NotFound), ReferenceState::Unloadable)]
#[case(Err(LoadError::Corrupt("truncated".to_string())), ReferenceState::Unloadable)]
#[case(Err(LoadError::Storage("disk".to_string())), ReferenceState::Unloadable)]
fn test_load_outcome_sets_state(
    #[case] outcome: Result<i32, LoadError>,
    #[case] expected: ReferenceState,
) {
    init_tracing();
    let reference: Reference<i32, i32> = Reference::new(1);
    let value = reference.resolve_with(|_| outcome.clone());
    assert_eq!(value.is_some(), expected == ReferenceState::Set);
    assert_eq!(reference.state(), expected);
}

#[rstest]
fn test_key_never_changes() {
    let reference = Reference::with_value("build-7", 7);
    reference.reclaim();
    reference.resolve_with(|_| Ok(8));
    assert_eq!(reference.key(), &"build-7");
    assert_eq!(reference.get().as_deref(), Some(&8));
}

#[rstest]
fn test_value_outlives_reclaim() {
    let reference = Reference::with_value(1, vec![1, 2, 3]);
    let held = reference.get().unwrap();
    assert!(reference.reclaim());
    assert_eq!(*held, vec![1, 2, 3]);
}

#[rstest]
fn test_debug_shows_key_and_state() {
    let reference: Reference<i32, i32> = Reference::new(4);
    assert_eq!(
        format!("{reference:?}"),
        "Reference { key: 4, state: Unset }"
    );
}

// =============================================================================
// FunctionLoader Tests
// =============================================================================

#[rstest]
fn test_function_loader_without_remover() {
    let loader = FunctionLoader::new(
        |reference: &Arc<Reference<i32, i32>>| reference.resolve_with(|key| Ok(key * 2)),
        |value: &i32| value / 2,
    );
    let reference = Arc::new(Reference::new(21));
    assert_eq!(loader.resolve(&reference).as_deref(), Some(&42));
    assert_eq!(loader.key_of(&42), 21);
    assert!(!loader.supports_remove());
    assert!(!loader.remove(&Arc::new(42)));
}

#[rstest]
fn test_function_loader_with_remover() {
    let removed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&removed);
    let loader = FunctionLoader::new(
        |reference: &Arc<Reference<i32, i32>>| reference.get(),
        |value: &i32| *value,
    )
    .with_remover(move |value: &Arc<i32>| {
        counter.fetch_add(1, Ordering::SeqCst);
        **value > 0
    });
    assert!(loader.supports_remove());
    assert!(loader.remove(&Arc::new(3)));
    assert!(!loader.remove(&Arc::new(-3)));
    assert_eq!(removed.load(Ordering::SeqCst), 2);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[rstest]
fn test_racing_resolvers_share_one_load() {
    let loads = Arc::new(AtomicUsize::new(0));
    let reference: Arc<Reference<u32, String>> = Arc::new(Reference::new(9));
    let barrier = Arc::new(Barrier::new(2));

    let resolvers: Vec<_> = (0..2)
        .map(|_| {
            let reference = Arc::clone(&reference);
            let loads = Arc::clone(&loads);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                reference.resolve_with(|key| {
                    loads.fetch_add(1, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(20));
                    Ok(format!("build #{key}"))
                })
            })
        })
        .collect();

    let values: Vec<Arc<String>> = resolvers
        .into_iter()
        .map(|handle| handle.join().expect("Resolver panicked").expect("Value missing"))
        .collect();

    assert!(Arc::ptr_eq(&values[0], &values[1]));
    assert_eq!(values[0].as_str(), "build #9");
    assert_eq!(reference.state(), ReferenceState::Set);
    assert_eq!(loads.load(Ordering::SeqCst), 1);
}

#[rstest]
fn test_reclaim_during_resolution_is_safe() {
    let reference: Arc<Reference<u32, u32>> = Arc::new(Reference::new(1));
    let reclaimer = {
        let reference = Arc::clone(&reference);
        thread::spawn(move || {
            for _ in 0..1000 {
                reference.reclaim();
            }
        })
    };
    for _ in 0..1000 {
        assert_eq!(reference.resolve_with(|key| Ok(key + 1)).as_deref(), Some(&2));
    }
    reclaimer.join().expect("Reclaimer panicked");
    assert_ne!(reference.state(), ReferenceState::Unloadable);
}
