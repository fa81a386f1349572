//! Resolution happens once per source; cached entries skip the source.

use std::sync::Arc;

use ntest::timeout;

use entryview_core::reader::{SetupStatus, ValueReader};
use entryview_core::source::MemorySource;
use entryview_core::Director;

use super::helpers::{builtin_registry, chain_of, CountingCatalog};

fn counting_director() -> (Director, Arc<CountingCatalog>) {
    let source = MemorySource::builder("s")
        .scalar("px", &[0.5f64, 1.5, 2.5, 3.5])
        .build()
        .unwrap();
    let catalog = Arc::new(CountingCatalog::new(builtin_registry()));
    let director = Director::new(chain_of(vec![source]), catalog.clone());
    (director, catalog)
}

#[timeout(1000)]
#[test]
fn test_revisiting_entries_does_not_resolve_again() {
    let (director, catalog) = counting_director();
    let mut px = ValueReader::<f64>::new(director.clone(), director.proxy("px"));

    assert_eq!(px.get(0).unwrap(), Some(&0.5));
    let after_first = catalog.lookups();
    assert!(after_first > 0);

    assert_eq!(px.get(3).unwrap(), Some(&3.5));
    assert_eq!(px.get(0).unwrap(), Some(&0.5));
    assert_eq!(px.get(0).unwrap(), Some(&0.5));
    assert_eq!(catalog.lookups(), after_first);
}

#[timeout(1000)]
#[test]
fn test_setup_on_resolved_proxy_is_noop() {
    let (director, catalog) = counting_director();
    let proxy = director.proxy("px");
    director.load_entry(1).unwrap();

    assert!(proxy.borrow_mut().setup(&director));
    let lookups = catalog.lookups();
    let epoch = proxy.borrow().epoch();

    assert!(proxy.borrow_mut().setup(&director));
    assert!(proxy.borrow_mut().setup(&director));
    assert_eq!(catalog.lookups(), lookups);
    assert_eq!(proxy.borrow().epoch(), epoch);
    assert!(proxy.borrow().is_resolved());
}

#[timeout(1000)]
#[test]
fn test_readers_share_one_proxy_per_path() {
    let (director, catalog) = counting_director();
    let mut a = ValueReader::<f64>::new(director.clone(), director.proxy("px"));
    let mut b = ValueReader::<f64>::new(director.clone(), director.proxy("px"));

    assert_eq!(a.get(2).unwrap(), Some(&2.5));
    let lookups = catalog.lookups();
    assert_eq!(b.get(2).unwrap(), Some(&2.5));

    assert_eq!(catalog.lookups(), lookups);
    assert_eq!(director.attached_count(), 1);
    assert_eq!(b.setup_status(), SetupStatus::Match);
}

#[timeout(1000)]
#[test]
fn test_reset_forces_new_resolution() {
    let (director, catalog) = counting_director();
    let mut px = ValueReader::<f64>::new(director.clone(), director.proxy("px"));
    assert_eq!(px.get(1).unwrap(), Some(&1.5));
    let lookups = catalog.lookups();

    px.proxy().borrow_mut().reset();
    assert!(!px.proxy().borrow().is_resolved());
    assert_eq!(px.get(1).unwrap(), Some(&1.5));
    assert!(catalog.lookups() > lookups);
}

#[timeout(5000)]
#[test]
fn test_sessions_on_separate_threads_share_sources() {
    let source: Arc<dyn entryview_core::source::Source> = Arc::new(
        MemorySource::builder("shared")
            .scalar("n", &(0..100u32).collect::<Vec<_>>())
            .build()
            .unwrap(),
    );
    let registry = Arc::new(builtin_registry());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let source = Arc::clone(&source);
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || {
                let director = Director::new(
                    entryview_core::Chain::single("shared", source),
                    registry,
                );
                let mut n = ValueReader::<u32>::new(director.clone(), director.proxy("n"));
                (0..100).map(|e| *n.get(e).unwrap().unwrap()).sum::<u32>()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 4950);
    }
}
