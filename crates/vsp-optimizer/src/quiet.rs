//! Scoped suppression of solver log output.

use tracing::subscriber::{DefaultGuard, NoSubscriber};

/// While alive, events emitted on this thread go nowhere. Dropping the guard
/// restores the previous subscriber, including on early return or panic.
#[must_use = "output is restored as soon as the guard is dropped"]
pub struct QuietGuard {
    _guard: DefaultGuard,
}

impl QuietGuard {
    pub fn new() -> Self {
        Self {
            _guard: tracing::subscriber::set_default(NoSubscriber::default()),
        }
    }

    /// Restore output explicitly.
    pub fn resume(self) {}
}

impl Default for QuietGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for QuietGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("QuietGuard")
    }
}

/// Run `f` with log output suppressed.
pub fn quietly<R>(f: impl FnOnce() -> R) -> R {
    let _quiet = QuietGuard::new();
    f()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing::{Event, Metadata, Subscriber, span};

    struct Counter(Arc<AtomicUsize>);

    impl Subscriber for Counter {
        fn enabled(&self, _: &Metadata<'_>) -> bool {
            true
        }
        fn new_span(&self, _: &span::Attributes<'_>) -> span::Id {
            span::Id::from_u64(1)
        }
        fn record(&self, _: &span::Id, _: &span::Record<'_>) {}
        fn record_follows_from(&self, _: &span::Id, _: &span::Id) {}
        fn event(&self, _: &Event<'_>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
        fn enter(&self, _: &span::Id) {}
        fn exit(&self, _: &span::Id) {}
    }

    #[test]
    fn guard_silences_and_restores() {
        let count = Arc::new(AtomicUsize::new(0));
        let _outer = tracing::subscriber::set_default(Counter(count.clone()));

        tracing::info!("visible");
        let quiet = QuietGuard::new();
        tracing::info!("hidden");
        quiet.resume();
        tracing::info!("visible again");

        let r: Result<(), ()> = quietly(|| {
            tracing::warn!("hidden");
            Err(())
        });
        assert!(r.is_err());
        tracing::info!("still visible");

        assert_eq!(count.load(Ordering::SeqCst), 3);
    }
}
