//! Trait definitions for the hash primitives and the digest guard.

/// The two hash functions the pipeline is built from.
///
/// Both are synchronous and infallible. `digest` is only safe for one
/// caller at a time across the whole process; the stages never call it
/// without holding an [`ExclusionGuard`]. `checksum` has no such limit.
pub trait HashPrimitives: Send + Sync {
    /// Collision-resistant digest of `data`
    fn digest(&self, data: &str) -> String;

    /// Fast non-cryptographic checksum of `data`
    fn checksum(&self, data: &str) -> String;
}

/// Mutual exclusion around one designated operation.
///
/// Implementations must run `op` exactly once and must never let two
/// `exclusive` bodies overlap, whichever threads call them.
pub trait ExclusionGuard: Send + Sync {
    /// Run `op` while holding the guard
    fn exclusive(&self, op: &mut dyn FnMut());
}

/// Run `op` under `guard` and hand back its result.
pub fn guarded<R>(guard: &dyn ExclusionGuard, op: impl FnOnce() -> R) -> R {
    let mut op = Some(op);
    let mut result = None;
    guard.exclusive(&mut || {
        if let Some(op) = op.take() {
            result = Some(op());
        }
    });
    match result {
        Some(value) => value,
        None => panic!("exclusion guard returned without running the guarded operation"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PassThrough;

    impl ExclusionGuard for PassThrough {
        fn exclusive(&self, op: &mut dyn FnMut()) {
            op();
        }
    }

    struct Skipping;

    impl ExclusionGuard for Skipping {
        fn exclusive(&self, _op: &mut dyn FnMut()) {}
    }

    #[test]
    fn guarded_returns_operation_result() {
        let value = guarded(&PassThrough, || 40 + 2);
        assert_eq!(value, 42);
    }

    #[test]
    fn guarded_runs_operation_once_even_if_called_twice() {
        struct Twice;
        impl ExclusionGuard for Twice {
            fn exclusive(&self, op: &mut dyn FnMut()) {
                op();
                op();
            }
        }

        let mut calls = 0;
        guarded(&Twice, || calls += 1);
        assert_eq!(calls, 1);
    }

    #[test]
    #[should_panic(expected = "without running")]
    fn guarded_panics_when_guard_skips_operation() {
        guarded(&Skipping, || ());
    }
}
