use crate::error::NodeId;

/// A pairwise metric over node identities.
///
/// Implementations need not be mathematically metric (no triangle-inequality requirement is
/// assumed anywhere in this crate), but they must be deterministic and non-negative. Symmetric
/// distances (`is_symmetric() == true`) additionally guarantee `d(a, b) == d(b, a)`.
pub trait Distance<N: NodeId> {
    /// Distance between two nodes. Must be non-negative.
    fn distance(&self, a: &N, b: &N) -> f64;

    /// Whether `distance(a, b) == distance(b, a)` for all `a`, `b`.
    fn is_symmetric(&self) -> bool {
        false
    }

    /// Capability probe: `Some` iff this distance also implements [`MeanCapable`].
    ///
    /// `DenGraphFio` needs to know, for a `Distance` value chosen generically by its caller,
    /// whether a representative mean can be computed — a question that can't be answered at
    /// compile time without forcing every `Distance` impl to also implement `MeanCapable`.
    /// Types that implement both should override this to return `Some(self)`.
    fn as_mean_capable(&self) -> Option<&dyn MeanCapable<N>> {
        None
    }
}

/// Adapts a plain closure or function pointer into a [`Distance`].
///
/// Mirrors the common case where the caller already has `Fn(&N, &N) -> f64` and doesn't want to
/// name a type for it.
pub struct FnDistance<F> {
    f: F,
    symmetric: bool,
}

impl<F> FnDistance<F> {
    pub fn new(f: F) -> Self {
        Self {
            f,
            symmetric: false,
        }
    }

    pub fn symmetric(f: F) -> Self {
        Self { f, symmetric: true }
    }
}

impl<N, F> Distance<N> for FnDistance<F>
where
    N: NodeId,
    F: Fn(&N, &N) -> f64,
{
    fn distance(&self, a: &N, b: &N) -> f64 {
        (self.f)(a, b)
    }

    fn is_symmetric(&self) -> bool {
        self.symmetric
    }
}

/// A [`Distance`] that can additionally compute a representative value for a set of nodes.
///
/// Engines that maintain cluster representatives (see `DenGraphFio`) require this capability;
/// plain clustering does not. Kept as a separate supertrait rather than an `Option`-returning
/// method on `Distance` itself, so that "does this distance support means" is a compile-time
/// bound where it can be, and a single `NoDistanceSupport` error only where it can't (see
/// `DenGraphFio::try_new`).
pub trait MeanCapable<N: NodeId>: Distance<N> {
    /// Compute a representative for `nodes`. If `changes` is non-empty, the caller is hinting
    /// that only those members changed since the representative was last computed, to allow an
    /// incremental update; implementations may ignore the hint and recompute from scratch.
    fn mean(&self, nodes: &[N], changes: &[N]) -> N;
}
