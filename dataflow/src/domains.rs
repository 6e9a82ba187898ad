use core::cmp::Ordering;
use core::fmt::Debug;
use core::ops::{Deref, DerefMut};

use fixedbitset::FixedBitSet;

/////////////////////////
// Traits for domains. //
/////////////////////////

/// A join semi-lattice is a partially ordered set where the least upper
/// bound exists for every pair of elements. In a may analysis the ordering
/// can be read as "more facts": the set {A, B} of exceptions that may escape
/// a method is a safe approximation of {A}. In this library Bottom
/// represents the smallest element, the value every node starts from before
/// the fixpoint iteration.
///
/// The solvers require the lattice to have finite height (every ascending
/// chain is finite), which guarantees termination without widening.
pub trait JoinSemiLattice: Eq + PartialOrd + Clone + Debug {
    /// A type to hold some information about the lattice on the side.
    ///
    /// For some lattices, like the bit set lattice, we need to store
    /// somewhere the size of the universe. When we need no such values,
    /// set this to unit.
    type LatticeContext;

    /// The unit element of the join operation.
    ///
    /// Required to be the smallest element according to the ordering.
    fn bottom(ctx: &Self::LatticeContext) -> Self;

    /// Given two elements of the lattice the join operation computes the
    /// least upper bound. It is used to merge the contributions of all the
    /// predecessors of a node.
    ///
    /// Requirements:
    /// * Reflexive: a.join(a, ctx) == a
    /// * Commutative: a.join(b, ctx) == b.join(a, ctx)
    /// * Bottom is unit: bottom.join(b, ctx) == b
    /// * Upper bound: a.join(b, ctx) >= a and a.join(b, ctx) >= b
    /// * Ordering is respected: a <= b => a.join(b, ctx) == b
    fn join(&self, other: &Self, ctx: &Self::LatticeContext) -> Self;
}

/// A lattice is a join semi-lattice that is also a meet semi-lattice, i.e.,
/// the greatest lower bound (meet) also exists for all pairs.
pub trait Lattice: JoinSemiLattice {
    /// The unit element of the meet operation, the largest element of the
    /// lattice.
    fn top(ctx: &Self::LatticeContext) -> Self;

    /// Given two elements of the lattice the meet operation will compute the
    /// greatest lower bound.
    ///
    /// * Reflexive: a.meet(a, ctx) == a
    /// * Commutative: a.meet(b, ctx) == b.meet(a, ctx)
    /// * Top is unit: top.meet(b, ctx) == b
    /// * Lower bound: a.meet(b, ctx) <= a and a.meet(b, ctx) <= b
    fn meet(&self, other: &Self, ctx: &Self::LatticeContext) -> Self;
}

/////////////////////////////////////
// Concrete domain implementations //
/////////////////////////////////////

/// Bool is a lattice, where false is bottom and true is top,
/// join is or, meet is and. Solving over bool is plain reachability.
impl JoinSemiLattice for bool {
    type LatticeContext = ();

    fn bottom(_ctx: &Self::LatticeContext) -> Self {
        false
    }

    fn join(&self, other: &Self, _ctx: &Self::LatticeContext) -> Self {
        *self || *other
    }
}

impl Lattice for bool {
    fn top(_ctx: &Self::LatticeContext) -> Self {
        true
    }

    fn meet(&self, other: &Self, _ctx: &Self::LatticeContext) -> Self {
        *self && *other
    }
}

/// The power set lattice over a finite universe encoded as a fixed width
/// bit vector. The empty set is bottom, union is join, intersection is meet,
/// and the full set is top. All the values of a run must be created with
/// the same [`BitSetTop`], so every bit vector has the width of the universe.
#[derive(PartialEq, Eq, Clone)]
pub struct BitSet(pub FixedBitSet);

impl Deref for BitSet {
    type Target = FixedBitSet;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for BitSet {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// The size of the universe of a [`BitSet`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitSetTop(pub usize);

impl BitSet {
    pub fn from(ctx: &BitSetTop, values: &[usize]) -> Self {
        let mut inner = FixedBitSet::with_capacity(ctx.0);
        for &v in values {
            inner.insert(v);
        }
        Self(inner)
    }

    pub fn is_bottom(&self) -> bool {
        self.0.is_clear()
    }
}

impl PartialOrd for BitSet {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self.is_superset(other), other.is_superset(self)) {
            (true, true) => Some(Ordering::Equal),
            (true, false) => Some(Ordering::Greater),
            (false, true) => Some(Ordering::Less),
            (_, _) => None,
        }
    }
}

impl Debug for BitSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let elements: Vec<String> = self.ones().map(|x| x.to_string()).collect();
        write!(f, "{{{}}}", elements.join(", "))
    }
}

impl JoinSemiLattice for BitSet {
    type LatticeContext = BitSetTop;

    fn bottom(ctx: &Self::LatticeContext) -> Self {
        Self(FixedBitSet::with_capacity(ctx.0))
    }

    fn join(&self, other: &Self, _ctx: &Self::LatticeContext) -> Self {
        let mut result = self.clone();
        result.union_with(other);
        result
    }
}

impl Lattice for BitSet {
    fn top(ctx: &Self::LatticeContext) -> Self {
        let mut result = FixedBitSet::with_capacity(ctx.0);
        result.toggle_range(..);
        Self(result)
    }

    fn meet(&self, other: &Self, _ctx: &Self::LatticeContext) -> Self {
        let mut result = self.clone();
        result.intersect_with(other);
        result
    }
}
