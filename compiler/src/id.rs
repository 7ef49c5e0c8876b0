// id.rs — Node handles and per-build name allocation
//
// `NodeId` indexes the builder's node arena; identity of a node is identity
// of its handle, never structural equality. `NameAllocator` hands out the
// numeric suffixes of generated variable names. One allocator lives inside
// each `Builder`, so independent builds never share a sequence.

/// Handle of a node inside a `Builder` arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Monotonic suffix counter for generated names (`add_0`, `eq_1`, ...).
#[derive(Debug, Default)]
pub struct NameAllocator {
    next: u32,
}

impl NameAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce `<prefix>_<n>` and advance the counter.
    pub fn fresh(&mut self, prefix: &str) -> String {
        let name = format!("{}_{}", prefix, self.next);
        self.next += 1;
        name
    }

    /// Number of names handed out so far.
    pub fn issued(&self) -> u32 {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_monotonic() {
        let mut names = NameAllocator::new();
        assert_eq!(names.fresh("add"), "add_0");
        assert_eq!(names.fresh("eq"), "eq_1");
        assert_eq!(names.issued(), 2);
    }

    #[test]
    fn allocators_are_independent() {
        let mut a = NameAllocator::new();
        let mut b = NameAllocator::new();
        a.fresh("x");
        assert_eq!(b.fresh("x"), "x_0");
    }
}
