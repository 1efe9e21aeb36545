//! Typed bump arena for per-frame scratch storage
//!
//! Slots are allocated front to back and never freed individually. `reset()`
//! rewinds the arena and bumps its generation, which invalidates every span
//! handed out before the reset.

use tracing::error;

use crate::error::ArenaError;

/// A contiguous run of slots inside an [`Arena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    start: usize,
    len: usize,
    generation: u64,
}

impl Span {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Fixed-capacity bump allocator over `T` slots
pub struct Arena<T> {
    label: &'static str,
    slots: Vec<T>,
    used: usize,
    generation: u64,
}

impl<T: Copy + Default> Arena<T> {
    /// Allocate the backing store once; it is never grown afterwards.
    pub fn new(label: &'static str, capacity: usize) -> Self {
        Self {
            label,
            slots: vec![T::default(); capacity],
            used: 0,
            generation: 0,
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn remaining(&self) -> usize {
        self.slots.len() - self.used
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Reserve `count` slots. Contents are whatever the previous frame left there.
    pub fn alloc(&mut self, count: usize) -> Result<Span, ArenaError> {
        if count > self.remaining() {
            let err = ArenaError::OutOfMemory {
                label: self.label,
                requested: count,
                remaining: self.remaining(),
            };
            error!("{}", err);
            return Err(err);
        }
        let span = Span {
            start: self.used,
            len: count,
            generation: self.generation,
        };
        self.used += count;
        Ok(span)
    }

    /// Rewind to empty and start a new generation
    pub fn reset(&mut self) {
        self.used = 0;
        self.generation = self.generation.wrapping_add(1);
    }

    fn check(&self, span: &Span) -> Result<(), ArenaError> {
        if span.generation != self.generation {
            return Err(ArenaError::StaleSpan {
                expected: self.generation,
                found: span.generation,
            });
        }
        let end = span.start + span.len;
        if end > self.used {
            return Err(ArenaError::OutOfBounds {
                start: span.start,
                end,
                capacity: self.slots.len(),
            });
        }
        Ok(())
    }

    pub fn get(&self, span: &Span) -> Result<&[T], ArenaError> {
        self.check(span)?;
        Ok(&self.slots[span.start..span.start + span.len])
    }

    pub fn get_mut(&mut self, span: &Span) -> Result<&mut [T], ArenaError> {
        self.check(span)?;
        Ok(&mut self.slots[span.start..span.start + span.len])
    }

    /// Borrow two spans at once. `first` must have been allocated before `second`.
    pub fn get_pair_mut(&mut self, first: &Span, second: &Span) -> Result<(&mut [T], &mut [T]), ArenaError> {
        self.check(first)?;
        self.check(second)?;
        if first.start + first.len > second.start {
            return Err(ArenaError::OutOfBounds {
                start: second.start,
                end: first.start + first.len,
                capacity: self.slots.len(),
            });
        }
        let (head, tail) = self.slots.split_at_mut(second.start);
        Ok((
            &mut head[first.start..first.start + first.len],
            &mut tail[..second.len],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_bumps_and_reports_usage() {
        let mut arena: Arena<u32> = Arena::new("test", 8);
        let a = arena.alloc(3).unwrap();
        let b = arena.alloc(5).unwrap();
        assert_eq!(a.len(), 3);
        assert_eq!(b.len(), 5);
        assert_eq!(arena.used(), 8);
        assert_eq!(arena.remaining(), 0);
    }

    #[test]
    fn test_alloc_past_capacity_fails() {
        let mut arena: Arena<u32> = Arena::new("tiny", 4);
        arena.alloc(3).unwrap();
        let err = arena.alloc(2).unwrap_err();
        assert_eq!(
            err,
            ArenaError::OutOfMemory { label: "tiny", requested: 2, remaining: 1 }
        );
        // failed alloc leaves the arena untouched
        assert_eq!(arena.used(), 3);
    }

    #[test]
    fn test_stale_span_rejected_after_reset() {
        let mut arena: Arena<u32> = Arena::new("test", 4);
        let span = arena.alloc(2).unwrap();
        arena.get_mut(&span).unwrap()[0] = 7;
        arena.reset();
        assert_eq!(arena.used(), 0);
        assert!(matches!(arena.get(&span), Err(ArenaError::StaleSpan { expected: 1, found: 0 })));
    }

    #[test]
    fn test_pair_mut_splits_disjoint_spans() {
        let mut arena: Arena<u32> = Arena::new("test", 6);
        let a = arena.alloc(2).unwrap();
        let b = arena.alloc(4).unwrap();
        let (x, y) = arena.get_pair_mut(&a, &b).unwrap();
        x[1] = 1;
        y[3] = 2;
        assert_eq!(arena.get(&a).unwrap(), &[0, 1]);
        assert_eq!(arena.get(&b).unwrap(), &[0, 0, 0, 2]);
        assert!(arena.get_pair_mut(&b, &a).is_err());
    }
}
