/*
  Copyright© 2023 Raúl Wolters(1)

  This file is part of rustronomy-clump.

  rustronomy is free software: you can redistribute it and/or modify it under
  the terms of the European Union Public License version 1.2 or later, as
  published by the European Commission.

  rustronomy is distributed in the hope that it will be useful, but WITHOUT ANY
  WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR
  A PARTICULAR PURPOSE. See the European Union Public License for more details.

  You should have received a copy of the EUPL in an/all official language(s) of
  the European Union along with rustronomy.  If not, see
  <https://ec.europa.eu/info/european-union-public-licence_en/>.

  (1) Resident of the Kingdom of the Netherlands; agreement between licensor and
  licensee subject to Dutch law as per article 15 of the EUPL.
*/

//! Explicit LIFO work list used to traverse clumps without recursion.

use crate::error::StackError;

/// Default number of entries allocated by `FloodFillStack::init`
pub const DEFAULT_STACK_CAPACITY: usize = 5000;
/// Default number of entries added each time the stack runs full
pub const DEFAULT_STACK_INCREMENT: usize = 5000;

/// `(x, y)`: interval index within its row, row index
pub type Coord2d = (usize, usize);
/// `(x, y, z)`: interval index within its row, row index, plane index
pub type Coord3d = (usize, usize, usize);

pub type Stack2d = FloodFillStack<Coord2d>;
pub type Stack3d = FloodFillStack<Coord3d>;

/// A growable stack of grid coordinates.
///
/// The stack grows by a fixed increment whenever it runs full, optionally up
/// to a hard `limit`. If growing fails, *all* buffered coordinates are thrown
/// away and the push reports an error: the traversal that was using the stack
/// is incomplete and must be treated as such by the caller.
///
/// `clear` keeps the backing buffer around so that one stack can be reused
/// for many clumps. Dropping the stack (or calling `free`) releases it.
#[derive(Debug, Clone)]
pub struct FloodFillStack<P> {
  buf: Vec<P>,
  increment: usize,
  limit: Option<usize>,
  peak: usize,
  grow_count: usize,
}

impl<P: Copy> FloodFillStack<P> {
  /// Allocates a stack with room for `capacity` coordinates. Fails only if the
  /// allocation itself fails.
  pub fn init(capacity: usize, increment: usize, limit: Option<usize>) -> Result<Self, StackError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(capacity).map_err(StackError::Alloc)?;
    Ok(FloodFillStack { buf, increment: increment.max(1), limit, peak: 0, grow_count: 0 })
  }

  /// Pushes a coordinate, growing the stack if needed. On failure the stack
  /// is left empty.
  pub fn push(&mut self, coord: P) -> Result<(), StackError> {
    if let Err(err) = self.make_room() {
      self.buf.clear();
      return Err(err);
    }
    self.buf.push(coord);
    self.peak = self.peak.max(self.buf.len());
    Ok(())
  }

  fn make_room(&mut self) -> Result<(), StackError> {
    let len = self.buf.len();
    if let Some(limit) = self.limit {
      if len >= limit {
        return Err(StackError::LimitReached { limit });
      }
    }
    if len < self.buf.capacity() {
      return Ok(());
    }

    //Fixed-size growth step, clipped to the limit
    let step = match self.limit {
      Some(limit) => self.increment.min(limit - len),
      None => self.increment,
    };
    self.buf.try_reserve_exact(step).map_err(StackError::Alloc)?;
    self.grow_count += 1;
    Ok(())
  }

  /// Pops the most recently pushed coordinate, `None` if the stack is empty.
  #[inline]
  pub fn pop(&mut self) -> Option<P> {
    self.buf.pop()
  }

  /// Empties the stack but keeps its allocation.
  #[inline]
  pub fn clear(&mut self) {
    self.buf.clear();
  }

  /// Releases the backing buffer.
  pub fn free(self) {}

  #[inline]
  pub fn len(&self) -> usize {
    self.buf.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.buf.is_empty()
  }

  pub fn capacity(&self) -> usize {
    self.buf.capacity()
  }

  /// Largest number of coordinates held at once since `init`
  pub fn peak(&self) -> usize {
    self.peak
  }

  /// Number of times the stack had to grow since `init`
  pub fn grow_count(&self) -> usize {
    self.grow_count
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn lifo_across_growth() {
    let mut stack = Stack2d::init(4, 3, None).unwrap();
    for i in 0..20 {
      stack.push((i, 2 * i)).unwrap();
    }
    assert!(stack.grow_count() > 0);
    assert!(stack.capacity() >= 20);
    for i in (0..20).rev() {
      assert_eq!(stack.pop(), Some((i, 2 * i)));
    }
    assert_eq!(stack.pop(), None);
  }

  #[test]
  fn limit_discards_everything() {
    let mut stack = Stack3d::init(2, 2, Some(5)).unwrap();
    for i in 0..5 {
      stack.push((i, i, i)).unwrap();
    }
    let err = stack.push((9, 9, 9)).unwrap_err();
    assert!(matches!(err, StackError::LimitReached { limit: 5 }));
    assert!(stack.is_empty());
    assert_eq!(stack.peak(), 5);

    //The stack is still usable afterwards
    stack.push((1, 2, 3)).unwrap();
    assert_eq!(stack.pop(), Some((1, 2, 3)));
  }

  #[test]
  fn clear_keeps_allocation() {
    let mut stack = Stack2d::init(8, 8, None).unwrap();
    (0..8).for_each(|i| stack.push((i, i)).unwrap());
    let cap = stack.capacity();
    stack.clear();
    assert!(stack.is_empty());
    assert_eq!(stack.capacity(), cap);
    stack.free();
  }
}
