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

//! Partitioning of an `IntervalSet` into clumps.

use ndarray as nd;

use std::collections::TryReserveError;

use crate::error::{ClumpError, ClumpResult, Resource, StackError};
use crate::interval::{IntervalSet, UNASSIGNED};
use crate::stack::{
  Coord2d, Coord3d, FloodFillStack, Stack2d, Stack3d, DEFAULT_STACK_CAPACITY,
  DEFAULT_STACK_INCREMENT,
};

/// What to do when the flood-fill stack runs out of room halfway through a
/// clump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PartialPolicy {
  /// Fail the whole call with `ClumpError::PartialTraversal`. The clump ids of
  /// the interval set are reset.
  #[default]
  Abort,
  /// Keep going, but mark the interrupted clump, and every clump found to
  /// border it, as `partial`.
  Flag,
}

/// One entry of the clump table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClumpOrder {
  /// Number of intervals in the clump
  pub interval_count: usize,
  /// Number of cells in the clump
  pub point_count: usize,
  /// Set if the traversal of this clump was cut short (or it borders a clump
  /// that was). The clump may be missing cells, or be a fragment of a larger
  /// region.
  pub partial: bool,
  start: usize,
}

/// The clumps found in an interval set, numbered `1..=num_clumps()` in the
/// order in which they were discovered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClumpTable {
  orders: Vec<ClumpOrder>,
  interval_order: Vec<usize>,
}

impl ClumpTable {
  pub fn num_clumps(&self) -> usize {
    self.orders.len()
  }

  pub fn is_empty(&self) -> bool {
    self.orders.is_empty()
  }

  /// Entry of clump `id`. Clump ids start at 1!
  pub fn get(&self, id: usize) -> Option<&ClumpOrder> {
    self.orders.get(id.checked_sub(1)?)
  }

  /// Pool indices of the intervals of clump `id`, in discovery order. Empty
  /// for unknown ids.
  pub fn intervals(&self, id: usize) -> &[usize] {
    match self.get(id) {
      Some(order) => &self.interval_order[order.start..order.start + order.interval_count],
      None => &[],
    }
  }

  /// Pool indices of all clumped intervals, grouped per clump
  pub fn interval_order(&self) -> &[usize] {
    &self.interval_order
  }

  /// Iterates over `(id, entry)` pairs
  pub fn iter(&self) -> impl Iterator<Item = (usize, &ClumpOrder)> + '_ {
    self.orders.iter().enumerate().map(|(idx, order)| (idx + 1, order))
  }

  pub fn total_points(&self) -> usize {
    self.orders.iter().map(|order| order.point_count).sum()
  }

  /// `false` if any clump is flagged as partial
  pub fn is_complete(&self) -> bool {
    self.orders.iter().all(|order| !order.partial)
  }

  /// Ids of all clumps flagged as partial
  pub fn partial_clumps(&self) -> impl Iterator<Item = usize> + '_ {
    self.iter().filter(|(_, order)| order.partial).map(|(id, _)| id)
  }
}

/// Largest magnitude `set_min_overlap` accepts
pub const MAX_MIN_OVERLAP: usize = isize::MAX as usize / 2;

#[derive(Debug, Clone, Copy)]
struct Settings {
  min_overlap: isize,
  partial_policy: PartialPolicy,
}

/// Builder for configuring a clumper.
///
/// Use `new_2d()` to configure a clumper for single-plane grids and `new_3d()`
/// for volumes. Once configured, `build()` allocates the flood-fill stack and
/// returns a (`Send`&`Sync`) clumper object. A clumper owns its stack, so it
/// should be reused for many grids rather than rebuilt each time.
#[derive(Debug, Clone)]
pub struct ClumpingBuilder {
  volume: bool,
  min_overlap: isize,
  stack_capacity: usize,
  stack_increment: usize,
  stack_limit: Option<usize>,
  partial_policy: PartialPolicy,
}

impl ClumpingBuilder {
  /// creates a new `ClumpingBuilder` configured for 2D grids
  pub fn new_2d() -> Self {
    ClumpingBuilder {
      volume: false,
      min_overlap: 1,
      stack_capacity: DEFAULT_STACK_CAPACITY,
      stack_increment: DEFAULT_STACK_INCREMENT,
      stack_limit: None,
      partial_policy: PartialPolicy::Abort,
    }
  }

  /// creates a new `ClumpingBuilder` configured for 3D volumes
  pub fn new_3d() -> Self {
    ClumpingBuilder { volume: true, ..Self::new_2d() }
  }

  /// Set the number of columns two intervals in adjacent rows (or planes) must
  /// share to be connected. The default of 1 connects any intervals that share
  /// a column. With 0, intervals that only touch diagonally are connected as
  /// well, and a negative value `-n` bridges gaps of up to `n` columns.
  /// `build()` rejects values larger in magnitude than `MAX_MIN_OVERLAP`.
  pub fn set_min_overlap(mut self, min_overlap: isize) -> Self {
    self.min_overlap = min_overlap;
    self
  }

  /// Set the initial capacity of the flood-fill stack.
  pub fn set_stack_capacity(mut self, capacity: usize) -> Self {
    self.stack_capacity = capacity;
    self
  }

  /// Set the number of entries the flood-fill stack grows by when it is full.
  pub fn set_stack_increment(mut self, increment: usize) -> Self {
    self.stack_increment = increment;
    self
  }

  /// Cap the flood-fill stack at `limit` entries. Without a limit the stack
  /// grows until the allocator refuses.
  pub fn set_stack_limit(mut self, limit: Option<usize>) -> Self {
    self.stack_limit = limit;
    self
  }

  pub fn set_partial_policy(mut self, policy: PartialPolicy) -> Self {
    self.partial_policy = policy;
    self
  }

  /// Build a `Box<dyn Clumping + Send + Sync>` from the current builder
  /// configuration. Fails if the minimum overlap is out of range, the stack
  /// parameters are inconsistent or the stack cannot be allocated.
  pub fn build(self) -> ClumpResult<Box<dyn Clumping + Send + Sync>> {
    if self.min_overlap.unsigned_abs() > MAX_MIN_OVERLAP {
      return Err(ClumpError::Config(format!(
        "minimum overlap ({}) must lie within ±{MAX_MIN_OVERLAP}",
        self.min_overlap
      )));
    }
    if self.stack_capacity == 0 {
      return Err(ClumpError::Config("stack capacity must be at least 1".into()));
    }
    if self.stack_increment == 0 {
      return Err(ClumpError::Config("stack increment must be at least 1".into()));
    }
    if let Some(limit) = self.stack_limit {
      if limit < self.stack_capacity {
        return Err(ClumpError::Config(format!(
          "stack limit ({limit}) is smaller than the initial stack capacity ({})",
          self.stack_capacity
        )));
      }
    }

    let settings = Settings { min_overlap: self.min_overlap, partial_policy: self.partial_policy };
    let stack_err = |err: StackError| match err {
      StackError::Alloc(source) => {
        ClumpError::Allocation { resource: Resource::FloodFillStack, source }
      }
      other => ClumpError::Config(other.to_string()),
    };

    if self.volume {
      let stack = Stack3d::init(self.stack_capacity, self.stack_increment, self.stack_limit)
        .map_err(stack_err)?;
      Ok(Box::new(VolumeClumper { settings, stack }))
    } else {
      let stack = Stack2d::init(self.stack_capacity, self.stack_increment, self.stack_limit)
        .map_err(stack_err)?;
      Ok(Box::new(PlaneClumper { settings, stack }))
    }
  }
}

/// Connected-component analysis of interval sets. This trait is dyn-safe.
pub trait Clumping {
  /// Assigns every interval of `set` to a clump and returns the clump table.
  ///
  /// Interval ids are reset first, so a set can be clumped again. On error the
  /// ids are reset as well: a failed call never leaves a half-labelled set.
  fn clump(&mut self, set: &mut IntervalSet) -> ClumpResult<ClumpTable>;

  /// The minimum overlap this clumper was configured with
  fn min_overlap(&self) -> isize;
}

/// This trait contains convenience functions that go straight from a grid to
/// clumps.
pub trait ClumpUtils: Clumping {
  /// Collects the intervals of all cells `>= threshold` in `grid` and clumps
  /// them.
  fn clump_grid<T>(
    &mut self,
    grid: nd::ArrayView2<T>,
    threshold: T,
  ) -> ClumpResult<(IntervalSet, ClumpTable)>
  where
    T: PartialOrd + Sync,
  {
    let mut set = IntervalSet::from_grid(grid, threshold)?;
    let table = self.clump(&mut set)?;
    Ok((set, table))
  }

  /// Volume version of `clump_grid`.
  fn clump_volume<T>(
    &mut self,
    volume: nd::ArrayView3<T>,
    threshold: T,
  ) -> ClumpResult<(IntervalSet, ClumpTable)>
  where
    T: PartialOrd + Sync,
  {
    let mut set = IntervalSet::from_volume(volume, threshold)?;
    let table = self.clump(&mut set)?;
    Ok((set, table))
  }
}

impl ClumpUtils for dyn Clumping {}
impl ClumpUtils for dyn Clumping + Send + Sync {}

/// Clumper for single-plane grids. Intervals are connected to overlapping
/// intervals in the rows directly above and below.
pub struct PlaneClumper {
  settings: Settings,
  stack: Stack2d,
}

/// Clumper for volumes. On top of the in-plane connections of
/// `PlaneClumper`, intervals are connected to overlapping intervals in the
/// same row of the planes directly above and below.
pub struct VolumeClumper {
  settings: Settings,
  stack: Stack3d,
}

impl Clumping for PlaneClumper {
  fn clump(&mut self, set: &mut IntervalSet) -> ClumpResult<ClumpTable> {
    if set.nz > 1 {
      return Err(ClumpError::DimensionMismatch { planes: set.nz });
    }
    run(self.settings, &mut self.stack, set, false)
  }

  fn min_overlap(&self) -> isize {
    self.settings.min_overlap
  }
}

impl Clumping for VolumeClumper {
  fn clump(&mut self, set: &mut IntervalSet) -> ClumpResult<ClumpTable> {
    run(self.settings, &mut self.stack, set, true)
  }

  fn min_overlap(&self) -> isize {
    self.settings.min_overlap
  }
}

/// Stack entries: `(index in row, row, plane)`
trait StackCoord: Copy {
  fn pack(x: usize, row: usize, plane: usize) -> Self;
  fn unpack(self) -> (usize, usize, usize);
}

impl StackCoord for Coord2d {
  #[inline(always)]
  fn pack(x: usize, row: usize, _plane: usize) -> Self {
    (x, row)
  }
  #[inline(always)]
  fn unpack(self) -> (usize, usize, usize) {
    (self.0, self.1, 0)
  }
}

impl StackCoord for Coord3d {
  #[inline(always)]
  fn pack(x: usize, row: usize, plane: usize) -> Self {
    (x, row, plane)
  }
  #[inline(always)]
  fn unpack(self) -> (usize, usize, usize) {
    self
  }
}

fn run<P: StackCoord>(
  settings: Settings,
  stack: &mut FloodFillStack<P>,
  set: &mut IntervalSet,
  across_planes: bool,
) -> ClumpResult<ClumpTable> {
  #[cfg(feature = "debug")]
  let start = std::time::Instant::now();

  set.reset_ids();
  let result = partition(settings, stack, set, across_planes);
  stack.clear();

  match result {
    Ok(table) => {
      log::debug!(
        "clumped {} intervals into {} clumps ({} partial)",
        set.num_intervals(),
        table.num_clumps(),
        table.partial_clumps().count()
      );

      #[cfg(feature = "debug")]
      {
        let report = crate::performance_monitoring::PerfReport {
          intervals: set.num_intervals(),
          clumps: table.num_clumps(),
          points: table.total_points(),
          partial: table.partial_clumps().count(),
          stack_peak: stack.peak(),
          stack_grows: stack.grow_count(),
          clump_us: start.elapsed().as_micros() as usize,
        };
        log::debug!("{report}");
      }

      Ok(table)
    }
    Err(err) => {
      set.reset_ids();
      Err(err)
    }
  }
}

/// Scans the rows in plane-major, row-major order and grows a clump from
/// every interval that has not been assigned yet.
fn partition<P: StackCoord>(
  settings: Settings,
  stack: &mut FloodFillStack<P>,
  set: &mut IntervalSet,
  across_planes: bool,
) -> ClumpResult<ClumpTable> {
  let table_err =
    |source: TryReserveError| ClumpError::Allocation { resource: Resource::ClumpTable, source };

  let mut table = ClumpTable::default();
  table.interval_order.try_reserve_exact(set.intervals.len()).map_err(table_err)?;

  let IntervalSet { ny, nz, intervals, rows, .. } = set;
  let (ny, nz) = (*ny, *nz);
  let min_overlap = settings.min_overlap;

  for row_in_vol in 0..rows.len() {
    let seed_hdr = rows[row_in_vol];
    for seed_x in 0..seed_hdr.count {
      let seed = seed_hdr.offset + seed_x;
      if intervals[seed].id != UNASSIGNED {
        continue;
      }

      /*(i) Start a new clump from the seed interval
        Intervals are marked as soon as they are discovered, so every interval
        is pushed onto the stack at most once.
      */
      let clump_id = table.orders.len() + 1;
      let start = table.interval_order.len();
      let mut point_count = intervals[seed].num_points();
      let mut partial = false;
      let mut stack_failed = false;
      intervals[seed].id = clump_id;
      table.interval_order.push(seed);

      stack.clear();
      if stack.push(P::pack(seed_x, row_in_vol % ny, row_in_vol / ny)).is_err() {
        stack_failed = true;
      }

      /*(ii) Flood-fill
        Pop an interval, look for overlapping intervals in the neighbouring rows
        (and planes) and claim those that are still unassigned.
      */
      'traversal: while let Some(coord) = stack.pop() {
        let (x, row, plane) = coord.unpack();
        let current = intervals[rows[plane * ny + row].offset + x];

        let neighbours = [
          (row > 0).then(|| plane * ny + row - 1),
          (row + 1 < ny).then(|| plane * ny + row + 1),
          (across_planes && plane > 0).then(|| (plane - 1) * ny + row),
          (across_planes && plane + 1 < nz).then(|| (plane + 1) * ny + row),
        ];

        for neigh_row in neighbours.into_iter().flatten() {
          let hdr = rows[neigh_row];
          let cands = &intervals[hdr.range()];

          //Candidates are sorted, so skip everything that ends too early...
          let lowest_end = (current.begin as isize).saturating_add(min_overlap - 1);
          let first = cands.partition_point(|cand| (cand.end as isize) < lowest_end);
          //...and stop once they begin too late
          let reach = (current.end as isize + 1).saturating_sub(min_overlap);

          for k in first..hdr.count {
            let idx = hdr.offset + k;
            let cand = intervals[idx];
            if cand.begin as isize > reach {
              break;
            }
            if !current.overlaps(&cand, min_overlap) {
              continue;
            }

            if cand.id == UNASSIGNED {
              intervals[idx].id = clump_id;
              table.interval_order.push(idx);
              point_count += cand.num_points();
              if stack.push(P::pack(k, neigh_row % ny, neigh_row / ny)).is_err() {
                stack_failed = true;
                break 'traversal;
              }
            } else if cand.id != clump_id {
              //Only an interrupted clump can leave connected intervals behind
              partial = true;
            }
          }
        }
      }

      //(iii) Deal with an interrupted traversal
      if stack_failed {
        let interval_count = table.interval_order.len() - start;
        match settings.partial_policy {
          PartialPolicy::Abort => {
            return Err(ClumpError::PartialTraversal { clump: clump_id, intervals: interval_count })
          }
          PartialPolicy::Flag => {
            log::warn!(
              "flood-fill stack exhausted in clump {clump_id} after {interval_count} intervals; clump flagged as partial"
            );
            partial = true;
          }
        }
      }

      //(iv) Record the clump
      table.orders.try_reserve(1).map_err(table_err)?;
      table.orders.push(ClumpOrder {
        interval_count: table.interval_order.len() - start,
        point_count,
        partial,
        start,
      });
    }
  }

  table.orders.shrink_to_fit();
  Ok(table)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn grid_set(grid: nd::Array2<u8>) -> IntervalSet {
    IntervalSet::from_grid(grid.view(), 1).unwrap()
  }

  #[test]
  fn discovery_order_numbering() {
    let mut set = grid_set(nd::array![
      [1, 0, 0, 1],
      [1, 0, 0, 1],
      [0, 0, 1, 1],
      [1, 0, 0, 0]
    ]);
    let mut clumper = ClumpingBuilder::new_2d().build().unwrap();
    let table = clumper.clump(&mut set).unwrap();

    assert_eq!(table.num_clumps(), 3);
    assert_eq!(table.get(1).unwrap().point_count, 2);
    assert_eq!(table.get(2).unwrap().point_count, 4);
    assert_eq!(table.get(3).unwrap().point_count, 1);
    assert_eq!(table.get(0), None);
    assert_eq!(set.clump_at(0, 2, 2), Some(2));
    assert_eq!(set.clump_at(0, 3, 0), Some(3));

    //Seed first, then its neighbours as they were discovered
    assert_eq!(table.intervals(2), &[1, 3, 4]);
    assert!(table.is_complete());
  }

  #[test]
  fn diagonal_connection_needs_zero_overlap() {
    let grid = nd::array![[1u8, 0, 0], [0, 1, 0], [0, 0, 1]];
    let mut strict = ClumpingBuilder::new_2d().build().unwrap();
    let mut loose = ClumpingBuilder::new_2d().set_min_overlap(0).build().unwrap();
    assert_eq!(strict.clump(&mut grid_set(grid.clone())).unwrap().num_clumps(), 3);
    assert_eq!(loose.clump(&mut grid_set(grid)).unwrap().num_clumps(), 1);
  }

  #[test]
  fn wide_overlap_requirement() {
    let grid = nd::array![[1u8, 1, 1, 0, 0], [0, 0, 1, 1, 1]];
    let mut clumper = ClumpingBuilder::new_2d().set_min_overlap(2).build().unwrap();
    assert_eq!(clumper.clump(&mut grid_set(grid.clone())).unwrap().num_clumps(), 2);
    let mut gap = ClumpingBuilder::new_2d().set_min_overlap(-1).build().unwrap();
    let far = nd::array![[1u8, 0, 0, 0], [0, 0, 1, 1]];
    assert_eq!(gap.clump(&mut grid_set(far)).unwrap().num_clumps(), 1);
  }

  #[test]
  fn planes_connect_only_in_3d() {
    let volume = nd::Array3::<u8>::ones((3, 2, 2));
    let mut set = IntervalSet::from_volume(volume.view(), 1).unwrap();

    let mut plane = ClumpingBuilder::new_2d().build().unwrap();
    assert!(matches!(plane.clump(&mut set), Err(ClumpError::DimensionMismatch { planes: 3 })));

    let mut vol = ClumpingBuilder::new_3d().build().unwrap();
    let table = vol.clump(&mut set).unwrap();
    assert_eq!(table.num_clumps(), 1);
    assert_eq!(table.get(1).unwrap().point_count, 12);
    assert_eq!(table.get(1).unwrap().interval_count, 6);
  }

  /// One clump of `n` two-cell intervals, each shifted one column right
  fn staircase(n: usize) -> IntervalSet {
    let mut grid = nd::Array2::<u8>::zeros((n, n + 1));
    for row in 0..n {
      grid[[row, row]] = 1;
      grid[[row, row + 1]] = 1;
    }
    grid_set(grid)
  }

  #[test]
  fn stack_exhaustion_aborts() {
    //A comb: one long top row with many teeth hanging from it
    let mut grid = nd::Array2::<u8>::zeros((3, 19));
    grid.row_mut(0).fill(1);
    for col in (0..19).step_by(2) {
      grid[[1, col]] = 1;
      grid[[2, col]] = 1;
    }
    let mut set = grid_set(grid);
    let mut clumper = ClumpingBuilder::new_2d()
      .set_stack_capacity(2)
      .set_stack_increment(1)
      .set_stack_limit(Some(3))
      .build()
      .unwrap();
    let err = clumper.clump(&mut set).unwrap_err();
    assert!(matches!(err, ClumpError::PartialTraversal { clump: 1, .. }));
    assert!(set.intervals().iter().all(|iv| iv.id == UNASSIGNED));

    //The same clumper still works on small inputs
    let mut small = staircase(2);
    assert_eq!(clumper.clump(&mut small).unwrap().num_clumps(), 1);
  }

  #[test]
  fn stack_exhaustion_flags() {
    let mut grid = nd::Array2::<u8>::zeros((3, 19));
    grid.row_mut(0).fill(1);
    for col in (0..19).step_by(2) {
      grid[[1, col]] = 1;
      grid[[2, col]] = 1;
    }
    let mut set = grid_set(grid);
    let total = set.num_points();
    let mut clumper = ClumpingBuilder::new_2d()
      .set_stack_capacity(2)
      .set_stack_increment(1)
      .set_stack_limit(Some(3))
      .set_partial_policy(PartialPolicy::Flag)
      .build()
      .unwrap();
    let table = clumper.clump(&mut set).unwrap();

    //Every cell is still accounted for, but the result is not trustworthy
    assert_eq!(table.total_points(), total);
    assert!(!table.is_complete());
    assert!(table.num_clumps() > 1);
    assert!(table.partial_clumps().all(|id| table.get(id).unwrap().partial));
    assert!(table.iter().all(|(_, order)| order.partial));
  }

  #[test]
  fn staircase_fits_default_stack() {
    let mut set = staircase(50);
    let mut clumper = ClumpingBuilder::new_2d().set_stack_capacity(4).build().unwrap();
    let table = clumper.clump(&mut set).unwrap();
    assert_eq!(table.num_clumps(), 1);
    assert_eq!(table.get(1).unwrap().point_count, 100);
  }

  #[test]
  fn extreme_overlap_is_rejected() {
    for min_overlap in [isize::MIN, isize::MAX, -(MAX_MIN_OVERLAP as isize) - 1] {
      assert!(matches!(
        ClumpingBuilder::new_2d().set_min_overlap(min_overlap).build(),
        Err(ClumpError::Config(_))
      ));
    }

    //The widest accepted values still clump without overflowing
    let grid = nd::array![[1u8, 1, 0, 0], [0, 0, 0, 1]];
    let mut bridging =
      ClumpingBuilder::new_2d().set_min_overlap(-(MAX_MIN_OVERLAP as isize)).build().unwrap();
    assert_eq!(bridging.clump(&mut grid_set(grid.clone())).unwrap().num_clumps(), 1);
    let mut strict =
      ClumpingBuilder::new_2d().set_min_overlap(MAX_MIN_OVERLAP as isize).build().unwrap();
    assert_eq!(strict.clump(&mut grid_set(grid)).unwrap().num_clumps(), 2);
  }

  #[test]
  fn bad_config_is_rejected() {
    assert!(matches!(
      ClumpingBuilder::new_2d().set_stack_capacity(0).build(),
      Err(ClumpError::Config(_))
    ));
    assert!(matches!(
      ClumpingBuilder::new_3d().set_stack_capacity(10).set_stack_limit(Some(5)).build(),
      Err(ClumpError::Config(_))
    ));
  }

  #[test]
  fn utils_go_from_grid_to_clumps() {
    let grid = nd::array![[0.0, 2.5, 2.5], [f64::NAN, 3.0, 0.0]];
    let mut clumper = ClumpingBuilder::new_2d().build().unwrap();
    let (set, table) = clumper.clump_grid(grid.view(), 2.0).unwrap();
    assert_eq!(set.num_intervals(), 2);
    assert_eq!(table.num_clumps(), 1);
    assert_eq!(table.total_points(), 3);
  }
}
