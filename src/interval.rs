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

//! Run-length intervals and the per-row index that organises them.
//!
//! An `IntervalSet` can be filled in two ways:
//! 1. from the compact *scan format*, a flat stream of integer words
//! `(row_index, interval_count, (begin, end) × interval_count)` repeated until
//! the stream is exhausted. For volumes, `row_index` counts rows across planes
//! (`plane * ny + row`).
//! 2. directly from a 2D `(ny, nx)` or 3D `(nz, ny, nx)` `ndarray` grid and a
//! threshold or predicate.
//!
//! All intervals live in a single pool. Each row header stores the *offset* of
//! its first interval in that pool, never a reference, so the pool can be
//! regrown freely.

use ndarray as nd;
use num_traits::{PrimInt, ToPrimitive};
use rayon::prelude::*;

use crate::error::{ClumpError, ClumpResult, Resource, ScanFault};

/// Clump id of an interval that has not been assigned to a clump yet. Clump
/// ids start at 1.
pub const UNASSIGNED: usize = 0;

/// A maximal run of marked cells `begin..=end` in one row of one plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
  /// Clump id, `UNASSIGNED` until clumped
  pub id: usize,
  pub plane: usize,
  /// Row within the plane
  pub row: usize,
  pub begin: usize,
  pub end: usize,
}

impl Interval {
  pub fn new(plane: usize, row: usize, begin: usize, end: usize) -> Self {
    Interval { id: UNASSIGNED, plane, row, begin, end }
  }

  /// Number of cells covered by this interval
  #[inline]
  pub fn num_points(&self) -> usize {
    self.end - self.begin + 1
  }

  /// Number of columns shared with `other`. Zero means the intervals touch
  /// diagonally, negative values give (minus) the size of the gap between them.
  #[inline]
  pub fn overlap(&self, other: &Interval) -> isize {
    self.end.min(other.end) as isize - self.begin.max(other.begin) as isize + 1
  }

  /// Whether `self` and `other` are connected when they sit in adjacent rows
  /// or planes.
  #[inline]
  pub fn overlaps(&self, other: &Interval, min_overlap: isize) -> bool {
    self.overlap(other) >= min_overlap
  }
}

/// Location of the intervals of one row in the interval pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowHdr {
  pub count: usize,
  pub offset: usize,
}

impl RowHdr {
  #[inline]
  pub fn range(&self) -> std::ops::Range<usize> {
    self.offset..self.offset + self.count
  }
}

/// Axis-aligned box (inclusive bounds) enclosing a group of intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
  pub xmin: usize,
  pub xmax: usize,
  pub ymin: usize,
  pub ymax: usize,
  pub zmin: usize,
  pub zmax: usize,
}

/// The interval pool of a grid together with its row index.
#[derive(Debug, Clone, Default)]
pub struct IntervalSet {
  pub(crate) nx: usize,
  pub(crate) ny: usize,
  pub(crate) nz: usize,
  pub(crate) intervals: Vec<Interval>,
  pub(crate) rows: Vec<RowHdr>,
}

#[inline]
fn malformed(offset: usize, fault: ScanFault) -> ClumpError {
  ClumpError::MalformedInput { offset, fault }
}

#[inline]
fn read_word<W: PrimInt>(scan: &[W], at: usize, record: usize) -> ClumpResult<usize> {
  scan[at].to_usize().ok_or_else(|| malformed(record, ScanFault::BadWord { index: at }))
}

/// Returns the `(begin, end)` pairs of all runs of marked cells in `row`.
fn find_runs<T, F>(row: &nd::ArrayView1<T>, marked: &F) -> Vec<(usize, usize)>
where
  F: Fn(&T) -> bool,
{
  let mut runs = Vec::new();
  let mut start = None;
  for (col, val) in row.iter().enumerate() {
    match (marked(val), start) {
      (true, None) => start = Some(col),
      (false, Some(begin)) => {
        runs.push((begin, col - 1));
        start = None;
      }
      _ => {}
    }
  }
  if let Some(begin) = start {
    runs.push((begin, row.len() - 1));
  }
  runs
}

impl IntervalSet {
  /// Creates an empty set without any rows. Use one of the `load_*` methods
  /// to fill it.
  pub fn new() -> Self {
    Self::default()
  }

  /// Parses a scan stream for a `nx × ny × nz` grid. See `load_scan`.
  pub fn from_scan<W: PrimInt>(scan: &[W], nx: usize, ny: usize, nz: usize) -> ClumpResult<Self> {
    let mut set = Self::new();
    set.load_scan(scan, nx, ny, nz)?;
    Ok(set)
  }

  /// Collects all runs of cells `>= threshold` in a 2D `(ny, nx)` grid.
  pub fn from_grid<T>(grid: nd::ArrayView2<T>, threshold: T) -> ClumpResult<Self>
  where
    T: PartialOrd + Sync,
  {
    let mut set = Self::new();
    set.load_grid_with(grid, |val| *val >= threshold)?;
    Ok(set)
  }

  /// Collects all runs of cells `< threshold` in a 2D `(ny, nx)` grid.
  pub fn from_grid_below<T>(grid: nd::ArrayView2<T>, threshold: T) -> ClumpResult<Self>
  where
    T: PartialOrd + Sync,
  {
    let mut set = Self::new();
    set.load_grid_with(grid, |val| *val < threshold)?;
    Ok(set)
  }

  /// Collects all runs of cells `>= threshold` in a 3D `(nz, ny, nx)` volume.
  pub fn from_volume<T>(volume: nd::ArrayView3<T>, threshold: T) -> ClumpResult<Self>
  where
    T: PartialOrd + Sync,
  {
    let mut set = Self::new();
    set.load_volume_with(volume, |val| *val >= threshold)?;
    Ok(set)
  }

  /// Collects all runs of cells `< threshold` in a 3D `(nz, ny, nx)` volume.
  pub fn from_volume_below<T>(volume: nd::ArrayView3<T>, threshold: T) -> ClumpResult<Self>
  where
    T: PartialOrd + Sync,
  {
    let mut set = Self::new();
    set.load_volume_with(volume, |val| *val < threshold)?;
    Ok(set)
  }

  /// Sets the grid dimensions and zeroes the row index, reusing the existing
  /// allocations where possible.
  fn reset(&mut self, nx: usize, ny: usize, nz: usize) -> ClumpResult<usize> {
    let num_rows = match ny.checked_mul(nz) {
      Some(n) if nx > 0 && n > 0 => n,
      _ => return Err(ClumpError::InvalidDimensions { nx, ny, nz }),
    };
    self.nx = nx;
    self.ny = ny;
    self.nz = nz;
    self.intervals.clear();
    self.rows.clear();
    self
      .rows
      .try_reserve_exact(num_rows)
      .map_err(|source| ClumpError::Allocation { resource: Resource::RowIndex, source })?;
    self.rows.resize(num_rows, RowHdr::default());
    Ok(num_rows)
  }

  /// Replaces the contents of this set with the intervals of a scan stream and
  /// returns the total number of intervals.
  ///
  /// The whole stream is validated before anything is copied into the pool.
  /// A record pointing outside the grid, overrunning the stream, containing
  /// inverted, out-of-range or unordered intervals, or repeating a row that
  /// was already described, is rejected with `ClumpError::MalformedInput`; on
  /// any error the set is left empty.
  pub fn load_scan<W: PrimInt>(
    &mut self,
    scan: &[W],
    nx: usize,
    ny: usize,
    nz: usize,
  ) -> ClumpResult<usize> {
    let result = self.parse_scan(scan, nx, ny, nz);
    if result.is_err() {
      self.intervals.clear();
      self.rows.iter_mut().for_each(|hdr| *hdr = RowHdr::default());
    }
    result
  }

  fn parse_scan<W: PrimInt>(
    &mut self,
    scan: &[W],
    nx: usize,
    ny: usize,
    nz: usize,
  ) -> ClumpResult<usize> {
    let num_rows = self.reset(nx, ny, nz)?;

    //(1) Validate all records and fill in the row index
    let mut seen = Vec::new();
    seen
      .try_reserve_exact(num_rows)
      .map_err(|source| ClumpError::Allocation { resource: Resource::RowIndex, source })?;
    seen.resize(num_rows, false);

    let mut pos = 0;
    let mut tot_intervals = 0;
    while pos < scan.len() {
      let record = pos;
      let available = scan.len() - pos;
      if available < 2 {
        return Err(malformed(record, ScanFault::Truncated { needed: 2, available }));
      }
      let row = read_word(scan, pos, record)?;
      let count = read_word(scan, pos + 1, record)?;
      if row >= num_rows {
        return Err(malformed(record, ScanFault::RowOutOfRange { row, rows: num_rows }));
      }
      let needed = count.checked_mul(2).and_then(|n| n.checked_add(2)).unwrap_or(usize::MAX);
      if needed > available {
        return Err(malformed(record, ScanFault::Truncated { needed, available }));
      }
      if seen[row] {
        return Err(malformed(record, ScanFault::DuplicateRow { row }));
      }
      seen[row] = true;

      let mut prev_end: Option<usize> = None;
      for k in 0..count {
        let begin = read_word(scan, pos + 2 + 2 * k, record)?;
        let end = read_word(scan, pos + 3 + 2 * k, record)?;
        if begin > end {
          return Err(malformed(record, ScanFault::InvertedInterval { begin, end }));
        }
        if end >= nx {
          return Err(malformed(record, ScanFault::ColumnOutOfRange { end, nx }));
        }
        if let Some(prev_end) = prev_end {
          if begin <= prev_end {
            return Err(malformed(record, ScanFault::Unordered { prev_end, begin }));
          }
        }
        prev_end = Some(end);
      }

      self.rows[row] = RowHdr { count, offset: tot_intervals };
      tot_intervals += count;
      pos += needed;
    }

    //(2) Size the pool once, then copy the intervals over in record order
    self
      .intervals
      .try_reserve_exact(tot_intervals)
      .map_err(|source| ClumpError::Allocation { resource: Resource::IntervalPool, source })?;

    let mut pos = 0;
    while pos < scan.len() {
      let row_in_vol = read_word(scan, pos, pos)?;
      let count = read_word(scan, pos + 1, pos)?;
      let (plane, row) = (row_in_vol / ny, row_in_vol % ny);
      for k in 0..count {
        let begin = read_word(scan, pos + 2 + 2 * k, pos)?;
        let end = read_word(scan, pos + 3 + 2 * k, pos)?;
        self.intervals.push(Interval::new(plane, row, begin, end));
      }
      pos += 2 + 2 * count;
    }

    log::debug!(
      "parsed {} scan words into {tot_intervals} intervals ({nx}x{ny}x{nz} grid)",
      scan.len()
    );
    Ok(tot_intervals)
  }

  /// Replaces the contents of this set with the runs of cells in `grid` for
  /// which `marked` returns true. Returns the total number of intervals.
  pub fn load_grid_with<T, F>(&mut self, grid: nd::ArrayView2<T>, marked: F) -> ClumpResult<usize>
  where
    T: Sync,
    F: Fn(&T) -> bool + Sync,
  {
    self.load_volume_with(grid.insert_axis(nd::Axis(0)), marked)
  }

  /// Like `load_grid_with`, for a `(nz, ny, nx)` volume.
  pub fn load_volume_with<T, F>(
    &mut self,
    volume: nd::ArrayView3<T>,
    marked: F,
  ) -> ClumpResult<usize>
  where
    T: Sync,
    F: Fn(&T) -> bool + Sync,
  {
    let (nz, ny, nx) = volume.dim();
    self.reset(nx, ny, nz)?;

    //Rows are independent, so we can look for runs in parallel
    let lanes: Vec<nd::ArrayView1<T>> = volume.rows().into_iter().collect();
    let runs: Vec<Vec<(usize, usize)>> =
      lanes.par_iter().map(|lane| find_runs(lane, &marked)).collect();

    let tot_intervals = runs.iter().map(Vec::len).sum();
    self
      .intervals
      .try_reserve_exact(tot_intervals)
      .map_err(|source| ClumpError::Allocation { resource: Resource::IntervalPool, source })?;

    for (row_in_vol, row_runs) in runs.into_iter().enumerate() {
      let (plane, row) = (row_in_vol / ny, row_in_vol % ny);
      self.rows[row_in_vol] = RowHdr { count: row_runs.len(), offset: self.intervals.len() };
      self
        .intervals
        .extend(row_runs.into_iter().map(|(begin, end)| Interval::new(plane, row, begin, end)));
    }

    Ok(tot_intervals)
  }

  /// Encodes this set in the scan format. Rows without intervals are left out.
  /// Fails with `ClumpError::Unrepresentable` if a row index, count or column
  /// does not fit in `W`.
  pub fn to_scan<W: PrimInt>(&self) -> ClumpResult<Vec<W>> {
    fn put<W: PrimInt>(scan: &mut Vec<W>, val: usize) -> ClumpResult<()> {
      let word = <W as num_traits::NumCast>::from(val)
        .ok_or(ClumpError::Unrepresentable { value: val, word: scan.len() })?;
      scan.push(word);
      Ok(())
    }

    let mut scan = Vec::with_capacity(2 * self.rows.len() + 2 * self.intervals.len());
    for (row_in_vol, hdr) in self.rows.iter().enumerate().filter(|(_, hdr)| hdr.count > 0) {
      put(&mut scan, row_in_vol)?;
      put(&mut scan, hdr.count)?;
      for interval in &self.intervals[hdr.range()] {
        put(&mut scan, interval.begin)?;
        put(&mut scan, interval.end)?;
      }
    }
    Ok(scan)
  }

  /// Grid dimensions `(nx, ny, nz)`
  pub fn dims(&self) -> (usize, usize, usize) {
    (self.nx, self.ny, self.nz)
  }

  /// Number of row headers (`ny * nz`)
  pub fn num_rows(&self) -> usize {
    self.rows.len()
  }

  pub fn num_intervals(&self) -> usize {
    self.intervals.len()
  }

  /// Total number of marked cells
  pub fn num_points(&self) -> usize {
    self.intervals.iter().map(Interval::num_points).sum()
  }

  /// All intervals, in pool order
  pub fn intervals(&self) -> &[Interval] {
    &self.intervals
  }

  /// The row index, addressed by `plane * ny + row`
  pub fn row_hdrs(&self) -> &[RowHdr] {
    &self.rows
  }

  /// Intervals of one row. Rows outside the grid are empty.
  pub fn row(&self, plane: usize, row: usize) -> &[Interval] {
    if plane >= self.nz || row >= self.ny {
      return &[];
    }
    &self.intervals[self.rows[plane * self.ny + row].range()]
  }

  /// Marks every interval as `UNASSIGNED` again.
  pub fn reset_ids(&mut self) {
    self.intervals.iter_mut().for_each(|interval| interval.id = UNASSIGNED);
  }

  /// The interval covering cell `(plane, row, col)`, if that cell is marked.
  pub fn interval_at(&self, plane: usize, row: usize, col: usize) -> Option<&Interval> {
    let row = self.row(plane, row);
    let idx = row.partition_point(|interval| interval.end < col);
    row.get(idx).filter(|interval| interval.begin <= col)
  }

  /// Clump id of cell `(plane, row, col)`; `None` if the cell is not marked.
  pub fn clump_at(&self, plane: usize, row: usize, col: usize) -> Option<usize> {
    self.interval_at(plane, row, col).map(|interval| interval.id)
  }

  /// Bounding box of the intervals with pool indices `refs`, e.g. the
  /// intervals of one clump. Indices outside the pool are ignored; `None` if
  /// no index is valid.
  pub fn bounding_box(&self, refs: &[usize]) -> Option<BoundingBox> {
    let first = refs.iter().find_map(|&idx| self.intervals.get(idx))?;
    let init = BoundingBox {
      xmin: first.begin,
      xmax: first.end,
      ymin: first.row,
      ymax: first.row,
      zmin: first.plane,
      zmax: first.plane,
    };
    let bbox = refs.iter().filter_map(|&idx| self.intervals.get(idx)).fold(init, |bbox, iv| {
      BoundingBox {
        xmin: bbox.xmin.min(iv.begin),
        xmax: bbox.xmax.max(iv.end),
        ymin: bbox.ymin.min(iv.row),
        ymax: bbox.ymax.max(iv.row),
        zmin: bbox.zmin.min(iv.plane),
        zmax: bbox.zmax.max(iv.plane),
      }
    });
    Some(bbox)
  }

  /// Paints the clump id of every interval into a `(nz, ny, nx)` label grid.
  /// Unmarked cells are 0, marked but unclumped cells are `UNASSIGNED` too.
  pub fn label_volume(&self) -> nd::Array3<usize> {
    let mut labels = nd::Array3::<usize>::zeros((self.nz, self.ny, self.nx));
    if self.ny == 0 {
      return labels;
    }
    labels.axis_iter_mut(nd::Axis(0)).into_par_iter().zip(self.rows.par_chunks(self.ny)).for_each(
      |(mut plane, hdrs)| {
        for (mut row, hdr) in plane.outer_iter_mut().zip(hdrs) {
          for interval in &self.intervals[hdr.range()] {
            row.slice_mut(nd::s![interval.begin..=interval.end]).fill(interval.id);
          }
        }
      },
    );
    labels
  }

  /// Label grid of a single plane, see `label_volume`.
  pub fn label_plane(&self, plane: usize) -> Option<nd::Array2<usize>> {
    if plane >= self.nz {
      return None;
    }
    let mut labels = nd::Array2::<usize>::zeros((self.ny, self.nx));
    for (mut row, hdr) in labels.outer_iter_mut().zip(&self.rows[plane * self.ny..]) {
      for interval in &self.intervals[hdr.range()] {
        row.slice_mut(nd::s![interval.begin..=interval.end]).fill(interval.id);
      }
    }
    Some(labels)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn fault(result: ClumpResult<IntervalSet>) -> ScanFault {
    match result {
      Err(ClumpError::MalformedInput { fault, .. }) => fault,
      other => panic!("expected malformed input, got {other:?}"),
    }
  }

  #[test]
  fn parse_scan_records() {
    //Rows may come in any order, absent rows stay empty
    let scan: [u32; 10] = [3, 1, 2, 4, 0, 2, 0, 1, 5, 7];
    let set = IntervalSet::from_scan(&scan, 8, 5, 1).unwrap();
    assert_eq!(set.num_intervals(), 3);
    assert_eq!(set.row_hdrs()[3], RowHdr { count: 1, offset: 0 });
    assert_eq!(set.row_hdrs()[0], RowHdr { count: 2, offset: 1 });
    assert_eq!(set.row_hdrs()[1].count, 0);
    assert_eq!(set.row(0, 0)[1], Interval::new(0, 0, 5, 7));
    assert_eq!(set.num_points(), 3 + 2 + 3);
  }

  #[test]
  fn scan_rows_span_planes() {
    let scan: [i32; 8] = [0, 1, 0, 0, 5, 1, 1, 2];
    let set = IntervalSet::from_scan(&scan, 4, 3, 2).unwrap();
    assert_eq!(set.row(1, 2), &[Interval::new(1, 2, 1, 2)]);
  }

  #[test]
  fn reject_malformed_scans() {
    assert_eq!(
      fault(IntervalSet::from_scan(&[7u32, 0], 4, 4, 1)),
      ScanFault::RowOutOfRange { row: 7, rows: 4 }
    );
    assert_eq!(
      fault(IntervalSet::from_scan(&[0u32, 2, 0, 1, 3], 4, 4, 1)),
      ScanFault::Truncated { needed: 6, available: 5 }
    );
    assert_eq!(
      fault(IntervalSet::from_scan(&[0u32], 4, 4, 1)),
      ScanFault::Truncated { needed: 2, available: 1 }
    );
    assert_eq!(
      fault(IntervalSet::from_scan(&[0u32, 1, 3, 1], 4, 4, 1)),
      ScanFault::InvertedInterval { begin: 3, end: 1 }
    );
    assert_eq!(
      fault(IntervalSet::from_scan(&[0u32, 1, 1, 4], 4, 4, 1)),
      ScanFault::ColumnOutOfRange { end: 4, nx: 4 }
    );
    assert_eq!(
      fault(IntervalSet::from_scan(&[0u32, 2, 0, 1, 1, 2], 4, 4, 1)),
      ScanFault::Unordered { prev_end: 1, begin: 1 }
    );
    assert_eq!(
      fault(IntervalSet::from_scan(&[1u32, 0, 1, 0], 4, 4, 1)),
      ScanFault::DuplicateRow { row: 1 }
    );
    assert_eq!(
      fault(IntervalSet::from_scan(&[0i32, -1], 4, 4, 1)),
      ScanFault::BadWord { index: 1 }
    );
  }

  #[test]
  fn failed_load_leaves_set_empty() {
    let mut set = IntervalSet::from_scan(&[0u32, 1, 0, 3], 4, 2, 1).unwrap();
    assert!(set.load_scan(&[0u32, 1, 0, 3, 9, 0], 4, 2, 1).is_err());
    assert_eq!(set.num_intervals(), 0);
    assert!(set.row_hdrs().iter().all(|hdr| hdr.count == 0));
  }

  #[test]
  fn zero_dims_rejected() {
    let err = IntervalSet::from_scan::<u32>(&[], 0, 4, 1).unwrap_err();
    assert!(matches!(err, ClumpError::InvalidDimensions { nx: 0, .. }));
  }

  #[test]
  fn grid_runs_and_scan_round_trip() {
    let grid = nd::array![[0, 5, 5, 0, 5], [0, 0, 0, 0, 0], [9, 9, 9, 9, 9]];
    let set = IntervalSet::from_grid(grid.view(), 5).unwrap();
    assert_eq!(set.row(0, 0), &[Interval::new(0, 0, 1, 2), Interval::new(0, 0, 4, 4)]);
    assert!(set.row(0, 1).is_empty());
    assert_eq!(set.row(0, 2), &[Interval::new(0, 2, 0, 4)]);

    let scan = set.to_scan::<u16>().unwrap();
    assert_eq!(scan, vec![0, 2, 1, 2, 4, 4, 2, 1, 0, 4]);
    let again = IntervalSet::from_scan(&scan, 5, 3, 1).unwrap();
    assert_eq!(again.intervals(), set.intervals());

    let below = IntervalSet::from_grid_below(grid.view(), 5).unwrap();
    assert_eq!(below.num_points(), 2 + 5);
  }

  #[test]
  fn overlap_rule() {
    let a = Interval::new(0, 0, 2, 5);
    assert_eq!(a.overlap(&Interval::new(0, 1, 5, 9)), 1);
    assert_eq!(a.overlap(&Interval::new(0, 1, 6, 9)), 0);
    assert_eq!(a.overlap(&Interval::new(0, 1, 8, 9)), -2);
    assert!(a.overlaps(&Interval::new(0, 1, 0, 2), 1));
    assert!(!a.overlaps(&Interval::new(0, 1, 0, 1), 1));
    assert!(a.overlaps(&Interval::new(0, 1, 0, 1), 0));
  }

  #[test]
  fn point_lookup_and_bbox() {
    let grid = nd::array![[1, 1, 0, 1], [0, 1, 1, 1]];
    let set = IntervalSet::from_grid(grid.view(), 1).unwrap();
    assert_eq!(set.interval_at(0, 1, 2), Some(&Interval::new(0, 1, 1, 3)));
    assert_eq!(set.clump_at(0, 0, 2), None);
    assert_eq!(set.clump_at(0, 7, 0), None);

    let bbox = set.bounding_box(&[0, 2]).unwrap();
    assert_eq!((bbox.xmin, bbox.xmax, bbox.ymin, bbox.ymax), (0, 3, 0, 1));
    assert_eq!(set.bounding_box(&[]), None);
    assert_eq!(set.bounding_box(&[99]), None);

    //Stale indices are skipped, wherever they appear
    let bbox = set.bounding_box(&[99, 2, 42]).unwrap();
    assert_eq!((bbox.xmin, bbox.xmax, bbox.ymin, bbox.ymax), (1, 3, 1, 1));
  }

  #[test]
  fn scan_encoding_overflow() {
    let mut grid = nd::Array2::<u8>::zeros((2, 300));
    grid[[0, 3]] = 1;
    grid[[1, 299]] = 1;
    let set = IntervalSet::from_grid(grid.view(), 1).unwrap();

    //Row 1 header is fine, its column is not: words 0..=3 hold row 0
    match set.to_scan::<u8>() {
      Err(ClumpError::Unrepresentable { value: 299, word: 6 }) => {}
      other => panic!("expected an encoding error, got {other:?}"),
    }
    assert_eq!(set.to_scan::<u16>().unwrap(), vec![0, 1, 3, 3, 1, 1, 299, 299]);
  }

  #[test]
  fn volume_runs_below_and_custom() {
    let mut volume = nd::Array3::<f32>::from_elem((2, 3, 4), 10.0);
    volume[[0, 0, 1]] = 1.0;
    volume[[0, 0, 2]] = 2.0;
    volume.slice_mut(nd::s![1, 2, ..]).fill(-3.0);

    let below = IntervalSet::from_volume_below(volume.view(), 5.0).unwrap();
    assert_eq!(below.dims(), (4, 3, 2));
    assert_eq!(below.num_intervals(), 2);
    assert_eq!(below.num_points(), 2 + 4);
    assert_eq!(below.row(0, 0), &[Interval::new(0, 0, 1, 2)]);
    assert_eq!(below.row(1, 2), &[Interval::new(1, 2, 0, 3)]);

    //Any predicate works, and reloading reuses the set
    let mut set = IntervalSet::new();
    let total = set.load_volume_with(volume.view(), |val| *val < 0.0 || *val == 2.0).unwrap();
    assert_eq!(total, 2);
    assert_eq!(set.row(0, 0), &[Interval::new(0, 0, 2, 2)]);
    assert_eq!(set.num_points(), 1 + 4);
    assert_eq!(set.load_volume_with(volume.view(), |_| false).unwrap(), 0);
    assert_eq!(set.num_rows(), 6);
  }
}
