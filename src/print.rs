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

//! Human-readable dumps of interval sets and clump tables.

use std::fmt;
use std::io;

use crate::clump::{ClumpOrder, ClumpTable};
use crate::interval::{Interval, IntervalSet, RowHdr, UNASSIGNED};

impl fmt::Display for Interval {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "[z{} y{}] {}..={}", self.plane, self.row, self.begin, self.end)?;
    if self.id != UNASSIGNED {
      write!(f, " (clump {})", self.id)?;
    }
    Ok(())
  }
}

impl fmt::Display for RowHdr {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} interval(s) @ {}", self.count, self.offset)
  }
}

impl fmt::Display for ClumpOrder {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} interval(s), {} point(s)", self.interval_count, self.point_count)?;
    if self.partial {
      f.write_str(" [partial]")?;
    }
    Ok(())
  }
}

impl IntervalSet {
  /// Writes one line per non-empty row followed by its intervals.
  pub fn write_rows(&self, w: &mut impl io::Write) -> io::Result<()> {
    let (nx, ny, nz) = self.dims();
    writeln!(w, ">--[{nx}x{ny}x{nz} grid, {} interval(s)]", self.num_intervals())?;
    for (row_in_vol, hdr) in self.row_hdrs().iter().enumerate() {
      if hdr.count == 0 {
        continue;
      }
      writeln!(w, "row {row_in_vol}: {hdr}")?;
      for interval in &self.intervals()[hdr.range()] {
        writeln!(w, "  {interval}")?;
      }
    }
    Ok(())
  }
}

impl ClumpTable {
  /// Writes every clump and the intervals it is made of.
  pub fn write_clumps(&self, set: &IntervalSet, w: &mut impl io::Write) -> io::Result<()> {
    writeln!(w, ">--[{} clump(s), {} point(s)]", self.num_clumps(), self.total_points())?;
    for (id, order) in self.iter() {
      writeln!(w, "clump {id}: {order}")?;
      for interval in self.intervals(id).iter().filter_map(|&idx| set.intervals().get(idx)) {
        writeln!(w, "  {interval}")?;
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use crate::prelude::*;

  #[test]
  fn dumps() {
    let grid = nd::array![[1u8, 1, 0], [0, 0, 0], [0, 1, 1]];
    let mut clumper = ClumpingBuilder::new_2d().build().unwrap();
    let (set, table) = clumper.clump_grid(grid.view(), 1).unwrap();

    let mut rows = Vec::new();
    set.write_rows(&mut rows).unwrap();
    let rows = String::from_utf8(rows).unwrap();
    assert_eq!(
      rows,
      ">--[3x3x1 grid, 2 interval(s)]\n\
       row 0: 1 interval(s) @ 0\n  [z0 y0] 0..=1 (clump 1)\n\
       row 2: 1 interval(s) @ 1\n  [z0 y2] 1..=2 (clump 2)\n"
    );

    let mut clumps = Vec::new();
    table.write_clumps(&set, &mut clumps).unwrap();
    let clumps = String::from_utf8(clumps).unwrap();
    assert!(clumps.starts_with(">--[2 clump(s), 4 point(s)]\n"));
    assert!(clumps.contains("clump 2: 1 interval(s), 2 point(s)\n"));
  }
}
