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

//! Clumping many independent grids at once.
//!
//! A clumper is not shareable between threads (it owns a mutable stack), so
//! every rayon worker builds its own from the same `ClumpingBuilder`. Results
//! are returned in input order.

use ndarray as nd;
use rayon::prelude::*;

use crate::clump::{ClumpTable, Clumping, ClumpingBuilder};
use crate::error::ClumpResult;
use crate::interval::IntervalSet;

#[cfg(feature = "progress")]
fn set_up_bar(num_sets: usize) -> indicatif::ProgressBar {
  const TEMPLATE: &str = "{spinner}[{elapsed}/{duration}] clumped {pos}/{len}{bar:60}";
  let bar = indicatif::ProgressBar::new(num_sets as u64);
  if let Ok(style) = indicatif::ProgressStyle::with_template(TEMPLATE) {
    bar.set_style(style);
  }
  bar
}

/// Clumps every set in `sets` in parallel.
///
/// The builder is validated once up front; a configuration error fails the
/// whole batch. Errors of individual sets (including a worker that could not
/// allocate its stack) are reported in that set's slot.
pub fn clump_par(
  builder: &ClumpingBuilder,
  sets: &mut [IntervalSet],
) -> ClumpResult<Vec<ClumpResult<ClumpTable>>> {
  builder.clone().build()?;

  #[cfg(feature = "progress")]
  let bar = set_up_bar(sets.len());

  let tables = sets
    .par_iter_mut()
    .map_init(
      || builder.clone().build(),
      |clumper, set| {
        let table = match clumper {
          Ok(clumper) => clumper.clump(set),
          Err(err) => Err(err.clone()),
        };
        #[cfg(feature = "progress")]
        bar.inc(1);
        table
      },
    )
    .collect();

  #[cfg(feature = "progress")]
  bar.finish();

  log::debug!("clumped a batch of {} interval sets", sets.len());
  Ok(tables)
}

/// Extracts the intervals `>= threshold` of every grid and clumps them, in
/// parallel. See `clump_par`.
pub fn clump_grids_par<T>(
  builder: &ClumpingBuilder,
  grids: &[nd::ArrayView2<T>],
  threshold: T,
) -> ClumpResult<Vec<ClumpResult<(IntervalSet, ClumpTable)>>>
where
  T: PartialOrd + Sync + Copy,
{
  builder.clone().build()?;

  Ok(
    grids
      .par_iter()
      .map_init(
        || builder.clone().build(),
        |clumper, grid| -> ClumpResult<(IntervalSet, ClumpTable)> {
          let clumper = clumper.as_mut().map_err(|err| err.clone())?;
          let mut set = IntervalSet::from_grid(grid.view(), threshold)?;
          let table = clumper.clump(&mut set)?;
          Ok((set, table))
        },
      )
      .collect(),
  )
}
