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

//! This module contains the code required to render clump label maps as
//! images.

use ndarray as nd;
use plotters::prelude::*;
use std::{error::Error, path::Path};

//Colour for unmarked (and unclumped) px
const BACKGROUND: RGBColor = BLACK;

/// Deterministic, well-spread colour for a clump id. Neighbouring ids get very
/// different colours.
#[inline(always)]
pub fn label_colour(label: usize) -> RGBColor {
  if label == crate::UNASSIGNED {
    return BACKGROUND;
  }
  //Fibonacci hashing
  let hash = (label as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
  let [r, g, b, ..] = hash.to_be_bytes();
  //Keep clumps clearly brighter than the background
  RGBColor(r | 0x40, g | 0x40, b | 0x40)
}

/// Saves a `(ny, nx)` label grid (see `IntervalSet::label_plane`) as a png.
/// Each pixel in the image corresponds 1:1 to a cell of the grid.
pub fn plot_labels(labels: nd::ArrayView2<usize>, file_name: &Path) -> Result<(), Box<dyn Error>> {
  let (ny, nx) = labels.dim();

  //Make new fig
  let root = BitMapBackend::new(file_name, (nx as u32, ny as u32)).into_drawing_area();
  root.fill(&BACKGROUND)?;

  //make empty drawing area in fig
  let mut chart = ChartBuilder::on(&root).build_cartesian_2d(0..nx as u32, 0..ny as u32)?;
  chart.configure_mesh().disable_mesh().disable_axes().draw()?;
  let plotting_area = chart.plotting_area();

  //fill pixels
  for ((y, x), &label) in labels.indexed_iter() {
    if label != crate::UNASSIGNED {
      plotting_area.draw_pixel((x as u32, y as u32), &label_colour(label))?
    }
  }

  //save file
  root.present()?;

  log::debug!("label map saved as png: {file_name:?}");
  Ok(())
}
