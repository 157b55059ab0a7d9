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

#![doc(
  html_logo_url = "https://raw.githubusercontent.com/smups/rustronomy/main/logos/Rustronomy_ferris.png?raw=true"
)]
//! Rustronomy-clump is a pure-rust implementation of interval-based connected
//! component ("clump") analysis of thresholded 2D and 3D grids, as used to
//! identify storms in radar volumes or clouds in intensity maps.
//!
//! # Features
//! Marked cells (for instance all cells above a threshold) are first compressed
//! into *intervals*: maximal runs of marked cells within one row. All intervals
//! of a grid live in one pool, indexed per row. The clumper then partitions the
//! intervals into *clumps*: maximal groups of intervals connected through
//! overlapping column ranges in adjacent rows (and, for volumes, adjacent
//! planes). Clumps are found with an explicit flood-fill stack, so arbitrarily
//! large clumps never overflow the call stack.
//!
//! In addition, `rustronomy-clump` provides extra functionality which can be
//! accessed via cargo feature gates. A list of all additional features [can be found
//! below](#cargo-feature-gates).
//!
//! # Quickstart
//! To use the latest release of Rustronomy-clump in a cargo project, add
//! the rustronomy-clump crate as a dependency to your `Cargo.toml` file:
//! ```toml
//! [dependencies]
//! rustronomy-clump = "0.1.0"
//! ```
//! If you want to use the latest (unstable) development version of
//! rustronomy-clump, you can do so by using the `git` field (which fetches
//! the latest version from the repo) rather than the `version` field
//! (which downloads the latest released version from crates.io).
//! ```toml
//! {git = "https://github.com/smups/rustronomy-clump"}
//! ```
//!
//! ## Short example: clumping a thresholded field
//! `rustronomy-clump` uses the commonly used "builder pattern" to configure
//! the clumper before running it. To configure a clumper, create an instance of
//! the `ClumpingBuilder` struct. Once you are done specifying options, call the
//! `build()` function to generate a (`Sync`&`Send`) clumper object, which can be
//! reused for as many grids as you like.
//! ```rust
//! use rustronomy_clump::prelude::*;
//!
//! let field = nd::array![
//!   [0.0, 3.1, 2.0, 0.0, 0.0],
//!   [0.0, 0.0, 2.5, 0.0, 4.0],
//!   [0.0, 0.0, 0.0, 0.0, 5.0],
//! ];
//! let mut clumper = ClumpingBuilder::new_2d().build().unwrap();
//! let (set, clumps) = clumper.clump_grid(field.view(), 2.0).unwrap();
//! assert_eq!(clumps.num_clumps(), 2);
//! assert_eq!(set.clump_at(0, 2, 4), Some(2));
//! ```
//!
//! ## Scan format
//! Upstream tools often describe marked cells as a flat stream of integers
//! `(row_index, interval_count, (begin, end) × interval_count)`. Such streams
//! can be loaded directly with `IntervalSet::from_scan`:
//! ```rust
//! use rustronomy_clump::prelude::*;
//!
//! //row 0: cells 1..=2, row 1: cells 2..=3
//! let scan: [u32; 8] = [0, 1, 1, 2, 1, 1, 2, 3];
//! let mut set = IntervalSet::from_scan(&scan, 4, 2, 1).unwrap();
//! let mut clumper = ClumpingBuilder::new_2d().build().unwrap();
//! let clumps = clumper.clump(&mut set).unwrap();
//! assert_eq!(clumps.get(1).unwrap().point_count, 4);
//! ```
//!
//! # Cargo feature gates
//! *By default, all features behind cargo feature gates are **disabled***
//! - `jemalloc`: this feature enables the [jemalloc allocator](https://jemalloc.net).
//! From the jemalloc website: *"jemalloc is a general purpose `malloc`(3)
//! implementation that emphasizes fragmentation avoidance and scalable concurrency
//! support."*. Jemalloc is enabled though usage of the `jemalloc` crate, which
//! increases compile times considerably. To compile `rustronomy-clump` with the
//! `jemalloc` feature, jemalloc must be installed on the host system.
//! - `plots`: this feature adds the `plotting` module, which renders label maps
//! (see `IntervalSet::label_plane`) as png images. Plotting support adds the
//! `plotters` crate as a dependency, which increases compile times and requires
//! the installation of some packages on linux systems,
//! [see the `plotters` documentation for details](https://docs.rs/plotters/).
//! - `progress`: this feature enables progress bars for batch clumping
//! (`clump_par`). Enabling this feature adds the `indicatif` crate as a dependency,
//! which should not considerably slow down compile times.
//! - `debug`: this feature enables performance monitoring output. After every
//! clumping run a performance summary is emitted at the `debug` log level.
//! Enabling this feature does not add additional dependencies.
//!
//! # Logging
//! This crate logs through the [`log`](https://docs.rs/log) facade. Clumps that
//! had to be flagged as partial are reported at the `warn` level, per-call
//! summaries at the `debug` level. Install any `log` implementation to see them.

//Set Jemalloc as the global allocator for this crate
#[cfg(feature = "jemalloc")]
#[global_allocator]
static GLOBAL: jemallocator::Jemalloc = jemallocator::Jemalloc;

////////////////////////////////////////////////////////////////////////////////
//                                 CORE MODULES                               //
////////////////////////////////////////////////////////////////////////////////

pub mod batch;
pub mod clump;
pub mod error;
pub mod interval;
mod print;
pub mod stack;

pub use batch::{clump_grids_par, clump_par};
pub use clump::{
  ClumpOrder, ClumpTable, ClumpUtils, Clumping, ClumpingBuilder, PartialPolicy, PlaneClumper,
  VolumeClumper, MAX_MIN_OVERLAP,
};
pub use error::{ClumpError, ClumpResult, Resource, ScanFault, StackError};
pub use interval::{BoundingBox, Interval, IntervalSet, RowHdr, UNASSIGNED};
pub use stack::{FloodFillStack, Stack2d, Stack3d};

//Utility prelude for batch import
pub mod prelude {
  pub use crate::{
    clump_grids_par, clump_par, ClumpError, ClumpTable, ClumpUtils, Clumping, ClumpingBuilder,
    IntervalSet, PartialPolicy,
  };
  pub use ndarray as nd;
  #[cfg(feature = "plots")]
  pub use crate::plotting::plot_labels;
}

////////////////////////////////////////////////////////////////////////////////
//                             OPTIONAL MODULES                               //
////////////////////////////////////////////////////////////////////////////////

#[cfg(feature = "debug")]
mod performance_monitoring;

#[cfg(feature = "plots")]
pub mod plotting;
