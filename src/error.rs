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

//! Error types shared by all stages of the clumping pipeline.

use std::collections::TryReserveError;
use std::fmt;
use thiserror::Error;

/// The growable buffers whose allocation may fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
  /// The shared pool holding every interval of a grid
  IntervalPool,
  /// The per-row `RowHdr` index
  RowIndex,
  /// The clump table and its interval ordering
  ClumpTable,
  /// The flood-fill stack
  FloodFillStack,
}

impl fmt::Display for Resource {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Resource::IntervalPool => "interval pool",
      Resource::RowIndex => "row index",
      Resource::ClumpTable => "clump table",
      Resource::FloodFillStack => "flood-fill stack",
    };
    f.write_str(name)
  }
}

/// The ways in which a run-length encoded scan stream can be malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanFault {
  #[error("word {index} is negative or does not fit the target integer type")]
  BadWord { index: usize },
  #[error("row {row} is out of range (grid has {rows} rows)")]
  RowOutOfRange { row: usize, rows: usize },
  #[error("record needs {needed} words but only {available} remain")]
  Truncated { needed: usize, available: usize },
  #[error("interval begins at {begin} but ends at {end}")]
  InvertedInterval { begin: usize, end: usize },
  #[error("interval ends at column {end} but the grid has {nx} columns")]
  ColumnOutOfRange { end: usize, nx: usize },
  #[error("interval starting at {begin} overlaps or precedes the previous one ending at {prev_end}")]
  Unordered { prev_end: usize, begin: usize },
  #[error("row {row} appears in more than one record")]
  DuplicateRow { row: usize },
}

/// Errors produced by the flood-fill stack.
#[derive(Debug, Error)]
pub enum StackError {
  /// The configured maximum stack length was reached
  #[error("stack limit of {limit} entries reached")]
  LimitReached { limit: usize },
  /// The allocator refused to grow the stack
  #[error("could not grow stack: {0}")]
  Alloc(#[source] TryReserveError),
}

/// Main error type of this crate.
#[derive(Debug, Clone, Error)]
pub enum ClumpError {
  /// One of the growable buffers could not be (re)allocated. This is never
  /// reported as "zero clumps found".
  #[error("could not allocate {resource}: {source}")]
  Allocation {
    resource: Resource,
    #[source]
    source: TryReserveError,
  },

  /// The scan stream could not be parsed. `offset` is the index of the word
  /// at which the offending record starts.
  #[error("malformed scan record at word {offset}: {fault}")]
  MalformedInput { offset: usize, fault: ScanFault },

  /// The flood-fill stack ran out of room while clump `clump` was being
  /// traversed; the clump is missing cells.
  #[error("traversal of clump {clump} stopped after {intervals} interval(s): flood-fill stack exhausted")]
  PartialTraversal { clump: usize, intervals: usize },

  #[error("grid dimensions ({nx}, {ny}, {nz}) must all be non-zero")]
  InvalidDimensions { nx: usize, ny: usize, nz: usize },

  /// A 2D clumper was handed a multi-plane volume
  #[error("2D clumper cannot process a volume with {planes} planes")]
  DimensionMismatch { planes: usize },

  /// `to_scan` met a row index or column that does not fit the word type
  #[error("cannot encode {value} as scan word {word}: value does not fit the word type")]
  Unrepresentable { value: usize, word: usize },

  #[error("invalid clumping configuration: {0}")]
  Config(String),
}

pub type ClumpResult<T> = std::result::Result<T, ClumpError>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn error_display() {
    let err = ClumpError::MalformedInput {
      offset: 4,
      fault: ScanFault::RowOutOfRange { row: 12, rows: 10 },
    };
    assert_eq!(
      format!("{err}"),
      "malformed scan record at word 4: row 12 is out of range (grid has 10 rows)"
    );

    let err = ClumpError::PartialTraversal { clump: 3, intervals: 17 };
    assert!(format!("{err}").contains("clump 3"));
    assert_eq!(format!("{}", Resource::FloodFillStack), "flood-fill stack");

    let err = ClumpError::Unrepresentable { value: 300, word: 2 };
    assert!(!format!("{err}").contains("malformed"));
  }
}
