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

#[derive(Clone, Debug, Default)]
pub struct PerfReport {
  pub intervals: usize,
  pub clumps: usize,
  pub points: usize,
  pub partial: usize,
  pub stack_peak: usize,
  pub stack_grows: usize,
  pub clump_us: usize,
}

impl PerfReport {
  pub fn us_per_interval(&self) -> f64 {
    if self.intervals == 0 {
      return 0.0;
    }
    self.clump_us as f64 / self.intervals as f64
  }
}

impl std::fmt::Display for PerfReport {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    writeln!(f, ">---------[Performance Summary]---------")?;
    writeln!(f, ">  {} intervals, {} points", self.intervals, self.points)?;
    writeln!(f, ">  {} clumps ({} partial)", self.clumps, self.partial)?;
    writeln!(f, ">  Stack peak: {}; grown {}x", self.stack_peak, self.stack_grows)?;
    writeln!(f, ">--------------------------------+ total")?;
    write!(f, ">  {}µs; {:.3}µs per interval", self.clump_us, self.us_per_interval())
  }
}
