/*
    Nyx, blazing fast astrodynamics
    Copyright (C) 2018-onwards Christopher Rabotin <christopher.rabotin@gmail.com>

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use super::{MeasurementKind, Observation};
use crate::time::{Duration, Epoch};
use std::collections::BTreeSet;
use std::fmt;

mod io_cache;
mod record;

pub use io_cache::{CacheError, MeasurementRecord, CACHE_VERSION};
pub use record::TrackingRecord;

/// Ordered tracking data: all of the measurements of an estimation run, possibly of different kinds and stations.
///
/// Measurements are appended in any order and [MeasurementSequence::sort] must be called once before handing the
/// sequence to an estimator. The sort is stable, so simultaneous measurements keep the order in which they were
/// appended. This structure is not meant to be shared across threads while being built: when measurements are
/// generated in parallel, build one sequence per producer and [MeasurementSequence::merge] them afterward.
#[derive(Default)]
pub struct MeasurementSequence {
    measurements: Vec<Box<dyn Observation>>,
    /// Source file if loaded from a cache or saved to one.
    pub source: Option<String>,
}

impl MeasurementSequence {
    /// Initializes an empty sequence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Initializes an empty sequence with room for the provided number of measurements.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            measurements: Vec::with_capacity(capacity),
            source: None,
        }
    }

    /// Appends a measurement at the end of this sequence.
    pub fn append<O: Observation + 'static>(&mut self, msr: O) {
        self.measurements.push(Box::new(msr));
    }

    /// Appends an already boxed measurement at the end of this sequence.
    pub fn append_boxed(&mut self, msr: Box<dyn Observation>) {
        self.measurements.push(msr);
    }

    /// Sorts this sequence in place by ascending epoch. Measurements with the same epoch keep their relative order.
    ///
    /// Callers who need the original order must keep their own copy of it.
    pub fn sort(&mut self) {
        if self.is_sorted() {
            trace!("{} measurements already sorted", self.len());
            return;
        }
        self.measurements.sort_by_key(|msr| msr.epoch());
        debug!("sorted {} measurements", self.len());
    }

    /// Returns whether the epochs of this sequence are non-decreasing.
    pub fn is_sorted(&self) -> bool {
        self.measurements
            .windows(2)
            .all(|pair| pair[0].epoch() <= pair[1].epoch())
    }

    /// Moves all of the measurements of the other sequence into this one, and sorts the result.
    pub fn merge(&mut self, other: Self) {
        debug!(
            "merging {} measurements into a sequence of {}",
            other.len(),
            self.len()
        );
        self.measurements.extend(other.measurements);
        self.sort();
    }

    /// Returns the number of measurements in this sequence
    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    /// Returns whether this sequence has no measurements.
    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    /// Returns the measurement at the provided index, if any.
    pub fn get(&self, index: usize) -> Option<&dyn Observation> {
        self.measurements.get(index).map(|msr| msr.as_ref())
    }

    /// Iterates through the measurements in their current order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Observation> + '_ {
        self.measurements.iter().map(|msr| msr.as_ref())
    }

    /// Returns the earliest epoch of this sequence
    pub fn start_epoch(&self) -> Option<Epoch> {
        self.iter().map(|msr| msr.epoch()).min()
    }

    /// Returns the latest epoch of this sequence
    pub fn end_epoch(&self) -> Option<Epoch> {
        self.iter().map(|msr| msr.epoch()).max()
    }

    /// Returns the minimum duration between two subsequent measurements.
    /// This is important to correctly set up the propagator and not miss any measurement.
    pub fn min_duration_sep(&self) -> Option<Duration> {
        let mut epochs = self.iter().map(|msr| msr.epoch()).collect::<Vec<_>>();
        epochs.sort();
        epochs.windows(2).map(|pair| pair[1] - pair[0]).min()
    }

    /// Returns the unique names of the stations of this sequence
    pub fn unique_stations(&self) -> BTreeSet<String> {
        self.iter()
            .map(|msr| msr.station().name().to_string())
            .collect()
    }

    /// Returns the unique measurement kinds of this sequence
    pub fn unique_kinds(&self) -> BTreeSet<MeasurementKind> {
        self.iter().map(|msr| msr.kind()).collect()
    }

    /// Returns a new sequence that only contains measurements from the desired station.
    pub fn filter_by_station(mut self, name: &str) -> Self {
        self.measurements
            .retain(|msr| msr.station().name() == name);
        self
    }
}

impl Extend<Box<dyn Observation>> for MeasurementSequence {
    fn extend<T: IntoIterator<Item = Box<dyn Observation>>>(&mut self, iter: T) {
        self.measurements.extend(iter);
    }
}

impl FromIterator<Box<dyn Observation>> for MeasurementSequence {
    fn from_iter<T: IntoIterator<Item = Box<dyn Observation>>>(iter: T) -> Self {
        Self {
            measurements: iter.into_iter().collect(),
            source: None,
        }
    }
}

impl fmt::Display for MeasurementSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.start_epoch(), self.end_epoch()) {
            (Some(start), Some(end)) => {
                let src = match &self.source {
                    Some(src) => format!(" (source: {src})"),
                    None => String::new(),
                };
                write!(
                    f,
                    "Measurement sequence with {} measurements of kind {:?} over {} (from {start} to {end}) with stations {:?}{src}",
                    self.len(),
                    self.unique_kinds(),
                    end - start,
                    self.unique_stations()
                )
            }
            _ => write!(f, "Empty measurement sequence"),
        }
    }
}

impl fmt::Debug for MeasurementSequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self} @ {self:p}")
    }
}
