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

use snafu::prelude::Snafu;

pub use crate::TimeTagged;

/// Provides the ground stations, i.e. the geometry of the observers.
pub mod ground_station;
pub use ground_station::{FixedStation, GroundStation, StationGeometry, Stations};

/// Provides noise modeling
pub mod noise;

/// Provides all of the supported measurement models
pub mod msr;

use msr::MeasurementKind;

#[allow(unused_imports)]
pub mod prelude {
    pub use super::ground_station::*;
    pub use super::msr::trackingdata::*;
    pub use super::msr::*;
    pub use super::noise::{Stochastics, WhiteNoise};
    pub use super::*;

    pub use crate::time::{Duration, Epoch, TimeUnits, Unit};
}

/// Errors raised while building or linearizing a measurement. None of these are retried: every operation is a
/// deterministic computation, so the caller must fix its inputs.
#[derive(Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum MeasurementError {
    #[snafu(display("malformed state: {reason}"))]
    MalformedState { reason: String },
    #[snafu(display("singular measurement geometry: {reason}"))]
    SingularGeometry { reason: String },
    #[snafu(display("{action} expects {expected} components but got {got}"))]
    DimensionMismatch {
        action: &'static str,
        expected: usize,
        got: usize,
    },
    #[snafu(display("{kind:?} does not implement its measurement function"))]
    UnimplementedMeasurement { kind: MeasurementKind },
    #[snafu(display("invalid covariance: {reason}"))]
    InvalidCovariance { reason: String },
    #[snafu(display("invalid white noise sigma #{index}: {sigma}"))]
    InvalidNoise { index: usize, sigma: f64 },
    #[snafu(display("unknown station `{name}`"))]
    UnknownStation { name: String },
}
