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

use crate::linalg::{DMatrix, DVector, Vector6};
use crate::od::{MeasurementError, StationGeometry};
use crate::TimeTagged;
use rand::RngCore;
use serde_derive::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

mod model;
pub use model::{MeasurementModel, SINGULARITY_EPSILON_KM};

mod measurement;
pub use measurement::Measurement;

mod range;
mod range_doppler;
mod rangerate;

pub use range::Range;
pub use range_doppler::{RangeDoppler, RangeDopplerStationOffset};
pub use rangerate::RangeRate;

/// Provides the measurement sequence and its persisted cache.
pub mod trackingdata;
use trackingdata::MeasurementRecord;

/// The kinds of measurement models known to this crate.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MeasurementKind {
    /// Range only, in km
    Range,
    /// Range rate only, in km/s
    RangeRate,
    /// Simultaneous range and range rate, in km and km/s
    RangeDoppler,
    /// Simultaneous range and range rate where the station position offset is also estimated
    RangeDopplerStationOffset,
    /// A model defined outside of this crate
    Custom(u8),
}

impl MeasurementKind {
    /// Returns the units of each component of this kind of measurement, if known.
    pub fn units(&self) -> &'static [&'static str] {
        match self {
            Self::Range => &["km"],
            Self::RangeRate => &["km/s"],
            Self::RangeDoppler | Self::RangeDopplerStationOffset => &["km", "km/s"],
            Self::Custom(_) => &[],
        }
    }
}

impl fmt::Display for MeasurementKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Range => write!(f, "Range"),
            Self::RangeRate => write!(f, "Range rate"),
            Self::RangeDoppler => write!(f, "Range & range rate"),
            Self::RangeDopplerStationOffset => write!(f, "Range & range rate (station offset)"),
            Self::Custom(id) => write!(f, "Custom #{id}"),
        }
    }
}

/// The estimator facing interface of a measurement, with dynamically sized vectors so that measurements of different
/// kinds can be stored together and processed one after another.
pub trait Observation: TimeTagged + fmt::Debug + Send + Sync {
    /// Kind of measurement model used to compute this measurement.
    fn kind(&self) -> MeasurementKind;

    /// Station which made this measurement.
    fn station(&self) -> &Arc<dyn StationGeometry>;

    /// Number of components of this measurement.
    fn dimension(&self) -> usize;

    /// Number of components of the state this measurement is sensitive to.
    fn state_dimension(&self) -> usize;

    /// Returns the measurement/observation as a vector.
    fn observation(&self) -> DVector<f64>;

    /// Returns the measurement noise covariance.
    fn covariance(&self) -> DMatrix<f64>;

    /// Returns the measurement sensitivity (often referred to as H tilde) at the provided state and station state.
    fn partials(
        &self,
        state: &DVector<f64>,
        station_state: &Vector6<f64>,
    ) -> Result<DMatrix<f64>, MeasurementError>;

    /// Returns the measurement sensitivity at the provided state, querying the station at the epoch of this measurement.
    fn partials_at(&self, state: &DVector<f64>) -> Result<DMatrix<f64>, MeasurementError> {
        let station_state = self.station().state_at(self.epoch());
        self.partials(state, &station_state)
    }

    /// Adds one draw of zero mean white noise with the provided one-sigma values to this measurement.
    fn add_white_noise(
        &mut self,
        sigmas: &[f64],
        rng: &mut dyn RngCore,
    ) -> Result<(), MeasurementError>;

    /// Returns the serializable record of this measurement.
    fn to_record(&self) -> MeasurementRecord;
}
