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

use crate::io::{epoch_from_str, epoch_to_str};
use crate::linalg::{Matrix2, Vector2};
use crate::od::msr::{Measurement, RangeDoppler};
use crate::od::{MeasurementError, Stations};
use crate::time::Epoch;
use crate::TimeTagged;
use serde_derive::{Deserialize, Serialize};

/// A single observation as read from a tracking data source: epoch, station, range and range rate, in that order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackingRecord {
    #[serde(serialize_with = "epoch_to_str", deserialize_with = "epoch_from_str")]
    pub epoch: Epoch,
    pub station: String,
    pub range_km: f64,
    pub range_rate_km_s: f64,
}

impl TrackingRecord {
    /// Builds the range and range rate measurement of this record with the provided noise covariance.
    ///
    /// # Errors
    /// + `UnknownStation` if the station of this record is not in the provided stations.
    /// + `MalformedState` if the range or range rate is not finite.
    pub fn into_measurement(
        self,
        stations: &Stations,
        covar: Matrix2<f64>,
    ) -> Result<Measurement<RangeDoppler>, MeasurementError> {
        let station = stations
            .get(&self.station)
            .cloned()
            .ok_or(MeasurementError::UnknownStation { name: self.station })?;

        Measurement::from_observation(
            RangeDoppler,
            self.epoch,
            station,
            Vector2::new(self.range_km, self.range_rate_km_s),
            covar,
        )
    }
}

impl TimeTagged for TrackingRecord {
    fn epoch(&self) -> Epoch {
        self.epoch
    }
}
