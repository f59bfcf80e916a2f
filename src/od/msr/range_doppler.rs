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

use super::model::{range_and_rate, split_station};
use super::{MeasurementKind, MeasurementModel};
use crate::linalg::{OVector, Vector2, Vector6, U10, U2, U6, U7, U9};
use crate::od::MeasurementError;
use hyperdual::OHyperdual;

/// A simultaneous range and Doppler (range rate) measurement in units of km and km/s.
///
/// The state is the position and velocity of the observed object, in the same frame as the station.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct RangeDoppler;

impl MeasurementModel for RangeDoppler {
    type StateSize = U6;
    type HyperdualSize = U7;
    type MeasurementSize = U2;

    fn kind(&self) -> MeasurementKind {
        MeasurementKind::RangeDoppler
    }

    fn calc_msr(
        &self,
        state: &Vector6<OHyperdual<f64, U7>>,
        station: &Vector6<OHyperdual<f64, U7>>,
    ) -> Result<Vector2<OHyperdual<f64, U7>>, MeasurementError> {
        // Extract data from hyperspace
        let (station_position, station_velocity) = split_station(station);
        let rel_position = state.fixed_rows::<3>(0).into_owned() - station_position;
        let rel_velocity = state.fixed_rows::<3>(3).into_owned() - station_velocity;

        // Code up math as usual
        let (range, range_rate) = range_and_rate(&rel_position, &rel_velocity)?;

        Ok(Vector2::new(range, range_rate))
    }
}

/// A simultaneous range and Doppler measurement where the position of the station is also estimated.
///
/// The state is the position and velocity of the observed object followed by the offset (in km) to add to the
/// nominal station position, i.e. nine components.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct RangeDopplerStationOffset;

impl MeasurementModel for RangeDopplerStationOffset {
    type StateSize = U9;
    type HyperdualSize = U10;
    type MeasurementSize = U2;

    fn kind(&self) -> MeasurementKind {
        MeasurementKind::RangeDopplerStationOffset
    }

    fn calc_msr(
        &self,
        state: &OVector<OHyperdual<f64, U10>, U9>,
        station: &Vector6<OHyperdual<f64, U10>>,
    ) -> Result<Vector2<OHyperdual<f64, U10>>, MeasurementError> {
        let (nominal_position, station_velocity) = split_station(station);
        // The offset carries the partials with respect to the station position
        let station_position = nominal_position + state.fixed_rows::<3>(6).into_owned();

        let rel_position = state.fixed_rows::<3>(0).into_owned() - station_position;
        let rel_velocity = state.fixed_rows::<3>(3).into_owned() - station_velocity;

        let (range, range_rate) = range_and_rate(&rel_position, &rel_velocity)?;

        Ok(Vector2::new(range, range_rate))
    }
}
