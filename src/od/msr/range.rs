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
use crate::linalg::{Vector1, Vector6, U1, U6, U7};
use crate::od::MeasurementError;
use hyperdual::OHyperdual;

/// A standard measurement of range (km)
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Range;

impl MeasurementModel for Range {
    type StateSize = U6;
    type HyperdualSize = U7;
    type MeasurementSize = U1;

    fn kind(&self) -> MeasurementKind {
        MeasurementKind::Range
    }

    fn calc_msr(
        &self,
        state: &Vector6<OHyperdual<f64, U7>>,
        station: &Vector6<OHyperdual<f64, U7>>,
    ) -> Result<Vector1<OHyperdual<f64, U7>>, MeasurementError> {
        let (station_position, station_velocity) = split_station(station);
        let rel_position = state.fixed_rows::<3>(0).into_owned() - station_position;
        let rel_velocity = state.fixed_rows::<3>(3).into_owned() - station_velocity;

        let (range, _) = range_and_rate(&rel_position, &rel_velocity)?;

        Ok(Vector1::new(range))
    }
}
