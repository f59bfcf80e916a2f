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

use super::MeasurementKind;
use crate::linalg::allocator::Allocator;
use crate::linalg::{DefaultAllocator, DimName, OVector, Vector3, Vector6};
use crate::od::MeasurementError;
use hyperdual::{Float, OHyperdual, Owned};
use std::fmt;

/// Below this distance (in km) between the observer and the observed, the line of sight is undefined.
pub const SINGULARITY_EPSILON_KM: f64 = 1e-9;

/// A measurement model: the nonlinear function mapping a state and the state of the observer to what is measured.
///
/// The measurement function is only ever written once, in hyperdual space. The real part of its output is the computed
/// observation and the dual parts are the partials with respect to each component of the state. Every other
/// operation (construction, sensitivity, noise) is provided generically by [super::Measurement].
#[allow(clippy::type_complexity)]
pub trait MeasurementModel: Clone + fmt::Debug + Send + Sync + 'static {
    /// Size of the estimated state, e.g. U6 for a position and velocity.
    type StateSize: DimName;
    /// Size of the associated hyperdual numbers, always StateSize + U1.
    type HyperdualSize: DimName;
    /// Defines how much data is measured. For example, if measuring range and range rate, this should be of size 2 (nalgebra::U2).
    type MeasurementSize: DimName;

    /// The kind of this model, used to label and rebuild measurements.
    fn kind(&self) -> MeasurementKind;

    /// Computes the measurement from the state and the station state, both in hyperdual space.
    ///
    /// This must be a pure function. Models which do not override it fail on the first evaluation.
    fn calc_msr(
        &self,
        _state: &OVector<OHyperdual<f64, Self::HyperdualSize>, Self::StateSize>,
        _station: &Vector6<OHyperdual<f64, Self::HyperdualSize>>,
    ) -> Result<OVector<OHyperdual<f64, Self::HyperdualSize>, Self::MeasurementSize>, MeasurementError>
    where
        DefaultAllocator: Allocator<Self::StateSize>
            + Allocator<Self::HyperdualSize>
            + Allocator<Self::MeasurementSize>,
        Owned<f64, Self::HyperdualSize>: Copy,
    {
        Err(MeasurementError::UnimplementedMeasurement { kind: self.kind() })
    }
}

/// Computes the range and range rate from the relative position and velocity of the observed with respect to the observer.
///
/// The range rate is negative when the two are getting closer.
pub(crate) fn range_and_rate<H: DimName>(
    rel_position: &Vector3<OHyperdual<f64, H>>,
    rel_velocity: &Vector3<OHyperdual<f64, H>>,
) -> Result<(OHyperdual<f64, H>, OHyperdual<f64, H>), MeasurementError>
where
    DefaultAllocator: Allocator<H>,
    Owned<f64, H>: Copy,
{
    let rho = rel_position.dot(rel_position).sqrt();
    if !rho.real().is_finite() || rho.real() < SINGULARITY_EPSILON_KM {
        return Err(MeasurementError::SingularGeometry {
            reason: format!(
                "observer and observed are {} km apart (threshold is {SINGULARITY_EPSILON_KM} km)",
                rho.real()
            ),
        });
    }

    let rho_dot = rel_position.dot(rel_velocity) / rho;

    Ok((rho, rho_dot))
}

/// Splits a station state into its position and velocity.
pub(crate) fn split_station<H: DimName>(
    station: &Vector6<OHyperdual<f64, H>>,
) -> (Vector3<OHyperdual<f64, H>>, Vector3<OHyperdual<f64, H>>)
where
    DefaultAllocator: Allocator<H>,
    Owned<f64, H>: Copy,
{
    (
        station.fixed_rows::<3>(0).into_owned(),
        station.fixed_rows::<3>(3).into_owned(),
    )
}
