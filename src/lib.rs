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

/*! # odmsr

Orbit determination measurement models: range, range-rate and their combinations, whose sensitivity matrices
(often referred to as H tilde) are computed exactly by automatic differentiation in hyperdual space.

The estimator (Kalman filter or batch least squares) is not part of this crate: it consumes the [od::msr::Observation]
trait, which exposes the observed value, its covariance, its epoch and the partials at any state estimate.
*/

/// Provides the physical constants and the time tagging trait.
pub mod cosmic;

/// Utility functions shared by different modules.
pub mod utils;

/// All the input/output needs for this library, i.e. loading configurations from YAML.
pub mod io;

/// All the measurement models, ground stations, noise models and tracking data containers.
pub mod od;

#[macro_use]
extern crate log;
extern crate hifitime;
extern crate nalgebra as na;

/// Re-export of hifitime
pub mod time {
    pub use hifitime::*;
}

/// Re-export nalgebra
pub mod linalg {
    pub use na::base::*;
}

/// Re-export some useful things
pub use self::cosmic::{PhysicalConstants, TimeTagged};
pub use self::od::MeasurementError;
