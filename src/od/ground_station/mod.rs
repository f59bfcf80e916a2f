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

use crate::cosmic::PhysicalConstants;
use crate::linalg::{Vector3, Vector6};
use crate::time::Epoch;
use crate::utils::tilde_matrix;
use nalgebra::Rotation3;
use serde_derive::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use typed_builder::TypedBuilder;

pub mod builtin;

/// The geometry of an observer: its position and velocity at any epoch.
///
/// Implementations must be deterministic functions of time, as the state is queried both when a measurement is built
/// and each time its partials are recomputed.
pub trait StationGeometry: fmt::Debug + Send + Sync {
    /// Unique name of this station, used to identify it in tracking data.
    fn name(&self) -> &str;

    /// Returns the position (km) and velocity (km/s) of this station at the provided epoch, in the same inertial frame
    /// as the estimated state.
    fn state_at(&self, epoch: Epoch) -> Vector6<f64>;
}

/// Stations indexed by their name, used to rebuild measurements from their records.
pub type Stations = BTreeMap<String, Arc<dyn StationGeometry>>;

/// A station whose state does not change with time.
#[derive(Clone, Debug, PartialEq)]
pub struct FixedStation {
    pub name: String,
    /// Position (km) and velocity (km/s)
    pub state: Vector6<f64>,
}

impl FixedStation {
    pub fn new<S: Into<String>>(name: S, state: Vector6<f64>) -> Self {
        Self {
            name: name.into(),
            state,
        }
    }
}

impl StationGeometry for FixedStation {
    fn name(&self) -> &str {
        &self.name
    }

    fn state_at(&self, _epoch: Epoch) -> Vector6<f64> {
        self.state
    }
}

impl fmt::Display for FixedStation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} (fixed at [{}, {}, {}] km)",
            self.name, self.state[0], self.state[1], self.state[2]
        )
    }
}

/// GroundStation defines a station on the surface of a rotating body, e.g. a ranging and Doppler antenna.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[builder(doc)]
pub struct GroundStation {
    #[builder(setter(into))]
    pub name: String,
    /// in degrees
    pub latitude_deg: f64,
    /// in degrees
    pub longitude_deg: f64,
    /// in km
    #[builder(default)]
    pub height_km: f64,
    /// Constants of the body this station is on
    #[builder(default = PhysicalConstants::EARTH)]
    #[serde(default)]
    pub constants: PhysicalConstants,
}

impl GroundStation {
    /// Initializes a point on the surface of the Earth.
    pub fn from_point(name: String, latitude_deg: f64, longitude_deg: f64, height_km: f64) -> Self {
        Self {
            name,
            latitude_deg,
            longitude_deg,
            height_km,
            constants: PhysicalConstants::EARTH,
        }
    }

    /// Position of this station in the body fixed frame, in km.
    ///
    /// NOTE: This computation differs from the spherical coordinates because we consider the flattening of body.
    /// Reference: G. Xu and Y. Xu, "GPS", DOI 10.1007/978-3-662-50367-6_2, 2016
    pub fn body_fixed_position(&self) -> Vector3<f64> {
        let e2 = self.constants.eccentricity_sq();
        let (sin_long, cos_long) = self.longitude_deg.to_radians().sin_cos();
        let (sin_lat, cos_lat) = self.latitude_deg.to_radians().sin_cos();
        // page 144
        let c_body = self.constants.equatorial_radius_km / ((1.0 - e2 * sin_lat.powi(2)).sqrt());
        let s_body = c_body * (1.0 - e2);

        Vector3::new(
            (c_body + self.height_km) * cos_lat * cos_long,
            (c_body + self.height_km) * cos_lat * sin_long,
            (s_body + self.height_km) * sin_lat,
        )
    }

    /// Rotation angle of the body fixed frame with respect to the inertial frame, in radians.
    ///
    /// The body is assumed to rotate uniformly about its Z axis since noon UTC on 2000-01-01.
    pub fn rotation_angle_rad(&self, epoch: Epoch) -> f64 {
        let j2000 = Epoch::from_gregorian_utc_hms(2000, 1, 1, 12, 0, 0);
        self.constants.rotation_angle_j2000_deg.to_radians()
            + self.constants.rotation_rate_rad_s * (epoch - j2000).to_seconds()
    }
}

impl StationGeometry for GroundStation {
    fn name(&self) -> &str {
        &self.name
    }

    fn state_at(&self, epoch: Epoch) -> Vector6<f64> {
        let dcm = Rotation3::from_axis_angle(&Vector3::z_axis(), self.rotation_angle_rad(epoch));
        let radius = dcm * self.body_fixed_position();
        // Transport theorem, the station is at rest in the body fixed frame
        let omega = Vector3::new(0.0, 0.0, self.constants.rotation_rate_rad_s);
        let velocity = tilde_matrix(&omega) * radius;

        Vector6::new(
            radius.x, radius.y, radius.z, velocity.x, velocity.y, velocity.z,
        )
    }
}

impl fmt::Display for GroundStation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} (lat.: {:.2} deg    long.: {:.2} deg    alt.: {:.2} m)",
            self.name,
            self.latitude_deg,
            self.longitude_deg,
            self.height_km * 1e3,
        )
    }
}
