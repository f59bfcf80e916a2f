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

use serde_derive::{Deserialize, Serialize};
use std::fmt;

/// Physical constants of a central body, used by the ground stations to place themselves on its surface.
///
/// These are set once (usually from [PhysicalConstants::EARTH]) and never mutated afterward.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhysicalConstants {
    /// Gravitational parameter in km^3/s^2
    pub mu_km3_s2: f64,
    /// Equatorial radius in km
    pub equatorial_radius_km: f64,
    /// Flattening of the reference ellipsoid (unitless)
    pub flattening: f64,
    /// Second zonal harmonic (unitless)
    pub j2: f64,
    /// Mean rotation rate in rad/s
    pub rotation_rate_rad_s: f64,
    /// Rotation angle of the body fixed frame at J2000, in degrees
    pub rotation_angle_j2000_deg: f64,
}

impl PhysicalConstants {
    /// Earth constants from WGS84 and EGM2008, with the GMST at J2000.
    pub const EARTH: Self = Self {
        mu_km3_s2: 398_600.435_436,
        equatorial_radius_km: 6_378.137,
        flattening: 0.003_352_810_664_747_480_5,
        j2: 1.082_626_684_e-3,
        rotation_rate_rad_s: 7.292_115_146_706_979e-5,
        rotation_angle_j2000_deg: 280.460_618_37,
    };

    /// Polar radius in km, from the equatorial radius and the flattening.
    pub fn polar_radius_km(&self) -> f64 {
        self.equatorial_radius_km * (1.0 - self.flattening)
    }

    /// Square of the eccentricity of the reference ellipsoid.
    pub fn eccentricity_sq(&self) -> f64 {
        2.0 * self.flattening - self.flattening.powi(2)
    }
}

impl Default for PhysicalConstants {
    fn default() -> Self {
        Self::EARTH
    }
}

impl fmt::Display for PhysicalConstants {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "μ = {} km^3/s^2    R = {} km    f = {:.6e}    J2 = {:.6e}    ω = {:.6e} rad/s",
            self.mu_km3_s2,
            self.equatorial_radius_km,
            self.flattening,
            self.j2,
            self.rotation_rate_rad_s
        )
    }
}
