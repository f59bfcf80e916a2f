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

use super::{ConfigError, ConfigRepr, InvalidConfigSnafu};
use crate::cosmic::PhysicalConstants;
use crate::linalg::Vector6;
use crate::od::{FixedStation, GroundStation, StationGeometry, Stations};
use serde_derive::{Deserialize, Serialize};
use snafu::ensure;
use std::sync::Arc;

/// Serializable definition of a station: either a geodetic point on a rotating body, or a fixed inertial state.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StationConfig {
    pub name: String,
    pub latitude_deg: Option<f64>,
    pub longitude_deg: Option<f64>,
    pub height_km: Option<f64>,
    /// Constants of the body, defaults to the Earth
    pub constants: Option<PhysicalConstants>,
    /// Position (km) and velocity (km/s) of a station which does not move
    pub state: Option<Vec<f64>>,
}

impl ConfigRepr for StationConfig {}

impl ConfigRepr for GroundStation {}

impl StationConfig {
    /// Builds the station described by this configuration.
    pub fn into_station(self) -> Result<Arc<dyn StationGeometry>, ConfigError> {
        match (self.state, self.latitude_deg, self.longitude_deg) {
            (Some(state), None, None) => {
                ensure!(
                    state.len() == 6,
                    InvalidConfigSnafu {
                        reason: format!(
                            "station `{}` has {} state components instead of 6",
                            self.name,
                            state.len()
                        )
                    }
                );
                Ok(Arc::new(FixedStation::new(
                    self.name,
                    Vector6::from_column_slice(&state),
                )))
            }
            (None, Some(latitude_deg), Some(longitude_deg)) => {
                let mut gs = GroundStation::from_point(
                    self.name,
                    latitude_deg,
                    longitude_deg,
                    self.height_km.unwrap_or(0.0),
                );
                if let Some(constants) = self.constants {
                    gs.constants = constants;
                }
                Ok(Arc::new(gs))
            }
            _ => Err(ConfigError::InvalidConfig {
                reason: format!(
                    "station `{}` needs either a latitude and a longitude, or a state",
                    self.name
                ),
            }),
        }
    }

    /// Builds all of the provided stations, indexed by their names.
    pub fn into_stations(configs: Vec<Self>) -> Result<Stations, ConfigError> {
        let mut stations = Stations::new();
        for cfg in configs {
            let name = cfg.name.clone();
            ensure!(
                !stations.contains_key(&name),
                InvalidConfigSnafu {
                    reason: format!("station `{name}` is defined more than once")
                }
            );
            stations.insert(name, cfg.into_station()?);
        }
        Ok(stations)
    }
}
