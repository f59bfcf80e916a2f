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

use super::trackingdata::MeasurementRecord;
use super::{MeasurementKind, MeasurementModel, Observation};
use crate::linalg::allocator::Allocator;
use crate::linalg::{DMatrix, DVector, DefaultAllocator, DimName, OMatrix, OVector, Vector6, U1};
use crate::od::noise::{Stochastics, WhiteNoise};
use crate::od::{
    DimensionMismatchSnafu, InvalidNoiseSnafu, MalformedStateSnafu, MeasurementError,
    StationGeometry,
};
use crate::time::Epoch;
use crate::utils::is_symmetric;
use crate::TimeTagged;
use hyperdual::{OHyperdual, Owned};
use rand::{Rng, RngCore};
use snafu::ensure;
use std::fmt;
use std::sync::Arc;

/// A measurement of a given model, made by a station at an epoch, with its noise covariance.
///
/// The value is computed once when built from a state (or taken as-is when built from an observation) and may only be
/// changed afterward by adding white noise.
#[derive(Clone, Debug)]
pub struct Measurement<M: MeasurementModel>
where
    DefaultAllocator: Allocator<M::MeasurementSize>
        + Allocator<M::MeasurementSize, M::MeasurementSize>,
{
    /// Measurement model used to compute this measurement and its partials
    pub model: M,
    /// Epoch of the observation
    pub epoch: Epoch,
    /// Station which made this measurement
    pub station: Arc<dyn StationGeometry>,
    value: OVector<f64, M::MeasurementSize>,
    covar: OMatrix<f64, M::MeasurementSize, M::MeasurementSize>,
}

impl<M: MeasurementModel> Measurement<M>
where
    DefaultAllocator: Allocator<M::StateSize>
        + Allocator<M::HyperdualSize>
        + Allocator<M::MeasurementSize>
        + Allocator<M::MeasurementSize, M::MeasurementSize>
        + Allocator<M::MeasurementSize, M::StateSize>,
    Owned<f64, M::HyperdualSize>: Copy,
{
    /// Computes a new measurement of the provided state as seen from the provided station state.
    ///
    /// # Errors
    /// + `MalformedState` if the state does not have exactly as many components as the model expects, or is not finite.
    /// + `SingularGeometry` if the measurement function is undefined at this state.
    /// + `InvalidCovariance` if the covariance is not symmetric with a non negative diagonal.
    pub fn new(
        model: M,
        state: &DVector<f64>,
        station_state: &Vector6<f64>,
        station: Arc<dyn StationGeometry>,
        epoch: Epoch,
        covar: OMatrix<f64, M::MeasurementSize, M::MeasurementSize>,
    ) -> Result<Self, MeasurementError> {
        let state = static_state::<M::StateSize>(state)?;
        validate_covariance(&covar)?;

        let (value, _) = linearize(&model, &state, station_state)?;

        trace!(
            "{} from {} @ {epoch}: {:?}",
            model.kind(),
            station.name(),
            value.as_slice()
        );

        Ok(Self {
            model,
            epoch,
            station,
            value,
            covar,
        })
    }

    /// Computes a new measurement of the provided state, querying the station for its state at the provided epoch.
    pub fn observe(
        model: M,
        state: &DVector<f64>,
        station: Arc<dyn StationGeometry>,
        epoch: Epoch,
        covar: OMatrix<f64, M::MeasurementSize, M::MeasurementSize>,
    ) -> Result<Self, MeasurementError> {
        let station_state = station.state_at(epoch);
        Self::new(model, state, &station_state, station, epoch, covar)
    }

    /// Initializes a new measurement from an actual observation, e.g. read from a tracking data file.
    pub fn from_observation(
        model: M,
        epoch: Epoch,
        station: Arc<dyn StationGeometry>,
        value: OVector<f64, M::MeasurementSize>,
        covar: OMatrix<f64, M::MeasurementSize, M::MeasurementSize>,
    ) -> Result<Self, MeasurementError> {
        ensure!(
            value.iter().all(|x| x.is_finite()),
            MalformedStateSnafu {
                reason: format!("observation is not finite: {:?}", value.as_slice())
            }
        );
        validate_covariance(&covar)?;

        Ok(Self {
            model,
            epoch,
            station,
            value,
            covar,
        })
    }

    /// Returns the value of this measurement.
    pub fn value(&self) -> &OVector<f64, M::MeasurementSize> {
        &self.value
    }

    /// Returns the measurement noise covariance.
    pub fn covar(&self) -> &OMatrix<f64, M::MeasurementSize, M::MeasurementSize> {
        &self.covar
    }

    /// Computes the expected observation and its sensitivity (H tilde) at the provided state in a single evaluation
    /// of the measurement function in hyperdual space.
    pub fn evaluate(
        &self,
        state: &OVector<f64, M::StateSize>,
        station_state: &Vector6<f64>,
    ) -> Result<
        (
            OVector<f64, M::MeasurementSize>,
            OMatrix<f64, M::MeasurementSize, M::StateSize>,
        ),
        MeasurementError,
    > {
        linearize(&self.model, state, station_state)
    }

    /// Returns the partials of the measurement function with respect to the state (H tilde).
    pub fn sensitivity(
        &self,
        state: &OVector<f64, M::StateSize>,
        station_state: &Vector6<f64>,
    ) -> Result<OMatrix<f64, M::MeasurementSize, M::StateSize>, MeasurementError> {
        Ok(self.evaluate(state, station_state)?.1)
    }
}

impl<M: MeasurementModel> TimeTagged for Measurement<M>
where
    DefaultAllocator: Allocator<M::MeasurementSize>
        + Allocator<M::MeasurementSize, M::MeasurementSize>,
{
    fn epoch(&self) -> Epoch {
        self.epoch
    }
}

impl<M: MeasurementModel> Observation for Measurement<M>
where
    DefaultAllocator: Allocator<M::StateSize>
        + Allocator<M::HyperdualSize>
        + Allocator<M::MeasurementSize>
        + Allocator<M::MeasurementSize, M::MeasurementSize>
        + Allocator<M::MeasurementSize, M::StateSize>,
    Owned<f64, M::HyperdualSize>: Copy,
    <DefaultAllocator as Allocator<M::MeasurementSize>>::Buffer<f64>: Send + Sync,
    <DefaultAllocator as Allocator<M::MeasurementSize, M::MeasurementSize>>::Buffer<f64>:
        Send + Sync,
{
    fn kind(&self) -> MeasurementKind {
        self.model.kind()
    }

    fn station(&self) -> &Arc<dyn StationGeometry> {
        &self.station
    }

    fn dimension(&self) -> usize {
        M::MeasurementSize::dim()
    }

    fn state_dimension(&self) -> usize {
        M::StateSize::dim()
    }

    fn observation(&self) -> DVector<f64> {
        DVector::from_column_slice(self.value.as_slice())
    }

    fn covariance(&self) -> DMatrix<f64> {
        let m = M::MeasurementSize::dim();
        DMatrix::from_column_slice(m, m, self.covar.as_slice())
    }

    fn partials(
        &self,
        state: &DVector<f64>,
        station_state: &Vector6<f64>,
    ) -> Result<DMatrix<f64>, MeasurementError> {
        let state = static_state::<M::StateSize>(state)?;
        let h_tilde = self.sensitivity(&state, station_state)?;

        Ok(DMatrix::from_column_slice(
            M::MeasurementSize::dim(),
            M::StateSize::dim(),
            h_tilde.as_slice(),
        ))
    }

    fn add_white_noise(
        &mut self,
        sigmas: &[f64],
        rng: &mut dyn RngCore,
    ) -> Result<(), MeasurementError> {
        inject_white_noise(&mut self.value, self.epoch, sigmas, rng)
    }

    fn to_record(&self) -> MeasurementRecord {
        MeasurementRecord::new(
            self.model.kind(),
            self.epoch,
            self.station.name().to_string(),
            self.value.as_slice(),
            &self.covar,
        )
    }
}

impl<M: MeasurementModel> fmt::Display for Measurement<M>
where
    DefaultAllocator: Allocator<M::MeasurementSize>
        + Allocator<M::MeasurementSize, M::MeasurementSize>,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kind = self.model.kind();
        write!(f, "[{}] {kind} @ {}:", self.station.name(), self.epoch)?;
        for (i, x) in self.value.iter().enumerate() {
            match kind.units().get(i) {
                Some(unit) => write!(f, " {x} {unit}")?,
                None => write!(f, " {x}")?,
            }
        }
        Ok(())
    }
}

/// Evaluates the measurement function with all of the state components lifted in hyperdual space at once, and splits
/// the output into its real part (the measurement) and its dual parts (the partials).
#[allow(clippy::type_complexity)]
fn linearize<M: MeasurementModel>(
    model: &M,
    state: &OVector<f64, M::StateSize>,
    station_state: &Vector6<f64>,
) -> Result<
    (
        OVector<f64, M::MeasurementSize>,
        OMatrix<f64, M::MeasurementSize, M::StateSize>,
    ),
    MeasurementError,
>
where
    DefaultAllocator: Allocator<M::StateSize>
        + Allocator<M::HyperdualSize>
        + Allocator<M::MeasurementSize>
        + Allocator<M::MeasurementSize, M::StateSize>,
    Owned<f64, M::HyperdualSize>: Copy,
{
    ensure!(
        M::HyperdualSize::dim() == M::StateSize::dim() + 1,
        MalformedStateSnafu {
            reason: format!(
                "{} has a hyperdual size of {} for a state of size {}",
                model.kind(),
                M::HyperdualSize::dim(),
                M::StateSize::dim()
            )
        }
    );

    // Build full state vector with partials in the right position
    let hyperstate: OVector<OHyperdual<f64, M::HyperdualSize>, M::StateSize> =
        OVector::from_fn_generic(M::StateSize::name(), U1::name(), |i, _| {
            let mut x = OHyperdual::from_real(state[i]);
            x[i + 1] = 1.0;
            x
        });
    // The station is not estimated here, so its partials are all zero
    let hyperstation: Vector6<OHyperdual<f64, M::HyperdualSize>> =
        station_state.map(|x| OHyperdual::from_real(x));

    let fx = model.calc_msr(&hyperstate, &hyperstation)?;

    // Extract result into the measurement and the sensitivity matrix
    let mut value = OVector::<f64, M::MeasurementSize>::zeros();
    let mut h_tilde = OMatrix::<f64, M::MeasurementSize, M::StateSize>::zeros();
    for i in 0..M::MeasurementSize::dim() {
        value[i] = fx[i].real();
        for j in 1..M::HyperdualSize::dim() {
            h_tilde[(i, j - 1)] = fx[i][j];
        }
    }

    if value.iter().chain(h_tilde.iter()).any(|x| !x.is_finite()) {
        warn!(
            "{} is not finite at state {:?}",
            model.kind(),
            state.as_slice()
        );
        return Err(MeasurementError::SingularGeometry {
            reason: format!("{} or its partials are not finite", model.kind()),
        });
    }

    Ok((value, h_tilde))
}

/// Converts a dynamically sized state into the size the model expects.
fn static_state<N: DimName>(state: &DVector<f64>) -> Result<OVector<f64, N>, MeasurementError>
where
    DefaultAllocator: Allocator<N>,
{
    ensure!(
        state.len() == N::dim(),
        MalformedStateSnafu {
            reason: format!(
                "expected {} state components but got {}",
                N::dim(),
                state.len()
            )
        }
    );
    ensure!(
        state.iter().all(|x| x.is_finite()),
        MalformedStateSnafu {
            reason: format!("state is not finite: {}", state.transpose())
        }
    );

    Ok(OVector::<f64, N>::from_column_slice(state.as_slice()))
}

/// Checks that the covariance is finite, symmetric, with a non negative diagonal and correlations within [-1; 1].
fn validate_covariance<D: DimName>(covar: &OMatrix<f64, D, D>) -> Result<(), MeasurementError>
where
    DefaultAllocator: Allocator<D, D>,
{
    let reason = if covar.iter().any(|x| !x.is_finite()) {
        Some("not finite".to_string())
    } else if !is_symmetric(covar, 1e-12) {
        Some("not symmetric".to_string())
    } else if let Some(i) = (0..D::dim()).find(|&i| covar[(i, i)] < 0.0) {
        Some(format!("variance #{i} is negative ({})", covar[(i, i)]))
    } else {
        (0..D::dim())
            .flat_map(|i| (0..i).map(move |j| (i, j)))
            .find(|&(i, j)| {
                covar[(i, j)].powi(2) > covar[(i, i)] * covar[(j, j)] * (1.0 + 1e-12)
            })
            .map(|(i, j)| format!("correlation between #{i} and #{j} exceeds one"))
    };

    match reason {
        Some(reason) => Err(MeasurementError::InvalidCovariance { reason }),
        None => Ok(()),
    }
}

/// Adds a sample of N(0, diag(σ^2)) to the value. All of the sigmas are checked before the value is changed.
fn inject_white_noise<D: DimName, R: Rng + ?Sized>(
    value: &mut OVector<f64, D>,
    epoch: Epoch,
    sigmas: &[f64],
    rng: &mut R,
) -> Result<(), MeasurementError>
where
    DefaultAllocator: Allocator<D>,
{
    ensure!(
        sigmas.len() == D::dim(),
        DimensionMismatchSnafu {
            action: "white noise injection",
            expected: D::dim(),
            got: sigmas.len()
        }
    );

    for (index, sigma) in sigmas.iter().copied().enumerate() {
        ensure!(
            sigma.is_finite() && sigma >= 0.0,
            InvalidNoiseSnafu { index, sigma }
        );
    }

    for (i, sigma) in sigmas.iter().copied().enumerate() {
        value[i] += WhiteNoise::constant_white_noise(sigma).sample(epoch, rng);
    }

    Ok(())
}
