use crate::{dsn_stations, station_at_origin};
use approx::assert_relative_eq;
use hyperdual::{OHyperdual, Owned};
use odmsr::linalg::allocator::Allocator;
use odmsr::linalg::{
    DVector, DefaultAllocator, DimName, Matrix1, Matrix2, OMatrix, OVector, Vector1, Vector6, U1,
    U6, U7,
};
use odmsr::od::prelude::*;
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;
use rstest::*;
use std::sync::Arc;

#[fixture]
fn epoch() -> Epoch {
    Epoch::from_gregorian_utc_hms(2024, 3, 20, 3, 6, 0)
}

/// A low Earth orbit, in km and km/s.
#[fixture]
fn leo() -> DVector<f64> {
    DVector::from_vec(vec![
        -2436.45, -2436.45, 6891.037, 5.088_611, -5.088_611, 0.0,
    ])
}

#[fixture]
fn madrid() -> Arc<dyn StationGeometry> {
    dsn_stations()["Madrid"].clone()
}

/// Checks that the partials computed in hyperdual space match central finite differences of the measurement function.
fn assert_partials_match<M: MeasurementModel>(
    model: M,
    state: &DVector<f64>,
    station: Arc<dyn StationGeometry>,
    epoch: Epoch,
) where
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
    let _ = pretty_env_logger::try_init();

    let station_state = station.state_at(epoch);
    let msr = Measurement::new(
        model,
        state,
        &station_state,
        station,
        epoch,
        OMatrix::<f64, M::MeasurementSize, M::MeasurementSize>::identity(),
    )
    .unwrap();

    let h_tilde = msr.partials_at(state).unwrap();
    assert_eq!(h_tilde.nrows(), M::MeasurementSize::dim());
    assert_eq!(h_tilde.ncols(), M::StateSize::dim());

    let step = 1e-2;
    for j in 0..state.len() {
        let mut plus = state.clone();
        plus[j] += step;
        let mut minus = state.clone();
        minus[j] -= step;

        let (f_plus, _) = msr
            .evaluate(
                &OVector::<f64, M::StateSize>::from_column_slice(plus.as_slice()),
                &station_state,
            )
            .unwrap();
        let (f_minus, _) = msr
            .evaluate(
                &OVector::<f64, M::StateSize>::from_column_slice(minus.as_slice()),
                &station_state,
            )
            .unwrap();

        for i in 0..M::MeasurementSize::dim() {
            let finite_diff = (f_plus[i] - f_minus[i]) / (2.0 * step);
            assert_relative_eq!(
                h_tilde[(i, j)],
                finite_diff,
                epsilon = 1e-9,
                max_relative = 1e-6
            );
        }
    }
}

#[rstest]
fn range_doppler_partials(leo: DVector<f64>, madrid: Arc<dyn StationGeometry>, epoch: Epoch) {
    assert_partials_match(RangeDoppler, &leo, madrid, epoch);
}

#[rstest]
fn range_partials(leo: DVector<f64>, madrid: Arc<dyn StationGeometry>, epoch: Epoch) {
    assert_partials_match(Range, &leo, madrid, epoch);
}

#[rstest]
fn range_rate_partials(leo: DVector<f64>, madrid: Arc<dyn StationGeometry>, epoch: Epoch) {
    assert_partials_match(RangeRate, &leo, madrid, epoch);
}

#[rstest]
fn station_offset_partials(leo: DVector<f64>, madrid: Arc<dyn StationGeometry>, epoch: Epoch) {
    let mut state = DVector::zeros(9);
    state.rows_mut(0, 6).copy_from(&leo);
    state[6] = 0.012;
    state[7] = -0.004;
    state[8] = 0.021;

    assert_partials_match(RangeDopplerStationOffset, &state, madrid.clone(), epoch);

    // The partials with respect to the station offset are the opposite of those with respect to the position
    let msr = Measurement::observe(
        RangeDopplerStationOffset,
        &state,
        madrid,
        epoch,
        Matrix2::identity(),
    )
    .unwrap();
    let h_tilde = msr.partials_at(&state).unwrap();
    for i in 0..2 {
        for j in 0..3 {
            assert_relative_eq!(h_tilde[(i, j + 6)], -h_tilde[(i, j)], epsilon = 1e-12);
        }
    }
}

#[rstest]
fn range_doppler_exact_value(epoch: Epoch) {
    let state = DVector::from_vec(vec![7000.0, 0.0, 0.0, 0.0, 7.5, 0.0]);
    let msr = Measurement::observe(
        RangeDoppler,
        &state,
        station_at_origin(),
        epoch,
        Matrix2::identity(),
    )
    .unwrap();

    assert_eq!(msr.observation().as_slice(), &[7000.0, 0.0]);
    assert_eq!(msr.dimension(), 2);
    assert_eq!(msr.state_dimension(), 6);

    // Only the x component of the position moves the range, and only the y velocity moves the range rate.
    let h_tilde = msr.partials_at(&state).unwrap();
    assert_relative_eq!(h_tilde[(0, 0)], 1.0, epsilon = 1e-15);
    assert_relative_eq!(h_tilde[(0, 1)], 0.0, epsilon = 1e-15);
    assert_relative_eq!(h_tilde[(1, 1)], 7.5 / 7000.0, epsilon = 1e-15);
    assert_relative_eq!(h_tilde[(1, 3)], 1.0, epsilon = 1e-15);
}

#[rstest]
fn approaching_is_negative(epoch: Epoch) {
    let state = DVector::from_vec(vec![7000.0, 0.0, 0.0, -1.0, 0.0, 0.0]);
    let msr = Measurement::observe(RangeRate, &state, station_at_origin(), epoch, Matrix1::new(1e-6))
        .unwrap();

    assert_eq!(msr.value(), &Vector1::new(-1.0));
    assert_eq!(format!("{msr}"), format!("[Origin] Range rate @ {epoch}: -1 km/s"));
}

#[rstest]
fn singular_geometry(epoch: Epoch) {
    let at_station = DVector::from_vec(vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    let err = Measurement::observe(
        RangeDoppler,
        &at_station,
        station_at_origin(),
        epoch,
        Matrix2::identity(),
    )
    .unwrap_err();
    assert!(matches!(err, MeasurementError::SingularGeometry { .. }));

    // A valid measurement still refuses to linearize at a singular state
    let msr = Measurement::observe(
        Range,
        &DVector::from_vec(vec![7000.0, 0.0, 0.0, 0.0, 7.5, 0.0]),
        station_at_origin(),
        epoch,
        Matrix1::new(1e-6),
    )
    .unwrap();
    assert!(matches!(
        msr.partials_at(&at_station),
        Err(MeasurementError::SingularGeometry { .. })
    ));
}

#[rstest]
fn malformed_states(epoch: Epoch) {
    for state in [
        DVector::from_vec(vec![7000.0, 0.0, 0.0]),
        DVector::from_vec(vec![7000.0, 0.0, 0.0, 0.0, 7.5, 0.0, 1.0]),
        DVector::from_vec(vec![7000.0, f64::NAN, 0.0, 0.0, 7.5, 0.0]),
    ] {
        let err = Measurement::observe(
            RangeDoppler,
            &state,
            station_at_origin(),
            epoch,
            Matrix2::identity(),
        )
        .unwrap_err();
        assert!(
            matches!(err, MeasurementError::MalformedState { .. }),
            "{err}"
        );
    }
}

#[rstest]
fn white_noise(leo: DVector<f64>, madrid: Arc<dyn StationGeometry>, epoch: Epoch) {
    let mut rng = Pcg64Mcg::seed_from_u64(1_234_567);

    let mut msr: Box<dyn Observation> = Box::new(
        Measurement::observe(
            RangeDoppler,
            &leo,
            madrid.clone(),
            epoch,
            Matrix2::new(2e-3_f64.powi(2), 0.0, 0.0, 3e-6_f64.powi(2)),
        )
        .unwrap(),
    );
    let truth = msr.observation();

    assert_eq!(
        msr.add_white_noise(&[2e-3], &mut rng),
        Err(MeasurementError::DimensionMismatch {
            action: "white noise injection",
            expected: 2,
            got: 1
        })
    );
    assert_eq!(msr.observation(), truth);

    msr.add_white_noise(&[0.0, 0.0], &mut rng).unwrap();
    assert_eq!(msr.observation(), truth);

    msr.add_white_noise(&[2e-3, 3e-6], &mut rng).unwrap();
    let noisy = msr.observation();
    assert_ne!(noisy[0], truth[0]);
    assert_ne!(noisy[1], truth[1]);
    // Six sigma bounds
    assert!((noisy[0] - truth[0]).abs() < 6.0 * 2e-3);
    assert!((noisy[1] - truth[1]).abs() < 6.0 * 3e-6);

    // Same seed, same noise
    let mut replay = Measurement::observe(
        RangeDoppler,
        &leo,
        madrid,
        epoch,
        Matrix2::identity(),
    )
    .unwrap();
    let mut rng = Pcg64Mcg::seed_from_u64(1_234_567);
    replay.add_white_noise(&[0.0, 0.0], &mut rng).unwrap();
    replay.add_white_noise(&[2e-3, 3e-6], &mut rng).unwrap();
    assert_eq!(replay.observation(), noisy);
}

/// Squared range, defined outside of the crate.
#[derive(Clone, Debug)]
struct RangeSquared;

impl MeasurementModel for RangeSquared {
    type StateSize = U6;
    type HyperdualSize = U7;
    type MeasurementSize = U1;

    fn kind(&self) -> MeasurementKind {
        MeasurementKind::Custom(1)
    }

    fn calc_msr(
        &self,
        state: &Vector6<OHyperdual<f64, U7>>,
        station: &Vector6<OHyperdual<f64, U7>>,
    ) -> Result<Vector1<OHyperdual<f64, U7>>, MeasurementError> {
        let rel = state.fixed_rows::<3>(0).into_owned() - station.fixed_rows::<3>(0).into_owned();
        Ok(Vector1::new(rel.dot(&rel)))
    }
}

/// Custom model whose author did not write the measurement function.
#[derive(Clone, Debug)]
struct Unfinished;

impl MeasurementModel for Unfinished {
    type StateSize = U6;
    type HyperdualSize = U7;
    type MeasurementSize = U1;

    fn kind(&self) -> MeasurementKind {
        MeasurementKind::Custom(2)
    }
}

#[rstest]
fn custom_models(leo: DVector<f64>, madrid: Arc<dyn StationGeometry>, epoch: Epoch) {
    assert_partials_match(RangeSquared, &leo, madrid.clone(), epoch);

    assert_eq!(
        Measurement::observe(Unfinished, &leo, madrid, epoch, Matrix1::new(1.0)).unwrap_err(),
        MeasurementError::UnimplementedMeasurement {
            kind: MeasurementKind::Custom(2)
        }
    );
}
