use odmsr::io::stations::StationConfig;
use odmsr::io::ConfigRepr;
use odmsr::linalg::Vector3;
use odmsr::od::prelude::*;
use odmsr::PhysicalConstants;
use rstest::*;
use std::env;
use std::f64::consts::TAU;
use std::path::PathBuf;

#[rstest]
#[case(GroundStation::dss65_madrid())]
#[case(GroundStation::dss34_canberra())]
#[case(GroundStation::dss13_goldstone())]
fn dsn_station_states(#[case] gs: GroundStation) {
    let omega = PhysicalConstants::EARTH.rotation_rate_rad_s;
    let epoch = Epoch::from_gregorian_utc_hms(2024, 3, 20, 3, 6, 0);

    let state = gs.state_at(epoch);
    let position = Vector3::new(state[0], state[1], state[2]);
    let velocity = Vector3::new(state[3], state[4], state[5]);

    assert!(position.norm() >= PhysicalConstants::EARTH.polar_radius_km());
    assert!(position.norm() <= PhysicalConstants::EARTH.equatorial_radius_km + gs.height_km);
    assert!((velocity - Vector3::new(0.0, 0.0, omega).cross(&position)).norm() < 1e-12);

    // Back in the same spot after one sidereal rotation
    let later = gs.state_at(epoch + (TAU / omega).seconds());
    assert!((later - state).norm() < 1e-6, "{}", (later - state).norm());

    // The state is deterministic
    assert_eq!(gs.state_at(epoch), state);
}

#[test]
fn equator_station() {
    let gs = GroundStation::builder()
        .name("Equator")
        .latitude_deg(0.0)
        .longitude_deg(0.0)
        .build();

    assert_eq!(gs.height_km, 0.0);
    assert!(
        (gs.body_fixed_position().norm() - PhysicalConstants::EARTH.equatorial_radius_km).abs()
            < 1e-9
    );
    assert_eq!(gs.name(), "Equator");
}

#[test]
fn load_station_file() {
    let _ = pretty_env_logger::try_init();

    let station_file: PathBuf = [
        env!("CARGO_MANIFEST_DIR"),
        "data",
        "tests",
        "config",
        "many_ground_stations.yaml",
    ]
    .iter()
    .collect();

    let configs = StationConfig::load_many(station_file).unwrap();
    assert_eq!(configs.len(), 3);

    let stations = StationConfig::into_stations(configs).unwrap();
    assert_eq!(
        stations.keys().cloned().collect::<Vec<_>>(),
        vec![
            "Beacon".to_string(),
            "Demo ground station".to_string(),
            "Moon lander".to_string()
        ]
    );

    let epoch = Epoch::from_gregorian_tai_at_midnight(2024, 1, 1);
    assert_eq!(stations["Beacon"].state_at(epoch)[0], 42_164.0);
    // The lander uses the constants of the Moon
    let lander = stations["Moon lander"].state_at(epoch);
    assert!(Vector3::new(lander[0], lander[1], lander[2]).norm() < 1_740.0);
}
