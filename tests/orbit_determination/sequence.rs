use crate::{dsn_stations, station_at_origin};
use flate2::write::GzEncoder;
use flate2::Compression;
use odmsr::linalg::{DVector, Matrix1, Matrix2};
use odmsr::od::prelude::*;
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;
use rstest::*;
use std::io::Write;
use std::str::FromStr;

#[fixture]
fn stations() -> Stations {
    let mut stations = dsn_stations();
    stations.insert("Origin".to_string(), station_at_origin());
    stations
}

/// Simulates range and Doppler measurements of a slow drifting object from every station, appended station by
/// station (i.e. not in chronological order).
#[fixture]
fn simulated(stations: Stations) -> MeasurementSequence {
    let _ = pretty_env_logger::try_init();

    let start = Epoch::from_str("2023-02-22T19:18:17.16 UTC").unwrap();
    let mut rng = Pcg64Mcg::seed_from_u64(7);
    let mut seq = MeasurementSequence::new();

    for (name, station) in stations.iter() {
        if name == "Origin" {
            continue;
        }
        for i in 0..10_i64 {
            let epoch = start + (i * 60).seconds();
            let dt = (epoch - start).to_seconds();
            let state = DVector::from_vec(vec![
                42_164.0 + 0.1 * dt,
                -1_200.0,
                350.0,
                0.1,
                0.0,
                0.0,
            ]);
            let mut msr = Measurement::observe(
                RangeDoppler,
                &state,
                station.clone(),
                epoch,
                Matrix2::new(1e-6, 0.0, 0.0, 1e-12),
            )
            .unwrap();
            msr.add_white_noise(&[1e-3, 1e-6], &mut rng).unwrap();
            seq.append(msr);
        }
    }

    seq
}

#[rstest]
fn sort_sequence(simulated: MeasurementSequence) {
    let mut seq = simulated;
    assert_eq!(seq.len(), 30);
    assert!(!seq.is_sorted());

    let stations_before = seq
        .iter()
        .map(|msr| msr.station().name().to_string())
        .collect::<Vec<_>>();

    seq.sort();
    assert!(seq.is_sorted());
    println!("{seq}");

    // Ties keep the order in which the stations were appended
    let order = seq
        .iter()
        .map(|msr| msr.station().name().to_string())
        .collect::<Vec<_>>();
    for chunk in order.chunks(3) {
        assert_eq!(chunk, &["Canberra", "Goldstone", "Madrid"]);
    }
    assert_ne!(stations_before, order);

    // Sorting twice is sorting once
    let once = seq.iter().map(|msr| msr.to_record()).collect::<Vec<_>>();
    seq.sort();
    let twice = seq.iter().map(|msr| msr.to_record()).collect::<Vec<_>>();
    assert_eq!(once, twice);

    assert_eq!(seq.min_duration_sep(), Some(Duration::ZERO));
    assert_eq!(seq.end_epoch().unwrap() - seq.start_epoch().unwrap(), 9.minutes());
    assert_eq!(seq.unique_stations().len(), 3);
}

#[rstest]
fn already_sorted_sequence(stations: Stations) {
    let origin = stations["Origin"].clone();
    let start = Epoch::from_gregorian_tai_at_midnight(2024, 1, 1);

    let mut seq = MeasurementSequence::new();
    for i in 0..5_i64 {
        seq.append(
            Measurement::from_observation(
                Range,
                start + i.hours(),
                origin.clone(),
                odmsr::linalg::Vector1::new(7000.0 + i as f64),
                Matrix1::new(1e-6),
            )
            .unwrap(),
        );
    }

    let before = seq.iter().map(|msr| msr.to_record()).collect::<Vec<_>>();
    seq.sort();
    let after = seq.iter().map(|msr| msr.to_record()).collect::<Vec<_>>();
    assert_eq!(before, after);
    assert_eq!(seq.min_duration_sep(), Some(1.hours()));
}

#[rstest]
fn merge_producers(simulated: MeasurementSequence) {
    let madrid = simulated.filter_by_station("Madrid");
    assert_eq!(madrid.len(), 10);
    assert_eq!(madrid.unique_stations().len(), 1);

    let mut goldstone = MeasurementSequence::new();
    let station = dsn_stations()["Goldstone"].clone();
    let start = madrid.start_epoch().unwrap();
    for i in 0..5_i64 {
        goldstone.append(
            Measurement::observe(
                RangeRate,
                &DVector::from_vec(vec![42_164.0, 0.0, 0.0, 0.0, 3.07, 0.0]),
                station.clone(),
                start + (i * 90).seconds(),
                Matrix1::new(1e-12),
            )
            .unwrap(),
        );
    }

    let mut merged = madrid;
    merged.merge(goldstone);
    assert_eq!(merged.len(), 15);
    assert!(merged.is_sorted());
    assert_eq!(
        merged.unique_kinds().into_iter().collect::<Vec<_>>(),
        vec![MeasurementKind::RangeRate, MeasurementKind::RangeDoppler]
    );
}

#[rstest]
fn cache_round_trip(simulated: MeasurementSequence, stations: Stations) {
    let mut seq = simulated;
    seq.sort();

    let path = std::env::temp_dir().join("odmsr_cache_round_trip.yaml.gz");
    let saved = seq.save_cache(&path).unwrap();
    assert_eq!(saved, path);

    let loaded = MeasurementSequence::load_cache(&path, &stations).unwrap();
    assert_eq!(loaded.len(), seq.len());
    assert!(loaded.is_sorted());
    assert_eq!(loaded.source, Some(path.display().to_string()));

    for (orig, rebuilt) in seq.iter().zip(loaded.iter()) {
        assert_eq!(orig.epoch(), rebuilt.epoch());
        assert_eq!(orig.epoch().time_scale, rebuilt.epoch().time_scale);
        assert_eq!(orig.kind(), rebuilt.kind());
        assert_eq!(orig.station().name(), rebuilt.station().name());
        assert_eq!(orig.observation(), rebuilt.observation());
        assert_eq!(orig.covariance(), rebuilt.covariance());
    }

    let _ = std::fs::remove_file(path);
}

#[rstest]
fn cache_versions(stations: Stations) {
    let yaml = format!("version: {}\nsource: null\nrecords: []\n", CACHE_VERSION + 1);
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(yaml.as_bytes()).unwrap();
    let bytes = encoder.finish().unwrap();

    match MeasurementSequence::from_cache_bytes(&bytes, &stations) {
        Err(CacheError::UnsupportedVersion { found, expected }) => {
            assert_eq!(found, CACHE_VERSION + 1);
            assert_eq!(expected, CACHE_VERSION);
        }
        other => panic!("expected an unsupported version, got {other:?}"),
    }

    let empty = MeasurementSequence::new().to_cache_bytes().unwrap();
    assert!(MeasurementSequence::from_cache_bytes(&empty, &stations)
        .unwrap()
        .is_empty());

    assert!(matches!(
        MeasurementSequence::load_cache("this/cache/does/not/exist.yaml.gz", &stations),
        Err(CacheError::CacheIo { .. })
    ));
}

#[rstest]
fn ingest_records(stations: Stations) {
    let data = r#"
    - epoch: 2024-01-01T00:02:00 UTC
      station: Madrid
      range_km: 35790.12
      range_rate_km_s: 0.0012
    - epoch: 2024-01-01T00:00:00 UTC
      station: Canberra
      range_km: 37123.45
      range_rate_km_s: -0.0021
    - epoch: 2024-01-01T00:01:00 UTC
      station: Madrid
      range_km: 35790.05
      range_rate_km_s: 0.0011
    "#;
    let records: Vec<TrackingRecord> = serde_yaml::from_str(data).unwrap();

    let covar = Matrix2::new(1e-6, 0.0, 0.0, 1e-12);
    let mut seq = MeasurementSequence::new();
    for record in records {
        seq.append(record.into_measurement(&stations, covar).unwrap());
    }
    seq.sort();

    let first = seq.get(0).unwrap();
    assert_eq!(first.station().name(), "Canberra");
    assert_eq!(first.observation().as_slice(), &[37123.45, -0.0021]);
    assert_eq!(
        first.epoch(),
        Epoch::from_gregorian_utc_at_midnight(2024, 1, 1)
    );

    let unknown = TrackingRecord {
        epoch: Epoch::from_gregorian_utc_at_midnight(2024, 1, 1),
        station: "Kourou".to_string(),
        range_km: 1.0,
        range_rate_km_s: 0.0,
    };
    assert_eq!(
        unknown.into_measurement(&stations, covar).unwrap_err(),
        MeasurementError::UnknownStation {
            name: "Kourou".to_string()
        }
    );
}
