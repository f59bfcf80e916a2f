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

use super::MeasurementSequence;
use crate::linalg::allocator::Allocator;
use crate::linalg::{DefaultAllocator, DimName, OMatrix, OVector};
use crate::od::msr::{
    Measurement, MeasurementKind, MeasurementModel, Observation, Range, RangeDoppler,
    RangeDopplerStationOffset, RangeRate,
};
use crate::od::{DimensionMismatchSnafu, MeasurementError, Stations};
use crate::io::{timescale_from_str, timescale_to_str};
use crate::time::{Duration, Epoch, TimeScale};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use hyperdual::Owned;
use serde_derive::{Deserialize, Serialize};
use snafu::prelude::*;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Version of the layout of the measurement cache. A cache of any other version is rejected, never migrated.
pub const CACHE_VERSION: u16 = 1;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CacheError {
    #[snafu(display("I/O error when {action}: {source}"))]
    CacheIo {
        action: &'static str,
        source: std::io::Error,
    },
    #[snafu(display("YAML error when {action}: {source}"))]
    CacheYaml {
        action: &'static str,
        source: serde_yaml::Error,
    },
    #[snafu(display("measurement cache version {found} is not supported (expected {expected})"))]
    UnsupportedVersion { found: u16, expected: u16 },
    #[snafu(display("record #{index} is of kind {kind} which cannot be rebuilt from a cache"))]
    UnsupportedKind { index: usize, kind: MeasurementKind },
    #[snafu(display("record #{index} is invalid: {source}"))]
    InvalidRecord {
        index: usize,
        source: MeasurementError,
    },
}

/// The persisted form of a single measurement.
///
/// The epoch is stored as its TAI centuries and nanoseconds so that it is restored exactly, along with the time scale
/// it was expressed in. The covariance is stored row by row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    pub kind: MeasurementKind,
    pub tai_centuries: i16,
    pub tai_nanoseconds: u64,
    #[serde(serialize_with = "timescale_to_str", deserialize_with = "timescale_from_str")]
    pub time_scale: TimeScale,
    pub station: String,
    pub value: Vec<f64>,
    pub covariance: Vec<f64>,
}

impl MeasurementRecord {
    pub(crate) fn new<D: DimName>(
        kind: MeasurementKind,
        epoch: Epoch,
        station: String,
        value: &[f64],
        covar: &OMatrix<f64, D, D>,
    ) -> Self
    where
        DefaultAllocator: Allocator<D, D>,
    {
        let (tai_centuries, tai_nanoseconds) = epoch.to_tai_duration().to_parts();
        let covariance = (0..D::dim())
            .flat_map(|i| (0..D::dim()).map(move |j| covar[(i, j)]))
            .collect();

        Self {
            kind,
            tai_centuries,
            tai_nanoseconds,
            time_scale: epoch.time_scale,
            station,
            value: value.to_vec(),
            covariance,
        }
    }

    /// Epoch of this record, in the time scale it was recorded in
    pub fn epoch(&self) -> Epoch {
        Epoch::from_tai_duration(Duration::from_parts(
            self.tai_centuries,
            self.tai_nanoseconds,
        ))
        .to_time_scale(self.time_scale)
    }

    /// Rebuilds the measurement of this record, using the provided stations to resolve the station name.
    ///
    /// # Errors
    /// + `UnknownStation` if the station is not in the provided stations.
    /// + `UnimplementedMeasurement` for custom kinds, which this crate cannot rebuild.
    /// + `DimensionMismatch` if the stored value or covariance do not match the kind.
    pub fn rebuild(&self, stations: &Stations) -> Result<Box<dyn Observation>, MeasurementError> {
        let station = stations
            .get(&self.station)
            .cloned()
            .ok_or_else(|| MeasurementError::UnknownStation {
                name: self.station.clone(),
            })?;

        match self.kind {
            MeasurementKind::Range => self.rebuild_as(Range, station),
            MeasurementKind::RangeRate => self.rebuild_as(RangeRate, station),
            MeasurementKind::RangeDoppler => self.rebuild_as(RangeDoppler, station),
            MeasurementKind::RangeDopplerStationOffset => {
                self.rebuild_as(RangeDopplerStationOffset, station)
            }
            MeasurementKind::Custom(_) => {
                Err(MeasurementError::UnimplementedMeasurement { kind: self.kind })
            }
        }
    }

    fn rebuild_as<M: MeasurementModel>(
        &self,
        model: M,
        station: Arc<dyn crate::od::StationGeometry>,
    ) -> Result<Box<dyn Observation>, MeasurementError>
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
        let m = M::MeasurementSize::dim();
        ensure!(
            self.value.len() == m,
            DimensionMismatchSnafu {
                action: "rebuilding the measurement value",
                expected: m,
                got: self.value.len()
            }
        );
        ensure!(
            self.covariance.len() == m * m,
            DimensionMismatchSnafu {
                action: "rebuilding the measurement covariance",
                expected: m * m,
                got: self.covariance.len()
            }
        );

        let value = OVector::<f64, M::MeasurementSize>::from_column_slice(&self.value);
        let covar =
            OMatrix::<f64, M::MeasurementSize, M::MeasurementSize>::from_row_slice(&self.covariance);

        Ok(Box::new(Measurement::from_observation(
            model,
            self.epoch(),
            station,
            value,
            covar,
        )?))
    }
}

#[derive(Serialize, Deserialize)]
struct CacheFile {
    version: u16,
    source: Option<String>,
    records: Vec<MeasurementRecord>,
}

/// Only the version is read first, so that a future layout is rejected before being parsed.
#[derive(Deserialize)]
struct CacheHeader {
    version: u16,
}

impl MeasurementSequence {
    /// Serializes this sequence into a gzipped YAML blob, tagged with the cache version.
    pub fn to_cache_bytes(&self) -> Result<Vec<u8>, CacheError> {
        let cache = CacheFile {
            version: CACHE_VERSION,
            source: self.source.clone(),
            records: self.iter().map(|msr| msr.to_record()).collect(),
        };

        let yaml = serde_yaml::to_string(&cache).context(CacheYamlSnafu {
            action: "serializing measurements",
        })?;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(yaml.as_bytes()).context(CacheIoSnafu {
            action: "compressing measurements",
        })?;
        encoder.finish().context(CacheIoSnafu {
            action: "compressing measurements",
        })
    }

    /// Rebuilds a sequence from a blob made by [MeasurementSequence::to_cache_bytes]. The order of the cache is kept.
    pub fn from_cache_bytes(bytes: &[u8], stations: &Stations) -> Result<Self, CacheError> {
        let mut yaml = String::new();
        GzDecoder::new(bytes)
            .read_to_string(&mut yaml)
            .context(CacheIoSnafu {
                action: "decompressing measurements",
            })?;

        let header: CacheHeader = serde_yaml::from_str(&yaml).context(CacheYamlSnafu {
            action: "reading the cache version",
        })?;
        ensure!(
            header.version == CACHE_VERSION,
            UnsupportedVersionSnafu {
                found: header.version,
                expected: CACHE_VERSION
            }
        );

        let cache: CacheFile = serde_yaml::from_str(&yaml).context(CacheYamlSnafu {
            action: "deserializing measurements",
        })?;

        let mut seq = Self::with_capacity(cache.records.len());
        seq.source = cache.source;
        for (index, record) in cache.records.iter().enumerate() {
            if let MeasurementKind::Custom(_) = record.kind {
                return Err(CacheError::UnsupportedKind {
                    index,
                    kind: record.kind,
                });
            }
            seq.append_boxed(record.rebuild(stations).context(InvalidRecordSnafu { index })?);
        }

        debug!("rebuilt {} measurements from cache", seq.len());

        Ok(seq)
    }

    /// Saves this sequence to a measurement cache at the provided path, and returns that path.
    pub fn save_cache<P: AsRef<Path>>(&self, path: P) -> Result<PathBuf, CacheError> {
        let bytes = self.to_cache_bytes()?;
        fs::write(&path, bytes).context(CacheIoSnafu {
            action: "writing measurement cache",
        })?;

        let path_buf = path.as_ref().to_path_buf();
        info!("Measurement cache saved to {}", path_buf.display());
        Ok(path_buf)
    }

    /// Loads a sequence from the measurement cache at the provided path.
    pub fn load_cache<P: AsRef<Path>>(path: P, stations: &Stations) -> Result<Self, CacheError> {
        let bytes = fs::read(&path).context(CacheIoSnafu {
            action: "reading measurement cache",
        })?;

        let mut seq = Self::from_cache_bytes(&bytes, stations)?;
        seq.source = Some(path.as_ref().display().to_string());

        Ok(seq)
    }
}
