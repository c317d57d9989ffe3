// SPDX-License-Identifier: AGPL-3.0-only

//! Trajectory sinks: where retained trajectories go.
//!
//! The sweep driver calls [`TrajectorySink::write`] once per retained
//! trajectory, sequentially, in enumeration order. A sink owns the
//! persistence format; the driver only guarantees unique identifiers.
//!
//! - [`CsvDirectorySink`] writes one CSV per trajectory into a directory.
//! - [`MemorySink`] keeps trajectories in memory (tests, dry analysis).

use crate::duffing::ParameterSet;
use crate::error::SinkError;
use crate::sampling::Trajectory;
use crate::sweep::TrajectoryId;
use std::collections::HashSet;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// Destination for retained trajectories.
pub trait TrajectorySink {
    /// Persist one trajectory; returns a description of where it went.
    ///
    /// # Errors
    ///
    /// [`SinkError`] if the trajectory could not be stored. The sweep records
    /// the failure and continues.
    fn write(
        &mut self,
        id: &TrajectoryId,
        params: &ParameterSet,
        trajectory: &Trajectory,
    ) -> Result<String, SinkError>;
}

/// File name for a retained trajectory: `F{F:.1}_d{δ:.2}_w{ω:.1}_sim_{id:03}.csv`.
#[must_use]
pub fn file_name(id: &TrajectoryId, params: &ParameterSet) -> String {
    format!(
        "F{:.1}_d{:.2}_w{:.1}_sim_{id}.csv",
        params.forcing, params.damping, params.omega
    )
}

/// Scientific notation with 18 fractional digits and a signed, two-digit
/// exponent (`1.500000000000000000e+00`), matching C's `%.18e`.
#[must_use]
pub fn format_scientific(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let raw = format!("{value:.18e}");
    match raw.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, digits) = exp
                .strip_prefix('-')
                .map_or(('+', exp), |digits| ('-', digits));
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => raw,
    }
}

/// Writes each trajectory to `<dir>/<file_name>` with header `t,x,v`.
#[derive(Debug)]
pub struct CsvDirectorySink {
    dir: PathBuf,
    written: HashSet<TrajectoryId>,
}

impl CsvDirectorySink {
    /// Open a sink rooted at `dir`, creating the directory if missing.
    ///
    /// # Errors
    ///
    /// [`SinkError::Io`] if the directory cannot be created.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| SinkError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self {
            dir,
            written: HashSet::new(),
        })
    }

    /// Path a trajectory will be written to.
    #[must_use]
    pub fn path_for(&self, id: &TrajectoryId, params: &ParameterSet) -> PathBuf {
        self.dir.join(file_name(id, params))
    }
}

impl TrajectorySink for CsvDirectorySink {
    fn write(
        &mut self,
        id: &TrajectoryId,
        params: &ParameterSet,
        trajectory: &Trajectory,
    ) -> Result<String, SinkError> {
        if self.written.contains(id) {
            return Err(SinkError::Rejected(format!("duplicate identifier {id}")));
        }
        let path = self.path_for(id, params);
        let io_err = |source: std::io::Error| SinkError::Io {
            path: path.clone(),
            source,
        };

        let file = std::fs::File::create(&path).map_err(io_err)?;
        let mut out = BufWriter::new(file);
        writeln!(out, "t,x,v").map_err(io_err)?;
        for p in trajectory.points() {
            writeln!(
                out,
                "{},{},{}",
                format_scientific(p.t),
                format_scientific(p.x),
                format_scientific(p.v)
            )
            .map_err(io_err)?;
        }
        out.flush().map_err(io_err)?;

        self.written.insert(*id);
        Ok(path.display().to_string())
    }
}

/// A trajectory held by [`MemorySink`].
#[derive(Clone, Debug, PartialEq)]
pub struct StoredTrajectory {
    /// Identifier
    pub id: TrajectoryId,
    /// Parameter set
    pub params: ParameterSet,
    /// Samples
    pub trajectory: Trajectory,
}

/// In-memory sink with an optional capacity limit.
#[derive(Debug, Default)]
pub struct MemorySink {
    stored: Vec<StoredTrajectory>,
    limit: Option<usize>,
}

impl MemorySink {
    /// Sink that rejects writes once `limit` trajectories are held.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            stored: Vec::new(),
            limit: Some(limit),
        }
    }

    /// Stored trajectories in write order.
    #[must_use]
    pub fn trajectories(&self) -> &[StoredTrajectory] {
        &self.stored
    }

    /// Number stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stored.len()
    }

    /// Nothing stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stored.is_empty()
    }

    /// Look up by combination index.
    #[must_use]
    pub fn by_combination(&self, combination: usize) -> Option<&StoredTrajectory> {
        self.stored.iter().find(|s| s.id.combination == combination)
    }
}

impl TrajectorySink for MemorySink {
    fn write(
        &mut self,
        id: &TrajectoryId,
        params: &ParameterSet,
        trajectory: &Trajectory,
    ) -> Result<String, SinkError> {
        if self.limit.is_some_and(|limit| self.stored.len() >= limit) {
            return Err(SinkError::Rejected(format!(
                "capacity of {} trajectories reached",
                self.stored.len()
            )));
        }
        if self.stored.iter().any(|s| s.id == *id) {
            return Err(SinkError::Rejected(format!("duplicate identifier {id}")));
        }
        self.stored.push(StoredTrajectory {
            id: *id,
            params: *params,
            trajectory: trajectory.clone(),
        });
        Ok(format!("memory:{id}"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::duffing::FixedParameters;
    use crate::sampling::TrajectoryPoint;

    fn id(serial: usize) -> TrajectoryId {
        TrajectoryId {
            serial,
            combination: serial,
        }
    }

    fn params() -> ParameterSet {
        ParameterSet::with_drive(FixedParameters::default(), 0.3, 0.1, 1.2)
    }

    fn tiny_trajectory() -> Trajectory {
        Trajectory::from_points(vec![
            TrajectoryPoint {
                t: 0.0,
                x: 1.5,
                v: -2.0,
            },
            TrajectoryPoint {
                t: 0.01,
                x: 0.125,
                v: 3.0e12,
            },
        ])
    }

    #[test]
    fn file_name_format() {
        assert_eq!(file_name(&id(7), &params()), "F0.3_d0.10_w1.2_sim_007.csv");
        let p = ParameterSet::with_drive(FixedParameters::default(), 1.0, 0.2, 1.4);
        assert_eq!(file_name(&id(123), &p), "F1.0_d0.20_w1.4_sim_123.csv");
    }

    #[test]
    fn scientific_matches_printf() {
        assert_eq!(format_scientific(0.0), "0.000000000000000000e+00");
        assert_eq!(format_scientific(1.5), "1.500000000000000000e+00");
        assert_eq!(format_scientific(-2.0), "-2.000000000000000000e+00");
        assert_eq!(format_scientific(0.125), "1.250000000000000000e-01");
        assert_eq!(format_scientific(2f64.powi(-20)), "9.536743164062500000e-07");
        assert_eq!(format_scientific(3.0e12), "3.000000000000000000e+12");
        assert_eq!(format_scientific(2f64.powi(-1000)).split_once('e').unwrap().1, "-302");
        assert_eq!(format_scientific(f64::NAN), "nan");
        assert_eq!(format_scientific(f64::NEG_INFINITY), "-inf");
    }

    #[test]
    fn csv_sink_writes_header_and_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("raw");
        let mut sink = CsvDirectorySink::create(&dir).unwrap();
        assert!(dir.is_dir());

        let location = sink.write(&id(0), &params(), &tiny_trajectory()).unwrap();
        let path = dir.join("F0.3_d0.10_w1.2_sim_000.csv");
        assert_eq!(location, path.display().to_string());

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "t,x,v");
        assert_eq!(
            lines[1],
            "0.000000000000000000e+00,1.500000000000000000e+00,-2.000000000000000000e+00"
        );
        let row: Vec<f64> = lines[2].split(',').map(|s| s.parse().unwrap()).collect();
        assert_eq!(row, vec![0.01, 0.125, 3.0e12]);
    }

    #[test]
    fn csv_sink_rejects_duplicate_id() {
        let tmp = tempfile::tempdir().unwrap();
        let mut sink = CsvDirectorySink::create(tmp.path()).unwrap();
        sink.write(&id(1), &params(), &tiny_trajectory()).unwrap();
        let err = sink.write(&id(1), &params(), &tiny_trajectory()).unwrap_err();
        assert!(matches!(err, SinkError::Rejected(_)));
    }

    #[test]
    fn memory_sink_limit() {
        let mut sink = MemorySink::with_limit(1);
        assert_eq!(
            sink.write(&id(0), &params(), &tiny_trajectory()).unwrap(),
            "memory:000"
        );
        assert!(sink.write(&id(1), &params(), &tiny_trajectory()).is_err());
        assert_eq!(sink.len(), 1);
        assert!(sink.by_combination(0).is_some());
        assert!(sink.by_combination(1).is_none());
    }
}
