//! JSON snapshot reader for monitoring exports.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, instrument};

use cohort_series::{Sample, Series};

use crate::IoError;
use crate::domain::{ResourceId, Snapshot};

/// Resource label holding the resource id.
const INSTANCE_ID_LABEL: &str = "instance_id";

/// Reads a labeled series collection from a monitoring export.
///
/// Expected JSON shape:
///
/// ```json
/// {"timeSeries": [{
///     "metric":   {"labels": {"instance_name": "web-1"}},
///     "resource": {"labels": {"instance_id": "42", "zone": "eu-1"}},
///     "points":   [{"interval": {"startTime": "2024-01-01T00:00:00Z"},
///                   "value": {"doubleValue": 0.25}}]
/// }]}
/// ```
///
/// Missing label maps default to empty. A point may carry `int64Value` (a
/// decimal string, as monitoring exports encode it) instead of `doubleValue`,
/// and `endTime` when `startTime` is absent.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::SnapshotNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::JsonParse`] | Malformed JSON or unexpected shape |
/// | [`IoError::MalformedPoint`] | A point has no timestamp or no numeric value |
/// | [`IoError::EmptySnapshot`] | Zero series |
pub struct SnapshotReader {
    path: PathBuf,
}

impl SnapshotReader {
    /// Create a new reader for the given snapshot path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and validate the snapshot.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<Snapshot, IoError> {
        let file = File::open(&self.path).map_err(|e| IoError::SnapshotNotFound {
            path: self.path.clone(),
            source: e,
        })?;
        self.read_from(BufReader::new(file))
    }

    /// Parse a snapshot from any reader; `self.path` is only used in errors.
    pub fn read_from<R: Read>(&self, reader: R) -> Result<Snapshot, IoError> {
        let raw: RawSnapshot = serde_json::from_reader(reader).map_err(|e| IoError::JsonParse {
            path: self.path.clone(),
            line: e.line(),
            column: e.column(),
            source: e,
        })?;
        debug!(n_raw = raw.time_series.len(), "snapshot decoded");

        if raw.time_series.is_empty() {
            return Err(IoError::EmptySnapshot {
                path: self.path.clone(),
            });
        }

        let mut resource_ids = Vec::with_capacity(raw.time_series.len());
        let mut series = Vec::with_capacity(raw.time_series.len());
        for (index, ts) in raw.time_series.into_iter().enumerate() {
            let samples = ts
                .points
                .into_iter()
                .enumerate()
                .map(|(point, p)| self.sample(index, point, p))
                .collect::<Result<Vec<_>, _>>()?;

            let id = ts
                .resource
                .labels
                .get(INSTANCE_ID_LABEL)
                .filter(|id| !id.is_empty())
                .cloned()
                .unwrap_or_else(|| format!("series-{index}"));
            resource_ids.push(ResourceId::new(id));
            series.push(Series::new(ts.metric.labels, ts.resource.labels, samples));
        }

        info!(
            n_series = series.len(),
            n_points = series.iter().map(|s| s.samples().len()).sum::<usize>(),
            "snapshot loaded"
        );
        Ok(Snapshot { resource_ids, series })
    }

    fn sample(&self, series: usize, point: usize, raw: RawPoint) -> Result<Sample, IoError> {
        let malformed = |missing| IoError::MalformedPoint {
            path: self.path.clone(),
            series,
            point,
            missing,
        };
        let timestamp = raw
            .interval
            .start_time
            .or(raw.interval.end_time)
            .ok_or_else(|| malformed("timestamp"))?;
        let value = match (raw.value.double_value, raw.value.int64_value) {
            (Some(v), _) => v,
            (None, Some(s)) => s.parse::<i64>().map_err(|_| malformed("numeric value"))? as f64,
            (None, None) => return Err(malformed("numeric value")),
        };
        Ok(Sample::new(timestamp, value))
    }
}

// --- Wire structs ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSnapshot {
    #[serde(default)]
    time_series: Vec<RawSeries>,
}

#[derive(Deserialize)]
struct RawSeries {
    #[serde(default)]
    metric: RawLabels,
    #[serde(default)]
    resource: RawLabels,
    #[serde(default)]
    points: Vec<RawPoint>,
}

#[derive(Deserialize, Default)]
struct RawLabels {
    #[serde(default)]
    labels: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct RawPoint {
    #[serde(default)]
    interval: RawInterval,
    #[serde(default)]
    value: RawValue,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawInterval {
    start_time: Option<String>,
    end_time: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawValue {
    double_value: Option<f64>,
    int64_value: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_json(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    fn parse(content: &str) -> Result<Snapshot, IoError> {
        SnapshotReader::new(Path::new("inline.json")).read_from(content.as_bytes())
    }

    #[test]
    fn read_two_series() {
        let json = r#"{"timeSeries":[
            {"metric":{"labels":{"instance_name":"web-1"}},
             "resource":{"labels":{"instance_id":"101","zone":"eu"}},
             "points":[{"interval":{"startTime":"t1"},"value":{"doubleValue":0.5}},
                       {"interval":{"startTime":"t0"},"value":{"doubleValue":0.25}}]},
            {"resource":{"labels":{"zone":"us"}},
             "points":[{"interval":{"startTime":"t0"},"value":{"int64Value":"3"}}]}
        ]}"#;
        let f = write_json(json);
        let snap = SnapshotReader::new(f.path()).read().unwrap();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap.resource_ids[0].as_str(), "101");
        assert_eq!(snap.resource_ids[1].as_str(), "series-1");
        assert_eq!(snap.series[0].samples()[0], Sample::new("t1", 0.5));
        assert_eq!(snap.series[1].samples()[0], Sample::new("t0", 3.0));
        assert!(snap.series[1].metric_labels().is_empty());
        assert_eq!(snap.series[0].metric_labels()["instance_name"], "web-1");
    }

    #[test]
    fn end_time_is_a_fallback() {
        let snap = parse(r#"{"timeSeries":[{"points":[{"interval":{"endTime":"e"},"value":{"doubleValue":1}}]}]}"#)
            .unwrap();
        assert_eq!(snap.series[0].samples()[0].timestamp, "e");
    }

    #[test]
    fn error_file_not_found() {
        let result = SnapshotReader::new(Path::new("/nonexistent/snapshot.json")).read();
        assert!(matches!(result, Err(IoError::SnapshotNotFound { .. })));
    }

    #[test]
    fn error_bad_json() {
        assert!(matches!(parse("{\"timeSeries\": [}"), Err(IoError::JsonParse { line: 1, .. })));
    }

    #[test]
    fn error_empty_snapshot() {
        assert!(matches!(parse(r#"{"timeSeries":[]}"#), Err(IoError::EmptySnapshot { .. })));
        assert!(matches!(parse("{}"), Err(IoError::EmptySnapshot { .. })));
    }

    #[test]
    fn error_point_without_value() {
        let result = parse(r#"{"timeSeries":[{"points":[{"interval":{"startTime":"t"},"value":{}}]}]}"#);
        assert!(matches!(
            result,
            Err(IoError::MalformedPoint { series: 0, point: 0, missing: "numeric value", .. })
        ));
    }

    #[test]
    fn error_point_without_timestamp() {
        let result = parse(r#"{"timeSeries":[{"points":[{"value":{"doubleValue":1.0}}]}]}"#);
        assert!(matches!(result, Err(IoError::MalformedPoint { missing: "timestamp", .. })));
    }
}
