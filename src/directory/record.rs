use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, Trim};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{info, warn};

use crate::error::Result;
use crate::id::Id;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarangayRecord {
    pub barangay_id: Id,
    pub barangay_name: String,
    #[serde(default)]
    pub cluster_id: Option<Id>,
    #[serde(default)]
    pub barangay_head_id: Option<Id>,
    #[serde(default, deserialize_with = "lenient_coordinate")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_coordinate")]
    pub longitude: Option<f64>,
}

impl BarangayRecord {
    pub fn new(barangay_id: impl Into<Id>, barangay_name: impl Into<String>) -> Self {
        Self {
            barangay_id: barangay_id.into(),
            barangay_name: barangay_name.into(),
            cluster_id: None,
            barangay_head_id: None,
            latitude: None,
            longitude: None,
        }
    }

    pub fn in_cluster(mut self, cluster_id: impl Into<Id>) -> Self {
        self.cluster_id = Some(cluster_id.into());
        self
    }

    /// Trims the name; `None` when the id or the name is blank.
    fn validated(mut self) -> Option<Self> {
        self.barangay_name = self.barangay_name.trim().to_string();
        if self.barangay_id.is_empty() || self.barangay_name.is_empty() {
            warn!(barangay_id = %self.barangay_id, "skipping barangay without id or name");
            return None;
        }
        Some(self)
    }
}

/// Coordinates come back as numbers, numeric strings or empty strings.
fn lenient_coordinate<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Number(n)) => Some(n),
        Some(Raw::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

/// One CSV row, kept as text until validated.
#[derive(Deserialize)]
struct BarangayRow {
    barangay_id: String,
    barangay_name: String,
    #[serde(default)]
    cluster_id: Option<String>,
    #[serde(default)]
    barangay_head_id: Option<String>,
    #[serde(default)]
    latitude: Option<String>,
    #[serde(default)]
    longitude: Option<String>,
}

fn optional_id(value: Option<String>) -> Option<Id> {
    value.map(Id::new).filter(|id| !id.is_empty())
}

impl BarangayRow {
    fn into_record(self) -> Option<BarangayRecord> {
        BarangayRecord {
            barangay_id: Id::new(self.barangay_id),
            barangay_name: self.barangay_name,
            cluster_id: optional_id(self.cluster_id),
            barangay_head_id: optional_id(self.barangay_head_id),
            latitude: self.latitude.and_then(|v| v.trim().parse().ok()),
            longitude: self.longitude.and_then(|v| v.trim().parse().ok()),
        }
        .validated()
    }
}

/// Reads barangay records from CSV with a header row naming the fields.
pub fn read_barangays_csv<R: Read>(reader: R) -> Result<Vec<BarangayRecord>> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut records = Vec::new();
    for row in reader.deserialize::<BarangayRow>() {
        records.extend(row?.into_record());
    }

    Ok(unique_by_id(records))
}

/// Loads the barangay directory from a `.json` array or a CSV file.
pub fn load_barangays<P: AsRef<Path>>(path: P) -> Result<Vec<BarangayRecord>> {
    let path = path.as_ref();
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let records = if is_json {
        let records: Vec<BarangayRecord> = serde_json::from_reader(File::open(path)?)?;
        unique_by_id(records.into_iter().filter_map(BarangayRecord::validated).collect())
    } else {
        read_barangays_csv(File::open(path)?)?
    };

    info!(path = %path.display(), count = records.len(), "loaded barangay directory");
    Ok(records)
}

/// Keeps the first record for each `barangay_id`, preserving input order.
fn unique_by_id(records: Vec<BarangayRecord>) -> Vec<BarangayRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| {
            let fresh = seen.insert(record.barangay_id.clone());
            if !fresh {
                warn!(barangay_id = %record.barangay_id, "duplicate barangay id skipped");
            }
            fresh
        })
        .collect()
}
