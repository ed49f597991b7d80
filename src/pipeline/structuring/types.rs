use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Marker the model uses for pages without differences.
pub const NO_CHANGE: &str = "NO CHANGE";

// ═══════════════════════════════════════════
// Analysis
// ═══════════════════════════════════════════

/// Page count as reported by the model: a number or free text ("12 pages").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PageCount {
    Number(i64),
    Text(String),
}

impl fmt::Display for PageCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(t) => f.write_str(t),
        }
    }
}

/// Document-level metadata extracted by the analysis pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub summary: Vec<String>,
    pub title: String,
    pub author: Vec<String>,
    pub date_created: String,
    pub last_modified_date: String,
    pub publisher: String,
    pub language: String,
    pub page_count: PageCount,
    pub sentiment_tone: String,
}

// ═══════════════════════════════════════════
// Comparison
// ═══════════════════════════════════════════

/// One page-level difference reported by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    #[serde(deserialize_with = "page_as_string")]
    pub page: String,
    pub changes: String,
}

impl ChangeRecord {
    pub fn new(page: impl Into<String>, changes: impl Into<String>) -> Self {
        Self {
            page: page.into(),
            changes: changes.into(),
        }
    }

    /// True only for the exact [`NO_CHANGE`] marker.
    pub fn is_unchanged(&self) -> bool {
        self.changes == NO_CHANGE
    }

    /// Page number, when the page label is numeric.
    pub fn page_number(&self) -> Option<u32> {
        self.page.trim().parse().ok()
    }
}

/// Models often emit `"page": 1`; accept that and keep the string form.
fn page_as_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PageValue {
        Text(String),
        Number(u64),
    }

    Ok(match PageValue::deserialize(deserializer)? {
        PageValue::Text(s) => s,
        PageValue::Number(n) => n.to_string(),
    })
}

/// Page-indexed comparison outcome, in model order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComparisonResult {
    records: Vec<ChangeRecord>,
}

impl ComparisonResult {
    pub const COLUMNS: [&'static str; 2] = ["page", "changes"];

    pub fn new(records: Vec<ChangeRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[ChangeRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ChangeRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn columns(&self) -> &'static [&'static str] {
        &Self::COLUMNS
    }

    /// Records whose `changes` is not the NO CHANGE marker.
    pub fn changed(&self) -> impl Iterator<Item = &ChangeRecord> {
        self.records.iter().filter(|r| !r.is_unchanged())
    }

    pub fn unchanged_pages(&self) -> Vec<&str> {
        self.records
            .iter()
            .filter(|r| r.is_unchanged())
            .map(|r| r.page.as_str())
            .collect()
    }

    /// Pages in `1..=expected` with no record.
    pub fn missing_pages(&self, expected: u32) -> Vec<u32> {
        let reported: BTreeSet<u32> = self.records.iter().filter_map(ChangeRecord::page_number).collect();
        (1..=expected).filter(|p| !reported.contains(p)).collect()
    }

    pub fn to_csv(&self) -> Result<String, csv::Error> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(Self::COLUMNS)?;
        for record in &self.records {
            writer.write_record([record.page.as_str(), record.changes.as_str()])?;
        }
        let bytes = writer.into_inner().map_err(|e| csv::Error::from(e.into_error()))?;
        String::from_utf8(bytes).map_err(|e| {
            csv::Error::from(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.records)
    }
}

impl fmt::Display for ComparisonResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let page_width = self
            .records
            .iter()
            .map(|r| r.page.chars().count())
            .chain(std::iter::once(Self::COLUMNS[0].len()))
            .max()
            .unwrap_or_default();

        writeln!(f, "{:<page_width$}  {}", Self::COLUMNS[0], Self::COLUMNS[1])?;
        for record in &self.records {
            // Multi-line change descriptions are indented under the changes column.
            let mut lines = record.changes.lines();
            writeln!(f, "{:<page_width$}  {}", record.page, lines.next().unwrap_or_default())?;
            for line in lines {
                writeln!(f, "{:<page_width$}  {}", "", line)?;
            }
        }
        Ok(())
    }
}
