use serde_json::Value;

use crate::coerce;
use crate::error::{StoreError, ValidationError};
use crate::models::{YearlyPlacementRecord, YEARLY_STATS_COLLECTION};
use crate::store::Document;

/// Raw values from the manual single-year form.
#[derive(Debug, Clone, Default)]
pub struct ManualEntry {
    pub year: String,
    pub eligible: String,
    pub placed: String,
    pub higher_studies: String,
}

impl ManualEntry {
    pub fn into_record(self) -> Result<YearlyPlacementRecord, ValidationError> {
        let year = self.year.trim();
        if year.is_empty() {
            return Err(ValidationError::MissingYear);
        }

        Ok(YearlyPlacementRecord::new(
            year,
            coerce::count_from_str(&self.eligible),
            coerce::count_from_str(&self.placed),
            coerce::count_from_str(&self.higher_studies),
        ))
    }
}

pub fn to_document(record: &YearlyPlacementRecord) -> Result<Value, StoreError> {
    serde_json::to_value(record).map_err(|e| StoreError::Decode {
        collection: YEARLY_STATS_COLLECTION.to_string(),
        id: record.year.clone(),
        message: e.to_string(),
    })
}

/// Reads a stored document. Counts are coerced and `unplaced` is derived again,
/// so a hand-edited or partial document never poisons the totals. The document
/// id is the year: ids are unique per collection, a `year` field in the body is not.
pub fn from_document(document: &Document) -> YearlyPlacementRecord {
    let data = &document.data;
    let body_year = data.get("year").and_then(Value::as_str).map(str::trim);
    if body_year.is_some_and(|year| year != document.id) {
        tracing::warn!(
            id = %document.id,
            body_year = body_year.unwrap_or_default(),
            "yearly stats document body disagrees with its id, keeping the id"
        );
    }

    YearlyPlacementRecord::new(
        &document.id,
        coerce::count_from_value(data.get("eligible")),
        coerce::count_from_value(data.get("placed")),
        coerce::count_from_value(data.get("higherStudies")),
    )
}

pub fn sort_newest_first(records: &mut [YearlyPlacementRecord]) {
    records.sort_by(|a, b| b.year.cmp(&a.year));
}

/// Replaces records for years already present, appends the rest, and keeps the
/// list newest year first.
pub fn merge_records(
    existing: &[YearlyPlacementRecord],
    written: &[YearlyPlacementRecord],
) -> Vec<YearlyPlacementRecord> {
    let mut merged: Vec<YearlyPlacementRecord> = existing.to_vec();

    for record in written {
        match merged.iter_mut().find(|r| r.year == record.year) {
            Some(slot) => *slot = record.clone(),
            None => merged.push(record.clone()),
        }
    }

    sort_newest_first(&mut merged);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate;
    use serde_json::json;

    #[test]
    fn manual_entry_requires_a_year() {
        let entry = ManualEntry {
            year: "   ".to_string(),
            eligible: "10".to_string(),
            ..Default::default()
        };
        assert_eq!(entry.into_record(), Err(ValidationError::MissingYear));
    }

    #[test]
    fn manual_entry_defaults_blank_counts() {
        let entry = ManualEntry {
            year: " 2024-25 ".to_string(),
            eligible: "60".to_string(),
            placed: "".to_string(),
            higher_studies: "four".to_string(),
        };
        let record = entry.into_record().unwrap();

        assert_eq!(record, YearlyPlacementRecord::new("2024-25", 60, 0, 0));
        assert_eq!(record.unplaced, 60);
    }

    #[test]
    fn same_input_writes_the_same_record() {
        let entry = ManualEntry {
            year: "2023-24".to_string(),
            eligible: "50".to_string(),
            placed: "45".to_string(),
            higher_studies: "5".to_string(),
        };
        let first = to_document(&entry.clone().into_record().unwrap()).unwrap();
        let second = to_document(&entry.into_record().unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn documents_are_coerced_on_read() {
        let document = Document {
            id: "2020-21".to_string(),
            data: json!({"eligible": "80", "placed": 70, "higherStudies": "n/a", "unplaced": 999}),
        };
        let record = from_document(&document);

        assert_eq!(record.year, "2020-21");
        assert_eq!(record.eligible, 80);
        assert_eq!(record.placed, 70);
        assert_eq!(record.higher_studies, 0);
        assert_eq!(record.unplaced, 10);
    }

    #[test]
    fn document_id_is_the_year() {
        let documents = [
            Document {
                id: "2022-23".to_string(),
                data: json!({"eligible": 100, "placed": 80, "higherStudies": 10}),
            },
            Document {
                id: "2023-24".to_string(),
                data: json!({"year": "2022-23", "eligible": 50, "placed": 45, "higherStudies": 5}),
            },
        ];
        let mut records: Vec<YearlyPlacementRecord> = documents.iter().map(from_document).collect();
        sort_newest_first(&mut records);

        let years: Vec<&str> = records.iter().map(|r| r.year.as_str()).collect();
        assert_eq!(years, vec!["2023-24", "2022-23"]);
        let all: Vec<&YearlyPlacementRecord> = records.iter().collect();
        assert_eq!(aggregate::aggregate_totals(&all).eligible, 150);
    }

    #[test]
    fn merge_replaces_and_appends() {
        let existing = vec![
            YearlyPlacementRecord::new("2021-22", 10, 5, 1),
            YearlyPlacementRecord::new("2022-23", 20, 10, 2),
        ];
        let written = vec![
            YearlyPlacementRecord::new("2022-23", 25, 20, 1),
            YearlyPlacementRecord::new("2023-24", 30, 15, 3),
        ];
        let merged = merge_records(&existing, &written);

        let years: Vec<&str> = merged.iter().map(|r| r.year.as_str()).collect();
        assert_eq!(years, vec!["2023-24", "2022-23", "2021-22"]);
        assert_eq!(merged[1].eligible, 25);
    }
}
