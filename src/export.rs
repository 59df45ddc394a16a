use std::io::Write;

use serde::Serialize;

use crate::models::{OffCampusPlacement, YearlyPlacementRecord};

#[derive(Serialize)]
struct YearlyRow<'a> {
    #[serde(rename = "Year")]
    year: &'a str,
    #[serde(rename = "Eligible")]
    eligible: u32,
    #[serde(rename = "Placed")]
    placed: u32,
    #[serde(rename = "Higher Studies")]
    higher_studies: u32,
    #[serde(rename = "Unplaced")]
    unplaced: u32,
}

#[derive(Serialize)]
struct PlacementRow<'a> {
    #[serde(rename = "Student")]
    student: &'a str,
    #[serde(rename = "Email")]
    email: &'a str,
    #[serde(rename = "Company")]
    company: &'a str,
    #[serde(rename = "Role")]
    role: &'a str,
    #[serde(rename = "Package (LPA)")]
    package: String,
    #[serde(rename = "Employment Type")]
    employment_type: &'a str,
    #[serde(rename = "Domain")]
    domain: &'a str,
    #[serde(rename = "Offer Date")]
    offer_date: String,
    #[serde(rename = "Status")]
    status: &'a str,
    #[serde(rename = "Document")]
    document: &'a str,
}

/// Newest year first; the columns read back through the bulk importer.
pub fn export_yearly<W: Write>(records: &[YearlyPlacementRecord], out: W) -> anyhow::Result<usize> {
    let mut sorted: Vec<&YearlyPlacementRecord> = records.iter().collect();
    sorted.sort_by(|a, b| b.year.cmp(&a.year));

    let mut writer = csv::Writer::from_writer(out);
    for record in &sorted {
        writer.serialize(YearlyRow {
            year: &record.year,
            eligible: record.eligible,
            placed: record.placed,
            higher_studies: record.higher_studies,
            unplaced: record.unplaced,
        })?;
    }
    writer.flush()?;

    Ok(sorted.len())
}

pub fn export_placements<W: Write>(
    placements: &[OffCampusPlacement],
    out: W,
) -> anyhow::Result<usize> {
    let mut writer = csv::Writer::from_writer(out);

    for placement in placements {
        writer.serialize(PlacementRow {
            student: &placement.student_name,
            email: &placement.student_email,
            company: &placement.company,
            role: &placement.role,
            package: placement
                .package
                .map(|value| value.to_string())
                .unwrap_or_else(|| "Not Disclosed".to_string()),
            employment_type: placement.employment_type.label(),
            domain: &placement.domain,
            offer_date: placement.offer_date.format("%Y-%m-%d").to_string(),
            status: placement.status.as_str(),
            document: placement.document_url.as_deref().unwrap_or(""),
        })?;
    }
    writer.flush()?;

    Ok(placements.len())
}
