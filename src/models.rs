use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const YEARLY_STATS_COLLECTION: &str = "yearlyPlacementStats";
pub const PLACEMENTS_COLLECTION: &str = "offCampusPlacements";

/// One academic year of placement outcomes, keyed by `year`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyPlacementRecord {
    pub year: String,
    pub eligible: u32,
    pub placed: u32,
    pub higher_studies: u32,
    pub unplaced: u32,
}

impl YearlyPlacementRecord {
    /// Builds a record, deriving `unplaced` from the other counts.
    pub fn new(year: impl Into<String>, eligible: u32, placed: u32, higher_studies: u32) -> Self {
        let accounted = u64::from(placed) + u64::from(higher_studies);
        let unplaced = u64::from(eligible).saturating_sub(accounted) as u32;

        Self {
            year: year.into(),
            eligible,
            placed,
            higher_studies,
            unplaced,
        }
    }

    /// True when placed and higher-studies together exceed the cohort size.
    pub fn is_over_counted(&self) -> bool {
        u64::from(self.placed) + u64::from(self.higher_studies) > u64::from(self.eligible)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    AllYears,
    Year(String),
}

impl Scope {
    pub const ALL_YEARS_LABEL: &'static str = "All Years";

    pub fn from_option(year: Option<&str>) -> Self {
        match year {
            Some(value) => value.parse().unwrap_or(Scope::AllYears),
            None => Scope::AllYears,
        }
    }
}

impl FromStr for Scope {
    type Err = std::convert::Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty()
            || trimmed.eq_ignore_ascii_case(Self::ALL_YEARS_LABEL)
            || trimmed.eq_ignore_ascii_case("all")
        {
            Ok(Scope::AllYears)
        } else {
            Ok(Scope::Year(trimmed.to_string()))
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::AllYears => f.write_str(Self::ALL_YEARS_LABEL),
            Scope::Year(year) => f.write_str(year),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub placed: u64,
    pub eligible: u64,
    pub higher_studies: u64,
    pub unplaced: u64,
}

/// Scalar bundle rendered as stat cards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatSummary {
    pub placed: u64,
    pub total: u64,
    pub percentage: u32,
    pub higher_studies: u64,
    pub avg_yearly_rate: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearBar {
    pub year: String,
    pub placed: u32,
    pub higher_studies: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PieSlice {
    pub name: String,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "series", rename_all = "camelCase")]
pub enum ChartSeries {
    StackedBar(Vec<YearBar>),
    Pie(Vec<PieSlice>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RangeCount {
    pub range: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameCount {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompanyCount {
    pub company: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub scope: String,
    pub summary: StatSummary,
    pub chart: ChartSeries,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementInsights {
    pub package_ranges: Vec<RangeCount>,
    pub employment_types: Vec<NameCount>,
    pub top_domains: Vec<NameCount>,
    pub top_companies: Vec<CompanyCount>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmploymentType {
    #[serde(rename = "Full-time")]
    FullTime,
    #[serde(rename = "Internship")]
    Internship,
    #[serde(rename = "Internship + PPO")]
    InternshipWithPpo,
    #[serde(rename = "Contract")]
    Contract,
    #[serde(rename = "Other")]
    Other,
}

impl EmploymentType {
    pub fn label(self) -> &'static str {
        match self {
            EmploymentType::FullTime => "Full-time",
            EmploymentType::Internship => "Internship",
            EmploymentType::InternshipWithPpo => "Internship + PPO",
            EmploymentType::Contract => "Contract",
            EmploymentType::Other => "Other",
        }
    }
}

impl FromStr for EmploymentType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized: String = value
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '+')
            .collect();

        match normalized.as_str() {
            "fulltime" => Ok(EmploymentType::FullTime),
            "internship" | "intern" => Ok(EmploymentType::Internship),
            "internship+ppo" | "internshipppo" | "ppo" => Ok(EmploymentType::InternshipWithPpo),
            "contract" => Ok(EmploymentType::Contract),
            "other" => Ok(EmploymentType::Other),
            _ => Err(format!("unknown employment type: {value}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlacementStatus {
    Pending,
    Approved,
    Rejected,
}

impl PlacementStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PlacementStatus::Pending => "pending",
            PlacementStatus::Approved => "approved",
            PlacementStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for PlacementStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(PlacementStatus::Pending),
            "approved" => Ok(PlacementStatus::Approved),
            "rejected" => Ok(PlacementStatus::Rejected),
            _ => Err(format!("unknown placement status: {value}")),
        }
    }
}

/// A placement secured outside campus drives, reported by a student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OffCampusPlacement {
    pub id: Uuid,
    pub student_name: String,
    pub student_email: String,
    pub company: String,
    pub role: String,
    /// Annual package in LPA; `None` when not disclosed.
    #[serde(default)]
    pub package: Option<f64>,
    pub employment_type: EmploymentType,
    pub domain: String,
    pub offer_date: NaiveDate,
    pub status: PlacementStatus,
    #[serde(default)]
    pub document_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPlacement {
    pub student_name: String,
    pub student_email: String,
    pub company: String,
    pub role: String,
    pub package: Option<f64>,
    pub employment_type: EmploymentType,
    pub domain: String,
    pub offer_date: NaiveDate,
    pub status: PlacementStatus,
    pub document_url: Option<String>,
}
