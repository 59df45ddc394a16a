//! Reducers that turn yearly records and off-campus placements into the numbers
//! and series the dashboards render. Everything here is pure.

use std::collections::HashMap;

use crate::models::{
    ChartSeries, CompanyCount, NameCount, OffCampusPlacement, PieSlice, PlacementInsights,
    RangeCount, Scope, StatSummary, Totals, YearBar, YearlyPlacementRecord,
};

pub const TOP_DOMAINS: usize = 7;
pub const TOP_COMPANIES: usize = 10;

const NOT_DISCLOSED: &str = "Not Disclosed";

pub fn filter_by_scope<'a>(
    records: &'a [YearlyPlacementRecord],
    scope: &Scope,
) -> Vec<&'a YearlyPlacementRecord> {
    match scope {
        Scope::AllYears => records.iter().collect(),
        Scope::Year(year) => records.iter().filter(|r| &r.year == year).collect(),
    }
}

pub fn aggregate_totals(records: &[&YearlyPlacementRecord]) -> Totals {
    records.iter().fold(Totals::default(), |mut totals, record| {
        totals.placed += u64::from(record.placed);
        totals.eligible += u64::from(record.eligible);
        totals.higher_studies += u64::from(record.higher_studies);
        totals.unplaced += u64::from(record.unplaced);
        totals
    })
}

fn rate(placed: u64, eligible: u64) -> f64 {
    if eligible == 0 {
        return 0.0;
    }

    (placed as f64 / eligible as f64 * 100.0).min(100.0)
}

pub fn placement_rate(totals: &Totals) -> u32 {
    rate(totals.placed, totals.eligible).round() as u32
}

/// Mean of each year's own placement rate, so a small cohort counts as much as
/// a large one. Years with no eligible students are left out.
pub fn average_yearly_rate(records: &[&YearlyPlacementRecord]) -> u32 {
    let rates: Vec<f64> = records
        .iter()
        .filter(|r| r.eligible > 0)
        .map(|r| rate(u64::from(r.placed), u64::from(r.eligible)))
        .collect();

    if rates.is_empty() {
        return 0;
    }

    (rates.iter().sum::<f64>() / rates.len() as f64).round() as u32
}

pub fn summarize(records: &[&YearlyPlacementRecord]) -> StatSummary {
    let totals = aggregate_totals(records);

    StatSummary {
        placed: totals.placed,
        total: totals.eligible,
        percentage: placement_rate(&totals),
        higher_studies: totals.higher_studies,
        avg_yearly_rate: average_yearly_rate(records),
    }
}

pub fn year_series(records: &[&YearlyPlacementRecord]) -> Vec<YearBar> {
    let mut bars: Vec<YearBar> = records
        .iter()
        .map(|r| YearBar {
            year: r.year.clone(),
            placed: r.placed,
            higher_studies: r.higher_studies,
        })
        .collect();

    bars.sort_by(|a, b| a.year.cmp(&b.year));
    bars
}

pub fn pie_series(totals: &Totals) -> Vec<PieSlice> {
    vec![
        PieSlice {
            name: "Placed".to_string(),
            value: totals.placed,
        },
        PieSlice {
            name: "Higher Studies".to_string(),
            value: totals.higher_studies,
        },
    ]
}

/// Stacked bars across years, or a pie for a single year. A year with no record
/// yields an empty pie.
pub fn chart_for(scope: &Scope, records: &[&YearlyPlacementRecord]) -> ChartSeries {
    match scope {
        Scope::AllYears => ChartSeries::StackedBar(year_series(records)),
        Scope::Year(_) if records.is_empty() => ChartSeries::Pie(Vec::new()),
        Scope::Year(_) => ChartSeries::Pie(pie_series(&aggregate_totals(records))),
    }
}

const PACKAGE_BUCKETS: [&str; 6] = [
    "< 5 LPA",
    "5-10 LPA",
    "10-15 LPA",
    "15-20 LPA",
    "20+ LPA",
    NOT_DISCLOSED,
];

fn package_bucket(package: Option<f64>) -> usize {
    match package {
        Some(value) if value.is_finite() => match value {
            v if v < 5.0 => 0,
            v if v < 10.0 => 1,
            v if v < 15.0 => 2,
            v if v < 20.0 => 3,
            _ => 4,
        },
        _ => 5,
    }
}

pub fn package_histogram<I>(packages: I) -> Vec<RangeCount>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let mut counts = [0usize; PACKAGE_BUCKETS.len()];
    for package in packages {
        counts[package_bucket(package)] += 1;
    }

    PACKAGE_BUCKETS
        .iter()
        .zip(counts)
        .filter(|(_, count)| *count > 0)
        .map(|(range, count)| RangeCount {
            range: range.to_string(),
            count,
        })
        .collect()
}

/// Frequency list in first-encountered order.
pub fn count_by<I, S>(values: I) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<(String, usize)> = Vec::new();

    for value in values {
        let key = value.as_ref().trim();
        if key.is_empty() {
            continue;
        }

        match index.get(key) {
            Some(&position) => counts[position].1 += 1,
            None => {
                index.insert(key.to_string(), counts.len());
                counts.push((key.to_string(), 1));
            }
        }
    }

    counts
}

/// Highest counts first; ties keep their input order.
pub fn top_n(mut counts: Vec<(String, usize)>, n: usize) -> Vec<(String, usize)> {
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(n);
    counts
}

pub fn placement_insights(placements: &[OffCampusPlacement]) -> PlacementInsights {
    let package_ranges = package_histogram(placements.iter().map(|p| p.package));

    let employment_types = top_n(
        count_by(placements.iter().map(|p| p.employment_type.label())),
        usize::MAX,
    )
    .into_iter()
    .map(|(name, count)| NameCount { name, count })
    .collect();

    let top_domains = top_n(count_by(placements.iter().map(|p| &p.domain)), TOP_DOMAINS)
        .into_iter()
        .map(|(name, count)| NameCount { name, count })
        .collect();

    let top_companies = top_n(
        count_by(placements.iter().map(|p| &p.company)),
        TOP_COMPANIES,
    )
    .into_iter()
    .map(|(company, count)| CompanyCount { company, count })
    .collect();

    PlacementInsights {
        package_ranges,
        employment_types,
        top_domains,
        top_companies,
    }
}
