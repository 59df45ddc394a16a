use std::fmt::Write;

use crate::aggregate;
use crate::models::{OffCampusPlacement, Scope, YearlyPlacementRecord};

pub fn build_report(
    scope: &Scope,
    records: &[YearlyPlacementRecord],
    placements: &[OffCampusPlacement],
) -> String {
    let filtered = aggregate::filter_by_scope(records, scope);
    let summary = aggregate::summarize(&filtered);
    let totals = aggregate::aggregate_totals(&filtered);
    let insights = aggregate::placement_insights(placements);

    let mut output = String::new();

    let _ = writeln!(output, "# Placement Report");
    let _ = writeln!(output, "Scope: {scope}");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Summary");

    if filtered.is_empty() {
        match scope {
            Scope::AllYears => {
                let _ = writeln!(output, "No placement data recorded yet.");
            }
            Scope::Year(year) => {
                let _ = writeln!(output, "No data for {year}.");
            }
        }
    } else {
        let _ = writeln!(output, "- Eligible: {}", summary.total);
        let _ = writeln!(
            output,
            "- Placed: {} ({}% placement rate)",
            summary.placed, summary.percentage
        );
        let _ = writeln!(output, "- Higher studies: {}", summary.higher_studies);
        let _ = writeln!(output, "- Unplaced: {}", totals.unplaced);
        let _ = writeln!(
            output,
            "- Average yearly rate: {}%",
            summary.avg_yearly_rate
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## By Year");

    if filtered.is_empty() {
        let _ = writeln!(output, "No yearly records for this scope.");
    } else {
        let mut rows = filtered.clone();
        rows.sort_by(|a, b| b.year.cmp(&a.year));

        let _ = writeln!(output, "| Year | Eligible | Placed | Higher Studies | Unplaced | Rate |");
        let _ = writeln!(output, "|---|---|---|---|---|---|");
        for record in rows {
            let year_rate = aggregate::average_yearly_rate(&[record]);
            let flag = if record.is_over_counted() {
                " (over-counted)"
            } else {
                ""
            };
            let _ = writeln!(
                output,
                "| {}{} | {} | {} | {} | {} | {}% |",
                record.year,
                flag,
                record.eligible,
                record.placed,
                record.higher_studies,
                record.unplaced,
                year_rate
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Off-Campus Package Distribution");

    if insights.package_ranges.is_empty() {
        let _ = writeln!(output, "No off-campus placements recorded.");
    } else {
        for bucket in &insights.package_ranges {
            let _ = writeln!(output, "- {}: {}", bucket.range, bucket.count);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Companies");

    if insights.top_companies.is_empty() {
        let _ = writeln!(output, "No off-campus placements recorded.");
    } else {
        for company in &insights.top_companies {
            let _ = writeln!(output, "- {}: {}", company.company, company.count);
        }
    }

    output
}
