use super::error::ProjectionError;
use super::types::{ProjectionInput, ProjectionResult, YearRecord};

// Chart retention: full resolution early on, sparse rows for the long tail.
const CHART_FULL_RESOLUTION_YEARS: usize = 10;
const CHART_SAMPLE_EVERY: usize = 5;

/// Runs the year-by-year repayment simulation. Pure and deterministic: the
/// same input always yields the same result, and the loop is bounded by the
/// plan's write-off horizon.
pub fn project(input: &ProjectionInput) -> Result<ProjectionResult, ProjectionError> {
    validate(input)?;

    let plan = &input.plan;
    let effective_rate = input
        .interest_rate_override
        .unwrap_or(plan.base_interest_rate);

    let mut remaining = input.initial_balance;
    let mut salary = input.annual_salary;
    let mut threshold = plan.annual_threshold;
    let mut years_elapsed: u32 = 0;
    let mut total_mandatory = 0.0;
    let mut total_voluntary = 0.0;
    let mut interest_accrued = 0.0;
    let mut records: Vec<YearRecord> = Vec::with_capacity(plan.write_off_years as usize + 1);

    while remaining > 0.0 && years_elapsed < plan.write_off_years {
        let on_break = on_career_break(input, years_elapsed);

        let mandatory = if on_break || salary <= threshold {
            0.0
        } else {
            (salary - threshold) * plan.repayment_rate
        };
        // A career break suspends the monthly overpayment; a scheduled lump
        // sum still lands in its chosen year.
        let mut voluntary = if on_break {
            0.0
        } else {
            input.monthly_overpayment * 12.0
        };
        if input.lump_sum > 0.0 && years_elapsed == input.lump_sum_year {
            voluntary += input.lump_sum;
        }

        // Interest accrues on the full pre-payment balance, breaks included.
        let interest = remaining * effective_rate;
        interest_accrued += interest;
        remaining += interest;

        let mut mandatory_applied = mandatory;
        let mut voluntary_applied = voluntary;
        remaining -= mandatory + voluntary;
        if remaining < 0.0 {
            // Reduce the applied payment to exactly clear the balance.
            // Mandatory repayment is credited in full first; the remainder
            // counts as overpayment.
            let actual = (mandatory + voluntary + remaining).max(0.0);
            mandatory_applied = mandatory.min(actual);
            voluntary_applied = actual - mandatory_applied;
            remaining = 0.0;
        }

        total_mandatory += mandatory_applied;
        total_voluntary += voluntary_applied;

        records.push(YearRecord {
            calendar_year: calendar_label(input.graduation_year, years_elapsed),
            remaining_balance: remaining,
            mandatory_repayment: mandatory_applied,
            voluntary_overpayment: voluntary_applied,
            salary: if on_break { 0.0 } else { salary },
            cumulative_repaid: total_mandatory + total_voluntary,
            on_career_break: on_break,
            written_off: false,
        });

        // No growth step after the final simulated year, so the reported
        // final salary is the one earned in that year on both exit paths.
        years_elapsed += 1;
        if remaining <= 0.0 || years_elapsed == plan.write_off_years {
            break;
        }
        if !on_break {
            salary *= 1.0 + input.salary_growth_rate;
        }
        threshold *= 1.0 + input.threshold_growth_rate;
    }

    let fully_repaid = remaining <= 0.0;
    let written_off_balance = if fully_repaid { 0.0 } else { remaining };
    let years_until_complete = if fully_repaid {
        years_elapsed
    } else {
        plan.write_off_years
    };

    if !fully_repaid {
        // Synthetic terminal row: the forgiven balance displays as zero; the
        // true figure is carried in the summary.
        records.push(YearRecord {
            calendar_year: calendar_label(input.graduation_year, plan.write_off_years),
            remaining_balance: 0.0,
            mandatory_repayment: 0.0,
            voluntary_overpayment: 0.0,
            salary: 0.0,
            cumulative_repaid: total_mandatory + total_voluntary,
            on_career_break: false,
            written_off: true,
        });
    }

    let annual_mandatory_now =
        (input.annual_salary - plan.annual_threshold).max(0.0) * plan.repayment_rate;
    let monthly_mandatory_now = annual_mandatory_now / 12.0;

    // Rounded split first, then summed, so the conservation law holds exactly
    // on the reported figures.
    let total_mandatory_repaid = round_currency(total_mandatory);
    let total_overpaid = round_currency(total_voluntary);
    let total_repaid = total_mandatory_repaid + total_overpaid;

    // Interest is only reported as a realized cost once the loan clears; a
    // written-off projection keeps the legacy zero and exposes the accrued
    // figure separately.
    let total_interest = if fully_repaid {
        (total_repaid - round_currency(input.initial_balance)).max(0.0)
    } else {
        0.0
    };
    let money_saved = if fully_repaid && total_voluntary > 0.0 {
        round_currency((input.initial_balance - (total_mandatory + total_voluntary)).max(0.0))
    } else {
        0.0
    };

    Ok(ProjectionResult {
        monthly_repayment: round_currency(monthly_mandatory_now),
        annual_repayment: round_currency(annual_mandatory_now),
        monthly_with_extra: round_currency(monthly_mandatory_now + input.monthly_overpayment),
        annual_with_extra: round_currency(annual_mandatory_now + input.monthly_overpayment * 12.0),
        original_balance: round_currency(input.initial_balance),
        total_repaid,
        total_mandatory_repaid,
        total_overpaid,
        years_until_complete,
        fully_repaid,
        total_interest,
        total_interest_accrued: round_currency(interest_accrued),
        percentage_repaid: ((total_mandatory + total_voluntary) / input.initial_balance * 100.0)
            .round(),
        final_salary: round_currency(salary),
        amount_written_off: round_currency(written_off_balance),
        money_saved,
        chart_data: sample_chart_years(&records),
    })
}

/// Thins a full-resolution year sequence for charting: every row for the
/// first ten years, every fifth row afterwards, and always the terminal row.
/// Presentation-only; summaries are never derived from the thinned data.
pub fn sample_chart_years(records: &[YearRecord]) -> Vec<YearRecord> {
    let last = records.len().saturating_sub(1);
    records
        .iter()
        .enumerate()
        .filter(|(idx, _)| {
            *idx < CHART_FULL_RESOLUTION_YEARS || idx % CHART_SAMPLE_EVERY == 0 || *idx == last
        })
        .map(|(_, record)| *record)
        .collect()
}

fn validate(input: &ProjectionInput) -> Result<(), ProjectionError> {
    if !input.annual_salary.is_finite() || input.annual_salary <= 0.0 {
        return Err(ProjectionError::Validation(
            "annual salary must be a positive number".to_string(),
        ));
    }
    if !input.initial_balance.is_finite() || input.initial_balance <= 0.0 {
        return Err(ProjectionError::Validation(
            "loan balance must be a positive number".to_string(),
        ));
    }

    for (name, value) in [
        ("salary growth rate", input.salary_growth_rate),
        ("threshold growth rate", input.threshold_growth_rate),
        ("monthly overpayment", input.monthly_overpayment),
        ("lump sum", input.lump_sum),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(ProjectionError::Validation(format!(
                "{name} must be a non-negative number"
            )));
        }
    }

    if let Some(rate) = input.interest_rate_override {
        if !rate.is_finite() || rate < 0.0 {
            return Err(ProjectionError::Validation(
                "interest rate override must be a non-negative number".to_string(),
            ));
        }
    }

    Ok(())
}

fn on_career_break(input: &ProjectionInput, years_elapsed: u32) -> bool {
    if input.career_break_length_years == 0 {
        return false;
    }
    match input.career_break_start_year {
        Some(start) => {
            years_elapsed >= start && years_elapsed < start + input.career_break_length_years
        }
        None => false,
    }
}

// Repayment begins the year after graduation, so simulated year n is labelled
// graduation_year + n + 1.
fn calendar_label(graduation_year: i32, years_elapsed: u32) -> i32 {
    graduation_year + years_elapsed as i32 + 1
}

fn round_currency(value: f64) -> f64 {
    value.round()
}
