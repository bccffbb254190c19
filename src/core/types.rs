use serde::Serialize;

/// One UK repayment scheme (Plan 1, Plan 2, ...). Definitions are static and
/// shared; the projector never mutates them.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LoanPlan {
    pub name: &'static str,
    pub annual_threshold: f64,
    pub repayment_rate: f64,
    pub write_off_years: u32,
    pub base_interest_rate: f64,
}

#[derive(Debug, Clone)]
pub struct ProjectionInput {
    pub annual_salary: f64,
    pub initial_balance: f64,
    pub graduation_year: i32,
    pub plan: LoanPlan,
    pub salary_growth_rate: f64,
    pub threshold_growth_rate: f64,
    pub monthly_overpayment: f64,
    pub lump_sum: f64,
    pub lump_sum_year: u32,
    pub career_break_start_year: Option<u32>,
    pub career_break_length_years: u32,
    pub interest_rate_override: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearRecord {
    pub calendar_year: i32,
    pub remaining_balance: f64,
    pub mandatory_repayment: f64,
    pub voluntary_overpayment: f64,
    pub salary: f64,
    pub cumulative_repaid: f64,
    pub on_career_break: bool,
    pub written_off: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionResult {
    pub monthly_repayment: f64,
    pub annual_repayment: f64,
    pub monthly_with_extra: f64,
    pub annual_with_extra: f64,
    pub original_balance: f64,
    pub total_repaid: f64,
    pub total_mandatory_repaid: f64,
    pub total_overpaid: f64,
    pub years_until_complete: u32,
    pub fully_repaid: bool,
    pub total_interest: f64,
    pub total_interest_accrued: f64,
    pub percentage_repaid: f64,
    pub final_salary: f64,
    pub amount_written_off: f64,
    pub money_saved: f64,
    pub chart_data: Vec<YearRecord>,
}
