use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{
    LoanPlan, ProjectionError, ProjectionInput, REGISTRY, derive_student_balance, lookup_plan,
    project,
};

const INDEX_HTML: &str = include_str!("../../web/index.html");
const STYLES_CSS: &str = include_str!("../../web/styles.css");
const APP_JS: &str = include_str!("../../web/app.js");

const DEFAULT_PLAN_KEY: &str = "plan2";

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliPlan {
    Plan1,
    Plan2,
    Plan3,
    Plan4,
    Plan5,
    Postgraduate,
}

impl CliPlan {
    fn from_key(key: &str) -> Option<Self> {
        match key {
            "plan1" => Some(CliPlan::Plan1),
            "plan2" => Some(CliPlan::Plan2),
            "plan3" => Some(CliPlan::Plan3),
            "plan4" => Some(CliPlan::Plan4),
            "plan5" => Some(CliPlan::Plan5),
            "postgraduate" => Some(CliPlan::Postgraduate),
            _ => None,
        }
    }

    fn key(self) -> &'static str {
        match self {
            CliPlan::Plan1 => "plan1",
            CliPlan::Plan2 => "plan2",
            CliPlan::Plan3 => "plan3",
            CliPlan::Plan4 => "plan4",
            CliPlan::Plan5 => "plan5",
            CliPlan::Postgraduate => "postgraduate",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectPayload {
    salary: Option<f64>,
    plan: Option<String>,
    loan_balance: Option<f64>,
    student_mode: Option<bool>,
    course_length: Option<u32>,
    maintenance_per_year: Option<f64>,
    graduation_year: Option<i32>,
    salary_growth: Option<f64>,
    threshold_growth: Option<f64>,
    monthly_overpayment: Option<f64>,
    lump_sum: Option<f64>,
    lump_sum_year: Option<u32>,
    career_break_start: Option<u32>,
    career_break_length: Option<u32>,
    interest_rate: Option<f64>,
}

#[derive(Parser, Debug)]
#[command(
    name = "slrepay",
    about = "UK student loan repayment projector (thresholds, interest, write-off, overpayments)"
)]
struct Cli {
    #[arg(long)]
    salary: f64,
    #[arg(long, value_enum, default_value_t = CliPlan::Plan2)]
    plan: CliPlan,
    #[arg(long, default_value_t = 45_000.0)]
    loan_balance: f64,
    #[arg(
        long,
        default_value_t = false,
        help = "Derive the balance from course length and maintenance instead of --loan-balance"
    )]
    student_mode: bool,
    #[arg(long, default_value_t = 3, help = "Course length in years (student mode)")]
    course_length: u32,
    #[arg(
        long,
        default_value_t = 9_000.0,
        help = "Maintenance loan per course year (student mode)"
    )]
    maintenance_per_year: f64,
    #[arg(long, default_value_t = 2024)]
    graduation_year: i32,
    #[arg(
        long,
        default_value_t = 2.0,
        help = "Expected annual salary growth in percent"
    )]
    salary_growth: f64,
    #[arg(
        long,
        default_value_t = 2.0,
        help = "Expected annual repayment threshold growth in percent"
    )]
    threshold_growth: f64,
    #[arg(long, default_value_t = 0.0)]
    monthly_overpayment: f64,
    #[arg(long, default_value_t = 0.0)]
    lump_sum: f64,
    #[arg(
        long,
        default_value_t = 0,
        help = "Zero-based simulated year in which the lump sum is applied"
    )]
    lump_sum_year: u32,
    #[arg(long, help = "Zero-based simulated year a career break starts")]
    career_break_start: Option<u32>,
    #[arg(long, default_value_t = 0, help = "Career break length in years")]
    career_break_length: u32,
    #[arg(
        long,
        help = "Interest rate override in percent, replaces the plan's base rate"
    )]
    interest_rate: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlanInfo {
    key: &'static str,
    name: &'static str,
    annual_threshold: f64,
    repayment_rate: f64,
    write_off_years: u32,
    base_interest_rate: f64,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_inputs(cli: Cli) -> Result<ProjectionInput, String> {
    let plan = *lookup_plan(cli.plan.key()).map_err(|e| e.to_string())?;
    build_inputs_with_plan(cli, plan)
}

fn build_inputs_with_plan(cli: Cli, plan: LoanPlan) -> Result<ProjectionInput, String> {
    if !cli.salary.is_finite() || cli.salary <= 0.0 {
        return Err("--salary must be > 0".to_string());
    }

    if !cli.salary_growth.is_finite() || cli.salary_growth < 0.0 {
        return Err("--salary-growth must be >= 0".to_string());
    }

    if !cli.threshold_growth.is_finite() || cli.threshold_growth < 0.0 {
        return Err("--threshold-growth must be >= 0".to_string());
    }

    if !cli.monthly_overpayment.is_finite() || cli.monthly_overpayment < 0.0 {
        return Err("--monthly-overpayment must be >= 0".to_string());
    }

    if !cli.lump_sum.is_finite() || cli.lump_sum < 0.0 {
        return Err("--lump-sum must be >= 0".to_string());
    }

    if cli.lump_sum > 0.0 && cli.lump_sum_year >= plan.write_off_years {
        return Err("--lump-sum-year must fall before the plan's write-off".to_string());
    }

    if let Some(rate) = cli.interest_rate {
        if !rate.is_finite() || rate < 0.0 {
            return Err("--interest-rate must be >= 0".to_string());
        }
    }

    if cli.career_break_length > 0 && cli.career_break_start.is_none() {
        return Err(
            "--career-break-start is required when --career-break-length > 0".to_string(),
        );
    }

    if let Some(start) = cli.career_break_start {
        if cli.career_break_length == 0 {
            return Err(
                "--career-break-length must be > 0 when --career-break-start is set".to_string(),
            );
        }
        if start >= plan.write_off_years {
            return Err("--career-break-start must fall before the plan's write-off".to_string());
        }
    }

    let initial_balance = if cli.student_mode {
        if cli.course_length == 0 {
            return Err("--course-length must be > 0 in student mode".to_string());
        }
        if !cli.maintenance_per_year.is_finite() || cli.maintenance_per_year < 0.0 {
            return Err("--maintenance-per-year must be >= 0".to_string());
        }
        derive_student_balance(cli.course_length, cli.maintenance_per_year)
    } else {
        cli.loan_balance
    };

    if !initial_balance.is_finite() || initial_balance <= 0.0 {
        return Err("--loan-balance must resolve to > 0".to_string());
    }

    Ok(ProjectionInput {
        annual_salary: cli.salary,
        initial_balance,
        graduation_year: cli.graduation_year,
        plan,
        salary_growth_rate: cli.salary_growth / 100.0,
        threshold_growth_rate: cli.threshold_growth / 100.0,
        monthly_overpayment: cli.monthly_overpayment,
        lump_sum: cli.lump_sum,
        lump_sum_year: cli.lump_sum_year,
        career_break_start_year: cli.career_break_start,
        career_break_length_years: cli.career_break_length,
        interest_rate_override: cli.interest_rate.map(|rate| rate / 100.0),
    })
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/styles.css", get(styles_handler))
        .route("/app.js", get(app_js_handler))
        .route(
            "/api/project",
            get(project_get_handler).post(project_post_handler),
        )
        .route("/api/plans", get(plans_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    println!("Student loan projector listening on http://{addr}");
    println!("Local access: http://127.0.0.1:{port}/");

    axum::serve(listener, app).await
}

async fn index_handler() -> impl IntoResponse {
    with_cache_control(Html(INDEX_HTML))
}

async fn styles_handler() -> impl IntoResponse {
    with_cache_control((
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLES_CSS,
    ))
}

async fn app_js_handler() -> impl IntoResponse {
    with_cache_control((
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        APP_JS,
    ))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn plans_handler() -> Response {
    let plans: Vec<PlanInfo> = REGISTRY
        .into_iter()
        .map(|(key, plan)| PlanInfo {
            key,
            name: plan.name,
            annual_threshold: plan.annual_threshold,
            repayment_rate: plan.repayment_rate,
            write_off_years: plan.write_off_years,
            base_interest_rate: plan.base_interest_rate,
        })
        .collect();
    json_response(StatusCode::OK, plans)
}

async fn project_get_handler(Query(payload): Query<ProjectPayload>) -> Response {
    project_handler_impl(payload).await
}

async fn project_post_handler(Json(payload): Json<ProjectPayload>) -> Response {
    project_handler_impl(payload).await
}

async fn project_handler_impl(payload: ProjectPayload) -> Response {
    let input = match projection_input_from_payload(payload) {
        Ok(input) => input,
        // An unknown plan key is a configuration defect, not a user error.
        Err(ApiError::UnknownPlan(msg)) => {
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, &msg);
        }
        Err(ApiError::BadRequest(msg)) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    match project(&input) {
        Ok(result) => json_response(StatusCode::OK, result),
        Err(err @ ProjectionError::Validation(_)) => {
            error_response(StatusCode::BAD_REQUEST, &err.to_string())
        }
        Err(err @ ProjectionError::UnknownPlan(_)) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string())
        }
    }
}

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    UnknownPlan(String),
}

#[cfg(test)]
fn projection_input_from_json(json: &str) -> Result<ProjectionInput, ApiError> {
    let payload = serde_json::from_str::<ProjectPayload>(json)
        .map_err(|e| ApiError::BadRequest(format!("Invalid API JSON payload: {e}")))?;
    projection_input_from_payload(payload)
}

fn projection_input_from_payload(payload: ProjectPayload) -> Result<ProjectionInput, ApiError> {
    let plan_key = payload
        .plan
        .clone()
        .unwrap_or_else(|| DEFAULT_PLAN_KEY.to_string());
    // Resolved against the registry first so a bad key surfaces as a
    // configuration error rather than a request error.
    lookup_plan(&plan_key).map_err(|e| ApiError::UnknownPlan(e.to_string()))?;

    // Salary has no serving default; an absent field is a request error,
    // matching the required --salary flag.
    let salary = payload
        .salary
        .ok_or_else(|| ApiError::BadRequest("--salary is required".to_string()))?;

    let mut cli = default_cli_for_api();
    cli.salary = salary;
    if let Some(plan) = CliPlan::from_key(&plan_key) {
        cli.plan = plan;
    }

    if let Some(v) = payload.loan_balance {
        cli.loan_balance = v;
    }
    if let Some(v) = payload.student_mode {
        cli.student_mode = v;
    }
    if let Some(v) = payload.course_length {
        cli.course_length = v;
    }
    if let Some(v) = payload.maintenance_per_year {
        cli.maintenance_per_year = v;
    }
    if let Some(v) = payload.graduation_year {
        cli.graduation_year = v;
    }
    if let Some(v) = payload.salary_growth {
        cli.salary_growth = v;
    }
    if let Some(v) = payload.threshold_growth {
        cli.threshold_growth = v;
    }
    if let Some(v) = payload.monthly_overpayment {
        cli.monthly_overpayment = v;
    }
    if let Some(v) = payload.lump_sum {
        cli.lump_sum = v;
    }
    if let Some(v) = payload.lump_sum_year {
        cli.lump_sum_year = v;
    }
    if let Some(v) = payload.career_break_start {
        cli.career_break_start = Some(v);
    }
    if let Some(v) = payload.career_break_length {
        cli.career_break_length = v;
    }
    if let Some(v) = payload.interest_rate {
        cli.interest_rate = Some(v);
    }

    build_inputs(cli).map_err(ApiError::BadRequest)
}

fn default_cli_for_api() -> Cli {
    Cli {
        salary: 30_000.0,
        plan: CliPlan::Plan2,
        loan_balance: 45_000.0,
        student_mode: false,
        course_length: 3,
        maintenance_per_year: 9_000.0,
        graduation_year: 2024,
        salary_growth: 2.0,
        threshold_growth: 2.0,
        monthly_overpayment: 0.0,
        lump_sum: 0.0,
        lump_sum_year: 0,
        career_break_start: None,
        career_break_length: 0,
        interest_rate: None,
    }
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TUITION_PER_YEAR;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_cli() -> Cli {
        default_cli_for_api()
    }

    #[test]
    fn build_inputs_converts_percentages_to_fractions() {
        let mut cli = sample_cli();
        cli.salary_growth = 3.0;
        cli.threshold_growth = 1.5;
        cli.interest_rate = Some(5.3);

        let inputs = build_inputs(cli).expect("valid inputs");
        assert_approx(inputs.salary_growth_rate, 0.03);
        assert_approx(inputs.threshold_growth_rate, 0.015);
        assert_approx(inputs.interest_rate_override.expect("override set"), 0.053);
    }

    #[test]
    fn build_inputs_rejects_non_positive_salary() {
        let mut cli = sample_cli();
        cli.salary = 0.0;
        let err = build_inputs(cli).expect_err("must reject zero salary");
        assert!(err.contains("--salary"));
    }

    #[test]
    fn build_inputs_rejects_negative_overpayment() {
        let mut cli = sample_cli();
        cli.monthly_overpayment = -10.0;
        let err = build_inputs(cli).expect_err("must reject negative overpayment");
        assert!(err.contains("--monthly-overpayment"));
    }

    #[test]
    fn build_inputs_rejects_career_break_without_start() {
        let mut cli = sample_cli();
        cli.career_break_length = 2;
        let err = build_inputs(cli).expect_err("must require break start");
        assert!(err.contains("--career-break-start"));
    }

    #[test]
    fn build_inputs_rejects_break_start_without_length() {
        let mut cli = sample_cli();
        cli.career_break_start = Some(3);
        let err = build_inputs(cli).expect_err("must require break length");
        assert!(err.contains("--career-break-length"));
    }

    #[test]
    fn build_inputs_rejects_lump_sum_beyond_write_off() {
        let mut cli = sample_cli();
        cli.lump_sum = 1_000.0;
        cli.lump_sum_year = 30;
        let err = build_inputs(cli).expect_err("must reject out-of-window lump sum");
        assert!(err.contains("--lump-sum-year"));
    }

    #[test]
    fn student_mode_derives_the_balance() {
        let mut cli = sample_cli();
        cli.student_mode = true;
        cli.course_length = 3;
        cli.maintenance_per_year = 9_000.0;
        cli.loan_balance = 0.0;

        let inputs = build_inputs(cli).expect("valid inputs");
        assert_approx(inputs.initial_balance, 3.0 * (9_000.0 + TUITION_PER_YEAR));
    }

    #[test]
    fn student_mode_rejects_zero_course_length() {
        let mut cli = sample_cli();
        cli.student_mode = true;
        cli.course_length = 0;
        let err = build_inputs(cli).expect_err("must reject zero course length");
        assert!(err.contains("--course-length"));
    }

    #[test]
    fn payload_parses_web_keys() {
        let json = r#"{
          "salary": 32000,
          "plan": "plan5",
          "loanBalance": 52000,
          "graduationYear": 2026,
          "salaryGrowth": 3,
          "thresholdGrowth": 1,
          "monthlyOverpayment": 75,
          "lumpSum": 2000,
          "lumpSumYear": 4,
          "careerBreakStart": 6,
          "careerBreakLength": 2,
          "interestRate": 4.3
        }"#;
        let inputs = projection_input_from_json(json).expect("json should parse");

        assert_approx(inputs.annual_salary, 32_000.0);
        assert_eq!(inputs.plan.name, "Plan 5");
        assert_approx(inputs.initial_balance, 52_000.0);
        assert_eq!(inputs.graduation_year, 2026);
        assert_approx(inputs.salary_growth_rate, 0.03);
        assert_approx(inputs.threshold_growth_rate, 0.01);
        assert_approx(inputs.monthly_overpayment, 75.0);
        assert_approx(inputs.lump_sum, 2_000.0);
        assert_eq!(inputs.lump_sum_year, 4);
        assert_eq!(inputs.career_break_start_year, Some(6));
        assert_eq!(inputs.career_break_length_years, 2);
        assert_approx(inputs.interest_rate_override.expect("override set"), 0.043);
    }

    #[test]
    fn payload_defaults_to_plan2() {
        let inputs = projection_input_from_json(r#"{"salary": 28000}"#).expect("json should parse");
        assert_eq!(inputs.plan.name, "Plan 2");
        assert_approx(inputs.annual_salary, 28_000.0);
    }

    #[test]
    fn payload_without_salary_is_rejected() {
        let err = projection_input_from_json(r#"{"plan": "plan2"}"#)
            .expect_err("absent salary must fail");
        match err {
            ApiError::BadRequest(msg) => assert!(msg.contains("--salary")),
            other => panic!("expected a request error, got {other:?}"),
        }
    }

    #[test]
    fn payload_accepts_plan3_as_postgraduate_alias() {
        let inputs = projection_input_from_json(r#"{"salary": 28000, "plan": "plan3"}"#)
            .expect("json should parse");
        assert_eq!(inputs.plan.name, "Postgraduate Loan");
        assert_approx(inputs.plan.repayment_rate, 0.06);
    }

    #[test]
    fn payload_with_unknown_plan_is_a_configuration_error() {
        let err = projection_input_from_json(r#"{"plan": "plan9"}"#)
            .expect_err("unknown plan must fail");
        assert!(matches!(err, ApiError::UnknownPlan(_)));
    }

    #[test]
    fn projection_response_serializes_expected_fields() {
        let inputs = projection_input_from_json(r#"{"salary": 34000}"#).expect("json should parse");
        let result = project(&inputs).expect("projection succeeds");
        let json = serde_json::to_string(&result).expect("result should serialize");

        assert!(json.contains("\"monthlyRepayment\""));
        assert!(json.contains("\"annualRepayment\""));
        assert!(json.contains("\"totalRepaid\""));
        assert!(json.contains("\"yearsUntilComplete\""));
        assert!(json.contains("\"fullyRepaid\""));
        assert!(json.contains("\"amountWrittenOff\""));
        assert!(json.contains("\"chartData\""));
        assert!(json.contains("\"calendarYear\""));
        assert!(json.contains("\"onCareerBreak\""));
    }
}
