use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use chrono::Datelike;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{
    EarningsEntry, Inputs, SummaryStatistics, YearPoint, compute_statistics, run_projection,
    validate_allocation,
};

const INDEX_HTML: &str = include_str!("../../web/index.html");
const STYLES_CSS: &str = include_str!("../../web/styles.css");
const APP_JS: &str = include_str!("../../web/app.js");

const DEFAULT_HISTORY_SPAN_YEARS: i32 = 5;

#[derive(Parser, Debug)]
#[command(
    name = "fireplan",
    about = "FIRE planning calculator (reconstructed history + 40-year projection)"
)]
struct Cli {
    #[arg(long, default_value_t = 10_000.0)]
    current_savings: f64,
    #[arg(
        long,
        default_value_t = 1.5,
        help = "Expected annual savings growth in percent"
    )]
    savings_growth_rate: f64,
    #[arg(long, default_value_t = 50_000.0)]
    current_investments: f64,
    #[arg(
        long,
        default_value_t = 7.0,
        help = "Expected annual investment growth in percent"
    )]
    investments_growth_rate: f64,
    #[arg(long, default_value_t = 75_000.0)]
    current_annual_income: f64,
    #[arg(
        long,
        default_value_t = 3.0,
        help = "Expected annual income growth in percent"
    )]
    income_growth_rate: f64,
    #[arg(
        long,
        default_value_t = 70.0,
        help = "Share of income spent, in percent; the three shares must sum to 100"
    )]
    spend_percentage: f64,
    #[arg(long, default_value_t = 10.0, help = "Share of income saved, in percent")]
    savings_percentage: f64,
    #[arg(
        long,
        default_value_t = 20.0,
        help = "Share of income invested, in percent"
    )]
    investment_percentage: f64,
    #[arg(
        long,
        default_value_t = 2.5,
        help = "Expected annual inflation in percent"
    )]
    inflation_rate: f64,
    #[arg(
        long,
        help = "First year with any earnings; defaults to five years before the current year"
    )]
    first_earning_year: Option<i32>,
    #[arg(long, default_value_t = 50_000.0)]
    first_year_earnings: f64,
    #[arg(
        long = "historical-earning",
        value_parser = parse_earnings_entry,
        value_name = "YEAR=AMOUNT",
        help = "Known income for a past year, repeatable"
    )]
    historical_earnings: Vec<EarningsEntry>,
    #[arg(
        long,
        help = "Calendar year treated as now; defaults to the system clock"
    )]
    current_year: Option<i32>,
}

fn parse_earnings_entry(raw: &str) -> Result<EarningsEntry, String> {
    let (year, amount) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected YEAR=AMOUNT, got '{raw}'"))?;
    let year = year
        .trim()
        .parse::<i32>()
        .map_err(|_| format!("invalid year in '{raw}'"))?;
    let amount = amount
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("invalid amount in '{raw}'"))?;
    Ok(EarningsEntry { year, amount })
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectPayload {
    current_savings: Option<f64>,
    savings_growth_rate: Option<f64>,
    current_investments: Option<f64>,
    investments_growth_rate: Option<f64>,

    current_annual_income: Option<f64>,
    income_growth_rate: Option<f64>,

    spend_percentage: Option<f64>,
    savings_percentage: Option<f64>,
    investment_percentage: Option<f64>,

    inflation_rate: Option<f64>,

    first_earning_year: Option<i32>,
    first_year_earnings: Option<f64>,
    historical_earnings: Option<Vec<EarningsEntry>>,

    current_year: Option<i32>,
}

#[derive(Debug)]
struct ProjectRequest {
    inputs: Inputs,
    current_year: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectResponse {
    current_year: i32,
    past: Vec<YearPoint>,
    future: Vec<YearPoint>,
    statistics: SummaryStatistics,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn current_calendar_year() -> i32 {
    chrono::Utc::now().year()
}

fn build_request(cli: Cli) -> Result<ProjectRequest, String> {
    let current_year = cli.current_year.unwrap_or_else(current_calendar_year);
    let first_earning_year = cli
        .first_earning_year
        .unwrap_or(current_year - DEFAULT_HISTORY_SPAN_YEARS);

    for (name, value) in [
        ("--current-savings", cli.current_savings),
        ("--current-investments", cli.current_investments),
        ("--current-annual-income", cli.current_annual_income),
        ("--first-year-earnings", cli.first_year_earnings),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(format!("{name} must be a non-negative amount"));
        }
    }

    for (name, rate) in [
        ("--savings-growth-rate", cli.savings_growth_rate),
        ("--investments-growth-rate", cli.investments_growth_rate),
        ("--income-growth-rate", cli.income_growth_rate),
    ] {
        if !rate.is_finite() || rate <= -100.0 {
            return Err(format!("{name} must be > -100"));
        }
    }

    if !(0.0..=100.0).contains(&cli.inflation_rate) {
        return Err("--inflation-rate must be between 0 and 100".to_string());
    }

    for (name, share) in [
        ("--spend-percentage", cli.spend_percentage),
        ("--savings-percentage", cli.savings_percentage),
        ("--investment-percentage", cli.investment_percentage),
    ] {
        if !(0.0..=100.0).contains(&share) {
            return Err(format!("{name} must be between 0 and 100"));
        }
    }

    if !validate_allocation(
        cli.spend_percentage,
        cli.savings_percentage,
        cli.investment_percentage,
    ) {
        return Err("allocation percentages must sum to 100".to_string());
    }

    if first_earning_year >= current_year {
        return Err("--first-earning-year must be earlier than the current year".to_string());
    }

    let mut seen_years = Vec::with_capacity(cli.historical_earnings.len());
    for entry in &cli.historical_earnings {
        if !entry.amount.is_finite() || entry.amount < 0.0 {
            return Err(format!(
                "historical earnings for {} must be a non-negative amount",
                entry.year
            ));
        }
        if entry.year <= first_earning_year || entry.year >= current_year {
            return Err(format!(
                "historical earnings year {} must lie strictly between {first_earning_year} and {current_year}",
                entry.year
            ));
        }
        if seen_years.contains(&entry.year) {
            return Err(format!("duplicate historical earnings year {}", entry.year));
        }
        seen_years.push(entry.year);
    }

    Ok(ProjectRequest {
        inputs: Inputs {
            current_savings: cli.current_savings,
            savings_growth_rate: cli.savings_growth_rate,
            current_investments: cli.current_investments,
            investments_growth_rate: cli.investments_growth_rate,
            current_annual_income: cli.current_annual_income,
            income_growth_rate: cli.income_growth_rate,
            spend_percentage: cli.spend_percentage,
            savings_percentage: cli.savings_percentage,
            investment_percentage: cli.investment_percentage,
            inflation_rate: cli.inflation_rate,
            first_earning_year,
            first_year_earnings: cli.first_year_earnings,
            historical_earnings: cli.historical_earnings,
        },
        current_year,
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
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    println!("FIRE planner listening on http://{addr}");
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

async fn project_get_handler(Query(payload): Query<ProjectPayload>) -> Response {
    project_handler_impl(payload).await
}

async fn project_post_handler(Json(payload): Json<ProjectPayload>) -> Response {
    project_handler_impl(payload).await
}

async fn project_handler_impl(payload: ProjectPayload) -> Response {
    let request = match project_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    let projection = run_projection(&request.inputs, request.current_year);
    let last_known_past_income = projection.past.last().map(|p| p.income).unwrap_or(0.0);
    let statistics =
        compute_statistics(&projection.past, &projection.future, last_known_past_income);

    json_response(
        StatusCode::OK,
        ProjectResponse {
            current_year: request.current_year,
            past: projection.past,
            future: projection.future,
            statistics,
        },
    )
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
fn project_request_from_json(json: &str) -> Result<ProjectRequest, String> {
    let payload = serde_json::from_str::<ProjectPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    project_request_from_payload(payload)
}

fn project_request_from_payload(payload: ProjectPayload) -> Result<ProjectRequest, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.current_savings {
        cli.current_savings = v;
    }
    if let Some(v) = payload.savings_growth_rate {
        cli.savings_growth_rate = v;
    }
    if let Some(v) = payload.current_investments {
        cli.current_investments = v;
    }
    if let Some(v) = payload.investments_growth_rate {
        cli.investments_growth_rate = v;
    }

    if let Some(v) = payload.current_annual_income {
        cli.current_annual_income = v;
    }
    if let Some(v) = payload.income_growth_rate {
        cli.income_growth_rate = v;
    }

    if let Some(v) = payload.spend_percentage {
        cli.spend_percentage = v;
    }
    if let Some(v) = payload.savings_percentage {
        cli.savings_percentage = v;
    }
    if let Some(v) = payload.investment_percentage {
        cli.investment_percentage = v;
    }

    if let Some(v) = payload.inflation_rate {
        cli.inflation_rate = v;
    }

    if let Some(v) = payload.first_earning_year {
        cli.first_earning_year = Some(v);
    }
    if let Some(v) = payload.first_year_earnings {
        cli.first_year_earnings = v;
    }
    if let Some(v) = payload.historical_earnings {
        cli.historical_earnings = v;
    }

    if let Some(v) = payload.current_year {
        cli.current_year = Some(v);
    }

    build_request(cli)
}

fn default_cli_for_api() -> Cli {
    Cli {
        current_savings: 10_000.0,
        savings_growth_rate: 1.5,
        current_investments: 50_000.0,
        investments_growth_rate: 7.0,
        current_annual_income: 75_000.0,
        income_growth_rate: 3.0,
        spend_percentage: 70.0,
        savings_percentage: 10.0,
        investment_percentage: 20.0,
        inflation_rate: 2.5,
        first_earning_year: None,
        first_year_earnings: 50_000.0,
        historical_earnings: Vec::new(),
        current_year: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_cli() -> Cli {
        let mut cli = default_cli_for_api();
        cli.current_year = Some(2025);
        cli
    }

    #[test]
    fn build_request_defaults_first_earning_year_to_five_years_ago() {
        let request = build_request(sample_cli()).expect("valid request");
        assert_eq!(request.inputs.first_earning_year, 2020);
        assert_eq!(request.current_year, 2025);
    }

    #[test]
    fn build_request_rejects_negative_balances() {
        let mut cli = sample_cli();
        cli.current_savings = -1.0;
        let err = build_request(cli).expect_err("must reject negative savings");
        assert!(err.contains("--current-savings"));
    }

    #[test]
    fn build_request_rejects_allocation_not_summing_to_100() {
        let mut cli = sample_cli();
        cli.investment_percentage = 15.0;
        let err = build_request(cli).expect_err("must reject bad allocation");
        assert!(err.contains("sum to 100"));
    }

    #[test]
    fn build_request_rejects_first_earning_year_not_in_the_past() {
        let mut cli = sample_cli();
        cli.first_earning_year = Some(2025);
        let err = build_request(cli).expect_err("must reject non-past year");
        assert!(err.contains("--first-earning-year"));
    }

    #[test]
    fn build_request_rejects_inflation_above_100() {
        let mut cli = sample_cli();
        cli.inflation_rate = 101.0;
        let err = build_request(cli).expect_err("must reject inflation > 100");
        assert!(err.contains("--inflation-rate"));
    }

    #[test]
    fn build_request_rejects_growth_rate_at_minus_100() {
        let mut cli = sample_cli();
        cli.income_growth_rate = -100.0;
        let err = build_request(cli).expect_err("must reject -100 growth");
        assert!(err.contains("--income-growth-rate"));
    }

    #[test]
    fn build_request_rejects_duplicate_historical_years() {
        let mut cli = sample_cli();
        cli.first_earning_year = Some(2015);
        cli.historical_earnings = vec![
            EarningsEntry {
                year: 2020,
                amount: 1.0,
            },
            EarningsEntry {
                year: 2020,
                amount: 2.0,
            },
        ];
        let err = build_request(cli).expect_err("must reject duplicates");
        assert!(err.contains("duplicate"));
    }

    #[test]
    fn build_request_rejects_historical_years_outside_range() {
        let mut cli = sample_cli();
        cli.first_earning_year = Some(2020);
        cli.historical_earnings = vec![EarningsEntry {
            year: 2020,
            amount: 1.0,
        }];
        let err = build_request(cli).expect_err("must reject anchor-year entry");
        assert!(err.contains("strictly between"));
    }

    #[test]
    fn project_request_from_json_parses_web_keys() {
        let json = r#"{
          "currentSavings": 12000,
          "savingsGrowthRate": 2,
          "currentInvestments": 80000,
          "investmentsGrowthRate": 6,
          "currentAnnualIncome": 90000,
          "incomeGrowthRate": 4,
          "spendPercentage": 60,
          "savingsPercentage": 15,
          "investmentPercentage": 25,
          "inflationRate": 3,
          "firstEarningYear": 2012,
          "firstYearEarnings": 30000,
          "historicalEarnings": [{"year": 2018, "amount": 55000}],
          "currentYear": 2025
        }"#;
        let request = project_request_from_json(json).expect("json should parse");
        let inputs = request.inputs;

        assert_eq!(request.current_year, 2025);
        assert_approx(inputs.current_savings, 12_000.0);
        assert_approx(inputs.savings_growth_rate, 2.0);
        assert_approx(inputs.current_investments, 80_000.0);
        assert_approx(inputs.investments_growth_rate, 6.0);
        assert_approx(inputs.current_annual_income, 90_000.0);
        assert_approx(inputs.income_growth_rate, 4.0);
        assert_approx(inputs.spend_percentage, 60.0);
        assert_approx(inputs.savings_percentage, 15.0);
        assert_approx(inputs.investment_percentage, 25.0);
        assert_approx(inputs.inflation_rate, 3.0);
        assert_eq!(inputs.first_earning_year, 2012);
        assert_approx(inputs.first_year_earnings, 30_000.0);
        assert_eq!(inputs.historical_earnings.len(), 1);
        assert_eq!(inputs.historical_earnings[0].year, 2018);
        assert_approx(inputs.historical_earnings[0].amount, 55_000.0);
    }

    #[test]
    fn project_request_from_json_applies_defaults_for_missing_keys() {
        let request =
            project_request_from_json(r#"{"currentYear": 2025}"#).expect("json should parse");
        assert_approx(request.inputs.current_annual_income, 75_000.0);
        assert_approx(request.inputs.spend_percentage, 70.0);
        assert_eq!(request.inputs.first_earning_year, 2020);
    }

    #[test]
    fn parse_earnings_entry_accepts_year_amount_pairs() {
        let entry = parse_earnings_entry("2019=48000.50").expect("must parse");
        assert_eq!(entry.year, 2019);
        assert_approx(entry.amount, 48_000.5);

        assert!(parse_earnings_entry("2019").is_err());
        assert!(parse_earnings_entry("year=48000").is_err());
        assert!(parse_earnings_entry("2019=lots").is_err());
    }

    #[test]
    fn project_response_serialization_contains_expected_fields() {
        let request = build_request(sample_cli()).expect("valid request");
        let projection = run_projection(&request.inputs, request.current_year);
        let last_income = projection.past.last().map(|p| p.income).unwrap_or(0.0);
        let statistics = compute_statistics(&projection.past, &projection.future, last_income);

        let response = ProjectResponse {
            current_year: request.current_year,
            past: projection.past,
            future: projection.future,
            statistics,
        };
        let json = serde_json::to_string(&response).expect("response should serialize");

        assert!(json.contains("\"currentYear\""));
        assert!(json.contains("\"past\""));
        assert!(json.contains("\"future\""));
        assert!(json.contains("\"statistics\""));
        assert!(json.contains("\"totalIncome\""));
        assert!(json.contains("\"finalSavings\""));
        assert!(json.contains("\"finalInvestments\""));
        assert!(json.contains("\"totalValue\""));
        assert!(json.contains("\"fireYear\""));
        assert!(json.contains("\"spending\""));
    }

    #[test]
    fn year_point_serialization_omits_missing_spending() {
        let point = YearPoint {
            year: 2025,
            income: 1.0,
            savings: 2.0,
            investments: 3.0,
            spending: None,
        };
        let json = serde_json::to_string(&point).expect("point should serialize");
        assert!(!json.contains("spending"));
    }
}
