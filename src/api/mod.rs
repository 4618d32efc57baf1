pub mod render;

use axum::{
    Router,
    extract::{Json, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::core::{
    AdjustmentSession, AffordabilityInput, AffordabilityReport, AffordabilityResult, CalcError,
    DtiPolicy, Market, WealthInput, WealthResult, YearPoint, adjust_payment, assess,
    compute_affordability, project_wealth,
};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Not found")]
    NotFound,
}

impl From<CalcError> for ApiError {
    fn from(err: CalcError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("Invalid JSON payload: {}", rejection.body_text()))
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
        };
        json_response(
            status,
            ErrorResponse {
                error: self.to_string(),
            },
        )
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("Invalid input: {0}")]
    Input(#[from] CalcError),
    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliDtiPolicy {
    TwoTier,
    Flat,
}

#[derive(Parser, Debug)]
#[command(
    name = "afford",
    about = "Ljubljana property affordability and wealth projection calculator"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the JSON API over HTTP
    Serve {
        #[arg(long, help = "Port to listen on, defaults to PORT or 8080")]
        port: Option<u16>,
    },
    /// Estimate the maximum affordable property price
    Affordability(AffordabilityArgs),
    /// Project capital growth with monthly contributions
    Project(ProjectArgs),
}

#[derive(Args, Debug, Clone)]
struct PolicyArgs {
    #[arg(long, value_enum, help = "DTI policy, defaults to DTI_POLICY or two-tier")]
    dti_policy: Option<CliDtiPolicy>,
    #[arg(long, help = "Front-end housing ratio in percent, e.g. 28")]
    front_end_percent: Option<f64>,
    #[arg(long, help = "Back-end total debt ratio in percent, e.g. 36")]
    back_end_percent: Option<f64>,
    #[arg(long, help = "Flat total debt ratio in percent, e.g. 33")]
    flat_percent: Option<f64>,
}

#[derive(Args, Debug, Clone)]
struct AffordabilityArgs {
    #[arg(long, default_value_t = 30_000.0, help = "Gross annual household income")]
    annual_income: f64,
    #[arg(long, default_value_t = 50_000.0, help = "Savings available as down payment")]
    down_payment: f64,
    #[arg(long, default_value_t = 100.0, help = "Existing monthly debt payments")]
    monthly_debt: f64,
    #[arg(long, default_value_t = 3.0, help = "Annual interest rate in percent")]
    interest_rate: f64,
    #[arg(long, default_value_t = 20)]
    loan_term_years: u32,
    #[arg(
        long,
        default_value_t = 0.2,
        help = "Annual insurance cost in percent of the property price"
    )]
    insurance_rate: f64,
    #[arg(long, default_value_t = 0.0, help = "Monthly HOA or building fund fees")]
    hoa_fees: f64,
    #[arg(
        long,
        allow_hyphen_values = true,
        help = "Stress-test adjustment in percent, between -50 and 50"
    )]
    adjustment: Option<f64>,
    #[command(flatten)]
    policy: PolicyArgs,
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug, Clone)]
struct ProjectArgs {
    #[arg(long, default_value_t = 10_000.0)]
    current_capital: f64,
    #[arg(long, default_value_t = 2_000.0, help = "Net monthly income")]
    monthly_income: f64,
    #[arg(long, default_value_t = 20.0, help = "Share of monthly income invested, in percent")]
    investment_percentage: f64,
    #[arg(long, default_value_t = 7.0, help = "Expected annual return in percent")]
    return_rate: f64,
    #[arg(long, default_value_t = 0.0, help = "Annual fund expense ratio in percent")]
    expense_ratio: f64,
    #[arg(long, default_value_t = 20)]
    years: u32,
    #[arg(long)]
    json: bool,
}

impl PolicyArgs {
    /// Applies CLI overrides on top of the configured policy.
    fn resolve(&self, configured: DtiPolicy) -> DtiPolicy {
        let (front, back, flat) = match configured {
            DtiPolicy::TwoTier {
                front_end,
                back_end,
            } => (front_end, back_end, crate::core::DEFAULT_FLAT_RATIO),
            DtiPolicy::Flat { ratio } => (
                crate::core::DEFAULT_FRONT_END_RATIO,
                crate::core::DEFAULT_BACK_END_RATIO,
                ratio,
            ),
        };
        let kind = self.dti_policy.unwrap_or(match configured {
            DtiPolicy::TwoTier { .. } => CliDtiPolicy::TwoTier,
            DtiPolicy::Flat { .. } => CliDtiPolicy::Flat,
        });
        match kind {
            CliDtiPolicy::TwoTier => DtiPolicy::TwoTier {
                front_end: self.front_end_percent.map_or(front, |v| v / 100.0),
                back_end: self.back_end_percent.map_or(back, |v| v / 100.0),
            },
            CliDtiPolicy::Flat => DtiPolicy::Flat {
                ratio: self.flat_percent.map_or(flat, |v| v / 100.0),
            },
        }
    }
}

pub async fn run(cli: Cli, config: Config) -> Result<(), RunError> {
    match cli.command {
        Command::Serve { port } => {
            let port = port.unwrap_or(config.port);
            run_http_server(config, port).await?;
        }
        Command::Affordability(args) => {
            let market = Market {
                dti_policy: args.policy.resolve(config.market.dti_policy),
                ..config.market
            };
            let input = AffordabilityInput {
                annual_income: args.annual_income,
                down_payment: args.down_payment,
                monthly_debt: args.monthly_debt,
                interest_rate_percent: args.interest_rate,
                loan_term_years: args.loan_term_years,
                insurance_rate_percent: args.insurance_rate,
                hoa_fees: args.hoa_fees,
            };
            let mut session = AdjustmentSession::new();
            session.calculate(compute_affordability(&input, market.dti_policy)?);
            if let Some(percent) = args.adjustment {
                session.set_adjustment(percent)?;
            }
            let view = session
                .current()
                .ok_or_else(|| CalcError::invalid("adjustmentPercent", "produced no result"))?;
            let report = assess(view, &market);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!(
                    "{}",
                    render::affordability_text(&report, session.adjustment_percent())
                );
            }
        }
        Command::Project(args) => {
            let result = project_wealth(&WealthInput {
                current_capital: args.current_capital,
                monthly_income: args.monthly_income,
                investment_percentage: args.investment_percentage,
                return_rate_percent: args.return_rate,
                expense_ratio_percent: args.expense_ratio,
                years: args.years,
            })?;
            if args.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&WealthReport::from(result))?
                );
            } else {
                print!("{}", render::projection_text(&result));
            }
        }
    }
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct AffordabilityPayload {
    #[serde(alias = "income", alias = "annualOrMonthlyIncome")]
    annual_income: Option<f64>,
    down_payment: Option<f64>,
    monthly_debt: Option<f64>,
    #[serde(alias = "interestRate")]
    interest_rate_percent: Option<f64>,
    #[serde(alias = "loanTerm")]
    loan_term_years: Option<i64>,
    #[serde(alias = "insuranceRate")]
    insurance_rate_percent: Option<f64>,
    hoa_fees: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct WealthPayload {
    current_capital: Option<f64>,
    monthly_income: Option<f64>,
    investment_percentage: Option<f64>,
    #[serde(alias = "returnRate")]
    return_rate_percent: Option<f64>,
    #[serde(alias = "expenseRatio")]
    expense_ratio_percent: Option<f64>,
    years: Option<i64>,
}

/// Wealth projection as sent to clients, with chart points alongside the raw series.
#[derive(Debug, Serialize)]
struct WealthReport {
    #[serde(flatten)]
    result: WealthResult,
    points: Vec<YearPoint>,
}

impl From<WealthResult> for WealthReport {
    fn from(result: WealthResult) -> Self {
        Self {
            points: result.points(),
            result,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdjustPayload {
    base: AffordabilityResult,
    adjustment_percent: f64,
}

fn default_affordability_input() -> AffordabilityInput {
    AffordabilityInput {
        annual_income: 30_000.0,
        down_payment: 50_000.0,
        monthly_debt: 100.0,
        interest_rate_percent: 3.0,
        loan_term_years: 20,
        insurance_rate_percent: 0.2,
        hoa_fees: 0.0,
    }
}

fn default_wealth_input() -> WealthInput {
    WealthInput {
        current_capital: 10_000.0,
        monthly_income: 2_000.0,
        investment_percentage: 20.0,
        return_rate_percent: 7.0,
        expense_ratio_percent: 0.0,
        years: 20,
    }
}

fn affordability_input_from_payload(payload: AffordabilityPayload) -> AffordabilityInput {
    let mut input = default_affordability_input();
    if let Some(v) = payload.annual_income {
        input.annual_income = v;
    }
    if let Some(v) = payload.down_payment {
        input.down_payment = v;
    }
    if let Some(v) = payload.monthly_debt {
        input.monthly_debt = v;
    }
    if let Some(v) = payload.interest_rate_percent {
        input.interest_rate_percent = v;
    }
    if let Some(v) = payload.loan_term_years {
        // Out-of-range terms map to 0 so validation reports them by name.
        input.loan_term_years = u32::try_from(v).unwrap_or(0);
    }
    if let Some(v) = payload.insurance_rate_percent {
        input.insurance_rate_percent = v;
    }
    if let Some(v) = payload.hoa_fees {
        input.hoa_fees = v;
    }
    input
}

fn wealth_input_from_payload(payload: WealthPayload) -> WealthInput {
    let mut input = default_wealth_input();
    if let Some(v) = payload.current_capital {
        input.current_capital = v;
    }
    if let Some(v) = payload.monthly_income {
        input.monthly_income = v;
    }
    if let Some(v) = payload.investment_percentage {
        input.investment_percentage = v;
    }
    if let Some(v) = payload.return_rate_percent {
        input.return_rate_percent = v;
    }
    if let Some(v) = payload.expense_ratio_percent {
        input.expense_ratio_percent = v;
    }
    if let Some(v) = payload.years {
        // A non-positive horizon projects only the starting capital.
        input.years = u32::try_from(v.max(0)).unwrap_or(u32::MAX);
    }
    input
}

fn validate_base(base: &AffordabilityResult) -> Result<(), CalcError> {
    for (field, value) in [
        ("base.maxPrice", base.max_price),
        ("base.loanAmount", base.loan_amount),
        ("base.mortgagePayment", base.mortgage_payment),
        ("base.monthlyInsurance", base.monthly_insurance),
        ("base.hoaFees", base.hoa_fees),
        ("base.totalPITI", base.total_piti),
        ("base.maxPITI", base.max_piti),
        ("base.totalDebt", base.total_debt),
        ("base.maxTotalDebt", base.max_total_debt),
    ] {
        if !value.is_finite() {
            return Err(CalcError::invalid(field, "must be a finite number"));
        }
    }
    // Income is optional; when given it must be usable for the risk view.
    if base
        .monthly_income
        .is_some_and(|income| !income.is_finite() || income <= 0.0)
    {
        return Err(CalcError::invalid("base.monthlyIncome", "must be > 0"));
    }
    Ok(())
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/affordability", post(affordability_handler))
        .route("/affordability/adjust", post(adjust_handler))
        .route("/wealth-projection", post(wealth_handler))
        .fallback(not_found_handler)
        .with_state(state)
}

pub async fn run_http_server(config: Config, port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = create_router(AppState::new(config));

    let listener = TcpListener::bind(addr).await?;
    info!("Affordability API listening on http://{addr}");
    info!("Local access: http://127.0.0.1:{port}/");

    axum::serve(listener, app).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, serde_json::json!({ "status": "ok" }))
}

async fn not_found_handler() -> Response {
    ApiError::NotFound.into_response()
}

async fn affordability_handler(
    State(state): State<AppState>,
    payload: Result<Json<AffordabilityPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload.inspect_err(log_rejection)?;
    let input = affordability_input_from_payload(payload);
    let report = affordability_report(&input, &state.config.market).inspect_err(log_invalid)?;
    debug!(max_price = report.result.max_price, "affordability computed");
    Ok(json_response(StatusCode::OK, report))
}

async fn adjust_handler(
    State(state): State<AppState>,
    payload: Result<Json<AdjustPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload.inspect_err(log_rejection)?;
    validate_base(&payload.base).inspect_err(log_invalid)?;
    let adjusted =
        adjust_payment(&payload.base, payload.adjustment_percent).inspect_err(log_invalid)?;
    debug!(
        adjustment_percent = payload.adjustment_percent,
        "affordability adjusted"
    );
    Ok(json_response(
        StatusCode::OK,
        assess(adjusted, &state.config.market),
    ))
}

async fn wealth_handler(
    payload: Result<Json<WealthPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload.inspect_err(log_rejection)?;
    let input = wealth_input_from_payload(payload);
    let result = project_wealth(&input).inspect_err(log_invalid)?;
    debug!(years = input.years, "wealth projected");
    Ok(json_response(StatusCode::OK, WealthReport::from(result)))
}

fn affordability_report(
    input: &AffordabilityInput,
    market: &Market,
) -> Result<AffordabilityReport, CalcError> {
    let result = compute_affordability(input, market.dti_policy)?;
    Ok(assess(result, market))
}

fn log_rejection(rejection: &JsonRejection) {
    warn!(error = %rejection.body_text(), "rejected request body");
}

fn log_invalid(err: &CalcError) {
    warn!(field = err.field(), error = %err, "rejected invalid input");
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}
