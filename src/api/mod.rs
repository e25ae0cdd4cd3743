use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::core::{
    Dashboard, EngineError, FireProfile, MAX_AGE, MAX_PROJECTION_MONTHS, Scenario, SimulationParameters,
    SimulationResult, build_dashboard, monte_carlo_horizon, run_monte_carlo, years_to_fire,
};

const MAX_SIMULATIONS: u32 = 100_000;
const MAX_RETIREMENT_YEARS: u32 = 100;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidSettings(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn invalid(msg: impl Into<String>) -> ApiError {
    ApiError::InvalidSettings(msg.into())
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliScenario {
    Base,
    Optimistic,
    Pessimistic,
}

impl From<CliScenario> for Scenario {
    fn from(value: CliScenario) -> Self {
        match value {
            CliScenario::Base => Scenario::Base,
            CliScenario::Optimistic => Scenario::Optimistic,
            CliScenario::Pessimistic => Scenario::Pessimistic,
        }
    }
}

impl From<Scenario> for CliScenario {
    fn from(value: Scenario) -> Self {
        match value {
            Scenario::Base => CliScenario::Base,
            Scenario::Optimistic => CliScenario::Optimistic,
            Scenario::Pessimistic => CliScenario::Pessimistic,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "fire-projection",
    about = "FIRE projection engine: deterministic scenarios and Monte Carlo retirement outcomes"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the JSON API.
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Run the Monte Carlo simulation and print the result as JSON.
    Simulate(Settings),
    /// Print the deterministic dashboard (scenarios, Coast FIRE, metrics) as JSON.
    Project(Settings),
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct Settings {
    #[arg(long, default_value_t = 0.0, help = "Current net worth (portfolio + cash)")]
    pub current_net_worth: f64,
    #[arg(long, default_value_t = 2_000_000.0)]
    pub fire_target: f64,
    #[arg(long, default_value_t = 3_000.0)]
    pub monthly_contribution: f64,
    #[arg(
        long,
        default_value_t = 7.0,
        help = "Expected annual return in percent, e.g. 7"
    )]
    pub expected_return: f64,
    #[arg(
        long,
        default_value_t = 4.0,
        help = "Annual safe withdrawal rate in percent"
    )]
    pub withdrawal_rate: f64,
    #[arg(long, default_value_t = 3_000.0)]
    pub monthly_expenses: f64,
    #[arg(long, default_value_t = 5_000.0)]
    pub current_monthly_income: f64,
    #[arg(long, default_value_t = 30)]
    pub current_age: u32,
    #[arg(long, default_value_t = 65)]
    pub coast_fire_age: u32,
    #[arg(
        long,
        default_value_t = 15.0,
        help = "Annual return volatility in percent"
    )]
    pub volatility: f64,
    #[arg(
        long,
        help = "Accumulation years for the Monte Carlo run; defaults to the base projection"
    )]
    pub years_to_fire: Option<u32>,
    #[arg(long, default_value_t = 30)]
    pub retirement_years: u32,
    #[arg(
        long,
        default_value_t = 2.5,
        help = "Annual inflation applied to retirement expenses in percent"
    )]
    pub inflation_rate: f64,
    #[arg(long, default_value_t = 1000)]
    pub simulations: u32,
    #[arg(long, help = "Fix the random seed for a reproducible run")]
    pub seed: Option<u64>,
    #[arg(long, value_enum, default_value_t = CliScenario::Base)]
    pub scenario: CliScenario,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            current_net_worth: 0.0,
            fire_target: 2_000_000.0,
            monthly_contribution: 3_000.0,
            expected_return: 7.0,
            withdrawal_rate: 4.0,
            monthly_expenses: 3_000.0,
            current_monthly_income: 5_000.0,
            current_age: 30,
            coast_fire_age: 65,
            volatility: 15.0,
            years_to_fire: None,
            retirement_years: 30,
            inflation_rate: 2.5,
            simulations: 1_000,
            seed: None,
            scenario: CliScenario::Base,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SettingsPayload {
    current_net_worth: Option<f64>,
    fire_target: Option<f64>,
    monthly_contribution: Option<f64>,
    expected_return: Option<f64>,
    withdrawal_rate: Option<f64>,
    monthly_expenses: Option<f64>,
    current_monthly_income: Option<f64>,
    current_age: Option<u32>,
    coast_fire_age: Option<u32>,
    volatility: Option<f64>,
    years_to_fire: Option<u32>,
    retirement_years: Option<u32>,
    inflation_rate: Option<f64>,
    #[serde(alias = "numSimulations")]
    simulations: Option<u32>,
    seed: Option<u64>,
    scenario: Option<Scenario>,
}

impl SettingsPayload {
    fn overlay(self, mut settings: Settings) -> Settings {
        if let Some(v) = self.current_net_worth {
            settings.current_net_worth = v;
        }
        if let Some(v) = self.fire_target {
            settings.fire_target = v;
        }
        if let Some(v) = self.monthly_contribution {
            settings.monthly_contribution = v;
        }
        if let Some(v) = self.expected_return {
            settings.expected_return = v;
        }
        if let Some(v) = self.withdrawal_rate {
            settings.withdrawal_rate = v;
        }
        if let Some(v) = self.monthly_expenses {
            settings.monthly_expenses = v;
        }
        if let Some(v) = self.current_monthly_income {
            settings.current_monthly_income = v;
        }
        if let Some(v) = self.current_age {
            settings.current_age = v;
        }
        if let Some(v) = self.coast_fire_age {
            settings.coast_fire_age = v;
        }
        if let Some(v) = self.volatility {
            settings.volatility = v;
        }
        if let Some(v) = self.years_to_fire {
            settings.years_to_fire = Some(v);
        }
        if let Some(v) = self.retirement_years {
            settings.retirement_years = v;
        }
        if let Some(v) = self.inflation_rate {
            settings.inflation_rate = v;
        }
        if let Some(v) = self.simulations {
            settings.simulations = v;
        }
        if let Some(v) = self.seed {
            settings.seed = Some(v);
        }
        if let Some(v) = self.scenario {
            settings.scenario = v.into();
        }
        settings
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    parameters: SimulationParameters,
    #[serde(flatten)]
    result: SimulationResult,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn check_settings(settings: &Settings) -> Result<(), ApiError> {
    if !(0.0..=100.0).contains(&settings.withdrawal_rate) {
        return Err(invalid("--withdrawal-rate must be between 0 and 100"));
    }
    if settings.simulations == 0 {
        return Err(invalid("--simulations must be > 0"));
    }
    if settings.simulations > MAX_SIMULATIONS {
        return Err(invalid(format!(
            "--simulations must be <= {MAX_SIMULATIONS}"
        )));
    }
    if settings.years_to_fire == Some(0) {
        return Err(invalid("--years-to-fire must be >= 1"));
    }
    if settings.years_to_fire.is_some_and(|y| y > MAX_PROJECTION_MONTHS / 12) {
        return Err(invalid(format!(
            "--years-to-fire must be <= {}",
            MAX_PROJECTION_MONTHS / 12
        )));
    }
    if settings.retirement_years > MAX_RETIREMENT_YEARS {
        return Err(invalid(format!(
            "--retirement-years must be <= {MAX_RETIREMENT_YEARS}"
        )));
    }
    if settings.coast_fire_age > MAX_AGE || settings.current_age > MAX_AGE {
        return Err(invalid(format!("ages must be <= {MAX_AGE}")));
    }
    Ok(())
}

pub fn build_profile(settings: &Settings) -> Result<FireProfile, ApiError> {
    check_settings(settings)?;
    Ok(FireProfile {
        current_net_worth: settings.current_net_worth,
        fire_target: settings.fire_target,
        monthly_contribution: settings.monthly_contribution,
        expected_return: settings.expected_return,
        withdrawal_rate: settings.withdrawal_rate,
        monthly_expenses: settings.monthly_expenses,
        current_monthly_income: settings.current_monthly_income,
        current_age: settings.current_age,
        coast_fire_age: settings.coast_fire_age,
    })
}

/// Resolves settings into Monte Carlo parameters. Without an explicit
/// `years_to_fire` the accumulation phase lasts as long as the base scenario
/// needs to reach the target.
pub fn build_parameters(settings: &Settings) -> Result<SimulationParameters, ApiError> {
    let profile = build_profile(settings)?;
    let years = match settings.years_to_fire {
        Some(years) => years,
        None => monte_carlo_horizon(years_to_fire(
            profile.current_net_worth,
            profile.fire_target,
            &profile.assumptions(),
            Scenario::Base,
        )?),
    };

    Ok(SimulationParameters {
        current_net_worth: settings.current_net_worth,
        fire_target: settings.fire_target,
        monthly_contribution: settings.monthly_contribution,
        expected_return: settings.expected_return,
        volatility: settings.volatility,
        years_to_fire: years,
        retirement_years: settings.retirement_years,
        annual_expenses: settings.monthly_expenses * 12.0,
        inflation_rate: settings.inflation_rate,
        num_simulations: settings.simulations,
        seed: settings.seed,
    })
}

fn simulate(settings: &Settings) -> Result<SimulateResponse, ApiError> {
    let parameters = build_parameters(settings)?;
    let result = run_monte_carlo(&parameters)?;
    info!(
        "simulated {} trials: success {:.1}% ({:?})",
        result.num_simulations, result.success_rate, result.interpretation.level
    );
    Ok(SimulateResponse { parameters, result })
}

fn project(settings: &Settings) -> Result<Dashboard, ApiError> {
    let profile = build_profile(settings)?;
    Ok(build_dashboard(&profile, settings.scenario.into())?)
}

pub async fn run(cli: Cli) -> Result<(), ApiError> {
    match cli.command {
        Command::Serve { port } => Ok(run_http_server(port).await?),
        Command::Simulate(settings) => print_json(&simulate(&settings)?),
        Command::Project(settings) => print_json(&project(&settings)?),
    }
}

fn print_json<T: Serialize>(body: &T) -> Result<(), ApiError> {
    println!("{}", serde_json::to_string_pretty(body)?);
    Ok(())
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("FIRE projection API listening on http://{addr}");

    axum::serve(listener, router()).await
}

fn router() -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .route(
            "/api/projection",
            get(projection_get_handler).post(projection_post_handler),
        )
        .fallback(not_found_handler)
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, serde_json::json!({ "status": "ok" }))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_get_handler(Query(payload): Query<SettingsPayload>) -> Response {
    simulate_handler_impl(payload).await
}

async fn simulate_post_handler(Json(payload): Json<SettingsPayload>) -> Response {
    simulate_handler_impl(payload).await
}

async fn projection_get_handler(Query(payload): Query<SettingsPayload>) -> Response {
    projection_handler_impl(payload).await
}

async fn projection_post_handler(Json(payload): Json<SettingsPayload>) -> Response {
    projection_handler_impl(payload).await
}

async fn simulate_handler_impl(payload: SettingsPayload) -> Response {
    let settings = payload.overlay(Settings::default());
    match simulate(&settings) {
        Ok(body) => json_response(StatusCode::OK, body),
        Err(e) => rejected(e),
    }
}

async fn projection_handler_impl(payload: SettingsPayload) -> Response {
    let settings = payload.overlay(Settings::default());
    match project(&settings) {
        Ok(body) => json_response(StatusCode::OK, body),
        Err(e) => rejected(e),
    }
}

fn rejected(err: ApiError) -> Response {
    warn!("rejected request: {err}");
    let status = match err {
        ApiError::InvalidSettings(_) | ApiError::Engine(_) => StatusCode::BAD_REQUEST,
        ApiError::Encode(_) | ApiError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, &err.to_string())
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
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
fn settings_from_json(json: &str) -> Result<Settings, String> {
    let payload = serde_json::from_str::<SettingsPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    Ok(payload.overlay(Settings::default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::InterpretationLevel;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_settings() -> Settings {
        Settings {
            current_net_worth: 100_000.0,
            fire_target: 200_000.0,
            monthly_contribution: 2_000.0,
            simulations: 50,
            seed: Some(7),
            ..Settings::default()
        }
    }

    #[test]
    fn cli_defaults_match_settings_default() {
        let cli = Cli::try_parse_from(["fire-projection", "simulate"]).expect("parses");
        let Command::Simulate(settings) = cli.command else {
            panic!("expected simulate subcommand");
        };
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn cli_parses_flags_and_scenario() {
        let cli = Cli::try_parse_from([
            "fire-projection",
            "project",
            "--current-net-worth",
            "150000",
            "--scenario",
            "pessimistic",
            "--seed",
            "9",
        ])
        .expect("parses");
        let Command::Project(settings) = cli.command else {
            panic!("expected project subcommand");
        };
        assert_approx(settings.current_net_worth, 150_000.0);
        assert_eq!(settings.scenario, CliScenario::Pessimistic);
        assert_eq!(settings.seed, Some(9));
    }

    #[test]
    fn settings_from_json_parses_web_keys() {
        let json = r#"{
          "currentNetWorth": 120000,
          "fireTarget": 900000,
          "monthlyContribution": 1500,
          "expectedReturn": 6.5,
          "withdrawalRate": 3.5,
          "monthlyExpenses": 2500,
          "currentMonthlyIncome": 4200,
          "currentAge": 35,
          "coastFireAge": 60,
          "volatility": 12,
          "yearsToFire": 18,
          "retirementYears": 35,
          "inflationRate": 2,
          "numSimulations": 250,
          "seed": 11,
          "scenario": "optimistic"
        }"#;
        let settings = settings_from_json(json).expect("json should parse");

        assert_approx(settings.current_net_worth, 120_000.0);
        assert_approx(settings.fire_target, 900_000.0);
        assert_approx(settings.monthly_contribution, 1_500.0);
        assert_approx(settings.expected_return, 6.5);
        assert_approx(settings.withdrawal_rate, 3.5);
        assert_approx(settings.monthly_expenses, 2_500.0);
        assert_approx(settings.current_monthly_income, 4_200.0);
        assert_eq!(settings.current_age, 35);
        assert_eq!(settings.coast_fire_age, 60);
        assert_approx(settings.volatility, 12.0);
        assert_eq!(settings.years_to_fire, Some(18));
        assert_eq!(settings.retirement_years, 35);
        assert_approx(settings.inflation_rate, 2.0);
        assert_eq!(settings.simulations, 250);
        assert_eq!(settings.seed, Some(11));
        assert_eq!(settings.scenario, CliScenario::Optimistic);
    }

    #[test]
    fn empty_payload_keeps_defaults() {
        let settings = settings_from_json("{}").expect("json should parse");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn build_parameters_derives_years_from_base_projection() {
        let params = build_parameters(&sample_settings()).expect("valid settings");
        assert_eq!(params.years_to_fire, 3);
        assert_approx(params.annual_expenses, 36_000.0);
        assert_eq!(params.num_simulations, 50);
        assert_eq!(params.seed, Some(7));
    }

    #[test]
    fn build_parameters_caps_unreachable_projection() {
        let mut settings = sample_settings();
        settings.monthly_contribution = 0.0;
        let params = build_parameters(&settings).expect("valid settings");
        assert_eq!(params.years_to_fire, 50);
    }

    #[test]
    fn build_parameters_prefers_explicit_years() {
        let mut settings = sample_settings();
        settings.years_to_fire = Some(12);
        let params = build_parameters(&settings).expect("valid settings");
        assert_eq!(params.years_to_fire, 12);
    }

    #[test]
    fn build_parameters_rejects_out_of_range_settings() {
        let mut settings = sample_settings();
        settings.withdrawal_rate = 120.0;
        let err = build_parameters(&settings).expect_err("must reject");
        assert!(err.to_string().contains("--withdrawal-rate"));

        let mut settings = sample_settings();
        settings.simulations = MAX_SIMULATIONS + 1;
        let err = build_parameters(&settings).expect_err("must reject");
        assert!(err.to_string().contains("--simulations"));

        let mut settings = sample_settings();
        settings.years_to_fire = Some(0);
        let err = build_parameters(&settings).expect_err("must reject");
        assert!(err.to_string().contains("--years-to-fire"));
    }

    #[test]
    fn engine_validation_surfaces_field_name() {
        let mut settings = sample_settings();
        settings.fire_target = 0.0;
        let err = build_parameters(&settings).expect_err("must reject");
        assert!(matches!(err, ApiError::Engine(_)));
        assert!(err.to_string().contains("fire_target"));
    }

    #[test]
    fn simulate_response_serialization_contains_expected_fields() {
        let response = simulate(&sample_settings()).expect("valid settings");
        let json = serde_json::to_string(&response).expect("response should serialize");
        for key in [
            "\"parameters\"",
            "\"yearsToFire\"",
            "\"successRate\"",
            "\"statistics\"",
            "\"percentilePaths\"",
            "\"interpretation\"",
        ] {
            assert!(json.contains(key), "missing {key}");
        }
    }

    #[test]
    fn project_returns_selected_scenario_and_comparison() {
        let mut settings = sample_settings();
        settings.scenario = CliScenario::Pessimistic;
        let dashboard = project(&settings).expect("valid settings");
        assert_eq!(dashboard.selected_scenario, Scenario::Pessimistic);
        assert_eq!(dashboard.projection.months_to_target, Some(46));
        let labels: Vec<&str> = dashboard.scenarios.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["3.8", "3.0", "2.4"]);
    }

    #[tokio::test]
    async fn simulate_handler_returns_ok_for_valid_payload() {
        let payload = SettingsPayload {
            current_net_worth: Some(2_000_000.0),
            monthly_expenses: Some(1_000.0),
            simulations: Some(40),
            seed: Some(3),
            ..SettingsPayload::default()
        };
        let response = simulate_handler_impl(payload).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).map(|v| v.as_bytes()),
            Some(b"no-store".as_slice())
        );
    }

    #[tokio::test]
    async fn simulate_handler_rejects_invalid_payload() {
        let payload = SettingsPayload {
            current_net_worth: Some(-5.0),
            ..SettingsPayload::default()
        };
        let response = simulate_handler_impl(payload).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn projection_handler_returns_ok_for_defaults() {
        let response = projection_handler_impl(SettingsPayload::default()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn wealthy_profile_simulates_as_excellent() {
        let mut settings = sample_settings();
        settings.current_net_worth = 3_000_000.0;
        settings.monthly_expenses = 2_000.0;
        let response = simulate(&settings).expect("valid settings");
        assert_eq!(
            response.result.interpretation.level,
            InterpretationLevel::Excellent
        );
    }
}
