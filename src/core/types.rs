use serde::{Deserialize, Serialize};

/// Inputs for one Monte Carlo run. Rates are annual percentages (7.0 = 7%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationParameters {
    pub current_net_worth: f64,
    pub fire_target: f64,
    pub monthly_contribution: f64,
    pub expected_return: f64,
    pub volatility: f64,
    pub years_to_fire: u32,
    pub retirement_years: u32,
    pub annual_expenses: f64,
    pub inflation_rate: f64,
    pub num_simulations: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl SimulationParameters {
    /// Total simulated years. Widened so the sum cannot overflow.
    pub fn horizon_years(&self) -> u64 {
        u64::from(self.years_to_fire) + u64::from(self.retirement_years)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PathPoint {
    pub year: u32,
    pub value: f64,
}

/// Yearly net-worth trajectory. Year 0 holds the starting value.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationPath {
    pub points: Vec<PathPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depleted_year: Option<u32>,
}

impl SimulationPath {
    pub fn terminal_value(&self) -> f64 {
        self.points.last().map(|p| p.value).unwrap_or(0.0)
    }

    pub fn is_depleted(&self) -> bool {
        self.depleted_year.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub percentile10: f64,
    pub percentile50: f64,
    pub percentile90: f64,
    pub mean: f64,
}

/// Per-year cross-sectional percentiles, one point per simulated year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PercentilePaths {
    pub p10: Vec<PathPoint>,
    pub p50: Vec<PathPoint>,
    pub p90: Vec<PathPoint>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpretationLevel {
    Critical,
    Risky,
    Moderate,
    Good,
    Excellent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Interpretation {
    pub level: InterpretationLevel,
    pub emoji: &'static str,
    pub message: &'static str,
    pub recommendation: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub num_simulations: u32,
    pub success_rate: f64,
    pub statistics: Statistics,
    pub percentile_paths: PercentilePaths,
    pub interpretation: Interpretation,
}

/// Deterministic projection. `months_to_target == None` means the target is
/// not reached within the month cap.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    pub months_to_target: Option<u32>,
    pub yearly_series: Vec<PathPoint>,
}

impl Projection {
    pub fn years_to_target(&self) -> Option<f64> {
        self.months_to_target.map(|m| m as f64 / 12.0)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    Base,
    Optimistic,
    Pessimistic,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScenarioAdjustment {
    pub contribution_factor: f64,
    pub return_delta_points: f64,
}

/// Base assumptions shared by all scenarios. `expected_return` is an annual
/// percentage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScenarioAssumptions {
    pub monthly_contribution: f64,
    pub expected_return: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioInputs {
    pub monthly_contribution: f64,
    pub monthly_return_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioOutcome {
    pub scenario: Scenario,
    pub inputs: ScenarioInputs,
    pub years: Option<f64>,
    pub chart_years: f64,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoastFire {
    pub amount: f64,
    pub progress_pct: f64,
    pub reached: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FireMetrics {
    pub progress_pct: f64,
    pub remaining: f64,
    pub fi_ratio: f64,
    pub annual_withdrawal_income: f64,
    pub monthly_withdrawal_income: f64,
    pub savings_rate_pct: f64,
}

/// Dashboard settings for one user. Rates are annual percentages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FireProfile {
    pub current_net_worth: f64,
    pub fire_target: f64,
    pub monthly_contribution: f64,
    pub expected_return: f64,
    pub withdrawal_rate: f64,
    pub monthly_expenses: f64,
    pub current_monthly_income: f64,
    pub current_age: u32,
    pub coast_fire_age: u32,
}

impl FireProfile {
    pub fn assumptions(&self) -> ScenarioAssumptions {
        ScenarioAssumptions {
            monthly_contribution: self.monthly_contribution,
            expected_return: self.expected_return,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub metrics: FireMetrics,
    pub coast_fire: CoastFire,
    pub scenarios: Vec<ScenarioOutcome>,
    pub selected_scenario: Scenario,
    pub projection: Projection,
    pub monte_carlo_years_to_fire: u32,
}
