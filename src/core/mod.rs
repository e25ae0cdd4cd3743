mod engine;
mod error;
mod interpretation;
mod projection;
mod rng;
mod types;

pub use engine::{
    Aggregate, MAX_HORIZON_YEARS, aggregate, run_monte_carlo, run_monte_carlo_with, simulate_one_path,
    validate_parameters,
};
pub use error::{EngineError, EngineResult};
pub use interpretation::classify;
pub use projection::{
    MAX_AGE, MAX_CHART_YEARS, MAX_PROJECTION_MONTHS, build_dashboard, coast_fire, compare_scenarios,
    fire_metrics, monte_carlo_horizon, project_deterministic, project_scenario, years_label,
    years_to_fire,
};
pub use rng::{BoxMuller, FixedSequence, NormalSampler};
pub use types::{
    CoastFire, Dashboard, FireMetrics, FireProfile, Interpretation, InterpretationLevel,
    PathPoint, PercentilePaths, Projection, Scenario, ScenarioAdjustment, ScenarioAssumptions,
    ScenarioInputs, ScenarioOutcome, SimulationParameters, SimulationPath, SimulationResult,
    Statistics,
};
