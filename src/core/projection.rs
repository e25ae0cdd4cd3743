use super::error::{EngineError, EngineResult, require_finite, require_non_negative, require_positive};
use super::types::{
    CoastFire, Dashboard, FireMetrics, FireProfile, PathPoint, Projection, Scenario,
    ScenarioAdjustment, ScenarioAssumptions, ScenarioInputs, ScenarioOutcome,
};

/// Month cap for the deterministic projector (50 years).
pub const MAX_PROJECTION_MONTHS: u32 = 600;
/// Longest yearly series produced for charting.
pub const MAX_CHART_YEARS: u32 = 40;
/// Oldest age accepted for the current or coast FIRE age.
pub const MAX_AGE: u32 = 120;

const UNREACHED_LABEL: &str = "50+";

impl Scenario {
    /// Display order: worst case first.
    pub const ALL: [Scenario; 3] = [Scenario::Pessimistic, Scenario::Base, Scenario::Optimistic];

    pub fn adjustment(self) -> ScenarioAdjustment {
        match self {
            Scenario::Base => ScenarioAdjustment {
                contribution_factor: 1.0,
                return_delta_points: 0.0,
            },
            Scenario::Optimistic => ScenarioAdjustment {
                contribution_factor: 1.2,
                return_delta_points: 2.0,
            },
            Scenario::Pessimistic => ScenarioAdjustment {
                contribution_factor: 0.8,
                return_delta_points: -2.0,
            },
        }
    }

    pub fn apply(self, assumptions: &ScenarioAssumptions) -> ScenarioInputs {
        let adj = self.adjustment();
        ScenarioInputs {
            monthly_contribution: assumptions.monthly_contribution * adj.contribution_factor,
            monthly_return_rate: (assumptions.expected_return + adj.return_delta_points)
                / 100.0
                / 12.0,
        }
    }
}

/// Month-by-month compounding until `fire_target` is reached or `max_months`
/// elapse.
pub fn project_deterministic(
    current_net_worth: f64,
    fire_target: f64,
    monthly_contribution: f64,
    monthly_return_rate: f64,
    max_months: u32,
) -> EngineResult<Projection> {
    require_non_negative("current_net_worth", current_net_worth)?;
    require_positive("fire_target", fire_target)?;
    require_finite("monthly_contribution", monthly_contribution)?;
    require_finite("monthly_return_rate", monthly_return_rate)?;
    if monthly_return_rate <= -1.0 {
        return Err(EngineError::invalid(
            "monthly_return_rate",
            format!("must be > -1, got {monthly_return_rate}"),
        ));
    }

    let months_to_target = months_to_target(
        current_net_worth,
        fire_target,
        monthly_contribution,
        monthly_return_rate,
        max_months,
    );
    let series_years = match months_to_target {
        Some(months) => months.div_ceil(12).min(MAX_CHART_YEARS),
        None => MAX_CHART_YEARS,
    };

    Ok(Projection {
        months_to_target,
        yearly_series: yearly_series(
            current_net_worth,
            monthly_contribution,
            monthly_return_rate,
            series_years,
        ),
    })
}

fn months_to_target(
    current_net_worth: f64,
    fire_target: f64,
    monthly_contribution: f64,
    monthly_return_rate: f64,
    max_months: u32,
) -> Option<u32> {
    if current_net_worth >= fire_target {
        return Some(0);
    }
    if monthly_contribution <= 0.0 {
        return None;
    }

    let mut balance = current_net_worth;
    let mut months = 0;
    while balance < fire_target && months < max_months {
        balance = balance * (1.0 + monthly_return_rate) + monthly_contribution;
        months += 1;
    }

    (balance >= fire_target).then_some(months)
}

fn yearly_series(
    current_net_worth: f64,
    monthly_contribution: f64,
    monthly_return_rate: f64,
    years: u32,
) -> Vec<PathPoint> {
    let mut series = Vec::with_capacity(years as usize + 1);
    let mut balance = current_net_worth;
    for year in 0..=years {
        series.push(PathPoint {
            year,
            value: balance,
        });
        for _ in 0..12 {
            balance = balance * (1.0 + monthly_return_rate) + monthly_contribution;
        }
    }
    series
}

pub fn project_scenario(
    current_net_worth: f64,
    fire_target: f64,
    assumptions: &ScenarioAssumptions,
    scenario: Scenario,
) -> EngineResult<Projection> {
    let inputs = scenario.apply(assumptions);
    project_deterministic(
        current_net_worth,
        fire_target,
        inputs.monthly_contribution,
        inputs.monthly_return_rate,
        MAX_PROJECTION_MONTHS,
    )
}

pub fn years_to_fire(
    current_net_worth: f64,
    fire_target: f64,
    assumptions: &ScenarioAssumptions,
    scenario: Scenario,
) -> EngineResult<Option<f64>> {
    project_scenario(current_net_worth, fire_target, assumptions, scenario)
        .map(|p| p.years_to_target())
}

pub fn compare_scenarios(
    current_net_worth: f64,
    fire_target: f64,
    assumptions: &ScenarioAssumptions,
) -> EngineResult<Vec<ScenarioOutcome>> {
    Scenario::ALL
        .iter()
        .map(|&scenario| {
            let years = years_to_fire(current_net_worth, fire_target, assumptions, scenario)?;
            Ok(ScenarioOutcome {
                scenario,
                inputs: scenario.apply(assumptions),
                years,
                chart_years: years.unwrap_or(unreached_years()),
                label: years_label(years),
            })
        })
        .collect()
}

pub fn years_label(years: Option<f64>) -> String {
    match years {
        Some(y) => format!("{y:.1}"),
        None => UNREACHED_LABEL.to_string(),
    }
}

/// Accumulation length handed to the Monte Carlo simulator for a projected
/// time to target.
pub fn monte_carlo_horizon(years: Option<f64>) -> u32 {
    match years {
        Some(y) => (y.ceil() as u32).max(1),
        None => MAX_PROJECTION_MONTHS / 12,
    }
}

fn unreached_years() -> f64 {
    MAX_PROJECTION_MONTHS as f64 / 12.0
}

/// Net worth needed today so that growth alone reaches the target by the
/// coast age.
pub fn coast_fire(profile: &FireProfile) -> EngineResult<CoastFire> {
    require_positive("fire_target", profile.fire_target)?;
    require_non_negative("current_net_worth", profile.current_net_worth)?;
    require_finite("expected_return", profile.expected_return)?;

    let monthly_return = profile.expected_return / 100.0 / 12.0;
    if monthly_return <= -1.0 {
        return Err(EngineError::invalid(
            "expected_return",
            "monthly return must be above -100%",
        ));
    }

    for (field, age) in [
        ("current_age", profile.current_age),
        ("coast_fire_age", profile.coast_fire_age),
    ] {
        if age > MAX_AGE {
            return Err(EngineError::invalid(
                field,
                format!("must be <= {MAX_AGE}, got {age}"),
            ));
        }
    }

    let months = f64::from(profile.coast_fire_age.saturating_sub(profile.current_age)) * 12.0;
    let amount = profile.fire_target / (1.0 + monthly_return).powf(months);

    Ok(CoastFire {
        amount,
        progress_pct: profile.current_net_worth / amount * 100.0,
        reached: profile.current_net_worth >= amount,
    })
}

pub fn fire_metrics(profile: &FireProfile) -> EngineResult<FireMetrics> {
    require_positive("fire_target", profile.fire_target)?;
    require_non_negative("current_net_worth", profile.current_net_worth)?;
    require_non_negative("withdrawal_rate", profile.withdrawal_rate)?;
    require_non_negative("monthly_expenses", profile.monthly_expenses)?;
    require_non_negative("current_monthly_income", profile.current_monthly_income)?;
    require_finite("monthly_contribution", profile.monthly_contribution)?;

    let annual_expenses = profile.monthly_expenses * 12.0;
    let annual_withdrawal_income = profile.current_net_worth * profile.withdrawal_rate / 100.0;

    Ok(FireMetrics {
        progress_pct: profile.current_net_worth / profile.fire_target * 100.0,
        remaining: (profile.fire_target - profile.current_net_worth).max(0.0),
        fi_ratio: if annual_expenses > 0.0 {
            profile.current_net_worth / annual_expenses
        } else {
            0.0
        },
        annual_withdrawal_income,
        monthly_withdrawal_income: annual_withdrawal_income / 12.0,
        savings_rate_pct: if profile.current_monthly_income > 0.0 {
            profile.monthly_contribution / profile.current_monthly_income * 100.0
        } else {
            0.0
        },
    })
}

pub fn build_dashboard(profile: &FireProfile, selected: Scenario) -> EngineResult<Dashboard> {
    let assumptions = profile.assumptions();
    let projection = project_scenario(
        profile.current_net_worth,
        profile.fire_target,
        &assumptions,
        selected,
    )?;
    let scenarios = compare_scenarios(profile.current_net_worth, profile.fire_target, &assumptions)?;
    let base_years = scenarios
        .iter()
        .find(|s| s.scenario == Scenario::Base)
        .and_then(|s| s.years);

    Ok(Dashboard {
        metrics: fire_metrics(profile)?,
        coast_fire: coast_fire(profile)?,
        scenarios,
        selected_scenario: selected,
        monte_carlo_years_to_fire: monte_carlo_horizon(base_years),
        projection,
    })
}
