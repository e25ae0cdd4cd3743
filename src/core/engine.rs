use log::debug;

use super::error::{EngineError, EngineResult, require_finite, require_non_negative, require_positive};
use super::interpretation::classify;
use super::rng::{BoxMuller, NormalSampler, derive_seed};
use super::types::{
    PathPoint, PercentilePaths, SimulationParameters, SimulationPath, SimulationResult, Statistics,
};

const MIN_YEARLY_RETURN: f64 = -0.95;
const MAX_YEARLY_RETURN: f64 = 2.5;

/// Longest horizon (`years_to_fire + retirement_years`) a run may simulate.
pub const MAX_HORIZON_YEARS: u32 = 200;

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub success_rate: f64,
    pub statistics: Statistics,
    pub percentile_paths: PercentilePaths,
}

pub fn validate_parameters(params: &SimulationParameters) -> EngineResult<()> {
    require_non_negative("current_net_worth", params.current_net_worth)?;
    require_positive("fire_target", params.fire_target)?;
    require_non_negative("monthly_contribution", params.monthly_contribution)?;
    require_finite("expected_return", params.expected_return)?;
    require_non_negative("volatility", params.volatility)?;
    require_non_negative("annual_expenses", params.annual_expenses)?;
    require_finite("inflation_rate", params.inflation_rate)?;

    if params.inflation_rate <= -100.0 {
        return Err(EngineError::invalid("inflation_rate", "must be > -100"));
    }
    if params.years_to_fire == 0 {
        return Err(EngineError::invalid("years_to_fire", "must be >= 1"));
    }
    if params.horizon_years() > u64::from(MAX_HORIZON_YEARS) {
        let field = if params.years_to_fire > MAX_HORIZON_YEARS {
            "years_to_fire"
        } else {
            "retirement_years"
        };
        return Err(EngineError::invalid(
            field,
            format!("years_to_fire + retirement_years must be <= {MAX_HORIZON_YEARS}"),
        ));
    }
    if params.num_simulations == 0 {
        return Err(EngineError::invalid("num_simulations", "must be > 0"));
    }
    Ok(())
}

/// Runs the full Monte Carlo. Each trial gets its own generator derived from
/// `params.seed`, or from a random base seed when none is given.
pub fn run_monte_carlo(params: &SimulationParameters) -> EngineResult<SimulationResult> {
    validate_parameters(params)?;

    let base_seed = params.seed.unwrap_or_else(rand::random);
    let paths = (0..params.num_simulations)
        .map(|trial| {
            let mut sampler = BoxMuller::seeded(derive_seed(base_seed, trial));
            simulate_one_path(params, &mut sampler)
        })
        .collect::<Vec<_>>();

    finish(params, &paths)
}

/// Runs every trial off one injected sampler.
pub fn run_monte_carlo_with<S: NormalSampler>(
    params: &SimulationParameters,
    mut sampler: S,
) -> EngineResult<SimulationResult> {
    validate_parameters(params)?;

    let paths = (0..params.num_simulations)
        .map(|_| simulate_one_path(params, &mut sampler))
        .collect::<Vec<_>>();

    finish(params, &paths)
}

fn finish(params: &SimulationParameters, paths: &[SimulationPath]) -> EngineResult<SimulationResult> {
    let aggregate = aggregate(paths)?;
    debug!(
        "monte carlo: {} trials over {} years, success {:.1}%, median terminal {:.0}",
        params.num_simulations,
        params.horizon_years(),
        aggregate.success_rate,
        aggregate.statistics.percentile50
    );

    Ok(SimulationResult {
        num_simulations: params.num_simulations,
        success_rate: aggregate.success_rate,
        statistics: aggregate.statistics,
        interpretation: classify(aggregate.success_rate),
        percentile_paths: aggregate.percentile_paths,
    })
}

/// Simulates one trial: `years_to_fire` accumulation years followed by
/// `retirement_years` of inflation-adjusted withdrawals.
///
/// A balance that goes negative in retirement marks the trial depleted and is
/// held at zero for the remaining years.
pub fn simulate_one_path<S: NormalSampler>(
    params: &SimulationParameters,
    sampler: &mut S,
) -> SimulationPath {
    let mean = params.expected_return / 100.0;
    let stddev = params.volatility / 100.0;
    let annual_contribution = params.monthly_contribution * 12.0;
    let inflation = params.inflation_rate / 100.0;

    let mut points = Vec::with_capacity(params.horizon_years() as usize + 1);
    let mut balance = params.current_net_worth;
    points.push(PathPoint {
        year: 0,
        value: balance,
    });

    for year in 1..=params.years_to_fire {
        let r = sample_return(mean, stddev, sampler);
        balance = balance * (1.0 + r) + annual_contribution;
        points.push(PathPoint {
            year,
            value: balance,
        });
    }

    let mut expenses = params.annual_expenses;
    let mut depleted_year = None;
    for offset in 1..=params.retirement_years {
        let year = params.years_to_fire + offset;
        if depleted_year.is_none() {
            let r = sample_return(mean, stddev, sampler);
            balance = balance * (1.0 + r) - expenses;
            expenses *= 1.0 + inflation;
            if balance < 0.0 {
                depleted_year = Some(year);
                balance = 0.0;
            }
        }
        points.push(PathPoint {
            year,
            value: balance,
        });
    }

    SimulationPath {
        points,
        depleted_year,
    }
}

fn sample_return<S: NormalSampler>(mean: f64, stddev: f64, sampler: &mut S) -> f64 {
    let z = sampler.next_standard_normal();
    (mean + stddev * z).clamp(MIN_YEARLY_RETURN, MAX_YEARLY_RETURN)
}

/// Success rate, terminal statistics and per-year percentile paths across
/// trials.
pub fn aggregate(paths: &[SimulationPath]) -> EngineResult<Aggregate> {
    let first = paths.first().ok_or(EngineError::NoTrials)?;
    let len = first.points.len();
    if let Some(bad) = paths.iter().find(|p| p.points.len() != len) {
        return Err(EngineError::MismatchedPathLengths {
            expected: len,
            actual: bad.points.len(),
        });
    }

    let n = paths.len() as f64;
    let successes = paths.iter().filter(|p| !p.is_depleted()).count();

    let mut terminal: Vec<f64> = paths.iter().map(SimulationPath::terminal_value).collect();
    let mean = terminal.iter().sum::<f64>() / n;
    let statistics = Statistics {
        percentile10: percentile(&mut terminal, 10.0),
        percentile50: percentile(&mut terminal, 50.0),
        percentile90: percentile(&mut terminal, 90.0),
        mean,
    };

    let mut p10 = Vec::with_capacity(len);
    let mut p50 = Vec::with_capacity(len);
    let mut p90 = Vec::with_capacity(len);
    let mut column = Vec::with_capacity(paths.len());
    for idx in 0..len {
        column.clear();
        column.extend(paths.iter().map(|p| p.points[idx].value));
        let year = first.points[idx].year;
        p10.push(PathPoint {
            year,
            value: percentile(&mut column, 10.0),
        });
        p50.push(PathPoint {
            year,
            value: percentile(&mut column, 50.0),
        });
        p90.push(PathPoint {
            year,
            value: percentile(&mut column, 90.0),
        });
    }

    Ok(Aggregate {
        success_rate: successes as f64 / n * 100.0,
        statistics,
        percentile_paths: PercentilePaths { p10, p50, p90 },
    })
}

/// Nearest-rank percentile; sorts `values` in place.
fn percentile(values: &mut [f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    values.sort_by(|a, b| a.total_cmp(b));

    let n = values.len();
    let rank = ((p / 100.0) * n as f64).ceil() as usize;
    values[rank.clamp(1, n) - 1]
}
