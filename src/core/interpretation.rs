use super::types::{Interpretation, InterpretationLevel};

struct Band {
    min_success_rate: f64,
    interpretation: Interpretation,
}

// Highest band first; the first band whose lower bound is met wins.
const BANDS: [Band; 4] = [
    Band {
        min_success_rate: 90.0,
        interpretation: Interpretation {
            level: InterpretationLevel::Excellent,
            emoji: "🎉",
            message: "Your plan survives almost every simulated market.",
            recommendation: "Stay the course and revisit the plan once a year.",
        },
    },
    Band {
        min_success_rate: 75.0,
        interpretation: Interpretation {
            level: InterpretationLevel::Good,
            emoji: "✅",
            message: "Your plan holds up in most simulated markets.",
            recommendation: "A small extra contribution or a slightly later date would add margin.",
        },
    },
    Band {
        min_success_rate: 60.0,
        interpretation: Interpretation {
            level: InterpretationLevel::Moderate,
            emoji: "⚠️",
            message: "Your plan runs out of money in a meaningful share of simulations.",
            recommendation: "Consider raising contributions, lowering expenses or working a few more years.",
        },
    },
    Band {
        min_success_rate: 40.0,
        interpretation: Interpretation {
            level: InterpretationLevel::Risky,
            emoji: "🔶",
            message: "Your plan fails in a large share of simulated markets.",
            recommendation: "Rework the plan: cut planned expenses or extend the accumulation phase.",
        },
    },
];

const CRITICAL: Interpretation = Interpretation {
    level: InterpretationLevel::Critical,
    emoji: "🚨",
    message: "Your plan fails in most simulated markets.",
    recommendation: "Retirement at this date is unlikely to last; revisit target, savings and timeline.",
};

/// Maps a success rate in percent to its qualitative band.
pub fn classify(success_rate: f64) -> Interpretation {
    BANDS
        .iter()
        .find(|band| success_rate >= band.min_success_rate)
        .map(|band| band.interpretation.clone())
        .unwrap_or(CRITICAL)
}
