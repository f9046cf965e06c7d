// Advice rule engine - deterministic ordered feedback
//
// A small data-driven decision table, not nested conditionals: each rule is
// an independent function producing at most one line, evaluated in a fixed
// order. Identical (metrics, protocol) input always yields an identical
// ordered list. An empty list is valid output.

use once_cell::sync::Lazy;

use crate::config::JumpProtocol;
use crate::metrics::JumpMetrics;

/// Knee flexion below this is a shallow countermovement
const SHALLOW_FLEXION_DEG: f64 = 60.0;
/// Knee flexion above this is an overly deep countermovement
const DEEP_FLEXION_DEG: f64 = 110.0;
/// RSI below this indicates low reactive strength
const LOW_RSI: f64 = 1.5;
/// RSI above this is an excellent reactive strength level
const EXCELLENT_RSI: f64 = 2.5;
/// Absolute asymmetry above this percentage is an injury-risk flag
const ASYMMETRY_LIMIT_PERCENT: f64 = 10.0;

/// One advice rule: reads the metrics, emits at most one line
type Rule = fn(&JumpMetrics, JumpProtocol) -> Option<String>;

/// Ordered rule table; evaluation order is the output order
static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        knee_flexion_rule,
        reactive_strength_rule,
        asymmetry_rule,
        protocol_technique_rule,
    ]
});

/// Evaluate the rule table in order and collect the fired lines
pub fn generate(metrics: &JumpMetrics, protocol: JumpProtocol) -> Vec<String> {
    RULES
        .iter()
        .filter_map(|rule| rule(metrics, protocol))
        .collect()
}

/// Exactly one of three lines fires: shallow, overly deep, or good ROM.
fn knee_flexion_rule(metrics: &JumpMetrics, _protocol: JumpProtocol) -> Option<String> {
    let flexion = metrics.max_knee_flexion_deg;
    let line = if flexion < SHALLOW_FLEXION_DEG {
        "Insufficient knee flexion (<60 deg): the countermovement is too shallow to store \
         elastic energy. Practice full-range squats to deepen the eccentric phase."
    } else if flexion > DEEP_FLEXION_DEG {
        "Countermovement too deep (>110 deg): an overly deep squat lengthens the transition \
         and reduces stretch-shortening cycle efficiency. Shorten the dip for a faster rebound."
    } else {
        "Good knee range of motion: your countermovement depth is well suited for force transfer."
    };
    Some(line.to_string())
}

/// Drop-jump reactive strength feedback; silent in the [1.5, 2.5] band.
fn reactive_strength_rule(metrics: &JumpMetrics, protocol: JumpProtocol) -> Option<String> {
    if protocol != JumpProtocol::Dj {
        return None;
    }
    let rsi = metrics.rsi?;
    if rsi < LOW_RSI {
        Some(
            "Low RSI: reactive strength is lacking. Start with low-intensity plyometrics \
             (ankle hops) and focus on shortening ground contact time."
                .to_string(),
        )
    } else if rsi > EXCELLENT_RSI {
        Some(
            "Excellent RSI: outstanding reactive strength. Progress to higher drop heights \
             or single-leg plyometric work."
                .to_string(),
        )
    } else {
        None
    }
}

/// High-risk warning naming the dominant side when imbalance exceeds 10%.
fn asymmetry_rule(metrics: &JumpMetrics, _protocol: JumpProtocol) -> Option<String> {
    let asymmetry = metrics.asymmetry_percent?;
    if asymmetry.abs() <= ASYMMETRY_LIMIT_PERCENT {
        return None;
    }
    let side = if asymmetry > 0.0 { "right" } else { "left" };
    Some(format!(
        "High-risk warning: marked {} side dominance detected (asymmetry > 10%). Pause \
         high-intensity bilateral jumping and prioritize unilateral strength work to \
         rebalance the limbs and reduce injury risk.",
        side
    ))
}

/// CMJ sessions always get the hip-hinge technique tip, independent of the
/// other rules.
fn protocol_technique_rule(_metrics: &JumpMetrics, protocol: JumpProtocol) -> Option<String> {
    if protocol != JumpProtocol::Cmj {
        return None;
    }
    Some(
        "CMJ tip: to gain height, focus on an explosive hip hinge rather than relying on \
         the quadriceps alone."
            .to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics_with_flexion(flexion: f64) -> JumpMetrics {
        JumpMetrics {
            jump_height_cm: 30.0,
            flight_time_ms: 450.0,
            contact_time_ms: None,
            rsi: None,
            max_knee_flexion_deg: flexion,
            asymmetry_percent: None,
            peak_power_watts: None,
        }
    }

    #[test]
    fn test_shallow_flexion_tip() {
        let advice = generate(&metrics_with_flexion(45.0), JumpProtocol::Sj);
        assert_eq!(advice.len(), 1);
        assert!(advice[0].contains("Insufficient knee flexion"));
    }

    #[test]
    fn test_good_rom_tip() {
        let advice = generate(&metrics_with_flexion(90.0), JumpProtocol::Sj);
        assert_eq!(advice.len(), 1);
        assert!(advice[0].contains("Good knee range of motion"));
    }

    #[test]
    fn test_deep_flexion_tip() {
        let advice = generate(&metrics_with_flexion(130.0), JumpProtocol::Sj);
        assert_eq!(advice.len(), 1);
        assert!(advice[0].contains("too deep"));
    }

    #[test]
    fn test_exactly_one_flexion_line_fires() {
        for flexion in [0.0, 59.9, 60.0, 85.0, 110.0, 110.1, 179.0] {
            let advice = generate(&metrics_with_flexion(flexion), JumpProtocol::Sj);
            assert_eq!(advice.len(), 1, "flexion {} fired {} lines", flexion, advice.len());
        }
    }

    #[test]
    fn test_cmj_always_includes_hip_hinge_tip() {
        for flexion in [45.0, 90.0, 130.0] {
            let advice = generate(&metrics_with_flexion(flexion), JumpProtocol::Cmj);
            assert!(advice.iter().any(|a| a.contains("hip hinge")));
            assert_eq!(advice.len(), 2);
        }
    }

    #[test]
    fn test_dj_rsi_bands() {
        let mut metrics = metrics_with_flexion(90.0);

        metrics.rsi = Some(1.0);
        let advice = generate(&metrics, JumpProtocol::Dj);
        assert!(advice.iter().any(|a| a.contains("Low RSI")));

        metrics.rsi = Some(3.0);
        let advice = generate(&metrics, JumpProtocol::Dj);
        assert!(advice.iter().any(|a| a.contains("Excellent RSI")));

        // Neutral band produces no RSI line
        metrics.rsi = Some(2.0);
        let advice = generate(&metrics, JumpProtocol::Dj);
        assert!(!advice.iter().any(|a| a.contains("RSI")));
    }

    #[test]
    fn test_rsi_rule_ignored_outside_dj() {
        let mut metrics = metrics_with_flexion(90.0);
        metrics.rsi = Some(1.0);
        let advice = generate(&metrics, JumpProtocol::Sj);
        assert!(!advice.iter().any(|a| a.contains("RSI")));
    }

    #[test]
    fn test_asymmetry_warning_names_dominant_side() {
        let mut metrics = metrics_with_flexion(90.0);

        metrics.asymmetry_percent = Some(15.0);
        let advice = generate(&metrics, JumpProtocol::Sj);
        assert!(advice.iter().any(|a| a.contains("right side dominance")));

        metrics.asymmetry_percent = Some(-15.0);
        let advice = generate(&metrics, JumpProtocol::Sj);
        assert!(advice.iter().any(|a| a.contains("left side dominance")));

        metrics.asymmetry_percent = Some(8.0);
        let advice = generate(&metrics, JumpProtocol::Sj);
        assert!(!advice.iter().any(|a| a.contains("dominance")));
    }

    #[test]
    fn test_deterministic_ordering() {
        let mut metrics = metrics_with_flexion(45.0);
        metrics.rsi = Some(1.0);
        metrics.asymmetry_percent = Some(20.0);

        let first = generate(&metrics, JumpProtocol::Dj);
        let second = generate(&metrics, JumpProtocol::Dj);
        assert_eq!(first, second);

        // Fixed category order: flexion, RSI, asymmetry
        assert!(first[0].contains("knee flexion"));
        assert!(first[1].contains("RSI"));
        assert!(first[2].contains("dominance"));
    }
}
