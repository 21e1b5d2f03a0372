use statrs::function::erf::erf;

use crate::pick::Direction;

/// Standard normal CDF, `0.5 * (1 + erf(x / sqrt(2)))`.
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
}

/// Probability the outcome lands on the chosen side of `line`, treating the
/// result as Normal(projection, sigma).
pub fn win_probability(line: f64, projection: f64, sigma: f64, direction: Direction) -> f64 {
    let z = (line - projection) / sigma;
    match direction {
        Direction::Over => 1.0 - normal_cdf(z),
        Direction::Under => normal_cdf(z),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn cdf_reference_points() {
        assert_relative_eq!(normal_cdf(0.0), 0.5, epsilon = 1e-12);
        assert_relative_eq!(normal_cdf(1.96), 0.975, epsilon = 1e-3);
        assert_relative_eq!(normal_cdf(-1.0) + normal_cdf(1.0), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn over_and_under_are_complements() {
        let over = win_probability(50.5, 56.0, 12.0, Direction::Over);
        let under = win_probability(50.5, 56.0, 12.0, Direction::Under);
        assert_relative_eq!(over + under, 1.0, epsilon = 1e-12);
        assert!(over > 0.5);
    }

    #[test]
    fn over_decreases_and_under_increases_with_line() {
        let mut prev_over = f64::INFINITY;
        let mut prev_under = f64::NEG_INFINITY;
        for step in 0..40 {
            let line = 40.0 + step as f64 * 1.5;
            let over = win_probability(line, 60.0, 15.0, Direction::Over);
            let under = win_probability(line, 60.0, 15.0, Direction::Under);
            assert!(over < prev_over);
            assert!(under > prev_under);
            assert!(over > 0.0 && over < 1.0);
            prev_over = over;
            prev_under = under;
        }
    }

    #[test]
    fn passing_yards_scenario() {
        let sigma = 275.5 * 0.22 * 0.9;
        let p = win_probability(275.5, 300.0, sigma, Direction::Over);
        assert_relative_eq!(p, 0.673, epsilon = 2e-3);
    }
}
