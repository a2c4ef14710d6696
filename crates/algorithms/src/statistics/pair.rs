//! Bivariate analysis of two indicator columns
//!
//! Pearson r over pairwise-complete rows (the same rule as the correlation
//! matrix), a two-tailed p-value from Student's t with n − 2 degrees of
//! freedom, a verbal reading of the coefficient and the OLS trend line.

use super::correlation::{complete_pairs, pearson};
use serde::Serialize;

/// Significance level for [`PairAnalysis::significant`]
pub const ALPHA: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Strength {
    Strong,
    Moderate,
    Weak,
}

impl Strength {
    /// |r| ≥ 0.7 strong, ≥ 0.3 moderate, otherwise weak
    pub fn from_r(r: f64) -> Self {
        let a = r.abs();
        if a >= 0.7 {
            Strength::Strong
        } else if a >= 0.3 {
            Strength::Moderate
        } else {
            Strength::Weak
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Positive,
    Negative,
}

/// Least-squares line `y = slope * x + intercept`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendLine {
    pub slope: f64,
    pub intercept: f64,
}

/// Result of analysing one (x, y) column pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairAnalysis {
    pub x: String,
    pub y: String,
    /// Complete pairs used
    pub n: usize,
    pub r: f64,
    pub p_value: f64,
    pub strength: Strength,
    pub direction: Direction,
    pub significant: bool,
    pub trend: Option<TrendLine>,
}

/// Analyse a column pair; `None` when r is undefined
pub fn analyze_pair(
    x_label: &str,
    x: &[Option<f64>],
    y_label: &str,
    y: &[Option<f64>],
) -> Option<PairAnalysis> {
    let pairs = complete_pairs(x, y);
    let r = pearson(&pairs)?;
    let n = pairs.len();
    let p_value = pearson_p_value(r, n);
    Some(PairAnalysis {
        x: x_label.to_string(),
        y: y_label.to_string(),
        n,
        r,
        p_value,
        strength: Strength::from_r(r),
        direction: if r >= 0.0 { Direction::Positive } else { Direction::Negative },
        significant: p_value < ALPHA,
        trend: ols(&pairs),
    })
}

/// Ordinary least squares fit of y on x
pub fn ols(pairs: &[(f64, f64)]) -> Option<TrendLine> {
    let n = pairs.len() as f64;
    if pairs.len() < 2 {
        return None;
    }
    let sum_x: f64 = pairs.iter().map(|p| p.0).sum();
    let sum_y: f64 = pairs.iter().map(|p| p.1).sum();
    let sum_xx: f64 = pairs.iter().map(|p| p.0 * p.0).sum();
    let sum_xy: f64 = pairs.iter().map(|p| p.0 * p.1).sum();

    let denom = n * sum_xx - sum_x * sum_x;
    if denom.abs() < 1e-12 {
        return None;
    }
    let slope = (n * sum_xy - sum_x * sum_y) / denom;
    let intercept = (sum_y - slope * sum_x) / n;
    Some(TrendLine { slope, intercept })
}

/// Two-tailed p-value of r under H0: ρ = 0.
///
/// t = r √((n − 2) / (1 − r²)), p = I_{df/(df+t²)}(df/2, 1/2).
/// With n ≤ 2 there are no degrees of freedom and p is 1.
pub fn pearson_p_value(r: f64, n: usize) -> f64 {
    if n <= 2 {
        return 1.0;
    }
    let df = (n - 2) as f64;
    let r2 = r * r;
    if r2 >= 1.0 {
        return 0.0;
    }
    let t2 = r2 * df / (1.0 - r2);
    regularized_incomplete_beta(df / 2.0, 0.5, df / (df + t2)).clamp(0.0, 1.0)
}

/// Regularized incomplete beta I_x(a, b) (Numerical Recipes §6.4)
fn regularized_incomplete_beta(a: f64, b: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }
    let ln_front = ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    let front = ln_front.exp();
    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_continued_fraction(a, b, x) / a
    } else {
        1.0 - front * beta_continued_fraction(b, a, 1.0 - x) / b
    }
}

/// Lentz evaluation of the incomplete beta continued fraction
fn beta_continued_fraction(a: f64, b: f64, x: f64) -> f64 {
    const MAX_ITER: usize = 300;
    const EPS: f64 = 1e-15;
    const TINY: f64 = 1e-300;

    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;
    let mut c = 1.0;
    let mut d = 1.0 - qab * x / qap;
    if d.abs() < TINY {
        d = TINY;
    }
    d = 1.0 / d;
    let mut h = d;

    for m in 1..=MAX_ITER {
        let m = m as f64;
        let m2 = 2.0 * m;

        let aa = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 + aa * d;
        if d.abs() < TINY {
            d = TINY;
        }
        c = 1.0 + aa / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        h *= d * c;

        let aa = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 + aa * d;
        if d.abs() < TINY {
            d = TINY;
        }
        c = 1.0 + aa / c;
        if c.abs() < TINY {
            c = TINY;
        }
        d = 1.0 / d;
        let del = d * c;
        h *= del;
        if (del - 1.0).abs() < EPS {
            break;
        }
    }
    h
}

/// Lanczos approximation of ln Γ(x), x > 0 (g = 7, n = 9)
fn ln_gamma(x: f64) -> f64 {
    const COEF: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];
    if x < 0.5 {
        // reflection
        let pi = std::f64::consts::PI;
        return (pi / (pi * x).sin()).ln() - ln_gamma(1.0 - x);
    }
    let x = x - 1.0;
    let mut acc = COEF[0];
    for (i, &c) in COEF.iter().enumerate().skip(1) {
        acc += c / (x + i as f64);
    }
    let t = x + 7.5;
    0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + acc.ln()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ln_gamma() {
        assert_relative_eq!(ln_gamma(1.0), 0.0, epsilon = 1e-12);
        assert_relative_eq!(ln_gamma(5.0), 24.0_f64.ln(), epsilon = 1e-12);
        assert_relative_eq!(ln_gamma(0.5), std::f64::consts::PI.sqrt().ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_p_value_reference() {
        // r = 0.5, n = 10: t = 1.63299, df = 8, two-tailed p = 0.14111
        assert_relative_eq!(pearson_p_value(0.5, 10), 0.141_1, epsilon = 1e-3);
        // df = 1 reduces to a Cauchy tail: p = 1 - 2/π · atan(t)
        let r: f64 = 0.6;
        let t = r / (1.0 - r * r).sqrt();
        let expected = 1.0 - 2.0 / std::f64::consts::PI * t.atan();
        assert_relative_eq!(pearson_p_value(r, 3), expected, epsilon = 1e-10);
    }

    #[test]
    fn test_p_value_limits() {
        assert_eq!(pearson_p_value(1.0, 10), 0.0);
        assert_eq!(pearson_p_value(0.9, 2), 1.0);
        assert_relative_eq!(pearson_p_value(0.0, 30), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_strength_bands() {
        assert_eq!(Strength::from_r(-0.75), Strength::Strong);
        assert_eq!(Strength::from_r(0.3), Strength::Moderate);
        assert_eq!(Strength::from_r(0.29), Strength::Weak);
    }

    #[test]
    fn test_analyze_pair() {
        let x = [Some(1.0), Some(2.0), Some(3.0), Some(4.0), None, Some(5.0)];
        let y = [Some(2.1), Some(3.9), Some(6.2), Some(7.8), Some(100.0), None];
        let a = analyze_pair("x", &x, "y", &y).unwrap();
        assert_eq!(a.n, 4);
        assert!(a.r > 0.99);
        assert_eq!(a.strength, Strength::Strong);
        assert_eq!(a.direction, Direction::Positive);
        assert!(a.significant);
        let trend = a.trend.unwrap();
        assert_relative_eq!(trend.slope, 1.94, epsilon = 1e-9);
        assert_relative_eq!(trend.intercept, 0.15, epsilon = 1e-9);
    }

    #[test]
    fn test_undefined_pair() {
        assert!(analyze_pair("x", &[Some(1.0)], "y", &[Some(2.0)]).is_none());
    }
}
