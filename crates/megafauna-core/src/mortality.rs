//! Herbivore mortality factors.

/// Minimum body fat as a fraction of body mass; below it the animal starves
/// under [`crate::hft::MortalityFactor::StarvationThreshold`].
pub const STARVATION_MIN_BODYFAT: f64 = 0.05;

/// Constant background mortality, converted from annual to daily rates.
///
/// Annual rates must lie in `[0, 1)`.
pub struct BackgroundMortality {
    daily_juvenile: f64,
    daily_adult: f64,
}

impl BackgroundMortality {
    pub fn new(annual_juvenile: f64, annual_adult: f64) -> Self {
        assert!(
            (0.0..1.0).contains(&annual_juvenile),
            "juvenile annual mortality must be within [0,1), got {annual_juvenile}"
        );
        assert!(
            (0.0..1.0).contains(&annual_adult),
            "adult annual mortality must be within [0,1), got {annual_adult}"
        );
        Self {
            daily_juvenile: annual_to_daily(annual_juvenile),
            daily_adult: annual_to_daily(annual_adult),
        }
    }

    /// Today's daily mortality [0,1]; the juvenile rate applies within the
    /// first year of life.
    pub fn rate(&self, age_days: u32) -> f64 {
        if age_days < 365 {
            self.daily_juvenile
        } else {
            self.daily_adult
        }
    }
}

/// Convert an annual survival-based mortality rate to a daily one.
fn annual_to_daily(annual: f64) -> f64 {
    1.0 - (1.0 - annual).powf(1.0 / 365.0)
}

/// Mortality of 1.0 as soon as the lifespan is reached, 0.0 before.
pub fn lifespan_mortality(lifespan_years: u16, age_days: u32) -> f64 {
    assert!(lifespan_years > 0, "lifespan must be positive");
    if age_days >= lifespan_years as u32 * 365 {
        1.0
    } else {
        0.0
    }
}

/// Death at a minimum body fat threshold.
pub fn starvation_threshold_mortality(bodyfat: f64) -> f64 {
    assert!(
        (0.0..=1.0).contains(&bodyfat),
        "body fat must be within [0,1], got {bodyfat}"
    );
    if bodyfat < STARVATION_MIN_BODYFAT {
        1.0
    } else {
        0.0
    }
}

/// Starvation mortality after Illius & O'Connor (2000).
///
/// Body fat is assumed normally distributed within a cohort; the fraction of
/// animals whose body condition projects below zero dies. Optionally the
/// surviving cohort's mean body condition is shifted upward to `b / (1 - d)`
/// (capped at 1), because the dying tail carried no fat but the per-area fat
/// pool stays with the survivors.
pub struct StarvationIlliusOConnor2000 {
    fat_standard_deviation: f64,
    shift_body_condition: bool,
}

impl StarvationIlliusOConnor2000 {
    /// `fat_standard_deviation` is the standard deviation of body condition
    /// within the cohort; Illius & O'Connor (2000) use 0.125, citing Ledger
    /// (1968). Zero means no variation (a point distribution).
    pub fn new(fat_standard_deviation: f64, shift_body_condition: bool) -> Self {
        assert!(
            (0.0..=1.0).contains(&fat_standard_deviation),
            "fat standard deviation must be within [0,1], got {fat_standard_deviation}"
        );
        Self {
            fat_standard_deviation,
            shift_body_condition,
        }
    }

    /// Today's starvation mortality [0,1] and the updated mean body
    /// condition of the surviving cohort.
    pub fn mortality(&self, body_condition: f64) -> (f64, f64) {
        assert!(
            (0.0..=1.0).contains(&body_condition),
            "body condition must be within [0,1], got {body_condition}"
        );
        let dead_fraction = if self.fat_standard_deviation == 0.0 {
            if body_condition <= 0.0 {
                1.0
            } else {
                0.0
            }
        } else {
            standard_normal_cdf(-body_condition / self.fat_standard_deviation)
        };

        let new_condition = if self.shift_body_condition && dead_fraction > 0.0 && dead_fraction < 1.0
        {
            (body_condition / (1.0 - dead_fraction)).min(1.0)
        } else {
            body_condition
        };
        (dead_fraction, new_condition)
    }
}

/// Cumulative distribution function Φ of the standard normal distribution.
///
/// Abramowitz & Stegun formula 7.1.26 via the error function; maximum
/// absolute error 1.5e-7.
fn standard_normal_cdf(x: f64) -> f64 {
    const A1: f64 = 0.254829592;
    const A2: f64 = -0.284496736;
    const A3: f64 = 1.421413741;
    const A4: f64 = -1.453152027;
    const A5: f64 = 1.061405429;
    const P: f64 = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x_abs = x.abs() / std::f64::consts::SQRT_2;

    let t = 1.0 / (1.0 + P * x_abs);
    let y = 1.0 - ((((A5 * t + A4) * t + A3) * t + A2) * t + A1) * t * (-x_abs * x_abs).exp();

    0.5 * (1.0 + sign * y)
}
