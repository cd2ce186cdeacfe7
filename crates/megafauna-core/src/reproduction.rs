//! Reproduction models for herbivores.

/// The yearly window in which parturition occurs, with wraparound at the
/// year boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BreedingSeason {
    start: u16,
    length: u16,
}

impl BreedingSeason {
    /// `start` is the Julian day (0 = Jan 1st) the season begins; `length`
    /// is its duration in days [1, 365].
    pub fn new(start: u16, length: u16) -> Self {
        assert!(start < 365, "season start must be within [0,364], got {start}");
        assert!(
            (1..=365).contains(&length),
            "season length must be within [1,365], got {length}"
        );
        Self { start, length }
    }

    /// Whether the given day (0 = Jan 1st) falls into the breeding season.
    pub fn is_in_season(&self, day: u16) -> bool {
        assert!(day < 365, "day must be within [0,364], got {day}");
        (day + 365 - self.start) % 365 < self.length
    }

    /// Convert an annual reproduction rate into a daily rate within the
    /// season, so that the daily rates sum to the annual rate.
    pub fn annual_to_daily_rate(&self, annual: f64) -> f64 {
        annual / self.length as f64
    }
}

/// Logistic reproduction following Illius & O'Connor (2000).
///
/// The annual offspring count per mature female rises with body condition
/// `C` as `k / (1 + e^(-15*(C - 0.3)))`: half of the females breed at
/// C = 0.3, and 95% at C = 0.5. The annual rate is spread evenly over the
/// breeding season.
pub struct ReproductionIlliusOConnor2000 {
    breeding_season: BreedingSeason,
    max_annual_increase: f64,
}

/// Growth rate `b` of the logistic curve (Illius & O'Connor 2000).
const LOGISTIC_GROWTH_RATE: f64 = 15.0;
/// Midpoint `c` of the logistic curve (Illius & O'Connor 2000).
const LOGISTIC_MIDPOINT: f64 = 0.3;

impl ReproductionIlliusOConnor2000 {
    pub fn new(breeding_season: BreedingSeason, max_annual_increase: f64) -> Self {
        assert!(
            max_annual_increase >= 0.0,
            "max_annual_increase must not be negative, got {max_annual_increase}"
        );
        Self {
            breeding_season,
            max_annual_increase,
        }
    }

    /// Offspring per female at the given day [ind/ind/day].
    pub fn offspring_density(&self, day_of_year: u16, body_condition: f64) -> f64 {
        assert!(
            (0.0..=1.0).contains(&body_condition),
            "body condition must be within [0,1], got {body_condition}"
        );
        if !self.breeding_season.is_in_season(day_of_year) {
            return 0.0;
        }
        let annual = self.max_annual_increase
            / (1.0 + (-LOGISTIC_GROWTH_RATE * (body_condition - LOGISTIC_MIDPOINT)).exp());
        debug_assert!(annual >= 0.0 && annual <= self.max_annual_increase);
        self.breeding_season.annual_to_daily_rate(annual)
    }
}

/// Constant annual reproduction rate, independent of body condition.
pub struct ReproductionConstMax {
    breeding_season: BreedingSeason,
    annual_increase: f64,
}

impl ReproductionConstMax {
    pub fn new(breeding_season: BreedingSeason, annual_increase: f64) -> Self {
        assert!(
            annual_increase >= 0.0,
            "annual_increase must not be negative, got {annual_increase}"
        );
        Self {
            breeding_season,
            annual_increase,
        }
    }

    /// Offspring per female at the given day [ind/ind/day].
    pub fn offspring_density(&self, day_of_year: u16) -> f64 {
        if self.breeding_season.is_in_season(day_of_year) {
            self.breeding_season.annual_to_daily_rate(self.annual_increase)
        } else {
            0.0
        }
    }
}

/// Reproduction rate rising linearly with body condition up to a maximum.
pub struct ReproductionLinear {
    breeding_season: BreedingSeason,
    max_annual_increase: f64,
}

impl ReproductionLinear {
    pub fn new(breeding_season: BreedingSeason, max_annual_increase: f64) -> Self {
        assert!(
            max_annual_increase >= 0.0,
            "max_annual_increase must not be negative, got {max_annual_increase}"
        );
        Self {
            breeding_season,
            max_annual_increase,
        }
    }

    /// Offspring per female at the given day [ind/ind/day].
    pub fn offspring_density(&self, day_of_year: u16, body_condition: f64) -> f64 {
        assert!(
            (0.0..=1.0).contains(&body_condition),
            "body condition must be within [0,1], got {body_condition}"
        );
        if !self.breeding_season.is_in_season(day_of_year) {
            return 0.0;
        }
        self.breeding_season
            .annual_to_daily_rate(self.max_annual_increase * body_condition)
    }
}
