//! Nitrogen uptake and excretion by herbivores.

/// Fraction of nitrogen in live herbivore mass [kgN/kg].
///
/// Hobbs (2006) cites Robbins (1983) with 2.5%–3.0% for large mammalian
/// herbivores; the upper estimate is used.
pub const N_CONTENT_IN_TISSUE: f64 = 0.03;

/// Mean retention time of ingesta [hours] after Clauss et al. (2007) for
/// animals heavier than 0.5 kg: `MRT = 32.8 * M^0.07`.
pub fn retention_time(bodymass: f64) -> f64 {
    assert!(bodymass > 0.0, "bodymass must be positive, got {bodymass}");
    32.8 * bodymass.powf(0.07)
}

/// Nitrogen pools of one herbivore object, all per area [kgN/km²].
///
/// Call [`NitrogenPool::ingest`] any number of times within a day, then
/// [`NitrogenPool::digest_today`] once at the start of the next day to move
/// ingesta that passed the digestive tract into the excreta pool. Pools are
/// per area, so when cohort density drops the surplus bound nitrogen is
/// counted as excreta on the next digestion and no nitrogen leaves the
/// system unaccounted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NitrogenPool {
    /// Nitrogen in guts and body tissue [kgN/km²].
    bound: f64,
    /// Excreted nitrogen, ready to go into the soil [kgN/km²].
    excreta: f64,
    /// Nitrogen eaten today [kgN/km²].
    ingested: f64,
}

impl NitrogenPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// The nitrogen that has been excreted [kgN/km²].
    pub fn excreta(&self) -> f64 {
        self.excreta
    }

    /// The nitrogen still inside the animals [kgN/km²].
    pub fn unavailable(&self) -> f64 {
        self.bound + self.ingested
    }

    /// Take up nitrogen from forage [kgN/km²].
    pub fn ingest(&mut self, eaten_nitrogen: f64) {
        assert!(
            eaten_nitrogen >= 0.0 && eaten_nitrogen.is_finite(),
            "eaten nitrogen must be finite and not negative, got {eaten_nitrogen}"
        );
        self.ingested += eaten_nitrogen;
    }

    /// Move ingesta that passed the digestive tract into the excreta pool.
    ///
    /// `retention_time` is in hours; `massdens` [kg/km²] determines the
    /// nitrogen held in live tissue (zero disables tissue accounting).
    pub fn digest_today(&mut self, retention_time: f64, massdens: f64) {
        assert!(
            retention_time > 0.0,
            "retention time must be positive, got {retention_time}"
        );
        assert!(
            massdens >= 0.0,
            "mass density must not be negative, got {massdens}"
        );
        let tissue = massdens * N_CONTENT_IN_TISSUE;
        let in_guts = self.ingested * retention_time / 24.0;
        let retained = tissue + in_guts;
        let total = self.bound + self.ingested;
        self.excreta += (total - retained).max(0.0);
        self.bound = total.min(retained);
        self.ingested = 0.0;
    }

    /// Merge with another pool by summing.
    pub fn merge(&mut self, other: &NitrogenPool) {
        self.bound += other.bound;
        self.excreta += other.excreta;
        self.ingested += other.ingested;
    }

    /// Take the excreted nitrogen out of the pool; call when it has been
    /// accounted for in the soil.
    pub fn reset_excreta(&mut self) -> f64 {
        std::mem::take(&mut self.excreta)
    }

    /// Take *all* nitrogen out of the pool; call when the herbivore is dead
    /// and the body decomposes.
    pub fn reset_total(&mut self) -> f64 {
        let total = self.bound + self.excreta + self.ingested;
        *self = Self::default();
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retention_time_formula() {
        assert!((retention_time(100.0) - 45.276604).abs() < 1e-5);
    }

    #[test]
    #[should_panic]
    fn retention_time_rejects_zero_mass() {
        let _ = retention_time(0.0);
    }

    #[test]
    fn new_pool_is_empty() {
        let pool = NitrogenPool::new();
        assert_eq!(pool.excreta(), 0.0);
        assert_eq!(pool.unavailable(), 0.0);
    }

    #[test]
    fn nothing_is_lost_in_ingestion_digestion_cycle() {
        let mut pool = NitrogenPool::new();
        let mut soil = 0.0;
        let mut total = 0.0;
        let retention = 80.0; // hours
        let mut hours = 0;
        for i in 0..20 {
            let new_ingested = (1 + i % 2) as f64;
            pool.ingest(new_ingested);
            total += new_ingested;
            assert!(
                (total - (soil + pool.excreta() + pool.unavailable())).abs() < 1e-9,
                "nitrogen leaked from the system"
            );
            if i % 3 == 0 {
                hours += 24;
                pool.digest_today(retention, 0.0);
            }
            if i % 6 == 0 {
                if hours as f64 > retention {
                    assert!(pool.excreta() > 0.0);
                }
                soil += pool.reset_excreta();
                assert_eq!(pool.excreta(), 0.0);
            }
        }
    }

    #[test]
    fn tissue_nitrogen_stays_bound() {
        let mut pool = NitrogenPool::new();
        let massdens = 10.0;
        let ingested = massdens;
        pool.ingest(ingested);

        // Pass all ingesta through the digestive tract.
        pool.digest_today(1.0, massdens);
        pool.digest_today(1.0, massdens);

        assert!((pool.unavailable() - massdens * N_CONTENT_IN_TISSUE).abs() < 1e-9);
        assert!((pool.unavailable() + pool.excreta() - ingested).abs() < 1e-9);

        assert!((pool.reset_total() - ingested).abs() < 1e-9);
        assert_eq!(pool.unavailable(), 0.0);
        assert_eq!(pool.excreta(), 0.0);
    }
}
