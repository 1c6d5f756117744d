use crate::config::SolverConfig;
use crate::score::HardSoftScore;
use fastrand::Rng;

/// Simulated-annealing acceptance with geometric cooling.
#[derive(Debug, Clone)]
pub struct Annealer {
    pub temperature: f64,
    temp_min: f64,
    cooling_rate: f64,
    hard_weight: f64,
}

impl Annealer {
    pub fn new(config: &SolverConfig) -> Self {
        Self {
            temperature: config.temp_start,
            temp_min: config.temp_min,
            cooling_rate: config.cooling_rate,
            hard_weight: config.hard_weight,
        }
    }

    /// Non-worsening moves are always taken. Worsening ones pass with
    /// probability `exp(-energy / T)`, where a hard point costs `hard_weight`.
    #[inline(always)]
    pub fn accepts(&self, before: HardSoftScore, after: HardSoftScore, rng: &mut Rng) -> bool {
        if after >= before {
            return true;
        }
        let energy = (before.hard - after.hard) as f64 * self.hard_weight
            + (before.soft - after.soft) as f64;
        rng.f64() < (-energy / self.temperature).exp()
    }

    #[inline(always)]
    pub fn cool(&mut self) {
        self.temperature = (self.temperature * self.cooling_rate).max(self.temp_min);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_rejects_improvements_or_sideways_moves() {
        let annealer = Annealer::new(&SolverConfig::default());
        let mut rng = Rng::with_seed(1);
        let base = HardSoftScore::new(-1, -10);
        for _ in 0..1000 {
            assert!(annealer.accepts(base, base, &mut rng));
            assert!(annealer.accepts(base, HardSoftScore::new(0, -50), &mut rng));
            assert!(annealer.accepts(base, HardSoftScore::new(-1, -9), &mut rng));
        }
    }

    #[test]
    fn hard_regressions_are_practically_never_taken_when_cold() {
        let mut annealer = Annealer::new(&SolverConfig::default());
        for _ in 0..100_000 {
            annealer.cool();
        }
        let mut rng = Rng::with_seed(7);
        let before = HardSoftScore::new(0, 0);
        let after = HardSoftScore::new(-1, 100);
        assert!((0..10_000).all(|_| !annealer.accepts(before, after, &mut rng)));
    }

    #[test]
    fn cooling_stops_at_minimum() {
        let config = SolverConfig::default();
        let mut annealer = Annealer::new(&config);
        for _ in 0..1_000_000 {
            annealer.cool();
        }
        assert_eq!(annealer.temperature, config.temp_min);
    }
}
