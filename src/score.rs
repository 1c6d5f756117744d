use crate::error::{TimetableError, TtResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// Two-tier score. Field order matters: the derived ordering is lexicographic
/// on (hard, soft), so any hard difference dominates every soft difference.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct HardSoftScore {
    pub hard: i64,
    pub soft: i64,
}

impl HardSoftScore {
    pub const ZERO: HardSoftScore = HardSoftScore { hard: 0, soft: 0 };

    pub const fn new(hard: i64, soft: i64) -> Self {
        Self { hard, soft }
    }

    pub const fn of_hard(hard: i64) -> Self {
        Self { hard, soft: 0 }
    }

    pub const fn of_soft(soft: i64) -> Self {
        Self { hard: 0, soft }
    }

    pub fn is_feasible(&self) -> bool {
        self.hard >= 0
    }

    pub fn checked_add(self, rhs: Self) -> TtResult<Self> {
        match (self.hard.checked_add(rhs.hard), self.soft.checked_add(rhs.soft)) {
            (Some(hard), Some(soft)) => Ok(Self { hard, soft }),
            _ => Err(TimetableError::ScoringFault(format!(
                "score overflow adding {} to {}",
                rhs, self
            ))),
        }
    }

    pub fn checked_sub(self, rhs: Self) -> TtResult<Self> {
        match (self.hard.checked_sub(rhs.hard), self.soft.checked_sub(rhs.soft)) {
            (Some(hard), Some(soft)) => Ok(Self { hard, soft }),
            _ => Err(TimetableError::ScoringFault(format!(
                "score overflow subtracting {} from {}",
                rhs, self
            ))),
        }
    }
}

impl fmt::Display for HardSoftScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}hard/{}soft", self.hard, self.soft)
    }
}

impl Add for HardSoftScore {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.hard + rhs.hard, self.soft + rhs.soft)
    }
}

impl Sub for HardSoftScore {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.hard - rhs.hard, self.soft - rhs.soft)
    }
}

impl Neg for HardSoftScore {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.hard, -self.soft)
    }
}

impl AddAssign for HardSoftScore {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for HardSoftScore {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl std::iter::Sum for HardSoftScore {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hard_dominates_soft() {
        assert!(HardSoftScore::new(-1, 100) < HardSoftScore::new(0, -100));
        assert!(HardSoftScore::new(0, -100) < HardSoftScore::new(0, -99));
        assert!(HardSoftScore::new(-2, i64::MAX) < HardSoftScore::new(-1, i64::MIN));
    }

    #[test]
    fn overflow_is_reported() {
        let s = HardSoftScore::new(0, i64::MAX);
        assert!(matches!(
            s.checked_add(HardSoftScore::of_soft(1)),
            Err(TimetableError::ScoringFault(_))
        ));
    }

    #[test]
    fn display_format() {
        assert_eq!(HardSoftScore::new(-2, 5).to_string(), "-2hard/5soft");
    }
}
