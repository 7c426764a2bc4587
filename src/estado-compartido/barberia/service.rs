use crate::requests::Request;
use crate::{BarberId, ClientId};
use rand::Rng;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Workplace {
    Chair(usize),
    Basin(usize),
}

impl Workplace {
    pub fn index(&self) -> usize {
        match self {
            Workplace::Chair(index) | Workplace::Basin(index) => *index,
        }
    }
}

/// Lo que publica el barbero cuando ya reservó el lugar para un pedido.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Service {
    pub client: ClientId,
    pub barber: BarberId,
    pub workplace: Workplace,
    pub request: Request,
}

/// Plan de un servicio: cuántos pasos y cuántas unidades de tiempo dura cada uno.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgressPlan {
    pub steps: u8,
    pub units_per_step: u64,
}

impl ProgressPlan {
    pub const MIN_STEPS: u8 = 5;
    pub const MAX_STEPS: u8 = 20;

    pub fn random<R: Rng + ?Sized>(rng: &mut R, min_work: u64, max_work: u64) -> Self {
        Self::with_steps(rng.gen_range(Self::MIN_STEPS..=Self::MAX_STEPS), min_work, max_work)
    }

    pub fn with_steps(steps: u8, min_work: u64, max_work: u64) -> Self {
        let steps = steps.max(1);
        let units_per_step = (max_work.saturating_sub(min_work) + steps as u64) / steps as u64;
        ProgressPlan { steps, units_per_step }
    }

    /// Valores sucesivos del porcentaje completado, terminando exactamente en 100.
    pub fn completions(&self) -> Completions {
        Completions { increment: 100 / self.steps.min(100), complete: 0 }
    }
}

pub struct Completions {
    increment: u8,
    complete: u8,
}

impl Iterator for Completions {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        if self.complete >= 100 {
            return None;
        }
        self.complete = self.complete.saturating_add(self.increment).min(100);
        Some(self.complete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn seven_steps_finish_on_the_eighth_tick() {
        let plan = ProgressPlan::with_steps(7, 3, 10);
        let values: Vec<u8> = plan.completions().collect();
        assert_eq!(values, vec![14, 28, 42, 56, 70, 84, 98, 100]);
        assert_eq!(plan.units_per_step, 2);
    }

    #[test]
    fn equal_bounds_give_one_unit_per_step() {
        assert_eq!(ProgressPlan::with_steps(10, 4, 4).units_per_step, 1);
    }

    #[test]
    fn workplace_index() {
        assert_eq!(Workplace::Chair(3).index(), 3);
        assert_eq!(Workplace::Basin(0).index(), 0);
    }

    proptest! {
        #[test]
        fn completion_is_monotonic_and_ends_at_100(steps in ProgressPlan::MIN_STEPS..=ProgressPlan::MAX_STEPS) {
            let values: Vec<u8> = ProgressPlan::with_steps(steps, 1, 50).completions().collect();
            prop_assert!(values.windows(2).all(|pair| pair[0] < pair[1]));
            prop_assert_eq!(values.last().copied(), Some(100));
            prop_assert!(values.len() >= steps as usize);
        }
    }
}
