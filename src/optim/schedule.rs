use crate::optim::sgd::Optimizer;

/// How a dataset's learning-rate schedule is expressed.
///
/// - `EpochFraction` — decays at 50% and 75% of the total epoch count (CIFAR).
/// - `FixedSteps`    — decays every 75 epochs for 300-epoch runs, otherwise
///                     every 30 epochs (ImageNet).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LrFamily {
    EpochFraction,
    FixedSteps,
}

/// Piecewise-constant learning rate for `epoch` (0-based).
pub fn learning_rate(base: f64, epoch: usize, total_epochs: usize, family: LrFamily) -> f64 {
    match family {
        LrFamily::EpochFraction => {
            let steps = |fraction: f64| -> i32 {
                let boundary = total_epochs as f64 * fraction;
                if boundary > 0.0 { (epoch as f64 / boundary).floor() as i32 } else { 0 }
            };
            base * 0.1f64.powi(steps(0.5)) * 0.1f64.powi(steps(0.75))
        }
        LrFamily::FixedSteps => {
            let period = if total_epochs == 300 { 75 } else { 30 };
            base * 0.1f64.powi((epoch / period) as i32)
        }
    }
}

/// Writes `lr` into every parameter group.
pub fn adjust_learning_rate<O: Optimizer + ?Sized>(optimizer: &mut O, lr: f64) {
    for group in optimizer.param_groups_mut() {
        group.lr = lr;
    }
}

/// Learning rate of the first parameter group (0 if there is none).
pub fn current_learning_rate<O: Optimizer + ?Sized>(optimizer: &O) -> f64 {
    optimizer.param_groups().first().map(|g| g.lr).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optim::sgd::{ParamGroup, Sgd};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn cifar_schedule_has_three_plateaus() {
        let lr = |e| learning_rate(0.1, e, 100, LrFamily::EpochFraction);
        assert!(close(lr(0), 0.1));
        assert!(close(lr(49), 0.1));
        assert!(close(lr(50), 0.01));
        assert!(close(lr(74), 0.01));
        assert!(close(lr(75), 0.001));
        assert!(close(lr(99), 0.001));
    }

    #[test]
    fn cifar_schedule_with_odd_epoch_count() {
        // 90 epochs: boundaries at 45 and 67.5
        let lr = |e| learning_rate(0.1, e, 90, LrFamily::EpochFraction);
        assert!(close(lr(44), 0.1));
        assert!(close(lr(45), 0.01));
        assert!(close(lr(67), 0.01));
        assert!(close(lr(68), 0.001));
    }

    #[test]
    fn imagenet_schedule_steps() {
        assert!(close(learning_rate(0.1, 29, 90, LrFamily::FixedSteps), 0.1));
        assert!(close(learning_rate(0.1, 30, 90, LrFamily::FixedSteps), 0.01));
        assert!(close(learning_rate(0.1, 65, 90, LrFamily::FixedSteps), 0.001));
        assert!(close(learning_rate(0.1, 74, 300, LrFamily::FixedSteps), 0.1));
        assert!(close(learning_rate(0.1, 150, 300, LrFamily::FixedSteps), 0.001));
    }

    #[test]
    fn adjust_sets_every_group() {
        let mut opt = Sgd::new(0.1, 0.9, 1e-4, true);
        opt.param_groups.push(ParamGroup { lr: 0.5, momentum: 0.0, weight_decay: 0.0, nesterov: false });
        adjust_learning_rate(&mut opt, 0.02);
        assert!(opt.param_groups.iter().all(|g| g.lr == 0.02));
        assert_eq!(current_learning_rate(&opt), 0.02);
    }
}
