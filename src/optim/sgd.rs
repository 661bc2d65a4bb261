use serde::{Serialize, Deserialize};

use crate::network::model::Param;

/// Hyperparameters shared by one group of parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamGroup {
    pub lr: f64,
    pub momentum: f64,
    pub weight_decay: f64,
    pub nesterov: bool,
}

/// The optimizer the training loop drives.
///
/// Parameters live in the model; the optimizer receives them on every call
/// and keeps its own per-parameter state in the same order.
pub trait Optimizer {
    fn param_groups(&self) -> &[ParamGroup];

    fn param_groups_mut(&mut self) -> &mut [ParamGroup];

    fn zero_grad(&mut self, params: &mut [&mut Param]) {
        for p in params.iter_mut() {
            p.zero_grad();
        }
    }

    fn step(&mut self, params: &mut [&mut Param]);
}

/// Stochastic gradient descent with momentum, weight decay and optional
/// Nesterov momentum.
///
/// Per element: `d = g + wd·p`, `v = μ·v + d`, `d = d + μ·v` (Nesterov) or
/// `d = v`, then `p -= lr·d`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sgd {
    pub param_groups: Vec<ParamGroup>,
    velocity: Vec<Vec<f32>>,
}

impl Sgd {
    pub fn new(learning_rate: f64, momentum: f64, weight_decay: f64, nesterov: bool) -> Sgd {
        Sgd {
            param_groups: vec![ParamGroup { lr: learning_rate, momentum, weight_decay, nesterov }],
            velocity: Vec::new(),
        }
    }

    /// Plain SGD: no momentum, no weight decay.
    pub fn plain(learning_rate: f64) -> Sgd {
        Sgd::new(learning_rate, 0.0, 0.0, false)
    }

    fn ensure_state(&mut self, params: &[&mut Param]) {
        let matches = self.velocity.len() == params.len()
            && self.velocity.iter().zip(params).all(|(v, p)| v.len() == p.len());
        if !matches {
            self.velocity = params.iter().map(|p| vec![0.0; p.len()]).collect();
        }
    }
}

impl Optimizer for Sgd {
    fn param_groups(&self) -> &[ParamGroup] {
        &self.param_groups
    }

    fn param_groups_mut(&mut self) -> &mut [ParamGroup] {
        &mut self.param_groups
    }

    fn step(&mut self, params: &mut [&mut Param]) {
        if self.param_groups.is_empty() {
            return;
        }
        self.ensure_state(params);

        for (p, buf) in params.iter_mut().zip(self.velocity.iter_mut()) {
            let group = self.param_groups.get(p.group).unwrap_or(&self.param_groups[0]);
            let lr = group.lr as f32;
            let mu = group.momentum as f32;
            let wd = group.weight_decay as f32;
            let Param { value, grad, .. } = &mut **p;
            if grad.data.len() != value.data.len() {
                continue;
            }
            for ((w, g), v) in value.data.iter_mut().zip(&grad.data).zip(buf.iter_mut()) {
                let mut d = g + wd * *w;
                if mu != 0.0 {
                    *v = mu * *v + d;
                    d = if group.nesterov { d + mu * *v } else { *v };
                }
                *w -= lr * d;
            }
        }
    }
}
