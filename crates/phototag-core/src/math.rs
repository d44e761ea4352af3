//! Output activations for classifier logits.

use crate::config::Activation;

/// Apply an activation to raw model outputs in place.
pub fn activate_in_place(values: &mut [f32], activation: Activation) {
    match activation {
        Activation::Softmax => softmax_in_place(values),
        Activation::Sigmoid => values.iter_mut().for_each(|v| *v = sigmoid(*v)),
        Activation::Identity => {}
    }
}

/// Numerically stable softmax: subtracts the max logit before exponentiating.
pub fn softmax_in_place(values: &mut [f32]) {
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if !max.is_finite() {
        return;
    }
    let mut sum = 0.0;
    for v in values.iter_mut() {
        *v = (*v - max).exp();
        sum += *v;
    }
    if sum > f32::EPSILON {
        for v in values.iter_mut() {
            *v /= sum;
        }
    }
}

/// Logistic sigmoid.
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
