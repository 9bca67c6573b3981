//! Loss functions of SAC.
//!
//! Log-probabilities are per action dimension, of shape `(batch_size, action_dim)`,
//! as returned by [`Actor::evaluate`](super::Actor::evaluate). They are summed over
//! the action axis here. Action values are of shape `(batch_size, 1)`.
use anyhow::Result;
use candle_core::{Tensor, D};

fn sum_log_prob(log_prob: &Tensor) -> Result<Tensor> {
    Ok(log_prob.sum_keepdim(D::Minus1)?)
}

/// Soft Bellman target of the critic.
///
/// `reward + gamma * not_done * (min(next_q1, next_q2) - alpha * sum(next_log_prob))`.
/// The returned tensor is detached.
pub fn bellman_target(
    reward: &Tensor,
    not_done: &Tensor,
    gamma: f64,
    next_q1: &Tensor,
    next_q2: &Tensor,
    alpha: &Tensor,
    next_log_prob: &Tensor,
) -> Result<Tensor> {
    let next_q = next_q1.minimum(next_q2)?;
    let entropy_term = sum_log_prob(next_log_prob)?.broadcast_mul(alpha)?;
    let soft_q = (next_q - entropy_term)?;
    let target = (reward + (not_done * soft_q)?.affine(gamma, 0.0)?)?;
    Ok(target.detach())
}

/// Loss of the policy: `mean(alpha * sum(log_prob) - min(q1, q2))`.
pub fn policy_loss(alpha: &Tensor, log_prob: &Tensor, q1: &Tensor, q2: &Tensor) -> Result<Tensor> {
    let q = q1.minimum(q2)?;
    let entropy_term = sum_log_prob(log_prob)?.broadcast_mul(alpha)?;
    Ok((entropy_term - q)?.mean_all()?)
}

/// Loss of the entropy coefficient:
/// `-mean(log_alpha * (sum(log_prob) + target_entropy))`.
///
/// Gradients flow into `log_alpha` only.
pub fn temperature_loss(log_alpha: &Tensor, log_prob: &Tensor, target_entropy: f64) -> Result<Tensor> {
    let err = (sum_log_prob(log_prob)? + target_entropy)?.detach();
    Ok(err.broadcast_mul(log_alpha)?.mean_all()?.neg()?)
}
