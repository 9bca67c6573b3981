use anyhow::Result;
use candle_core::{DType, Device, Tensor};
use clap::Parser;
use log::info;
use pixel_sac_agent::sac::{
    loss::{bellman_target, policy_loss, temperature_loss},
    Actor, Critic, Entropy, SacConfig,
};
use std::convert::TryFrom;

/// Runs optimization steps of SAC networks on random image batches
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// YAML file of the configuration. The default configuration is used if not given
    #[arg(short, long)]
    config: Option<String>,

    /// Number of optimization steps
    #[arg(short, long, default_value_t = 3)]
    steps: usize,

    /// Batch size
    #[arg(short, long, default_value_t = 8)]
    batch_size: usize,

    /// Saves the configuration into the given file and exits
    #[arg(long)]
    save_config: Option<String>,
}

struct Batch {
    obs: Tensor,
    act: Tensor,
    next_obs: Tensor,
    reward: Tensor,
    not_done: Tensor,
}

fn random_batch(config: &SacConfig, batch_size: usize, device: &Device) -> Result<Batch> {
    let [c, h, w] = config.actor_config.in_shape;
    let action_dim = config.actor_config.action_dim;
    let obs = Tensor::rand(0f32, 1f32, (batch_size, c, h, w), device)?;
    let next_obs = Tensor::rand(0f32, 1f32, (batch_size, c, h, w), device)?;
    let act = Tensor::rand(-1f32, 1f32, (batch_size, action_dim), device)?;
    let reward = Tensor::randn(0f32, 1f32, (batch_size, 1), device)?;
    let not_done = Tensor::ones((batch_size, 1), DType::F32, device)?;
    Ok(Batch {
        obs,
        act,
        next_obs,
        reward,
        not_done,
    })
}

fn opt_step(
    config: &SacConfig,
    batch: &Batch,
    actor: &mut Actor,
    critic: &mut Critic,
    entropy: &mut Entropy,
) -> Result<(f32, f32, f32)> {
    let alpha = entropy.current_alpha()?;

    // Critic
    let target_q = {
        let next = actor.evaluate(&batch.next_obs)?;
        let (next_q1, next_q2) = critic.get_target_q_value(&batch.next_obs, &next.action.detach())?;
        bellman_target(
            &batch.reward,
            &batch.not_done,
            config.gamma,
            &next_q1,
            &next_q2,
            &alpha,
            &next.log_prob.detach(),
        )?
    };
    let (q1, q2) = critic.get_q_value(&batch.obs, &batch.act)?;
    let loss_critic = critic.learn(&q1, &q2, &target_q)?;

    // Actor
    let ev = actor.evaluate(&batch.obs)?;
    let (q1, q2) = critic.get_q_value(&batch.obs, &ev.action)?;
    let loss_actor = policy_loss(&alpha, &ev.log_prob, &q1, &q2)?;
    actor.learn(&loss_actor)?;

    // Entropy coefficient
    let loss_alpha = temperature_loss(
        entropy.log_alpha(),
        &ev.log_prob.detach(),
        entropy.target_entropy(),
    )?;
    entropy.learn(&loss_alpha)?;

    critic.update()?;

    Ok((
        loss_critic,
        loss_actor.to_scalar::<f32>()?,
        loss_alpha.to_scalar::<f32>()?,
    ))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => SacConfig::load(path)?,
        None => SacConfig::default(),
    };
    if let Some(path) = &args.save_config {
        config.save(path)?;
        return Ok(());
    }

    let device = Device::try_from(config.device)?;
    let mut actor = Actor::build(config.actor_config.clone(), device.clone())?;
    let mut critic = Critic::build(config.critic_config.clone(), device.clone())?;
    let mut entropy = Entropy::build(config.entropy_config.clone(), device.clone())?;
    critic.hard_update()?;

    for step in 0..args.steps {
        let batch = random_batch(&config, args.batch_size, &device)?;
        let (loss_critic, loss_actor, loss_alpha) =
            opt_step(&config, &batch, &mut actor, &mut critic, &mut entropy)?;
        info!(
            "step = {}, loss_critic = {:.5}, loss_actor = {:.5}, loss_alpha = {:.5}, alpha = {:.5}",
            step,
            loss_critic,
            loss_actor,
            loss_alpha,
            entropy.current_alpha()?.to_vec1::<f32>()?[0],
        );
    }

    let obs = random_batch(&config, 1, &device)?.obs;
    let act = actor.choose_action(&obs)?;
    info!("sampled action = {}", act);

    Ok(())
}
