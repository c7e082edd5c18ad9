//! Demo client: connects to a server and plays random tones forever (or for
//! a fixed number of rounds), stopping each one before the next.

use std::time::Duration;

use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use rand::Rng;
use serde_json::{Value, json};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info};

use crate::cli::WanderArgs;

/// Timing for a wander run.
#[derive(Clone, Copy, Debug)]
pub struct WanderPlan {
    /// How long each tone plays.
    pub interval: Duration,
    /// Silence after each stop.
    pub rest: Duration,
    /// Tones to play, or unbounded.
    pub rounds: Option<u64>,
}

impl From<&WanderArgs> for WanderPlan {
    fn from(args: &WanderArgs) -> Self {
        Self {
            interval: Duration::from_millis(args.interval_ms),
            rest: Duration::from_millis(args.rest_ms),
            rounds: args.rounds,
        }
    }
}

/// A `play_signal_oscillator` message with random parameters.
pub fn random_play(rng: &mut impl Rng) -> Value {
    json!({
        "type": "play_signal_oscillator",
        "frequency": rng.random_range(40.0..300.0),
        "lfo_frequency": rng.random_range(-200.0..200.0),
        "pan": rng.random_range(0.0..1.0),
    })
}

/// Connect to `url` and play tones per `plan`. Returns the rounds completed.
pub async fn run(url: &str, plan: WanderPlan) -> Result<u64> {
    let (ws, _) = connect_async(url)
        .await
        .with_context(|| format!("failed to connect to {url}"))?;
    info!(url, "connected");
    let (mut tx, mut rx) = ws.split();

    let drain = tokio::spawn(async move {
        while let Some(Ok(msg)) = rx.next().await {
            if let Message::Text(text) = msg {
                debug!(text = text.as_str(), "server message");
            }
        }
    });

    let stop = json!({"type": "stop_audio"}).to_string();
    let mut completed = 0;
    while plan.rounds.is_none_or(|n| completed < n) {
        let play = random_play(&mut rand::rng());
        info!(
            frequency = play["frequency"].as_f64(),
            lfo_frequency = play["lfo_frequency"].as_f64(),
            pan = play["pan"].as_f64(),
            "playing"
        );
        tx.send(Message::text(play.to_string()))
            .await
            .context("failed to send play")?;
        tokio::time::sleep(plan.interval).await;

        tx.send(Message::text(stop.clone()))
            .await
            .context("failed to send stop")?;
        tokio::time::sleep(plan.rest).await;
        completed += 1;
    }

    let _ = tx.close().await;
    drain.abort();
    Ok(completed)
}
