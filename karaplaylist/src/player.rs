//! Compte à rebours avant le lancement de la chanson suivante.
//!
//! Le minuteur tourne dans sa propre tâche, indépendante du moteur : il
//! envoie les secondes restantes sur un canal et se termine par
//! [`CountdownOutcome::Elapsed`] ou [`CountdownOutcome::Cancelled`].

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Issue d'un compte à rebours
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownOutcome {
    Elapsed,
    Cancelled,
}

/// Compte à rebours annulable
pub struct Countdown {
    token: CancellationToken,
    ticks: mpsc::UnboundedReceiver<u64>,
    task: JoinHandle<CountdownOutcome>,
}

impl Countdown {
    /// Démarre un compte à rebours de `steps` pas de durée `step`.
    ///
    /// Chaque pas émet d'abord le nombre de pas restants (`steps`, ..., 1).
    pub fn start(steps: u64, step: Duration) -> Self {
        let token = CancellationToken::new();
        let (tx, ticks) = mpsc::unbounded_channel();

        let child = token.clone();
        let task = tokio::spawn(async move {
            for remaining in (1..=steps).rev() {
                // Le receveur peut avoir été abandonné, le minuteur continue
                let _ = tx.send(remaining);
                tokio::select! {
                    _ = child.cancelled() => {
                        debug!(remaining, "Countdown cancelled");
                        return CountdownOutcome::Cancelled;
                    }
                    _ = tokio::time::sleep(step) => {}
                }
            }
            if child.is_cancelled() {
                return CountdownOutcome::Cancelled;
            }
            CountdownOutcome::Elapsed
        });

        Self { token, ticks, task }
    }

    /// Compte à rebours en secondes
    pub fn seconds(secs: u64) -> Self {
        Self::start(secs, Duration::from_secs(1))
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Prochain pas restant, `None` une fois le minuteur terminé
    pub async fn tick(&mut self) -> Option<u64> {
        self.ticks.recv().await
    }

    /// Attend la fin du compte à rebours
    pub async fn finished(self) -> CountdownOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(_) => CountdownOutcome::Cancelled,
        }
    }
}
