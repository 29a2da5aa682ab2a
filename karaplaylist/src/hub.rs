//! NotificationHub : diffusion de la sélection courante vers tous les écrans
//!
//! Chaque abonné possède sa propre file bornée (canal `broadcast`). Publier
//! n'attend jamais un consommateur : un abonné trop lent perd les valeurs les
//! plus anciennes, ou est déconnecté, selon la [`OverflowPolicy`].

use futures::Stream;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

/// Politique appliquée à un abonné dont la file déborde
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// L'abonné saute les valeurs les plus anciennes et continue
    #[default]
    DropOldest,
    /// Le flux de l'abonné se termine
    Disconnect,
}

impl FromStr for OverflowPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "drop_oldest" | "drop-oldest" => Ok(OverflowPolicy::DropOldest),
            "disconnect" => Ok(OverflowPolicy::Disconnect),
            other => Err(format!("Unknown overflow policy: {}", other)),
        }
    }
}

/// Paramètres du hub
#[derive(Debug, Clone)]
pub struct HubOptions {
    /// Taille maximale de la file de chaque abonné
    pub capacity: usize,
    pub overflow: OverflowPolicy,
    /// Valeur affichée avant la première publication
    pub initial: String,
}

impl Default for HubOptions {
    fn default() -> Self {
        Self {
            capacity: 64,
            overflow: OverflowPolicy::default(),
            initial: String::new(),
        }
    }
}

/// Canal de diffusion multi-abonnés
pub struct NotificationHub {
    tx: broadcast::Sender<String>,
    overflow: OverflowPolicy,
    last: RwLock<String>,
    next_id: AtomicU64,
}

impl NotificationHub {
    pub fn new(options: HubOptions) -> Self {
        let (tx, _) = broadcast::channel(options.capacity.max(1));
        Self {
            tx,
            overflow: options.overflow,
            last: RwLock::new(options.initial),
            next_id: AtomicU64::new(1),
        }
    }

    /// Enregistre un nouvel abonné.
    ///
    /// Seules les valeurs publiées après cet appel lui sont livrées.
    pub fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let rx = self.tx.subscribe();
        debug!(subscriber = id, total = self.subscriber_count(), "Viewer subscribed");
        Subscription {
            id,
            rx,
            overflow: self.overflow,
            closed: false,
        }
    }

    /// Retire un abonné ; sa file est abandonnée.
    ///
    /// Laisser tomber la [`Subscription`] a le même effet.
    pub fn unsubscribe(&self, subscription: Subscription) {
        let id = subscription.id;
        drop(subscription);
        debug!(subscriber = id, total = self.subscriber_count(), "Viewer unsubscribed");
    }

    /// Ajoute `value` à la file de chaque abonné courant.
    ///
    /// Retourne le nombre d'abonnés atteints.
    pub fn publish(&self, value: impl Into<String>) -> usize {
        let value = value.into();
        match self.last.write() {
            Ok(mut last) => *last = value.clone(),
            Err(poisoned) => *poisoned.into_inner() = value.clone(),
        }

        // Une erreur signifie simplement qu'aucun écran n'est connecté
        let reached = self.tx.send(value.clone()).unwrap_or(0);
        debug!(url = %value, subscribers = reached, "Published current selection");
        reached
    }

    /// Nombre d'abonnés actuellement enregistrés
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Dernière valeur publiée (ou la valeur initiale)
    pub fn last_published(&self) -> String {
        match self.last.read() {
            Ok(last) => last.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

/// Poignée d'un abonné : séquence paresseuse, infinie et non redémarrable
/// des valeurs publiées.
pub struct Subscription {
    id: u64,
    rx: broadcast::Receiver<String>,
    overflow: OverflowPolicy,
    closed: bool,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Attend la prochaine valeur publiée.
    ///
    /// Retourne `None` quand le hub a disparu ou que l'abonné a été
    /// déconnecté pour débordement ; les appels suivants retournent aussi `None`.
    pub async fn recv(&mut self) -> Option<String> {
        if self.closed {
            return None;
        }

        loop {
            match self.rx.recv().await {
                Ok(value) => return Some(value),
                Err(RecvError::Lagged(skipped)) => match self.overflow {
                    OverflowPolicy::DropOldest => {
                        warn!(subscriber = self.id, skipped, "Viewer lagging, dropped oldest values");
                    }
                    OverflowPolicy::Disconnect => {
                        warn!(subscriber = self.id, skipped, "Viewer lagging, disconnecting");
                        self.closed = true;
                        return None;
                    }
                },
                Err(RecvError::Closed) => {
                    self.closed = true;
                    return None;
                }
            }
        }
    }

    /// Convertit l'abonnement en `Stream`
    pub fn into_stream(self) -> impl Stream<Item = String> + Send + 'static {
        futures::stream::unfold(self, |mut subscription| async move {
            subscription
                .recv()
                .await
                .map(|value| (value, subscription))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overflow_policy_from_str() {
        assert_eq!("drop_oldest".parse::<OverflowPolicy>(), Ok(OverflowPolicy::DropOldest));
        assert_eq!("Disconnect".parse::<OverflowPolicy>(), Ok(OverflowPolicy::Disconnect));
        assert!("forever".parse::<OverflowPolicy>().is_err());
    }

    #[test]
    fn test_publish_without_subscribers() {
        let hub = NotificationHub::new(HubOptions {
            initial: "initial".into(),
            ..Default::default()
        });
        assert_eq!(hub.last_published(), "initial");
        assert_eq!(hub.publish("a"), 0);
        assert_eq!(hub.last_published(), "a");
    }

    #[test]
    fn test_subscriber_count() {
        let hub = NotificationHub::new(HubOptions::default());
        let a = hub.subscribe();
        let b = hub.subscribe();
        assert_ne!(a.id(), b.id());
        assert_eq!(hub.subscriber_count(), 2);

        hub.unsubscribe(a);
        assert_eq!(hub.subscriber_count(), 1);
        drop(b);
        assert_eq!(hub.subscriber_count(), 0);
    }
}
