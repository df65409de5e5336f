//! Stateless pub-sub hooks for ledger events.
//!
//! Components subscribe to engine events and react to them without access to engine state; a
//! handler receives nothing but the event itself. Handlers run concurrently on the runtime and
//! the handler loop drains outstanding work before shutting down.
use std::{future::Future, pin::Pin, sync::Arc};

use log::*;
use tokio::{sync::mpsc, task::JoinSet};

pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

pub struct EventHandler<E: Send + Sync + 'static> {
    receiver: mpsc::Receiver<E>,
    sender: mpsc::Sender<E>,
    handler: Handler<E>,
}

impl<E: Send + Sync + 'static> EventHandler<E> {
    pub fn new(buffer_size: usize, handler: Handler<E>) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size);
        Self { receiver, sender, handler }
    }

    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer::new(self.sender.clone())
    }

    /// Runs until every producer has been dropped, then drains in-flight handler tasks.
    pub async fn start_handler(mut self) {
        // The internal sender is dropped here so the loop ends once the last subscriber goes.
        drop(self.sender);
        debug!("📬️ Event handler running");
        let mut jobs = JoinSet::new();
        loop {
            tokio::select! {
                event = self.receiver.recv() => match event {
                    Some(event) => {
                        let handler = Arc::clone(&self.handler);
                        jobs.spawn(async move { (handler)(event).await });
                    },
                    None => break,
                },
                Some(finished) = jobs.join_next(), if !jobs.is_empty() => {
                    if let Err(e) = finished {
                        warn!("📬️ An event handler task panicked: {e}");
                    }
                },
            }
        }
        while let Some(finished) = jobs.join_next().await {
            if let Err(e) = finished {
                warn!("📬️ An event handler task panicked: {e}");
            }
        }
        debug!("📬️ Event handler drained and shut down");
    }
}

#[derive(Clone)]
pub struct EventProducer<E: Send + Sync> {
    sender: mpsc::Sender<E>,
}

impl<E: Send + Sync> EventProducer<E> {
    pub fn new(sender: mpsc::Sender<E>) -> Self {
        Self { sender }
    }

    pub async fn publish_event(&self, event: E) {
        if let Err(e) = self.sender.send(event).await {
            error!("📬️ Failed to publish event: {e}");
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;

    #[tokio::test]
    async fn all_published_events_are_handled() {
        let _ = env_logger::try_init();
        let total = Arc::new(AtomicU64::new(0));
        let tally = total.clone();
        let handler = Arc::new(move |v: u64| {
            let total = total.clone();
            Box::pin(async move {
                total.fetch_add(v, Ordering::SeqCst);
                tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        });
        let event_handler = EventHandler::new(4, handler);
        let producer_a = event_handler.subscribe();
        let producer_b = event_handler.subscribe();
        tokio::spawn(async move {
            for v in 0..5u64 {
                producer_a.publish_event(v * 2 + 1).await;
            }
        });
        tokio::spawn(async move {
            for v in 0..5u64 {
                producer_b.publish_event(v * 2).await;
            }
        });

        event_handler.start_handler().await;
        assert_eq!(tally.load(Ordering::SeqCst), 45);
    }
}
