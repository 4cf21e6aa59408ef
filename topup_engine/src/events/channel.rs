//! A small multi-producer, single-consumer event bus.
//!
//! Each [`EventHandler`] owns one async callback. Every event received is dispatched to the callback in its own task,
//! so a slow subscriber never blocks the API call that published the event. Handlers are stateless: all they see is
//! the event itself.
use std::{future::Future, pin::Pin, sync::Arc};

use log::*;
use tokio::{sync::mpsc, task::JoinSet};

pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

pub struct EventHandler<E: Send + 'static> {
    receiver: mpsc::Receiver<E>,
    sender: mpsc::Sender<E>,
    handler: Handler<E>,
}

impl<E: Send + 'static> EventHandler<E> {
    pub fn new(buffer_size: usize, handler: Handler<E>) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size.max(1));
        Self { receiver, sender, handler }
    }

    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer { sender: self.sender.clone() }
    }

    /// Runs until every [`EventProducer`] has been dropped, and then waits for in-flight callbacks to finish.
    pub async fn start_handler(self) {
        let Self { mut receiver, sender, handler } = self;
        // Only producers may keep the channel open
        drop(sender);
        debug!("📬️ Event handler started");
        let mut jobs = JoinSet::new();
        while let Some(event) = receiver.recv().await {
            trace!("📬️ Dispatching event");
            jobs.spawn((handler)(event));
            // reap whatever has already finished so the set doesn't grow without bound
            while let Some(done) = jobs.try_join_next() {
                log_join_result(done);
            }
        }
        debug!("📬️ All producers have gone away. Waiting for {} outstanding jobs", jobs.len());
        while let Some(done) = jobs.join_next().await {
            log_join_result(done);
        }
        debug!("📬️ Event handler has shut down");
    }
}

fn log_join_result(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        warn!("📬️ An event hook did not run to completion: {e}");
    }
}

#[derive(Clone)]
pub struct EventProducer<E: Send> {
    sender: mpsc::Sender<E>,
}

impl<E: Send> EventProducer<E> {
    pub async fn publish_event(&self, event: E) {
        if self.sender.send(event).await.is_err() {
            error!("📬️ Could not publish event. The event handler is no longer running.");
        }
    }
}
