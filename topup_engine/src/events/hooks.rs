use std::{future::Future, pin::Pin, sync::Arc};

use log::*;

use crate::events::{EventHandler, EventProducer, Handler, OrderCompletedEvent};

/// The publishing side of the registered hooks. Cheap to clone, and handed to every API that emits events.
#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_completed_producer: Vec<EventProducer<OrderCompletedEvent>>,
}

pub struct EventHandlers {
    pub on_order_completed: Option<EventHandler<OrderCompletedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_completed = hooks.on_order_completed.map(|f| EventHandler::new(buffer_size, f));
        Self { on_order_completed }
    }

    pub fn producers(&self) -> EventProducers {
        let order_completed_producer = self.on_order_completed.iter().map(EventHandler::subscribe).collect();
        EventProducers { order_completed_producer }
    }

    /// Spawns a task for every registered handler. The tasks end once every producer has been dropped.
    pub fn start_handlers(self) {
        if let Some(handler) = self.on_order_completed {
            debug!("📬️ Spawning order completed hook");
            tokio::spawn(handler.start_handler());
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_completed: Option<Handler<OrderCompletedEvent>>,
}

impl EventHooks {
    pub fn on_order_completed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderCompletedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_completed = Some(Arc::new(f));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.on_order_completed.is_none()
    }
}
