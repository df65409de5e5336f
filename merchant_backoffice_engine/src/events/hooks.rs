use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{EventHandler, EventProducer, Handler, NegativeBalanceEvent, ReserveReleasedEvent};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub negative_balance_producers: Vec<EventProducer<NegativeBalanceEvent>>,
    pub reserve_released_producers: Vec<EventProducer<ReserveReleasedEvent>>,
}

pub struct EventHandlers {
    pub on_negative_balance: Option<EventHandler<NegativeBalanceEvent>>,
    pub on_reserve_released: Option<EventHandler<ReserveReleasedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_negative_balance = hooks.on_negative_balance.map(|f| EventHandler::new(buffer_size, f));
        let on_reserve_released = hooks.on_reserve_released.map(|f| EventHandler::new(buffer_size, f));
        Self { on_negative_balance, on_reserve_released }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_negative_balance {
            result.negative_balance_producers.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_reserve_released {
            result.reserve_released_producers.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_negative_balance {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_reserve_released {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_negative_balance: Option<Handler<NegativeBalanceEvent>>,
    pub on_reserve_released: Option<Handler<ReserveReleasedEvent>>,
}

impl EventHooks {
    pub fn on_negative_balance<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(NegativeBalanceEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_negative_balance = Some(Arc::new(f));
        self
    }

    pub fn on_reserve_released<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(ReserveReleasedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_reserve_released = Some(Arc::new(f));
        self
    }
}
