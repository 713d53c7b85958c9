use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    CashCollectedEvent,
    ConfirmationCodeIssuedEvent,
    EventHandler,
    EventProducer,
    Handler,
    OrderDeliveredEvent,
};

type HookFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_delivered_producer: Vec<EventProducer<OrderDeliveredEvent>>,
    pub cash_collected_producer: Vec<EventProducer<CashCollectedEvent>>,
    pub code_issued_producer: Vec<EventProducer<ConfirmationCodeIssuedEvent>>,
}

impl EventProducers {
    pub async fn publish_order_delivered(&self, event: OrderDeliveredEvent) {
        for producer in &self.order_delivered_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_cash_collected(&self, event: CashCollectedEvent) {
        for producer in &self.cash_collected_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_code_issued(&self, event: ConfirmationCodeIssuedEvent) {
        for producer in &self.code_issued_producer {
            producer.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_order_delivered: Option<EventHandler<OrderDeliveredEvent>>,
    pub on_cash_collected: Option<EventHandler<CashCollectedEvent>>,
    pub on_code_issued: Option<EventHandler<ConfirmationCodeIssuedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_delivered = hooks.on_order_delivered.map(|f| EventHandler::new(buffer_size, f));
        let on_cash_collected = hooks.on_cash_collected.map(|f| EventHandler::new(buffer_size, f));
        let on_code_issued = hooks.on_code_issued.map(|f| EventHandler::new(buffer_size, f));
        Self { on_order_delivered, on_cash_collected, on_code_issued }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_delivered {
            result.order_delivered_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_cash_collected {
            result.cash_collected_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_code_issued {
            result.code_issued_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_order_delivered {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_cash_collected {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_code_issued {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_delivered: Option<Handler<OrderDeliveredEvent>>,
    pub on_cash_collected: Option<Handler<CashCollectedEvent>>,
    pub on_code_issued: Option<Handler<ConfirmationCodeIssuedEvent>>,
}

impl EventHooks {
    pub fn on_order_delivered<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderDeliveredEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_order_delivered = Some(Arc::new(f));
        self
    }

    pub fn on_cash_collected<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(CashCollectedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_cash_collected = Some(Arc::new(f));
        self
    }

    pub fn on_code_issued<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(ConfirmationCodeIssuedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_code_issued = Some(Arc::new(f));
        self
    }
}
