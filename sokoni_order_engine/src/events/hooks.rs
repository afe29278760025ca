use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    DisputeOpenedEvent, EscrowReleasedEvent, EventHandler, EventProducer, Handler, OrderDeliveredEvent, OrderPaidEvent,
};

/// The producer handles the component APIs publish on. Cloneable; an empty
/// producer set turns every publish into a no-op.
#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_paid_producer: Vec<EventProducer<OrderPaidEvent>>,
    pub order_delivered_producer: Vec<EventProducer<OrderDeliveredEvent>>,
    pub escrow_released_producer: Vec<EventProducer<EscrowReleasedEvent>>,
    pub dispute_opened_producer: Vec<EventProducer<DisputeOpenedEvent>>,
}

pub struct EventHandlers {
    pub on_order_paid: Option<EventHandler<OrderPaidEvent>>,
    pub on_order_delivered: Option<EventHandler<OrderDeliveredEvent>>,
    pub on_escrow_released: Option<EventHandler<EscrowReleasedEvent>>,
    pub on_dispute_opened: Option<EventHandler<DisputeOpenedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_paid = hooks.on_order_paid.map(|f| EventHandler::new(buffer_size, f));
        let on_order_delivered = hooks.on_order_delivered.map(|f| EventHandler::new(buffer_size, f));
        let on_escrow_released = hooks.on_escrow_released.map(|f| EventHandler::new(buffer_size, f));
        let on_dispute_opened = hooks.on_dispute_opened.map(|f| EventHandler::new(buffer_size, f));
        Self { on_order_paid, on_order_delivered, on_escrow_released, on_dispute_opened }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_paid {
            result.order_paid_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_delivered {
            result.order_delivered_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_escrow_released {
            result.escrow_released_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_dispute_opened {
            result.dispute_opened_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_order_paid {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_order_delivered {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_escrow_released {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_dispute_opened {
            tokio::spawn(handler.start_handler());
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_paid: Option<Handler<OrderPaidEvent>>,
    pub on_order_delivered: Option<Handler<OrderDeliveredEvent>>,
    pub on_escrow_released: Option<Handler<EscrowReleasedEvent>>,
    pub on_dispute_opened: Option<Handler<DisputeOpenedEvent>>,
}

impl EventHooks {
    pub fn on_order_paid<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderPaidEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_paid = Some(Arc::new(f));
        self
    }

    pub fn on_order_delivered<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderDeliveredEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_delivered = Some(Arc::new(f));
        self
    }

    pub fn on_escrow_released<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(EscrowReleasedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_escrow_released = Some(Arc::new(f));
        self
    }

    pub fn on_dispute_opened<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(DisputeOpenedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_dispute_opened = Some(Arc::new(f));
        self
    }
}
