use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{EventHandler, EventProducer, Handler, PurchaseAnnulledEvent, PurchasePaidEvent};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub purchase_paid_producer: Vec<EventProducer<PurchasePaidEvent>>,
    pub purchase_annulled_producer: Vec<EventProducer<PurchaseAnnulledEvent>>,
}

pub struct EventHandlers {
    pub on_purchase_paid: Option<EventHandler<PurchasePaidEvent>>,
    pub on_purchase_annulled: Option<EventHandler<PurchaseAnnulledEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_purchase_paid = hooks.on_purchase_paid.map(|f| EventHandler::new(buffer_size, f));
        let on_purchase_annulled = hooks.on_purchase_annulled.map(|f| EventHandler::new(buffer_size, f));
        Self { on_purchase_paid, on_purchase_annulled }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_purchase_paid {
            result.purchase_paid_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_purchase_annulled {
            result.purchase_annulled_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_purchase_paid {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_purchase_annulled {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_purchase_paid: Option<Handler<PurchasePaidEvent>>,
    pub on_purchase_annulled: Option<Handler<PurchaseAnnulledEvent>>,
}

impl EventHooks {
    pub fn on_purchase_paid<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PurchasePaidEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_purchase_paid = Some(Arc::new(f));
        self
    }

    pub fn on_purchase_annulled<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PurchaseAnnulledEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_purchase_annulled = Some(Arc::new(f));
        self
    }
}
