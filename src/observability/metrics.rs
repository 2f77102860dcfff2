use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub store_writes_total: IntCounterVec,
    pub open_orders: IntGauge,
    pub ws_clients: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let store_writes_total = IntCounterVec::new(
            Opts::new("store_writes_total", "Store mutations by entity and op"),
            &["entity", "op"],
        )
        .expect("valid store_writes_total metric");

        let open_orders = IntGauge::new("open_orders", "Orders currently in searching status")
            .expect("valid open_orders metric");

        let ws_clients = IntGauge::new("ws_clients", "Connected websocket subscribers")
            .expect("valid ws_clients metric");

        registry
            .register(Box::new(store_writes_total.clone()))
            .expect("register store_writes_total");
        registry
            .register(Box::new(open_orders.clone()))
            .expect("register open_orders");
        registry
            .register(Box::new(ws_clients.clone()))
            .expect("register ws_clients");

        Self {
            registry,
            store_writes_total,
            open_orders,
            ws_clients,
        }
    }

    pub fn record_write(&self, entity: &str, op: &str) {
        self.store_writes_total.with_label_values(&[entity, op]).inc();
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
