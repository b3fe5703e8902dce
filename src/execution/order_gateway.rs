use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::{timeout, Duration};

use crate::error::OrderError;
use crate::models::{OrderAck, OrderRequest};

/// Boundary to whatever places the actual order
///
/// Failures are returned to the caller and never retried here.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    async fn submit_buy(&self, order: &OrderRequest) -> Result<OrderAck, OrderError>;
}

#[async_trait]
impl<G: OrderGateway + ?Sized> OrderGateway for Box<G> {
    async fn submit_buy(&self, order: &OrderRequest) -> Result<OrderAck, OrderError> {
        (**self).submit_buy(order).await
    }
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    #[serde(default)]
    status: Option<String>,
}

/// Posts buy orders as JSON to a signal endpoint
#[derive(Clone)]
pub struct HttpOrderGateway {
    client: Client,
    endpoint: String,
}

impl HttpOrderGateway {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl OrderGateway for HttpOrderGateway {
    async fn submit_buy(&self, order: &OrderRequest) -> Result<OrderAck, OrderError> {
        let response = self.client.post(&self.endpoint).json(order).send().await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(OrderError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let status = serde_json::from_str::<OrderResponse>(&body)
            .ok()
            .and_then(|r| r.status)
            .unwrap_or_else(|| "accepted".to_string());

        Ok(OrderAck {
            id: order.id,
            pair: order.pair.clone(),
            status,
        })
    }
}

/// Logs orders instead of sending them; used when no endpoint is configured
#[derive(Debug, Clone, Default)]
pub struct DryRunGateway;

#[async_trait]
impl OrderGateway for DryRunGateway {
    async fn submit_buy(&self, order: &OrderRequest) -> Result<OrderAck, OrderError> {
        tracing::info!(pair = %order.pair, order_id = %order.id, "Dry run: buy order not sent");
        Ok(OrderAck {
            id: order.id,
            pair: order.pair.clone(),
            status: "dry-run".to_string(),
        })
    }
}

/// Create the bounded queue between the dispatcher and the order worker
pub fn order_channel(capacity: usize) -> (OrderSender, mpsc::Receiver<OrderRequest>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (OrderSender { tx }, rx)
}

/// Non-blocking producer side of the order queue
#[derive(Debug, Clone)]
pub struct OrderSender {
    tx: mpsc::Sender<OrderRequest>,
}

impl OrderSender {
    /// Queue an order without waiting; a full or closed queue is an error
    pub fn enqueue(&self, order: OrderRequest) -> Result<(), OrderError> {
        self.tx.try_send(order).map_err(|e| match e {
            TrySendError::Full(_) => OrderError::QueueFull,
            TrySendError::Closed(_) => OrderError::QueueClosed,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderStats {
    pub submitted: u64,
    pub acknowledged: u64,
    pub failed: u64,
}

/// Drains the order queue and submits each order once
pub struct OrderWorker<G> {
    gateway: G,
    receiver: mpsc::Receiver<OrderRequest>,
    timeout: Duration,
}

impl<G: OrderGateway> OrderWorker<G> {
    /// # Arguments
    /// * `gateway` - Where orders go
    /// * `receiver` - Consumer half from [`order_channel`]
    /// * `timeout` - Upper bound for one submission
    pub fn new(gateway: G, receiver: mpsc::Receiver<OrderRequest>, timeout: Duration) -> Self {
        Self {
            gateway,
            receiver,
            timeout,
        }
    }

    /// Submit one order, bounded by the worker timeout
    pub async fn submit(&self, order: &OrderRequest) -> Result<OrderAck, OrderError> {
        timeout(self.timeout, self.gateway.submit_buy(order))
            .await
            .map_err(|_| OrderError::Timeout(self.timeout.as_millis() as u64))?
    }

    /// Run until every sender is dropped and the queue is empty
    pub async fn run(mut self) -> OrderStats {
        let mut stats = OrderStats::default();

        while let Some(order) = self.receiver.recv().await {
            stats.submitted += 1;

            match self.submit(&order).await {
                Ok(ack) => {
                    stats.acknowledged += 1;
                    tracing::info!(
                        pair = %ack.pair,
                        order_id = %ack.id,
                        status = %ack.status,
                        "Buy order acknowledged"
                    );
                }
                Err(e) => {
                    stats.failed += 1;
                    tracing::warn!(
                        pair = %order.pair,
                        order_id = %order.id,
                        error = %e,
                        "Buy order failed, not retrying"
                    );
                }
            }
        }

        tracing::info!(
            submitted = stats.submitted,
            acknowledged = stats.acknowledged,
            failed = stats.failed,
            "Order worker stopped"
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingGateway {
        pairs: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    #[async_trait]
    impl OrderGateway for RecordingGateway {
        async fn submit_buy(&self, order: &OrderRequest) -> Result<OrderAck, OrderError> {
            self.pairs.lock().unwrap().push(order.pair.clone());
            if self.fail {
                return Err(OrderError::Rejected {
                    status: 503,
                    body: "unavailable".to_string(),
                });
            }
            Ok(OrderAck {
                id: order.id,
                pair: order.pair.clone(),
                status: "ok".to_string(),
            })
        }
    }

    struct SlowGateway;

    #[async_trait]
    impl OrderGateway for SlowGateway {
        async fn submit_buy(&self, _order: &OrderRequest) -> Result<OrderAck, OrderError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Err(OrderError::QueueClosed)
        }
    }

    #[tokio::test]
    async fn test_http_gateway_posts_order() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/signals")
            .match_header("content-type", "application/json")
            .match_body(Matcher::PartialJson(json!({"pair": "BTC_USDT", "side": "buy"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":"queued"}"#)
            .create_async()
            .await;

        let gateway = HttpOrderGateway::new(format!("{}/signals", server.url()));
        let order = OrderRequest::buy("BTC_USDT");
        let ack = gateway.submit_buy(&order).await.unwrap();

        assert_eq!(ack.id, order.id);
        assert_eq!(ack.pair, "BTC_USDT");
        assert_eq!(ack.status, "queued");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_gateway_plain_body_is_accepted() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/signals")
            .with_status(201)
            .with_body("ok")
            .create_async()
            .await;

        let gateway = HttpOrderGateway::new(format!("{}/signals", server.url()));
        let ack = gateway.submit_buy(&OrderRequest::buy("ETH_USDT")).await.unwrap();

        assert_eq!(ack.status, "accepted");
    }

    #[tokio::test]
    async fn test_http_gateway_rejection() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/signals")
            .with_status(422)
            .with_body("unknown pair")
            .create_async()
            .await;

        let gateway = HttpOrderGateway::new(format!("{}/signals", server.url()));
        let result = gateway.submit_buy(&OrderRequest::buy("XXX_YYY")).await;

        match result {
            Err(OrderError::Rejected { status, body }) => {
                assert_eq!(status, 422);
                assert_eq!(body, "unknown pair");
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dry_run_acks() {
        let ack = DryRunGateway
            .submit_buy(&OrderRequest::buy("BTC_USDT"))
            .await
            .unwrap();
        assert_eq!(ack.status, "dry-run");
    }

    #[test]
    fn test_enqueue_full_queue() {
        let (sender, _rx) = order_channel(1);

        assert!(sender.enqueue(OrderRequest::buy("A")).is_ok());
        assert!(matches!(
            sender.enqueue(OrderRequest::buy("B")),
            Err(OrderError::QueueFull)
        ));
    }

    #[test]
    fn test_enqueue_closed_queue() {
        let (sender, rx) = order_channel(4);
        drop(rx);

        assert!(matches!(
            sender.enqueue(OrderRequest::buy("A")),
            Err(OrderError::QueueClosed)
        ));
    }

    #[tokio::test]
    async fn test_worker_submits_each_order_once() {
        let gateway = RecordingGateway::default();
        let (sender, rx) = order_channel(8);

        sender.enqueue(OrderRequest::buy("BTC_USDT")).unwrap();
        sender.enqueue(OrderRequest::buy("BTC_USDT")).unwrap();
        sender.enqueue(OrderRequest::buy("ETH_USDT")).unwrap();
        drop(sender);

        let stats = OrderWorker::new(gateway.clone(), rx, Duration::from_secs(1))
            .run()
            .await;

        assert_eq!(
            stats,
            OrderStats {
                submitted: 3,
                acknowledged: 3,
                failed: 0
            }
        );
        assert_eq!(
            *gateway.pairs.lock().unwrap(),
            vec!["BTC_USDT", "BTC_USDT", "ETH_USDT"]
        );
    }

    #[tokio::test]
    async fn test_worker_does_not_retry_failures() {
        let gateway = RecordingGateway {
            fail: true,
            ..Default::default()
        };
        let (sender, rx) = order_channel(8);
        sender.enqueue(OrderRequest::buy("BTC_USDT")).unwrap();
        drop(sender);

        let stats = OrderWorker::new(gateway.clone(), rx, Duration::from_secs(1))
            .run()
            .await;

        assert_eq!(stats.failed, 1);
        assert_eq!(gateway.pairs.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_worker_times_out_slow_gateway() {
        let (_sender, rx) = order_channel(1);
        let worker = OrderWorker::new(SlowGateway, rx, Duration::from_millis(20));

        let result = worker.submit(&OrderRequest::buy("BTC_USDT")).await;
        assert!(matches!(result, Err(OrderError::Timeout(20))));
    }
}
