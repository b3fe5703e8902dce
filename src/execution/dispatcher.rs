use chrono::Utc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::DispatchError;
use crate::execution::order_gateway::OrderSender;
use crate::execution::pair_buffer::PairBook;
use crate::feed::message::{parse_ticker, TickerUpdate};
use crate::frame::FrameBuilder;
use crate::models::{OrderRequest, Signal};
use crate::registry::PairRegistry;
use crate::strategy::SignalEvaluator;

/// Terminal state of one inbound message
#[derive(Debug)]
pub enum Outcome {
    /// Dropped before touching any buffer (malformed or unknown channel)
    Ignored(DispatchError),
    /// Buffered and evaluated; the signal needs no action
    NoAction { pair: String, signal: Signal },
    /// Buffered, evaluated to `Buy`, and a buy order was queued
    Dispatched { pair: String, order_id: Uuid },
    /// Buffered, evaluated to `Buy`, but the order could not be queued
    OrderFailed(DispatchError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub received: u64,
    pub malformed: u64,
    pub unknown_channel: u64,
    pub evaluated: u64,
    pub evaluation_errors: u64,
    pub buy_signals: u64,
    pub order_failures: u64,
}

/// Runs the per-message pipeline: resolve, buffer, build frame, evaluate, dispatch
///
/// The dispatcher is the only owner of the pair buffers and handles one message
/// at a time, so buffers need no locks. Buy orders are handed to the order queue
/// without waiting on the gateway.
pub struct SignalDispatcher<E> {
    registry: PairRegistry,
    book: PairBook,
    evaluator: E,
    orders: OrderSender,
    stats: DispatchStats,
}

impl<E: SignalEvaluator> SignalDispatcher<E> {
    pub fn new(registry: PairRegistry, book: PairBook, evaluator: E, orders: OrderSender) -> Self {
        Self {
            registry,
            book,
            evaluator,
            orders,
            stats: DispatchStats::default(),
        }
    }

    /// Process one raw text frame from the feed
    pub fn handle_message(&mut self, raw: &str) -> Outcome {
        self.stats.received += 1;

        match parse_ticker(raw) {
            Ok(update) => self.handle_update(update),
            Err(e) => {
                self.stats.malformed += 1;
                tracing::debug!(error = %e, "Ignoring non-ticker message");
                Outcome::Ignored(DispatchError::MalformedMessage(e))
            }
        }
    }

    /// Process an already classified ticker update
    pub fn handle_update(&mut self, update: TickerUpdate) -> Outcome {
        let channel = update.channel;
        let Some(pair) = self.registry.resolve(channel).map(str::to_string) else {
            self.stats.unknown_channel += 1;
            tracing::trace!(channel, "Ignoring untracked channel");
            return Outcome::Ignored(DispatchError::UnknownChannel(channel));
        };

        let record = update.into_record(Utc::now());
        let Some(buffer) = self.book.append(&pair, record) else {
            // Registry and book are built from the same pairs
            self.stats.unknown_channel += 1;
            tracing::warn!(channel, pair = %pair, "Resolved pair has no buffer");
            return Outcome::Ignored(DispatchError::UnknownChannel(channel));
        };

        let frame = FrameBuilder::build(&buffer.snapshot());
        let rows = frame.len();

        let signal = match self.evaluator.evaluate(&frame) {
            Ok(signal) => signal,
            Err(source) => {
                self.stats.evaluation_errors += 1;
                let err = DispatchError::DecisionFunction {
                    pair: pair.clone(),
                    source,
                };
                tracing::warn!(error = %err, "Treating failed evaluation as no signal");
                Signal::NoSignal
            }
        };
        self.stats.evaluated += 1;

        tracing::debug!(
            pair = %pair,
            rows,
            signal = %signal,
            strategy = self.evaluator.name(),
            "Evaluated frame"
        );

        // Only buys are acted on; sells are not supported downstream
        match signal {
            Signal::Buy => self.dispatch_buy(pair),
            Signal::Sell | Signal::NoSignal => Outcome::NoAction { pair, signal },
        }
    }

    fn dispatch_buy(&mut self, pair: String) -> Outcome {
        self.stats.buy_signals += 1;
        let order = OrderRequest::buy(pair.clone());
        let order_id = order.id;

        match self.orders.enqueue(order) {
            Ok(()) => {
                tracing::info!(pair = %pair, order_id = %order_id, "Buy signal, order queued");
                Outcome::Dispatched { pair, order_id }
            }
            Err(source) => {
                self.stats.order_failures += 1;
                let err = DispatchError::OrderSubmission { pair, source };
                tracing::error!(error = %err, "Buy signal dropped");
                Outcome::OrderFailed(err)
            }
        }
    }

    /// Consume messages in arrival order until the feed side closes the queue
    pub async fn run(mut self, mut messages: mpsc::Receiver<String>) -> DispatchStats {
        while let Some(raw) = messages.recv().await {
            self.handle_message(&raw);
        }

        tracing::info!(
            received = self.stats.received,
            evaluated = self.stats.evaluated,
            buy_signals = self.stats.buy_signals,
            "Message queue closed, dispatcher stopped"
        );
        self.stats
    }

    pub fn book(&self) -> &PairBook {
        &self.book
    }

    pub fn registry(&self) -> &PairRegistry {
        &self.registry
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EvaluationError, OrderError};
    use crate::execution::order_gateway::order_channel;
    use crate::frame::Frame;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    const BTC_TICK: &str = "[5, [5, 100.0, 99.5, 100.5, 0.01, 10.0, 1000.0, 0, 101.0, 99.0]]";

    /// Returns a fixed answer and remembers the row count of every frame it saw
    struct FixedEvaluator {
        answer: Result<Signal, EvaluationError>,
        seen_rows: Arc<Mutex<Vec<usize>>>,
    }

    impl FixedEvaluator {
        fn new(answer: Result<Signal, EvaluationError>) -> Self {
            Self {
                answer,
                seen_rows: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl SignalEvaluator for FixedEvaluator {
        fn evaluate(&self, frame: &Frame) -> Result<Signal, EvaluationError> {
            self.seen_rows.lock().unwrap().push(frame.len());
            self.answer.clone()
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct CountingEvaluator(Arc<AtomicUsize>);

    impl SignalEvaluator for CountingEvaluator {
        fn evaluate(&self, _frame: &Frame) -> Result<Signal, EvaluationError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(Signal::NoSignal)
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    fn dispatcher<E: SignalEvaluator>(
        evaluator: E,
        capacity: usize,
    ) -> (SignalDispatcher<E>, mpsc::Receiver<OrderRequest>) {
        let registry = PairRegistry::new(HashMap::from([
            (5, "BTC_USDT".to_string()),
            (14, "ETH_USDT".to_string()),
        ]))
        .unwrap();
        let book = PairBook::new(&registry, capacity).unwrap();
        let (orders, rx) = order_channel(16);
        (SignalDispatcher::new(registry, book, evaluator, orders), rx)
    }

    #[test]
    fn test_buy_queues_one_order() {
        let (mut dispatcher, mut rx) = dispatcher(FixedEvaluator::new(Ok(Signal::Buy)), 10);

        let outcome = dispatcher.handle_message(BTC_TICK);

        assert!(matches!(outcome, Outcome::Dispatched { ref pair, .. } if pair == "BTC_USDT"));
        let order = rx.try_recv().unwrap();
        assert_eq!(order.pair, "BTC_USDT");
        assert!(rx.try_recv().is_err());
        assert_eq!(dispatcher.stats().buy_signals, 1);
    }

    #[test]
    fn test_sell_and_no_signal_queue_nothing() {
        for signal in [Signal::Sell, Signal::NoSignal] {
            let (mut dispatcher, mut rx) = dispatcher(FixedEvaluator::new(Ok(signal)), 10);

            let outcome = dispatcher.handle_message(BTC_TICK);

            assert!(matches!(outcome, Outcome::NoAction { signal: s, .. } if s == signal));
            assert!(rx.try_recv().is_err());
            assert_eq!(dispatcher.book().record_count("BTC_USDT"), 1);
        }
    }

    #[test]
    fn test_repeated_buys_are_not_deduplicated() {
        let (mut dispatcher, mut rx) = dispatcher(FixedEvaluator::new(Ok(Signal::Buy)), 10);

        for _ in 0..3 {
            dispatcher.handle_message(BTC_TICK);
        }

        let mut count = 0;
        while rx.try_recv().is_ok() {
            count += 1;
        }
        assert_eq!(count, 3);
    }

    #[test]
    fn test_unknown_channel_touches_nothing() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (mut dispatcher, mut rx) = dispatcher(CountingEvaluator(calls.clone()), 10);

        let outcome = dispatcher.handle_message(
            "[999, [999, 100.0, 99.5, 100.5, 0.01, 10.0, 1000.0, 0, 101.0, 99.0]]",
        );

        assert!(matches!(
            outcome,
            Outcome::Ignored(DispatchError::UnknownChannel(999))
        ));
        assert_eq!(dispatcher.book().total_records(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_malformed_message_touches_nothing() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (mut dispatcher, _rx) = dispatcher(CountingEvaluator(calls.clone()), 10);

        for raw in ["[1010]", "[1002,1]", "garbage", "[5, [5, 1.0]]"] {
            let outcome = dispatcher.handle_message(raw);
            assert!(matches!(
                outcome,
                Outcome::Ignored(DispatchError::MalformedMessage(_))
            ));
        }

        assert_eq!(dispatcher.book().total_records(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(dispatcher.stats().malformed, 4);
    }

    #[test]
    fn test_evaluator_error_is_no_signal() {
        let (mut dispatcher, mut rx) = dispatcher(
            FixedEvaluator::new(Err(EvaluationError::Failed("boom".to_string()))),
            10,
        );

        let outcome = dispatcher.handle_message(BTC_TICK);

        assert!(matches!(
            outcome,
            Outcome::NoAction {
                signal: Signal::NoSignal,
                ..
            }
        ));
        assert!(rx.try_recv().is_err());
        assert_eq!(dispatcher.stats().evaluation_errors, 1);
        // The record is still buffered
        assert_eq!(dispatcher.book().record_count("BTC_USDT"), 1);
    }

    #[test]
    fn test_frame_reflects_bounded_buffer() {
        let evaluator = FixedEvaluator::new(Ok(Signal::NoSignal));
        let seen = evaluator.seen_rows.clone();
        let (mut dispatcher, _rx) = dispatcher(evaluator, 3);

        for _ in 0..5 {
            dispatcher.handle_message(BTC_TICK);
        }

        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3, 3, 3]);
    }

    #[test]
    fn test_pairs_buffer_independently() {
        let (mut dispatcher, _rx) = dispatcher(FixedEvaluator::new(Ok(Signal::NoSignal)), 10);

        dispatcher.handle_message(BTC_TICK);
        dispatcher.handle_message(BTC_TICK);
        dispatcher.handle_message(
            r#"[1002,null,[14,"2000.0","1999.0","2001.0","0.02","5.0","10000.0","0","2010.0","1990.0"]]"#,
        );

        assert_eq!(dispatcher.book().record_count("BTC_USDT"), 2);
        assert_eq!(dispatcher.book().record_count("ETH_USDT"), 1);
    }

    #[test]
    fn test_full_order_queue_is_reported() {
        let registry = PairRegistry::new(HashMap::from([(5, "BTC_USDT".to_string())])).unwrap();
        let book = PairBook::new(&registry, 10).unwrap();
        let (orders, _rx) = order_channel(1);
        let mut dispatcher = SignalDispatcher::new(
            registry,
            book,
            FixedEvaluator::new(Ok(Signal::Buy)),
            orders,
        );

        assert!(matches!(
            dispatcher.handle_message(BTC_TICK),
            Outcome::Dispatched { .. }
        ));
        let outcome = dispatcher.handle_message(BTC_TICK);

        assert!(matches!(
            outcome,
            Outcome::OrderFailed(DispatchError::OrderSubmission {
                source: OrderError::QueueFull,
                ..
            })
        ));
        assert_eq!(dispatcher.stats().order_failures, 1);
    }

    #[tokio::test]
    async fn test_run_processes_in_order_until_closed() {
        let evaluator = FixedEvaluator::new(Ok(Signal::NoSignal));
        let seen = evaluator.seen_rows.clone();
        let (dispatcher, _orders) = dispatcher(evaluator, 10);
        let (tx, rx) = mpsc::channel(8);

        tx.send(BTC_TICK.to_string()).await.unwrap();
        tx.send("[1010]".to_string()).await.unwrap();
        tx.send(BTC_TICK.to_string()).await.unwrap();
        drop(tx);

        let stats = dispatcher.run(rx).await;

        assert_eq!(stats.received, 3);
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.evaluated, 2);
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }
}
