// Ingestion buffers, per-message dispatch and order submission
pub mod dispatcher;
pub mod order_gateway;
pub mod pair_buffer;
pub mod supervisor;

pub use dispatcher::{DispatchStats, Outcome, SignalDispatcher};
pub use order_gateway::{
    order_channel, DryRunGateway, HttpOrderGateway, OrderGateway, OrderSender, OrderStats,
    OrderWorker,
};
pub use pair_buffer::{PairBook, PairBuffer};
pub use supervisor::supervise;
