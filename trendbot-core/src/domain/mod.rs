//! Domain types: bars, indicator snapshots, signals, orders, fills,
//! positions, instruments, and account state.

pub mod account;
pub mod bar;
pub mod fill;
pub mod instrument;
pub mod order;
pub mod position;
pub mod signal;
pub mod snapshot;

pub use account::AccountState;
pub use bar::Bar;
pub use fill::Fill;
pub use instrument::Instrument;
pub use order::{ClientOrderId, IdGen, OrderRequest, OrderSide, OrderType};
pub use position::Position;
pub use signal::{Side, Signal, SignalKind};
pub use snapshot::IndicatorSnapshot;
