//! Dispatcher core: admission, execution and shutdown.
//!
//! The public entry point is [`Dispatcher`], built through [`DispatcherBuilder`].
//!
//! Internal modules:
//! - `dispatcher`: admission gate, slot pool, batch fan-out, drained close;
//! - `worker`: runs one task (slot wait, retries, slot release, outcome event);
//! - `batch`: collects batch results into input order;
//! - `lifecycle`: Open/Closing/Closed state and outstanding-work tracking;
//! - `result`: result receivers and batch streams.

mod batch;
mod builder;
mod dispatcher;
mod lifecycle;
mod result;
mod worker;

pub use builder::DispatcherBuilder;
pub use dispatcher::Dispatcher;
pub use lifecycle::DispatcherState;
pub use result::{AsyncResult, BatchStream, ResultReceiver};
