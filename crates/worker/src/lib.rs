//! Offline cache router for the MisFigus web app.
//!
//! [`RequestRouter`] owns the worker lifecycle (install, activate, messages)
//! and answers fetch events by classifying each request against a
//! [`RouteTable`] and running the matching [`Strategy`]. The [`adapter`]
//! module drives a router from a JSON-lines event stream.

pub mod adapter;
mod background;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod message;
pub mod router;
pub mod routes;
mod strategy;

#[cfg(test)]
mod testing;

pub use adapter::{Adapter, ClientsHandle, Event, Reply};
pub use config::RouterConfig;
pub use error::AdapterError;
pub use lifecycle::{ActivationReport, ClientControl, InstallReport, LifecycleState, NoClients};
pub use message::WorkerMessage;
pub use router::{FetchOutcome, RequestRouter};
pub use routes::{RouteTable, Strategy};
