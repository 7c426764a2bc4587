//! Simulación de una barbería con barberos y clientes como hilos que compiten
//! por bancos, sillas, lavatorios y herramientas.

pub mod barber;
pub mod client;
pub mod config;
pub mod logging;
pub mod observer;
pub mod pools;
pub mod requests;
pub mod service;
pub mod shop;
pub mod signals;
pub mod simulation;

// los ids empiezan en 1
pub type BarberId = usize;
pub type ClientId = usize;

pub use barber::{Barber, BarberState, BarberSummary};
pub use client::{Client, ClientState, ClientSummary};
pub use config::{Command, ConfigError, Interval, ShopConfig};
pub use logging::init_tracing;
pub use observer::{Observer, RecordingObserver, Snapshot, TracingObserver, WorkerState};
pub use requests::{Request, RequestSet, ServiceWeights, Tool, ToolSet};
pub use service::{Service, Workplace};
pub use shop::{BarberShop, ShopStats};
pub use simulation::{Simulation, SimulationError, SimulationReport};
