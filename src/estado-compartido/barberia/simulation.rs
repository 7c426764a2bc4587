//! Arma la barbería, lanza un hilo por barbero y por cliente y espera a todos.

use crate::barber::{Barber, BarberSummary};
use crate::client::{Client, ClientSummary};
use crate::config::{ConfigError, ShopConfig};
use crate::observer::Observer;
use crate::shop::{BarberShop, ShopStats};
use rand::thread_rng;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, RecvError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Error, Debug)]
pub enum SimulationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("{role} {id} aborted")]
    WorkerPanicked { role: &'static str, id: usize },

    #[error("worker threads ended without reporting")]
    Disconnected(#[from] RecvError),
}

// lo que manda cada hilo al terminar, bien o mal
enum Exit {
    Barber(BarberSummary),
    Client(ClientSummary),
    Panicked { role: &'static str, id: usize },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimulationReport {
    pub barbers: Vec<BarberSummary>,
    pub clients: Vec<ClientSummary>,
    pub stats: ShopStats,
}

impl SimulationReport {
    pub fn services(&self) -> usize {
        self.barbers.iter().map(BarberSummary::services).sum()
    }

    pub fn requests_fulfilled(&self) -> usize {
        self.clients.iter().map(|client| client.requests_fulfilled).sum()
    }
}

pub struct Simulation {
    config: Arc<ShopConfig>,
    observer: Arc<dyn Observer>,
}

impl Simulation {
    pub fn new(config: ShopConfig, observer: Arc<dyn Observer>) -> Self {
        Simulation { config: Arc::new(config), observer }
    }

    /// Corre la simulación completa. Si algún hilo rompe un contrato la
    /// simulación termina ahí con `WorkerPanicked`, sin esperar a los demás:
    /// los que quedaron bloqueados con él no van a volver nunca.
    pub fn run(self) -> Result<SimulationReport, SimulationError> {
        self.config.validate()?;
        let shop = Arc::new(BarberShop::new(&self.config));
        let (exits_tx, exits) = mpsc::channel();

        let barbers_handle: Vec<JoinHandle<()>> = (1..=self.config.num_barbers)
            .map(|id| {
                let barber = Barber::new(id, shop.clone(), self.config.clone(), self.observer.clone());
                spawn_worker("barber", id, &exits_tx, move || Exit::Barber(barber.life()))
            })
            .collect::<Result<_, _>>()?;

        let mut rng = thread_rng();
        let clients_handle: Vec<JoinHandle<()>> = (1..=self.config.num_clients)
            .map(|id| {
                let trips = self.config.barber_shop_trips.sample(&mut rng) as usize;
                let client = Client::new(id, trips, shop.clone(), self.config.clone(), self.observer.clone());
                spawn_worker("client", id, &exits_tx, move || Exit::Client(client.life()))
            })
            .collect::<Result<_, _>>()?;
        drop(exits_tx);
        info!(barbers = barbers_handle.len(), clients = clients_handle.len(), "simulation started");

        let mut barbers = Vec::with_capacity(self.config.num_barbers);
        let mut clients = Vec::with_capacity(self.config.num_clients);

        // los barberos solo terminan cuando ya no puede llegar nadie
        while clients.len() < self.config.num_clients {
            collect_exit(&exits, &mut barbers, &mut clients)?;
        }
        debug!("every client finished its trips");
        shop.close();
        while barbers.len() < self.config.num_barbers {
            collect_exit(&exits, &mut barbers, &mut clients)?;
        }

        // todos avisaron que terminaron, así que ningún join se queda esperando
        join_all(clients_handle, "client")?;
        join_all(barbers_handle, "barber")?;

        barbers.sort_by_key(|barber| barber.id);
        clients.sort_by_key(|client| client.id);
        let report = SimulationReport { barbers, clients, stats: shop.stats() };
        info!(services = report.services(), stats = ?report.stats, "simulation finished");
        Ok(report)
    }
}

fn spawn_worker<F>(role: &'static str, id: usize, exits: &Sender<Exit>, life: F) -> std::io::Result<JoinHandle<()>>
where
    F: FnOnce() -> Exit + Send + 'static,
{
    let exits = exits.clone();
    thread::Builder::new().name(format!("{}-{}", role, id)).spawn(move || {
        let exit = panic::catch_unwind(AssertUnwindSafe(life)).unwrap_or(Exit::Panicked { role, id });
        // si el driver ya se fue por otra falla nadie escucha
        let _ = exits.send(exit);
    })
}

fn collect_exit(
    exits: &Receiver<Exit>,
    barbers: &mut Vec<BarberSummary>,
    clients: &mut Vec<ClientSummary>,
) -> Result<(), SimulationError> {
    match exits.recv()? {
        Exit::Barber(summary) => barbers.push(summary),
        Exit::Client(summary) => clients.push(summary),
        Exit::Panicked { role, id } => {
            error!(role, id, "worker aborted, stopping the simulation");
            return Err(SimulationError::WorkerPanicked { role, id });
        }
    }
    Ok(())
}

fn join_all(handles: Vec<JoinHandle<()>>, role: &'static str) -> Result<(), SimulationError> {
    for (index, handle) in handles.into_iter().enumerate() {
        handle.join().map_err(|_| SimulationError::WorkerPanicked { role, id: index + 1 })?;
    }
    Ok(())
}
