//! Gancho de reporte: barberos y clientes avisan acá después de cada paso que
//! cambia su estado. Cómo se muestra eso no es asunto de la barbería.

use crate::barber::BarberState;
use crate::client::ClientState;
use crate::signals::lock;
use std::fmt;
use std::sync::Mutex;
use tracing::info;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerState {
    Barber(BarberState),
    Client(ClientState),
}

impl WorkerState {
    pub fn label(&self) -> &'static str {
        match self {
            WorkerState::Barber(state) => state.label(),
            WorkerState::Client(state) => state.label(),
        }
    }

    fn role(&self) -> &'static str {
        match self {
            WorkerState::Barber(_) => "barber",
            WorkerState::Client(_) => "client",
        }
    }
}

/// Foto de un barbero o un cliente en un instante.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub id: usize,
    pub state: WorkerState,
    // cliente del barbero o barbero del cliente
    pub peer: Option<usize>,
    // herramientas del barbero ("SC-") o pedidos del cliente ("H:S")
    pub flags: String,
    pub position: Option<usize>,
    // (banco, asiento) mientras el cliente espera su turno
    pub bench: Option<(usize, usize)>,
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (me, other) = match self.state {
            WorkerState::Barber(_) => ('B', 'C'),
            WorkerState::Client(_) => ('C', 'B'),
        };
        write!(f, "|{}{:02}|", me, self.id)?;
        match self.peer {
            Some(peer) => write!(f, "{}{:02}|", other, peer)?,
            None => write!(f, "{}--|", other)?,
        }
        write!(f, "{}|{}|", self.flags, self.state.label())?;
        // las posiciones se muestran desde 1
        match (self.position, self.bench) {
            (Some(position), _) => write!(f, "{}|", position + 1),
            (None, Some((bench, seat))) => write!(f, "{}:{}|", bench + 1, seat + 1),
            (None, None) => write!(f, "-|"),
        }
    }
}

pub trait Observer: Send + Sync {
    fn report(&self, snapshot: &Snapshot);
}

/// Manda cada foto como un evento de tracing.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn report(&self, snapshot: &Snapshot) {
        info!(
            target: "barberia::board",
            role = snapshot.state.role(),
            id = snapshot.id,
            state = snapshot.state.label().trim_end(),
            peer = ?snapshot.peer,
            flags = %snapshot.flags,
            position = ?snapshot.position,
            bench = ?snapshot.bench,
            "{}",
            snapshot
        );
    }
}

/// Guarda todas las fotos en memoria, en el orden en que llegan.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    snapshots: Mutex<Vec<Snapshot>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshots(&self) -> Vec<Snapshot> {
        lock(&self.snapshots).clone()
    }

    pub fn of_barber(&self, id: usize) -> Vec<BarberState> {
        lock(&self.snapshots)
            .iter()
            .filter_map(|snapshot| match snapshot.state {
                WorkerState::Barber(state) if snapshot.id == id => Some(state),
                _ => None,
            })
            .collect()
    }

    pub fn of_client(&self, id: usize) -> Vec<ClientState> {
        lock(&self.snapshots)
            .iter()
            .filter_map(|snapshot| match snapshot.state {
                WorkerState::Client(state) if snapshot.id == id => Some(state),
                _ => None,
            })
            .collect()
    }
}

impl Observer for RecordingObserver {
    fn report(&self, snapshot: &Snapshot) {
        lock(&self.snapshots).push(snapshot.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_renders_like_the_board() {
        let snapshot = Snapshot {
            id: 3,
            state: WorkerState::Barber(BarberState::Cutting),
            peer: Some(12),
            flags: "SC-".to_string(),
            position: Some(0),
            bench: None,
        };
        assert_eq!(snapshot.to_string(), "|B03|C12|SC-|CUTTING  |1|");

        let waiting = Snapshot {
            id: 4,
            state: WorkerState::Client(ClientState::Wandering),
            peer: None,
            flags: ":::".to_string(),
            position: None,
            bench: None,
        };
        assert_eq!(waiting.to_string(), "|C04|B--|:::|WANDERING|-|");

        let seated = Snapshot {
            id: 7,
            state: WorkerState::Client(ClientState::WaitingItsTurn),
            peer: None,
            flags: "H::".to_string(),
            position: None,
            bench: Some((1, 2)),
        };
        assert_eq!(seated.to_string(), "|C07|B--|H::|Wait TURN|2:3|");
    }

    #[test]
    fn recorder_filters_by_worker() {
        let recorder = RecordingObserver::new();
        for (id, state) in [(1, BarberState::WaitingClients), (2, BarberState::Idle), (1, BarberState::Done)] {
            recorder.report(&Snapshot {
                id,
                state: WorkerState::Barber(state),
                peer: None,
                flags: "---".to_string(),
                position: None,
                bench: None,
            });
        }
        assert_eq!(recorder.of_barber(1), vec![BarberState::WaitingClients, BarberState::Done]);
        assert!(recorder.of_client(1).is_empty());
        assert_eq!(recorder.snapshots().len(), 3);
    }
}
