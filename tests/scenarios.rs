//! Escenarios completos: barberos y clientes corriendo en hilos de verdad.

use barberia::{
    BarberState, ClientState, ConfigError, Interval, Observer, RecordingObserver, ShopConfig, Simulation,
    SimulationError, Snapshot, WorkerState,
};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

fn quick_config() -> ShopConfig {
    ShopConfig {
        vitality_time_units: Interval::new(1, 1),
        outside_time_units: Interval::new(1, 1),
        work_time_units: Interval::new(1, 3),
        barber_shop_trips: Interval::new(1, 1),
        time_unit: Duration::from_millis(1),
        ..ShopConfig::default()
    }
}

// los estados esperados aparecen en ese orden (no necesariamente seguidos)
fn appear_in_order<T: PartialEq>(seen: &[T], expected: &[T]) -> bool {
    let mut seen = seen.iter();
    expected.iter().all(|state| seen.any(|s| s == state))
}

#[test]
fn single_haircut_for_a_single_client() {
    let config = ShopConfig {
        num_barbers: 1,
        num_clients: 1,
        prob_haircut: 100,
        prob_wash_hair: 0,
        prob_shave: 0,
        ..quick_config()
    };
    let observer = Arc::new(RecordingObserver::new());
    let report = Simulation::new(config, observer.clone()).run().unwrap();

    assert_eq!(report.barbers[0].haircuts, 1);
    assert_eq!(report.barbers[0].services(), 1);
    assert_eq!(report.barbers[0].clients_served, 1);
    assert_eq!(report.clients[0].trips, 1);
    assert_eq!(report.clients[0].requests_fulfilled, 1);

    let barber = observer.of_barber(1);
    assert!(appear_in_order(
        &barber,
        &[
            BarberState::Idle,
            BarberState::WaitingClients,
            BarberState::WaitingChair,
            BarberState::WaitingClientSeated,
            BarberState::ReqScissor,
            BarberState::ReqComb,
            BarberState::Cutting,
            BarberState::ReleasingTools,
            BarberState::ReleasingWorkplace,
            BarberState::AllRequestsDone,
        ]
    ));
    assert_eq!(barber.last(), Some(&BarberState::Done));

    let client = observer.of_client(1);
    assert!(appear_in_order(
        &client,
        &[
            ClientState::Wandering,
            ClientState::WaitingVacancy,
            ClientState::SelectingRequests,
            ClientState::WaitingItsTurn,
            ClientState::WaitingService,
            ClientState::WaitingServiceStart,
            ClientState::HavingHaircut,
            ClientState::Risen,
            ClientState::Leaving,
        ]
    ));
    assert_eq!(client.last(), Some(&ClientState::Done));
}

#[test]
fn third_haircut_waits_for_one_of_two_chairs() {
    let config = ShopConfig {
        num_barbers: 3,
        num_clients: 3,
        num_barber_chairs: 2,
        num_scissors: 3,
        num_combs: 3,
        num_client_bench_seats: 3,
        // cada corte dura bastante más de lo que tardan en llegar los tres
        work_time_units: Interval::new(1, 200),
        prob_haircut: 100,
        prob_wash_hair: 0,
        prob_shave: 0,
        ..quick_config()
    };
    let observer = Arc::new(RecordingObserver::new());
    let report = Simulation::new(config, observer.clone()).run().unwrap();

    assert_eq!(report.stats.peak_chairs, 2);
    assert_eq!(report.barbers.iter().map(|b| b.haircuts).sum::<usize>(), 3);
    assert!(report.clients.iter().all(|c| c.trips == 1 && c.requests_fulfilled == 1));

    // algún barbero se quedó en W SEAT hasta que otro soltó su silla
    let snapshots = observer.snapshots();
    let is_barber = |snapshot: &Snapshot, state: BarberState| snapshot.state == WorkerState::Barber(state);
    let waited_for_a_release = snapshots.iter().enumerate().any(|(i, waiting)| {
        if !is_barber(waiting, BarberState::WaitingChair) {
            return false;
        }
        let later = &snapshots[i + 1..];
        let resumed = later
            .iter()
            .position(|s| s.id == waiting.id && matches!(s.state, WorkerState::Barber(_)))
            .unwrap_or(later.len());
        later[..resumed].iter().any(|s| s.id != waiting.id && is_barber(s, BarberState::ReleasingWorkplace))
    });
    assert!(waited_for_a_release);
}

#[test]
fn busy_shop_keeps_every_bound_and_every_request() {
    let config = ShopConfig {
        num_barbers: 3,
        num_clients: 8,
        num_barber_chairs: 2,
        num_washbasins: 1,
        num_scissors: 1,
        num_combs: 1,
        num_razors: 1,
        num_client_bench_seats: 3,
        num_client_benches: 2,
        vitality_time_units: Interval::new(1, 2),
        outside_time_units: Interval::new(1, 10),
        work_time_units: Interval::new(1, 5),
        barber_shop_trips: Interval::new(1, 3),
        ..quick_config()
    };
    let observer = Arc::new(RecordingObserver::new());
    let report = Simulation::new(config, observer.clone()).run().unwrap();

    let stats = report.stats;
    assert!(stats.peak_chairs <= 2);
    assert!(stats.peak_basins <= 1);
    assert!(stats.peak_scissors <= 1 && stats.peak_combs <= 1 && stats.peak_razors <= 1);
    assert!(stats.peak_client_bench <= 3);
    assert!(stats.peak_barber_bench <= 3);

    // lo que hicieron los barberos es exactamente lo que pidieron los clientes
    assert_eq!(report.services(), report.requests_fulfilled());
    assert_eq!(report.barbers.iter().map(|b| b.clients_served).sum::<usize>(), report.clients.iter().map(|c| c.trips).sum::<usize>());

    for client in &report.clients {
        assert!((1..=3).contains(&client.trips));
        assert_eq!(observer.of_client(client.id).last(), Some(&ClientState::Done));
    }
    for barber in &report.barbers {
        assert_eq!(observer.of_barber(barber.id).last(), Some(&BarberState::Done));
    }

    // tres asientos en dos bancos: dos por banco
    let seated: Vec<Snapshot> = observer.snapshots().into_iter().filter(|s| s.bench.is_some()).collect();
    for client in &report.clients {
        assert!(seated.iter().any(|s| s.id == client.id && matches!(s.state, WorkerState::Client(_))));
    }
    for snapshot in &seated {
        assert_eq!(snapshot.state, WorkerState::Client(ClientState::WaitingItsTurn));
        let (bench, seat) = snapshot.bench.unwrap();
        assert!(bench < 2 && seat < 2, "seat {:?} outside the benches", snapshot.bench);
    }
}

#[test]
fn clients_without_requests_still_come_and_go() {
    let config = ShopConfig {
        num_barbers: 1,
        num_clients: 2,
        prob_haircut: 0,
        prob_wash_hair: 0,
        prob_shave: 0,
        ..quick_config()
    };
    let report = Simulation::new(config, Arc::new(RecordingObserver::new())).run().unwrap();
    assert_eq!(report.services(), 0);
    assert_eq!(report.barbers[0].clients_served, 2);
    assert!(report.clients.iter().all(|c| c.trips == 1));
}

#[test]
fn invalid_config_never_starts() {
    let config = ShopConfig { num_barbers: 0, ..quick_config() };
    let result = Simulation::new(config, Arc::new(RecordingObserver::new())).run();
    assert!(matches!(
        result,
        Err(SimulationError::Config(ConfigError::InvalidCount { name: "number of barbers", value: 0 }))
    ));
}

// rompe un contrato en cuanto el barbero empieza a cortar
struct FailingScissors;

impl Observer for FailingScissors {
    fn report(&self, snapshot: &Snapshot) {
        if snapshot.state == WorkerState::Barber(BarberState::Cutting) {
            panic!("barber {} dropped the scissors", snapshot.id);
        }
    }
}

#[test]
fn a_failing_worker_stops_the_whole_simulation() {
    let config = ShopConfig {
        num_barbers: 1,
        num_clients: 1,
        prob_haircut: 100,
        prob_wash_hair: 0,
        prob_shave: 0,
        ..quick_config()
    };
    let (done_tx, done) = mpsc::channel();
    thread::spawn(move || {
        let result = Simulation::new(config, Arc::new(FailingScissors)).run();
        done_tx.send(result).unwrap();
    });

    // el cliente queda esperando al barbero para siempre, la simulación no
    let result = done.recv_timeout(Duration::from_secs(10)).expect("simulation still running after a worker failed");
    assert!(matches!(result, Err(SimulationError::WorkerPanicked { role: "barber", id: 1 })));
}
