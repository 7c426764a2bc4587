extern crate barberia;

use barberia::{init_tracing, Command, ShopConfig, Simulation, SimulationError, TracingObserver};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

// código de salida cuando algún barbero o cliente rompe un contrato
const CONTRACT_VIOLATION: u8 = 3;

fn main() -> ExitCode {
    init_tracing();

    // la simulación corta sola cuando un hilo falla; acá solo queda registrado por qué
    std::panic::set_hook(Box::new(|panic_info| {
        let worker = std::thread::current().name().unwrap_or("main").to_string();
        error!(worker = %worker, "contract violation: {}", panic_info);
    }));

    let mut args = std::env::args();
    let program = args.next().unwrap_or_else(|| "barberia-semaforos".to_string());
    let config = match ShopConfig::from_args(args) {
        Ok(Command::Run(config)) => config,
        Ok(Command::Help) => {
            println!("{}", ShopConfig::usage(&program));
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("ERROR: {}", e);
            eprintln!("{}", ShopConfig::usage(&program));
            return ExitCode::FAILURE;
        }
    };
    show_params(&config);

    match Simulation::new(config, Arc::new(TracingObserver)).run() {
        Ok(report) => {
            for barber in &report.barbers {
                println!(
                    "[Barbero {}] atendí {} clientes ({} cortes, {} afeitadas, {} lavados)",
                    barber.id, barber.clients_served, barber.haircuts, barber.shaves, barber.hair_washes
                );
            }
            for client in &report.clients {
                println!("[Cliente {}] fui {} veces, me hicieron {} servicios", client.id, client.trips, client.requests_fulfilled);
            }
            info!(stats = ?report.stats, "done");
            ExitCode::SUCCESS
        }
        Err(e @ SimulationError::WorkerPanicked { .. }) => {
            // main termina y con él los hilos que quedaron bloqueados
            error!(error = %e, "simulation aborted");
            ExitCode::from(CONTRACT_VIOLATION)
        }
        Err(e) => {
            error!(error = %e, "simulation failed");
            ExitCode::FAILURE
        }
    }
}

fn show_params(config: &ShopConfig) {
    info!("simulation parameters:");
    info!("  --num-barbers: {}", config.num_barbers);
    info!("  --num-clients: {}", config.num_clients);
    info!("  --num-chairs: {}", config.num_barber_chairs);
    info!(
        "  --num-tools: [scissors:{},combs:{},razors:{}]",
        config.num_scissors, config.num_combs, config.num_razors
    );
    info!("  --num-basins: {}", config.num_washbasins);
    info!(
        "  --num-client-benches-seats: [total:{},num-benches:{}]",
        config.num_client_bench_seats, config.num_client_benches
    );
    info!("  --work-time-units: {}", config.work_time_units);
    info!("  --barber-shop-trips: {}", config.barber_shop_trips);
    info!("  --outside-time-units: {}", config.outside_time_units);
    info!(
        "  --prob-requests: [haircut:{},wash-hair:{},shave:{}]",
        config.prob_haircut, config.prob_wash_hair, config.prob_shave
    );
    info!("  --vitality-time-units: {}", config.vitality_time_units);
    info!("  --time-unit: {} ms", config.time_unit.as_millis());
}
