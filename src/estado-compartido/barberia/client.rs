//! Ciclo de vida de un cliente: pasea, vuelve a la barbería, elige servicios,
//! espera su turno y se deja atender, tantas veces como viajes tenga.

use crate::config::ShopConfig;
use crate::observer::{Observer, Snapshot, WorkerState};
use crate::requests::{select_requests, Request, RequestSet};
use crate::service::{Service, Workplace};
use crate::shop::BarberShop;
use crate::{BarberId, ClientId};
use rand::thread_rng;
use std::sync::Arc;
use std::thread;
use tracing::{debug, info};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientState {
    None,
    Wandering,
    WaitingVacancy,
    SelectingRequests,
    WaitingItsTurn,
    WaitingService,
    WaitingServiceStart,
    HavingHaircut,
    HavingShave,
    HavingHairWash,
    Risen,
    Leaving,
    Done,
}

impl ClientState {
    pub fn label(&self) -> &'static str {
        match self {
            ClientState::None => "---------",
            ClientState::Wandering => "WANDERING",
            ClientState::WaitingVacancy => "W VACANCY",
            ClientState::SelectingRequests => "REQUESTS ",
            ClientState::WaitingItsTurn => "Wait TURN",
            ClientState::WaitingService => "Wt SERVCE",
            ClientState::WaitingServiceStart => "SERV STRT",
            ClientState::HavingHaircut => "HAIRCUT  ",
            ClientState::HavingShave => "SHAVE    ",
            ClientState::HavingHairWash => "HAIR WASH",
            ClientState::Risen => "RISEN    ",
            ClientState::Leaving => "LEAVING  ",
            ClientState::Done => "DONE     ",
        }
    }

    /// Estado mientras se le hace el pedido.
    pub fn having(request: Request) -> Self {
        if request == Request::Haircut {
            ClientState::HavingHaircut
        } else if request == Request::Shave {
            ClientState::HavingShave
        } else {
            ClientState::HavingHairWash
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClientSummary {
    pub id: ClientId,
    pub trips: usize,
    pub requests_fulfilled: usize,
}

pub struct Client {
    id: ClientId,
    state: ClientState,
    barber_id: Option<BarberId>,
    requests: RequestSet,
    num_trips: usize,
    bench_position: Option<usize>,
    chair_position: Option<usize>,
    basin_position: Option<usize>,
    shop: Arc<BarberShop>,
    config: Arc<ShopConfig>,
    observer: Arc<dyn Observer>,
    summary: ClientSummary,
}

impl Client {
    pub fn new(
        id: ClientId,
        num_trips: usize,
        shop: Arc<BarberShop>,
        config: Arc<ShopConfig>,
        observer: Arc<dyn Observer>,
    ) -> Self {
        assert!(id > 0, "invalid client id ({})", id);
        assert!(num_trips > 0, "invalid number of trips to barber ({})", num_trips);
        Client {
            id,
            state: ClientState::None,
            barber_id: None,
            requests: RequestSet::empty(),
            num_trips,
            bench_position: None,
            chair_position: None,
            basin_position: None,
            shop,
            config,
            observer,
            summary: ClientSummary { id, ..ClientSummary::default() },
        }
    }

    pub fn life(mut self) -> ClientSummary {
        self.log();
        while self.summary.trips < self.num_trips {
            self.wandering_outside();
            // si no hay lugar vuelve a pasear y el viaje no cuenta
            if self.vacancy_in_barber_shop() {
                self.select_requests();
                self.wait_its_turn();
                self.rise_from_client_bench();
                self.wait_all_services_done();
                self.summary.trips += 1;
            }
        }
        self.set_state(ClientState::Done);
        info!(client = self.id, trips = self.summary.trips, "client done");
        self.summary
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            id: self.id,
            state: WorkerState::Client(self.state),
            peer: self.barber_id,
            flags: self.requests.flags(),
            position: self.chair_position.or(self.basin_position),
            bench: self.bench_position.map(|seat| self.shop.client_bench_position(seat)),
        }
    }

    fn log(&self) {
        let pause = self.config.vitality_time_units.sample(&mut thread_rng());
        thread::sleep(self.config.units(pause));
        self.observer.report(&self.snapshot());
    }

    fn set_state(&mut self, state: ClientState) {
        self.state = state;
        self.log();
    }

    fn wandering_outside(&mut self) {
        self.state = ClientState::Wandering;
        let outside = self.config.outside_time_units.sample(&mut thread_rng());
        thread::sleep(self.config.units(outside));
        self.log();
    }

    fn vacancy_in_barber_shop(&mut self) -> bool {
        self.barber_id = None;
        self.requests = RequestSet::empty();
        self.bench_position = None;
        self.chair_position = None;
        self.basin_position = None;
        self.set_state(ClientState::WaitingVacancy);
        self.shop.has_vacancy()
    }

    fn select_requests(&mut self) {
        self.requests = select_requests(&mut thread_rng(), &self.config.weights());
        debug!(client = self.id, requests = %self.requests.flags(), "requests selected");
        self.set_state(ClientState::SelectingRequests);
    }

    // primero un asiento en el banco, recién después un barbero
    fn wait_its_turn(&mut self) {
        self.set_state(ClientState::WaitingItsTurn);
        let seat = self.shop.enter_shop(self.id, self.requests);
        self.bench_position = Some(seat);
        self.log();
        self.barber_id = Some(self.shop.greet_barber(self.id));
        self.log();
    }

    fn rise_from_client_bench(&mut self) {
        if let Some(seat) = self.bench_position.take() {
            self.shop.rise_from_client_bench(seat, self.id);
        }
        self.log();
    }

    fn wait_all_services_done(&mut self) {
        let barber = match self.barber_id {
            Some(barber) => barber,
            None => panic!("client {} waiting for services without a barber", self.id),
        };
        self.set_state(ClientState::WaitingService);

        let mut remaining = self.requests;
        let mut offer = self.shop.wait_service_offer(barber);
        while let Some(service) = offer {
            self.receive_service(&service);
            remaining.fulfill(service.request);
            self.summary.requests_fulfilled += 1;
            if remaining.is_empty() {
                break;
            }
            self.set_state(ClientState::WaitingService);
            offer = self.shop.wait_service_offer(barber);
        }
        assert!(remaining.is_empty(), "client {} leaving with requests {:?} pending", self.id, remaining);

        self.shop.signal_all_done(barber);
        self.set_state(ClientState::Leaving);
        self.shop.leave_shop(self.id);
        self.barber_id = None;
        self.log();
    }

    fn receive_service(&mut self, service: &Service) {
        assert_eq!(service.client, self.id, "client {} received a service for client {}", self.id, service.client);
        self.chair_position = None;
        self.basin_position = None;
        self.set_state(ClientState::WaitingServiceStart);

        self.shop.sit_in_workplace(service);
        match service.workplace {
            Workplace::Chair(chair) => self.chair_position = Some(chair),
            Workplace::Basin(basin) => self.basin_position = Some(basin),
        }
        self.state = ClientState::having(service.request);
        self.shop.signal_client_ready(service.barber);
        self.log();

        // el barbero termina y libera el lugar antes de que el cliente se levante
        self.shop.wait_barber_done(service.barber);
        self.chair_position = None;
        self.basin_position = None;
        self.set_state(ClientState::Risen);
    }
}
