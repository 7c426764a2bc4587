//! Ciclo de vida de un barbero: espera en su banco, toma un cliente del banco de
//! clientes y le hace sus pedidos de a uno, hasta que la barbería cierra.

use crate::config::ShopConfig;
use crate::observer::{Observer, Snapshot, WorkerState};
use crate::pools::holds_tools_for;
use crate::requests::{Request, RequestSet, Tool, ToolSet, WorkplaceKind};
use crate::service::{ProgressPlan, Service, Workplace};
use crate::shop::BarberShop;
use crate::{BarberId, ClientId};
use rand::thread_rng;
use std::sync::Arc;
use std::thread;
use tracing::{debug, info};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BarberState {
    None,
    // sentado en el banco de barberos
    Idle,
    WaitingClients,
    WaitingChair,
    WaitingBasin,
    WaitingClientSeated,
    ReqScissor,
    ReqComb,
    ReqRazor,
    Cutting,
    Shaving,
    Washing,
    ReleasingTools,
    ReleasingWorkplace,
    AllRequestsDone,
    Done,
}

impl BarberState {
    pub fn label(&self) -> &'static str {
        match self {
            BarberState::None => "---------",
            BarberState::Idle => "IDLE     ",
            BarberState::WaitingClients => "W CLIENT ",
            BarberState::WaitingChair => "W SEAT   ",
            BarberState::WaitingBasin => "W BASIN  ",
            BarberState::WaitingClientSeated => "W SEATED ",
            BarberState::ReqScissor => "R SCISSOR",
            BarberState::ReqComb => "R COMB   ",
            BarberState::ReqRazor => "R RAZOR  ",
            BarberState::Cutting => "CUTTING  ",
            BarberState::Shaving => "SHAVING  ",
            BarberState::Washing => "WASHING  ",
            BarberState::ReleasingTools => "RET TOOLS",
            BarberState::ReleasingWorkplace => "RELEASING",
            BarberState::AllRequestsDone => "ALL DONE ",
            BarberState::Done => "DONE     ",
        }
    }

    fn requesting(tool: Tool) -> Self {
        match tool {
            Tool::Scissor => BarberState::ReqScissor,
            Tool::Comb => BarberState::ReqComb,
            Tool::Razor => BarberState::ReqRazor,
        }
    }

    fn performing(request: Request) -> Self {
        match request {
            Request::Haircut => BarberState::Cutting,
            Request::Shave => BarberState::Shaving,
            Request::WashHair => BarberState::Washing,
        }
    }
}

/// Lo que hizo un barbero en toda la simulación.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BarberSummary {
    pub id: BarberId,
    pub clients_served: usize,
    pub haircuts: usize,
    pub shaves: usize,
    pub hair_washes: usize,
}

impl BarberSummary {
    pub fn services(&self) -> usize {
        self.haircuts + self.shaves + self.hair_washes
    }
}

pub struct Barber {
    id: BarberId,
    state: BarberState,
    client_id: Option<ClientId>,
    req_to_do: RequestSet,
    tools: ToolSet,
    bench_position: Option<usize>,
    chair_position: Option<usize>,
    basin_position: Option<usize>,
    shop: Arc<BarberShop>,
    config: Arc<ShopConfig>,
    observer: Arc<dyn Observer>,
    summary: BarberSummary,
}

impl Barber {
    pub fn new(id: BarberId, shop: Arc<BarberShop>, config: Arc<ShopConfig>, observer: Arc<dyn Observer>) -> Self {
        assert!(id > 0, "invalid barber id ({})", id);
        Barber {
            id,
            state: BarberState::None,
            client_id: None,
            req_to_do: RequestSet::empty(),
            tools: ToolSet::default(),
            bench_position: None,
            chair_position: None,
            basin_position: None,
            shop,
            config,
            observer,
            summary: BarberSummary { id, ..BarberSummary::default() },
        }
    }

    pub fn life(mut self) -> BarberSummary {
        self.sit_in_barber_bench();
        self.wait_for_client();
        while self.work_available() {
            self.rise_from_barber_bench();
            self.process_requests_from_client();
            self.release_client();
            self.sit_in_barber_bench();
            self.wait_for_client();
        }
        self.done();
        self.summary
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            id: self.id,
            state: WorkerState::Barber(self.state),
            peer: self.client_id,
            flags: self.tools.flags(),
            position: self.chair_position.or(self.basin_position),
            bench: None,
        }
    }

    // pausa de "vitalidad" y reporte del estado
    fn log(&self) {
        let pause = self.config.vitality_time_units.sample(&mut thread_rng());
        thread::sleep(self.config.units(pause));
        self.observer.report(&self.snapshot());
    }

    fn set_state(&mut self, state: BarberState) {
        self.state = state;
        self.log();
    }

    fn sit_in_barber_bench(&mut self) {
        self.bench_position = Some(self.shop.sit_in_barber_bench(self.id));
        self.client_id = None;
        self.set_state(BarberState::Idle);
    }

    fn wait_for_client(&mut self) {
        self.set_state(BarberState::WaitingClients);
        // si la barbería cerró y no queda nadie, el barbero se queda sin cliente
        if let Some(waiting) = self.shop.wait_next_client() {
            self.client_id = Some(waiting.client);
            self.req_to_do = waiting.requests;
            self.shop.greet_client(self.id, waiting.client);
            self.log();
        }
    }

    fn work_available(&self) -> bool {
        self.client_id.is_some()
    }

    fn rise_from_barber_bench(&mut self) {
        if let Some(seat) = self.bench_position.take() {
            self.shop.rise_from_barber_bench(seat, self.id);
        }
        self.log();
    }

    fn process_requests_from_client(&mut self) {
        let client = match self.client_id {
            Some(client) => client,
            None => panic!("barber {} processing requests without a client", self.id),
        };

        if self.req_to_do.is_empty() {
            self.shop.publish_no_more_requests(self.id);
        }

        while let Some(request) = self.req_to_do.next_by_priority() {
            let service = self.reserve_workplace(client, request);
            self.shop.publish_service(service);

            self.set_state(BarberState::WaitingClientSeated);
            self.shop.wait_client_ready(self.id);

            self.pick_tools(request);
            if let Workplace::Chair(_) = service.workplace {
                self.shop.set_workplace_tools(service.workplace, self.id, self.tools);
            }
            self.perform(&service);

            // se devuelve en orden inverso: primero herramientas, después el lugar
            self.return_tools(request);
            self.set_state(BarberState::ReleasingWorkplace);
            self.shop.release_workplace(&service);
            self.chair_position = None;
            self.basin_position = None;

            self.shop.signal_barber_done(self.id);
            self.req_to_do.fulfill(request);
            self.count(request);
            debug!(barber = self.id, client, ?request, "request fulfilled");
            self.log();
        }

        self.set_state(BarberState::AllRequestsDone);
        self.shop.wait_all_done(self.id);
        self.summary.clients_served += 1;
    }

    fn reserve_workplace(&mut self, client: ClientId, request: Request) -> Service {
        let workplace = match request.workplace() {
            WorkplaceKind::Chair => {
                self.set_state(BarberState::WaitingChair);
                let chair = self.shop.reserve_chair(self.id);
                self.chair_position = Some(chair);
                Workplace::Chair(chair)
            }
            WorkplaceKind::Basin => {
                self.set_state(BarberState::WaitingBasin);
                let basin = self.shop.reserve_basin(self.id);
                self.basin_position = Some(basin);
                Workplace::Basin(basin)
            }
        };
        Service { client, barber: self.id, workplace, request }
    }

    fn pick_tools(&mut self, request: Request) {
        for tool in request.tools() {
            self.set_state(BarberState::requesting(*tool));
            self.shop.pick_tool(*tool);
            self.tools.take(*tool);
        }
    }

    fn return_tools(&mut self, request: Request) {
        if request.tools().is_empty() {
            return;
        }
        self.set_state(BarberState::ReleasingTools);
        for tool in request.tools().iter().rev() {
            self.tools.drop_tool(*tool);
            self.shop.return_tool(*tool);
        }
    }

    // el servicio avanza por pasos hasta llegar al 100%
    fn perform(&mut self, service: &Service) {
        assert!(
            holds_tools_for(self.tools, service.request),
            "barber {} not holding the tools for {:?}",
            self.id,
            service.request
        );
        self.state = BarberState::performing(service.request);
        let work = self.config.work_time_units;
        let plan = ProgressPlan::random(&mut thread_rng(), work.min, work.max);
        for completion in plan.completions() {
            thread::sleep(self.config.units(plan.units_per_step));
            self.shop.set_completion(service.workplace, self.id, completion);
            self.log();
        }
    }

    fn count(&mut self, request: Request) {
        match request {
            Request::Haircut => self.summary.haircuts += 1,
            Request::Shave => self.summary.shaves += 1,
            Request::WashHair => self.summary.hair_washes += 1,
        }
    }

    fn release_client(&mut self) {
        if let Some(client) = self.client_id.take() {
            self.shop.release_client(self.id, client);
        }
        self.req_to_do = RequestSet::empty();
        self.log();
    }

    fn done(&mut self) {
        if let Some(seat) = self.bench_position.take() {
            self.shop.rise_from_barber_bench(seat, self.id);
        }
        self.set_state(BarberState::Done);
        info!(barber = self.id, clients = self.summary.clients_served, services = self.summary.services(), "barber done");
    }
}
