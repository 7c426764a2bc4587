//! La barbería: dueña de todos los recursos compartidos y de los avisos entre
//! cada barbero y su cliente. Es el único lugar que toca bancos, sillas,
//! lavatorios y herramientas, siempre bajo el mutex de cada uno.

use crate::config::ShopConfig;
use crate::pools::{Bench, ClientBench, SlotPool, ToolPot, WaitingClient};
use crate::requests::{RequestSet, Tool, ToolSet};
use crate::service::{Service, Workplace};
use crate::signals::{lock, wait_while, BarberSignals, Mailbox};
use crate::{BarberId, ClientId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};
use tracing::{debug, trace};

/// Máximos de ocupación observados durante la simulación.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ShopStats {
    pub peak_chairs: usize,
    pub peak_basins: usize,
    pub peak_scissors: usize,
    pub peak_combs: usize,
    pub peak_razors: usize,
    pub peak_client_bench: usize,
    pub peak_barber_bench: usize,
}

pub struct BarberShop {
    open: AtomicBool,

    client_bench: Mutex<ClientBench>,
    // un cliente se sentó o la barbería cerró (esperan los barberos)
    client_seated: Condvar,
    // se liberó un asiento (esperan los clientes)
    seat_freed: Condvar,

    barber_bench: Mutex<Bench<BarberId>>,
    chairs: SlotPool,
    basins: SlotPool,
    tools: ToolPot,

    // indexados por id - 1
    barber_signals: Vec<BarberSignals>,
    service_offers: Vec<Mailbox<Option<Service>>>,
    greetings: Vec<Mailbox<BarberId>>,

    // solo para limpiar al final, nunca para decidir nada
    assignments: Mutex<HashMap<ClientId, BarberId>>,
}

impl BarberShop {
    pub fn new(config: &ShopConfig) -> Self {
        BarberShop {
            open: AtomicBool::new(true),
            client_bench: Mutex::new(ClientBench::new(config.num_client_bench_seats, config.num_client_benches)),
            client_seated: Condvar::new(),
            seat_freed: Condvar::new(),
            barber_bench: Mutex::new(Bench::new(config.num_barbers, 1)),
            chairs: SlotPool::new("chair", config.num_barber_chairs),
            basins: SlotPool::new("basin", config.num_washbasins),
            tools: ToolPot::new(config.num_scissors, config.num_combs, config.num_razors),
            barber_signals: (0..config.num_barbers).map(|_| BarberSignals::new()).collect(),
            service_offers: (0..config.num_barbers).map(|_| Mailbox::new()).collect(),
            greetings: (0..config.num_clients).map(|_| Mailbox::new()).collect(),
            assignments: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Cierra la barbería y despierta a los barberos que esperan clientes.
    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
        // tomo el lock para que ningún barbero se pierda el aviso entre revisar y dormir
        let _bench = lock(&self.client_bench);
        self.client_seated.notify_all();
        debug!("barber shop closed");
    }

    fn signals(&self, barber: BarberId) -> &BarberSignals {
        match barber.checked_sub(1).and_then(|index| self.barber_signals.get(index)) {
            Some(signals) => signals,
            None => panic!("invalid barber id ({})", barber),
        }
    }

    fn offers(&self, barber: BarberId) -> &Mailbox<Option<Service>> {
        match barber.checked_sub(1).and_then(|index| self.service_offers.get(index)) {
            Some(offers) => offers,
            None => panic!("invalid barber id ({})", barber),
        }
    }

    fn greeting(&self, client: ClientId) -> &Mailbox<BarberId> {
        match client.checked_sub(1).and_then(|index| self.greetings.get(index)) {
            Some(greeting) => greeting,
            None => panic!("invalid client id ({})", client),
        }
    }

    fn pool(&self, workplace: Workplace) -> &SlotPool {
        match workplace {
            Workplace::Chair(_) => &self.chairs,
            Workplace::Basin(_) => &self.basins,
        }
    }

    /*****************************************/
    /*               CLIENTES                */
    /*****************************************/

    /// Mira (sin esperar) si hay algún asiento libre en los bancos de clientes.
    pub fn has_vacancy(&self) -> bool {
        lock(&self.client_bench).bench().available() > 0
    }

    /// El cliente se sienta en un asiento libre al azar, esperando si están todos ocupados.
    pub fn enter_shop(&self, client: ClientId, requests: RequestSet) -> usize {
        let mut benches = wait_while(&self.seat_freed, lock(&self.client_bench), |benches| {
            benches.bench().available() == 0
        });
        let seat = benches.enter(client, requests);
        debug!(client, seat, requests = %requests.flags(), "client entered the shop");
        self.client_seated.notify_all();
        seat
    }

    /// Espera a que algún barbero tome al cliente y devuelve su id.
    pub fn greet_barber(&self, client: ClientId) -> BarberId {
        let barber = self.greeting(client).take();
        trace!(client, barber, "client greeted barber");
        barber
    }

    pub fn rise_from_client_bench(&self, seat: usize, client: ClientId) {
        lock(&self.client_bench).rise(seat, client);
        self.seat_freed.notify_all();
    }

    /// Espera el próximo servicio del barbero; `None` quiere decir que no hay más pedidos.
    pub fn wait_service_offer(&self, barber: BarberId) -> Option<Service> {
        self.offers(barber).take()
    }

    /// El cliente se sienta en la silla o lavatorio que reservó su barbero.
    pub fn sit_in_workplace(&self, service: &Service) {
        self.pool(service.workplace).sit(service.workplace.index(), service.barber, service.client);
    }

    pub fn signal_client_ready(&self, barber: BarberId) {
        self.signals(barber).client_ready.release();
    }

    pub fn wait_barber_done(&self, barber: BarberId) {
        self.signals(barber).barber_done.acquire();
    }

    pub fn signal_all_done(&self, barber: BarberId) {
        self.signals(barber).all_done.release();
    }

    pub fn leave_shop(&self, client: ClientId) {
        assert!(!lock(&self.client_bench).is_seated(client), "client {} leaving while seated in benches", client);
        assert!(self.greeting(client).is_empty(), "client {} leaving with a pending greeting", client);
        debug!(client, "client left the shop");
    }

    /*****************************************/
    /*               BARBEROS                */
    /*****************************************/

    pub fn sit_in_barber_bench(&self, barber: BarberId) -> usize {
        let mut bench = lock(&self.barber_bench);
        assert!(bench.available() > 0, "seat not available in barber bench");
        assert!(!bench.iter().any(|(_, seated)| *seated == barber), "barber {} already seated in barber bench", barber);
        bench.sit_random(barber)
    }

    pub fn rise_from_barber_bench(&self, seat: usize, barber: BarberId) {
        let mut bench = lock(&self.barber_bench);
        assert_eq!(bench.get(seat), Some(&barber), "barber {} not seated in barber bench seat {}", barber, seat);
        bench.rise(seat);
    }

    /// Toma al cliente que llegó primero entre los que esperan; `None` si no hay nadie.
    pub fn next_waiting_client(&self) -> Option<WaitingClient> {
        lock(&self.client_bench).claim_next()
    }

    /// Espera a que haya un cliente sin barbero. Devuelve `None` solo cuando la
    /// barbería cerró y no queda nadie esperando.
    pub fn wait_next_client(&self) -> Option<WaitingClient> {
        let mut benches = wait_while(&self.client_seated, lock(&self.client_bench), |benches| {
            !benches.has_unclaimed() && self.is_open()
        });
        benches.claim_next()
    }

    /// Anota la asignación y le avisa al cliente quién lo atiende.
    pub fn greet_client(&self, barber: BarberId, client: ClientId) {
        lock(&self.assignments).insert(client, barber);
        self.greeting(client).put(barber);
        debug!(barber, client, "barber took client");
    }

    pub fn reserve_chair(&self, barber: BarberId) -> usize {
        self.chairs.reserve(barber)
    }

    pub fn reserve_basin(&self, barber: BarberId) -> usize {
        self.basins.reserve(barber)
    }

    pub fn publish_service(&self, service: Service) {
        trace!(barber = service.barber, client = service.client, request = ?service.request, "service offered");
        self.offers(service.barber).put(Some(service));
    }

    pub fn publish_no_more_requests(&self, barber: BarberId) {
        self.offers(barber).put(None);
    }

    pub fn wait_client_ready(&self, barber: BarberId) {
        self.signals(barber).client_ready.acquire();
    }

    pub fn signal_barber_done(&self, barber: BarberId) {
        self.signals(barber).barber_done.release();
    }

    pub fn wait_all_done(&self, barber: BarberId) {
        self.signals(barber).all_done.acquire();
    }

    pub fn pick_tool(&self, tool: Tool) {
        self.tools.pick(tool);
    }

    pub fn return_tool(&self, tool: Tool) {
        self.tools.give_back(tool);
    }

    pub fn set_workplace_tools(&self, workplace: Workplace, barber: BarberId, tools: ToolSet) {
        self.pool(workplace).set_tools(workplace.index(), barber, tools);
    }

    pub fn set_completion(&self, workplace: Workplace, barber: BarberId, completion: u8) {
        self.pool(workplace).set_completion(workplace.index(), barber, completion);
    }

    /// Libera la silla o el lavatorio del servicio: el cliente se levanta y el lugar queda libre.
    pub fn release_workplace(&self, service: &Service) {
        self.pool(service.workplace).release(service.workplace.index(), service.barber, service.client);
    }

    /// Olvida la asignación cliente-barbero cuando el barbero termina con el cliente.
    pub fn release_client(&self, barber: BarberId, client: ClientId) {
        let previous = lock(&self.assignments).remove(&client);
        assert_eq!(previous, Some(barber), "barber {} releasing client {} it was not assigned", barber, client);
    }

    /*****************************************/
    /*              INSPECCIÓN               */
    /*****************************************/

    pub fn assigned_barber(&self, client: ClientId) -> Option<BarberId> {
        lock(&self.assignments).get(&client).copied()
    }

    pub fn chairs(&self) -> &SlotPool {
        &self.chairs
    }

    pub fn basins(&self) -> &SlotPool {
        &self.basins
    }

    pub fn tools(&self) -> &ToolPot {
        &self.tools
    }

    pub fn client_bench_position(&self, seat: usize) -> (usize, usize) {
        lock(&self.client_bench).bench().position(seat)
    }

    pub fn stats(&self) -> ShopStats {
        ShopStats {
            peak_chairs: self.chairs.peak_reserved(),
            peak_basins: self.basins.peak_reserved(),
            peak_scissors: self.tools.peak(Tool::Scissor),
            peak_combs: self.tools.peak(Tool::Comb),
            peak_razors: self.tools.peak(Tool::Razor),
            peak_client_bench: lock(&self.client_bench).bench().peak(),
            peak_barber_bench: lock(&self.barber_bench).peak(),
        }
    }
}
