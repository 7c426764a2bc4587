//! Recursos compartidos de la barbería: sillas, lavatorios, bancos y el pote de
//! herramientas. Cada recurso acotado tiene un semáforo que cuenta lugares
//! libres y un mutex que protege su tabla; siempre se espera primero en el
//! semáforo y después se toma el mutex, nunca al revés.

use crate::requests::{Request, Tool, ToolSet};
use crate::signals::lock;
use crate::{BarberId, ClientId};
use rand::seq::IteratorRandom;
use rand::thread_rng;
use std::sync::Mutex;
use std_semaphore::Semaphore;
use tracing::trace;

/// Una silla o un lavatorio.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Slot {
    pub barber: Option<BarberId>,
    pub client: Option<ClientId>,
    pub completion: u8,
    pub tools: ToolSet,
}

impl Slot {
    fn is_free(&self) -> bool {
        self.barber.is_none() && self.client.is_none()
    }
}

struct SlotTable {
    slots: Vec<Slot>,
    peak_reserved: usize,
}

impl SlotTable {
    fn reserved(&self) -> usize {
        self.slots.iter().filter(|slot| slot.barber.is_some()).count()
    }

    fn slot_mut(&mut self, index: usize, kind: &str) -> &mut Slot {
        match self.slots.get_mut(index) {
            Some(slot) => slot,
            None => panic!("{} {} does not exist", kind, index),
        }
    }
}

/// Conjunto de sillas o de lavatorios.
pub struct SlotPool {
    kind: &'static str,
    free: Semaphore,
    table: Mutex<SlotTable>,
}

impl SlotPool {
    pub fn new(kind: &'static str, size: usize) -> Self {
        SlotPool {
            kind,
            free: Semaphore::new(size as isize),
            table: Mutex::new(SlotTable { slots: vec![Slot::default(); size], peak_reserved: 0 }),
        }
    }

    /// Bloquea hasta que haya un lugar libre y reserva uno al azar para el barbero.
    pub fn reserve(&self, barber: BarberId) -> usize {
        self.free.acquire();
        let mut table = lock(&self.table);
        assert!(
            !table.slots.iter().any(|slot| slot.barber == Some(barber)),
            "barber {} already holds a {}",
            barber,
            self.kind
        );
        let index = table
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_free())
            .map(|(index, _)| index)
            .choose(&mut thread_rng());
        // el semáforo garantiza que hay al menos uno libre
        let index = match index {
            Some(index) => index,
            None => panic!("{} semaphore out of sync with its table", self.kind),
        };
        table.slots[index] = Slot { barber: Some(barber), ..Slot::default() };
        let reserved = table.reserved();
        table.peak_reserved = table.peak_reserved.max(reserved);
        trace!(kind = self.kind, index, barber, "reserved");
        index
    }

    /// El cliente se sienta en un lugar ya reservado por su barbero.
    pub fn sit(&self, index: usize, barber: BarberId, client: ClientId) {
        let mut table = lock(&self.table);
        assert!(
            !table.slots.iter().any(|slot| slot.client == Some(client)),
            "client {} already seated in a {}",
            client,
            self.kind
        );
        let kind = self.kind;
        let slot = table.slot_mut(index, kind);
        assert_eq!(slot.barber, Some(barber), "client {} sitting in {} {} not reserved by barber {}", client, kind, index, barber);
        assert!(slot.client.is_none(), "{} {} already occupied", kind, index);
        slot.client = Some(client);
        trace!(kind, index, client, "seated");
    }

    pub fn set_tools(&self, index: usize, barber: BarberId, tools: ToolSet) {
        let mut table = lock(&self.table);
        let kind = self.kind;
        let slot = table.slot_mut(index, kind);
        assert_eq!(slot.barber, Some(barber), "barber {} does not own {} {}", barber, kind, index);
        slot.tools = tools;
    }

    /// Avanza el porcentaje de trabajo hecho; nunca puede retroceder ni pasar de 100.
    pub fn set_completion(&self, index: usize, barber: BarberId, completion: u8) {
        let mut table = lock(&self.table);
        let kind = self.kind;
        let slot = table.slot_mut(index, kind);
        assert_eq!(slot.barber, Some(barber), "barber {} does not own {} {}", barber, kind, index);
        assert!(slot.client.is_some(), "working on an empty {} {}", kind, index);
        assert!(
            completion >= slot.completion && completion <= 100,
            "{} {} completion went from {} to {}",
            kind,
            index,
            slot.completion,
            completion
        );
        slot.completion = completion;
    }

    /// El cliente se levanta y el barbero libera el lugar; el trabajo tiene que estar al 100%.
    pub fn release(&self, index: usize, barber: BarberId, client: ClientId) {
        {
            let mut table = lock(&self.table);
            let kind = self.kind;
            let slot = table.slot_mut(index, kind);
            assert_eq!(slot.barber, Some(barber), "barber {} releasing {} {} it does not hold", barber, kind, index);
            assert_eq!(slot.client, Some(client), "client {} not seated in {} {}", client, kind, index);
            assert_eq!(slot.completion, 100, "{} {} released before the service finished", kind, index);
            *slot = Slot::default();
            trace!(kind, index, barber, client, "released");
        }
        self.free.release();
    }

    pub fn count_available(&self) -> usize {
        lock(&self.table).slots.iter().filter(|slot| slot.is_free()).count()
    }

    pub fn slot(&self, index: usize) -> Option<Slot> {
        lock(&self.table).slots.get(index).cloned()
    }

    pub fn peak_reserved(&self) -> usize {
        lock(&self.table).peak_reserved
    }
}

/// Banco con asientos numerados. No sincroniza nada por sí mismo: lo protege
/// el mutex de quien lo tiene.
pub struct Bench<T> {
    seats: Vec<Option<T>>,
    seats_per_bench: usize,
    peak: usize,
}

impl<T> Bench<T> {
    pub fn new(total_seats: usize, benches: usize) -> Self {
        let benches = benches.clamp(1, total_seats.max(1));
        Bench {
            seats: (0..total_seats).map(|_| None).collect(),
            seats_per_bench: total_seats.div_ceil(benches).max(1),
            peak: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.seats.len()
    }

    pub fn occupied(&self) -> usize {
        self.seats.iter().filter(|seat| seat.is_some()).count()
    }

    pub fn available(&self) -> usize {
        self.capacity() - self.occupied()
    }

    pub fn peak(&self) -> usize {
        self.peak
    }

    /// (banco, asiento) de un índice global.
    pub fn position(&self, index: usize) -> (usize, usize) {
        (index / self.seats_per_bench, index % self.seats_per_bench)
    }

    pub fn sit_random(&mut self, occupant: T) -> usize {
        let index = self
            .seats
            .iter()
            .enumerate()
            .filter(|(_, seat)| seat.is_none())
            .map(|(index, _)| index)
            .choose(&mut thread_rng());
        let index = match index {
            Some(index) => index,
            None => panic!("no seat available in bench"),
        };
        self.seats[index] = Some(occupant);
        self.peak = self.peak.max(self.occupied());
        index
    }

    pub fn rise(&mut self, index: usize) -> T {
        match self.seats.get_mut(index).and_then(Option::take) {
            Some(occupant) => occupant,
            None => panic!("rising from empty seat {}", index),
        }
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.seats.get(index).and_then(Option::as_ref)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.seats.iter().enumerate().filter_map(|(index, seat)| seat.as_ref().map(|occupant| (index, occupant)))
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut T)> {
        self.seats.iter_mut().enumerate().filter_map(|(index, seat)| seat.as_mut().map(|occupant| (index, occupant)))
    }
}

/// Cliente esperando en el banco con sus pedidos.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaitingSeat {
    pub client: ClientId,
    pub requests: crate::requests::RequestSet,
    ticket: u64,
    claimed: bool,
}

/// Lo que un barbero se lleva al tomar un cliente del banco.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaitingClient {
    pub client: ClientId,
    pub requests: crate::requests::RequestSet,
    pub bench_position: usize,
}

/// Bancos de clientes: se atiende por orden de llegada.
pub struct ClientBench {
    bench: Bench<WaitingSeat>,
    next_ticket: u64,
}

impl ClientBench {
    pub fn new(total_seats: usize, benches: usize) -> Self {
        ClientBench { bench: Bench::new(total_seats, benches), next_ticket: 0 }
    }

    pub fn bench(&self) -> &Bench<WaitingSeat> {
        &self.bench
    }

    pub fn is_seated(&self, client: ClientId) -> bool {
        self.bench.iter().any(|(_, seat)| seat.client == client)
    }

    pub fn enter(&mut self, client: ClientId, requests: crate::requests::RequestSet) -> usize {
        assert!(!self.is_seated(client), "client {} already seated in benches", client);
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.bench.sit_random(WaitingSeat { client, requests, ticket, claimed: false })
    }

    pub fn has_unclaimed(&self) -> bool {
        self.bench.iter().any(|(_, seat)| !seat.claimed)
    }

    /// Marca como tomado al cliente que llegó primero entre los que nadie tomó todavía.
    pub fn claim_next(&mut self) -> Option<WaitingClient> {
        let (index, seat) = self
            .bench
            .iter_mut()
            .filter(|(_, seat)| !seat.claimed)
            .min_by_key(|(_, seat)| seat.ticket)?;
        seat.claimed = true;
        Some(WaitingClient { client: seat.client, requests: seat.requests, bench_position: index })
    }

    pub fn rise(&mut self, index: usize, client: ClientId) {
        match self.bench.get(index) {
            Some(seat) if seat.client == client => {
                assert!(seat.claimed, "client {} rising before a barber took it", client);
            }
            _ => panic!("client {} not seated in bench seat {}", client, index),
        }
        self.bench.rise(index);
    }
}

#[derive(Default)]
struct ToolCounts {
    in_use: [usize; 3],
    peak: [usize; 3],
    total: [usize; 3],
}

/// Pote de tijeras, peines y navajas. Cada herramienta es un recurso acotado
/// independiente.
pub struct ToolPot {
    available: [Semaphore; 3],
    counts: Mutex<ToolCounts>,
}

impl ToolPot {
    pub fn new(scissors: usize, combs: usize, razors: usize) -> Self {
        ToolPot {
            available: [
                Semaphore::new(scissors as isize),
                Semaphore::new(combs as isize),
                Semaphore::new(razors as isize),
            ],
            counts: Mutex::new(ToolCounts { total: [scissors, combs, razors], ..ToolCounts::default() }),
        }
    }

    pub fn pick(&self, tool: Tool) {
        self.available[tool.index()].acquire();
        let mut counts = lock(&self.counts);
        let i = tool.index();
        assert!(counts.in_use[i] < counts.total[i], "more {:?} in use than exist", tool);
        counts.in_use[i] += 1;
        counts.peak[i] = counts.peak[i].max(counts.in_use[i]);
    }

    pub fn give_back(&self, tool: Tool) {
        {
            let mut counts = lock(&self.counts);
            let i = tool.index();
            assert!(counts.in_use[i] > 0, "returning a {:?} nobody picked", tool);
            counts.in_use[i] -= 1;
        }
        self.available[tool.index()].release();
    }

    pub fn in_use(&self, tool: Tool) -> usize {
        lock(&self.counts).in_use[tool.index()]
    }

    pub fn total(&self, tool: Tool) -> usize {
        lock(&self.counts).total[tool.index()]
    }

    pub fn peak(&self, tool: Tool) -> usize {
        lock(&self.counts).peak[tool.index()]
    }
}

/// Tiene la persona las herramientas que pide el servicio?
pub fn holds_tools_for(tools: ToolSet, request: Request) -> bool {
    request.tools().iter().all(|tool| tools.contains(*tool))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requests::RequestSet;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn reserve_sit_and_release_a_chair() {
        let chairs = SlotPool::new("chair", 2);
        let index = chairs.reserve(1);
        assert_eq!(chairs.count_available(), 1);
        chairs.sit(index, 1, 7);
        for completion in [20, 40, 100] {
            chairs.set_completion(index, 1, completion);
        }
        assert_eq!(chairs.slot(index).map(|slot| slot.completion), Some(100));
        chairs.release(index, 1, 7);
        assert_eq!(chairs.count_available(), 2);
        assert_eq!(chairs.slot(index), Some(Slot::default()));
    }

    #[test]
    #[should_panic(expected = "already holds")]
    fn barber_cannot_reserve_two_chairs() {
        let chairs = SlotPool::new("chair", 2);
        chairs.reserve(1);
        chairs.reserve(1);
    }

    #[test]
    #[should_panic(expected = "not reserved")]
    fn client_cannot_sit_in_unreserved_basin() {
        let basins = SlotPool::new("basin", 1);
        basins.sit(0, 1, 3);
    }

    #[test]
    #[should_panic(expected = "completion went")]
    fn completion_never_goes_back() {
        let chairs = SlotPool::new("chair", 1);
        let index = chairs.reserve(2);
        chairs.sit(index, 2, 5);
        chairs.set_completion(index, 2, 50);
        chairs.set_completion(index, 2, 30);
    }

    #[test]
    #[should_panic(expected = "before the service finished")]
    fn unfinished_slot_cannot_be_released() {
        let chairs = SlotPool::new("chair", 1);
        let index = chairs.reserve(2);
        chairs.sit(index, 2, 5);
        chairs.release(index, 2, 5);
    }

    #[test]
    fn reserve_blocks_while_pool_is_full() {
        let chairs = Arc::new(SlotPool::new("chair", 1));
        let first = chairs.reserve(1);
        chairs.sit(first, 1, 10);

        let waiting_chairs = chairs.clone();
        let waiting = thread::spawn(move || waiting_chairs.reserve(2));
        thread::sleep(Duration::from_millis(30));
        assert!(!waiting.is_finished());

        chairs.set_completion(first, 1, 100);
        chairs.release(first, 1, 10);
        assert_eq!(waiting.join().unwrap(), first);
        assert_eq!(chairs.peak_reserved(), 1);
    }

    #[test]
    fn client_bench_is_first_come_first_served() {
        let mut benches = ClientBench::new(4, 2);
        let haircut: RequestSet = [Request::Haircut].into_iter().collect();
        for client in [5, 2, 9] {
            benches.enter(client, haircut);
        }
        let order: Vec<ClientId> = std::iter::from_fn(|| benches.claim_next()).map(|w| w.client).collect();
        assert_eq!(order, vec![5, 2, 9]);
        assert!(!benches.has_unclaimed());
        assert_eq!(benches.bench().occupied(), 3);
        assert_eq!(benches.bench().available(), 1);
    }

    #[test]
    #[should_panic(expected = "already seated")]
    fn client_takes_only_one_seat() {
        let mut benches = ClientBench::new(4, 1);
        benches.enter(1, RequestSet::empty());
        benches.enter(1, RequestSet::empty());
    }

    #[test]
    fn bench_positions_split_over_benches() {
        let bench: Bench<u32> = Bench::new(6, 2);
        assert_eq!(bench.position(0), (0, 0));
        assert_eq!(bench.position(2), (0, 2));
        assert_eq!(bench.position(3), (1, 0));
        assert_eq!(bench.position(5), (1, 2));
    }

    #[test]
    fn tool_pot_never_hands_out_more_than_it_has() {
        let pot = Arc::new(ToolPot::new(1, 2, 1));
        let handles: Vec<_> = (0..6)
            .map(|_| {
                let pot = pot.clone();
                thread::spawn(move || {
                    pot.pick(Tool::Scissor);
                    pot.pick(Tool::Comb);
                    thread::sleep(Duration::from_millis(5));
                    pot.give_back(Tool::Comb);
                    pot.give_back(Tool::Scissor);
                })
            })
            .collect();
        handles.into_iter().for_each(|h| h.join().unwrap());
        assert_eq!(pot.peak(Tool::Scissor), 1);
        assert!(pot.peak(Tool::Comb) <= 2);
        assert_eq!(pot.in_use(Tool::Scissor), 0);
        assert_eq!(pot.total(Tool::Razor), 1);
    }

    #[test]
    fn holding_tools_matches_request() {
        let mut tools = ToolSet::default();
        assert!(holds_tools_for(tools, Request::WashHair));
        assert!(!holds_tools_for(tools, Request::Haircut));
        tools.take(Tool::Scissor);
        tools.take(Tool::Comb);
        assert!(holds_tools_for(tools, Request::Haircut));
        assert!(!holds_tools_for(tools, Request::Shave));
    }
}
