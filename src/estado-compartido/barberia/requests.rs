//! Servicios que puede pedir un cliente y herramientas que usa un barbero,
//! ambos como conjuntos de banderas.

use rand::Rng;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Request {
    Haircut = 1,
    WashHair = 2,
    Shave = 4,
}

/// Lugar donde se atiende un pedido.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkplaceKind {
    Chair,
    Basin,
}

impl Request {
    // orden en que el barbero atiende: primero afeitar, después lavar, al final cortar
    pub const BY_PRIORITY: [Request; 3] = [Request::Shave, Request::WashHair, Request::Haircut];

    fn bit(self) -> u8 {
        self as u8
    }

    pub fn workplace(self) -> WorkplaceKind {
        match self {
            Request::Haircut | Request::Shave => WorkplaceKind::Chair,
            Request::WashHair => WorkplaceKind::Basin,
        }
    }

    /// Herramientas que hay que tomar del pote, en el orden en que se toman.
    pub fn tools(self) -> &'static [Tool] {
        match self {
            Request::Haircut => &[Tool::Scissor, Tool::Comb],
            Request::Shave => &[Tool::Razor],
            Request::WashHair => &[],
        }
    }
}

#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RequestSet(u8);

impl RequestSet {
    pub fn empty() -> Self {
        RequestSet(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn contains(&self, request: Request) -> bool {
        self.0 & request.bit() != 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn insert(&mut self, request: Request) {
        assert!(!self.contains(request), "request {:?} selected twice", request);
        self.0 |= request.bit();
    }

    /// Marca un pedido como cumplido. Cumplir dos veces el mismo pedido es un error de contrato.
    pub fn fulfill(&mut self, request: Request) {
        assert!(self.contains(request), "request {:?} fulfilled twice or never requested", request);
        self.0 &= !request.bit();
    }

    /// Próximo pedido a atender según la prioridad fija SHAVE > WASH_HAIR > HAIRCUT.
    pub fn next_by_priority(&self) -> Option<Request> {
        Request::BY_PRIORITY.into_iter().find(|request| self.contains(*request))
    }

    pub fn iter(&self) -> impl Iterator<Item = Request> + '_ {
        Request::BY_PRIORITY.into_iter().filter(|request| self.contains(*request))
    }

    // H W S como en el tablero, ':' cuando falta
    pub fn flags(&self) -> String {
        [(Request::Haircut, 'H'), (Request::WashHair, 'W'), (Request::Shave, 'S')]
            .iter()
            .map(|(request, c)| if self.contains(*request) { *c } else { ':' })
            .collect()
    }
}

impl FromIterator<Request> for RequestSet {
    fn from_iter<I: IntoIterator<Item = Request>>(iter: I) -> Self {
        let mut set = RequestSet::empty();
        for request in iter {
            set.insert(request);
        }
        set
    }
}

impl fmt::Debug for RequestSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RequestSet({})", self.flags())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tool {
    Scissor = 1,
    Comb = 2,
    Razor = 4,
}

impl Tool {
    pub const ALL: [Tool; 3] = [Tool::Scissor, Tool::Comb, Tool::Razor];

    pub(crate) fn index(self) -> usize {
        match self {
            Tool::Scissor => 0,
            Tool::Comb => 1,
            Tool::Razor => 2,
        }
    }
}

/// Herramientas que tiene un barbero en la mano.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct ToolSet(u8);

impl ToolSet {
    pub fn contains(&self, tool: Tool) -> bool {
        self.0 & tool as u8 != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn take(&mut self, tool: Tool) {
        assert!(!self.contains(tool), "already holding a {:?}", tool);
        self.0 |= tool as u8;
    }

    pub fn drop_tool(&mut self, tool: Tool) {
        assert!(self.contains(tool), "returning a {:?} that is not held", tool);
        self.0 &= !(tool as u8);
    }

    pub fn flags(&self) -> String {
        [(Tool::Scissor, 'S'), (Tool::Comb, 'C'), (Tool::Razor, 'R')]
            .iter()
            .map(|(tool, c)| if self.contains(*tool) { *c } else { '-' })
            .collect()
    }
}

impl fmt::Debug for ToolSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ToolSet({})", self.flags())
    }
}

/// Pesos configurados para elegir cada servicio (0..=100).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServiceWeights {
    pub haircut: u32,
    pub wash_hair: u32,
    pub shave: u32,
}

impl ServiceWeights {
    // orden de candidatos: corte, afeitado, lavado
    pub fn candidates(&self) -> Vec<(Request, u32)> {
        vec![
            (Request::Haircut, self.haircut),
            (Request::Shave, self.shave),
            (Request::WashHair, self.wash_hair),
        ]
    }
}

/// Elige entre 1 y 3 servicios distintos, muestreando por peso sin reemplazo.
pub fn select_requests<R: Rng + ?Sized>(rng: &mut R, weights: &ServiceWeights) -> RequestSet {
    let how_many = rng.gen_range(1..=3);
    let mut candidates = weights.candidates();
    let mut selected = RequestSet::empty();
    for _ in 0..how_many {
        match draw_request(rng, &candidates) {
            Some(index) => selected.insert(candidates.remove(index).0),
            // si los que quedan pesan cero no hay nada más que sortear
            None => break,
        }
    }
    selected
}

/// Sortea un candidato: suma acumulada de pesos, número uniforme en [1, total]
/// y el primer índice cuya suma acumulada alcanza ese número.
pub fn draw_request<R: Rng + ?Sized>(rng: &mut R, candidates: &[(Request, u32)]) -> Option<usize> {
    let prefix: Vec<u32> = candidates
        .iter()
        .scan(0u32, |acc, (_, weight)| {
            *acc += weight;
            Some(*acc)
        })
        .collect();
    let total = *prefix.last()?;
    if total == 0 {
        return None;
    }
    let draw = rng.gen_range(1..=total);
    Some(find_ceil(&prefix, draw))
}

// menor índice con prefix[i] >= value (prefix es no decreciente)
fn find_ceil(prefix: &[u32], value: u32) -> usize {
    prefix.partition_point(|&acc| acc < value)
}
