//! Primitivas de sincronización que usa la barbería: semáforos de std-semaphore
//! para los avisos entre barbero y cliente, y un buzón de un solo lugar
//! (mutex + condvar) para pasar datos de un hilo al otro.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std_semaphore::Semaphore;

// un lock envenenado solo puede venir de una violación de contrato que ya
// está abortando la simulación, así que seguimos con el estado que haya
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn wait_while<'a, T, F>(condvar: &Condvar, guard: MutexGuard<'a, T>, condition: F) -> MutexGuard<'a, T>
where
    F: FnMut(&mut T) -> bool,
{
    condvar.wait_while(guard, condition).unwrap_or_else(PoisonError::into_inner)
}

/// Buzón con lugar para un solo mensaje: `put` espera a que esté vacío y
/// `take` espera a que haya algo.
pub struct Mailbox<T> {
    slot: Mutex<Option<T>>,
    changed: Condvar,
}

impl<T> Mailbox<T> {
    pub fn new() -> Self {
        Mailbox { slot: Mutex::new(None), changed: Condvar::new() }
    }

    pub fn put(&self, value: T) {
        let mut slot = wait_while(&self.changed, lock(&self.slot), |slot| slot.is_some());
        *slot = Some(value);
        self.changed.notify_all();
    }

    pub fn take(&self) -> T {
        let mut slot = wait_while(&self.changed, lock(&self.slot), |slot| slot.is_none());
        let value = slot.take();
        self.changed.notify_all();
        match value {
            Some(value) => value,
            None => unreachable!("mailbox woke up empty"),
        }
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.slot).is_none()
    }
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Los tres avisos de cada barbero con su cliente actual.
pub struct BarberSignals {
    // el cliente ya se sentó y el servicio puede empezar
    pub client_ready: Semaphore,
    // el barbero terminó un pedido
    pub barber_done: Semaphore,
    // el cliente ya no espera más pedidos de este barbero
    pub all_done: Semaphore,
}

impl BarberSignals {
    pub fn new() -> Self {
        BarberSignals {
            client_ready: Semaphore::new(0),
            barber_done: Semaphore::new(0),
            all_done: Semaphore::new(0),
        }
    }
}

impl Default for BarberSignals {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn mailbox_hands_values_over_in_order() {
        let mailbox = Arc::new(Mailbox::new());
        let producer_box = mailbox.clone();
        let producer = thread::spawn(move || {
            for value in 1..=5 {
                // el segundo put espera a que el consumidor vacíe el buzón
                producer_box.put(value);
            }
        });
        let received: Vec<u32> = (0..5).map(|_| mailbox.take()).collect();
        producer.join().unwrap();
        assert_eq!(received, vec![1, 2, 3, 4, 5]);
        assert!(mailbox.is_empty());
    }

    #[test]
    fn take_blocks_until_a_value_arrives() {
        let mailbox: Arc<Mailbox<&str>> = Arc::new(Mailbox::new());
        let consumer_box = mailbox.clone();
        let consumer = thread::spawn(move || consumer_box.take());
        thread::sleep(Duration::from_millis(20));
        assert!(!consumer.is_finished());
        mailbox.put("listo");
        assert_eq!(consumer.join().unwrap(), "listo");
    }

    #[test]
    fn rendezvous_orders_seated_before_service() {
        let signals = Arc::new(BarberSignals::new());
        let client_signals = signals.clone();
        let client = thread::spawn(move || {
            client_signals.client_ready.release();
            client_signals.barber_done.acquire();
            client_signals.all_done.release();
        });
        signals.client_ready.acquire();
        signals.barber_done.release();
        signals.all_done.acquire();
        client.join().unwrap();
    }
}
