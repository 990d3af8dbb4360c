//! Change-notified value cells.
//!
//! An `Observable` holds one value. Each `Subscription` owns a channel the
//! cell pushes into whenever the value changes, so observers are never called
//! back inside the writer's own call. Dropping a subscription detaches it.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

struct Cell<T> {
    value: T,
    subscribers: Vec<(u64, Sender<T>)>,
    next_id: u64,
}

type Shared<T> = Arc<Mutex<Cell<T>>>;

fn lock<T>(cell: &Mutex<Cell<T>>) -> MutexGuard<'_, Cell<T>> {
    cell.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A value readable by anyone and writable only by the coordinator.
pub struct Observable<T> {
    cell: Shared<T>,
}

impl<T: Clone + PartialEq> Observable<T> {
    pub fn new(value: T) -> Self {
        Self {
            cell: Arc::new(Mutex::new(Cell {
                value,
                subscribers: Vec::new(),
                next_id: 0,
            })),
        }
    }

    pub fn get(&self) -> T {
        lock(&self.cell).value.clone()
    }

    /// Attach a new observer. It receives the current value first.
    pub fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = mpsc::channel();
        let mut cell = lock(&self.cell);
        let id = cell.next_id;
        cell.next_id += 1;
        let _ = tx.send(cell.value.clone());
        cell.subscribers.push((id, tx));
        Subscription {
            id,
            rx,
            cell: Arc::downgrade(&self.cell),
        }
    }

    #[cfg(test)]
    pub fn subscriber_count(&self) -> usize {
        lock(&self.cell).subscribers.len()
    }

    /// Store `value` and push it to every subscriber. Returns whether it changed.
    pub(super) fn set(&self, value: T) -> bool {
        let mut cell = lock(&self.cell);
        if cell.value == value {
            return false;
        }
        cell.value = value;
        let Cell {
            value, subscribers, ..
        } = &mut *cell;
        subscribers.retain(|(_, tx)| tx.send(value.clone()).is_ok());
        true
    }
}

/// Receiving end of an `Observable`.
pub struct Subscription<T> {
    id: u64,
    rx: Receiver<T>,
    cell: Weak<Mutex<Cell<T>>>,
}

impl<T> Subscription<T> {
    /// Next pushed value, if one is waiting.
    #[cfg(test)]
    pub fn try_next(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Drain pending values and keep only the newest.
    pub fn latest(&self) -> Option<T> {
        self.rx.try_iter().last()
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(cell) = self.cell.upgrade() {
            lock(&cell).subscribers.retain(|(id, _)| *id != self.id);
        }
    }
}
