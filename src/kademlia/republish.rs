//! Periodic republishing of stored values.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError, Weak};
use std::thread;
use std::time::{Duration, Instant};

use flume::{Receiver, RecvTimeoutError, Sender};
use tracing::{debug, trace};

use crate::common::{File, Id};

use super::Inner;

/// Registry of republish tasks, one per stored key.
///
/// Each task is a thread that stores its file again at the current closest
/// nodes every `interval`. A task stops when its entry is removed from the
/// registry (dropping the stop sender), or when the [super::Kademlia] it
/// publishes through is dropped.
#[derive(Debug, Default)]
pub(crate) struct Republisher {
    tasks: Mutex<HashMap<Id, Sender<()>>>,
}

impl Republisher {
    /// Start republishing `file`, replacing any task already running for its key.
    pub fn start(&self, kademlia: Weak<Inner>, file: File, interval: Duration) {
        let key = file.key;
        let (stop, stopped) = flume::bounded::<()>(1);

        // Register before spawning, stop_all must see every running task.
        let mut tasks = self.lock();
        if tasks.insert(key, stop).is_some() {
            trace!(?key, "Replaced running republish task");
        }

        thread::spawn(move || run(kademlia, file, interval, stopped));
    }

    /// Stop republishing `key`, returns `false` if it wasn't being republished.
    pub fn stop(&self, key: &Id) -> bool {
        match self.lock().remove(key) {
            Some(stop) => {
                let _ = stop.send(());
                true
            }
            None => false,
        }
    }

    pub fn stop_all(&self) {
        for (_, stop) in self.lock().drain() {
            let _ = stop.send(());
        }
    }

    pub fn keys(&self) -> Vec<Id> {
        self.lock().keys().copied().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Id, Sender<()>>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn run(kademlia: Weak<Inner>, file: File, interval: Duration, stopped: Receiver<()>) {
    let key = file.key;
    let Some(mut next) = Instant::now().checked_add(interval) else {
        debug!(?key, ?interval, "Republish interval out of range");
        return;
    };

    loop {
        match stopped.recv_deadline(next) {
            Err(RecvTimeoutError::Timeout) => {}
            // Stopped explicitly, or the registry was dropped.
            _ => break,
        }

        let Some(kademlia) = kademlia.upgrade() else {
            break;
        };

        debug!(?key, "Republishing");
        let stored_at = kademlia.publish(&file);
        trace!(?key, stored_at, "Republished");

        // Skip firings missed while the lookup was running.
        let now = Instant::now();
        loop {
            match next.checked_add(interval) {
                Some(later) => next = later,
                None => return,
            }

            if next > now {
                break;
            }
        }
    }

    trace!(?key, "Republish task stopped");
}
