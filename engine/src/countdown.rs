use std::{sync::Arc, time::Duration};

use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::debug;

/// Something driven by the countdown. Returning false ends the countdown task.
pub trait Ticking: Send + 'static {
    fn tick(&mut self) -> bool;
}

/// Spawns a task that ticks `target` once per `period`, starting one period from now. Each tick
/// takes the same lock as every other mutation of `target`.
pub fn spawn_countdown<T: Ticking>(target: Arc<Mutex<T>>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            let mut target = target.lock().await;
            if !target.tick() {
                break;
            }
        }

        debug!("Countdown task finished");
    })
}

/// Owned handle to a running countdown task.
#[derive(Debug, Default)]
pub struct Countdown {
    handle: Option<JoinHandle<()>>,
}

impl Countdown {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn start(&mut self, handle: JoinHandle<()>) {
        self.stop();
        self.handle = Some(handle);
    }

    pub fn is_armed(&self) -> bool {
        self.handle.is_some()
    }

    /// Cancels the task. Safe to call any number of times.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("Countdown stopped");
        }
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.stop();
    }
}
