//! Background thread that steps a [`Simulation`] until it is stopped.

use std::{
    io, panic,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use log::{debug, error};

use crate::{simulation::Simulation, snapshot::SnapshotReader};

/// Longest sleep between two checks of the running flag.
const MAX_SLEEP: Duration = Duration::from_millis(5);

#[derive(Debug)]
struct Worker {
    running: Arc<AtomicBool>,
    handle: JoinHandle<u64>,
}

/// Runs [`Simulation::step`] repeatedly on a dedicated thread.
///
/// Other threads observe the bodies through a [`SnapshotReader`] while the
/// scheduler is running. Direct access to the simulation is only handed out
/// while it is idle.
#[derive(Debug)]
pub struct Scheduler {
    simulation: Arc<Mutex<Simulation>>,
    reader: SnapshotReader,
    worker: Option<Worker>,
}

impl Scheduler {
    #[must_use]
    pub fn new(simulation: Simulation) -> Self {
        let reader = simulation.reader();
        Self {
            simulation: Arc::new(Mutex::new(simulation)),
            reader,
            worker: None,
        }
    }

    /// Start stepping on a new thread.
    ///
    /// With `target_dt == 0` every step uses the wall-clock time measured since
    /// the previous one. Otherwise a step of exactly `target_dt` is taken once
    /// at least that much time has passed. Time beyond `target_dt` is dropped,
    /// not carried over to the next step.
    ///
    /// # Panics
    /// If the scheduler is already running or `target_dt` is negative or not finite.
    pub fn start(&mut self, target_dt: f32) -> io::Result<()> {
        assert!(self.worker.is_none(), "scheduler is already running");
        assert!(
            target_dt.is_finite() && target_dt >= 0.,
            "target time step has to be finite and non-negative, got {target_dt}"
        );

        // readers see the bodies added since the last step right away
        lock(&self.simulation).publish();

        let running = Arc::new(AtomicBool::new(true));
        let handle = thread::Builder::new().name("barnes-hut".into()).spawn({
            let simulation = Arc::clone(&self.simulation);
            let running = Arc::clone(&running);
            move || run(&simulation, &running, target_dt)
        })?;

        debug!("scheduler started with target dt = {target_dt}");
        self.worker = Some(Worker { running, handle });
        Ok(())
    }

    /// Stop stepping and wait for the thread to exit.
    ///
    /// No step happens after this returns. Does nothing if the scheduler is idle.
    ///
    /// # Panics
    /// If the stepping thread panicked, the panic is resumed here.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        worker.running.store(false, Ordering::Release);
        match worker.handle.join() {
            Ok(steps) => debug!("scheduler stopped after {steps} steps"),
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    #[must_use]
    pub fn reader(&self) -> SnapshotReader {
        self.reader.clone()
    }

    /// Exclusive access to the simulation, `None` while running.
    #[must_use]
    pub fn simulation(&self) -> Option<MutexGuard<'_, Simulation>> {
        if self.is_running() {
            return None;
        }
        Some(lock(&self.simulation))
    }

    /// Stop the scheduler and take back the simulation.
    #[must_use]
    pub fn into_simulation(mut self) -> Simulation {
        self.stop();
        let simulation = Arc::clone(&self.simulation);
        drop(self);

        match Arc::try_unwrap(simulation) {
            Ok(simulation) => simulation.into_inner().unwrap_or_else(PoisonError::into_inner),
            // the stepping thread has been joined
            Err(_) => unreachable!(),
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        worker.running.store(false, Ordering::Release);
        if worker.handle.join().is_err() {
            error!("stepping thread panicked");
        }
    }
}

fn lock(simulation: &Mutex<Simulation>) -> MutexGuard<'_, Simulation> {
    simulation.lock().unwrap_or_else(PoisonError::into_inner)
}

fn run(simulation: &Mutex<Simulation>, running: &AtomicBool, target_dt: f32) -> u64 {
    let mut steps = 0;
    let mut last_step = Instant::now();

    while running.load(Ordering::Acquire) {
        let elapsed = last_step.elapsed();

        if target_dt > 0. {
            let target = Duration::from_secs_f32(target_dt);
            if elapsed < target {
                thread::sleep((target - elapsed).min(MAX_SLEEP));
                continue;
            }
            last_step = Instant::now();
            lock(simulation).step(target_dt);
        } else {
            last_step = Instant::now();
            lock(simulation).step(elapsed.as_secs_f32());
        }

        steps += 1;
    }

    steps
}
