use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use interface::{trim_type_name, Update};

/// Polling loop of a unit
///
/// The worker thread updates the unit and sleeps for the polling interval
/// until the stop flag is raised.
pub struct Worker {
    name: String,
    interval: Duration,
    unit: Box<dyn Update>,
}

impl Worker {
    pub fn new<U: Update + 'static>(name: impl Into<String>, interval: Duration, unit: U) -> Self {
        log::debug!("new worker for {}", trim_type_name::<U>());
        Self {
            name: name.into(),
            interval,
            unit: Box::new(unit),
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    /// Spawns the worker thread
    pub fn spawn(self, stop: Arc<AtomicBool>) -> std::io::Result<JoinHandle<()>> {
        let Self {
            name,
            interval,
            mut unit,
        } = self;
        thread::Builder::new().name(name.clone()).spawn(move || {
            log::debug!("{name} loop started ({interval:?})");
            while !stop.load(Ordering::Acquire) {
                unit.update();
                thread::sleep(interval);
            }
            log::debug!("{name} loop ended");
        })
    }
}

/// Handle to the running worker threads
///
/// The threads are stopped and joined when the handle is dropped.
pub struct Running {
    stop: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl Running {
    /// Spawns the workers
    pub fn spawn(workers: Vec<Worker>) -> crate::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let mut running = Self {
            stop: stop.clone(),
            handles: Vec::with_capacity(workers.len()),
        };
        for worker in workers {
            let name = worker.name().to_string();
            let handle = worker
                .spawn(stop.clone())
                .map_err(|e| crate::SofbError::Spawn(name, e))?;
            running.handles.push(handle);
        }
        Ok(running)
    }
    /// Number of live worker threads
    pub fn len(&self) -> usize {
        self.handles.iter().filter(|h| !h.is_finished()).count()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Stops and joins the worker threads
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        for handle in self.handles.drain(..) {
            let name = handle.thread().name().unwrap_or("worker").to_string();
            if handle.join().is_err() {
                log::warn!("{name} thread panicked");
            }
        }
    }
}

impl Drop for Running {
    fn drop(&mut self) {
        self.stop();
    }
}
