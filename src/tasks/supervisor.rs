// FallWatch — Supervisor
//
// The boot thread keeps the join handles of the critical tasks and checks
// them once per health interval.  If any has terminated (returned or
// panicked) the only recovery is a full restart.

use std::thread::{self, JoinHandle};
use std::time::Duration;

pub struct Supervisor {
    tasks: Vec<(&'static str, JoinHandle<()>)>,
    interval: Duration,
}

impl Supervisor {
    pub fn new(interval: Duration) -> Self {
        Self {
            tasks: Vec::new(),
            interval,
        }
    }

    /// Register a task whose death must bring the system down.
    pub fn watch(&mut self, name: &'static str, handle: JoinHandle<()>) {
        self.tasks.push((name, handle));
    }

    /// Name of the first watched task that is no longer running.
    pub fn first_dead(&self) -> Option<&'static str> {
        self.tasks
            .iter()
            .find(|(_, handle)| handle.is_finished())
            .map(|(name, _)| *name)
    }

    /// Poll forever; on the first dead task call `restart`.
    pub fn run(self, restart: fn() -> !) -> ! {
        log::info!("Supervising {} task(s)", self.tasks.len());
        loop {
            thread::sleep(self.interval);
            if let Some(name) = self.first_dead() {
                log::error!("Critical task '{}' died, restarting system", name);
                restart();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc;

    #[test]
    fn detects_finished_task() {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let mut supervisor = Supervisor::new(Duration::from_millis(10));

        supervisor.watch(
            "sampler",
            thread::spawn(move || {
                let _ = stop_rx.recv();
            }),
        );
        supervisor.watch("inference", thread::spawn(|| {}));

        // The inference stand-in exits immediately.
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while supervisor.first_dead().is_none() && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(supervisor.first_dead(), Some("inference"));
        drop(stop_tx);
    }

    #[test]
    fn detects_panicked_task() {
        let mut supervisor = Supervisor::new(Duration::from_millis(10));
        supervisor.watch("sampler", thread::spawn(|| panic!("bus fault")));

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while supervisor.first_dead().is_none() && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(supervisor.first_dead(), Some("sampler"));
    }

    static RESTARTED: AtomicBool = AtomicBool::new(false);

    fn record_restart() -> ! {
        RESTARTED.store(true, Ordering::SeqCst);
        loop {
            thread::park();
        }
    }

    #[test]
    fn run_restarts_when_a_task_dies() {
        let mut supervisor = Supervisor::new(Duration::from_millis(5));
        supervisor.watch("inference", thread::spawn(|| {}));
        thread::spawn(move || {
            supervisor.run(record_restart);
        });

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while !RESTARTED.load(Ordering::SeqCst) && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(RESTARTED.load(Ordering::SeqCst));
    }

    #[test]
    fn healthy_tasks_report_nothing() {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let mut supervisor = Supervisor::new(Duration::from_millis(10));
        supervisor.watch(
            "sampler",
            thread::spawn(move || {
                let _ = stop_rx.recv();
            }),
        );
        assert_eq!(supervisor.first_dead(), None);
        drop(stop_tx);
    }
}
