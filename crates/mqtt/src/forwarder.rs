//! Bridge from the internal bus back onto MQTT.
//!
//! Messages that entered through MQTT are skipped so the broker never sees
//! its own traffic twice. Everything else is republished on its wire topic
//! by a short-lived worker. Delivery is at-most-once: a failed republish is
//! logged and counted, never retried, and when `max_in_flight` workers are
//! busy new messages are dropped instead of slowing the subscription down.

use std::io;
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use conduit_messaging::subject::ALL_PROJECTS;
use conduit_messaging::{Message, Publisher, Subscriber, Subscription, to_wire_topic};

use crate::PROTOCOL;

#[derive(Debug, Clone)]
pub struct ForwarderConfig {
    /// Bus pattern to forward.
    pub subject: String,
    /// Messages tagged with this protocol are not forwarded.
    pub protocol: String,
    /// Upper bound on concurrent republishes.
    pub max_in_flight: usize,
    /// How long the loop waits for a message before checking for shutdown.
    pub poll_interval: Duration,
    /// Name for logging.
    pub name: String,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            subject: ALL_PROJECTS.to_string(),
            protocol: PROTOCOL.to_string(),
            max_in_flight: 64,
            poll_interval: Duration::from_millis(100),
            name: "mqtt-forwarder".to_string(),
        }
    }
}

impl ForwarderConfig {
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn with_max_in_flight(mut self, max: usize) -> Self {
        self.max_in_flight = max;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ForwarderStats {
    pub received: u64,
    /// Skipped because they came from the downstream protocol.
    pub skipped: u64,
    pub forwarded: u64,
    pub failed: u64,
    /// Dropped because `max_in_flight` republishes were running.
    pub dropped: u64,
    pub in_flight: usize,
    pub uptime_secs: u64,
}

type SharedStats = Arc<Mutex<ForwarderStats>>;

fn update(stats: &SharedStats, f: impl FnOnce(&mut ForwarderStats)) {
    if let Ok(mut s) = stats.lock() {
        f(&mut s);
    }
}

/// Handle to a running forwarder.
#[derive(Debug)]
pub struct ForwarderHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
    stats: SharedStats,
}

impl ForwarderHandle {
    /// Stop the subscription loop. Republishes already running finish on
    /// their own.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }

    pub fn stats(&self) -> ForwarderStats {
        self.stats.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

pub struct Forwarder {
    config: ForwarderConfig,
}

impl Forwarder {
    pub fn new(config: ForwarderConfig) -> Self {
        Self { config }
    }

    /// Subscribe to `sub` and forward to `downstream` on a background thread.
    ///
    /// The subscription is in place when this returns.
    pub fn spawn(
        self,
        sub: &dyn Subscriber,
        downstream: Arc<dyn Publisher>,
    ) -> io::Result<ForwarderHandle> {
        let subscription = sub.subscribe(&self.config.subject);
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let stats = SharedStats::default();
        let loop_stats = stats.clone();

        let join = thread::Builder::new()
            .name(self.config.name.clone())
            .spawn(move || {
                forward_loop(self.config, subscription, downstream, shutdown_rx, loop_stats);
            })?;

        Ok(ForwarderHandle {
            shutdown: shutdown_tx,
            join: Some(join),
            stats,
        })
    }
}

fn forward_loop(
    config: ForwarderConfig,
    subscription: Subscription<Message>,
    downstream: Arc<dyn Publisher>,
    shutdown_rx: mpsc::Receiver<()>,
    stats: SharedStats,
) {
    info!(forwarder = %config.name, subject = %config.subject, "forwarder started");
    let started = Instant::now();

    loop {
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        let msg = match subscription.recv_timeout(config.poll_interval) {
            Ok(msg) => msg,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                update(&stats, |s| s.uptime_secs = started.elapsed().as_secs());
                continue;
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                warn!(forwarder = %config.name, "bus subscription closed");
                break;
            }
        };

        handle(&config, msg, &downstream, &stats);
    }

    info!(forwarder = %config.name, "forwarder stopped");
}

fn handle(config: &ForwarderConfig, msg: Message, downstream: &Arc<dyn Publisher>, stats: &SharedStats) {
    if msg.protocol == config.protocol {
        update(stats, |s| {
            s.received += 1;
            s.skipped += 1;
        });
        return;
    }

    let mut admitted = false;
    update(stats, |s| {
        s.received += 1;
        if s.in_flight < config.max_in_flight {
            s.in_flight += 1;
            admitted = true;
        } else {
            s.dropped += 1;
        }
    });
    if !admitted {
        warn!(forwarder = %config.name, project = %msg.project, "republish limit reached, dropping message");
        return;
    }

    let topic = to_wire_topic(&msg.project, &msg.subtopic);
    let worker_stats = stats.clone();
    let downstream = downstream.clone();
    let name = config.name.clone();

    let spawned = thread::Builder::new()
        .name(format!("{}-worker", config.name))
        .spawn(move || {
            let res = downstream.publish(&topic, msg);
            update(&worker_stats, |s| {
                s.in_flight = s.in_flight.saturating_sub(1);
                if res.is_ok() {
                    s.forwarded += 1;
                } else {
                    s.failed += 1;
                }
            });
            match res {
                Ok(()) => debug!(forwarder = %name, topic = %topic, "forwarded message"),
                Err(e) => warn!(forwarder = %name, topic = %topic, error = %e, "failed to forward message"),
            }
        });

    if let Err(e) = spawned {
        warn!(forwarder = %config.name, error = %e, "failed to spawn republish worker");
        update(stats, |s| {
            s.in_flight = s.in_flight.saturating_sub(1);
            s.failed += 1;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_messaging::{BusError, InMemoryBus};
    use std::sync::Condvar;

    #[derive(Default)]
    struct Recording(Mutex<Vec<String>>);

    impl Publisher for Recording {
        fn publish(&self, subject: &str, _message: Message) -> Result<(), BusError> {
            self.0.lock().unwrap().push(subject.to_string());
            Ok(())
        }
    }

    /// Blocks every republish until released.
    #[derive(Default)]
    struct Gate {
        open: Mutex<bool>,
        cv: Condvar,
    }

    impl Gate {
        fn release(&self) {
            *self.open.lock().unwrap() = true;
            self.cv.notify_all();
        }
    }

    impl Publisher for Gate {
        fn publish(&self, _subject: &str, _message: Message) -> Result<(), BusError> {
            let mut open = self.open.lock().unwrap();
            while !*open {
                open = self.cv.wait(open).unwrap();
            }
            Err(BusError::Transport("broker gone".into()))
        }
    }

    fn send(bus: &InMemoryBus, protocol: &str, subtopic: &str) {
        let msg = Message::new(protocol, "p1", subtopic, b"1".to_vec());
        bus.publish(&msg.subject(), msg).unwrap();
    }

    fn wait_for(handle: &ForwarderHandle, done: impl Fn(&ForwarderStats) -> bool) -> ForwarderStats {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let stats = handle.stats();
            if done(&stats) || Instant::now() > deadline {
                return stats;
            }
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn mqtt_traffic_is_not_looped_back() {
        let bus = InMemoryBus::new();
        let downstream = Arc::new(Recording::default());
        let handle = Forwarder::new(ForwarderConfig::default())
            .spawn(&bus, downstream.clone())
            .unwrap();

        send(&bus, "mqtt", "a");
        send(&bus, "http", "a.b");
        send(&bus, "http", "");

        let stats = wait_for(&handle, |s| s.forwarded == 2 && s.skipped == 1);
        assert_eq!(stats.received, 3);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.forwarded, 2);

        let mut topics = downstream.0.lock().unwrap().clone();
        topics.sort();
        assert_eq!(topics, ["projects/p1/messages", "projects/p1/messages/a/b"]);

        handle.shutdown();
    }

    #[test]
    fn saturated_forwarder_drops_instead_of_blocking() {
        let bus = InMemoryBus::new();
        let gate = Arc::new(Gate::default());
        let handle = Forwarder::new(ForwarderConfig::default().with_max_in_flight(2))
            .spawn(&bus, gate.clone())
            .unwrap();

        for _ in 0..5 {
            send(&bus, "http", "x");
        }

        let stats = wait_for(&handle, |s| s.received == 5);
        assert_eq!(stats.in_flight, 2);
        assert_eq!(stats.dropped, 3);

        gate.release();
        let stats = wait_for(&handle, |s| s.in_flight == 0 && s.failed == 2);
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.forwarded, 0);

        handle.shutdown();
    }
}
