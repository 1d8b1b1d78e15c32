//! Single-consumer runtime loop.
//!
//! Every producer (debouncer, sensor thread, console) pushes into one
//! [`EventQueue`]; this loop is the only consumer.  It owns the
//! [`PlayerService`] and every driven port, so nothing here needs a lock.
//!
//! ```text
//!   loop {
//!       wake = min(next timer deadline, next engine poll, next status)
//!       ev   = queue.recv_until(wake)
//!       step(ev)          // handle ev, fire due timers, poll engine, status
//!   } until stop flag
//!   shutdown()            // cancel timers, stop engine, indicators off
//! ```
//!
//! The wait is never longer than the engine poll period, which also bounds
//! how long a shutdown request goes unnoticed.

use core::sync::atomic::{AtomicBool, Ordering};

use embassy_time::{Duration, Instant};
use log::info;

use crate::config::PlayerConfig;
use crate::events::{EventQueue, StampedEvent};

use super::events::AppEvent;
use super::ports::{Clock, EventSink, IndicatorPort, PipelinePort, PlaybackEngine, Ports};
use super::service::PlayerService;

pub struct PlayerRuntime<'q, E, I, P, S, C> {
    service: PlayerService,
    ports: Ports<E, I, P, S>,
    queue: &'q EventQueue,
    clock: C,
    engine_poll: Duration,
    status_interval: Duration,
    next_engine_poll: Instant,
    next_status: Instant,
    handled: u64,
}

impl<'q, E, I, P, S, C> PlayerRuntime<'q, E, I, P, S, C>
where
    E: PlaybackEngine,
    I: IndicatorPort,
    P: PipelinePort,
    S: EventSink,
    C: Clock,
{
    pub fn new(
        cfg: &PlayerConfig,
        service: PlayerService,
        ports: Ports<E, I, P, S>,
        queue: &'q EventQueue,
        clock: C,
    ) -> Self {
        let now = clock.now();
        Self {
            service,
            ports,
            queue,
            clock,
            engine_poll: cfg.engine_poll(),
            status_interval: cfg.status_interval(),
            next_engine_poll: now,
            next_status: now + cfg.status_interval(),
            handled: 0,
        }
    }

    pub fn start(&mut self) {
        let now = self.clock.now();
        self.service.start(now, &mut self.ports);
        self.next_engine_poll = now + self.engine_poll;
        self.next_status = now + self.status_interval;
    }

    /// Consume events until `stop` is set, then clean up.
    pub fn run(&mut self, stop: &AtomicBool) {
        self.start();
        while !stop.load(Ordering::Acquire) {
            let ev = self.queue.recv_until(Some(self.wake_deadline()));
            self.step(ev);
        }
        info!("runtime stopping after {} events", self.handled);
        self.shutdown();
    }

    /// When the loop must wake even without an event.
    pub fn wake_deadline(&self) -> Instant {
        let mut wake = self.next_engine_poll.min(self.next_status);
        if let Some(timer) = self.service.next_deadline() {
            wake = wake.min(timer);
        }
        wake
    }

    /// One loop iteration: handle `ev` if present, then do the time-driven
    /// work due at the clock's current time.
    pub fn step(&mut self, ev: Option<StampedEvent>) {
        if let Some(ev) = ev {
            self.handled += 1;
            self.service.handle(ev, &mut self.ports);
        }

        let now = self.clock.now();
        self.service.fire_timers(now, &mut self.ports);

        if now >= self.next_engine_poll {
            self.service.poll_engine(now, &mut self.ports);
            self.next_engine_poll = now + self.engine_poll;
        }

        if now >= self.next_status {
            let snap = self.service.status(now, self.queue.dropped());
            self.ports.sink.emit(&AppEvent::Status(snap));
            self.next_status = now + self.status_interval;
        }
    }

    /// Handle everything already queued without blocking.  Returns the
    /// number of events consumed.
    pub fn drain(&mut self) -> usize {
        let mut n = 0;
        while let Some(ev) = self.queue.try_pop() {
            self.step(Some(ev));
            n += 1;
        }
        n
    }

    pub fn shutdown(&mut self) {
        self.service.shutdown(&mut self.ports);
    }

    pub fn service(&self) -> &PlayerService {
        &self.service
    }

    pub fn ports(&self) -> &Ports<E, I, P, S> {
        &self.ports
    }

    pub fn ports_mut(&mut self) -> &mut Ports<E, I, P, S> {
        &mut self.ports
    }
}
