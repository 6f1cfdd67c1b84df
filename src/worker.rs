//! C4 — the dispatcher: a single logical execution context per pool that
//! serialises every state mutation, as a `tokio` task reached only through
//! message-passing handles.

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc, Mutex,
    },
    time::Instant,
};

use tokio::sync::{mpsc, oneshot};

use crate::{
    connection::{Connection, PoolId, Transport},
    connector::Connector,
    endpoint::Endpoint,
    error::{PoolError, Result},
    events::EventEmitter,
    health::HealthChecker,
    options::{PoolOptions, TimeoutMode},
    reservoir::IdleReservoir,
    task::AcquireTask,
};

/// Checkout requests. Kept on a separate channel from [`ControlMessage`] so
/// the dispatcher can prioritise check-ins, closes, and connect completions
/// over new checkouts — mirroring the priority the teacher's pool gives
/// management requests over checkout requests in its `select!` loop.
pub(crate) enum RequestMessage {
    Acquire(oneshot::Sender<Result<Connection>>),
}

pub(crate) enum ControlMessage {
    Release(Connection, oneshot::Sender<Result<()>>),
    Close(oneshot::Sender<()>),
    ConnectCompleted(u64, std::result::Result<Box<dyn Transport>, PoolError>),
    TimerExpired(u64),
}

/// Handles shared with a [`crate::pool::Pool`]; everything the dispatcher
/// updates that must be readable from outside without a channel round trip.
pub(crate) struct SharedState {
    pub(crate) acquired_count: Arc<AtomicU32>,
    pub(crate) last_active: Arc<Mutex<Instant>>,
}

pub(crate) struct PoolWorker<C, H> {
    pool_id: PoolId,
    endpoint: Endpoint,
    options: PoolOptions,
    connector: Arc<C>,
    health_checker: Arc<H>,
    events: EventEmitter,

    closed: bool,
    acquired_count: Arc<AtomicU32>,
    last_active: Arc<Mutex<Instant>>,
    next_connection_id: u64,
    next_task_id: u64,

    reservoir: IdleReservoir,
    pending_queue: VecDeque<AcquireTask>,
    in_flight: HashMap<u64, AcquireTask>,

    request_rx: mpsc::UnboundedReceiver<RequestMessage>,
    control_rx: mpsc::UnboundedReceiver<ControlMessage>,
    control_tx: mpsc::UnboundedSender<ControlMessage>,
}

impl<C, H> PoolWorker<C, H>
where
    C: Connector,
    H: HealthChecker,
{
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn start(
        pool_id: PoolId,
        endpoint: Endpoint,
        options: PoolOptions,
        connector: C,
        health_checker: H,
        events: EventEmitter,
    ) -> (
        mpsc::UnboundedSender<RequestMessage>,
        mpsc::UnboundedSender<ControlMessage>,
        SharedState,
    ) {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (control_tx, control_rx) = mpsc::unbounded_channel();

        let acquired_count = Arc::new(AtomicU32::new(0));
        let last_active = Arc::new(Mutex::new(Instant::now()));
        let shared = SharedState {
            acquired_count: acquired_count.clone(),
            last_active: last_active.clone(),
        };

        let worker = PoolWorker {
            pool_id,
            endpoint,
            reservoir: IdleReservoir::new(options.selection_order),
            options,
            connector: Arc::new(connector),
            health_checker: Arc::new(health_checker),
            events,
            closed: false,
            acquired_count,
            last_active,
            next_connection_id: 1,
            next_task_id: 1,
            pending_queue: VecDeque::new(),
            in_flight: HashMap::new(),
            request_rx,
            control_rx,
            control_tx: control_tx.clone(),
        };

        worker.events.pool_created();
        tokio::spawn(worker.run());

        (request_tx, control_tx, shared)
    }

    async fn run(mut self) {
        let mut requests_open = true;

        loop {
            // Biased: control events (check-ins, close, connect completions,
            // timer expiries) always win over new checkout requests, so a
            // slot freeing up is reflected before a fresh acquire is even
            // considered for it.
            let message = tokio::select! {
                biased;

                control = self.control_rx.recv() => match control {
                    Some(message) => message,
                    // No handle, and no in-flight connect attempt, can ever
                    // send on this channel again: treat it as an implicit
                    // close and shut down.
                    None => {
                        if !self.closed {
                            self.handle_close(shutdown_sink());
                        }
                        break;
                    }
                },
                request = self.request_rx.recv(), if requests_open => match request {
                    Some(message) => {
                        let RequestMessage::Acquire(sink) = message;
                        self.handle_acquire(sink);
                        continue;
                    }
                    None => {
                        requests_open = false;
                        continue;
                    }
                },
            };

            match message {
                ControlMessage::Release(conn, sink) => self.handle_release(conn, sink),
                ControlMessage::Close(ack) => self.handle_close(ack),
                ControlMessage::ConnectCompleted(id, outcome) => {
                    self.handle_connect_completed(id, outcome)
                }
                ControlMessage::TimerExpired(id) => self.handle_timer_expired(id),
            }
        }
    }

    fn touch(&self) {
        *self.last_active.lock().unwrap() = Instant::now();
    }

    fn set_acquired_count(&self, value: u32) {
        self.acquired_count.store(value, Ordering::Relaxed);
    }

    fn acquired_count(&self) -> u32 {
        self.acquired_count.load(Ordering::Relaxed)
    }

    fn handle_acquire(&mut self, sink: oneshot::Sender<Result<Connection>>) {
        self.touch();
        self.events.checkout_started();
        let id = self.next_task_id;
        self.next_task_id += 1;
        let mut task = AcquireTask::new(id, sink, self.options.acquire_timeout);

        if self.closed {
            task.complete(Err(PoolError::PoolClosed {
                endpoint: self.endpoint.to_string(),
            }));
            return;
        }

        if self.acquired_count() < self.options.capacity {
            task.mark_acquired();
            self.set_acquired_count(self.acquired_count() + 1);
            self.begin_connection_acquisition(task);
        } else if self.pending_queue.len() < self.options.max_pending as usize {
            if self.options.timeout_mode != TimeoutMode::None {
                if let Some(timeout) = self.options.acquire_timeout {
                    let control_tx = self.control_tx.clone();
                    let handle = tokio::spawn(async move {
                        tokio::time::sleep(timeout).await;
                        let _ = control_tx.send(ControlMessage::TimerExpired(id));
                    });
                    task.set_timer(handle);
                }
            }
            self.pending_queue.push_back(task);
        } else {
            task.complete(Err(PoolError::TooManyOutstanding {
                endpoint: self.endpoint.to_string(),
                max_pending: self.options.max_pending,
            }));
        }
    }

    /// Drives the connection acquisition for a task whose acquired-flag has
    /// already been raised: reservoir first, then the connector.
    fn begin_connection_acquisition(&mut self, mut task: AcquireTask) {
        task.cancel_timer();

        loop {
            let Some(mut conn) = self.reservoir.take() else {
                break;
            };
            if self.health_checker.is_healthy(&conn) {
                conn.mark_acquired();
                self.events.acquired(&conn);
                task.complete(Ok(conn));
                return;
            } else {
                conn.mark_closed();
                self.events.closed(conn.id(), "unhealthy idle connection");
                continue;
            }
        }

        let task_id = task.id;
        let endpoint = self.endpoint;
        let connector = self.connector.clone();
        let control_tx = self.control_tx.clone();
        self.in_flight.insert(task_id, task);

        tokio::spawn(async move {
            let outcome = connector
                .connect(endpoint)
                .await
                .map_err(|e| PoolError::connect_failed(endpoint, e));
            let _ = control_tx.send(ControlMessage::ConnectCompleted(task_id, outcome));
        });
    }

    /// While a slot is free and waiters remain, promote the head of the
    /// queue into a connection acquisition.
    fn dispatch_loop(&mut self) {
        while self.acquired_count() < self.options.capacity {
            let Some(mut task) = self.pending_queue.pop_front() else {
                break;
            };
            task.mark_acquired();
            self.set_acquired_count(self.acquired_count() + 1);
            self.begin_connection_acquisition(task);
        }
    }

    fn handle_connect_completed(
        &mut self,
        task_id: u64,
        outcome: std::result::Result<Box<dyn Transport>, PoolError>,
    ) {
        let Some(task) = self.in_flight.remove(&task_id) else {
            // The task was already resolved (pool closed underneath it); if
            // the connect still succeeded, there is nobody left to hand the
            // connection to, so let it drop and close.
            return;
        };

        match outcome {
            Ok(stream) => {
                let id = self.next_connection_id;
                self.next_connection_id += 1;
                let conn = Connection::new(id, self.endpoint, self.pool_id, stream);
                self.events.created(&conn);
                self.events.acquired(&conn);
                task.complete(Ok(conn));
            }
            Err(e) => {
                // The acquired-flag was raised before the connector was
                // invoked, so a failure here always frees a slot.
                self.set_acquired_count(self.acquired_count() - 1);
                self.dispatch_loop();
                task.complete(Err(e));
            }
        }
    }

    fn handle_timer_expired(&mut self, task_id: u64) {
        let Some(pos) = self.pending_queue.iter().position(|t| t.id == task_id) else {
            // Already dispatched or cancelled between the timer firing and
            // this message being processed.
            return;
        };
        let mut task = self.pending_queue.remove(pos).unwrap();

        match self.options.timeout_mode {
            TimeoutMode::Fail => {
                let waited = task.waited();
                task.complete(Err(PoolError::AcquireTimeout {
                    endpoint: self.endpoint.to_string(),
                    waited_ms: waited.as_millis() as u64,
                }));
            }
            TimeoutMode::New => {
                // Deliberate over-commit: bypass the capacity check so the
                // waiter is never starved under sustained contention.
                task.mark_acquired();
                self.set_acquired_count(self.acquired_count() + 1);
                self.begin_connection_acquisition(task);
            }
            TimeoutMode::None => {
                unreachable!("timers are never scheduled when timeout_mode is None")
            }
        }
    }

    fn handle_release(&mut self, mut conn: Connection, sink: oneshot::Sender<Result<()>>) {
        self.touch();

        if self.closed {
            conn.mark_closed();
            self.events.closed(conn.id(), "pool closed");
            let _ = sink.send(Err(PoolError::PoolClosed {
                endpoint: self.endpoint.to_string(),
            }));
            return;
        }

        self.events.released(&conn);

        let unhealthy = self.options.release_health_check && !self.health_checker.is_healthy(&conn);
        if unhealthy {
            conn.mark_closed();
            self.events.closed(conn.id(), "failed health check on release");
        } else {
            conn.mark_idle();
            self.reservoir.offer(conn);
        }

        debug_assert!(self.acquired_count() > 0);
        self.set_acquired_count(self.acquired_count() - 1);
        self.dispatch_loop();
        let _ = sink.send(Ok(()));
    }

    fn handle_close(&mut self, ack: oneshot::Sender<()>) {
        if self.closed {
            let _ = ack.send(());
            return;
        }
        self.closed = true;

        while let Some(mut task) = self.pending_queue.pop_front() {
            task.cancel_timer();
            task.complete(Err(PoolError::PoolClosed {
                endpoint: self.endpoint.to_string(),
            }));
        }

        for (_, task) in self.in_flight.drain() {
            task.complete(Err(PoolError::PoolClosed {
                endpoint: self.endpoint.to_string(),
            }));
        }

        self.set_acquired_count(0);

        // Hand the idle reservoir's teardown to a separate task so that a
        // blocking shutdown of its sockets can never deadlock this
        // dispatcher, even if the dispatcher itself owns the runtime driving
        // those sockets.
        let mut reservoir =
            std::mem::replace(&mut self.reservoir, IdleReservoir::new(self.options.selection_order));
        let events = self.events.clone();
        tokio::spawn(async move {
            for mut conn in reservoir.drain() {
                conn.mark_closed();
                events.closed(conn.id(), "pool closed");
            }
        });

        self.events.pool_closed();
        let _ = ack.send(());
    }
}

fn shutdown_sink() -> oneshot::Sender<()> {
    oneshot::channel().0
}
