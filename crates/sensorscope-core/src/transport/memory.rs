//! In-process transport for driving the pipeline without a broker.
//!
//! Behaves like a broker connection seen from the client side: events are
//! delivered on a dedicated `memory-delivery` thread, a subscription is
//! acknowledged asynchronously, and `disconnect` joins the delivery thread.
//! Tests publish payloads with [`MemoryTransport::publish`] and use
//! [`MemoryTransport::flush`] to wait until everything queued so far has been
//! handled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread::{self, JoinHandle, ThreadId};

use super::{ConnectOptions, EventSink, Transport, TransportError, TransportEvent};

enum Command {
    Deliver(TransportEvent),
    Flush(mpsc::Sender<()>),
}

#[derive(Default)]
struct Inner {
    tx: Option<mpsc::Sender<Command>>,
    worker: Option<JoinHandle<()>>,
    worker_id: Option<ThreadId>,
    stop: Option<Arc<AtomicBool>>,
    subscriptions: Vec<String>,
    connects: usize,
}

/// Broker stand-in living in the same process.
pub struct MemoryTransport {
    inner: Mutex<Inner>,
    refuse_with: Option<TransportError>,
    ack_subscriptions: bool,
    reject_subscriptions: bool,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTransport {
    /// Accepts connections and acknowledges every subscription.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            refuse_with: None,
            ack_subscriptions: true,
            reject_subscriptions: false,
        }
    }

    /// Make every `connect` fail with `err`.
    pub fn refusing(mut self, err: TransportError) -> Self {
        self.refuse_with = Some(err);
        self
    }

    /// Never answer subscription requests.
    pub fn without_suback(mut self) -> Self {
        self.ack_subscriptions = false;
        self
    }

    /// Answer subscription requests with a rejection.
    pub fn rejecting_subscriptions(mut self) -> Self {
        self.reject_subscriptions = true;
        self
    }

    /// Queue a message for delivery. Returns `false` when not connected.
    pub fn publish(&self, topic: &str, payload: impl Into<Vec<u8>>) -> bool {
        self.send(TransportEvent::Message {
            topic: topic.to_string(),
            payload: payload.into(),
        })
    }

    /// Simulate the connection breaking with `err`. Delivery stops after the
    /// resulting [`TransportEvent::Disconnected`] event.
    pub fn drop_connection(&self, err: TransportError) -> bool {
        self.send(TransportEvent::Disconnected(Some(err)))
    }

    /// Block until every event queued before this call has been handled.
    /// Returns immediately when not connected.
    pub fn flush(&self) {
        let (done_tx, done_rx) = mpsc::channel();
        let queued = {
            let inner = self.inner.lock().unwrap();
            match &inner.tx {
                Some(tx) => tx.send(Command::Flush(done_tx)).is_ok(),
                None => false,
            }
        };
        if queued {
            let _ = done_rx.recv();
        }
    }

    /// Topics subscribed so far, in request order.
    pub fn subscriptions(&self) -> Vec<String> {
        self.inner.lock().unwrap().subscriptions.clone()
    }

    /// Number of successful `connect` calls.
    pub fn connect_count(&self) -> usize {
        self.inner.lock().unwrap().connects
    }

    pub fn is_connected(&self) -> bool {
        self.inner.lock().unwrap().tx.is_some()
    }

    fn send(&self, event: TransportEvent) -> bool {
        let inner = self.inner.lock().unwrap();
        match &inner.tx {
            Some(tx) => tx.send(Command::Deliver(event)).is_ok(),
            None => false,
        }
    }
}

impl Transport for MemoryTransport {
    fn connect(&self, _options: &ConnectOptions, mut sink: EventSink) -> Result<(), TransportError> {
        if let Some(err) = &self.refuse_with {
            return Err(err.clone());
        }
        self.disconnect()?;

        let (tx, rx) = mpsc::channel::<Command>();
        let stop = Arc::new(AtomicBool::new(false));
        let worker_stop = Arc::clone(&stop);
        let worker = thread::Builder::new()
            .name("memory-delivery".into())
            .spawn(move || {
                for command in rx {
                    match command {
                        Command::Flush(done) => {
                            let _ = done.send(());
                        }
                        Command::Deliver(event) => {
                            if worker_stop.load(Ordering::Acquire) {
                                continue;
                            }
                            let last = matches!(event, TransportEvent::Disconnected(_));
                            sink(event);
                            if last {
                                worker_stop.store(true, Ordering::Release);
                            }
                        }
                    }
                }
            })
            .map_err(|e| TransportError::Spawn(e.to_string()))?;

        // Installed before CONNACK is queued so a `subscribe` from the sink
        // finds the connection.
        let mut inner = self.inner.lock().unwrap();
        inner.worker_id = Some(worker.thread().id());
        inner.worker = Some(worker);
        inner.stop = Some(stop);
        inner.connects += 1;
        tx.send(Command::Deliver(TransportEvent::Connected))
            .map_err(|_| TransportError::NotConnected)?;
        inner.tx = Some(tx);
        Ok(())
    }

    fn subscribe(&self, topic: &str) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();
        let tx = inner.tx.clone().ok_or(TransportError::NotConnected)?;
        inner.subscriptions.push(topic.to_string());
        let reply = if self.reject_subscriptions {
            Some(TransportEvent::SubscribeRejected {
                topic: topic.to_string(),
            })
        } else if self.ack_subscriptions {
            Some(TransportEvent::Subscribed)
        } else {
            None
        };
        if let Some(event) = reply {
            tx.send(Command::Deliver(event))
                .map_err(|_| TransportError::NotConnected)?;
        }
        Ok(())
    }

    fn disconnect(&self) -> Result<(), TransportError> {
        let (worker, worker_id) = {
            let mut inner = self.inner.lock().unwrap();
            if let Some(stop) = inner.stop.take() {
                stop.store(true, Ordering::Release);
            }
            // Dropping the sender ends the delivery loop once it drains.
            inner.tx = None;
            (inner.worker.take(), inner.worker_id.take())
        };
        if let Some(worker) = worker {
            if Some(thread::current().id()) != worker_id {
                let _ = worker.join();
            }
        }
        Ok(())
    }
}

impl Drop for MemoryTransport {
    fn drop(&mut self) {
        let _ = self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn options() -> ConnectOptions {
        ConnectOptions {
            host: "memory".into(),
            port: 0,
            client_id: "test".into(),
            credentials: None,
            keep_alive: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(1),
            max_packet_size: crate::transport::DEFAULT_MAX_PACKET_SIZE,
        }
    }

    fn recording_sink() -> (EventSink, Arc<Mutex<Vec<TransportEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink_events = Arc::clone(&events);
        (
            Box::new(move |e| sink_events.lock().unwrap().push(e)),
            events,
        )
    }

    #[test]
    fn connect_delivers_connected_first() {
        let transport = MemoryTransport::new();
        let (sink, events) = recording_sink();
        transport.connect(&options(), sink).unwrap();
        transport.flush();
        assert_eq!(*events.lock().unwrap(), vec![TransportEvent::Connected]);
        assert_eq!(transport.connect_count(), 1);
    }

    #[test]
    fn refused_connect_delivers_nothing() {
        let transport = MemoryTransport::new().refusing(TransportError::Refused("bad".into()));
        let (sink, events) = recording_sink();
        assert_eq!(
            transport.connect(&options(), sink),
            Err(TransportError::Refused("bad".into()))
        );
        assert!(!transport.is_connected());
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn subscribe_is_acknowledged_after_earlier_events() {
        let transport = MemoryTransport::new();
        let (sink, events) = recording_sink();
        transport.connect(&options(), sink).unwrap();
        transport.subscribe("esp32/tx").unwrap();
        transport.publish("esp32/tx", "1:2:3");
        transport.flush();
        assert_eq!(
            *events.lock().unwrap(),
            vec![
                TransportEvent::Connected,
                TransportEvent::Subscribed,
                TransportEvent::Message {
                    topic: "esp32/tx".into(),
                    payload: b"1:2:3".to_vec()
                },
            ]
        );
        assert_eq!(transport.subscriptions(), vec!["esp32/tx".to_string()]);
    }

    #[test]
    fn nothing_is_delivered_after_disconnect() {
        let transport = MemoryTransport::new();
        let (sink, events) = recording_sink();
        transport.connect(&options(), sink).unwrap();
        transport.flush();
        transport.disconnect().unwrap();
        assert!(!transport.publish("t", "late"));
        transport.flush();
        assert_eq!(events.lock().unwrap().len(), 1);
        // Idempotent.
        transport.disconnect().unwrap();
    }

    #[test]
    fn dropped_connection_is_the_last_event() {
        let transport = MemoryTransport::new();
        let (sink, events) = recording_sink();
        transport.connect(&options(), sink).unwrap();
        transport.drop_connection(TransportError::Connection("reset".into()));
        transport.publish("t", "ignored");
        transport.flush();
        let events = events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[1],
            TransportEvent::Disconnected(Some(TransportError::Connection("reset".into())))
        );
    }

    #[test]
    fn subscribe_requires_connection() {
        let transport = MemoryTransport::new();
        assert_eq!(transport.subscribe("t"), Err(TransportError::NotConnected));
    }
}
