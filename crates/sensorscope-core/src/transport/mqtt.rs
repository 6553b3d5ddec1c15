//! MQTT transport backed by `rumqttc`'s synchronous client.
//!
//! `rumqttc` splits a connection into a [`Client`] (request handle) and a
//! [`Connection`] (the event loop). The event loop runs on a dedicated
//! `mqtt-delivery` thread which translates packets into [`TransportEvent`]s.
//!
//! No reconnect policy: a broken connection is reported once as
//! [`TransportEvent::Disconnected`] and the delivery thread exits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::thread::{self, JoinHandle, ThreadId};

use log::{debug, info, warn};
use rumqttc::{
    Client, ConnectReturnCode, Connection, ConnectionError, Event, MqttOptions, Outgoing, Packet,
    QoS, SubscribeReasonCode,
};

use super::{ConnectOptions, EventSink, Transport, TransportError, TransportEvent};

/// Capacity of the client → event loop request queue.
const REQUEST_QUEUE: usize = 16;

/// MQTT 3.1.1 transport. Subscriptions use QoS 0 (at most once).
#[derive(Default)]
pub struct MqttTransport {
    link: Mutex<Option<Link>>,
}

struct Link {
    client: Client,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    worker_id: ThreadId,
    /// Topics requested on this link, for matching SUBACKs in logs.
    topics: Arc<Mutex<Vec<String>>>,
}

impl MqttTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for MqttTransport {
    fn connect(&self, options: &ConnectOptions, sink: EventSink) -> Result<(), TransportError> {
        // Held until the link is installed so a `subscribe` issued from the
        // sink on CONNACK always finds the client.
        let mut slot = self.link.lock().unwrap();
        if let Some(stale) = slot.take() {
            shutdown_link(stale);
        }

        let endpoint = options.endpoint();
        let mut mqtt = MqttOptions::new(options.client_id.clone(), options.host.clone(), options.port);
        mqtt.set_keep_alive(options.keep_alive);
        mqtt.set_max_packet_size(options.max_packet_size, options.max_packet_size);
        if let Some(creds) = &options.credentials {
            mqtt.set_credentials(
                creds.username.clone(),
                creds.password.clone().unwrap_or_default(),
            );
        }

        let (client, connection) = Client::new(mqtt, REQUEST_QUEUE);
        let stop = Arc::new(AtomicBool::new(false));
        let topics = Arc::new(Mutex::new(Vec::new()));
        let (ready_tx, ready_rx) = mpsc::channel();

        let worker = {
            let stop = Arc::clone(&stop);
            let topics = Arc::clone(&topics);
            let endpoint = endpoint.clone();
            thread::Builder::new()
                .name("mqtt-delivery".into())
                .spawn(move || pump(connection, &endpoint, &stop, &topics, ready_tx, sink))
                .map_err(|e| TransportError::Spawn(e.to_string()))?
        };
        let worker_id = worker.thread().id();

        debug!("waiting for CONNACK from {endpoint}");
        match ready_rx.recv_timeout(options.connect_timeout) {
            Ok(Ok(())) => {
                info!("connected to MQTT broker {endpoint}");
                *slot = Some(Link {
                    client,
                    stop,
                    worker: Some(worker),
                    worker_id,
                    topics,
                });
                Ok(())
            }
            Ok(Err(e)) => {
                stop.store(true, Ordering::Release);
                let _ = worker.join();
                Err(e)
            }
            Err(_) => {
                // The event loop may still be stuck in a TCP connect; leave the
                // thread detached, it exits on its next wakeup.
                stop.store(true, Ordering::Release);
                let _ = client.try_disconnect();
                Err(TransportError::Timeout {
                    endpoint,
                    timeout: options.connect_timeout,
                })
            }
        }
    }

    fn subscribe(&self, topic: &str) -> Result<(), TransportError> {
        let slot = self.link.lock().unwrap();
        let link = slot.as_ref().ok_or(TransportError::NotConnected)?;
        link.topics.lock().unwrap().push(topic.to_string());
        // Non-blocking: this is usually called from the delivery thread, which
        // is also the thread draining the request queue.
        link.client
            .try_subscribe(topic, QoS::AtMostOnce)
            .map_err(|e| TransportError::Subscribe {
                topic: topic.to_string(),
                reason: e.to_string(),
            })
    }

    fn disconnect(&self) -> Result<(), TransportError> {
        let link = self.link.lock().unwrap().take();
        if let Some(link) = link {
            shutdown_link(link);
        }
        Ok(())
    }
}

impl Drop for MqttTransport {
    fn drop(&mut self) {
        let link = match self.link.get_mut() {
            Ok(slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(link) = link {
            shutdown_link(link);
        }
    }
}

fn shutdown_link(mut link: Link) {
    link.stop.store(true, Ordering::Release);
    let on_delivery_thread = thread::current().id() == link.worker_id;
    let sent = if on_delivery_thread {
        link.client.try_disconnect()
    } else {
        link.client.disconnect()
    };
    if let Err(e) = sent {
        debug!("disconnect request not queued: {e}");
    }
    if !on_delivery_thread {
        if let Some(worker) = link.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Drive the event loop until stopped or the connection breaks.
fn pump(
    mut connection: Connection,
    endpoint: &str,
    stop: &AtomicBool,
    topics: &Mutex<Vec<String>>,
    ready: mpsc::Sender<Result<(), TransportError>>,
    mut sink: EventSink,
) {
    let mut ready = Some(ready);

    for notification in connection.iter() {
        if stop.load(Ordering::Acquire) {
            break;
        }
        match notification {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                if ack.code != ConnectReturnCode::Success {
                    let err = TransportError::Refused(format!("{:?}", ack.code));
                    report_failure(&mut ready, &mut sink, err);
                    break;
                }
                if let Some(tx) = ready.take() {
                    let _ = tx.send(Ok(()));
                }
                sink(TransportEvent::Connected);
            }
            Ok(Event::Incoming(Packet::SubAck(ack))) => {
                let accepted = ack
                    .return_codes
                    .iter()
                    .all(|code| matches!(code, SubscribeReasonCode::Success(_)));
                if accepted {
                    sink(TransportEvent::Subscribed);
                } else {
                    let topic = topics.lock().unwrap().first().cloned().unwrap_or_default();
                    sink(TransportEvent::SubscribeRejected { topic });
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                sink(TransportEvent::Message {
                    topic: publish.topic,
                    payload: publish.payload.to_vec(),
                });
            }
            Ok(Event::Incoming(Packet::Disconnect)) => {
                let err = TransportError::Connection("broker closed the session".into());
                sink(TransportEvent::Disconnected(Some(err)));
                break;
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                sink(TransportEvent::Disconnected(None));
                break;
            }
            Ok(_) => {}
            Err(e) => {
                if stop.load(Ordering::Acquire) {
                    break;
                }
                let err = match e {
                    ConnectionError::ConnectionRefused(code) => {
                        TransportError::Refused(format!("{code:?}"))
                    }
                    other if ready.is_some() => TransportError::Connect {
                        endpoint: endpoint.to_string(),
                        reason: other.to_string(),
                    },
                    other => TransportError::Connection(other.to_string()),
                };
                report_failure(&mut ready, &mut sink, err);
                break;
            }
        }
    }

    if let Some(tx) = ready.take() {
        let _ = tx.send(Err(TransportError::Connect {
            endpoint: endpoint.to_string(),
            reason: "event loop ended before the broker answered".into(),
        }));
    }
    debug!("mqtt delivery thread for {endpoint} exiting");
}

/// Before CONNACK a failure goes back to the blocked `connect` call; after it,
/// to the sink.
fn report_failure(
    ready: &mut Option<mpsc::Sender<Result<(), TransportError>>>,
    sink: &mut EventSink,
    err: TransportError,
) {
    match ready.take() {
        Some(tx) => {
            let _ = tx.send(Err(err));
        }
        None => {
            warn!("mqtt connection failed: {err}");
            sink(TransportEvent::Disconnected(Some(err)));
        }
    }
}
