//! Wires the ingestion session and the render loop together and owns
//! startup/shutdown ordering.
//!
//! Ingestion starts before the first render tick. When the render loop ends
//! (surface closed, stop flag raised, or the surface failing for good) the
//! session is stopped and the transport released before [`Orchestrator::run`]
//! returns.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{error, info};

use crate::buffer::SampleBuffer;
use crate::config::ScopeConfig;
use crate::error::ScopeError;
use crate::render::{LoopExit, RenderLoop, Surface};
use crate::session::{IngestionSession, SessionConfig, SessionStatus};
use crate::transport::Transport;
use crate::variant::SensorVariant;

pub struct Orchestrator {
    variant: SensorVariant,
    buffer: Arc<SampleBuffer>,
    session: IngestionSession,
    render: RenderLoop,
    stop: Arc<AtomicBool>,
}

impl Orchestrator {
    /// Validate `config` and build the pipeline for `variant`. Nothing
    /// connects until [`Orchestrator::run`].
    pub fn new(
        config: &ScopeConfig,
        variant: SensorVariant,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ScopeError> {
        config.validate()?;

        let channels = variant.channels().to_vec();
        let buffer = Arc::new(SampleBuffer::new(
            config.capacity(variant),
            variant.dimension(),
        ));
        let session = IngestionSession::new(
            transport,
            Arc::clone(&buffer),
            SessionConfig {
                connect: config.connect_options(),
                topic: config.topic.clone(),
                decoder: variant.decoder(),
                channels: channels.clone(),
            },
        );
        let render = RenderLoop::new(
            Arc::clone(&buffer),
            channels,
            variant.layout(),
            config.interval(variant),
        )
        .with_budget(config.render_budget)
        .with_status(session.status());

        Ok(Self {
            variant,
            buffer,
            session,
            render,
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Flag that ends the render loop when raised (e.g. from a Ctrl-C handler).
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn buffer(&self) -> Arc<SampleBuffer> {
        Arc::clone(&self.buffer)
    }

    pub fn status(&self) -> Arc<SessionStatus> {
        self.session.status()
    }

    pub fn variant(&self) -> SensorVariant {
        self.variant
    }

    pub fn topic(&self) -> &str {
        self.session.topic()
    }

    /// Start ingestion, render until stopped, then shut everything down.
    ///
    /// A connect failure at startup is returned without rendering anything.
    pub fn run<S: Surface + ?Sized>(&mut self, surface: &mut S) -> Result<LoopExit, ScopeError> {
        info!(
            "starting {} pipeline on topic {}",
            self.variant,
            self.session.topic()
        );
        if let Err(e) = self.session.start() {
            error!("could not start ingestion: {e}");
            self.shutdown();
            return Err(e.into());
        }

        let result = self.render.run(surface, &self.stop);
        self.shutdown();

        match result {
            Ok(exit) => {
                info!(
                    "render loop ended ({exit:?}) after {} frames",
                    self.render.frames_presented()
                );
                Ok(exit)
            }
            Err(e) => {
                error!("render surface failed: {e}");
                Err(e.into())
            }
        }
    }

    /// Stop ticking and stop the session. Idempotent.
    pub fn shutdown(&self) {
        self.stop.store(true, Ordering::Release);
        self.session.stop();
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.shutdown();
    }
}
