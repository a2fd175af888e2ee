//! Single-threaded event loop driving a [`ClientSession`].
//!
//! Frame ticks, transport events, asset completions, input and the reconnect
//! timer are interleaved with `tokio::select!`. Connection attempts and model
//! loads run as spawned tasks and report back over channels, so every session
//! mutation happens on the loop.

use crate::assets::{AssetError, AvatarLoader, AvatarModel};
use crate::networking::transport::{Connector, Link, TransportEvent};
use crate::networking::NetworkResult;
use crate::session::ClientSession;
use crate::world::events::SceneEvent;
use crate::world::input::InputEvent;
use crate::world::peers::PeerId;
use std::future::{pending, Future};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{interval, sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use url::Url;

type LoadResult = (PeerId, Result<AvatarModel, AssetError>);

pub struct ClientApp {
    session: ClientSession,
    connector: Arc<dyn Connector>,
    loader: Arc<dyn AvatarLoader>,
    endpoint: Url,
    inputs: Option<mpsc::UnboundedReceiver<InputEvent>>,
    scene: Option<mpsc::UnboundedSender<SceneEvent>>,
    link_events: Option<mpsc::UnboundedReceiver<TransportEvent>>,
    attempts_tx: mpsc::UnboundedSender<NetworkResult<Link>>,
    attempts_rx: mpsc::UnboundedReceiver<NetworkResult<Link>>,
    loads_tx: mpsc::UnboundedSender<LoadResult>,
    loads_rx: mpsc::UnboundedReceiver<LoadResult>,
    started: bool,
}

impl ClientApp {
    pub fn new(
        session: ClientSession,
        connector: Arc<dyn Connector>,
        loader: Arc<dyn AvatarLoader>,
        endpoint: Url,
    ) -> Self {
        let (attempts_tx, attempts_rx) = mpsc::unbounded_channel();
        let (loads_tx, loads_rx) = mpsc::unbounded_channel();
        Self {
            session,
            connector,
            loader,
            endpoint,
            inputs: None,
            scene: None,
            link_events: None,
            attempts_tx,
            attempts_rx,
            loads_tx,
            loads_rx,
            started: false,
        }
    }

    /// Feed input events from the capture side.
    pub fn with_inputs(mut self, inputs: mpsc::UnboundedReceiver<InputEvent>) -> Self {
        self.inputs = Some(inputs);
        self
    }

    /// Forward scene events to the rendering side. Without a sink they are
    /// dropped after each iteration.
    pub fn with_scene_sink(mut self, scene: mpsc::UnboundedSender<SceneEvent>) -> Self {
        self.scene = Some(scene);
        self
    }

    pub fn session(&self) -> &ClientSession {
        &self.session
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn start_connect(&mut self) {
        self.session.begin_connect();
        info!("Connecting to {}", self.endpoint);

        let connector = Arc::clone(&self.connector);
        let endpoint = self.endpoint.clone();
        let results = self.attempts_tx.clone();
        tokio::spawn(async move {
            let _ = results.send(connector.connect(&endpoint).await);
        });
    }

    fn start_load(&self, id: PeerId) {
        let loader = Arc::clone(&self.loader);
        let source = self.session.settings().assets.avatar_model.clone();
        let results = self.loads_tx.clone();
        debug!("Loading model {} for player {}", source, id);
        tokio::spawn(async move {
            let result = loader.load(&source).await;
            let _ = results.send((id, result));
        });
    }

    /// Hand queued work to the collaborators.
    fn flush(&mut self) {
        for id in self.session.take_load_requests() {
            self.start_load(id);
        }
        let events = self.session.take_scene_events();
        if let Some(scene) = &self.scene {
            for event in events {
                if scene.send(event).is_err() {
                    warn!("Scene sink closed; dropping scene events");
                    self.scene = None;
                    break;
                }
            }
        }
    }

    fn on_connect_result(&mut self, result: NetworkResult<Link>) {
        match result {
            Ok(link) => {
                self.session.attach_transport(link.handle);
                self.link_events = Some(link.events);
            }
            Err(e) => self.session.on_connect_failed(&e, now()),
        }
    }

    /// Run the loop until `shutdown` completes and return its output. The
    /// first call starts connecting.
    pub async fn run_until<F: Future>(&mut self, shutdown: F) -> F::Output {
        tokio::pin!(shutdown);
        if !self.started {
            self.started = true;
            self.start_connect();
        }

        let mut frames = interval(self.session.settings().network.frame_interval());
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_frame = Instant::now();

        loop {
            let retry_at = self.session.reconnect_deadline();
            tokio::select! {
                output = &mut shutdown => return output,
                tick = frames.tick() => {
                    let delta = tick.saturating_duration_since(last_frame);
                    last_frame = tick;
                    self.session.tick(delta, tick.into_std());
                }
                event = next_link_event(&mut self.link_events) => {
                    if matches!(event, TransportEvent::Closed { .. }) {
                        self.link_events = None;
                    }
                    self.session.on_transport_event(event, now());
                }
                Some(result) = self.attempts_rx.recv() => self.on_connect_result(result),
                Some((id, result)) = self.loads_rx.recv() => self.session.complete_peer_load(id, result),
                event = next_input(&mut self.inputs) => self.session.handle_input(event, now()),
                _ = wait_until(retry_at) => self.start_connect(),
            }
            self.flush();
        }
    }

    pub async fn run(&mut self) {
        self.run_until(pending::<()>()).await
    }
}

fn now() -> std::time::Instant {
    Instant::now().into_std()
}

async fn next_link_event(events: &mut Option<mpsc::UnboundedReceiver<TransportEvent>>) -> TransportEvent {
    let Some(rx) = events.as_mut() else {
        return pending().await;
    };
    match rx.recv().await {
        Some(event) => event,
        None => {
            *events = None;
            TransportEvent::Closed {
                reason: Some("link dropped".to_string()),
            }
        }
    }
}

async fn next_input(inputs: &mut Option<mpsc::UnboundedReceiver<InputEvent>>) -> InputEvent {
    let Some(rx) = inputs.as_mut() else {
        return pending().await;
    };
    match rx.recv().await {
        Some(event) => event,
        None => {
            debug!("Input channel closed");
            *inputs = None;
            pending().await
        }
    }
}

async fn wait_until(deadline: Option<std::time::Instant>) {
    match deadline {
        Some(deadline) => sleep_until(Instant::from_std(deadline)).await,
        None => pending().await,
    }
}
