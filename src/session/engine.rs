// src/session/engine.rs — Walk session state machine
//
// The engine runs as a single task that owns all session state. Callers talk
// to it through `EngineHandle`; commands, the stat tick, position fixes,
// route results and persistence results are all serialized by one select loop.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use uuid::Uuid;

use super::clock::ActiveClock;
use super::persist::{spawn_persist_worker, PersistEvent, PersistJob, PersistQueue, SaveReply};
use super::trail::Trail;
use super::types::{LiveStats, Phase, SaveReport, SaveState, SessionStatus, WalkMoment, WalkSession};
use crate::geo::Coordinate;
use crate::geolocation::{locate_within, FixStream, GeolocationSource, PositionFix};
use crate::infra::config::Config;
use crate::infra::errors::WalkError;
use crate::route::{GeneratedRoute, RouteGenerationOptions, RoutePlanner};
use crate::store::{FinalWalkRecord, NewWalkRecord, SessionStore};

/// Collaborators the engine drives.
#[derive(Clone)]
pub struct EngineDeps {
    pub planner: Arc<dyn RoutePlanner>,
    pub geolocation: Arc<dyn GeolocationSource>,
    pub store: Arc<dyn SessionStore>,
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Identity stamped on new walks. Generating or starting without one fails.
    pub user_id: Option<String>,
    pub tick_interval: Duration,
    /// How long `last_error` stays set.
    pub error_display: Duration,
    pub store_timeout: Duration,
    pub locate_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            user_id: None,
            tick_interval: Duration::from_secs(1),
            error_display: Duration::from_secs(5),
            store_timeout: Duration::from_secs(15),
            locate_timeout: Duration::from_secs(10),
        }
    }
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            user_id: config.user.id.clone(),
            tick_interval: Duration::from_millis(config.tracking.tick_interval_ms.max(1)),
            error_display: Duration::from_secs(config.tracking.error_display_secs),
            store_timeout: Duration::from_secs(config.tracking.store_timeout_secs),
            locate_timeout: Duration::from_secs(config.geolocation.timeout_secs),
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// Observable engine state, republished after every change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineSnapshot {
    pub phase: Phase,
    pub live_stats: LiveStats,
    pub route_path: Vec<Coordinate>,
    pub moments: Vec<WalkMoment>,
    pub generated_route: Option<GeneratedRoute>,
    pub last_error: Option<WalkError>,
    pub user_location: Option<Coordinate>,
    pub current_session: Option<WalkSession>,
    pub save_state: SaveState,
}

impl EngineSnapshot {
    pub fn is_tracking(&self) -> bool {
        self.phase == Phase::Active
    }

    pub fn has_active_session(&self) -> bool {
        self.current_session.is_some()
    }

    pub fn can_start_walk(&self) -> bool {
        self.phase == Phase::Preview && self.generated_route.is_some()
    }
}

enum Command {
    GenerateRoute {
        options: RouteGenerationOptions,
        reply: oneshot::Sender<Result<Phase, WalkError>>,
    },
    TryAnotherRoute {
        reply: oneshot::Sender<Phase>,
    },
    StartWalk {
        title: Option<String>,
        reply: oneshot::Sender<Result<Phase, WalkError>>,
    },
    Pause {
        reply: oneshot::Sender<Phase>,
    },
    Resume {
        reply: oneshot::Sender<Phase>,
    },
    AddMoment {
        location: Coordinate,
        description: Option<String>,
        photo_ref: Option<String>,
        reply: oneshot::Sender<Option<WalkMoment>>,
    },
    IngestLocation {
        fix: PositionFix,
        reply: oneshot::Sender<bool>,
    },
    EndWalk {
        reply: SaveReply,
    },
    RetrySave {
        reply: SaveReply,
    },
    Reset {
        reply: oneshot::Sender<Phase>,
    },
    Snapshot {
        reply: oneshot::Sender<EngineSnapshot>,
    },
}

struct RouteOutcome {
    seq: u64,
    result: Result<(GeneratedRoute, RouteGenerationOptions), WalkError>,
}

/// Cheap to clone. The engine stops when every handle is dropped.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<Command>,
    state: watch::Receiver<EngineSnapshot>,
    geolocation: Arc<dyn GeolocationSource>,
    locate_timeout: Duration,
}

impl EngineHandle {
    async fn call<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T, WalkError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| WalkError::Config("walk engine is not running".into()))?;
        rx.await
            .map_err(|_| WalkError::Config("walk engine dropped the request".into()))
    }

    /// Ask for a loop route. Returns once generation has been dispatched
    /// (`Generating`), or the unchanged phase if not idle.
    pub async fn generate_route(&self, options: RouteGenerationOptions) -> Result<Phase, WalkError> {
        self.call(|reply| Command::GenerateRoute { options, reply })
            .await?
    }

    pub async fn try_another_route(&self) -> Result<Phase, WalkError> {
        self.call(|reply| Command::TryAnotherRoute { reply }).await
    }

    pub async fn start_walk(&self, title: Option<String>) -> Result<Phase, WalkError> {
        self.call(|reply| Command::StartWalk { title, reply })
            .await?
    }

    pub async fn pause_walk(&self) -> Result<Phase, WalkError> {
        self.call(|reply| Command::Pause { reply }).await
    }

    pub async fn resume_walk(&self) -> Result<Phase, WalkError> {
        self.call(|reply| Command::Resume { reply }).await
    }

    /// Pin a moment. `None` unless a walk is active.
    pub async fn add_moment(
        &self,
        location: Coordinate,
        description: Option<String>,
        photo_ref: Option<String>,
    ) -> Result<Option<WalkMoment>, WalkError> {
        self.call(|reply| Command::AddMoment {
            location,
            description,
            photo_ref,
            reply,
        })
        .await
    }

    /// Feed one fix. Returns whether it extended the trail.
    pub async fn ingest_location(&self, fix: PositionFix) -> Result<bool, WalkError> {
        self.call(|reply| Command::IngestLocation { fix, reply })
            .await
    }

    /// Refresh `user_location` from a one-shot position read.
    pub async fn locate(&self) -> Result<Coordinate, WalkError> {
        let fix = locate_within(self.geolocation.as_ref(), self.locate_timeout).await?;
        let coordinate = fix.coordinate;
        self.ingest_location(fix).await?;
        Ok(coordinate)
    }

    /// Complete the walk and wait for the write. `Ok(None)` when there was
    /// no walk to end. On `Err` the engine stays completed with the walk in
    /// memory; see [`EngineHandle::retry_save`].
    pub async fn end_walk(&self) -> Result<Option<SaveReport>, WalkError> {
        self.call(|reply| Command::EndWalk { reply }).await?
    }

    /// Repeat a failed final write. `Ok(None)` when there is nothing to retry.
    pub async fn retry_save(&self) -> Result<Option<SaveReport>, WalkError> {
        self.call(|reply| Command::RetrySave { reply }).await?
    }

    pub async fn reset_session(&self) -> Result<Phase, WalkError> {
        self.call(|reply| Command::Reset { reply }).await
    }

    /// State after all commands sent so far have been applied.
    pub async fn snapshot(&self) -> Result<EngineSnapshot, WalkError> {
        self.call(|reply| Command::Snapshot { reply }).await
    }

    /// Latest published state without a round trip.
    pub fn current(&self) -> EngineSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<EngineSnapshot> {
        self.state.clone()
    }

    /// Wait until the published state satisfies `pred`.
    pub async fn wait_for(
        &self,
        pred: impl FnMut(&EngineSnapshot) -> bool,
    ) -> Result<EngineSnapshot, WalkError> {
        let mut rx = self.state.clone();
        let snap = rx
            .wait_for(pred)
            .await
            .map_err(|_| WalkError::Config("walk engine stopped".into()))?;
        Ok(snap.clone())
    }
}

/// Start the engine task.
pub fn spawn_engine(deps: EngineDeps, settings: EngineSettings) -> EngineHandle {
    let (tx, rx) = mpsc::channel(64);
    let (state_tx, state_rx) = watch::channel(EngineSnapshot::default());
    let (route_tx, route_rx) = mpsc::unbounded_channel();
    let (persist_tx, persist_rx) = mpsc::unbounded_channel();
    let (persist, _) = spawn_persist_worker(deps.store.clone(), settings.store_timeout, persist_tx);

    let handle = EngineHandle {
        tx,
        state: state_rx,
        geolocation: deps.geolocation.clone(),
        locate_timeout: settings.locate_timeout,
    };

    let engine = Engine::new(deps, settings, state_tx, route_tx, persist);
    tokio::spawn(engine.run(rx, route_rx, persist_rx));

    handle
}

struct Engine {
    deps: EngineDeps,
    settings: EngineSettings,
    state_tx: watch::Sender<EngineSnapshot>,
    route_tx: mpsc::UnboundedSender<RouteOutcome>,
    persist: PersistQueue,

    phase: Phase,
    generated_route: Option<GeneratedRoute>,
    /// Options (start filled in) behind `generated_route`.
    last_options: Option<RouteGenerationOptions>,
    /// Bumped on every dispatch and reset; stale route results are dropped.
    generation_seq: u64,
    user_location: Option<Coordinate>,

    session: Option<WalkSession>,
    /// Local identity of `session` for the persistence worker.
    session_key: Uuid,
    trail: Trail,
    moments: Vec<WalkMoment>,
    clock: ActiveClock,
    live_stats: LiveStats,
    save_state: SaveState,

    last_error: Option<WalkError>,
    error_deadline: Option<Instant>,
    ticker: Option<Interval>,
    fixes: Option<FixStream>,
    /// Set when this loop iteration already published.
    published: bool,
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(t) => {
            t.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn next_fix(fixes: &mut Option<FixStream>) -> Option<PositionFix> {
    match fixes {
        Some(s) => s.next().await,
        None => std::future::pending().await,
    }
}

async fn expiry(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

impl Engine {
    fn new(
        deps: EngineDeps,
        settings: EngineSettings,
        state_tx: watch::Sender<EngineSnapshot>,
        route_tx: mpsc::UnboundedSender<RouteOutcome>,
        persist: PersistQueue,
    ) -> Self {
        Self {
            deps,
            settings,
            state_tx,
            route_tx,
            persist,
            phase: Phase::Idle,
            generated_route: None,
            last_options: None,
            generation_seq: 0,
            user_location: None,
            session: None,
            session_key: Uuid::nil(),
            trail: Trail::default(),
            moments: Vec::new(),
            clock: ActiveClock::default(),
            live_stats: LiveStats::default(),
            save_state: SaveState::NotSaved,
            last_error: None,
            error_deadline: None,
            ticker: None,
            fixes: None,
            published: false,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut routes: mpsc::UnboundedReceiver<RouteOutcome>,
        mut persisted: mpsc::UnboundedReceiver<PersistEvent>,
    ) {
        loop {
            tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(cmd) => self.handle(cmd),
                    None => break,
                },
                Some(outcome) = routes.recv() => self.on_route(outcome),
                Some(event) = persisted.recv() => self.on_persisted(event),
                _ = next_tick(&mut self.ticker) => self.on_tick(),
                fix = next_fix(&mut self.fixes) => match fix {
                    Some(fix) => {
                        self.ingest(fix);
                    }
                    None => {
                        tracing::debug!("Position stream ended");
                        self.fixes = None;
                    }
                },
                _ = expiry(self.error_deadline) => {
                    self.last_error = None;
                    self.error_deadline = None;
                }
            }
            if !self.published {
                self.publish();
            }
            self.published = false;
        }
        tracing::debug!("Walk engine stopped");
    }

    fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::GenerateRoute { options, reply } => {
                let phase = self.generate_route(options);
                self.respond(reply, phase);
            }
            Command::TryAnotherRoute { reply } => {
                let phase = self.try_another_route();
                self.respond(reply, phase);
            }
            Command::StartWalk { title, reply } => {
                let phase = self.start_walk(title);
                self.respond(reply, phase);
            }
            Command::Pause { reply } => {
                let phase = self.pause();
                self.respond(reply, phase);
            }
            Command::Resume { reply } => {
                let phase = self.resume();
                self.respond(reply, phase);
            }
            Command::AddMoment {
                location,
                description,
                photo_ref,
                reply,
            } => {
                let moment = self.add_moment(location, description, photo_ref);
                self.respond(reply, moment);
            }
            Command::IngestLocation { fix, reply } => {
                let accepted = self.ingest(fix);
                self.respond(reply, accepted);
            }
            Command::EndWalk { reply } => self.end_walk(reply),
            Command::RetrySave { reply } => self.retry_save(reply),
            Command::Reset { reply } => {
                self.reset();
                self.respond(reply, self.phase);
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    /// Callers that wait on the watch channel after a reply must see the
    /// state the command produced.
    fn respond<T>(&mut self, reply: oneshot::Sender<T>, value: T) {
        self.publish();
        let _ = reply.send(value);
    }

    fn ignored(&self, command: &str) -> Phase {
        tracing::debug!(phase = %self.phase, "Ignoring {} in current phase", command);
        self.phase
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            tracing::info!(from = %self.phase, to = %phase, "Walk phase changed");
            self.phase = phase;
        }
    }

    fn set_error(&mut self, error: WalkError) {
        self.last_error = Some(error);
        self.error_deadline = Some(Instant::now() + self.settings.error_display);
    }

    fn clear_error(&mut self) {
        self.last_error = None;
        self.error_deadline = None;
    }

    fn require_user(&mut self) -> Result<String, WalkError> {
        match &self.settings.user_id {
            Some(id) => Ok(id.clone()),
            None => {
                self.set_error(WalkError::Unauthenticated);
                Err(WalkError::Unauthenticated)
            }
        }
    }

    // -- Route generation --

    fn generate_route(&mut self, mut options: RouteGenerationOptions) -> Result<Phase, WalkError> {
        if self.phase != Phase::Idle {
            return Ok(self.ignored("generate_route"));
        }
        self.require_user()?;
        if options.start_location.is_none() {
            options.start_location = self.user_location;
        }
        self.dispatch_generation(options);
        Ok(self.phase)
    }

    fn try_another_route(&mut self) -> Phase {
        if self.phase != Phase::Preview {
            return self.ignored("try_another_route");
        }
        let options = match &self.last_options {
            Some(prev) => prev.clone().with_complexity(prev.complexity.next()),
            None => RouteGenerationOptions {
                start_location: self.user_location,
                ..Default::default()
            },
        };
        self.dispatch_generation(options);
        self.phase
    }

    fn dispatch_generation(&mut self, mut options: RouteGenerationOptions) {
        self.clear_error();
        self.generation_seq += 1;
        self.set_phase(Phase::Generating);

        let seq = self.generation_seq;
        let planner = self.deps.planner.clone();
        let geolocation = self.deps.geolocation.clone();
        let locate_timeout = self.settings.locate_timeout;
        let tx = self.route_tx.clone();

        tokio::spawn(async move {
            let result = async move {
                if options.start_location.is_none() {
                    let fix = locate_within(geolocation.as_ref(), locate_timeout).await?;
                    options.start_location = Some(fix.coordinate);
                }
                let route = planner.generate(&options).await?;
                Ok::<_, WalkError>((route, options))
            }
            .await;
            let _ = tx.send(RouteOutcome { seq, result });
        });
    }

    fn on_route(&mut self, outcome: RouteOutcome) {
        if outcome.seq != self.generation_seq || self.phase != Phase::Generating {
            tracing::debug!(seq = outcome.seq, "Dropping stale route result");
            return;
        }
        match outcome.result {
            Ok((route, options)) => {
                if self.user_location.is_none() {
                    self.user_location = options.start_location;
                }
                self.generated_route = Some(route);
                self.last_options = Some(options);
                self.set_phase(Phase::Preview);
            }
            Err(e) => {
                tracing::warn!(kind = e.kind(), "Route generation failed: {}", e);
                self.generated_route = None;
                self.set_error(e);
                self.set_phase(Phase::Idle);
            }
        }
    }

    // -- Walking --

    fn start_walk(&mut self, title: Option<String>) -> Result<Phase, WalkError> {
        if self.phase != Phase::Preview {
            return Ok(self.ignored("start_walk"));
        }
        let user_id = self.require_user()?;
        if self.generated_route.is_none() {
            return Ok(self.ignored("start_walk"));
        }
        let start = self
            .user_location
            .or_else(|| self.last_options.as_ref().and_then(|o| o.start_location));
        let Some(start) = start else {
            let err = WalkError::location("no current position to start from");
            self.set_error(err.clone());
            return Err(err);
        };
        let Some(route) = self.generated_route.as_ref() else {
            return Ok(self.ignored("start_walk"));
        };

        let session = WalkSession::new(user_id, title, start, route);
        self.session_key = Uuid::new_v4();
        self.trail = Trail::seeded(start);
        self.moments.clear();
        self.clock = ActiveClock::started();
        self.live_stats = LiveStats::default();
        self.save_state = SaveState::NotSaved;
        self.start_ticker();
        self.fixes = Some(self.deps.geolocation.watch());

        self.persist.submit(PersistJob::Open {
            key: self.session_key,
            record: new_record(&session, self.trail.points()),
        });

        tracing::info!(title = %session.title, "Walk started");
        self.session = Some(session);
        self.set_phase(Phase::Active);
        Ok(self.phase)
    }

    fn start_ticker(&mut self) {
        let period = self.settings.tick_interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.ticker = Some(ticker);
    }

    fn set_status(&mut self, status: SessionStatus) {
        if let Some(session) = self.session.as_mut() {
            session.status = status;
        }
        self.persist.submit(PersistJob::Status {
            key: self.session_key,
            status,
        });
    }

    fn pause(&mut self) -> Phase {
        if self.phase != Phase::Active {
            return self.ignored("pause_walk");
        }
        self.ticker = None;
        self.clock.pause();
        self.on_tick();
        self.set_status(SessionStatus::Paused);
        self.set_phase(Phase::Paused);
        self.phase
    }

    fn resume(&mut self) -> Phase {
        if self.phase != Phase::Paused {
            return self.ignored("resume_walk");
        }
        self.clock.resume();
        self.start_ticker();
        self.set_status(SessionStatus::Active);
        self.set_phase(Phase::Active);
        self.phase
    }

    fn on_tick(&mut self) {
        self.live_stats = LiveStats::compute(self.clock.elapsed(), self.trail.points());
    }

    fn add_moment(
        &mut self,
        location: Coordinate,
        description: Option<String>,
        photo_ref: Option<String>,
    ) -> Option<WalkMoment> {
        if self.phase != Phase::Active {
            self.ignored("add_moment");
            return None;
        }
        let moment = WalkMoment::new(location, description, photo_ref);
        tracing::debug!(moment_id = %moment.id, "Moment added");
        self.moments.push(moment.clone());
        Some(moment)
    }

    fn ingest(&mut self, fix: PositionFix) -> bool {
        if !fix.coordinate.is_valid() {
            tracing::debug!(coordinate = %fix.coordinate, "Dropping invalid fix");
            return false;
        }
        self.user_location = Some(fix.coordinate);
        if self.phase != Phase::Active {
            return false;
        }
        let accepted = self.trail.push(fix.coordinate);
        if !accepted {
            tracing::trace!(accuracy = ?fix.accuracy_m, "Suppressed jitter fix");
        }
        accepted
    }

    fn end_walk(&mut self, reply: SaveReply) {
        if !matches!(self.phase, Phase::Active | Phase::Paused) {
            self.ignored("end_walk");
            let _ = reply.send(Ok(None));
            return;
        }
        if self.session.is_none() {
            self.ignored("end_walk");
            let _ = reply.send(Ok(None));
            return;
        }

        self.ticker = None;
        self.stop_watching();
        self.clock.pause();

        let elapsed = self.clock.elapsed();
        self.live_stats = LiveStats::compute(elapsed, self.trail.points());
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.end_time = Some(chrono::Utc::now());
        session.total_distance = self.trail.length_m();
        session.total_duration = elapsed.as_secs();
        session.route_path = self.trail.points().to_vec();
        session.moments = self.moments.clone();
        session.status = SessionStatus::Completed;

        tracing::info!(
            distance_m = session.total_distance as u64,
            duration_s = session.total_duration,
            moments = session.moments.len(),
            "Walk completed"
        );

        self.set_phase(Phase::Completed);
        self.submit_final(reply);
    }

    fn retry_save(&mut self, reply: SaveReply) {
        if self.phase != Phase::Completed || !matches!(self.save_state, SaveState::Failed(_)) {
            self.ignored("retry_save");
            let _ = reply.send(Ok(None));
            return;
        }
        tracing::info!("Retrying walk save");
        self.clear_error();
        self.submit_final(reply);
    }

    /// Queue the final write of the completed session (frozen values).
    fn submit_final(&mut self, reply: SaveReply) {
        let Some(session) = self.session.as_ref() else {
            let _ = reply.send(Ok(None));
            return;
        };
        let Some(end_time) = session.end_time else {
            let _ = reply.send(Ok(None));
            return;
        };
        self.save_state = SaveState::Saving;
        let job = PersistJob::Finalize {
            key: self.session_key,
            record: new_record(session, &session.route_path),
            final_record: FinalWalkRecord {
                end_time,
                total_distance: session.total_distance,
                total_duration: session.total_duration,
                route_path: session.route_path.clone(),
            },
            moments: session.moments.clone(),
            reply: Some(reply),
        };
        self.publish();
        self.persist.submit(job);
    }

    fn on_persisted(&mut self, event: PersistEvent) {
        let key = match &event {
            PersistEvent::Opened { key, .. }
            | PersistEvent::Failed { key, .. }
            | PersistEvent::Finalized { key, .. } => *key,
        };
        if key != self.session_key || self.session.is_none() {
            return;
        }
        match event {
            PersistEvent::Opened { id, .. } => {
                if let Some(session) = self.session.as_mut() {
                    session.id = Some(id);
                }
            }
            PersistEvent::Failed { error, .. } => self.set_error(error),
            PersistEvent::Finalized { result, .. } => match result {
                Ok(report) => {
                    if let Some(session) = self.session.as_mut() {
                        session.id = Some(report.session_id);
                    }
                    if let Some(e) = &report.moment_error {
                        self.set_error(e.clone());
                    }
                    self.save_state = SaveState::Saved(report);
                }
                Err(e) => {
                    self.save_state = SaveState::Failed(e.clone());
                    self.set_error(e);
                }
            },
        }
    }

    fn stop_watching(&mut self) {
        if self.fixes.take().is_some() {
            self.deps.geolocation.unwatch();
        }
    }

    /// Drop everything about the current walk or route. No persistence.
    fn reset(&mut self) {
        self.ticker = None;
        self.stop_watching();
        self.generation_seq += 1;
        self.generated_route = None;
        self.last_options = None;
        self.session = None;
        self.session_key = Uuid::nil();
        self.trail = Trail::default();
        self.moments.clear();
        self.clock = ActiveClock::default();
        self.live_stats = LiveStats::default();
        self.save_state = SaveState::NotSaved;
        self.clear_error();
        self.set_phase(Phase::Idle);
    }

    fn snapshot(&self) -> EngineSnapshot {
        let current_session = self.session.as_ref().map(|s| {
            let mut s = s.clone();
            if s.status != SessionStatus::Completed {
                s.route_path = self.trail.points().to_vec();
                s.moments = self.moments.clone();
                s.total_distance = self.trail.length_m();
                s.total_duration = self.clock.elapsed().as_secs();
            }
            s
        });
        EngineSnapshot {
            phase: self.phase,
            live_stats: self.live_stats,
            route_path: self.trail.points().to_vec(),
            moments: self.moments.clone(),
            generated_route: self.generated_route.clone(),
            last_error: self.last_error.clone(),
            user_location: self.user_location,
            current_session,
            save_state: self.save_state.clone(),
        }
    }

    fn publish(&mut self) {
        self.published = true;
        let next = self.snapshot();
        self.state_tx.send_if_modified(|current| {
            if *current != next {
                *current = next;
                true
            } else {
                false
            }
        });
    }
}

fn new_record(session: &WalkSession, route_path: &[Coordinate]) -> NewWalkRecord {
    NewWalkRecord {
        user_id: session.user_id.clone(),
        title: session.title.clone(),
        start_time: session.start_time,
        route_path: route_path.to_vec(),
        planned_route: session.planned_route.clone(),
        status: session.status,
    }
}
