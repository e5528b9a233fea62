// tests/common/mod.rs — Fakes shared by the integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use walkly::geo::Coordinate;
use walkly::geolocation::{FixStream, GeolocationSource, LocationFailure, PositionFix};
use walkly::infra::errors::WalkError;
use walkly::route::{GeneratedRoute, RouteGenerationOptions, RoutePlanner};
use walkly::session::{
    spawn_engine, EngineDeps, EngineHandle, EngineSettings, SessionId, SessionStatus, WalkMoment,
};
use walkly::store::{
    self, spawn_store_server, FinalWalkRecord, NewWalkRecord, SessionStore, StoreHandle,
    StoredWalk, WalkSummary,
};

pub const HOME: Coordinate = Coordinate {
    lat: 40.7128,
    lng: -74.0060,
};

/// A point `meters` north of `from` (1 deg lat ~ 111.2 km).
pub fn north_of(from: Coordinate, meters: f64) -> Coordinate {
    Coordinate::new(from.lat + meters / 111_195.0, from.lng)
}

pub fn fix(c: Coordinate) -> PositionFix {
    PositionFix::now(c)
}

// -- Planner --

/// Returns a square loop around the start; queued errors are returned first.
#[derive(Default)]
pub struct FakePlanner {
    failures: Mutex<VecDeque<WalkError>>,
    calls: Mutex<Vec<RouteGenerationOptions>>,
    delay: Mutex<Duration>,
}

impl FakePlanner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_next(&self, error: WalkError) {
        self.failures.lock().unwrap().push_back(error);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn calls(&self) -> Vec<RouteGenerationOptions> {
        self.calls.lock().unwrap().clone()
    }
}

pub fn square_route(start: Coordinate) -> GeneratedRoute {
    let d = 0.002;
    let coordinates = vec![
        start,
        Coordinate::new(start.lat + d, start.lng),
        Coordinate::new(start.lat + d, start.lng + d),
        Coordinate::new(start.lat, start.lng + d),
        start,
    ];
    GeneratedRoute {
        distance: walkly::geo::trail_length(&coordinates),
        waypoints: coordinates[1..4].to_vec(),
        coordinates,
        duration: 600.0,
        instructions: None,
    }
}

#[async_trait]
impl RoutePlanner for FakePlanner {
    async fn generate(&self, options: &RouteGenerationOptions) -> Result<GeneratedRoute, WalkError> {
        self.calls.lock().unwrap().push(options.clone());
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(e) = self.failures.lock().unwrap().pop_front() {
            return Err(e);
        }
        let start = options
            .start_location
            .ok_or_else(|| WalkError::location("no start"))?;
        Ok(square_route(start))
    }

    async fn generate_alternatives(
        &self,
        options: &RouteGenerationOptions,
        count: usize,
    ) -> Vec<Result<GeneratedRoute, WalkError>> {
        let mut out = Vec::new();
        for _ in 0..count {
            out.push(self.generate(options).await);
        }
        out
    }
}

// -- Geolocation --

/// Position source driven by the test through `emit`.
pub struct FakeGeolocation {
    position: Mutex<Option<Coordinate>>,
    watcher: Mutex<Option<mpsc::UnboundedSender<PositionFix>>>,
    pub unwatched: AtomicUsize,
}

impl FakeGeolocation {
    pub fn at(position: Option<Coordinate>) -> Arc<Self> {
        Arc::new(Self {
            position: Mutex::new(position),
            watcher: Mutex::new(None),
            unwatched: AtomicUsize::new(0),
        })
    }

    /// Push a fix to the current watcher. `false` when nobody is watching.
    pub fn emit(&self, c: Coordinate) -> bool {
        match self.watcher.lock().unwrap().as_ref() {
            Some(tx) => tx.send(fix(c)).is_ok(),
            None => false,
        }
    }

    pub fn is_watched(&self) -> bool {
        self.watcher
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }
}

#[async_trait]
impl GeolocationSource for FakeGeolocation {
    async fn current_position(&self) -> Result<PositionFix, WalkError> {
        match *self.position.lock().unwrap() {
            Some(c) => Ok(fix(c)),
            None => Err(LocationFailure::PermissionDenied.into()),
        }
    }

    fn watch(&self) -> FixStream {
        let (tx, mut rx) = mpsc::unbounded_channel();
        *self.watcher.lock().unwrap() = Some(tx);
        Box::pin(async_stream::stream! {
            while let Some(fix) = rx.recv().await {
                yield fix;
            }
        })
    }

    fn unwatch(&self) {
        self.unwatched.fetch_add(1, Ordering::SeqCst);
        *self.watcher.lock().unwrap() = None;
    }
}

// -- Store --

/// In-memory store whose writes can be made to fail.
pub struct FlakyStore {
    inner: StoreHandle,
    pub fail_insert: AtomicBool,
    pub fail_finalize: AtomicBool,
    pub fail_moments: AtomicBool,
    /// Never answers finalize while set.
    pub hang_finalize: AtomicBool,
    pub status_updates: Mutex<Vec<(SessionId, SessionStatus)>>,
}

impl FlakyStore {
    pub fn new() -> Arc<Self> {
        let (inner, _) = spawn_store_server(store::in_memory().unwrap());
        Arc::new(Self {
            inner,
            fail_insert: AtomicBool::new(false),
            fail_finalize: AtomicBool::new(false),
            fail_moments: AtomicBool::new(false),
            hang_finalize: AtomicBool::new(false),
            status_updates: Mutex::new(Vec::new()),
        })
    }

    pub fn set(flag: &AtomicBool, on: bool) {
        flag.store(on, Ordering::SeqCst);
    }
}

fn down() -> WalkError {
    WalkError::persistence("database is locked")
}

#[async_trait]
impl SessionStore for FlakyStore {
    async fn insert_session(&self, record: &NewWalkRecord) -> Result<SessionId, WalkError> {
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(down());
        }
        self.inner.insert_session(record).await
    }

    async fn update_session_status(
        &self,
        id: SessionId,
        status: SessionStatus,
    ) -> Result<(), WalkError> {
        self.status_updates.lock().unwrap().push((id, status));
        self.inner.update_session_status(id, status).await
    }

    async fn finalize_session(
        &self,
        id: SessionId,
        record: &FinalWalkRecord,
    ) -> Result<(), WalkError> {
        if self.hang_finalize.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail_finalize.load(Ordering::SeqCst) {
            return Err(down());
        }
        self.inner.finalize_session(id, record).await
    }

    async fn insert_moments(
        &self,
        session_id: SessionId,
        moments: &[WalkMoment],
    ) -> Result<usize, WalkError> {
        if self.fail_moments.load(Ordering::SeqCst) {
            return Err(down());
        }
        self.inner.insert_moments(session_id, moments).await
    }

    async fn list_sessions(&self, user_id: &str, limit: u32) -> Result<Vec<WalkSummary>, WalkError> {
        self.inner.list_sessions(user_id, limit).await
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<StoredWalk>, WalkError> {
        self.inner.get_session(id).await
    }

    async fn delete_session(&self, id: SessionId) -> Result<bool, WalkError> {
        self.inner.delete_session(id).await
    }
}

// -- Engine --

pub struct Harness {
    pub engine: EngineHandle,
    pub planner: Arc<FakePlanner>,
    pub geo: Arc<FakeGeolocation>,
    pub store: Arc<FlakyStore>,
}

pub fn settings() -> EngineSettings {
    EngineSettings::default().with_user("walker-1")
}

pub fn harness_with(settings: EngineSettings, position: Option<Coordinate>) -> Harness {
    let planner = FakePlanner::new();
    let geo = FakeGeolocation::at(position);
    let store = FlakyStore::new();
    let engine = spawn_engine(
        EngineDeps {
            planner: planner.clone(),
            geolocation: geo.clone(),
            store: store.clone(),
        },
        settings,
    );
    Harness {
        engine,
        planner,
        geo,
        store,
    }
}

pub fn harness() -> Harness {
    harness_with(settings(), Some(HOME))
}
