//! Canonical in-process copy of the location pins.
//!
//! Reads prefer the remote locations API and fall back to the local cache.
//! Mutations go to the remote API; when that fails the change is applied to the
//! local cache instead, subscribers are notified with the degraded view, and the
//! returned [`MutationResult`] carries the original error. Degraded changes are
//! never replayed: the next successful remote read replaces them.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, RwLock, Weak,
};

use chrono::Utc;
use rand::Rng;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::{
    gateway::{pin_endpoint, RemoteGateway, ResponseBody, PINS_ENDPOINT},
    storage::LocalStore,
};
use crate::{
    error::AppError,
    models::pin::{LocationPin, PLACEHOLDER_PREFIX},
};

const DEFAULT_PINS: &str = include_str!("../../data/location_pins.json");
const ID_SUFFIX_CHARS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

pub type PinListener = Arc<dyn Fn(&[LocationPin]) + Send + Sync>;

type ListenerList = Mutex<Vec<(u64, PinListener)>>;

/// The pins shipped with the binary, used to seed an empty cache.
pub fn default_pins() -> Result<Vec<LocationPin>, AppError> {
    Ok(serde_json::from_str(DEFAULT_PINS)?)
}

/// Handle returned by [`PinStore::subscribe`]. Each handle revokes exactly the
/// listener it was created for.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    listeners: Weak<ListenerList>,
}

impl Subscription {
    /// Returns `false` when the listener was already gone (store torn down).
    pub fn unsubscribe(self) -> bool {
        let Some(listeners) = self.listeners.upgrade() else {
            return false;
        };
        let Ok(mut listeners) = listeners.lock() else {
            return false;
        };
        let before = listeners.len();
        listeners.retain(|(id, _)| *id != self.id);
        listeners.len() != before
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationFailureKind {
    /// The remote API could not be reached or failed on its side; the change
    /// only exists in the local cache.
    SavedLocally,
    /// The remote API refused the change.
    Rejected,
}

impl MutationFailureKind {
    pub fn classify(err: &AppError) -> Self {
        match err {
            AppError::Network { status: None, .. } => MutationFailureKind::SavedLocally,
            AppError::Network {
                status: Some(status),
                ..
            } if *status >= 500 => MutationFailureKind::SavedLocally,
            AppError::Io(_) | AppError::Json(_) | AppError::Other(_) => {
                MutationFailureKind::SavedLocally
            }
            AppError::Network { .. }
            | AppError::Validation(_)
            | AppError::Auth(_)
            | AppError::Unauthorized
            | AppError::NotFound
            | AppError::Config(_) => MutationFailureKind::Rejected,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MutationFailureKind::SavedLocally => "saved_locally",
            MutationFailureKind::Rejected => "rejected",
        }
    }
}

#[derive(Debug)]
pub enum MutationOutcome<T> {
    Committed(T),
    Degraded(AppError),
}

/// What a mutation did: the pin set subscribers were just given, plus whether the
/// remote API accepted the change.
#[derive(Debug)]
pub struct MutationResult<T> {
    pub snapshot: Vec<LocationPin>,
    pub outcome: MutationOutcome<T>,
}

impl<T> MutationResult<T> {
    pub fn is_committed(&self) -> bool {
        matches!(self.outcome, MutationOutcome::Committed(_))
    }

    pub fn failure_kind(&self) -> Option<MutationFailureKind> {
        match &self.outcome {
            MutationOutcome::Committed(_) => None,
            MutationOutcome::Degraded(err) => Some(MutationFailureKind::classify(err)),
        }
    }

    pub fn into_result(self) -> Result<T, AppError> {
        match self.outcome {
            MutationOutcome::Committed(value) => Ok(value),
            MutationOutcome::Degraded(err) => Err(err),
        }
    }
}

enum LocalChange<'a> {
    Upsert(&'a LocationPin),
    Replace(&'a LocationPin),
    Remove(&'a str),
}

pub struct PinStore {
    gateway: RemoteGateway,
    cache: LocalStore,
    seed: Vec<LocationPin>,
    canonical: RwLock<Option<Vec<LocationPin>>>,
    listeners: Arc<ListenerList>,
    next_listener: AtomicU64,
}

impl PinStore {
    pub fn new(gateway: RemoteGateway, cache: LocalStore) -> Result<Self, AppError> {
        Ok(Self::with_seed(gateway, cache, default_pins()?))
    }

    pub fn with_seed(gateway: RemoteGateway, cache: LocalStore, seed: Vec<LocationPin>) -> Self {
        Self {
            gateway,
            cache,
            seed,
            canonical: RwLock::new(None),
            listeners: Arc::new(Mutex::new(Vec::new())),
            next_listener: AtomicU64::new(1),
        }
    }

    /// Placeholder id for a pin the server has not confirmed yet:
    /// `pin_<unix millis>_<9 base36 chars>`.
    pub fn generate_id() -> String {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..9)
            .map(|_| ID_SUFFIX_CHARS[rng.gen_range(0..ID_SUFFIX_CHARS.len())] as char)
            .collect();
        format!(
            "{PLACEHOLDER_PREFIX}{}_{suffix}",
            Utc::now().timestamp_millis()
        )
    }

    /// Last pin set this store loaded or published. Empty before the first load.
    pub fn snapshot(&self) -> Vec<LocationPin> {
        self.canonical
            .read()
            .ok()
            .and_then(|pins| pins.clone())
            .unwrap_or_default()
    }

    pub fn is_loaded(&self) -> bool {
        self.canonical
            .read()
            .map(|pins| pins.is_some())
            .unwrap_or(false)
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.lock().map(|l| l.len()).unwrap_or(0)
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&[LocationPin]) + Send + Sync + 'static,
    {
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.push((id, Arc::new(listener)));
        }
        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    /// Drops every listener and forgets the canonical set.
    pub fn close(&self) {
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.clear();
        }
        if let Ok(mut canonical) = self.canonical.write() {
            *canonical = None;
        }
    }

    /// Remote set when reachable, otherwise the local cache (seeded on first use).
    /// Never fails.
    pub async fn get_all_pins(&self) -> Vec<LocationPin> {
        let pins = match self.fetch_remote().await {
            Ok(pins) => {
                self.mirror_to_cache(&pins).await;
                pins
            }
            Err(err) => {
                warn!("pin API unavailable, serving local cache: {err}");
                self.load_local().await
            }
        };
        self.set_canonical(pins.clone());
        pins
    }

    /// Finds a pin in the canonical set, loading it first if needed.
    pub async fn get_pin(&self, id: &str) -> Option<LocationPin> {
        if !self.is_loaded() {
            self.get_all_pins().await;
        }
        self.snapshot().into_iter().find(|pin| pin.id == id)
    }

    pub async fn save_pin(&self, pin: LocationPin) -> MutationResult<LocationPin> {
        let attempt = async {
            let body = serde_json::to_value(&pin)?;
            let data = self
                .gateway
                .request(PINS_ENDPOINT, Method::POST, Some(&body), true)
                .await
                .into_result()?;
            let created = match data {
                Some(ResponseBody::Json(value)) => serde_json::from_value::<LocationPin>(value)?,
                _ => return Err(AppError::network("create response carried no pin")),
            };
            Ok::<_, AppError>(created)
        };

        match attempt.await {
            Ok(created) => {
                info!(placeholder = %pin.id, id = %created.id, "pin created");
                let snapshot = self.refresh_and_publish("save").await;
                MutationResult {
                    snapshot,
                    outcome: MutationOutcome::Committed(created),
                }
            }
            Err(err) => self.degrade("save", LocalChange::Upsert(&pin), err).await,
        }
    }

    pub async fn update_pin(&self, pin: LocationPin) -> MutationResult<()> {
        let attempt = async {
            let body = serde_json::to_value(&pin)?;
            self.gateway
                .request(&pin_endpoint(&pin.id), Method::PUT, Some(&body), true)
                .await
                .into_result()?;
            Ok::<_, AppError>(())
        };

        match attempt.await {
            Ok(()) => {
                info!(id = %pin.id, "pin updated");
                let snapshot = self.refresh_and_publish("update").await;
                MutationResult {
                    snapshot,
                    outcome: MutationOutcome::Committed(()),
                }
            }
            Err(err) => self.degrade("update", LocalChange::Replace(&pin), err).await,
        }
    }

    pub async fn delete_pin(&self, id: &str) -> MutationResult<()> {
        let result = self
            .gateway
            .request(&pin_endpoint(id), Method::DELETE, None, true)
            .await
            .into_result();

        match result {
            Ok(_) => {
                info!(%id, "pin deleted");
                let snapshot = self.refresh_and_publish("delete").await;
                MutationResult {
                    snapshot,
                    outcome: MutationOutcome::Committed(()),
                }
            }
            Err(err) => self.degrade("delete", LocalChange::Remove(id), err).await,
        }
    }

    async fn fetch_remote(&self) -> Result<Vec<LocationPin>, AppError> {
        let data = self
            .gateway
            .request(PINS_ENDPOINT, Method::GET, None, false)
            .await
            .into_result()?;
        let payload = match data {
            Some(ResponseBody::Json(value)) => value,
            Some(ResponseBody::Text(text)) => serde_json::from_str(&text)?,
            None => Value::Null,
        };
        Ok(dedup_by_id(extract_pins(payload)))
    }

    /// After a committed mutation. A failed refresh keeps the previous set so the
    /// caller's success is not turned into a failure.
    async fn refresh_and_publish(&self, operation: &str) -> Vec<LocationPin> {
        let snapshot = match self.fetch_remote().await {
            Ok(pins) => {
                self.mirror_to_cache(&pins).await;
                self.set_canonical(pins.clone());
                pins
            }
            Err(err) => {
                warn!(operation, "refresh after committed change failed: {err}");
                self.snapshot()
            }
        };
        self.publish(&snapshot);
        snapshot
    }

    async fn degrade<T>(
        &self,
        operation: &str,
        change: LocalChange<'_>,
        err: AppError,
    ) -> MutationResult<T> {
        error!(operation, "pin API rejected change, applying locally: {err}");
        let mut pins = self.load_local().await;
        match change {
            LocalChange::Upsert(pin) => match pins.iter_mut().find(|p| p.id == pin.id) {
                Some(existing) => *existing = pin.clone(),
                None => pins.push(pin.clone()),
            },
            LocalChange::Replace(pin) => {
                for existing in pins.iter_mut().filter(|p| p.id == pin.id) {
                    *existing = pin.clone();
                }
            }
            LocalChange::Remove(id) => pins.retain(|p| p.id != id),
        }
        if let Err(cache_err) = self.cache.save_cached_pins(&pins).await {
            error!(operation, "could not persist local pin cache: {cache_err}");
        }
        self.set_canonical(pins.clone());
        self.publish(&pins);
        MutationResult {
            snapshot: pins,
            outcome: MutationOutcome::Degraded(err),
        }
    }

    async fn load_local(&self) -> Vec<LocationPin> {
        match self.cache.load_cached_pins().await {
            Ok(Some(pins)) => dedup_by_id(pins),
            Ok(None) => {
                info!(count = self.seed.len(), "seeding local pin cache");
                if let Err(err) = self.cache.save_cached_pins(&self.seed).await {
                    error!("could not persist seed pins: {err}");
                }
                self.seed.clone()
            }
            Err(err) => {
                error!("local pin cache unreadable, serving bundled pins: {err}");
                self.seed.clone()
            }
        }
    }

    async fn mirror_to_cache(&self, pins: &[LocationPin]) {
        if let Err(err) = self.cache.save_cached_pins(pins).await {
            warn!("could not mirror remote pins to local cache: {err}");
        }
    }

    fn set_canonical(&self, pins: Vec<LocationPin>) {
        if let Ok(mut canonical) = self.canonical.write() {
            *canonical = Some(pins);
        }
    }

    /// Listeners run in registration order on the caller's task. A panicking
    /// listener unwinds into the publishing call.
    fn publish(&self, pins: &[LocationPin]) {
        let listeners: Vec<PinListener> = match self.listeners.lock() {
            Ok(listeners) => listeners.iter().map(|(_, l)| Arc::clone(l)).collect(),
            Err(_) => return,
        };
        debug!(listeners = listeners.len(), pins = pins.len(), "publishing pins");
        for listener in listeners {
            listener(pins);
        }
    }
}

/// Accepts either a bare array or an object with a `pins` array. Entries that
/// do not parse as pins are skipped.
fn extract_pins(payload: Value) -> Vec<LocationPin> {
    let items = match payload {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("pins") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<LocationPin>(item) {
            Ok(pin) => Some(pin),
            Err(err) => {
                warn!("skipping malformed pin record: {err}");
                None
            }
        })
        .collect()
}

fn dedup_by_id(pins: Vec<LocationPin>) -> Vec<LocationPin> {
    let mut seen = std::collections::HashSet::new();
    pins.into_iter()
        .filter(|pin| {
            let fresh = seen.insert(pin.id.clone());
            if !fresh {
                warn!(id = %pin.id, "dropping duplicate pin id");
            }
            fresh
        })
        .collect()
}
