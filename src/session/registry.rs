use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::config::SessionConfig;
use super::session::Session;
use crate::audio::Segmenter;

/// Process-wide table of open sessions (session id → session).
///
/// Sharded, so operations on distinct ids don't contend. Map guards are
/// never held across an await.
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<Session>>,
    defaults: SessionConfig,
    segmenter: Arc<Segmenter>,
}

impl SessionRegistry {
    pub fn new(defaults: SessionConfig, segmenter: Arc<Segmenter>) -> Self {
        Self {
            sessions: DashMap::new(),
            defaults,
            segmenter,
        }
    }

    /// Return the open session for `id`, creating it if absent.
    ///
    /// A second call for an existing id reuses the session untouched; the
    /// sample rate only applies on creation (0 falls back to the default).
    /// The flag is true when created.
    pub fn get_or_create(&self, id: &str, sample_rate: Option<u32>) -> (Arc<Session>, bool) {
        match self.sessions.entry(id.to_string()) {
            Entry::Occupied(entry) => {
                debug!("Reusing session: {}", id);
                (Arc::clone(entry.get()), false)
            }
            Entry::Vacant(entry) => {
                let sample_rate = match sample_rate {
                    Some(0) => {
                        warn!(
                            "Session {} announced a 0 Hz sample rate, using {} Hz",
                            id, self.defaults.sample_rate
                        );
                        self.defaults.sample_rate
                    }
                    Some(rate) => rate,
                    None => self.defaults.sample_rate,
                };
                let config = SessionConfig {
                    sample_rate,
                    ..self.defaults.clone()
                };
                let session = Arc::new(Session::new(id, config, Arc::clone(&self.segmenter)));
                entry.insert(Arc::clone(&session));
                (session, true)
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Remove and close a session. Absent ids are ignored.
    pub async fn remove(&self, id: &str) -> Option<Arc<Session>> {
        let (_, session) = self.sessions.remove(id)?;
        session.close().await;
        info!("Session removed: {}", id);
        Some(session)
    }

    /// Remove a session only if its transport is still bound to `connection_id`.
    ///
    /// Used on transport disconnect, so a connection that lost its session to
    /// a newer `start` doesn't tear it down.
    pub async fn release(&self, id: &str, connection_id: Uuid) -> Option<Arc<Session>> {
        let session = self.get(id)?;

        let released = session
            .close_if_bound(connection_id, || {
                self.sessions
                    .remove_if(id, |_, current| Arc::ptr_eq(current, &session))
                    .is_some()
            })
            .await;

        if !released {
            return None;
        }

        info!("Session released on disconnect: {}", id);
        Some(session)
    }

    /// Visit every open session
    pub fn for_each<F>(&self, mut visitor: F)
    where
        F: FnMut(&Arc<Session>),
    {
        for entry in self.sessions.iter() {
            visitor(entry.value());
        }
    }

    /// Ids of every open session
    pub fn ids(&self) -> Vec<String> {
        self.sessions.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Close every session (process shutdown)
    pub async fn clear(&self) {
        for id in self.ids() {
            self.remove(&id).await;
        }
    }
}
