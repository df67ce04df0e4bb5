//! # Spotify Albums
//!
//! A small album browser built on the call-api middleware.
//!
//! This demo showcases:
//! - Entity schemas for albums, tracks, and artists
//! - Action creators that describe API calls declaratively
//! - Reducers merging normalized entities and tracking fetch status
//! - Reducer composition with `combine_reducers` and `scope_reducer`
//!
//! ## Example
//!
//! ```no_run
//! use call_api_runtime::{ApiMiddleware, Store};
//! use spotify_albums::{app_reducer, fetch_album, AppState, Schemas};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let schemas = Schemas::new()?;
//! let store = Store::with_middleware(
//!     AppState::default(),
//!     app_reducer(),
//!     vec![Arc::new(ApiMiddleware::http())],
//! );
//!
//! store.dispatch(fetch_album(&schemas, "4aawyAB9vmqN3uQ7FjRGTy"))?.settled().await?;
//! let title = store.state(|s| s.album("4aawyAB9vmqN3uQ7FjRGTy").cloned());
//! # Ok(())
//! # }
//! ```

use call_api_core::action::{Action, ApiAction};
use call_api_core::composition::{CombinedReducer, combine_reducers, scope_reducer};
use call_api_core::descriptor::CallApi;
use call_api_core::reducer::Reducer;
use call_api_core::schema::{Entity, EntityTables, Schema, SchemaError};
use serde_json::{Value, json};
use std::collections::BTreeMap;

/// Album fetch lifecycle.
pub const ALBUM_REQUEST: &str = "ALBUM_REQUEST";
/// Album fetched.
pub const ALBUM_SUCCESS: &str = "ALBUM_SUCCESS";
/// Album fetch failed.
pub const ALBUM_FAILURE: &str = "ALBUM_FAILURE";

/// Album tracks page lifecycle.
pub const TRACKS_REQUEST: &str = "ALBUM_TRACKS_REQUEST";
/// Album tracks page fetched.
pub const TRACKS_SUCCESS: &str = "ALBUM_TRACKS_SUCCESS";
/// Album tracks page failed.
pub const TRACKS_FAILURE: &str = "ALBUM_TRACKS_FAILURE";

/// Clears the last error message.
pub const RESET_ERROR_MESSAGE: &str = "RESET_ERROR_MESSAGE";

/// Field carrying the album id on every album action.
pub const ALBUM_ID_FIELD: &str = "albumId";

/// Entity schemas for Spotify responses.
///
/// Spotify nests tracks inside a paging object (`{"items": [...]}`), and
/// both albums and tracks list their artists.
#[derive(Debug, Clone)]
pub struct Schemas {
    /// Stored under `albums`.
    pub album: Entity,
    /// Stored under `tracks`.
    pub track: Entity,
    /// Stored under `artists`.
    pub artist: Entity,
}

impl Schemas {
    /// Build and link the album, track, and artist entities.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] if an entity is defined twice.
    pub fn new() -> Result<Self, SchemaError> {
        let album = Entity::new("albums");
        let track = Entity::new("tracks");
        let artist = Entity::new("artists");

        album.define([
            ("artists", Schema::array(artist.clone())),
            ("tracks", Self::paging(&track)),
        ])?;
        track.define([("artists", Schema::array(artist.clone()))])?;

        Ok(Self {
            album,
            track,
            artist,
        })
    }

    /// A paging object whose `items` are `entity`.
    fn paging(entity: &Entity) -> Schema {
        Schema::object([("items", Schema::array(entity.clone()))])
    }
}

/// Fetch one album with its first page of tracks.
#[must_use]
pub fn fetch_album(schemas: &Schemas, album_id: &str) -> ApiAction {
    ApiAction::new(
        CallApi::new(
            format!("albums/{album_id}"),
            [ALBUM_REQUEST, ALBUM_SUCCESS, ALBUM_FAILURE],
        )
        .with_schema(schemas.album.clone().into()),
    )
    .with_field(ALBUM_ID_FIELD, json!(album_id))
}

/// Fetch a page of an album's tracks.
///
/// `next_page_url` is the absolute `next` link from a previous page; when it
/// is `None` the first page is requested.
#[must_use]
pub fn fetch_album_tracks(
    schemas: &Schemas,
    album_id: &str,
    next_page_url: Option<&str>,
) -> ApiAction {
    let endpoint =
        next_page_url.map_or_else(|| format!("albums/{album_id}/tracks"), str::to_string);
    ApiAction::new(
        CallApi::new(endpoint, [TRACKS_REQUEST, TRACKS_SUCCESS, TRACKS_FAILURE])
            .with_schema(Schemas::paging(&schemas.track)),
    )
    .with_field(ALBUM_ID_FIELD, json!(album_id))
}

/// Application state.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    /// Every entity fetched so far.
    pub entities: EntityTables,
    /// In-flight album fetches, by album id.
    pub fetching: BTreeMap<String, bool>,
    /// Message of the most recent failure.
    pub error_message: Option<String>,
}

impl AppState {
    /// The album with `id`, if fetched.
    #[must_use]
    pub fn album(&self, id: &str) -> Option<&Value> {
        self.entity("albums", id)
    }

    /// Whether an album fetch is in flight.
    #[must_use]
    pub fn is_fetching(&self, album_id: &str) -> bool {
        self.fetching.get(album_id).copied().unwrap_or(false)
    }

    /// Names of the album's tracks, in album order.
    ///
    /// Tracks that have not been fetched are skipped.
    #[must_use]
    pub fn track_names(&self, album_id: &str) -> Vec<String> {
        let Some(ids) = self
            .album(album_id)
            .and_then(|album| album.pointer("/tracks/items"))
            .and_then(Value::as_array)
        else {
            return Vec::new();
        };

        ids.iter()
            .filter_map(Value::as_str)
            .filter_map(|id| self.entity("tracks", id))
            .filter_map(|track| track.get("name").and_then(Value::as_str))
            .map(str::to_string)
            .collect()
    }

    fn entity(&self, table: &str, id: &str) -> Option<&Value> {
        self.entities.get(table).and_then(|t| t.get(id))
    }
}

/// Merges `response.entities` from any action into the entity tables.
///
/// Entities seen before are merged field by field, so a track page does not
/// wipe fields that only the full album response carried.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntitiesReducer;

impl Reducer for EntitiesReducer {
    type State = EntityTables;

    fn reduce(&self, tables: &mut EntityTables, action: &Action) {
        let Some(Value::Object(incoming)) = action.response().and_then(|r| r.get("entities"))
        else {
            return;
        };

        for (key, table) in incoming {
            let Value::Object(table) = table else { continue };
            let stored = tables.entry(key.clone()).or_default();
            for (id, entity) in table {
                match (stored.get_mut(id), entity) {
                    (Some(Value::Object(existing)), Value::Object(fields)) => {
                        existing.extend(fields.clone());
                    }
                    _ => {
                        stored.insert(id.clone(), entity.clone());
                    }
                }
            }
        }
    }
}

/// Tracks in-flight album fetches.
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchStatusReducer;

impl Reducer for FetchStatusReducer {
    type State = BTreeMap<String, bool>;

    fn reduce(&self, fetching: &mut BTreeMap<String, bool>, action: &Action) {
        let Some(album_id) = action.get(ALBUM_ID_FIELD).and_then(Value::as_str) else {
            return;
        };
        match action.kind.as_str() {
            ALBUM_REQUEST => {
                fetching.insert(album_id.to_string(), true);
            }
            ALBUM_SUCCESS | ALBUM_FAILURE => {
                fetching.insert(album_id.to_string(), false);
            }
            _ => {}
        }
    }
}

/// Keeps the message of the latest failure until it is reset.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorMessageReducer;

impl Reducer for ErrorMessageReducer {
    type State = Option<String>;

    fn reduce(&self, message: &mut Option<String>, action: &Action) {
        if action.is(RESET_ERROR_MESSAGE) {
            *message = None;
        } else if let Some(error) = action.error() {
            *message = Some(error_message(error));
        }
    }
}

/// Human-readable text for a failure payload.
///
/// Spotify error bodies look like `{"error": {"status": 404, "message": ...}}`;
/// local failures carry `{"name": ..., "message": ...}`.
#[must_use]
pub fn error_message(error: &Value) -> String {
    error
        .pointer("/error/message")
        .or_else(|| error.get("message"))
        .or_else(|| error.get("error"))
        .and_then(Value::as_str)
        .map_or_else(|| error.to_string(), str::to_string)
}

/// The application reducer: entities, fetch status, and error message.
#[must_use]
pub fn app_reducer() -> CombinedReducer<AppState> {
    let reducers: Vec<Box<dyn Reducer<State = AppState>>> = vec![
        Box::new(scope_reducer(EntitiesReducer, |s: &mut AppState| &mut s.entities)),
        Box::new(scope_reducer(FetchStatusReducer, |s: &mut AppState| {
            &mut s.fetching
        })),
        Box::new(scope_reducer(ErrorMessageReducer, |s: &mut AppState| {
            &mut s.error_message
        })),
    ];
    combine_reducers(reducers)
}
