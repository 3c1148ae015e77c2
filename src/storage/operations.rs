use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::{
    config,
    domain::{
        id::MixtapeId,
        mixtape::{Mixtape, MixtapeUpdate, NewMixtape, Track, DEFAULT_RECIPIENT},
    },
    storage::{
        db::{self, MillisSinceUnix},
        error::StoreError,
        schema::{columns, tables},
    },
};

use columns::*;
use rusqlite::params;
use tables::*;

/// A stored document as it sits in the `doc` column. The id lives on the
/// row, not in the document, and is merged back in on read.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MixtapeDoc {
    recipient_name: String,
    tracks: Vec<Track>,
    created_at: MillisSinceUnix,
}

impl MixtapeDoc {
    fn into_mixtape(self, id: MixtapeId) -> Mixtape {
        Mixtape {
            id,
            recipient_name: self.recipient_name,
            tracks: self.tracks,
            created_at: self.created_at,
        }
    }
}

/// Result of a fetch: the requested document, or the designated default
/// when the requested id does not exist.
#[derive(Debug)]
pub enum Fetched {
    Found(Mixtape),
    Fallback(Mixtape),
}

impl Fetched {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Fetched::Fallback(_))
    }

    pub fn into_mixtape(self) -> Mixtape {
        match self {
            Fetched::Found(m) | Fetched::Fallback(m) => m,
        }
    }
}

#[derive(Debug)]
pub struct MixtapeListEntry {
    pub id: MixtapeId,
    pub recipient_name: String,
    pub track_count: usize,
    pub created_at: MillisSinceUnix,
}

/// Main structure that implements the mixtape document store
pub struct Store {
    pub(crate) db: rusqlite::Connection,
    fallback_id: MixtapeId,
}

impl Store {
    /// when called, opens a data base connection
    pub fn new(db_config: &config::Database, fallback_id: MixtapeId) -> Result<Self, StoreError> {
        let db: rusqlite::Connection = db::open(db_config)?;
        Ok(Self::from_existing_conn(db, fallback_id))
    }

    pub fn from_existing_conn(db: rusqlite::Connection, fallback_id: MixtapeId) -> Self {
        Self { db, fallback_id }
    }

    pub fn fallback_id(&self) -> &MixtapeId {
        &self.fallback_id
    }

    /// Stores a new document, stamping the creation time and assigning an
    /// id, and returns it as a fresh read would see it.
    pub fn create(&mut self, new: NewMixtape) -> Result<Mixtape, StoreError> {
        let created_at = db::now_millis();
        let doc = MixtapeDoc {
            recipient_name: new.recipient_name,
            tracks: new.tracks,
            created_at,
        };
        let encoded = encode_doc(&doc)?;
        let id = MixtapeId::assign(created_at, encoded.as_bytes());

        self.db.execute(
            &format!(
                "INSERT INTO {MIXTAPES} ({MIXTAPE_ID}, {DOC}, {CREATED_AT}) VALUES (?1, ?2, ?3)"
            ),
            params![id.as_str(), encoded, created_at],
        )?;

        Ok(doc.into_mixtape(id))
    }

    /// Reads one document by exact id.
    pub fn get(&mut self, id: &MixtapeId) -> Result<Option<Mixtape>, StoreError> {
        let encoded = {
            let mut stmt = self.db.prepare(&format!(
                "SELECT {DOC} FROM {MIXTAPES} WHERE {MIXTAPE_ID} = ?1"
            ))?;
            let mut rows = stmt.query_map(params![id.as_str()], |row| row.get::<_, String>(0))?;
            rows.next().transpose()?
        };

        match encoded {
            Some(encoded) => Ok(Some(decode_doc(id, &encoded)?.into_mixtape(id.clone()))),
            None => Ok(None),
        }
    }

    /// Reads the document for playback. A missing id is served the default
    /// mixtape instead of an error, so stale share links keep playing
    /// something.
    pub fn fetch(&mut self, id: &MixtapeId) -> Result<Fetched, StoreError> {
        if let Some(mixtape) = self.get(id)? {
            return Ok(Fetched::Found(mixtape));
        }

        log::warn!(
            "mixtape {id} not found, falling back to {}",
            self.fallback_id
        );
        let fallback_id = self.fallback_id.clone();
        match self.get(&fallback_id)? {
            Some(fallback) => Ok(Fetched::Fallback(fallback)),
            None => Err(StoreError::MixtapeNotFound(id.clone())),
        }
    }

    /// Merges a partial update into the stored document and returns the
    /// result of reading it back. Writes never fall back: updating a
    /// missing id is an error.
    pub fn update(&mut self, id: &MixtapeId, update: MixtapeUpdate) -> Result<Mixtape, StoreError> {
        let tx = self.db.transaction()?;

        let stored = {
            let mut stmt = tx.prepare(&format!(
                "SELECT {DOC} FROM {MIXTAPES} WHERE {MIXTAPE_ID} = ?1"
            ))?;
            let mut rows = stmt.query_map(params![id.as_str()], |row| row.get::<_, String>(0))?;
            rows.next().transpose()?
        };
        let Some(encoded) = stored else {
            return Err(StoreError::MixtapeNotFound(id.clone()));
        };

        let existing = decode_doc(id, &encoded)?;
        let merged = MixtapeDoc {
            recipient_name: update.recipient_name.unwrap_or(existing.recipient_name),
            tracks: update.tracks.unwrap_or(existing.tracks),
            created_at: existing.created_at,
        };
        let encoded = encode_doc(&merged)?;

        tx.execute(
            &format!("UPDATE {MIXTAPES} SET {DOC} = ?2 WHERE {MIXTAPE_ID} = ?1"),
            params![id.as_str(), encoded],
        )?;
        tx.commit()?;

        // hand back what a fresh read sees
        self.get(id)?
            .ok_or_else(|| StoreError::MixtapeNotFound(id.clone()))
    }

    /// Lists all stored mixtapes, newest first.
    pub fn list(&mut self) -> Result<Vec<MixtapeListEntry>, StoreError> {
        let rows = {
            let mut stmt = self.db.prepare(&format!(
                "SELECT {MIXTAPE_ID}, {DOC}, {CREATED_AT} FROM {MIXTAPES}
                 ORDER BY {CREATED_AT} DESC, {MIXTAPE_ID}"
            ))?;
            stmt.query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?
        };

        rows.into_iter()
            .map(|(raw_id, encoded, created_at)| {
                let id = MixtapeId::parse(&raw_id).map_err(|_| StoreError::InvalidMixtapeId)?;
                let doc = decode_doc(&id, &encoded)?;
                Ok(MixtapeListEntry {
                    id,
                    recipient_name: doc.recipient_name,
                    track_count: doc.tracks.len(),
                    created_at,
                })
            })
            .collect()
    }

    /// Installs (or overwrites) the curated default mixtape under the
    /// fallback id.
    pub fn seed_default(&mut self) -> Result<Mixtape, StoreError> {
        let created_at = db::now_millis();
        let doc = default_mix(created_at);
        let encoded = encode_doc(&doc)?;

        self.db.execute(
            &format!(
                "INSERT OR REPLACE INTO {MIXTAPES} ({MIXTAPE_ID}, {DOC}, {CREATED_AT})
                 VALUES (?1, ?2, ?3)"
            ),
            params![self.fallback_id.as_str(), encoded, created_at],
        )?;

        log::info!("seeded default mixtape {}", self.fallback_id);
        Ok(doc.into_mixtape(self.fallback_id.clone()))
    }

    /// Seeds the default mixtape only when it is missing. Returns whether
    /// anything was installed.
    pub fn ensure_default(&mut self) -> Result<bool, StoreError> {
        let fallback_id = self.fallback_id.clone();
        if self.get(&fallback_id)?.is_some() {
            return Ok(false);
        }
        self.seed_default()?;
        Ok(true)
    }
}

fn encode_doc(doc: &MixtapeDoc) -> Result<String, StoreError> {
    serde_json::to_string(doc)
        .map_err(|e| StoreError::Internal(anyhow!("failed to encode mixtape document: {e}")))
}

fn decode_doc(id: &MixtapeId, encoded: &str) -> Result<MixtapeDoc, StoreError> {
    serde_json::from_str(encoded).map_err(|source| StoreError::BadDoc {
        id: id.clone(),
        source,
    })
}

fn default_mix(created_at: MillisSinceUnix) -> MixtapeDoc {
    MixtapeDoc {
        recipient_name: DEFAULT_RECIPIENT.to_string(),
        tracks: vec![
            Track::new(1, "https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Track::new(2, "https://www.youtube.com/watch?v=fJ9rUzIMcZQ"),
            Track::new(3, "https://youtu.be/hTWKbfoikeg"),
            Track::new(4, "https://www.youtube.com/watch?v=9bZkp7q19f0"),
        ],
        created_at,
    }
}

#[cfg(test)]
mod tests {
    use rusqlite::{Connection, params};
    use serde_json::Value;

    use crate::{
        domain::{
            id::MixtapeId,
            mixtape::{MixtapeUpdate, NewMixtape, Track},
        },
        storage::{
            error::StoreError,
            operations::{Fetched, Store},
            schema::{self, *},
        },
    };

    fn mock_fallback_id() -> MixtapeId {
        MixtapeId::parse("awesome-mix").unwrap()
    }

    fn mock_store() -> anyhow::Result<Store> {
        let conn = Connection::open_in_memory()?;
        schema::init(&conn)?;
        Ok(Store::from_existing_conn(conn, mock_fallback_id()))
    }

    fn mock_new_mixtape() -> NewMixtape {
        NewMixtape {
            recipient_name: "Sam".to_string(),
            tracks: vec![
                Track::new(1, "https://www.youtube.com/watch?v=abc123"),
                Track::new(2, "https://youtu.be/xyz789"),
            ],
        }
    }

    #[test]
    fn create_assigns_an_id_and_persists() -> anyhow::Result<()> {
        let mut store = mock_store()?;

        let created = store.create(mock_new_mixtape())?;
        assert_eq!(created.id.as_str().len(), 20);
        assert!(created.created_at > 0);

        let Fetched::Found(read) = store.fetch(&created.id)? else {
            panic!("expected the mixtape to be found directly");
        };
        assert_eq!(read, created);

        Ok(())
    }

    #[test]
    fn identical_payloads_get_distinct_ids() -> anyhow::Result<()> {
        let mut store = mock_store()?;

        let a = store.create(mock_new_mixtape())?;
        let b = store.create(mock_new_mixtape())?;
        assert_ne!(a.id, b.id);

        Ok(())
    }

    #[test]
    fn stored_documents_use_wire_field_names() -> anyhow::Result<()> {
        let mut store = mock_store()?;
        let created = store.create(mock_new_mixtape())?;

        let encoded: String = store.db.query_row(
            &format!("SELECT {DOC} FROM {MIXTAPES} WHERE {MIXTAPE_ID} = ?1"),
            params![created.id.as_str()],
            |row| row.get(0),
        )?;
        let doc: Value = serde_json::from_str(&encoded)?;

        assert!(doc.get("recipientName").is_some());
        assert!(doc.get("createdAt").is_some());
        assert!(doc.get("tracks").is_some());
        // the id is the row key, never part of the document
        assert!(doc.get("id").is_none());

        Ok(())
    }

    #[test]
    fn fetch_of_a_missing_id_falls_back_to_the_default() -> anyhow::Result<()> {
        let mut store = mock_store()?;
        store.seed_default()?;

        let fetched = store.fetch(&MixtapeId::parse("gone").unwrap())?;
        assert!(fetched.is_fallback());
        let mixtape = fetched.into_mixtape();
        assert_eq!(mixtape.id, mock_fallback_id());
        assert!(!mixtape.tracks.is_empty());

        Ok(())
    }

    #[test]
    fn fetch_without_a_seeded_default_errors() -> anyhow::Result<()> {
        let mut store = mock_store()?;

        let err = store.fetch(&MixtapeId::parse("gone").unwrap()).unwrap_err();
        assert!(matches!(err, StoreError::MixtapeNotFound(_)));

        Ok(())
    }

    #[test]
    fn fetching_the_default_itself_is_not_a_fallback() -> anyhow::Result<()> {
        let mut store = mock_store()?;
        store.seed_default()?;

        let fetched = store.fetch(&mock_fallback_id())?;
        assert!(matches!(fetched, Fetched::Found(_)));

        Ok(())
    }

    #[test]
    fn update_merges_partial_fields() -> anyhow::Result<()> {
        let mut store = mock_store()?;
        let created = store.create(mock_new_mixtape())?;

        // tracks only: the name stays
        let reordered = vec![
            Track::new(2, "https://youtu.be/xyz789"),
            Track::new(1, "https://www.youtube.com/watch?v=abc123"),
        ];
        let updated = store.update(
            &created.id,
            MixtapeUpdate {
                recipient_name: None,
                tracks: Some(reordered.clone()),
            },
        )?;
        assert_eq!(updated.recipient_name, "Sam");
        assert_eq!(updated.tracks, reordered);
        assert_eq!(updated.created_at, created.created_at);

        // name only: the tracks stay
        let updated = store.update(
            &created.id,
            MixtapeUpdate {
                recipient_name: Some("Alex".to_string()),
                tracks: None,
            },
        )?;
        assert_eq!(updated.recipient_name, "Alex");
        assert_eq!(updated.tracks, reordered);

        Ok(())
    }

    #[test]
    fn update_of_a_missing_id_never_falls_back() -> anyhow::Result<()> {
        let mut store = mock_store()?;
        store.seed_default()?;

        let err = store
            .update(
                &MixtapeId::parse("gone").unwrap(),
                MixtapeUpdate {
                    recipient_name: Some("Alex".to_string()),
                    tracks: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::MixtapeNotFound(_)));

        // the default itself is untouched
        let default = store.get(&mock_fallback_id())?.unwrap();
        assert_ne!(default.recipient_name, "Alex");

        Ok(())
    }

    #[test]
    fn ensure_default_seeds_only_once() -> anyhow::Result<()> {
        let mut store = mock_store()?;

        assert!(store.ensure_default()?);
        let first = store.get(&mock_fallback_id())?.unwrap();

        assert!(!store.ensure_default()?);
        let second = store.get(&mock_fallback_id())?.unwrap();
        assert_eq!(first, second);

        Ok(())
    }

    #[test]
    fn seed_overwrites_a_remixed_default() -> anyhow::Result<()> {
        let mut store = mock_store()?;
        store.seed_default()?;

        store.update(
            &mock_fallback_id(),
            MixtapeUpdate {
                recipient_name: Some("Alex".to_string()),
                tracks: None,
            },
        )?;

        store.seed_default()?;
        let default = store.get(&mock_fallback_id())?.unwrap();
        assert_ne!(default.recipient_name, "Alex");

        Ok(())
    }

    #[test]
    fn list_reports_every_stored_mixtape() -> anyhow::Result<()> {
        let mut store = mock_store()?;
        store.seed_default()?;
        let created = store.create(mock_new_mixtape())?;

        let entries = store.list()?;
        assert_eq!(entries.len(), 2);

        let ours = entries.iter().find(|e| e.id == created.id).unwrap();
        assert_eq!(ours.recipient_name, "Sam");
        assert_eq!(ours.track_count, 2);

        Ok(())
    }

    #[test]
    fn a_corrupt_document_reads_as_an_error() -> anyhow::Result<()> {
        let mut store = mock_store()?;
        store.db.execute(
            &format!(
                "INSERT INTO {MIXTAPES} ({MIXTAPE_ID}, {DOC}, {CREATED_AT}) VALUES (?1, ?2, ?3)"
            ),
            params!["broken", "{not json", 0],
        )?;

        let err = store
            .get(&MixtapeId::parse("broken").unwrap())
            .unwrap_err();
        assert!(matches!(err, StoreError::BadDoc { .. }));

        Ok(())
    }
}
