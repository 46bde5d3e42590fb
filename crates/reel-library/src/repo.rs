//! Video library repository.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};

use reel_models::{
    AspectRatio, JobId, NewVideoRecord, RecordId, RecordPatch, StoryDuration, VideoRecord,
    VideoStatus, VisualStyle,
};

use crate::client::FirestoreClient;
use crate::error::{LibraryError, LibraryResult};
use crate::types::{Direction, Document, StructuredQuery, ToFirestoreValue, Value};

/// Top-level collection holding every user's videos.
pub const VIDEOS_COLLECTION: &str = "videos";

/// Upper bound on records returned by a listing.
const LIST_LIMIT: i32 = 200;

/// Persistent per-user list of generated videos.
#[async_trait]
pub trait VideoLibrary: Send + Sync {
    /// Create the record for a job, or refresh its metadata if it already exists.
    ///
    /// The record id is the job id, so repeated calls for one job touch a
    /// single record.
    async fn create_record(&self, owner_id: &str, meta: NewVideoRecord) -> LibraryResult<RecordId>;

    /// Apply a partial update. Fails with `NotFound` if the record is missing.
    async fn update_record(&self, record_id: &RecordId, patch: RecordPatch) -> LibraryResult<()>;

    async fn get_record(&self, record_id: &RecordId) -> LibraryResult<Option<VideoRecord>>;

    /// All records of `owner_id`, newest first.
    async fn list_records(&self, owner_id: &str) -> LibraryResult<Vec<VideoRecord>>;

    /// Delete a record. Deleting a missing record succeeds.
    async fn delete_record(&self, record_id: &RecordId) -> LibraryResult<()>;
}

/// [`VideoLibrary`] backed by Firestore.
#[derive(Clone)]
pub struct FirestoreVideoLibrary {
    client: FirestoreClient,
}

impl FirestoreVideoLibrary {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    /// Create from environment variables.
    pub async fn from_env() -> LibraryResult<Self> {
        Ok(Self::new(FirestoreClient::from_env().await?))
    }
}

#[async_trait]
impl VideoLibrary for FirestoreVideoLibrary {
    async fn create_record(&self, owner_id: &str, meta: NewVideoRecord) -> LibraryResult<RecordId> {
        let record_id = RecordId::for_job(&meta.job_id);
        let record = VideoRecord::new(record_id.clone(), owner_id, meta);
        let fields = record_to_fields(&record);
        let (meta_fields, mask) = metadata_fields(&record);
        let (client, doc_id) = (&self.client, record_id.as_str());
        let (fields, meta_fields, mask) = (&fields, &meta_fields, &mask);

        // Upsert by job id, so replaying the create after a lost response is safe.
        let created = self
            .client
            .with_retry("create_record", move || async move {
                match client
                    .create_document(VIDEOS_COLLECTION, doc_id, fields.clone())
                    .await
                {
                    Ok(_) => Ok(true),
                    Err(LibraryError::AlreadyExists(_)) => {
                        client
                            .update_document(
                                VIDEOS_COLLECTION,
                                doc_id,
                                meta_fields.clone(),
                                mask.clone(),
                            )
                            .await?;
                        Ok(false)
                    }
                    Err(e) => Err(e),
                }
            })
            .await?;

        if created {
            info!(record_id = %record_id, owner_id = %owner_id, "Created library record");
        } else {
            debug!(record_id = %record_id, "Library record already existed, metadata refreshed");
        }
        Ok(record_id)
    }

    async fn update_record(&self, record_id: &RecordId, patch: RecordPatch) -> LibraryResult<()> {
        let (fields, mask) = patch_fields(&patch);

        self.client
            .with_retry("update_record", || {
                self.client.update_document(
                    VIDEOS_COLLECTION,
                    record_id.as_str(),
                    fields.clone(),
                    mask.clone(),
                )
            })
            .await?;

        debug!(record_id = %record_id, fields = ?mask, "Updated library record");
        Ok(())
    }

    async fn get_record(&self, record_id: &RecordId) -> LibraryResult<Option<VideoRecord>> {
        let doc = self
            .client
            .with_retry("get_record", || {
                self.client.get_document(VIDEOS_COLLECTION, record_id.as_str())
            })
            .await?;

        doc.map(|d| document_to_record(&d, Some(record_id))).transpose()
    }

    async fn list_records(&self, owner_id: &str) -> LibraryResult<Vec<VideoRecord>> {
        let query = StructuredQuery::collection(VIDEOS_COLLECTION)
            .where_eq("owner_id", owner_id.to_firestore_value())
            .order_by("created_at", Direction::Descending)
            .limit(LIST_LIMIT);

        let docs = self
            .client
            .with_retry("list_records", || self.client.run_query(None, query.clone()))
            .await?;

        let mut records = docs
            .iter()
            .map(|d| document_to_record(d, None))
            .collect::<LibraryResult<Vec<_>>>()?;

        // Keep the ordering even if the server ignored orderBy.
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn delete_record(&self, record_id: &RecordId) -> LibraryResult<()> {
        self.client
            .with_retry("delete_record", || {
                self.client.delete_document(VIDEOS_COLLECTION, record_id.as_str())
            })
            .await?;
        info!(record_id = %record_id, "Deleted library record");
        Ok(())
    }
}

// =============================================================================
// Document mapping
// =============================================================================

fn record_to_fields(record: &VideoRecord) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    fields.insert("owner_id".to_string(), record.owner_id.to_firestore_value());
    fields.insert("job_id".to_string(), record.job_id.as_str().to_firestore_value());
    fields.insert("title".to_string(), record.title.to_firestore_value());
    fields.insert("prompt".to_string(), record.prompt.to_firestore_value());
    fields.insert("style".to_string(), record.style.as_str().to_firestore_value());
    fields.insert("duration".to_string(), record.duration.as_secs().to_firestore_value());
    fields.insert("aspect_ratio".to_string(), record.aspect_ratio.to_string().to_firestore_value());
    fields.insert("status".to_string(), record.status.as_str().to_firestore_value());
    fields.insert("progress".to_string(), record.progress.to_firestore_value());
    fields.insert("video_url".to_string(), record.video_url.to_firestore_value());
    fields.insert("error_message".to_string(), record.error_message.to_firestore_value());
    fields.insert("views".to_string(), record.views.to_firestore_value());
    fields.insert("is_public".to_string(), record.is_public.to_firestore_value());
    fields.insert("created_at".to_string(), record.created_at.to_firestore_value());
    fields.insert("updated_at".to_string(), record.updated_at.to_firestore_value());
    fields
}

/// Fields refreshed when a record is created twice; status and progress are kept.
fn metadata_fields(record: &VideoRecord) -> (HashMap<String, Value>, Vec<String>) {
    let mut all = record_to_fields(record);
    let mask: Vec<String> = [
        "owner_id",
        "title",
        "prompt",
        "style",
        "duration",
        "aspect_ratio",
        "updated_at",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    let fields = mask
        .iter()
        .filter_map(|k| all.remove(k).map(|v| (k.clone(), v)))
        .collect();
    (fields, mask)
}

fn patch_fields(patch: &RecordPatch) -> (HashMap<String, Value>, Vec<String>) {
    let mut fields = HashMap::new();

    if let Some(status) = patch.status {
        fields.insert("status".to_string(), status.as_str().to_firestore_value());
    }
    if let Some(progress) = patch.progress {
        fields.insert("progress".to_string(), progress.min(100).to_firestore_value());
    }
    if let Some(url) = &patch.video_url {
        fields.insert("video_url".to_string(), url.to_firestore_value());
    }
    if let Some(error) = &patch.error_message {
        fields.insert("error_message".to_string(), error.to_firestore_value());
    }
    fields.insert("updated_at".to_string(), Utc::now().to_firestore_value());

    let mut mask: Vec<String> = fields.keys().cloned().collect();
    mask.sort();
    (fields, mask)
}

fn document_to_record(doc: &Document, record_id: Option<&RecordId>) -> LibraryResult<VideoRecord> {
    if doc.fields.is_none() {
        return Err(LibraryError::InvalidResponse(
            "Document has no fields".to_string(),
        ));
    }

    let record_id = match record_id {
        Some(id) => id.clone(),
        None => doc
            .id()
            .map(RecordId::from)
            .ok_or_else(|| LibraryError::InvalidResponse("Document has no name".to_string()))?,
    };

    let get_string = |key: &str| doc.get::<String>(key).unwrap_or_default();

    let job_id = doc
        .get::<String>("job_id")
        .map(JobId::from)
        .unwrap_or_else(|| JobId::from(record_id.as_str()));

    Ok(VideoRecord {
        owner_id: get_string("owner_id"),
        job_id,
        title: get_string("title"),
        prompt: get_string("prompt"),
        style: get_string("style").parse::<VisualStyle>().unwrap_or_default(),
        duration: doc
            .get::<u32>("duration")
            .and_then(StoryDuration::from_secs)
            .unwrap_or_default(),
        aspect_ratio: get_string("aspect_ratio")
            .parse::<AspectRatio>()
            .unwrap_or_default(),
        status: VideoStatus::parse(&get_string("status")).unwrap_or_default(),
        progress: doc.get::<u32>("progress").unwrap_or(0).min(100) as u8,
        video_url: doc.get::<String>("video_url").filter(|u| !u.is_empty()),
        error_message: doc.get::<String>("error_message"),
        views: doc.get::<u64>("views").unwrap_or(0),
        is_public: doc.get::<bool>("is_public").unwrap_or(false),
        created_at: doc.get("created_at").unwrap_or_else(Utc::now),
        updated_at: doc.get("updated_at").unwrap_or_else(Utc::now),
        record_id,
    })
}
