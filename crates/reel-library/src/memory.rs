//! In-process video library.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use reel_models::{NewVideoRecord, RecordId, RecordPatch, VideoRecord};

use crate::error::{LibraryError, LibraryResult};
use crate::repo::VideoLibrary;

/// [`VideoLibrary`] kept in memory; contents are lost on drop.
#[derive(Default)]
pub struct MemoryVideoLibrary {
    records: RwLock<HashMap<RecordId, VideoRecord>>,
}

impl MemoryVideoLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl VideoLibrary for MemoryVideoLibrary {
    async fn create_record(&self, owner_id: &str, meta: NewVideoRecord) -> LibraryResult<RecordId> {
        let record_id = RecordId::for_job(&meta.job_id);
        let mut records = self.records.write().await;

        match records.get_mut(&record_id) {
            Some(existing) => {
                existing.owner_id = owner_id.to_string();
                existing.title = meta.title;
                existing.prompt = meta.prompt;
                existing.style = meta.style;
                existing.duration = meta.duration;
                existing.aspect_ratio = meta.aspect_ratio;
                existing.updated_at = Utc::now();
            }
            None => {
                records.insert(
                    record_id.clone(),
                    VideoRecord::new(record_id.clone(), owner_id, meta),
                );
            }
        }

        Ok(record_id)
    }

    async fn update_record(&self, record_id: &RecordId, patch: RecordPatch) -> LibraryResult<()> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(record_id)
            .ok_or_else(|| LibraryError::not_found(format!("videos/{}", record_id)))?;
        record.apply(&patch);
        Ok(())
    }

    async fn get_record(&self, record_id: &RecordId) -> LibraryResult<Option<VideoRecord>> {
        Ok(self.records.read().await.get(record_id).cloned())
    }

    async fn list_records(&self, owner_id: &str) -> LibraryResult<Vec<VideoRecord>> {
        let mut records: Vec<VideoRecord> = self
            .records
            .read()
            .await
            .values()
            .filter(|r| r.owner_id == owner_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.record_id.as_str().cmp(b.record_id.as_str()))
        });
        Ok(records)
    }

    async fn delete_record(&self, record_id: &RecordId) -> LibraryResult<()> {
        self.records.write().await.remove(record_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reel_models::{GenerationRequest, JobId, VideoStatus, VisualStyle};

    fn meta(job: &str, prompt: &str) -> NewVideoRecord {
        NewVideoRecord::from_request(JobId::from(job), &GenerationRequest::new(prompt))
    }

    #[tokio::test]
    async fn test_create_is_keyed_by_job_and_upserts() {
        let library = MemoryVideoLibrary::new();

        let first = library.create_record("user-1", meta("abc", "First prompt")).await.unwrap();
        library
            .update_record(&first, RecordPatch { progress: Some(40), ..Default::default() })
            .await
            .unwrap();

        let mut again = meta("abc", "Edited prompt");
        again.style = VisualStyle::Noir;
        let second = library.create_record("user-1", again).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.as_str(), "abc");
        assert_eq!(library.len().await, 1);

        let record = library.get_record(&first).await.unwrap().unwrap();
        assert_eq!(record.prompt, "Edited prompt");
        assert_eq!(record.style, VisualStyle::Noir);
        assert_eq!(record.progress, 40);
    }

    #[tokio::test]
    async fn test_update_missing_record_fails() {
        let library = MemoryVideoLibrary::new();
        let err = library
            .update_record(&RecordId::from("nope"), RecordPatch::cancelled())
            .await
            .unwrap_err();
        assert!(matches!(err, LibraryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_applies_patch() {
        let library = MemoryVideoLibrary::new();
        let id = library.create_record("user-1", meta("abc", "A prompt")).await.unwrap();

        library
            .update_record(&id, RecordPatch::completed(Some("https://cdn/abc.mp4".into())))
            .await
            .unwrap();

        let record = library.get_record(&id).await.unwrap().unwrap();
        assert_eq!(record.status, VideoStatus::Completed);
        assert_eq!(record.progress, 100);
        assert_eq!(record.video_url.as_deref(), Some("https://cdn/abc.mp4"));
    }

    #[tokio::test]
    async fn test_list_is_per_owner_newest_first() {
        let library = MemoryVideoLibrary::new();
        library.create_record("user-1", meta("a", "one")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        library.create_record("user-2", meta("b", "two")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        library.create_record("user-1", meta("c", "three")).await.unwrap();

        let ids: Vec<String> = library
            .list_records("user-1")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.record_id.0)
            .collect();
        assert_eq!(ids, vec!["c", "a"]);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let library = MemoryVideoLibrary::new();
        let id = library.create_record("user-1", meta("abc", "A prompt")).await.unwrap();

        library.delete_record(&id).await.unwrap();
        library.delete_record(&id).await.unwrap();
        assert!(library.get_record(&id).await.unwrap().is_none());
        assert!(library.is_empty().await);
    }
}
