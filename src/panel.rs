//! Resource panel: list, create, edit and delete one plan kind.
//!
//! A panel owns the cached list returned by the backend and at most one
//! open draft. Photo uploads run as background tasks and report back over a
//! channel; their results are merged into the draft by item key the next
//! time the caller drains completions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::client::{ApiError, ResourceClient, UploadClient, UploadFile};
use crate::editor::{EditorError, ItemKey, NestedEditor, ValidationError};
use crate::schema::{PlanResource, ResourceSchema};

/// When the cached list is refetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshPolicy {
    /// Refetch the whole list after every create, update or delete
    #[default]
    #[serde(rename = "eager")]
    EagerFullRefresh,
    /// Only refetch on an explicit `load_list`
    Manual,
}

impl fmt::Display for RefreshPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshPolicy::EagerFullRefresh => write!(f, "eager"),
            RefreshPolicy::Manual => write!(f, "manual"),
        }
    }
}

impl std::str::FromStr for RefreshPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "eager" => Ok(RefreshPolicy::EagerFullRefresh),
            "manual" => Ok(RefreshPolicy::Manual),
            other => Err(format!(
                "Invalid refresh policy '{}'. Valid values: eager, manual",
                other
            )),
        }
    }
}

/// What the editor, if open, is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelMode {
    Closed,
    Creating,
    Editing(i64),
}

/// Result of a background upload, addressed to the item it was started for.
#[derive(Debug)]
pub struct UploadCompletion {
    pub item: ItemKey,
    pub file_name: String,
    pub result: Result<String, ApiError>,
}

#[derive(Debug)]
pub enum PanelError {
    /// No draft is open
    NotOpen,
    /// The resource has no backend id and cannot be edited
    MissingId,
    /// This resource kind has no asset field
    UploadsUnsupported,
    /// The draft failed local validation; nothing was sent
    Invalid(Vec<ValidationError>),
    Editor(EditorError),
    Api(ApiError),
}

impl fmt::Display for PanelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PanelError::NotOpen => write!(f, "No form is open"),
            PanelError::MissingId => write!(f, "Resource has no id"),
            PanelError::UploadsUnsupported => write!(f, "This resource has no photo field"),
            PanelError::Invalid(errors) => {
                write!(f, "Form has {} invalid field(s)", errors.len())?;
                for e in errors {
                    write!(f, "\n  {}", e)?;
                }
                Ok(())
            }
            PanelError::Editor(e) => write!(f, "{}", e),
            PanelError::Api(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for PanelError {}

impl From<EditorError> for PanelError {
    fn from(e: EditorError) -> Self {
        PanelError::Editor(e)
    }
}

impl From<ApiError> for PanelError {
    fn from(e: ApiError) -> Self {
        PanelError::Api(e)
    }
}

pub struct ResourcePanel<R, C, U> {
    client: C,
    uploader: Arc<U>,
    user_id: i64,
    refresh: RefreshPolicy,
    items: Vec<R>,
    mode: PanelMode,
    editor: NestedEditor<R>,
    completions_tx: mpsc::UnboundedSender<UploadCompletion>,
    completions_rx: mpsc::UnboundedReceiver<UploadCompletion>,
    uploads: Vec<JoinHandle<()>>,
}

impl<R, C, U> ResourcePanel<R, C, U>
where
    R: PlanResource,
    C: ResourceClient<R>,
    U: UploadClient,
{
    pub fn new(client: C, uploader: U, user_id: i64, refresh: RefreshPolicy) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            client,
            uploader: Arc::new(uploader),
            user_id,
            refresh,
            items: Vec::new(),
            mode: PanelMode::Closed,
            editor: NestedEditor::new(),
            completions_tx,
            completions_rx,
            uploads: Vec::new(),
        }
    }

    pub fn schema(&self) -> &'static ResourceSchema {
        R::SCHEMA
    }

    /// The list as of the last successful fetch.
    pub fn items(&self) -> &[R] {
        &self.items
    }

    pub fn find(&self, id: i64) -> Option<&R> {
        self.items.iter().find(|r| r.id() == Some(id))
    }

    pub fn mode(&self) -> PanelMode {
        self.mode
    }

    pub fn is_open(&self) -> bool {
        self.mode != PanelMode::Closed
    }

    pub fn refresh_policy(&self) -> RefreshPolicy {
        self.refresh
    }

    pub fn editor(&self) -> &NestedEditor<R> {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> Result<&mut NestedEditor<R>, PanelError> {
        if !self.is_open() {
            return Err(PanelError::NotOpen);
        }
        Ok(&mut self.editor)
    }

    /// Replaces the cached list with the backend's.
    ///
    /// On failure the previous list is kept.
    pub async fn load_list(&mut self) -> Result<usize, ApiError> {
        match self.client.list_all().await {
            Ok(items) => {
                tracing::debug!("Loaded {} {}s", items.len(), R::SCHEMA.noun);
                self.items = items;
                Ok(self.items.len())
            }
            Err(e) => {
                tracing::warn!("Error fetching {}s: {}", R::SCHEMA.noun, e);
                Err(e)
            }
        }
    }

    /// Fetches one resource without touching the cached list or the draft.
    pub async fn fetch(&self, id: i64) -> Result<R, ApiError> {
        match self.client.get(id).await {
            Ok(r) if r.id().is_none() => Ok(r.with_id(id)),
            Ok(r) => Ok(r),
            Err(e) => {
                tracing::warn!("Error fetching {} #{}: {}", R::SCHEMA.noun, id, e);
                Err(e)
            }
        }
    }

    /// Opens an empty draft for a new resource.
    pub fn open_create(&mut self) {
        self.editor.reset();
        self.uploads.clear();
        self.mode = PanelMode::Creating;
    }

    /// Opens a draft seeded with a copy of `resource`.
    pub fn open_edit(&mut self, resource: &R) -> Result<(), PanelError> {
        let id = resource.id().ok_or(PanelError::MissingId)?;
        self.editor.initialize(Some(resource))?;
        self.uploads.clear();
        self.mode = PanelMode::Editing(id);
        Ok(())
    }

    /// Fetches one resource and opens it for editing.
    pub async fn open_edit_by_id(&mut self, id: i64) -> Result<(), PanelError> {
        let resource = self.fetch(id).await?;
        self.open_edit(&resource)
    }

    /// Validates the draft and sends it as a create or update.
    ///
    /// On success the draft is closed and, under the eager policy, the list
    /// is refetched. On failure the draft stays open and unchanged.
    pub async fn submit(&mut self) -> Result<R, PanelError> {
        let target = match self.mode {
            PanelMode::Closed => return Err(PanelError::NotOpen),
            PanelMode::Creating => None,
            PanelMode::Editing(id) => Some(id),
        };

        self.editor.validate().map_err(PanelError::Invalid)?;
        let payload = self.editor.to_payload()?.with_user_id(self.user_id);

        let result = match target {
            None => self.client.create(&payload).await,
            Some(id) => self.client.update(id, &payload).await,
        };

        match result {
            Ok(saved) => {
                tracing::info!(
                    "Saved {} '{}' (id {:?})",
                    R::SCHEMA.noun,
                    saved.title(),
                    saved.id().or(target)
                );
                self.close();
                self.refresh_after_mutation().await;
                Ok(saved)
            }
            Err(e) => {
                tracing::error!("Error saving {}: {}", R::SCHEMA.noun, e);
                Err(e.into())
            }
        }
    }

    /// Deletes a resource. Under the eager policy the list is refetched
    /// whether or not the delete succeeded.
    pub async fn delete(&mut self, id: i64) -> Result<(), PanelError> {
        let result = self.client.delete(id).await;
        match &result {
            Ok(()) => tracing::info!("Deleted {} #{}", R::SCHEMA.noun, id),
            Err(e) => tracing::error!("Error deleting {} #{}: {}", R::SCHEMA.noun, id, e),
        }
        self.refresh_after_mutation().await;
        result.map_err(PanelError::Api)
    }

    /// Discards the draft without contacting the backend.
    pub fn cancel(&mut self) {
        self.close();
    }

    /// Starts uploading `file` for the item at `group`/`item`.
    ///
    /// Returns immediately; the editor stays usable while the upload runs.
    pub fn begin_upload(
        &mut self,
        group: usize,
        item: usize,
        file: UploadFile,
    ) -> Result<ItemKey, PanelError> {
        if !self.is_open() {
            return Err(PanelError::NotOpen);
        }
        if R::SCHEMA.asset_field().is_none() {
            return Err(PanelError::UploadsUnsupported);
        }
        let key = self
            .editor
            .item_key(group, item)
            .ok_or(PanelError::Editor(EditorError::NoSuchItem(group, item)))?;

        tracing::info!("Uploading {} for item {}.{}", file.file_name, group, item);
        let uploader = Arc::clone(&self.uploader);
        let tx = self.completions_tx.clone();
        let handle = tokio::spawn(async move {
            let file_name = file.file_name.clone();
            let result = uploader.upload(file).await;
            let _ = tx.send(UploadCompletion {
                item: key,
                file_name,
                result,
            });
        });

        self.uploads.retain(|h| !h.is_finished());
        self.uploads.push(handle);
        Ok(key)
    }

    /// Merges every finished upload into the draft. Returns how many
    /// references were attached.
    pub fn apply_completed_uploads(&mut self) -> usize {
        let mut attached = 0;
        while let Ok(done) = self.completions_rx.try_recv() {
            match done.result {
                Ok(url) => {
                    if self.editor.attach_asset(done.item, url) {
                        tracing::info!("Attached {}", done.file_name);
                        attached += 1;
                    }
                }
                Err(e) => tracing::error!("Error uploading {}: {}", done.file_name, e),
            }
        }
        attached
    }

    /// Waits for all running uploads, then merges their results.
    pub async fn settle_uploads(&mut self) -> usize {
        let running = std::mem::take(&mut self.uploads);
        for joined in futures::future::join_all(running).await {
            if let Err(e) = joined {
                tracing::warn!("Upload task failed: {}", e);
            }
        }
        self.apply_completed_uploads()
    }

    /// Like [`settle_uploads`](Self::settle_uploads), but gives up after
    /// `limit`. Uploads still running keep going and are merged by a later
    /// call if their item is still in the draft.
    pub async fn settle_uploads_within(&mut self, limit: Duration) -> usize {
        let running = futures::future::join_all(self.uploads.iter_mut());
        if tokio::time::timeout(limit, running).await.is_err() {
            tracing::warn!(
                "{} upload(s) still running after {:?}",
                self.pending_uploads(),
                limit
            );
        }
        self.uploads.retain(|h| !h.is_finished());
        self.apply_completed_uploads()
    }

    pub fn pending_uploads(&self) -> usize {
        self.uploads.iter().filter(|h| !h.is_finished()).count()
    }

    fn close(&mut self) {
        self.mode = PanelMode::Closed;
        self.editor.reset();
        // dropped handles detach; their results match no item in a new draft
        self.uploads.clear();
    }

    async fn refresh_after_mutation(&mut self) {
        if self.refresh == RefreshPolicy::EagerFullRefresh {
            // failures are logged by load_list
            let _ = self.load_list().await;
        }
    }
}
