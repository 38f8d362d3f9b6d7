//! The page organizer session
//!
//! [`Organizer`] owns the page model for one loaded document at a time. Loading
//! runs the preparation pipeline; mutations and commits are synchronous. All
//! session state sits behind one mutex that is never held across an `.await`.

use crate::codec::DocumentCodec;
use crate::commit::{self, CommitStep};
use crate::config::{EditMode, OrganizerConfig};
use crate::model::{
    EntryId, MoveDirection, Mutation, PageEntry, PageModel, RotationDirection, SelectionMap,
};
use crate::notify::{Notifier, NotifyLevel, TracingNotifier};
use crate::pipeline::{self, LoadOutcome, PreparationState};
use crate::rasterizer::PageRasterizer;
use crate::source::{DocumentId, SourceDocument};
use crate::{OrganizerError, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Everything an observer needs to draw the editor
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub state: PreparationState,
    pub model: Option<PageModel>,
    pub selection: SelectionMap,
}

#[derive(Default)]
struct Session {
    active: Option<SourceDocument>,
    state: PreparationState,
    model: Option<PageModel>,
    selection: SelectionMap,
    run: Option<u64>,
}

impl Session {
    /// Whether preparation run `run` of `id` still owns the session
    fn owns(&self, id: &DocumentId, run: u64) -> bool {
        matches!(&self.state, PreparationState::InProgress(running) if running == id)
            && self.run == Some(run)
    }

    fn fail(&mut self, id: DocumentId) {
        self.active = None;
        self.model = None;
        self.selection = SelectionMap::default();
        self.state = PreparationState::Failed(id);
        self.run = None;
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state.clone(),
            model: self.model.clone(),
            selection: self.selection.clone(),
        }
    }
}

struct Shared<C, R> {
    codec: C,
    rasterizer: R,
    notifier: Arc<dyn Notifier>,
    config: OrganizerConfig,
    session: Mutex<Session>,
    next_entry_id: AtomicU64,
    next_run: AtomicU64,
    snapshots: watch::Sender<Snapshot>,
}

/// Marks a preparation as failed if it is dropped while still owning the session
///
/// Covers aborted tasks, dropped futures and panicking rasterizers.
struct PreparationGuard<'a> {
    session: &'a Mutex<Session>,
    snapshots: &'a watch::Sender<Snapshot>,
    id: DocumentId,
    run: u64,
}

impl Drop for PreparationGuard<'_> {
    fn drop(&mut self) {
        let mut session = self.session.lock();
        if !session.owns(&self.id, self.run) {
            return;
        }
        warn!(document = %self.id, run = self.run, "preparation abandoned before completion");
        session.fail(self.id.clone());
        self.snapshots.send_replace(session.snapshot());
    }
}

/// Page organize/extract engine
///
/// Cheap to clone; clones share the same session.
///
/// # Example
///
/// ```ignore
/// use organizer::{LopdfCodec, Organizer, OrganizerConfig, PageFrameRasterizer, SourceDocument};
///
/// let organizer = Organizer::new(LopdfCodec::new(), PageFrameRasterizer::default(), OrganizerConfig::default())?;
/// organizer.load_document(Some(SourceDocument::from_path("input.pdf")?)).await?;
///
/// let model = organizer.page_model().unwrap();
/// let last = model.entries().last().unwrap().id();
/// organizer.move_entry(last, MoveDirection::Up)?;
///
/// let bytes = organizer.commit_organize()?;
/// ```
pub struct Organizer<C, R> {
    shared: Arc<Shared<C, R>>,
}

impl<C, R> Clone for Organizer<C, R> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<C, R> Organizer<C, R>
where
    C: DocumentCodec + 'static,
    R: PageRasterizer + 'static,
{
    /// Create an engine that reports through the `tracing` log
    pub fn new(codec: C, rasterizer: R, config: OrganizerConfig) -> Result<Self> {
        Self::with_notifier(codec, rasterizer, config, Arc::new(TracingNotifier))
    }

    /// Create an engine with a custom notification sink
    pub fn with_notifier(
        codec: C,
        rasterizer: R,
        config: OrganizerConfig,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        config.validate()?;
        let (snapshots, _) = watch::channel(Snapshot::default());

        Ok(Self {
            shared: Arc::new(Shared {
                codec,
                rasterizer,
                notifier,
                config,
                session: Mutex::new(Session::default()),
                next_entry_id: AtomicU64::new(1),
                next_run: AtomicU64::new(1),
                snapshots,
            }),
        })
    }

    pub fn config(&self) -> &OrganizerConfig {
        &self.shared.config
    }

    pub fn mode(&self) -> EditMode {
        self.shared.config.mode
    }

    /// Copy of the current page model, if one is published
    pub fn page_model(&self) -> Option<PageModel> {
        self.shared.session.lock().model.clone()
    }

    pub fn selection(&self) -> SelectionMap {
        self.shared.session.lock().selection.clone()
    }

    pub fn preparation_state(&self) -> PreparationState {
        self.shared.session.lock().state.clone()
    }

    /// Identity of the document currently loaded or being loaded
    pub fn active_document(&self) -> Option<DocumentId> {
        self.shared
            .session
            .lock()
            .active
            .as_ref()
            .map(|source| source.id().clone())
    }

    pub fn snapshot(&self) -> Snapshot {
        self.shared.session.lock().snapshot()
    }

    /// Receive a new [`Snapshot`] after every state change
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.shared.snapshots.subscribe()
    }

    /// Load a document, or clear the session when `source` is `None`
    ///
    /// Builds the page model and renders thumbnails. Calling this again with a
    /// document that is being prepared or already prepared does nothing. A
    /// different document supersedes the current one; a preparation that was
    /// superseded drops its results instead of publishing them.
    pub async fn load_document(&self, source: Option<SourceDocument>) -> Result<LoadOutcome> {
        let Some(source) = source else {
            self.clear();
            return Ok(LoadOutcome::Cleared);
        };
        let id = source.id().clone();

        let run = {
            let mut session = self.shared.session.lock();
            match &session.state {
                PreparationState::InProgress(running) if *running == id => {
                    debug!(document = %id, "preparation already running");
                    return Ok(LoadOutcome::AlreadyInProgress);
                }
                PreparationState::Done(done) if *done == id => {
                    debug!(document = %id, "document already prepared");
                    return Ok(LoadOutcome::AlreadyPrepared);
                }
                _ => {}
            }

            let run = self.shared.next_run.fetch_add(1, Ordering::Relaxed);
            session.active = Some(source.clone());
            session.state = PreparationState::InProgress(id.clone());
            session.model = None;
            session.selection = SelectionMap::default();
            session.run = Some(run);
            self.publish(&session);
            run
        };

        let _guard = PreparationGuard {
            session: &self.shared.session,
            snapshots: &self.shared.snapshots,
            id: id.clone(),
            run,
        };

        info!(document = %id, name = source.name(), run, "preparing document");

        let model = match self.prepare(&source, run).await {
            Ok(Some(model)) => model,
            Ok(None) => return Ok(LoadOutcome::Superseded),
            Err(reason) => return self.fail_preparation(&source, run, reason),
        };

        let outcome = LoadOutcome::Prepared {
            pages: model.len(),
            thumbnails: model.thumbnail_count(),
        };

        {
            let mut session = self.shared.session.lock();
            if !session.owns(&id, run) {
                debug!(document = %id, run, "dropping stale preparation result");
                return Ok(LoadOutcome::Superseded);
            }

            session.selection = match self.mode() {
                EditMode::Extract => SelectionMap::new(model.len()),
                EditMode::Organize => SelectionMap::default(),
            };
            session.model = Some(model);
            session.state = PreparationState::Done(id.clone());
            self.publish(&session);
        }

        info!(document = %id, ?outcome, "document ready");
        Ok(outcome)
    }

    /// Run [`Organizer::load_document`] as a background task
    pub fn spawn_load(&self, source: Option<SourceDocument>) -> JoinHandle<Result<LoadOutcome>> {
        let organizer = self.clone();
        tokio::spawn(async move { organizer.load_document(source).await })
    }

    /// Turn one page a quarter turn
    pub fn rotate(&self, id: EntryId, direction: RotationDirection) -> Result<bool> {
        self.apply(Mutation::Rotate { id, direction })
    }

    /// Turn every page a quarter turn
    pub fn rotate_all(&self, direction: RotationDirection) -> Result<bool> {
        self.apply(Mutation::RotateAll { direction })
    }

    /// Remove a page; refused when it is the last one
    pub fn delete(&self, id: EntryId) -> Result<bool> {
        self.apply(Mutation::Delete { id })
    }

    /// Swap a page with its neighbor
    pub fn move_entry(&self, id: EntryId, direction: MoveDirection) -> Result<bool> {
        self.apply(Mutation::Move { id, direction })
    }

    /// Undo reordering and rotation
    pub fn reset(&self) -> Result<bool> {
        self.apply(Mutation::Reset)
    }

    /// Apply one edit to the page model
    ///
    /// Returns whether the model changed. Without a published model every edit
    /// is a no-op.
    pub fn apply(&self, mutation: Mutation) -> Result<bool> {
        let result = {
            let mut session = self.shared.session.lock();
            let Some(model) = session.model.as_mut() else {
                return Ok(false);
            };
            let result = model.apply(&mutation);
            if matches!(result, Ok(true)) {
                self.publish(&session);
            }
            result
        };

        match &result {
            Ok(changed) => debug!(op = mutation.name(), changed, "mutation applied"),
            Err(e) => self.warn(e),
        }
        result
    }

    /// Flip the selection of one original page (extract mode)
    pub fn toggle_selection(&self, original_index: usize) -> Result<bool> {
        self.select_with("toggle_selection", |selection| {
            selection.toggle(original_index)
        })
    }

    /// Select every page (extract mode)
    pub fn select_all(&self) -> Result<bool> {
        self.select_with("select_all", SelectionMap::select_all)
    }

    /// Deselect every page (extract mode)
    pub fn clear_selection(&self) -> Result<bool> {
        self.select_with("clear_selection", SelectionMap::clear)
    }

    /// Write every page in display order, with its rotation
    pub fn commit_organize(&self) -> Result<Vec<u8>> {
        self.ensure_mode("commit_organize", EditMode::Organize)?;

        let (source, plan) = {
            let session = self.shared.session.lock();
            let (source, model) = Self::committable(&session)?;
            (source, commit::organize_plan(model))
        };

        if plan.is_empty() {
            let err = OrganizerError::EmptyModel;
            self.warn(&err);
            return Err(err);
        }

        self.run_commit("organize", &source, &plan)
    }

    /// Write the selected pages in original order
    pub fn commit_extract(&self) -> Result<Vec<u8>> {
        self.ensure_mode("commit_extract", EditMode::Extract)?;

        let (source, plan) = {
            let session = self.shared.session.lock();
            let (source, _) = Self::committable(&session)?;
            (source, commit::extract_plan(&session.selection))
        };

        if plan.is_empty() {
            let err = OrganizerError::EmptySelection;
            self.warn(&err);
            return Err(err);
        }

        self.run_commit("extract", &source, &plan)
    }

    /// Build the model for `source`; `Ok(None)` when superseded mid-way
    async fn prepare(
        &self,
        source: &SourceDocument,
        run: u64,
    ) -> std::result::Result<Option<PageModel>, String> {
        let shared = &self.shared;
        let id = source.id().clone();

        shared
            .rasterizer
            .ready()
            .await
            .map_err(|e| e.to_string())?;

        // First parse of the document; can be slow for large inputs
        let counting = Arc::clone(shared);
        let counted = source.clone();
        let total_pages = tokio::task::spawn_blocking(move || counting.codec.page_count(&counted))
            .await
            .map_err(|e| e.to_string())?
            .map_err(|e| e.to_string())?;
        if total_pages == 0 {
            return Err("document contains no pages".to_string());
        }

        let render_count = shared.config.pages_to_render(total_pages);
        debug!(document = %id, total_pages, render_count, "rendering thumbnails");

        let Some(mut thumbnails) = pipeline::rasterize_pages(
            &shared.rasterizer,
            source,
            render_count,
            &shared.config,
            || self.is_preparing(&id, run),
        )
        .await
        else {
            return Ok(None);
        };

        // Pages past the preview cap stay in the model, just without thumbnails
        thumbnails.resize(total_pages, None);

        let entries = thumbnails
            .into_iter()
            .enumerate()
            .map(|(index, thumbnail)| {
                PageEntry::new(self.next_entry_id(), index).with_thumbnail(thumbnail)
            })
            .collect();

        Ok(Some(PageModel::new(id, entries)))
    }

    fn fail_preparation(
        &self,
        source: &SourceDocument,
        run: u64,
        reason: String,
    ) -> Result<LoadOutcome> {
        let id = source.id().clone();
        {
            let mut session = self.shared.session.lock();
            if !session.owns(&id, run) {
                return Ok(LoadOutcome::Superseded);
            }
            session.fail(id.clone());
            self.publish(&session);
        }

        let err = OrganizerError::Load {
            name: source.name().to_string(),
            document: id,
            reason,
        };
        self.shared
            .notifier
            .notify(NotifyLevel::Error, &err.to_string());
        Err(err)
    }

    fn clear(&self) {
        let mut session = self.shared.session.lock();
        *session = Session::default();
        self.publish(&session);
        debug!("session cleared");
    }

    fn is_preparing(&self, id: &DocumentId, run: u64) -> bool {
        self.shared.session.lock().owns(id, run)
    }

    fn next_entry_id(&self) -> EntryId {
        EntryId::new(self.shared.next_entry_id.fetch_add(1, Ordering::Relaxed))
    }

    fn publish(&self, session: &Session) {
        self.shared.snapshots.send_replace(session.snapshot());
    }

    fn warn(&self, err: &OrganizerError) {
        self.shared
            .notifier
            .notify(NotifyLevel::Warning, &err.to_string());
    }

    fn ensure_mode(&self, operation: &'static str, required: EditMode) -> Result<()> {
        let mode = self.mode();
        if mode != required {
            return Err(OrganizerError::WrongMode { operation, mode });
        }
        Ok(())
    }

    fn select_with<F>(&self, operation: &'static str, edit: F) -> Result<bool>
    where
        F: FnOnce(&mut SelectionMap) -> bool,
    {
        self.ensure_mode(operation, EditMode::Extract)?;

        let mut session = self.shared.session.lock();
        if session.model.is_none() {
            return Ok(false);
        }
        let changed = edit(&mut session.selection);
        if changed {
            self.publish(&session);
        }
        Ok(changed)
    }

    /// Source and model, provided preparation has finished
    fn committable(session: &Session) -> Result<(SourceDocument, &PageModel)> {
        match (&session.state, &session.active, &session.model) {
            (PreparationState::InProgress(id), _, _) => Err(OrganizerError::NotReady(id.clone())),
            (PreparationState::Done(_), Some(source), Some(model)) => Ok((source.clone(), model)),
            _ => Err(OrganizerError::NoDocument),
        }
    }

    fn run_commit(
        &self,
        operation: &'static str,
        source: &SourceDocument,
        plan: &[CommitStep],
    ) -> Result<Vec<u8>> {
        match commit::replay(&self.shared.codec, source, plan) {
            Ok(bytes) => {
                info!(
                    document = %source.id(),
                    operation,
                    pages = plan.len(),
                    bytes = bytes.len(),
                    "commit complete"
                );
                Ok(bytes)
            }
            Err(e) => {
                let err = OrganizerError::Commit {
                    operation,
                    document: source.id().clone(),
                    source: e,
                };
                self.shared
                    .notifier
                    .notify(NotifyLevel::Error, &err.to_string());
                Err(err)
            }
        }
    }
}
