//! snapseek engine – the orchestrator for ingest, query and maintenance.
//!
//! The [`SnapEngine`] owns the model capabilities, the composite index, the
//! scorer, the blender and the image directory. It is the only type the CLI
//! talks to.

use std::fs;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use rayon::prelude::*;
use snapseek_db::metadata::NewEntry;
use tracing::{debug, info, warn};

use crate::assets::AssetStore;
use crate::blender::VectorBlender;
use crate::capabilities::Capabilities;
use crate::config::GlobalConfig;
use crate::constants::{is_allowed_image_extension, DEFAULT_TOP_K};
use crate::errors::{SnapError, SnapResult};
use crate::index_manager::IndexManager;
use crate::model_adapter::from_model_error;
use crate::rebuild::rebuild_index;
use crate::scorer::RelevanceScorer;
use crate::types::{
    effective_caption, non_blank, Entry, FolderIngestReport, HealthReport, IngestResult,
    IngestSkip, RebuildReport, ScoredResult,
};

/// Progress of a multi-file ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestProgress {
    /// Files handled so far (ingested or skipped).
    pub done: usize,
    pub total: usize,
}

/// An image that has been embedded and written to the asset directory but
/// not yet added to the index.
struct PreparedImage {
    entry: NewEntry,
    vector: Vec<f32>,
    stored_path: PathBuf,
}

// ============================================================================
// SnapEngine
// ============================================================================

/// The main engine for snapseek operations.
///
/// # Construction
///
/// Use [`SnapEngine::from_global_config`] for typical usage, or
/// [`SnapEngine::new`] with hand-built [`Capabilities`] for testing.
///
/// # Example
///
/// ```ignore
/// use snapseek_core::{GlobalConfig, SnapEngine};
///
/// let engine = SnapEngine::from_global_config(GlobalConfig::load_default()?)?;
/// engine.ingest("beach.jpg", &std::fs::read("beach.jpg")?, Some("our dog at the beach"))?;
/// for hit in engine.query("dog on sand", 5)? {
///     println!("{} {:.3}", hit.stored_path, hit.combined_score);
/// }
/// ```
#[derive(Debug)]
pub struct SnapEngine {
    config: GlobalConfig,
    capabilities: Capabilities,
    index: IndexManager,
    scorer: RelevanceScorer,
    blender: VectorBlender,
    assets: AssetStore,
}

impl SnapEngine {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Create an engine from a configuration and ready-made capabilities.
    ///
    /// # Errors
    ///
    /// - [`SnapError::Configuration`] for invalid settings, a capability
    ///   dimension that differs from `index.dimension`, or an index of
    ///   another dimension
    /// - [`SnapError::Alignment`] if the stores on disk disagree
    pub fn new(config: GlobalConfig, capabilities: Capabilities) -> SnapResult<Self> {
        for warning in config.validate()? {
            warn!("Config warning: {}", warning);
        }

        let dimension = config.index.dimension;
        if capabilities.dimension() != dimension {
            return Err(SnapError::configuration(
                format!(
                    "embedders produce {} dimensions but index.dimension is {}",
                    capabilities.dimension(),
                    dimension
                ),
                "Set index.dimension to match the embedding model",
            ));
        }

        let data_dir = config.resolved_data_dir();
        let index = IndexManager::open(&data_dir, &config.index)?;
        let blender = VectorBlender::new(config.blend.primary_weight, dimension)?;
        let scorer = RelevanceScorer::new(config.scoring);
        let assets = AssetStore::new(config.images_dir());

        info!("Engine ready at {}", data_dir.display());
        Ok(Self {
            config,
            capabilities,
            index,
            scorer,
            blender,
            assets,
        })
    }

    /// Create an engine, loading the models named in the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the models cannot be loaded or the index cannot be opened.
    pub fn from_global_config(config: GlobalConfig) -> anyhow::Result<Self> {
        let capabilities = Capabilities::from_config(&config)?;
        Ok(Self::new(config, capabilities)?)
    }

    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    pub fn index(&self) -> &IndexManager {
        &self.index
    }

    // -------------------------------------------------------------------------
    // Ingest
    // -------------------------------------------------------------------------

    /// Ingest one image.
    ///
    /// `name_hint` is the original file name; only its extension is kept.
    /// A failed automatic caption is logged and ignored.
    ///
    /// # Errors
    ///
    /// Returns [`SnapError::Validation`] for empty or undecodable bytes.
    pub fn ingest(
        &self,
        name_hint: &str,
        bytes: &[u8],
        user_description: Option<&str>,
    ) -> SnapResult<IngestResult> {
        let prepared = self.prepare(name_hint, bytes, user_description)?;
        let mut results = self.commit(vec![prepared])?;
        results
            .pop()
            .ok_or_else(|| SnapError::internal("ingest produced no result"))
    }

    /// Ingest an image file from disk.
    pub fn ingest_file(&self, path: &Path, user_description: Option<&str>) -> SnapResult<IngestResult> {
        let bytes = fs::read(path).map_err(|e| SnapError::storage(path, e.to_string()))?;
        self.ingest(&path.to_string_lossy(), &bytes, user_description)
    }

    /// Ingest every image under `dir`, in sorted path order.
    pub fn ingest_folder(
        &self,
        dir: &Path,
        user_description: Option<&str>,
    ) -> SnapResult<FolderIngestReport> {
        let files = collect_image_files(dir)?;
        self.ingest_files(&files, user_description, |_| {})
    }

    /// Ingest `files` in batches of `ingest.batchSize`.
    ///
    /// Files that cannot be read or decoded are skipped with a warning. Each
    /// batch is one index append; a storage failure aborts the whole run.
    pub fn ingest_files<F>(
        &self,
        files: &[PathBuf],
        user_description: Option<&str>,
        mut on_progress: F,
    ) -> SnapResult<FolderIngestReport>
    where
        F: FnMut(IngestProgress),
    {
        let mut report = FolderIngestReport {
            discovered: files.len(),
            ..Default::default()
        };
        let total = files.len();
        let batch_size = self.config.ingest.batch_size.max(1);

        for chunk in files.chunks(batch_size) {
            let contents = self.read_batch(chunk);

            let mut prepared = Vec::with_capacity(chunk.len());
            for (path, bytes) in chunk.iter().zip(contents) {
                let outcome = bytes
                    .map_err(|e| SnapError::storage(path, e.to_string()))
                    .and_then(|bytes| self.prepare(&path.to_string_lossy(), &bytes, user_description));

                match outcome {
                    Ok(image) => prepared.push(image),
                    Err(e) => {
                        warn!("Skipping {}: {}", path.display(), e);
                        report.skipped.push(IngestSkip {
                            path: path.clone(),
                            reason: e.to_string(),
                        });
                    }
                }
            }

            report.ingested.extend(self.commit(prepared)?);
            on_progress(IngestProgress {
                done: report.ingested.len() + report.skipped.len(),
                total,
            });
        }

        info!(
            "Ingested {} of {} images ({} skipped)",
            report.ingested.len(),
            report.discovered,
            report.skipped.len()
        );
        Ok(report)
    }

    fn read_batch(&self, paths: &[PathBuf]) -> Vec<std::io::Result<Vec<u8>>> {
        if self.config.ingest.parallel_file_reading {
            paths.par_iter().map(fs::read).collect()
        } else {
            paths.iter().map(fs::read).collect()
        }
    }

    /// Embed, caption, blend and store the file. Nothing touches the index yet.
    fn prepare(
        &self,
        name_hint: &str,
        bytes: &[u8],
        user_description: Option<&str>,
    ) -> SnapResult<PreparedImage> {
        if bytes.is_empty() {
            return Err(SnapError::validation("image is empty"));
        }

        let image_vector = self
            .capabilities
            .image
            .embed_image(bytes)
            .map_err(from_model_error)?;

        let auto_caption = self.auto_caption(name_hint, bytes);
        let user_caption = non_blank(user_description).map(String::from);

        let mut texts: Vec<(&str, f32)> = Vec::new();
        if self.config.blend.blend_user_caption {
            if let Some(caption) = user_caption.as_deref() {
                texts.push((caption, self.config.scoring.user_caption_weight));
            }
        }
        if self.config.blend.blend_auto_caption {
            if let Some(caption) = auto_caption.as_deref() {
                texts.push((caption, self.config.scoring.auto_caption_weight));
            }
        }
        let vector = self
            .blender
            .blend(&image_vector, &texts, self.capabilities.text.as_ref())?;

        let asset = self.assets.save(name_hint, bytes)?;
        let entry = NewEntry::new(&asset.external_id, asset.path.to_string_lossy())
            .with_auto_caption(auto_caption)
            .with_user_caption(user_caption);

        Ok(PreparedImage {
            entry,
            vector,
            stored_path: asset.path,
        })
    }

    fn auto_caption(&self, name_hint: &str, bytes: &[u8]) -> Option<String> {
        let captioner = self.capabilities.captioner.as_ref()?;
        match captioner.caption(bytes) {
            Ok(caption) => non_blank(Some(caption.as_str())).map(String::from),
            Err(e) => {
                warn!("Caption failed for {}: {}", name_hint, e);
                None
            }
        }
    }

    /// Add prepared images to the index; on failure remove their files.
    fn commit(&self, prepared: Vec<PreparedImage>) -> SnapResult<Vec<IngestResult>> {
        if prepared.is_empty() {
            return Ok(vec![]);
        }

        let mut stored_paths = Vec::with_capacity(prepared.len());
        let mut items = Vec::with_capacity(prepared.len());
        for image in prepared {
            stored_paths.push(image.stored_path);
            items.push((image.entry, image.vector));
        }
        let entries: Vec<NewEntry> = items.iter().map(|(entry, _)| entry.clone()).collect();

        let rows = match self.index.add_batch(items) {
            Ok(rows) => rows,
            Err(e) => {
                for path in &stored_paths {
                    if let Err(cleanup) = self.assets.remove(path) {
                        warn!("Could not remove {}: {}", path.display(), cleanup);
                    }
                }
                return Err(e);
            }
        };

        Ok(entries
            .into_iter()
            .zip(rows)
            .map(|(entry, row_index)| {
                let effective_caption = non_blank(entry.user_caption.as_deref())
                    .or_else(|| non_blank(entry.auto_caption.as_deref()))
                    .map(String::from);
                debug!("Ingested {} at row {}", entry.external_id, row_index);
                IngestResult {
                    external_id: entry.external_id,
                    stored_path: entry.stored_path,
                    row_index,
                    effective_caption,
                }
            })
            .collect())
    }

    // -------------------------------------------------------------------------
    // Query
    // -------------------------------------------------------------------------

    /// Ranked results for a text prompt. `top_k <= 0` means the default (5).
    ///
    /// # Errors
    ///
    /// Returns [`SnapError::Validation`] for a blank prompt.
    pub fn query(&self, text: &str, top_k: i64) -> SnapResult<Vec<ScoredResult>> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SnapError::validation("query text is empty"));
        }
        let top_k = if top_k <= 0 {
            DEFAULT_TOP_K
        } else {
            top_k as usize
        };

        let query_embedding = self
            .capabilities
            .text
            .embed_text(text)
            .map_err(from_model_error)?;

        // Inactive rows are still in the index; search past them.
        let candidates = self.index.search_for_active(&query_embedding, top_k)?;

        self.scorer.rank(
            text,
            &query_embedding,
            candidates,
            self.capabilities.text.as_ref(),
            top_k,
        )
    }

    /// The effective caption of the best match, if it clears the score floor.
    pub fn describe_best_match(&self, text: &str) -> SnapResult<Option<String>> {
        let best = self.query(text, 1)?.into_iter().next();
        Ok(best
            .filter(|r| self.scorer.clears_floor(r.combined_score))
            .and_then(|r| r.effective_caption))
    }

    // -------------------------------------------------------------------------
    // Entries
    // -------------------------------------------------------------------------

    pub fn list(&self, include_inactive: bool) -> SnapResult<Vec<Entry>> {
        self.index.list(include_inactive)
    }

    /// Look up one entry.
    ///
    /// # Errors
    ///
    /// Returns [`SnapError::NotFound`] for an unknown id.
    pub fn get(&self, external_id: &str) -> SnapResult<Entry> {
        self.index
            .get(external_id)?
            .ok_or_else(|| SnapError::NotFound(external_id.to_string()))
    }

    /// Set or clear (`None` or blank) the user caption.
    pub fn set_description(&self, external_id: &str, text: Option<&str>) -> SnapResult<()> {
        self.index.set_user_caption(external_id, non_blank(text))
    }

    /// Soft-delete (`false`) or restore (`true`) an entry.
    pub fn set_active(&self, external_id: &str, active: bool) -> SnapResult<()> {
        self.index.set_active(external_id, active)
    }

    /// Caption currently used for an entry.
    pub fn effective_caption(&self, external_id: &str) -> SnapResult<Option<String>> {
        let entry = self.get(external_id)?;
        Ok(effective_caption(&entry).map(String::from))
    }

    // -------------------------------------------------------------------------
    // Maintenance
    // -------------------------------------------------------------------------

    pub fn health_check(&self) -> SnapResult<HealthReport> {
        self.index.health()
    }

    /// Drop soft-deleted entries and renumber rows. See [`crate::rebuild`].
    pub fn rebuild(&self) -> SnapResult<RebuildReport> {
        rebuild_index(&self.index)
    }
}

// ============================================================================
// File discovery
// ============================================================================

/// Image files under `dir` (allowed extensions only), sorted by path.
///
/// Hidden files and `.gitignore`d paths are skipped. Unreadable directories
/// are logged and skipped.
pub fn collect_image_files(dir: &Path) -> SnapResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(SnapError::validation(format!(
            "{} is not a directory",
            dir.display()
        )));
    }

    let walker = WalkBuilder::new(dir)
        .hidden(true)
        .git_ignore(true)
        .git_exclude(true)
        .follow_links(false)
        .build();

    let mut files = Vec::new();
    for result in walker {
        let entry = match result {
            Ok(e) => e,
            Err(e) => {
                warn!("Skipping unreadable path: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }

        let path = entry.path();
        let allowed = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(is_allowed_image_extension);
        if allowed {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    debug!("Found {} image files under {:?}", files.len(), dir);
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::testing::{FixedCaptioner, KeywordEmbedder};
    use crate::types::RowIndex;
    use snapseek_model::Captioner;
    use tempfile::TempDir;

    const VOCAB: &[&str] = &["cat", "dog", "car", "beach", "red", "snow"];

    fn config(dir: &TempDir) -> GlobalConfig {
        let mut config = GlobalConfig::default().with_data_dir(dir.path().join("data"));
        config.index.dimension = VOCAB.len() + 1;
        config
    }

    fn capabilities(captioner: Option<Arc<dyn Captioner>>) -> Capabilities {
        let caps = Capabilities::new(
            Arc::new(KeywordEmbedder::new(VOCAB)),
            Arc::new(KeywordEmbedder::new(VOCAB)),
        )
        .unwrap();
        match captioner {
            Some(c) => caps.with_captioner(c),
            None => caps,
        }
    }

    fn engine(dir: &TempDir) -> SnapEngine {
        SnapEngine::new(config(dir), capabilities(None)).unwrap()
    }

    fn image_count(engine: &SnapEngine) -> usize {
        fs::read_dir(engine.config().images_dir())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    #[test]
    fn test_ingest_stores_file_and_entry() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);

        let result = engine.ingest("Photo.PNG", b"red car", Some("my red car")).unwrap();
        assert_eq!(result.row_index, RowIndex::new(0));
        assert!(result.stored_path.ends_with(".png"));
        assert!(Path::new(&result.stored_path).exists());
        assert_eq!(result.effective_caption.as_deref(), Some("my red car"));

        let entry = engine.get(&result.external_id).unwrap();
        assert_eq!(entry.user_caption.as_deref(), Some("my red car"));
        assert!(entry.active);
    }

    #[test]
    fn test_ingest_rejects_empty_and_undecodable() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);

        assert!(matches!(
            engine.ingest("a.jpg", b"", None),
            Err(SnapError::Validation(_))
        ));
        assert!(matches!(
            engine.ingest("a.jpg", &[0xff, 0xfe, 0xfd], None),
            Err(SnapError::Validation(_))
        ));
        assert_eq!(engine.health_check().unwrap().entries, 0);
        assert_eq!(image_count(&engine), 0);
    }

    #[test]
    fn test_query_keeps_confident_matches_only() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        engine.ingest("a.jpg", b"red car", None).unwrap();
        let dog = engine.ingest("b.jpg", b"dog", None).unwrap();
        engine.ingest("c.jpg", b"cat", None).unwrap();

        let results = engine.query("dog", 5).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].external_id, dog.external_id);
        assert!((results[0].combined_score - 1.0).abs() < 1e-5);
        assert!(!results[0].low_confidence);
    }

    #[test]
    fn test_query_falls_back_to_best_candidate() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        let first = engine.ingest("a.jpg", b"red car", None).unwrap();
        engine.ingest("b.jpg", b"dog", None).unwrap();

        let results = engine.query("snow", 0).unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].low_confidence);
        assert_eq!(results[0].external_id, first.external_id);
    }

    #[test]
    fn test_query_rejects_blank_text() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        assert!(matches!(engine.query("   ", 5), Err(SnapError::Validation(_))));
    }

    #[test]
    fn test_query_on_empty_index() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        assert!(engine.query("dog", 5).unwrap().is_empty());
        assert_eq!(engine.describe_best_match("dog").unwrap(), None);
    }

    #[test]
    fn test_deactivated_entry_is_hidden_and_rows_continue() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        engine.ingest("a.jpg", b"red car", None).unwrap();
        let dog = engine.ingest("b.jpg", b"dog", None).unwrap();
        engine.ingest("c.jpg", b"cat", None).unwrap();

        engine.set_active(&dog.external_id, false).unwrap();
        let results = engine.query("dog", 5).unwrap();
        assert_eq!(results.len(), 1);
        assert_ne!(results[0].external_id, dog.external_id);
        assert!(results[0].low_confidence);

        let again = engine.ingest("d.jpg", b"dog", None).unwrap();
        assert_eq!(again.row_index, RowIndex::new(3));
        let results = engine.query("dog", 5).unwrap();
        assert_eq!(results[0].external_id, again.external_id);

        engine.set_active(&dog.external_id, true).unwrap();
        assert_eq!(engine.query("dog", 5).unwrap().len(), 2);
    }

    #[test]
    fn test_describe_best_match() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        engine.ingest("a.jpg", b"dog", Some("our dog rex")).unwrap();
        engine.ingest("b.jpg", b"red car", None).unwrap();

        assert_eq!(
            engine.describe_best_match("dog").unwrap().as_deref(),
            Some("our dog rex")
        );
        // Best candidate is only a low-confidence fallback below the floor
        assert_eq!(engine.describe_best_match("snow").unwrap(), None);
    }

    #[test]
    fn test_set_description_and_clear() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        let result = engine.ingest("a.jpg", b"cat", None).unwrap();

        engine.set_description(&result.external_id, Some("sleepy cat")).unwrap();
        assert_eq!(
            engine.effective_caption(&result.external_id).unwrap().as_deref(),
            Some("sleepy cat")
        );

        engine.set_description(&result.external_id, Some("   ")).unwrap();
        assert_eq!(engine.effective_caption(&result.external_id).unwrap(), None);

        assert!(matches!(
            engine.set_description("missing", Some("x")),
            Err(SnapError::NotFound(_))
        ));
        assert!(matches!(engine.get("missing"), Err(SnapError::NotFound(_))));
    }

    #[test]
    fn test_auto_caption_is_stored() {
        let dir = TempDir::new().unwrap();
        let captioner: Arc<dyn Captioner> =
            Arc::new(FixedCaptioner(Some("a cat on a beach".into())));
        let engine = SnapEngine::new(config(&dir), capabilities(Some(captioner))).unwrap();

        let result = engine.ingest("a.jpg", b"cat", None).unwrap();
        assert_eq!(result.effective_caption.as_deref(), Some("a cat on a beach"));
        let entry = engine.get(&result.external_id).unwrap();
        assert_eq!(entry.auto_caption.as_deref(), Some("a cat on a beach"));
        assert_eq!(entry.user_caption, None);
    }

    #[test]
    fn test_caption_failure_does_not_stop_ingest() {
        let dir = TempDir::new().unwrap();
        let captioner: Arc<dyn Captioner> = Arc::new(FixedCaptioner(None));
        let engine = SnapEngine::new(config(&dir), capabilities(Some(captioner))).unwrap();

        let result = engine.ingest("a.jpg", b"cat", None).unwrap();
        assert_eq!(result.effective_caption, None);
        assert_eq!(engine.health_check().unwrap().entries, 1);
    }

    #[test]
    fn test_ingest_folder_skips_bad_files() {
        let dir = TempDir::new().unwrap();
        let photos = dir.path().join("photos");
        fs::create_dir_all(photos.join("sub")).unwrap();
        fs::write(photos.join("a.jpg"), b"cat").unwrap();
        fs::write(photos.join("b.PNG"), b"dog").unwrap();
        fs::write(photos.join("notes.txt"), b"car").unwrap();
        fs::write(photos.join(".hidden.jpg"), b"car").unwrap();
        fs::write(photos.join("sub").join("c.jpeg"), [0xffu8, 0xfe]).unwrap();

        let mut config = config(&dir);
        config.ingest.batch_size = 2;
        let engine = SnapEngine::new(config, capabilities(None)).unwrap();

        let files = collect_image_files(&photos).unwrap();
        assert_eq!(files.len(), 3);

        let mut progress = Vec::new();
        let report = engine
            .ingest_files(&files, Some("holiday"), |p| progress.push(p))
            .unwrap();
        assert_eq!(report.discovered, 3);
        assert_eq!(report.ingested.len(), 2);
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].path.ends_with("sub/c.jpeg"));
        assert_eq!(
            progress.last(),
            Some(&IngestProgress { done: 3, total: 3 })
        );

        let rows: Vec<RowIndex> = report.ingested.iter().map(|r| r.row_index).collect();
        assert_eq!(rows, vec![RowIndex::new(0), RowIndex::new(1)]);
        assert_eq!(image_count(&engine), 2);
    }

    #[test]
    fn test_collect_image_files_requires_directory() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.jpg");
        fs::write(&file, b"cat").unwrap();
        assert!(matches!(
            collect_image_files(&file),
            Err(SnapError::Validation(_))
        ));
    }

    #[test]
    fn test_rebuild_drops_inactive_and_keeps_search() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        engine.ingest("a.jpg", b"red car", None).unwrap();
        let dog = engine.ingest("b.jpg", b"dog", None).unwrap();
        let cat = engine.ingest("c.jpg", b"cat", None).unwrap();
        engine.set_active(&dog.external_id, false).unwrap();

        let report = engine.rebuild().unwrap();
        assert_eq!(report.removed(), 1);

        let health = engine.health_check().unwrap();
        assert!(health.is_aligned());
        assert_eq!((health.vectors, health.active), (2, 2));

        let results = engine.query("cat", 5).unwrap();
        assert_eq!(results[0].external_id, cat.external_id);
        assert_eq!(results[0].row_index, RowIndex::new(1));
    }

    #[test]
    fn test_dimension_mismatch_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir);
        config.index.dimension = 512;
        assert!(matches!(
            SnapEngine::new(config, capabilities(None)),
            Err(SnapError::Configuration { .. })
        ));
    }
}
