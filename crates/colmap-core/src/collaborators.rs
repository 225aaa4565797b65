//! External collaborators
//!
//! The engine itself never performs I/O. Loading catalogs, fetching preview
//! rows, persisting patterns and submitting mappings all go through the traits
//! below, awaited by the caller after local state changes are complete.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::catalog::{DataType, FieldCatalog, SourceField};
use crate::error::{Error, Result};
use crate::mapper::Mapper;
use crate::mapping::MappingEntry;
use crate::pattern::{MappingPattern, PatternError};

/// Source fields of an uploaded file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCatalog {
    /// Identifier to attach to later submissions
    pub file_id: u64,

    /// Fields with inferred types, in file order
    pub fields: Vec<SourceField>,
}

/// Trait for catalog lookups (upload results, file lookups, target files)
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Source fields and file id for a file reference
    async fn load_source_catalog(&self, file_ref: &str) -> Result<SourceCatalog>;

    /// Ordered target field names from a target file
    async fn load_target_fields(&self, file_ref: &str) -> Result<Vec<String>>;
}

/// Trait for fetching sample values of a column
#[async_trait]
pub trait ColumnPreview: Send + Sync {
    /// Values of `field` on 1-based `page`. A page shorter than `page_size`
    /// is the last one.
    async fn fetch_page(
        &self,
        file_id: u64,
        field: &str,
        page: usize,
        page_size: usize,
    ) -> Result<Vec<String>>;
}

/// A pattern as held by a store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredPattern {
    /// The pattern, with `id` set
    #[serde(flatten)]
    pub pattern: MappingPattern,

    /// Last write time
    pub updated_at: DateTime<Utc>,
}

impl StoredPattern {
    /// Store-assigned id
    pub fn id(&self) -> &str {
        self.pattern.id.as_deref().unwrap_or_default()
    }
}

/// Result of [`PatternStore::update`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Content changed and was written
    Updated(StoredPattern),
    /// Content matched what was stored; nothing written
    Unchanged(StoredPattern),
}

/// Trait for pattern persistence
#[async_trait]
pub trait PatternStore: Send + Sync {
    /// Store a new pattern and assign it an id
    async fn save(&self, pattern: &MappingPattern) -> Result<StoredPattern>;

    /// Replace the name and bindings of pattern `id`
    async fn update(&self, id: &str, pattern: &MappingPattern) -> Result<UpdateOutcome>;

    /// Delete pattern `id`
    async fn delete(&self, id: &str) -> Result<()>;

    /// Every stored pattern
    async fn list_all(&self) -> Result<Vec<StoredPattern>>;

    /// Look up one pattern
    async fn get(&self, id: &str) -> Result<StoredPattern> {
        self.list_all()
            .await?
            .into_iter()
            .find(|p| p.id() == id)
            .ok_or_else(|| Error::PatternNotFound { id: id.to_string() })
    }
}

/// Where a submission's outputs can be collected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    /// Location of the mapped output
    pub mapped_location: String,

    /// Location of the rejected-rows output, if any
    pub error_location: Option<String>,
}

/// Trait for handing a finished mapping set to the processing side
#[async_trait]
pub trait Submitter: Send + Sync {
    /// Submit `entries` for file `file_id`
    async fn submit(&self, file_id: u64, entries: &[MappingEntry]) -> Result<SubmissionReceipt>;
}

/// Load source and target catalogs concurrently and start a mapper over them
pub async fn load_mapper(
    catalogs: &dyn CatalogSource,
    source_ref: &str,
    target_ref: Option<&str>,
) -> Result<Mapper> {
    let source = catalogs.load_source_catalog(source_ref);
    let targets = async {
        match target_ref {
            Some(target_ref) => catalogs.load_target_fields(target_ref).await,
            None => Ok(Vec::new()),
        }
    };
    let (source, targets) = futures::try_join!(source, targets)?;
    tracing::debug!(
        file_id = source.file_id,
        sources = source.fields.len(),
        targets = targets.len(),
        "loaded catalogs"
    );
    Ok(Mapper::new(FieldCatalog::new(source.fields, targets)).with_file_id(source.file_id))
}

/// Submit the committed mappings of `mapper`
pub async fn submit_mappings(
    mapper: &Mapper,
    submitter: &dyn Submitter,
) -> Result<SubmissionReceipt> {
    if mapper.entries().is_empty() {
        return Err(Error::NothingToSubmit);
    }
    let file_id = mapper.file_id().ok_or(Error::MissingFileId)?;
    let receipt = submitter.submit(file_id, mapper.entries()).await?;
    tracing::info!(file_id, mapped = %receipt.mapped_location, "submitted mappings");
    Ok(receipt)
}

static SLUG_SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("slug pattern is valid"));

/// Lowercase, dash-separated form of a pattern name, used as a store id
pub fn slugify(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    let slug = SLUG_SEPARATORS.replace_all(&lower, "-");
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "pattern".to_string()
    } else {
        slug.to_string()
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .is_ok_and(|meta| meta.is_file())
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == "yaml" || ext == "yml")
}

fn check_storable(pattern: &MappingPattern) -> Result<()> {
    if pattern.name.trim().is_empty() {
        return Err(PatternError::BlankName.into());
    }
    if pattern.pattern.is_empty() {
        return Err(PatternError::EmptyMappingSet.into());
    }
    Ok(())
}

// ============================================================================
// File-backed catalogs (for local dev/testing)
// ============================================================================

/// Catalog descriptor file
///
/// ```yaml
/// file_id: 42
/// fields:
///   cust_name: text
///   cust_age: number
/// samples:
///   cust_name: [Alice, Bob]
/// ```
///
/// Target descriptors list plain names under `columns`. A descriptor without
/// `columns` offers its `fields` names as targets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogDescriptor {
    /// Uploaded file id
    #[serde(default)]
    pub file_id: u64,

    /// Source field name → data type, in file order
    #[serde(default)]
    pub fields: serde_yaml::Mapping,

    /// Target field names
    #[serde(default)]
    pub columns: Vec<String>,

    /// Sample values per field, served as column previews
    #[serde(default)]
    pub samples: HashMap<String, Vec<String>>,
}

impl CatalogDescriptor {
    /// Source fields in declaration order. A field without a type is `text`.
    pub fn source_fields(&self) -> Result<Vec<SourceField>> {
        self.fields
            .iter()
            .map(|(name, data_type)| {
                let name = name.as_str().ok_or_else(|| Error::ConfigInvalid {
                    message: format!("field name must be a string, got {:?}", name),
                })?;
                let data_type = if data_type.is_null() {
                    DataType::default()
                } else {
                    serde_yaml::from_value(data_type.clone())?
                };
                Ok(SourceField::new(name, data_type))
            })
            .collect()
    }

    /// Target names: `columns`, else the `fields` names
    pub fn target_names(&self) -> Vec<String> {
        if !self.columns.is_empty() {
            return self.columns.clone();
        }
        self.fields
            .iter()
            .filter_map(|(name, _)| name.as_str().map(str::to_string))
            .collect()
    }
}

/// Reads catalog descriptors from a directory
pub struct FileCatalogSource {
    dir: PathBuf,
}

impl FileCatalogSource {
    /// Create a catalog source over `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    async fn resolve(&self, file_ref: &str) -> Option<PathBuf> {
        let direct = PathBuf::from(file_ref);
        if is_file(&direct).await {
            return Some(direct);
        }
        for ext in ["yaml", "yml"] {
            let candidate = self.dir.join(format!("{}.{}", file_ref, ext));
            if is_file(&candidate).await {
                return Some(candidate);
            }
        }
        None
    }

    /// Read the descriptor named `file_ref` (a path, or a name in the directory)
    pub async fn load_descriptor(&self, file_ref: &str) -> Result<CatalogDescriptor> {
        let path = self.resolve(file_ref).await.ok_or_else(|| Error::External {
            collaborator: "catalog".to_string(),
            message: format!(
                "no catalog descriptor '{}' in {}",
                file_ref,
                self.dir.display()
            ),
        })?;
        let contents = tokio::fs::read_to_string(&path).await?;
        Ok(serde_yaml::from_str(&contents)?)
    }

    async fn descriptor_for_file(&self, file_id: u64) -> Result<CatalogDescriptor> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if is_yaml(&entry.path()) {
                paths.push(entry.path());
            }
        }
        paths.sort();

        for path in paths {
            let contents = tokio::fs::read_to_string(&path).await?;
            let descriptor: CatalogDescriptor = match serde_yaml::from_str(&contents) {
                Ok(descriptor) => descriptor,
                Err(e) => {
                    tracing::debug!(path = %path.display(), "skipping descriptor: {}", e);
                    continue;
                }
            };
            if descriptor.file_id == file_id && !descriptor.fields.is_empty() {
                return Ok(descriptor);
            }
        }
        Err(Error::External {
            collaborator: "preview".to_string(),
            message: format!("no file with id {}", file_id),
        })
    }
}

#[async_trait]
impl CatalogSource for FileCatalogSource {
    async fn load_source_catalog(&self, file_ref: &str) -> Result<SourceCatalog> {
        let descriptor = self.load_descriptor(file_ref).await?;
        let fields = descriptor.source_fields()?;
        if fields.is_empty() {
            return Err(Error::External {
                collaborator: "catalog".to_string(),
                message: format!("'{}' declares no source fields", file_ref),
            });
        }
        Ok(SourceCatalog {
            file_id: descriptor.file_id,
            fields,
        })
    }

    async fn load_target_fields(&self, file_ref: &str) -> Result<Vec<String>> {
        Ok(self.load_descriptor(file_ref).await?.target_names())
    }
}

#[async_trait]
impl ColumnPreview for FileCatalogSource {
    async fn fetch_page(
        &self,
        file_id: u64,
        field: &str,
        page: usize,
        page_size: usize,
    ) -> Result<Vec<String>> {
        let descriptor = self.descriptor_for_file(file_id).await?;
        let start = page.saturating_sub(1).saturating_mul(page_size);
        Ok(descriptor
            .samples
            .get(field)
            .map(|values| values.iter().skip(start).take(page_size).cloned().collect())
            .unwrap_or_default())
    }
}

// ============================================================================
// Pattern stores
// ============================================================================

/// Keeps one YAML document per pattern in a directory, named `<id>.yaml`
pub struct FilePatternStore {
    dir: PathBuf,
}

impl FilePatternStore {
    /// Create a store over `dir` (created on first write)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, id: &str) -> Result<PathBuf> {
        if id.is_empty() || slugify(id) != id {
            return Err(Error::PatternNotFound { id: id.to_string() });
        }
        Ok(self.dir.join(format!("{}.yaml", id)))
    }

    async fn unused_id(&self, name: &str) -> Result<String> {
        let base = slugify(name);
        let mut id = base.clone();
        let mut n = 2;
        while tokio::fs::try_exists(self.path_for(&id)?).await? {
            id = format!("{}-{}", base, n);
            n += 1;
        }
        Ok(id)
    }

    async fn read(&self, id: &str) -> Result<StoredPattern> {
        let path = self.path_for(id)?;
        if !tokio::fs::try_exists(&path).await? {
            return Err(Error::PatternNotFound { id: id.to_string() });
        }
        let contents = tokio::fs::read_to_string(&path).await?;
        let mut stored: StoredPattern = serde_yaml::from_str(&contents)?;
        stored.pattern.id = Some(id.to_string());
        Ok(stored)
    }

    async fn write(&self, stored: &StoredPattern) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let yaml = serde_yaml::to_string(stored)?;
        tokio::fs::write(self.path_for(stored.id())?, yaml).await?;
        Ok(())
    }
}

#[async_trait]
impl PatternStore for FilePatternStore {
    async fn save(&self, pattern: &MappingPattern) -> Result<StoredPattern> {
        check_storable(pattern)?;
        let id = self.unused_id(&pattern.name).await?;
        let stored = StoredPattern {
            pattern: MappingPattern {
                id: Some(id),
                name: pattern.name.trim().to_string(),
                pattern: pattern.pattern.clone(),
            },
            updated_at: Utc::now(),
        };
        self.write(&stored).await?;
        tracing::info!(id = stored.id(), name = %stored.pattern.name, "saved pattern");
        Ok(stored)
    }

    async fn update(&self, id: &str, pattern: &MappingPattern) -> Result<UpdateOutcome> {
        check_storable(pattern)?;
        let current = self.read(id).await?;
        let next = MappingPattern {
            id: Some(id.to_string()),
            name: pattern.name.trim().to_string(),
            pattern: pattern.pattern.clone(),
        };
        if next.fingerprint() == current.pattern.fingerprint() {
            return Ok(UpdateOutcome::Unchanged(current));
        }
        let stored = StoredPattern {
            pattern: next,
            updated_at: Utc::now(),
        };
        self.write(&stored).await?;
        tracing::info!(id, "updated pattern");
        Ok(UpdateOutcome::Updated(stored))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let path = self.path_for(id)?;
        if !tokio::fs::try_exists(&path).await? {
            return Err(Error::PatternNotFound { id: id.to_string() });
        }
        tokio::fs::remove_file(path).await?;
        tracing::info!(id, "deleted pattern");
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<StoredPattern>> {
        if !tokio::fs::try_exists(&self.dir).await? {
            return Ok(vec![]);
        }
        let mut ids = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "yaml") {
                match path.file_stem().and_then(|s| s.to_str()) {
                    Some(stem) if slugify(stem) == stem => ids.push(stem.to_string()),
                    _ => tracing::debug!(path = %path.display(), "skipping non-pattern file"),
                }
            }
        }
        ids.sort();

        let mut patterns = Vec::with_capacity(ids.len());
        for id in ids {
            match self.read(&id).await {
                Ok(stored) => patterns.push(stored),
                Err(Error::Yaml(e)) => {
                    tracing::warn!(id = %id, "skipping unreadable pattern file: {}", e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(patterns)
    }

    async fn get(&self, id: &str) -> Result<StoredPattern> {
        self.read(id).await
    }
}

/// In-memory pattern store with numeric ids
#[derive(Default)]
pub struct MemoryPatternStore {
    inner: Mutex<MemoryPatterns>,
}

#[derive(Default)]
struct MemoryPatterns {
    next_id: u64,
    patterns: BTreeMap<u64, StoredPattern>,
}

impl MemoryPatternStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryPatterns> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn numeric_id(id: &str) -> Result<u64> {
    id.parse()
        .map_err(|_| Error::PatternNotFound { id: id.to_string() })
}

#[async_trait]
impl PatternStore for MemoryPatternStore {
    async fn save(&self, pattern: &MappingPattern) -> Result<StoredPattern> {
        check_storable(pattern)?;
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        let stored = StoredPattern {
            pattern: MappingPattern {
                id: Some(id.to_string()),
                name: pattern.name.trim().to_string(),
                pattern: pattern.pattern.clone(),
            },
            updated_at: Utc::now(),
        };
        inner.patterns.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update(&self, id: &str, pattern: &MappingPattern) -> Result<UpdateOutcome> {
        check_storable(pattern)?;
        let key = numeric_id(id)?;
        let mut inner = self.lock();
        let current = inner
            .patterns
            .get_mut(&key)
            .ok_or_else(|| Error::PatternNotFound { id: id.to_string() })?;
        let next = MappingPattern {
            id: Some(id.to_string()),
            name: pattern.name.trim().to_string(),
            pattern: pattern.pattern.clone(),
        };
        if next.fingerprint() == current.pattern.fingerprint() {
            return Ok(UpdateOutcome::Unchanged(current.clone()));
        }
        current.pattern = next;
        current.updated_at = Utc::now();
        Ok(UpdateOutcome::Updated(current.clone()))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let key = numeric_id(id)?;
        self.lock()
            .patterns
            .remove(&key)
            .map(|_| ())
            .ok_or_else(|| Error::PatternNotFound { id: id.to_string() })
    }

    async fn list_all(&self) -> Result<Vec<StoredPattern>> {
        Ok(self.lock().patterns.values().cloned().collect())
    }
}

// ============================================================================
// Submission
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmissionManifest<'a> {
    file_id: u64,
    submitted_at: DateTime<Utc>,
    mappings: &'a [MappingEntry],
}

/// Writes each submission as a JSON manifest into an outbox directory, for a
/// processing service to pick up
pub struct OutboxSubmitter {
    dir: PathBuf,
}

impl OutboxSubmitter {
    /// Create a submitter writing into `dir` (created on first submit)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl Submitter for OutboxSubmitter {
    async fn submit(&self, file_id: u64, entries: &[MappingEntry]) -> Result<SubmissionReceipt> {
        let submitted_at = Utc::now();
        let manifest = SubmissionManifest {
            file_id,
            submitted_at,
            mappings: entries,
        };
        let body = serde_json::to_vec_pretty(&manifest)?;

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(format!(
            "submission-{}-{}.json",
            file_id,
            submitted_at.format("%Y%m%dT%H%M%S%3f")
        ));
        tokio::fs::write(&path, body).await?;

        Ok(SubmissionReceipt {
            mapped_location: path.display().to_string(),
            error_location: None,
        })
    }
}
