//! Certificate picture directories
//!
//! Borders, seals, watermarks and signatures live in one directory each
//! under the configured assets root. Definitions refer to them by file name.
//! A definition's pictures are resolved on first use and kept until its
//! selectors change or it is forgotten.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::RwLock;

use serde::Serialize;

use crate::error::AppResult;
use crate::models::{is_empty_selector, CertificateDefinition, ChoiceOption};
use crate::services::rendering::{VisualSlot, VisualSlots};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Border,
    Seal,
    Watermark,
    Signature,
}

impl AssetKind {
    pub const ALL: [AssetKind; 4] = [
        AssetKind::Border,
        AssetKind::Seal,
        AssetKind::Watermark,
        AssetKind::Signature,
    ];

    pub fn dir_name(&self) -> &'static str {
        match self {
            AssetKind::Border => "borders",
            AssetKind::Seal => "seals",
            AssetKind::Watermark => "watermarks",
            AssetKind::Signature => "signatures",
        }
    }
}

fn is_picture(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".png") || lower.ends_with(".jpg")
}

/// Selectors are bare file names
fn is_safe_name(name: &str) -> bool {
    !name.contains('/') && !name.contains('\\') && !name.contains("..")
}

/// Border, watermark, seal and signature selectors of a definition
type Selectors = [String; 4];

fn selectors(definition: &CertificateDefinition) -> Selectors {
    [
        definition.border_style.trim().to_string(),
        definition.watermark.trim().to_string(),
        definition.seal.trim().to_string(),
        definition.signature.trim().to_string(),
    ]
}

#[derive(Debug, Clone)]
struct ResolvedPictures {
    selectors: Selectors,
    slots: VisualSlots,
}

#[derive(Debug, Clone)]
pub struct AssetCatalogue {
    root: PathBuf,
    resolved: Arc<RwLock<HashMap<i64, ResolvedPictures>>>,
}

impl AssetCatalogue {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            resolved: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn dir(&self, kind: AssetKind) -> PathBuf {
        self.root.join(kind.dir_name())
    }

    /// Choice list for one directory, sorted by file name, then "No"
    ///
    /// A missing directory lists no pictures.
    pub async fn options(&self, kind: AssetKind) -> AppResult<Vec<ChoiceOption>> {
        let mut names = Vec::new();
        match tokio::fs::read_dir(self.dir(kind)).await {
            Ok(mut entries) => {
                while let Some(entry) = entries.next_entry().await.map_err(anyhow::Error::from)? {
                    if let Some(name) = entry.file_name().to_str() {
                        if is_picture(name) && entry.file_type().await.map(|t| t.is_file()).unwrap_or(false) {
                            names.push(name.to_string());
                        }
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(dir = kind.dir_name(), "Asset directory missing");
            }
            Err(e) => return Err(anyhow::Error::from(e).into()),
        }
        names.sort();

        let mut options: Vec<ChoiceOption> = names
            .into_iter()
            .map(|name| {
                let label = name.split('.').next().unwrap_or(&name).to_string();
                ChoiceOption::new(name, label)
            })
            .collect();
        options.push(ChoiceOption::new("0", "No"));
        Ok(options)
    }

    /// Path of a selected `.png`/`.jpg` picture when it exists
    pub async fn resolve(&self, kind: AssetKind, selector: &str) -> VisualSlot {
        let name = selector.trim();
        if is_empty_selector(name) || !is_safe_name(name) || !is_picture(name) {
            return VisualSlot::None;
        }
        let path = self.dir(kind).join(name);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => VisualSlot::Image(path),
            _ => {
                tracing::debug!(path = %path.display(), "Selected picture not found");
                VisualSlot::None
            }
        }
    }

    /// Picture slots of a definition, resolved once per selector set
    pub async fn pictures(&self, definition: &CertificateDefinition) -> VisualSlots {
        let wanted = selectors(definition);
        if let Some(cached) = self.resolved.read().await.get(&definition.id) {
            if cached.selectors == wanted {
                return cached.slots.clone();
            }
        }

        let [border, watermark, seal, signature] = &wanted;
        let slots = VisualSlots {
            border: self.resolve(AssetKind::Border, border).await,
            watermark: self.resolve(AssetKind::Watermark, watermark).await,
            seal: self.resolve(AssetKind::Seal, seal).await,
            signature: self.resolve(AssetKind::Signature, signature).await,
        };
        tracing::debug!(certificate_id = definition.id, "Certificate pictures resolved");
        self.resolved.write().await.insert(
            definition.id,
            ResolvedPictures {
                selectors: wanted,
                slots: slots.clone(),
            },
        );
        slots
    }

    /// Drop the resolved pictures of a definition
    pub async fn forget(&self, certificate_id: i64) {
        self.resolved.write().await.remove(&certificate_id);
    }

    /// The four picture slots of a definition
    ///
    /// `signers` replace a missing signature picture when print_teacher is set.
    pub async fn resolve_slots(&self, definition: &CertificateDefinition, signers: Vec<String>) -> VisualSlots {
        let mut slots = self.pictures(definition).await;
        if matches!(slots.signature, VisualSlot::None) && definition.print_teacher && !signers.is_empty() {
            slots.signature = VisualSlot::Fallback(signers);
        }
        slots
    }
}
