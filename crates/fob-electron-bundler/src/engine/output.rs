//! Engine output in a shape the orchestrator plugins can edit.

use std::path::PathBuf;

use rolldown_common::{Output, OutputAsset, OutputChunk};
use rustc_hash::FxHashMap;

/// A rendered JavaScript chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkFile {
    /// Path relative to the output directory, always `/`-separated.
    pub file_name: String,
    pub name: String,
    pub code: String,
    pub is_entry: bool,
    pub is_dynamic_entry: bool,
    pub facade_module_id: Option<String>,
    pub module_ids: Vec<String>,
    /// File names of statically imported chunks.
    pub imports: Vec<String>,
    pub dynamic_imports: Vec<String>,
}

impl ChunkFile {
    pub fn from_rolldown(chunk: &OutputChunk) -> Self {
        Self {
            file_name: chunk.filename.to_string(),
            name: chunk.name.to_string(),
            code: chunk.code.clone(),
            is_entry: chunk.is_entry,
            is_dynamic_entry: chunk.is_dynamic_entry,
            facade_module_id: chunk.facade_module_id.as_ref().map(|id| id.to_string()),
            module_ids: chunk.module_ids.iter().map(|id| id.to_string()).collect(),
            imports: chunk.imports.iter().map(|s| s.to_string()).collect(),
            dynamic_imports: chunk
                .dynamic_imports
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// A non-code file such as an image, a native addon or an HTML page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetFile {
    pub file_name: String,
    pub source: Vec<u8>,
}

impl AssetFile {
    pub fn new(file_name: impl Into<String>, source: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            source: source.into(),
        }
    }

    pub fn from_rolldown(asset: &OutputAsset) -> Self {
        Self {
            file_name: asset.filename.to_string(),
            source: asset.source.as_bytes().to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputFile {
    Chunk(ChunkFile),
    Asset(AssetFile),
}

impl OutputFile {
    pub fn from_rolldown(output: &Output) -> Self {
        match output {
            Output::Chunk(chunk) => OutputFile::Chunk(ChunkFile::from_rolldown(chunk)),
            Output::Asset(asset) => OutputFile::Asset(AssetFile::from_rolldown(asset)),
        }
    }

    pub fn file_name(&self) -> &str {
        match self {
            OutputFile::Chunk(chunk) => &chunk.file_name,
            OutputFile::Asset(asset) => &asset.file_name,
        }
    }

    pub fn contents(&self) -> &[u8] {
        match self {
            OutputFile::Chunk(chunk) => chunk.code.as_bytes(),
            OutputFile::Asset(asset) => &asset.source,
        }
    }

    pub fn as_chunk(&self) -> Option<&ChunkFile> {
        match self {
            OutputFile::Chunk(chunk) => Some(chunk),
            OutputFile::Asset(_) => None,
        }
    }
}

/// Facade module id to file name, for every chunk that has one.
pub fn entry_index(files: &[OutputFile]) -> FxHashMap<String, String> {
    files
        .iter()
        .filter_map(OutputFile::as_chunk)
        .filter_map(|chunk| {
            chunk
                .facade_module_id
                .as_ref()
                .map(|id| (id.clone(), chunk.file_name.clone()))
        })
        .collect()
}

/// What ended up on disk after a build.
#[derive(Debug, Clone, Default)]
pub struct WrittenBundle {
    pub out_dir: PathBuf,
    pub files: Vec<OutputFile>,
}

impl WrittenBundle {
    pub fn chunks(&self) -> impl Iterator<Item = &ChunkFile> {
        self.files.iter().filter_map(OutputFile::as_chunk)
    }

    pub fn path_of(&self, file_name: &str) -> PathBuf {
        self.out_dir.join(file_name)
    }
}

/// Outcome of a single build.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub out_dir: PathBuf,
    pub files: Vec<String>,
    /// Source files that took part in the build.
    pub watch_files: Vec<PathBuf>,
}
