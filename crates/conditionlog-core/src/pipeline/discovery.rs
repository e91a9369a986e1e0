//! File discovery: find photos on disk and load them as pipeline inputs.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::types::RawImageInput;

use super::media_type::{self, SUPPORTED_EXTENSIONS};

/// Discovers image files in directories.
pub struct FileDiscovery;

/// Information about a discovered file.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    /// Full path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
}

impl FileDiscovery {
    /// Discover all supported image files at a path.
    ///
    /// A file path is returned as-is (validation decides whether it is
    /// acceptable, as with a picker). A directory is walked recursively for
    /// supported extensions, sorted by path to give a stable selection order.
    pub fn discover(path: &Path) -> Vec<DiscoveredFile> {
        if path.is_file() {
            return std::fs::metadata(path)
                .map(|meta| {
                    vec![DiscoveredFile {
                        path: path.to_path_buf(),
                        size: meta.len(),
                    }]
                })
                .unwrap_or_default();
        }

        let mut files: Vec<DiscoveredFile> = WalkDir::new(path)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|entry| entry.file_type().is_file() && Self::is_supported(entry.path()))
            .filter_map(|entry| {
                let size = entry.metadata().ok()?.len();
                Some(DiscoveredFile {
                    path: entry.path().to_path_buf(),
                    size,
                })
            })
            .collect();

        files.sort_by(|a, b| a.path.cmp(&b.path));
        files
    }

    /// Read a discovered file into a pipeline input.
    ///
    /// The declared type comes from the extension, falling back to content
    /// sniffing; unknown files get no declared type and fail validation.
    pub async fn load(file: &DiscoveredFile) -> std::io::Result<RawImageInput> {
        let data = tokio::fs::read(&file.path).await?;
        let media_type = media_type::from_extension(&file.path)
            .or_else(|| media_type::sniff(&data))
            .map(String::from);
        let file_name = file
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        Ok(RawImageInput::new(file_name, media_type, data).with_declared_size(file.size))
    }

    /// Check if a file has a supported extension.
    fn is_supported(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext_lower = ext.to_lowercase();
                SUPPORTED_EXTENSIONS.contains(&ext_lower.as_str())
            })
            .unwrap_or(false)
    }

    /// Get total size of all discovered files.
    pub fn total_size(files: &[DiscoveredFile]) -> u64 {
        files.iter().map(|f| f.size).sum()
    }
}
