use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RasterizeError {
    #[error("pdftoppm not available on PATH")]
    NotAvailable,
    #[error("pdftoppm failed: {0}")]
    Failed(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Page images of one PDF. The backing directory is deleted on drop, so the
/// paths are only valid while this value lives.
#[derive(Debug)]
pub struct PageImages {
    _dir: TempDir,
    pages: Vec<PathBuf>,
}

impl PageImages {
    /// Wrap page images already written into `dir`, listed in page order.
    pub fn new(dir: TempDir, pages: Vec<PathBuf>) -> Self {
        Self { _dir: dir, pages }
    }

    /// Image paths in page order.
    pub fn pages(&self) -> &[PathBuf] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

pub trait Rasterizer: Send + Sync {
    fn rasterize(&self, pdf: &Path) -> Result<PageImages, RasterizeError>;
}

/// Renders pages with poppler's `pdftoppm`.
#[derive(Debug, Clone)]
pub struct Pdftoppm {
    pub dpi: u32,
}

impl Default for Pdftoppm {
    fn default() -> Self {
        Self { dpi: 300 }
    }
}

impl Rasterizer for Pdftoppm {
    fn rasterize(&self, pdf: &Path) -> Result<PageImages, RasterizeError> {
        let dir = tempfile::Builder::new().prefix("gmpricing-pages-").tempdir()?;
        let prefix = dir.path().join("page");

        let output = Command::new("pdftoppm")
            .args(["-r", &self.dpi.to_string(), "-png"])
            .arg(pdf)
            .arg(&prefix)
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    RasterizeError::NotAvailable
                } else {
                    RasterizeError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(RasterizeError::Failed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let pages = collect_pages(dir.path())?;
        tracing::debug!(pdf = %pdf.display(), pages = pages.len(), "rasterized");
        Ok(PageImages { _dir: dir, pages })
    }
}

/// `pdftoppm` names pages `page-1.png`, `page-01.png` or `page-001.png`
/// depending on the page count; sort numerically rather than lexically.
fn collect_pages(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut pages: Vec<(u32, PathBuf)> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter_map(|path| page_number(&path).map(|n| (n, path)))
        .collect();
    pages.sort_by_key(|(n, _)| *n);
    Ok(pages.into_iter().map(|(_, p)| p).collect())
}

fn page_number(path: &Path) -> Option<u32> {
    if path.extension()?.to_str()? != "png" {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    stem.rsplit('-').next()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_number_from_file_name() {
        assert_eq!(page_number(Path::new("/tmp/x/page-07.png")), Some(7));
        assert_eq!(page_number(Path::new("/tmp/x/page-12.png")), Some(12));
        assert_eq!(page_number(Path::new("/tmp/x/page-1.ppm")), None);
        assert_eq!(page_number(Path::new("/tmp/x/notes.png")), None);
    }

    #[test]
    fn pages_sort_numerically() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["page-10.png", "page-2.png", "page-1.png", "stray.txt"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        let pages = collect_pages(dir.path()).unwrap();
        let names: Vec<_> = pages
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["page-1.png", "page-2.png", "page-10.png"]);
    }
}
