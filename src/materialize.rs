//! Turning path and fetch sources into concrete files
//!
//! Both the source resolver and the bundle codec need the same answer to
//! "which files does this source contribute, and where do they go". The
//! functions here produce that answer as in-memory files keyed by their
//! destination below the working directory (outdir included).

use std::fs;
use std::path::{Path, PathBuf};

use crate::archive::{read_archive, ArchiveFormat};
use crate::error::{Error, Result};
use crate::fetch::{url_basename, Fetcher};
use crate::filesystem::{DirectoryListing, File};
use crate::integrity::Integrity;
use crate::path::{
    escapes_root, expand_path_globs, has_glob, normalize_path, path_before_glob,
    path_matches_glob, path_strip_prefix,
};
use crate::recipe::{FetchSource, PathSource, Recipe};
use crate::report::Reporter;

/// A file contributed by a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedFile {
    /// Destination relative to the working directory.
    pub destination: PathBuf,
    /// Where the content came from, for diagnostics.
    pub origin: String,
    pub file: File,
}

fn read_local_file(path: &Path, destination: PathBuf) -> Result<MaterializedFile> {
    let content = fs::read(path).map_err(|e| Error::Path {
        message: format!("failed to read {}: {}", path.display(), e),
    })?;

    #[cfg(unix)]
    let permissions = {
        use std::os::unix::fs::PermissionsExt;
        fs::metadata(path)?.permissions().mode() & 0o777
    };
    #[cfg(not(unix))]
    let permissions = 0o644;

    Ok(MaterializedFile {
        destination,
        origin: path.display().to_string(),
        file: File {
            content,
            permissions,
        },
    })
}

/// Files a path source contributes.
///
/// A literal path must exist. A literal directory is skipped with a warning.
/// Glob matches keep their sub-path below the glob's fixed prefix; matched
/// directories are skipped with a warning.
pub fn path_source_files(
    recipe: &Recipe,
    source: &PathSource,
    listing: &dyn DirectoryListing,
    reporter: &dyn Reporter,
) -> Result<Vec<MaterializedFile>> {
    let pattern = recipe.resolved_source_path(source);
    let pattern_str = pattern.to_string_lossy().into_owned();
    let outdir = source.outdir.clone().unwrap_or_default();

    if !has_glob(&pattern_str) {
        let metadata = fs::metadata(&pattern).map_err(|e| Error::Path {
            message: format!("{}: {}", pattern.display(), e),
        })?;
        if metadata.is_dir() {
            reporter.warning(&format!("Skipping directory {}", pattern.display()));
            return Ok(Vec::new());
        }
        let name = pattern.file_name().ok_or_else(|| Error::Path {
            message: format!("{} has no file name", pattern.display()),
        })?;
        return Ok(vec![read_local_file(&pattern, outdir.join(name))?]);
    }

    let prefix = path_before_glob(&pattern_str);
    let mut files = Vec::new();
    for path in expand_path_globs(&pattern, listing)? {
        if path.is_dir() {
            reporter.warning(&format!(
                "Skipping directory {} matched by {}",
                path.display(),
                pattern_str
            ));
            continue;
        }
        let relative = match path_strip_prefix(&path, &prefix) {
            Some(relative) if !relative.as_os_str().is_empty() => relative,
            _ => path.file_name().map(PathBuf::from).unwrap_or_default(),
        };
        files.push(read_local_file(&path, outdir.join(relative))?);
    }

    if files.is_empty() {
        reporter.warning(&format!("{} matched no files", pattern_str));
    }
    Ok(files)
}

/// Check downloaded bytes against a declared digest.
///
/// Without a declared digest the computed one is reported as a warning so it
/// can be pinned.
pub fn verify_integrity(
    url: &str,
    declared: Option<&Integrity>,
    data: &[u8],
    reporter: &dyn Reporter,
) -> Result<()> {
    let actual = Integrity::sha256(data);
    match declared {
        Some(expected) if !expected.verify(data) => Err(Error::Integrity {
            url: url.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }),
        Some(_) => Ok(()),
        None => {
            reporter.warning(&format!(
                "{} has no integrity set, downloaded content has integrity {}",
                url, actual
            ));
            Ok(())
        }
    }
}

/// Whether an archive entry is selected by a `paths` filter item. Literal
/// items select the entry itself or everything below a directory.
fn path_selected(relative: &Path, selector: &str) -> Result<bool> {
    if has_glob(selector) {
        path_matches_glob(&relative.to_string_lossy(), selector)
    } else {
        Ok(relative.starts_with(normalize_path(Path::new(selector))))
    }
}

/// Files a fetch source contributes.
///
/// Archive URLs are unpacked with `strip_prefix` applied first and `paths`
/// second. Anything else is stored under the URL's basename.
pub fn fetch_source_files(
    source: &FetchSource,
    fetcher: &dyn Fetcher,
    reporter: &dyn Reporter,
) -> Result<Vec<MaterializedFile>> {
    let data = fetcher.fetch(&source.url)?;
    verify_integrity(&source.url, source.integrity.as_ref(), &data, reporter)?;

    let outdir = source.outdir.clone().unwrap_or_default();
    let Some(format) = ArchiveFormat::from_name(&source.url) else {
        if !source.paths.is_empty() {
            reporter.warning(&format!(
                "{} is not an archive, ignoring 'paths'",
                source.url
            ));
        }
        if source.strip_prefix.is_some() {
            reporter.warning(&format!(
                "{} is not an archive, ignoring 'strip_prefix'",
                source.url
            ));
        }
        let basename = url_basename(&source.url)?;
        return Ok(vec![MaterializedFile {
            destination: outdir.join(basename),
            origin: source.url.clone(),
            file: File::new(data),
        }]);
    };

    log::debug!("unpacking {} as {}", source.url, format);
    let mut files = Vec::new();
    for entry in read_archive(format, &data)? {
        let mut relative = normalize_path(&entry.path);
        if let Some(prefix) = &source.strip_prefix {
            match path_strip_prefix(&relative, &normalize_path(prefix)) {
                Some(stripped) => relative = stripped,
                None => continue,
            }
        }
        if relative.as_os_str().is_empty() {
            continue;
        }
        if escapes_root(&relative) {
            return Err(Error::Archive {
                message: format!(
                    "entry {} of {} escapes the archive root",
                    entry.path.display(),
                    source.url
                ),
            });
        }
        if !source.paths.is_empty() {
            let mut selected = false;
            for selector in &source.paths {
                if path_selected(&relative, selector)? {
                    selected = true;
                    break;
                }
            }
            if !selected {
                continue;
            }
        }

        let permissions = entry.mode.map(|mode| mode & 0o777).unwrap_or(0o644);
        files.push(MaterializedFile {
            destination: outdir.join(&relative),
            origin: format!("{}!{}", source.url, entry.path.display()),
            file: File {
                content: entry.data,
                permissions,
            },
        });
    }

    if files.is_empty() {
        reporter.warning(&format!("{} contributed no files", source.url));
    }
    Ok(files)
}
