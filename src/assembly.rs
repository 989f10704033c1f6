//! Staging and archiving of a finished project.
//!
//! A project is staged under `<staging_root>/<project>/` and compressed into
//! `<export_root>/<project>.zip`. Both locations are keyed only by project name, so a later run
//! with the same name replaces the earlier staging tree and archive.

use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

/// Sub-directory of the staging tree holding the uploaded inputs.
pub const INPUTS_DIR: &str = "inputs";
/// File name of the final deliverable inside the staging tree and archive.
pub const FINAL_DOCUMENT_NAME: &str = "prebep_final.docx";
/// File name of the metadata summary inside the staging tree and archive.
pub const METADATA_FILE_NAME: &str = "resumen.txt";
/// Extension appended to the project name to form the archive file name.
pub const ARCHIVE_EXTENSION: &str = "zip";
/// MIME type announced when the archive is handed out for download.
pub const ARCHIVE_CONTENT_TYPE: &str = "application/zip";

/// Filesystem or archive failures while persisting a project.
#[derive(Debug, Error)]
pub enum AssemblyError {
    /// A file or directory operation failed.
    #[error("Failed to {action} {}: {source}", path.display())]
    Io {
        /// What was being attempted.
        action: &'static str,
        /// Path the operation targeted.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The zip writer rejected an entry or could not be finalized.
    #[error("Failed to write archive {}: {source}", path.display())]
    Archive {
        /// Archive being written.
        path: PathBuf,
        /// Underlying zip error.
        #[source]
        source: zip::result::ZipError,
    },
    /// The staging tree could not be walked.
    #[error("Failed to walk staging directory: {0}")]
    Walk(#[from] walkdir::Error),
    /// The background task writing the project stopped before finishing.
    #[error("Assembly task did not complete: {0}")]
    Interrupted(String),
}

fn io_error<'a>(
    action: &'static str,
    path: &'a Path,
) -> impl FnOnce(io::Error) -> AssemblyError + 'a {
    move |source| AssemblyError::Io {
        action,
        path: path.to_path_buf(),
        source,
    }
}

/// One uploaded file as written into `inputs/`.
#[derive(Debug, Clone, Copy)]
pub struct StagedFile<'a> {
    /// Original file name.
    pub name: &'a str,
    /// Byte-identical file contents.
    pub bytes: &'a [u8],
}

/// Descriptor of an archive produced by [`ProjectAssembler::assemble`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectArchive {
    /// Project identifier the archive is named after.
    pub project_name: String,
    /// Location of the archive on disk.
    pub path: PathBuf,
    /// Staging directory that was compressed.
    pub staging_dir: PathBuf,
    /// Download file name (`<project>.zip`).
    pub file_name: String,
    /// Archive size in bytes.
    pub size_bytes: u64,
    /// Number of file entries in the archive.
    pub entry_count: usize,
    /// Hex-encoded SHA-256 digest of the archive bytes.
    pub sha256: String,
}

/// Archive contents ready to hand to a caller for download.
#[derive(Debug, Clone)]
pub struct ArchiveDownload {
    /// Suggested file name.
    pub file_name: String,
    /// MIME type of the payload.
    pub content_type: &'static str,
    /// Raw archive bytes.
    pub bytes: Vec<u8>,
}

impl ProjectArchive {
    /// Read the archive back from disk for delivery.
    pub fn read_download(&self) -> Result<ArchiveDownload, AssemblyError> {
        let bytes = fs::read(&self.path).map_err(io_error("read", &self.path))?;
        Ok(ArchiveDownload {
            file_name: self.file_name.clone(),
            content_type: ARCHIVE_CONTENT_TYPE,
            bytes,
        })
    }
}

/// Writes project files into a staging tree and compresses that tree.
#[derive(Debug, Clone)]
pub struct ProjectAssembler {
    staging_root: PathBuf,
    export_root: PathBuf,
}

impl ProjectAssembler {
    /// Create an assembler rooted at the given staging and export directories.
    pub fn new(staging_root: impl Into<PathBuf>, export_root: impl Into<PathBuf>) -> Self {
        Self {
            staging_root: staging_root.into(),
            export_root: export_root.into(),
        }
    }

    /// Staging directory used for `project_name`.
    pub fn staging_dir(&self, project_name: &str) -> PathBuf {
        self.staging_root.join(project_name)
    }

    /// Archive path used for `project_name`.
    pub fn archive_path(&self, project_name: &str) -> PathBuf {
        self.export_root.join(archive_file_name(project_name))
    }

    /// Stage every file for `project_name` and compress the staging tree.
    ///
    /// Any staging tree left by a previous run of the same project is removed first, and an
    /// existing archive is overwritten. The staging tree is kept after archiving.
    pub fn assemble(
        &self,
        project_name: &str,
        inputs: &[StagedFile<'_>],
        output_document: &[u8],
        metadata: &str,
    ) -> Result<ProjectArchive, AssemblyError> {
        let staging_dir = self.staging_dir(project_name);
        if staging_dir.exists() {
            tracing::debug!(path = %staging_dir.display(), "Clearing previous staging directory");
            fs::remove_dir_all(&staging_dir).map_err(io_error("clear", &staging_dir))?;
        }

        let inputs_dir = staging_dir.join(INPUTS_DIR);
        fs::create_dir_all(&inputs_dir).map_err(io_error("create", &inputs_dir))?;
        for input in inputs {
            let path = inputs_dir.join(input.name);
            fs::write(&path, input.bytes).map_err(io_error("write", &path))?;
        }

        let final_path = staging_dir.join(FINAL_DOCUMENT_NAME);
        fs::write(&final_path, output_document).map_err(io_error("write", &final_path))?;

        let metadata_path = staging_dir.join(METADATA_FILE_NAME);
        fs::write(&metadata_path, metadata.as_bytes()).map_err(io_error("write", &metadata_path))?;

        fs::create_dir_all(&self.export_root).map_err(io_error("create", &self.export_root))?;
        let archive_path = self.archive_path(project_name);
        let entry_count = compress_directory(&staging_dir, &archive_path)?;

        let bytes = fs::read(&archive_path).map_err(io_error("read", &archive_path))?;
        let sha256 = hex::encode(Sha256::digest(&bytes));
        tracing::info!(
            project = project_name,
            archive = %archive_path.display(),
            entries = entry_count,
            size_bytes = bytes.len(),
            "Project archive written"
        );

        Ok(ProjectArchive {
            project_name: project_name.to_string(),
            path: archive_path,
            staging_dir,
            file_name: archive_file_name(project_name),
            size_bytes: bytes.len() as u64,
            entry_count,
            sha256,
        })
    }
}

/// Download file name for a project archive.
pub fn archive_file_name(project_name: &str) -> String {
    format!("{project_name}.{ARCHIVE_EXTENSION}")
}

/// Compress every file below `source_dir` into `destination`, returning the entry count.
///
/// Entry names are relative to `source_dir` and use `/` separators; files are visited in
/// sorted order so archives are reproducible.
fn compress_directory(source_dir: &Path, destination: &Path) -> Result<usize, AssemblyError> {
    let file = File::create(destination).map_err(io_error("create", destination))?;
    let mut zip = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let archive_error = |source: zip::result::ZipError| AssemblyError::Archive {
        path: destination.to_path_buf(),
        source,
    };

    let mut entries = 0;
    for entry in WalkDir::new(source_dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(source_dir)
            .unwrap_or_else(|_| entry.path());
        let name = relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let data = fs::read(entry.path()).map_err(io_error("read", entry.path()))?;
        zip.start_file(name, options).map_err(archive_error)?;
        zip.write_all(&data)
            .map_err(io_error("write archive entry into", destination))?;
        entries += 1;
    }

    zip.finish().map_err(archive_error)?;
    Ok(entries)
}
