use futures::future::join_all;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::Path;

use crate::config::Config;
use crate::errors::AppResult;

use super::folder_dispatcher::{FolderDispatcher, FolderSummary};
use super::transport::Transport;

/// Names of the immediate subdirectories of `root`. Entries that cannot be
/// read are logged and skipped.
pub fn list_folders(root: &Path) -> AppResult<Vec<OsString>> {
    Ok(fs::read_dir(root)?
        .filter_map(|entry| folder_entry(root, entry))
        .collect())
}

fn folder_entry(root: &Path, entry: io::Result<fs::DirEntry>) -> Option<OsString> {
    match entry {
        Ok(entry) if entry.path().is_dir() => Some(entry.file_name()),
        Ok(_) => None,
        Err(e) => {
            log::warn!("Skipping unreadable entry in {}: {}", root.display(), e);
            None
        }
    }
}

/// Upload every folder under the configured root, all folders in flight at
/// once. Returns when the last folder is done.
pub async fn run<T: Transport>(config: &Config, transport: &T) -> AppResult<Vec<FolderSummary>> {
    let folder_names = list_folders(&config.folder_path)?;

    if folder_names.is_empty() {
        log::warn!("No folders found in {}", config.folder_path.display());
        return Ok(Vec::new());
    }

    log::info!(
        "Starting upload of {} folders from {}",
        folder_names.len(),
        config.folder_path.display()
    );

    let dispatcher = FolderDispatcher::new(config, transport);
    let summaries = join_all(folder_names.iter().map(|name| dispatcher.process(name))).await;

    let failures: usize = summaries.iter().map(|s| s.failures).sum();
    log::info!(
        "All folders processed: {} folders, {} failed deliveries",
        summaries.len(),
        failures
    );

    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_folders_only_directories() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("A")).unwrap();
        fs::create_dir(root.path().join("B")).unwrap();
        fs::create_dir_all(root.path().join("A").join("nested")).unwrap();
        fs::write(root.path().join("loose.jpg"), b"x").unwrap();

        let mut folders = list_folders(root.path()).unwrap();
        folders.sort();
        assert_eq!(folders, vec![OsString::from("A"), OsString::from("B")]);
    }

    #[test]
    fn test_unreadable_entry_is_skipped() {
        let root = tempfile::tempdir().unwrap();
        let entry = Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        assert_eq!(folder_entry(root.path(), entry), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_list_folders_keeps_non_utf8_names() {
        use std::os::unix::ffi::OsStrExt;

        let root = tempfile::tempdir().unwrap();
        let name = std::ffi::OsStr::from_bytes(b"trip-\xff");
        fs::create_dir(root.path().join(name)).unwrap();

        let folders = list_folders(root.path()).unwrap();
        assert_eq!(folders, vec![name.to_os_string()]);
    }

    #[test]
    fn test_list_folders_missing_root() {
        let root = tempfile::tempdir().unwrap();
        assert!(list_folders(&root.path().join("absent")).is_err());
    }
}
