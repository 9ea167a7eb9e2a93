use std::path::{Path, PathBuf};

/// Every `.json` file below `folder_path`, sorted by path.
pub fn read_json_files(folder_path: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(folder_path)? {
        let path = entry?.path();
        if path.is_dir() {
            files.extend(read_json_files(&path)?);
        } else if path.extension().is_some_and(|extension| extension == "json") {
            files.push(path);
        }
    }

    files.sort();

    Ok(files)
}
