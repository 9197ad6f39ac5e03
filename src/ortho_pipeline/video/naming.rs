use std::path::{Path, PathBuf};

/// First of `base.ext`, `base_1.ext`, `base_2.ext`, ... in `dir` that does not
/// exist yet. An empty `extension` yields bare names.
pub fn unique_path(dir: &Path, base: &str, extension: &str) -> PathBuf {
    let name = |suffix: Option<usize>| {
        let stem = match suffix {
            Some(n) => format!("{base}_{n}"),
            None => base.to_string(),
        };
        if extension.is_empty() {
            stem
        } else {
            format!("{stem}.{extension}")
        }
    };

    let mut candidate = dir.join(name(None));
    let mut counter = 1;
    while candidate.exists() {
        candidate = dir.join(name(Some(counter)));
        counter += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_unique_path_fresh_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(unique_path(dir.path(), "A_orthomax", "avi"), dir.path().join("A_orthomax.avi"));
    }

    #[test]
    fn test_unique_path_counts_up() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("B.avi"), b"").unwrap();
        assert_eq!(unique_path(dir.path(), "B", "avi"), dir.path().join("B_1.avi"));

        fs::write(dir.path().join("B_1.avi"), b"").unwrap();
        assert_eq!(unique_path(dir.path(), "B", "avi"), dir.path().join("B_2.avi"));
    }

    #[test]
    fn test_unique_path_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("comp_orthomax")).unwrap();
        assert_eq!(
            unique_path(dir.path(), "comp_orthomax", ""),
            dir.path().join("comp_orthomax_1")
        );
    }
}
