use crate::config::find_upward;
use std::path::{Path, PathBuf};

pub const ENV_FILE_NAME: &str = ".env";

/// Outcome of looking for and loading a `.env` file.
#[derive(Debug)]
pub enum EnvFile {
    Loaded(PathBuf),
    NotFound,
    /// The file exists but could not be read or parsed.
    Failed { path: PathBuf, error: dotenvy::Error },
}

impl EnvFile {
    /// The file that was found, whether or not it loaded.
    pub fn path(&self) -> Option<&Path> {
        match self {
            EnvFile::Loaded(path) | EnvFile::Failed { path, .. } => Some(path),
            EnvFile::NotFound => None,
        }
    }
}

/// Load `.env` into the process environment without overriding variables that are
/// already set. Looks upward from the working directory first, then next to the
/// executable.
///
/// Nothing is logged here; this runs before the subscriber exists.
pub fn load_env() -> EnvFile {
    let cwd = std::env::current_dir().ok();
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    load_env_from(cwd.as_deref(), exe_dir.as_deref())
}

pub fn load_env_from(cwd: Option<&Path>, exe_dir: Option<&Path>) -> EnvFile {
    let Some(path) = locate_env_file(cwd, exe_dir) else {
        return EnvFile::NotFound;
    };
    match dotenvy::from_path(&path) {
        Ok(()) => EnvFile::Loaded(path),
        Err(error) => EnvFile::Failed { path, error },
    }
}

fn locate_env_file(cwd: Option<&Path>, exe_dir: Option<&Path>) -> Option<PathBuf> {
    cwd.and_then(|dir| find_upward(dir, ENV_FILE_NAME)).or_else(|| {
        exe_dir
            .map(|dir| dir.join(ENV_FILE_NAME))
            .filter(|candidate| candidate.is_file())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_prefers_ancestor_of_cwd() {
        let root = tempfile::tempdir().unwrap();
        let work = root.path().join("project").join("sub");
        let bin = root.path().join("bin");
        std::fs::create_dir_all(&work).unwrap();
        std::fs::create_dir_all(&bin).unwrap();
        std::fs::write(root.path().join("project").join(ENV_FILE_NAME), "A=1").unwrap();
        std::fs::write(bin.join(ENV_FILE_NAME), "A=2").unwrap();

        assert_eq!(
            locate_env_file(Some(&work), Some(&bin)),
            Some(root.path().join("project").join(ENV_FILE_NAME))
        );
    }

    #[test]
    fn test_locate_falls_back_to_exe_dir() {
        let root = tempfile::tempdir().unwrap();
        let work = root.path().join("work");
        let bin = root.path().join("bin");
        std::fs::create_dir_all(&work).unwrap();
        std::fs::create_dir_all(&bin).unwrap();
        std::fs::write(bin.join(ENV_FILE_NAME), "A=2").unwrap();

        assert_eq!(
            locate_env_file(Some(&work), Some(&bin)),
            Some(bin.join(ENV_FILE_NAME))
        );
    }

    #[test]
    fn test_locate_missing_is_none() {
        let root = tempfile::tempdir().unwrap();
        assert_eq!(locate_env_file(Some(root.path()), Some(root.path())), None);
    }

    #[test]
    fn test_existing_vars_are_not_overridden() {
        let root = tempfile::tempdir().unwrap();
        let work = root.path().join("work");
        std::fs::create_dir_all(&work).unwrap();
        let path = root.path().join(ENV_FILE_NAME);
        std::fs::write(
            &path,
            "XSE_LOADER_PRESET=from_file\nXSE_LOADER_FRESH=from_file\n",
        )
        .unwrap();

        std::env::set_var("XSE_LOADER_PRESET", "from_shell");
        let loaded = load_env_from(Some(&work), None);

        assert!(matches!(&loaded, EnvFile::Loaded(p) if *p == path));
        assert_eq!(loaded.path(), Some(path.as_path()));
        assert_eq!(std::env::var("XSE_LOADER_PRESET").unwrap(), "from_shell");
        assert_eq!(std::env::var("XSE_LOADER_FRESH").unwrap(), "from_file");
    }

    #[test]
    fn test_malformed_file_reports_path_and_error() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join(ENV_FILE_NAME);
        std::fs::write(&path, "NOT VALID\n").unwrap();

        let loaded = load_env_from(Some(root.path()), None);
        assert!(matches!(&loaded, EnvFile::Failed { path: p, .. } if *p == path));
        assert_eq!(loaded.path(), Some(path.as_path()));
    }

    #[test]
    fn test_no_file_is_not_found() {
        let root = tempfile::tempdir().unwrap();
        let loaded = load_env_from(Some(root.path()), Some(root.path()));
        assert!(matches!(loaded, EnvFile::NotFound));
        assert_eq!(loaded.path(), None);
    }
}
