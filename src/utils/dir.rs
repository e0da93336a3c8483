use std::{env, io, path::PathBuf};

use anyhow::{Context, Result};

const APPLICATION_NAME: &str = "lapsed";

/// Resolves and creates the per-user directory holding the history, the lock markers and logs.
pub fn create_application_default_path() -> Result<PathBuf> {
    let mut path = platform_data_dir()?;
    path.push(APPLICATION_NAME);

    match std::fs::create_dir_all(&path) {
        Ok(_) => Ok(path),
        Err(v) if v.kind() == io::ErrorKind::AlreadyExists => Ok(path),
        Err(v) => Err(v).with_context(|| format!("Couldn't create {path:?}")),
    }
}

/// Reads a variable, treating an empty value as unset.
fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}

#[cfg(not(windows))]
fn home() -> Result<PathBuf> {
    non_empty_var("HOME")
        .map(PathBuf::from)
        .context("HOME is not set")
}

#[cfg(all(not(windows), not(target_os = "macos")))]
fn xdg_data_dir(
    xdg_data_home: Option<String>,
    home: impl FnOnce() -> Result<PathBuf>,
) -> Result<PathBuf> {
    match xdg_data_home.filter(|value| !value.is_empty()) {
        Some(dir) => Ok(PathBuf::from(dir)),
        None => Ok(home()?.join(".local").join("share")),
    }
}

fn platform_data_dir() -> Result<PathBuf> {
    cfg_if::cfg_if! {
        if #[cfg(windows)] {
            non_empty_var("APPDATA")
                .map(PathBuf::from)
                .context("APPDATA is not set")
        } else if #[cfg(target_os = "macos")] {
            Ok(home()?.join("Library").join("Application Support"))
        } else {
            xdg_data_dir(env::var("XDG_DATA_HOME").ok(), home)
        }
    }
}

#[cfg(all(test, not(windows), not(target_os = "macos")))]
mod tests {
    use std::path::PathBuf;

    use anyhow::{anyhow, Result};

    use super::xdg_data_dir;

    fn home() -> Result<PathBuf> {
        Ok(PathBuf::from("/home/user"))
    }

    #[test]
    fn test_xdg_data_home_wins_when_set() -> Result<()> {
        let dir = xdg_data_dir(Some("/data".to_string()), home)?;
        assert_eq!(dir, PathBuf::from("/data"));
        Ok(())
    }

    #[test]
    fn test_empty_xdg_data_home_falls_back_to_home() -> Result<()> {
        assert_eq!(
            xdg_data_dir(Some(String::new()), home)?,
            PathBuf::from("/home/user/.local/share")
        );
        assert_eq!(xdg_data_dir(None, home)?, PathBuf::from("/home/user/.local/share"));
        Ok(())
    }

    #[test]
    fn test_missing_home_is_an_error() {
        assert!(xdg_data_dir(None, || Err(anyhow!("HOME is not set"))).is_err());
    }
}
