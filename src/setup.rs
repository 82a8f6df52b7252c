use crate::config::Config;
use crate::error::PipelineResult;
use std::fs;
use std::path::PathBuf;
use tracing::{error, info};

/// Create the output tree. Existing directories are fine; a directory that
/// cannot be created is logged and reported but does not stop the others.
pub fn prepare_output_dirs(config: &Config) -> Vec<(PathBuf, PipelineResult<()>)> {
    config
        .layout
        .directories()
        .into_iter()
        .map(|dir| {
            let result: PipelineResult<()> = fs::create_dir_all(&dir).map_err(Into::into);
            match &result {
                Ok(()) => info!(dir = %dir.display(), "directory ready"),
                Err(e) => error!(dir = %dir.display(), error = %e, "could not create directory"),
            }
            (dir, result)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn creates_all_directories_idempotently() {
        let tmp = tempdir().unwrap();
        let config = Config::new("in.xlsx", tmp.path());
        for _ in 0..2 {
            let results = prepare_output_dirs(&config);
            assert_eq!(results.len(), 5);
            assert!(results.iter().all(|(d, r)| r.is_ok() && d.is_dir()));
        }
        assert!(tmp.path().join("visualizacoes/mapas_interativos").is_dir());
        assert!(tmp.path().join("logs").is_dir());
    }

    #[test]
    fn blocked_directory_is_reported_not_fatal() {
        let tmp = tempdir().unwrap();
        // a plain file where the tree root should be
        let root = tmp.path().join("blocked");
        fs::write(&root, "x").unwrap();
        let config = Config::new("in.xlsx", &root);
        let results = prepare_output_dirs(&config);
        assert_eq!(results.len(), 5);
        assert!(results.iter().all(|(_, r)| r.is_err()));
    }
}
