use std::path::{Path, PathBuf};

/// Rows shown after each statement in the REPL.
pub const DEFAULT_PREVIEW_ROWS: usize = 5;

/// Settings for a [`Program`](crate::program::Program).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramConfig {
    /// Directory relative script paths are resolved against.
    pub src_dir: Option<PathBuf>,
    /// Directory relative table paths are resolved against.
    pub data_dir: Option<PathBuf>,
    /// Directory relative output paths are resolved against.
    pub output_dir: Option<PathBuf>,
    /// Running interactively. Enables the table preview after each verb.
    pub repl: bool,
    /// Suppress the preview even in the REPL.
    pub silent: bool,
    pub preview_rows: usize,
    /// Display width for pretty printed tables.
    pub width: Option<u16>,
}

impl Default for ProgramConfig {
    fn default() -> Self {
        ProgramConfig {
            src_dir: None,
            data_dir: None,
            output_dir: None,
            repl: false,
            silent: false,
            preview_rows: DEFAULT_PREVIEW_ROWS,
            width: None,
        }
    }
}

impl ProgramConfig {
    pub fn resolve_script(&self, path: &Path) -> PathBuf {
        resolve(self.src_dir.as_deref(), path)
    }

    pub fn resolve_data(&self, path: &Path) -> PathBuf {
        resolve(self.data_dir.as_deref(), path)
    }

    pub fn resolve_output(&self, path: &Path) -> PathBuf {
        resolve(self.output_dir.as_deref(), path)
    }
}

fn resolve(dir: Option<&Path>, path: &Path) -> PathBuf {
    match dir {
        Some(dir) if path.is_relative() => dir.join(path),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_relative_paths() {
        let config = ProgramConfig {
            data_dir: Some("data".into()),
            ..Default::default()
        };

        assert_eq!(PathBuf::from("data/a.csv"), config.resolve_data(Path::new("a.csv")));
        assert_eq!(PathBuf::from("/tmp/a.csv"), config.resolve_data(Path::new("/tmp/a.csv")));
        assert_eq!(PathBuf::from("a.t"), config.resolve_script(Path::new("a.t")));
    }
}
