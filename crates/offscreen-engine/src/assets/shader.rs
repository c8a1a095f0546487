use std::path::{Path, PathBuf};

use crate::error::{RenderError, Result};

/// WGSL source read in full from disk.
#[derive(Debug, Clone)]
pub struct ShaderSource {
    pub path: PathBuf,
    pub code: String,
}

impl ShaderSource {
    pub(super) fn read(path: &Path, entry_points: &[&str]) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|source| RenderError::ShaderUnreadable {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(path, bytes, entry_points)
    }

    fn from_bytes(path: &Path, bytes: Vec<u8>, entry_points: &[&str]) -> Result<Self> {
        let invalid = |reason: String| RenderError::ShaderInvalid {
            path: path.to_path_buf(),
            reason,
        };

        let code = String::from_utf8(bytes).map_err(|e| invalid(format!("not UTF-8: {e}")))?;
        if code.trim().is_empty() {
            return Err(invalid("file is empty".to_string()));
        }

        for entry in entry_points {
            if !declares_fn(&code, entry) {
                return Err(invalid(format!("missing entry point `{entry}`")));
            }
        }

        Ok(Self { path: path.to_path_buf(), code })
    }

    pub fn label(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "shader".to_string())
    }
}

fn declares_fn(code: &str, name: &str) -> bool {
    code.match_indices("fn ").any(|(at, _)| {
        let rest = code[at + 3..].trim_start();
        rest.strip_prefix(name)
            .is_some_and(|tail| tail.trim_start().starts_with('('))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(code: &[u8], entries: &[&str]) -> Result<ShaderSource> {
        ShaderSource::from_bytes(Path::new("test.wgsl"), code.to_vec(), entries)
    }

    #[test]
    fn accepts_declared_entry_points() {
        let s = parse(b"@compute @workgroup_size(1) fn cs_main () {}", &["cs_main"]).unwrap();
        assert_eq!(s.label(), "test.wgsl");
    }

    #[test]
    fn prefix_names_do_not_count() {
        let err = parse(b"fn cs_main_helper() {}", &["cs_main"]).unwrap_err();
        assert!(matches!(err, RenderError::ShaderInvalid { .. }));
    }

    #[test]
    fn rejects_binary_and_empty_files() {
        assert!(matches!(parse(&[0xff, 0xfe, 0x00], &[]), Err(RenderError::ShaderInvalid { .. })));
        assert!(matches!(parse(b"   \n", &[]), Err(RenderError::ShaderInvalid { .. })));
    }
}
