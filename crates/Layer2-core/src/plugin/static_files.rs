//! 플러그인 정적 파일 해석

use reel_foundation::{Error, Result};
use std::path::{Path, PathBuf};

/// 해석된 정적 파일
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticFile {
    pub path: PathBuf,
    pub mime: String,
}

/// 플러그인 코드 디렉토리 안의 파일 경로와 MIME 타입 해석
pub fn resolve_static_file(code_dir: &Path, plugin_id: &str, file_path: &str) -> Result<StaticFile> {
    if plugin_id.contains("..") || file_path.contains("..") {
        return Err(Error::Validation(format!(
            "Forbidden static path for plugin {}: {}",
            plugin_id, file_path
        )));
    }

    let relative = file_path.trim_start_matches('/');
    let path = code_dir.join(relative);
    if !path.exists() {
        return Err(Error::NotFound(format!("File {} not found", file_path)));
    }
    if !path.is_file() {
        return Err(Error::Validation(format!("{} is not a file", file_path)));
    }

    let mime = guess_mime(&path);
    Ok(StaticFile { path, mime })
}

fn guess_mime(path: &Path) -> String {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        // 모듈 스크립트는 항상 application/javascript
        Some("js") | Some("mjs") => return "application/javascript".to_string(),
        _ => {}
    }

    match mime_guess::from_path(path).first() {
        Some(mime) => mime.essence_str().to_string(),
        None if extension.as_deref() == Some("css") => "text/css".to_string(),
        None => "application/octet-stream".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn plugin_dir() -> TempDir {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("dist/assets")).unwrap();
        std::fs::write(temp.path().join("dist/assets/index.mjs"), "export {}").unwrap();
        std::fs::write(temp.path().join("dist/assets/style.css"), "body {}").unwrap();
        std::fs::write(temp.path().join("dist/assets/blob.zzq"), "??").unwrap();
        temp
    }

    #[test]
    fn test_mime_types() {
        let temp = plugin_dir();
        let js = resolve_static_file(temp.path(), "demo", "dist/assets/index.mjs").unwrap();
        assert_eq!(js.mime, "application/javascript");

        let css = resolve_static_file(temp.path(), "demo", "/dist/assets/style.css").unwrap();
        assert_eq!(css.mime, "text/css");

        let blob = resolve_static_file(temp.path(), "demo", "dist/assets/blob.zzq").unwrap();
        assert_eq!(blob.mime, "application/octet-stream");
    }

    #[test]
    fn test_rejects_traversal_missing_and_dirs() {
        let temp = plugin_dir();
        assert!(matches!(
            resolve_static_file(temp.path(), "demo", "../secret"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            resolve_static_file(temp.path(), "..", "dist"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            resolve_static_file(temp.path(), "demo", "dist/missing.js"),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            resolve_static_file(temp.path(), "demo", "dist/assets"),
            Err(Error::Validation(_))
        ));
    }
}
