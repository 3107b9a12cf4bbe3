//! 파일 시스템 유틸리티

use reel_foundation::Result;
use std::path::Path;
use tokio::fs;

/// 디렉토리 재귀 복사 (대상이 없으면 생성, 기존 파일은 덮어씀)
pub async fn copy_dir_recursive(src: &Path, dest: &Path) -> Result<()> {
    if !dest.exists() {
        fs::create_dir_all(dest).await?;
    }

    let mut entries = fs::read_dir(src).await?;

    while let Some(entry) = entries.next_entry().await? {
        let src_path = entry.path();
        let dest_path = dest.join(entry.file_name());

        if src_path.is_dir() {
            Box::pin(copy_dir_recursive(&src_path, &dest_path)).await?;
        } else {
            fs::copy(&src_path, &dest_path).await?;
        }
    }

    Ok(())
}

/// 디렉토리가 비어 있지 않은지
pub async fn has_entries(dir: &Path) -> Result<bool> {
    let mut entries = fs::read_dir(dir).await?;
    Ok(entries.next_entry().await?.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_copy_nested() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        std::fs::create_dir_all(src.join("a/b")).unwrap();
        std::fs::write(src.join("a/b/file.txt"), "hello").unwrap();
        std::fs::write(src.join("top.json"), "{}").unwrap();

        let dest = temp.path().join("dest");
        copy_dir_recursive(&src, &dest).await.unwrap();

        assert_eq!(
            std::fs::read_to_string(dest.join("a/b/file.txt")).unwrap(),
            "hello"
        );
        assert!(dest.join("top.json").exists());
        assert!(has_entries(&dest).await.unwrap());
    }
}
