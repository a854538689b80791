use crate::core::Storage;
use crate::utils::error::{EtlError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// 本機檔案系統；相對路徑以 `base_path` 為根，絕對路徑直接使用
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: String,
}

impl LocalStorage {
    pub fn new(base_path: String) -> Self {
        Self { base_path }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        Path::new(&self.base_path).join(path)
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let data = fs::read(self.resolve(path))?;
        Ok(data)
    }

    /// 先寫入同目錄的 `.tmp` 檔再改名，中斷時不會留下寫到一半的檔案
    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.resolve(path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut tmp_name = full_path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        if let Err(e) = fs::write(&tmp_path, data) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&tmp_path, &full_path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        Ok(())
    }

    async fn list_files(&self, dir: &str, extension: &str) -> Result<Vec<String>> {
        let full_dir = self.resolve(dir);
        let entries = fs::read_dir(&full_dir).map_err(|e| {
            tracing::debug!("Cannot read directory {}: {}", full_dir.display(), e);
            EtlError::InputNotFound {
                path: dir.to_string(),
            }
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let matches_extension = path
                .extension()
                .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension))
                .unwrap_or(false);
            if !matches_extension || !path.is_file() {
                continue;
            }
            if let Some(name) = path.file_name() {
                let relative = Path::new(dir).join(name);
                files.push(relative.to_string_lossy().into_owned());
            }
        }
        files.sort();
        Ok(files)
    }

    async fn file_size(&self, path: &str) -> Result<u64> {
        Ok(fs::metadata(self.resolve(path))?.len())
    }

    async fn remove_file(&self, path: &str) -> Result<()> {
        fs::remove_file(self.resolve(path))?;
        Ok(())
    }
}
