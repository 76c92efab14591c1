use anyhow::{Context, Result};
use std::path::PathBuf;

/// External document store holding the input datasets and the generated
/// reports. The real deployment talks to a remote drive; the pipeline only
/// ever needs these four operations, so everything behind them stays out of
/// scope. One handle is built at process start and passed down — no global
/// client state.
pub trait Storage {
    /// Raw bytes of a stored file. A missing identifier is fatal.
    fn fetch(&self, file_id: &str) -> Result<Vec<u8>>;

    /// Identifier of the file with exactly `name` inside `folder_id`, if any.
    fn find_by_name(&self, name: &str, folder_id: &str) -> Result<Option<String>>;

    /// Create a new file and return its identifier.
    fn create(&self, name: &str, folder_id: &str, bytes: &[u8]) -> Result<String>;

    /// Replace the content of an existing file, keeping its identifier.
    fn overwrite(&self, file_id: &str, bytes: &[u8]) -> Result<String>;
}

/// Directory-backed store: identifiers are paths relative to the root and a
/// folder is a subdirectory. Used for local runs and tests.
pub struct LocalDirStorage {
    root: PathBuf,
}

impl LocalDirStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Storage for LocalDirStorage {
    fn fetch(&self, file_id: &str) -> Result<Vec<u8>> {
        std::fs::read(self.root.join(file_id))
            .with_context(|| format!("failed to fetch {}", file_id))
    }

    fn find_by_name(&self, name: &str, folder_id: &str) -> Result<Option<String>> {
        if self.root.join(folder_id).join(name).is_file() {
            Ok(Some(format!("{}/{}", folder_id, name)))
        } else {
            Ok(None)
        }
    }

    fn create(&self, name: &str, folder_id: &str, bytes: &[u8]) -> Result<String> {
        let dir = self.root.join(folder_id);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create folder {}", folder_id))?;
        std::fs::write(dir.join(name), bytes)
            .with_context(|| format!("failed to create {}/{}", folder_id, name))?;
        Ok(format!("{}/{}", folder_id, name))
    }

    fn overwrite(&self, file_id: &str, bytes: &[u8]) -> Result<String> {
        std::fs::write(self.root.join(file_id), bytes)
            .with_context(|| format!("failed to overwrite {}", file_id))?;
        Ok(file_id.to_string())
    }
}

/// In-memory store for unit tests.
#[cfg(test)]
pub(crate) mod mem {
    use super::Storage;
    use anyhow::{anyhow, Result};
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;

    #[derive(Default)]
    pub struct MemStorage {
        // id -> (folder, name, bytes)
        files: RefCell<HashMap<String, (String, String, Vec<u8>)>>,
        next_id: Cell<u64>,
    }

    impl MemStorage {
        pub fn new() -> Self {
            Self::default()
        }

        /// Seed a dataset under a fixed identifier.
        pub fn put(&self, file_id: &str, bytes: Vec<u8>) {
            self.files.borrow_mut().insert(
                file_id.to_string(),
                (String::new(), file_id.to_string(), bytes),
            );
        }

        pub fn bytes(&self, file_id: &str) -> Option<Vec<u8>> {
            self.files.borrow().get(file_id).map(|(_, _, b)| b.clone())
        }
    }

    impl Storage for MemStorage {
        fn fetch(&self, file_id: &str) -> Result<Vec<u8>> {
            self.bytes(file_id)
                .ok_or_else(|| anyhow!("no such file: {}", file_id))
        }

        fn find_by_name(&self, name: &str, folder_id: &str) -> Result<Option<String>> {
            Ok(self
                .files
                .borrow()
                .iter()
                .find(|(_, (folder, n, _))| folder == folder_id && n == name)
                .map(|(id, _)| id.clone()))
        }

        fn create(&self, name: &str, folder_id: &str, bytes: &[u8]) -> Result<String> {
            let id = format!("mem-{}", self.next_id.get());
            self.next_id.set(self.next_id.get() + 1);
            self.files.borrow_mut().insert(
                id.clone(),
                (folder_id.to_string(), name.to_string(), bytes.to_vec()),
            );
            Ok(id)
        }

        fn overwrite(&self, file_id: &str, bytes: &[u8]) -> Result<String> {
            let mut files = self.files.borrow_mut();
            let entry = files
                .get_mut(file_id)
                .ok_or_else(|| anyhow!("no such file: {}", file_id))?;
            entry.2 = bytes.to_vec();
            Ok(file_id.to_string())
        }
    }
}
