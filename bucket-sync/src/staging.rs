use std::io;
use std::path::Path;
use tempfile::TempPath;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncWriteExt};

use crate::config::REPLICA_PREFIX;

// Keeps staged file names well under common filesystem limits.
const MAX_KEY_CHARS: usize = 96;

/// Local copy of one object, held between the download and upload legs of a copy.
///
/// The file is named `copy_<random>_<key>`, so two copies of the same key running at the
/// same time never share a file. `remove` deletes it and reports failure; if the artifact is
/// dropped without being removed (for example when the copy is cancelled) the file is
/// deleted on a best-effort basis.
pub struct StagingArtifact {
    path: TempPath,
    file: Option<File>,
}

impl StagingArtifact {
    pub fn create(dir: &Path, key: &str) -> io::Result<Self> {
        let suffix = format!("_{}", sanitize(key));
        let (file, path) = tempfile::Builder::new()
            .prefix(REPLICA_PREFIX)
            .suffix(&suffix)
            .tempfile_in(dir)?
            .into_parts();

        Ok(StagingArtifact {
            path,
            file: Some(File::from_std(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copies everything from `reader` into the artifact and closes the file.
    pub async fn fill<R>(&mut self, reader: &mut R) -> io::Result<u64>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let mut file = self
            .file
            .take()
            .ok_or_else(|| io::Error::other("staging file was already written"))?;
        let written = tokio::io::copy(reader, &mut file).await?;
        file.flush().await?;
        file.sync_all().await?;
        Ok(written)
    }

    pub fn remove(self) -> io::Result<()> {
        // The handle must be closed before the file is unlinked.
        drop(self.file);
        self.path.close()
    }
}

fn sanitize(key: &str) -> String {
    key.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' => c,
            _ => '_',
        })
        .take(MAX_KEY_CHARS)
        .collect()
}
