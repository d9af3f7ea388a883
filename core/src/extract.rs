//! Archive extraction hook used by `download_tarball`.

use std::path::Path;

use crate::error::HurlError;

/// Unpacks a downloaded tarball into a directory.
///
/// hurl ships no archive support of its own; callers plug in whatever
/// archive library they already use. Failures should be reported as
/// [`HurlError::ExtractError`].
pub trait TarballExtractor {
    fn extract_tarball(&self, archive: &Path, dest_dir: &Path) -> Result<(), HurlError>;
}

impl<F> TarballExtractor for F
where
    F: Fn(&Path, &Path) -> Result<(), HurlError>,
{
    fn extract_tarball(&self, archive: &Path, dest_dir: &Path) -> Result<(), HurlError> {
        self(archive, dest_dir)
    }
}
