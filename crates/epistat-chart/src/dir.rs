//! [`ImageDir`] — a directory of `<code>.png` files.

use std::{
  io::ErrorKind,
  path::{Path, PathBuf},
};

use epistat_core::{
  chart::{ChartStore, is_valid_code},
  series::TimeSeriesPoint,
};

use crate::{ChartOptions, Error, Result, render_png};

fn validate_code(code: &str) -> Result<()> {
  if is_valid_code(code) { Ok(()) } else { Err(Error::InvalidCode(code.to_owned())) }
}

/// Chart images stored as one file per country code.
///
/// Writes land in a temporary sibling and are renamed over the target, so a
/// concurrent reader gets either the previous image or the new one.
#[derive(Debug, Clone)]
pub struct ImageDir {
  root:    PathBuf,
  options: ChartOptions,
}

impl ImageDir {
  /// Use `root` as the image directory, creating it if needed.
  pub async fn open(root: impl Into<PathBuf>, options: ChartOptions) -> Result<Self> {
    let root = root.into();
    tokio::fs::create_dir_all(&root).await?;
    Ok(Self { root, options })
  }

  pub fn root(&self) -> &Path { &self.root }

  /// The file an image for `code` lives in.
  pub fn path_for(&self, code: &str) -> Result<PathBuf> {
    validate_code(code)?;
    Ok(self.root.join(format!("{code}.png")))
  }

  /// Store `png` as the image for `code`, replacing any previous one.
  pub async fn save(&self, code: &str, png: &[u8]) -> Result<()> {
    let target = self.path_for(code)?;
    let staging = self.root.join(format!(".{code}.png.tmp"));
    tokio::fs::write(&staging, png).await?;
    if let Err(e) = tokio::fs::rename(&staging, &target).await {
      let _ = tokio::fs::remove_file(&staging).await;
      return Err(e.into());
    }
    tracing::debug!(code, path = %target.display(), bytes = png.len(), "chart written");
    Ok(())
  }
}

impl ChartStore for ImageDir {
  type Error = Error;

  async fn publish(&self, code: &str, series: &[TimeSeriesPoint]) -> Result<()> {
    validate_code(code)?;
    let points = series.to_vec();
    let options = self.options;
    let png = tokio::task::spawn_blocking(move || render_png(&points, &options)).await??;
    self.save(code, &png).await
  }

  async fn load(&self, code: &str) -> Result<Option<Vec<u8>>> {
    let path = self.path_for(code)?;
    match tokio::fs::read(&path).await {
      Ok(bytes) => Ok(Some(bytes)),
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
      Err(e) => Err(e.into()),
    }
  }
}
