//! Baselines persisted next to the data so later runs skip the scan.
//!
//! Each hemisphere lives in its own bincode file whose name and header both
//! carry the parameters the baseline was built with. Files built with other
//! parameters are never picked up.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    baseline::MONTHS, build_baseline, Baseline, BaselineError, BaselineParams, Baselines,
    Hemisphere, RecordSource,
};

#[derive(Debug, Error, Diagnostic)]
pub enum CacheError {
    #[error("Could not write baseline cache {}: {source}", .path.display())]
    #[diagnostic(code(poles::cache::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not encode baseline cache {}: {source}", .path.display())]
    #[diagnostic(code(poles::cache::encode))]
    Encode {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },
    #[error(transparent)]
    #[diagnostic(transparent)]
    Baseline(#[from] BaselineError),
}

#[derive(Debug, Serialize, Deserialize)]
struct CachedBaseline {
    hemisphere: Hemisphere,
    params: BaselineParams,
    baseline: Baseline,
}

/// Directory holding cached baselines.
#[derive(Debug, Clone)]
pub struct BaselineCache {
    dir: PathBuf,
}

impl BaselineCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `baseline_<N|S>_lat<lat_max>_<year_min>-<year_max>.bin`
    pub fn path(&self, hemisphere: Hemisphere, params: &BaselineParams) -> PathBuf {
        self.dir.join(format!(
            "baseline_{}_lat{}_{}-{}.bin",
            hemisphere.code(),
            params.lat_max(),
            params.year_min(),
            params.year_max()
        ))
    }

    /// Both cached baselines, or `None` if either one is missing or unusable.
    pub fn load(&self, params: &BaselineParams) -> Option<Baselines> {
        let north = self.load_one(Hemisphere::North, params)?;
        let south = self.load_one(Hemisphere::South, params)?;
        info!(dir = %self.dir.display(), "Loaded baselines from cache");
        Some(Baselines {
            north,
            south,
            params: *params,
        })
    }

    fn load_one(&self, hemisphere: Hemisphere, params: &BaselineParams) -> Option<Baseline> {
        let path = self.path(hemisphere, params);
        if !path.exists() {
            info!(path = %path.display(), "No cached baseline");
            return None;
        }

        let cached: CachedBaseline = match File::open(&path)
            .map_err(bincode::Error::from)
            .and_then(|file| bincode::deserialize_from(BufReader::new(file)))
        {
            Ok(cached) => cached,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable cached baseline");
                return None;
            }
        };

        if cached.hemisphere != hemisphere || cached.params != *params {
            warn!(
                path = %path.display(),
                cached = ?cached.params,
                "Ignoring cached baseline built with other parameters"
            );
            return None;
        }
        if cached.baseline.months().dim().0 != MONTHS {
            warn!(path = %path.display(), "Ignoring cached baseline without 12 months");
            return None;
        }

        Some(cached.baseline)
    }

    /// Writes both baselines, creating the directory if needed.
    pub fn store(&self, baselines: &Baselines) -> Result<(), CacheError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| CacheError::Io {
            path: self.dir.clone(),
            source,
        })?;
        for hemisphere in Hemisphere::ALL {
            let path = self.path(hemisphere, &baselines.params);
            let cached = CachedBaseline {
                hemisphere,
                params: baselines.params,
                baseline: baselines.get(hemisphere).clone(),
            };
            write(&path, &cached)?;
            info!(path = %path.display(), "Stored baseline");
        }
        Ok(())
    }
}

fn write(path: &Path, cached: &CachedBaseline) -> Result<(), CacheError> {
    let io_error = |source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = BufWriter::new(File::create(path).map_err(io_error)?);
    bincode::serialize_into(&mut writer, cached).map_err(|source| CacheError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    writer.flush().map_err(io_error)
}

/// Returns the cached baselines for `params` without touching `source`, or
/// builds them from `source` and caches them.
pub fn load_or_build<S: RecordSource + ?Sized>(
    cache: &BaselineCache,
    source: &mut S,
    params: &BaselineParams,
) -> Result<Baselines, CacheError> {
    if let Some(baselines) = cache.load(params) {
        return Ok(baselines);
    }
    let baselines = build_baseline(source, params)?;
    cache.store(&baselines)?;
    Ok(baselines)
}
