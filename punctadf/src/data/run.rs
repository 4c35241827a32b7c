use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;

use crate::data::image::Channel;

/// Explicit configuration for one analysis run. Replaces any reliance on the
/// process working directory: every path the run touches is derived from
/// here.
#[derive(Clone, Debug)]
pub struct RunConfig {
    /// Directory holding the prep's `Metadata/` and `Images/` trees.
    pub prep_dir: PathBuf,
    /// Cell-culture prep identifier, e.g. `CCP_127`.
    pub prep_id: String,
    /// Neurite set identifier, e.g. `NS_02.01`.
    pub ns_id: String,
    pub channel: Channel,
    /// Root under which the timestamped run directory is created.
    pub output_root: PathBuf,
    /// Free-form note stored with the run.
    pub note: String,
    /// Worker threads for the analysis pool.
    pub num_threads: usize,
}

impl RunConfig {
    pub fn metadata_dir(&self) -> PathBuf {
        self.prep_dir.join("Metadata")
    }

    /// Directory of cropped neurite-set images to analyze.
    pub fn images_dir(&self) -> PathBuf {
        self.prep_dir.join("Images").join("Cropped").join(&self.ns_id)
    }

    pub fn imaging_metadata_file(&self) -> PathBuf {
        self.metadata_dir()
            .join(format!("{}.MetaD.IM.csv", self.prep_id))
    }

    pub fn ns_metadata_file(&self) -> PathBuf {
        self.metadata_dir()
            .join(format!("{}.MetaD.{}.csv", self.prep_id, self.ns_id))
    }
}

/// A created, timestamp-named output directory for one run.
#[derive(Clone, Debug)]
pub struct RunDirectory {
    pub path: PathBuf,
    pub timestamp: String,
}

impl RunDirectory {
    /// Creates `<output_root>/<YYYYMMDD-HHMMSS>/`.
    pub fn create(output_root: &Path) -> Result<Self> {
        let timestamp = Local::now().format("%Y%m%d-%H%M%S").to_string();
        let path = output_root.join(&timestamp);
        fs::create_dir_all(&path)
            .with_context(|| format!("creating run directory {}", path.display()))?;
        Ok(RunDirectory { path, timestamp })
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Writes the run README holding the analysis note.
    pub fn write_readme(&self, prep_id: &str, note: &str) -> Result<PathBuf> {
        let path = self.file(&format!("{}_AnalysisRDME.{}.txt", prep_id, self.timestamp));
        fs::write(&path, note)
            .with_context(|| format!("writing run readme {}", path.display()))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_config_paths() {
        let config = RunConfig {
            prep_dir: PathBuf::from("/data/CCP_127"),
            prep_id: "CCP_127".to_string(),
            ns_id: "NS_02.01".to_string(),
            channel: Channel::Green,
            output_root: PathBuf::from("/data/CCP_127/Analysis"),
            note: String::new(),
            num_threads: 4,
        };
        assert_eq!(
            config.imaging_metadata_file(),
            PathBuf::from("/data/CCP_127/Metadata/CCP_127.MetaD.IM.csv")
        );
        assert_eq!(
            config.ns_metadata_file(),
            PathBuf::from("/data/CCP_127/Metadata/CCP_127.MetaD.NS_02.01.csv")
        );
        assert_eq!(
            config.images_dir(),
            PathBuf::from("/data/CCP_127/Images/Cropped/NS_02.01")
        );
    }
}
