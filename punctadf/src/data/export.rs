use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::data::run::RunDirectory;

/// Acquisition fields repeated on every exported row, mirroring the layout
/// of the original workbook sheets.
#[derive(Clone, Debug)]
pub struct RowMeta {
    pub date: String,
    pub image_id: String,
    pub prep_id: String,
    pub strain: String,
    pub ns_id: String,
    pub tiv: String,
    pub pattern_geom: String,
    pub surface_proteins: String,
}

/// One image column: profiles along the distance axis.
#[derive(Clone, Debug, Serialize)]
pub struct DataRow {
    pub date: String,
    pub image_id: String,
    pub prep_id: String,
    pub strain: String,
    pub ns_id: String,
    pub tiv: String,
    pub pattern_geom: String,
    pub surface_proteins: String,
    pub distance: f64,
    pub normalized_distance: f64,
    pub raw_intensity: f64,
    pub background_intensity: f64,
    pub neurite_intensity: f64,
    pub avg_norm_neu_int: f64,
    pub max_norm_neu_int: f64,
}

/// One accepted punctum.
#[derive(Clone, Debug, Serialize)]
pub struct PeakRow {
    pub date: String,
    pub image_id: String,
    pub prep_id: String,
    pub strain: String,
    pub ns_id: String,
    pub tiv: String,
    pub pattern_geom: String,
    pub surface_proteins: String,
    pub distance: f64,
    pub normalized_distance: f64,
    pub punctum_max_intensity: f64,
    pub norm_punctum_max_int: f64,
    pub punctum_width: f64,
}

/// One inter-punctum interval.
#[derive(Clone, Debug, Serialize)]
pub struct IpdRow {
    pub date: String,
    pub image_id: String,
    pub prep_id: String,
    pub strain: String,
    pub ns_id: String,
    pub tiv: String,
    pub pattern_geom: String,
    pub surface_proteins: String,
    pub distance: f64,
    pub normalized_distance: f64,
    #[serde(rename = "inter-punctum_interval")]
    pub inter_punctum_interval: f64,
}

/// Per-image analysis summary, thresholds included for audit.
#[derive(Clone, Debug, Serialize)]
pub struct AnalysisRow {
    pub date: String,
    pub image_id: String,
    pub prep_id: String,
    pub strain: String,
    pub ns_id: String,
    pub tiv: String,
    pub pattern_geom: String,
    pub surface_proteins: String,
    pub image_size: usize,
    pub max_neurite_length: f64,
    pub average_neurite_intensity: f64,
    pub total_peaks: usize,
    pub average_peaks_per_micron: f64,
    pub average_peak_intensity: Option<f64>,
    pub average_peak_width: Option<f64>,
    pub average_ipd: Option<f64>,
    pub median_ipd: Option<f64>,
    #[serde(rename = "qTh")]
    pub q_th: f64,
    pub ss_mean: f64,
    pub ss_median: f64,
    pub ss_std: f64,
    pub ss_n: usize,
    pub min_height: f64,
    pub prominence: f64,
}

/// Row ranges sampled for each analysis region.
#[derive(Clone, Debug, Serialize)]
pub struct PixelIndexRow {
    pub region: String,
    pub index_start: usize,
    pub index_end: usize,
}

/// Tally of excluded neurites by reason.
#[derive(Clone, Debug, Serialize)]
pub struct ExclusionRow {
    pub exclusion_reason: String,
    pub count: usize,
}

/// User-specified and derived parameters of the run.
#[derive(Clone, Debug, Serialize)]
pub struct ParameterRow {
    pub date_of_analysis: String,
    pub time_of_analysis: String,
    pub microns_per_pixel: f64,
    pub tool: String,
}

impl DataRow {
    pub fn new(
        meta: &RowMeta,
        distance: f64,
        normalized_distance: f64,
        raw_intensity: f64,
        background_intensity: f64,
        neurite_intensity: f64,
        avg_norm_neu_int: f64,
        max_norm_neu_int: f64,
    ) -> Self {
        DataRow {
            date: meta.date.clone(),
            image_id: meta.image_id.clone(),
            prep_id: meta.prep_id.clone(),
            strain: meta.strain.clone(),
            ns_id: meta.ns_id.clone(),
            tiv: meta.tiv.clone(),
            pattern_geom: meta.pattern_geom.clone(),
            surface_proteins: meta.surface_proteins.clone(),
            distance,
            normalized_distance,
            raw_intensity,
            background_intensity,
            neurite_intensity,
            avg_norm_neu_int,
            max_norm_neu_int,
        }
    }
}

impl PeakRow {
    pub fn new(
        meta: &RowMeta,
        distance: f64,
        normalized_distance: f64,
        punctum_max_intensity: f64,
        norm_punctum_max_int: f64,
        punctum_width: f64,
    ) -> Self {
        PeakRow {
            date: meta.date.clone(),
            image_id: meta.image_id.clone(),
            prep_id: meta.prep_id.clone(),
            strain: meta.strain.clone(),
            ns_id: meta.ns_id.clone(),
            tiv: meta.tiv.clone(),
            pattern_geom: meta.pattern_geom.clone(),
            surface_proteins: meta.surface_proteins.clone(),
            distance,
            normalized_distance,
            punctum_max_intensity,
            norm_punctum_max_int,
            punctum_width,
        }
    }
}

impl IpdRow {
    pub fn new(
        meta: &RowMeta,
        distance: f64,
        normalized_distance: f64,
        inter_punctum_interval: f64,
    ) -> Self {
        IpdRow {
            date: meta.date.clone(),
            image_id: meta.image_id.clone(),
            prep_id: meta.prep_id.clone(),
            strain: meta.strain.clone(),
            ns_id: meta.ns_id.clone(),
            tiv: meta.tiv.clone(),
            pattern_geom: meta.pattern_geom.clone(),
            surface_proteins: meta.surface_proteins.clone(),
            distance,
            normalized_distance,
            inter_punctum_interval,
        }
    }
}

/// All exported tables for one run, written as one CSV file per table in
/// place of the original workbook sheets.
#[derive(Clone, Debug, Default)]
pub struct ExportSet {
    pub data: Vec<DataRow>,
    pub peaks: Vec<PeakRow>,
    pub ipds: Vec<IpdRow>,
    pub analysis: Vec<AnalysisRow>,
    pub exclusions: Vec<ExclusionRow>,
    pub pixel_indices: Vec<PixelIndexRow>,
    pub parameters: Vec<ParameterRow>,
}

impl ExportSet {
    pub fn write(&self, run_dir: &RunDirectory) -> Result<()> {
        write_rows(&run_dir.file("data.csv"), &self.data)?;
        write_rows(&run_dir.file("peaks.csv"), &self.peaks)?;
        write_rows(&run_dir.file("ipds.csv"), &self.ipds)?;
        write_rows(&run_dir.file("analysis.csv"), &self.analysis)?;
        write_rows(&run_dir.file("exclusions.csv"), &self.exclusions)?;
        write_rows(&run_dir.file("pixel_indices.csv"), &self.pixel_indices)?;
        write_rows(&run_dir.file("parameters.csv"), &self.parameters)?;
        Ok(())
    }
}

fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("writing row to {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("flushing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_set_writes_all_tables() {
        let root = std::env::temp_dir().join(format!(
            "punctadf-export-test-{}",
            std::process::id()
        ));
        let run_dir = RunDirectory::create(&root).unwrap();

        let mut set = ExportSet::default();
        set.pixel_indices.push(PixelIndexRow {
            region: "neurite".to_string(),
            index_start: 16,
            index_end: 23,
        });
        set.write(&run_dir).unwrap();

        let written = std::fs::read_to_string(run_dir.file("pixel_indices.csv")).unwrap();
        assert!(written.starts_with("region,index_start,index_end"));
        assert!(written.contains("neurite,16,23"));

        std::fs::remove_dir_all(&root).unwrap();
    }
}
