use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use log::{info, warn};
use regex::Regex;

use punctacore::algorithm::pipeline::analyze_images;
use punctacore::data::image::IntensityImage;

use crate::data::export::{
    AnalysisRow, DataRow, ExclusionRow, ExportSet, IpdRow, ParameterRow, PeakRow,
    PixelIndexRow, RowMeta,
};
use crate::data::image::load_channel;
use crate::data::meta::{derive_bands, read_imaging_metadata, read_neurite_set_metadata, ImageMeta};
use crate::data::run::{RunConfig, RunDirectory};

/// Outcome of one batch run.
#[derive(Clone, Debug)]
pub struct BatchSummary {
    pub run_dir: PathBuf,
    pub analyzed: usize,
    pub skipped: usize,
}

/// Runs the full batch: metadata join, per-image pipeline, CSV export.
///
/// Images missing from the imaging metadata sheet, failing to load, or
/// failing analysis are logged and skipped; the rest of the batch continues.
pub fn run(config: &RunConfig) -> Result<BatchSummary> {
    let imaging = read_imaging_metadata(&config.imaging_metadata_file())?;
    let ns_meta = read_neurite_set_metadata(&config.ns_metadata_file())?;
    let calibration = imaging.calibration_um_per_px;
    let bands = derive_bands(ns_meta.line_width, calibration)?;

    let run_dir = RunDirectory::create(&config.output_root)?;
    run_dir.write_readme(&config.prep_id, &config.note)?;
    info!(
        "analysis run {} for {}/{} ({} channel, {} um/px, {} images on the metadata sheet)",
        run_dir.timestamp,
        config.prep_id,
        config.ns_id,
        config.channel,
        calibration,
        imaging.len()
    );

    // One entry per loadable image with known metadata; the matrices are fed
    // to the analysis pool as one batch.
    let mut jobs: Vec<(String, ImageMeta)> = Vec::new();
    let mut images: Vec<IntensityImage> = Vec::new();
    let mut skipped = 0usize;

    for file_name in list_channel_images(config)? {
        let image_name = image_name_from_file(&file_name);
        let Some(meta) = imaging.lookup(image_name) else {
            warn!(
                "image file {} is not in the imaging metadata sheet, excluded from analysis",
                file_name
            );
            skipped += 1;
            continue;
        };
        match load_channel(&config.images_dir().join(&file_name), config.channel) {
            Ok(image) if image.nrows() <= bands.max_row() => {
                warn!(
                    "skipping {}: {} rows cannot hold the {}-row band layout",
                    file_name,
                    image.nrows(),
                    bands.max_row() + 1
                );
                skipped += 1;
            }
            Ok(image) => {
                jobs.push((file_name, meta.clone()));
                images.push(image);
            }
            Err(err) => {
                warn!("skipping {}: {:#}", file_name, err);
                skipped += 1;
            }
        }
    }

    let results = analyze_images(&images, &bands, calibration, config.num_threads);

    let mut export = ExportSet::default();
    let mut analyzed = 0usize;
    for ((file_name, meta), result) in jobs.into_iter().zip(results) {
        let analysis = match result {
            Ok(analysis) => analysis,
            Err(err) => {
                warn!("skipping {}: {}", file_name, err);
                skipped += 1;
                continue;
            }
        };
        let row_meta = RowMeta {
            date: meta.acquisition_date.clone(),
            image_id: file_name,
            prep_id: config.prep_id.clone(),
            strain: meta.strain.clone(),
            ns_id: config.ns_id.clone(),
            tiv: meta.tiv.clone(),
            pattern_geom: meta.pattern_geom.clone(),
            surface_proteins: meta.surface_proteins.clone(),
        };
        append_image_rows(&mut export, &row_meta, &analysis);
        analyzed += 1;
    }

    export.pixel_indices = pixel_index_rows(&bands);
    export.exclusions = ns_meta
        .exclusions
        .iter()
        .map(|(reason, count)| ExclusionRow {
            exclusion_reason: reason.clone(),
            count: *count,
        })
        .collect();
    let now = Local::now();
    export.parameters.push(ParameterRow {
        date_of_analysis: now.format("%Y-%m-%d").to_string(),
        time_of_analysis: now.format("%H:%M:%S").to_string(),
        microns_per_pixel: calibration,
        tool: format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
    });
    export.write(&run_dir)?;

    info!(
        "analyzed {} images, skipped {}, results in {}",
        analyzed,
        skipped,
        run_dir.path.display()
    );
    Ok(BatchSummary {
        run_dir: run_dir.path,
        analyzed,
        skipped,
    })
}

/// Sorted file names in the image directory carrying the channel tag,
/// `*.<tag>.tif` or `*.<tag>.tiff`.
fn list_channel_images(config: &RunConfig) -> Result<Vec<String>> {
    let pattern = Regex::new(&format!(
        r"\.{}\.tiff?$",
        regex::escape(config.channel.file_tag())
    ))
    .expect("channel file pattern is valid");

    let dir = config.images_dir();
    let mut files = Vec::new();
    for entry in
        fs::read_dir(&dir).with_context(|| format!("reading image directory {}", dir.display()))?
    {
        let entry = entry.with_context(|| format!("reading image directory {}", dir.display()))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if pattern.is_match(&name) {
            files.push(name);
        }
    }
    files.sort();
    Ok(files)
}

/// Original regional image name as recorded in the imaging metadata sheet:
/// everything before the crop marker in the cropped file name.
fn image_name_from_file(file_name: &str) -> &str {
    file_name.split(".C").next().unwrap_or(file_name)
}

fn append_image_rows(
    export: &mut ExportSet,
    meta: &RowMeta,
    analysis: &punctacore::algorithm::pipeline::ProfileAnalysis,
) {
    let profile = &analysis.profile;
    for col in 0..profile.len() {
        export.data.push(DataRow::new(
            meta,
            analysis.distance[col],
            analysis.normalized_distance[col],
            profile.raw[col],
            profile.background[col],
            profile.signal[col],
            profile.mean_normalized[col],
            profile.max_normalized[col],
        ));
    }

    for punctum in &analysis.puncta {
        export.peaks.push(PeakRow::new(
            meta,
            punctum.distance,
            punctum.normalized_distance,
            punctum.max_intensity,
            punctum.normalized_max_intensity,
            punctum.width,
        ));
    }

    let neurite_length = analysis.summary.neurite_length;
    for interval in &analysis.intervals {
        export.ipds.push(IpdRow::new(
            meta,
            interval.position,
            interval.position / neurite_length,
            interval.value,
        ));
    }

    let summary = &analysis.summary;
    let threshold = &analysis.threshold;
    export.analysis.push(AnalysisRow {
        date: meta.date.clone(),
        image_id: meta.image_id.clone(),
        prep_id: meta.prep_id.clone(),
        strain: meta.strain.clone(),
        ns_id: meta.ns_id.clone(),
        tiv: meta.tiv.clone(),
        pattern_geom: meta.pattern_geom.clone(),
        surface_proteins: meta.surface_proteins.clone(),
        image_size: summary.image_columns,
        max_neurite_length: summary.neurite_length,
        average_neurite_intensity: summary.mean_signal,
        total_peaks: summary.total_peaks,
        average_peaks_per_micron: summary.peaks_per_micron,
        average_peak_intensity: summary.mean_peak_intensity,
        average_peak_width: summary.mean_peak_width,
        average_ipd: summary.mean_ipd,
        median_ipd: summary.median_ipd,
        q_th: threshold.q3,
        ss_mean: threshold.subset_mean,
        ss_median: threshold.subset_median,
        ss_std: threshold.subset_std,
        ss_n: threshold.subset_n,
        min_height: threshold.min_height,
        prominence: threshold.prominence_cutoff,
    });
}

fn pixel_index_rows(bands: &punctacore::data::image::BandSpec) -> Vec<PixelIndexRow> {
    vec![
        PixelIndexRow {
            region: "background_1".to_string(),
            index_start: bands.background[0].start,
            index_end: bands.background[0].end,
        },
        PixelIndexRow {
            region: "neurite".to_string(),
            index_start: bands.neurite.start,
            index_end: bands.neurite.end,
        },
        PixelIndexRow {
            region: "background_2".to_string(),
            index_start: bands.background[1].start,
            index_end: bands.background[1].end,
        },
    ]
}
