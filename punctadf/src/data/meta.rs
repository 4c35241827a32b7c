use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use csv::StringRecord;

use punctacore::data::image::{BandSpec, RowRange};

/// Acquisition metadata for one image, joined from the prep's imaging
/// metadata sheet.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageMeta {
    pub image_name: String,
    pub acquisition_date: String,
    pub strain: String,
    pub tiv: String,
    pub pattern_geom: String,
    pub surface_proteins: String,
}

/// Imaging metadata sheet for one prep: per-image acquisition records plus
/// the microscope calibration factor.
#[derive(Clone, Debug)]
pub struct ImagingMetadata {
    /// Physical distance per pixel in microns.
    pub calibration_um_per_px: f64,
    entries: BTreeMap<String, ImageMeta>,
}

impl ImagingMetadata {
    /// Looks up the acquisition record for an image by its original regional
    /// image name.
    pub fn lookup(&self, image_name: &str) -> Option<&ImageMeta> {
        self.entries.get(image_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Neurite-set metadata sheet: the line scan width and the tally of excluded
/// neurites by reason.
#[derive(Clone, Debug, PartialEq)]
pub struct NeuriteSetMetadata {
    /// Total row count of each cropped line scan.
    pub line_width: usize,
    pub exclusions: BTreeMap<String, usize>,
}

/// Normalizes a CSV header the way the metadata sheets are written by hand:
/// trimmed, lowercased, spaces to underscores, parentheses stripped.
fn normalize_header(header: &str) -> String {
    header
        .trim()
        .to_lowercase()
        .replace(' ', "_")
        .replace(['(', ')'], "")
}

fn column_index(headers: &StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| normalize_header(h) == name)
        .with_context(|| format!("metadata sheet missing '{}' column", name))
}

fn field(record: &StringRecord, index: usize) -> String {
    record.get(index).unwrap_or("").trim().to_string()
}

/// Reads the prep imaging metadata CSV (`<prep>.MetaD.IM.csv`).
pub fn read_imaging_metadata(path: &Path) -> Result<ImagingMetadata> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening imaging metadata {}", path.display()))?;
    let headers = reader.headers().context("reading metadata headers")?.clone();

    let name_idx = column_index(&headers, "image_name")?;
    let date_idx = column_index(&headers, "acquisition_date")?;
    let strain_idx = column_index(&headers, "strain")?;
    let tiv_idx = column_index(&headers, "tiv")?;
    let geom_idx = column_index(&headers, "pattern_geom")?;
    let proteins_idx = column_index(&headers, "surface_proteins")?;
    let calibration_idx = column_index(&headers, "calibration_um/pix")?;

    let mut calibration = None;
    let mut entries = BTreeMap::new();
    for (row, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("imaging metadata row {}", row))?;
        let image_name = field(&record, name_idx);
        if image_name.is_empty() {
            continue;
        }
        if calibration.is_none() {
            let raw = field(&record, calibration_idx);
            let value: f64 = raw
                .parse()
                .with_context(|| format!("row {}: calibration '{}' is not a number", row, raw))?;
            calibration = Some(value);
        }
        entries.insert(
            image_name.clone(),
            ImageMeta {
                image_name,
                acquisition_date: field(&record, date_idx),
                strain: field(&record, strain_idx),
                tiv: field(&record, tiv_idx),
                pattern_geom: field(&record, geom_idx),
                surface_proteins: field(&record, proteins_idx),
            },
        );
    }

    let calibration_um_per_px =
        calibration.context("imaging metadata sheet holds no rows")?;
    Ok(ImagingMetadata {
        calibration_um_per_px,
        entries,
    })
}

/// Reads the neurite-set metadata CSV (`<prep>.MetaD.<ns>.csv`).
pub fn read_neurite_set_metadata(path: &Path) -> Result<NeuriteSetMetadata> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening neurite set metadata {}", path.display()))?;
    let headers = reader.headers().context("reading metadata headers")?.clone();

    let width_idx = column_index(&headers, "line_width")?;
    let exclusion_idx = column_index(&headers, "exclusion_reason")?;

    let mut line_width = None;
    let mut exclusions: BTreeMap<String, usize> = BTreeMap::new();
    for (row, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("neurite set metadata row {}", row))?;
        if line_width.is_none() {
            let raw = field(&record, width_idx);
            let value: usize = raw
                .parse()
                .with_context(|| format!("row {}: line width '{}' is not an integer", row, raw))?;
            line_width = Some(value);
        }
        let reason = field(&record, exclusion_idx);
        if !reason.is_empty() {
            *exclusions.entry(reason).or_insert(0) += 1;
        }
    }

    let line_width = line_width.context("neurite set metadata sheet holds no rows")?;
    Ok(NeuriteSetMetadata {
        line_width,
        exclusions,
    })
}

/// Derives the band configuration from the line width and calibration: the
/// background bands are the top and bottom quarter of the line, the neurite
/// band is `round(1 / um_per_px)` rows centered in the line.
pub fn derive_bands(line_width: usize, um_per_px: f64) -> Result<BandSpec> {
    let background_size = line_width / 4;
    let neurite_size = (1.0 / um_per_px).round() as usize;
    if background_size == 0 || neurite_size == 0 {
        bail!(
            "line width {} and calibration {} give degenerate bands",
            line_width,
            um_per_px
        );
    }
    if neurite_size + 2 * background_size > line_width {
        bail!(
            "line width {} cannot hold a {}-row neurite band between two {}-row background bands",
            line_width,
            neurite_size,
            background_size
        );
    }
    let neurite_start = (line_width - neurite_size) / 2;

    let bands = BandSpec::new(
        [
            RowRange::new(0, background_size - 1),
            RowRange::new(line_width - background_size, line_width - 1),
        ],
        RowRange::new(neurite_start, neurite_start + neurite_size - 1),
    )?;
    Ok(bands)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn temp_sheet(test: &str, contents: &str) -> (PathBuf, PathBuf) {
        let dir = std::env::temp_dir().join(format!(
            "punctadf-meta-{}-{}",
            test,
            std::process::id()
        ));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("sheet.csv");
        fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn test_read_imaging_metadata_joins_rows() {
        let (dir, path) = temp_sheet(
            "imaging",
            "Image Name, Acquisition Date ,Strain,TIV,Pattern Geom,Surface Proteins, Calibration (um/pix) \n\
             IM_001,2020-03-15,GN212,juvenile,grid,SDS-PLL,0.126\n\
             IM_002,2020-03-16,GN213,adult,lines,PLL,0.126\n",
        );

        let imaging = read_imaging_metadata(&path).unwrap();
        assert_eq!(imaging.len(), 2);
        assert!((imaging.calibration_um_per_px - 0.126).abs() < 1e-12);

        let meta = imaging.lookup("IM_001").unwrap();
        assert_eq!(meta.acquisition_date, "2020-03-15");
        assert_eq!(meta.strain, "GN212");
        assert_eq!(meta.tiv, "juvenile");
        assert_eq!(meta.pattern_geom, "grid");
        assert_eq!(meta.surface_proteins, "SDS-PLL");
        assert!(imaging.lookup("IM_404").is_none());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_read_imaging_metadata_rejects_bad_calibration() {
        let (dir, path) = temp_sheet(
            "bad-calibration",
            "Image Name,Acquisition Date,Strain,TIV,Pattern Geom,Surface Proteins,Calibration (um/pix)\n\
             IM_001,2020-03-15,GN212,juvenile,grid,SDS-PLL,fast\n",
        );

        let result = read_imaging_metadata(&path);
        assert!(result.is_err());
        assert!(format!("{:#}", result.unwrap_err()).contains("not a number"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_read_imaging_metadata_missing_column() {
        let (dir, path) = temp_sheet(
            "missing-column",
            "Image Name,Strain\nIM_001,GN212\n",
        );

        let result = read_imaging_metadata(&path);
        assert!(result.is_err());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_read_neurite_set_metadata_tallies_exclusions() {
        // Blank exclusion cells mean the neurite was kept and are not tallied
        let (dir, path) = temp_sheet(
            "neurite-set",
            "Neurite,Line Width,Exclusion Reason\n\
             N_01,40,\n\
             N_02,40,Bipolar\n\
             N_03,40,Bipolar\n\
             N_04,40,No neurites\n",
        );

        let ns_meta = read_neurite_set_metadata(&path).unwrap();
        assert_eq!(ns_meta.line_width, 40);
        assert_eq!(ns_meta.exclusions.len(), 2);
        assert_eq!(ns_meta.exclusions["Bipolar"], 2);
        assert_eq!(ns_meta.exclusions["No neurites"], 1);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header(" Calibration (um/pix) "), "calibration_um/pix");
        assert_eq!(normalize_header("Image Name"), "image_name");
        assert_eq!(normalize_header("strain"), "strain");
    }

    #[test]
    fn test_derive_bands_official_resolution() {
        // um/px = 0.126 -> neurite band of 8 rows centered in a 40-row line
        let bands = derive_bands(40, 0.126).unwrap();
        assert_eq!(bands.background[0], RowRange::new(0, 9));
        assert_eq!(bands.neurite, RowRange::new(16, 23));
        assert_eq!(bands.background[1], RowRange::new(30, 39));
    }

    #[test]
    fn test_derive_bands_legacy_resolution() {
        // um/px = 0.252 -> neurite band of 4 rows
        let bands = derive_bands(20, 0.252).unwrap();
        assert_eq!(bands.background[0], RowRange::new(0, 4));
        assert_eq!(bands.neurite, RowRange::new(8, 11));
        assert_eq!(bands.background[1], RowRange::new(15, 19));
    }

    #[test]
    fn test_derive_bands_rejects_narrow_line() {
        assert!(derive_bands(8, 0.126).is_err());
    }
}
