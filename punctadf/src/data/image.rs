use std::fmt;
use std::fmt::{Display, Formatter};
use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;

use punctacore::data::image::IntensityImage;

/// Color channel of the cropped neurite images.
///
/// The channel index follows RGB sample order; the file tag is the channel
/// marker embedded in cropped image file names (`JN0` for green, `JN1` for
/// red).
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Channel {
    Red,
    Green,
}

impl Channel {
    pub fn sample_index(&self) -> usize {
        match self {
            Channel::Red => 0,
            Channel::Green => 1,
        }
    }

    pub fn file_tag(&self) -> &'static str {
        match self {
            Channel::Red => "JN1",
            Channel::Green => "JN0",
        }
    }
}

impl Display for Channel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Red => write!(f, "red"),
            Channel::Green => write!(f, "green"),
        }
    }
}

/// Loads one color channel of an image file as an intensity matrix.
///
/// Rows of the returned image are spatial positions across the line scan,
/// columns run along the neurite axis. 16-bit scans keep their native sample
/// range; everything else is read as 8-bit.
pub fn load_channel(path: &Path, channel: Channel) -> Result<IntensityImage> {
    let decoded = image::open(path)
        .with_context(|| format!("opening image {}", path.display()))?;

    let index = channel.sample_index();
    let (width, height, samples) = match &decoded {
        image::DynamicImage::ImageLuma16(_)
        | image::DynamicImage::ImageLumaA16(_)
        | image::DynamicImage::ImageRgb16(_)
        | image::DynamicImage::ImageRgba16(_) => {
            let buffer = decoded.to_rgb16();
            let (width, height) = buffer.dimensions();
            let mut samples = Vec::with_capacity((width * height) as usize);
            for y in 0..height {
                for x in 0..width {
                    samples.push(buffer.get_pixel(x, y)[index] as f64);
                }
            }
            (width, height, samples)
        }
        _ => {
            let buffer = decoded.to_rgb8();
            let (width, height) = buffer.dimensions();
            let mut samples = Vec::with_capacity((width * height) as usize);
            for y in 0..height {
                for x in 0..width {
                    samples.push(buffer.get_pixel(x, y)[index] as f64);
                }
            }
            (width, height, samples)
        }
    };

    IntensityImage::from_row_major(height as usize, width as usize, samples)
        .with_context(|| format!("building intensity matrix for {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_mapping() {
        assert_eq!(Channel::Green.sample_index(), 1);
        assert_eq!(Channel::Red.sample_index(), 0);
        assert_eq!(Channel::Green.file_tag(), "JN0");
        assert_eq!(Channel::Red.file_tag(), "JN1");
    }

    fn temp_image_dir(test: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "punctadf-image-{}-{}",
            test,
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_load_channel_keeps_16_bit_range() {
        let dir = temp_image_dir("deep");
        let path = dir.join("scan.png");
        // Green samples above 255 must survive the decode unchanged
        let buffer = image::ImageBuffer::from_fn(3, 2, |x, y| {
            image::Rgb([0u16, 1000 + 100 * x as u16 + 10 * y as u16, 0u16])
        });
        buffer.save(&path).unwrap();

        let loaded = load_channel(&path, Channel::Green).unwrap();
        assert_eq!(loaded.data.nrows(), 2);
        assert_eq!(loaded.data.ncols(), 3);
        assert_eq!(loaded.data[(0, 0)], 1000.0);
        assert_eq!(loaded.data[(1, 2)], 1210.0);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_load_channel_reads_8_bit_samples() {
        let dir = temp_image_dir("shallow");
        let path = dir.join("scan.png");
        let buffer = image::ImageBuffer::from_fn(2, 2, |x, y| {
            image::Rgb([40u8 + 10 * x as u8 + y as u8, 0u8, 0u8])
        });
        buffer.save(&path).unwrap();

        let loaded = load_channel(&path, Channel::Red).unwrap();
        assert_eq!(loaded.data[(0, 0)], 40.0);
        assert_eq!(loaded.data[(1, 1)], 51.0);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
