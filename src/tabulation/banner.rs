//! Geometry of the banner image placed at the top of the generated sheets.
//!
//! The banner occupies the first rows of every sheet, merged across all the
//! columns of the table. With a banner, all the columns get the same width so
//! that the region has the same size on every sheet.
//!
//! The spreadsheet draws an image at its size in pixels times `96 / dpi`, so
//! all the fitting is done on that displayed size.

use image::{GenericImageView, ImageFormat};
use rust_xlsxwriter::Image;

use crate::tabulation::*;

/// The width of every column when a banner is present.
pub const BANNER_COLUMN_WIDTH_PX: u16 = 140;

/// The highest row the spreadsheet format accepts (409 points).
pub const MAX_ROW_HEIGHT_PX: u32 = 545;

pub const MAX_BANNER_ROWS: u32 = 50;

/// The resolution at which an image is drawn at its pixel size.
pub const SCREEN_DPI: f64 = 96.0;

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct BannerOptions {
    /// The total height of the banner region.
    pub height_px: u32,
    /// The number of rows reserved for the banner.
    pub rows: u32,
}

impl Default for BannerOptions {
    fn default() -> Self {
        BannerOptions {
            height_px: 120,
            rows: 4,
        }
    }
}

/// A decoded banner: the original bytes, the dimensions and the resolution of the image.
#[derive(PartialEq, Debug, Clone)]
pub struct BannerImage {
    pub bytes: Vec<u8>,
    pub width_px: u32,
    pub height_px: u32,
    pub width_dpi: f64,
    pub height_dpi: f64,
}

fn effective_dpi(dpi: f64) -> f64 {
    if dpi.is_finite() && dpi > 0.0 {
        dpi
    } else {
        SCREEN_DPI
    }
}

impl BannerImage {
    /// The size at which the spreadsheet draws the image when it is not scaled.
    pub fn display_size(&self) -> (f64, f64) {
        (
            self.width_px as f64 * SCREEN_DPI / effective_dpi(self.width_dpi),
            self.height_px as f64 * SCREEN_DPI / effective_dpi(self.height_dpi),
        )
    }
}

/// Validates a PNG or JPEG image and reads its dimensions and resolution.
pub fn load_banner(bytes: Vec<u8>) -> TabResult<BannerImage> {
    let format = image::guess_format(&bytes).context(BannerSnafu {})?;
    ensure!(
        matches!(format, ImageFormat::Png | ImageFormat::Jpeg),
        UnsupportedBannerSnafu {
            format: format!("{:?}", format)
        }
    );
    let decoded = image::load_from_memory_with_format(&bytes, format).context(BannerSnafu {})?;
    let (width_px, height_px) = decoded.dimensions();
    ensure_whatever!(
        width_px > 0 && height_px > 0,
        "the banner image is empty ({}x{})",
        width_px,
        height_px
    );
    // The resolution, as the spreadsheet writer reads it from the file.
    let xlsx_image = Image::new_from_buffer(&bytes).context(WorkbookSnafu {})?;
    let (width_dpi, height_dpi) = (xlsx_image.width_dpi(), xlsx_image.height_dpi());
    debug!(
        "load_banner: {:?} {}x{} at {}x{} dpi",
        format, width_px, height_px, width_dpi, height_dpi
    );
    Ok(BannerImage {
        bytes,
        width_px,
        height_px,
        width_dpi,
        height_dpi,
    })
}

/// Where the image goes inside the banner region.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct Placement {
    pub scale: f64,
    pub x_offset: u32,
    pub y_offset: u32,
}

/// Scales an image of the given displayed size to fit a region, keeping its
/// aspect ratio and never enlarging it, and centers it.
pub fn fit_image(image_w: f64, image_h: f64, region_w: u32, region_h: u32) -> Placement {
    if !(image_w > 0.0 && image_h > 0.0) {
        return Placement {
            scale: 1.0,
            x_offset: 0,
            y_offset: 0,
        };
    }
    let scale = (region_w as f64 / image_w)
        .min(region_h as f64 / image_h)
        .min(1.0);
    let scaled_w = image_w * scale;
    let scaled_h = image_h * scale;
    Placement {
        scale,
        x_offset: ((region_w as f64 - scaled_w) / 2.0).max(0.0).round() as u32,
        y_offset: ((region_h as f64 - scaled_h) / 2.0).max(0.0).round() as u32,
    }
}

/// Splits a height between rows. The first rows take the remainder.
pub fn split_height(total_px: u32, rows: u32) -> Vec<u16> {
    if rows == 0 {
        return vec![];
    }
    let base = total_px / rows;
    let rem = total_px % rows;
    (0..rows)
        .map(|i| (base + if i < rem { 1 } else { 0 }) as u16)
        .collect()
}

/// The banner, as laid out on every sheet of a workbook.
#[derive(PartialEq, Debug, Clone)]
pub struct BannerLayout {
    pub image: BannerImage,
    pub rows: u32,
    pub height_px: u32,
    pub column_width_px: u16,
}

impl BannerLayout {
    pub fn new(image: BannerImage, options: &BannerOptions) -> TabResult<BannerLayout> {
        ensure_whatever!(options.rows > 0, "the banner needs at least one row");
        ensure_whatever!(
            options.rows <= MAX_BANNER_ROWS,
            "the banner can use at most {} rows, not {}",
            MAX_BANNER_ROWS,
            options.rows
        );
        ensure_whatever!(options.height_px > 0, "the banner height must be positive");
        ensure_whatever!(
            options.height_px <= options.rows.saturating_mul(MAX_ROW_HEIGHT_PX),
            "a banner of {} px does not fit in {} rows",
            options.height_px,
            options.rows
        );
        Ok(BannerLayout {
            image,
            rows: options.rows,
            height_px: options.height_px,
            column_width_px: BANNER_COLUMN_WIDTH_PX,
        })
    }

    pub fn row_heights_px(&self) -> Vec<u16> {
        split_height(self.height_px, self.rows)
    }

    /// The placement of the image over `num_columns` columns.
    pub fn placement(&self, num_columns: u16) -> Placement {
        let region_w = self.column_width_px as u32 * num_columns.max(1) as u32;
        let (image_w, image_h) = self.image.display_size();
        fit_image(image_w, image_h, region_w, self.height_px)
    }
}


#[cfg(test)]
mod tests {
    use super::test_util::{png_bytes, png_bytes_with_resolution};
    use super::*;

    #[test]
    fn wide_image_is_scaled_down() {
        let p = fit_image(2000.0, 200.0, 980, 120);
        assert!((p.scale - 0.49).abs() < 1e-9);
        assert_eq!(p.x_offset, 0);
        // 98 px high, centered in 120 px.
        assert_eq!(p.y_offset, 11);
    }

    #[test]
    fn small_image_is_not_enlarged() {
        let p = fit_image(100.0, 50.0, 980, 120);
        assert_eq!(p.scale, 1.0);
        assert_eq!(p.x_offset, 440);
        assert_eq!(p.y_offset, 35);
    }

    #[test]
    fn heights() {
        assert_eq!(split_height(120, 4), vec![30, 30, 30, 30]);
        assert_eq!(split_height(122, 4), vec![31, 31, 30, 30]);
        assert!(split_height(10, 0).is_empty());
    }

    #[test]
    fn png_banner() {
        let img = load_banner(png_bytes(40, 20)).unwrap();
        assert_eq!((img.width_px, img.height_px), (40, 20));
        let layout = BannerLayout::new(img, &BannerOptions::default()).unwrap();
        assert_eq!(layout.row_heights_px().iter().map(|h| *h as u32).sum::<u32>(), 120);
        let p = layout.placement(7);
        assert_eq!(p.scale, 1.0);
        assert_eq!(p.x_offset, (7 * 140 - 40) / 2);
    }

    #[test]
    fn low_resolution_banner_stays_in_its_rows() {
        // 2835 px/m is 72 dpi: drawn a third larger than its pixel size.
        let img = load_banner(png_bytes_with_resolution(400, 150, 2835)).unwrap();
        assert!((img.width_dpi - 72.0).abs() < 0.1);
        let (display_w, display_h) = img.display_size();
        assert!(display_h > 199.0);
        let layout = BannerLayout::new(img, &BannerOptions::default()).unwrap();
        let p = layout.placement(7);
        assert!(p.scale < 0.61);
        assert!(display_h * p.scale <= 120.0 + 1e-6);
        assert!(display_w * p.scale <= 980.0 + 1e-6);
        assert_eq!(p.y_offset, 0);
        assert_eq!(p.x_offset, 330);
    }

    #[test]
    fn screen_resolution_by_default() {
        let img = load_banner(png_bytes(40, 20)).unwrap();
        assert_eq!(img.display_size(), (40.0, 20.0));
    }

    #[test]
    fn bad_banners() {
        assert!(load_banner(b"not an image".to_vec()).is_err());
        let img = load_banner(png_bytes(4, 4)).unwrap();
        let opts = BannerOptions {
            height_px: 120,
            rows: 0,
        };
        assert!(BannerLayout::new(img.clone(), &opts).is_err());
        let many_rows = BannerOptions {
            height_px: 120,
            rows: u32::MAX,
        };
        assert!(BannerLayout::new(img.clone(), &many_rows).is_err());
        let max_rows = BannerOptions {
            height_px: 120,
            rows: MAX_BANNER_ROWS,
        };
        assert!(BannerLayout::new(img, &max_rows).is_ok());
    }
}
