//! Photo preparation for embedding in the work-order PDF.
//!
//! Everything drawn in the PDF is re-encoded here as a baseline RGB JPEG, so
//! the image XObjects can always declare `DeviceRGB`.

use std::io::Cursor;

use image::{
    codecs::jpeg::JpegEncoder, metadata::Orientation, DynamicImage, ImageDecoder, ImageReader,
    Rgb, RgbImage,
};
use thiserror::Error;
use tracing::debug;

/// Longest side of a photo drawn in the PDF, in pixels.
pub const PDF_PHOTO_MAX_SIDE: u32 = 950;

/// Size a PDF photo is compressed towards, in KiB.
pub const PDF_PHOTO_TARGET_KB: usize = 220;

const START_QUALITY: u8 = 70;
const MIN_QUALITY: u8 = 50;
const QUALITY_STEP: u8 = 5;

const LOGO_MAX_SIDE: u32 = 1200;
const LOGO_QUALITY: u8 = 92;

#[derive(Debug, Error)]
pub enum PhotoError {
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A baseline RGB JPEG ready to be placed in the PDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedImage {
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl PreparedImage {
    fn encode(rgb: &RgbImage, quality: u8) -> Result<Self, PhotoError> {
        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, quality).encode_image(rgb)?;
        Ok(Self {
            jpeg,
            width: rgb.width(),
            height: rgb.height(),
        })
    }
}

/// Decodes `bytes` and applies the EXIF orientation.
fn decode_upright(bytes: &[u8]) -> Result<DynamicImage, PhotoError> {
    let mut decoder = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .into_decoder()?;
    let orientation = decoder
        .orientation()
        .unwrap_or(Orientation::NoTransforms);

    let mut img = DynamicImage::from_decoder(decoder)?;
    img.apply_orientation(orientation);
    Ok(img)
}

fn fit_within(img: DynamicImage, max_side: u32) -> DynamicImage {
    if img.width() > max_side || img.height() > max_side {
        img.thumbnail(max_side, max_side)
    } else {
        img
    }
}

fn shrink(bytes: &[u8], max_side: u32, target_kb: usize) -> Result<PreparedImage, PhotoError> {
    let rgb = fit_within(decode_upright(bytes)?, max_side).to_rgb8();

    let target = target_kb * 1024;
    let mut quality = START_QUALITY;
    let mut out = PreparedImage::encode(&rgb, quality)?;
    while out.jpeg.len() > target && quality > MIN_QUALITY {
        quality = quality.saturating_sub(QUALITY_STEP).max(MIN_QUALITY);
        out = PreparedImage::encode(&rgb, quality)?;
    }
    Ok(out)
}

/// Downscales and recompresses a photo.
///
/// Returns JPEG bytes no larger than `max_side` on either side, recompressed
/// from quality 70 down to 50 until under `target_kb`. When the input cannot
/// be decoded the original bytes are returned unchanged.
pub fn shrink_for_pdf(bytes: &[u8], max_side: u32, target_kb: usize) -> Vec<u8> {
    match shrink(bytes, max_side, target_kb) {
        Ok(prepared) => prepared.jpeg,
        Err(e) => {
            debug!(error = %e, size = bytes.len(), "Photo not decodable, passing through");
            bytes.to_vec()
        }
    }
}

/// Shrinks a photo for the PDF grid.
///
/// `None` when the photo cannot be decoded; undecodable bytes are never
/// embedded as they are.
pub fn prepare_for_pdf(bytes: &[u8]) -> Option<PreparedImage> {
    shrink(bytes, PDF_PHOTO_MAX_SIDE, PDF_PHOTO_TARGET_KB)
        .inspect_err(|e| debug!(error = %e, size = bytes.len(), "Photo cannot be embedded"))
        .ok()
}

/// Bounding box `(x, y, width, height)` of the pixels that are not fully
/// transparent, or `None` when every pixel is.
fn opaque_bounds(img: &DynamicImage) -> Option<(u32, u32, u32, u32)> {
    let rgba = img.to_rgba8();
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, pixel) in rgba.enumerate_pixels() {
        if pixel[3] == 0 {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }
    bounds.map(|(x0, y0, x1, y1)| (x0, y0, x1 - x0 + 1, y1 - y0 + 1))
}

/// Composites the image onto a white background.
fn flatten_on_white(img: &DynamicImage) -> RgbImage {
    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let blend = |c: u8| {
            let (c, a) = (u32::from(c), u32::from(a));
            // (c * a + 255 * (255 - a)) / 255 never exceeds 255
            ((c * a + 255 * (255 - a) + 127) / 255) as u8
        };
        Rgb([blend(r), blend(g), blend(b)])
    })
}

/// Prepares the header logo.
///
/// Transparent borders are cropped away and the remaining transparency is
/// flattened onto white, matching the white page behind it. The logo is kept
/// up to 1200px and encoded at high quality.
pub fn prepare_logo(bytes: &[u8]) -> Option<PreparedImage> {
    let img = match decode_upright(bytes) {
        Ok(img) => img,
        Err(e) => {
            debug!(error = %e, "Logo not decodable");
            return None;
        }
    };

    let img = if img.color().has_alpha() {
        match opaque_bounds(&img) {
            Some((x, y, width, height)) => img.crop_imm(x, y, width, height),
            None => img,
        }
    } else {
        img
    };

    let rgb = flatten_on_white(&fit_within(img, LOGO_MAX_SIDE));
    PreparedImage::encode(&rgb, LOGO_QUALITY).ok()
}

#[cfg(test)]
mod tests {
    use image::{ColorType, GrayImage, ImageBuffer, ImageFormat, Luma, Rgba, RgbaImage};

    use super::*;

    fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), format).unwrap();
        out
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        });
        encode(DynamicImage::ImageRgb8(img), ImageFormat::Png)
    }

    fn decoded(jpeg: &[u8]) -> DynamicImage {
        assert_eq!(image::guess_format(jpeg).unwrap(), ImageFormat::Jpeg);
        image::load_from_memory(jpeg).unwrap()
    }

    #[test]
    fn test_shrink_downscales_and_outputs_jpeg() {
        let png = png_bytes(2000, 1000);
        let img = decoded(&shrink_for_pdf(&png, 950, 220));
        assert_eq!((img.width(), img.height()), (950, 475));
    }

    #[test]
    fn test_shrink_never_upscales() {
        let prepared = prepare_for_pdf(&png_bytes(40, 30)).unwrap();
        assert_eq!((prepared.width, prepared.height), (40, 30));
    }

    #[test]
    fn test_undecodable_bytes_pass_through_but_are_not_embedded() {
        let junk = b"definitely not an image".to_vec();
        assert_eq!(shrink_for_pdf(&junk, 950, 220), junk);
        assert!(prepare_for_pdf(&junk).is_none());

        // A JPEG start marker followed by garbage is still not embeddable.
        let broken = [&[0xff, 0xd8, 0xff, 0xe0][..], b"garbage"].concat();
        assert!(prepare_for_pdf(&broken).is_none());
    }

    #[test]
    fn test_grayscale_jpeg_is_reencoded_as_rgb() {
        let gray = GrayImage::from_pixel(64, 48, Luma([120]));
        let jpeg = encode(DynamicImage::ImageLuma8(gray), ImageFormat::Jpeg);

        let prepared = prepare_for_pdf(&jpeg).unwrap();
        assert_eq!((prepared.width, prepared.height), (64, 48));
        assert_eq!(decoded(&prepared.jpeg).color(), ColorType::Rgb8);
    }

    #[test]
    fn test_logo_crops_transparent_border_and_flattens() {
        // 100x60 canvas, opaque red block at (20, 10) sized 40x30.
        let logo = RgbaImage::from_fn(100, 60, |x, y| {
            if (20..60).contains(&x) && (10..40).contains(&y) {
                Rgba([200, 0, 0, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        });
        let png = encode(DynamicImage::ImageRgba8(logo), ImageFormat::Png);

        let prepared = prepare_logo(&png).unwrap();
        assert_eq!((prepared.width, prepared.height), (40, 30));
        assert_eq!(decoded(&prepared.jpeg).color(), ColorType::Rgb8);
    }

    #[test]
    fn test_flatten_on_white() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                Rgba([0, 0, 0, 0])
            } else {
                Rgba([10, 20, 30, 255])
            }
        }));
        let flat = flatten_on_white(&img);
        assert_eq!(flat.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(flat.get_pixel(1, 0), &Rgb([10, 20, 30]));
    }

    #[test]
    fn test_opaque_bounds_of_transparent_image() {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(4, 4));
        assert_eq!(opaque_bounds(&img), None);
    }
}
