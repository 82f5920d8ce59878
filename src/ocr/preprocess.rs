use image::{DynamicImage, GrayImage};

/// Calculates the average brightness of a grayscale image.
///
/// Returns a value from 0.0 (black) to 255.0 (white).
pub fn calculate_brightness(img: &GrayImage) -> f32 {
    if img.width() == 0 || img.height() == 0 {
        return 0.0;
    }

    let total: f64 = img.pixels().map(|p| p[0] as f64).sum();
    let pixel_count = (img.width() as f64) * (img.height() as f64);

    (total / pixel_count) as f32
}

/// Converts a frame into the grayscale image handed to Tesseract.
///
/// Tesseract expects dark text on a light background, so frames that are
/// mostly dark (dark-mode UIs) are inverted.
pub fn prepare_for_ocr(frame: &DynamicImage) -> GrayImage {
    let mut gray = frame.to_luma8();
    if calculate_brightness(&gray) < 128.0 {
        image::imageops::invert(&mut gray);
    }
    gray
}
