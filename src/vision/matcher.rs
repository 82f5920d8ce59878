//! Template matching between a grayscale frame and an icon.

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::integral_image::{integral_image, integral_squared_image};
use imageproc::template_matching::{match_template, MatchTemplateMethod};

/// Windows whose summed squared deviation is below this are treated as flat.
const FLAT_VARIANCE: f64 = 1.0;

type Integral = ImageBuffer<Luma<u64>, Vec<u64>>;

/// Scores how well a template appears anywhere in a frame.
pub trait TemplateMatcher: Send + Sync {
    /// Best match score in `[0, 1]`.
    fn match_template(&self, frame: &GrayImage, template: &GrayImage) -> f64;
}

/// Zero-mean normalized cross-correlation, best location wins.
///
/// Both the template and each frame window have their mean removed before
/// correlating, so a uniform background never matches a textured icon.
/// Flat windows and flat templates score 0.0.
#[derive(Debug, Default, Clone, Copy)]
pub struct NccMatcher;

impl TemplateMatcher for NccMatcher {
    fn match_template(&self, frame: &GrayImage, template: &GrayImage) -> f64 {
        let (tw, th) = template.dimensions();
        if tw == 0 || th == 0 || tw > frame.width() || th > frame.height() {
            return 0.0;
        }

        let n = (tw * th) as f64;
        let t_mean = template.pixels().map(|p| p[0] as f64).sum::<f64>() / n;
        let t_var: f64 = template
            .pixels()
            .map(|p| (p[0] as f64 - t_mean).powi(2))
            .sum();
        if t_var < FLAT_VARIANCE {
            return 0.0;
        }

        // sum(I * T) per window; the window sums come from integral images
        let cross = match_template(frame, template, MatchTemplateMethod::CrossCorrelation);
        let sums: Integral = integral_image(frame);
        let squares: Integral = integral_squared_image(frame);

        let mut best = 0.0_f64;
        for (x, y, corr) in cross.enumerate_pixels() {
            let sum = window_sum(&sums, x, y, tw, th) as f64;
            let sum_sq = window_sum(&squares, x, y, tw, th) as f64;
            let f_var = sum_sq - sum * sum / n;
            if f_var < FLAT_VARIANCE {
                continue;
            }
            let score = (corr[0] as f64 - t_mean * sum) / (f_var * t_var).sqrt();
            if score > best {
                best = score;
            }
        }
        if best.is_nan() { 0.0 } else { best.clamp(0.0, 1.0) }
    }
}

/// Sum over the `w`x`h` window at `(x, y)` of an integral image with a
/// leading zero row and column.
fn window_sum(integral: &Integral, x: u32, y: u32, w: u32, h: u32) -> u64 {
    let at = |x: u32, y: u32| integral.get_pixel(x, y)[0];
    (at(x + w, y + h) + at(x, y)) - (at(x, y + h) + at(x + w, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker(w: u32, h: u32) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| {
            if (x / 2 + y / 3) % 2 == 0 { Luma([30]) } else { Luma([220]) }
        })
    }

    /// Dark square on a light grey background.
    fn button_icon() -> GrayImage {
        GrayImage::from_fn(16, 16, |x, y| {
            if (4..12).contains(&x) && (4..12).contains(&y) { Luma([20]) } else { Luma([230]) }
        })
    }

    #[test]
    fn test_exact_crop_scores_one() {
        let frame = checker(40, 30);
        let template = image::imageops::crop_imm(&frame, 6, 9, 8, 6).to_image();
        let score = NccMatcher.match_template(&frame, &template);
        assert!(score > 0.99, "score was {}", score);
    }

    #[test]
    fn test_blank_screen_does_not_match_icon() {
        let frame = GrayImage::from_pixel(200, 150, Luma([255]));
        let score = NccMatcher.match_template(&frame, &button_icon());
        assert!(score < 0.8, "score was {}", score);
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_icon_found_on_brighter_background() {
        // Same icon pasted into a frame, drawn 20 levels brighter
        let icon = button_icon();
        let mut frame = GrayImage::from_pixel(80, 60, Luma([120]));
        for (x, y, p) in icon.enumerate_pixels() {
            frame.put_pixel(30 + x, 20 + y, Luma([p[0].saturating_add(20)]));
        }
        let score = NccMatcher.match_template(&frame, &icon);
        assert!(score > 0.95, "score was {}", score);
    }

    #[test]
    fn test_flat_template_scores_zero() {
        let frame = checker(20, 20);
        let template = GrayImage::from_pixel(4, 4, Luma([200]));
        assert_eq!(NccMatcher.match_template(&frame, &template), 0.0);
    }

    #[test]
    fn test_template_larger_than_frame_scores_zero() {
        let frame = checker(10, 10);
        let template = checker(20, 5);
        assert_eq!(NccMatcher.match_template(&frame, &template), 0.0);
    }

    #[test]
    fn test_black_on_black_is_not_nan() {
        let frame = GrayImage::new(20, 20);
        let template = GrayImage::new(5, 5);
        let score = NccMatcher.match_template(&frame, &template);
        assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn test_window_sum_matches_direct_sum() {
        let frame = checker(12, 9);
        let sums: Integral = integral_image(&frame);
        let direct: u64 = (2..7)
            .flat_map(|x| (3..7).map(move |y| (x, y)))
            .map(|(x, y)| frame.get_pixel(x, y)[0] as u64)
            .sum();
        assert_eq!(window_sum(&sums, 2, 3, 5, 4), direct);
    }
}
