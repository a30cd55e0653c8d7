//! Skin-colour segmentation inside the face region.
//!
//! A pixel is skin when it passes both an HSV and a YCrCb range filter and
//! lies inside the face mask. Intersecting two colour spaces keeps reddish
//! or brownish non-skin surfaces from slipping through either filter alone.
//! One opening then one closing (3×3) clean up speckle and pinholes.

use image::{GrayImage, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::morphology::{close, open};

use crate::color;
use crate::config::SkinConfig;
use crate::mask::FaceMask;
use crate::raster;

/// Binary skin raster; set pixels are skin-coloured face pixels.
pub fn segment_skin(image: &RgbImage, face: &FaceMask, config: &SkinConfig) -> GrayImage {
    let hsv = color::in_range(image, color::hsv_u8, config.hsv_lower, config.hsv_upper);
    let ycrcb = color::in_range(image, color::ycrcb_u8, config.ycrcb_lower, config.ycrcb_upper);

    let skin = raster::and(&raster::and(&hsv, &ycrcb), face.as_image());
    let cleaned = close(&open(&skin, Norm::LInf, 1), Norm::LInf, 1);

    tracing::debug!(
        hsv = raster::count_set(&hsv),
        ycrcb = raster::count_set(&ycrcb),
        skin = raster::count_set(&cleaned),
        "skin segmentation"
    );
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    const SKIN: Rgb<u8> = Rgb([220, 170, 140]);

    fn full_mask(w: u32, h: u32) -> FaceMask {
        FaceMask::from_raster(GrayImage::from_pixel(w, h, Luma([raster::ON])))
    }

    #[test]
    fn skin_tone_inside_face_is_skin() {
        let image = RgbImage::from_pixel(20, 20, SKIN);
        let skin = segment_skin(&image, &full_mask(20, 20), &SkinConfig::default());
        assert_eq!(raster::count_set(&skin), 400);
    }

    #[test]
    fn gray_and_blue_are_not_skin() {
        let mut image = RgbImage::from_pixel(20, 20, Rgb([128, 128, 128]));
        for y in 0..10 {
            for x in 0..20 {
                image.put_pixel(x, y, Rgb([40, 60, 200]));
            }
        }
        let skin = segment_skin(&image, &full_mask(20, 20), &SkinConfig::default());
        assert_eq!(raster::count_set(&skin), 0);
    }

    #[test]
    fn skin_is_clipped_to_face() {
        let image = RgbImage::from_pixel(20, 20, SKIN);
        let mut face = GrayImage::new(20, 20);
        for y in 5..15 {
            for x in 5..15 {
                face.put_pixel(x, y, Luma([raster::ON]));
            }
        }
        let skin = segment_skin(&image, &FaceMask::from_raster(face), &SkinConfig::default());
        assert_eq!(raster::count_set(&skin), 100);
        assert_eq!(skin.get_pixel(2, 2)[0], 0);
    }

    #[test]
    fn isolated_pixels_are_removed_and_pinholes_filled() {
        let mut image = RgbImage::from_pixel(30, 30, Rgb([128, 128, 128]));
        // Lone skin pixel in a non-skin area.
        image.put_pixel(3, 3, SKIN);
        // Skin block with a one-pixel non-skin hole.
        for y in 10..25 {
            for x in 10..25 {
                image.put_pixel(x, y, SKIN);
            }
        }
        image.put_pixel(17, 17, Rgb([128, 128, 128]));

        let skin = segment_skin(&image, &full_mask(30, 30), &SkinConfig::default());
        assert_eq!(skin.get_pixel(3, 3)[0], 0);
        assert_eq!(skin.get_pixel(17, 17)[0], raster::ON);
        assert_eq!(skin.get_pixel(12, 12)[0], raster::ON);
    }
}
