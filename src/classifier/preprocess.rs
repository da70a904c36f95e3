use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use ndarray::Array4;

use super::error::ClassifierError;
use crate::models::BackboneCharacteristics;

/// Decodes uploaded bytes into an image, forcing 3-channel color.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, ClassifierError> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| ClassifierError::DecodeError(e.to_string()))?;
    Ok(DynamicImage::ImageRgb8(image.to_rgb8()))
}

/// The preprocessing a backbone's weights were trained with: resize to a
/// fixed square, then per-channel normalization of [0, 1] pixel values.
///
/// Produces NCHW tensors ready for the backbone session.
#[derive(Debug, Clone)]
pub struct ImageTransform {
    size: u32,
    mean: [f32; 3],
    std: [f32; 3],
}

impl ImageTransform {
    pub fn new(size: u32, mean: [f32; 3], std: [f32; 3]) -> Self {
        Self { size, mean, std }
    }

    pub fn from_characteristics(characteristics: &BackboneCharacteristics) -> Self {
        Self::new(
            characteristics.image_size,
            characteristics.mean,
            characteristics.std,
        )
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Applies the transform, accepting any nonzero pixel dimensions on input.
    pub fn apply(&self, image: &DynamicImage) -> Result<Array4<f32>, ClassifierError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(ClassifierError::ValidationError(
                "Image has zero pixel dimensions".to_string(),
            ));
        }

        let resized = image.resize_exact(self.size, self.size, FilterType::CatmullRom);
        let rgb = resized.to_rgb8();

        let side = self.size as usize;
        let mut pixels = Array4::<f32>::zeros((1, 3, side, side));
        for (x, y, pixel) in rgb.enumerate_pixels() {
            for channel in 0..3 {
                let value = pixel[channel] as f32 / 255.0;
                pixels[[0, channel, y as usize, x as usize]] =
                    (value - self.mean[channel]) / self.std[channel];
            }
        }
        Ok(pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::io::Cursor;

    fn solid_image(width: u32, height: u32, rgb: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(rgb)))
    }

    fn imagenet_transform() -> ImageTransform {
        ImageTransform::new(224, [0.485, 0.456, 0.406], [0.229, 0.224, 0.225])
    }

    #[test]
    fn test_output_shape() {
        let tensor = imagenet_transform()
            .apply(&solid_image(640, 480, [10, 20, 30]))
            .unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 224, 224]);
    }

    #[test]
    fn test_zero_dimension_image_rejected() {
        let empty = DynamicImage::ImageRgb8(RgbImage::new(0, 0));
        let result = imagenet_transform().apply(&empty);
        assert!(matches!(result, Err(ClassifierError::ValidationError(_))));
    }

    #[test]
    fn test_solid_color_normalization() {
        let tensor = imagenet_transform()
            .apply(&solid_image(224, 224, [128, 128, 128]))
            .unwrap();
        let expected_r = (128.0 / 255.0 - 0.485) / 0.229;
        let expected_b = (128.0 / 255.0 - 0.406) / 0.225;
        assert!((tensor[[0, 0, 0, 0]] - expected_r).abs() < 1e-5);
        assert!((tensor[[0, 2, 111, 93]] - expected_b).abs() < 1e-5);
    }

    #[test]
    fn test_decode_roundtrip_forces_rgb() {
        let gray = DynamicImage::ImageLuma8(image::GrayImage::from_pixel(32, 32, image::Luma([77])));
        let mut bytes = Vec::new();
        gray.write_to(&mut Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
            .unwrap();

        let decoded = decode_image(&bytes).unwrap();
        assert_eq!(decoded.color(), image::ColorType::Rgb8);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let result = decode_image(b"definitely not an image");
        assert!(matches!(result, Err(ClassifierError::DecodeError(_))));
    }
}
