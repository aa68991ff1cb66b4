use std::path::Path;

use physview_common::TextureImage;

use crate::AssetError;

/// Decode PNG or JPEG bytes into RGBA8.
pub fn decode_texture(bytes: &[u8]) -> Result<TextureImage, AssetError> {
    let rgba = image::load_from_memory(bytes)?.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(TextureImage {
        width,
        height,
        rgba: rgba.into_raw(),
    })
}

pub fn load_texture(path: &Path) -> Result<TextureImage, AssetError> {
    let bytes = std::fs::read(path).map_err(|source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let image = decode_texture(&bytes)?;
    tracing::debug!(
        path = %path.display(),
        width = image.width,
        height = image.height,
        "decoded texture"
    );
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([x as u8 * 40, y as u8 * 40, 7, 255])
        });
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn png_decodes_to_rgba() {
        let tex = decode_texture(&png_bytes(3, 2)).unwrap();
        assert_eq!((tex.width, tex.height), (3, 2));
        assert!(tex.is_valid());
        // Pixel (1, 1)
        let i = (3 + 1) * 4;
        assert_eq!(&tex.rgba[i..i + 4], &[40, 40, 7, 255]);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            decode_texture(b"not an image"),
            Err(AssetError::Image(_))
        ));
    }

    #[test]
    fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.png");
        std::fs::write(&path, png_bytes(4, 4)).unwrap();
        assert_eq!(load_texture(&path).unwrap().width, 4);
        assert!(matches!(
            load_texture(&dir.path().join("missing.png")),
            Err(AssetError::Io { .. })
        ));
    }
}
