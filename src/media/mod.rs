pub mod image_info;

pub use image_info::analyze_image;

pub fn detect_mime_type(data: &[u8]) -> Option<String> {
    infer::get(data).map(|kind| kind.mime_type().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_png_signature() {
        let data = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
        assert_eq!(detect_mime_type(data).as_deref(), Some("image/png"));
    }

    #[test]
    fn unknown_bytes_have_no_mime() {
        assert_eq!(detect_mime_type(b"hello"), None);
    }
}
