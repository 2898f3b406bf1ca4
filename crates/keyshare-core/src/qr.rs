// ABOUTME: QR render collaborator interface for optical fingerprint transfer.
// ABOUTME: Builds the fingerprint URI and hands it to a platform renderer.

use crate::error::{ExportError, Result};
use crate::fingerprint;
use crate::key::KeyMaterial;
use url::Url;

/// Monochrome image produced by a renderer, row-major, `true` = dark module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<bool>,
}

impl Bitmap {
    pub fn get(&self, x: u32, y: u32) -> Option<bool> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get((y * self.width + x) as usize).copied()
    }
}

/// Turns a URI into a QR bitmap of at least `min_size` pixels per side.
/// A `min_size` of 0 lets the renderer pick.
pub trait QrRenderer {
    type Error: std::fmt::Display;

    fn render(&self, uri: &Url, min_size: u32) -> std::result::Result<Bitmap, Self::Error>;
}

/// Render the fingerprint URI of `key` as a QR bitmap.
///
/// # Errors
/// Returns the fingerprint codec's errors for a bad scheme and
/// `RenderFailure` when the renderer fails.
pub fn render_fingerprint_qr<R>(renderer: &R, key: &KeyMaterial, scheme: &str) -> Result<Bitmap>
where
    R: QrRenderer + ?Sized,
{
    let uri = fingerprint::to_uri(&key.fingerprint_hex(), scheme)?;
    renderer.render(&uri, 0).map_err(|e| {
        tracing::warn!(error = %e, "qr render failed");
        ExportError::RenderFailure(e.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{KeyBlob, KeyVersion};
    use std::cell::RefCell;

    /// Records what it was asked to render and returns a 1x1 bitmap.
    #[derive(Default)]
    struct RecordingRenderer {
        calls: RefCell<Vec<(String, u32)>>,
    }

    impl QrRenderer for RecordingRenderer {
        type Error = String;

        fn render(&self, uri: &Url, min_size: u32) -> std::result::Result<Bitmap, String> {
            self.calls.borrow_mut().push((uri.to_string(), min_size));
            Ok(Bitmap {
                width: 1,
                height: 1,
                pixels: vec![true],
            })
        }
    }

    struct FailingRenderer;

    impl QrRenderer for FailingRenderer {
        type Error = &'static str;

        fn render(&self, _: &Url, _: u32) -> std::result::Result<Bitmap, &'static str> {
            Err("out of memory")
        }
    }

    fn key() -> KeyMaterial {
        KeyMaterial::derive(1, KeyVersion::V6, 0, KeyBlob::Ed25519 { point: [0x44; 32] })
            .expect("should derive")
    }

    #[test]
    fn test_render_passes_uri_and_zero_min_size() {
        let renderer = RecordingRenderer::default();
        let key = key();
        let bitmap = render_fingerprint_qr(&renderer, &key, fingerprint::FINGERPRINT_SCHEME)
            .expect("should render");
        assert_eq!(bitmap.get(0, 0), Some(true));
        assert_eq!(bitmap.get(1, 0), None);

        let calls = renderer.calls.borrow();
        assert_eq!(
            calls.as_slice(),
            &[(format!("openpgp4fpr:{}", key.fingerprint_hex()), 0)]
        );
        assert_eq!(key.fingerprint_hex().len(), 64);
    }

    #[test]
    fn test_renderer_error_maps_to_render_failure() {
        let err = render_fingerprint_qr(&FailingRenderer, &key(), fingerprint::FINGERPRINT_SCHEME)
            .expect_err("renderer fails");
        assert!(matches!(err, ExportError::RenderFailure(msg) if msg == "out of memory"));
    }

    #[test]
    fn test_bad_scheme_never_reaches_renderer() {
        let renderer = RecordingRenderer::default();
        let err = render_fingerprint_qr(&renderer, &key(), "").expect_err("empty scheme");
        assert!(matches!(err, ExportError::InvalidScheme(_)));
        assert!(renderer.calls.borrow().is_empty());
    }
}
