//! Integration-level checks across the backend factory, the software
//! backend, and the offscreen framebuffer helper (spec §4.5, §4.6, §8).

use dx8gl_backend::{create_backend, resolve_selection, BackendKind, BackendSelection, Framebuffer, RenderBackend};
use dx8gl_types::PixelFormat;

#[test]
fn auto_selection_initializes_and_renders_a_frame() {
    // spec §8 end-to-end scenario 6: in a headless test environment, auto
    // selection must land on a working backend (software raster here).
    let selection = resolve_selection(None, &[], None);
    assert_eq!(selection, BackendSelection::Auto);

    let mut backend = create_backend(selection, 8, 8).expect("a backend must initialize");
    assert_eq!(backend.backend_kind(), BackendKind::SoftwareRaster);
    assert!(backend.make_current());

    let (bytes, width, height, format) = backend.get_framebuffer().expect("framebuffer must be readable");
    assert_eq!(width, 8);
    assert_eq!(height, 8);
    assert_eq!(format, PixelFormat::Rgba8);
    assert_eq!(bytes.len(), (width * height * 4) as usize);

    backend.shutdown();
}

#[test]
fn explicit_backend_resize_preserves_contents_dimensions() {
    let mut backend = create_backend(BackendSelection::Explicit(BackendKind::SoftwareRaster), 4, 4).unwrap();
    assert!(backend.resize(16, 16));
    let (_, width, height, _) = backend.get_framebuffer().unwrap();
    assert_eq!((width, height), (16, 16));
}

#[test]
fn framebuffer_round_trip_through_rgb565_stays_within_tolerance() {
    // spec §8 end-to-end scenario 3.
    let mut fb = Framebuffer::new(2, 1, PixelFormat::Rgba8).unwrap();
    fb.clear(1.0, 0.0, 0.0, 1.0);

    let mut converted = vec![0u8; 2 * 1 * 2];
    assert!(fb.convert_to(PixelFormat::Rgb565, &mut converted));

    let mut fb565 = Framebuffer::new(2, 1, PixelFormat::Rgb565).unwrap();
    fb565.read_from_gpu(|bytes| bytes.copy_from_slice(&converted));

    let mut back_to_rgba = vec![0u8; 2 * 1 * 4];
    assert!(fb565.convert_to(PixelFormat::Rgba8, &mut back_to_rgba));

    for px in back_to_rgba.chunks_exact(4) {
        assert!(px[0] >= 248);
        assert!(px[1] <= 8);
        assert!(px[2] <= 8);
    }
}
