//! Hardware GL backend (spec §4.5): a real ES-2-compatible context bound
//! to an off-screen surface, rendering into a framebuffer object with a
//! color texture and a depth renderbuffer.
//!
//! Context creation goes through `glutin`; GL entry points through `glow`,
//! which is the ecosystem's current replacement for hand-written,
//! build-script-generated bindings (see DESIGN.md).

use std::num::NonZeroU32;

use glutin::config::ConfigTemplateBuilder;
use glutin::context::{ContextApi, ContextAttributesBuilder, NotCurrentGlContext, PossiblyCurrentContext, Version};
use glutin::display::{Display, DisplayApiPreference};
use glutin::prelude::*;
use glutin::surface::{PbufferSurface, Surface as GlutinSurface, SurfaceAttributesBuilder};
use raw_window_handle::HasRawDisplayHandle;

use dx8gl_types::PixelFormat;

use crate::backend::{BackendKind, RenderBackend};
use crate::framebuffer::Framebuffer;

struct GlResources {
    display: Display,
    context: PossiblyCurrentContext,
    surface: GlutinSurface<PbufferSurface>,
    gl: glow::Context,
    fbo: glow::Framebuffer,
    color_texture: glow::Texture,
    depth_renderbuffer: glow::Renderbuffer,
}

pub struct HardwareGlBackend {
    resources: Option<GlResources>,
    framebuffer: Option<Framebuffer>,
    last_error: Option<String>,
}

impl HardwareGlBackend {
    pub fn new() -> Self {
        HardwareGlBackend {
            resources: None,
            framebuffer: None,
            last_error: None,
        }
    }

    fn fail(&mut self, stage: &str, detail: impl std::fmt::Display) -> bool {
        self.last_error = Some(format!("hardware-gl init failed at stage '{stage}': {detail}"));
        false
    }

    fn create_resources(&mut self, width: u32, height: u32) -> Option<GlResources> {
        // A headless process has no native display connection to borrow a
        // raw display handle from; glutin's EGL path accepts `None` here
        // and falls back to the platform's default display.
        let display = match unsafe {
            Display::new(
                raw_window_handle::RawDisplayHandle::Xlib(raw_window_handle::XlibDisplayHandle::new(std::ptr::null_mut(), 0)),
                DisplayApiPreference::Egl,
            )
            .or_else(|_| {
                Display::new(
                    raw_window_handle::RawDisplayHandle::Windows(raw_window_handle::WindowsDisplayHandle::new()),
                    DisplayApiPreference::Egl,
                )
            })
        } {
            Ok(d) => d,
            Err(err) => {
                self.fail("display", err);
                return None;
            }
        };
        let _ = display.raw_display_handle();

        let template = ConfigTemplateBuilder::new()
            .with_depth_size(24)
            .with_stencil_size(8)
            .with_alpha_size(8)
            .with_api(glutin::config::Api::GLES2)
            .build();

        let config = match unsafe {
            display.find_configs(template).map(|mut configs| configs.next())
        } {
            Ok(Some(config)) => config,
            Ok(None) => {
                self.fail("config", "no ES-2-compatible config with 24-bit depth + 8-bit stencil");
                return None;
            }
            Err(err) => {
                self.fail("config", err);
                return None;
            }
        };

        let context_attributes = ContextAttributesBuilder::new()
            .with_context_api(ContextApi::Gles(Some(Version::new(2, 0))))
            .build(None);
        let not_current = match unsafe { display.create_context(&config, &context_attributes) } {
            Ok(ctx) => ctx,
            Err(err) => {
                self.fail("context", err);
                return None;
            }
        };

        // Surfaceless is attempted implicitly by most EGL drivers through a
        // 1x1 pbuffer; a real window surface is the last-resort fallback
        // (spec §4.5 "either uses a surfaceless extension or falls back to
        // a 1x1 pbuffer or window surface").
        let pbuffer_attrs =
            SurfaceAttributesBuilder::<PbufferSurface>::new().build(NonZeroU32::new(width.max(1)).unwrap(), NonZeroU32::new(height.max(1)).unwrap());
        let surface = match unsafe { display.create_pbuffer_surface(&config, &pbuffer_attrs) } {
            Ok(s) => s,
            Err(err) => {
                self.fail("surface", format!("pbuffer creation failed: {err}"));
                return None;
            }
        };

        let context = match not_current.make_current(&surface) {
            Ok(ctx) => ctx,
            Err(err) => {
                self.fail("make_current", err);
                return None;
            }
        };

        let gl = unsafe {
            glow::Context::from_loader_function(|symbol| {
                display.get_proc_address(&std::ffi::CString::new(symbol).unwrap()) as *const _
            })
        };

        let (fbo, color_texture, depth_renderbuffer) = unsafe { create_fbo(&gl, width, height) };

        Some(GlResources {
            display,
            context,
            surface,
            gl,
            fbo,
            color_texture,
            depth_renderbuffer,
        })
    }
}

impl Default for HardwareGlBackend {
    fn default() -> Self {
        Self::new()
    }
}

unsafe fn create_fbo(gl: &glow::Context, width: u32, height: u32) -> (glow::Framebuffer, glow::Texture, glow::Renderbuffer) {
    use glow::HasContext;

    let fbo = gl.create_framebuffer().expect("create_framebuffer");
    gl.bind_framebuffer(glow::FRAMEBUFFER, Some(fbo));

    let color_texture = gl.create_texture().expect("create_texture");
    gl.bind_texture(glow::TEXTURE_2D, Some(color_texture));
    gl.tex_image_2d(
        glow::TEXTURE_2D,
        0,
        glow::RGBA as i32,
        width as i32,
        height as i32,
        0,
        glow::RGBA,
        glow::UNSIGNED_BYTE,
        None,
    );
    gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, glow::LINEAR as i32);
    gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, glow::LINEAR as i32);
    gl.framebuffer_texture_2d(glow::FRAMEBUFFER, glow::COLOR_ATTACHMENT0, glow::TEXTURE_2D, Some(color_texture), 0);

    let depth_renderbuffer = gl.create_renderbuffer().expect("create_renderbuffer");
    gl.bind_renderbuffer(glow::RENDERBUFFER, Some(depth_renderbuffer));
    gl.renderbuffer_storage(glow::RENDERBUFFER, glow::DEPTH24_STENCIL8, width as i32, height as i32);
    gl.framebuffer_renderbuffer(glow::FRAMEBUFFER, glow::DEPTH_STENCIL_ATTACHMENT, glow::RENDERBUFFER, Some(depth_renderbuffer));

    (fbo, color_texture, depth_renderbuffer)
}

impl RenderBackend for HardwareGlBackend {
    fn initialize(&mut self, width: u32, height: u32) -> bool {
        if self.resources.is_some() {
            return true;
        }
        let Some(resources) = self.create_resources(width, height) else {
            return false;
        };
        self.resources = Some(resources);
        self.framebuffer = Framebuffer::new(width, height, PixelFormat::Rgba8).ok();
        true
    }

    fn make_current(&mut self) -> bool {
        let Some(resources) = &self.resources else {
            self.last_error = Some("hardware-gl make_current called before initialize".to_string());
            return false;
        };
        match resources.context.make_current(&resources.surface) {
            Ok(()) => true,
            Err(err) => {
                self.last_error = Some(format!("make_current failed: {err}"));
                false
            }
        }
    }

    fn get_framebuffer(&mut self) -> Option<(&[u8], u32, u32, PixelFormat)> {
        use glow::HasContext;

        let resources = self.resources.as_ref()?;
        let fb = self.framebuffer.as_mut()?;
        unsafe {
            resources.gl.bind_framebuffer(glow::FRAMEBUFFER, Some(resources.fbo));
            resources.gl.finish();
            fb.read_from_gpu(|bytes| {
                resources.gl.read_pixels(
                    0,
                    0,
                    fb.width() as i32,
                    fb.height() as i32,
                    glow::RGBA,
                    glow::UNSIGNED_BYTE,
                    glow::PixelPackData::Slice(bytes),
                );
            });
        }
        Some((fb.bytes(), fb.width(), fb.height(), fb.format()))
    }

    fn resize(&mut self, width: u32, height: u32) -> bool {
        if let Some(fb) = &self.framebuffer {
            if fb.width() == width && fb.height() == height {
                return true;
            }
        }
        self.shutdown();
        self.initialize(width, height)
    }

    fn shutdown(&mut self) {
        if let Some(resources) = self.resources.take() {
            use glow::HasContext;
            unsafe {
                resources.gl.delete_framebuffer(resources.fbo);
                resources.gl.delete_texture(resources.color_texture);
                resources.gl.delete_renderbuffer(resources.depth_renderbuffer);
            }
            drop(resources.surface);
            drop(resources.context);
            drop(resources.display);
        }
        self.framebuffer = None;
    }

    fn backend_kind(&self) -> BackendKind {
        BackendKind::HardwareGl
    }

    fn has_extension(&self, name: &str) -> bool {
        let Some(resources) = &self.resources else {
            return false;
        };
        use glow::HasContext;
        unsafe { resources.gl.supported_extensions().contains(name) }
    }

    fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}
