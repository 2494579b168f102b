//! Web GPU backend (spec §4.5): requests an adapter and device, renders
//! into a 2D color texture, and reads it back through a map-read buffer.
//! All platform setup is asynchronous; this backend blocks on it with
//! bounded timeouts (spec §5 "Cancellation and timeouts").

use std::sync::mpsc;
use std::time::Duration;

use dx8gl_types::PixelFormat;

use crate::backend::{BackendKind, RenderBackend};
use crate::framebuffer::Framebuffer;

const SETUP_TIMEOUT: Duration = Duration::from_secs(5);
const READBACK_TIMEOUT: Duration = Duration::from_millis(100);

struct GpuResources {
    device: wgpu::Device,
    queue: wgpu::Queue,
    color_texture: wgpu::Texture,
    readback_buffer: wgpu::Buffer,
    unpadded_bytes_per_row: u32,
    padded_bytes_per_row: u32,
}

pub struct WebGpuBackend {
    resources: Option<GpuResources>,
    framebuffer: Option<Framebuffer>,
    last_error: Option<String>,
}

impl WebGpuBackend {
    pub fn new() -> Self {
        WebGpuBackend {
            resources: None,
            framebuffer: None,
            last_error: None,
        }
    }

    /// Runs `future` to completion on the current thread via `pollster`, on
    /// a helper thread so the caller can still enforce `timeout` even
    /// though wgpu's futures offer no native cancellation.
    fn block_with_timeout<T, F>(future: F, timeout: Duration) -> Option<T>
    where
        T: Send + 'static,
        F: std::future::Future<Output = T> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let result = pollster::block_on(future);
            let _ = tx.send(result);
        });
        rx.recv_timeout(timeout).ok()
    }

    fn create_resources(&mut self, width: u32, height: u32) -> Option<GpuResources> {
        let instance = wgpu::Instance::default();

        let adapter = Self::block_with_timeout(
            async move {
                instance
                    .request_adapter(&wgpu::RequestAdapterOptions {
                        power_preference: wgpu::PowerPreference::HighPerformance,
                        compatible_surface: None,
                        force_fallback_adapter: false,
                    })
                    .await
            },
            SETUP_TIMEOUT,
        )
        .flatten();
        let Some(adapter) = adapter else {
            self.last_error = Some("web-gpu init failed at stage 'adapter': request timed out or no adapter".to_string());
            return None;
        };

        let device_queue = Self::block_with_timeout(
            async move {
                adapter
                    .request_device(
                        &wgpu::DeviceDescriptor {
                            label: Some("dx8gl device"),
                            required_features: wgpu::Features::empty(),
                            required_limits: wgpu::Limits::downlevel_defaults(),
                        },
                        None,
                    )
                    .await
            },
            SETUP_TIMEOUT,
        );
        let (device, queue) = match device_queue {
            Some(Ok(pair)) => pair,
            Some(Err(err)) => {
                self.last_error = Some(format!("web-gpu init failed at stage 'device': {err}"));
                return None;
            }
            None => {
                self.last_error = Some("web-gpu init failed at stage 'device': request timed out".to_string());
                return None;
            }
        };

        let color_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("dx8gl color target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });

        let unpadded_bytes_per_row = width * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_bytes_per_row = (unpadded_bytes_per_row + align - 1) / align * align;

        let readback_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("dx8gl readback buffer"),
            size: (padded_bytes_per_row * height) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        Some(GpuResources {
            device,
            queue,
            color_texture,
            readback_buffer,
            unpadded_bytes_per_row,
            padded_bytes_per_row,
        })
    }
}

impl Default for WebGpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderBackend for WebGpuBackend {
    fn initialize(&mut self, width: u32, height: u32) -> bool {
        // A second call on a live backend is a no-op returning success
        // (spec §4.5).
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
        // No-op after successful initialization (spec §4.5).
        self.resources.is_some()
    }

    fn get_framebuffer(&mut self) -> Option<(&[u8], u32, u32, PixelFormat)> {
        let resources = self.resources.as_ref()?;
        let fb = self.framebuffer.as_mut()?;

        let mut encoder = resources.device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &resources.color_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &resources.readback_buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(resources.padded_bytes_per_row),
                    rows_per_image: Some(fb.height()),
                },
            },
            wgpu::Extent3d {
                width: fb.width(),
                height: fb.height(),
                depth_or_array_layers: 1,
            },
        );
        resources.queue.submit(Some(encoder.finish()));

        let slice = resources.readback_buffer.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        resources.device.poll(wgpu::Maintain::Wait);
        let mapped = rx.recv_timeout(READBACK_TIMEOUT).ok()?.ok()?;
        let _ = mapped;

        let padded = slice.get_mapped_range();
        fb.read_from_gpu(|bytes| {
            for row in 0..fb.height() as usize {
                let src_start = row * resources.padded_bytes_per_row as usize;
                let src_end = src_start + resources.unpadded_bytes_per_row as usize;
                let dst_start = row * resources.unpadded_bytes_per_row as usize;
                let dst_end = dst_start + resources.unpadded_bytes_per_row as usize;
                bytes[dst_start..dst_end].copy_from_slice(&padded[src_start..src_end]);
            }
        });
        drop(padded);
        resources.readback_buffer.unmap();

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
        self.resources = None;
        self.framebuffer = None;
    }

    fn backend_kind(&self) -> BackendKind {
        BackendKind::WebGpu
    }

    fn has_extension(&self, _name: &str) -> bool {
        // Web GPU has no named-extension model comparable to GL's; wgpu
        // exposes a typed feature set instead, which this trait's
        // string-keyed query does not map onto (spec §4.5).
        false
    }

    fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}
