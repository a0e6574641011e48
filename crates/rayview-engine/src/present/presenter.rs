use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::compute::FrameBuffer;
use crate::coords::GridSize;
use crate::render::{RenderCtx, RenderTarget};

use super::convert::{to_rgba8, RGBA8_PIXEL_BYTES};

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct QuadVertex {
    pos: [f32; 2], // 0..1, (0, 0) is the top-left corner
}

impl QuadVertex {
    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

const QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex { pos: [0.0, 0.0] },
    QuadVertex { pos: [1.0, 0.0] },
    QuadVertex { pos: [1.0, 1.0] },
    QuadVertex { pos: [0.0, 1.0] },
];

const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

/// Texture format used for the uploaded frame.
///
/// Follows the surface: an sRGB surface gets an sRGB texture so the bytes
/// pass through unchanged.
pub fn frame_texture_format(surface_format: wgpu::TextureFormat) -> wgpu::TextureFormat {
    if surface_format.is_srgb() {
        wgpu::TextureFormat::Rgba8UnormSrgb
    } else {
        wgpu::TextureFormat::Rgba8Unorm
    }
}

/// Checks that a frame of `grid` can be uploaded as one texture on a device
/// with `limits`.
///
/// Run before the first dispatch: an oversized texture is otherwise only
/// reported by wgpu's validation in the middle of a frame.
pub fn check_frame_limits(grid: GridSize, limits: &wgpu::Limits) -> anyhow::Result<()> {
    let max = limits.max_texture_dimension_2d;
    anyhow::ensure!(
        grid.width <= max && grid.height <= max,
        "configuration error: grid {}x{} exceeds the device's {max}px texture limit",
        grid.width,
        grid.height
    );
    Ok(())
}

/// Viewport rectangle in surface pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FitRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Largest centered rectangle with the grid's aspect ratio that fits the surface.
///
/// `None` for an empty surface or grid.
pub fn letterbox(grid: GridSize, surface_size: (u32, u32)) -> Option<FitRect> {
    let (sw, sh) = (surface_size.0 as f32, surface_size.1 as f32);
    if !grid.is_valid() || sw <= 0.0 || sh <= 0.0 {
        return None;
    }

    let (gw, gh) = (grid.width as f32, grid.height as f32);
    let scale = (sw / gw).min(sh / gh);
    let (width, height) = (gw * scale, gh * scale);

    Some(FitRect {
        x: ((sw - width) * 0.5).floor(),
        y: ((sh - height) * 0.5).floor(),
        width,
        height,
    })
}

/// Blits a `FrameBuffer` onto the surface as one textured quad, letterboxed
/// to keep the grid's aspect ratio when the window is resized.
///
/// The pipeline, sampler and quad buffers persist; the frame texture is
/// created and dropped on every call.
#[derive(Default)]
pub struct Presenter {
    pipeline_format: Option<wgpu::TextureFormat>,
    pipeline: Option<wgpu::RenderPipeline>,
    bind_group_layout: Option<wgpu::BindGroupLayout>,
    sampler: Option<wgpu::Sampler>,

    quad_vbo: Option<wgpu::Buffer>,
    quad_ibo: Option<wgpu::Buffer>,
}

impl Presenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploads `frame` and draws it centered in `target`.
    pub fn present(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>, frame: &FrameBuffer) {
        let grid = frame.grid();
        let Some(fit) = letterbox(grid, ctx.surface_size) else {
            return;
        };

        self.ensure_pipeline(ctx);
        self.ensure_static_buffers(ctx);

        let format = frame_texture_format(ctx.surface_format);
        let size = wgpu::Extent3d {
            width: grid.width,
            height: grid.height,
            depth_or_array_layers: 1,
        };

        let texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("rayview frame texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let bytes = to_rgba8(frame);
        ctx.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &bytes,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(grid.width * RGBA8_PIXEL_BYTES as u32),
                rows_per_image: Some(grid.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let Some(pipeline) = self.pipeline.as_ref() else { return };
        let Some(bgl) = self.bind_group_layout.as_ref() else { return };
        let Some(sampler) = self.sampler.as_ref() else { return };
        let Some(quad_vbo) = self.quad_vbo.as_ref() else { return };
        let Some(quad_ibo) = self.quad_ibo.as_ref() else { return };

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("rayview present bind group"),
            layout: bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("rayview present pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_viewport(fit.x, fit.y, fit.width, fit.height, 0.0, 1.0);
        rpass.set_pipeline(pipeline);
        rpass.set_bind_group(0, &bind_group, &[]);
        rpass.set_vertex_buffer(0, quad_vbo.slice(..));
        rpass.set_index_buffer(quad_ibo.slice(..), wgpu::IndexFormat::Uint16);
        rpass.draw_indexed(0..QUAD_INDICES.len() as u32, 0, 0..1);
    }

    fn ensure_pipeline(&mut self, ctx: &RenderCtx<'_>) {
        if self.pipeline_format == Some(ctx.surface_format) && self.pipeline.is_some() {
            return;
        }

        let shader = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("rayview present shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/present.wgsl").into()),
        });

        let bind_group_layout = ctx
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("rayview present bgl"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let pipeline_layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("rayview present pipeline layout"),
                bind_group_layouts: &[&bind_group_layout],
                immediate_size: 0,
            });

        let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("rayview present pipeline"),
            layout: Some(&pipeline_layout),

            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[QuadVertex::layout()],
            },

            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        log::debug!("present pipeline built for {:?}", ctx.surface_format);

        self.pipeline_format = Some(ctx.surface_format);
        self.pipeline = Some(pipeline);
        self.bind_group_layout = Some(bind_group_layout);
    }

    fn ensure_static_buffers(&mut self, ctx: &RenderCtx<'_>) {
        if self.sampler.is_none() {
            // One texel per pixel at the grid size; nearest keeps it exact.
            self.sampler = Some(ctx.device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some("rayview present sampler"),
                address_mode_u: wgpu::AddressMode::ClampToEdge,
                address_mode_v: wgpu::AddressMode::ClampToEdge,
                address_mode_w: wgpu::AddressMode::ClampToEdge,
                mag_filter: wgpu::FilterMode::Nearest,
                min_filter: wgpu::FilterMode::Nearest,
                mipmap_filter: wgpu::MipmapFilterMode::Nearest,
                ..Default::default()
            }));
        }

        if self.quad_vbo.is_some() && self.quad_ibo.is_some() {
            return;
        }

        self.quad_vbo = Some(ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("rayview present quad vbo"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        }));

        self.quad_ibo = Some(ctx.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("rayview present quad ibo"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── texture format ──

    #[test]
    fn texture_format_follows_surface_encoding() {
        assert_eq!(
            frame_texture_format(wgpu::TextureFormat::Bgra8UnormSrgb),
            wgpu::TextureFormat::Rgba8UnormSrgb
        );
        assert_eq!(
            frame_texture_format(wgpu::TextureFormat::Bgra8Unorm),
            wgpu::TextureFormat::Rgba8Unorm
        );
    }

    // ── limits ──

    #[test]
    fn stock_grid_fits_default_limits() {
        assert!(check_frame_limits(GridSize::new(1060, 600), &wgpu::Limits::default()).is_ok());
    }

    #[test]
    fn grid_at_the_limit_is_accepted() {
        let limits = wgpu::Limits::default();
        let max = limits.max_texture_dimension_2d;
        assert!(check_frame_limits(GridSize::new(max, max), &limits).is_ok());
    }

    #[test]
    fn grid_wider_or_taller_than_a_texture_is_rejected() {
        let limits = wgpu::Limits::default();
        let max = limits.max_texture_dimension_2d;

        let wide = check_frame_limits(GridSize::new(max + 1, 600), &limits).unwrap_err();
        assert!(wide.to_string().contains(&format!("{}x600", max + 1)));
        assert!(check_frame_limits(GridSize::new(600, max + 1), &limits).is_err());
    }

    #[test]
    fn limit_comes_from_the_device() {
        let limits = wgpu::Limits {
            max_texture_dimension_2d: 512,
            ..wgpu::Limits::default()
        };
        assert!(check_frame_limits(GridSize::new(1060, 600), &limits).is_err());
        assert!(check_frame_limits(GridSize::new(512, 300), &limits).is_ok());
    }

    // ── letterbox ──

    #[test]
    fn matching_aspect_fills_the_surface() {
        let fit = letterbox(GridSize::new(1060, 600), (2120, 1200)).unwrap();
        assert_eq!(fit, FitRect { x: 0.0, y: 0.0, width: 2120.0, height: 1200.0 });
    }

    #[test]
    fn wide_surface_is_pillarboxed() {
        let fit = letterbox(GridSize::new(100, 100), (300, 100)).unwrap();
        assert_eq!(fit, FitRect { x: 100.0, y: 0.0, width: 100.0, height: 100.0 });
    }

    #[test]
    fn tall_surface_is_letterboxed() {
        let fit = letterbox(GridSize::new(200, 100), (200, 300)).unwrap();
        assert_eq!(fit, FitRect { x: 0.0, y: 100.0, width: 200.0, height: 100.0 });
    }

    #[test]
    fn empty_surface_or_grid_draws_nothing() {
        assert!(letterbox(GridSize::new(10, 10), (0, 600)).is_none());
        assert!(letterbox(GridSize::new(0, 10), (800, 600)).is_none());
    }

    // ── quad ──

    #[test]
    fn quad_covers_unit_square_with_two_triangles() {
        assert_eq!(QUAD_INDICES.len(), 6);
        let xs: Vec<f32> = QUAD_VERTICES.iter().map(|v| v.pos[0]).collect();
        let ys: Vec<f32> = QUAD_VERTICES.iter().map(|v| v.pos[1]).collect();
        assert_eq!(xs.iter().cloned().fold(f32::MAX, f32::min), 0.0);
        assert_eq!(ys.iter().cloned().fold(f32::MIN, f32::max), 1.0);
    }
}
