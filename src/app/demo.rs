//! 演示程序
//!
//! 五个演示共用同一条帧流水线，只在几何体、根签名布局和是否使用计算队列上不同：
//!
//! | 演示   | 渲染项        | 材质 | 纹理          | 计算队列 |
//! |--------|---------------|------|---------------|----------|
//! | quad   | 四边形        | 否   | 1             | 否       |
//! | cube   | 旋转立方体    | 否   | 0             | 否       |
//! | shapes | 立方体 + 地面 | 是   | 全部，按时间轮换 | 否    |
//! | gif    | 四边形        | 否   | GIF 画布      | 是       |
//! | waves  | 山丘 + 水面   | 否   | 0             | 否       |
//!
//! # 每帧流程
//!
//! ```text
//! update: 获取帧槽位（必要时阻塞）→ 写物体/过程/材质常量 → [waves] 写水面顶点
//! draw:   [gif] 计算队列合成 → Signal(V) → 图形队列 Wait(V)
//!         图形录制 → 提交 → Signal(V') → 盖章 → Present
//! ```

use std::time::Duration;

use tracing::{debug, info};
use winit::event::MouseButton;
use winit::keyboard::KeyCode;

use crate::app::Application;
use crate::core::config::{Config, DemoKind};
use crate::core::error::{DemoError, GraphicsError, Result};
use crate::core::input::InputSystem;
use crate::core::timer::FrameStats;
use crate::geometry::{create_box, create_grid, create_hills, create_quad, HillsShape, MeshData};
use crate::math::{rotation_y, scale_translation, Matrix4, Vector3};
use crate::renderer::backend::{GpuDevice, HeapId, TextureId, TextureUsage};
use crate::renderer::command::{FrameEncoder, PipelineKind, ResourceId, ResourceState, Viewport};
use crate::renderer::constants::{GifFrameParams, MaterialConstants, PassConstants};
use crate::renderer::descriptor::{
    ComputeRootSlot, DescriptorClass, DescriptorHeapDescriptor, DescriptorLayout, GraphicsRootLayout,
    PerFrameDescriptors, RootSlot, StaticDescriptors,
};
use crate::renderer::frame::{FrameResourceDesc, FrameResources, FrameRing, FrameSlot};
use crate::renderer::resource::{write_texture_rows, UploadBuffer};
use crate::renderer::shaders::DemoShaders;
use crate::renderer::swapchain::Presenter;
use crate::renderer::sync::{FenceTimeline, FenceToken, QueueKind};
use crate::renderer::GpuContext;
use crate::scene::{
    DemoAssets, GifAnimation, GifPlayback, ImageData, OrbitCamera, OrbitLimits, PlaybackAction, RenderItem,
    WaveDisturber, WaveParams, Waves,
};

/// 材质轮换速度（每秒切换的纹理数）
const MATERIAL_FLIPS_PER_SECOND: f32 = 15.0;

/// 水面随机扰动的间隔（秒）
const WAVE_DISTURB_INTERVAL: f32 = 0.25;
const WAVE_SEED: u64 = 0x5741_5645;

type SlotResources<D> = FrameResources<<D as GpuDevice>::Allocator, <D as GpuDevice>::Memory>;

/// 初始化之后才存在的 GPU 场景
struct GpuScene<D: GpuDevice> {
    ring: FrameRing<SlotResources<D>>,
    graphics_list: D::List,
    layout: DescriptorLayout,
    root: GraphicsRootLayout,
    heap: HeapId,
    items: Vec<RenderItem>,
    gif: Option<GifCompositor<D>>,
    waves: Option<WaveSurface>,
}

/// 水面模拟，顶点每帧写入当前帧槽位
struct WaveSurface {
    waves: Waves,
    disturber: WaveDisturber,
}

/// GIF 合成：计算队列把当前帧写入画布，图形队列采样画布
struct GifCompositor<D: GpuDevice> {
    animation: GifAnimation,
    playback: GifPlayback,
    list: D::List,
    layout: DescriptorLayout,
    heap: HeapId,
    source: TextureId,
    canvas: TextureId,
    /// 图形队列最近一次读画布后的 Signal，下一次合成前计算队列要等它
    graphics_done: Option<FenceToken>,
    dispatches: u64,
}

/// 演示程序
pub struct DemoApp<D: GpuDevice, P> {
    config: Config,
    gpu: GpuContext<D, P>,
    assets: DemoAssets,
    shaders: DemoShaders,
    camera: OrbitCamera,
    input: InputSystem,
    stats: FrameStats,
    viewport: Viewport,
    back_buffer: usize,
    total_time: f32,
    frame_delta: Duration,
    wireframe: bool,
    pending_title: Option<String>,
    scene: Option<GpuScene<D>>,
}

fn not_initialized() -> DemoError {
    DemoError::Initialization("Demo used before initialize()".to_string())
}

fn missing(what: &str) -> DemoError {
    GraphicsError::ResourceCreation(format!("{} was not created", what)).into()
}

impl<D: GpuDevice, P: Presenter> DemoApp<D, P> {
    pub fn new(config: Config, gpu: GpuContext<D, P>, assets: DemoAssets, shaders: DemoShaders) -> Self {
        let (width, height) = gpu.presenter.extent();
        let viewport = Viewport::new(width, height);
        let back_buffer = gpu.presenter.current_back_buffer();
        let camera = match config.demo.kind {
            DemoKind::Waves => OrbitCamera::with_limits(viewport.aspect_ratio(), OrbitLimits::landscape()),
            _ => OrbitCamera::new(viewport.aspect_ratio()),
        };

        Self {
            camera,
            config,
            gpu,
            assets,
            shaders,
            input: InputSystem::new(),
            stats: FrameStats::new(),
            viewport,
            back_buffer,
            total_time: 0.0,
            frame_delta: Duration::ZERO,
            wireframe: false,
            pending_title: None,
            scene: None,
        }
    }

    pub fn gpu(&self) -> &GpuContext<D, P> {
        &self.gpu
    }

    pub fn kind(&self) -> DemoKind {
        self.config.demo.kind
    }

    /// 最近一次 update 使用的帧槽位
    pub fn current_slot(&self) -> Option<usize> {
        self.scene.as_ref().and_then(|s| s.ring.current_index())
    }

    /// 帧槽位获取时阻塞的次数
    pub fn slot_stalls(&self) -> u64 {
        self.scene.as_ref().map_or(0, |s| s.ring.stalls())
    }

    pub fn descriptor_layout(&self) -> Option<&DescriptorLayout> {
        self.scene.as_ref().map(|s| &s.layout)
    }

    /// 计算队列合成 GIF 帧的次数
    pub fn gif_dispatches(&self) -> u64 {
        self.scene
            .as_ref()
            .and_then(|s| s.gif.as_ref())
            .map_or(0, |g| g.dispatches)
    }

    pub fn is_wireframe(&self) -> bool {
        self.wireframe
    }

    pub fn back_buffer(&self) -> usize {
        self.back_buffer
    }

    fn window_title(&self) -> String {
        format!("{} - {}", self.config.window.title, self.config.demo.kind.name())
    }
}

/// 一个 GPU 网格及其渲染项（子网格名, 世界矩阵）
struct ScenePart {
    mesh: MeshData,
    items: Vec<(&'static str, Matrix4)>,
    /// 顶点每帧由 CPU 重写
    dynamic_vertices: bool,
}

impl ScenePart {
    fn fixed(mesh: MeshData, items: Vec<(&'static str, Matrix4)>) -> Self {
        Self {
            mesh,
            items,
            dynamic_vertices: false,
        }
    }
}

/// 演示的几何体
///
/// 动态顶点缓冲会替换整个顶点槽，所以水面单独成一个网格，基准顶点为 0。
fn scene_geometry(kind: DemoKind, gif: Option<&GifAnimation>, waves: Option<&Waves>) -> Vec<ScenePart> {
    match kind {
        DemoKind::Quad => vec![ScenePart::fixed(create_quad(2.0, 2.0), vec![("quad", Matrix4::identity())])],
        DemoKind::Cube => vec![ScenePart::fixed(create_box(1.5, 1.5, 1.5), vec![("box", Matrix4::identity())])],
        DemoKind::Shapes => {
            let mesh = MeshData::merge(
                "shapes",
                vec![create_box(1.5, 1.5, 1.5), create_grid(20.0, 30.0, 60, 40)],
            );
            let box_world = scale_translation(Vector3::new(2.0, 2.0, 2.0), Vector3::new(0.0, 0.5, 0.0));
            vec![ScenePart::fixed(mesh, vec![("box", box_world), ("grid", Matrix4::identity())])]
        }
        DemoKind::Gif => {
            let aspect = gif.map_or(1.0, |g| g.width as f32 / g.height.max(1) as f32);
            vec![ScenePart::fixed(create_quad(2.0 * aspect, 2.0), vec![("quad", Matrix4::identity())])]
        }
        DemoKind::Waves => {
            let hills = create_hills(160.0, 160.0, 50, 50, &HillsShape::default());
            let mut parts = vec![ScenePart::fixed(hills, vec![("hills", Matrix4::identity())])];
            if let Some(waves) = waves {
                parts.push(ScenePart {
                    mesh: waves.mesh().clone(),
                    items: vec![("waves", Matrix4::identity())],
                    dynamic_vertices: true,
                });
            }
            parts
        }
    }
}

/// 流水线必须在初始化时创建好
fn ensure_pipeline<D: GpuDevice>(device: &D, pipeline: PipelineKind) -> Result<()> {
    if device.has_pipeline(pipeline) {
        Ok(())
    } else {
        Err(missing(&format!("{:?} pipeline", pipeline)))
    }
}

/// 把静态纹理上传到默认堆，完成后纹理处于 COMMON
fn upload_textures<D: GpuDevice>(
    device: &D,
    queue: &D::Queue,
    timeline: &mut FenceTimeline<D::Fence>,
    list: &mut D::List,
    allocator: &D::Allocator,
    images: &[ImageData],
) -> Result<Vec<TextureId>> {
    if images.is_empty() {
        return Ok(Vec::new());
    }

    let mut staging = Vec::with_capacity(images.len());
    let mut textures = Vec::with_capacity(images.len());
    for image in images {
        let mut memory = device.create_upload_memory(image.upload_size())?;
        let pitch = write_texture_rows(&mut memory, &image.pixels, image.width, image.height)?;
        staging.push((memory, pitch));
        textures.push(device.create_texture(image.width, image.height, TextureUsage::Sampled)?);
    }

    let mut encoder = FrameEncoder::begin(list, allocator, PipelineKind::Opaque, QueueKind::Graphics)?;
    for ((memory, pitch), (image, texture)) in staging.iter().zip(images.iter().zip(&textures)) {
        let resource = ResourceId::Texture(*texture);
        encoder.track(resource, ResourceState::Common)?;
        encoder.transition(resource, ResourceState::CopyDest)?;
        encoder.copy_to_texture(memory, *texture, image.width, image.height, *pitch)?;
        encoder.transition(resource, ResourceState::Common)?;
    }
    encoder.close()?;
    encoder.submit(queue)?;

    // 暂存内存必须活到拷贝完成
    timeline.flush(queue)?;
    drop(staging);

    info!(count = textures.len(), "Textures uploaded");
    Ok(textures)
}

/// 为一类每帧描述符创建 CBV
fn populate_cbvs<D, T, F>(
    device: &D,
    heap: HeapId,
    layout: &DescriptorLayout,
    class: DescriptorClass,
    resources: &[SlotResources<D>],
    buffer: F,
) -> Result<()>
where
    D: GpuDevice,
    T: bytemuck::Pod,
    F: Fn(&SlotResources<D>) -> Option<&UploadBuffer<T, D::Memory>>,
{
    for (frame, index, heap_index) in layout.entries(class) {
        let buffer = resources
            .get(frame as usize)
            .and_then(&buffer)
            .ok_or_else(|| missing(class.name()))?;
        let address = buffer.element_gpu_address(index as usize)?;
        device.create_constant_buffer_view(heap, heap_index, address, buffer.element_stride())?;
    }
    Ok(())
}

impl<D: GpuDevice> GifCompositor<D> {
    /// 如果有帧到期，在计算队列上合成它，返回是否做了合成
    fn composite<P>(
        &mut self,
        gpu: &mut GpuContext<D, P>,
        slot: &mut FrameSlot<SlotResources<D>>,
        elapsed_ms: u32,
        background: [f32; 4],
    ) -> Result<bool> {
        let index = match self.playback.tick(elapsed_ms) {
            PlaybackAction::Idle => return Ok(false),
            PlaybackAction::DecodeFrame { frame } => frame,
        };
        let frame = self.animation.frame(index)?;
        let [width, height] = frame.size();
        let slot_index = slot.index() as u32;

        let resources = &mut slot.resources;
        let staging = resources.gif_staging.as_mut().ok_or_else(|| missing("GIF staging memory"))?;
        let pitch = write_texture_rows(staging, &frame.image.pixels, width, height)?;

        let params = GifFrameParams {
            background_color: background,
            current_frame: index as u32,
            disposal: frame.disposal as u32,
            left_top: [frame.left, frame.top],
            size: [width, height],
            _padding: [0; 2],
        };
        resources
            .gif_constants
            .as_mut()
            .ok_or_else(|| missing("GIF constant buffer"))?
            .copy_data(0, &params)?;

        let compute_queue = gpu.compute_queue.as_ref().ok_or_else(|| missing("Compute queue"))?;
        let allocator = resources
            .compute_allocator
            .as_ref()
            .ok_or_else(|| missing("Compute allocator"))?;

        ensure_pipeline(&gpu.device, PipelineKind::Compute)?;
        let source = ResourceId::Texture(self.source);
        let canvas = ResourceId::Texture(self.canvas);
        let mut encoder = FrameEncoder::begin(&mut self.list, allocator, PipelineKind::Compute, QueueKind::Compute)?;
        encoder.track(source, ResourceState::Common)?;
        encoder.track(canvas, ResourceState::Common)?;

        encoder.transition(source, ResourceState::CopyDest)?;
        encoder.copy_to_texture(staging, self.source, width, height, pitch)?;
        encoder.transition(source, ResourceState::NonPixelShaderResource)?;
        encoder.transition(canvas, ResourceState::UnorderedAccess)?;

        encoder.bind_heap(self.heap)?;
        encoder.set_table(ComputeRootSlot::Params.parameter(), self.layout.compute_cbv(slot_index)?)?;
        encoder.set_table(ComputeRootSlot::Source.parameter(), self.layout.srv(0)?)?;
        encoder.set_table(ComputeRootSlot::Canvas.parameter(), self.layout.uav(0)?)?;
        encoder.dispatch(width, height, 1)?;

        encoder.transition(canvas, ResourceState::Common)?;
        encoder.transition(source, ResourceState::Common)?;
        encoder.close()?;

        if let Some(token) = self.graphics_done.take() {
            gpu.timeline.wait_on(compute_queue, token)?;
        }
        encoder.submit(compute_queue)?;

        let value = gpu.timeline.hand_off(compute_queue, &gpu.graphics_queue)?;
        slot.stamp(value)?;

        self.playback.frame_uploaded(frame.delay_ms);
        self.dispatches += 1;
        debug!(frame = index, fence = value.value(), "GIF frame composited");
        Ok(true)
    }
}

impl<D: GpuDevice, P: Presenter> Application for DemoApp<D, P> {
    fn initialize(&mut self) -> Result<()> {
        let kind = self.config.demo.kind;
        let ring_size = self.config.graphics.frame_count;
        let gpu = &mut self.gpu;
        let device = &gpu.device;

        let waves = match kind {
            DemoKind::Waves => Some(Waves::new(WaveParams::default())?),
            _ => None,
        };

        // 几何体与渲染项
        let mut items = Vec::new();
        for part in scene_geometry(kind, self.assets.gif.as_ref(), waves.as_ref()) {
            let mesh = device.create_mesh(&part.mesh)?;
            for (name, world) in &part.items {
                let submesh = part.mesh.submesh(name).ok_or_else(|| missing(name))?;
                let item = RenderItem::new(*world, items.len() as u32, mesh, submesh.draw_args(), ring_size);
                items.push(if part.dynamic_vertices { item.with_dynamic_vertices() } else { item });
            }
        }

        let gif_canvas = match (kind, self.assets.gif.as_ref()) {
            (DemoKind::Gif, Some(gif)) => Some((gif.width, gif.height)),
            (DemoKind::Gif, None) => {
                return Err(GraphicsError::ResourceCreation("The gif demo needs a decoded GIF".to_string()).into())
            }
            _ => None,
        };

        // 帧资源环
        let desc = FrameResourceDesc {
            object_count: items.len(),
            material: kind == DemoKind::Shapes,
            gif_canvas,
            dynamic_vertices: waves.as_ref().map(Waves::vertex_count),
        };
        let resources = (0..ring_size)
            .map(|_| FrameResources::new(device, &desc))
            .collect::<Result<Vec<_>>>()?;
        let first = resources.first().ok_or_else(|| missing("Frame resources"))?;
        let mut graphics_list = device.create_command_list(QueueKind::Graphics, &first.allocator)?;

        // 纹理
        let images: &[ImageData] = match kind {
            DemoKind::Quad => self.assets.textures.get(..1).unwrap_or(&[]),
            DemoKind::Shapes => &self.assets.textures,
            DemoKind::Cube | DemoKind::Gif | DemoKind::Waves => &[],
        };
        let mut textures = upload_textures(
            device,
            &gpu.graphics_queue,
            &mut gpu.timeline,
            &mut graphics_list,
            &first.allocator,
            images,
        )?;
        if matches!(kind, DemoKind::Quad | DemoKind::Shapes) && textures.is_empty() {
            return Err(GraphicsError::ResourceCreation(format!("The {} demo needs a texture", kind.name())).into());
        }

        let gif_textures = match gif_canvas {
            Some((width, height)) => {
                let source = device.create_texture(width, height, TextureUsage::Sampled)?;
                let canvas = device.create_texture(width, height, TextureUsage::Storage)?;
                textures.push(canvas);
                Some((source, canvas))
            }
            None => None,
        };

        // 图形根签名与描述符堆
        let root = GraphicsRootLayout {
            material: desc.material,
            texture_count: textures.len() as u32,
        };
        device.create_graphics_pipelines(&root, &self.shaders.graphics)?;

        let layout = DescriptorLayout::new(
            ring_size as u32,
            PerFrameDescriptors {
                objects: items.len() as u32,
                passes: 1,
                materials: root.material as u32,
                computes: 0,
            },
            StaticDescriptors::srvs(root.texture_count),
        )?;
        let heap = device.create_descriptor_heap(&DescriptorHeapDescriptor::cbv_srv_uav(&layout))?;
        populate_cbvs(device, heap, &layout, DescriptorClass::Object, &resources, |r| Some(&r.object_constants))?;
        populate_cbvs(device, heap, &layout, DescriptorClass::Pass, &resources, |r| Some(&r.pass_constants))?;
        populate_cbvs(device, heap, &layout, DescriptorClass::Material, &resources, |r| r.material_constants.as_ref())?;
        for (slot, texture) in textures.iter().enumerate() {
            device.create_shader_resource_view(heap, layout.srv(slot as u32)?, *texture)?;
        }

        // 计算流水线
        let gif = match (gif_textures, self.assets.gif.take()) {
            (Some((source, canvas)), Some(animation)) => {
                device.create_compute_pipeline(&self.shaders.compute)?;
                let compute_layout = DescriptorLayout::new(
                    ring_size as u32,
                    PerFrameDescriptors {
                        computes: 1,
                        ..Default::default()
                    },
                    StaticDescriptors { srvs: 1, uavs: 1 },
                )?;
                let compute_heap =
                    device.create_descriptor_heap(&DescriptorHeapDescriptor::cbv_srv_uav(&compute_layout).with_name("Compute Heap"))?;
                populate_cbvs(device, compute_heap, &compute_layout, DescriptorClass::Compute, &resources, |r| {
                    r.gif_constants.as_ref()
                })?;
                device.create_shader_resource_view(compute_heap, compute_layout.srv(0)?, source)?;
                device.create_unordered_access_view(compute_heap, compute_layout.uav(0)?, canvas)?;

                let compute_allocator = first
                    .compute_allocator
                    .as_ref()
                    .ok_or_else(|| missing("Compute allocator"))?;
                let list = device.create_command_list(QueueKind::Compute, compute_allocator)?;

                Some(GifCompositor {
                    playback: GifPlayback::new(animation.frame_count()),
                    animation,
                    list,
                    layout: compute_layout,
                    heap: compute_heap,
                    source,
                    canvas,
                    graphics_done: None,
                    dispatches: 0,
                })
            }
            _ => None,
        };

        info!(
            demo = kind.name(),
            ring = ring_size,
            objects = items.len(),
            textures = textures.len(),
            descriptors = layout.capacity(),
            "Demo initialized"
        );

        self.scene = Some(GpuScene {
            ring: FrameRing::new(resources)?,
            graphics_list,
            layout,
            root,
            heap,
            items,
            gif,
            waves: waves.map(|waves| WaveSurface {
                waves,
                disturber: WaveDisturber::new(WAVE_SEED, WAVE_DISTURB_INTERVAL),
            }),
        });
        self.pending_title = Some(self.window_title());
        Ok(())
    }

    fn on_resize(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            // 最小化
            return Ok(());
        }

        self.gpu.flush()?;
        self.gpu.presenter.resize(width, height)?;
        self.back_buffer = self.gpu.presenter.current_back_buffer();
        self.viewport = Viewport::new(width, height);
        self.camera.set_aspect_ratio(self.viewport.aspect_ratio());

        info!(width, height, "Swapchain resized");
        Ok(())
    }

    fn update(&mut self, delta: Duration) -> Result<()> {
        self.frame_delta = delta;
        self.total_time += delta.as_secs_f32();
        if self.stats.record_frame(delta) {
            self.pending_title = Some(self.stats.title(&self.window_title()));
        }

        let scene = self.scene.as_mut().ok_or_else(not_initialized)?;
        let ring_size = scene.ring.len();
        if self.config.demo.kind == DemoKind::Cube {
            if let Some(item) = scene.items.first_mut() {
                item.set_world(rotation_y(self.total_time), ring_size);
            }
        }

        let slot = scene.ring.acquire(&self.gpu.timeline)?;
        let resources = &mut slot.resources;
        for item in scene.items.iter_mut() {
            item.update_object_constants(&mut resources.object_constants)?;
        }

        let pass = PassConstants::new(&self.camera.view_proj(), self.total_time);
        resources.pass_constants.copy_data(0, &pass)?;

        if let Some(material) = resources.material_constants.as_mut() {
            let texture_count = scene.root.texture_count.max(1);
            let index = (self.total_time * MATERIAL_FLIPS_PER_SECOND).floor() as u32 % texture_count;
            material.copy_data(0, &MaterialConstants::new(index))?;
        }

        // 槽位已退役，GPU 不再读它的顶点缓冲
        if let Some(surface) = scene.waves.as_mut() {
            let dt = delta.as_secs_f32();
            surface.disturber.tick(&mut surface.waves, dt)?;
            surface.waves.update(dt);
            let vertices = resources
                .dynamic_vertices
                .as_mut()
                .ok_or_else(|| missing("Wave vertex buffer"))?;
            surface.waves.write_vertices(vertices)?;
        }
        Ok(())
    }

    fn draw(&mut self) -> Result<()> {
        let _span = crate::span_trace!("draw_frame").entered();
        let scene = self.scene.as_mut().ok_or_else(not_initialized)?;
        let gpu = &mut self.gpu;
        let slot = scene.ring.current_mut()?;
        let frame = slot.index() as u32;

        if let Some(gif) = scene.gif.as_mut() {
            let elapsed_ms = u32::try_from(self.frame_delta.as_millis()).unwrap_or(u32::MAX);
            gif.composite(gpu, slot, elapsed_ms, self.config.demo.gif_background)?;
        }

        let pipeline = if self.wireframe {
            PipelineKind::Wireframe
        } else {
            PipelineKind::Opaque
        };
        let root = scene.root;
        let layout = scene.layout;
        ensure_pipeline(&gpu.device, pipeline)?;

        let mut encoder = FrameEncoder::begin(
            &mut scene.graphics_list,
            &slot.resources.allocator,
            pipeline,
            QueueKind::Graphics,
        )?;
        encoder.set_viewport(&self.viewport)?;
        encoder.begin_render_target(self.back_buffer)?;
        encoder.clear_and_bind_target(self.config.demo.clear_color)?;

        encoder.bind_heap(scene.heap)?;
        encoder.set_table(root.parameter(RootSlot::Pass)?, layout.pass_cbv(frame)?)?;
        if root.material {
            encoder.set_table(root.parameter(RootSlot::Material)?, layout.material_cbv(frame)?)?;
        }
        if root.texture_count > 0 {
            encoder.set_table(root.parameter(RootSlot::Textures)?, layout.srv(0)?)?;
        }

        let object_parameter = root.parameter(RootSlot::Object)?;
        for item in &scene.items {
            encoder.set_table(object_parameter, layout.object_cbv(frame, item.object_index)?)?;
            encoder.set_mesh(item.mesh)?;
            if item.dynamic_vertices {
                let vertices = slot
                    .resources
                    .dynamic_vertices
                    .as_ref()
                    .ok_or_else(|| missing("Wave vertex buffer"))?;
                encoder.set_vertex_buffer(vertices)?;
            }
            encoder.draw(item.draw)?;
        }

        encoder.end_render_target()?;
        encoder.close()?;
        encoder.submit(&gpu.graphics_queue)?;

        let token = gpu.timeline.signal(&gpu.graphics_queue)?;
        slot.stamp(token.value())?;
        if let Some(gif) = scene.gif.as_mut() {
            gif.graphics_done = Some(token);
        }

        self.back_buffer = encoder.present(&mut gpu.presenter, self.config.sync_interval())?;
        Ok(())
    }

    fn on_mouse_down(&mut self, button: MouseButton, x: f64, y: f64) {
        self.input.on_mouse_down(button, (x, y));
    }

    fn on_mouse_up(&mut self, button: MouseButton, x: f64, y: f64) {
        self.input.on_mouse_up(button, (x, y));
    }

    fn on_mouse_move(&mut self, x: f64, y: f64) {
        let drag = self.input.on_mouse_move((x, y));
        if drag.is_dragging() {
            self.camera.on_drag(&drag);
        }
    }

    fn on_key_down(&mut self, key: KeyCode) {
        if self.input.on_key_down(key) && key == KeyCode::F2 {
            self.wireframe = !self.wireframe;
            info!(wireframe = self.wireframe, "Fill mode toggled");
        }
    }

    fn on_key_up(&mut self, key: KeyCode) {
        self.input.on_key_up(key);
    }

    fn take_title(&mut self) -> Option<String> {
        self.pending_title.take()
    }

    fn shutdown(&mut self) -> Result<()> {
        self.gpu.flush()?;
        info!(frames = self.scene.as_ref().map_or(0, |s| s.ring.frame_number()), "GPU idle, shutting down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vertex;
    use crate::renderer::host::{HostCommand, HostDevice, HostEvent, HostGpu, HostPresenter};
    use std::collections::{HashMap, HashSet};

    const FRAME: Duration = Duration::from_millis(16);

    fn demo(kind: DemoKind, ring: usize) -> (HostGpu, DemoApp<HostDevice, HostPresenter>) {
        demo_with_latency(kind, ring, ring)
    }

    fn demo_with_latency(kind: DemoKind, ring: usize, latency: usize) -> (HostGpu, DemoApp<HostDevice, HostPresenter>) {
        let mut config = Config::default();
        config.demo.kind = kind;
        config.graphics.frame_count = ring;

        let gpu = HostGpu::new(latency);
        let presenter = HostPresenter::create(&gpu, ring, 64, 48).unwrap();
        let context = GpuContext::host(&gpu, kind.uses_compute(), presenter).unwrap();
        let app = DemoApp::new(config, context, DemoAssets::placeholder(kind), DemoShaders::default());
        (gpu, app)
    }

    fn run(app: &mut DemoApp<HostDevice, HostPresenter>, frames: usize) {
        app.initialize().unwrap();
        app.on_resize(64, 48).unwrap();
        for _ in 0..frames {
            app.update(FRAME).unwrap();
            app.draw().unwrap();
        }
    }

    #[test]
    fn test_update_before_initialize_fails() {
        let (_, mut app) = demo(DemoKind::Cube, 3);
        assert!(matches!(app.update(FRAME), Err(DemoError::Initialization(_))));
        assert!(app.draw().is_err());
    }

    #[test]
    fn test_each_demo_runs() {
        for kind in [DemoKind::Quad, DemoKind::Cube, DemoKind::Shapes, DemoKind::Gif, DemoKind::Waves] {
            let (gpu, mut app) = demo(kind, 3);
            run(&mut app, 6);
            app.shutdown().unwrap();
            assert_eq!(gpu.completed_value(), gpu.last_signaled());
            assert_eq!(app.back_buffer(), 0);
        }
    }

    #[test]
    fn test_shapes_binds_material_and_texture_tables() {
        let (gpu, mut app) = demo(DemoKind::Shapes, 3);
        run(&mut app, 1);

        let commands = gpu.executed_commands(QueueKind::Graphics);
        let tables: Vec<(u32, u32)> = commands
            .iter()
            .filter_map(|c| match c {
                HostCommand::SetDescriptorTable { parameter, heap_index, .. } => Some((*parameter, *heap_index)),
                _ => None,
            })
            .collect();
        // 2 物体, 环大小 3: 物体 0..6, 过程 6..9, 材质 9..12, 纹理 12..
        assert_eq!(tables, vec![(1, 6), (2, 9), (3, 12), (0, 0), (0, 1)]);
    }

    #[test]
    fn test_wireframe_toggle() {
        let (gpu, mut app) = demo(DemoKind::Cube, 2);
        app.initialize().unwrap();
        app.on_key_down(KeyCode::F2);
        // 按住不放不会重复切换
        app.on_key_down(KeyCode::F2);
        assert!(app.is_wireframe());
        app.on_key_up(KeyCode::F2);

        app.update(FRAME).unwrap();
        app.draw().unwrap();
        let commands = gpu.executed_commands(QueueKind::Graphics);
        assert!(commands.contains(&HostCommand::Reset(PipelineKind::Wireframe)));
    }

    #[test]
    fn test_gif_compute_only_when_frame_due() {
        let (gpu, mut app) = demo(DemoKind::Gif, 3);
        // 占位 GIF 的延时为 40/60/80ms，每帧 16ms
        run(&mut app, 10);

        // 第 1 帧立即合成，40ms 后（第 4 帧）合成第二帧，再 60ms 后（第 8 帧）合成第三帧
        assert_eq!(app.gif_dispatches(), 3);

        let events = gpu.events();
        let compute_executes = events
            .iter()
            .filter(|e| matches!(e, HostEvent::Execute { queue: QueueKind::Compute, .. }))
            .count();
        assert_eq!(compute_executes, 3);

        // 每次计算提交后都紧跟 Signal(V) 和图形队列 Wait(V)
        for (i, event) in events.iter().enumerate() {
            if let HostEvent::Execute { queue: QueueKind::Compute, .. } = event {
                match (&events[i + 1], &events[i + 2]) {
                    (HostEvent::Signal { queue: QueueKind::Compute, value }, wait) => {
                        assert!(wait.is_wait(QueueKind::Graphics, *value));
                    }
                    other => panic!("unexpected events after compute submit: {:?}", other),
                }
            }
        }
    }

    #[test]
    fn test_mouse_drag_moves_camera() {
        let (_, mut app) = demo(DemoKind::Cube, 2);
        let before = app.camera.view_proj();
        app.on_mouse_down(MouseButton::Left, 10.0, 10.0);
        app.on_mouse_move(10.0, 10.0);
        app.on_mouse_move(30.0, 10.0);
        app.on_mouse_up(MouseButton::Left, 30.0, 10.0);
        assert_ne!(app.camera.view_proj(), before);
    }

    #[test]
    fn test_missing_pipeline_is_reported() {
        let gpu = HostGpu::new(2);
        let device = gpu.device();
        assert!(ensure_pipeline(&device, PipelineKind::Opaque).is_err());
        device
            .create_graphics_pipelines(
                &GraphicsRootLayout {
                    material: false,
                    texture_count: 0,
                },
                &Default::default(),
            )
            .unwrap();
        ensure_pipeline(&device, PipelineKind::Opaque).unwrap();
        ensure_pipeline(&device, PipelineKind::Wireframe).unwrap();
        assert!(ensure_pipeline(&device, PipelineKind::Compute).is_err());
    }

    #[test]
    fn test_waves_draw_hills_then_water() {
        let (gpu, mut app) = demo(DemoKind::Waves, 3);
        run(&mut app, 1);

        let commands = gpu.executed_commands(QueueKind::Graphics);
        let draws: Vec<usize> = commands
            .iter()
            .enumerate()
            .filter_map(|(i, c)| matches!(c, HostCommand::DrawIndexed(_)).then_some(i))
            .collect();
        assert_eq!(draws.len(), 2);
        // 山丘使用静态网格，水面在 SetMesh 之后换上动态顶点缓冲
        assert!(!commands[..draws[0]]
            .iter()
            .any(|c| matches!(c, HostCommand::SetVertexBuffer { .. })));
        assert!(matches!(commands[draws[1] - 1], HostCommand::SetVertexBuffer { .. }));
        assert!(matches!(commands[draws[1] - 2], HostCommand::SetMesh(_)));
        assert_eq!(app.camera.radius(), 50.0);
    }

    #[test]
    fn test_wave_vertices_written_only_after_slot_retires() {
        let (gpu, mut app) = demo_with_latency(DemoKind::Waves, 3, 8);
        run(&mut app, 9);
        assert!(app.slot_stalls() > 0);

        let events = gpu.events();
        let vertex_bytes = (128 * 128 * Vertex::stride()) as u64;
        let mut addresses = HashSet::new();
        for event in &events {
            if let HostEvent::Execute { commands, .. } = event {
                for command in commands {
                    if let HostCommand::SetVertexBuffer {
                        gpu_address,
                        byte_size,
                        stride,
                    } = command
                    {
                        assert_eq!(*stride, Vertex::stride());
                        assert_eq!(*byte_size, vertex_bytes);
                        addresses.insert(*gpu_address);
                    }
                }
            }
        }
        // 每个帧槽位一块
        assert_eq!(addresses.len(), 3);

        // 每块顶点内存最后一次被绑定的那一帧的 Signal 值
        let mut last_reader: HashMap<u64, u64> = HashMap::new();
        let mut bound = None;
        let mut writes = 0;
        let mut rewrites = 0;
        for event in &events {
            match event {
                HostEvent::Execute {
                    queue: QueueKind::Graphics,
                    commands,
                } => {
                    bound = commands.iter().find_map(|c| match c {
                        HostCommand::SetVertexBuffer { gpu_address, .. } => Some(*gpu_address),
                        _ => None,
                    });
                }
                HostEvent::Signal {
                    queue: QueueKind::Graphics,
                    value,
                } => {
                    if let Some(address) = bound.take() {
                        last_reader.insert(address, *value);
                    }
                }
                HostEvent::UploadWrite { gpu_address, completed } if addresses.contains(gpu_address) => {
                    writes += 1;
                    if let Some(reader) = last_reader.get(gpu_address) {
                        assert!(
                            completed >= reader,
                            "vertex memory {:#x} rewritten at fence {} while frame {} may still read it",
                            gpu_address,
                            completed,
                            reader
                        );
                        rewrites += 1;
                    }
                }
                _ => {}
            }
        }
        assert_eq!(writes, 9);
        assert_eq!(rewrites, 6);
    }
}
