//! 帧流水线端到端测试
//!
//! 在模拟 GPU 上验证帧资源环的背压和描述符绑定位置。

use std::time::Duration;

use d3d12_demos::app::{Application, DemoApp};
use d3d12_demos::core::{Config, DemoKind};
use d3d12_demos::renderer::host::{HostCommand, HostDevice, HostEvent, HostGpu, HostPresenter};
use d3d12_demos::renderer::shaders::DemoShaders;
use d3d12_demos::renderer::{FenceTimeline, FrameRing, GpuContext, QueueKind};
use d3d12_demos::scene::DemoAssets;

const FRAME: Duration = Duration::from_millis(16);

/// GPU 最多积压的 Signal 数，大于环大小时 CPU 必须靠环自身背压
const SLOW_GPU_LATENCY: usize = 8;

fn demo_app(kind: DemoKind, ring: usize, latency: usize) -> (HostGpu, DemoApp<HostDevice, HostPresenter>) {
    let mut config = Config::default();
    config.demo.kind = kind;
    config.graphics.frame_count = ring;

    let gpu = HostGpu::new(latency);
    let presenter = HostPresenter::create(&gpu, ring, 320, 240).unwrap();
    let context = GpuContext::host(&gpu, kind.uses_compute(), presenter).unwrap();
    let mut app = DemoApp::new(config, context, DemoAssets::placeholder(kind), DemoShaders::default());
    app.initialize().unwrap();
    app.on_resize(320, 240).unwrap();
    (gpu, app)
}

#[test]
fn test_ring_of_three_bounds_cpu_run_ahead() {
    let gpu = HostGpu::new(SLOW_GPU_LATENCY);
    let queue = gpu.queue(QueueKind::Graphics);
    let mut timeline = FenceTimeline::new(gpu.fence());
    let mut ring = FrameRing::new(vec![(), (), ()]).unwrap();

    let mut order = Vec::new();
    for _ in 0..10 {
        let slot = ring.acquire(&timeline).unwrap();
        order.push(slot.index());

        // 已提交未完成的帧加上正在录制的这一帧不超过 3
        let in_flight = gpu.last_signaled() - gpu.completed_value();
        assert!(in_flight + 1 <= 3, "{} frames queued ahead of the GPU", in_flight + 1);

        let token = timeline.signal(&queue).unwrap();
        slot.stamp(token.value()).unwrap();
    }

    assert_eq!(order, vec![0, 1, 2, 0, 1, 2, 0, 1, 2, 0]);
    // 前三帧不需要等待，之后每一帧都在等最老的槽位
    assert_eq!(ring.stalls(), 7);
    assert_eq!(gpu.stalls(), 7);
}

#[test]
fn test_fast_gpu_never_blocks_the_ring() {
    let gpu = HostGpu::new(1);
    let queue = gpu.queue(QueueKind::Graphics);
    let mut timeline = FenceTimeline::new(gpu.fence());
    let mut ring = FrameRing::new(vec![(), (), ()]).unwrap();

    for _ in 0..10 {
        let slot = ring.acquire(&timeline).unwrap();
        let token = timeline.signal(&queue).unwrap();
        slot.stamp(token.value()).unwrap();
    }
    assert_eq!(ring.stalls(), 0);
}

#[test]
fn test_demo_frame_loop_cycles_slots() {
    let (gpu, mut app) = demo_app(DemoKind::Quad, 3, SLOW_GPU_LATENCY);

    let mut order = Vec::new();
    for _ in 0..10 {
        app.update(FRAME).unwrap();
        order.push(app.current_slot().unwrap());
        assert!(gpu.last_signaled() - gpu.completed_value() <= 2);
        app.draw().unwrap();
    }

    assert_eq!(order, vec![0, 1, 2, 0, 1, 2, 0, 1, 2, 0]);
    assert_eq!(app.slot_stalls(), 7);

    app.shutdown().unwrap();
    assert_eq!(gpu.completed_value(), gpu.last_signaled());
}

#[test]
fn test_frame_one_object_one_binds_heap_slot_three() {
    let (gpu, mut app) = demo_app(DemoKind::Shapes, 3, 3);
    let layout = *app.descriptor_layout().unwrap();
    assert_eq!(layout.object_cbv(1, 1).unwrap(), 3);

    for _ in 0..2 {
        app.update(FRAME).unwrap();
        app.draw().unwrap();
    }

    let graphics_submits: Vec<Vec<HostCommand>> = gpu
        .events()
        .into_iter()
        .filter_map(|e| match e {
            HostEvent::Execute {
                queue: QueueKind::Graphics,
                commands,
            } if commands.iter().any(|c| matches!(c, HostCommand::DrawIndexed(_))) => Some(commands),
            _ => None,
        })
        .collect();
    assert_eq!(graphics_submits.len(), 2);

    let object_tables = |commands: &[HostCommand]| -> Vec<u32> {
        commands
            .iter()
            .filter_map(|c| match c {
                HostCommand::SetDescriptorTable {
                    parameter: 0,
                    heap_index,
                    ..
                } => Some(*heap_index),
                _ => None,
            })
            .collect()
    };
    assert_eq!(object_tables(&graphics_submits[0]), vec![0, 1]);
    assert_eq!(object_tables(&graphics_submits[1]), vec![2, 3]);

    // 堆中第 3 个描述符指向槽位 1 物体常量缓冲的第 2 个元素
    let cbv_address = |index: u32| {
        gpu.events()
            .into_iter()
            .find_map(|e| match e {
                HostEvent::CreateView {
                    index: i,
                    view: d3d12_demos::renderer::host::HostView::ConstantBuffer { gpu_address, byte_size },
                    ..
                } if i == index => Some((gpu_address, byte_size)),
                _ => None,
            })
            .unwrap()
    };
    let (slot_one_first, stride) = cbv_address(2);
    assert_eq!(stride, 256);
    assert_eq!(cbv_address(3).0, slot_one_first + 256);
}
