//! 描述符管理模块
//!
//! CBV/SRV/UAV 堆是一张手工管理的平坦索引表：创建时一次性确定大小，不增长、
//! 不回收。每个描述符的位置由 `(帧号, 对象号, 类别)` 纯函数计算得出，
//! 填充描述符和绑定描述符表都通过同一个 [`DescriptorLayout`] 计算，两边不会错位。
//!
//! # 堆布局
//!
//! ```text
//! | Object: ring * objects | Pass: ring * passes | Material: ring * materials | Compute: ring * computes | SRV | UAV |
//! ```
//!
//! 类别 `c` 中第 `frame` 帧的第 `i` 个描述符位于
//! `ring * (c 之前各类别每帧数量之和) + frame * count(c) + i`，
//! 静态描述符位于所有每帧描述符之后：先是 SRV，再是 UAV，两者各自从 0 编号。

use crate::core::error::{GraphicsError, Result};

/// 描述符类型
///
/// 没有采样器堆：采样器作为静态采样器写在图形根签名里。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorType {
    /// 渲染目标视图 (RTV)
    RenderTargetView,
    /// 深度模板视图 (DSV)
    DepthStencilView,
    /// CBV/SRV/UAV 混合堆
    CbvSrvUav,
}

impl DescriptorType {
    /// 描述符类型是否需要着色器可见
    pub fn is_shader_visible(&self) -> bool {
        matches!(self, DescriptorType::CbvSrvUav)
    }

    /// 获取描述符类型名称
    pub fn name(&self) -> &'static str {
        match self {
            DescriptorType::RenderTargetView => "RTV",
            DescriptorType::DepthStencilView => "DSV",
            DescriptorType::CbvSrvUav => "CBV/SRV/UAV",
        }
    }
}

/// 描述符堆描述信息
#[derive(Debug, Clone)]
pub struct DescriptorHeapDescriptor {
    /// 描述符类型
    pub descriptor_type: DescriptorType,
    /// 描述符数量
    pub num_descriptors: u32,
    /// 是否着色器可见
    pub shader_visible: bool,
    /// 调试名称
    pub name: Option<String>,
}

impl DescriptorHeapDescriptor {
    /// 创建新的描述符堆描述符
    pub fn new(descriptor_type: DescriptorType, num_descriptors: u32) -> Self {
        Self {
            descriptor_type,
            num_descriptors,
            shader_visible: descriptor_type.is_shader_visible(),
            name: None,
        }
    }

    /// 设置调试名称
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// 创建 RTV 堆描述符
    pub fn rtv(num_descriptors: u32) -> Self {
        Self::new(DescriptorType::RenderTargetView, num_descriptors).with_name("RTV Heap")
    }

    /// 创建 DSV 堆描述符
    pub fn dsv(num_descriptors: u32) -> Self {
        Self::new(DescriptorType::DepthStencilView, num_descriptors).with_name("DSV Heap")
    }

    /// 按布局创建 CBV/SRV/UAV 堆描述符
    pub fn cbv_srv_uav(layout: &DescriptorLayout) -> Self {
        Self::new(DescriptorType::CbvSrvUav, layout.capacity()).with_name("CBV/SRV/UAV Heap")
    }
}

/// 描述符句柄（CPU 可见）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuDescriptorHandle {
    /// 句柄指针值
    pub ptr: usize,
    /// 描述符索引
    pub index: u32,
}

impl CpuDescriptorHandle {
    pub fn new(ptr: usize, index: u32) -> Self {
        Self { ptr, index }
    }

    /// 偏移句柄
    pub fn offset(&self, count: u32, increment_size: u32) -> Self {
        Self {
            ptr: self.ptr + count as usize * increment_size as usize,
            index: self.index + count,
        }
    }
}

/// 描述符句柄（GPU 可见）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuDescriptorHandle {
    /// 句柄指针值
    pub ptr: u64,
    /// 描述符索引
    pub index: u32,
}

impl GpuDescriptorHandle {
    pub fn new(ptr: u64, index: u32) -> Self {
        Self { ptr, index }
    }

    /// 偏移句柄
    pub fn offset(&self, count: u32, increment_size: u32) -> Self {
        Self {
            ptr: self.ptr + count as u64 * increment_size as u64,
            index: self.index + count,
        }
    }
}

/// 每帧描述符类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorClass {
    /// 物体常量 CBV，每帧 `objects` 个
    Object,
    /// 渲染过程常量 CBV
    Pass,
    /// 材质常量 CBV
    Material,
    /// 计算着色器参数 CBV
    Compute,
}

impl DescriptorClass {
    const ORDER: [DescriptorClass; 4] = [
        DescriptorClass::Object,
        DescriptorClass::Pass,
        DescriptorClass::Material,
        DescriptorClass::Compute,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DescriptorClass::Object => "Object CBV",
            DescriptorClass::Pass => "Pass CBV",
            DescriptorClass::Material => "Material CBV",
            DescriptorClass::Compute => "Compute CBV",
        }
    }
}

/// 每帧各类别描述符的数量
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PerFrameDescriptors {
    pub objects: u32,
    pub passes: u32,
    pub materials: u32,
    pub computes: u32,
}

impl PerFrameDescriptors {
    fn count(&self, class: DescriptorClass) -> u32 {
        match class {
            DescriptorClass::Object => self.objects,
            DescriptorClass::Pass => self.passes,
            DescriptorClass::Material => self.materials,
            DescriptorClass::Compute => self.computes,
        }
    }

    fn total(&self) -> u32 {
        self.objects + self.passes + self.materials + self.computes
    }
}

/// 不随帧变化的描述符数量
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StaticDescriptors {
    /// 纹理 SRV
    pub srvs: u32,
    /// UAV
    pub uavs: u32,
}

impl StaticDescriptors {
    pub fn srvs(srvs: u32) -> Self {
        Self { srvs, uavs: 0 }
    }

    fn total(&self) -> u32 {
        self.srvs + self.uavs
    }
}

/// 描述符堆布局
///
/// 集中所有描述符索引的计算，填充和绑定使用同一套访问器。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorLayout {
    ring_size: u32,
    per_frame: PerFrameDescriptors,
    statics: StaticDescriptors,
}

impl DescriptorLayout {
    /// 创建布局
    ///
    /// # 参数
    ///
    /// * `ring_size` - 帧资源环大小
    /// * `per_frame` - 每帧各类别描述符数量
    /// * `statics` - 不随帧变化的 SRV 和 UAV 数量
    pub fn new(ring_size: u32, per_frame: PerFrameDescriptors, statics: StaticDescriptors) -> Result<Self> {
        if ring_size == 0 {
            return Err(GraphicsError::ResourceCreation(
                "Descriptor layout needs at least one frame resource".to_string(),
            )
            .into());
        }
        Ok(Self {
            ring_size,
            per_frame,
            statics,
        })
    }

    pub fn ring_size(&self) -> u32 {
        self.ring_size
    }

    pub fn statics(&self) -> StaticDescriptors {
        self.statics
    }

    /// 每帧该类别的描述符数量
    pub fn count(&self, class: DescriptorClass) -> u32 {
        self.per_frame.count(class)
    }

    /// 堆中描述符总数：`ring * 每帧总数 + 静态数`
    pub fn capacity(&self) -> u32 {
        self.ring_size * self.per_frame.total() + self.statics.total()
    }

    /// 第 `frame` 帧第 `index` 个 `class` 描述符在堆中的位置
    pub fn index(&self, class: DescriptorClass, frame: u32, index: u32) -> Result<u32> {
        let count = self.count(class);
        if frame >= self.ring_size {
            return Err(GraphicsError::out_of_range(class.name(), frame as usize, self.ring_size as usize).into());
        }
        if index >= count {
            return Err(GraphicsError::out_of_range(class.name(), index as usize, count as usize).into());
        }

        let preceding: u32 = DescriptorClass::ORDER
            .iter()
            .take_while(|c| **c != class)
            .map(|c| self.count(*c))
            .sum();

        Ok(self.ring_size * preceding + frame * count + index)
    }

    /// 物体常量 CBV
    pub fn object_cbv(&self, frame: u32, object: u32) -> Result<u32> {
        self.index(DescriptorClass::Object, frame, object)
    }

    /// 渲染过程常量 CBV
    pub fn pass_cbv(&self, frame: u32) -> Result<u32> {
        self.index(DescriptorClass::Pass, frame, 0)
    }

    /// 材质常量 CBV
    pub fn material_cbv(&self, frame: u32) -> Result<u32> {
        self.index(DescriptorClass::Material, frame, 0)
    }

    /// 计算着色器参数 CBV
    pub fn compute_cbv(&self, frame: u32) -> Result<u32> {
        self.index(DescriptorClass::Compute, frame, 0)
    }

    fn static_base(&self) -> u32 {
        self.ring_size * self.per_frame.total()
    }

    /// 第 `slot` 个 SRV
    pub fn srv(&self, slot: u32) -> Result<u32> {
        if slot >= self.statics.srvs {
            return Err(GraphicsError::out_of_range("SRV", slot as usize, self.statics.srvs as usize).into());
        }
        Ok(self.static_base() + slot)
    }

    /// 第 `slot` 个 UAV，排在全部 SRV 之后
    pub fn uav(&self, slot: u32) -> Result<u32> {
        if slot >= self.statics.uavs {
            return Err(GraphicsError::out_of_range("UAV", slot as usize, self.statics.uavs as usize).into());
        }
        Ok(self.static_base() + self.statics.srvs + slot)
    }

    /// 遍历某类别的全部 `(frame, index, heap_index)`，用于填充描述符
    pub fn entries(&self, class: DescriptorClass) -> impl Iterator<Item = (u32, u32, u32)> + '_ {
        let count = self.count(class);
        (0..self.ring_size).flat_map(move |frame| {
            (0..count).filter_map(move |i| self.index(class, frame, i).ok().map(|heap| (frame, i, heap)))
        })
    }
}

/// 图形根签名参数槽
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootSlot {
    /// b0 物体常量表
    Object,
    /// b1 渲染过程常量表
    Pass,
    /// b2 材质常量表
    Material,
    /// t0.. 纹理表
    Textures,
}

/// 图形根签名布局
///
/// 物体和渲染过程常量表总是存在，材质表和纹理表按演示需要追加在后面。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphicsRootLayout {
    pub material: bool,
    pub texture_count: u32,
}

impl GraphicsRootLayout {
    /// 根参数索引
    pub fn parameter(&self, slot: RootSlot) -> Result<u32> {
        let material = self.material as u32;
        match slot {
            RootSlot::Object => Ok(0),
            RootSlot::Pass => Ok(1),
            RootSlot::Material if self.material => Ok(2),
            RootSlot::Textures if self.texture_count > 0 => Ok(2 + material),
            _ => Err(GraphicsError::out_of_range("Root parameter", 2 + material as usize, self.parameter_count() as usize).into()),
        }
    }

    /// 根参数数量
    pub fn parameter_count(&self) -> u32 {
        2 + self.material as u32 + (self.texture_count > 0) as u32
    }
}

/// 计算根签名参数槽：b0 参数表、t0 源帧、u0 画布
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeRootSlot {
    Params = 0,
    Source = 1,
    Canvas = 2,
}

impl ComputeRootSlot {
    pub fn parameter(&self) -> u32 {
        *self as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn shapes_layout(objects: u32, ring: u32, textures: u32) -> DescriptorLayout {
        DescriptorLayout::new(
            ring,
            PerFrameDescriptors {
                objects,
                passes: 1,
                materials: 1,
                computes: 0,
            },
            StaticDescriptors::srvs(textures),
        )
        .unwrap()
    }

    #[test]
    fn test_object_cbv_binding_index() {
        let layout = DescriptorLayout::new(
            3,
            PerFrameDescriptors {
                objects: 2,
                passes: 1,
                ..Default::default()
            },
            StaticDescriptors::default(),
        )
        .unwrap();
        assert_eq!(layout.object_cbv(1, 1).unwrap(), 3);
        assert_eq!(layout.pass_cbv(0).unwrap(), 6);
        assert_eq!(layout.capacity(), 9);
    }

    #[test]
    fn test_layout_matches_frame_major_convention() {
        let (objects, ring) = (5, 3);
        let layout = shapes_layout(objects, ring, 4);
        for frame in 0..ring {
            for obj in 0..objects {
                assert_eq!(layout.object_cbv(frame, obj).unwrap(), frame * objects + obj);
            }
            assert_eq!(layout.pass_cbv(frame).unwrap(), ring * objects + frame);
            assert_eq!(layout.material_cbv(frame).unwrap(), ring * (objects + 1) + frame);
        }
        for slot in 0..4 {
            assert_eq!(layout.srv(slot).unwrap(), (objects + 2) * ring + slot);
        }
        assert_eq!(layout.capacity(), (objects + 2) * ring + 4);
    }

    #[test]
    fn test_compute_heap_layout() {
        let layout = DescriptorLayout::new(
            3,
            PerFrameDescriptors {
                computes: 1,
                ..Default::default()
            },
            StaticDescriptors { srvs: 1, uavs: 1 },
        )
        .unwrap();
        assert_eq!(layout.compute_cbv(2).unwrap(), 2);
        assert_eq!(layout.srv(0).unwrap(), 3);
        assert_eq!(layout.uav(0).unwrap(), 4);
        assert_eq!(layout.capacity(), 5);
    }

    #[test]
    fn test_srv_and_uav_are_numbered_separately() {
        let layout = DescriptorLayout::new(
            2,
            PerFrameDescriptors {
                passes: 1,
                ..Default::default()
            },
            StaticDescriptors { srvs: 2, uavs: 2 },
        )
        .unwrap();
        assert_eq!(layout.srv(0).unwrap(), 2);
        assert_eq!(layout.srv(1).unwrap(), 3);
        assert_eq!(layout.uav(0).unwrap(), 4);
        assert_eq!(layout.uav(1).unwrap(), 5);
        assert!(layout.srv(2).is_err());
        assert!(layout.uav(2).is_err());

        // 只有 SRV 的堆里没有 UAV
        let textures = shapes_layout(1, 2, 3);
        assert!(textures.uav(0).is_err());
    }

    #[test]
    fn test_indices_are_a_bijection_onto_heap() {
        for ring in 2..=3 {
            for objects in 1..6 {
                let layout = shapes_layout(objects, ring, 3);
                let mut seen = HashSet::new();
                for class in DescriptorClass::ORDER {
                    for (_, _, heap) in layout.entries(class) {
                        assert!(heap < layout.capacity());
                        assert!(seen.insert(heap), "duplicate index {}", heap);
                    }
                }
                let statics = layout.statics();
                for slot in 0..statics.srvs {
                    assert!(seen.insert(layout.srv(slot).unwrap()));
                }
                for slot in 0..statics.uavs {
                    assert!(seen.insert(layout.uav(slot).unwrap()));
                }
                assert_eq!(seen.len() as u32, layout.capacity());
            }
        }
    }

    #[test]
    fn test_out_of_range_requests_fail() {
        let layout = shapes_layout(2, 3, 1);
        assert!(layout.object_cbv(3, 0).is_err());
        assert!(layout.object_cbv(0, 2).is_err());
        assert!(layout.compute_cbv(0).is_err());
        assert!(layout.srv(1).is_err());
        assert!(DescriptorLayout::new(0, PerFrameDescriptors::default(), StaticDescriptors::default()).is_err());
    }

    #[test]
    fn test_only_resource_heap_is_shader_visible() {
        let layout = shapes_layout(1, 2, 1);
        assert!(DescriptorHeapDescriptor::cbv_srv_uav(&layout).shader_visible);
        assert!(!DescriptorHeapDescriptor::rtv(3).shader_visible);
        assert!(!DescriptorHeapDescriptor::dsv(1).shader_visible);
    }

    #[test]
    fn test_root_layout() {
        let shapes = GraphicsRootLayout {
            material: true,
            texture_count: 3,
        };
        assert_eq!(shapes.parameter(RootSlot::Textures).unwrap(), 3);
        assert_eq!(shapes.parameter_count(), 4);

        let quad = GraphicsRootLayout {
            material: false,
            texture_count: 1,
        };
        assert_eq!(quad.parameter(RootSlot::Textures).unwrap(), 2);
        assert!(quad.parameter(RootSlot::Material).is_err());

        let cube = GraphicsRootLayout {
            material: false,
            texture_count: 0,
        };
        assert_eq!(cube.parameter_count(), 2);
        assert!(cube.parameter(RootSlot::Textures).is_err());
    }
}
