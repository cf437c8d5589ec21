//! GPU 同步机制模块
//!
//! 所有队列共享同一个单调递增的 Fence 计数器。CPU 等待某个值 V 意味着
//! 所有以 `Signal(V)` 入队的 GPU 工作都已完成；跨队列的顺序只能通过
//! 显式的 Signal/Wait 配对建立。
//!
//! # 使用场景
//!
//! 1. **帧同步**：帧资源复用前等待其 Fence 值完成
//! 2. **计算 → 图形**：计算队列写完 GIF 纹理后 Signal，图形队列 Wait 同一个值
//! 3. **图形 → 计算**：图形队列读完纹理后 Signal，计算队列 Wait 同一个值
//!
//! `FenceTimeline::signal` 返回一个 [`FenceToken`]，`wait_on` 消费它。
//! 令牌记录了发出它的时间线和队列，用错时间线或在同一队列上等待都会返回错误。

use std::sync::atomic::{AtomicU32, Ordering};
use tracing::trace;

use crate::core::error::{Result, SyncError};

/// Fence 值
///
/// 用于CPU-GPU同步的单调递增值。0 表示从未提交过。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FenceValue(u64);

impl FenceValue {
    /// 创建新的Fence值
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// 获取内部值
    pub fn value(&self) -> u64 {
        self.0
    }

    /// 下一个Fence值
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// 是否从未被 Signal 过
    pub fn is_initial(&self) -> bool {
        self.0 == 0
    }
}

/// 队列类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueKind {
    /// 图形队列（DIRECT）
    Graphics,
    /// 计算队列（COMPUTE）
    Compute,
}

impl QueueKind {
    /// 获取队列名称
    pub fn name(&self) -> &'static str {
        match self {
            QueueKind::Graphics => "graphics",
            QueueKind::Compute => "compute",
        }
    }
}

/// Fence 对象的 CPU 侧接口
pub trait Fence {
    /// GPU 已完成的最大值
    fn completed_value(&self) -> u64;

    /// 阻塞当前线程直到 `completed_value() >= value`
    fn wait_for(&self, value: u64) -> Result<()>;
}

/// 命令队列
///
/// 同一队列上的提交按顺序执行，跨队列的顺序只由 `signal`/`wait` 建立。
pub trait CommandQueue {
    type Fence: Fence;
    type List;

    /// 队列类型
    fn kind(&self) -> QueueKind;

    /// 提交一个已关闭的命令列表
    fn execute(&self, list: &Self::List) -> Result<()>;

    /// 在队列末尾插入 Signal(value)
    fn signal(&self, fence: &Self::Fence, value: u64) -> Result<()>;

    /// 队列在 GPU 侧等待 Fence 达到 value 后才继续执行后续命令
    fn wait(&self, fence: &Self::Fence, value: u64) -> Result<()>;
}

/// 一次 Signal 的凭证
///
/// 由 [`FenceTimeline::signal`] 产生，交给 [`FenceTimeline::wait_on`] 或
/// [`FenceTimeline::block_on`] 消费。
#[must_use = "a signaled fence value should be waited on or stamped on a frame slot"]
#[derive(Debug, PartialEq, Eq)]
pub struct FenceToken {
    value: FenceValue,
    timeline: u32,
    queue: QueueKind,
}

impl FenceToken {
    /// Signal 的值
    pub fn value(&self) -> FenceValue {
        self.value
    }

    /// 发出 Signal 的队列
    pub fn queue(&self) -> QueueKind {
        self.queue
    }
}

static NEXT_TIMELINE_ID: AtomicU32 = AtomicU32::new(1);

/// Fence 时间线
///
/// 持有共享 Fence 和最后一次 Signal 的值，保证每次 Signal 的值严格递增。
pub struct FenceTimeline<F> {
    fence: F,
    id: u32,
    last_signaled: FenceValue,
}

impl<F: Fence> FenceTimeline<F> {
    /// 创建时间线，Fence 的初始值必须为 0
    pub fn new(fence: F) -> Self {
        Self {
            fence,
            id: NEXT_TIMELINE_ID.fetch_add(1, Ordering::Relaxed),
            last_signaled: FenceValue::default(),
        }
    }

    pub fn fence(&self) -> &F {
        &self.fence
    }

    /// 最后一次 Signal 的值
    pub fn last_signaled(&self) -> FenceValue {
        self.last_signaled
    }

    /// GPU 已完成的值
    pub fn completed_value(&self) -> FenceValue {
        FenceValue::new(self.fence.completed_value())
    }

    /// 在 `queue` 上 Signal 下一个值
    pub fn signal<Q>(&mut self, queue: &Q) -> Result<FenceToken>
    where
        Q: CommandQueue<Fence = F>,
    {
        let value = self.last_signaled.next();
        queue.signal(&self.fence, value.value())?;
        self.last_signaled = value;

        trace!(queue = queue.kind().name(), value = value.value(), "Fence signaled");

        Ok(FenceToken {
            value,
            timeline: self.id,
            queue: queue.kind(),
        })
    }

    /// 让 `queue` 在 GPU 侧等待令牌对应的值
    pub fn wait_on<Q>(&self, queue: &Q, token: FenceToken) -> Result<()>
    where
        Q: CommandQueue<Fence = F>,
    {
        self.check_token(&token)?;
        if token.queue == queue.kind() {
            return Err(SyncError::SameQueueWait {
                queue: queue.kind().name(),
            }
            .into());
        }

        trace!(
            producer = token.queue.name(),
            consumer = queue.kind().name(),
            value = token.value.value(),
            "Cross-queue wait"
        );
        queue.wait(&self.fence, token.value.value())
    }

    /// 生产者队列 Signal，消费者队列等待同一个值，返回该值
    pub fn hand_off<Q>(&mut self, producer: &Q, consumer: &Q) -> Result<FenceValue>
    where
        Q: CommandQueue<Fence = F>,
    {
        let token = self.signal(producer)?;
        let value = token.value();
        self.wait_on(consumer, token)?;
        Ok(value)
    }

    /// CPU 阻塞等待令牌对应的值
    pub fn block_on(&self, token: FenceToken) -> Result<()> {
        self.check_token(&token)?;
        self.wait_cpu(token.value)
    }

    /// CPU 阻塞等待某个已经 Signal 过的值
    pub fn wait_cpu(&self, value: FenceValue) -> Result<()> {
        if value > self.last_signaled {
            return Err(SyncError::Deadlock {
                value: value.value(),
                last_signaled: self.last_signaled.value(),
            }
            .into());
        }
        if self.completed_value() >= value {
            return Ok(());
        }
        self.fence.wait_for(value.value())
    }

    /// 刷新队列：Signal 新值并等待其完成
    pub fn flush<Q>(&mut self, queue: &Q) -> Result<()>
    where
        Q: CommandQueue<Fence = F>,
    {
        let token = self.signal(queue)?;
        self.block_on(token)
    }

    fn check_token(&self, token: &FenceToken) -> Result<()> {
        if token.timeline != self.id {
            return Err(SyncError::ForeignToken {
                token: token.timeline,
                timeline: self.id,
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::DemoError;
    use crate::renderer::host::{HostGpu, HostQueue};

    fn queues(gpu: &HostGpu) -> (HostQueue, HostQueue) {
        (gpu.queue(QueueKind::Graphics), gpu.queue(QueueKind::Compute))
    }

    #[test]
    fn test_fence_value() {
        let fence = FenceValue::new(0);
        assert!(fence.is_initial());
        assert_eq!(fence.next().value(), 1);
        assert!(FenceValue::new(1) < FenceValue::new(2));
    }

    #[test]
    fn test_signal_values_strictly_increase() {
        let gpu = HostGpu::new(8);
        let (graphics, compute) = queues(&gpu);
        let mut timeline = FenceTimeline::new(gpu.fence());

        let a = timeline.signal(&compute).unwrap();
        let b = timeline.signal(&graphics).unwrap();
        let c = timeline.signal(&compute).unwrap();
        assert!(a.value() < b.value() && b.value() < c.value());
        assert_eq!(timeline.last_signaled(), c.value());

        timeline.wait_on(&graphics, a).unwrap();
        timeline.wait_on(&compute, b).unwrap();
        timeline.block_on(c).unwrap();
    }

    #[test]
    fn test_wait_on_same_queue_rejected() {
        let gpu = HostGpu::new(8);
        let (graphics, _) = queues(&gpu);
        let mut timeline = FenceTimeline::new(gpu.fence());

        let token = timeline.signal(&graphics).unwrap();
        let err = timeline.wait_on(&graphics, token).unwrap_err();
        assert!(matches!(err, DemoError::Sync(SyncError::SameQueueWait { .. })));
    }

    #[test]
    fn test_foreign_token_rejected() {
        let gpu = HostGpu::new(8);
        let (graphics, compute) = queues(&gpu);
        let mut first = FenceTimeline::new(gpu.fence());
        let second = FenceTimeline::new(gpu.fence());

        let token = first.signal(&compute).unwrap();
        let err = second.wait_on(&graphics, token).unwrap_err();
        assert!(matches!(err, DemoError::Sync(SyncError::ForeignToken { .. })));
    }

    #[test]
    fn test_cpu_wait_on_unsignaled_value_is_deadlock() {
        let gpu = HostGpu::new(8);
        let timeline = FenceTimeline::new(gpu.fence());
        let err = timeline.wait_cpu(FenceValue::new(1)).unwrap_err();
        assert!(matches!(err, DemoError::Sync(SyncError::Deadlock { .. })));
    }

    #[test]
    fn test_flush_retires_everything() {
        let gpu = HostGpu::new(8);
        let (graphics, _) = queues(&gpu);
        let mut timeline = FenceTimeline::new(gpu.fence());

        for _ in 0..4 {
            let _ = timeline.signal(&graphics).unwrap();
        }
        timeline.flush(&graphics).unwrap();
        assert_eq!(timeline.completed_value(), timeline.last_signaled());
    }

    #[test]
    fn test_hand_off_orders_consumer_after_producer() {
        let gpu = HostGpu::new(8);
        let (graphics, compute) = queues(&gpu);
        let mut timeline = FenceTimeline::new(gpu.fence());

        let value = timeline.hand_off(&compute, &graphics).unwrap();
        let events = gpu.events();
        let signal = events
            .iter()
            .position(|e| e.is_signal(QueueKind::Compute, value.value()))
            .unwrap();
        let wait = events
            .iter()
            .position(|e| e.is_wait(QueueKind::Graphics, value.value()))
            .unwrap();
        assert!(signal < wait);
    }
}
