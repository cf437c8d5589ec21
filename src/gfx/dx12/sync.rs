//! DX12 Fence 与命令队列

use windows::Win32::Foundation::{CloseHandle, HANDLE};
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::System::Threading::{CreateEventA, WaitForSingleObject, INFINITE};

use crate::core::error::Result;
use crate::gfx::dx12::command::Dx12CommandList;
use crate::gfx::dx12::ApiResultExt;
use crate::renderer::sync::{CommandQueue, Fence, QueueKind};

/// 命令列表类型
pub(crate) fn list_type(kind: QueueKind) -> D3D12_COMMAND_LIST_TYPE {
    match kind {
        QueueKind::Graphics => D3D12_COMMAND_LIST_TYPE_DIRECT,
        QueueKind::Compute => D3D12_COMMAND_LIST_TYPE_COMPUTE,
    }
}

/// Fence 与其完成事件
pub struct Dx12Fence {
    fence: ID3D12Fence,
    event: HANDLE,
}

impl Dx12Fence {
    pub fn new(device: &ID3D12Device) -> Result<Self> {
        unsafe {
            let fence: ID3D12Fence = device.CreateFence(0, D3D12_FENCE_FLAG_NONE).context("CreateFence")?;
            let event = CreateEventA(None, false, false, None).context("CreateEventA(fence event)")?;
            Ok(Self { fence, event })
        }
    }

    pub fn fence(&self) -> &ID3D12Fence {
        &self.fence
    }
}

impl Fence for Dx12Fence {
    fn completed_value(&self) -> u64 {
        unsafe { self.fence.GetCompletedValue() }
    }

    fn wait_for(&self, value: u64) -> Result<()> {
        unsafe {
            if self.fence.GetCompletedValue() < value {
                self.fence
                    .SetEventOnCompletion(value, self.event)
                    .context("SetEventOnCompletion")?;
                WaitForSingleObject(self.event, INFINITE);
            }
        }
        Ok(())
    }
}

impl Drop for Dx12Fence {
    fn drop(&mut self) {
        unsafe {
            let _ = CloseHandle(self.event);
        }
    }
}

/// 图形或计算命令队列
pub struct Dx12Queue {
    queue: ID3D12CommandQueue,
    kind: QueueKind,
}

impl Dx12Queue {
    pub fn new(device: &ID3D12Device, kind: QueueKind) -> Result<Self> {
        let desc = D3D12_COMMAND_QUEUE_DESC {
            Type: list_type(kind),
            Flags: D3D12_COMMAND_QUEUE_FLAG_NONE,
            ..Default::default()
        };
        let queue: ID3D12CommandQueue =
            unsafe { device.CreateCommandQueue(&desc) }.context(&format!("CreateCommandQueue({})", kind.name()))?;
        Ok(Self { queue, kind })
    }

    pub fn queue(&self) -> &ID3D12CommandQueue {
        &self.queue
    }
}

impl CommandQueue for Dx12Queue {
    type Fence = Dx12Fence;
    type List = Dx12CommandList;

    fn kind(&self) -> QueueKind {
        self.kind
    }

    fn execute(&self, list: &Dx12CommandList) -> Result<()> {
        let command_lists = [Some(list.raw().clone().into())];
        unsafe {
            self.queue.ExecuteCommandLists(&command_lists);
        }
        Ok(())
    }

    fn signal(&self, fence: &Dx12Fence, value: u64) -> Result<()> {
        unsafe { self.queue.Signal(fence.fence(), value) }.context("ID3D12CommandQueue::Signal")
    }

    fn wait(&self, fence: &Dx12Fence, value: u64) -> Result<()> {
        unsafe { self.queue.Wait(fence.fence(), value) }.context("ID3D12CommandQueue::Wait")
    }
}
