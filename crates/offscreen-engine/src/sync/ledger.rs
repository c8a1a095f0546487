use std::collections::BTreeMap;
use std::ops::Deref;

/// Creation-ordered identifier of a tracked GPU handle.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct HandleId(u64);

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct HandleRecord {
    pub id: HandleId,
    pub kind: &'static str,
    pub label: String,
}

/// A GPU object whose lifetime the ledger tracks.
pub trait GpuObject {
    const KIND: &'static str;

    /// Destroys the object. The default simply drops it.
    fn release(self)
    where
        Self: Sized,
    {
    }
}

impl GpuObject for wgpu::Buffer {
    const KIND: &'static str = "buffer";

    fn release(self) {
        self.destroy();
    }
}

impl GpuObject for wgpu::ShaderModule {
    const KIND: &'static str = "shader module";
}

impl GpuObject for wgpu::BindGroupLayout {
    const KIND: &'static str = "bind group layout";
}

impl GpuObject for wgpu::BindGroup {
    const KIND: &'static str = "bind group";
}

impl GpuObject for wgpu::PipelineLayout {
    const KIND: &'static str = "pipeline layout";
}

impl GpuObject for wgpu::ComputePipeline {
    const KIND: &'static str = "compute pipeline";
}

impl GpuObject for wgpu::RenderPipeline {
    const KIND: &'static str = "render pipeline";
}

/// Single-owner wrapper tying a GPU object to its ledger entry.
#[derive(Debug)]
pub struct Tracked<T> {
    id: HandleId,
    value: T,
}

impl<T> Tracked<T> {
    pub fn id(&self) -> HandleId {
        self.id
    }
}

impl<T> Deref for Tracked<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

trait Release {
    fn id(&self) -> HandleId;
    fn release_boxed(self: Box<Self>);
}

impl<T: GpuObject> Release for Tracked<T> {
    fn id(&self) -> HandleId {
        self.id
    }

    fn release_boxed(self: Box<Self>) {
        self.value.release();
    }
}

/// Handles collected for a final reverse-order release.
#[derive(Default)]
pub struct Teardown {
    items: Vec<Box<dyn Release>>,
}

impl Teardown {
    pub fn push<T: GpuObject + 'static>(&mut self, tracked: Tracked<T>) {
        self.items.push(Box::new(tracked));
    }

    pub fn extend<T: GpuObject + 'static>(&mut self, tracked: impl IntoIterator<Item = Tracked<T>>) {
        for t in tracked {
            self.push(t);
        }
    }
}

/// Outcome of a ledger teardown.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct LedgerReport {
    /// Total handles ever created.
    pub created: u64,
    /// Handles released before teardown (swapchain recreation).
    pub recycled: u64,
    /// Handles released by the teardown pass, in release order.
    pub released: Vec<HandleRecord>,
    /// Handles still live after teardown.
    pub leaked: Vec<HandleRecord>,
    /// Problems met during release; logged and skipped.
    pub failures: Vec<String>,
}

impl LedgerReport {
    /// No leaks, no failures, and teardown released newest-first.
    pub fn is_clean(&self) -> bool {
        self.leaked.is_empty() && self.failures.is_empty() && self.is_reverse_order()
    }

    pub fn is_reverse_order(&self) -> bool {
        self.released.windows(2).all(|w| w[0].id > w[1].id)
    }
}

/// Registry of every GPU handle the render thread creates.
///
/// Handles may be released in any order while running (a resize releases the
/// swapchain-dependent objects from the middle of the stack); the final
/// teardown always releases newest-first.
#[derive(Debug, Default)]
pub struct HandleLedger {
    next: u64,
    live: BTreeMap<HandleId, HandleRecord>,
    recycled: u64,
    failures: Vec<String>,
}

impl HandleLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track<T: GpuObject>(&mut self, label: impl Into<String>, value: T) -> Tracked<T> {
        let id = HandleId(self.next);
        self.next += 1;

        let record = HandleRecord { id, kind: T::KIND, label: label.into() };
        log::trace!("create {} '{}' ({:?})", record.kind, record.label, id);
        self.live.insert(id, record);

        Tracked { id, value }
    }

    /// Releases one handle ahead of teardown.
    pub fn release<T: GpuObject>(&mut self, tracked: Tracked<T>) {
        let Tracked { id, value } = tracked;
        if self.forget(id).is_some() {
            self.recycled += 1;
        }
        value.release();
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Releases every handle in `batch`, newest first, and reports what is left.
    pub fn teardown(&mut self, batch: Teardown) -> LedgerReport {
        let mut items = batch.items;
        items.sort_by_key(|item| std::cmp::Reverse(item.id()));

        let mut released = Vec::with_capacity(items.len());
        for item in items {
            let id = item.id();
            if let Some(record) = self.forget(id) {
                log::trace!("destroy {} '{}' ({:?})", record.kind, record.label, id);
                released.push(record);
            }
            item.release_boxed();
        }

        let leaked: Vec<HandleRecord> = std::mem::take(&mut self.live).into_values().collect();
        for record in &leaked {
            log::warn!("{} '{}' was never released", record.kind, record.label);
        }

        LedgerReport {
            created: self.next,
            recycled: self.recycled,
            released,
            leaked,
            failures: std::mem::take(&mut self.failures),
        }
    }

    fn forget(&mut self, id: HandleId) -> Option<HandleRecord> {
        let record = self.live.remove(&id);
        if record.is_none() {
            let msg = format!("release of unknown handle {id:?}");
            log::warn!("{msg}");
            self.failures.push(msg);
        }
        record
    }
}
