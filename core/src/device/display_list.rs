//! Display-list batches and the hand-off queue to the renderer.
//!
//! The interpreter appends primitives to a work-in-progress [`DisplayList`].
//! When the board strobes EXT_START the batch is committed to a
//! [`DisplayListQueue`], where a renderer on another thread picks it up,
//! draws it once and hands it back for reuse.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use log::trace;

use crate::device::mathbox::fixed::Vector3;
use crate::device::palette::Rgb;

/// Committed batches waiting for the renderer. When the renderer falls
/// behind, the oldest batch is dropped.
pub const MAX_PENDING: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderMode {
    Polygon,
    Vector,
    Dot,
}

impl RenderMode {
    /// Mode implied by a vertex run: one vertex is a dot, two a line.
    pub fn from_vertex_count(count: usize) -> Self {
        match count {
            1 => Self::Dot,
            2 => Self::Vector,
            _ => Self::Polygon,
        }
    }

    /// Terrain render mode word at Mathbox address 0x72.
    pub fn from_terrain_word(word: u16) -> Self {
        match word {
            0x0000 => Self::Polygon,
            0x0100 => Self::Vector,
            _ => Self::Dot,
        }
    }

    /// A single vertex is always a dot and a two-vertex polygon is a line.
    pub fn resolve(self, vertex_count: usize) -> Self {
        match (self, vertex_count) {
            (Self::Polygon, n) | (_, n @ 1) => Self::from_vertex_count(n),
            (mode, _) => mode,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Vertex {
    /// View-space position in world units.
    pub position: Vector3,
    pub color: Rgb,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Primitive {
    pub mode: RenderMode,
    pub first: usize,
    pub count: usize,
}

#[derive(Clone, Debug, Default)]
pub struct DisplayList {
    vertices: Vec<Vertex>,
    primitives: Vec<Primitive>,
    erase: bool,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one primitive. The mode is resolved against the vertex count;
    /// an empty slice emits nothing.
    pub fn push(&mut self, mode: RenderMode, positions: &[Vector3], color: Rgb) {
        if positions.is_empty() {
            return;
        }
        let first = self.vertices.len();
        self.vertices
            .extend(positions.iter().map(|&position| Vertex { position, color }));
        self.primitives.push(Primitive {
            mode: mode.resolve(positions.len()),
            first,
            count: positions.len(),
        });
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Each primitive with its vertex run.
    pub fn iter(&self) -> impl Iterator<Item = (RenderMode, &[Vertex])> + '_ {
        self.primitives
            .iter()
            .map(|p| (p.mode, &self.vertices[p.first..p.first + p.count]))
    }

    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// Whether the renderer clears the frame before drawing this batch.
    pub fn erase(&self) -> bool {
        self.erase
    }

    pub fn set_erase(&mut self, erase: bool) {
        self.erase = erase;
    }

    /// Drop all primitives, keeping the allocations.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.primitives.clear();
        self.erase = false;
    }
}

struct Shared {
    pending: Mutex<VecDeque<DisplayList>>,
    pool: Mutex<Vec<DisplayList>>,
}

/// Cloneable handle to the committed-batch queue and its free pool. All
/// operations may be called from any thread.
#[derive(Clone)]
pub struct DisplayListQueue {
    shared: Arc<Shared>,
}

impl DisplayListQueue {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                pending: Mutex::new(VecDeque::with_capacity(MAX_PENDING)),
                pool: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn enqueue(&self, list: DisplayList) {
        let dropped = {
            let mut pending = self
                .shared
                .pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let dropped = if pending.len() >= MAX_PENDING {
                pending.pop_front()
            } else {
                None
            };
            pending.push_back(list);
            dropped
        };
        if let Some(old) = dropped {
            trace!("display list queue full, dropping {} primitives", old.len());
            self.recycle(old);
        }
    }

    pub fn dequeue(&self) -> Option<DisplayList> {
        self.shared
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    /// Return a drawn batch to the pool.
    pub fn recycle(&self, mut list: DisplayList) {
        list.clear();
        self.shared
            .pool
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(list);
    }

    /// An empty batch, reused from the pool when one is available.
    pub fn take_free(&self) -> DisplayList {
        self.shared
            .pool
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .unwrap_or_default()
    }

    pub fn pending(&self) -> usize {
        self.shared
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn pooled(&self) -> usize {
        self.shared
            .pool
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for DisplayListQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Producer side: owns the batch currently being filled.
pub struct DisplayListBuilder {
    queue: DisplayListQueue,
    current: DisplayList,
}

impl DisplayListBuilder {
    pub fn new(queue: DisplayListQueue) -> Self {
        let current = queue.take_free();
        Self { queue, current }
    }

    pub fn current(&mut self) -> &mut DisplayList {
        &mut self.current
    }

    /// Publish the current batch and start a fresh one.
    pub fn commit(&mut self, erase: bool) {
        let mut next = self.queue.take_free();
        std::mem::swap(&mut next, &mut self.current);
        next.set_erase(erase);
        trace!("commit display list: {} primitives, erase={erase}", next.len());
        self.queue.enqueue(next);
    }

    /// Throw away the work in progress.
    pub fn discard(&mut self) {
        self.current.clear();
    }

    pub fn queue(&self) -> &DisplayListQueue {
        &self.queue
    }
}
