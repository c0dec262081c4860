//! 256-page address decoder.
//!
//! The 16-bit CPU address space is split into 256 pages of 256 bytes. Every
//! page carries one read target and one write target. A target is either a
//! window into a byte buffer owned by the map, a device tag handed back to
//! the board's [`PageHandler`], or [`PageTarget::Discard`]. Unmapped pages
//! read as zero and swallow writes, so no access can fault.
//!
//! Bank switching is done by re-mapping a page range to a different buffer;
//! the buffers themselves never move.

pub const PAGE_SIZE: usize = 0x100;
pub const NUM_PAGES: usize = 0x100;

/// Value returned for reads from a discard page.
pub const DISCARD_VALUE: u8 = 0x00;

/// Handle to a buffer registered with [`PageMap::add_buffer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferId(usize);

/// What a single page resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageTarget<D> {
    /// Reads return [`DISCARD_VALUE`], writes are dropped.
    Discard,
    /// Byte window starting at `offset` inside buffer `id`.
    Buffer { id: BufferId, offset: usize },
    /// Forwarded to the board's handler with the full CPU address.
    Device(D),
}

/// Receives accesses to pages mapped with [`PageTarget::Device`].
pub trait PageHandler<D> {
    fn read(&mut self, device: D, addr: u16) -> u8;
    fn write(&mut self, device: D, addr: u16, data: u8);
}

pub struct PageMap<D> {
    buffers: Vec<Vec<u8>>,
    read: [PageTarget<D>; NUM_PAGES],
    write: [PageTarget<D>; NUM_PAGES],
}

impl<D: Copy> PageMap<D> {
    /// Every page starts out as discard.
    pub fn new() -> Self {
        Self {
            buffers: Vec::new(),
            read: [PageTarget::Discard; NUM_PAGES],
            write: [PageTarget::Discard; NUM_PAGES],
        }
    }

    /// Take ownership of a backing buffer and return its handle.
    pub fn add_buffer(&mut self, data: Vec<u8>) -> BufferId {
        self.buffers.push(data);
        BufferId(self.buffers.len() - 1)
    }

    pub fn buffer(&self, id: BufferId) -> &[u8] {
        &self.buffers[id.0]
    }

    pub fn buffer_mut(&mut self, id: BufferId) -> &mut [u8] {
        &mut self.buffers[id.0]
    }

    /// Map pages `first..=last` for reads.
    ///
    /// A buffer target advances by one page per mapped page, so mapping
    /// `0x20..=0x3F` to `Buffer { offset: 0 }` exposes the first 8 KB of the
    /// buffer. A reversed range maps nothing.
    pub fn map_read(&mut self, first: u8, last: u8, target: PageTarget<D>) {
        Self::fill(&mut self.read, first, last, target);
    }

    /// Map pages `first..=last` for writes. See [`map_read`](Self::map_read).
    pub fn map_write(&mut self, first: u8, last: u8, target: PageTarget<D>) {
        Self::fill(&mut self.write, first, last, target);
    }

    /// Map the same target for both directions.
    pub fn map(&mut self, first: u8, last: u8, target: PageTarget<D>) {
        self.map_read(first, last, target);
        self.map_write(first, last, target);
    }

    pub fn read_target(&self, page: u8) -> PageTarget<D> {
        self.read[page as usize]
    }

    pub fn write_target(&self, page: u8) -> PageTarget<D> {
        self.write[page as usize]
    }

    pub fn read<H: PageHandler<D>>(&self, addr: u16, handler: &mut H) -> u8 {
        match self.read[(addr >> 8) as usize] {
            PageTarget::Discard => DISCARD_VALUE,
            PageTarget::Buffer { id, offset } => {
                let buf = &self.buffers[id.0];
                if buf.is_empty() {
                    return DISCARD_VALUE;
                }
                buf[(offset + (addr as usize & 0xFF)) % buf.len()]
            }
            PageTarget::Device(device) => handler.read(device, addr),
        }
    }

    pub fn write<H: PageHandler<D>>(&mut self, addr: u16, data: u8, handler: &mut H) {
        match self.write[(addr >> 8) as usize] {
            PageTarget::Discard => {}
            PageTarget::Buffer { id, offset } => {
                let buf = &mut self.buffers[id.0];
                if !buf.is_empty() {
                    let len = buf.len();
                    buf[(offset + (addr as usize & 0xFF)) % len] = data;
                }
            }
            PageTarget::Device(device) => handler.write(device, addr, data),
        }
    }

    fn fill(table: &mut [PageTarget<D>; NUM_PAGES], first: u8, last: u8, target: PageTarget<D>) {
        for (n, page) in (first..=last).enumerate() {
            table[page as usize] = match target {
                PageTarget::Buffer { id, offset } => PageTarget::Buffer {
                    id,
                    offset: offset + n * PAGE_SIZE,
                },
                other => other,
            };
        }
    }
}

impl<D: Copy> Default for PageMap<D> {
    fn default() -> Self {
        Self::new()
    }
}
