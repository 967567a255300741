//! Dynamic GPU buffer management with automatic resizing
//!
//! Provides buffers that grow automatically when data exceeds capacity,
//! using a 2x growth strategy to minimize reallocations, plus packing of
//! per-draw uniforms at the device's dynamic-offset alignment.

/// A GPU buffer that can grow dynamically
///
/// Uses a 2x growth strategy when capacity is exceeded.
/// Never shrinks (GPU buffers cannot be resized in place).
pub struct DynamicBuffer {
    buffer: wgpu::Buffer,
    capacity: usize, // bytes
    usage: wgpu::BufferUsages,
    label: String,
}

impl DynamicBuffer {
    /// Buffer with the given initial byte capacity.
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        initial_capacity: usize,
        usage: wgpu::BufferUsages,
    ) -> Self {
        let capacity = initial_capacity.max(256);
        let buffer = Self::allocate(device, label, capacity, usage);
        Self {
            buffer,
            capacity,
            usage,
            label: label.to_owned(),
        }
    }

    fn allocate(
        device: &wgpu::Device,
        label: &str,
        capacity: usize,
        usage: wgpu::BufferUsages,
    ) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: capacity as u64,
            usage: usage | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Write raw bytes to buffer, growing if necessary.
    ///
    /// Returns `true` if buffer was reallocated (bind groups need recreation).
    pub fn write_bytes(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &[u8],
    ) -> bool {
        let needed = data.len();
        let reallocated = if needed > self.capacity {
            let new_capacity = (needed * 2).max(self.capacity + 1024);
            log::debug!(
                "Growing '{}' from {} to {new_capacity} bytes",
                self.label,
                self.capacity
            );
            self.buffer =
                Self::allocate(device, &self.label, new_capacity, self.usage);
            self.capacity = new_capacity;
            true
        } else {
            false
        };

        if needed > 0 {
            queue.write_buffer(&self.buffer, 0, data);
        }
        reallocated
    }

    /// Underlying buffer.
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}

/// Round `size` up to a multiple of `alignment`.
pub fn aligned_stride(size: usize, alignment: usize) -> usize {
    size.next_multiple_of(alignment.max(1))
}

/// Pack `items` into one byte vector with each item starting at a multiple
/// of `stride`. Returns the bytes and the dynamic offset of every item.
pub fn pack_aligned<T: bytemuck::Pod>(
    items: &[T],
    stride: usize,
) -> (Vec<u8>, Vec<u32>) {
    let mut bytes = vec![0u8; stride * items.len()];
    let mut offsets = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let start = i * stride;
        let src = bytemuck::bytes_of(item);
        bytes[start..start + src.len()].copy_from_slice(src);
        offsets.push(start as u32);
    }
    (bytes, offsets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stride_rounds_up_to_alignment() {
        assert_eq!(aligned_stride(192, 256), 256);
        assert_eq!(aligned_stride(256, 256), 256);
        assert_eq!(aligned_stride(257, 256), 512);
        assert_eq!(aligned_stride(12, 0), 12);
    }

    #[test]
    fn pack_places_items_at_stride_offsets() {
        let items = [[1.0f32, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let (bytes, offsets) = pack_aligned(&items, 256);
        assert_eq!(offsets, vec![0, 256, 512]);
        assert_eq!(bytes.len(), 768);
        let second: [f32; 2] = bytemuck::pod_read_unaligned(&bytes[256..264]);
        assert_eq!(second, [3.0, 4.0]);
        assert!(bytes[8..256].iter().all(|&b| b == 0));
    }
}
