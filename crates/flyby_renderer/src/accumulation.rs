//! Temporal accumulation of per-pixel samples.

use flyby_math::Vec4;

/// Running per-pixel sum of samples since the last reset.
///
/// `frame_index` is the number of the frame about to be rendered, counting
/// from 1, and is the divisor that turns a slot's sum into its average.
#[derive(Debug, Clone)]
pub struct AccumulationBuffer {
    width: u32,
    height: u32,
    data: Vec<Vec4>,
    frame_index: u32,
}

impl AccumulationBuffer {
    /// Create a zeroed buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![Vec4::ZERO; width as usize * height as usize],
            frame_index: 1,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn frame_index(&self) -> u32 {
        self.frame_index
    }

    /// Reallocate for a new size and start over. Returns false for no-op resizes.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 || (width == self.width && height == self.height) {
            return false;
        }

        self.width = width;
        self.height = height;
        self.data = vec![Vec4::ZERO; width as usize * height as usize];
        self.frame_index = 1;
        true
    }

    /// Start a fresh accumulation: frame index 1 and every slot zeroed.
    pub fn reset(&mut self) {
        self.frame_index = 1;
        self.clear();
    }

    /// Zero the sums if this is the first frame of an accumulation.
    pub fn begin_frame(&mut self) {
        if self.frame_index == 1 {
            self.clear();
        }
    }

    /// Move to the next frame, or stay on frame 1 when not accumulating.
    pub fn end_frame(&mut self, accumulate: bool) {
        if accumulate {
            self.frame_index = self.frame_index.saturating_add(1);
        } else {
            self.frame_index = 1;
        }
    }

    /// Add a sample to a slot and return the slot's new average.
    #[inline]
    pub fn add_sample(slot: &mut Vec4, sample: Vec4, frame_index: u32) -> Vec4 {
        *slot += sample;
        *slot / frame_index as f32
    }

    /// Sum stored for the pixel at (x, y).
    pub fn get(&self, x: u32, y: u32) -> Vec4 {
        self.data[(y * self.width + x) as usize]
    }

    /// Average for the pixel at (x, y) over the frames accumulated so far.
    pub fn average(&self, x: u32, y: u32) -> Vec4 {
        let frames = self.frame_index.saturating_sub(1).max(1);
        self.get(x, y) / frames as f32
    }

    pub fn data(&self) -> &[Vec4] {
        &self.data
    }

    /// Row-major slots, for the frame driver's parallel loop.
    pub fn data_mut(&mut self) -> &mut [Vec4] {
        &mut self.data
    }

    pub fn is_cleared(&self) -> bool {
        self.data.iter().all(|slot| *slot == Vec4::ZERO)
    }

    fn clear(&mut self) {
        self.data.fill(Vec4::ZERO);
    }
}
