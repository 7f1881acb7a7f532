//! Dense float blobs used for weights, inputs and outputs.
//!
//! A blob is a 4-d `num × channels × height × width` array stored
//! row-major in one flat buffer. Weight matrices use `num` for rows
//! and `channels` for columns; activations use `channels/height/width`.

/// A 4-d float tensor with a flat backing buffer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Blob {
    num: usize,
    channels: usize,
    height: usize,
    width: usize,
    data: Vec<f32>,
}

impl Blob {
    /// Creates a blob with the given shape and no backing storage.
    ///
    /// Call [`Blob::alloc`] before touching the data.
    pub fn new(num: usize, channels: usize, height: usize, width: usize) -> Self {
        Self {
            num,
            channels,
            height,
            width,
            data: Vec::new(),
        }
    }

    /// Creates a blob that owns `data`.
    ///
    /// # Panics
    ///
    /// Panics if `data.len()` doesn't match the shape.
    pub fn from_vec(
        num: usize,
        channels: usize,
        height: usize,
        width: usize,
        data: Vec<f32>,
    ) -> Self {
        let expected = num * channels * height * width;
        assert_eq!(
            data.len(),
            expected,
            "blob {}x{}x{}x{}: expected {} elements, got {}",
            num,
            channels,
            height,
            width,
            expected,
            data.len()
        );
        Self {
            num,
            channels,
            height,
            width,
            data,
        }
    }

    /// Weight matrix blob: `rows × cols`, stored as `num = rows`, `channels = cols`.
    pub fn matrix(rows: usize, cols: usize, data: Vec<f32>) -> Self {
        Self::from_vec(rows, cols, 1, 1, data)
    }

    /// Flat vector blob of length `len` (bias vectors, flattened activations).
    pub fn vector(data: Vec<f32>) -> Self {
        let len = data.len();
        Self::from_vec(1, len, 1, 1, data)
    }

    /// Allocates zeroed storage for the current shape.
    pub fn alloc(&mut self) {
        self.data = vec![0.0; self.data_size()];
    }

    /// Changes the shape and reallocates storage when the element count grows.
    ///
    /// Existing values are kept only up to the new size; callers should treat
    /// the contents as undefined afterwards.
    pub fn reshape_with_realloc(
        &mut self,
        num: usize,
        channels: usize,
        height: usize,
        width: usize,
    ) {
        self.num = num;
        self.channels = channels;
        self.height = height;
        self.width = width;
        self.data.resize(self.data_size(), 0.0);
    }

    pub fn num(&self) -> usize {
        self.num
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Total element count implied by the shape.
    pub fn data_size(&self) -> usize {
        self.num * self.channels * self.height * self.width
    }

    /// Returns true once storage matching the shape exists.
    pub fn is_allocated(&self) -> bool {
        !self.data.is_empty() && self.data.len() == self.data_size()
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }
}
