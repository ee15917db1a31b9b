//! Slice addressing and the snapshot value type.

/// Axis of a volume, in storage order.
///
/// Dimension 0 is depth, 1 is height, 2 is width. The closed enum makes
/// an invalid axis unrepresentable; callers never pass raw dimension
/// numbers around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Depth,
    Height,
    Width,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::Depth, Axis::Height, Axis::Width];

    /// Dimension index of this axis in a `[depth, height, width]` shape.
    pub fn index(&self) -> usize {
        match self {
            Axis::Depth => 0,
            Axis::Height => 1,
            Axis::Width => 2,
        }
    }

    /// Axis for a dimension index, if it names one.
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Axis::Depth),
            1 => Some(Axis::Height),
            2 => Some(Axis::Width),
            _ => None,
        }
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::Depth => write!(f, "depth"),
            Axis::Height => write!(f, "height"),
            Axis::Width => write!(f, "width"),
        }
    }
}

/// Identity of one slice: the axis it cuts across and the index along it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SliceKey {
    pub axis: Axis,
    pub index: usize,
}

impl SliceKey {
    pub fn new(axis: Axis, index: usize) -> Self {
        Self { axis, index }
    }
}

impl std::fmt::Display for SliceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}]", self.axis, self.index)
    }
}

/// One extracted 2D plane of a volume.
///
/// Snapshots are plain owned values. The cache stores its own copy and
/// hands out clones, so holders may mutate their snapshot freely without
/// affecting anyone else. `rows` and `cols` describe the plane that
/// remains after cutting along `key.axis`:
///
/// - depth slice: rows = height, cols = width
/// - height slice: rows = depth, cols = width
/// - width slice: rows = depth, cols = height
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceSnapshot {
    key: SliceKey,
    rows: usize,
    cols: usize,
    data: Vec<u8>,
}

impl SliceSnapshot {
    /// Build a snapshot over row-major plane data.
    pub fn new(key: SliceKey, rows: usize, cols: usize, data: Vec<u8>) -> Self {
        debug_assert_eq!(rows * cols, data.len());
        Self {
            key,
            rows,
            cols,
            data,
        }
    }

    pub fn key(&self) -> SliceKey {
        self.key
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable access to this snapshot's own buffer.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
