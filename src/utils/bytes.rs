use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// A cheaply cloneable view over a single shared byte allocation. Every view
/// carries its own range while the storage behind it is reference counted,
/// so handing a `SharedBytes` to another thread never copies the payload.
///
/// Cached byte contents are stored once and shared through fresh views: the
/// cache keeps one view and gives every reader an independent one, which is
/// what allows readers to narrow their window without disturbing each other.
#[derive(Clone)]
pub struct SharedBytes {
    data: Arc<[u8]>,
    start: usize,
    end: usize,
}

impl SharedBytes {
    pub fn new<T>(data: T) -> Self
    where
        T: Into<Arc<[u8]>>,
    {
        let data = data.into();
        let end = data.len();
        SharedBytes {
            data,
            start: 0,
            end,
        }
    }

    /// Returns an independent view over the same storage. The new view has
    /// its own range and can be narrowed freely by its holder.
    #[inline]
    pub fn share(&self) -> SharedBytes {
        self.clone()
    }

    /// Narrows this view to `start..end`, expressed relative to the current
    /// window. Out-of-range bounds are clamped to the window.
    pub fn slice(&self, start: usize, end: usize) -> SharedBytes {
        let len = self.len();
        let start = start.min(len);
        let end = end.min(len).max(start);
        SharedBytes {
            data: self.data.clone(),
            start: self.start + start,
            end: self.start + end,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[self.start..self.end]
    }
}

impl Deref for SharedBytes {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl From<Vec<u8>> for SharedBytes {
    fn from(v: Vec<u8>) -> Self {
        SharedBytes::new(v)
    }
}

impl From<&[u8]> for SharedBytes {
    fn from(v: &[u8]) -> Self {
        SharedBytes::new(v)
    }
}

impl PartialEq for SharedBytes {
    fn eq(&self, rhs: &Self) -> bool {
        self.as_slice() == rhs.as_slice()
    }
}

impl Eq for SharedBytes {}

impl fmt::Debug for SharedBytes {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SharedBytes({} bytes)", self.len())
    }
}
