//! Grid and block shapes.

use std::fmt;

/// A raw `(x, y, z)` dimension triple.
///
/// Used both for the number of workgroups in a dispatch (the grid) and
/// for the number of invocations per workgroup (the block).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dim3 {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl Dim3 {
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// A 2-D shape with `z = 1`.
    pub const fn xy(x: u32, y: u32) -> Self {
        Self { x, y, z: 1 }
    }

    /// Number of elements spanned by the shape, widened to avoid overflow.
    pub fn volume(&self) -> u64 {
        self.x as u64 * self.y as u64 * self.z as u64
    }

    /// Smallest grid of `block`-sized groups that covers `extent`
    /// invocations in every dimension.
    ///
    /// A zero block dimension yields a zero grid dimension rather than
    /// dividing by zero.
    pub fn covering(extent: Dim3, block: Dim3) -> Self {
        fn ceil_div(n: u32, d: u32) -> u32 {
            if d == 0 {
                0
            } else {
                n.div_ceil(d)
            }
        }
        Self {
            x: ceil_div(extent.x, block.x),
            y: ceil_div(extent.y, block.y),
            z: ceil_div(extent.z, block.z),
        }
    }
}

impl From<[u32; 3]> for Dim3 {
    fn from([x, y, z]: [u32; 3]) -> Self {
        Self { x, y, z }
    }
}

impl From<(u32, u32, u32)> for Dim3 {
    fn from((x, y, z): (u32, u32, u32)) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for Dim3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}
