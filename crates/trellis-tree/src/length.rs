use std::fmt;
use std::ops::{Add, AddAssign, Sub};

use text_size::TextSize;

/// A row/column position. Columns count bytes from the start of the row.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Point {
    pub row: u32,
    pub column: u32,
}

impl Point {
    pub const ZERO: Self = Self { row: 0, column: 0 };

    #[inline]
    pub const fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }
}

impl fmt::Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.row, self.column)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.row + 1, self.column + 1)
    }
}

/// Treats `rhs` as an extent starting at `self`.
impl Add for Point {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        if rhs.row > 0 {
            Self::new(self.row + rhs.row, rhs.column)
        } else {
            Self::new(self.row, self.column + rhs.column)
        }
    }
}

/// Returns the extent from `rhs` to `self`; `rhs` must not be after `self`.
impl Sub for Point {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        if self.row > rhs.row {
            Self::new(self.row - rhs.row, self.column)
        } else {
            Self::new(0, self.column.saturating_sub(rhs.column))
        }
    }
}

/// A size or position measured both in bytes and in rows/columns.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Length {
    pub bytes: TextSize,
    pub extent: Point,
}

impl Length {
    pub const ZERO: Self = Self { bytes: TextSize::new(0), extent: Point::ZERO };

    #[inline]
    pub const fn new(bytes: TextSize, extent: Point) -> Self {
        Self { bytes, extent }
    }

    /// Measures `text`.
    pub fn of(text: &str) -> Self {
        let bytes = TextSize::of(text);
        let extent = match text.rfind('\n') {
            Some(last_newline) => Point::new(
                text.bytes().filter(|&byte| byte == b'\n').count() as u32,
                (text.len() - last_newline - 1) as u32,
            ),
            None => Point::new(0, text.len() as u32),
        };
        Self { bytes, extent }
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.bytes == TextSize::new(0)
    }

    /// Subtracts `rhs`, clamping at zero.
    #[inline]
    pub fn saturating_sub(self, rhs: Self) -> Self {
        if rhs.bytes >= self.bytes { Self::ZERO } else { self - rhs }
    }
}

impl fmt::Debug for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}@{:?}", self.bytes, self.extent)
    }
}

impl Add for Length {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self { bytes: self.bytes + rhs.bytes, extent: self.extent + rhs.extent }
    }
}

impl AddAssign for Length {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Length {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self { bytes: self.bytes - rhs.bytes, extent: self.extent - rhs.extent }
    }
}

impl std::iter::Sum for Length {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}
