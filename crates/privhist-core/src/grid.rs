//! N-dimensional count arrays
//!
//! [`Grid`] is a dense row-major array of `f64` cells with an explicit shape.
//! It carries released estimates, which may be negative. [`Domain`] wraps a
//! grid whose cells are validated as nonnegative whole-number counts, the input to
//! every estimator.

use std::fmt;
use std::ops::Deref;

use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Dense row-major array with an explicit shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGrid")]
pub struct Grid {
    shape: Vec<usize>,
    values: Vec<f64>,
}

#[derive(Deserialize)]
struct RawGrid {
    shape: Vec<usize>,
    values: Vec<f64>,
}

impl TryFrom<RawGrid> for Grid {
    type Error = Error;

    fn try_from(raw: RawGrid) -> Result<Self> {
        Grid::new(raw.shape, raw.values)
    }
}

impl Grid {
    /// Create a grid from a shape and row-major values
    pub fn new(shape: Vec<usize>, values: Vec<f64>) -> Result<Self> {
        if shape.is_empty() {
            return Err(Error::InvalidInput("grid shape has no axes".to_string()));
        }
        let expected = shape
            .iter()
            .try_fold(1usize, |acc, &len| acc.checked_mul(len))
            .ok_or_else(|| Error::Computation("grid volume overflows".to_string()))?;
        if expected != values.len() {
            return Err(Error::size_mismatch(expected, values.len(), "grid values"));
        }
        Ok(Self { shape, values })
    }

    /// A grid of the given shape filled with zeros
    pub fn zeros(shape: Vec<usize>) -> Result<Self> {
        let volume = shape
            .iter()
            .try_fold(1usize, |acc, &len| acc.checked_mul(len))
            .ok_or_else(|| Error::Computation("grid volume overflows".to_string()))?;
        Self::new(shape, vec![0.0; volume])
    }

    /// Shape of the grid, one length per axis
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of axes
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the grid has no cells
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Row-major view of the cells
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Consume the grid, returning its row-major cells
    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    /// Sum of all cells
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Row-major offset of a coordinate, if it lies inside the grid
    pub fn offset(&self, coords: &[usize]) -> Option<usize> {
        if coords.len() != self.shape.len() {
            return None;
        }
        let mut offset = 0usize;
        for (&c, &len) in coords.iter().zip(&self.shape) {
            if c >= len {
                return None;
            }
            offset = offset * len + c;
        }
        Some(offset)
    }

    /// Coordinate of a row-major offset
    pub fn coords(&self, mut offset: usize) -> Option<Vec<usize>> {
        if offset >= self.values.len() {
            return None;
        }
        let mut coords = vec![0; self.shape.len()];
        for (axis, &len) in self.shape.iter().enumerate().rev() {
            coords[axis] = offset % len;
            offset /= len;
        }
        Some(coords)
    }

    /// Cell value at a coordinate
    pub fn get(&self, coords: &[usize]) -> Option<f64> {
        self.offset(coords).map(|i| self.values[i])
    }

    /// Mutable cell at a coordinate
    pub fn get_mut(&mut self, coords: &[usize]) -> Option<&mut f64> {
        self.offset(coords).map(move |i| &mut self.values[i])
    }

    /// Zero-pad every axis up to `target` (one length per axis)
    ///
    /// Existing cells keep their coordinates; new cells are zero.
    pub fn padded(&self, target: &[usize]) -> Result<Grid> {
        if target.len() != self.shape.len() {
            return Err(Error::size_mismatch(self.shape.len(), target.len(), "padding axes"));
        }
        if target.iter().zip(&self.shape).any(|(&t, &s)| t < s) {
            return Err(Error::InvalidInput(format!(
                "cannot pad shape {:?} down to {:?}",
                self.shape, target
            )));
        }
        let mut out = Grid::zeros(target.to_vec())?;
        for (i, &value) in self.values.iter().enumerate() {
            if value == 0.0 {
                continue;
            }
            let coords = self.coords(i).ok_or_else(|| {
                Error::InvariantViolation(format!("offset {i} outside source grid"))
            })?;
            if let Some(cell) = out.get_mut(&coords) {
                *cell = value;
            }
        }
        Ok(out)
    }

    /// Keep only the leading `target` cells along every axis
    pub fn truncated(&self, target: &[usize]) -> Result<Grid> {
        if target.len() != self.shape.len() {
            return Err(Error::size_mismatch(self.shape.len(), target.len(), "truncation axes"));
        }
        if target.iter().zip(&self.shape).any(|(&t, &s)| t > s) {
            return Err(Error::InvalidInput(format!(
                "cannot truncate shape {:?} up to {:?}",
                self.shape, target
            )));
        }
        let mut out = Grid::zeros(target.to_vec())?;
        for i in 0..out.values.len() {
            let coords = out.coords(i).ok_or_else(|| {
                Error::InvariantViolation(format!("offset {i} outside truncated grid"))
            })?;
            let value = self.get(&coords).ok_or_else(|| {
                Error::InvariantViolation(format!("{coords:?} outside source grid"))
            })?;
            out.values[i] = value;
        }
        Ok(out)
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Grid(shape={:?}, total={:.3})", self.shape, self.total())
    }
}

/// A histogram of true counts: a grid of nonnegative whole-number cells
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Grid", into = "Grid")]
pub struct Domain {
    grid: Grid,
}

impl Domain {
    /// Create a domain from a shape and row-major counts
    pub fn new(shape: Vec<usize>, values: Vec<f64>) -> Result<Self> {
        Self::try_from(Grid::new(shape, values)?)
    }

    /// Create a domain from any numeric count type
    pub fn from_counts<T: ToPrimitive + Copy>(shape: Vec<usize>, counts: &[T]) -> Result<Self> {
        let values = counts
            .iter()
            .enumerate()
            .map(|(i, c)| {
                c.to_f64().ok_or_else(|| {
                    Error::InvalidInput(format!("count at offset {i} is not representable as f64"))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(shape, values)
    }

    /// A one-dimensional domain
    pub fn one_d<T: ToPrimitive + Copy>(counts: &[T]) -> Result<Self> {
        Self::from_counts(vec![counts.len()], counts)
    }

    /// A two-dimensional domain from equally long rows
    pub fn two_d<T: ToPrimitive + Copy>(rows: &[Vec<T>]) -> Result<Self> {
        let cols = rows.first().map_or(0, |r| r.len());
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != cols) {
            return Err(Error::size_mismatch(cols, row.len(), &format!("row {i}")));
        }
        let flat: Vec<T> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Self::from_counts(vec![rows.len(), cols], &flat)
    }

    /// The underlying grid
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Consume the domain, returning the underlying grid
    pub fn into_grid(self) -> Grid {
        self.grid
    }
}

impl TryFrom<Grid> for Domain {
    type Error = Error;

    fn try_from(grid: Grid) -> Result<Self> {
        if grid.is_empty() {
            return Err(Error::empty_input("domain"));
        }
        if grid.values.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidInput(
                "domain contains NaN or infinite counts".to_string(),
            ));
        }
        if let Some(i) = grid.values.iter().position(|&v| v < 0.0) {
            return Err(Error::InvalidInput(format!(
                "domain count at offset {i} is negative"
            )));
        }
        if let Some(i) = grid.values.iter().position(|v| v.fract() != 0.0) {
            return Err(Error::InvalidInput(format!(
                "domain count at offset {i} is not a whole number"
            )));
        }
        Ok(Self { grid })
    }
}

impl From<Domain> for Grid {
    fn from(domain: Domain) -> Self {
        domain.grid
    }
}

impl Deref for Domain {
    type Target = Grid;

    fn deref(&self) -> &Grid {
        &self.grid
    }
}
