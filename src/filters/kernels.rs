//! Fixed 3x3 convolution kernels, looked up by name.
//!
//! | Name | Weights |
//! |------|---------|
//! | smooth | all 1/9 |
//! | blur | [1,2,1; 2,4,2; 1,2,1] / 16 |
//! | sharpen | [0,-2/3,0; -2/3,11/3,-2/3; 0,-2/3,0] |
//! | mean | [-1,-1,-1; -1,9,-1; -1,-1,-1] |
//! | emboss | [0,1,0; 0,0,0; 0,-1,0] |
//!
//! Weights are computed in double precision and stored as `f32`, so the
//! accumulated sums match the reference filters bit for bit.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Name of one of the built-in filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterName {
    Smooth,
    Blur,
    Sharpen,
    Mean,
    Emboss,
}

impl FilterName {
    pub const ALL: [FilterName; 5] = [
        FilterName::Smooth,
        FilterName::Blur,
        FilterName::Sharpen,
        FilterName::Mean,
        FilterName::Emboss,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FilterName::Smooth => "smooth",
            FilterName::Blur => "blur",
            FilterName::Sharpen => "sharpen",
            FilterName::Mean => "mean",
            FilterName::Emboss => "emboss",
        }
    }

    /// Comma separated list of every filter name, for messages.
    pub fn list() -> String {
        Self::ALL
            .iter()
            .map(|f| f.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn kernel(self) -> &'static Kernel {
        &KERNELS[self as usize]
    }
}

impl fmt::Display for FilterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterName {
    type Err = Error;

    /// Case-sensitive match against the kernel table.
    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| Error::InvalidFilterName { name: s.to_string() })
    }
}

/// Immutable 3x3 weight matrix, indexed `[row][col]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kernel {
    name: FilterName,
    weights: [[f32; 3]; 3],
}

impl Kernel {
    pub fn name(&self) -> FilterName {
        self.name
    }

    pub fn weights(&self) -> &[[f32; 3]; 3] {
        &self.weights
    }

    /// Weight applied to the neighbour at offset `(dr, dc)`, each in `-1..=1`.
    #[inline]
    pub fn weight(&self, dr: isize, dc: isize) -> f32 {
        self.weights[(dr + 1) as usize][(dc + 1) as usize]
    }

    pub fn weight_sum(&self) -> f32 {
        self.weights.iter().flatten().sum()
    }
}

const NINTH: f32 = (1.0 / 9.0) as f32;
const SIXTEENTH: f32 = (1.0 / 16.0) as f32;
const EIGHTH: f32 = (2.0 / 16.0) as f32;
const QUARTER: f32 = (4.0 / 16.0) as f32;
const SHARPEN_EDGE: f32 = (-2.0 / 3.0) as f32;
const SHARPEN_CENTER: f32 = (11.0 / 3.0) as f32;

// Indexed by `FilterName as usize`.
static KERNELS: [Kernel; 5] = [
    Kernel {
        name: FilterName::Smooth,
        weights: [[NINTH; 3]; 3],
    },
    Kernel {
        name: FilterName::Blur,
        weights: [
            [SIXTEENTH, EIGHTH, SIXTEENTH],
            [EIGHTH, QUARTER, EIGHTH],
            [SIXTEENTH, EIGHTH, SIXTEENTH],
        ],
    },
    Kernel {
        name: FilterName::Sharpen,
        weights: [
            [0.0, SHARPEN_EDGE, 0.0],
            [SHARPEN_EDGE, SHARPEN_CENTER, SHARPEN_EDGE],
            [0.0, SHARPEN_EDGE, 0.0],
        ],
    },
    Kernel {
        name: FilterName::Mean,
        weights: [[-1.0, -1.0, -1.0], [-1.0, 9.0, -1.0], [-1.0, -1.0, -1.0]],
    },
    Kernel {
        name: FilterName::Emboss,
        weights: [[0.0, 1.0, 0.0], [0.0, 0.0, 0.0], [0.0, -1.0, 0.0]],
    },
];

/// Look up a kernel by filter name.
///
/// Returns [`Error::InvalidFilterName`] for anything outside the table.
pub fn lookup(name: &str) -> Result<&'static Kernel> {
    name.parse::<FilterName>().map(FilterName::kernel)
}
