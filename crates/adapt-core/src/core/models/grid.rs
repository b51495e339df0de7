use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// A single admissible value of a search dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GridValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for GridValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridValue::Bool(v) => write!(f, "{}", v),
            GridValue::Int(v) => write!(f, "{}", v),
            GridValue::Float(v) => write!(f, "{}", v),
            GridValue::Text(v) => f.write_str(v),
        }
    }
}

/// How the values of one dimension are enumerated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Domain {
    Values {
        values: Vec<GridValue>,
    },
    IntRange {
        low: i64,
        high: i64,
        #[serde(default = "default_int_step")]
        step: i64,
    },
    FloatRange {
        low: f64,
        high: f64,
        steps: usize,
    },
}

fn default_int_step() -> i64 {
    1
}

impl Domain {
    fn resolve(&self, name: &str) -> Result<Vec<GridValue>, GridError> {
        let invalid = |reason: &str| GridError::InvalidDomain {
            name: name.to_string(),
            reason: reason.to_string(),
        };
        let values = match self {
            Domain::Values { values } => values.clone(),
            Domain::IntRange { low, high, step } => {
                if *step <= 0 {
                    return Err(invalid("step must be positive"));
                }
                if low > high {
                    return Err(invalid("low bound exceeds high bound"));
                }
                (*low..=*high)
                    .step_by(*step as usize)
                    .map(GridValue::Int)
                    .collect()
            }
            Domain::FloatRange { low, high, steps } => {
                if !low.is_finite() || !high.is_finite() {
                    return Err(invalid("bounds must be finite"));
                }
                if low > high {
                    return Err(invalid("low bound exceeds high bound"));
                }
                match *steps {
                    0 => Vec::new(),
                    1 => vec![GridValue::Float(*low)],
                    n => {
                        let width = (high - low) / (n - 1) as f64;
                        (0..n)
                            .map(|i| GridValue::Float(low + width * i as f64))
                            .collect()
                    }
                }
            }
        };
        if values.is_empty() {
            return Err(GridError::EmptyDomain(name.to_string()));
        }
        Ok(values)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Dimension {
    pub name: String,
    pub domain: Domain,
}

/// One named value assigned to a dimension at a grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSetting {
    pub name: String,
    pub value: GridValue,
}

/// A grid point, stored as one value index per dimension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GridPoint(Vec<usize>);

impl GridPoint {
    pub fn new(indices: Vec<usize>) -> Self {
        Self(indices)
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }
}

impl fmt::Display for GridPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.iter().join(", "))
    }
}

#[derive(Debug, Clone, PartialEq)]
struct ResolvedDimension {
    name: String,
    values: Vec<GridValue>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct GridFile {
    dimension: Vec<Dimension>,
}

/// The discrete search space explored by the surrogate strategy.
///
/// Dimensions keep their declaration order; that order fixes both the layout
/// of [`GridPoint`] indices and the enumeration order of [`ParameterGrid::points`].
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterGrid {
    dimensions: Vec<ResolvedDimension>,
}

impl ParameterGrid {
    pub fn new(dimensions: Vec<Dimension>) -> Result<Self, GridError> {
        if dimensions.is_empty() {
            return Err(GridError::EmptyGrid);
        }
        let mut seen = HashSet::new();
        let mut resolved = Vec::with_capacity(dimensions.len());
        for dimension in dimensions {
            if !seen.insert(dimension.name.clone()) {
                return Err(GridError::DuplicateDimension(dimension.name));
            }
            let values = dimension.domain.resolve(&dimension.name)?;
            resolved.push(ResolvedDimension {
                name: dimension.name,
                values,
            });
        }
        Ok(Self {
            dimensions: resolved,
        })
    }

    pub fn load(path: &Path) -> Result<Self, GridError> {
        let content = std::fs::read_to_string(path).map_err(|e| GridError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let file: GridFile = toml::from_str(&content).map_err(|e| GridError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::new(file.dimension)
    }

    pub fn dimension_count(&self) -> usize {
        self.dimensions.len()
    }

    pub fn dimension_names(&self) -> impl Iterator<Item = &str> {
        self.dimensions.iter().map(|d| d.name.as_str())
    }

    pub fn point_count(&self) -> usize {
        self.dimensions
            .iter()
            .fold(1usize, |acc, d| acc.saturating_mul(d.values.len()))
    }

    pub fn contains(&self, point: &GridPoint) -> bool {
        point.0.len() == self.dimensions.len()
            && point
                .0
                .iter()
                .zip(&self.dimensions)
                .all(|(&idx, d)| idx < d.values.len())
    }

    /// Every grid point, in row-major order over the declared dimensions.
    pub fn points(&self) -> impl Iterator<Item = GridPoint> + '_ {
        self.dimensions
            .iter()
            .map(|d| 0..d.values.len())
            .multi_cartesian_product()
            .map(GridPoint)
    }

    pub fn settings(&self, point: &GridPoint) -> Result<Vec<ParameterSetting>, GridError> {
        if !self.contains(point) {
            return Err(GridError::PointOutOfGrid(point.clone()));
        }
        Ok(point
            .0
            .iter()
            .zip(&self.dimensions)
            .map(|(&idx, d)| ParameterSetting {
                name: d.name.clone(),
                value: d.values[idx].clone(),
            })
            .collect())
    }

    /// Model coordinates in `[0, 1]` per dimension.
    ///
    /// Values are placed by index rather than magnitude, so categorical and
    /// numeric dimensions share one encoding.
    pub fn features(&self, point: &GridPoint) -> Result<Vec<f64>, GridError> {
        if !self.contains(point) {
            return Err(GridError::PointOutOfGrid(point.clone()));
        }
        Ok(point
            .0
            .iter()
            .zip(&self.dimensions)
            .map(|(&idx, d)| match d.values.len() {
                1 => 0.5,
                n => idx as f64 / (n - 1) as f64,
            })
            .collect())
    }
}

#[derive(Debug, Error)]
pub enum GridError {
    #[error("Parameter grid must declare at least one dimension")]
    EmptyGrid,
    #[error("Dimension '{0}' has no admissible values")]
    EmptyDomain(String),
    #[error("Dimension '{0}' is declared more than once")]
    DuplicateDimension(String),
    #[error("Invalid domain for dimension '{name}': {reason}")]
    InvalidDomain { name: String, reason: String },
    #[error("Grid point {0} lies outside the parameter grid")]
    PointOutOfGrid(GridPoint),
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}
