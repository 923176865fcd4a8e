//! Sweep axes and Cartesian-product enumeration.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SweepError};

/// How a flag axis is turned into argv items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgStyle {
    /// `-ts 8` as two separate arguments.
    #[default]
    Separate,
    /// `--size=8` as a single argument.
    Joined,
}

/// One dimension of variation: an environment variable or a command-line flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Axis {
    pub label: String,
    pub values: Vec<String>,
    #[serde(default)]
    pub style: ArgStyle,
}

impl Axis {
    pub fn new<L, I, V>(label: L, values: I) -> Self
    where
        L: Into<String>,
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        Self {
            label: label.into(),
            values: values.into_iter().map(|v| v.to_string()).collect(),
            style: ArgStyle::Separate,
        }
    }

    pub fn joined(mut self) -> Self {
        self.style = ArgStyle::Joined;
        self
    }

    /// Accepts the script spelling of a label: `"OMP_NUM_THREADS="`,
    /// `"-ts "` or `"--size="`.
    pub fn from_legacy<I, V>(label: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        let trimmed = label.trim_end();
        let (label, style) = match trimmed.strip_suffix('=') {
            Some(stripped) => (stripped, ArgStyle::Joined),
            None => (trimmed, ArgStyle::Separate),
        };
        Self {
            style,
            ..Self::new(label, values)
        }
    }

    /// Column header for this axis; leading dashes of flags are dropped.
    pub fn column_name(&self) -> &str {
        let name = self.label.trim_start_matches('-');
        if name.is_empty() {
            &self.label
        } else {
            name
        }
    }
}

/// Ordered collection of axes with unique labels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AxisMap {
    axes: Vec<Axis>,
}

impl AxisMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_axes(axes: impl IntoIterator<Item = Axis>) -> Result<Self> {
        let mut map = Self::new();
        for axis in axes {
            map.push(axis)?;
        }
        Ok(map)
    }

    pub fn push(&mut self, axis: Axis) -> Result<()> {
        axis_is_valid(&axis)?;
        if self.axes.iter().any(|a| a.label == axis.label) {
            return Err(SweepError::DuplicateAxis(axis.label));
        }
        self.axes.push(axis);
        Ok(())
    }

    /// Builder-style `push`.
    pub fn with(mut self, axis: Axis) -> Result<Self> {
        self.push(axis)?;
        Ok(self)
    }

    /// Re-checks invariants, for maps that came through deserialization.
    pub fn validate(&self) -> Result<()> {
        for (i, axis) in self.axes.iter().enumerate() {
            axis_is_valid(axis)?;
            if self.axes[..i].iter().any(|a| a.label == axis.label) {
                return Err(SweepError::DuplicateAxis(axis.label.clone()));
            }
        }
        Ok(())
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    pub fn len(&self) -> usize {
        self.axes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }

    /// Number of combinations; an empty map yields exactly one.
    pub fn combination_count(&self) -> usize {
        self.axes.iter().map(|a| a.values.len()).product()
    }
}

fn axis_is_valid(axis: &Axis) -> Result<()> {
    if axis.label.trim().is_empty() {
        return Err(SweepError::InvalidConfig("axis label is empty".into()));
    }
    if axis.values.is_empty() {
        return Err(SweepError::EmptyAxis(axis.label.clone()));
    }
    Ok(())
}

/// One selected value per axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection<'a> {
    pub axis: &'a Axis,
    pub value: &'a str,
}

/// One sweep point: a selection from each environment axis, then each flag axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Combination<'a> {
    pub env: Vec<Selection<'a>>,
    pub flags: Vec<Selection<'a>>,
}

impl Combination<'_> {
    /// Cell values in column order.
    pub fn values(&self) -> impl Iterator<Item = &str> + '_ {
        self.env.iter().chain(self.flags.iter()).map(|s| s.value)
    }
}

impl fmt::Display for Combination<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for sel in self.env.iter().chain(self.flags.iter()) {
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            write!(f, "{}={}", sel.axis.column_name(), sel.value)?;
        }
        if first {
            f.write_str("-")?;
        }
        Ok(())
    }
}

/// Lazy odometer over the product of several axis maps.
///
/// The first axis of the first map varies slowest, the last axis of the last
/// map fastest. Call `product` again to restart from the first combination.
#[derive(Debug, Clone)]
pub struct Combinations<'a> {
    axes: Vec<&'a Axis>,
    split: usize,
    indices: Vec<usize>,
    done: bool,
}

impl<'a> Combinations<'a> {
    fn new(maps: Vec<&'a AxisMap>) -> Self {
        let split = maps.first().map_or(0, |m| m.len());
        let axes: Vec<&'a Axis> = maps.into_iter().flat_map(|m| m.axes.iter()).collect();
        let done = axes.iter().any(|a| a.values.is_empty());
        Self {
            indices: vec![0; axes.len()],
            axes,
            split,
            done,
        }
    }

    /// Product of environment axes (outer) and flag axes (inner).
    pub fn product(env: &'a AxisMap, flags: &'a AxisMap) -> Self {
        Self::new(vec![env, flags])
    }

    fn advance(&mut self) {
        for pos in (0..self.indices.len()).rev() {
            self.indices[pos] += 1;
            if self.indices[pos] < self.axes[pos].values.len() {
                return;
            }
            self.indices[pos] = 0;
        }
        self.done = true;
    }
}

impl<'a> Iterator for Combinations<'a> {
    type Item = Combination<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut selections: Vec<Selection<'a>> = self
            .axes
            .iter()
            .zip(&self.indices)
            .map(|(&axis, &i)| Selection {
                axis,
                value: axis.values[i].as_str(),
            })
            .collect();
        let flags = selections.split_off(self.split.min(selections.len()));
        self.advance();
        Some(Combination {
            env: selections,
            flags,
        })
    }
}
