//! Fundamental types describing the paired inputs of a Gated Field Network.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Number of components read from a posture stream that is paired with an image.
pub const POSTURE_COMPONENTS: usize = 3;

/// Number of streams stacked along the pairing axis.
pub const PAIRED_STREAMS: usize = 2;

/// Modality of a single input stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    /// Full spatial stream (square image)
    Image,
    /// Low-dimensional structured stream (joint angles, positions)
    Posture,
}

impl Modality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Image => "image",
            Modality::Posture => "posture",
        }
    }
}

impl FromStr for Modality {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "image" => Ok(Modality::Image),
            "posture" => Ok(Modality::Posture),
            other => Err(Error::UnknownModality(other.to_string())),
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered pair of stream modalities: index 0 is stream X, index 1 is stream Y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputType(pub [Modality; PAIRED_STREAMS]);

impl InputType {
    pub fn new(x: Modality, y: Modality) -> Self {
        Self([x, y])
    }

    pub fn image_image() -> Self {
        Self::new(Modality::Image, Modality::Image)
    }

    pub fn image_posture() -> Self {
        Self::new(Modality::Image, Modality::Posture)
    }

    pub fn posture_posture() -> Self {
        Self::new(Modality::Posture, Modality::Posture)
    }

    /// Parse a pair of modality tags such as `["image", "posture"]`.
    pub fn parse<S: AsRef<str>>(tags: &[S]) -> Result<Self> {
        match tags {
            [x, y] => Ok(Self::new(x.as_ref().parse()?, y.as_ref().parse()?)),
            _ => Err(Error::InvalidInput(format!(
                "input type needs exactly {} modality tags, got {}",
                PAIRED_STREAMS,
                tags.len()
            ))),
        }
    }

    pub fn x(&self) -> Modality {
        self.0[0]
    }

    pub fn y(&self) -> Modality {
        self.0[1]
    }

    /// Resolve the pair into its slicing layout.
    pub fn layout(&self) -> StreamLayout {
        match (self.x(), self.y()) {
            (Modality::Image, Modality::Image) => StreamLayout::ImageImage,
            (Modality::Posture, Modality::Posture) => StreamLayout::PosturePosture,
            (Modality::Image, Modality::Posture) => StreamLayout::ImagePosture { posture_stream: 1 },
            (Modality::Posture, Modality::Image) => StreamLayout::ImagePosture { posture_stream: 0 },
        }
    }
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.x(), self.y())
    }
}

/// How a stream is cut out of the stacked input tensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamSlice {
    /// Every feature of the stream
    Full,
    /// First [`POSTURE_COMPONENTS`] rows of column 0
    Reduced,
}

/// Closed set of stream pairings, resolved once from an [`InputType`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamLayout {
    ImageImage,
    /// Image paired with a posture packed into an image-shaped plane
    ImagePosture { posture_stream: usize },
    PosturePosture,
}

impl StreamLayout {
    pub fn name(&self) -> &'static str {
        match self {
            StreamLayout::ImageImage => "image/image",
            StreamLayout::ImagePosture { .. } => "image/posture",
            StreamLayout::PosturePosture => "posture/posture",
        }
    }

    /// Slicing policy for stream `index` (0 = X, 1 = Y).
    pub fn slice(&self, index: usize) -> StreamSlice {
        match self {
            StreamLayout::ImagePosture { posture_stream } if *posture_stream == index => {
                StreamSlice::Reduced
            }
            _ => StreamSlice::Full,
        }
    }

    /// Rank of the per-sample input shape, pairing axis included.
    pub fn expected_rank(&self) -> usize {
        match self {
            StreamLayout::PosturePosture => 2,
            _ => 3,
        }
    }

    /// Whether the decoder reconstructs a posture vector rather than an image.
    pub fn is_posture_only(&self) -> bool {
        matches!(self, StreamLayout::PosturePosture)
    }
}

/// Projection style of the factor branches.
///
/// Written in configuration files as a list of tags (`["dense"]`). Any list
/// naming `dense` selects [`FactorType::Dense`]; everything else falls back to
/// the generic branch. Both currently build the same dense stacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub enum FactorType {
    #[default]
    Dense,
    Fallback,
}

impl FactorType {
    pub fn from_tags<S: AsRef<str>>(tags: &[S]) -> Self {
        if tags.iter().any(|t| t.as_ref().trim().eq_ignore_ascii_case("dense")) {
            FactorType::Dense
        } else {
            FactorType::Fallback
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FactorType::Dense => "dense",
            FactorType::Fallback => "fallback",
        }
    }
}

impl From<Vec<String>> for FactorType {
    fn from(tags: Vec<String>) -> Self {
        Self::from_tags(&tags)
    }
}

impl From<FactorType> for Vec<String> {
    fn from(factor: FactorType) -> Self {
        vec![factor.as_str().to_string()]
    }
}

impl fmt::Display for FactorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-sample input shape (batch axis excluded); axis 0 is the pairing axis.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputShape(Vec<usize>);

impl InputShape {
    pub fn new(dims: impl Into<Vec<usize>>) -> Self {
        Self(dims.into())
    }

    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    pub fn rank(&self) -> usize {
        self.0.len()
    }

    pub fn dim(&self, axis: usize) -> Option<usize> {
        self.0.get(axis).copied()
    }

    /// Shape of one stream, i.e. everything after the pairing axis.
    pub fn stream_dims(&self) -> &[usize] {
        self.0.get(1..).unwrap_or(&[])
    }

    /// Number of scalars in one paired sample.
    pub fn sample_len(&self) -> usize {
        self.0.iter().product()
    }
}

impl From<Vec<usize>> for InputShape {
    fn from(dims: Vec<usize>) -> Self {
        Self(dims)
    }
}

impl From<&[usize]> for InputShape {
    fn from(dims: &[usize]) -> Self {
        Self(dims.to_vec())
    }
}

impl fmt::Display for InputShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims: Vec<String> = self.0.iter().map(|d| d.to_string()).collect();
        write!(f, "({})", dims.join(", "))
    }
}
