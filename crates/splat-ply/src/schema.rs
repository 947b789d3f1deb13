use std::fmt;

use thiserror::Error;

/// Highest SH degree a record layout can carry.
pub const MAX_SH_DEGREE: u32 = 3;

/// Every property is a little-endian f32.
pub const PROPERTY_SIZE: usize = size_of::<f32>();

const CHANNELS: u32 = 3;
const MAX_SH_REST: u32 = CHANNELS * (sh_coeffs_for_degree(MAX_SH_DEGREE) - 1);

pub const fn sh_coeffs_for_degree(degree: u32) -> u32 {
    (degree + 1).pow(2)
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("SH degree {0} is not supported (expected 0..=3)")]
    InvalidDegree(i64),
}

/// A validated spherical harmonics degree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShDegree(u32);

impl ShDegree {
    pub const MAX: Self = Self(MAX_SH_DEGREE);

    pub fn new(degree: u32) -> Result<Self, SchemaError> {
        if degree > MAX_SH_DEGREE {
            return Err(SchemaError::InvalidDegree(degree.into()));
        }
        Ok(Self(degree))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// Higher order coefficients stored per color channel.
    pub fn rest_coeffs_per_channel(self) -> u32 {
        sh_coeffs_for_degree(self.0) - 1
    }

    fn from_rest_count(rest: usize) -> Option<Self> {
        (0..=MAX_SH_DEGREE)
            .map(Self)
            .find(|d| (d.rest_coeffs_per_channel() * CHANNELS) as usize == rest)
    }
}

impl TryFrom<i64> for ShDegree {
    type Error = SchemaError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u32::try_from(value)
            .map_err(|_err| SchemaError::InvalidDegree(value))
            .and_then(Self::new)
    }
}

impl fmt::Display for ShDegree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A single f32 field of a splat record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    X,
    Y,
    Z,
    NormalX,
    NormalY,
    NormalZ,
    ShDc(u8),
    ShRest(u8),
    Opacity,
    Scale(u8),
    Rotation(u8),
    Radius,
}

fn parse_index(s: &str, bound: u32) -> Option<u8> {
    // Reject "+1", "01" and friends so names round trip exactly.
    let index: u8 = s.parse().ok()?;
    (u32::from(index) < bound && index.to_string() == s).then_some(index)
}

impl Property {
    pub fn from_name(name: &str) -> Option<Self> {
        let prop = match name {
            "x" => Self::X,
            "y" => Self::Y,
            "z" => Self::Z,
            "nx" => Self::NormalX,
            "ny" => Self::NormalY,
            "nz" => Self::NormalZ,
            "opacity" => Self::Opacity,
            "radius" => Self::Radius,
            _ => {
                if let Some(i) = name.strip_prefix("f_dc_") {
                    Self::ShDc(parse_index(i, CHANNELS)?)
                } else if let Some(i) = name.strip_prefix("f_rest_") {
                    Self::ShRest(parse_index(i, MAX_SH_REST)?)
                } else if let Some(i) = name.strip_prefix("scale_") {
                    Self::Scale(parse_index(i, 3)?)
                } else if let Some(i) = name.strip_prefix("rot_") {
                    Self::Rotation(parse_index(i, 4)?)
                } else {
                    return None;
                }
            }
        };
        Some(prop)
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X => f.write_str("x"),
            Self::Y => f.write_str("y"),
            Self::Z => f.write_str("z"),
            Self::NormalX => f.write_str("nx"),
            Self::NormalY => f.write_str("ny"),
            Self::NormalZ => f.write_str("nz"),
            Self::ShDc(i) => write!(f, "f_dc_{i}"),
            Self::ShRest(i) => write!(f, "f_rest_{i}"),
            Self::Opacity => f.write_str("opacity"),
            Self::Scale(i) => write!(f, "scale_{i}"),
            Self::Rotation(i) => write!(f, "rot_{i}"),
            Self::Radius => f.write_str("radius"),
        }
    }
}

/// Optional property groups a layout may carry on top of the degree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchemaOptions {
    /// `nx ny nz` right after the position.
    pub normals: bool,
    /// Trailing screen space `radius`.
    pub radius: bool,
}

/// Ordered record layout. Two schemas are compatible only when equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    properties: Vec<Property>,
}

impl Schema {
    /// The canonical layout for a degree:
    ///
    /// `x y z [nx ny nz] f_dc_0..2 f_rest_* opacity scale_0..2 rot_0..3 [radius]`
    pub fn for_degree(degree: ShDegree, options: SchemaOptions) -> Self {
        let rest = degree.rest_coeffs_per_channel() * CHANNELS;

        let mut properties = vec![Property::X, Property::Y, Property::Z];
        if options.normals {
            properties.extend([Property::NormalX, Property::NormalY, Property::NormalZ]);
        }
        properties.extend((0..CHANNELS as u8).map(Property::ShDc));
        properties.extend((0..rest as u8).map(Property::ShRest));
        properties.push(Property::Opacity);
        properties.extend((0..3).map(Property::Scale));
        properties.extend((0..4).map(Property::Rotation));
        if options.radius {
            properties.push(Property::Radius);
        }
        Self { properties }
    }

    pub fn from_properties(properties: Vec<Property>) -> Self {
        Self { properties }
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Size in bytes of one record.
    pub fn record_size(&self) -> usize {
        self.properties.len() * PROPERTY_SIZE
    }

    pub fn contains(&self, property: Property) -> bool {
        self.properties.contains(&property)
    }

    pub fn has_radius(&self) -> bool {
        self.contains(Property::Radius)
    }

    pub fn has_normals(&self) -> bool {
        self.contains(Property::NormalX)
    }

    pub fn options(&self) -> SchemaOptions {
        SchemaOptions {
            normals: self.has_normals(),
            radius: self.has_radius(),
        }
    }

    /// Degree implied by the number of `f_rest_*` properties, if any degree matches.
    pub fn sh_degree(&self) -> Option<ShDegree> {
        let rest = self
            .properties
            .iter()
            .filter(|p| matches!(p, Property::ShRest(_)))
            .count();
        ShDegree::from_rest_count(rest)
    }

    /// First position where `other` departs from `self`, or `None` when compatible.
    pub fn diff(&self, other: &Self) -> Option<SchemaDiff> {
        let len = self.len().max(other.len());
        (0..len).find_map(|index| {
            let expected = self.properties.get(index).copied();
            let found = other.properties.get(index).copied();
            (expected != found).then_some(SchemaDiff {
                index,
                expected,
                found,
            })
        })
    }
}

/// Where two schemas first disagree. `None` means the schema ended at `index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaDiff {
    pub index: usize,
    pub expected: Option<Property>,
    pub found: Option<Property>,
}

impl fmt::Display for SchemaDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "property #{}: ", self.index)?;
        match (self.expected, self.found) {
            (Some(expected), Some(found)) => write!(f, "expected `{expected}`, found `{found}`"),
            (Some(expected), None) => write!(f, "expected `{expected}`, found end of record"),
            (None, Some(found)) => write!(f, "unexpected extra property `{found}`"),
            (None, None) => f.write_str("no difference"),
        }
    }
}
