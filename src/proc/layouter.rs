/*! Memory layout rules.

Each target memory model is a unit struct implementing [`LayoutRules`]. The
trait's provided methods are the plain C-like rules; the constant-buffer
flavors override only what differs. [`LayoutRule`] names a rule set so it can
be stored in options and layout nodes, and [`LayoutRule::rules`] turns the
name into the strategy.
*/

use super::ResourceKind;
use crate::ScalarType;
use std::fmt;

/// Size of one HLSL constant register, in bytes.
pub const REGISTER_SIZE: u32 = 16;

/// Size and alignment of a piece of uniform data, in bytes.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub struct LayoutInfo {
    pub size: u32,
    pub alignment: u32,
}

impl LayoutInfo {
    /// The layout of something that takes no uniform memory.
    pub const EMPTY: Self = Self {
        size: 0,
        alignment: 1,
    };

    pub const fn new(size: u32, alignment: u32) -> Self {
        Self { size, alignment }
    }
}

/// Layout of an array: a [`LayoutInfo`] plus the distance between elements.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub struct ArrayLayoutInfo {
    pub size: u32,
    pub alignment: u32,
    pub element_stride: u32,
}

impl From<ArrayLayoutInfo> for LayoutInfo {
    fn from(info: ArrayLayoutInfo) -> Self {
        Self {
            size: info.size,
            alignment: info.alignment,
        }
    }
}

/// Flat layout of any type: which resource kind it primarily consumes, and
/// how much of it.
///
/// For [`ResourceKind::Uniform`] the size and alignment are in bytes. For
/// every other kind the size is a slot count and the alignment is 1.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub struct ObjectLayoutInfo {
    pub kind: ResourceKind,
    pub size: u32,
    pub alignment: u32,
}

impl ObjectLayoutInfo {
    /// One slot of a non-uniform kind.
    pub const fn resource(kind: ResourceKind) -> Self {
        Self {
            kind,
            size: 1,
            alignment: 1,
        }
    }

    /// The uniform part of this layout, or [`LayoutInfo::EMPTY`].
    pub const fn uniform(&self) -> LayoutInfo {
        match self.kind {
            ResourceKind::Uniform => LayoutInfo {
                size: self.size,
                alignment: self.alignment,
            },
            _ => LayoutInfo::EMPTY,
        }
    }
}

impl From<LayoutInfo> for ObjectLayoutInfo {
    fn from(info: LayoutInfo) -> Self {
        Self {
            kind: ResourceKind::Uniform,
            size: info.size,
            alignment: info.alignment,
        }
    }
}

/// Round `offset` up to the nearest `alignment` boundary.
///
/// `alignment` must be a power of two. Saturates at `u32::MAX`.
pub const fn round_up(alignment: u32, offset: u32) -> u32 {
    match offset & (alignment - 1) {
        0 => offset,
        other => offset.saturating_add(alignment - other),
    }
}

/// A target memory model.
///
/// Sizes saturate at `u32::MAX` instead of wrapping, so an oversized layout
/// stays oversized all the way up the tree.
///
/// Implementations are stateless; all struct-building state lives in the
/// [`LayoutInfo`] threaded through [`begin_struct_layout`],
/// [`add_struct_field`] and [`end_struct_layout`].
///
/// [`begin_struct_layout`]: LayoutRules::begin_struct_layout
/// [`add_struct_field`]: LayoutRules::add_struct_field
/// [`end_struct_layout`]: LayoutRules::end_struct_layout
pub trait LayoutRules: fmt::Debug + Send + Sync {
    fn scalar_layout(&self, scalar: ScalarType) -> LayoutInfo {
        match scalar {
            ScalarType::Void => LayoutInfo::new(0, 1),
            ScalarType::Bool | ScalarType::Int32 | ScalarType::UInt32 | ScalarType::Float32 => {
                LayoutInfo::new(4, 4)
            }
            ScalarType::Int64 | ScalarType::UInt64 | ScalarType::Float64 => LayoutInfo::new(8, 8),
            ScalarType::Float16 => LayoutInfo::new(2, 2),
        }
    }

    fn object_layout(&self, kind: ResourceKind) -> ObjectLayoutInfo {
        ObjectLayoutInfo::resource(kind)
    }

    fn array_layout(&self, element: LayoutInfo, count: u32) -> ArrayLayoutInfo {
        let stride = element.size;
        ArrayLayoutInfo {
            size: stride.saturating_mul(count),
            alignment: element.alignment,
            element_stride: stride,
        }
    }

    fn vector_layout(&self, element: LayoutInfo, count: u32) -> LayoutInfo {
        LayoutInfo {
            size: element.size.saturating_mul(count),
            alignment: element.alignment,
        }
    }

    /// Matrices are arrays of `rows` row vectors.
    fn matrix_layout(&self, element: LayoutInfo, rows: u32, columns: u32) -> LayoutInfo {
        let row = self.vector_layout(element, columns);
        self.array_layout(row, rows).into()
    }

    fn begin_struct_layout(&self) -> LayoutInfo {
        LayoutInfo::new(0, 1)
    }

    /// Place a field at the end of the struct, returning its offset.
    fn add_struct_field(&self, info: &mut LayoutInfo, field: LayoutInfo) -> u32 {
        info.alignment = info.alignment.max(field.alignment);
        info.size = round_up(field.alignment, info.size);
        let offset = info.size;
        info.size = info.size.saturating_add(field.size);
        offset
    }

    fn end_struct_layout(&self, info: &mut LayoutInfo) {
        info.size = round_up(info.alignment, info.size);
    }
}

/// Array elements start on a register boundary and are padded to fill it.
fn register_array_layout(element: LayoutInfo, count: u32) -> ArrayLayoutInfo {
    let alignment = element.alignment.max(REGISTER_SIZE);
    let stride = round_up(alignment, element.size);
    ArrayLayoutInfo {
        size: stride.saturating_mul(count),
        alignment,
        element_stride: stride,
    }
}

/// Plain C-like packing.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultLayout;

impl LayoutRules for DefaultLayout {}

/// GLSL `std140` uniform blocks.
#[derive(Clone, Copy, Debug, Default)]
pub struct Std140Layout;

impl LayoutRules for Std140Layout {
    fn array_layout(&self, element: LayoutInfo, count: u32) -> ArrayLayoutInfo {
        register_array_layout(element, count)
    }

    fn vector_layout(&self, element: LayoutInfo, count: u32) -> LayoutInfo {
        let size = element.size.saturating_mul(count);
        LayoutInfo {
            size,
            alignment: size.checked_next_power_of_two().unwrap_or(REGISTER_SIZE),
        }
    }

    fn begin_struct_layout(&self) -> LayoutInfo {
        LayoutInfo::new(0, REGISTER_SIZE)
    }
}

/// GLSL `std430` storage blocks.
#[derive(Clone, Copy, Debug, Default)]
pub struct Std430Layout;

impl LayoutRules for Std430Layout {}

/// Tightly packed data, such as vertex streams.
#[derive(Clone, Copy, Debug, Default)]
pub struct PackedLayout;

impl LayoutRules for PackedLayout {}

/// HLSL `cbuffer` packing: 16-byte registers that no field may straddle.
#[derive(Clone, Copy, Debug, Default)]
pub struct HlslConstantBufferLayout;

impl LayoutRules for HlslConstantBufferLayout {
    fn array_layout(&self, element: LayoutInfo, count: u32) -> ArrayLayoutInfo {
        register_array_layout(element, count)
    }

    fn begin_struct_layout(&self) -> LayoutInfo {
        LayoutInfo::new(0, REGISTER_SIZE)
    }

    fn add_struct_field(&self, info: &mut LayoutInfo, field: LayoutInfo) -> u32 {
        info.alignment = info.alignment.max(field.alignment);
        info.size = round_up(field.alignment, info.size);

        if field.size != 0 {
            let start_register = info.size / REGISTER_SIZE;
            let end_register = info.size.saturating_add(field.size - 1) / REGISTER_SIZE;
            if start_register != end_register {
                info.size = round_up(REGISTER_SIZE, info.size);
            }
        }

        let offset = info.size;
        info.size = info.size.saturating_add(field.size);
        offset
    }
}

/// HLSL `StructuredBuffer` element packing.
#[derive(Clone, Copy, Debug, Default)]
pub struct HlslStructuredBufferLayout;

impl LayoutRules for HlslStructuredBufferLayout {}

/// Name of a [`LayoutRules`] implementation.
#[derive(Clone, Copy, Debug, Default, Hash, Eq, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub enum LayoutRule {
    Default,
    Std140,
    Std430,
    Packed,
    #[default]
    HlslConstantBuffer,
    HlslStructuredBuffer,
}

impl LayoutRule {
    pub fn rules(self) -> &'static dyn LayoutRules {
        match self {
            Self::Default => &DefaultLayout,
            Self::Std140 => &Std140Layout,
            Self::Std430 => &Std430Layout,
            Self::Packed => &PackedLayout,
            Self::HlslConstantBuffer => &HlslConstantBufferLayout,
            Self::HlslStructuredBuffer => &HlslStructuredBufferLayout,
        }
    }
}
