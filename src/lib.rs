/*! Shader parameter layout, binding and reflection.

The input is a [`CompileRequest`]: a set of type-checked [`TranslationUnit`]s
sharing one interned type arena, each with its global variables, functions
and requested entry points. [`binding::bind`] walks the request and produces a
[`binding::ProgramLayout`], which records for every shader parameter

  1. its memory layout under a chosen set of [`proc::LayoutRules`], and
  2. the register (slot) and register space it is bound to.

The layout tree is stored in arenas and addressed by [`Handle`]s, so the
reflection API in [`reflect`] hands out cheap borrowed views that stay valid
for as long as the `ProgramLayout` lives.

!*/

#![allow(
    clippy::new_without_default,
    clippy::match_like_matches_macro,
    clippy::too_many_arguments
)]
#![warn(
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_qualifications
)]

mod arena;
pub mod binding;
pub mod proc;
pub mod reflect;

pub use crate::arena::{Arena, BadHandle, Handle, UniqueArena};

use std::{
    collections::HashMap,
    hash::BuildHasherDefault,
};

#[cfg(feature = "deserialize")]
use serde::Deserialize;
#[cfg(feature = "serialize")]
use serde::Serialize;

/// Hash map that is faster but not resilient to DoS attacks.
pub type FastHashMap<K, T> = HashMap<K, T, BuildHasherDefault<fxhash::FxHasher>>;
/// Insertion-order preserving hash set.
pub type FastIndexSet<K> = indexmap::IndexSet<K, BuildHasherDefault<fxhash::FxHasher>>;

/// Source language a translation unit was written in.
#[derive(Clone, Copy, Debug, Default, Hash, Eq, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serialize", derive(Serialize))]
#[cfg_attr(feature = "deserialize", derive(Deserialize))]
pub enum SourceLanguage {
    #[default]
    Hlsl,
    Glsl,
}

/// Stage of the programmable pipeline.
#[derive(Clone, Copy, Debug, Hash, Eq, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serialize", derive(Serialize))]
#[cfg_attr(feature = "deserialize", derive(Deserialize))]
#[allow(missing_docs)] // The names are self evident
pub enum ShaderStage {
    Vertex,
    Hull,
    Domain,
    Geometry,
    Fragment,
    Compute,
}

impl ShaderStage {
    /// The prefix HLSL uses for this stage in profile names.
    pub const fn to_hlsl_str(self) -> &'static str {
        match self {
            Self::Vertex => "vs",
            Self::Hull => "hs",
            Self::Domain => "ds",
            Self::Geometry => "gs",
            Self::Fragment => "ps",
            Self::Compute => "cs",
        }
    }
}

/// Shader model of a compilation profile.
#[derive(Clone, Copy, Debug, Hash, Eq, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serialize", derive(Serialize))]
#[cfg_attr(feature = "deserialize", derive(Deserialize))]
pub enum ShaderModel {
    V4_0,
    V4_1,
    V5_0,
    V5_1,
    V6_0,
}

impl ShaderModel {
    pub const fn to_str(self) -> &'static str {
        match self {
            Self::V4_0 => "4_0",
            Self::V4_1 => "4_1",
            Self::V5_0 => "5_0",
            Self::V5_1 => "5_1",
            Self::V6_0 => "6_0",
        }
    }
}

/// A compilation target such as `ps_5_0`.
///
/// Parsed with [`str::parse`], printed with [`std::fmt::Display`].
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize))]
#[cfg_attr(feature = "deserialize", derive(Deserialize))]
pub struct Profile {
    pub stage: ShaderStage,
    pub shader_model: ShaderModel,
}

/// Number of components in a vector, or rows/columns in a matrix.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Hash, Eq, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serialize", derive(Serialize))]
#[cfg_attr(feature = "deserialize", derive(Deserialize))]
pub enum VectorSize {
    /// 2D vector
    Bi = 2,
    /// 3D vector
    Tri = 3,
    /// 4D vector
    Quad = 4,
}

/// Primitive type for a scalar.
#[derive(Clone, Copy, Debug, Hash, Eq, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serialize", derive(Serialize))]
#[cfg_attr(feature = "deserialize", derive(Deserialize))]
pub enum ScalarType {
    Void,
    Bool,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float16,
    Float32,
    Float64,
}

impl ScalarType {
    pub const fn to_str(self) -> &'static str {
        match self {
            Self::Void => "void",
            Self::Bool => "bool",
            Self::Int32 => "int32",
            Self::UInt32 => "uint32",
            Self::Int64 => "int64",
            Self::UInt64 => "uint64",
            Self::Float16 => "float16",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }
}

/// The number of dimensions a texture has.
#[derive(Clone, Copy, Debug, Hash, Eq, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serialize", derive(Serialize))]
#[cfg_attr(feature = "deserialize", derive(Deserialize))]
pub enum TextureDimension {
    /// 1D texture
    D1,
    /// 2D texture
    D2,
    /// 3D texture
    D3,
    /// Cube map
    Cube,
}

/// How a shader may access a resource.
#[derive(Clone, Copy, Debug, Default, Hash, Eq, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serialize", derive(Serialize))]
#[cfg_attr(feature = "deserialize", derive(Deserialize))]
pub enum ResourceAccess {
    #[default]
    Read,
    ReadWrite,
    RasterOrdered,
    Append,
    Consume,
}

impl ResourceAccess {
    /// Returns `true` if the resource is bound through an unordered-access slot.
    pub const fn is_writable(self) -> bool {
        !matches!(self, Self::Read)
    }

    pub const fn to_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::ReadWrite => "readWrite",
            Self::RasterOrdered => "rasterOrdered",
            Self::Append => "append",
            Self::Consume => "consume",
        }
    }
}

/// Member of a user-defined structure.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize))]
#[cfg_attr(feature = "deserialize", derive(Deserialize))]
pub struct StructMember {
    pub name: String,
    /// Type of the field.
    pub ty: Handle<Type>,
    /// Varying semantic, like `TEXCOORD1`, when the struct is used as entry
    /// point input or output.
    pub semantic: Option<String>,
}

/// A data type declared in the program.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize))]
#[cfg_attr(feature = "deserialize", derive(Deserialize))]
pub struct Type {
    /// The name of the type, if any.
    pub name: Option<String>,
    /// Inner structure that depends on the kind of the type.
    pub inner: TypeInner,
}

/// Enum with additional information, depending on the kind of type.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize))]
#[cfg_attr(feature = "deserialize", derive(Deserialize))]
pub enum TypeInner {
    /// Number of integral or floating-point kind.
    Scalar(ScalarType),
    /// Vector of numbers.
    Vector {
        size: VectorSize,
        scalar: ScalarType,
    },
    /// Matrix of numbers, stored as `rows` vectors of `columns` elements.
    Matrix {
        rows: VectorSize,
        columns: VectorSize,
        scalar: ScalarType,
    },
    /// Fixed-size array.
    Array { base: Handle<Type>, size: u32 },
    /// User-defined structure.
    Struct { members: Vec<StructMember> },
    /// `Texture2D<float4>` and friends, including the `RW` variants.
    Texture {
        dim: TextureDimension,
        arrayed: bool,
        multisampled: bool,
        access: ResourceAccess,
        result: Handle<Type>,
    },
    /// `Buffer<T>` / `RWBuffer<T>`.
    TypedBuffer {
        access: ResourceAccess,
        result: Handle<Type>,
    },
    /// `ByteAddressBuffer` / `RWByteAddressBuffer`.
    ByteAddressBuffer { access: ResourceAccess },
    /// `StructuredBuffer<T>` and its append/consume/RW forms.
    StructuredBuffer {
        base: Handle<Type>,
        access: ResourceAccess,
    },
    /// `cbuffer` block or `ConstantBuffer<T>`.
    ConstantBuffer { base: Handle<Type> },
    /// `SamplerState` or `SamplerComparisonState`.
    Sampler { comparison: bool },
}

bitflags::bitflags! {
    /// Storage qualifiers on a global declaration.
    #[cfg_attr(feature = "serialize", derive(Serialize))]
    #[cfg_attr(feature = "deserialize", derive(Deserialize))]
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct StorageQualifiers: u8 {
        /// Thread-local global, not visible to the host.
        const STATIC = 0x1;
        /// `groupshared` compute memory.
        const GROUP_SHARED = 0x2;
        /// Read-only.
        const CONST = 0x4;
    }
}

/// A `register(...)` annotation, as written in source.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize))]
#[cfg_attr(feature = "deserialize", derive(Deserialize))]
pub struct RegisterSemantic {
    /// Register name, like `t3`.
    pub register: String,
    /// Optional space name, like `space1`.
    pub space: Option<String>,
}

impl RegisterSemantic {
    pub fn new(register: &str) -> Self {
        Self {
            register: register.to_string(),
            space: None,
        }
    }

    pub fn with_space(register: &str, space: &str) -> Self {
        Self {
            register: register.to_string(),
            space: Some(space.to_string()),
        }
    }
}

/// Variable defined at the global scope of a translation unit.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize))]
#[cfg_attr(feature = "deserialize", derive(Deserialize))]
pub struct GlobalVariable {
    pub name: String,
    pub ty: Handle<Type>,
    pub qualifiers: StorageQualifiers,
    /// Explicit `register` annotations, in declaration order.
    pub registers: Vec<RegisterSemantic>,
}

impl GlobalVariable {
    /// Returns `true` if the variable is supplied by the host, as opposed to
    /// thread-local or group-shared storage.
    pub fn is_shader_parameter(&self) -> bool {
        !self
            .qualifiers
            .intersects(StorageQualifiers::STATIC | StorageQualifiers::GROUP_SHARED)
    }
}

/// Direction of a function argument.
#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize))]
#[cfg_attr(feature = "deserialize", derive(Deserialize))]
pub enum ArgumentDirection {
    #[default]
    In,
    Out,
    InOut,
}

impl ArgumentDirection {
    pub const fn is_input(self) -> bool {
        matches!(self, Self::In | Self::InOut)
    }

    pub const fn is_output(self) -> bool {
        matches!(self, Self::Out | Self::InOut)
    }
}

/// A function argument.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize))]
#[cfg_attr(feature = "deserialize", derive(Deserialize))]
pub struct FunctionArgument {
    pub name: String,
    pub ty: Handle<Type>,
    pub direction: ArgumentDirection,
    pub semantic: Option<String>,
}

/// A function result.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize))]
#[cfg_attr(feature = "deserialize", derive(Deserialize))]
pub struct FunctionResult {
    pub ty: Handle<Type>,
    pub semantic: Option<String>,
}

/// A function signature. Bodies are irrelevant to binding and are not kept.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize))]
#[cfg_attr(feature = "deserialize", derive(Deserialize))]
pub struct Function {
    pub name: String,
    pub arguments: Vec<FunctionArgument>,
    pub result: Option<FunctionResult>,
    /// `[numthreads(x, y, z)]`, if present.
    pub workgroup_size: Option<[u32; 3]>,
}

/// A request to compile the named function for the given profile.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize))]
#[cfg_attr(feature = "deserialize", derive(Deserialize))]
pub struct EntryPointRequest {
    pub name: String,
    pub profile: Profile,
}

/// One source file worth of declarations.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize))]
#[cfg_attr(feature = "deserialize", derive(Deserialize))]
pub struct TranslationUnit {
    pub language: SourceLanguage,
    pub global_variables: Arena<GlobalVariable>,
    pub functions: Arena<Function>,
    pub entry_points: Vec<EntryPointRequest>,
}

/// Everything the binder consumes for one compilation.
///
/// Translation units share `types`, so the same type declared in two units
/// has a single handle.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize))]
#[cfg_attr(feature = "deserialize", derive(Deserialize))]
pub struct CompileRequest {
    pub types: UniqueArena<Type>,
    pub translation_units: Vec<TranslationUnit>,
}
