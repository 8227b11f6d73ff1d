//! Layout computation.

mod layouter;
mod type_layout;

pub use layouter::{
    round_up, ArrayLayoutInfo, DefaultLayout, HlslConstantBufferLayout,
    HlslStructuredBufferLayout, LayoutInfo, LayoutRule, LayoutRules, ObjectLayoutInfo,
    PackedLayout, Std140Layout, Std430Layout, REGISTER_SIZE,
};
pub use type_layout::{
    DeclRef, ResourceInfo, TypeLayout, TypeLayoutInner, TypeLayouter, VarLayout, VarLayoutFlags,
    VarResourceInfo,
};

/// Category of binding slot a parameter consumes.
///
/// The declaration order is the order bindings are reported in.
#[derive(Clone, Copy, Debug, Hash, Eq, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub enum ResourceKind {
    /// Raw bytes inside a constant buffer. Sizes and offsets are in bytes.
    Uniform,
    /// `b` registers.
    ConstantBuffer,
    /// `t` registers.
    ShaderResource,
    /// `u` registers.
    UnorderedAccess,
    /// `s` registers.
    SamplerState,
    /// Vertex attribute slots.
    VertexInput,
    /// Render target slots.
    FragmentOutput,
}

impl ResourceKind {
    pub const COUNT: usize = 7;

    pub const ALL: [Self; Self::COUNT] = [
        Self::Uniform,
        Self::ConstantBuffer,
        Self::ShaderResource,
        Self::UnorderedAccess,
        Self::SamplerState,
        Self::VertexInput,
        Self::FragmentOutput,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn to_str(self) -> &'static str {
        match self {
            Self::Uniform => "uniform",
            Self::ConstantBuffer => "constantBuffer",
            Self::ShaderResource => "shaderResource",
            Self::UnorderedAccess => "unorderedAccess",
            Self::SamplerState => "samplerState",
            Self::VertexInput => "vertexInput",
            Self::FragmentOutput => "fragmentOutput",
        }
    }

    /// The HLSL register class letter, for kinds that have one.
    pub const fn register_class(self) -> Option<char> {
        match self {
            Self::ConstantBuffer => Some('b'),
            Self::ShaderResource => Some('t'),
            Self::UnorderedAccess => Some('u'),
            Self::SamplerState => Some('s'),
            Self::Uniform | Self::VertexInput | Self::FragmentOutput => None,
        }
    }
}

impl crate::ResourceAccess {
    /// The slot kind a resource with this access binds through.
    pub const fn resource_kind(self) -> ResourceKind {
        if self.is_writable() {
            ResourceKind::UnorderedAccess
        } else {
            ResourceKind::ShaderResource
        }
    }
}

impl crate::TypeInner {
    /// The slot kind an opaque resource type binds through, or `None` for
    /// plain data and aggregates.
    pub const fn resource_kind(&self) -> Option<ResourceKind> {
        match *self {
            Self::Texture { access, .. }
            | Self::TypedBuffer { access, .. }
            | Self::ByteAddressBuffer { access }
            | Self::StructuredBuffer { access, .. } => Some(access.resource_kind()),
            Self::ConstantBuffer { .. } => Some(ResourceKind::ConstantBuffer),
            Self::Sampler { .. } => Some(ResourceKind::SamplerState),
            Self::Scalar(_)
            | Self::Vector { .. }
            | Self::Matrix { .. }
            | Self::Array { .. }
            | Self::Struct { .. } => None,
        }
    }
}

#[test]
fn resource_kind_order() {
    for (index, kind) in ResourceKind::ALL.iter().enumerate() {
        assert_eq!(kind.index(), index);
    }
    assert_eq!(ResourceKind::ShaderResource.register_class(), Some('t'));
    assert_eq!(ResourceKind::Uniform.register_class(), None);
    assert_eq!(
        crate::ResourceAccess::Read.resource_kind(),
        ResourceKind::ShaderResource
    );
    assert_eq!(
        crate::ResourceAccess::Append.resource_kind(),
        ResourceKind::UnorderedAccess
    );
}
