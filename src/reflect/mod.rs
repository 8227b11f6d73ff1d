/*! Read-only reflection over a [`ProgramLayout`].

Every view is a `Copy` pair of a borrowed program and a handle, so views are
free to create and stay valid for as long as the program is borrowed.
*/

mod json;

pub use json::{to_json, to_json_string};

use crate::{
    arena::Handle,
    binding::{BindingLocation, EntryPointLayout, GlobalScopeLayout, ProgramLayout, VaryingLayout},
    proc::{
        LayoutRule, ResourceInfo, ResourceKind, TypeLayout, TypeLayoutInner, VarLayout,
        VarResourceInfo,
    },
    Profile, ResourceAccess, ScalarType, ShaderStage, StructMember, TextureDimension, Type,
    TypeInner,
};

/// Broad classification of a type.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum TypeKind {
    Scalar,
    Vector,
    Matrix,
    Array,
    Struct,
    /// Textures, typed, structured and byte-address buffers.
    Resource,
    ConstantBuffer,
    SamplerState,
}

/// The resource kinds a layout touches.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum ParameterCategory {
    None,
    Single(ResourceKind),
    Mixed,
}

impl ParameterCategory {
    fn from_kinds(mut kinds: impl Iterator<Item = ResourceKind>) -> Self {
        match (kinds.next(), kinds.next()) {
            (None, _) => Self::None,
            (Some(kind), None) => Self::Single(kind),
            (Some(_), Some(_)) => Self::Mixed,
        }
    }
}

#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum ResourceBaseShape {
    Texture1D,
    Texture2D,
    Texture3D,
    TextureCube,
    TextureBuffer,
    StructuredBuffer,
    ByteAddressBuffer,
}

impl ResourceBaseShape {
    pub const fn to_str(self) -> &'static str {
        match self {
            Self::Texture1D => "texture1D",
            Self::Texture2D => "texture2D",
            Self::Texture3D => "texture3D",
            Self::TextureCube => "textureCube",
            Self::TextureBuffer => "textureBuffer",
            Self::StructuredBuffer => "structuredBuffer",
            Self::ByteAddressBuffer => "byteAddressBuffer",
        }
    }
}

/// Shape of a resource type.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct ResourceShape {
    pub base: ResourceBaseShape,
    pub arrayed: bool,
    pub multisampled: bool,
}

impl ResourceShape {
    const fn plain(base: ResourceBaseShape) -> Self {
        Self {
            base,
            arrayed: false,
            multisampled: false,
        }
    }
}

/// Entry into the reflection API.
#[derive(Clone, Copy, Debug)]
pub struct ShaderReflection<'a> {
    program: &'a ProgramLayout,
}

impl ProgramLayout {
    pub fn reflection(&self) -> ShaderReflection<'_> {
        ShaderReflection { program: self }
    }
}

impl<'a> ShaderReflection<'a> {
    pub fn program(&self) -> &'a ProgramLayout {
        self.program
    }

    pub fn parameter_count(&self) -> usize {
        self.program.parameters().len()
    }

    pub fn parameter_by_index(&self, index: usize) -> Option<VariableLayoutReflection<'a>> {
        self.program
            .parameters()
            .get(index)
            .map(|&handle| VariableLayoutReflection::new(self.program, handle))
    }

    pub fn parameters(&self) -> impl ExactSizeIterator<Item = VariableLayoutReflection<'a>> + 'a {
        let program = self.program;
        program
            .parameters()
            .iter()
            .map(move |&handle| VariableLayoutReflection::new(program, handle))
    }

    pub fn find_parameter_by_name(&self, name: &str) -> Option<VariableLayoutReflection<'a>> {
        self.parameters().find(|parameter| parameter.name() == name)
    }

    /// Layout of the whole global scope.
    pub fn global_scope(&self) -> TypeLayoutReflection<'a> {
        TypeLayoutReflection::new(self.program, self.program.global_scope.type_layout())
    }

    /// Binding of the implicit constant buffer holding global uniforms.
    pub fn global_constant_buffer(&self) -> Option<BindingLocation> {
        match self.program.global_scope {
            GlobalScopeLayout::ConstantBuffer { binding, .. } => Some(BindingLocation {
                space: binding.space,
                index: binding.index,
                count: 1,
            }),
            GlobalScopeLayout::Struct(_) => None,
        }
    }

    pub fn entry_point_count(&self) -> usize {
        self.program.entry_points.len()
    }

    pub fn entry_point_by_index(&self, index: usize) -> Option<EntryPointReflection<'a>> {
        self.program
            .entry_points
            .get(index)
            .map(|layout| EntryPointReflection { layout })
    }

    pub fn entry_points(&self) -> impl ExactSizeIterator<Item = EntryPointReflection<'a>> + 'a {
        self.program
            .entry_points
            .iter()
            .map(|layout| EntryPointReflection { layout })
    }
}

/// A type, independent of any layout.
#[derive(Clone, Copy, Debug)]
pub struct TypeReflection<'a> {
    program: &'a ProgramLayout,
    handle: Handle<Type>,
}

impl<'a> TypeReflection<'a> {
    fn new(program: &'a ProgramLayout, handle: Handle<Type>) -> Self {
        Self { program, handle }
    }

    pub const fn handle(&self) -> Handle<Type> {
        self.handle
    }

    fn inner(&self) -> &'a TypeInner {
        &self.program.types[self.handle].inner
    }

    pub fn name(&self) -> Option<&'a str> {
        self.program.types[self.handle].name.as_deref()
    }

    pub fn kind(&self) -> TypeKind {
        match *self.inner() {
            TypeInner::Scalar(_) => TypeKind::Scalar,
            TypeInner::Vector { .. } => TypeKind::Vector,
            TypeInner::Matrix { .. } => TypeKind::Matrix,
            TypeInner::Array { .. } => TypeKind::Array,
            TypeInner::Struct { .. } => TypeKind::Struct,
            TypeInner::Texture { .. }
            | TypeInner::TypedBuffer { .. }
            | TypeInner::ByteAddressBuffer { .. }
            | TypeInner::StructuredBuffer { .. } => TypeKind::Resource,
            TypeInner::ConstantBuffer { .. } => TypeKind::ConstantBuffer,
            TypeInner::Sampler { .. } => TypeKind::SamplerState,
        }
    }

    fn members(&self) -> &'a [StructMember] {
        match *self.inner() {
            TypeInner::Struct { ref members } => members,
            _ => &[],
        }
    }

    pub fn field_count(&self) -> usize {
        self.members().len()
    }

    pub fn field_by_index(&self, index: usize) -> Option<VariableReflection<'a>> {
        let program = self.program;
        self.members().get(index).map(|member| VariableReflection {
            name: &member.name,
            ty: TypeReflection::new(program, member.ty),
        })
    }

    /// Number of elements of an array or components of a vector.
    pub fn element_count(&self) -> u32 {
        match *self.inner() {
            TypeInner::Array { size, .. } => size,
            TypeInner::Vector { size, .. } => size as u32,
            _ => 0,
        }
    }

    /// Element of an array, or contents of a constant or structured buffer.
    ///
    /// Vector and matrix elements are described by [`Self::scalar_type`].
    pub fn element_type(&self) -> Option<TypeReflection<'a>> {
        match *self.inner() {
            TypeInner::Array { base, .. }
            | TypeInner::ConstantBuffer { base }
            | TypeInner::StructuredBuffer { base, .. } => Some(Self::new(self.program, base)),
            _ => None,
        }
    }

    pub fn row_count(&self) -> u32 {
        match *self.inner() {
            TypeInner::Matrix { rows, .. } => rows as u32,
            TypeInner::Scalar(_) | TypeInner::Vector { .. } => 1,
            _ => 0,
        }
    }

    pub fn column_count(&self) -> u32 {
        match *self.inner() {
            TypeInner::Matrix { columns, .. } => columns as u32,
            TypeInner::Vector { size, .. } => size as u32,
            TypeInner::Scalar(_) => 1,
            _ => 0,
        }
    }

    pub fn scalar_type(&self) -> Option<ScalarType> {
        match *self.inner() {
            TypeInner::Scalar(scalar)
            | TypeInner::Vector { scalar, .. }
            | TypeInner::Matrix { scalar, .. } => Some(scalar),
            _ => None,
        }
    }

    /// Arrays of resources report their element's resource properties.
    fn resource(&self) -> &'a TypeInner {
        let mut inner = self.inner();
        while let TypeInner::Array { base, .. } = *inner {
            inner = &self.program.types[base].inner;
        }
        inner
    }

    pub fn resource_shape(&self) -> Option<ResourceShape> {
        Some(match *self.resource() {
            TypeInner::Texture {
                dim,
                arrayed,
                multisampled,
                ..
            } => ResourceShape {
                base: match dim {
                    TextureDimension::D1 => ResourceBaseShape::Texture1D,
                    TextureDimension::D2 => ResourceBaseShape::Texture2D,
                    TextureDimension::D3 => ResourceBaseShape::Texture3D,
                    TextureDimension::Cube => ResourceBaseShape::TextureCube,
                },
                arrayed,
                multisampled,
            },
            TypeInner::TypedBuffer { .. } => ResourceShape::plain(ResourceBaseShape::TextureBuffer),
            TypeInner::StructuredBuffer { .. } => {
                ResourceShape::plain(ResourceBaseShape::StructuredBuffer)
            }
            TypeInner::ByteAddressBuffer { .. } => {
                ResourceShape::plain(ResourceBaseShape::ByteAddressBuffer)
            }
            _ => return None,
        })
    }

    pub fn resource_access(&self) -> Option<ResourceAccess> {
        match *self.resource() {
            TypeInner::Texture { access, .. }
            | TypeInner::TypedBuffer { access, .. }
            | TypeInner::ByteAddressBuffer { access }
            | TypeInner::StructuredBuffer { access, .. } => Some(access),
            _ => None,
        }
    }

    /// Type read from the resource, if it has one.
    pub fn resource_result_type(&self) -> Option<TypeReflection<'a>> {
        match *self.resource() {
            TypeInner::Texture { result, .. } | TypeInner::TypedBuffer { result, .. } => {
                Some(Self::new(self.program, result))
            }
            TypeInner::StructuredBuffer { base, .. } => Some(Self::new(self.program, base)),
            _ => None,
        }
    }
}

/// A type laid out under some rules.
#[derive(Clone, Copy, Debug)]
pub struct TypeLayoutReflection<'a> {
    program: &'a ProgramLayout,
    handle: Handle<TypeLayout>,
}

impl<'a> TypeLayoutReflection<'a> {
    fn new(program: &'a ProgramLayout, handle: Handle<TypeLayout>) -> Self {
        Self { program, handle }
    }

    pub const fn handle(&self) -> Handle<TypeLayout> {
        self.handle
    }

    fn layout(&self) -> &'a TypeLayout {
        &self.program.type_layouts[self.handle]
    }

    /// The type laid out, `None` for the synthesized global scope.
    pub fn ty(&self) -> Option<TypeReflection<'a>> {
        self.layout()
            .ty
            .map(|ty| TypeReflection::new(self.program, ty))
    }

    pub fn kind(&self) -> TypeKind {
        match self.layout().inner {
            TypeLayoutInner::Array { .. } => TypeKind::Array,
            TypeLayoutInner::Struct { .. } => TypeKind::Struct,
            TypeLayoutInner::ConstantBuffer { .. } => TypeKind::ConstantBuffer,
            TypeLayoutInner::StructuredBuffer { .. } => TypeKind::Resource,
            TypeLayoutInner::Simple => match self.ty() {
                Some(ty) => ty.kind(),
                None => TypeKind::Struct,
            },
        }
    }

    pub fn rules(&self) -> LayoutRule {
        self.layout().rules
    }

    /// Amount of `kind` consumed; bytes for [`ResourceKind::Uniform`].
    pub fn size(&self, kind: ResourceKind) -> u32 {
        self.layout().size(kind)
    }

    pub fn uniform_alignment(&self) -> u32 {
        self.layout().uniform_alignment
    }

    pub fn resources(&self) -> &'a [ResourceInfo] {
        &self.layout().resources
    }

    fn fields(&self) -> &'a [Handle<VarLayout>] {
        match self.layout().inner {
            TypeLayoutInner::Struct { ref fields, .. } => fields,
            _ => &[],
        }
    }

    pub fn field_count(&self) -> usize {
        self.fields().len()
    }

    pub fn field_by_index(&self, index: usize) -> Option<VariableLayoutReflection<'a>> {
        self.fields()
            .get(index)
            .map(|&handle| VariableLayoutReflection::new(self.program, handle))
    }

    pub fn fields_iter(&self) -> impl ExactSizeIterator<Item = VariableLayoutReflection<'a>> + 'a {
        let program = self.program;
        self.fields()
            .iter()
            .map(move |&handle| VariableLayoutReflection::new(program, handle))
    }

    pub fn element_count(&self) -> u32 {
        match self.layout().inner {
            TypeLayoutInner::Array { element_count, .. } => element_count,
            _ => self.ty().map_or(0, |ty| ty.element_count()),
        }
    }

    pub fn element_type_layout(&self) -> Option<TypeLayoutReflection<'a>> {
        match self.layout().inner {
            TypeLayoutInner::Array { element, .. }
            | TypeLayoutInner::ConstantBuffer { element }
            | TypeLayoutInner::StructuredBuffer { element } => {
                Some(Self::new(self.program, element))
            }
            TypeLayoutInner::Simple | TypeLayoutInner::Struct { .. } => None,
        }
    }

    /// Distance between consecutive array elements for `kind`.
    pub fn element_stride(&self, kind: ResourceKind) -> u32 {
        match self.layout().inner {
            TypeLayoutInner::Array {
                element,
                uniform_stride,
                ..
            } => match kind {
                ResourceKind::Uniform => uniform_stride,
                _ => self.program.type_layouts[element].size(kind),
            },
            _ => 0,
        }
    }

    pub fn category(&self) -> ParameterCategory {
        ParameterCategory::from_kinds(self.resources().iter().map(|res| res.kind))
    }

    pub fn category_count(&self) -> usize {
        self.resources().len()
    }

    pub fn category_by_index(&self, index: usize) -> Option<ResourceKind> {
        self.resources().get(index).map(|res| res.kind)
    }
}

/// A struct field or other declaration, independent of any layout.
#[derive(Clone, Copy, Debug)]
pub struct VariableReflection<'a> {
    name: &'a str,
    ty: TypeReflection<'a>,
}

impl<'a> VariableReflection<'a> {
    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn ty(&self) -> TypeReflection<'a> {
        self.ty
    }
}

/// A laid-out declaration: a shader parameter or a field of a struct layout.
#[derive(Clone, Copy, Debug)]
pub struct VariableLayoutReflection<'a> {
    program: &'a ProgramLayout,
    handle: Handle<VarLayout>,
}

impl<'a> VariableLayoutReflection<'a> {
    fn new(program: &'a ProgramLayout, handle: Handle<VarLayout>) -> Self {
        Self { program, handle }
    }

    pub const fn handle(&self) -> Handle<VarLayout> {
        self.handle
    }

    fn var(&self) -> &'a VarLayout {
        &self.program.var_layouts[self.handle]
    }

    pub fn name(&self) -> &'a str {
        &self.var().name
    }

    pub fn variable(&self) -> Option<VariableReflection<'a>> {
        let name = self.name();
        self.type_layout()
            .ty()
            .map(|ty| VariableReflection { name, ty })
    }

    pub fn type_layout(&self) -> TypeLayoutReflection<'a> {
        TypeLayoutReflection::new(self.program, self.var().type_layout)
    }

    pub fn is_redeclaration(&self) -> bool {
        self.var().is_redeclaration()
    }

    /// Per-kind placement, in [`ResourceKind`] order for parameters.
    pub fn resources(&self) -> &'a [VarResourceInfo] {
        &self.var().resources
    }

    /// Byte offset for [`ResourceKind::Uniform`], slot index otherwise.
    pub fn offset(&self, kind: ResourceKind) -> u32 {
        self.var().find_resource(kind).map_or(0, |res| res.index)
    }

    pub fn space(&self, kind: ResourceKind) -> u32 {
        self.var().find_resource(kind).map_or(0, |res| res.space)
    }

    /// Full binding for `kind`, with its size taken from the type layout.
    pub fn binding(&self, kind: ResourceKind) -> Option<BindingLocation> {
        let res = self.var().find_resource(kind)?;
        Some(BindingLocation {
            space: res.space,
            index: res.index,
            count: self.type_layout().size(kind),
        })
    }

    pub fn category(&self) -> ParameterCategory {
        ParameterCategory::from_kinds(self.resources().iter().map(|res| res.kind))
    }

    pub fn category_count(&self) -> usize {
        self.resources().len()
    }

    pub fn category_by_index(&self, index: usize) -> Option<ResourceKind> {
        self.resources().get(index).map(|res| res.kind)
    }

    /// Index of the first category, `0` if there is none.
    pub fn binding_index(&self) -> u32 {
        self.resources().first().map_or(0, |res| res.index)
    }

    pub fn binding_space(&self) -> u32 {
        self.resources().first().map_or(0, |res| res.space)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct EntryPointReflection<'a> {
    layout: &'a EntryPointLayout,
}

impl<'a> EntryPointReflection<'a> {
    pub fn name(&self) -> &'a str {
        &self.layout.name
    }

    pub fn stage(&self) -> ShaderStage {
        self.layout.stage()
    }

    pub fn profile(&self) -> Profile {
        self.layout.profile
    }

    /// `[numthreads]` of a compute entry point; missing axes read as 1.
    pub fn compute_thread_group_size(&self) -> [u32; 3] {
        self.layout.workgroup_size.unwrap_or([1; 3])
    }

    pub fn varyings(&self) -> &'a [VaryingLayout] {
        &self.layout.varyings
    }
}
