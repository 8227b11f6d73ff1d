/*! Type layout trees.

[`TypeLayouter`] walks a [`Type`](crate::Type) and builds a [`TypeLayout`]
tree mirroring it. Every node records which resource kinds it consumes and how
much of each; struct nodes additionally hold a [`VarLayout`] per field with the
field's offset for every kind it uses.

Nodes live in arenas owned by the layouter. Children are always appended
before their parents.
*/

use super::{layouter::LayoutRule, LayoutInfo, ObjectLayoutInfo, ResourceKind};
use crate::{
    arena::{Arena, Handle, UniqueArena},
    FastHashMap, GlobalVariable, Type, TypeInner,
};

/// How much of one resource kind a type consumes.
///
/// For [`ResourceKind::Uniform`] the count is in bytes.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub struct ResourceInfo {
    pub kind: ResourceKind,
    pub count: u32,
}

/// Where a variable lives for one resource kind.
///
/// For [`ResourceKind::Uniform`] the index is a byte offset.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub struct VarResourceInfo {
    pub kind: ResourceKind,
    pub space: u32,
    pub index: u32,
}

/// Identity of the declaration a [`VarLayout`] describes.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub enum DeclRef {
    /// A global variable of the given translation unit.
    Global {
        unit: usize,
        var: Handle<GlobalVariable>,
    },
    /// The `index`-th member of the struct type `ty`.
    Member { ty: Handle<Type>, index: u32 },
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub enum TypeLayoutInner {
    /// Scalars, vectors, matrices and opaque resources.
    Simple,
    Array {
        element: Handle<TypeLayout>,
        element_count: u32,
        /// Distance between elements in bytes, zero for non-uniform elements.
        uniform_stride: u32,
    },
    Struct {
        /// One entry per field, in declaration order.
        fields: Vec<Handle<VarLayout>>,
        /// Every declaration that maps to a field. Several declarations may
        /// share one field.
        var_to_layout: FastHashMap<DeclRef, Handle<VarLayout>>,
    },
    ConstantBuffer {
        element: Handle<TypeLayout>,
    },
    StructuredBuffer {
        element: Handle<TypeLayout>,
    },
}

/// Layout of a type under some rules.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub struct TypeLayout {
    /// The type laid out. `None` for the synthesized global scope.
    pub ty: Option<Handle<Type>>,
    pub rules: LayoutRule,
    /// Resource usage, in the order kinds were first encountered.
    pub resources: Vec<ResourceInfo>,
    pub uniform_alignment: u32,
    pub inner: TypeLayoutInner,
}

impl TypeLayout {
    fn new(ty: Option<Handle<Type>>, rules: LayoutRule, inner: TypeLayoutInner) -> Self {
        Self {
            ty,
            rules,
            resources: Vec::new(),
            uniform_alignment: 1,
            inner,
        }
    }

    pub fn find_resource(&self, kind: ResourceKind) -> Option<&ResourceInfo> {
        self.resources.iter().find(|res| res.kind == kind)
    }

    /// Amount of `kind` this type consumes, zero if none.
    pub fn size(&self, kind: ResourceKind) -> u32 {
        self.find_resource(kind).map_or(0, |res| res.count)
    }

    /// Returns `true` if some resource count saturated while laying out.
    pub fn is_oversized(&self) -> bool {
        self.resources.iter().any(|res| res.count == u32::MAX)
    }

    pub fn uniform(&self) -> LayoutInfo {
        LayoutInfo {
            size: self.size(ResourceKind::Uniform),
            alignment: self.uniform_alignment,
        }
    }

    /// Add `count` units of `kind`, merging with an existing record.
    ///
    /// Counts saturate at `u32::MAX`.
    pub(crate) fn add_resource(&mut self, kind: ResourceKind, count: u32) {
        match self.resources.iter_mut().find(|res| res.kind == kind) {
            Some(res) => res.count = res.count.saturating_add(count),
            None => self.resources.push(ResourceInfo { kind, count }),
        }
    }
}

bitflags::bitflags! {
    #[cfg_attr(feature = "serialize", derive(serde::Serialize))]
    #[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct VarLayoutFlags: u8 {
        /// Another declaration of the same parameter was seen first.
        const IS_REDECLARATION = 0x1;
    }
}

/// Layout of one declared variable or struct field.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
pub struct VarLayout {
    pub decl: DeclRef,
    pub name: String,
    pub type_layout: Handle<TypeLayout>,
    pub flags: VarLayoutFlags,
    /// One record per resource kind the variable uses.
    pub resources: Vec<VarResourceInfo>,
}

impl VarLayout {
    pub fn new(decl: DeclRef, name: String, type_layout: Handle<TypeLayout>) -> Self {
        Self {
            decl,
            name,
            type_layout,
            flags: VarLayoutFlags::empty(),
            resources: Vec::new(),
        }
    }

    pub fn find_resource(&self, kind: ResourceKind) -> Option<&VarResourceInfo> {
        self.resources.iter().find(|res| res.kind == kind)
    }

    pub(crate) fn find_or_add_resource(&mut self, kind: ResourceKind) -> &mut VarResourceInfo {
        let position = match self.resources.iter().position(|res| res.kind == kind) {
            Some(position) => position,
            None => {
                self.resources.push(VarResourceInfo {
                    kind,
                    space: 0,
                    index: 0,
                });
                self.resources.len() - 1
            }
        };
        &mut self.resources[position]
    }

    pub fn is_redeclaration(&self) -> bool {
        self.flags.contains(VarLayoutFlags::IS_REDECLARATION)
    }
}

/// Builds [`TypeLayout`] trees for types of one type arena.
#[derive(Debug)]
pub struct TypeLayouter<'a> {
    types: &'a UniqueArena<Type>,
    pub type_layouts: Arena<TypeLayout>,
    pub var_layouts: Arena<VarLayout>,
}

impl<'a> TypeLayouter<'a> {
    pub fn new(types: &'a UniqueArena<Type>) -> Self {
        Self {
            types,
            type_layouts: Arena::new(),
            var_layouts: Arena::new(),
        }
    }

    /// Give up the built arenas.
    pub fn finish(self) -> (Arena<TypeLayout>, Arena<VarLayout>) {
        (self.type_layouts, self.var_layouts)
    }

    /// Compute the flat layout of `ty` without building a tree.
    pub fn layout_info(&mut self, ty: Handle<Type>, rule: LayoutRule) -> ObjectLayoutInfo {
        self.layout(ty, rule, false).0
    }

    /// Build the full layout tree of `ty`.
    pub fn create_type_layout(&mut self, ty: Handle<Type>, rule: LayoutRule) -> Handle<TypeLayout> {
        match self.layout(ty, rule, true) {
            (_, Some(handle)) => handle,
            (_, None) => unreachable!("layout tree requested but not built"),
        }
    }

    /// Lay out `ty` under `rule`.
    ///
    /// The flat [`ObjectLayoutInfo`] is always computed; the tree is only
    /// materialized when `build` is set.
    pub fn layout(
        &mut self,
        ty: Handle<Type>,
        rule: LayoutRule,
        build: bool,
    ) -> (ObjectLayoutInfo, Option<Handle<TypeLayout>>) {
        let rules = rule.rules();
        let types = self.types;
        match types[ty].inner {
            TypeInner::Scalar(scalar) => {
                let info = ObjectLayoutInfo::from(rules.scalar_layout(scalar));
                (info, self.simple(build, ty, rule, info))
            }
            TypeInner::Vector { size, scalar } => {
                let element = rules.scalar_layout(scalar);
                let info = ObjectLayoutInfo::from(rules.vector_layout(element, size as u32));
                (info, self.simple(build, ty, rule, info))
            }
            TypeInner::Matrix {
                rows,
                columns,
                scalar,
            } => {
                let element = rules.scalar_layout(scalar);
                let info =
                    ObjectLayoutInfo::from(rules.matrix_layout(element, rows as u32, columns as u32));
                (info, self.simple(build, ty, rule, info))
            }
            TypeInner::Texture { access, .. }
            | TypeInner::TypedBuffer { access, .. }
            | TypeInner::ByteAddressBuffer { access } => {
                let info = rules.object_layout(access.resource_kind());
                (info, self.simple(build, ty, rule, info))
            }
            TypeInner::Sampler { .. } => {
                let info = rules.object_layout(ResourceKind::SamplerState);
                (info, self.simple(build, ty, rule, info))
            }
            TypeInner::ConstantBuffer { base } => {
                let info = rules.object_layout(ResourceKind::ConstantBuffer);
                let layout = if build {
                    let element = self.create_type_layout(base, LayoutRule::HlslConstantBuffer);
                    Some(self.wrap_constant_buffer(Some(ty), element, rule))
                } else {
                    None
                };
                (info, layout)
            }
            TypeInner::StructuredBuffer { base, access } => {
                let kind = access.resource_kind();
                let info = rules.object_layout(kind);
                let layout = if build {
                    let element = self.create_type_layout(base, LayoutRule::HlslStructuredBuffer);
                    let mut layout = TypeLayout::new(
                        Some(ty),
                        rule,
                        TypeLayoutInner::StructuredBuffer { element },
                    );
                    layout.add_resource(kind, info.size);
                    Some(self.type_layouts.append(layout))
                } else {
                    None
                };
                (info, layout)
            }
            TypeInner::Array { base, size } => self.layout_array(ty, base, size, rule, build),
            TypeInner::Struct { ref members } => {
                let mut info = rules.begin_struct_layout();
                let mut layout = TypeLayout::new(
                    Some(ty),
                    rule,
                    TypeLayoutInner::Struct {
                        fields: Vec::with_capacity(members.len()),
                        var_to_layout: FastHashMap::default(),
                    },
                );
                let mut fields = Vec::with_capacity(members.len());

                for (index, member) in members.iter().enumerate() {
                    let (field_info, field_layout) = self.layout(member.ty, rule, build);

                    let field_uniform = field_info.uniform();
                    let offset = if field_uniform.size != 0 {
                        let offset = rules.add_struct_field(&mut info, field_uniform);
                        log::trace!(
                            "field {} of {:?} placed at byte {}",
                            member.name,
                            ty,
                            offset
                        );
                        Some(offset)
                    } else {
                        None
                    };

                    let field_layout = match field_layout {
                        Some(handle) => handle,
                        None => continue,
                    };
                    let decl = DeclRef::Member {
                        ty,
                        index: index as u32,
                    };
                    let mut var = VarLayout::new(decl, member.name.clone(), field_layout);
                    if let Some(offset) = offset {
                        var.find_or_add_resource(ResourceKind::Uniform).index = offset;
                    }
                    for res in self.type_layouts[field_layout].resources.iter() {
                        if res.kind == ResourceKind::Uniform {
                            continue;
                        }
                        var.find_or_add_resource(res.kind).index = layout.size(res.kind);
                        layout.add_resource(res.kind, res.count);
                    }
                    fields.push((decl, self.var_layouts.append(var)));
                }

                rules.end_struct_layout(&mut info);

                if !build {
                    return (ObjectLayoutInfo::from(info), None);
                }

                if info.size != 0 {
                    layout.add_resource(ResourceKind::Uniform, info.size);
                }
                layout.uniform_alignment = info.alignment;
                if let TypeLayoutInner::Struct {
                    fields: ref mut field_list,
                    ref mut var_to_layout,
                } = layout.inner
                {
                    for (decl, handle) in fields {
                        field_list.push(handle);
                        var_to_layout.insert(decl, handle);
                    }
                }
                (
                    ObjectLayoutInfo::from(info),
                    Some(self.type_layouts.append(layout)),
                )
            }
        }
    }

    fn layout_array(
        &mut self,
        ty: Handle<Type>,
        base: Handle<Type>,
        count: u32,
        rule: LayoutRule,
        build: bool,
    ) -> (ObjectLayoutInfo, Option<Handle<TypeLayout>>) {
        let rules = rule.rules();
        let (element_info, element_layout) = self.layout(base, rule, build);

        let (info, uniform_stride) = match element_info.kind {
            ResourceKind::Uniform => {
                let array = rules.array_layout(element_info.uniform(), count);
                let info = ObjectLayoutInfo::from(LayoutInfo::from(array));
                (info, array.element_stride)
            }
            kind => (
                ObjectLayoutInfo {
                    kind,
                    size: element_info.size.saturating_mul(count),
                    alignment: 1,
                },
                0,
            ),
        };

        let element = match element_layout {
            Some(element) => element,
            None => return (info, None),
        };

        let mut layout = TypeLayout::new(
            Some(ty),
            rule,
            TypeLayoutInner::Array {
                element,
                element_count: count,
                uniform_stride,
            },
        );
        layout.uniform_alignment = info.uniform().alignment;
        for res in self.type_layouts[element].resources.iter() {
            let total = match res.kind {
                ResourceKind::Uniform => info.uniform().size,
                _ => res.count.saturating_mul(count),
            };
            layout.add_resource(res.kind, total);
        }
        (info, Some(self.type_layouts.append(layout)))
    }

    fn simple(
        &mut self,
        build: bool,
        ty: Handle<Type>,
        rule: LayoutRule,
        info: ObjectLayoutInfo,
    ) -> Option<Handle<TypeLayout>> {
        if !build {
            return None;
        }
        let mut layout = TypeLayout::new(Some(ty), rule, TypeLayoutInner::Simple);
        if info.size != 0 {
            layout.add_resource(info.kind, info.size);
        }
        layout.uniform_alignment = info.uniform().alignment;
        Some(self.type_layouts.append(layout))
    }

    /// Wrap `element` in a constant buffer.
    ///
    /// The buffer takes one constant-buffer slot and re-exports every
    /// non-uniform resource of its element. The element's uniform bytes are
    /// not visible outside the buffer.
    pub fn wrap_constant_buffer(
        &mut self,
        ty: Option<Handle<Type>>,
        element: Handle<TypeLayout>,
        rule: LayoutRule,
    ) -> Handle<TypeLayout> {
        let mut layout = TypeLayout::new(ty, rule, TypeLayoutInner::ConstantBuffer { element });
        layout.add_resource(ResourceKind::ConstantBuffer, 1);
        for res in self.type_layouts[element].resources.iter() {
            if res.kind != ResourceKind::Uniform {
                layout.add_resource(res.kind, res.count);
            }
        }
        self.type_layouts.append(layout)
    }

    /// Returns `true` if two layout trees have the same shape, usage and
    /// field offsets.
    pub fn same_layout(&self, a: Handle<TypeLayout>, b: Handle<TypeLayout>) -> bool {
        if a == b {
            return true;
        }
        let (la, lb) = (&self.type_layouts[a], &self.type_layouts[b]);
        if la.ty == lb.ty && la.rules == lb.rules {
            return true;
        }
        if la.resources != lb.resources || la.uniform_alignment != lb.uniform_alignment {
            return false;
        }
        match (&la.inner, &lb.inner) {
            (&TypeLayoutInner::Simple, &TypeLayoutInner::Simple) => {
                let inner = |layout: &TypeLayout| layout.ty.map(|ty| &self.types[ty].inner);
                inner(la) == inner(lb)
            }
            (
                &TypeLayoutInner::Array {
                    element: ea,
                    element_count: ca,
                    uniform_stride: sa,
                },
                &TypeLayoutInner::Array {
                    element: eb,
                    element_count: cb,
                    uniform_stride: sb,
                },
            ) => ca == cb && sa == sb && self.same_layout(ea, eb),
            (
                &TypeLayoutInner::Struct {
                    fields: ref fa, ..
                },
                &TypeLayoutInner::Struct {
                    fields: ref fb, ..
                },
            ) => {
                fa.len() == fb.len()
                    && fa.iter().zip(fb.iter()).all(|(&va, &vb)| {
                        let (va, vb) = (&self.var_layouts[va], &self.var_layouts[vb]);
                        va.name == vb.name
                            && va.resources == vb.resources
                            && self.same_layout(va.type_layout, vb.type_layout)
                    })
            }
            (
                &TypeLayoutInner::ConstantBuffer { element: ea },
                &TypeLayoutInner::ConstantBuffer { element: eb },
            )
            | (
                &TypeLayoutInner::StructuredBuffer { element: ea },
                &TypeLayoutInner::StructuredBuffer { element: eb },
            ) => self.same_layout(ea, eb),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ResourceAccess, ScalarType, StructMember, TextureDimension, VectorSize};

    struct Types {
        arena: UniqueArena<Type>,
    }

    impl Types {
        fn new() -> Self {
            Self {
                arena: UniqueArena::new(),
            }
        }

        fn add(&mut self, inner: TypeInner) -> Handle<Type> {
            self.arena.insert(Type { name: None, inner })
        }

        fn float(&mut self) -> Handle<Type> {
            self.add(TypeInner::Scalar(ScalarType::Float32))
        }

        fn float3(&mut self) -> Handle<Type> {
            self.add(TypeInner::Vector {
                size: VectorSize::Tri,
                scalar: ScalarType::Float32,
            })
        }

        fn texture(&mut self) -> Handle<Type> {
            let result = self.add(TypeInner::Vector {
                size: VectorSize::Quad,
                scalar: ScalarType::Float32,
            });
            self.add(TypeInner::Texture {
                dim: TextureDimension::D2,
                arrayed: false,
                multisampled: false,
                access: ResourceAccess::Read,
                result,
            })
        }

        fn structure(&mut self, members: &[(&str, Handle<Type>)]) -> Handle<Type> {
            let members = members
                .iter()
                .map(|&(name, ty)| StructMember {
                    name: name.to_string(),
                    ty,
                    semantic: None,
                })
                .collect();
            self.add(TypeInner::Struct { members })
        }
    }

    fn field_offsets(layouter: &TypeLayouter, handle: Handle<TypeLayout>) -> Vec<Option<u32>> {
        match layouter.type_layouts[handle].inner {
            TypeLayoutInner::Struct { ref fields, .. } => fields
                .iter()
                .map(|&f| {
                    layouter.var_layouts[f]
                        .find_resource(ResourceKind::Uniform)
                        .map(|res| res.index)
                })
                .collect(),
            ref other => panic!("not a struct: {other:?}"),
        }
    }

    #[test]
    fn default_struct() {
        let mut types = Types::new();
        let float = types.float();
        let float3 = types.float3();
        let s = types.structure(&[("a", float3), ("b", float)]);

        let mut layouter = TypeLayouter::new(&types.arena);
        let handle = layouter.create_type_layout(s, LayoutRule::Default);
        let layout = &layouter.type_layouts[handle];
        assert_eq!(layout.size(ResourceKind::Uniform), 16);
        assert_eq!(layout.uniform_alignment, 4);
        assert_eq!(field_offsets(&layouter, handle), [Some(0), Some(12)]);
    }

    #[test]
    fn constant_buffer_struct() {
        let mut types = Types::new();
        let float = types.float();
        let float3 = types.float3();
        let s = types.structure(&[("a", float), ("b", float), ("c", float), ("d", float3)]);

        let mut layouter = TypeLayouter::new(&types.arena);
        let handle = layouter.create_type_layout(s, LayoutRule::HlslConstantBuffer);
        assert_eq!(
            field_offsets(&layouter, handle),
            [Some(0), Some(4), Some(8), Some(16)]
        );
        assert_eq!(layouter.type_layouts[handle].size(ResourceKind::Uniform), 32);
    }

    #[test]
    fn resource_fields_skip_byte_layout() {
        let mut types = Types::new();
        let float = types.float();
        let tex = types.texture();
        let s = types.structure(&[("a", float), ("t0", tex), ("b", float), ("t1", tex)]);

        let mut layouter = TypeLayouter::new(&types.arena);
        let handle = layouter.create_type_layout(s, LayoutRule::Default);
        assert_eq!(
            field_offsets(&layouter, handle),
            [Some(0), None, Some(4), None]
        );
        let layout = &layouter.type_layouts[handle];
        assert_eq!(layout.size(ResourceKind::ShaderResource), 2);
        assert_eq!(layout.size(ResourceKind::Uniform), 8);

        let fields = match layout.inner {
            TypeLayoutInner::Struct { ref fields, .. } => fields.clone(),
            _ => unreachable!(),
        };
        let srv = |f: Handle<VarLayout>| {
            layouter.var_layouts[f]
                .find_resource(ResourceKind::ShaderResource)
                .map(|res| res.index)
        };
        assert_eq!(srv(fields[1]), Some(0));
        assert_eq!(srv(fields[3]), Some(1));
    }

    #[test]
    fn resource_only_struct_has_no_uniform_usage() {
        let mut types = Types::new();
        let tex = types.texture();
        let s = types.structure(&[("t", tex)]);

        let mut layouter = TypeLayouter::new(&types.arena);
        let handle = layouter.create_type_layout(s, LayoutRule::HlslConstantBuffer);
        let layout = &layouter.type_layouts[handle];
        assert!(layout.find_resource(ResourceKind::Uniform).is_none());
        assert_eq!(layout.size(ResourceKind::ShaderResource), 1);
    }

    #[test]
    fn arrays_multiply_usage() {
        let mut types = Types::new();
        let tex = types.texture();
        let float = types.float();
        let textures = types.add(TypeInner::Array {
            base: tex,
            size: 4,
        });
        let floats = types.add(TypeInner::Array {
            base: float,
            size: 3,
        });

        let mut layouter = TypeLayouter::new(&types.arena);
        let handle = layouter.create_type_layout(textures, LayoutRule::HlslConstantBuffer);
        assert_eq!(
            layouter.type_layouts[handle].size(ResourceKind::ShaderResource),
            4
        );
        assert!(layouter.type_layouts[handle]
            .find_resource(ResourceKind::Uniform)
            .is_none());

        let handle = layouter.create_type_layout(floats, LayoutRule::HlslConstantBuffer);
        let layout = &layouter.type_layouts[handle];
        assert_eq!(layout.size(ResourceKind::Uniform), 48);
        match layout.inner {
            TypeLayoutInner::Array {
                uniform_stride,
                element_count,
                ..
            } => {
                assert_eq!(uniform_stride, 16);
                assert_eq!(element_count, 3);
            }
            ref other => panic!("not an array: {other:?}"),
        }
    }

    #[test]
    fn constant_buffer_swallows_uniforms() {
        let mut types = Types::new();
        let float = types.float();
        let tex = types.texture();
        let s = types.structure(&[("x", float), ("t", tex)]);
        let cb = types.add(TypeInner::ConstantBuffer { base: s });

        let mut layouter = TypeLayouter::new(&types.arena);
        assert_eq!(
            layouter.layout_info(cb, LayoutRule::Default),
            ObjectLayoutInfo::resource(ResourceKind::ConstantBuffer)
        );
        let handle = layouter.create_type_layout(cb, LayoutRule::Default);
        let layout = &layouter.type_layouts[handle];
        assert_eq!(
            layout.resources,
            [
                ResourceInfo {
                    kind: ResourceKind::ConstantBuffer,
                    count: 1
                },
                ResourceInfo {
                    kind: ResourceKind::ShaderResource,
                    count: 1
                },
            ]
        );
        match layout.inner {
            TypeLayoutInner::ConstantBuffer { element } => {
                assert_eq!(
                    layouter.type_layouts[element].rules,
                    LayoutRule::HlslConstantBuffer
                );
            }
            ref other => panic!("not a constant buffer: {other:?}"),
        }
    }

    #[test]
    fn buffer_contents_ignore_caller_rules() {
        let mut types = Types::new();
        let float = types.float();
        let float2 = types.add(TypeInner::Vector {
            size: VectorSize::Bi,
            scalar: ScalarType::Float32,
        });
        let s = types.structure(&[("a", float), ("b", float2)]);
        let cb = types.add(TypeInner::ConstantBuffer { base: s });
        let sb = types.add(TypeInner::StructuredBuffer {
            base: s,
            access: ResourceAccess::Read,
        });

        let mut layouter = TypeLayouter::new(&types.arena);
        for rule in [LayoutRule::Std140, LayoutRule::Std430, LayoutRule::Packed] {
            let handle = layouter.create_type_layout(cb, rule);
            let element = match layouter.type_layouts[handle].inner {
                TypeLayoutInner::ConstantBuffer { element } => element,
                ref other => panic!("not a constant buffer: {other:?}"),
            };
            assert_eq!(
                layouter.type_layouts[element].rules,
                LayoutRule::HlslConstantBuffer
            );
            assert_eq!(field_offsets(&layouter, element), [Some(0), Some(4)]);

            let handle = layouter.create_type_layout(sb, rule);
            match layouter.type_layouts[handle].inner {
                TypeLayoutInner::StructuredBuffer { element } => assert_eq!(
                    layouter.type_layouts[element].rules,
                    LayoutRule::HlslStructuredBuffer
                ),
                ref other => panic!("not a structured buffer: {other:?}"),
            }
        }
    }

    #[test]
    fn oversized_arrays_saturate() {
        let mut types = Types::new();
        let float = types.float();
        let tex = types.texture();
        let big = types.add(TypeInner::Array {
            base: float,
            size: 0x1000_0000,
        });
        let textures = types.add(TypeInner::Array {
            base: tex,
            size: 0x10000,
        });
        let nested = types.add(TypeInner::Array {
            base: textures,
            size: 0x10000,
        });
        let s = types.structure(&[("big", big), ("t", nested), ("after", float)]);

        let mut layouter = TypeLayouter::new(&types.arena);
        for rule in [LayoutRule::Default, LayoutRule::HlslConstantBuffer] {
            let handle = layouter.create_type_layout(big, rule);
            assert_eq!(layouter.type_layouts[handle].size(ResourceKind::Uniform), u32::MAX);
            assert!(layouter.type_layouts[handle].is_oversized());
        }
        let handle = layouter.create_type_layout(nested, LayoutRule::Default);
        assert_eq!(
            layouter.type_layouts[handle].size(ResourceKind::ShaderResource),
            u32::MAX
        );

        let handle = layouter.create_type_layout(s, LayoutRule::Default);
        let layout = &layouter.type_layouts[handle];
        assert!(layout.is_oversized());
        assert_eq!(layout.size(ResourceKind::Uniform), u32::MAX);

        let handle = layouter.create_type_layout(textures, LayoutRule::Default);
        assert!(!layouter.type_layouts[handle].is_oversized());
    }

    #[test]
    fn flat_layout_builds_nothing() {
        let mut types = Types::new();
        let float = types.float();
        let float3 = types.float3();
        let s = types.structure(&[("a", float3), ("b", float)]);

        let mut layouter = TypeLayouter::new(&types.arena);
        let info = layouter.layout_info(s, LayoutRule::Default);
        assert_eq!(info.kind, ResourceKind::Uniform);
        assert_eq!(info.size, 16);
        assert!(layouter.type_layouts.is_empty());
        assert!(layouter.var_layouts.is_empty());
    }

    #[test]
    fn structural_match() {
        let mut types = Types::new();
        let float = types.float();
        let float3 = types.float3();
        let a = types.structure(&[("x", float3), ("y", float)]);
        let b = types.arena.insert(Type {
            name: Some("Other".to_string()),
            inner: TypeInner::Struct {
                members: vec![
                    StructMember {
                        name: "x".to_string(),
                        ty: float3,
                        semantic: None,
                    },
                    StructMember {
                        name: "y".to_string(),
                        ty: float,
                        semantic: None,
                    },
                ],
            },
        });
        let c = types.structure(&[("y", float), ("x", float3)]);

        let mut layouter = TypeLayouter::new(&types.arena);
        let la = layouter.create_type_layout(a, LayoutRule::Default);
        let lb = layouter.create_type_layout(b, LayoutRule::Default);
        let lc = layouter.create_type_layout(c, LayoutRule::Default);
        assert!(layouter.same_layout(la, lb));
        assert!(!layouter.same_layout(la, lc));
    }
}
