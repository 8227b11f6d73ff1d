//! Parsing of `register(...)` annotations, varying semantics and profiles.

use crate::{proc::ResourceKind, Profile, RegisterSemantic, ShaderModel, ShaderStage};
use std::{fmt, str::FromStr};

/// Binding location pinned by a `register` annotation.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct RegisterBinding {
    pub kind: ResourceKind,
    pub space: u32,
    pub index: u32,
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum RegisterError {
    #[error("register name is empty")]
    Empty,
    #[error("unsupported register class `{0}`")]
    UnknownClass(char),
    #[error("invalid register index `{0}`")]
    InvalidIndex(String),
    #[error("invalid register space `{0}`")]
    InvalidSpace(String),
}

fn parse_decimal(digits: &str) -> Option<u32> {
    if digits.is_empty() || !digits.bytes().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Decode `t3` or `u0, space2` into a resource kind, space and index.
pub fn parse_register(semantic: &RegisterSemantic) -> Result<RegisterBinding, RegisterError> {
    let register = semantic.register.trim();
    let mut chars = register.chars();
    let class = chars.next().ok_or(RegisterError::Empty)?;
    let kind = match class.to_ascii_lowercase() {
        'b' => ResourceKind::ConstantBuffer,
        't' => ResourceKind::ShaderResource,
        'u' => ResourceKind::UnorderedAccess,
        's' => ResourceKind::SamplerState,
        _ => return Err(RegisterError::UnknownClass(class)),
    };
    let index = parse_decimal(chars.as_str())
        .ok_or_else(|| RegisterError::InvalidIndex(register.to_string()))?;

    let space = match semantic.space {
        Some(ref space) => {
            let space = space.trim();
            space
                .strip_prefix("space")
                .and_then(parse_decimal)
                .ok_or_else(|| RegisterError::InvalidSpace(space.to_string()))?
        }
        None => 0,
    };

    Ok(RegisterBinding { kind, space, index })
}

/// A varying semantic split into its name and trailing index.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct SimpleSemantic {
    pub name: String,
    pub index: u32,
}

impl SimpleSemantic {
    /// Split `TEXCOORD12` into `TEXCOORD` and `12`. A name without trailing
    /// digits has index zero.
    ///
    /// Returns `None` if the index does not fit in a `u32`.
    pub fn decompose(composed: &str) -> Option<Self> {
        let name = composed.trim_end_matches(|c: char| c.is_ascii_digit());
        let digits = &composed[name.len()..];
        let index = match digits {
            "" => 0,
            _ => digits.parse().ok()?,
        };
        Some(Self {
            name: name.to_string(),
            index,
        })
    }

    /// Returns `true` for the render target output semantic.
    pub fn is_render_target(&self) -> bool {
        self.name.eq_ignore_ascii_case("SV_Target")
    }

    /// Returns `true` for `SV_` system values.
    pub fn is_system_value(&self) -> bool {
        self.name
            .get(..3)
            .map_or(false, |prefix| prefix.eq_ignore_ascii_case("SV_"))
    }
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ProfileError {
    #[error("profile `{0}` is not of the form `<stage>_<major>_<minor>`")]
    Malformed(String),
    #[error("unknown shader stage `{0}`")]
    UnknownStage(String),
    #[error("unsupported shader model `{0}`")]
    UnknownShaderModel(String),
}

impl FromStr for ShaderStage {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "vs" => Self::Vertex,
            "hs" => Self::Hull,
            "ds" => Self::Domain,
            "gs" => Self::Geometry,
            "ps" => Self::Fragment,
            "cs" => Self::Compute,
            _ => return Err(ProfileError::UnknownStage(s.to_string())),
        })
    }
}

impl FromStr for ShaderModel {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "4_0" => Self::V4_0,
            "4_1" => Self::V4_1,
            "5_0" => Self::V5_0,
            "5_1" => Self::V5_1,
            "6_0" => Self::V6_0,
            _ => return Err(ProfileError::UnknownShaderModel(s.to_string())),
        })
    }
}

impl FromStr for Profile {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (stage, model) = s
            .split_once('_')
            .ok_or_else(|| ProfileError::Malformed(s.to_string()))?;
        Ok(Self {
            stage: stage.parse()?,
            shader_model: model.parse()?,
        })
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}",
            self.stage.to_hlsl_str(),
            self.shader_model.to_str()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers() {
        assert_eq!(
            parse_register(&RegisterSemantic::new("t3")),
            Ok(RegisterBinding {
                kind: ResourceKind::ShaderResource,
                space: 0,
                index: 3
            })
        );
        assert_eq!(
            parse_register(&RegisterSemantic::with_space("u12", "space2")),
            Ok(RegisterBinding {
                kind: ResourceKind::UnorderedAccess,
                space: 2,
                index: 12
            })
        );
        assert_eq!(
            parse_register(&RegisterSemantic::new("b0")).map(|b| b.kind),
            Ok(ResourceKind::ConstantBuffer)
        );
        assert_eq!(
            parse_register(&RegisterSemantic::new("s1")).map(|b| b.kind),
            Ok(ResourceKind::SamplerState)
        );
    }

    #[test]
    fn bad_registers() {
        assert_eq!(
            parse_register(&RegisterSemantic::new("")),
            Err(RegisterError::Empty)
        );
        assert_eq!(
            parse_register(&RegisterSemantic::new("c4")),
            Err(RegisterError::UnknownClass('c'))
        );
        assert_eq!(
            parse_register(&RegisterSemantic::new("t3x")),
            Err(RegisterError::InvalidIndex("t3x".to_string()))
        );
        assert_eq!(
            parse_register(&RegisterSemantic::new("t")),
            Err(RegisterError::InvalidIndex("t".to_string()))
        );
        assert_eq!(
            parse_register(&RegisterSemantic::with_space("t0", "set1")),
            Err(RegisterError::InvalidSpace("set1".to_string()))
        );
    }

    #[test]
    fn simple_semantics() {
        let sem = SimpleSemantic::decompose("TEXCOORD12").unwrap();
        assert_eq!(sem.name, "TEXCOORD");
        assert_eq!(sem.index, 12);

        let sem = SimpleSemantic::decompose("SV_Target").unwrap();
        assert_eq!(sem.index, 0);
        assert!(sem.is_render_target());
        assert!(sem.is_system_value());

        assert!(SimpleSemantic::decompose("sv_target1")
            .unwrap()
            .is_render_target());
        assert!(!SimpleSemantic::decompose("COLOR0")
            .unwrap()
            .is_system_value());
    }

    #[test]
    fn semantic_index_limits() {
        let sem = SimpleSemantic::decompose("TEXCOORD4294967295").unwrap();
        assert_eq!(sem.name, "TEXCOORD");
        assert_eq!(sem.index, u32::MAX);
        assert_eq!(SimpleSemantic::decompose("TEXCOORD4294967296"), None);
        assert_eq!(SimpleSemantic::decompose("TEXCOORD99999999999"), None);
    }

    #[test]
    fn profiles() {
        let profile: Profile = "ps_5_0".parse().unwrap();
        assert_eq!(profile.stage, ShaderStage::Fragment);
        assert_eq!(profile.shader_model, ShaderModel::V5_0);
        assert_eq!(profile.to_string(), "ps_5_0");

        assert_eq!(
            "cs_6_0".parse::<Profile>().map(|p| p.stage),
            Ok(ShaderStage::Compute)
        );
        assert_eq!(
            "xs_5_0".parse::<Profile>(),
            Err(ProfileError::UnknownStage("xs".to_string()))
        );
        assert_eq!(
            "vs_9_9".parse::<Profile>(),
            Err(ProfileError::UnknownShaderModel("9_9".to_string()))
        );
        assert_eq!(
            "vs".parse::<Profile>(),
            Err(ProfileError::Malformed("vs".to_string()))
        );
    }
}
