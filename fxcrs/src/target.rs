//! Target profiles (shader stage + shader model)

use std::fmt;
use std::str::FromStr;

/// Shader stage (vertex, pixel, compute, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderType {
    /// Vertex shader
    Vertex,
    /// Pixel (fragment) shader
    Pixel,
    /// Geometry shader
    Geometry,
    /// Hull (tessellation control) shader
    Hull,
    /// Domain (tessellation evaluation) shader
    Domain,
    /// Compute shader
    Compute,
}

impl ShaderType {
    /// Returns the profile prefix (vs, ps, gs, hs, ds, cs)
    pub fn prefix(&self) -> &'static str {
        match self {
            ShaderType::Vertex => "vs",
            ShaderType::Pixel => "ps",
            ShaderType::Geometry => "gs",
            ShaderType::Hull => "hs",
            ShaderType::Domain => "ds",
            ShaderType::Compute => "cs",
        }
    }
}

impl fmt::Display for ShaderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

macro_rules! shader_targets {
    ($($variant:ident => $profile:literal, $stage:ident;)*) => {
        /// A target profile known to the legacy compiler
        ///
        /// The compiler accepts any profile string; this enum only names the
        /// ones it documents. Anything taking a target also takes a `&str`.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum ShaderTarget {
            $(
                #[doc = concat!("`", $profile, "`")]
                $variant,
            )*
        }

        impl ShaderTarget {
            /// Every named profile
            pub const ALL: &'static [ShaderTarget] = &[$(ShaderTarget::$variant),*];

            /// Returns the profile string (e.g., "vs_5_0")
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(ShaderTarget::$variant => $profile,)*
                }
            }

            pub fn shader_type(&self) -> ShaderType {
                match self {
                    $(ShaderTarget::$variant => ShaderType::$stage,)*
                }
            }
        }
    };
}

shader_targets! {
    Vs2_0 => "vs_2_0", Vertex;
    Vs2A => "vs_2_a", Vertex;
    Vs2Sw => "vs_2_sw", Vertex;
    Vs3_0 => "vs_3_0", Vertex;
    Vs3Sw => "vs_3_sw", Vertex;
    Vs4_0 => "vs_4_0", Vertex;
    Vs4_0Level9_1 => "vs_4_0_level_9_1", Vertex;
    Vs4_0Level9_3 => "vs_4_0_level_9_3", Vertex;
    Vs4_1 => "vs_4_1", Vertex;
    Vs5_0 => "vs_5_0", Vertex;
    Ps2_0 => "ps_2_0", Pixel;
    Ps2A => "ps_2_a", Pixel;
    Ps2B => "ps_2_b", Pixel;
    Ps2Sw => "ps_2_sw", Pixel;
    Ps3_0 => "ps_3_0", Pixel;
    Ps3Sw => "ps_3_sw", Pixel;
    Ps4_0 => "ps_4_0", Pixel;
    Ps4_0Level9_1 => "ps_4_0_level_9_1", Pixel;
    Ps4_0Level9_3 => "ps_4_0_level_9_3", Pixel;
    Ps4_1 => "ps_4_1", Pixel;
    Ps5_0 => "ps_5_0", Pixel;
    Gs4_0 => "gs_4_0", Geometry;
    Gs4_1 => "gs_4_1", Geometry;
    Gs5_0 => "gs_5_0", Geometry;
    Hs5_0 => "hs_5_0", Hull;
    Ds5_0 => "ds_5_0", Domain;
    Cs4_0 => "cs_4_0", Compute;
    Cs4_1 => "cs_4_1", Compute;
    Cs5_0 => "cs_5_0", Compute;
}

impl fmt::Display for ShaderTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ShaderTarget> for String {
    fn from(target: ShaderTarget) -> Self {
        target.as_str().to_string()
    }
}

/// Returned when a string names no known profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTarget(pub String);

impl fmt::Display for UnknownTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown target profile `{}`", self.0)
    }
}

impl std::error::Error for UnknownTarget {}

impl FromStr for ShaderTarget {
    type Err = UnknownTarget;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let profile = s.to_ascii_lowercase();
        ShaderTarget::ALL
            .iter()
            .copied()
            .find(|target| target.as_str() == profile)
            .ok_or_else(|| UnknownTarget(s.to_string()))
    }
}
