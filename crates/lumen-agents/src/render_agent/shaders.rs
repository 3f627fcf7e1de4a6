// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Generates program sources for a program key.
//!
//! Sources depend on the key alone, so equal keys always compile to the same
//! program. Code-affecting options become `#define` lines in front of a shared
//! template; per-frame light data is laid out as flat uniform arrays sized by
//! the light counts of the environment.

use std::fmt::Write;

use lumen_core::material::{Material, MaterialFeatures, MaterialKind, MaterialKindTag, ProgramKey};
use lumen_core::renderer::{Environment, FogKind, OutputColorSpace, ProgramDescriptor, ToneMapping};

/// Names of the uniforms the renderer writes.
pub mod uniforms {
    /// Object-to-world transform.
    pub const MODEL_MATRIX: &str = "modelMatrix";
    /// World-to-view transform.
    pub const VIEW_MATRIX: &str = "viewMatrix";
    /// View projection.
    pub const PROJECTION_MATRIX: &str = "projectionMatrix";
    /// Inverse transpose of the upper 3x3 of the model matrix.
    pub const NORMAL_MATRIX: &str = "normalMatrix";
    /// Camera position in world space.
    pub const CAMERA_POSITION: &str = "cameraPosition";

    /// Base color.
    pub const DIFFUSE: &str = "diffuse";
    /// Base opacity.
    pub const OPACITY: &str = "opacity";
    /// Color map sampler.
    pub const MAP: &str = "map";
    /// Alpha test threshold.
    pub const ALPHA_TEST: &str = "alphaTest";
    /// Phong specular color.
    pub const SPECULAR: &str = "specular";
    /// Phong shininess.
    pub const SHININESS: &str = "shininess";
    /// PBR metalness.
    pub const METALNESS: &str = "metalness";
    /// PBR roughness.
    pub const ROUGHNESS: &str = "roughness";
    /// Transmission factor.
    pub const TRANSMISSION: &str = "transmission";
    /// Transmission volume thickness.
    pub const THICKNESS: &str = "thickness";
    /// Index of refraction.
    pub const IOR: &str = "ior";
    /// The captured opaque scene.
    pub const TRANSMISSION_SAMPLER_MAP: &str = "transmissionSamplerMap";
    /// Size of the captured opaque scene in pixels.
    pub const TRANSMISSION_SAMPLER_SIZE: &str = "transmissionSamplerSize";

    /// Fog color.
    pub const FOG_COLOR: &str = "fogColor";
    /// Linear fog start.
    pub const FOG_NEAR: &str = "fogNear";
    /// Linear fog end.
    pub const FOG_FAR: &str = "fogFar";
    /// Exponential fog density.
    pub const FOG_DENSITY: &str = "fogDensity";
    /// Exposure used by tone mapping.
    pub const TONE_MAPPING_EXPOSURE: &str = "toneMappingExposure";
    /// User clipping planes array.
    pub const CLIPPING_PLANES: &str = "clippingPlanes";

    /// Sum of the ambient lights.
    pub const AMBIENT_LIGHT_COLOR: &str = "ambientLightColor";
    /// Hemisphere light arrays.
    pub const HEMISPHERE_LIGHT_SKY_COLOR: &str = "hemisphereLightSkyColor";
    #[allow(missing_docs)]
    pub const HEMISPHERE_LIGHT_GROUND_COLOR: &str = "hemisphereLightGroundColor";
    #[allow(missing_docs)]
    pub const HEMISPHERE_LIGHT_DIRECTION: &str = "hemisphereLightDirection";
    /// Directional light arrays.
    pub const DIRECTIONAL_LIGHT_DIRECTION: &str = "directionalLightDirection";
    #[allow(missing_docs)]
    pub const DIRECTIONAL_LIGHT_COLOR: &str = "directionalLightColor";
    /// Point light arrays.
    pub const POINT_LIGHT_POSITION: &str = "pointLightPosition";
    #[allow(missing_docs)]
    pub const POINT_LIGHT_COLOR: &str = "pointLightColor";
    #[allow(missing_docs)]
    pub const POINT_LIGHT_DISTANCE: &str = "pointLightDistance";
    #[allow(missing_docs)]
    pub const POINT_LIGHT_DECAY: &str = "pointLightDecay";
    /// Spot light arrays.
    pub const SPOT_LIGHT_POSITION: &str = "spotLightPosition";
    #[allow(missing_docs)]
    pub const SPOT_LIGHT_DIRECTION: &str = "spotLightDirection";
    #[allow(missing_docs)]
    pub const SPOT_LIGHT_COLOR: &str = "spotLightColor";
    #[allow(missing_docs)]
    pub const SPOT_LIGHT_DISTANCE: &str = "spotLightDistance";
    #[allow(missing_docs)]
    pub const SPOT_LIGHT_DECAY: &str = "spotLightDecay";
    #[allow(missing_docs)]
    pub const SPOT_LIGHT_CONE_COS: &str = "spotLightConeCos";
    #[allow(missing_docs)]
    pub const SPOT_LIGHT_PENUMBRA_COS: &str = "spotLightPenumbraCos";

    /// Whether the drawable is darkened by shadow maps.
    pub const RECEIVE_SHADOW: &str = "receiveShadow";
    /// Shadow arrays, indexed like the shadow-casting lights of each kind.
    /// Point lights use six consecutive entries, one per cube face.
    pub const DIRECTIONAL_SHADOW_MAP: &str = "directionalShadowMap";
    #[allow(missing_docs)]
    pub const DIRECTIONAL_SHADOW_MATRIX: &str = "directionalShadowMatrix";
    #[allow(missing_docs)]
    pub const DIRECTIONAL_SHADOW_BIAS: &str = "directionalShadowBias";
    #[allow(missing_docs)]
    pub const SPOT_SHADOW_MAP: &str = "spotShadowMap";
    #[allow(missing_docs)]
    pub const SPOT_SHADOW_MATRIX: &str = "spotShadowMatrix";
    #[allow(missing_docs)]
    pub const SPOT_SHADOW_BIAS: &str = "spotShadowBias";
    #[allow(missing_docs)]
    pub const POINT_SHADOW_MAP: &str = "pointShadowMap";
    #[allow(missing_docs)]
    pub const POINT_SHADOW_MATRIX: &str = "pointShadowMatrix";
    #[allow(missing_docs)]
    pub const POINT_SHADOW_BIAS: &str = "pointShadowBias";
}

const GLSL_VERSION: &str = "#version 300 es\n";

const VERTEX_TEMPLATE: &str = "
uniform mat4 modelMatrix;
uniform mat4 viewMatrix;
uniform mat4 projectionMatrix;
uniform mat3 normalMatrix;

in vec3 position;
#ifdef USE_NORMAL
in vec3 normal;
out vec3 vNormal;
#endif
#ifdef USE_MAP
in vec2 uv;
out vec2 vUv;
#endif
#ifdef USE_COLOR
in vec4 color;
out vec4 vColor;
#endif
out vec3 vWorldPosition;
out float vViewDepth;

void main() {
    vec4 worldPosition = modelMatrix * vec4(position, 1.0);
    vWorldPosition = worldPosition.xyz;
#ifdef USE_NORMAL
    vNormal = normalize(normalMatrix * normal);
#endif
#ifdef USE_MAP
    vUv = uv;
#endif
#ifdef USE_COLOR
    vColor = color;
#endif
    vec4 viewPosition = viewMatrix * worldPosition;
    vViewDepth = -viewPosition.z;
    gl_Position = projectionMatrix * viewPosition;
}
";

const FRAGMENT_COMMON: &str = "
precision highp float;

uniform vec3 diffuse;
uniform float opacity;
uniform vec3 cameraPosition;

in vec3 vWorldPosition;
in float vViewDepth;
out vec4 fragColor;

#ifdef USE_MAP
uniform sampler2D map;
in vec2 vUv;
#endif
#ifdef USE_COLOR
in vec4 vColor;
#endif
#ifdef USE_ALPHA_TEST
uniform float alphaTest;
#endif
#if NUM_CLIPPING_PLANES > 0
uniform vec4 clippingPlanes[NUM_CLIPPING_PLANES];
#endif
#ifdef USE_FOG
uniform vec3 fogColor;
#ifdef FOG_EXP2
uniform float fogDensity;
#else
uniform float fogNear;
uniform float fogFar;
#endif
#endif
#ifdef USE_TONE_MAPPING
uniform float toneMappingExposure;
#endif

vec3 linearToOutput(vec3 color) {
#ifdef TONE_MAPPING_REINHARD
    color = color / (vec3(1.0) + color);
#endif
#ifdef TONE_MAPPING_ACES_FILMIC
    color = clamp((color * (2.51 * color + 0.03)) / (color * (2.43 * color + 0.59) + 0.14), 0.0, 1.0);
#endif
#ifdef OUTPUT_SRGB
    color = mix(color * 12.92, 1.055 * pow(color, vec3(1.0 / 2.4)) - 0.055, step(vec3(0.0031308), color));
#endif
    return color;
}
";

const FRAGMENT_LIGHTS: &str = "
#ifdef USE_NORMAL
in vec3 vNormal;
#endif
uniform vec3 ambientLightColor;
uniform bool receiveShadow;
#if NUM_HEMI_LIGHTS > 0
uniform vec3 hemisphereLightSkyColor[NUM_HEMI_LIGHTS];
uniform vec3 hemisphereLightGroundColor[NUM_HEMI_LIGHTS];
uniform vec3 hemisphereLightDirection[NUM_HEMI_LIGHTS];
#endif
#if NUM_DIR_LIGHTS > 0
uniform vec3 directionalLightDirection[NUM_DIR_LIGHTS];
uniform vec3 directionalLightColor[NUM_DIR_LIGHTS];
#endif
#if NUM_POINT_LIGHTS > 0
uniform vec3 pointLightPosition[NUM_POINT_LIGHTS];
uniform vec3 pointLightColor[NUM_POINT_LIGHTS];
uniform float pointLightDistance[NUM_POINT_LIGHTS];
uniform float pointLightDecay[NUM_POINT_LIGHTS];
#endif
#if NUM_SPOT_LIGHTS > 0
uniform vec3 spotLightPosition[NUM_SPOT_LIGHTS];
uniform vec3 spotLightDirection[NUM_SPOT_LIGHTS];
uniform vec3 spotLightColor[NUM_SPOT_LIGHTS];
uniform float spotLightDistance[NUM_SPOT_LIGHTS];
uniform float spotLightDecay[NUM_SPOT_LIGHTS];
uniform float spotLightConeCos[NUM_SPOT_LIGHTS];
uniform float spotLightPenumbraCos[NUM_SPOT_LIGHTS];
#endif
#if NUM_DIR_LIGHT_SHADOWS > 0
uniform sampler2D directionalShadowMap[NUM_DIR_LIGHT_SHADOWS];
uniform mat4 directionalShadowMatrix[NUM_DIR_LIGHT_SHADOWS];
uniform float directionalShadowBias[NUM_DIR_LIGHT_SHADOWS];
#endif
#if NUM_SPOT_LIGHT_SHADOWS > 0
uniform sampler2D spotShadowMap[NUM_SPOT_LIGHT_SHADOWS];
uniform mat4 spotShadowMatrix[NUM_SPOT_LIGHT_SHADOWS];
uniform float spotShadowBias[NUM_SPOT_LIGHT_SHADOWS];
#endif
#if NUM_POINT_LIGHT_SHADOWS > 0
uniform sampler2D pointShadowMap[NUM_POINT_LIGHT_SHADOW_FACES];
uniform mat4 pointShadowMatrix[NUM_POINT_LIGHT_SHADOW_FACES];
uniform float pointShadowBias[NUM_POINT_LIGHT_SHADOWS];
#endif

float shadowFactor(sampler2D shadowMap, mat4 shadowMatrix, float bias) {
    vec4 coord = shadowMatrix * vec4(vWorldPosition, 1.0);
    coord.xyz = coord.xyz / coord.w * 0.5 + 0.5;
    float closest = texture(shadowMap, coord.xy).r;
    return coord.z - bias > closest ? 0.0 : 1.0;
}

float distanceAttenuation(float lightDistance, float cutoff, float decay) {
    float attenuation = 1.0 / max(pow(lightDistance, decay), 0.01);
    if (cutoff > 0.0) {
        attenuation *= pow(clamp(1.0 - pow(lightDistance / cutoff, 4.0), 0.0, 1.0), 2.0);
    }
    return attenuation;
}

struct Irradiance {
    vec3 diffuse;
    vec3 specular;
};

void accumulate(inout Irradiance total, vec3 normal, vec3 viewDir, vec3 lightDir, vec3 radiance) {
    float nDotL = max(dot(normal, lightDir), 0.0);
    total.diffuse += radiance * nDotL;
    total.specular += radiance * nDotL * brdfSpecular(normal, viewDir, lightDir);
}

Irradiance gatherLights(vec3 normal, vec3 viewDir) {
    Irradiance total = Irradiance(ambientLightColor, vec3(0.0));
#if NUM_HEMI_LIGHTS > 0
    for (int i = 0; i < NUM_HEMI_LIGHTS; i++) {
        float weight = 0.5 * dot(normal, hemisphereLightDirection[i]) + 0.5;
        total.diffuse += mix(hemisphereLightGroundColor[i], hemisphereLightSkyColor[i], weight);
    }
#endif
#if NUM_DIR_LIGHTS > 0
    for (int i = 0; i < NUM_DIR_LIGHTS; i++) {
        vec3 radiance = directionalLightColor[i];
#if NUM_DIR_LIGHT_SHADOWS > 0
        if (receiveShadow && i < NUM_DIR_LIGHT_SHADOWS) {
            radiance *= shadowFactor(directionalShadowMap[i], directionalShadowMatrix[i], directionalShadowBias[i]);
        }
#endif
        accumulate(total, normal, viewDir, -directionalLightDirection[i], radiance);
    }
#endif
#if NUM_POINT_LIGHTS > 0
    for (int i = 0; i < NUM_POINT_LIGHTS; i++) {
        vec3 toLight = pointLightPosition[i] - vWorldPosition;
        float attenuation = distanceAttenuation(length(toLight), pointLightDistance[i], pointLightDecay[i]);
        vec3 radiance = pointLightColor[i] * attenuation;
#if NUM_POINT_LIGHT_SHADOWS > 0
        if (receiveShadow && i < NUM_POINT_LIGHT_SHADOWS) {
            float lit = 0.0;
            for (int face = 0; face < 6; face++) {
                lit = max(lit, shadowFactor(pointShadowMap[i * 6 + face], pointShadowMatrix[i * 6 + face], pointShadowBias[i]));
            }
            radiance *= lit;
        }
#endif
        accumulate(total, normal, viewDir, normalize(toLight), radiance);
    }
#endif
#if NUM_SPOT_LIGHTS > 0
    for (int i = 0; i < NUM_SPOT_LIGHTS; i++) {
        vec3 toLight = spotLightPosition[i] - vWorldPosition;
        vec3 lightDir = normalize(toLight);
        float angleCos = dot(lightDir, -spotLightDirection[i]);
        float cone = smoothstep(spotLightConeCos[i], spotLightPenumbraCos[i], angleCos);
        float attenuation = distanceAttenuation(length(toLight), spotLightDistance[i], spotLightDecay[i]);
        vec3 radiance = spotLightColor[i] * attenuation * cone;
#if NUM_SPOT_LIGHT_SHADOWS > 0
        if (receiveShadow && i < NUM_SPOT_LIGHT_SHADOWS) {
            radiance *= shadowFactor(spotShadowMap[i], spotShadowMatrix[i], spotShadowBias[i]);
        }
#endif
        accumulate(total, normal, viewDir, lightDir, radiance);
    }
#endif
    return total;
}
";

const FRAGMENT_MAIN: &str = "
void main() {
#if NUM_CLIPPING_PLANES > 0
    for (int i = 0; i < NUM_CLIPPING_PLANES; i++) {
        if (dot(vec4(vWorldPosition, 1.0), clippingPlanes[i]) < 0.0) {
            discard;
        }
    }
#endif
    vec4 diffuseColor = vec4(diffuse, opacity);
#ifdef USE_MAP
    diffuseColor *= texture(map, vUv);
#endif
#ifdef USE_COLOR
    diffuseColor *= vColor;
#endif
#ifdef USE_ALPHA_TEST
    if (diffuseColor.a < alphaTest) {
        discard;
    }
#endif
    vec3 outgoing = shade(diffuseColor);
#ifdef USE_TONE_MAPPING
    outgoing *= toneMappingExposure;
#endif
#ifdef USE_FOG
#ifdef FOG_EXP2
    float fogFactor = 1.0 - exp(-fogDensity * fogDensity * vViewDepth * vViewDepth);
#else
    float fogFactor = smoothstep(fogNear, fogFar, vViewDepth);
#endif
    outgoing = mix(outgoing, fogColor, fogFactor);
#endif
    fragColor = vec4(linearToOutput(outgoing), diffuseColor.a);
}
";

/// The shading function of each built-in kind, and the uniforms it reads.
fn kind_chunk(kind: MaterialKindTag) -> &'static str {
    match kind {
        MaterialKindTag::Basic => {
            "
vec3 shade(vec4 diffuseColor) {
    return diffuseColor.rgb;
}
"
        }
        MaterialKindTag::Lambert => {
            "
float brdfSpecular(vec3 normal, vec3 viewDir, vec3 lightDir) {
    return 0.0;
}
"
        }
        MaterialKindTag::Phong => {
            "
uniform vec3 specular;
uniform float shininess;

float brdfSpecular(vec3 normal, vec3 viewDir, vec3 lightDir) {
    vec3 halfDir = normalize(lightDir + viewDir);
    return pow(max(dot(normal, halfDir), 0.0), shininess);
}
"
        }
        MaterialKindTag::Standard => {
            "
uniform float metalness;
uniform float roughness;
#ifdef USE_TRANSMISSION
uniform float transmission;
uniform float thickness;
uniform float ior;
uniform sampler2D transmissionSamplerMap;
uniform vec2 transmissionSamplerSize;
#endif

float brdfSpecular(vec3 normal, vec3 viewDir, vec3 lightDir) {
    vec3 halfDir = normalize(lightDir + viewDir);
    float alpha = max(roughness * roughness, 0.0001);
    float nDotH = max(dot(normal, halfDir), 0.0);
    float denom = nDotH * nDotH * (alpha * alpha - 1.0) + 1.0;
    return alpha * alpha / (3.14159265 * denom * denom);
}
"
        }
        MaterialKindTag::Depth => {
            "
vec3 shade(vec4 diffuseColor) {
    return vec3(1.0 - gl_FragCoord.z);
}
"
        }
        MaterialKindTag::Custom => "",
    }
}

/// The lit `shade` function shared by Lambert, Phong and Standard.
const LIT_SHADE: &str = "
vec3 shade(vec4 diffuseColor) {
#ifdef USE_NORMAL
    vec3 normal = normalize(vNormal);
#else
    vec3 normal = vec3(0.0, 0.0, 1.0);
#endif
#ifdef FLAT_SHADED
    normal = normalize(cross(dFdx(vWorldPosition), dFdy(vWorldPosition)));
#endif
#ifdef DOUBLE_SIDED
    normal *= gl_FrontFacing ? 1.0 : -1.0;
#endif
#ifdef FLIP_SIDED
    normal = -normal;
#endif
    vec3 viewDir = normalize(cameraPosition - vWorldPosition);
    Irradiance light = gatherLights(normal, viewDir);
    vec3 color = diffuseColor.rgb * light.diffuse;
#ifdef MATERIAL_PHONG
    color += specular * light.specular;
#endif
#ifdef MATERIAL_STANDARD
    color = mix(color, diffuseColor.rgb * light.specular, metalness);
#endif
#ifdef USE_TRANSMISSION
    vec2 screenUv = gl_FragCoord.xy / transmissionSamplerSize;
    vec2 offset = (1.0 - 1.0 / ior) * thickness * normal.xy * 0.05;
    vec3 behind = texture(transmissionSamplerMap, screenUv + offset).rgb;
    color = mix(color, behind * diffuseColor.rgb, transmission);
#endif
    return color;
}
";

/// A readable label for the program of `key`.
pub fn program_label(key: &ProgramKey) -> String {
    format!(
        "{:?}#{:x}/{:x}",
        key.feature.kind,
        key.feature.features.bits(),
        key.environment.0
    )
}

/// Builds the sources of the program `material` needs under `key`.
///
/// `key` must be the material's own program key for some environment.
pub fn program_descriptor(material: &Material, key: &ProgramKey) -> ProgramDescriptor {
    let prefix = prefix(key);
    let label = program_label(key);

    if let MaterialKind::Custom(shader) = &material.kind {
        return ProgramDescriptor {
            label,
            vertex_source: format!("{prefix}{}", shader.vertex_source()),
            fragment_source: format!("{prefix}{}", shader.fragment_source()),
        };
    }

    let kind = key.feature.kind;
    let mut fragment = String::with_capacity(8 * 1024);
    fragment.push_str(&prefix);
    fragment.push_str(FRAGMENT_COMMON);
    fragment.push_str(kind_chunk(kind));
    if is_lit(kind) {
        fragment.push_str(FRAGMENT_LIGHTS);
        fragment.push_str(LIT_SHADE);
    }
    fragment.push_str(FRAGMENT_MAIN);

    ProgramDescriptor {
        label,
        vertex_source: format!("{prefix}{VERTEX_TEMPLATE}"),
        fragment_source: fragment,
    }
}

fn is_lit(kind: MaterialKindTag) -> bool {
    matches!(
        kind,
        MaterialKindTag::Lambert | MaterialKindTag::Phong | MaterialKindTag::Standard
    )
}

/// The version line and every `#define` derived from the key.
fn prefix(key: &ProgramKey) -> String {
    let mut out = String::from(GLSL_VERSION);
    let mut define = |name: &str, value: Option<u32>| {
        // Writing into a String cannot fail.
        let _ = match value {
            Some(value) => writeln!(out, "#define {name} {value}"),
            None => writeln!(out, "#define {name}"),
        };
    };

    let kind = key.feature.kind;
    define(
        match kind {
            MaterialKindTag::Basic => "MATERIAL_BASIC",
            MaterialKindTag::Lambert => "MATERIAL_LAMBERT",
            MaterialKindTag::Phong => "MATERIAL_PHONG",
            MaterialKindTag::Standard => "MATERIAL_STANDARD",
            MaterialKindTag::Depth => "MATERIAL_DEPTH",
            MaterialKindTag::Custom => "MATERIAL_CUSTOM",
        },
        None,
    );
    if is_lit(kind) {
        define("USE_NORMAL", None);
    }

    let features = key.feature.features;
    for (flag, name) in [
        (MaterialFeatures::MAP, "USE_MAP"),
        (MaterialFeatures::VERTEX_COLORS, "USE_COLOR"),
        (MaterialFeatures::ALPHA_TEST, "USE_ALPHA_TEST"),
        (MaterialFeatures::FLAT_SHADING, "FLAT_SHADED"),
        (MaterialFeatures::DOUBLE_SIDED, "DOUBLE_SIDED"),
        (MaterialFeatures::BACK_SIDE, "FLIP_SIDED"),
        (MaterialFeatures::TRANSMISSION, "USE_TRANSMISSION"),
    ] {
        if features.contains(flag) {
            define(name, None);
        }
    }

    let Environment {
        lights,
        fog,
        color_space,
        tone_mapping,
        clipping_planes,
    } = key.environment.unpack();

    define("NUM_HEMI_LIGHTS", Some(lights.hemisphere));
    define("NUM_DIR_LIGHTS", Some(lights.directional));
    define("NUM_POINT_LIGHTS", Some(lights.point));
    define("NUM_SPOT_LIGHTS", Some(lights.spot));
    define("NUM_DIR_LIGHT_SHADOWS", Some(lights.directional_shadows));
    define("NUM_POINT_LIGHT_SHADOWS", Some(lights.point_shadows));
    define("NUM_POINT_LIGHT_SHADOW_FACES", Some(lights.point_shadows * 6));
    define("NUM_SPOT_LIGHT_SHADOWS", Some(lights.spot_shadows));
    define("NUM_CLIPPING_PLANES", Some(clipping_planes));

    match fog {
        FogKind::None => {}
        FogKind::Linear => define("USE_FOG", None),
        FogKind::Exponential => {
            define("USE_FOG", None);
            define("FOG_EXP2", None);
        }
    }
    if color_space == OutputColorSpace::Srgb {
        define("OUTPUT_SRGB", None);
    }
    match tone_mapping {
        ToneMapping::None => {}
        ToneMapping::Linear => define("USE_TONE_MAPPING", None),
        ToneMapping::Reinhard => {
            define("USE_TONE_MAPPING", None);
            define("TONE_MAPPING_REINHARD", None);
        }
        ToneMapping::AcesFilmic => {
            define("USE_TONE_MAPPING", None);
            define("TONE_MAPPING_ACES_FILMIC", None);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::uniforms::*;
    use super::*;
    use lumen_core::math::LinearRgba;
    use lumen_core::renderer::{GraphicsDevice, LightCounts};
    use lumen_infra::HeadlessDevice;

    fn compile(material: &Material, env: Environment) -> Vec<String> {
        let mut device = HeadlessDevice::new();
        let key = material.program_key(env.signature());
        let program = device
            .create_program(&program_descriptor(material, &key))
            .expect("generated sources compile");
        device
            .program_reflection(program)
            .unwrap()
            .uniforms
            .into_iter()
            .map(|uniform| uniform.name)
            .collect()
    }

    #[test]
    fn test_equal_keys_produce_equal_sources() {
        let a = Material::standard(LinearRgba::WHITE, 0.5, 0.5);
        let b = Material::standard(LinearRgba::rgb(1.0, 0.0, 0.0), 0.1, 0.9);
        let env = Environment::default().signature();
        assert_eq!(a.program_key(env), b.program_key(env));
        assert_eq!(
            program_descriptor(&a, &a.program_key(env)),
            program_descriptor(&b, &b.program_key(env))
        );
    }

    #[test]
    fn test_basic_program_interface() {
        let names = compile(&Material::basic(LinearRgba::WHITE), Environment::default());
        for expected in [MODEL_MATRIX, VIEW_MATRIX, PROJECTION_MATRIX, DIFFUSE, OPACITY] {
            assert!(names.iter().any(|n| n == expected), "missing {expected}");
        }
        assert!(!names.iter().any(|n| n == AMBIENT_LIGHT_COLOR));
        assert!(!names.iter().any(|n| n == MAP));
    }

    #[test]
    fn test_light_arrays_follow_counts() {
        let env = Environment {
            lights: LightCounts {
                directional: 2,
                point: 1,
                point_shadows: 1,
                ..Default::default()
            },
            ..Default::default()
        };
        let names = compile(&Material::phong(LinearRgba::WHITE, 30.0), env);

        assert!(names.iter().any(|n| n == "directionalLightColor[1]"));
        assert!(!names.iter().any(|n| n == "directionalLightColor[2]"));
        assert!(names.iter().any(|n| n == "pointLightDistance[0]"));
        assert!(names.iter().any(|n| n == "pointShadowMap[5]"));
        assert!(!names.iter().any(|n| n.starts_with(SPOT_LIGHT_COLOR)));
        assert!(names.iter().any(|n| n == SHININESS));
    }

    #[test]
    fn test_feature_defines() {
        let mut material = Material::standard(LinearRgba::WHITE, 0.0, 1.0);
        material.map = Some(Default::default());
        material.alpha_test = 0.5;
        if let MaterialKind::Standard { transmission, .. } = &mut material.kind {
            *transmission = 1.0;
        }
        let env = Environment {
            fog: FogKind::Exponential,
            tone_mapping: ToneMapping::AcesFilmic,
            ..Default::default()
        };
        let names = compile(&material, env);

        for expected in [
            MAP,
            ALPHA_TEST,
            TRANSMISSION_SAMPLER_MAP,
            FOG_DENSITY,
            TONE_MAPPING_EXPOSURE,
            METALNESS,
        ] {
            assert!(names.iter().any(|n| n == expected), "missing {expected}");
        }
        assert!(!names.iter().any(|n| n == FOG_NEAR));
    }

    #[test]
    fn test_custom_sources_get_the_prefix() {
        let shader = lumen_core::material::CustomShader::new(
            "in vec3 position; uniform mat4 modelMatrix; void main() {}",
            "uniform float time; void main() {}",
        );
        let material = Material::custom(shader);
        let key = material.program_key(Environment::default().signature());
        let descriptor = program_descriptor(&material, &key);

        assert!(descriptor.vertex_source.starts_with(GLSL_VERSION));
        assert!(descriptor.fragment_source.contains("#define MATERIAL_CUSTOM"));
        assert!(descriptor.fragment_source.ends_with("uniform float time; void main() {}"));
    }
}
