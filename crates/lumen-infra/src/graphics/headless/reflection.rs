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

//! Source validation and uniform/attribute reflection for headless programs.
//!
//! The headless device does not compile shaders. It checks that each stage
//! is structurally sound and extracts the declarations a real driver would
//! report as active, honoring `#define`, `#ifdef`, `#ifndef`, `#else` and
//! `#endif`. Other `#if` conditions are treated as true.

use std::collections::HashMap;

use lumen_core::renderer::{AttributeInfo, ProgramReflection, UniformInfo, UniformLocation, UniformType};

/// Qualifiers skipped when reading a declaration.
const QUALIFIERS: [&str; 5] = ["highp", "mediump", "lowp", "flat", "smooth"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
    Vertex,
    Fragment,
}

impl Stage {
    fn name(self) -> &'static str {
        match self {
            Stage::Vertex => "vertex",
            Stage::Fragment => "fragment",
        }
    }
}

/// Checks that a stage has an entry point and balanced delimiters.
///
/// ## Returns
/// The compile log on failure.
pub(crate) fn validate(stage: Stage, source: &str) -> Result<(), String> {
    if source.trim().is_empty() {
        return Err(format!("{} stage: empty source", stage.name()));
    }
    if !source.contains("void main") {
        return Err(format!("{} stage: missing entry point 'void main'", stage.name()));
    }

    let (mut braces, mut parens) = (0i32, 0i32);
    for (line_index, line) in source.lines().enumerate() {
        for c in strip_comment(line).chars() {
            match c {
                '{' => braces += 1,
                '}' => braces -= 1,
                '(' => parens += 1,
                ')' => parens -= 1,
                _ => {}
            }
            if braces < 0 || parens < 0 {
                return Err(format!(
                    "{} stage:{}: unexpected '{}'",
                    stage.name(),
                    line_index + 1,
                    c
                ));
            }
        }
    }
    if braces != 0 || parens != 0 {
        return Err(format!("{} stage: unexpected end of source", stage.name()));
    }
    Ok(())
}

/// Extracts the active uniforms of both stages and the vertex attributes.
///
/// Uniform locations are assigned in declaration order, vertex stage first.
/// A uniform declared in both stages is reported once. Arrays of size `N`
/// are reported as `N` uniforms `name[0]` to `name[N-1]`; sizes can be
/// literals or defined names.
pub(crate) fn reflect(vertex_source: &str, fragment_source: &str) -> ProgramReflection {
    let mut reflection = ProgramReflection::default();
    let mut next_location = 0u32;

    for (stage, source) in [(Stage::Vertex, vertex_source), (Stage::Fragment, fragment_source)] {
        let (lines, defines) = preprocess(source);
        let code = lines.join(" ");
        for statement in code.split(|c| c == ';' || c == '{' || c == '}') {
            let tokens: Vec<&str> = statement
                .split_whitespace()
                .filter(|token| !QUALIFIERS.contains(token))
                .collect();
            match tokens.as_slice() {
                ["uniform", ty, name] => {
                    let Some(ty) = parse_type(ty) else {
                        continue;
                    };
                    for element in expand_array(name, &defines) {
                        if reflection.uniforms.iter().any(|u| u.name == element) {
                            continue;
                        }
                        reflection.uniforms.push(UniformInfo {
                            name: element,
                            ty,
                            location: UniformLocation(next_location),
                        });
                        next_location += 1;
                    }
                }
                ["in" | "attribute", _, name] if stage == Stage::Vertex => {
                    let location = reflection.attributes.len() as u32;
                    reflection.attributes.push(AttributeInfo {
                        name: (*name).to_owned(),
                        location,
                    });
                }
                _ => {}
            }
        }
    }
    reflection
}

/// Returns the active lines of a source and its definitions.
fn preprocess(source: &str) -> (Vec<&str>, HashMap<&str, &str>) {
    let mut defines = HashMap::new();
    let mut lines = Vec::new();
    // Whether each open conditional block is active.
    let mut blocks: Vec<bool> = Vec::new();

    for raw in source.lines() {
        let line = strip_comment(raw).trim();
        let enabled = blocks.last().copied().unwrap_or(true);

        let Some(directive) = line.strip_prefix('#') else {
            if enabled && !line.is_empty() {
                lines.push(line);
            }
            continue;
        };
        let mut parts = directive.trim().splitn(2, char::is_whitespace);
        let keyword = parts.next().unwrap_or_default();
        let argument = parts.next().unwrap_or_default().trim();
        match keyword {
            "define" if enabled => {
                let mut definition = argument.splitn(2, char::is_whitespace);
                if let Some(name) = definition.next() {
                    defines.insert(name, definition.next().unwrap_or_default().trim());
                }
            }
            "ifdef" => blocks.push(enabled && defines.contains_key(argument)),
            "ifndef" => blocks.push(enabled && !defines.contains_key(argument)),
            "if" => blocks.push(enabled),
            "else" => {
                if let Some(taken) = blocks.pop() {
                    let outer = blocks.last().copied().unwrap_or(true);
                    blocks.push(outer && !taken);
                }
            }
            "endif" => {
                blocks.pop();
            }
            _ => {}
        }
    }
    (lines, defines)
}

fn strip_comment(line: &str) -> &str {
    line.split_once("//").map_or(line, |(code, _)| code)
}

fn parse_type(name: &str) -> Option<UniformType> {
    Some(match name {
        "float" => UniformType::Float,
        "int" | "bool" => UniformType::Int,
        "vec2" => UniformType::Vec2,
        "vec3" => UniformType::Vec3,
        "vec4" => UniformType::Vec4,
        "mat3" => UniformType::Mat3,
        "mat4" => UniformType::Mat4,
        "sampler2D" => UniformType::Sampler2D,
        _ => return None,
    })
}

fn expand_array(name: &str, defines: &HashMap<&str, &str>) -> Vec<String> {
    let Some((base, rest)) = name.split_once('[') else {
        return vec![name.to_owned()];
    };
    let size_text = rest.trim_end_matches(']').trim();
    let size = size_text
        .parse::<u32>()
        .ok()
        .or_else(|| defines.get(size_text).and_then(|value| value.parse().ok()))
        .unwrap_or(0);
    (0..size).map(|i| format!("{base}[{i}]")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERTEX: &str = "
        #define NUM_LIGHTS 2
        in vec3 position;
        in vec3 normal;
        uniform mat4 modelMatrix; // per draw
        uniform highp vec3 lightDirection[NUM_LIGHTS];
        #ifdef USE_MAP
        in vec2 uv;
        uniform sampler2D map;
        #else
        uniform vec4 color;
        #endif
        void main() { gl_Position = modelMatrix * vec4(position, 1.0); }
    ";

    #[test]
    fn test_reflection_honors_defines_and_arrays() {
        let fragment = "uniform vec4 color; uniform float opacity; void main() {}";
        let reflection = reflect(VERTEX, fragment);

        let names: Vec<_> = reflection.uniforms.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["modelMatrix", "lightDirection[0]", "lightDirection[1]", "color", "opacity"]
        );
        let locations: Vec<_> = reflection.uniforms.iter().map(|u| u.location.0).collect();
        assert_eq!(locations, vec![0, 1, 2, 3, 4]);
        let attributes: Vec<_> = reflection.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(attributes, vec!["position", "normal"]);
    }

    #[test]
    fn test_active_ifdef_branch() {
        let source = format!("#define USE_MAP\n{VERTEX}");
        let reflection = reflect(&source, "void main() {}");
        assert!(reflection.uniforms.iter().any(|u| u.name == "map" && u.ty == UniformType::Sampler2D));
        assert!(reflection.uniforms.iter().all(|u| u.name != "color"));
        assert_eq!(reflection.attributes.len(), 3);
    }

    #[test]
    fn test_validation_errors() {
        assert!(validate(Stage::Vertex, VERTEX).is_ok());
        assert!(validate(Stage::Fragment, "").is_err());
        assert!(validate(Stage::Fragment, "void mian() {}").is_err());
        let log = validate(Stage::Fragment, "void main() { }}").unwrap_err();
        assert!(log.contains("fragment stage:1"), "{log}");
        assert!(validate(Stage::Vertex, "void main() { foo(; }").is_err());
    }
}
