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

//! Which program each material currently holds a reference to.

use ahash::AHashMap;
use lumen_core::material::{Material, ProgramKey};
use lumen_core::renderer::{CacheError, GraphicsDevice};
use lumen_core::scene::MaterialId;

use super::cache::{ProgramCache, ProgramHandle};
use super::shaders;

/// The pass a material program is bound for.
///
/// The transmission pass renders with an offscreen environment, so a material
/// drawn in both passes holds one program per pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum PassSlot {
    Main,
    Transmission,
}

/// The holder of a program reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum BindingOwner {
    Material(MaterialId, PassSlot),
    /// The internal depth material used by every shadow caster.
    ShadowDepth,
}

#[derive(Debug, Clone, Copy)]
struct Binding {
    key: ProgramKey,
    // `None` when the sources of `key` failed to compile.
    handle: Option<ProgramHandle>,
    // The material version the binding was last resolved for.
    version: u64,
}

/// The program an owner draws with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ResolvedProgram {
    /// `None` when the program failed to compile.
    pub handle: Option<ProgramHandle>,
    /// The material was marked edited since the owner last drew with this program.
    pub edited: bool,
}

/// Material-to-program bindings. Each owner holds at most one reference in
/// the program cache, so the reference count of a program equals the number
/// of owners bound to it.
#[derive(Debug, Default)]
pub(crate) struct MaterialBindings {
    bindings: AHashMap<BindingOwner, Binding>,
}

impl MaterialBindings {
    /// Returns the program `owner` needs for `key`, rebinding when the key
    /// changed since the last call. The new program is acquired before the
    /// old one is released, so a program shared by both stays alive.
    ///
    /// A bumped [`Material::version`] with an unchanged key keeps the program
    /// and reports the binding as edited.
    pub(crate) fn resolve(
        &mut self,
        programs: &mut ProgramCache,
        device: &mut dyn GraphicsDevice,
        owner: BindingOwner,
        material: &Material,
        key: ProgramKey,
    ) -> Result<ResolvedProgram, CacheError> {
        let version = material.version();
        if let Some(binding) = self.bindings.get_mut(&owner) {
            if binding.key == key {
                let edited = binding.version != version;
                binding.version = version;
                return Ok(ResolvedProgram {
                    handle: binding.handle,
                    edited,
                });
            }
        }

        let handle = programs.acquire(device, key, || shaders::program_descriptor(material, &key))?;
        let previous = self.bindings.insert(owner, Binding { key, handle, version });
        if let Some(old) = previous.and_then(|binding| binding.handle) {
            programs.release(device, old)?;
        }
        Ok(ResolvedProgram { handle, edited: false })
    }

    /// Drops the bindings of a disposed material.
    pub(crate) fn release_material(
        &mut self,
        programs: &mut ProgramCache,
        device: &mut dyn GraphicsDevice,
        material: MaterialId,
    ) -> Result<(), CacheError> {
        for slot in [PassSlot::Main, PassSlot::Transmission] {
            let released = self.bindings.remove(&BindingOwner::Material(material, slot));
            if let Some(handle) = released.and_then(|binding| binding.handle) {
                programs.release(device, handle)?;
            }
        }
        Ok(())
    }

    /// The number of owners bound to a compiled program.
    pub(crate) fn len(&self) -> usize {
        self.bindings.values().filter(|binding| binding.handle.is_some()).count()
    }

    /// Forgets every binding without releasing, after the program cache was
    /// invalidated.
    pub(crate) fn clear(&mut self) {
        self.bindings.clear();
    }
}
