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

//! Compiled programs shared by every material with the same program key.

use ahash::{AHashMap, AHashSet};
use lumen_core::material::ProgramKey;
use lumen_core::renderer::{
    AttributeInfo, CacheError, GraphicsDevice, ProgramDescriptor, ProgramId, ResourceError,
    UniformInfo,
};
use slotmap::SlotMap;

use super::CacheStats;

slotmap::new_key_type! {
    /// A reference-counted entry of the [`ProgramCache`].
    pub struct ProgramHandle;
}

/// A compiled program with its reflected interface.
#[derive(Debug)]
pub struct CachedProgram {
    program: ProgramId,
    key: ProgramKey,
    label: String,
    used_times: u32,
    uniforms: AHashMap<String, UniformInfo>,
    attributes: Vec<AttributeInfo>,
}

impl CachedProgram {
    /// The device program.
    pub fn program(&self) -> ProgramId {
        self.program
    }

    /// The key the program was compiled for.
    pub fn key(&self) -> ProgramKey {
        self.key
    }

    /// The label given at compile time.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The number of live references.
    pub fn used_times(&self) -> u32 {
        self.used_times
    }

    /// Looks up an active uniform by name. Array elements are named `name[i]`.
    pub fn uniform(&self, name: &str) -> Option<&UniformInfo> {
        self.uniforms.get(name)
    }

    /// The active vertex attributes.
    pub fn attributes(&self) -> &[AttributeInfo] {
        &self.attributes
    }
}

/// Maps program keys to compiled programs.
///
/// Each acquire adds one reference to the entry of its key; the program is
/// deleted exactly when the last reference is released. Keys whose sources
/// failed to compile are remembered, so a broken material costs one compile
/// attempt and one warning rather than one per frame.
#[derive(Debug, Default)]
pub struct ProgramCache {
    entries: SlotMap<ProgramHandle, CachedProgram>,
    by_key: AHashMap<ProgramKey, ProgramHandle>,
    broken: AHashSet<ProgramKey>,
    // Programs deleted since the last `take_deleted`.
    deleted: Vec<ProgramId>,
    stats: CacheStats,
}

impl ProgramCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes a reference to the program of `key`, compiling it on a miss.
    ///
    /// `sources` is only called on a miss.
    ///
    /// ## Returns
    /// `Ok(None)` if the sources of `key` do not compile. The failure is
    /// logged once; later acquires of the same key return `None` without
    /// touching the device.
    pub fn acquire(
        &mut self,
        device: &mut dyn GraphicsDevice,
        key: ProgramKey,
        sources: impl FnOnce() -> ProgramDescriptor,
    ) -> Result<Option<ProgramHandle>, CacheError> {
        if let Some(&handle) = self.by_key.get(&key) {
            self.entries[handle].used_times += 1;
            self.stats.hits += 1;
            return Ok(Some(handle));
        }
        if self.broken.contains(&key) {
            return Ok(None);
        }

        let descriptor = sources();
        let program = match device.create_program(&descriptor) {
            Ok(program) => program,
            Err(ResourceError::ProgramCompile { label, log }) => {
                log::warn!("Program '{label}' failed to compile, draws using it are skipped:\n{log}");
                self.broken.insert(key);
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };
        let reflection = device.program_reflection(program)?;

        log::debug!(
            "Program cache miss: compiled '{}' as {:?}.",
            descriptor.label,
            program
        );
        let handle = self.entries.insert(CachedProgram {
            program,
            key,
            label: descriptor.label,
            used_times: 1,
            uniforms: reflection
                .uniforms
                .into_iter()
                .map(|uniform| (uniform.name.clone(), uniform))
                .collect(),
            attributes: reflection.attributes,
        });
        self.by_key.insert(key, handle);
        self.stats.created += 1;
        self.stats.uploads += 1;
        Ok(Some(handle))
    }

    /// Drops one reference, deleting the program when none remain.
    ///
    /// ## Returns
    /// `true` if the program was deleted.
    pub fn release(
        &mut self,
        device: &mut dyn GraphicsDevice,
        handle: ProgramHandle,
    ) -> Result<bool, CacheError> {
        let entry = self
            .entries
            .get_mut(handle)
            .ok_or(CacheError::DoubleRelease { kind: "program" })?;
        entry.used_times -= 1;
        if entry.used_times > 0 {
            return Ok(false);
        }

        let Some(entry) = self.entries.remove(handle) else {
            return Err(CacheError::DoubleRelease { kind: "program" });
        };
        self.by_key.remove(&entry.key);
        self.stats.destroyed += 1;
        self.deleted.push(entry.program);
        log::debug!("Deleting program '{}'.", entry.label);
        device.delete_program(entry.program)?;
        Ok(true)
    }

    /// Returns the entry of a live handle.
    pub fn get(&self, handle: ProgramHandle) -> Option<&CachedProgram> {
        self.entries.get(handle)
    }

    /// Returns the live entry compiled for `key`.
    pub fn find(&self, key: &ProgramKey) -> Option<&CachedProgram> {
        self.by_key.get(key).and_then(|&handle| self.entries.get(handle))
    }

    /// Drains the ids of programs deleted since the last call, so state
    /// caches can forget them.
    pub fn take_deleted(&mut self) -> Vec<ProgramId> {
        std::mem::take(&mut self.deleted)
    }

    /// Returns `true` if the sources of `key` failed to compile.
    pub fn is_broken(&self, key: &ProgramKey) -> bool {
        self.broken.contains(key)
    }

    /// The number of live programs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no program is alive.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forgets every program without touching the device. Every outstanding
    /// handle becomes invalid. Compile failures are kept: the sources did not
    /// change.
    pub fn invalidate_all(&mut self) {
        self.entries.clear();
        self.by_key.clear();
        self.deleted.clear();
        self.stats.rebuilds += 1;
    }

    /// The cache counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            live: self.entries.len(),
            ..self.stats
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::material::Material;
    use lumen_core::math::LinearRgba;
    use lumen_core::renderer::EnvironmentSignature;
    use lumen_infra::HeadlessDevice;

    fn descriptor(label: &str) -> ProgramDescriptor {
        ProgramDescriptor {
            label: label.to_owned(),
            vertex_source: "in vec3 position; uniform mat4 modelMatrix; void main() {}".into(),
            fragment_source: "uniform vec4 diffuse; uniform float opacity[2]; void main() {}".into(),
        }
    }

    fn key_of(material: &Material) -> ProgramKey {
        material.program_key(EnvironmentSignature::default())
    }

    #[test]
    fn test_same_key_shares_one_program() {
        let mut device = HeadlessDevice::new();
        let mut cache = ProgramCache::new();
        let key = key_of(&Material::basic(LinearRgba::WHITE));

        let a = cache.acquire(&mut device, key, || descriptor("a")).unwrap().unwrap();
        let b = cache
            .acquire(&mut device, key, || panic!("sources requested on a hit"))
            .unwrap()
            .unwrap();

        assert_eq!(a, b);
        assert_eq!(cache.get(a).unwrap().used_times(), 2);
        assert_eq!(device.counters().programs_created, 1);
        let stats = cache.stats();
        assert_eq!((stats.created, stats.hits, stats.live), (1, 1, 1));
    }

    #[test]
    fn test_reflection_is_kept() {
        let mut device = HeadlessDevice::new();
        let mut cache = ProgramCache::new();
        let key = key_of(&Material::basic(LinearRgba::WHITE));
        let handle = cache.acquire(&mut device, key, || descriptor("a")).unwrap().unwrap();

        let program = cache.get(handle).unwrap();
        assert!(program.uniform("modelMatrix").is_some());
        assert!(program.uniform("opacity[1]").is_some());
        assert!(program.uniform("missing").is_none());
        assert_eq!(program.attributes()[0].name, "position");
    }

    #[test]
    fn test_release_deletes_on_last_reference_only() {
        let mut device = HeadlessDevice::new();
        let mut cache = ProgramCache::new();
        let key = key_of(&Material::lambert(LinearRgba::WHITE));
        let handle = cache.acquire(&mut device, key, || descriptor("a")).unwrap().unwrap();
        cache.acquire(&mut device, key, || descriptor("a")).unwrap();

        assert!(!cache.release(&mut device, handle).unwrap());
        assert_eq!(device.live_programs(), 1);
        assert!(cache.release(&mut device, handle).unwrap());
        assert_eq!(device.live_programs(), 0);
        assert_eq!(cache.stats().destroyed, 1);
        assert_eq!(cache.take_deleted().len(), 1);

        assert_eq!(
            cache.release(&mut device, handle),
            Err(CacheError::DoubleRelease { kind: "program" })
        );
        assert_eq!(device.counters().programs_deleted, 1);
    }

    #[test]
    fn test_compile_failure_is_attempted_once() {
        let mut device = HeadlessDevice::new();
        let mut cache = ProgramCache::new();
        let key = key_of(&Material::basic(LinearRgba::WHITE));
        let broken = || ProgramDescriptor {
            label: "broken".into(),
            vertex_source: "void main() {".into(),
            fragment_source: "void main() {}".into(),
        };

        assert_eq!(cache.acquire(&mut device, key, broken).unwrap(), None);
        assert_eq!(cache.acquire(&mut device, key, broken).unwrap(), None);

        assert!(cache.is_broken(&key));
        assert_eq!(device.counters().program_failures, 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate_all_forgets_without_device_calls() {
        let mut device = HeadlessDevice::new();
        let mut cache = ProgramCache::new();
        let key = key_of(&Material::basic(LinearRgba::WHITE));
        let handle = cache.acquire(&mut device, key, || descriptor("a")).unwrap().unwrap();

        cache.invalidate_all();

        assert!(cache.get(handle).is_none());
        assert_eq!(device.counters().programs_deleted, 0);
        assert_eq!(cache.stats().rebuilds, 1);
        cache.acquire(&mut device, key, || descriptor("a")).unwrap().unwrap();
        assert_eq!(device.counters().programs_created, 2);
    }

    #[test]
    fn test_lost_context_propagates() {
        let mut device = HeadlessDevice::new();
        let mut cache = ProgramCache::new();
        device.simulate_context_loss();

        let err = cache
            .acquire(&mut device, key_of(&Material::default()), || descriptor("a"))
            .unwrap_err();
        assert!(err.is_context_lost());
        assert!(!cache.is_broken(&key_of(&Material::default())));
    }
}
