// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use raster_pipe_common::signature::Signature;

use crate::dispatch::DispatchData;

/// A fixed capacity cache of pipelines, keyed by their signature.
///
/// Inserting into a full cache overwrites the slots in insertion order, regardless of how
/// recently they were used.
#[derive(Debug, Clone)]
pub struct SignatureCache<const N: usize> {
    slots: [Option<DispatchData>; N],
    next: usize,
    len: usize,
}

impl<const N: usize> Default for SignatureCache<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> SignatureCache<N> {
    /// An empty cache.
    pub const fn new() -> Self {
        const { assert!(N > 0, "a signature cache needs at least one slot") };
        Self {
            slots: [None; N],
            next: 0,
            len: 0,
        }
    }

    /// The cached pipeline for `signature`.
    pub fn get(&self, signature: Signature) -> Option<&DispatchData> {
        self.slots
            .iter()
            .flatten()
            .find(|d| d.signature() == signature)
    }

    /// Whether `signature` is cached.
    pub fn contains(&self, signature: Signature) -> bool {
        self.get(signature).is_some()
    }

    /// Cache `dispatch`, replacing the oldest entry when the cache is full.
    ///
    /// A pipeline that is already cached is replaced in place.
    pub fn insert(&mut self, dispatch: DispatchData) {
        let signature = dispatch.signature();
        if let Some(slot) = self
            .slots
            .iter_mut()
            .flatten()
            .find(|d| d.signature() == signature)
        {
            *slot = dispatch;
            return;
        }
        self.slots[self.next] = Some(dispatch);
        self.next = (self.next + 1) % N;
        self.len = (self.len + 1).min(N);
    }

    /// Number of cached pipelines.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Maximum number of cached pipelines.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Drop every cached pipeline.
    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{PipelineRuntime, StaticRuntime};
    use raster_pipe_common::compop::CompOpExt;
    use raster_pipe_common::format::FormatExt;
    use raster_pipe_common::signature::{FetchType, FillType};

    fn dispatch(op: CompOpExt) -> DispatchData {
        let sig = Signature::new(
            FormatExt::Prgb32,
            FormatExt::Prgb32,
            op,
            FillType::BoxA,
            FetchType::Solid,
        );
        StaticRuntime.get(sig).unwrap()
    }

    #[test]
    fn round_robin_eviction() {
        let mut cache = SignatureCache::<4>::new();
        let entries: Vec<_> = CompOpExt::ALL[..5].iter().map(|&op| dispatch(op)).collect();
        for d in &entries[..4] {
            cache.insert(*d);
        }
        assert_eq!(cache.len(), 4);
        // Looking an entry up doesn't keep it alive.
        assert!(cache.contains(entries[0].signature()));

        cache.insert(entries[4]);
        assert_eq!(cache.len(), 4);
        assert!(!cache.contains(entries[0].signature()));
        for d in &entries[1..] {
            assert!(cache.contains(d.signature()));
        }
    }

    #[test]
    fn reinsert_keeps_slot() {
        let mut cache = SignatureCache::<2>::new();
        let (a, b) = (dispatch(CompOpExt::SrcOver), dispatch(CompOpExt::SrcCopy));
        cache.insert(a);
        cache.insert(a);
        assert_eq!(cache.len(), 1);
        cache.insert(b);
        assert!(cache.contains(a.signature()) && cache.contains(b.signature()));
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), 2);
    }
}
