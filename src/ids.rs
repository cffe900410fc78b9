//! Identifier generation for items and clients created inside the core.
//!
//! Callers inject the generator, so tests get stable ids and the service can
//! use random ones.

use rand::Rng;

use crate::model::{ClientId, ItemId};

/// Source of fresh item and client ids.
pub trait IdGenerator {
    /// New item id starting with `prefix`.
    fn next_item_id(&mut self, prefix: &str) -> ItemId;

    /// New client id of the form `#NNNN`.
    fn next_client_id(&mut self) -> ClientId;
}

/// Counts up from 1 for items and from `#1000` for clients.
#[derive(Clone, Debug, Default)]
pub struct SequentialIds {
    items: u64,
    clients: u32,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for SequentialIds {
    fn next_item_id(&mut self, prefix: &str) -> ItemId {
        self.items += 1;
        ItemId(format!("{}-{}", prefix, self.items))
    }

    fn next_client_id(&mut self) -> ClientId {
        let id = 1000 + self.clients % 9000;
        self.clients += 1;
        ClientId(format!("#{}", id))
    }
}

/// Draws ids from a random source.
#[derive(Clone, Debug)]
pub struct RandomIds<R> {
    rng: R,
}

impl<R: Rng> RandomIds<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> IdGenerator for RandomIds<R> {
    fn next_item_id(&mut self, prefix: &str) -> ItemId {
        ItemId(format!("{}-{:08x}", prefix, self.rng.r#gen::<u32>()))
    }

    fn next_client_id(&mut self) -> ClientId {
        ClientId(format!("#{}", self.rng.gen_range(1000..10000)))
    }
}
