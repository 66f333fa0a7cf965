// ── Identifier allocation ──
//
// VLAN ids, VNIs and bridge domains are drawn at random from configured
// ranges, excluding whatever either site's device currently reports as in
// use. Every draw is bounded: the candidate range is walked exactly once.
// Route distinguishers and targets are admin-number + random value and are
// not checked against devices.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::AllocationConfig;
use crate::error::CoreError;

/// Above this size the range is scanned from a random offset instead of
/// being materialized and shuffled.
const SHUFFLE_LIMIT: u64 = 1 << 16;

/// Inclusive identifier range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdRange {
    pub start: u32,
    pub end: u32,
}

impl IdRange {
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Number of values in the range. `0..=u32::MAX` holds 2^32 of them.
    pub fn len(&self) -> u64 {
        if self.end < self.start {
            0
        } else {
            u64::from(self.end - self.start) + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, value: u32) -> bool {
        (self.start..=self.end).contains(&value)
    }
}

impl fmt::Display for IdRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// Draw one value from `range` that is in neither `used_east` nor `used_west`.
///
/// Fails with [`CoreError::AllocationExhausted`] once every candidate has
/// been examined.
pub fn allocate<R: Rng + ?Sized>(
    rng: &mut R,
    pool: &str,
    range: IdRange,
    used_east: &BTreeSet<u32>,
    used_west: &BTreeSet<u32>,
) -> Result<u32, CoreError> {
    let free = |v: &u32| !used_east.contains(v) && !used_west.contains(v);

    let len = range.len();
    if len <= SHUFFLE_LIMIT {
        let mut candidates: Vec<u32> = (range.start..=range.end).collect();
        candidates.shuffle(rng);
        if let Some(v) = candidates.into_iter().find(free) {
            return Ok(v);
        }
    } else {
        let offset = rng.gen_range(0..len);
        let found = (0..len)
            .filter_map(|i| u32::try_from((offset + i) % len).ok())
            .map(|delta| range.start + delta)
            .find(free);
        if let Some(v) = found {
            return Ok(v);
        }
    }

    Err(CoreError::AllocationExhausted {
        pool: pool.to_owned(),
        range: range.to_string(),
    })
}

/// Per-flow allocator. Values handed out from the same pool within one
/// flow are mutually distinct.
pub struct IdentifierAllocator {
    rng: StdRng,
    config: AllocationConfig,
    taken: HashMap<&'static str, BTreeSet<u32>>,
}

pub const POOL_VLAN: &str = "VLAN id";
pub const POOL_VNI: &str = "VNI";
pub const POOL_BRIDGE_DOMAIN: &str = "bridge domain";
const POOL_RD: &str = "route distinguisher";
const POOL_RT: &str = "route target";
const POOL_NODE_RD: &str = "node route distinguisher";

impl IdentifierAllocator {
    pub fn new(config: AllocationConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Deterministic allocator for reproducible tests.
    pub fn seeded(config: AllocationConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: AllocationConfig, rng: StdRng) -> Self {
        Self {
            rng,
            config,
            taken: HashMap::new(),
        }
    }

    pub fn config(&self) -> &AllocationConfig {
        &self.config
    }

    /// Allocate from `range`, excluding live usage on both sites and
    /// anything already drawn from `pool` in this flow.
    pub fn allocate(
        &mut self,
        pool: &'static str,
        range: IdRange,
        used_east: &BTreeSet<u32>,
        used_west: &BTreeSet<u32>,
    ) -> Result<u32, CoreError> {
        let taken = self.taken.entry(pool).or_default();
        let mut west_and_taken = used_west.clone();
        west_and_taken.extend(taken.iter().copied());

        let value = allocate(&mut self.rng, pool, range, used_east, &west_and_taken)?;
        taken.insert(value);
        Ok(value)
    }

    fn draw_unique(&mut self, pool: &'static str, range: IdRange) -> Result<u32, CoreError> {
        let none = BTreeSet::new();
        self.allocate(pool, range, &none, &none)
    }

    /// `<rd_admin>:<n>`, distinct within this flow.
    pub fn route_distinguisher(&mut self) -> Result<String, CoreError> {
        let n = self.draw_unique(POOL_RD, self.config.rd_rt_value)?;
        Ok(format!("{}:{n}", self.config.rd_admin))
    }

    /// `<rt_admin>:<n>`, distinct within this flow.
    pub fn route_target(&mut self) -> Result<String, CoreError> {
        let n = self.draw_unique(POOL_RT, self.config.rd_rt_value)?;
        Ok(format!("{}:{n}", self.config.rt_admin))
    }

    /// `target:N:N` for an L2 DCI virtual network.
    pub fn vn_route_target(&mut self) -> String {
        let n = self.random_in(self.config.vn_route_target);
        format!("target:{n}:{n}")
    }

    /// `<asn>:<n>` for an L3VPN node, distinct within this flow.
    pub fn node_route_distinguisher(&mut self, as_number: u32) -> Result<String, CoreError> {
        let n = self.draw_unique(POOL_NODE_RD, self.config.node_rd_value)?;
        Ok(format!("{as_number}:{n}"))
    }

    /// SRv6 opcode shared by both ends of an L3VPN slicing.
    pub fn opcode(&mut self) -> u32 {
        self.random_in(self.config.opcode)
    }

    fn random_in(&mut self, range: IdRange) -> u32 {
        if range.is_empty() {
            return range.start;
        }
        self.rng.gen_range(range.start..=range.end)
    }
}
