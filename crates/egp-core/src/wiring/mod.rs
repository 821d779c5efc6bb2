// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Endpoint-level graph model for editing, normalizing and validating wiring.
//!
//! A [`Wiring`] keeps every endpoint with bidirectional references: a
//! destination names the source feeding it and a source lists every
//! destination it feeds. References are `(row, index)` pairs resolved through
//! the owning wiring, never live pointers.
//!
//! The compact [`Graph`](crate::Graph) is what the cache stores; a wiring is
//! built from its [`ConnectionSpec`] when the graph has to be changed or
//! checked, and turned back into a specification afterwards.

mod random;
mod validate;

pub use random::random_wiring;
pub(crate) use random::random_wiring_around;
pub use validate::{Finding, FindingCode};

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::connection_spec::{ConnectionSpec, Constant, SourceRef};
use crate::ep_type::{compatible, EndPointType};
use crate::error::GraphError;
use crate::row::{valid_sources, EndPointClass, Row};

/// Identity of an endpoint within a wiring. Orders by row, class, index.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct EndpointKey {
    /// Row.
    pub row: Row,
    /// Source or destination.
    pub class: EndPointClass,
    /// Index within the row.
    pub idx: u8,
}

impl EndpointKey {
    /// Source endpoint key.
    pub const fn src(row: Row, idx: u8) -> Self {
        Self {
            row,
            class: EndPointClass::Src,
            idx,
        }
    }

    /// Destination endpoint key.
    pub const fn dst(row: Row, idx: u8) -> Self {
        Self {
            row,
            class: EndPointClass::Dst,
            idx,
        }
    }

    /// Reference to this endpoint as held by the opposite class.
    pub const fn to_ref(self) -> EndpointRef {
        EndpointRef::new(self.row, self.idx)
    }
}

impl std::fmt::Display for EndpointKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let c = match self.class {
            EndPointClass::Src => 's',
            EndPointClass::Dst => 'd',
        };
        write!(f, "{}{:03}{}", self.row, self.idx, c)
    }
}

/// Reference to an endpoint of the opposite class.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct EndpointRef {
    /// Row of the referenced endpoint.
    pub row: Row,
    /// Index of the referenced endpoint.
    pub idx: u8,
}

impl EndpointRef {
    /// Reference to `row`, `idx`.
    pub const fn new(row: Row, idx: u8) -> Self {
        Self { row, idx }
    }
}

/// One endpoint.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Endpoint {
    /// Row.
    pub row: Row,
    /// Index within the row.
    pub idx: u8,
    /// Source or destination.
    pub class: EndPointClass,
    /// Endpoint type.
    pub ty: EndPointType,
    /// Connected endpoints of the opposite class.
    pub refs: Vec<EndpointRef>,
    /// Literal expression for row C endpoints.
    pub value: Option<String>,
}

impl Endpoint {
    /// Unconnected source endpoint.
    pub fn src(row: Row, idx: u8, ty: EndPointType) -> Self {
        Self {
            row,
            idx,
            class: EndPointClass::Src,
            ty,
            refs: Vec::new(),
            value: None,
        }
    }

    /// Unconnected destination endpoint.
    pub fn dst(row: Row, idx: u8, ty: EndPointType) -> Self {
        Self {
            row,
            idx,
            class: EndPointClass::Dst,
            ty,
            refs: Vec::new(),
            value: None,
        }
    }

    /// Row C endpoint with a literal.
    pub fn constant(idx: u8, ty: EndPointType, value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::src(Row::C, idx, ty)
        }
    }

    /// Key of this endpoint.
    pub const fn key(&self) -> EndpointKey {
        EndpointKey {
            row: self.row,
            class: self.class,
            idx: self.idx,
        }
    }

    /// Key of the endpoint `r` refers to.
    pub const fn ref_key(&self, r: EndpointRef) -> EndpointKey {
        EndpointKey {
            row: r.row,
            class: self.class.opposite(),
            idx: r.idx,
        }
    }

    /// Returns `true` if the endpoint has at least one connection.
    pub fn is_connected(&self) -> bool {
        !self.refs.is_empty()
    }
}

/// Mutable endpoint graph.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Wiring {
    endpoints: BTreeMap<EndpointKey, Endpoint>,
}

impl Wiring {
    /// Empty wiring.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the endpoint model of a connection specification.
    ///
    /// Sources in rows I, A and B are created on first reference. A reference
    /// to a constant that does not exist is kept on the destination so that
    /// validation can report it.
    pub fn from_spec(spec: &ConnectionSpec) -> Self {
        let mut wiring = Self::new();
        for (idx, c) in (0..=u8::MAX).zip(spec.constants.iter()) {
            wiring.insert(Endpoint::constant(idx, c.ty, c.value.clone()));
        }
        for (&row, refs) in &spec.rows {
            for (idx, src) in (0..=u8::MAX).zip(refs.iter()) {
                let mut dst = Endpoint::dst(row, idx, src.ty);
                dst.refs.push(EndpointRef::new(src.row, src.idx));
                let src_key = EndpointKey::src(src.row, src.idx);
                if src.row != Row::C && !wiring.endpoints.contains_key(&src_key) {
                    wiring.insert(Endpoint::src(src.row, src.idx, src.ty));
                }
                if let Some(source) = wiring.endpoints.get_mut(&src_key) {
                    source.refs.push(EndpointRef::new(row, idx));
                }
                wiring.insert(dst);
            }
        }
        wiring
    }

    /// Regenerate the declarative specification.
    ///
    /// Fails if any destination is unconnected, since a connection spec has no
    /// way to express one.
    pub fn to_spec(&self) -> Result<ConnectionSpec, GraphError> {
        let mut spec = ConnectionSpec::default();
        for ep in self.endpoints.values() {
            match (ep.class, ep.row) {
                (EndPointClass::Src, Row::C) => spec.constants.push(Constant {
                    value: ep.value.clone().unwrap_or_default(),
                    ty: ep.ty,
                }),
                (EndPointClass::Dst, row) => {
                    let idx = ep.idx;
                    let src = ep.refs.first().ok_or(GraphError::Unconnected { row, idx })?;
                    let source = SourceRef {
                        row: src.row,
                        idx: src.idx,
                        ty: ep.ty,
                    };
                    spec.rows.entry(row).or_default().push(source);
                }
                (EndPointClass::Src, _) => {}
            }
        }
        spec.check()?;
        Ok(spec)
    }

    /// Insert or replace an endpoint.
    pub fn insert(&mut self, ep: Endpoint) {
        self.endpoints.insert(ep.key(), ep);
    }

    /// Remove an endpoint and every back-reference to it.
    pub fn remove(&mut self, key: EndpointKey) -> Option<Endpoint> {
        let ep = self.endpoints.remove(&key)?;
        let target = key.to_ref();
        for r in &ep.refs {
            if let Some(other) = self.endpoints.get_mut(&ep.ref_key(*r)) {
                other.refs.retain(|back| *back != target);
            }
        }
        Some(ep)
    }

    /// Endpoint by key.
    pub fn get(&self, key: EndpointKey) -> Option<&Endpoint> {
        self.endpoints.get(&key)
    }

    /// Iterate endpoints in key order.
    pub fn iter(&self) -> impl Iterator<Item = &Endpoint> + '_ {
        self.endpoints.values()
    }

    /// Number of endpoints.
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Returns `true` if there are no endpoints.
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Endpoints of one row and class in index order.
    pub fn row(&self, row: Row, class: EndPointClass) -> impl Iterator<Item = &Endpoint> + '_ {
        let first = EndpointKey { row, class, idx: 0 };
        let last = EndpointKey {
            row,
            class,
            idx: u8::MAX,
        };
        self.endpoints.range(first..=last).map(|(_, ep)| ep)
    }

    /// Number of endpoints in one row and class.
    pub fn count(&self, row: Row, class: EndPointClass) -> usize {
        self.row(row, class).count()
    }

    /// Returns `true` if any endpoint lives in `row`.
    pub fn has_row(&self, row: Row) -> bool {
        self.endpoints.keys().any(|k| k.row == row)
    }

    /// Returns `true` if row F is present.
    pub fn has_f(&self) -> bool {
        self.has_row(Row::F)
    }

    /// Connect destination `dst` to source `src`, replacing any previous source.
    ///
    /// Returns `false` (and changes nothing) if either endpoint is missing or
    /// the classes are wrong.
    pub fn connect(&mut self, dst: EndpointKey, src: EndpointKey) -> bool {
        if dst.class != EndPointClass::Dst
            || src.class != EndPointClass::Src
            || !self.endpoints.contains_key(&src)
            || !self.endpoints.contains_key(&dst)
        {
            return false;
        }
        self.disconnect(dst);
        if let Some(d) = self.endpoints.get_mut(&dst) {
            d.refs = vec![src.to_ref()];
        }
        if let Some(s) = self.endpoints.get_mut(&src) {
            s.refs.push(dst.to_ref());
        }
        true
    }

    /// Remove every connection of destination `dst`.
    pub fn disconnect(&mut self, dst: EndpointKey) {
        let Some(d) = self.endpoints.get_mut(&dst) else {
            return;
        };
        let old = std::mem::take(&mut d.refs);
        let target = dst.to_ref();
        for r in old {
            if let Some(s) = self.endpoints.get_mut(&EndpointKey::src(r.row, r.idx)) {
                s.refs.retain(|back| *back != target);
            }
        }
    }

    /// Connect every unconnected destination (other than row U) to a random,
    /// type-compatible source from an eligible row.
    ///
    /// Destinations with no viable source stay unconnected.
    pub fn connect_all<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let has_f = self.has_f();
        let pending: Vec<EndpointKey> = self
            .endpoints
            .values()
            .filter(|ep| ep.class == EndPointClass::Dst && ep.row != Row::U && !ep.is_connected())
            .map(Endpoint::key)
            .collect();
        for dst in pending {
            let Some(dst_ty) = self.endpoints.get(&dst).map(|ep| ep.ty) else {
                continue;
            };
            let eligible = valid_sources(dst.row, has_f);
            let candidates: Vec<EndpointKey> = self
                .endpoints
                .values()
                .filter(|ep| {
                    ep.class == EndPointClass::Src
                        && eligible.contains(&ep.row)
                        && compatible(ep.ty, dst_ty)
                })
                .map(Endpoint::key)
                .collect();
            match candidates.choose(rng) {
                Some(&src) => {
                    self.connect(dst, src);
                }
                None => debug!(%dst, "no viable source endpoint"),
            }
        }
    }

    /// Make the wiring consistent.
    ///
    /// 1. Drop row U and every reference to it.
    /// 2. [`connect_all`](Self::connect_all).
    /// 3. Reference every still-unreferenced source from a new row U endpoint.
    ///
    /// Returns [`is_stable`](Self::is_stable). A stable wiring is a fixed
    /// point: normalizing it again changes nothing.
    pub fn normalize<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        let u_keys: Vec<EndpointKey> = self
            .row(Row::U, EndPointClass::Dst)
            .map(Endpoint::key)
            .collect();
        for key in u_keys {
            self.remove(key);
        }

        self.connect_all(rng);

        let unreferenced: Vec<(EndpointKey, EndPointType)> = self
            .endpoints
            .values()
            .filter(|ep| ep.class == EndPointClass::Src && !ep.is_connected())
            .map(|ep| (ep.key(), ep.ty))
            .collect();
        for (u_idx, (src, ty)) in (0..=u8::MAX).zip(unreferenced) {
            let mut u = Endpoint::dst(Row::U, u_idx, ty);
            u.refs.push(src.to_ref());
            self.insert(u);
            if let Some(s) = self.endpoints.get_mut(&src) {
                s.refs = vec![EndpointRef::new(Row::U, u_idx)];
            }
        }

        self.is_stable()
    }

    /// Returns `true` if no destination outside row U is unconnected.
    pub fn is_stable(&self) -> bool {
        !self
            .endpoints
            .values()
            .any(|ep| ep.class == EndPointClass::Dst && ep.row != Row::U && !ep.is_connected())
    }

    /// Renumber each (row, class) group so indices run 0..n in key order,
    /// rewriting references to match.
    pub fn reindex(&mut self) {
        let mut remap: BTreeMap<EndpointKey, u8> = BTreeMap::new();
        let mut last: Option<(Row, EndPointClass)> = None;
        let mut next = 0_u8;
        for key in self.endpoints.keys() {
            if last != Some((key.row, key.class)) {
                last = Some((key.row, key.class));
                next = 0;
            }
            remap.insert(*key, next);
            next = next.saturating_add(1);
        }
        let old = std::mem::take(&mut self.endpoints);
        for (key, mut ep) in old {
            ep.idx = remap.get(&key).copied().unwrap_or(ep.idx);
            let class = ep.class.opposite();
            for r in &mut ep.refs {
                let key = EndpointKey {
                    row: r.row,
                    class,
                    idx: r.idx,
                };
                if let Some(&idx) = remap.get(&key) {
                    r.idx = idx;
                }
            }
            self.endpoints.insert(ep.key(), ep);
        }
    }
}
