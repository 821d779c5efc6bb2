// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Random wiring generation.

use rand::seq::SliceRandom;
use rand::Rng;

use super::{Endpoint, Wiring};
use crate::config::RandomGraphConfig;
use crate::ep_type::{compatible, random_constant, EndPointType, BOOL, INT};
use crate::row::{valid_sources, EndPointClass, Row};

fn pick_type<R: Rng + ?Sized>(config: &RandomGraphConfig, rng: &mut R) -> EndPointType {
    config.endpoint_types.choose(rng).copied().unwrap_or(INT)
}

fn next_source(wiring: &Wiring, row: Row) -> u8 {
    let n = wiring.count(row, EndPointClass::Src);
    u8::try_from(n).unwrap_or(u8::MAX)
}

fn endpoint_count<R: Rng + ?Sized>(config: &RandomGraphConfig, rng: &mut R) -> u8 {
    rng.gen_range(1..=config.max_row_endpoints.max(1))
}

/// Build a random, stable wiring over `rows`.
///
/// Every listed row gets between one and `max_row_endpoints` endpoints of each
/// class it can hold. Row F adds a bool input that feeds it and row P mirrors
/// row O (row F implies row O). Destinations that no eligible source could
/// satisfy get a fresh row I source of their type, so the result always
/// normalizes to a stable wiring.
pub fn random_wiring<R: Rng + ?Sized>(
    rows: &[Row],
    config: &RandomGraphConfig,
    rng: &mut R,
) -> Wiring {
    random_wiring_around(rows, Vec::new(), config, rng)
}

/// [`random_wiring`] with some endpoints fixed up front.
///
/// Used to build a parent around the interfaces of existing children: the
/// fixed endpoints are inserted first and the rows they occupy are not
/// generated.
pub(crate) fn random_wiring_around<R: Rng + ?Sized>(
    rows: &[Row],
    fixed: Vec<Endpoint>,
    config: &RandomGraphConfig,
    rng: &mut R,
) -> Wiring {
    let mut rows = rows.to_vec();
    if rows.contains(&Row::F) && !rows.contains(&Row::O) {
        rows.push(Row::O);
    }
    let mut wiring = Wiring::new();
    for ep in fixed {
        wiring.insert(ep);
    }

    for &row in &rows {
        match row {
            Row::P | Row::U => {}
            Row::F => {
                let idx = next_source(&wiring, Row::I);
                wiring.insert(Endpoint::src(Row::I, idx, BOOL));
                wiring.insert(Endpoint::dst(Row::F, 0, BOOL));
            }
            Row::C => {
                for _ in 0..endpoint_count(config, rng) {
                    let ty = pick_type(config, rng);
                    if let Some(value) = random_constant(ty, rng) {
                        let idx = next_source(&wiring, Row::C);
                        wiring.insert(Endpoint::constant(idx, ty, value));
                    }
                }
            }
            _ => {
                for class in [EndPointClass::Src, EndPointClass::Dst] {
                    let fits = match class {
                        EndPointClass::Src => row.is_source(),
                        EndPointClass::Dst => row.is_destination(),
                    };
                    if !fits || wiring.count(row, class) > 0 {
                        continue;
                    }
                    for idx in 0..endpoint_count(config, rng) {
                        let ty = pick_type(config, rng);
                        wiring.insert(match class {
                            EndPointClass::Src => Endpoint::src(row, idx, ty),
                            EndPointClass::Dst => Endpoint::dst(row, idx, ty),
                        });
                    }
                }
            }
        }
    }

    if rows.contains(&Row::F) {
        let mirrored: Vec<Endpoint> = wiring
            .row(Row::O, EndPointClass::Dst)
            .map(|o| Endpoint::dst(Row::P, o.idx, o.ty))
            .collect();
        for p in mirrored {
            wiring.insert(p);
        }
    }

    ensure_sources(&mut wiring);
    wiring.reindex();
    wiring.normalize(rng);
    wiring
}

/// Add a row I source for every destination type nothing eligible can feed.
fn ensure_sources(wiring: &mut Wiring) {
    let has_f = wiring.has_f();
    let mut missing: Vec<EndPointType> = Vec::new();
    for dst in wiring.iter() {
        if dst.class != EndPointClass::Dst || dst.row == Row::U {
            continue;
        }
        let eligible = valid_sources(dst.row, has_f);
        let feeds = |src: &Endpoint| {
            src.class == EndPointClass::Src
                && eligible.contains(&src.row)
                && compatible(src.ty, dst.ty)
        };
        if !missing.contains(&dst.ty) && !wiring.iter().any(feeds) {
            missing.push(dst.ty);
        }
    }
    for ty in missing {
        let idx = next_source(wiring, Row::I);
        wiring.insert(Endpoint::src(Row::I, idx, ty));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ep_type::{FLOAT, STR};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn random_wirings_are_valid() {
        let config = RandomGraphConfig {
            max_row_endpoints: 6,
            endpoint_types: vec![BOOL, INT, FLOAT, STR],
        };
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let cases: [&[Row]; 3] = [
            &[Row::I, Row::C, Row::O],
            &[Row::I, Row::C, Row::A, Row::B, Row::O],
            &[Row::I, Row::C, Row::F, Row::A, Row::B, Row::O],
        ];
        for rows in cases {
            for _ in 0..20 {
                let w = random_wiring(rows, &config, &mut rng);
                assert!(w.is_stable());
                assert_eq!(w.validate(), Vec::new(), "{w:?}");
                assert!(w.to_spec().is_ok());
            }
        }
    }

    #[test]
    fn f_mirrors_o_into_p() {
        let config = RandomGraphConfig::default();
        let mut rng = StdRng::seed_from_u64(7);
        let w = random_wiring(&[Row::I, Row::F, Row::O], &config, &mut rng);
        let o: Vec<_> = w.row(Row::O, EndPointClass::Dst).map(|ep| ep.ty).collect();
        let p: Vec<_> = w.row(Row::P, EndPointClass::Dst).map(|ep| ep.ty).collect();
        assert_eq!(o, p);
        assert!(w.row(Row::I, EndPointClass::Src).any(|ep| ep.ty == BOOL));
    }
}
