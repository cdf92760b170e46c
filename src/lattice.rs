//! Site, bond and neighbor tables for the supported lattices.
//!
//! A lattice is immutable after construction. Bonds are stored once in
//! parallel `source`/`target`/`bond_type` tables; the per-site neighbor
//! table is derived from them, so the two views stay consistent by
//! construction. Boundaries are toroidal in every direction and the
//! bond type indexes the lattice direction.

use ndarray::Array2;

use crate::error::{Error, Result};
use crate::params::Parameter;

#[derive(Debug, Clone)]
pub struct Lattice {
    dim: usize,
    extents: Vec<usize>,
    num_sites: usize,
    source: Vec<usize>,
    target: Vec<usize>,
    bond_type: Vec<usize>,
    bonds_per_type: Vec<usize>,
    site_type: Vec<usize>,
    bipartite: bool,
    /// `num_sites × coordination`, filled from the bond tables.
    neighbors: Array2<usize>,
    /// Bond type of each neighbor slot, same shape as `neighbors`.
    neighbor_types: Array2<usize>,
}

/// Displacement vectors defining the bond set, one per bond type.
fn displacements(kind: &str, dim: usize) -> Vec<Vec<isize>> {
    match kind {
        "chain" => vec![vec![1]],
        "square" => vec![vec![1, 0], vec![0, 1]],
        "triangular" => vec![vec![1, 0], vec![0, 1], vec![1, 1]],
        "cubic" => vec![vec![1, 0, 0], vec![0, 1, 0], vec![0, 0, 1]],
        _ => unreachable!("unknown lattice kind with dim {}", dim),
    }
}

impl Lattice {
    fn build(kind: &str, extents: Vec<usize>) -> Lattice {
        let dim = extents.len();
        let num_sites: usize = extents.iter().product();
        let disps = displacements(kind, dim);
        let ntypes = disps.len();
        let coordination = 2 * ntypes;

        let site_of = |coord: &[isize]| -> usize {
            let mut idx = 0;
            for d in (0..dim).rev() {
                let l = extents[d] as isize;
                idx = idx * extents[d] + coord[d].rem_euclid(l) as usize;
            }
            idx
        };

        let mut source = Vec::with_capacity(num_sites * ntypes);
        let mut target = Vec::with_capacity(num_sites * ntypes);
        let mut bond_type = Vec::with_capacity(num_sites * ntypes);
        let mut coord = vec![0isize; dim];
        for s in 0..num_sites {
            let mut rem = s;
            for d in 0..dim {
                coord[d] = (rem % extents[d]) as isize;
                rem /= extents[d];
            }
            for (t, disp) in disps.iter().enumerate() {
                let shifted: Vec<isize> =
                    coord.iter().zip(disp.iter()).map(|(&c, &d)| c + d).collect();
                source.push(s);
                target.push(site_of(&shifted));
                bond_type.push(t);
            }
        }

        let mut bonds_per_type = vec![0usize; ntypes];
        for &t in &bond_type {
            bonds_per_type[t] += 1;
        }

        let mut neighbors = Array2::zeros((num_sites, coordination));
        let mut neighbor_types = Array2::zeros((num_sites, coordination));
        let mut fill = vec![0usize; num_sites];
        for b in 0..source.len() {
            let (i, j) = (source[b], target[b]);
            neighbors[(i, fill[i])] = j;
            neighbor_types[(i, fill[i])] = bond_type[b];
            fill[i] += 1;
            neighbors[(j, fill[j])] = i;
            neighbor_types[(j, fill[j])] = bond_type[b];
            fill[j] += 1;
        }
        debug_assert!(fill.iter().all(|&f| f == coordination));

        // Sublattice parity where the lattice is bipartite; a single
        // site type otherwise.
        let bipartite = kind != "triangular" && extents.iter().all(|&l| l % 2 == 0);
        let mut site_type = vec![0usize; num_sites];
        if bipartite {
            for (s, st) in site_type.iter_mut().enumerate() {
                let mut rem = s;
                let mut parity = 0;
                for d in 0..dim {
                    parity += rem % extents[d];
                    rem /= extents[d];
                }
                *st = parity % 2;
            }
        }

        Lattice {
            dim,
            extents,
            num_sites,
            source,
            target,
            bond_type,
            bonds_per_type,
            site_type,
            bipartite,
            neighbors,
            neighbor_types,
        }
    }

    pub fn chain(l: usize) -> Lattice {
        Lattice::build("chain", vec![l])
    }

    pub fn square(l: usize, w: usize) -> Lattice {
        Lattice::build("square", vec![l, w])
    }

    pub fn triangular(l: usize, w: usize) -> Lattice {
        Lattice::build("triangular", vec![l, w])
    }

    pub fn cubic(l: usize, w: usize, h: usize) -> Lattice {
        Lattice::build("cubic", vec![l, w, h])
    }

    pub fn from_params(params: &Parameter) -> Result<Lattice> {
        let kind = params.tag("Lattice")?;
        let l = params.extent("L")?;
        match kind {
            "chain" => Ok(Lattice::chain(l)),
            "square" | "triangular" => {
                let w = if params.contains("W") { params.extent("W")? } else { l };
                Ok(if kind == "square" {
                    Lattice::square(l, w)
                } else {
                    Lattice::triangular(l, w)
                })
            }
            "cubic" => {
                let w = if params.contains("W") { params.extent("W")? } else { l };
                let h = if params.contains("H") { params.extent("H")? } else { l };
                Ok(Lattice::cubic(l, w, h))
            }
            other => Err(Error::invalid(format!("unknown lattice \"{}\"", other))),
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn extents(&self) -> &[usize] {
        &self.extents
    }

    pub fn num_sites(&self) -> usize {
        self.num_sites
    }

    pub fn num_bonds(&self) -> usize {
        self.source.len()
    }

    pub fn num_bond_types(&self) -> usize {
        self.bonds_per_type.len()
    }

    pub fn num_bonds_of_type(&self, t: usize) -> usize {
        self.bonds_per_type[t]
    }

    pub fn bond(&self, b: usize) -> (usize, usize) {
        (self.source[b], self.target[b])
    }

    pub fn bond_type(&self, b: usize) -> usize {
        self.bond_type[b]
    }

    pub fn site_type(&self, s: usize) -> usize {
        self.site_type[s]
    }

    pub fn coordination(&self) -> usize {
        self.neighbors.ncols()
    }

    pub fn is_bipartite(&self) -> bool {
        self.bipartite
    }

    pub fn num_site_types(&self) -> usize {
        if self.bipartite {
            2
        } else {
            1
        }
    }

    pub fn neighbors(&self, s: usize) -> impl Iterator<Item = usize> + '_ {
        self.neighbors.row(s).into_iter().copied()
    }

    /// `(neighbor, bond_type)` pairs for one site.
    pub fn neighbors_with_type(&self, s: usize) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.neighbors
            .row(s)
            .into_iter()
            .copied()
            .zip(self.neighbor_types.row(s).into_iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_counts() {
        let lat = Lattice::square(4, 4);
        assert_eq!(lat.num_sites(), 16);
        assert_eq!(lat.num_bonds(), 32);
        assert_eq!(lat.num_bond_types(), 2);
        assert_eq!(lat.num_bonds_of_type(0), 16);
        assert_eq!(lat.coordination(), 4);
    }

    #[test]
    fn triangular_counts() {
        let lat = Lattice::triangular(3, 5);
        assert_eq!(lat.num_bonds(), 3 * 15);
        assert_eq!(lat.coordination(), 6);
    }

    #[test]
    fn chain_wraps() {
        let lat = Lattice::chain(5);
        assert_eq!(lat.bond(4), (4, 0));
    }

    #[test]
    fn bonds_and_neighbors_agree() {
        let lat = Lattice::cubic(2, 3, 2);
        for b in 0..lat.num_bonds() {
            let (i, j) = lat.bond(b);
            assert!(i < lat.num_sites() && j < lat.num_sites());
            assert!(lat.neighbors(i).any(|n| n == j));
            assert!(lat.neighbors(j).any(|n| n == i));
        }
    }

    #[test]
    fn square_is_bipartite() {
        let lat = Lattice::square(4, 4);
        for b in 0..lat.num_bonds() {
            let (i, j) = lat.bond(b);
            assert_ne!(lat.site_type(i), lat.site_type(j));
        }
    }
}
