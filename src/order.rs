use std::str::FromStr;

use rand::{Rng, seq::SliceRandom};

use crate::foundation::{
    core::Point,
    error::{DotlinkError, DotlinkResult},
};

/// Policy that decides the order in which dots are connected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionMode {
    /// Sample order: `0, 1, ..., N-1`.
    #[default]
    Sequential,
    /// Greedy nearest-neighbor walk from a random start.
    Path,
    /// Uniform random permutation.
    Random,
}

impl ConnectionMode {
    pub const ALL: [ConnectionMode; 3] = [Self::Sequential, Self::Path, Self::Random];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Path => "path",
            Self::Random => "random",
        }
    }

    /// Lenient parse: unknown names become [`ConnectionMode::Sequential`].
    pub fn parse_or_sequential(s: &str) -> Self {
        s.parse().unwrap_or_else(|_| {
            tracing::warn!(mode = s, "unknown connection mode, using sequential");
            Self::Sequential
        })
    }
}

impl FromStr for ConnectionMode {
    type Err = DotlinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(Self::Sequential),
            "path" => Ok(Self::Path),
            "random" => Ok(Self::Random),
            other => Err(DotlinkError::validation(format!(
                "unknown connection mode '{other}' (expected sequential, path or random)"
            ))),
        }
    }
}

impl std::fmt::Display for ConnectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Permutation of point indices giving the connection sequence.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub struct VisitOrder(Vec<usize>);

impl VisitOrder {
    pub fn identity(n: usize) -> Self {
        Self((0..n).collect())
    }

    /// Validate that `order` is a permutation of `0..order.len()`.
    pub fn new(order: Vec<usize>) -> DotlinkResult<Self> {
        let mut seen = vec![false; order.len()];
        for &i in &order {
            match seen.get_mut(i) {
                Some(slot) if !*slot => *slot = true,
                Some(_) => {
                    return Err(DotlinkError::validation(format!(
                        "visit order repeats index {i}"
                    )));
                }
                None => {
                    return Err(DotlinkError::validation(format!(
                        "visit order index {i} is out of range for {} points",
                        order.len()
                    )));
                }
            }
        }
        Ok(Self(order))
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 1-based visiting rank of every point, indexed by point.
    pub fn ranks(&self) -> Vec<usize> {
        let mut ranks = vec![0; self.0.len()];
        for (pos, &i) in self.0.iter().enumerate() {
            ranks[i] = pos + 1;
        }
        ranks
    }

    /// Connection `k` as `(from, to)` point indices.
    pub fn connection(&self, k: usize) -> Option<(usize, usize)> {
        Some((*self.0.get(k)?, *self.0.get(k + 1)?))
    }

    pub fn connections(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.0.windows(2).map(|w| (w[0], w[1]))
    }

    pub fn connection_count(&self) -> usize {
        self.0.len().saturating_sub(1)
    }
}

impl TryFrom<Vec<usize>> for VisitOrder {
    type Error = DotlinkError;

    fn try_from(v: Vec<usize>) -> Result<Self, Self::Error> {
        Self::new(v)
    }
}

impl From<VisitOrder> for Vec<usize> {
    fn from(o: VisitOrder) -> Self {
        o.0
    }
}

/// Compute the visit order for `points` under `mode`.
pub fn order_points<R: Rng + ?Sized>(
    points: &[Point],
    mode: ConnectionMode,
    rng: &mut R,
) -> VisitOrder {
    let n = points.len();
    match mode {
        ConnectionMode::Sequential => VisitOrder::identity(n),
        ConnectionMode::Random => {
            let mut order: Vec<usize> = (0..n).collect();
            order.shuffle(rng);
            VisitOrder(order)
        }
        ConnectionMode::Path => {
            if n <= 1 {
                return VisitOrder::identity(n);
            }
            let start = rng.random_range(0..n);
            nearest_neighbor_path(points, start)
        }
    }
}

/// Greedy walk from `start`, always stepping to the closest unvisited point.
///
/// Ties go to the lowest index. `start` is clamped into range.
pub fn nearest_neighbor_path(points: &[Point], start: usize) -> VisitOrder {
    let n = points.len();
    if n <= 1 {
        return VisitOrder::identity(n);
    }

    let mut visited = vec![false; n];
    let mut order = Vec::with_capacity(n);
    let mut current = start.min(n - 1);
    visited[current] = true;
    order.push(current);

    while order.len() < n {
        let mut best: Option<(usize, i64)> = None;
        for (i, p) in points.iter().enumerate() {
            if visited[i] {
                continue;
            }
            let d = p.distance_sq(points[current]);
            if best.is_none_or(|(_, bd)| d < bd) {
                best = Some((i, d));
            }
        }
        let Some((next, _)) = best else { break };
        visited[next] = true;
        order.push(next);
        current = next;
    }

    VisitOrder(order)
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn pts(raw: &[(i32, i32)]) -> Vec<Point> {
        raw.iter().copied().map(Point::from).collect()
    }

    #[test]
    fn parse_is_strict_and_case_insensitive() {
        assert_eq!("Path".parse::<ConnectionMode>().unwrap(), ConnectionMode::Path);
        assert!("zigzag".parse::<ConnectionMode>().is_err());
        assert_eq!(
            ConnectionMode::parse_or_sequential("zigzag"),
            ConnectionMode::Sequential
        );
    }

    #[test]
    fn ranks_invert_the_order() {
        let o = VisitOrder::new(vec![2, 0, 1]).unwrap();
        assert_eq!(o.ranks(), vec![2, 3, 1]);
        assert_eq!(o.connections().collect::<Vec<_>>(), vec![(2, 0), (0, 1)]);
        assert_eq!(o.connection(1), Some((0, 1)));
        assert_eq!(o.connection(2), None);
    }

    #[test]
    fn non_permutations_are_rejected() {
        assert!(VisitOrder::new(vec![0, 0, 1]).is_err());
        assert!(VisitOrder::new(vec![0, 3, 1]).is_err());
        assert!(serde_json::from_str::<VisitOrder>("[1, 1]").is_err());
    }

    #[test]
    fn nearest_neighbor_breaks_ties_by_lowest_index() {
        // 1 and 2 are both 10px from 0.
        let p = pts(&[(0, 0), (10, 0), (0, 10)]);
        assert_eq!(nearest_neighbor_path(&p, 0).as_slice(), &[0, 1, 2]);
    }

    #[test]
    fn trivial_sets_keep_trivial_order() {
        let mut rng = StdRng::seed_from_u64(0);
        for mode in ConnectionMode::ALL {
            assert!(order_points(&[], mode, &mut rng).is_empty());
            let one = pts(&[(5, 5)]);
            assert_eq!(order_points(&one, mode, &mut rng).as_slice(), &[0]);
        }
    }
}
