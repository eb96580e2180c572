//! Geometry cleaning for the transmission line layer.
//!
//! The service publishes lines as fragmented multi-part geometries whose
//! parts are unordered and often overlap. These routines reassemble them
//! into continuous polylines. Distance thresholds assume projected metre
//! coordinates.

use super::{Coord, Feature, Geometry};

pub const SIMPLIFY_TOLERANCE: f64 = 100.0;
pub const SEGMENT_LENGTH: f64 = 500.0;
pub const GAP_THRESHOLD: f64 = 1000.0;
pub const MERGE_TOLERANCE: f64 = 100.0;

const ENDPOINT_EPS: f64 = 1e-9;

pub fn dist(a: Coord, b: Coord) -> f64 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt()
}

fn close(a: Coord, b: Coord) -> bool {
    dist(a, b) < ENDPOINT_EPS
}

/// The point furthest from its closest neighbour. On the envelope
/// boundary of a line geometry this is a good guess for a true endpoint.
pub fn furthest_closest_point(points: &[Coord]) -> Option<Coord> {
    match points {
        [] => None,
        [only] => Some(*only),
        _ => {
            let mut best = points[0];
            let mut best_d = f64::NEG_INFINITY;
            for p in points {
                let nearest = points
                    .iter()
                    .filter(|q| **q != *p)
                    .map(|q| dist(*p, *q))
                    .fold(f64::INFINITY, f64::min);
                if nearest.is_finite() && nearest > best_d {
                    best_d = nearest;
                    best = *p;
                }
            }
            Some(best)
        }
    }
}

fn closest_point_on_segment(p: Coord, a: Coord, b: Coord) -> Coord {
    let [dx, dy] = [b[0] - a[0], b[1] - a[1]];
    let len2 = dx * dx + dy * dy;
    if len2 == 0.0 {
        return a;
    }
    let t = (((p[0] - a[0]) * dx + (p[1] - a[1]) * dy) / len2).clamp(0.0, 1.0);
    [a[0] + t * dx, a[1] + t * dy]
}

pub fn point_line_distance(p: Coord, line: &[Coord]) -> f64 {
    if line.len() < 2 {
        return line.first().map_or(f64::INFINITY, |only| dist(p, *only));
    }
    line.windows(2)
        .map(|seg| dist(p, closest_point_on_segment(p, seg[0], seg[1])))
        .fold(f64::INFINITY, f64::min)
}

/// Minimum distance between two polylines.
pub fn line_distance(a: &[Coord], b: &[Coord]) -> f64 {
    let forward = a
        .iter()
        .map(|p| point_line_distance(*p, b))
        .fold(f64::INFINITY, f64::min);
    let backward = b
        .iter()
        .map(|p| point_line_distance(*p, a))
        .fold(f64::INFINITY, f64::min);
    forward.min(backward)
}

/// Vertex pair with the smallest separation between two polylines,
/// returned as (index in `a`, index in `b`, distance).
fn nearest_vertices(a: &[Coord], b: &[Coord]) -> (usize, usize, f64) {
    let mut best = (0, 0, f64::INFINITY);
    for (i, p) in a.iter().enumerate() {
        for (j, q) in b.iter().enumerate() {
            let d = dist(*p, *q);
            if d < best.2 {
                best = (i, j, d);
            }
        }
    }
    best
}

/// Douglas-Peucker simplification.
pub fn simplify(line: &[Coord], tolerance: f64) -> Vec<Coord> {
    if line.len() < 3 {
        return line.to_vec();
    }
    let last = line.len() - 1;
    let mut index = 0;
    let mut max = 0.0f64;
    for (i, p) in line.iter().enumerate().take(last).skip(1) {
        let d = dist(*p, closest_point_on_segment(*p, line[0], line[last]));
        if d > max {
            max = d;
            index = i;
        }
    }
    if max <= tolerance {
        return vec![line[0], line[last]];
    }
    let mut left = simplify(&line[..=index], tolerance);
    let right = simplify(&line[index..], tolerance);
    left.pop();
    left.extend(right);
    left
}

/// Inserts evenly spaced points so no segment exceeds `max_length`.
pub fn densify(line: &[Coord], max_length: f64) -> Vec<Coord> {
    let mut out = Vec::with_capacity(line.len());
    for seg in line.windows(2) {
        let (a, b) = (seg[0], seg[1]);
        out.push(a);
        let d = dist(a, b);
        if d > max_length {
            let pieces = (d / max_length).ceil() as usize;
            for k in 1..pieces {
                let t = k as f64 / pieces as f64;
                out.push([a[0] + (b[0] - a[0]) * t, a[1] + (b[1] - a[1]) * t]);
            }
        }
    }
    if let Some(last) = line.last() {
        out.push(*last);
    }
    out
}

/// Joins polylines that share endpoints into longer polylines, reversing
/// parts as needed.
pub fn line_merge(mut parts: Vec<Vec<Coord>>) -> Vec<Vec<Coord>> {
    parts.retain(|p| p.len() >= 2);
    let mut merged: Vec<Vec<Coord>> = Vec::new();
    while let Some(mut part) = parts.pop() {
        let mut changed = true;
        while changed {
            changed = false;
            let mut i = 0;
            while i < parts.len() {
                let (head, tail) = (part[0], part[part.len() - 1]);
                let other_head = parts[i][0];
                let other_tail = parts[i][parts[i].len() - 1];
                if close(tail, other_head) {
                    let other = parts.remove(i);
                    part.extend(other.into_iter().skip(1));
                    changed = true;
                } else if close(tail, other_tail) {
                    let other = parts.remove(i);
                    part.extend(other.into_iter().rev().skip(1));
                    changed = true;
                } else if close(head, other_tail) {
                    let mut other = parts.remove(i);
                    other.extend(part.into_iter().skip(1));
                    part = other;
                    changed = true;
                } else if close(head, other_head) {
                    let other = parts.remove(i);
                    let mut flipped: Vec<Coord> = other.into_iter().rev().collect();
                    flipped.extend(part.into_iter().skip(1));
                    part = flipped;
                    changed = true;
                } else {
                    i += 1;
                }
            }
        }
        merged.push(part);
    }
    merged
}

fn geometry_parts(geom: &Geometry) -> Vec<Vec<Coord>> {
    match geom {
        Geometry::Point(p) => vec![vec![*p]],
        Geometry::Line(line) => vec![line.clone()],
        Geometry::MultiLine(parts) => parts.clone(),
    }
}

fn parts_to_geometry(mut parts: Vec<Vec<Coord>>) -> Geometry {
    if parts.len() == 1 {
        Geometry::Line(parts.remove(0))
    } else {
        Geometry::MultiLine(parts)
    }
}

/// Approximates a single traversal through all points of a line geometry.
///
/// Simplifies, picks a starting endpoint from the envelope boundary,
/// densifies, then walks greedily to the nearest remaining point. A jump
/// longer than [`GAP_THRESHOLD`] means the walk ran off a branch; the
/// line is cut there and restarted from the closest point already walked.
pub fn force_line(geom: &Geometry) -> Geometry {
    if let Geometry::Point(_) = geom {
        return geom.clone();
    }
    let parts: Vec<Vec<Coord>> = geometry_parts(geom)
        .iter()
        .map(|p| simplify(p, SIMPLIFY_TOLERANCE))
        .collect();
    let base_points: Vec<Coord> = parts.iter().flatten().copied().collect();
    if base_points.len() < 2 {
        return geom.clone();
    }

    let (min_x, max_x, min_y, max_y) = bounds(&base_points);
    let on_boundary: Vec<Coord> = base_points
        .iter()
        .copied()
        .filter(|p| {
            p[0] - min_x < ENDPOINT_EPS
                || max_x - p[0] < ENDPOINT_EPS
                || p[1] - min_y < ENDPOINT_EPS
                || max_y - p[1] < ENDPOINT_EPS
        })
        .collect();
    let Some(start) = furthest_closest_point(&on_boundary).or(base_points.first().copied())
    else {
        return geom.clone();
    };

    let mut remaining: Vec<Coord> = parts
        .iter()
        .flat_map(|p| densify(p, SEGMENT_LENGTH))
        .collect();
    sort_by_distance_to(&mut remaining, start);

    let mut lines: Vec<Vec<Coord>> = Vec::new();
    let mut line: Vec<Coord> = Vec::new();
    let mut last = start;
    while !remaining.is_empty() {
        let next = pop_closest(&mut remaining, last);
        match line.last().copied() {
            Some(tail) if dist(next, tail) > GAP_THRESHOLD => {
                // the walk ran off a branch; cut here and restart from
                // the walked point closest to the jump target
                let anchor = line
                    .iter()
                    .copied()
                    .min_by(|a, b| dist(*a, next).total_cmp(&dist(*b, next)))
                    .unwrap_or(tail);
                lines.push(std::mem::take(&mut line));
                line.push(anchor);
                line.push(next);
            }
            _ => line.push(next),
        }
        last = next;
    }
    if line.len() >= 2 {
        lines.push(line);
    }

    let merged: Vec<Vec<Coord>> = line_merge(lines)
        .into_iter()
        .map(|l| simplify(&l, SIMPLIFY_TOLERANCE))
        .collect();
    parts_to_geometry(merged)
}

fn bounds(points: &[Coord]) -> (f64, f64, f64, f64) {
    let mut min_x = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for p in points {
        min_x = min_x.min(p[0]);
        max_x = max_x.max(p[0]);
        min_y = min_y.min(p[1]);
        max_y = max_y.max(p[1]);
    }
    (min_x, max_x, min_y, max_y)
}

fn sort_by_distance_to(points: &mut [Coord], origin: Coord) {
    points.sort_by(|a, b| dist(*a, origin).total_cmp(&dist(*b, origin)));
}

fn pop_closest(points: &mut Vec<Coord>, origin: Coord) -> Coord {
    let mut best = 0;
    for i in 1..points.len() {
        if dist(points[i], origin) < dist(points[best], origin) {
            best = i;
        }
    }
    points.remove(best)
}

/// Makes a fragmented multi-line contiguous by bridging sub-lines that
/// come within `tolerance` of each other. Parts further apart than the
/// tolerance are left as separate lines.
pub fn make_continuous(geom: &Geometry, tolerance: f64) -> Geometry {
    let Geometry::MultiLine(raw_parts) = geom else {
        return geom.clone();
    };
    let mut parts = line_merge(raw_parts.clone());
    if parts.len() <= 1 {
        return parts_to_geometry(parts);
    }
    parts = parts
        .into_iter()
        .map(|p| simplify(&p, tolerance))
        .collect();

    let mut output: Vec<Vec<Coord>> = Vec::new();
    let mut group: Vec<Vec<Coord>> = vec![parts.remove(0)];
    while !parts.is_empty() {
        let mut best = 0;
        let mut best_d = f64::INFINITY;
        for (i, candidate) in parts.iter().enumerate() {
            let d = group
                .iter()
                .map(|member| line_distance(member, candidate))
                .fold(f64::INFINITY, f64::min);
            if d < best_d {
                best_d = d;
                best = i;
            }
        }
        let candidate = parts.remove(best);
        if best_d < tolerance {
            bridge(&mut group, candidate);
        } else {
            output.append(&mut group);
            group.push(candidate);
        }
    }
    output.append(&mut group);
    parts_to_geometry(output)
}

/// Joins `candidate` onto the group by splitting the nearest member at
/// its nearest vertex and adding the shortest connecting segment, so a
/// line merge closes the whole group back up.
fn bridge(group: &mut Vec<Vec<Coord>>, candidate: Vec<Coord>) {
    let mut member_idx = 0;
    let mut at = (0, 0, f64::INFINITY);
    for (m, member) in group.iter().enumerate() {
        let found = nearest_vertices(member, &candidate);
        if found.2 < at.2 {
            member_idx = m;
            at = found;
        }
    }
    let (i, j, gap) = at;
    let member = group.remove(member_idx);
    let junction = member[i];
    if i > 0 {
        group.push(member[..=i].to_vec());
    }
    if i < member.len() - 1 {
        group.push(member[i..].to_vec());
    }
    if gap > ENDPOINT_EPS {
        group.push(vec![junction, candidate[j]]);
    }
    if j > 0 {
        group.push(candidate[..=j].to_vec());
    }
    if j < candidate.len() - 1 {
        group.push(candidate[j..].to_vec());
    }
    let rejoined = line_merge(std::mem::take(group));
    *group = rejoined;
}

/// Multi-part geometries are forced into a single traversal and merged;
/// plain lines pass through.
pub fn clean_multilines(geom: &Geometry) -> Geometry {
    match geom {
        Geometry::MultiLine(_) => match force_line(geom) {
            Geometry::MultiLine(parts) => parts_to_geometry(line_merge(parts)),
            other => other,
        },
        other => other.clone(),
    }
}

/// Per-record cleanup of the transmission line layer: merge shared
/// endpoints, bridge near-touching fragments, then force one traversal.
pub fn clean_transmission_lines(features: Vec<Feature>) -> Vec<Feature> {
    features
        .into_iter()
        .map(|mut feature| {
            let merged = match &feature.geometry {
                Geometry::MultiLine(parts) => parts_to_geometry(line_merge(parts.clone())),
                other => other.clone(),
            };
            let continuous = make_continuous(&merged, MERGE_TOLERANCE);
            feature.geometry = clean_multilines(&continuous);
            feature
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn furthest_point_prefers_the_isolated_end() {
        let cases: [(&[Coord], Coord); 2] = [
            (&[[0.0, 0.0], [0.0, 1.0]], [0.0, 0.0]),
            (&[[0.0, 0.0], [0.0, 1.0], [2.0, 2.0]], [2.0, 2.0]),
        ];
        for (points, expected) in cases {
            assert_eq!(furthest_closest_point(points), Some(expected));
        }
    }

    #[test]
    fn simplify_drops_points_near_the_chord() {
        let line = vec![
            [0.0, 0.0],
            [500.0, 10.0],
            [1000.0, 0.0],
            [1500.0, 2000.0],
        ];
        let simplified = simplify(&line, 100.0);
        assert_eq!(
            simplified,
            vec![[0.0, 0.0], [1000.0, 0.0], [1500.0, 2000.0]]
        );
    }

    #[test]
    fn densify_bounds_segment_lengths() {
        let line = vec![[0.0, 0.0], [2000.0, 0.0]];
        let dense = densify(&line, 500.0);
        assert_eq!(dense.first(), Some(&[0.0, 0.0]));
        assert_eq!(dense.last(), Some(&[2000.0, 0.0]));
        for seg in dense.windows(2) {
            assert!(dist(seg[0], seg[1]) <= 500.0 + 1e-9);
        }
    }

    #[test]
    fn line_merge_joins_shared_endpoints() {
        let parts = vec![
            vec![[0.0, 0.0], [1000.0, 0.0]],
            vec![[2000.0, 0.0], [1000.0, 0.0]],
            vec![[5000.0, 5000.0], [6000.0, 5000.0]],
        ];
        let merged = line_merge(parts);
        assert_eq!(merged.len(), 2);
        let longest = merged.iter().max_by_key(|l| l.len()).unwrap();
        assert_eq!(longest.len(), 3);
    }

    #[test]
    fn force_line_reorders_shuffled_fragments() {
        // three fragments of one straight east-west line, out of order
        let geom = Geometry::MultiLine(vec![
            vec![[4000.0, 0.0], [6000.0, 0.0]],
            vec![[0.0, 0.0], [2000.0, 0.0]],
            vec![[2000.0, 0.0], [4000.0, 0.0]],
        ]);
        let Geometry::Line(line) = force_line(&geom) else {
            panic!("expected a single line");
        };
        // endpoints survive, traversal direction is not fixed
        let ends = [line.first().copied(), line.last().copied()];
        assert!(ends.contains(&Some([0.0, 0.0])));
        assert!(ends.contains(&Some([6000.0, 0.0])));
    }

    #[test]
    fn make_continuous_bridges_small_gaps_only() {
        let nearby = Geometry::MultiLine(vec![
            vec![[0.0, 0.0], [1000.0, 0.0]],
            vec![[1050.0, 0.0], [2000.0, 0.0]],
        ]);
        assert!(matches!(
            make_continuous(&nearby, MERGE_TOLERANCE),
            Geometry::Line(_)
        ));

        let distant = Geometry::MultiLine(vec![
            vec![[0.0, 0.0], [1000.0, 0.0]],
            vec![[9000.0, 0.0], [9900.0, 0.0]],
        ]);
        assert!(matches!(
            make_continuous(&distant, MERGE_TOLERANCE),
            Geometry::MultiLine(_)
        ));
    }
}
