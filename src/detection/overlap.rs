use crate::models::Circle;

/// Minimum center distance for two circles to count as distinct cells.
pub fn min_separation(a: &Circle, b: &Circle, factor: f32) -> f32 {
    (a.radius + b.radius) * factor
}

fn overlaps_any(candidate: &Circle, kept: &[Circle], factor: f32) -> bool {
    kept.iter()
        .any(|k| candidate.distance_to(k) <= min_separation(candidate, k, factor))
}

/// Greedy suppression: walk candidates strongest first and keep each one that
/// does not overlap a circle already kept.
pub fn resolve(circles: Vec<Circle>, factor: f32) -> Vec<Circle> {
    resolve_against(&[], circles, factor)
}

/// Like [`resolve`], but `seeds` are treated as already kept: candidates
/// overlapping a seed are dropped. Seeds are not part of the output.
pub fn resolve_against(seeds: &[Circle], circles: Vec<Circle>, factor: f32) -> Vec<Circle> {
    let mut circles = circles;
    circles.sort_by(Circle::rank);

    let mut kept: Vec<Circle> = seeds.to_vec();
    let mut accepted = Vec::new();
    for circle in circles {
        if overlaps_any(&circle, &kept, factor) {
            continue;
        }
        kept.push(circle);
        accepted.push(circle);
    }
    accepted
}

/// Resolve both classes. Infected circles are resolved first and then
/// suppress any overlapping normal circle, so one physical cell is never
/// counted twice.
pub fn resolve_classes(
    infected: Vec<Circle>,
    normal: Vec<Circle>,
    factor: f32,
) -> (Vec<Circle>, Vec<Circle>) {
    let infected = resolve(infected, factor);
    let normal = resolve_against(&infected, normal, factor);
    (infected, normal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CellClass;

    fn circle(x: f32, y: f32, radius: f32, score: f32, class: CellClass) -> Circle {
        Circle {
            x,
            y,
            radius,
            class,
            score,
        }
    }

    #[test]
    fn test_keeps_strongest_of_overlapping_pair() {
        let circles = vec![
            circle(100.0, 100.0, 75.0, 0.6, CellClass::Normal),
            circle(120.0, 100.0, 75.0, 0.7, CellClass::Normal),
        ];
        let kept = resolve(circles, 0.5);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].x, 120.0);
    }

    #[test]
    fn test_distant_circles_survive_in_rank_order() {
        let circles = vec![
            circle(0.0, 0.0, 10.0, 0.4, CellClass::Normal),
            circle(100.0, 0.0, 10.0, 0.9, CellClass::Normal),
            circle(0.0, 100.0, 10.0, 0.4, CellClass::Normal),
        ];
        let kept = resolve(circles, 0.5);
        assert_eq!(kept.len(), 3);
        assert_eq!(kept[0].score, 0.9);
        assert_eq!((kept[1].x, kept[1].y), (0.0, 0.0));
        assert_eq!((kept[2].x, kept[2].y), (0.0, 100.0));
    }

    #[test]
    fn test_output_respects_min_separation() {
        let mut circles = Vec::new();
        for i in 0..12 {
            for j in 0..12 {
                let score = ((i * 7 + j * 3) % 11) as f32 / 10.0;
                let (x, y) = (i as f32 * 6.0, j as f32 * 6.0);
                circles.push(circle(x, y, 8.0, score, CellClass::Normal));
            }
        }
        let factor = 0.75;
        let kept = resolve(circles, factor);
        assert!(!kept.is_empty());
        for (i, a) in kept.iter().enumerate() {
            for b in &kept[i + 1..] {
                assert!(a.distance_to(b) > min_separation(a, b, factor));
            }
        }
    }

    #[test]
    fn test_infected_suppresses_overlapping_normal() {
        let infected = vec![circle(50.0, 50.0, 20.0, 0.4, CellClass::Infected)];
        let normal = vec![
            circle(52.0, 50.0, 22.0, 0.95, CellClass::Normal),
            circle(150.0, 50.0, 22.0, 0.8, CellClass::Normal),
        ];
        let (infected, normal) = resolve_classes(infected, normal, 0.5);
        assert_eq!(infected.len(), 1);
        assert_eq!(normal.len(), 1);
        assert_eq!(normal[0].x, 150.0);
    }

    #[test]
    fn test_empty_input() {
        assert!(resolve(Vec::new(), 0.5).is_empty());
        let (i, n) = resolve_classes(Vec::new(), Vec::new(), 0.5);
        assert!(i.is_empty() && n.is_empty());
    }
}
