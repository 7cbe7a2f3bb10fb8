//! Composable noise nodes.
//!
//! Every node implements the `noise` crate's [`NoiseFn`] over 3D points and is
//! immutable once built, so a finished graph can be evaluated from many
//! threads at once. Composite operators own their children as [`NoiseNode`]s.

pub mod coherent;
pub mod fractal;
pub mod operators;
pub mod simplex;
pub mod voronoi;

use noise::NoiseFn;

pub use coherent::NoiseQuality;
pub use fractal::{Billow, FractalNoiseConfig, NoiseType, Perlin, RidgedMultifractal};
pub use operators::{Clamp, Constant, Curve, Invert, Rotate, ScaleBias, Select, Translate};
pub use simplex::{PermutationTable, Simplex, SimplexConfig};
pub use voronoi::{Voronoi, VoronoiConfig};

/// An owned, thread-shareable node in a noise graph.
pub type NoiseNode = Box<dyn NoiseFn<f64, 3> + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composed_graph_is_shareable_across_threads() {
        let graph: NoiseNode = Box::new(
            Clamp::new(
                -0.5,
                0.5,
                Box::new(ScaleBias::new(
                    2.0,
                    0.1,
                    Box::new(Rotate::new(10.0, 20.0, 30.0, Box::new(Perlin::default()))),
                )),
            )
            .unwrap(),
        );
        let graph = std::sync::Arc::new(graph);
        let points: Vec<[f64; 3]> = (0..64).map(|i| [i as f64 * 0.03, 0.4, -0.2]).collect();
        let expected: Vec<f64> = points.iter().map(|&p| graph.get(p)).collect();

        std::thread::scope(|s| {
            for _ in 0..4 {
                let graph = graph.clone();
                let points = &points;
                let expected = &expected;
                s.spawn(move || {
                    for (p, e) in points.iter().zip(expected) {
                        assert_eq!(graph.get(*p), *e, "concurrent evaluation diverged at {p:?}");
                    }
                });
            }
        });
        assert!(expected.iter().all(|v| (-0.5..=0.5).contains(v)));
    }
}
