//! Residual dense network mapping a GKZ feature vector to a scalar
//! log-volume estimate.
//!
//! Architecture: input projection to the hidden width, ReLU, `depth`
//! residual layers `y = relu(x + alpha * (W x + b))` with a learned scalar
//! gate `alpha` per layer (zero at initialization, so every residual layer
//! starts as the identity), then an output projection to one scalar.
//!
//! Only construction and the forward transform live here; training is out
//! of scope. `forward`/`forward_batch` run in inference mode (dropout off);
//! `forward_train` applies inverted dropout with a caller-supplied RNG.

use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn relu(v: f64) -> f64 {
    v.max(0.0)
}

/// Plain affine layer; weights and biases start uniform in `±1/sqrt(fan_in)`.
#[derive(Clone, Debug)]
struct Dense {
    weight: DMatrix<f64>,
    bias: DVector<f64>,
}

impl Dense {
    fn new(in_dim: usize, out_dim: usize, rng: &mut StdRng) -> Self {
        let bound = 1.0 / (in_dim.max(1) as f64).sqrt();
        Self {
            weight: DMatrix::from_fn(out_dim, in_dim, |_, _| rng.gen_range(-bound..=bound)),
            bias: DVector::from_fn(out_dim, |_, _| rng.gen_range(-bound..=bound)),
        }
    }

    fn forward(&self, x: &DVector<f64>) -> DVector<f64> {
        &self.weight * x + &self.bias
    }
}

/// One gated residual layer.
#[derive(Clone, Debug)]
struct ResDenseLayer {
    dense: Dense,
    alpha: f64,
    dropout: f64,
}

impl ResDenseLayer {
    fn new(width: usize, dropout: f64, rng: &mut StdRng) -> Self {
        Self {
            dense: Dense::new(width, width, rng),
            // Zero gate: the residual branch contributes nothing at init.
            alpha: 0.0,
            dropout,
        }
    }

    fn forward(&self, x: &DVector<f64>) -> DVector<f64> {
        let y = self.dense.forward(x) * self.alpha;
        (x + y).map(relu)
    }

    fn forward_train(&self, x: &DVector<f64>, rng: &mut StdRng) -> DVector<f64> {
        let mut y = self.dense.forward(x) * self.alpha;
        if self.dropout > 0.0 {
            let keep = 1.0 - self.dropout;
            for v in y.iter_mut() {
                *v = if rng.gen::<f64>() < keep {
                    *v / keep
                } else {
                    0.0
                };
            }
        }
        (x + y).map(relu)
    }
}

/// Residual multilayer perceptron with a scalar output.
#[derive(Clone, Debug)]
pub struct ResDenseNet {
    dense_first: Dense,
    layers: Vec<ResDenseLayer>,
    dense_last: Dense,
    input_size: usize,
    width: usize,
}

impl ResDenseNet {
    /// Build a network with freshly initialized weights from `seed`.
    pub fn new(input_size: usize, width: usize, depth: usize, dropout: f64, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let dense_first = Dense::new(input_size, width, &mut rng);
        let layers = (0..depth)
            .map(|_| ResDenseLayer::new(width, dropout, &mut rng))
            .collect();
        let dense_last = Dense::new(width, 1, &mut rng);
        Self {
            dense_first,
            layers,
            dense_last,
            input_size,
            width,
        }
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    /// Scalar prediction for one feature vector (inference mode).
    pub fn forward(&self, x: &DVector<f64>) -> f64 {
        let mut h = self.dense_first.forward(x).map(relu);
        for layer in &self.layers {
            h = layer.forward(&h);
        }
        self.dense_last.forward(&h)[0]
    }

    /// Scalar prediction with dropout active, for a training harness.
    pub fn forward_train(&self, x: &DVector<f64>, rng: &mut StdRng) -> f64 {
        let mut h = self.dense_first.forward(x).map(relu);
        for layer in &self.layers {
            h = layer.forward_train(&h, rng);
        }
        self.dense_last.forward(&h)[0]
    }

    /// Predictions for a batch (rows are samples).
    pub fn forward_batch(&self, x: &DMatrix<f64>) -> DVector<f64> {
        DVector::from_fn(x.nrows(), |r, _| {
            self.forward(&DVector::from_iterator(
                x.ncols(),
                x.row(r).iter().copied(),
            ))
        })
    }
}
