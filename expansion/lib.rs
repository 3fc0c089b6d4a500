#![deny(dead_code)]
#![deny(unused_imports)]

//! Gauss-Hermite expansions of peaked profiles such as line-of-sight velocity
//! distributions.
//!
//! A function is described by a Gaussian envelope (amplitude, center, width) and
//! the coefficients of its deviations from that Gaussian in orthogonal Hermite
//! functions. The envelope is either supplied or fitted, the coefficients come
//! from a fixed equally spaced quadrature, and a B-spline representation can be
//! mapped to coefficients through a precomputed linear transform.

pub mod batch;
pub mod config;
pub mod fitter;
pub mod hermite;
pub mod model;
pub mod moments;
pub mod projector;
pub mod transform;

#[path = "../numerics/mod.rs"]
pub mod numerics;

pub use config::{EnvelopeFitPolicy, ExpansionConfig};
pub use model::{Envelope, ExpansionError, FitReport, GaussHermiteExpansion};
pub use transform::{SplineDegree, compute_gauss_hermite_matrix};
