//! Numerical building blocks used by the expansion engine: Gauss-Legendre
//! tables, adaptive Gauss-Kronrod integration, a Levenberg-Marquardt
//! least-squares solver, and a B-spline basis over a breakpoint grid.

pub mod bspline;
pub mod integrate;
pub mod legendre;
pub mod levmar;
